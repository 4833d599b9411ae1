//! End-to-end course scenarios
//!
//! Drives the manager through the public API only, with the in-memory scene
//! and static catalogs standing in for the 3D scene and material selectors.

use assise::{
    AssiseConfig, AssiseEvent, AssiseManager, BaseType, Catalogs, Dimensions, Element,
    ElementKind, Error, MemoryScene, SceneProvider, StaticCatalog, TypeKey,
};

const EPS: f64 = 1e-9;

fn key(text: &str) -> TypeKey {
    TypeKey::parse(text).unwrap()
}

fn brick(id: &str, height: f64) -> Element {
    Element::new(id, ElementKind::Brick, Dimensions::new(22.0, 10.5, height))
}

fn manager_with(elements: Vec<Element>, catalogs: Catalogs) -> AssiseManager<MemoryScene> {
    let mut scene = MemoryScene::new();
    for element in elements {
        scene.insert(element);
    }
    AssiseManager::new(scene, catalogs, AssiseConfig::default())
}

#[test]
fn test_insulation_stack_has_no_joints() {
    let catalogs = Catalogs::new().with_insulation(StaticCatalog::new(20.0));
    let manager = manager_with(vec![], catalogs);
    let insulation = key("insulation");
    assert_eq!(manager.height_of(&insulation, 0), 0.0);
    assert!((manager.height_of(&insulation, 1) - 20.0).abs() < EPS);
}

#[test]
fn test_brick_stack_heights() {
    let manager = manager_with(vec![], Catalogs::new());
    let m65 = key("M65");
    assert!((manager.height_of(&m65, 0) - 1.2).abs() < EPS);
    assert!((manager.height_of(&m65, 1) - 8.9).abs() < EPS);
}

#[test]
fn test_base_joint_override() {
    let mut manager = manager_with(vec![], Catalogs::new());
    let m65 = key("M65");
    assert!(manager.set_joint_height_for_course(&m65, 0, 2.0));
    assert!((manager.height_of(&m65, 1) - 9.7).abs() < EPS);
}

#[test]
fn test_monotonic_stacking() {
    let catalogs = Catalogs::new().with_insulation(StaticCatalog::new(12.0));
    let mut manager = manager_with(vec![], catalogs);
    for text in ["M50", "B14", "BC_24", "insulation", "SLAB_20", "membrane", "L160"] {
        let k = key(text);
        manager.set_joint_height_for_course(&k, 3, 2.5);
        let heights: Vec<f64> = (0..8).map(|i| manager.height_of(&k, i)).collect();
        for pair in heights.windows(2) {
            assert!(pair[0] < pair[1], "{text}: {heights:?} must strictly increase");
        }
    }
}

#[test]
fn test_malformed_config_keeps_stack_increasing() {
    let config = AssiseConfig::from_toml_str("default_joint_height = -10.0").unwrap();
    let manager = AssiseManager::new(MemoryScene::new(), Catalogs::new(), config);
    let m65 = key("M65");
    let heights: Vec<f64> = (0..4).map(|i| manager.height_of(&m65, i)).collect();
    assert!((heights[0] - 0.1).abs() < EPS);
    assert!((heights[1] - 6.7).abs() < EPS);
    for pair in heights.windows(2) {
        assert!(pair[0].is_finite() && pair[0] < pair[1], "{heights:?}");
    }

    let config = AssiseConfig {
        default_joint_height: f64::NAN,
        global_default_height: -1.0,
        ..AssiseConfig::default()
    };
    let manager = AssiseManager::new(MemoryScene::new(), Catalogs::new(), config);
    assert!(manager.height_of(&m65, 1).is_finite());
    assert_eq!(manager.config().global_default_height, 6.5);
}

#[test]
fn test_override_locality_then_propagation() {
    let mut manager = manager_with(vec![], Catalogs::new());
    let b19 = key("B19");
    for i in 0..6 {
        manager.add_course(&b19, Some(i));
    }
    let before: Vec<f64> = (0..6).map(|i| manager.height_of(&b19, i)).collect();

    assert!(manager.set_joint_height_for_course(&b19, 3, 3.0));
    for i in 0..6u32 {
        let delta = manager.height_of(&b19, i) - before[i as usize];
        let expected = if i < 3 { 0.0 } else { 1.8 };
        assert!((delta - expected).abs() < EPS, "course {i}: delta {delta}");
        let cached = manager.registry().course(BaseType::B19, i).unwrap().height;
        assert!((cached - manager.height_of(&b19, i)).abs() < EPS);
    }
}

#[test]
fn test_idempotent_joint_write() {
    let mut manager = manager_with(vec![brick("a", 6.5)], Catalogs::new());
    manager.add_element("a", Some(0)).unwrap();
    let m65 = key("M65");

    assert!(manager.set_joint_height_for_course(&m65, 0, 1.8));
    manager.scene_mut().set_element_position("a", glam::DVec3::new(0.0, 500.0, 0.0));
    assert!(!manager.set_joint_height_for_course(&m65, 0, 1.8));
    // Second call did not reposition anything
    assert_eq!(manager.scene().element("a").unwrap().position.y, 500.0);
}

#[test]
fn test_reentrant_joint_write_starved() {
    let mut manager = manager_with(vec![brick("a", 6.5)], Catalogs::new());
    manager.add_element("a", Some(0)).unwrap();
    let m65 = key("M65");
    let before = manager.export_data();
    manager.drain_events();

    let guard = manager.reposition_guard();
    let _pass = guard.try_acquire().unwrap();
    assert!(!manager.set_joint_height_for_course(&m65, 0, 3.0));
    assert!(!manager.set_type_joint_height(&m65, 3.0));
    assert!(!manager.clear_joint_override(&m65, 0));

    assert_eq!(manager.export_data(), before);
    assert!(manager.pending_events().is_empty());
}

#[test]
fn test_round_trip_export_import() {
    let elements = vec![brick("a", 6.5), brick("b", 6.5), brick("c", 5.0)];
    let mut manager = manager_with(elements.clone(), Catalogs::new());
    manager.add_element("a", Some(0)).unwrap();
    manager.add_element("b", Some(1)).unwrap();
    manager.add_element("c", Some(2)).unwrap();
    manager.set_active_course(&key("M65"), 1).unwrap();
    let snapshot = manager.export_data();

    let mut restored = manager_with(elements, Catalogs::new());
    restored.import_data(snapshot.clone());

    assert_eq!(restored.current_type(), manager.current_type());
    for base in [BaseType::M65, BaseType::M50] {
        assert_eq!(restored.registry().indices(base), manager.registry().indices(base));
        for index in manager.registry().indices(base) {
            assert_eq!(
                restored.registry().course(base, index).unwrap().elements,
                manager.registry().course(base, index).unwrap().elements
            );
        }
        assert_eq!(restored.registry().active(base), manager.registry().active(base));
    }
    assert_eq!(restored.export_data(), snapshot);
}

#[test]
fn test_cut_suffix_delegates_to_base() {
    let manager = manager_with(vec![], Catalogs::new());
    for k in 0..10 {
        assert_eq!(
            manager.height_of(&key("M65_HALF"), k),
            manager.height_of(&key("M65"), k)
        );
    }
}

#[test]
fn test_select_only_active_course() {
    let mut manager = manager_with(vec![brick("low", 6.5), brick("high", 6.5)], Catalogs::new());
    manager.add_element("low", Some(0)).unwrap();
    manager.add_element("high", Some(1)).unwrap();
    manager.set_active_course(&key("M65"), 1).unwrap();

    assert!(!manager.can_select("low"));
    assert!(manager.can_select("high"));
    assert!(manager.can_select("untracked"));
}

#[test]
fn test_beam_does_not_raise_next_course() {
    let beam = Element::new("beam", ElementKind::Beam, Dimensions::new(300.0, 20.0, 40.0));
    let mut manager = manager_with(vec![brick("a", 6.5), beam], Catalogs::new());
    let m65 = key("M65");
    manager.add_element("a", Some(0)).unwrap();
    let next_before = manager.height_of(&m65, 1);

    manager.add_element_to_course(&m65, "beam", 0);
    assert_eq!(manager.max_element_height_in_course(&m65, 0), 6.5);
    assert_eq!(manager.height_of(&m65, 1), next_before);
}

#[test]
fn test_declined_removal_keeps_course() {
    let mut manager = manager_with(vec![brick("a", 6.5)], Catalogs::new());
    manager.add_element("a", None).unwrap();
    let m65 = key("M65");

    let result = manager.remove_course(&m65, 0, |_| false);
    assert!(matches!(result, Err(Error::RemovalDeclined { .. })));
    assert_eq!(manager.registry().indices(BaseType::M65), vec![0]);
    assert!(manager.registry().course(BaseType::M65, 0).unwrap().contains("a"));
    assert!(manager.scene().element("a").is_some());
}

#[test]
fn test_catalog_selection_changes_generic_heights() {
    let mut manager = manager_with(vec![], Catalogs::new().with_brick(StaticCatalog::new(5.0)));
    let generic = key("brick");
    assert!((manager.height_of(&generic, 1) - 7.4).abs() < EPS);

    manager.catalogs_mut().brick = Some(Box::new(StaticCatalog::new(9.0)));
    assert!((manager.height_of(&generic, 1) - 11.4).abs() < EPS);
}

#[test]
fn test_active_course_events() {
    let mut manager = manager_with(vec![], Catalogs::new());
    let m65 = key("M65");
    manager.add_course(&m65, Some(0));
    manager.add_course(&m65, Some(1));
    manager.drain_events();

    manager.set_active_course(&m65, 0).unwrap();
    let events = manager.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        AssiseEvent::ActiveCourseChanged { assise: 0, height, .. } if (*height - 1.2).abs() < EPS
    )));
}
