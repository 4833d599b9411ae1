//! In-memory export/import snapshot
//!
//! The JSON shape is shared with the web front end:
//!
//! ```json
//! {
//!   "assisesByType": { "M65": [{ "index": 0, "height": 1.2, "elements": ["b1"] }] },
//!   "currentType": "M65",
//!   "currentAssiseByType": { "M65": 0 },
//!   "jointHeightByType": { "M65": 1.2 },
//!   "showAssiseGrids": true
//! }
//! ```
//!
//! Older files carry a single `jointHeight` instead of `jointHeightByType`;
//! it is applied to every type on import.

use crate::manager::AssiseManager;
use crate::{BaseType, ElementId, Result, SceneProvider, TypeKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One exported course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub index: u32,
    pub height: f64,
    pub elements: Vec<ElementId>,
}

/// Serializable state of the course engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub assises_by_type: BTreeMap<String, Vec<CourseRecord>>,
    pub current_type: String,
    #[serde(default)]
    pub current_assise_by_type: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_height_by_type: Option<BTreeMap<String, f64>>,
    /// Legacy global joint height
    #[serde(default, skip_serializing)]
    pub joint_height: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub joint_height_overrides: BTreeMap<String, BTreeMap<u32, f64>>,
    #[serde(default)]
    pub show_assise_grids: bool,
}

impl Snapshot {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<S: SceneProvider> AssiseManager<S> {
    /// Capture courses, pointers and joint settings
    pub fn export_data(&self) -> Snapshot {
        let mut snapshot = Snapshot {
            current_type: self.current_type.to_string(),
            show_assise_grids: self.show_grids,
            ..Default::default()
        };
        let mut joint_heights = BTreeMap::new();

        for base in self.registry.types() {
            let Some(stack) = self.registry.stack(base) else {
                continue;
            };
            let key = base.key().to_string();
            let courses = stack
                .courses
                .values()
                .map(|c| CourseRecord {
                    index: c.index,
                    height: self.height(base, c.index),
                    elements: c.elements.iter().cloned().collect(),
                })
                .collect();
            snapshot.assises_by_type.insert(key.clone(), courses);
            snapshot
                .current_assise_by_type
                .insert(key.clone(), stack.active);
            joint_heights.insert(key, self.joints.type_default(&self.config, base));
        }
        for (base, height) in self.joints.type_defaults() {
            joint_heights.insert(base.key().to_string(), *height);
        }
        snapshot.joint_height_by_type = Some(joint_heights);

        for (base, overrides) in self.joints.overrides() {
            snapshot
                .joint_height_overrides
                .insert(base.key().to_string(), overrides.clone());
        }
        snapshot
    }

    /// Replace all state with a snapshot
    ///
    /// Unsupported type keys are logged and skipped. Returns the number of
    /// course stacks restored.
    pub fn import_data(&mut self, snapshot: Snapshot) -> usize {
        self.clear();
        let mut restored = 0;

        for (name, courses) in &snapshot.assises_by_type {
            let Some(key) = self.resolve_type_name(name) else {
                continue;
            };
            let base = self.ensure_type(&key);
            for record in courses {
                self.registry.insert_course(base, record.index, record.height);
                for id in &record.elements {
                    if let Err(e) = self.registry.insert_element(base, record.index, id) {
                        tracing::warn!("Skipping element {} in snapshot: {}", id, e);
                    }
                }
            }
            restored += 1;
        }

        match (&snapshot.joint_height_by_type, snapshot.joint_height) {
            (Some(by_type), _) => {
                for (name, height) in by_type {
                    if let Some(key) = self.resolve_type_name(name) {
                        let height = self.config.sanitize_joint(*height);
                        self.joints.set_type_default(key.base, height);
                    }
                }
            }
            (None, Some(legacy)) => {
                let height = self.config.sanitize_joint(legacy);
                tracing::info!("Applying legacy joint height {} to every type", height);
                for base in BaseType::ALL.iter().filter(|b| !b.is_jointless()) {
                    self.joints.set_type_default(*base, height);
                }
            }
            (None, None) => {}
        }

        for (name, overrides) in &snapshot.joint_height_overrides {
            if let Some(key) = self.resolve_type_name(name) {
                for (index, height) in overrides {
                    let height = self.config.sanitize_joint(*height);
                    self.joints.set_override(key.base, *index, height);
                }
            }
        }

        let types: Vec<BaseType> = self.registry.types().collect();
        for base in types {
            self.refresh_heights(base);
            for index in self.registry.indices(base) {
                let joint_height = self.calculator().joint_height(base, index);
                self.synced_joints.insert((base, index), joint_height);
            }
        }

        for (name, index) in &snapshot.current_assise_by_type {
            if let Some(key) = self.resolve_type_name(name) {
                self.registry.set_active(key.base, *index);
            }
        }

        if let Some(key) = self.resolve_type_name(&snapshot.current_type) {
            self.current_type = key;
        }
        self.show_grids = snapshot.show_assise_grids;
        self.grid_dirty = true;
        let current = self.current_type.base;
        self.refresh_markers(current);

        tracing::debug!("Imported {} course stack(s)", restored);
        restored
    }

    /// Export as JSON text
    pub fn export_json(&self) -> Result<String> {
        self.export_data().to_json()
    }

    /// Import from JSON text; state is untouched if the text does not parse
    pub fn import_json(&mut self, text: &str) -> Result<usize> {
        let snapshot = Snapshot::from_json(text)?;
        Ok(self.import_data(snapshot))
    }
}

/// Course keys of a snapshot that name a supported type
pub fn supported_types(snapshot: &Snapshot) -> Vec<TypeKey> {
    snapshot
        .assises_by_type
        .keys()
        .filter_map(|name| TypeKey::parse(name).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssiseConfig, Catalogs, Dimensions, Element, ElementKind, MemoryScene};

    fn manager() -> AssiseManager<MemoryScene> {
        let mut scene = MemoryScene::new();
        for (id, h) in [("a", 6.5), ("b", 6.5), ("c", 5.0)] {
            scene.insert(Element::new(id, ElementKind::Brick, Dimensions::new(22.0, 10.5, h)));
        }
        AssiseManager::new(scene, Catalogs::new(), AssiseConfig::default())
    }

    #[test]
    fn test_export_shape() {
        let mut manager = manager();
        manager.add_element("a", Some(0)).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&manager.export_json().unwrap()).unwrap();
        assert_eq!(json["currentType"], "M65");
        assert_eq!(json["assisesByType"]["M65"][0]["elements"][0], "a");
        assert_eq!(json["currentAssiseByType"]["M65"], 0);
        assert_eq!(json["jointHeightByType"]["M65"], 1.2);
        assert_eq!(json["showAssiseGrids"], true);
        assert!(json.get("jointHeight").is_none());
    }

    #[test]
    fn test_legacy_joint_height_broadcast() {
        let text = r#"{
            "assisesByType": { "M65": [{ "index": 0, "height": 0, "elements": [] }] },
            "currentType": "M65",
            "currentAssiseByType": { "M65": 0 },
            "jointHeight": 1.0
        }"#;
        let mut manager = manager();
        assert_eq!(manager.import_json(text).unwrap(), 1);
        let m57 = TypeKey::new(BaseType::M57);
        assert_eq!(manager.joint_height(&m57, 3), 1.0);
        assert_eq!(manager.joint_height(&TypeKey::new(BaseType::Insulation), 0), 0.0);
        let cached = manager.registry().course(BaseType::M65, 0).unwrap().height;
        assert_eq!(cached, 1.0);
    }

    #[test]
    fn test_unsupported_types_skipped() {
        let text = r#"{
            "assisesByType": {
                "M65": [{ "index": 0, "height": 1.2, "elements": ["a"] }],
                "WOOD": [{ "index": 0, "height": 0, "elements": ["x"] }]
            },
            "currentType": "WOOD"
        }"#;
        let mut manager = manager();
        assert_eq!(manager.import_json(text).unwrap(), 1);
        assert_eq!(manager.course_of("x"), None);
        assert_eq!(manager.current_type().base, BaseType::Brick);
    }

    #[test]
    fn test_bad_json_leaves_state() {
        let mut manager = manager();
        manager.add_element("a", Some(0)).unwrap();
        assert!(manager.import_json("{ not json").is_err());
        assert_eq!(manager.course_of("a"), Some((BaseType::M65, 0)));
    }

    #[test]
    fn test_overrides_survive_round_trip() {
        let mut manager = manager();
        manager.add_element("a", Some(0)).unwrap();
        let m65 = TypeKey::new(BaseType::M65);
        manager.set_joint_height_for_course(&m65, 0, 2.0);
        let snapshot = manager.export_data();

        let mut restored = self::manager();
        restored.import_data(snapshot.clone());
        assert_eq!(restored.joint_height(&m65, 0), 2.0);
        assert_eq!(restored.export_data(), snapshot);
        assert_eq!(supported_types(&snapshot), vec![m65]);
    }
}
