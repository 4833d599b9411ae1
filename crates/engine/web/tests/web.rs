//! Browser-only checks for the error paths, which build `JsValue`s
#![cfg(target_arch = "wasm32")]

use assise_web::AssiseWorld;
use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn test_unsupported_type_rejected() {
    let world = AssiseWorld::new();
    assert!(world.height_of("WOOD", 1).is_err());
    assert!(world.set_joint_height_for_course("WOOD", 0, 2.0).is_err());
}

#[wasm_bindgen_test]
fn test_bad_payloads_rejected() {
    let world = AssiseWorld::new();
    assert!(world.register_element("{ not json").is_err());
    assert!(world.import_data("{ \"currentType\": 3 }").is_err());
    assert!(AssiseWorld::from_config("joint_search_radius = \"far\"").is_err());
}

#[wasm_bindgen_test]
fn test_missing_course_errors() {
    let world = AssiseWorld::new();
    assert!(world.set_active_course("M65", 4).is_err());
    assert!(world.remove_course("M65", 4, true).is_err());
}
