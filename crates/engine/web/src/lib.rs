//! Browser binding for the course engine
//!
//! The JS scene pushes element snapshots in (`registerElement`), drives the
//! manager through the exported methods, and reads element positions and
//! queued notifications back out. Structured payloads cross the boundary as
//! JSON strings.

mod catalog;

pub use catalog::{SharedCatalog, SharedTools};

use assise::{
    AssiseConfig, AssiseManager, Catalogs, Element, MemoryScene, SceneProvider, TypeKey,
};
use glam::DVec3;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

fn parse_key(type_name: &str) -> Result<TypeKey, JsValue> {
    TypeKey::parse(type_name).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// AssiseWorld - course manager over an in-memory copy of the scene
#[wasm_bindgen]
pub struct AssiseWorld {
    inner: RefCell<AssiseManager<MemoryScene>>,
    brick: SharedCatalog,
    block: SharedCatalog,
    insulation: SharedCatalog,
    lintel: SharedCatalog,
    tools: SharedTools,
}

#[wasm_bindgen]
impl AssiseWorld {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::with_config(AssiseConfig::default())
    }

    /// Create a world from a TOML configuration
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(toml: &str) -> Result<AssiseWorld, JsValue> {
        let config =
            AssiseConfig::from_toml_str(toml).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self::with_config(config))
    }

    /// Insert or replace an element snapshot (JSON `Element`)
    #[wasm_bindgen(js_name = registerElement)]
    pub fn register_element(&self, json: &str) -> Result<(), JsValue> {
        let element: Element = serde_json::from_str(json)
            .map_err(|e| JsValue::from_str(&format!("Invalid element: {}", e)))?;
        self.inner.borrow_mut().scene_mut().insert(element);
        Ok(())
    }

    /// Remove an element from the scene copy and from its course
    #[wasm_bindgen(js_name = deleteElement)]
    pub fn delete_element(&self, id: &str) -> bool {
        let mut manager = self.inner.borrow_mut();
        manager.remove_element(id);
        manager.scene_mut().remove_element(id)
    }

    /// Track an element; returns `[type, course]` as JSON, or null
    #[wasm_bindgen(js_name = addElement)]
    pub fn add_element(&self, id: &str, index: Option<u32>) -> Option<String> {
        let (key, course) = self.inner.borrow_mut().add_element(id, index)?;
        serde_json::to_string(&(key.to_string(), course)).ok()
    }

    #[wasm_bindgen(js_name = addElementToCourse)]
    pub fn add_element_to_course(
        &self,
        type_name: &str,
        id: &str,
        index: u32,
    ) -> Result<bool, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow_mut().add_element_to_course(&key, id, index))
    }

    /// Stop tracking an element, leaving it in the scene
    #[wasm_bindgen(js_name = removeElement)]
    pub fn remove_element(&self, id: &str) -> bool {
        self.inner.borrow_mut().remove_element(id).is_some()
    }

    /// Re-seat a tracked element on its course after the JS side moved it
    #[wasm_bindgen(js_name = snapToCourse)]
    pub fn snap_to_course(&self, id: &str) -> Result<u32, JsValue> {
        self.inner
            .borrow_mut()
            .snap_to_course(id)
            .map(|(_, index)| index)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = canSelect)]
    pub fn can_select(&self, id: &str) -> bool {
        self.inner.borrow().can_select(id)
    }

    /// Y of the element's centre, after any repositioning
    #[wasm_bindgen(js_name = getElementY)]
    pub fn get_element_y(&self, id: &str) -> Option<f64> {
        self.inner.borrow().scene().element(id).map(|e| e.position.y)
    }

    /// Current position of an element as `[x, y, z]`
    #[wasm_bindgen(js_name = getElementPosition)]
    pub fn get_element_position(&self, id: &str) -> Option<Vec<f64>> {
        let manager = self.inner.borrow();
        let position = manager.scene().element(id)?.position;
        Some(position.to_array().to_vec())
    }

    #[wasm_bindgen(js_name = getElementHeight)]
    pub fn get_element_height(&self, id: &str) -> Option<f64> {
        self.inner.borrow().scene().element(id).map(Element::height)
    }

    #[wasm_bindgen(js_name = heightOf)]
    pub fn height_of(&self, type_name: &str, index: u32) -> Result<f64, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow().height_of(&key, index))
    }

    #[wasm_bindgen(js_name = jointHeight)]
    pub fn joint_height(&self, type_name: &str, index: u32) -> Result<f64, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow().joint_height(&key, index))
    }

    #[wasm_bindgen(js_name = ghostHeight)]
    pub fn ghost_height(&self, type_name: &str) -> Result<f64, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow().ghost_height(&key))
    }

    #[wasm_bindgen(js_name = setJointHeightForCourse)]
    pub fn set_joint_height_for_course(
        &self,
        type_name: &str,
        index: u32,
        height: f64,
    ) -> Result<bool, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self
            .inner
            .borrow_mut()
            .set_joint_height_for_course(&key, index, height))
    }

    #[wasm_bindgen(js_name = clearJointOverride)]
    pub fn clear_joint_override(&self, type_name: &str, index: u32) -> Result<bool, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow_mut().clear_joint_override(&key, index))
    }

    #[wasm_bindgen(js_name = setTypeJointHeight)]
    pub fn set_type_joint_height(&self, type_name: &str, height: f64) -> Result<bool, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow_mut().set_type_joint_height(&key, height))
    }

    /// Create a course and make it active; returns its index
    #[wasm_bindgen(js_name = addCourse)]
    pub fn add_course(&self, type_name: &str, index: Option<u32>) -> Result<u32, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow_mut().add_course(&key, index).index)
    }

    #[wasm_bindgen(js_name = setActiveCourse)]
    pub fn set_active_course(&self, type_name: &str, index: u32) -> Result<(), JsValue> {
        let key = parse_key(type_name)?;
        self.inner
            .borrow_mut()
            .set_active_course(&key, index)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = activeCourse)]
    pub fn active_course(&self, type_name: &str) -> Result<u32, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow().active_course(&key))
    }

    /// Remove a course and its elements
    ///
    /// `confirmed` answers the confirmation prompt up front; the UI asks the
    /// user before calling with `true`.
    #[wasm_bindgen(js_name = removeCourse)]
    pub fn remove_course(
        &self,
        type_name: &str,
        index: u32,
        confirmed: bool,
    ) -> Result<(), JsValue> {
        let key = parse_key(type_name)?;
        self.inner
            .borrow_mut()
            .remove_course(&key, index, |_| confirmed)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Elements a course removal would delete, joints excluded
    #[wasm_bindgen(js_name = removalCount)]
    pub fn removal_count(&self, type_name: &str, index: u32) -> Result<u32, JsValue> {
        let key = parse_key(type_name)?;
        let manager = self.inner.borrow();
        let count = manager
            .registry()
            .course(key.base, index)
            .map(|course| {
                course
                    .elements
                    .iter()
                    .filter(|id| !manager.scene().element(id).is_some_and(|e| e.kind.is_joint()))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u32)
    }

    /// Copy a course; returns the IDs of the copies as JSON, or null
    #[wasm_bindgen(js_name = copyCourse)]
    pub fn copy_course(
        &self,
        type_name: &str,
        from: u32,
        to: u32,
    ) -> Result<Option<String>, JsValue> {
        let key = parse_key(type_name)?;
        let copies = self.inner.borrow_mut().copy_course(&key, from, to);
        Ok(copies.and_then(|ids| serde_json::to_string(&ids).ok()))
    }

    #[wasm_bindgen(js_name = visibleCourses)]
    pub fn visible_courses(&self, type_name: &str) -> Result<Vec<u32>, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow().visible_courses(&key))
    }

    #[wasm_bindgen(js_name = currentType)]
    pub fn current_type(&self) -> String {
        self.inner.borrow().current_type().to_string()
    }

    /// Type the construction tool was last switched to
    #[wasm_bindgen(js_name = toolType)]
    pub fn tool_type(&self) -> Option<String> {
        self.tools.tool_type()
    }

    #[wasm_bindgen(js_name = setCurrentType)]
    pub fn set_current_type(&self, type_name: &str) -> Result<bool, JsValue> {
        let key = parse_key(type_name)?;
        Ok(self.inner.borrow_mut().set_current_type(key))
    }

    #[wasm_bindgen(js_name = setGridsVisible)]
    pub fn set_grids_visible(&self, visible: bool) {
        self.inner.borrow_mut().set_grids_visible(visible);
    }

    #[wasm_bindgen(js_name = gridsVisible)]
    pub fn grids_visible(&self) -> bool {
        self.inner.borrow().grids_visible()
    }

    /// Grid square as `[centerX, centerZ, size]`
    #[wasm_bindgen(js_name = gridExtents)]
    pub fn grid_extents(&self) -> Vec<f64> {
        let extents = self.inner.borrow().grid_extents();
        vec![extents.center.x, extents.center.y, extents.size]
    }

    /// Snap markers of a course as a flat `[x, y, z, ...]` array
    #[wasm_bindgen(js_name = snapMarkers)]
    pub fn snap_markers(&self, type_name: &str, index: u32) -> Result<Vec<f64>, JsValue> {
        let key = parse_key(type_name)?;
        let manager = self.inner.borrow();
        let coords = manager
            .registry()
            .stack(key.base)
            .and_then(|stack| stack.markers.get(&index))
            .map(|markers| {
                markers
                    .iter()
                    .flat_map(|m| m.position.to_array())
                    .collect()
            })
            .unwrap_or_default();
        Ok(coords)
    }

    /// Run deferred work; call once per animation frame
    #[wasm_bindgen(js_name = flushPending)]
    pub fn flush_pending(&self) -> bool {
        self.inner.borrow_mut().flush_pending()
    }

    /// Queued notifications as a JSON array
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&self) -> String {
        let events = self.inner.borrow_mut().drain_events();
        serde_json::to_string(&events).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize events: {}", e);
            "[]".to_string()
        })
    }

    #[wasm_bindgen(js_name = exportData)]
    pub fn export_data(&self) -> Result<String, JsValue> {
        self.inner
            .borrow()
            .export_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Replace all course state; returns the number of stacks restored
    #[wasm_bindgen(js_name = importData)]
    pub fn import_data(&self, json: &str) -> Result<u32, JsValue> {
        self.inner
            .borrow_mut()
            .import_json(json)
            .map(|n| n as u32)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    /// Update a catalog selection (`family`: brick, block, insulation, lintel)
    #[wasm_bindgen(js_name = setCatalogSelection)]
    pub fn set_catalog_selection(
        &self,
        family: &str,
        height: Option<f64>,
        category: Option<String>,
        specific_code: Option<String>,
    ) -> bool {
        let catalog = match family {
            "brick" => &self.brick,
            "block" => &self.block,
            "insulation" => &self.insulation,
            "lintel" => &self.lintel,
            other => {
                tracing::warn!("Unknown catalog family: {}", other);
                return false;
            }
        };
        catalog.select(height, category, specific_code);
        true
    }

    /// Joint settings of the construction tool
    #[wasm_bindgen(js_name = setJointSettings)]
    pub fn set_joint_settings(&self, create_joints: bool, thickness_mm: f64) {
        self.tools.set(create_joints, thickness_mm);
    }
}

impl AssiseWorld {
    fn with_config(config: AssiseConfig) -> Self {
        let brick = SharedCatalog::default();
        let block = SharedCatalog::default();
        let insulation = SharedCatalog::default();
        let lintel = SharedCatalog::default();
        let tools = SharedTools::default();

        let catalogs = Catalogs::new()
            .with_brick(brick.clone())
            .with_block(block.clone())
            .with_insulation(insulation.clone())
            .with_lintel(lintel.clone());
        let manager =
            AssiseManager::new(MemoryScene::new(), catalogs, config).with_tools(tools.clone());

        Self {
            inner: RefCell::new(manager),
            brick,
            block,
            insulation,
            lintel,
            tools,
        }
    }

    /// Run a closure against the manager (native hosts and tests)
    pub fn with_manager<R>(&self, f: impl FnOnce(&mut AssiseManager<MemoryScene>) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    /// Move an element in the scene copy, as the JS side would after a drag
    pub fn move_element(&self, id: &str, position: DVec3) -> bool {
        self.inner
            .borrow_mut()
            .scene_mut()
            .set_element_position(id, position)
    }
}

impl Default for AssiseWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brick_json(id: &str, height: f64) -> String {
        format!(
            r#"{{
                "id": "{id}",
                "kind": {{ "kind": "brick" }},
                "type_name": null,
                "dimensions": {{ "length": 22.0, "width": 10.5, "height": {height} }},
                "position": [0.0, 0.0, 0.0],
                "rotation": 0.0
            }}"#
        )
    }

    #[test]
    fn test_register_and_place() {
        let world = AssiseWorld::new();
        world.register_element(&brick_json("b1", 6.5)).unwrap();
        let placed = world.add_element("b1", Some(1)).unwrap();
        assert_eq!(placed, r#"["M65",1]"#);

        let y = world.get_element_y("b1").unwrap();
        assert!((y - (8.9 + 3.25)).abs() < 1e-9);
        assert_eq!(world.current_type(), "M65");
        assert_eq!(world.tool_type().as_deref(), Some("M65"));

        assert!(world.move_element("b1", DVec3::new(10.0, 50.0, 0.0)));
        assert_eq!(world.snap_to_course("b1").unwrap(), 1);
        let position = world.get_element_position("b1").unwrap();
        assert_eq!(position[0], 10.0);
        assert!((position[1] - y).abs() < 1e-9);
    }

    #[test]
    fn test_joint_override_through_binding() {
        let world = AssiseWorld::new();
        world.register_element(&brick_json("b1", 6.5)).unwrap();
        world.add_element("b1", Some(0)).unwrap();

        assert!(world.set_joint_height_for_course("M65", 0, 2.0).unwrap());
        assert!((world.height_of("M65", 1).unwrap() - 9.7).abs() < 1e-9);
        assert!((world.height_of("M65_HALF", 1).unwrap() - 9.7).abs() < 1e-9);
        let bottom = world.get_element_y("b1").unwrap() - 3.25;
        assert!((bottom - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_catalog_selection_feeds_heights() {
        let world = AssiseWorld::new();
        assert!(world.set_catalog_selection("insulation", Some(12.0), None, None));
        assert!(!world.set_catalog_selection("timber", Some(12.0), None, None));
        assert!((world.height_of("insulation", 2).unwrap() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_events_and_snapshot_round_trip() {
        let world = AssiseWorld::new();
        world.register_element(&brick_json("b1", 6.5)).unwrap();
        world.add_element("b1", None).unwrap();

        let events: serde_json::Value = serde_json::from_str(&world.drain_events()).unwrap();
        assert!(!events.as_array().unwrap().is_empty());
        assert_eq!(world.drain_events(), "[]");

        let exported = world.export_data().unwrap();
        let restored = AssiseWorld::new();
        restored.register_element(&brick_json("b1", 6.5)).unwrap();
        assert_eq!(restored.import_data(&exported).unwrap(), 1);
        assert_eq!(restored.export_data().unwrap(), exported);
        assert_eq!(restored.current_type(), "M65");
    }

    #[test]
    fn test_remove_course_confirmed() {
        let world = AssiseWorld::new();
        world.register_element(&brick_json("b1", 6.5)).unwrap();
        world.add_element("b1", Some(0)).unwrap();
        assert_eq!(world.removal_count("M65", 0).unwrap(), 1);

        world.remove_course("M65", 0, true).unwrap();
        assert!(world.get_element_y("b1").is_none());
        assert!(world.can_select("b1"));
    }

    #[test]
    fn test_cellular_joint_from_tool_settings() {
        let world = AssiseWorld::new();
        world.set_joint_settings(true, 3.0);
        world
            .register_element(
                r#"{
                    "id": "bc",
                    "kind": { "kind": "block", "material": "cellular_concrete" },
                    "type_name": "BC_20",
                    "dimensions": { "length": 60.0, "width": 20.0, "height": 25.0 },
                    "position": [0.0, 0.0, 0.0],
                    "rotation": 0.0
                }"#,
            )
            .unwrap();
        world.add_element("bc", Some(1)).unwrap();
        assert!((world.joint_height("BC_20", 1).unwrap() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_grids_flush() {
        let world = AssiseWorld::new();
        world.register_element(&brick_json("b1", 6.5)).unwrap();
        world.add_element("b1", None).unwrap();
        assert!(world.grids_visible());
        assert!(world.flush_pending());
        assert!(!world.flush_pending());
        assert_eq!(world.grid_extents().len(), 3);
        assert!(world.with_manager(|m| !m.has_pending_work()));
    }
}
