//! Collaborator interfaces
//!
//! The engine never touches the scene graph, the material catalogs or the
//! construction tool directly. Hosts implement these traits; tests use the
//! in-memory [`MemoryScene`] and [`StaticCatalog`].

use crate::{Element, ElementId, TypeKey};
use glam::DVec3;
use std::collections::BTreeMap;

/// Access to the elements of the 3D scene
pub trait SceneProvider {
    /// Look up an element by ID
    fn element(&self, id: &str) -> Option<&Element>;

    /// Move an element, returning false if it does not exist
    fn set_element_position(&mut self, id: &str, position: DVec3) -> bool;

    /// Change an element's height (joints are resized on re-sync)
    fn set_element_height(&mut self, id: &str, height: f64) -> bool;

    /// Delete an element from the scene
    fn remove_element(&mut self, id: &str) -> bool;

    /// Clone an element at a new position, returning the clone's ID
    fn duplicate_element(&mut self, id: &str, position: DVec3) -> Option<ElementId>;

    /// IDs of every element in the scene
    fn element_ids(&self) -> Vec<ElementId>;
}

/// Current selection of a material catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMetadata {
    /// Catalog category (`"M65"`, `"cellular"`, `"hollow"`, ...)
    pub category: String,
    /// Specific width/size code inside the category (`"BC_20"`, `"B14"`)
    pub specific_code: Option<String>,
}

/// Default dimensions offered by a material catalog
pub trait DimensionProvider {
    /// Height of the currently selected item, if any
    fn current_default_height(&self) -> Option<f64>;

    /// Category of the currently selected item, if any
    fn current_category(&self) -> Option<CategoryMetadata>;
}

/// One optional catalog per material family
#[derive(Default)]
pub struct Catalogs {
    pub brick: Option<Box<dyn DimensionProvider>>,
    pub block: Option<Box<dyn DimensionProvider>>,
    pub insulation: Option<Box<dyn DimensionProvider>>,
    pub lintel: Option<Box<dyn DimensionProvider>>,
}

impl Catalogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brick(mut self, provider: impl DimensionProvider + 'static) -> Self {
        self.brick = Some(Box::new(provider));
        self
    }

    pub fn with_block(mut self, provider: impl DimensionProvider + 'static) -> Self {
        self.block = Some(Box::new(provider));
        self
    }

    pub fn with_insulation(mut self, provider: impl DimensionProvider + 'static) -> Self {
        self.insulation = Some(Box::new(provider));
        self
    }

    pub fn with_lintel(mut self, provider: impl DimensionProvider + 'static) -> Self {
        self.lintel = Some(Box::new(provider));
        self
    }
}

/// Joint settings reported by the construction tool for an element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSettings {
    pub create_joints: bool,
    pub horizontal_thickness_mm: f64,
}

impl JointSettings {
    /// Horizontal joint thickness in cm
    pub fn thickness_cm(&self) -> f64 {
        self.horizontal_thickness_mm / 10.0
    }
}

/// Construction tool that places elements interactively
pub trait ToolSettingsProvider {
    /// Joint settings that apply to an element, if the tool has any
    fn joint_settings_for(&self, element: &Element) -> Option<JointSettings>;

    /// Called when the engine switches the current type
    fn on_type_switched(&mut self, _key: &TypeKey) {}
}

/// Fixed catalog selection, settable at runtime
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    pub height: Option<f64>,
    pub category: Option<CategoryMetadata>,
}

impl StaticCatalog {
    pub fn new(height: f64) -> Self {
        StaticCatalog {
            height: Some(height),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>, code: Option<&str>) -> Self {
        self.category = Some(CategoryMetadata {
            category: category.into(),
            specific_code: code.map(String::from),
        });
        self
    }
}

impl DimensionProvider for StaticCatalog {
    fn current_default_height(&self) -> Option<f64> {
        self.height
    }

    fn current_category(&self) -> Option<CategoryMetadata> {
        self.category.clone()
    }
}

/// In-memory scene keyed by element ID
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    elements: BTreeMap<ElementId, Element>,
    next_copy: u64,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an element
    pub fn insert(&mut self, element: Element) {
        self.elements.insert(element.id.clone(), element);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }
}

impl SceneProvider for MemoryScene {
    fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    fn set_element_position(&mut self, id: &str, position: DVec3) -> bool {
        match self.elements.get_mut(id) {
            Some(element) => {
                element.position = position;
                true
            }
            None => false,
        }
    }

    fn set_element_height(&mut self, id: &str, height: f64) -> bool {
        match self.elements.get_mut(id) {
            Some(element) => {
                element.dimensions.height = height;
                true
            }
            None => false,
        }
    }

    fn remove_element(&mut self, id: &str) -> bool {
        self.elements.remove(id).is_some()
    }

    fn duplicate_element(&mut self, id: &str, position: DVec3) -> Option<ElementId> {
        let mut copy = self.elements.get(id)?.clone();
        // Skip IDs already taken by inserted elements
        loop {
            self.next_copy += 1;
            let candidate = format!("{id}#{}", self.next_copy);
            if !self.elements.contains_key(&candidate) {
                copy.id = candidate;
                break;
            }
        }
        copy.position = position;
        let new_id = copy.id.clone();
        self.elements.insert(new_id.clone(), copy);
        Some(new_id)
    }

    fn element_ids(&self) -> Vec<ElementId> {
        self.elements.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dimensions, ElementKind};

    fn brick(id: &str) -> Element {
        Element::new(id, ElementKind::Brick, Dimensions::new(22.0, 10.5, 6.5))
    }

    #[test]
    fn test_memory_scene_basics() {
        let mut scene = MemoryScene::new();
        scene.insert(brick("a"));
        assert_eq!(scene.len(), 1);
        assert!(scene.set_element_position("a", DVec3::new(1.0, 2.0, 3.0)));
        assert_eq!(scene.element("a").unwrap().position.y, 2.0);
        assert!(!scene.set_element_position("missing", DVec3::ZERO));
        assert!(scene.remove_element("a"));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_duplicate_gets_fresh_id() {
        let mut scene = MemoryScene::new();
        scene.insert(brick("a"));
        scene.insert(brick("a#1"));
        let copy = scene.duplicate_element("a", DVec3::Y).unwrap();
        assert_eq!(copy, "a#2");
        assert_eq!(scene.element(&copy).unwrap().position, DVec3::Y);
        assert!(scene.duplicate_element("missing", DVec3::ZERO).is_none());
    }

    #[test]
    fn test_joint_thickness() {
        let settings = JointSettings {
            create_joints: true,
            horizontal_thickness_mm: 3.0,
        };
        assert!((settings.thickness_cm() - 0.3).abs() < 1e-12);
    }
}
