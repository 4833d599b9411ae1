//! Catalog and tool state shared between the JS bindings and the manager

use assise::{
    CategoryMetadata, DimensionProvider, Element, JointSettings, StaticCatalog,
    ToolSettingsProvider, TypeKey,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Catalog selection written by JS, read by the height calculator
#[derive(Clone, Default)]
pub struct SharedCatalog(Rc<RefCell<StaticCatalog>>);

impl SharedCatalog {
    pub fn select(
        &self,
        height: Option<f64>,
        category: Option<String>,
        specific_code: Option<String>,
    ) {
        let mut catalog = self.0.borrow_mut();
        catalog.height = height.filter(|h| h.is_finite() && *h > 0.0);
        catalog.category = category.map(|category| CategoryMetadata {
            category,
            specific_code,
        });
    }
}

impl DimensionProvider for SharedCatalog {
    fn current_default_height(&self) -> Option<f64> {
        self.0.borrow().current_default_height()
    }

    fn current_category(&self) -> Option<CategoryMetadata> {
        self.0.borrow().current_category()
    }
}

#[derive(Default)]
struct ToolState {
    settings: Option<JointSettings>,
    tool_type: Option<String>,
}

/// Construction tool state: joint settings in, type switches out
#[derive(Clone, Default)]
pub struct SharedTools(Rc<RefCell<ToolState>>);

impl SharedTools {
    pub fn set(&self, create_joints: bool, horizontal_thickness_mm: f64) {
        self.0.borrow_mut().settings = Some(JointSettings {
            create_joints,
            horizontal_thickness_mm,
        });
    }

    /// Type the tool was last switched to by the engine
    pub fn tool_type(&self) -> Option<String> {
        self.0.borrow().tool_type.clone()
    }
}

impl ToolSettingsProvider for SharedTools {
    fn joint_settings_for(&self, element: &Element) -> Option<JointSettings> {
        if !element.is_cellular() {
            return None;
        }
        self.0.borrow().settings
    }

    fn on_type_switched(&mut self, key: &TypeKey) {
        tracing::debug!("Tool switched to {}", key);
        self.0.borrow_mut().tool_type = Some(key.to_string());
    }
}
