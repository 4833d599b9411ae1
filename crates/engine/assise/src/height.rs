//! Height calculator
//!
//! Maps `(type, course index)` to the Y of the course's lower face by
//! accumulating element heights and joint heights from course 0 upward.
//! Nothing here is cached: every query re-reads the joint table and the
//! catalogs' current selection.

use crate::{AssiseConfig, BaseType, Catalogs, DimensionProvider, TypeFamily, TypeKey};
use std::collections::BTreeMap;

/// Runtime joint heights: per-type defaults and per-course overrides
#[derive(Debug, Clone, Default)]
pub struct JointTable {
    by_type: BTreeMap<BaseType, f64>,
    overrides: BTreeMap<BaseType, BTreeMap<u32, f64>>,
}

impl JointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default joint for a type: runtime value, else config
    pub fn type_default(&self, config: &AssiseConfig, base: BaseType) -> f64 {
        if base.is_jointless() {
            return 0.0;
        }
        self.by_type
            .get(&base)
            .copied()
            .unwrap_or_else(|| config.default_joint_for(base))
    }

    pub fn set_type_default(&mut self, base: BaseType, height: f64) {
        self.by_type.insert(base, height);
    }

    /// Types with a runtime default
    pub fn type_defaults(&self) -> &BTreeMap<BaseType, f64> {
        &self.by_type
    }

    pub fn override_at(&self, base: BaseType, index: u32) -> Option<f64> {
        self.overrides.get(&base)?.get(&index).copied()
    }

    pub fn set_override(&mut self, base: BaseType, index: u32, height: f64) {
        self.overrides.entry(base).or_default().insert(index, height);
    }

    /// Remove an override; returns true if one existed
    pub fn clear_override(&mut self, base: BaseType, index: u32) -> bool {
        let Some(map) = self.overrides.get_mut(&base) else {
            return false;
        };
        let removed = map.remove(&index).is_some();
        if map.is_empty() {
            self.overrides.remove(&base);
        }
        removed
    }

    pub fn overrides(&self) -> &BTreeMap<BaseType, BTreeMap<u32, f64>> {
        &self.overrides
    }

    /// Drop overrides of one type (a removed stack)
    pub fn clear_type(&mut self, base: BaseType) {
        self.overrides.remove(&base);
    }

    pub fn clear(&mut self) {
        self.by_type.clear();
        self.overrides.clear();
    }
}

/// Stateless view combining config, catalogs and joint table
#[derive(Clone, Copy)]
pub struct HeightCalculator<'a> {
    config: &'a AssiseConfig,
    catalogs: &'a Catalogs,
    joints: &'a JointTable,
}

impl<'a> HeightCalculator<'a> {
    pub fn new(config: &'a AssiseConfig, catalogs: &'a Catalogs, joints: &'a JointTable) -> Self {
        HeightCalculator {
            config,
            catalogs,
            joints,
        }
    }

    /// Y of the lower face of course `index`
    pub fn compute_height(&self, base: BaseType, index: u32) -> f64 {
        let mut height = self.base_height(base);
        if index == 0 {
            return height;
        }
        let element = self.element_height(base);
        for i in 1..=index {
            height += element + self.join_term(base, i);
        }
        height
    }

    /// Joint height of one course: override, else type default
    pub fn joint_height(&self, base: BaseType, index: u32) -> f64 {
        self.joints
            .override_at(base, index)
            .unwrap_or_else(|| self.joints.type_default(self.config, base))
    }

    /// Height of the type's current default element
    ///
    /// Catalog selection first, then the static table, then the global
    /// default.
    pub fn element_height(&self, base: BaseType) -> f64 {
        self.catalog_height(base)
            .or_else(|| base.table_height())
            .unwrap_or(self.config.global_default_height)
    }

    fn base_height(&self, base: BaseType) -> f64 {
        match base.family() {
            TypeFamily::Slab | TypeFamily::Insulation => 0.0,
            TypeFamily::CellularConcrete => self.config.cellular_base_mortar,
            _ => self.joint_height(base, 0),
        }
    }

    fn join_term(&self, base: BaseType, index: u32) -> f64 {
        match base.family() {
            TypeFamily::Insulation => 0.0,
            TypeFamily::CellularConcrete => self.config.cellular_thin_bed,
            _ => self.joint_height(base, index),
        }
    }

    fn catalog_for(&self, base: BaseType) -> Option<&'a dyn DimensionProvider> {
        let provider = match base.family() {
            TypeFamily::Brick => self.catalogs.brick.as_ref(),
            TypeFamily::Block | TypeFamily::CellularConcrete => self.catalogs.block.as_ref(),
            TypeFamily::Insulation => self.catalogs.insulation.as_ref(),
            TypeFamily::Lintel => self.catalogs.lintel.as_ref(),
            _ => None,
        };
        provider.map(|p| p.as_ref())
    }

    /// Catalog height, only when the catalog's selection is this type
    fn catalog_height(&self, base: BaseType) -> Option<f64> {
        let provider = self.catalog_for(base)?;
        let height = provider
            .current_default_height()
            .filter(|h| h.is_finite() && *h > 0.0)?;
        if base.is_generic() {
            return Some(height);
        }
        let selected = provider.current_category()?;
        let code = selected
            .specific_code
            .as_deref()
            .unwrap_or(&selected.category);
        let selected_base = TypeKey::parse(code).ok()?.base;
        (selected_base == base).then_some(height)
    }
}
