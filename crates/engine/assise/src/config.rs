//! Course engine configuration
//!
//! Every field has a default, so a partial (or empty) TOML file is valid:
//!
//! ```toml
//! default_joint_height = 1.0
//!
//! [joint_height_by_type]
//! M50 = 0.8
//! ```

use crate::{BaseType, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Tunable constants of the height calculator and placement coordinator (cm)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssiseConfig {
    /// Joint height applied to any type without its own default
    pub default_joint_height: f64,
    /// Per-type default joint heights, keyed by base type
    pub joint_height_by_type: BTreeMap<BaseType, f64>,
    /// Element height used when neither catalog nor table knows the type
    pub global_default_height: f64,
    /// Mortar bed under the first course of cellular concrete
    pub cellular_base_mortar: f64,
    /// Thin-bed glue joint between cellular concrete courses
    pub cellular_thin_bed: f64,
    /// Floor for malformed joint heights
    pub min_joint_height: f64,
    /// Two heights closer than this are the same height
    pub height_epsilon: f64,
    /// Match tolerance when detecting a brick subtype from element height
    pub brick_detection_tolerance: f64,
    /// Planar search radius when anchoring a vertical joint to its element
    pub joint_search_radius: f64,
    /// Plausible range for an inferred joint reference height
    pub reference_height_min: f64,
    pub reference_height_max: f64,
    /// Margin added around the scene footprint for course grids
    pub grid_margin: f64,
    /// Grid extents are rounded up to a multiple of this
    pub grid_step: f64,
    /// Snap markers closer than this to an existing marker are dropped
    pub marker_merge_distance: f64,
    /// Show course grids automatically on first placement
    pub auto_show_grids: bool,
}

impl Default for AssiseConfig {
    fn default() -> Self {
        Self {
            default_joint_height: 1.2,
            joint_height_by_type: BTreeMap::new(),
            global_default_height: 6.5,
            cellular_base_mortar: 1.2,
            cellular_thin_bed: 0.1,
            min_joint_height: 0.1,
            height_epsilon: 0.001,
            brick_detection_tolerance: 0.1,
            joint_search_radius: 50.0,
            reference_height_min: 4.0,
            reference_height_max: 30.0,
            grid_margin: 50.0,
            grid_step: 10.0,
            marker_merge_distance: 1.0,
            auto_show_grids: true,
        }
    }
}

impl AssiseConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        Ok(config.sanitized())
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Replace heights that would break the course stack with usable values
    pub(crate) fn sanitized(mut self) -> Self {
        let fallback = Self::default();
        if !(self.min_joint_height.is_finite() && self.min_joint_height > 0.0) {
            tracing::warn!(
                "Invalid min_joint_height {}, using {}",
                self.min_joint_height,
                fallback.min_joint_height
            );
            self.min_joint_height = fallback.min_joint_height;
        }
        if !(self.global_default_height.is_finite() && self.global_default_height > 0.0) {
            tracing::warn!(
                "Invalid global_default_height {}, using {}",
                self.global_default_height,
                fallback.global_default_height
            );
            self.global_default_height = fallback.global_default_height;
        }
        for value in [&mut self.cellular_base_mortar, &mut self.cellular_thin_bed] {
            if !(value.is_finite() && *value >= 0.0) {
                tracing::warn!("Invalid cellular joint {}, using 0", value);
                *value = 0.0;
            }
        }

        let default_joint = self.sanitize_joint(self.default_joint_height);
        if default_joint != self.default_joint_height {
            tracing::warn!(
                "Invalid default_joint_height {}, clamped to {}",
                self.default_joint_height,
                default_joint
            );
        }
        self.default_joint_height = default_joint;
        let min = self.min_joint_height;
        for (base, height) in self.joint_height_by_type.iter_mut() {
            if !(height.is_finite() && *height >= min) {
                tracing::warn!("Invalid joint height {} for {}, clamped", height, base);
                *height = if height.is_finite() { height.max(min) } else { min };
            }
        }
        self
    }

    /// Default joint height for a type, before per-course overrides
    pub fn default_joint_for(&self, base: BaseType) -> f64 {
        if base.is_jointless() {
            return 0.0;
        }
        let height = self
            .joint_height_by_type
            .get(&base)
            .copied()
            .unwrap_or(self.default_joint_height);
        self.sanitize_joint(height)
    }

    /// Clamp a joint height coming from outside to a usable value
    pub fn sanitize_joint(&self, height: f64) -> f64 {
        if height.is_finite() {
            height.max(self.min_joint_height)
        } else {
            self.min_joint_height
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AssiseConfig::default();
        assert_eq!(config.default_joint_height, 1.2);
        assert_eq!(config.global_default_height, 6.5);
        assert!(config.auto_show_grids);
    }

    #[test]
    fn test_partial_toml() {
        let config = AssiseConfig::from_toml_str(
            "default_joint_height = 1.0\n\n[joint_height_by_type]\nM50 = 0.8\n",
        )
        .unwrap();
        assert_eq!(config.default_joint_for(BaseType::M50), 0.8);
        assert_eq!(config.default_joint_for(BaseType::M65), 1.0);
        assert_eq!(config.grid_step, 10.0);
    }

    #[test]
    fn test_jointless_types_ignore_configured_default() {
        let mut config = AssiseConfig::default();
        config.joint_height_by_type.insert(BaseType::Insulation, 2.0);
        assert_eq!(config.default_joint_for(BaseType::Insulation), 0.0);
        assert_eq!(config.default_joint_for(BaseType::Membrane), 0.0);
    }

    #[test]
    fn test_sanitize_joint() {
        let config = AssiseConfig::default();
        assert_eq!(config.sanitize_joint(f64::NAN), 0.1);
        assert_eq!(config.sanitize_joint(-3.0), 0.1);
        assert_eq!(config.sanitize_joint(1.5), 1.5);
    }

    #[test]
    fn test_nan_and_negative_joints_clamped() {
        let config = AssiseConfig::from_toml_str("default_joint_height = nan").unwrap();
        assert_eq!(config.default_joint_height, 0.1);
        assert_eq!(config.default_joint_for(BaseType::M65), 0.1);

        let config = AssiseConfig::from_toml_str(
            "default_joint_height = -10.0\n\n[joint_height_by_type]\nM50 = nan\nM57 = -2.0\n",
        )
        .unwrap();
        assert_eq!(config.default_joint_for(BaseType::M65), 0.1);
        assert_eq!(config.default_joint_for(BaseType::M50), 0.1);
        assert_eq!(config.default_joint_for(BaseType::M57), 0.1);
    }

    #[test]
    fn test_invalid_global_height_falls_back() {
        let config = AssiseConfig::from_toml_str("global_default_height = -4.0").unwrap();
        assert_eq!(config.global_default_height, 6.5);
        let config = AssiseConfig::from_toml_str("global_default_height = nan").unwrap();
        assert_eq!(config.global_default_height, 6.5);
        let config = AssiseConfig::from_toml_str("min_joint_height = 0.0").unwrap();
        assert_eq!(config.min_joint_height, 0.1);
    }

    #[test]
    fn test_default_joint_for_clamps_code_built_config() {
        let config = AssiseConfig {
            default_joint_height: f64::NAN,
            ..AssiseConfig::default()
        };
        assert_eq!(config.default_joint_for(BaseType::M65), 0.1);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AssiseConfig::from_toml_str("default_joint_height = \"x\"").is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = AssiseConfig::load("/nonexistent/assise.toml");
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
