//! Scene elements as seen by the course engine
//!
//! Elements are owned by the scene; the engine only reads them and writes
//! their vertical position.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a scene element
pub type ElementId = String;

/// Metadata key carrying a free-form material tag (e.g. `"cellular"`)
pub const META_MATERIAL: &str = "material";

/// Block material, when the scene knows it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockMaterial {
    HollowConcrete,
    CellularConcrete,
    Terracotta,
}

/// Category of an element, with only the fields each category needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementKind {
    Brick,
    Block {
        material: Option<BlockMaterial>,
    },
    Insulation,
    Lintel,
    Beam,
    /// Floor-slab unit, usually loaded from a model file
    Slab {
        variant: Option<String>,
    },
    /// Vertical (head) joint; remembers the masonry height it was cut for
    JointVertical {
        reference_height: Option<f64>,
    },
    /// Horizontal (bed) joint
    JointHorizontal {
        reference_height: Option<f64>,
    },
    Custom,
}

impl ElementKind {
    pub fn is_joint(&self) -> bool {
        matches!(
            self,
            ElementKind::JointVertical { .. } | ElementKind::JointHorizontal { .. }
        )
    }

    pub fn is_beam(&self) -> bool {
        matches!(self, ElementKind::Beam)
    }

    /// Cached masonry height of a joint, if one was recorded
    pub fn reference_height(&self) -> Option<f64> {
        match self {
            ElementKind::JointVertical { reference_height }
            | ElementKind::JointHorizontal { reference_height } => *reference_height,
            _ => None,
        }
    }
}

/// Element size in its local frame (cm): length along X, width along Z
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }
}

/// Snapshot of a scene element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    /// Type string chosen by the placing tool (`"M65_HALF"`, `"SLAB_13"`, ...)
    pub type_name: Option<String>,
    pub dimensions: Dimensions,
    /// Centre of the element's bounding box
    pub position: DVec3,
    /// Rotation about the vertical axis
    pub rotation: f64,
    /// Open-ended hints from the placing tool
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Element {
    pub fn new(id: impl Into<ElementId>, kind: ElementKind, dimensions: Dimensions) -> Self {
        Element {
            id: id.into(),
            kind,
            type_name: None,
            dimensions,
            position: DVec3::ZERO,
            rotation: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_position(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn height(&self) -> f64 {
        self.dimensions.height
    }

    /// Y of the top face
    pub fn top(&self) -> f64 {
        self.position.y + self.dimensions.height / 2.0
    }

    /// Y of the bottom face
    pub fn bottom(&self) -> f64 {
        self.position.y - self.dimensions.height / 2.0
    }

    /// Cellular concrete block, either by material or by tag
    pub fn is_cellular(&self) -> bool {
        match &self.kind {
            ElementKind::Block {
                material: Some(BlockMaterial::CellularConcrete),
            } => true,
            ElementKind::Block { .. } => self
                .metadata
                .get(META_MATERIAL)
                .is_some_and(|m| m.eq_ignore_ascii_case("cellular")),
            _ => false,
        }
    }

    /// Corners of the top face, rotated about the element centre
    pub fn top_corners(&self) -> [DVec3; 4] {
        let (sin, cos) = self.rotation.sin_cos();
        let hl = self.dimensions.length / 2.0;
        let hw = self.dimensions.width / 2.0;
        let top = self.top();
        [(-hl, -hw), (hl, -hw), (hl, hw), (-hl, hw)].map(|(lx, lz)| {
            DVec3::new(
                self.position.x + lx * cos + lz * sin,
                top,
                self.position.z - lx * sin + lz * cos,
            )
        })
    }

    /// Planar (XZ) distance between two element centres
    pub fn planar_distance(&self, other: &Element) -> f64 {
        let a = self.position;
        let b = other.position;
        ((a.x - b.x).powi(2) + (a.z - b.z).powi(2)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faces() {
        let brick = Element::new("b", ElementKind::Brick, Dimensions::new(22.0, 10.5, 6.5))
            .with_position(DVec3::new(0.0, 10.0, 0.0));
        assert!((brick.top() - 13.25).abs() < 1e-9);
        assert!((brick.bottom() - 6.75).abs() < 1e-9);
    }

    #[test]
    fn test_cellular_detection() {
        let tagged = Element::new(
            "a",
            ElementKind::Block { material: None },
            Dimensions::new(60.0, 20.0, 25.0),
        )
        .with_metadata(META_MATERIAL, "Cellular");
        assert!(tagged.is_cellular());

        let typed = Element::new(
            "b",
            ElementKind::Block {
                material: Some(BlockMaterial::CellularConcrete),
            },
            Dimensions::new(60.0, 20.0, 25.0),
        );
        assert!(typed.is_cellular());

        let hollow = Element::new(
            "c",
            ElementKind::Block {
                material: Some(BlockMaterial::HollowConcrete),
            },
            Dimensions::new(39.0, 14.0, 19.0),
        );
        assert!(!hollow.is_cellular());
    }

    #[test]
    fn test_rotated_corners() {
        let brick = Element::new("b", ElementKind::Brick, Dimensions::new(20.0, 10.0, 5.0))
            .with_rotation(std::f64::consts::FRAC_PI_2);
        let corners = brick.top_corners();
        // Quarter turn swaps the footprint axes
        let max_x = corners.iter().map(|c| c.x).fold(f64::MIN, f64::max);
        let max_z = corners.iter().map(|c| c.z).fold(f64::MIN, f64::max);
        assert!((max_x - 5.0).abs() < 1e-9);
        assert!((max_z - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_joint_reference() {
        let kind = ElementKind::JointVertical {
            reference_height: Some(6.5),
        };
        assert!(kind.is_joint());
        assert_eq!(kind.reference_height(), Some(6.5));
        assert_eq!(ElementKind::Brick.reference_height(), None);
    }
}
