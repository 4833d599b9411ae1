//! Assise crate - Course bookkeeping and height engine
//!
//! Tracks which building elements (bricks, blocks, insulation, lintels,
//! beams, slab units) belong to which horizontal course (assise), in one
//! independent stack per element type, and computes the height of every
//! course and the vertical position of every element.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  AssiseManager                          │
//! ├─────────────────────────────────────────────────────────┤
//! │  Placement                                              │
//! │  ├── Type/subtype resolution                            │
//! │  ├── Course membership and repositioning                │
//! │  ├── Joint overrides (re-entrancy guarded)              │
//! │  └── Joint re-sync, grids, snap markers                 │
//! ├─────────────────────────────────────────────────────────┤
//! │  HeightCalculator                                       │
//! │  └── (type, index) -> Y of the course's lower face      │
//! ├─────────────────────────────────────────────────────────┤
//! │  CourseRegistry                                         │
//! │  └── per type: courses, grids, markers, active course   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use assise::{
//!     AssiseConfig, AssiseManager, BaseType, Catalogs, Dimensions, Element, ElementKind,
//!     MemoryScene, TypeKey,
//! };
//!
//! let mut scene = MemoryScene::new();
//! scene.insert(Element::new("b1", ElementKind::Brick, Dimensions::new(22.0, 10.5, 6.5)));
//!
//! let mut manager = AssiseManager::new(scene, Catalogs::new(), AssiseConfig::default());
//! let (key, course) = manager.add_element("b1", Some(1)).unwrap();
//! assert_eq!(key.base, BaseType::M65);
//!
//! // 1.2 joint + 6.5 brick + 1.2 joint
//! let height = manager.height_of(&TypeKey::new(BaseType::M65), course);
//! assert!((height - 8.9).abs() < 1e-9);
//! ```

mod config;
mod element;
mod error;
mod events;
mod guard;
mod height;
mod joints;
mod manager;
mod overlay;
mod provider;
mod registry;
mod snapshot;
mod types;

pub use config::AssiseConfig;
pub use element::{BlockMaterial, Dimensions, Element, ElementId, ElementKind, META_MATERIAL};
pub use error::{Error, Result};
pub use events::{AssiseEvent, MembershipChange};
pub use guard::{RepositionGuard, RepositionToken};
pub use height::{HeightCalculator, JointTable};
pub use manager::AssiseManager;
pub use overlay::{build_markers, GridExtents, GridHelper, SnapMarker};
pub use provider::{
    Catalogs, CategoryMetadata, DimensionProvider, JointSettings, MemoryScene, SceneProvider,
    StaticCatalog, ToolSettingsProvider,
};
pub use registry::{Course, CourseRegistry, TypeStack};
pub use snapshot::{supported_types, CourseRecord, Snapshot};
pub use types::{BaseType, CustomDims, Fraction, TypeFamily, TypeKey};

// Re-export glam for convenience
pub use glam;
