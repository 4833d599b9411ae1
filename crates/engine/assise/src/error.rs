//! Error types for the assise crate

use crate::BaseType;
use thiserror::Error;

/// Result type alias for assise operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in course bookkeeping
#[derive(Debug, Error)]
pub enum Error {
    /// Type string matches no base type, cut suffix or custom tag
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Explicit operation on a course that does not exist
    #[error("Course {index} does not exist for type {base}")]
    CourseNotFound { base: BaseType, index: u32 },

    /// Element not known to the scene or not tracked in any course
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Caller declined removal of a course holding elements
    #[error("Removal of course {index} ({base}) declined with {elements} element(s) inside")]
    RemovalDeclined {
        base: BaseType,
        index: u32,
        elements: usize,
    },

    /// Snapshot (de)serialization failure
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Configuration parse failure
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
