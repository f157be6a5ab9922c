//! Error taxonomy shared by every stage of a sweep.
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SweepError>;

#[derive(Debug, Error)]
pub enum SweepError {
    /// Malformed catalog, scenario, location or results text.
    #[error("{source_name}:{line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    /// Scenario index out of range or category-count mismatch.
    #[error("invalid scenario catalog: {0}")]
    Validation(String),

    #[error("no \"rating curve\" line found in geometry template {}", .0.display())]
    AnchorNotFound(PathBuf),

    #[error("location {location:?} has no {element_set} to reduce")]
    EmptyLocation {
        location: String,
        element_set: &'static str,
    },

    #[error("baseline value for column {column:?} is zero")]
    DivideByZero { column: String },

    #[error("simulation engine failed: {0}")]
    Engine(String),

    #[error("no value for location {location:?} in scenario {scenario:?}")]
    MissingCell { location: String, scenario: String },

    #[error("{} already occupies the active terrain slot", .0.display())]
    TerrainSlotOccupied(PathBuf),

    #[error("{channel} has {width} elements, location {location:?} references element {element}")]
    ElementOutOfRange {
        channel: &'static str,
        location: String,
        element: usize,
        width: usize,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SweepError {
    pub(crate) fn parse(source_name: &str, line: usize, message: impl Into<String>) -> Self {
        SweepError::Parse {
            source_name: source_name.to_string(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SweepError::Io { path: path.into(), source }
    }
}
