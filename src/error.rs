use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read artifact {path:?}")]
    ArtifactLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed artifact {path:?}")]
    ArtifactFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {artifact} artifact: {reason}")]
    InvalidArtifact {
        artifact: &'static str,
        reason: String,
    },
    #[error("schema mismatch: expected {expected} columns, found {found}")]
    SchemaMismatch { expected: usize, found: usize },
    #[error("feature name mismatch at position {position}: expected {expected:?}, found {found:?}")]
    FeatureNameMismatch {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("category column {column:?} is not part of the feature schema")]
    UnmappedCategory { column: String },
    #[error("numeric column {column:?} is not part of the feature schema")]
    UnmappedColumn { column: String },
    #[error("invalid value {value:?} for {field}")]
    InvalidInput { field: &'static str, value: String },
    #[error("classifier returned probability {0} outside [0, 1]")]
    InvalidProbability(f64),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
