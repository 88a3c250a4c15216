use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Variant is not in padded canonical form: {reference} > {alternative}")]
    NonCanonicalVariant {
        reference: String,
        alternative: String,
    },

    #[error("Unknown contig: {0}")]
    UnknownContig(String),

    #[error("Unknown sample: {0}")]
    UnknownSample(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Positions are 1-based, got position 0 on contig {0}")]
    InvalidPosition(String),

    #[error("Invalid sample information table {path:?}: {reason}")]
    InvalidSampleTable { path: PathBuf, reason: String },

    #[error("Can't parse storage document: {0}")]
    Document(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
