use thiserror::Error;

use allelix_core::errors::StorageError;

#[derive(Error, Debug)]
pub enum VariantError {
    #[error("Invalid base content '{0}'")]
    InvalidAlphabet(String),

    #[error("Can't parse call record '{record}': {reason}")]
    CallParse { record: String, reason: String },

    #[error("Error reading reference: {0}")]
    Reference(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type VariantResult<T> = std::result::Result<T, VariantError>;
