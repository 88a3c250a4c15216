use thiserror::Error;

use allelix_core::errors::StorageError;
use allelix_variants::VariantError;

#[derive(Error, Debug)]
pub enum SequenceTypeError {
    #[error("Contig {0} has no sequence, proteoforms can't be inferred")]
    MissingSequence(String),

    #[error("Feature {feature} lies outside of contig {contig}")]
    FeatureOutOfBounds { feature: String, contig: String },

    #[error(transparent)]
    Variant(#[from] VariantError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type SequenceTypeResult<T> = std::result::Result<T, SequenceTypeError>;
