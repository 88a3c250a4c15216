//! # allelix-seqtype
//!
//! Groups the variants of every sample and feature into sequence types:
//! nucleotide level alleles and, for coding features, amino acid level
//! proteoforms. Identical variant lists share one identifier, see
//! [digest]. Sequence types of a feature can be grouped further with a
//! [cluster::ClusteringService].
pub mod aggregate;
pub mod cluster;
pub mod digest;
pub mod errors;
pub mod integrate;
pub mod proteoform;
pub mod translate;

pub use self::aggregate::update_sequence_types;
pub use self::cluster::{ClusteringService, LinkageClustering, apply_clustering};
pub use self::digest::{IDENTIFIER_SCHEME, sequence_type_identifier};
pub use self::errors::{SequenceTypeError, SequenceTypeResult};
