//! # allelix-stats
//!
//! Summary statistics of a variant store. [StorageStatistics] is
//! implemented for [allelix_core::storage::Storage] and writes its results
//! into the attribute maps of samples, variants, sequence types and
//! features. Variant identities and occurrence sets are never touched.
pub mod format;
pub mod statistics;

pub use self::statistics::StorageStatistics;
