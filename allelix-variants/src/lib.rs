//! # allelix-variants
//!
//! Turns raw per-sample genotype observations into canonical variants:
//!
//! - [normalize] reduces a reference/alternative pair to substitutions,
//!   insertions and deletions in padded form, re-aligning mixed indels with
//!   [align].
//! - [calls] picks the best supported allele at a site and encodes it as a
//!   call record.
//! - [merge] walks each sample's calls in position order, joins overlapping
//!   indel evidence into maximal blocks and commits the result into the
//!   store.
//!
//! The remaining modules are the adapters to the outside world: reference
//! sequences, genotype sources (VCF), GFF3 features and variant annotation.
pub mod align;
pub mod annotation;
pub mod calls;
pub mod errors;
pub mod genotypes;
pub mod gff;
pub mod merge;
pub mod normalize;
pub mod reference;
pub mod vcf;

pub use self::calls::{AlleleObservation, CallConfidence, CallRecord, CallResolver};
pub use self::errors::{VariantError, VariantResult};
pub use self::normalize::{CanonicalVariant, normalize};
