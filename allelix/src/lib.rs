//! # allelix
//!
//! Builds population-scale catalogs of canonical variants, alleles and
//! proteoforms from per-sample variant calls. Each part lives in its own
//! crate and is re-exported here behind a feature of the same name.
#[cfg(feature = "core")]
#[doc(inline)]
pub use allelix_core as core;

#[cfg(feature = "variants")]
#[doc(inline)]
pub use allelix_variants as variants;

#[cfg(feature = "seqtype")]
#[doc(inline)]
pub use allelix_seqtype as seqtype;

#[cfg(feature = "stats")]
#[doc(inline)]
pub use allelix_stats as stats;
