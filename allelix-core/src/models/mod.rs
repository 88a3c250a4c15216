pub mod attributes;
pub mod contig;
pub mod feature;
pub mod sample;
pub mod sequence_type;
pub mod variant;

// re-export for cleaner imports
pub use self::attributes::AttributeBag;
pub use self::contig::Contig;
pub use self::feature::{Feature, FeatureKind, FeatureRecord, SoTerm, Strand};
pub use self::sample::Sample;
pub use self::sequence_type::{REFERENCE_IDENTIFIER, SequenceType};
pub use self::variant::{VariantInformation, VariantKey, VariantType};
