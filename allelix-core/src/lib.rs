//! # allelix-core
//!
//! Shared data model for allelix. It holds the reference contigs with their
//! canonical variant index, the genomic features with their allele and
//! proteoform catalogs, and the per-sample call records.
//!
//! Everything that mutates the variant index goes through [storage::Storage],
//! which is the single writer for commits.
pub mod config;
pub mod errors;
pub mod models;
pub mod sequence;
pub mod storage;
pub mod utils;

pub mod consts {
    /// Attribute key prefix for annotations imported from SnpEff.
    pub const SNPEFF_PREFIX: &str = "snpeff_";

    pub const SEQUENCE_LENGTH_DEVIATION: &str = "sequence_length_deviation";
    pub const SO_EFFECTS: &str = "so_effects";
    pub const PROTEOFORM: &str = "proteoform";
    pub const DISRUPTED: &str = "disrupted";
    pub const VARIABLE_POSITIONS: &str = "variable_positions";
    pub const CLUSTER_LABEL: &str = "cluster_label";
    pub const CLUSTER_INDEX: &str = "cluster_index";
    pub const CLUSTER_OUTLIER_SCORE: &str = "cluster_outlier_score";

    pub const FREQUENCY: &str = "variant_frequency";
    pub const ALLELIC_FREQUENCY: &str = "allelic_frequency";
    pub const REFERENCE_FREQUENCY: &str = "reference_frequency";
    pub const NUMBER_OF_ALLELES: &str = "number_of_alleles";
    pub const NUMBER_OF_PROTEOFORMS: &str = "number_of_proteoforms";
    pub const PRODUCT_DISRUPTED_FREQUENCY: &str = "product_disrupted_frequency";
    pub const PRODUCT_MODIFIED_FREQUENCY: &str = "product_modified_frequency";
    pub const PROTEOFORM_DISRUPTED_FREQUENCY: &str = "proteoform_disrupted_frequency";
    pub const PROTEOFORM_MODIFIED_FREQUENCY: &str = "proteoform_modified_frequency";
    pub const NUMBER_OF_CALLS: &str = "number_of_calls";
    pub const NUMBER_OF_FILTERED_CALLS: &str = "number_of_filtered_calls";
    pub const MEAN_COVERAGE: &str = "mean_coverage";
    pub const MEAN_QUALITY: &str = "mean_quality";
    pub const NUMBER_OF_SUBSTITUTIONS: &str = "number_of_substitutions";
    pub const NUMBER_OF_INDELS: &str = "number_of_indels";

    /// SO terms written into allele and proteoform effect lists.
    pub const START_LOST: &str = "start_lost";
    pub const STOP_GAINED: &str = "stop_gained";
    pub const REDUNDANT_STOP_GAINED: &str = "redundant_inserted_stop_gained";
    pub const AMINO_ACID_INSERTION: &str = "amino_acid_insertion";
    pub const AMINO_ACID_DELETION: &str = "amino_acid_deletion";
    pub const FRAMESHIFT: &str = "frameshift_sequence_variation";
}
