use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::attributes::AttributeBag;

/// Identifier of the sequence type without any variant.
pub const REFERENCE_IDENTIFIER: &str = "reference";

/// An allele (nucleotide level) or proteoform (amino acid level) of a
/// feature: the set of variants that, applied to the feature's reference,
/// spell out one distinct sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceType {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Position (1-based; contig coordinates for alleles, protein coordinates
    /// for proteoforms) to padded content.
    pub variants: BTreeMap<u32, String>,
    /// Samples sharing this sequence type.
    pub occurrence: BTreeSet<String>,
    #[serde(default)]
    pub attributes: AttributeBag,
}

impl SequenceType {
    pub fn new(uid: &str, variants: BTreeMap<u32, String>) -> Self {
        Self {
            uid: uid.to_string(),
            name: None,
            variants,
            occurrence: BTreeSet::new(),
            attributes: AttributeBag::new(),
        }
    }

    pub fn reference() -> Self {
        Self::new(REFERENCE_IDENTIFIER, BTreeMap::new())
    }

    pub fn is_reference(&self) -> bool {
        self.uid == REFERENCE_IDENTIFIER
    }

    /// Canonical text form of the variant list: `{position}{content}`
    /// entries joined by `.`, in position order.
    pub fn variants_as_string(&self) -> String {
        variants_as_string(&self.variants)
    }

    pub fn add_occurrence(&mut self, sample: &str) {
        self.occurrence.insert(sample.to_string());
    }

    pub fn remove_occurrence(&mut self, sample: &str) -> bool {
        self.occurrence.remove(sample)
    }
}

pub fn variants_as_string(variants: &BTreeMap<u32, String>) -> String {
    variants
        .iter()
        .map(|(position, content)| format!("{position}{content}"))
        .collect::<Vec<_>>()
        .join(".")
}
