use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use super::attributes::AttributeBag;
use crate::sequence::GAP;

/// Shape of a canonical variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantType {
    Substitution,
    Insertion,
    Deletion,
}

impl VariantType {
    /// Classify a pair in padded canonical form.
    ///
    /// Both sides must have the same length. A substitution is a single
    /// differing base. An insertion carries its gaps on the reference side
    /// (`A---` > `ACGT`), a deletion on the alternative side (`ATG` > `A--`).
    /// The anchor base may differ between both sides.
    ///
    /// Returns `None` for anything that is not padded canonical.
    pub fn of_padded(reference: &str, alternative: &str) -> Option<Self> {
        let r = reference.as_bytes();
        let a = alternative.as_bytes();
        if r.is_empty() || r.len() != a.len() {
            return None;
        }
        let gap = GAP as u8;
        if r[0] == gap || a[0] == gap {
            return None;
        }
        if r.len() == 1 {
            return (r[0] != a[0]).then_some(VariantType::Substitution);
        }
        let ref_tail_gapped = r[1..].iter().all(|c| *c == gap);
        let alt_tail_gapped = a[1..].iter().all(|c| *c == gap);
        let ref_tail_filled = r[1..].iter().all(|c| *c != gap);
        let alt_tail_filled = a[1..].iter().all(|c| *c != gap);
        match (ref_tail_gapped, alt_tail_gapped) {
            (true, false) if alt_tail_filled => Some(VariantType::Insertion),
            (false, true) if ref_tail_filled => Some(VariantType::Deletion),
            _ => None,
        }
    }

    /// Classify a pair in un-padded canonical form, as it is written in VCF
    /// records (`A` > `ACGT`, `ATG` > `A`).
    pub fn of_unpadded(reference: &str, alternative: &str) -> Option<Self> {
        if reference.contains(GAP) || alternative.contains(GAP) {
            return None;
        }
        match (reference.len(), alternative.len()) {
            (1, 1) if reference != alternative => Some(VariantType::Substitution),
            (1, n) if n > 1 => Some(VariantType::Insertion),
            (n, 1) if n > 1 => Some(VariantType::Deletion),
            _ => None,
        }
    }

    pub fn is_indel(&self) -> bool {
        !matches!(self, VariantType::Substitution)
    }
}

impl Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VariantType::Substitution => "substitution",
            VariantType::Insertion => "insertion",
            VariantType::Deletion => "deletion",
        };
        write!(f, "{label}")
    }
}

pub fn is_padded_canonical(reference: &str, alternative: &str) -> bool {
    VariantType::of_padded(reference, alternative).is_some()
}

/// Composite key of the per-contig variant index: 1-based position and
/// padded alternative content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub position: u32,
    pub alternative: String,
}

impl VariantKey {
    pub fn new(position: u32, alternative: &str) -> Self {
        Self {
            position,
            alternative: alternative.to_string(),
        }
    }
}

impl Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.position, self.alternative)
    }
}

/// One canonical variant at a (contig, position, alternative) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantInformation {
    /// Padded reference content.
    pub reference: String,
    pub variant_type: VariantType,
    /// Samples carrying the variant.
    pub samples: BTreeSet<String>,
    /// Overlapping features, each with the allele and proteoform
    /// identifiers the variant is part of.
    pub features: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub attributes: AttributeBag,
}

impl VariantInformation {
    pub fn new(reference: &str, variant_type: VariantType) -> Self {
        Self {
            reference: reference.to_string(),
            variant_type,
            samples: BTreeSet::new(),
            features: BTreeMap::new(),
            attributes: AttributeBag::new(),
        }
    }

    /// Returns `true` if the sample was not registered before.
    pub fn add_sample_occurrence(&mut self, sample: &str) -> bool {
        self.samples.insert(sample.to_string())
    }

    pub fn add_feature_occurrence(&mut self, feature: &str) {
        self.features.entry(feature.to_string()).or_default();
    }

    pub fn add_sequence_type_occurrence(&mut self, feature: &str, uid: &str) {
        self.features
            .entry(feature.to_string())
            .or_default()
            .insert(uid.to_string());
    }

    pub fn remove_sequence_type_occurrence(&mut self, feature: &str, uid: &str) {
        if let Some(uids) = self.features.get_mut(feature) {
            uids.remove(uid);
        }
    }

    pub fn has_sample(&self, sample: &str) -> bool {
        self.samples.contains(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("A", "G", Some(VariantType::Substitution))]
    #[case("A---", "ACGT", Some(VariantType::Insertion))]
    #[case("ATG", "A--", Some(VariantType::Deletion))]
    #[case("G---", "ACGT", Some(VariantType::Insertion))]
    #[case("A", "A", None)]
    #[case("A", "ACGT", None)]
    #[case("AT-G", "A-CG", None)]
    #[case("ATG", "GTC", None)]
    #[case("-A", "CA", None)]
    fn test_of_padded(
        #[case] reference: &str,
        #[case] alternative: &str,
        #[case] expected: Option<VariantType>,
    ) {
        assert_eq!(VariantType::of_padded(reference, alternative), expected);
    }

    #[rstest]
    #[case("A", "G", Some(VariantType::Substitution))]
    #[case("A", "ACGT", Some(VariantType::Insertion))]
    #[case("ATG", "A", Some(VariantType::Deletion))]
    #[case("ATG", "GC", None)]
    #[case("A---", "ACGT", None)]
    fn test_of_unpadded(
        #[case] reference: &str,
        #[case] alternative: &str,
        #[case] expected: Option<VariantType>,
    ) {
        assert_eq!(VariantType::of_unpadded(reference, alternative), expected);
    }

    #[rstest]
    fn test_variant_key_ordering() {
        let mut keys = vec![
            VariantKey::new(12, "A"),
            VariantKey::new(3, "T"),
            VariantKey::new(12, "A--"),
        ];
        keys.sort();
        assert_eq!(keys[0], VariantKey::new(3, "T"));
        assert_eq!(keys[1], VariantKey::new(12, "A"));
        assert_eq!(keys[2].to_string(), "12A--");
    }
}
