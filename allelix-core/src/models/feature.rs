use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::attributes::AttributeBag;
use super::sequence_type::{REFERENCE_IDENTIFIER, SequenceType};

/// Strand orientation of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strand {
    #[default]
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    /// Parse from GFF3 column 7. "-" is reverse; everything else is forward.
    pub fn from_gff3(s: &str) -> Self {
        if s == "-" {
            Self::Reverse
        } else {
            Self::Forward
        }
    }

    pub fn is_reverse(self) -> bool {
        self == Self::Reverse
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
        }
    }
}

/// Sequence Ontology terms accepted for features, each on one level of a
/// four level hierarchy: region (0) > gene (1) > transcript (2) > CDS and
/// exon (3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SoTerm {
    #[serde(rename = "region")]
    Region,
    #[serde(rename = "gene")]
    Gene,
    #[serde(rename = "pseudogene")]
    Pseudogene,
    #[serde(rename = "mRNA")]
    MRna,
    #[serde(rename = "tRNA")]
    TRna,
    #[serde(rename = "rRNA")]
    RRna,
    #[serde(rename = "tmRNA")]
    TmRna,
    #[serde(rename = "ncRNA")]
    NcRna,
    #[serde(rename = "SRP_RNA")]
    SrpRna,
    #[serde(rename = "RNase_P_RNA")]
    RnasePRna,
    #[serde(rename = "CDS")]
    Cds,
    #[serde(rename = "exon")]
    Exon,
}

impl SoTerm {
    pub fn from_gff3(s: &str) -> Option<Self> {
        let term = match s {
            "region" => Self::Region,
            "gene" => Self::Gene,
            "pseudogene" => Self::Pseudogene,
            "mRNA" => Self::MRna,
            "tRNA" => Self::TRna,
            "rRNA" => Self::RRna,
            "tmRNA" => Self::TmRna,
            "ncRNA" => Self::NcRna,
            "SRP_RNA" => Self::SrpRna,
            "RNase_P_RNA" => Self::RnasePRna,
            "CDS" => Self::Cds,
            "exon" => Self::Exon,
            _ => return None,
        };
        Some(term)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Gene => "gene",
            Self::Pseudogene => "pseudogene",
            Self::MRna => "mRNA",
            Self::TRna => "tRNA",
            Self::RRna => "rRNA",
            Self::TmRna => "tmRNA",
            Self::NcRna => "ncRNA",
            Self::SrpRna => "SRP_RNA",
            Self::RnasePRna => "RNase_P_RNA",
            Self::Cds => "CDS",
            Self::Exon => "exon",
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Self::Region => 0,
            Self::Gene | Self::Pseudogene => 1,
            Self::MRna
            | Self::TRna
            | Self::RRna
            | Self::TmRna
            | Self::NcRna
            | Self::SrpRna
            | Self::RnasePRna => 2,
            Self::Cds | Self::Exon => 3,
        }
    }
}

impl fmt::Display for SoTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw feature as read from an annotation source, before it is validated
/// and merged into the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRecord {
    pub contig: String,
    pub so_term: String,
    pub start: u32,
    pub end: u32,
    pub strand: Strand,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    NonCoding,
    Coding {
        proteoforms: BTreeMap<String, SequenceType>,
    },
}

/// A named genomic region with its allele (and, if coding, proteoform)
/// catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub uid: String,
    pub contig: String,
    /// 1-based, inclusive.
    pub start: u32,
    /// 1-based, inclusive.
    pub end: u32,
    pub strand: Strand,
    pub so_term: SoTerm,
    pub children: BTreeMap<SoTerm, BTreeSet<(u32, u32)>>,
    pub alleles: BTreeMap<String, SequenceType>,
    pub kind: FeatureKind,
    #[serde(default)]
    pub attributes: AttributeBag,
}

impl Feature {
    pub fn new(
        name: &str,
        uid: &str,
        contig: &str,
        start: u32,
        end: u32,
        strand: Strand,
        so_term: SoTerm,
    ) -> Self {
        let reference = SequenceType::reference();
        Self {
            name: name.to_string(),
            uid: uid.to_string(),
            contig: contig.to_string(),
            start,
            end,
            strand,
            so_term,
            children: BTreeMap::new(),
            alleles: BTreeMap::from([(reference.uid.clone(), reference)]),
            kind: FeatureKind::NonCoding,
            attributes: AttributeBag::new(),
        }
    }

    pub fn contains(&self, position: u32) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn encloses(&self, start: u32, end: u32) -> bool {
        self.start <= start && end <= self.end
    }

    pub fn is_coding(&self) -> bool {
        matches!(self.kind, FeatureKind::Coding { .. })
    }

    pub fn is_reverse(&self) -> bool {
        self.strand.is_reverse()
    }

    pub fn add_child(&mut self, so_term: SoTerm, start: u32, end: u32) {
        self.children.entry(so_term).or_default().insert((start, end));
    }

    pub fn has_child(&self, so_term: SoTerm) -> bool {
        self.children.get(&so_term).is_some_and(|c| !c.is_empty())
    }

    /// Switch to the coding kind if a CDS child is known. The proteoform
    /// catalog is created with its reference entry; an existing catalog is
    /// kept.
    pub fn refresh_kind(&mut self) {
        if self.has_child(SoTerm::Cds) && !self.is_coding() {
            let reference = SequenceType::reference();
            self.kind = FeatureKind::Coding {
                proteoforms: BTreeMap::from([(reference.uid.clone(), reference)]),
            };
        }
    }

    pub fn allele(&self, uid: &str) -> Option<&SequenceType> {
        self.alleles.get(uid)
    }

    pub fn allele_mut(&mut self, uid: &str) -> Option<&mut SequenceType> {
        self.alleles.get_mut(uid)
    }

    pub fn reference_allele(&self) -> Option<&SequenceType> {
        self.alleles.get(REFERENCE_IDENTIFIER)
    }

    /// Get the allele with `uid`, creating it from `variants` if it does not
    /// exist yet.
    pub fn get_or_create_allele(
        &mut self,
        uid: &str,
        variants: BTreeMap<u32, String>,
    ) -> &mut SequenceType {
        self.alleles
            .entry(uid.to_string())
            .or_insert_with(|| SequenceType::new(uid, variants))
    }

    pub fn proteoforms(&self) -> Option<&BTreeMap<String, SequenceType>> {
        match &self.kind {
            FeatureKind::Coding { proteoforms } => Some(proteoforms),
            FeatureKind::NonCoding => None,
        }
    }

    pub fn proteoforms_mut(&mut self) -> Option<&mut BTreeMap<String, SequenceType>> {
        match &mut self.kind {
            FeatureKind::Coding { proteoforms } => Some(proteoforms),
            FeatureKind::NonCoding => None,
        }
    }

    pub fn proteoform(&self, uid: &str) -> Option<&SequenceType> {
        self.proteoforms()?.get(uid)
    }

    /// Same as [Feature::get_or_create_allele] for proteoforms. Returns `None`
    /// for non-coding features.
    pub fn get_or_create_proteoform(
        &mut self,
        uid: &str,
        variants: BTreeMap<u32, String>,
    ) -> Option<&mut SequenceType> {
        Some(
            self.proteoforms_mut()?
                .entry(uid.to_string())
                .or_insert_with(|| SequenceType::new(uid, variants)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("region", 0)]
    #[case("pseudogene", 1)]
    #[case("tmRNA", 2)]
    #[case("CDS", 3)]
    fn test_so_term_levels(#[case] raw: &str, #[case] level: u8) {
        let term = SoTerm::from_gff3(raw).unwrap();
        assert_eq!(term.level(), level);
        assert_eq!(term.as_str(), raw);
    }

    #[rstest]
    fn test_unsupported_so_term() {
        assert_eq!(SoTerm::from_gff3("repeat_region"), None);
    }

    #[rstest]
    fn test_coding_kind_follows_cds_child() {
        let mut feature = Feature::new("gyrA", "gyrA", "chr1", 10, 99, Strand::Forward, SoTerm::Gene);
        assert!(!feature.is_coding());
        assert!(feature.reference_allele().is_some());

        feature.add_child(SoTerm::Cds, 10, 99);
        feature.refresh_kind();
        assert!(feature.is_coding());
        assert!(feature.proteoform(REFERENCE_IDENTIFIER).is_some());
    }
}
