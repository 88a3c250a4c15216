//! Proteoform inference for coding features.
use std::collections::{BTreeMap, BTreeSet};

use allelix_core::consts::{
    AMINO_ACID_DELETION, AMINO_ACID_INSERTION, DISRUPTED, FRAMESHIFT, REDUNDANT_STOP_GAINED,
    SEQUENCE_LENGTH_DEVIATION, SO_EFFECTS, START_LOST, STOP_GAINED, VARIABLE_POSITIONS,
};
use allelix_core::models::{Contig, Feature, REFERENCE_IDENTIFIER, VariantType};
use allelix_core::sequence::reverse_complement;
use allelix_variants::align::{Scoring, global_alignment};
use allelix_variants::normalize::decompose_aligned;
use log::debug;

use crate::digest::sequence_type_identifier;
use crate::errors::{SequenceTypeError, SequenceTypeResult};
use crate::integrate::{integrate_variants, total_length_deviation};
use crate::translate::{CodonTable, STOP};

/// The proteoform an allele translates to.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteoformInference {
    pub uid: String,
    /// Protein position (1-based) to padded amino acid content.
    pub variants: BTreeMap<u32, String>,
    pub attributes: Vec<(&'static str, String)>,
}

impl ProteoformInference {
    fn reference() -> Self {
        Self {
            uid: REFERENCE_IDENTIFIER.to_string(),
            variants: BTreeMap::new(),
            attributes: Vec::new(),
        }
    }

    pub fn is_reference(&self) -> bool {
        self.uid == REFERENCE_IDENTIFIER
    }
}

/// Reference sequence and translation of one coding feature.
pub struct ProteinContext {
    start: u32,
    reverse: bool,
    sequence: String,
    reference_protein: String,
    table: CodonTable,
}

impl ProteinContext {
    pub fn new(feature: &Feature, contig: &Contig) -> SequenceTypeResult<Self> {
        if contig.sequence.is_none() {
            return Err(SequenceTypeError::MissingSequence(contig.name.clone()));
        }
        let sequence = contig
            .subsequence(feature.start, feature.end)
            .ok_or_else(|| SequenceTypeError::FeatureOutOfBounds {
                feature: feature.name.clone(),
                contig: contig.name.clone(),
            })?
            .to_string();
        let table = CodonTable::standard();
        let reference_protein = if feature.is_reverse() {
            table.translate(&reverse_complement(&sequence))
        } else {
            table.translate(&sequence)
        };
        Ok(Self {
            start: feature.start,
            reverse: feature.is_reverse(),
            sequence,
            reference_protein,
            table,
        })
    }

    pub fn reference_protein(&self) -> &str {
        &self.reference_protein
    }

    /// Translate the feature with the allele `variants` applied.
    pub fn translate(&self, variants: &BTreeMap<u32, String>) -> String {
        let coding = integrate_variants(&self.sequence, self.start, variants);
        if self.reverse {
            self.table.translate(&reverse_complement(&coding))
        } else {
            self.table.translate(&coding)
        }
    }

    /// Infer the proteoform of an allele. Alleles translating to the
    /// reference protein map to the reference proteoform; otherwise both
    /// proteins are aligned and the amino acid variants identify the
    /// proteoform.
    pub fn infer(&self, variants: &BTreeMap<u32, String>) -> ProteoformInference {
        let protein = self.translate(variants);
        if protein == self.reference_protein {
            return ProteoformInference::reference();
        }

        let alignment = global_alignment(&self.reference_protein, &protein, &Scoring::protein());
        let amino_acid_variants = decompose_aligned(&alignment.reference, &alignment.alternative);
        if amino_acid_variants.is_empty() {
            debug!("Translation differs without amino acid variants, using the reference");
            return ProteoformInference::reference();
        }

        let mut effects = BTreeSet::new();
        if total_length_deviation(variants) % 3 != 0 {
            effects.insert(FRAMESHIFT);
        }
        for variant in &amino_acid_variants {
            match variant.variant_type() {
                Some(VariantType::Insertion) => {
                    effects.insert(AMINO_ACID_INSERTION);
                }
                Some(VariantType::Deletion) => {
                    effects.insert(AMINO_ACID_DELETION);
                }
                _ => {}
            }
        }
        if protein.as_bytes().first() != self.reference_protein.as_bytes().first() {
            effects.insert(START_LOST);
        }

        let reference_length = self.reference_protein.len() as u32;
        let first_stop = |protein: &str| protein.bytes().position(|aa| aa == STOP).map(|i| i as u32 + 1);
        let mut cutoff = u32::MAX;
        if let Some(stop) = first_stop(&protein) {
            if Some(stop) != first_stop(&self.reference_protein) {
                if stop <= reference_length {
                    effects.insert(STOP_GAINED);
                    cutoff = stop;
                } else {
                    effects.insert(REDUNDANT_STOP_GAINED);
                }
            }
        }

        let amino_acid_variants: BTreeMap<u32, (String, usize)> = amino_acid_variants
            .into_iter()
            .map(|v| (v.offset + 1, (v.alternative.clone(), v.length())))
            .collect();
        let variable: usize = amino_acid_variants
            .iter()
            .filter(|(position, _)| **position <= cutoff)
            .map(|(_, (_, length))| *length)
            .sum();
        let variable_positions = if reference_length == 0 {
            0.0
        } else {
            variable as f64 / reference_length as f64 * 100.0
        };

        let variants: BTreeMap<u32, String> = amino_acid_variants
            .into_iter()
            .map(|(position, (content, _))| (position, content))
            .collect();
        let disrupted = effects.contains(START_LOST) || effects.contains(STOP_GAINED);
        let mut attributes = vec![
            (
                SEQUENCE_LENGTH_DEVIATION,
                total_length_deviation(&variants).to_string(),
            ),
            (VARIABLE_POSITIONS, format!("{variable_positions:.2}")),
        ];
        if !effects.is_empty() {
            attributes.push((SO_EFFECTS, effects.into_iter().collect::<Vec<_>>().join(",")));
        }
        if disrupted {
            attributes.push((DISRUPTED, "true".to_string()));
        }

        ProteoformInference {
            uid: sequence_type_identifier(&variants),
            variants,
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allelix_core::models::{SoTerm, Strand};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    // ATG GCA TGC AAA TAA = M A C K *
    const ORF: &str = "ATGGCATGCAAATAA";

    #[fixture]
    fn contig() -> Contig {
        Contig::new("chr1", Some(format!("CC{ORF}GG")))
    }

    fn feature(strand: Strand) -> Feature {
        Feature::new("orf1", "orf1", "chr1", 3, 17, strand, SoTerm::Gene)
    }

    fn variants(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
        entries.iter().map(|(p, c)| (*p, c.to_string())).collect()
    }

    fn attribute<'a>(inference: &'a ProteoformInference, key: &str) -> Option<&'a str> {
        inference
            .attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[rstest]
    fn test_reference_translation(contig: Contig) {
        let context = ProteinContext::new(&feature(Strand::Forward), &contig).unwrap();
        assert_eq!(context.reference_protein(), "MACK*");
    }

    #[rstest]
    fn test_synonymous_allele_is_reference(contig: Contig) {
        let context = ProteinContext::new(&feature(Strand::Forward), &contig).unwrap();
        // GCA > GCG, still alanine
        let inference = context.infer(&variants(&[(8, "G")]));
        assert!(inference.is_reference());
    }

    #[rstest]
    fn test_missense_allele(contig: Contig) {
        let context = ProteinContext::new(&feature(Strand::Forward), &contig).unwrap();
        // AAA > AGA, K4R
        let inference = context.infer(&variants(&[(13, "G")]));
        assert_eq!(inference.variants, variants(&[(4, "R")]));
        assert_eq!(attribute(&inference, VARIABLE_POSITIONS), Some("20.00"));
        assert_eq!(attribute(&inference, DISRUPTED), None);
        assert!(inference.uid.starts_with('p') || inference.uid.starts_with('n'));
    }

    #[rstest]
    fn test_stop_gained_disrupts(contig: Contig) {
        let context = ProteinContext::new(&feature(Strand::Forward), &contig).unwrap();
        // TGC > TGA, C3*
        let inference = context.infer(&variants(&[(11, "A")]));
        assert_eq!(context.translate(&variants(&[(11, "A")])), "MA*");
        assert_eq!(attribute(&inference, DISRUPTED), Some("true"));
        assert!(attribute(&inference, SO_EFFECTS).unwrap().contains(STOP_GAINED));
        assert_eq!(attribute(&inference, VARIABLE_POSITIONS), Some("40.00"));
    }

    #[rstest]
    fn test_start_lost(contig: Contig) {
        let context = ProteinContext::new(&feature(Strand::Forward), &contig).unwrap();
        // ATG > ACG
        let inference = context.infer(&variants(&[(4, "C")]));
        assert!(attribute(&inference, SO_EFFECTS).unwrap().contains(START_LOST));
        assert_eq!(attribute(&inference, DISRUPTED), Some("true"));
    }

    #[rstest]
    fn test_reverse_strand_translation() {
        let contig = Contig::new("chr1", Some(format!("CC{}GG", reverse_complement(ORF))));
        let context = ProteinContext::new(&feature(Strand::Reverse), &contig).unwrap();
        assert_eq!(context.reference_protein(), "MACK*");
    }

    #[rstest]
    fn test_missing_sequence_is_an_error() {
        let contig = Contig::new("chr1", None);
        assert!(matches!(
            ProteinContext::new(&feature(Strand::Forward), &contig),
            Err(SequenceTypeError::MissingSequence(_))
        ));
    }
}
