//! Variant canonicalization.
//!
//! A raw reference/alternative pair is reduced to one or more canonical
//! variants, each a substitution, an insertion or a deletion in padded form
//! at an offset relative to the start of the pair.
use log::warn;

use allelix_core::models::VariantType;
use allelix_core::sequence::{
    GAP, is_nucleotide_content, pad_to_equal_length, resolve_spanning_deletion, strip_gaps,
};

use crate::align::{Scoring, global_alignment};
use crate::errors::{VariantError, VariantResult};

/// A canonical variant in padded form, `offset` bases (0-based, reference
/// coordinates) behind the start of the pair it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalVariant {
    pub offset: u32,
    pub reference: String,
    pub alternative: String,
}

impl CanonicalVariant {
    fn new(offset: u32, reference: String, alternative: String) -> Self {
        Self {
            offset,
            reference,
            alternative,
        }
    }

    pub fn variant_type(&self) -> Option<VariantType> {
        VariantType::of_padded(&self.reference, &self.alternative)
    }

    /// The pair without padding, as it would be written in a VCF record.
    pub fn unpadded(&self) -> (String, String) {
        (strip_gaps(&self.reference), strip_gaps(&self.alternative))
    }

    /// Number of inserted or deleted bases, 1 for substitutions.
    pub fn length(&self) -> usize {
        match self.variant_type() {
            Some(VariantType::Insertion) | Some(VariantType::Deletion) => {
                self.reference.len() - 1
            }
            _ => 1,
        }
    }
}

/// Reduce a reference/alternative pair to canonical variants.
///
/// - Pairs in (un-)padded canonical form yield exactly their padded form.
/// - A leading `*` in the alternative is replaced by the first reference
///   base; pairs that become identical yield nothing.
/// - Equal length pairs are decomposed column by column, anything else is
///   stripped of gaps and globally aligned first.
///
/// Returns [VariantError::InvalidAlphabet] if either side holds anything
/// but nucleotide codes and gaps.
pub fn normalize(reference: &str, alternative: &str) -> VariantResult<Vec<CanonicalVariant>> {
    for content in [reference, alternative] {
        if !is_nucleotide_content(content) {
            return Err(VariantError::InvalidAlphabet(content.to_string()));
        }
    }
    let reference = reference.to_ascii_uppercase();
    let alternative = resolve_spanning_deletion(&reference, &alternative.to_ascii_uppercase());
    if reference == alternative {
        return Ok(Vec::new());
    }

    if VariantType::of_padded(&reference, &alternative).is_some() {
        return Ok(vec![CanonicalVariant::new(0, reference, alternative)]);
    }
    if VariantType::of_unpadded(&reference, &alternative).is_some() {
        let (reference, alternative) = pad_to_equal_length(&reference, &alternative);
        return Ok(vec![CanonicalVariant::new(0, reference, alternative)]);
    }

    if reference.len() == alternative.len() {
        return Ok(decompose_aligned(&reference, &alternative));
    }

    let stripped_reference = strip_gaps(&reference);
    let stripped_alternative = strip_gaps(&alternative);
    if stripped_reference.is_empty()
        || stripped_alternative.is_empty()
        || stripped_reference == stripped_alternative
    {
        return Ok(Vec::new());
    }
    let alignment = global_alignment(
        &stripped_reference,
        &stripped_alternative,
        &Scoring::nucleotide(),
    );
    Ok(decompose_aligned(&alignment.reference, &alignment.alternative))
}

#[derive(Debug)]
struct Block {
    offset: u32,
    kind: VariantType,
    reference: String,
    alternative: String,
}

impl Block {
    fn close(self) -> CanonicalVariant {
        CanonicalVariant::new(self.offset, self.reference, self.alternative)
    }
}

/// Rewrite every run of indel columns that holds gaps on both sides.
///
/// The bases of such a run are paired up in order as substitution columns
/// and only the surplus of the longer side is left as a one-sided gap run,
/// so `G-`/`-T` becomes `G`/`T` and `GA-`/`--T` becomes `GA`/`T-`.
fn pair_opposite_gaps(reference: &str, alternative: &str) -> (String, String) {
    let columns: Vec<(char, char)> = reference.chars().zip(alternative.chars()).collect();
    let mut paired_reference = String::with_capacity(columns.len());
    let mut paired_alternative = String::with_capacity(columns.len());
    let is_indel = |(r, a): &(char, char)| (*r == GAP) != (*a == GAP);

    let mut index = 0;
    while index < columns.len() {
        if !is_indel(&columns[index]) {
            let (r, a) = columns[index];
            paired_reference.push(r);
            paired_alternative.push(a);
            index += 1;
            continue;
        }
        let run_end = columns[index..]
            .iter()
            .position(|column| !is_indel(column))
            .map_or(columns.len(), |length| index + length);
        let run = &columns[index..run_end];
        let deleted: Vec<char> = run.iter().map(|c| c.0).filter(|r| *r != GAP).collect();
        let inserted: Vec<char> = run.iter().map(|c| c.1).filter(|a| *a != GAP).collect();
        if deleted.is_empty() || inserted.is_empty() {
            for (r, a) in run {
                paired_reference.push(*r);
                paired_alternative.push(*a);
            }
        } else {
            let width = deleted.len().max(inserted.len());
            for i in 0..width {
                paired_reference.push(deleted.get(i).copied().unwrap_or(GAP));
                paired_alternative.push(inserted.get(i).copied().unwrap_or(GAP));
            }
        }
        index = run_end;
    }
    (paired_reference, paired_alternative)
}

/// Split two aligned sequences of equal length into canonical variants.
///
/// Indels are anchored at the base left of the gap run. A substitution
/// directly left of an indel becomes its (substituted) anchor. Adjacent
/// insertion and deletion columns are first paired up into substitutions.
/// Gap runs at the very start have no anchor and are skipped with a warning.
pub fn decompose_aligned(reference: &str, alternative: &str) -> Vec<CanonicalVariant> {
    let (reference, alternative) = pair_opposite_gaps(reference, alternative);
    let gap = GAP;
    let mut variants = Vec::new();
    let mut block: Option<Block> = None;
    // reference bases consumed so far, i.e. the 0-based reference
    // coordinate of the current column
    let mut position: u32 = 0;
    let mut previous_base: Option<char> = None;

    for (r, a) in reference.chars().zip(alternative.chars()) {
        match (r == gap, a == gap) {
            (false, false) => {
                if let Some(open) = block.take() {
                    variants.push(open.close());
                }
                if r != a {
                    block = Some(Block {
                        offset: position,
                        kind: VariantType::Substitution,
                        reference: r.to_string(),
                        alternative: a.to_string(),
                    });
                }
                previous_base = Some(r);
                position += 1;
            }
            (true, false) => {
                match block.as_mut() {
                    Some(open) if open.kind == VariantType::Deletion => {
                        warn!("Skipping insertion of {a} directly following a deletion");
                    }
                    Some(open) => {
                        open.kind = VariantType::Insertion;
                        open.reference.push(gap);
                        open.alternative.push(a);
                    }
                    None => match previous_base {
                        Some(anchor) => {
                            block = Some(Block {
                                offset: position - 1,
                                kind: VariantType::Insertion,
                                reference: format!("{anchor}{gap}"),
                                alternative: format!("{anchor}{a}"),
                            });
                        }
                        None => warn!("Skipping leading insertion of {a} without anchor base"),
                    },
                }
            }
            (false, true) => {
                match block.as_mut() {
                    Some(open) if open.kind == VariantType::Insertion => {
                        warn!("Skipping deletion of {r} directly following an insertion");
                    }
                    Some(open) => {
                        open.kind = VariantType::Deletion;
                        open.reference.push(r);
                        open.alternative.push(gap);
                    }
                    None => match previous_base {
                        Some(anchor) => {
                            block = Some(Block {
                                offset: position - 1,
                                kind: VariantType::Deletion,
                                reference: format!("{anchor}{r}"),
                                alternative: format!("{anchor}{gap}"),
                            });
                        }
                        None => warn!("Skipping leading deletion of {r} without anchor base"),
                    },
                }
                previous_base = Some(r);
                position += 1;
            }
            (true, true) => {}
        }
    }
    if let Some(open) = block {
        variants.push(open.close());
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn variant(offset: u32, reference: &str, alternative: &str) -> CanonicalVariant {
        CanonicalVariant::new(offset, reference.to_string(), alternative.to_string())
    }

    #[rstest]
    #[case("A", "G", "A", "G")]
    #[case("A", "ACGT", "A---", "ACGT")]
    #[case("ATG", "A", "ATG", "A--")]
    #[case("A---", "ACGT", "A---", "ACGT")]
    #[case("ATG", "A--", "ATG", "A--")]
    fn test_canonical_input_is_kept(
        #[case] reference: &str,
        #[case] alternative: &str,
        #[case] padded_reference: &str,
        #[case] padded_alternative: &str,
    ) {
        assert_eq!(
            normalize(reference, alternative).unwrap(),
            vec![variant(0, padded_reference, padded_alternative)]
        );
    }

    #[rstest]
    fn test_insertion_report() {
        let variants = normalize("A", "ACGT").unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].variant_type(), Some(VariantType::Insertion));
        assert_eq!(variants[0].length(), 3);
        assert_eq!(variants[0].unpadded(), ("A".to_string(), "ACGT".to_string()));
    }

    #[rstest]
    #[case("T", "*")]
    #[case("ACG", "ACG")]
    fn test_no_op_pairs_are_dropped(#[case] reference: &str, #[case] alternative: &str) {
        assert!(normalize(reference, alternative).unwrap().is_empty());
    }

    #[rstest]
    fn test_spanning_deletion_with_substitution() {
        assert_eq!(normalize("T", "*").unwrap(), vec![]);
        assert_eq!(normalize("AT", "*T").unwrap(), vec![]);
    }

    #[rstest]
    fn test_multi_nucleotide_substitution() {
        assert_eq!(
            normalize("ATG", "GTC").unwrap(),
            vec![variant(0, "A", "G"), variant(2, "G", "C")]
        );
    }

    #[rstest]
    fn test_mixed_indel_is_realigned() {
        // ATTGC > AGC: deletion of TT behind the anchor A
        assert_eq!(
            normalize("ATTGC", "AGC").unwrap(),
            vec![variant(0, "ATT", "A--")]
        );
    }

    #[rstest]
    fn test_decompose_aligned_anchors() {
        assert_eq!(
            decompose_aligned("AC--GTA", "ACTTGCA"),
            vec![variant(1, "C--", "CTT"), variant(3, "T", "C")]
        );
    }

    #[rstest]
    #[case("ATG-C", "AC-TC", vec![variant(1, "T", "C"), variant(2, "G", "T")])]
    #[case("A--TC", "AGG-C", vec![variant(1, "T-", "GG")])]
    #[case("ATGA-C", "A---TC", vec![variant(1, "TGA", "T--")])]
    fn test_adjacent_opposite_gaps_are_kept(
        #[case] reference: &str,
        #[case] alternative: &str,
        #[case] expected: Vec<CanonicalVariant>,
    ) {
        assert_eq!(decompose_aligned(reference, alternative), expected);
    }

    #[rstest]
    fn test_substituted_anchor_is_kept() {
        assert_eq!(decompose_aligned("A---", "GCGT"), vec![variant(0, "A---", "GCGT")]);
    }

    #[rstest]
    fn test_invalid_alphabet() {
        assert!(matches!(
            normalize("A", "<DEL>"),
            Err(VariantError::InvalidAlphabet(_))
        ));
    }
}
