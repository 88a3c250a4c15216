//! Small helpers over nucleotide strings.
//!
//! Variant content in allelix is stored in *padded* form: reference and
//! alternative have the same length, and the shorter side of an indel is
//! right-padded with [GAP].

/// Gap marker used to pad indels.
pub const GAP: char = '-';

/// Placeholder allele for a base overlapping an upstream deletion.
pub const SPANNING_DELETION: char = '*';

/// Alternative content of a reference-only observation.
pub const NO_ALTERNATIVE: &str = ".";

const IUPAC_NUCLEOTIDES: &str = "ACGTURYSWKMBDHVN";

/// Remove every gap marker from a sequence.
pub fn strip_gaps(sequence: &str) -> String {
    sequence.chars().filter(|c| *c != GAP).collect()
}

pub fn count_bases(sequence: &str) -> usize {
    sequence.chars().filter(|c| *c != GAP).count()
}

/// Check that a sequence only holds IUPAC nucleotide codes and gaps. A single
/// leading spanning-deletion placeholder is allowed as well.
pub fn is_nucleotide_content(sequence: &str) -> bool {
    let body = sequence
        .strip_prefix(SPANNING_DELETION)
        .unwrap_or(sequence);
    body.chars()
        .all(|c| c == GAP || IUPAC_NUCLEOTIDES.contains(c.to_ascii_uppercase()))
}

/// Reverse complement of a nucleotide sequence. Ambiguity codes map to their
/// complement, anything unknown maps to `N`.
pub fn reverse_complement(sequence: &str) -> String {
    sequence
        .chars()
        .rev()
        .map(|c| match c.to_ascii_uppercase() {
            'A' => 'T',
            'T' | 'U' => 'A',
            'C' => 'G',
            'G' => 'C',
            'R' => 'Y',
            'Y' => 'R',
            'S' => 'S',
            'W' => 'W',
            'K' => 'M',
            'M' => 'K',
            'B' => 'V',
            'V' => 'B',
            'D' => 'H',
            'H' => 'D',
            GAP => GAP,
            _ => 'N',
        })
        .collect()
}

/// Right-pad the shorter of two sequences with gaps so that both have the
/// same length.
pub fn pad_to_equal_length(reference: &str, alternative: &str) -> (String, String) {
    let length = reference.len().max(alternative.len());
    (
        format!("{reference:-<length$}"),
        format!("{alternative:-<length$}"),
    )
}

/// Replace a leading spanning-deletion placeholder by the first reference
/// base.
pub fn resolve_spanning_deletion(reference: &str, alternative: &str) -> String {
    match (alternative.strip_prefix(SPANNING_DELETION), reference.chars().next()) {
        (Some(rest), Some(anchor)) => format!("{anchor}{rest}"),
        _ => alternative.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("A--", "A")]
    #[case("AC-GT", "ACGT")]
    #[case("---", "")]
    fn test_strip_gaps(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_gaps(input), expected);
    }

    #[rstest]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement("ATGCN"), "NGCAT");
        assert_eq!(reverse_complement("aacg"), "CGTT");
    }

    #[rstest]
    fn test_pad_to_equal_length() {
        assert_eq!(
            pad_to_equal_length("A", "ACGT"),
            ("A---".to_string(), "ACGT".to_string())
        );
        assert_eq!(
            pad_to_equal_length("ATG", "A"),
            ("ATG".to_string(), "A--".to_string())
        );
    }

    #[rstest]
    #[case("ACGT", true)]
    #[case("A-N", true)]
    #[case("*", true)]
    #[case("AXG", false)]
    #[case("A*", false)]
    fn test_is_nucleotide_content(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_nucleotide_content(input), expected);
    }

    #[rstest]
    fn test_resolve_spanning_deletion() {
        assert_eq!(resolve_spanning_deletion("T", "*"), "T");
        assert_eq!(resolve_spanning_deletion("T", "G"), "G");
    }
}
