//! Global pairwise alignment of variant blocks with affine gap penalties.
//!
//! The dynamic programming is done by the aligner of `bio`. Two rules are
//! laid on top of it: the first bases of both sequences always form the
//! first column, so every gap run has an anchor base to its left, and gap
//! runs are shifted left as far as the score allows. The latter places gaps
//! directly behind the leftmost anchor whichever way the traceback broke
//! ties.
use bio::alignment::AlignmentOperation;
use bio::alignment::pairwise::Aligner;

use allelix_core::sequence::{GAP, pad_to_equal_length};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoring {
    pub match_score: i32,
    pub mismatch_score: i32,
    /// Penalty of the first gap position of a run.
    pub gap_open: i32,
    /// Penalty of every further gap position of a run.
    pub gap_extend: i32,
    /// Score `N` as a mismatch even against itself.
    pub unknown_mismatch: bool,
}

impl Scoring {
    /// Scoring for nucleotide variant blocks.
    pub fn nucleotide() -> Self {
        Self {
            match_score: 1,
            mismatch_score: -1,
            gap_open: 3,
            gap_extend: 1,
            unknown_mismatch: true,
        }
    }

    /// Identity scoring for translated sequences.
    pub fn protein() -> Self {
        Self {
            match_score: 1,
            mismatch_score: -1,
            gap_open: 4,
            gap_extend: 1,
            unknown_mismatch: false,
        }
    }

    fn score_pair(&self, a: u8, b: u8) -> i32 {
        let a = a.to_ascii_uppercase();
        let b = b.to_ascii_uppercase();
        if a == b && !(self.unknown_mismatch && a == b'N') {
            self.match_score
        } else {
            self.mismatch_score
        }
    }

    fn gap_run(&self, length: usize) -> i32 {
        if length == 0 {
            0
        } else {
            -(self.gap_open + (length as i32 - 1) * self.gap_extend)
        }
    }
}

impl Default for Scoring {
    fn default() -> Self {
        Self::nucleotide()
    }
}

/// Both input sequences with gaps inserted so that they have equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub reference: String,
    pub alternative: String,
    pub score: i32,
}

/// Align `alternative` against `reference` end to end.
///
/// Empty inputs align to a run of gaps.
pub fn global_alignment(reference: &str, alternative: &str, scoring: &Scoring) -> Alignment {
    if reference.is_empty() || alternative.is_empty() {
        let (reference, alternative) = pad_to_equal_length(reference, alternative);
        let score = scoring.gap_run(reference.len());
        return Alignment {
            reference,
            alternative,
            score,
        };
    }

    let gap = GAP as u8;
    let x = reference.as_bytes();
    let y = alternative.as_bytes();
    let mut aligned_reference = Vec::with_capacity(x.len() + y.len());
    let mut aligned_alternative = Vec::with_capacity(x.len() + y.len());
    aligned_reference.push(x[0]);
    aligned_alternative.push(y[0]);
    let mut score = scoring.score_pair(x[0], y[0]);

    let (x, y) = (&x[1..], &y[1..]);
    if x.is_empty() || y.is_empty() {
        aligned_reference.extend_from_slice(x);
        aligned_reference.extend(std::iter::repeat_n(gap, y.len()));
        aligned_alternative.extend(std::iter::repeat_n(gap, x.len()));
        aligned_alternative.extend_from_slice(y);
        score += scoring.gap_run(x.len() + y.len());
    } else {
        // bio scores a run of k gaps as open + k * extend
        let match_fn = |a: u8, b: u8| scoring.score_pair(a, b);
        let mut aligner = Aligner::with_capacity(
            x.len(),
            y.len(),
            scoring.gap_extend - scoring.gap_open,
            -scoring.gap_extend,
            match_fn,
        );
        let alignment = aligner.global(x, y);
        score += alignment.score;

        let (mut i, mut j) = (0, 0);
        for operation in alignment.operations {
            match operation {
                AlignmentOperation::Match | AlignmentOperation::Subst => {
                    aligned_reference.push(x[i]);
                    aligned_alternative.push(y[j]);
                    i += 1;
                    j += 1;
                }
                AlignmentOperation::Ins => {
                    aligned_reference.push(x[i]);
                    aligned_alternative.push(gap);
                    i += 1;
                }
                AlignmentOperation::Del => {
                    aligned_reference.push(gap);
                    aligned_alternative.push(y[j]);
                    j += 1;
                }
                AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
            }
        }
    }

    shift_gaps_left(&mut aligned_reference, &aligned_alternative);
    shift_gaps_left(&mut aligned_alternative, &aligned_reference);

    Alignment {
        reference: String::from_utf8_lossy(&aligned_reference).into_owned(),
        alternative: String::from_utf8_lossy(&aligned_alternative).into_owned(),
        score,
    }
}

/// Move each gap run of `gapped` left while the base in front of it matches
/// both the base it faces and the base facing the last gap of the run. The
/// first column is never touched.
fn shift_gaps_left(gapped: &mut [u8], other: &[u8]) {
    let gap = GAP as u8;
    let mut column = 2;
    while column < gapped.len() {
        if gapped[column] == gap && gapped[column - 1] != gap {
            let end = gapped[column..]
                .iter()
                .position(|base| *base != gap)
                .map_or(gapped.len(), |length| column + length);
            let base = gapped[column - 1];
            if base == other[column - 1] && base == other[end - 1] {
                gapped[column - 1] = gap;
                gapped[end - 1] = base;
                column = (column - 1).max(2);
                continue;
            }
        }
        column += 1;
    }
}
