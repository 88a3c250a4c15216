//! Application of padded variants to a reference sequence.
use std::collections::BTreeMap;

use allelix_core::sequence::{GAP, count_bases};

/// Spell out the sequence of `reference`, which starts at contig position
/// `start`, with `variants` (contig position to padded alternative
/// content) applied. Variants outside the span are ignored; a deletion
/// reaching over the end is cut.
pub fn integrate_variants(reference: &str, start: u32, variants: &BTreeMap<u32, String>) -> String {
    let mut sequence = String::with_capacity(reference.len());
    // last reference position consumed by a deletion
    let mut deleted_until: u32 = 0;
    for (i, base) in reference.chars().enumerate() {
        let position = start + i as u32;
        if position <= deleted_until {
            continue;
        }
        match variants.get(&position) {
            Some(content) => {
                let gaps = content.chars().filter(|c| *c == GAP).count() as u32;
                if gaps > 0 {
                    deleted_until = position + gaps;
                }
                sequence.extend(content.chars().filter(|c| *c != GAP));
            }
            None => sequence.push(base),
        }
    }
    sequence
}

/// Net number of bases (or amino acids) gained by a variant, judged from
/// its padded alternative content alone.
pub fn length_deviation(content: &str) -> i64 {
    let length = content.chars().count();
    let bases = count_bases(content);
    if length <= 1 {
        0
    } else if bases < length {
        -((length - bases) as i64)
    } else {
        (length - 1) as i64
    }
}

/// Sum of [length_deviation] over a variant list.
pub fn total_length_deviation(variants: &BTreeMap<u32, String>) -> i64 {
    variants.values().map(|content| length_deviation(content)).sum()
}
