//! Codon translation.

/// Amino acid of codons with unknown bases and of trailing partial codons.
pub const UNKNOWN_AMINO_ACID: u8 = b'X';

pub const STOP: u8 = b'*';

/// Lookup table for translating codons to amino acids, indexed by the 6-bit
/// codon encoding A=0, C=1, G=2, T/U=3 (first * 16 + second * 4 + third).
pub struct CodonTable {
    table: [u8; 64],
}

fn base_to_index(b: u8) -> Option<usize> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

impl CodonTable {
    /// NCBI translation table 1.
    pub fn standard() -> Self {
        #[rustfmt::skip]
        let table: [u8; 64] = [
            b'K', b'N', b'K', b'N',
            b'T', b'T', b'T', b'T',
            b'R', b'S', b'R', b'S',
            b'I', b'I', b'M', b'I',
            b'Q', b'H', b'Q', b'H',
            b'P', b'P', b'P', b'P',
            b'R', b'R', b'R', b'R',
            b'L', b'L', b'L', b'L',
            b'E', b'D', b'E', b'D',
            b'A', b'A', b'A', b'A',
            b'G', b'G', b'G', b'G',
            b'V', b'V', b'V', b'V',
            b'*', b'Y', b'*', b'Y',
            b'S', b'S', b'S', b'S',
            b'*', b'C', b'W', b'C',
            b'L', b'F', b'L', b'F',
        ];
        Self { table }
    }

    pub fn translate_codon(&self, codon: &[u8]) -> u8 {
        match codon {
            [a, b, c] => match (base_to_index(*a), base_to_index(*b), base_to_index(*c)) {
                (Some(a), Some(b), Some(c)) => self.table[a * 16 + b * 4 + c],
                _ => UNKNOWN_AMINO_ACID,
            },
            _ => UNKNOWN_AMINO_ACID,
        }
    }

    /// Translate a coding sequence up to and including the first stop
    /// codon. A trailing partial codon is translated to
    /// [UNKNOWN_AMINO_ACID].
    pub fn translate(&self, cds: &str) -> String {
        let mut protein = String::with_capacity(cds.len() / 3 + 1);
        for codon in cds.as_bytes().chunks(3) {
            let amino_acid = self.translate_codon(codon);
            protein.push(char::from(amino_acid));
            if amino_acid == STOP {
                break;
            }
        }
        protein
    }
}

impl Default for CodonTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("ATGGCATGCTAA", "MAC*")]
    #[case("ATGTAAGCATGC", "M*")]
    #[case("ATGGC", "MX")]
    #[case("ATGNNN", "MX")]
    #[case("", "")]
    fn test_translate(#[case] cds: &str, #[case] protein: &str) {
        assert_eq!(CodonTable::standard().translate(cds), protein);
    }

    #[rstest]
    fn test_stop_codons() {
        let table = CodonTable::standard();
        for codon in [b"TAA", b"TAG", b"TGA"] {
            assert_eq!(table.translate_codon(codon), STOP);
        }
        assert_eq!(table.translate_codon(b"aug"), b'M');
    }
}
