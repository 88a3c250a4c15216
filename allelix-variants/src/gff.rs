//! GFF3 feature reader.
//!
//! Lines are turned into [FeatureRecord]s as is. Validation and the
//! parent/child merge happen in [allelix_core::storage::Storage::add_feature].
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use allelix_core::models::{FeatureRecord, Strand};
use allelix_core::utils::get_dynamic_reader;
use anyhow::{Context, Result};
use log::debug;

/// Marks the start of an embedded FASTA section.
const FASTA_DIRECTIVE: &str = "##FASTA";

fn decode(value: &str) -> String {
    value
        .replace("%3B", ";")
        .replace("%2C", ",")
        .replace("%3D", "=")
        .replace("%26", "&")
        .replace("%09", "\t")
        .replace("%25", "%")
}

/// Parse one GFF3 data line. Returns `None` for lines with fewer than
/// nine columns or non-numeric coordinates.
pub fn parse_gff3_line(line: &str) -> Option<FeatureRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 9 {
        return None;
    }
    let start: u32 = fields[3].trim().parse().ok()?;
    let end: u32 = fields[4].trim().parse().ok()?;
    let attributes: BTreeMap<String, String> = fields[8]
        .split(';')
        .filter_map(|entry| entry.trim().split_once('='))
        .map(|(key, value)| (key.to_string(), decode(value)))
        .collect();

    Some(FeatureRecord {
        contig: fields[0].to_string(),
        so_term: fields[2].to_string(),
        start,
        end,
        strand: Strand::from_gff3(fields[6]),
        attributes,
    })
}

/// Read every feature record of a plain or gzipped GFF3 file.
pub fn read_gff3(path: &Path) -> Result<Vec<FeatureRecord>> {
    let reader = get_dynamic_reader(path)
        .with_context(|| format!("Failed to open GFF3 file: {}", path.display()))?;
    let mut records = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line == FASTA_DIRECTIVE {
            break;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_gff3_line(line) {
            Some(record) => records.push(record),
            None => debug!("Skipping malformed GFF3 line {} of {}", number + 1, path.display()),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;

    const GFF: &str = "##gff-version 3\n\
chr1\tsrc\tgene\t3\t17\t.\t-\t.\tID=gene-orf1;Name=orf1;product=a%2Cb\n\
chr1\tsrc\tCDS\t3\t17\t.\t-\t0\tParent=gene-orf1\n\
chr1\tsrc\tgene\tx\t17\t.\t+\t.\tID=broken\n\
##FASTA\n\
>chr1\n\
ACGT\n";

    #[rstest]
    fn test_parse_line() {
        let record = parse_gff3_line("chr1\tsrc\tgene\t3\t17\t.\t-\t.\tID=g1;Name=a%3Db").unwrap();
        assert_eq!(record.contig, "chr1");
        assert_eq!(record.so_term, "gene");
        assert_eq!((record.start, record.end), (3, 17));
        assert_eq!(record.strand, Strand::Reverse);
        assert_eq!(record.attributes["Name"], "a=b");
    }

    #[rstest]
    fn test_short_line_is_rejected() {
        assert_eq!(parse_gff3_line("chr1\tsrc\tgene\t3"), None);
    }

    #[rstest]
    fn test_read_gff3_stops_at_fasta() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{GFF}").unwrap();
        let records = read_gff3(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].attributes["product"], "a,b");
        assert_eq!(records[1].so_term, "CDS");
    }
}
