use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

pub fn is_gzipped(path: &Path) -> bool {
    path.extension() == Some(OsStr::new("gz"))
}

/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
pub fn get_dynamic_reader(path: &Path) -> std::io::Result<BufReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let file: Box<dyn Read> = match is_gzipped(path) {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

/// Get a writer that gzips its output when the path ends in `.gz`.
pub fn get_dynamic_writer(path: &Path) -> std::io::Result<Box<dyn Write>> {
    let file = File::create(path)?;
    let writer: Box<dyn Write> = match is_gzipped(path) {
        true => Box::new(GzEncoder::new(file, Compression::default())),
        false => Box::new(file),
    };
    Ok(writer)
}

/// Split a line of a small tabular input file on tabs, or on commas if it
/// holds no tab.
pub fn split_tabular_line(line: &str) -> Vec<&str> {
    if line.contains('\t') {
        line.split('\t').map(str::trim).collect()
    } else {
        line.split(',').map(str::trim).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::BufRead;

    #[rstest]
    fn test_dynamic_reader_reads_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt.gz");
        {
            let mut writer = get_dynamic_writer(&path).unwrap();
            writeln!(writer, "first").unwrap();
            writeln!(writer, "second").unwrap();
        }
        let lines: Vec<String> = get_dynamic_reader(&path)
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
    }

    #[rstest]
    #[case("chr1\t10\t20", vec!["chr1", "10", "20"])]
    #[case("chr1, 10,20", vec!["chr1", "10", "20"])]
    fn test_split_tabular_line(#[case] line: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_tabular_line(line), expected);
    }
}
