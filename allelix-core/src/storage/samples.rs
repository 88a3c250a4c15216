//! Sample metadata import.
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use log::{debug, info};

use super::Storage;
use crate::errors::{StorageError, StorageResult};
use crate::utils::{get_dynamic_reader, split_tabular_line};

/// Sample name to attribute key to value.
pub type SampleInformation = BTreeMap<String, BTreeMap<String, String>>;

/// Read a tab or comma separated sample table.
///
/// The first line is the header: its first column names the sample column,
/// the others are attribute keys. Lines starting with `#` and empty cells
/// are skipped.
pub fn read_sample_information(path: &Path) -> StorageResult<SampleInformation> {
    let reader = get_dynamic_reader(path)?;
    let mut keys: Vec<String> = Vec::new();
    let mut information = SampleInformation::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields = split_tabular_line(trimmed);
        if keys.is_empty() {
            if fields.len() < 2 {
                return Err(StorageError::InvalidSampleTable {
                    path: path.to_path_buf(),
                    reason: "the header names no attribute".to_string(),
                });
            }
            keys = fields[1..].iter().map(|f| f.to_string()).collect();
            continue;
        }
        let Some((name, values)) = fields.split_first() else {
            continue;
        };
        if name.is_empty() {
            debug!("Skipping sample table row without a sample name");
            continue;
        }
        let attributes = information.entry(name.to_string()).or_default();
        for (key, value) in keys.iter().zip(values) {
            if !value.is_empty() {
                attributes.insert(key.clone(), value.to_string());
            }
        }
    }
    Ok(information)
}

impl Storage {
    /// Add the metadata of every known sample as attributes. Attributes a
    /// sample already holds are kept. Returns the number of samples updated.
    pub fn apply_sample_information(&mut self, information: &SampleInformation) -> usize {
        let mut updated = 0;
        for (name, attributes) in information {
            let Some(sample) = self.samples.get_mut(name) else {
                debug!("No calls for sample {name}, its metadata is not stored");
                continue;
            };
            for (key, value) in attributes {
                sample.attributes.add_if_absent(key, value.as_str());
            }
            updated += 1;
        }
        info!("Added metadata to {updated} samples");
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    fn test_read_sample_information() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "# collected 2024\nsample\thost\tyear\nS1\thuman\t2019\nS2\t\t2020\n").unwrap();

        let information = read_sample_information(file.path()).unwrap();
        assert_eq!(information.len(), 2);
        assert_eq!(information["S1"]["host"], "human");
        assert_eq!(information["S2"].get("host"), None);
        assert_eq!(information["S2"]["year"], "2020");
    }

    #[rstest]
    fn test_header_without_attributes_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "sample\nS1\n").unwrap();
        assert!(matches!(
            read_sample_information(file.path()),
            Err(StorageError::InvalidSampleTable { .. })
        ));
    }

    #[rstest]
    fn test_apply_keeps_existing_attributes() {
        let mut storage = Storage::default();
        storage.add_sample("S1").attributes.set("host", "cattle");
        let information = SampleInformation::from([
            (
                "S1".to_string(),
                BTreeMap::from([
                    ("host".to_string(), "human".to_string()),
                    ("year".to_string(), "2019".to_string()),
                ]),
            ),
            ("S9".to_string(), BTreeMap::new()),
        ]);

        assert_eq!(storage.apply_sample_information(&information), 1);
        let sample = storage.sample("S1").unwrap();
        assert_eq!(sample.attributes.get("host"), Some("cattle"));
        assert_eq!(sample.attributes.get("year"), Some("2019"));
        assert!(storage.sample("S9").is_none());
    }
}
