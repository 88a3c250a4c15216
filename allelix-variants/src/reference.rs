//! Reference sequences.
use std::collections::HashMap;
use std::path::Path;

use allelix_core::models::Contig;
use allelix_core::storage::Storage;
use allelix_core::utils::get_dynamic_reader;
use bio::io::fasta;
use log::info;

use crate::errors::{VariantError, VariantResult};

/// Source of reference contig sequences.
pub trait ReferenceProvider {
    /// Names of all contigs, in a stable order.
    fn contig_names(&self) -> Vec<String>;

    /// Full sequence of a contig, upper case.
    fn contig(&self, name: &str) -> Option<&str>;

    fn contig_length(&self, name: &str) -> Option<usize> {
        self.contig(name).map(str::len)
    }
}

/// A reference genome held in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryReference {
    seq_map: HashMap<String, String>,
}

impl InMemoryReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, sequence: &str) {
        self.seq_map
            .insert(name.to_string(), sequence.to_ascii_uppercase());
    }

    pub fn len(&self) -> usize {
        self.seq_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq_map.is_empty()
    }
}

impl TryFrom<&Path> for InMemoryReference {
    type Error = VariantError;

    /// Read a (gzipped) FASTA file. Contig names are the record ids.
    fn try_from(value: &Path) -> Result<Self, Self::Error> {
        let reader = fasta::Reader::new(get_dynamic_reader(value)?);
        let mut reference = InMemoryReference::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                VariantError::Reference(format!("{}: {}", value.display(), e))
            })?;
            let sequence = std::str::from_utf8(record.seq()).map_err(|e| {
                VariantError::Reference(format!("{}: {}: {}", value.display(), record.id(), e))
            })?;
            reference.insert(record.id(), sequence);
        }
        info!(
            "Read {} reference contigs from {}",
            reference.len(),
            value.display()
        );
        Ok(reference)
    }
}

impl ReferenceProvider for InMemoryReference {
    fn contig_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.seq_map.keys().cloned().collect();
        names.sort();
        names
    }

    fn contig(&self, name: &str) -> Option<&str> {
        self.seq_map.get(name).map(String::as_str)
    }
}

/// Register every contig of `reference` in the storage.
pub fn register_contigs(storage: &mut Storage, reference: &impl ReferenceProvider) {
    for name in reference.contig_names() {
        let sequence = reference.contig(&name).map(str::to_string);
        storage.add_contig(Contig::new(&name, sequence));
    }
}
