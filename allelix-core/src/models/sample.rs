use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attributes::AttributeBag;

/// Calls of one biological sample and the sequence types it was assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    /// Contig name to position to raw call record.
    pub calls: BTreeMap<String, BTreeMap<u32, String>>,
    /// Feature name to allele identifier.
    pub alleles: BTreeMap<String, String>,
    /// Feature name to proteoform identifier, coding features only.
    pub proteoforms: BTreeMap<String, String>,
    #[serde(default)]
    pub attributes: AttributeBag,
}

impl Sample {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_call(&mut self, contig: &str, position: u32, call: String) {
        self.calls
            .entry(contig.to_string())
            .or_default()
            .insert(position, call);
    }

    pub fn calls_of(&self, contig: &str) -> Option<&BTreeMap<u32, String>> {
        self.calls.get(contig)
    }

    pub fn call_count(&self) -> usize {
        self.calls.values().map(BTreeMap::len).sum()
    }
}
