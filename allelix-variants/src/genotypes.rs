//! Genotype intake: observations per sample and site, and their resolution
//! into call records on the samples of a [Storage].
use std::collections::BTreeMap;

use allelix_core::models::Contig;
use allelix_core::storage::Storage;
use log::{debug, warn};
use rayon::prelude::*;

use crate::calls::{AlleleObservation, CallResolver};

/// The observations of one sample at one site. The first observation is
/// the reference allele.
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeRecord {
    pub contig: String,
    pub position: u32,
    pub sample: String,
    pub observations: Vec<AlleleObservation>,
}

/// Anything that yields genotype records, e.g. a set of VCF files.
pub trait GenotypeSource {
    fn records(&mut self) -> anyhow::Result<Vec<GenotypeRecord>>;
}

impl GenotypeSource for Vec<GenotypeRecord> {
    fn records(&mut self) -> anyhow::Result<Vec<GenotypeRecord>> {
        Ok(std::mem::take(self))
    }
}

type SiteObservations = BTreeMap<String, BTreeMap<u32, Vec<AlleleObservation>>>;

/// Observations grouped by sample, contig and position. Records hitting a
/// site twice (e.g. one VCF line for a substitution and one for an indel)
/// are merged: repeated alleles add up, new ones are appended.
#[derive(Debug, Default)]
pub struct ObservationTable {
    samples: BTreeMap<String, SiteObservations>,
}

impl ObservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: GenotypeRecord) {
        let site = self
            .samples
            .entry(record.sample)
            .or_default()
            .entry(record.contig)
            .or_default()
            .entry(record.position)
            .or_default();
        for observation in record.observations {
            match site.iter_mut().find(|o| o.same_alleles(&observation)) {
                Some(existing) => existing.absorb(&observation),
                None => site.push(observation),
            }
        }
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = GenotypeRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    pub fn sample_names(&self) -> impl Iterator<Item = &String> {
        self.samples.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Resolve every site into call records and store them on the samples.
    ///
    /// Samples are resolved in parallel against a shared borrow of the
    /// storage, the records are then written by this thread. Contigs that
    /// are unknown to the storage are registered without sequence. Returns
    /// the names of the samples that received calls.
    pub fn resolve_into(self, storage: &mut Storage) -> Vec<String> {
        for contig in self.samples.values().flat_map(|contigs| contigs.keys()) {
            if !storage.has_contig(contig) {
                warn!("Contig {} is not part of the reference, registering it without sequence", contig);
                storage.add_contig(Contig::new(contig, None));
            }
        }

        let resolved: Vec<(String, Vec<(String, u32, String)>)> = {
            let resolver = CallResolver::new(&storage.parameters, &storage.exclusions);
            self.samples
                .into_par_iter()
                .map(|(sample, contigs)| {
                    let mut calls = Vec::new();
                    for (contig, sites) in contigs {
                        for (position, observations) in sites {
                            if storage.exclusions.is_position_excluded(&contig, position) {
                                continue;
                            }
                            if let Some(record) = resolver.resolve(&contig, position, &observations) {
                                calls.push((contig.clone(), position, record.to_string()));
                            }
                        }
                    }
                    (sample, calls)
                })
                .collect()
        };

        let mut names = Vec::with_capacity(resolved.len());
        for (name, calls) in resolved {
            debug!("Sample {}: {} calls", name, calls.len());
            let sample = storage.add_sample(&name);
            for (contig, position, call) in calls {
                sample.add_call(&contig, position, call);
            }
            names.push(name);
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allelix_core::config::{Exclusions, StorageParameters};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn record(sample: &str, position: u32, observations: Vec<AlleleObservation>) -> GenotypeRecord {
        GenotypeRecord {
            contig: "chr1".to_string(),
            position,
            sample: sample.to_string(),
            observations,
        }
    }

    #[rstest]
    fn test_repeated_site_is_merged() {
        let mut table = ObservationTable::new();
        table.insert(record(
            "s1",
            5,
            vec![
                AlleleObservation::new("A", ".", 2, None),
                AlleleObservation::new("A", "G", 10, None),
            ],
        ));
        table.insert(record(
            "s1",
            5,
            vec![
                AlleleObservation::new("A", ".", 1, None),
                AlleleObservation::aligned("A", "AT", 20, None),
            ],
        ));
        let site = &table.samples["s1"]["chr1"][&5];
        assert_eq!(site.len(), 3);
        assert_eq!(site[0].depth, 3);
        assert_eq!(site[2].alternative, "AT");
    }

    #[rstest]
    fn test_resolve_into_storage() {
        let mut exclusions = Exclusions::default();
        exclusions.exclude_positions("chr1", 40, 45);
        let mut storage = Storage::new(StorageParameters::default(), exclusions);
        storage.add_contig(Contig::new("chr1", Some("ACGT".repeat(20))));

        let mut source = vec![
            record(
                "s1",
                10,
                vec![
                    AlleleObservation::new("G", ".", 0, None),
                    AlleleObservation::new("G", "T", 12, None),
                ],
            ),
            record(
                "s1",
                42,
                vec![
                    AlleleObservation::new("G", ".", 0, None),
                    AlleleObservation::new("G", "C", 12, None),
                ],
            ),
            record(
                "s2",
                10,
                vec![
                    AlleleObservation::new("G", ".", 12, None),
                    AlleleObservation::new("G", "T", 0, None),
                ],
            ),
        ];
        let mut table = ObservationTable::new();
        table.extend(source.records().unwrap());
        let names = table.resolve_into(&mut storage);

        assert_eq!(names, vec!["s1".to_string(), "s2".to_string()]);
        let s1 = storage.sample("s1").unwrap();
        assert_eq!(s1.call_count(), 1);
        assert_eq!(s1.calls_of("chr1").unwrap()[&10], "1;12;-1;G:.:0:-1,G:T:12:-1");
        assert_eq!(storage.sample("s2").unwrap().call_count(), 0);
    }

    #[rstest]
    fn test_unknown_contig_is_registered() {
        let mut storage = Storage::default();
        let mut table = ObservationTable::new();
        table.insert(GenotypeRecord {
            contig: "plasmid".to_string(),
            position: 3,
            sample: "s1".to_string(),
            observations: vec![
                AlleleObservation::new("A", ".", 0, None),
                AlleleObservation::new("A", "C", 9, None),
            ],
        });
        table.resolve_into(&mut storage);
        assert!(storage.has_contig("plasmid"));
        assert_eq!(storage.contig("plasmid").unwrap().sequence, None);
    }
}
