//! Statistics over samples, variants, sequence types and features.
use std::collections::BTreeMap;

use allelix_core::consts::{
    ALLELIC_FREQUENCY, DISRUPTED, FREQUENCY, MEAN_COVERAGE, MEAN_QUALITY, NUMBER_OF_ALLELES,
    NUMBER_OF_CALLS, NUMBER_OF_FILTERED_CALLS, NUMBER_OF_INDELS, NUMBER_OF_PROTEOFORMS,
    NUMBER_OF_SUBSTITUTIONS, PRODUCT_DISRUPTED_FREQUENCY, PRODUCT_MODIFIED_FREQUENCY,
    PROTEOFORM_DISRUPTED_FREQUENCY, PROTEOFORM_MODIFIED_FREQUENCY, REFERENCE_FREQUENCY,
};
use allelix_core::models::{Feature, REFERENCE_IDENTIFIER, Sample, SequenceType};
use allelix_core::storage::Storage;
use allelix_variants::CallRecord;
use log::{info, warn};

use crate::format::{decimal, ratio, scientific};

/// Trait for computing summary statistics of a variant store.
pub trait StorageStatistics {
    /// Recompute every statistics attribute.
    ///
    /// Frequencies are written in scientific notation (`0.##E0`), means
    /// with one fraction digit. Only attribute maps are written.
    fn update_statistics(&mut self);
}

/// Call statistics of one sample.
#[derive(Debug, Default, Clone, PartialEq)]
struct CallSummary {
    calls: usize,
    filtered: usize,
    coverages: Vec<u32>,
    qualities: Vec<u32>,
}

impl CallSummary {
    fn of(sample: &Sample) -> Self {
        let mut summary = CallSummary::default();
        for (contig, calls) in &sample.calls {
            summary.calls += calls.len();
            for (position, call) in calls {
                let record: CallRecord = match call.parse() {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Skipping call of {} at {}:{}: {}", sample.name, contig, position, e);
                        continue;
                    }
                };
                summary.coverages.push(record.total_depth);
                if record.is_filtered() {
                    summary.filtered += 1;
                } else if let Some(quality) = record.genotype_quality {
                    summary.qualities.push(quality);
                }
            }
        }
        summary
    }
}

fn mean(values: &[u32]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64
    }
}

fn is_disrupted(proteoform: &SequenceType) -> bool {
    proteoform.attributes.get(DISRUPTED) == Some("true")
}

/// Count the non-reference proteoforms of `sample` that are disrupted and
/// the ones that are modified only.
fn proteoform_effects(storage: &Storage, sample: &Sample) -> (usize, usize) {
    let mut disrupted = 0;
    let mut modified = 0;
    for (feature, uid) in &sample.proteoforms {
        if uid == REFERENCE_IDENTIFIER {
            continue;
        }
        match storage.feature(feature).and_then(|f| f.proteoform(uid)) {
            Some(proteoform) if is_disrupted(proteoform) => disrupted += 1,
            Some(_) => modified += 1,
            None => warn!("Sample {} refers to unknown proteoform {} of {}", sample.name, uid, feature),
        }
    }
    (disrupted, modified)
}

fn sample_attributes(
    storage: &Storage,
    sample: &Sample,
    feature_count: usize,
    coding_count: usize,
) -> Vec<(&'static str, String)> {
    let summary = CallSummary::of(sample);
    let references = sample
        .alleles
        .values()
        .filter(|uid| uid.as_str() == REFERENCE_IDENTIFIER)
        .count();
    let mut attributes = vec![
        (NUMBER_OF_CALLS, summary.calls.to_string()),
        (NUMBER_OF_FILTERED_CALLS, summary.filtered.to_string()),
        (MEAN_COVERAGE, decimal(mean(&summary.coverages))),
        (MEAN_QUALITY, decimal(mean(&summary.qualities))),
        (REFERENCE_FREQUENCY, scientific(ratio(references, feature_count))),
    ];
    if !storage.parameters.skip_proteoform_inference {
        let (disrupted, modified) = proteoform_effects(storage, sample);
        attributes.push((
            PROTEOFORM_DISRUPTED_FREQUENCY,
            scientific(ratio(disrupted, coding_count)),
        ));
        attributes.push((
            PROTEOFORM_MODIFIED_FREQUENCY,
            scientific(ratio(modified, coding_count)),
        ));
    }
    attributes
}

fn update_sequence_type_frequencies(
    sequence_types: &mut BTreeMap<String, SequenceType>,
    sample_count: usize,
) {
    for sequence_type in sequence_types.values_mut() {
        sequence_type.attributes.set(
            ALLELIC_FREQUENCY,
            scientific(ratio(sequence_type.occurrence.len(), sample_count)),
        );
    }
}

fn update_feature(feature: &mut Feature, sample_count: usize, infer_proteoforms: bool) {
    update_sequence_type_frequencies(&mut feature.alleles, sample_count);
    let reference_occurrence = feature
        .reference_allele()
        .map(|allele| allele.occurrence.len())
        .unwrap_or(0);
    let allele_count = feature.alleles.len();
    feature.attributes.set(
        REFERENCE_FREQUENCY,
        scientific(ratio(reference_occurrence, sample_count)),
    );
    feature
        .attributes
        .set(NUMBER_OF_ALLELES, allele_count.to_string());

    if !infer_proteoforms {
        return;
    }
    let Some(proteoforms) = feature.proteoforms_mut() else {
        return;
    };
    update_sequence_type_frequencies(proteoforms, sample_count);
    let total = proteoforms.len();
    let (disrupted, modified) = proteoforms
        .values()
        .filter(|proteoform| !proteoform.is_reference())
        .fold((0, 0), |(disrupted, modified), proteoform| {
            if is_disrupted(proteoform) {
                (disrupted + 1, modified)
            } else {
                (disrupted, modified + 1)
            }
        });
    let attributes = &mut feature.attributes;
    attributes.set(NUMBER_OF_PROTEOFORMS, total.to_string());
    attributes.set(
        PRODUCT_DISRUPTED_FREQUENCY,
        scientific(ratio(disrupted, total)),
    );
    attributes.set(
        PRODUCT_MODIFIED_FREQUENCY,
        scientific(ratio(modified, total)),
    );
}

impl StorageStatistics for Storage {
    fn update_statistics(&mut self) {
        let sample_count = self.sample_count();
        let feature_count = self.features().count();
        let coding_count = self.features().filter(|f| f.is_coding()).count();
        let infer_proteoforms = !self.parameters.skip_proteoform_inference;

        let mut per_sample: BTreeMap<String, Vec<(&'static str, String)>> = {
            let shared: &Storage = self;
            shared
                .samples()
                .map(|sample| {
                    (
                        sample.name.clone(),
                        sample_attributes(shared, sample, feature_count, coding_count),
                    )
                })
                .collect()
        };

        let mut substitutions: BTreeMap<String, usize> = BTreeMap::new();
        let mut indels: BTreeMap<String, usize> = BTreeMap::new();
        let contigs: Vec<String> = self.contigs().map(|c| c.name.clone()).collect();
        for name in &contigs {
            let Some(contig) = self.contig_mut(name) else {
                continue;
            };
            for (_, information) in contig.variants_mut() {
                information.attributes.set(
                    FREQUENCY,
                    scientific(ratio(information.samples.len(), sample_count)),
                );
                let counts = if information.variant_type.is_indel() {
                    &mut indels
                } else {
                    &mut substitutions
                };
                for sample in &information.samples {
                    *counts.entry(sample.clone()).or_default() += 1;
                }
            }
        }
        for (name, attributes) in per_sample.iter_mut() {
            attributes.push((
                NUMBER_OF_SUBSTITUTIONS,
                substitutions.get(name).copied().unwrap_or(0).to_string(),
            ));
            attributes.push((
                NUMBER_OF_INDELS,
                indels.get(name).copied().unwrap_or(0).to_string(),
            ));
        }
        for (name, attributes) in per_sample {
            if let Some(sample) = self.sample_mut(&name) {
                for (key, value) in attributes {
                    sample.attributes.set(key, value);
                }
            }
        }

        for name in self.feature_names() {
            if let Some(feature) = self.feature_mut(&name) {
                update_feature(feature, sample_count, infer_proteoforms);
            }
        }
        info!(
            "Updated statistics of {} samples, {} contigs and {} features",
            sample_count,
            contigs.len(),
            feature_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allelix_core::config::{Exclusions, StorageParameters};
    use allelix_core::models::{Contig, SoTerm, Strand};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    /// Two samples on one contig with a non-coding feature at 1..20. S1 has
    /// a substitution and a deletion, S2 only the substitution.
    #[fixture]
    fn storage() -> Storage {
        let mut storage = Storage::new(StorageParameters::default(), Exclusions::default());
        storage.add_contig(Contig::new("chr1", Some("ACGT".repeat(10))));
        storage.insert_feature(Feature::new(
            "geneA",
            "geneA",
            "chr1",
            1,
            20,
            Strand::Forward,
            SoTerm::Gene,
        ));
        for sample in ["S1", "S2"] {
            storage.add_sample(sample);
            storage
                .add_variant_to_contig("chr1", sample, 5, "A", "G")
                .unwrap();
        }
        storage
            .add_variant_to_contig("chr1", "S1", 10, "CG", "C-")
            .unwrap();

        let s1 = storage.sample_mut("S1").unwrap();
        s1.add_call("chr1", 5, "1;30;60;A:.:0:-1,A:G:30:-1".to_string());
        s1.add_call("chr1", 10, "f1;10;-1;CG:.:5:-1,CG:C-:5:-1".to_string());
        s1.alleles.insert("geneA".to_string(), "n1".to_string());
        let s2 = storage.sample_mut("S2").unwrap();
        s2.add_call("chr1", 5, "1;20;41;A:.:0:-1,A:G:20:-1".to_string());
        s2.alleles
            .insert("geneA".to_string(), REFERENCE_IDENTIFIER.to_string());

        let feature = storage.feature_mut("geneA").unwrap();
        feature
            .get_or_create_allele("n1", BTreeMap::new())
            .add_occurrence("S1");
        feature
            .alleles
            .get_mut(REFERENCE_IDENTIFIER)
            .unwrap()
            .add_occurrence("S2");
        storage
    }

    fn attribute<'a>(sample: &'a Sample, key: &str) -> Option<&'a str> {
        sample.attributes.get(key)
    }

    #[rstest]
    fn test_sample_statistics(mut storage: Storage) {
        storage.update_statistics();
        let s1 = storage.sample("S1").unwrap();
        assert_eq!(attribute(s1, NUMBER_OF_CALLS), Some("2"));
        assert_eq!(attribute(s1, NUMBER_OF_FILTERED_CALLS), Some("1"));
        assert_eq!(attribute(s1, MEAN_COVERAGE), Some("20"));
        assert_eq!(attribute(s1, MEAN_QUALITY), Some("60"));
        assert_eq!(attribute(s1, NUMBER_OF_SUBSTITUTIONS), Some("1"));
        assert_eq!(attribute(s1, NUMBER_OF_INDELS), Some("1"));
        assert_eq!(attribute(s1, REFERENCE_FREQUENCY), Some("0E0"));
        assert_eq!(attribute(s1, PROTEOFORM_DISRUPTED_FREQUENCY), Some("0E0"));

        let s2 = storage.sample("S2").unwrap();
        assert_eq!(attribute(s2, NUMBER_OF_INDELS), Some("0"));
        assert_eq!(attribute(s2, REFERENCE_FREQUENCY), Some("1E0"));
    }

    #[rstest]
    fn test_variant_frequency(mut storage: Storage) {
        storage.update_statistics();
        let shared = storage.variant_information("chr1", 5, "G").unwrap();
        assert_eq!(shared.attributes.get(FREQUENCY), Some("1E0"));
        let private = storage.variant_information("chr1", 10, "C-").unwrap();
        assert_eq!(private.attributes.get(FREQUENCY), Some("5E-1"));
    }

    #[rstest]
    fn test_feature_statistics(mut storage: Storage) {
        storage.update_statistics();
        let feature = storage.feature("geneA").unwrap();
        assert_eq!(feature.attributes.get(REFERENCE_FREQUENCY), Some("5E-1"));
        assert_eq!(feature.attributes.get(NUMBER_OF_ALLELES), Some("2"));
        assert_eq!(feature.attributes.get(NUMBER_OF_PROTEOFORMS), None);
        assert_eq!(
            feature.allele("n1").unwrap().attributes.get(ALLELIC_FREQUENCY),
            Some("5E-1")
        );
    }

    #[rstest]
    fn test_statistics_leave_occurrences_untouched(mut storage: Storage) {
        let before = storage.feature("geneA").unwrap().alleles["n1"].occurrence.clone();
        storage.update_statistics();
        storage.update_statistics();
        assert_eq!(
            storage.feature("geneA").unwrap().alleles["n1"].occurrence,
            before
        );
    }

    #[rstest]
    fn test_coding_feature_products() {
        let mut storage = Storage::new(StorageParameters::default(), Exclusions::default());
        storage.add_contig(Contig::new("chr1", Some("ACGT".repeat(10))));
        let mut feature = Feature::new("orf", "orf", "chr1", 1, 12, Strand::Forward, SoTerm::Gene);
        feature.add_child(SoTerm::Cds, 1, 12);
        feature.refresh_kind();
        let disrupted = feature
            .get_or_create_proteoform("p1", BTreeMap::new())
            .unwrap();
        disrupted.attributes.set(DISRUPTED, "true");
        disrupted.add_occurrence("S1");
        storage.insert_feature(feature);
        storage.add_sample("S1").proteoforms.insert("orf".to_string(), "p1".to_string());

        storage.update_statistics();
        let feature = storage.feature("orf").unwrap();
        assert_eq!(feature.attributes.get(NUMBER_OF_PROTEOFORMS), Some("2"));
        assert_eq!(feature.attributes.get(PRODUCT_DISRUPTED_FREQUENCY), Some("5E-1"));
        assert_eq!(feature.attributes.get(PRODUCT_MODIFIED_FREQUENCY), Some("0E0"));
        let sample = storage.sample("S1").unwrap();
        assert_eq!(
            sample.attributes.get(PROTEOFORM_DISRUPTED_FREQUENCY),
            Some("1E0")
        );
    }
}
