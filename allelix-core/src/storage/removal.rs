use std::collections::BTreeMap;

use log::{info, warn};

use super::Storage;
use crate::models::SequenceType;

impl Storage {
    /// Remove samples and every trace of them.
    ///
    /// Variants, alleles and proteoforms that are left without any sample are
    /// deleted as well. Reference sequence types are always kept.
    pub fn remove_samples(&mut self, names: &[&str]) {
        for name in names {
            if self.samples.remove(*name).is_none() {
                warn!("Can't remove unknown sample {name}");
                continue;
            }

            for contig in self.contigs.values_mut() {
                contig.retain_variants(|_, information| {
                    information.samples.remove(*name);
                    !information.samples.is_empty()
                });
            }

            for feature in self.features.values_mut() {
                let mut depleted = drop_occurrence(&mut feature.alleles, name);
                if let Some(proteoforms) = feature.proteoforms_mut() {
                    depleted.extend(drop_occurrence(proteoforms, name));
                }
                if depleted.is_empty() {
                    continue;
                }
                if let Some(contig) = self.contigs.get_mut(&feature.contig) {
                    let feature_name = feature.name.clone();
                    contig.retain_variants(|key, information| {
                        if feature.contains(key.position) {
                            for uid in &depleted {
                                information.remove_sequence_type_occurrence(&feature_name, uid);
                            }
                        }
                        true
                    });
                }
            }
            info!("Removed sample {name}");
        }
    }
}

/// Returns the identifiers of sequence types left without occurrence.
fn drop_occurrence(sequence_types: &mut BTreeMap<String, SequenceType>, sample: &str) -> Vec<String> {
    let mut depleted = Vec::new();
    sequence_types.retain(|uid, sequence_type| {
        sequence_type.remove_occurrence(sample);
        let keep = sequence_type.is_reference() || !sequence_type.occurrence.is_empty();
        if !keep {
            depleted.push(uid.clone());
        }
        keep
    });
    depleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contig, Feature, SoTerm, Strand};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_remove_sample_cascades() {
        let mut storage = Storage::default();
        storage.add_contig(Contig::new("chr1", Some("ACGT".repeat(50))));
        storage.insert_feature(Feature::new(
            "geneA", "geneA", "chr1", 1, 200, Strand::Forward, SoTerm::Gene,
        ));
        storage.add_sample("S1");
        storage.add_sample("S2");
        storage.add_variant_to_contig("chr1", "S1", 10, "G", "T").unwrap();
        storage.add_variant_to_contig("chr1", "S1", 20, "A", "C").unwrap();
        storage.add_variant_to_contig("chr1", "S2", 20, "A", "C").unwrap();

        {
            let feature = storage.feature_mut("geneA").unwrap();
            let allele = feature.get_or_create_allele(
                "p1",
                BTreeMap::from([(10, "T".to_string()), (20, "C".to_string())]),
            );
            allele.add_occurrence("S1");
            let allele = feature.get_or_create_allele("p2", BTreeMap::from([(20, "C".to_string())]));
            allele.add_occurrence("S2");
        }
        storage
            .variant_information_mut("chr1", 20, "C")
            .unwrap()
            .add_sequence_type_occurrence("geneA", "p1");

        storage.remove_samples(&["S1", "S9"]);

        assert!(storage.sample("S1").is_none());
        assert!(storage.variant_information("chr1", 10, "T").is_none());
        let shared = storage.variant_information("chr1", 20, "C").unwrap();
        assert_eq!(shared.samples.len(), 1);
        assert!(shared.features["geneA"].is_empty());
        let alleles = storage.alleles_of("geneA").unwrap();
        assert!(!alleles.contains_key("p1"));
        assert!(alleles.contains_key("p2"));
        assert!(alleles.contains_key("reference"));
        assert_eq!(storage.samples_with_variants().len(), 1);
    }
}
