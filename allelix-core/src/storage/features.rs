//! Feature ingestion and Sequence Ontology validation.
use log::{debug, warn};

use super::Storage;
use crate::models::{Feature, FeatureRecord, SoTerm, Strand};

const IDENTITY_ATTRIBUTES: [&str; 3] = ["Parent", "ID", "locus_tag"];
const NAME_ATTRIBUTES: [&str; 3] = ["Name", "gene", "locus_tag"];

impl Storage {
    /// Insert a feature as is, replacing any feature of the same name.
    pub fn insert_feature(&mut self, feature: Feature) {
        self.features.insert(feature.name.clone(), feature);
        self.invalidate_feature_index();
    }

    /// Merge one annotation record into the feature set.
    ///
    /// Records of unsupported type or with invalid coordinates are skipped.
    /// Records sharing an identity with a known feature (transcripts and
    /// CDS of a gene, for instance) are attached to it as children if they
    /// lie within its span. Returns the name of the feature the record was
    /// merged into.
    pub fn add_feature(&mut self, record: &FeatureRecord) -> Option<String> {
        let Some(so_term) = SoTerm::from_gff3(&record.so_term) else {
            debug!("Skipping feature of unsupported type {}", record.so_term);
            return None;
        };
        if record.start < 1 || record.start >= record.end {
            warn!(
                "Skipping {} feature with invalid location {}..{}",
                record.so_term, record.start, record.end
            );
            return None;
        }
        let Some(contig) = self.contigs.get(&record.contig) else {
            warn!(
                "Skipping {} feature on unknown contig {}",
                record.so_term, record.contig
            );
            return None;
        };
        let length = contig.length();
        if length > 0 && record.end as usize > length {
            warn!(
                "Skipping {} feature {}..{} exceeding the length {} of contig {}",
                record.so_term, record.start, record.end, length, record.contig
            );
            return None;
        }

        let uid = feature_uid(record);
        if let Some(existing) = self.features.values_mut().find(|f| f.uid == uid) {
            if !existing.encloses(record.start, record.end) {
                warn!(
                    "Dropping {} {}..{}: it is not contained in its parent feature {} ({}..{})",
                    record.so_term,
                    record.start,
                    record.end,
                    existing.name,
                    existing.start,
                    existing.end
                );
                return None;
            }
            existing.add_child(so_term, record.start, record.end);
            return Some(existing.name.clone());
        }

        let mut name = NAME_ATTRIBUTES
            .iter()
            .find_map(|key| record.attributes.get(*key))
            .cloned()
            .unwrap_or_else(|| uid.clone());
        if self.features.contains_key(&name) {
            name = format!("{name}_{uid}");
        }
        let mut feature = Feature::new(
            &name,
            &uid,
            &record.contig,
            record.start,
            record.end,
            record.strand,
            so_term,
        );
        for (key, value) in &record.attributes {
            feature.attributes.set(key, value.as_str());
        }
        self.insert_feature(feature);
        Some(name)
    }

    /// Bring every feature in line with the SO hierarchy.
    ///
    /// Features of level 2 or 3 are lifted to genes, keeping their own term
    /// as a child. Missing children are imputed from the feature span: a CDS
    /// implies an mRNA and vice versa, any other transcript implies an
    /// exon. If there are no features at all, one region per contig is
    /// derived.
    pub fn validate_features(&mut self) {
        if self.features.is_empty() {
            let regions: Vec<Feature> = self
                .contigs
                .values()
                .filter(|c| c.length() > 0)
                .map(|c| {
                    Feature::new(
                        &c.name,
                        &c.name,
                        &c.name,
                        1,
                        c.length() as u32,
                        Strand::Forward,
                        SoTerm::Region,
                    )
                })
                .collect();
            for region in regions {
                self.features.insert(region.name.clone(), region);
            }
        }

        for feature in self.features.values_mut() {
            if feature.so_term.level() > 1 {
                let (start, end) = (feature.start, feature.end);
                feature.add_child(feature.so_term, start, end);
                feature.so_term = SoTerm::Gene;
            }

            let transcripts: Vec<SoTerm> = feature
                .children
                .keys()
                .filter(|term| term.level() == 2)
                .copied()
                .collect();
            if transcripts.len() > 1 {
                warn!(
                    "Feature {} has more than one transcript type ({}), keeping {}",
                    feature.name,
                    transcripts
                        .iter()
                        .map(SoTerm::as_str)
                        .collect::<Vec<_>>()
                        .join(","),
                    transcripts[0]
                );
                for term in &transcripts[1..] {
                    feature.children.remove(term);
                }
            }

            let span = (feature.start, feature.end);
            let transcript = transcripts.first().copied();
            match transcript {
                None if feature.has_child(SoTerm::Cds) => {
                    feature.add_child(SoTerm::MRna, span.0, span.1)
                }
                Some(SoTerm::MRna) if !feature.has_child(SoTerm::Cds) => {
                    feature.add_child(SoTerm::Cds, span.0, span.1)
                }
                Some(term) if term != SoTerm::MRna && !feature.has_child(SoTerm::Exon) => {
                    feature.add_child(SoTerm::Exon, span.0, span.1)
                }
                _ => {}
            }
            feature.refresh_kind();
        }
        self.invalidate_feature_index();
    }
}

/// Identity shared by a gene and its sub-features. Prefixed identifiers such
/// as `gene-b0001` or `rna-b0001` reduce to `b0001`.
fn feature_uid(record: &FeatureRecord) -> String {
    IDENTITY_ATTRIBUTES
        .iter()
        .find_map(|key| record.attributes.get(*key))
        .map(|value| {
            value
                .split_once('-')
                .map_or(value.as_str(), |(_, suffix)| suffix)
                .to_string()
        })
        .unwrap_or_else(|| format!("{}:{}..{}", record.contig, record.start, record.end))
}
