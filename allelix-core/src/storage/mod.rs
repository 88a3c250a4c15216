//! The variant store.
//!
//! [Storage] owns every contig, feature and sample of a build. Variant
//! commits, feature ingestion and sample removal all take `&mut self`, so a
//! single writer applies them in order while read-only work (call
//! resolution, merge resolution) can run in parallel on a shared borrow.
pub mod features;
pub mod index;
pub mod io;
pub mod removal;
pub mod samples;

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{Exclusions, StorageParameters};
use crate::errors::{StorageError, StorageResult};
use crate::models::{
    Contig, Feature, Sample, SequenceType, VariantInformation, VariantKey, VariantType,
};

use self::index::FeatureIndex;

/// A variant created by a commit, queued for external annotation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NovelVariant {
    pub contig: String,
    pub position: u32,
    pub reference: String,
    pub alternative: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Storage {
    #[serde(default)]
    pub parameters: StorageParameters,
    #[serde(default)]
    pub exclusions: Exclusions,
    contigs: BTreeMap<String, Contig>,
    features: BTreeMap<String, Feature>,
    samples: BTreeMap<String, Sample>,
    #[serde(skip)]
    novel_variants: Vec<NovelVariant>,
    #[serde(skip)]
    feature_index: Option<FeatureIndex>,
}

impl Storage {
    pub fn new(parameters: StorageParameters, exclusions: Exclusions) -> Self {
        Self {
            parameters,
            exclusions,
            ..Default::default()
        }
    }

    /// Register a contig. Re-adding a known contig only fills in a missing
    /// sequence; its variants are kept.
    pub fn add_contig(&mut self, contig: Contig) {
        match self.contigs.get_mut(&contig.name) {
            Some(existing) => {
                if existing.sequence.is_none() {
                    existing.sequence = contig.sequence;
                }
            }
            None => {
                self.contigs.insert(contig.name.clone(), contig);
            }
        }
    }

    pub fn contig(&self, name: &str) -> Option<&Contig> {
        self.contigs.get(name)
    }

    pub fn contig_mut(&mut self, name: &str) -> Option<&mut Contig> {
        self.contigs.get_mut(name)
    }

    pub fn contigs(&self) -> impl Iterator<Item = &Contig> {
        self.contigs.values()
    }

    pub fn has_contig(&self, name: &str) -> bool {
        self.contigs.contains_key(name)
    }

    /// Get the sample, creating it if it is not known yet.
    pub fn add_sample(&mut self, name: &str) -> &mut Sample {
        self.samples
            .entry(name.to_string())
            .or_insert_with(|| Sample::new(name))
    }

    pub fn sample(&self, name: &str) -> Option<&Sample> {
        self.samples.get(name)
    }

    pub fn sample_mut(&mut self, name: &str) -> Option<&mut Sample> {
        self.samples.get_mut(name)
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.values()
    }

    pub fn sample_names(&self) -> Vec<String> {
        self.samples.keys().cloned().collect()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn feature_mut(&mut self, name: &str) -> Option<&mut Feature> {
        self.features.get_mut(name)
    }

    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.keys().cloned().collect()
    }

    /// Names of the features on `contig` whose span contains `position`.
    pub fn features_at(&self, contig: &str, position: u32) -> Vec<String> {
        match &self.feature_index {
            Some(index) => index.features_at(contig, position),
            None => self
                .features
                .values()
                .filter(|f| f.contig == contig && f.contains(position))
                .map(|f| f.name.clone())
                .collect(),
        }
    }

    fn ensure_feature_index(&mut self) {
        if self.feature_index.is_none() {
            self.feature_index = Some(FeatureIndex::build(self.features.values()));
        }
    }

    pub(crate) fn invalidate_feature_index(&mut self) {
        self.feature_index = None;
    }

    /// Commit one canonical variant of `sample`.
    ///
    /// The pair must be in padded canonical form. The entry at
    /// (`position`, `alternative`) is created if needed; the sample and every
    /// feature overlapping `position` are recorded on it. Returns `true` if
    /// the entry was created by this call.
    pub fn add_variant_to_contig(
        &mut self,
        contig: &str,
        sample: &str,
        position: u32,
        reference: &str,
        alternative: &str,
    ) -> StorageResult<bool> {
        let variant_type = VariantType::of_padded(reference, alternative).ok_or_else(|| {
            StorageError::NonCanonicalVariant {
                reference: reference.to_string(),
                alternative: alternative.to_string(),
            }
        })?;
        if position == 0 {
            return Err(StorageError::InvalidPosition(contig.to_string()));
        }
        if !self.samples.contains_key(sample) {
            return Err(StorageError::UnknownSample(sample.to_string()));
        }
        self.ensure_feature_index();
        let features = self.features_at(contig, position);

        let target = self
            .contigs
            .get_mut(contig)
            .ok_or_else(|| StorageError::UnknownContig(contig.to_string()))?;
        let (information, created) = target
            .get_or_create_variant(VariantKey::new(position, alternative), || {
                VariantInformation::new(reference, variant_type)
            });
        if !created && information.reference != reference {
            warn!(
                "Reference mismatch for variant {}:{}{}, keeping {} over {}",
                contig, position, alternative, information.reference, reference
            );
        }
        information.add_sample_occurrence(sample);
        for feature in &features {
            information.add_feature_occurrence(feature);
        }

        if created {
            self.novel_variants.push(NovelVariant {
                contig: contig.to_string(),
                position,
                reference: reference.to_string(),
                alternative: alternative.to_string(),
            });
        }
        Ok(created)
    }

    /// Drain the queue of variants created since the last call.
    pub fn take_novel_variants(&mut self) -> Vec<NovelVariant> {
        std::mem::take(&mut self.novel_variants)
    }

    pub fn variant_information(
        &self,
        contig: &str,
        position: u32,
        alternative: &str,
    ) -> Option<&VariantInformation> {
        self.contigs.get(contig)?.variant(position, alternative)
    }

    pub fn variant_information_mut(
        &mut self,
        contig: &str,
        position: u32,
        alternative: &str,
    ) -> Option<&mut VariantInformation> {
        self.contigs.get_mut(contig)?.variant_mut(position, alternative)
    }

    /// Variants of `feature` that are part of any of the given alleles or
    /// proteoforms.
    pub fn variants_by_feature_and_alleles(
        &self,
        feature: &str,
        uids: &[&str],
    ) -> StorageResult<Vec<(&VariantKey, &VariantInformation)>> {
        let feature = self
            .features
            .get(feature)
            .ok_or_else(|| StorageError::UnknownFeature(feature.to_string()))?;
        let contig = self
            .contigs
            .get(&feature.contig)
            .ok_or_else(|| StorageError::UnknownContig(feature.contig.clone()))?;
        Ok(contig
            .variants_in(feature.start..=feature.end)
            .filter(|(_, information)| {
                information
                    .features
                    .get(&feature.name)
                    .is_some_and(|occurrence| uids.iter().any(|uid| occurrence.contains(*uid)))
            })
            .collect())
    }

    /// Every variant carried by `sample`, per contig in position order.
    pub fn variants_by_sample(
        &self,
        sample: &str,
    ) -> StorageResult<BTreeMap<&str, Vec<(&VariantKey, &VariantInformation)>>> {
        if !self.samples.contains_key(sample) {
            return Err(StorageError::UnknownSample(sample.to_string()));
        }
        Ok(self
            .contigs
            .values()
            .map(|contig| {
                let variants: Vec<_> = contig
                    .variants()
                    .filter(|(_, information)| information.has_sample(sample))
                    .collect();
                (contig.name.as_str(), variants)
            })
            .filter(|(_, variants)| !variants.is_empty())
            .collect())
    }

    /// Variants of `sample` within `feature`, as position to padded content.
    pub fn sample_variants_in_feature(
        &self,
        sample: &str,
        feature: &Feature,
    ) -> BTreeMap<u32, String> {
        self.contigs
            .get(&feature.contig)
            .map(|contig| {
                contig
                    .variants_in(feature.start..=feature.end)
                    .filter(|(_, information)| information.has_sample(sample))
                    .map(|(key, _)| (key.position, key.alternative.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn alleles_of(&self, feature: &str) -> StorageResult<&BTreeMap<String, SequenceType>> {
        self.features
            .get(feature)
            .map(|f| &f.alleles)
            .ok_or_else(|| StorageError::UnknownFeature(feature.to_string()))
    }

    /// Proteoforms of a feature, `None` if the feature is not coding.
    pub fn proteoforms_of(
        &self,
        feature: &str,
    ) -> StorageResult<Option<&BTreeMap<String, SequenceType>>> {
        self.features
            .get(feature)
            .map(Feature::proteoforms)
            .ok_or_else(|| StorageError::UnknownFeature(feature.to_string()))
    }

    pub fn allele(&self, feature: &str, uid: &str) -> Option<&SequenceType> {
        self.features.get(feature)?.allele(uid)
    }

    pub fn proteoform(&self, feature: &str, uid: &str) -> Option<&SequenceType> {
        self.features.get(feature)?.proteoform(uid)
    }

    /// Distinct sample names referenced by any variant, used to sanity check
    /// occurrence bookkeeping.
    pub fn samples_with_variants(&self) -> BTreeSet<&str> {
        self.contigs
            .values()
            .flat_map(|c| c.variants())
            .flat_map(|(_, information)| information.samples.iter().map(String::as_str))
            .collect()
    }
}
