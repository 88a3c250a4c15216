//! Aggregation of sample variants into alleles and proteoforms.
use std::collections::{BTreeMap, BTreeSet};

use allelix_core::consts::{PROTEOFORM, SEQUENCE_LENGTH_DEVIATION, SNPEFF_PREFIX, SO_EFFECTS};
use allelix_core::errors::StorageError;
use allelix_core::models::{Feature, REFERENCE_IDENTIFIER};
use allelix_core::storage::Storage;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::digest::sequence_type_identifier;
use crate::errors::SequenceTypeResult;
use crate::integrate::total_length_deviation;
use crate::proteoform::{ProteinContext, ProteoformInference};

/// Annotation key holding the effects of a single variant.
const SNPEFF_EFFECT: &str = "effect";

/// One allele of a feature with the samples that carry it.
#[derive(Debug)]
struct AlleleAssignment {
    variants: BTreeMap<u32, String>,
    samples: Vec<String>,
    attributes: Vec<(&'static str, String)>,
    proteoform: Option<ProteoformInference>,
}

#[derive(Debug)]
struct FeatureAssignment {
    feature: String,
    contig: String,
    alleles: BTreeMap<String, AlleleAssignment>,
}

/// Effects of an allele: the annotated effects of its variants and the net
/// frameshift.
fn allele_attributes(
    storage: &Storage,
    feature: &Feature,
    variants: &BTreeMap<u32, String>,
) -> Vec<(&'static str, String)> {
    let deviation = total_length_deviation(variants);
    let mut effects = BTreeSet::new();
    for (position, content) in variants {
        if let Some(information) = storage.variant_information(&feature.contig, *position, content) {
            effects.extend(
                information
                    .attributes
                    .get_collection(&format!("{SNPEFF_PREFIX}{SNPEFF_EFFECT}")),
            );
        }
    }
    let frameshift = (deviation % 3).abs();
    if frameshift != 0 {
        let direction = if deviation > 0 { "plus" } else { "minus" };
        effects.insert(format!("{direction}_{frameshift}_frameshift"));
    }

    let mut attributes = vec![(SEQUENCE_LENGTH_DEVIATION, deviation.to_string())];
    if !effects.is_empty() {
        attributes.push((SO_EFFECTS, effects.into_iter().collect::<Vec<_>>().join(",")));
    }
    attributes
}

/// Group `samples` by their allele of `feature` and infer the proteoform
/// of every allele. Only reads the store.
fn assign_feature(
    storage: &Storage,
    feature: &Feature,
    samples: &[String],
    infer_proteoforms: bool,
) -> FeatureAssignment {
    let mut alleles: BTreeMap<String, AlleleAssignment> = BTreeMap::new();
    for sample in samples {
        let variants = storage.sample_variants_in_feature(sample, feature);
        let uid = sequence_type_identifier(&variants);
        alleles
            .entry(uid)
            .or_insert_with(|| AlleleAssignment {
                attributes: if variants.is_empty() {
                    Vec::new()
                } else {
                    allele_attributes(storage, feature, &variants)
                },
                variants,
                samples: Vec::new(),
                proteoform: None,
            })
            .samples
            .push(sample.clone());
    }

    if infer_proteoforms && feature.is_coding() {
        let context = storage
            .contig(&feature.contig)
            .map(|contig| ProteinContext::new(feature, contig));
        match context {
            Some(Ok(context)) => {
                for allele in alleles.values_mut() {
                    allele.proteoform = Some(context.infer(&allele.variants));
                }
            }
            Some(Err(e)) => warn!("Skipping proteoforms of {}: {}", feature.name, e),
            None => warn!("Skipping proteoforms of {}: unknown contig", feature.name),
        }
    }

    FeatureAssignment {
        feature: feature.name.clone(),
        contig: feature.contig.clone(),
        alleles,
    }
}

/// Remove `sample` from its previous allele of `feature` if that differs
/// from `uid`. An allele left without samples is deleted together with its
/// variant occurrences, and so is its proteoform's occurrence on variants
/// no other allele of that proteoform holds.
fn release_previous_allele(storage: &mut Storage, feature: &str, sample: &str, uid: &str) {
    let Some(previous) = storage
        .sample(sample)
        .and_then(|s| s.alleles.get(feature))
        .filter(|previous| previous.as_str() != uid)
        .cloned()
    else {
        return;
    };
    let Some(target) = storage.feature_mut(feature) else {
        return;
    };
    let contig = target.contig.clone();
    let mut depleted = None;
    if let Some(allele) = target.allele_mut(&previous) {
        allele.remove_occurrence(sample);
        if !allele.is_reference() && allele.occurrence.is_empty() {
            depleted = target.alleles.remove(&previous);
        }
    }
    if let Some(proteoform) = storage
        .sample(sample)
        .and_then(|s| s.proteoforms.get(feature))
        .cloned()
    {
        if let Some(proteoforms) = storage.feature_mut(feature).and_then(Feature::proteoforms_mut) {
            if let Some(entry) = proteoforms.get_mut(&proteoform) {
                entry.remove_occurrence(sample);
                if !entry.is_reference() && entry.occurrence.is_empty() {
                    proteoforms.remove(&proteoform);
                }
            }
        }
    }
    if let Some(depleted) = depleted {
        let proteoform = depleted
            .attributes
            .get(PROTEOFORM)
            .filter(|uid| *uid != REFERENCE_IDENTIFIER)
            .map(str::to_string);
        for (position, content) in &depleted.variants {
            let released_proteoform = proteoform
                .as_deref()
                .filter(|uid| !proteoform_carries(storage, feature, uid, *position, content));
            if let Some(information) = storage.variant_information_mut(&contig, *position, content) {
                information.remove_sequence_type_occurrence(feature, &depleted.uid);
                if let Some(uid) = released_proteoform {
                    information.remove_sequence_type_occurrence(feature, uid);
                }
            }
        }
    }
}

/// Whether a remaining allele of `feature` links `proteoform` and holds the
/// variant at `position`.
fn proteoform_carries(
    storage: &Storage,
    feature: &str,
    proteoform: &str,
    position: u32,
    content: &str,
) -> bool {
    storage.feature(feature).is_some_and(|target| {
        target.alleles.values().any(|allele| {
            allele.attributes.get(PROTEOFORM) == Some(proteoform)
                && allele.variants.get(&position).map(String::as_str) == Some(content)
        })
    })
}

fn apply_assignment(storage: &mut Storage, assignment: FeatureAssignment) {
    let feature = assignment.feature;
    for (uid, allele) in assignment.alleles {
        for sample in &allele.samples {
            release_previous_allele(storage, &feature, sample, &uid);
        }

        let Some(target) = storage.feature_mut(&feature) else {
            continue;
        };
        let entry = target.get_or_create_allele(&uid, allele.variants.clone());
        for sample in &allele.samples {
            entry.add_occurrence(sample);
        }
        for (key, value) in &allele.attributes {
            entry.attributes.add_if_absent(key, value.as_str());
        }
        if let Some(proteoform) = &allele.proteoform {
            entry.attributes.set(PROTEOFORM, proteoform.uid.as_str());
            if let Some(entry) =
                target.get_or_create_proteoform(&proteoform.uid, proteoform.variants.clone())
            {
                for sample in &allele.samples {
                    entry.add_occurrence(sample);
                }
                for (key, value) in &proteoform.attributes {
                    entry.attributes.add_if_absent(key, value.as_str());
                }
            }
        }

        let proteoform_uid = allele
            .proteoform
            .as_ref()
            .map(|proteoform| proteoform.uid.as_str())
            .filter(|proteoform| *proteoform != REFERENCE_IDENTIFIER);
        for (position, content) in &allele.variants {
            if let Some(information) =
                storage.variant_information_mut(&assignment.contig, *position, content)
            {
                information.add_sequence_type_occurrence(&feature, &uid);
                if let Some(proteoform) = proteoform_uid {
                    information.add_sequence_type_occurrence(&feature, proteoform);
                }
            }
        }
        for sample in &allele.samples {
            if let Some(target) = storage.sample_mut(sample) {
                target.alleles.insert(feature.clone(), uid.clone());
                match &allele.proteoform {
                    Some(proteoform) => {
                        target.proteoforms.insert(feature.clone(), proteoform.uid.clone());
                    }
                    None => {
                        target.proteoforms.remove(&feature);
                    }
                }
            }
        }
    }
}

/// Assign every sample in `samples` its allele (and proteoform) of every
/// feature. Samples without variants in a feature carry the reference.
///
/// Features are processed in parallel against a shared borrow of the
/// store, the assignments are then applied by this thread. Re-running with
/// the same data leaves the store unchanged.
pub fn update_sequence_types(storage: &mut Storage, samples: &[String]) -> SequenceTypeResult<()> {
    if let Some(unknown) = samples.iter().find(|s| storage.sample(s).is_none()) {
        return Err(StorageError::UnknownSample(unknown.clone()).into());
    }
    let infer_proteoforms = !storage.parameters.skip_proteoform_inference;
    let assignments: Vec<FeatureAssignment> = {
        let shared: &Storage = storage;
        let features: Vec<&Feature> = shared.features().collect();
        features
            .par_iter()
            .map(|feature| assign_feature(shared, feature, samples, infer_proteoforms))
            .collect()
    };

    let mut alleles = 0;
    for assignment in assignments {
        debug!(
            "Feature {}: {} alleles among {} samples",
            assignment.feature,
            assignment.alleles.len(),
            samples.len()
        );
        alleles += assignment
            .alleles
            .keys()
            .filter(|uid| uid.as_str() != REFERENCE_IDENTIFIER)
            .count();
        apply_assignment(storage, assignment);
    }
    info!("Assigned {} non-reference alleles", alleles);
    Ok(())
}
