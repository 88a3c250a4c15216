//! Transfer of call records into canonical variants.
//!
//! Calls of a sample are walked per contig in position order. Every call is
//! reduced to canonical variants; deletions open a block that absorbs
//! everything they overlap, so that adjacent or overlapping indel evidence
//! ends up as one variant.
use std::collections::BTreeMap;

use allelix_core::models::{Sample, VariantType};
use allelix_core::sequence::{GAP, resolve_spanning_deletion, strip_gaps};
use allelix_core::storage::Storage;
use log::{debug, warn};
use rayon::prelude::*;

use crate::calls::CallRecord;
use crate::errors::VariantResult;
use crate::normalize::normalize;

/// A canonical variant of one sample, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCommit {
    pub contig: String,
    pub position: u32,
    pub reference: String,
    pub alternative: String,
}

/// Resolves the calls of a sample into canonical variants.
#[derive(Debug, Clone, Copy)]
pub struct VariantMerger {
    store_filtered: bool,
}

impl VariantMerger {
    pub fn new(store_filtered: bool) -> Self {
        Self { store_filtered }
    }

    /// Resolve every call of `sample`. This only reads the sample, nothing
    /// is committed.
    pub fn resolve_sample(&self, sample: &Sample) -> VariantResult<Vec<VariantCommit>> {
        let mut commits = Vec::new();
        for (contig, calls) in &sample.calls {
            let reports = self.collect_reports(&sample.name, calls)?;
            commits.extend(
                merge_reports(reports)?
                    .into_iter()
                    .map(|(position, reference, alternative)| VariantCommit {
                        contig: contig.clone(),
                        position,
                        reference,
                        alternative,
                    }),
            );
        }
        Ok(commits)
    }

    /// Reduce the calls of one contig to canonical variants keyed by
    /// position. Two variants at one position keep the one whose reference
    /// contains the other's; unrelated ones keep the first.
    fn collect_reports(
        &self,
        sample: &str,
        calls: &BTreeMap<u32, String>,
    ) -> VariantResult<BTreeMap<u32, (String, String)>> {
        let mut reports: BTreeMap<u32, (String, String)> = BTreeMap::new();
        for (position, call) in calls {
            let record: CallRecord = match call.parse() {
                Ok(record) => record,
                Err(e) => {
                    warn!("Sample {}: skipping call at {}: {}", sample, position, e);
                    continue;
                }
            };
            let Some(chosen) = record.chosen() else {
                continue;
            };
            let (reference, alternative) = if record.is_filtered() {
                if !self.store_filtered {
                    continue;
                }
                let reference = strip_gaps(&chosen.reference);
                let ambiguous = "N".repeat(reference.len());
                (reference, ambiguous)
            } else if chosen.is_reference() {
                continue;
            } else {
                (chosen.reference.clone(), chosen.alternative.clone())
            };

            for variant in normalize(&reference, &alternative)? {
                let at = position + variant.offset;
                match reports.get(&at) {
                    None => {
                        reports.insert(at, (variant.reference, variant.alternative));
                    }
                    Some((existing, _)) => {
                        let existing = strip_gaps(existing);
                        let incoming = strip_gaps(&variant.reference);
                        if existing.contains(&incoming) {
                            continue;
                        }
                        if incoming.contains(&existing) {
                            reports.insert(at, (variant.reference, variant.alternative));
                        } else {
                            warn!(
                                "Sample {}: conflicting variants at {}, keeping the first",
                                sample, at
                            );
                        }
                    }
                }
            }
        }
        Ok(reports)
    }
}

/// An open deletion block: the reference and alternative content from
/// `start` up to `extension`, including spliced insertions.
struct DeletionBlock {
    start: u32,
    extension: u32,
    reference: String,
    alternative: String,
}

impl DeletionBlock {
    fn open(start: u32, reference: String, alternative: String) -> Self {
        Self {
            start,
            extension: start + reference.len() as u32 - 1,
            reference,
            alternative,
        }
    }

    fn extend(&mut self, position: u32, reference: &str, alternative: &str) {
        let end = position + reference.len() as u32 - 1;
        if end <= self.extension {
            return;
        }
        let overhang = (end - self.extension) as usize;
        self.reference.push_str(&reference[reference.len() - overhang..]);
        self.alternative.push_str(&alternative[alternative.len() - overhang..]);
        self.extension = end;
    }

    /// Splice the inserted bases behind the reference base at `position`.
    fn splice(&mut self, position: u32, reference: &str, alternative: &str) {
        let target = (position - self.start) as usize;
        let column = self
            .reference
            .char_indices()
            .filter(|(_, c)| *c != GAP)
            .nth(target)
            .map(|(i, _)| i + 1);
        match column {
            Some(column) => {
                self.reference.insert_str(column, &reference[1..]);
                self.alternative.insert_str(column, &alternative[1..]);
            }
            None => warn!("Insertion at {} is outside of the deletion block", position),
        }
    }

    fn close(self, commits: &mut Vec<(u32, String, String)>) -> VariantResult<()> {
        if VariantType::of_padded(&self.reference, &self.alternative).is_some() {
            commits.push((self.start, self.reference, self.alternative));
            return Ok(());
        }
        for variant in normalize(&strip_gaps(&self.reference), &strip_gaps(&self.alternative))? {
            commits.push((
                self.start + variant.offset,
                variant.reference,
                variant.alternative,
            ));
        }
        Ok(())
    }
}

/// Walk the canonical variants of one contig in position order and join
/// overlapping evidence.
///
/// A deletion opens a block. While it is open, deletions starting inside
/// extend it, insertions are spliced into it and single base variants are
/// absorbed. A variant starting behind the block closes it. Spanning
/// deletion placeholders are resolved against the reference base and
/// dropped if nothing remains.
pub fn merge_reports(
    reports: BTreeMap<u32, (String, String)>,
) -> VariantResult<Vec<(u32, String, String)>> {
    let mut commits = Vec::new();
    let mut block: Option<DeletionBlock> = None;

    for (position, (reference, alternative)) in reports {
        if let Some(open) = block.take_if(|open| position > open.extension) {
            open.close(&mut commits)?;
        }
        let alternative = resolve_spanning_deletion(&reference, &alternative);
        if reference == alternative {
            continue;
        }
        let kind = VariantType::of_padded(&reference, &alternative);

        match block.as_mut() {
            None => match kind {
                Some(VariantType::Deletion) => {
                    block = Some(DeletionBlock::open(position, reference, alternative));
                }
                Some(_) => commits.push((position, reference, alternative)),
                None => warn!(
                    "Failed to handle variant {}{}>{}",
                    position, reference, alternative
                ),
            },
            Some(_) if reference.len() == 1 && alternative.len() == 1 => {
                debug!("Variant {}{}>{} absorbed by a deletion", position, reference, alternative);
            }
            Some(open) => match kind {
                Some(VariantType::Deletion) => open.extend(position, &reference, &alternative),
                Some(VariantType::Insertion) => open.splice(position, &reference, &alternative),
                _ => warn!(
                    "Failed to handle variant {}{}>{}",
                    position, reference, alternative
                ),
            },
        }
    }
    if let Some(open) = block {
        open.close(&mut commits)?;
    }
    Ok(commits)
}

/// Resolve the calls of `samples` into canonical variants and commit them.
///
/// Resolution runs in parallel over the samples, the commits are applied
/// serially. Returns the number of variants created by this transfer.
pub fn transfer_variants(storage: &mut Storage, samples: &[String]) -> VariantResult<usize> {
    let merger = VariantMerger::new(storage.parameters.store_filtered);
    let resolved: Vec<(String, Vec<VariantCommit>)> = {
        let shared: &Storage = storage;
        samples
            .par_iter()
            .filter_map(|name| shared.sample(name))
            .map(|sample| {
                merger
                    .resolve_sample(sample)
                    .map(|commits| (sample.name.clone(), commits))
            })
            .collect::<VariantResult<_>>()?
    };

    let mut created = 0;
    for (sample, commits) in resolved {
        debug!("Sample {}: committing {} variants", sample, commits.len());
        for commit in commits {
            if storage.add_variant_to_contig(
                &commit.contig,
                &sample,
                commit.position,
                &commit.reference,
                &commit.alternative,
            )? {
                created += 1;
            }
        }
    }
    Ok(created)
}
