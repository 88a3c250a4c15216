use std::collections::HashMap;

use rust_lapper::{Interval, Lapper};

use crate::models::Feature;

/// Per-contig interval trees over feature spans, used to find the features
/// a committed variant falls into.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    trees: HashMap<String, Lapper<u32, String>>,
}

impl FeatureIndex {
    pub fn build<'a>(features: impl Iterator<Item = &'a Feature>) -> Self {
        let mut intervals: HashMap<String, Vec<Interval<u32, String>>> = HashMap::new();
        for feature in features {
            // lapper intervals are half-open
            intervals
                .entry(feature.contig.clone())
                .or_default()
                .push(Interval {
                    start: feature.start,
                    stop: feature.end.saturating_add(1),
                    val: feature.name.clone(),
                });
        }
        let trees = intervals
            .into_iter()
            .map(|(contig, intervals)| (contig, Lapper::new(intervals)))
            .collect();
        Self { trees }
    }

    /// Names of the features whose inclusive span contains `position`.
    pub fn features_at(&self, contig: &str, position: u32) -> Vec<String> {
        let mut names: Vec<String> = self
            .trees
            .get(contig)
            .map(|tree| {
                tree.find(position, position.saturating_add(1))
                    .map(|interval| interval.val.clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
