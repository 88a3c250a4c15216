//! Clustering of the sequence types of a feature.
//!
//! A [ClusteringService] groups sequence types by their variant lists. The
//! resulting label, index and outlier score are stored as attributes and
//! give every sequence type a readable name, `{feature}.a{label}.{index}`
//! for alleles and `{feature}.p{label}.{index}` for proteoforms.
use std::collections::BTreeMap;

use allelix_core::consts::{CLUSTER_INDEX, CLUSTER_LABEL, CLUSTER_OUTLIER_SCORE};
use allelix_core::models::{Feature, SequenceType};
use allelix_core::storage::Storage;
use fxhash::{FxHashMap, FxHashSet};
use log::info;
use rayon::prelude::*;

/// Minimum number of members of a labeled cluster.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 4;

/// Maximum distance of two sequence types joined by a link.
pub const DEFAULT_LINKAGE_THRESHOLD: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEntry {
    pub uid: String,
    pub variants: BTreeMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    pub uid: String,
    /// 0 for entries that belong to no cluster.
    pub label: usize,
    /// 1-based rank within the label.
    pub index: usize,
    pub outlier_score: f64,
}

pub trait ClusteringService: Sync {
    fn cluster(&self, entries: &[ClusterEntry]) -> Vec<ClusterAssignment>;
}

/// Single linkage clustering on the number of variants two sequence types
/// don't share.
#[derive(Debug, Clone, Copy)]
pub struct LinkageClustering {
    pub threshold: usize,
    pub min_cluster_size: usize,
}

impl Default for LinkageClustering {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LINKAGE_THRESHOLD,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
        }
    }
}

fn find(parents: &mut [usize], i: usize) -> usize {
    let mut root = i;
    while parents[root] != root {
        root = parents[root];
    }
    let mut node = i;
    while parents[node] != root {
        let next = parents[node];
        parents[node] = root;
        node = next;
    }
    root
}

impl ClusteringService for LinkageClustering {
    fn cluster(&self, entries: &[ClusterEntry]) -> Vec<ClusterAssignment> {
        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by(|a, b| entries[*a].uid.cmp(&entries[*b].uid));
        let features: Vec<FxHashSet<String>> = order
            .iter()
            .map(|i| {
                entries[*i]
                    .variants
                    .iter()
                    .map(|(position, content)| format!("{position}{content}"))
                    .collect()
            })
            .collect();

        let n = features.len();
        let mut parents: Vec<usize> = (0..n).collect();
        let mut nearest = vec![usize::MAX; n];
        for i in 0..n {
            for j in i + 1..n {
                let distance = features[i].symmetric_difference(&features[j]).count();
                nearest[i] = nearest[i].min(distance);
                nearest[j] = nearest[j].min(distance);
                if distance <= self.threshold {
                    let (a, b) = (find(&mut parents, i), find(&mut parents, j));
                    if a != b {
                        parents[b.max(a)] = a.min(b);
                    }
                }
            }
        }

        let mut sizes: FxHashMap<usize, usize> = FxHashMap::default();
        for i in 0..n {
            *sizes.entry(find(&mut parents, i)).or_default() += 1;
        }
        let mut labels: FxHashMap<usize, usize> = FxHashMap::default();
        let mut counts: FxHashMap<usize, usize> = FxHashMap::default();
        let mut assignments = Vec::with_capacity(n);
        for (rank, entry) in order.iter().enumerate() {
            let root = find(&mut parents, rank);
            let label = if sizes[&root] < self.min_cluster_size {
                0
            } else {
                let next = labels.len() + 1;
                *labels.entry(root).or_insert(next)
            };
            let index = counts.entry(label).or_default();
            *index += 1;
            let outlier_score = match nearest[rank] {
                usize::MAX => 1.0,
                distance => 1.0 - 1.0 / (1.0 + distance as f64),
            };
            assignments.push(ClusterAssignment {
                uid: entries[*entry].uid.clone(),
                label,
                index: *index,
                outlier_score,
            });
        }
        assignments
    }
}

fn entries(sequence_types: &BTreeMap<String, SequenceType>) -> Vec<ClusterEntry> {
    sequence_types
        .values()
        .filter(|sequence_type| !sequence_type.is_reference())
        .map(|sequence_type| ClusterEntry {
            uid: sequence_type.uid.clone(),
            variants: sequence_type.variants.clone(),
        })
        .collect()
}

fn apply(
    feature: &str,
    marker: char,
    sequence_types: &mut BTreeMap<String, SequenceType>,
    assignments: Vec<ClusterAssignment>,
) {
    for assignment in assignments {
        let Some(sequence_type) = sequence_types.get_mut(&assignment.uid) else {
            continue;
        };
        sequence_type.name = Some(format!(
            "{feature}.{marker}{}.{}",
            assignment.label, assignment.index
        ));
        let attributes = &mut sequence_type.attributes;
        attributes.set(CLUSTER_LABEL, assignment.label.to_string());
        attributes.set(CLUSTER_INDEX, assignment.index.to_string());
        attributes.set(
            CLUSTER_OUTLIER_SCORE,
            format!("{:.3}", assignment.outlier_score),
        );
    }
}

/// Cluster the alleles and proteoforms of every feature and name them
/// after their cluster. Reference sequence types are left out.
pub fn apply_clustering(storage: &mut Storage, service: &dyn ClusteringService) {
    type FeatureClusters = (String, Vec<ClusterAssignment>, Vec<ClusterAssignment>);
    let clusters: Vec<FeatureClusters> = {
        let features: Vec<&Feature> = storage.features().collect();
        features
            .par_iter()
            .map(|feature| {
                let alleles = service.cluster(&entries(&feature.alleles));
                let proteoforms = feature
                    .proteoforms()
                    .map(|proteoforms| service.cluster(&entries(proteoforms)))
                    .unwrap_or_default();
                (feature.name.clone(), alleles, proteoforms)
            })
            .collect()
    };

    let mut clustered = 0;
    for (name, alleles, proteoforms) in clusters {
        let Some(feature) = storage.feature_mut(&name) else {
            continue;
        };
        clustered += alleles.len() + proteoforms.len();
        apply(&name, 'a', &mut feature.alleles, alleles);
        if let Some(target) = feature.proteoforms_mut() {
            apply(&name, 'p', target, proteoforms);
        }
    }
    info!("Clustered {} sequence types", clustered);
}
