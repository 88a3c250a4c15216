//! Functional annotation of variants.
//!
//! Novel variants queued by the store are handed to an [AnnotationService];
//! the returned attributes are stored on the variants with the `snpeff_`
//! prefix. [AnnotatedVcf] serves annotations from a VCF file that was
//! annotated with SnpEff beforehand.
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use allelix_core::consts::SNPEFF_PREFIX;
use allelix_core::models::{VariantKey, VariantType};
use allelix_core::sequence::pad_to_equal_length;
use allelix_core::storage::{NovelVariant, Storage};
use allelix_core::utils::get_dynamic_reader;
use fxhash::FxHashMap;
use log::{debug, info, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Annotation service failed: {0}")]
    Service(String),

    #[error("Malformed annotation in line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type AnnotationResult<T> = std::result::Result<T, AnnotationError>;

/// Fields of a SnpEff `ANN` entry, in order.
pub const ANN_FIELDS: [&str; 16] = [
    "allele",
    "effect",
    "impact",
    "gene_name",
    "gene_id",
    "feature_type",
    "feature_id",
    "biotype",
    "rank_total",
    "hgvs_c",
    "hgvs_p",
    "cdna_position",
    "cds_position",
    "protein_position",
    "feature_distance",
    "note",
];

/// Indices of the `ANN` fields that are kept.
const KEPT_FIELDS: [usize; 7] = [1, 2, 5, 6, 7, 12, 13];

/// Attributes of one variant, as returned by an annotation service. Keys
/// are unprefixed.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantAnnotation {
    pub contig: String,
    pub key: VariantKey,
    pub attributes: BTreeMap<String, String>,
}

pub trait AnnotationService {
    fn annotate(&self, variants: &[NovelVariant]) -> AnnotationResult<Vec<VariantAnnotation>>;
}

/// Annotate every variant created since the last call. A failing service
/// is logged and the build continues without annotations. Returns the
/// number of annotated variants.
pub fn annotate_novel_variants(storage: &mut Storage, service: &dyn AnnotationService) -> usize {
    let novel = storage.take_novel_variants();
    if novel.is_empty() {
        return 0;
    }
    let annotations = match service.annotate(&novel) {
        Ok(annotations) => annotations,
        Err(e) => {
            warn!("Skipping annotation of {} variants: {}", novel.len(), e);
            return 0;
        }
    };

    let mut annotated = 0;
    for annotation in annotations {
        let Some(information) = storage.variant_information_mut(
            &annotation.contig,
            annotation.key.position,
            &annotation.key.alternative,
        ) else {
            debug!("No variant {}:{} to annotate", annotation.contig, annotation.key);
            continue;
        };
        for (key, value) in annotation.attributes {
            information
                .attributes
                .add_if_absent(&format!("{SNPEFF_PREFIX}{key}"), value);
        }
        annotated += 1;
    }
    info!("Annotated {} of {} novel variants", annotated, novel.len());
    annotated
}

/// Keep the relevant fields of one `ANN` entry.
fn parse_ann_entry(entry: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for (i, value) in entry.split('|').enumerate() {
        if !KEPT_FIELDS.contains(&i) || value.is_empty() {
            continue;
        }
        let value = match i {
            1 => value.replace('&', ","),
            6 => value.split_once('-').map_or(value, |(_, id)| id).to_string(),
            _ => value.to_string(),
        };
        attributes.insert(ANN_FIELDS[i].to_string(), value);
    }
    attributes
}

/// Annotations read from a SnpEff annotated VCF. The first `ANN` entry of
/// every alternative allele is used.
#[derive(Debug, Default, Clone)]
pub struct AnnotatedVcf {
    annotations: FxHashMap<(String, VariantKey), BTreeMap<String, String>>,
}

impl AnnotatedVcf {
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn from_reader(reader: impl BufRead) -> AnnotationResult<Self> {
        let mut annotations = FxHashMap::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 8 {
                return Err(AnnotationError::Parse {
                    line: index + 1,
                    reason: format!("expected 8 columns, found {}", fields.len()),
                });
            }
            let position: u32 = fields[1].parse().map_err(|_| AnnotationError::Parse {
                line: index + 1,
                reason: format!("invalid position '{}'", fields[1]),
            })?;
            let Some(ann) = fields[7].split(';').find_map(|f| f.strip_prefix("ANN=")) else {
                continue;
            };
            let reference = fields[3].to_ascii_uppercase();

            for alternative in fields[4].split(',') {
                let alternative = alternative.to_ascii_uppercase();
                let Some(entry) = ann
                    .split(',')
                    .find(|e| e.split('|').next() == Some(alternative.as_str()))
                else {
                    continue;
                };
                let padded = if VariantType::of_unpadded(&reference, &alternative).is_some() {
                    pad_to_equal_length(&reference, &alternative).1
                } else if VariantType::of_padded(&reference, &alternative).is_some() {
                    alternative.clone()
                } else {
                    debug!("Skipping annotation of {}{}>{}", position, reference, alternative);
                    continue;
                };
                annotations
                    .entry((fields[0].to_string(), VariantKey::new(position, &padded)))
                    .or_insert_with(|| parse_ann_entry(entry));
            }
        }
        Ok(Self { annotations })
    }
}

impl TryFrom<&Path> for AnnotatedVcf {
    type Error = AnnotationError;

    fn try_from(value: &Path) -> Result<Self, Self::Error> {
        let annotated = AnnotatedVcf::from_reader(get_dynamic_reader(value)?)?;
        info!(
            "Read annotations of {} variants from {}",
            annotated.len(),
            value.display()
        );
        Ok(annotated)
    }
}

impl AnnotationService for AnnotatedVcf {
    fn annotate(&self, variants: &[NovelVariant]) -> AnnotationResult<Vec<VariantAnnotation>> {
        Ok(variants
            .iter()
            .filter_map(|variant| {
                let key = VariantKey::new(variant.position, &variant.alternative);
                let lookup = (variant.contig.clone(), key);
                self.annotations.get(&lookup).map(|attributes| VariantAnnotation {
                    contig: lookup.0.clone(),
                    key: lookup.1.clone(),
                    attributes: attributes.clone(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allelix_core::config::StorageParameters;
    use allelix_core::models::Contig;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    const ANNOTATED: &str = "##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
chr1\t3\t.\tG\tT\t.\t.\tANN=T|missense_variant&splice_region_variant|MODERATE|geneA|GA|transcript|rna-T1|protein_coding|1/1|c.3G>T|p.Met1Ile|3/30|3/30|1/10||
chr1\t6\t.\tC\tCAA\t.\t.\tANN=CAA|frameshift_variant|HIGH|geneA|GA|transcript|rna-T1|protein_coding|1/1|c.6_7insAA|p.X|6/30|6/30|2/10||
";

    struct FailingService;

    impl AnnotationService for FailingService {
        fn annotate(&self, _: &[NovelVariant]) -> AnnotationResult<Vec<VariantAnnotation>> {
            Err(AnnotationError::Service("unavailable".to_string()))
        }
    }

    #[fixture]
    fn storage() -> Storage {
        let mut storage = Storage::new(StorageParameters::default(), Default::default());
        storage.add_contig(Contig::new("chr1", Some("ACGTACGTAC".to_string())));
        storage.add_sample("s1");
        storage
            .add_variant_to_contig("chr1", "s1", 3, "G", "T")
            .unwrap();
        storage
            .add_variant_to_contig("chr1", "s1", 6, "C--", "CAA")
            .unwrap();
        storage
    }

    #[rstest]
    fn test_parse_ann_entry() {
        let attributes = parse_ann_entry(
            "T|missense_variant&splice_region_variant|MODERATE|geneA|GA|transcript|rna-T1|protein_coding|1/1|c.3G>T|p.Met1Ile|3/30|3/30|1/10||",
        );
        assert_eq!(attributes["effect"], "missense_variant,splice_region_variant");
        assert_eq!(attributes["feature_id"], "T1");
        assert_eq!(attributes["protein_position"], "1/10");
        assert!(!attributes.contains_key("gene_name"));
    }

    #[rstest]
    fn test_annotate_from_vcf(mut storage: Storage) {
        let annotated = AnnotatedVcf::from_reader(ANNOTATED.as_bytes()).unwrap();
        assert_eq!(annotated.len(), 2);
        assert_eq!(annotate_novel_variants(&mut storage, &annotated), 2);

        let insertion = storage.variant_information("chr1", 6, "CAA").unwrap();
        assert_eq!(
            insertion.attributes.get("snpeff_effect"),
            Some("frameshift_variant")
        );
        assert!(storage.take_novel_variants().is_empty());
    }

    #[rstest]
    fn test_failing_service_is_not_fatal(mut storage: Storage) {
        assert_eq!(annotate_novel_variants(&mut storage, &FailingService), 0);
        assert!(storage.variant_information("chr1", 3, "T").unwrap().attributes.is_empty());
    }
}
