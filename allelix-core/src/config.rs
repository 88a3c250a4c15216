use std::collections::{BTreeMap, BTreeSet};
use std::fs::read_to_string;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sequence::strip_gaps;
use crate::utils::{get_dynamic_reader, split_tabular_line};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No variant call files were provided")]
    NoVariantCalls,
    #[error("A reference sequence is required when {0} are requested")]
    MissingReference(&'static str),
    #[error("Invalid exclusion file {path:?}, line {line}: {reason}")]
    InvalidExclusionFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Thresholds and switches of a build. They are stored with the storage so a
/// later update runs with the same settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageParameters {
    /// Calls with a total depth below this are flagged as low coverage.
    pub minimal_coverage: f64,
    /// Calls whose chosen allele frequency is below this are flagged as low
    /// frequency.
    pub minimal_frequency: f64,
    /// Keep flagged calls as ambiguous (`N`) variants instead of dropping
    /// them.
    pub store_filtered: bool,
    pub skip_annotation: bool,
    pub skip_proteoform_inference: bool,
}

impl Default for StorageParameters {
    fn default() -> Self {
        Self {
            minimal_coverage: 3.0,
            minimal_frequency: 0.65,
            store_filtered: true,
            skip_annotation: false,
            skip_proteoform_inference: false,
        }
    }
}

impl StorageParameters {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.minimal_coverage.is_nan() || self.minimal_coverage < 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "minimal_coverage must be non-negative, got {}",
                self.minimal_coverage
            )));
        }
        if !(0.0..=1.0).contains(&self.minimal_frequency) {
            return Err(ConfigError::InvalidParameter(format!(
                "minimal_frequency must be within [0, 1], got {}",
                self.minimal_frequency
            )));
        }
        Ok(())
    }
}

/// Positions and variants that are never called.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exclusions {
    /// Contig to 1-based inclusive position ranges.
    pub positions: BTreeMap<String, Vec<(u32, u32)>>,
    /// Contig to `position:reference:alternative` keys, without gaps.
    pub variants: BTreeMap<String, BTreeSet<String>>,
}

impl Exclusions {
    /// Read exclusion lists. Both files are tab or comma separated, lines
    /// starting with `#` are skipped.
    ///
    /// # Arguments
    /// - positions: `contig, start, end` per line
    /// - variants: `contig, position, reference, alternative` per line
    pub fn from_files(positions: Option<&Path>, variants: Option<&Path>) -> ConfigResult<Self> {
        let mut exclusions = Exclusions::default();
        if let Some(path) = positions {
            for (line, fields) in read_rows(path, 3)? {
                let start = parse_position(path, line, &fields[1])?;
                let end = parse_position(path, line, &fields[2])?;
                exclusions.exclude_positions(&fields[0], start, end);
            }
        }
        if let Some(path) = variants {
            for (line, fields) in read_rows(path, 4)? {
                let position = parse_position(path, line, &fields[1])?;
                exclusions.exclude_variant(&fields[0], position, &fields[2], &fields[3]);
            }
        }
        Ok(exclusions)
    }

    pub fn exclude_positions(&mut self, contig: &str, start: u32, end: u32) {
        self.positions
            .entry(contig.to_string())
            .or_default()
            .push((start.min(end), start.max(end)));
    }

    pub fn exclude_variant(&mut self, contig: &str, position: u32, reference: &str, alternative: &str) {
        self.variants
            .entry(contig.to_string())
            .or_default()
            .insert(variant_key(position, reference, alternative));
    }

    pub fn is_position_excluded(&self, contig: &str, position: u32) -> bool {
        self.positions
            .get(contig)
            .is_some_and(|ranges| ranges.iter().any(|(s, e)| *s <= position && position <= *e))
    }

    pub fn is_variant_excluded(
        &self,
        contig: &str,
        position: u32,
        reference: &str,
        alternative: &str,
    ) -> bool {
        self.variants
            .get(contig)
            .is_some_and(|keys| keys.contains(&variant_key(position, reference, alternative)))
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.variants.is_empty()
    }
}

fn variant_key(position: u32, reference: &str, alternative: &str) -> String {
    format!(
        "{}:{}:{}",
        position,
        strip_gaps(reference).to_ascii_uppercase(),
        strip_gaps(alternative).to_ascii_uppercase()
    )
}

fn read_rows(path: &Path, columns: usize) -> ConfigResult<Vec<(usize, Vec<String>)>> {
    let reader = get_dynamic_reader(path)?;
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields = split_tabular_line(trimmed);
        if fields.len() < columns {
            return Err(ConfigError::InvalidExclusionFile {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("expected {} columns, found {}", columns, fields.len()),
            });
        }
        rows.push((index + 1, fields.iter().map(|f| f.to_string()).collect()));
    }
    Ok(rows)
}

fn parse_position(path: &Path, line: usize, field: &str) -> ConfigResult<u32> {
    field
        .parse::<u32>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| ConfigError::InvalidExclusionFile {
            path: path.to_path_buf(),
            line,
            reason: format!("'{field}' is not a 1-based position"),
        })
}

/// Inputs and settings of one `allelix build` run, read from TOML. Relative
/// paths are resolved against the directory holding the config file.
#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct BuildConfig {
    pub vcf_files: Vec<PathBuf>,
    pub output: PathBuf,
    pub reference: Option<PathBuf>,
    pub features: Option<PathBuf>,
    pub annotated_vcf: Option<PathBuf>,
    pub excluded_positions: Option<PathBuf>,
    pub excluded_variants: Option<PathBuf>,
    /// Sample table whose columns are added as sample attributes.
    pub sample_information: Option<PathBuf>,
    /// Existing storage to update instead of starting from scratch.
    pub storage: Option<PathBuf>,
    pub threads: Option<usize>,
    #[serde(default)]
    pub parameters: StorageParameters,
}

impl BuildConfig {
    /// Reject a configuration before anything is read or mutated.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.vcf_files.is_empty() {
            return Err(ConfigError::NoVariantCalls);
        }
        if self.reference.is_none() && self.storage.is_none() {
            if self.features.is_some() {
                return Err(ConfigError::MissingReference("features"));
            }
            if self.annotated_vcf.is_some() && !self.parameters.skip_annotation {
                return Err(ConfigError::MissingReference("annotations"));
            }
        }
        self.parameters.validate()
    }

    pub fn exclusions(&self) -> ConfigResult<Exclusions> {
        Exclusions::from_files(
            self.excluded_positions.as_deref(),
            self.excluded_variants.as_deref(),
        )
    }

    fn resolve_paths(&mut self, root: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(p.as_path());
            }
        };
        self.vcf_files.iter_mut().for_each(&resolve);
        resolve(&mut self.output);
        for path in [
            &mut self.reference,
            &mut self.features,
            &mut self.annotated_vcf,
            &mut self.excluded_positions,
            &mut self.excluded_variants,
            &mut self.sample_information,
            &mut self.storage,
        ]
        .into_iter()
        .flatten()
        {
            resolve(path);
        }
    }
}

impl TryFrom<&Path> for BuildConfig {
    type Error = ConfigError;

    fn try_from(value: &Path) -> ConfigResult<Self> {
        let content = read_to_string(value)?;
        let mut config: BuildConfig = toml::from_str(&content)?;
        if let Some(root) = value.parent() {
            config.resolve_paths(root);
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{content}").unwrap();
        path
    }

    #[rstest]
    fn test_read_exclusion_lists() {
        let dir = tempfile::tempdir().unwrap();
        let positions = write_file(dir.path(), "positions.tsv", "# contig\tstart\tend\nchr1\t10\t20\n");
        let variants = write_file(dir.path(), "variants.csv", "chr1,200,C,T\n");

        let exclusions = Exclusions::from_files(Some(&positions), Some(&variants)).unwrap();
        assert!(exclusions.is_position_excluded("chr1", 10));
        assert!(exclusions.is_position_excluded("chr1", 20));
        assert!(!exclusions.is_position_excluded("chr1", 21));
        assert!(!exclusions.is_position_excluded("chr2", 15));
        assert!(exclusions.is_variant_excluded("chr1", 200, "C", "T"));
        assert!(exclusions.is_variant_excluded("chr1", 200, "C", "t"));
        assert!(!exclusions.is_variant_excluded("chr1", 200, "C", "G"));
    }

    #[rstest]
    fn test_read_exclusion_rows_per_contig() {
        let dir = tempfile::tempdir().unwrap();
        let positions = write_file(dir.path(), "positions.tsv", "chr1\t30\t25\nchr2\t5\t5\n");
        let variants = write_file(
            dir.path(),
            "variants.tsv",
            "chr1\t7\tA-\tAT\n# skipped\nchr2\t9\tG\tC\n",
        );

        let exclusions = Exclusions::from_files(Some(&positions), Some(&variants)).unwrap();
        assert_eq!(exclusions.positions["chr1"], vec![(25, 30)]);
        assert_eq!(exclusions.positions["chr2"], vec![(5, 5)]);
        assert!(exclusions.is_variant_excluded("chr1", 7, "A", "AT"));
        assert!(exclusions.is_variant_excluded("chr2", 9, "G", "C"));
        assert_eq!(exclusions.variants.values().map(|v| v.len()).sum::<usize>(), 2);
    }

    #[rstest]
    fn test_short_exclusion_row_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let variants = write_file(dir.path(), "variants.tsv", "chr1\t200\tC\n");
        let result = Exclusions::from_files(None, Some(&variants));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidExclusionFile { line: 1, .. })
        ));
    }

    #[rstest]
    fn test_build_config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "build.toml",
            r#"
vcf_files = ["calls/a.vcf", "/data/b.vcf.gz"]
output = "storage.json.gz"
reference = "ref.fasta"
sample_information = "samples.tsv"

[parameters]
minimal_coverage = 5.0
"#,
        );
        let config = BuildConfig::try_from(path.as_path()).unwrap();
        assert_eq!(config.vcf_files[0], dir.path().join("calls/a.vcf"));
        assert_eq!(config.vcf_files[1], PathBuf::from("/data/b.vcf.gz"));
        assert_eq!(config.sample_information, Some(dir.path().join("samples.tsv")));
        assert_eq!(config.parameters.minimal_coverage, 5.0);
        assert_eq!(config.parameters.minimal_frequency, 0.65);
        assert!(config.parameters.store_filtered);
    }

    #[rstest]
    fn test_build_config_requires_vcf_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "build.toml", "vcf_files = []\noutput = \"out.json\"\n");
        assert!(matches!(
            BuildConfig::try_from(path.as_path()),
            Err(ConfigError::NoVariantCalls)
        ));
    }

    #[rstest]
    fn test_build_config_requires_reference_for_features() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "build.toml",
            "vcf_files = [\"a.vcf\"]\noutput = \"out.json\"\nfeatures = \"genes.gff\"\n",
        );
        assert!(matches!(
            BuildConfig::try_from(path.as_path()),
            Err(ConfigError::MissingReference("features"))
        ));
    }

    #[rstest]
    #[case(-1.0, 0.5)]
    #[case(3.0, 1.5)]
    fn test_invalid_parameters(#[case] coverage: f64, #[case] frequency: f64) {
        let parameters = StorageParameters {
            minimal_coverage: coverage,
            minimal_frequency: frequency,
            ..Default::default()
        };
        assert!(parameters.validate().is_err());
    }
}
