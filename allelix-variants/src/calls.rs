//! Per-sample call resolution and the call record format.
//!
//! A call record is stored as text on the sample:
//!
//! ```text
//! {prefix}{index};{total depth};{genotype quality};{ref}:{alt}:{depth}:{likelihood},...
//! ```
//!
//! `prefix` is empty for confident calls, `f` for low frequency and `x` for
//! low coverage calls. Missing genotype qualities and likelihoods are
//! written as `-1`; the reference observation has the alternative `.`.
use std::fmt::{self, Display};
use std::str::FromStr;

use allelix_core::config::{Exclusions, StorageParameters};
use allelix_core::models::VariantType;
use allelix_core::sequence::{NO_ALTERNATIVE, pad_to_equal_length, strip_gaps};

use crate::align::{Scoring, global_alignment};
use crate::errors::VariantError;

/// Upper bound of the genotype quality.
pub const MAX_GENOTYPE_QUALITY: u32 = 99;

/// Support of one sample for one allele at a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleObservation {
    pub reference: String,
    pub alternative: String,
    pub depth: u32,
    /// Phred scaled genotype likelihood, lower is better.
    pub likelihood: Option<u32>,
}

impl AlleleObservation {
    pub fn new(reference: &str, alternative: &str, depth: u32, likelihood: Option<u32>) -> Self {
        Self {
            reference: reference.to_string(),
            alternative: alternative.to_string(),
            depth,
            likelihood,
        }
    }

    /// Build an observation with its alleles in aligned form: canonical
    /// pairs are padded, any other pair is globally aligned.
    pub fn aligned(reference: &str, alternative: &str, depth: u32, likelihood: Option<u32>) -> Self {
        let reference = reference.to_ascii_uppercase();
        let alternative = alternative.to_ascii_uppercase();
        if alternative == NO_ALTERNATIVE
            || VariantType::of_padded(&reference, &alternative).is_some()
        {
            return Self::new(&reference, &alternative, depth, likelihood);
        }
        let (reference, alternative) = if VariantType::of_unpadded(&reference, &alternative).is_some() {
            pad_to_equal_length(&reference, &alternative)
        } else {
            let alignment = global_alignment(
                &strip_gaps(&reference),
                &strip_gaps(&alternative),
                &Scoring::nucleotide(),
            );
            (alignment.reference, alignment.alternative)
        };
        Self::new(&reference, &alternative, depth, likelihood)
    }

    pub fn is_reference(&self) -> bool {
        self.alternative == NO_ALTERNATIVE
    }

    pub fn same_alleles(&self, other: &AlleleObservation) -> bool {
        self.reference == other.reference && self.alternative == other.alternative
    }

    /// Fold a repeated observation of the same alleles into this one: depths
    /// add up, the better likelihood is kept.
    pub fn absorb(&mut self, other: &AlleleObservation) {
        self.depth = self.depth.saturating_add(other.depth);
        self.likelihood = match (self.likelihood, other.likelihood) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }
}

impl Display for AlleleObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.reference,
            self.alternative,
            self.depth,
            self.likelihood.map_or(-1, i64::from)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConfidence {
    Confident,
    LowFrequency,
    LowCoverage,
}

impl CallConfidence {
    pub fn prefix(&self) -> &'static str {
        match self {
            CallConfidence::Confident => "",
            CallConfidence::LowFrequency => "f",
            CallConfidence::LowCoverage => "x",
        }
    }

    pub fn is_filtered(&self) -> bool {
        !matches!(self, CallConfidence::Confident)
    }
}

/// The resolved call of one sample at one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Index of the chosen observation in `alleles`.
    pub index: usize,
    pub confidence: CallConfidence,
    pub total_depth: u32,
    pub genotype_quality: Option<u32>,
    pub alleles: Vec<AlleleObservation>,
}

impl CallRecord {
    pub fn chosen(&self) -> Option<&AlleleObservation> {
        self.alleles.get(self.index)
    }

    pub fn is_filtered(&self) -> bool {
        self.confidence.is_filtered()
    }

    pub fn frequency(&self) -> f64 {
        match (self.chosen(), self.total_depth) {
            (Some(chosen), total) if total > 0 => chosen.depth as f64 / total as f64,
            _ => 0.0,
        }
    }
}

impl Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{};{};{};",
            self.confidence.prefix(),
            self.index,
            self.total_depth,
            self.genotype_quality.map_or(-1, i64::from)
        )?;
        let alleles: Vec<String> = self.alleles.iter().map(|a| a.to_string()).collect();
        write!(f, "{}", alleles.join(","))
    }
}

fn parse_error(record: &str, reason: impl Into<String>) -> VariantError {
    VariantError::CallParse {
        record: record.to_string(),
        reason: reason.into(),
    }
}

fn parse_optional(record: &str, field: &str) -> Result<Option<u32>, VariantError> {
    let value: i64 = field
        .parse()
        .map_err(|_| parse_error(record, format!("'{field}' is not a number")))?;
    if value < 0 {
        Ok(None)
    } else {
        u32::try_from(value)
            .map(Some)
            .map_err(|_| parse_error(record, format!("'{field}' is out of range")))
    }
}

impl FromStr for CallRecord {
    type Err = VariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.splitn(4, ';').collect();
        if fields.len() != 4 {
            return Err(parse_error(s, "expected four ';' separated fields"));
        }
        let (confidence, index) = match fields[0].as_bytes().first() {
            Some(b'f') => (CallConfidence::LowFrequency, &fields[0][1..]),
            Some(b'x') => (CallConfidence::LowCoverage, &fields[0][1..]),
            _ => (CallConfidence::Confident, fields[0]),
        };
        let index: usize = index
            .parse()
            .map_err(|_| parse_error(s, format!("'{index}' is not an allele index")))?;
        let total_depth: u32 = fields[1]
            .parse()
            .map_err(|_| parse_error(s, format!("'{}' is not a depth", fields[1])))?;
        let genotype_quality = parse_optional(s, fields[2])?;

        let mut alleles = Vec::new();
        for entry in fields[3].split(',') {
            let parts: Vec<&str> = entry.split(':').collect();
            if parts.len() != 4 {
                return Err(parse_error(s, format!("malformed allele '{entry}'")));
            }
            let depth: u32 = parts[2]
                .parse()
                .map_err(|_| parse_error(s, format!("'{}' is not a depth", parts[2])))?;
            alleles.push(AlleleObservation::new(
                parts[0],
                parts[1],
                depth,
                parse_optional(s, parts[3])?,
            ));
        }
        if index >= alleles.len() {
            return Err(parse_error(s, format!("allele index {index} out of range")));
        }

        Ok(CallRecord {
            index,
            confidence,
            total_depth,
            genotype_quality,
            alleles,
        })
    }
}

/// Picks the best supported allele of a sample at a site.
#[derive(Debug, Clone)]
pub struct CallResolver<'a> {
    minimal_coverage: f64,
    minimal_frequency: f64,
    exclusions: &'a Exclusions,
}

impl<'a> CallResolver<'a> {
    pub fn new(parameters: &StorageParameters, exclusions: &'a Exclusions) -> Self {
        Self {
            minimal_coverage: parameters.minimal_coverage,
            minimal_frequency: parameters.minimal_frequency,
            exclusions,
        }
    }

    /// Resolve the observations of one sample at `position`.
    ///
    /// With likelihoods for every observation the most likely allele wins
    /// and the genotype quality is the distance to the runner-up, capped at
    /// [MAX_GENOTYPE_QUALITY]. Otherwise the deepest allele wins. Returns
    /// `None` for confident reference calls and for excluded variants.
    pub fn resolve(
        &self,
        contig: &str,
        position: u32,
        alleles: &[AlleleObservation],
    ) -> Option<CallRecord> {
        if alleles.is_empty() {
            return None;
        }
        let total_depth = alleles
            .iter()
            .fold(0u32, |total, a| total.saturating_add(a.depth));

        let likelihoods: Option<Vec<u32>> = alleles.iter().map(|a| a.likelihood).collect();
        let (index, genotype_quality) = match likelihoods {
            Some(likelihoods) => {
                let mut index = 0;
                for (i, likelihood) in likelihoods.iter().enumerate() {
                    if *likelihood < likelihoods[index] {
                        index = i;
                    }
                }
                let best = likelihoods[index];
                let runner_up = likelihoods
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, l)| *l)
                    .min();
                let quality = runner_up.map(|r| (r - best).min(MAX_GENOTYPE_QUALITY));
                (index, quality)
            }
            None => {
                let mut index = 0;
                for (i, allele) in alleles.iter().enumerate() {
                    if allele.depth > alleles[index].depth {
                        index = i;
                    }
                }
                (index, None)
            }
        };

        let chosen = &alleles[index];
        if index > 0
            && self
                .exclusions
                .is_variant_excluded(contig, position, &chosen.reference, &chosen.alternative)
        {
            return None;
        }

        let frequency = if total_depth > 0 {
            chosen.depth as f64 / total_depth as f64
        } else {
            0.0
        };
        let mut confidence = CallConfidence::Confident;
        if frequency < self.minimal_frequency {
            confidence = CallConfidence::LowFrequency;
        }
        if (total_depth as f64) < self.minimal_coverage {
            confidence = CallConfidence::LowCoverage;
        }
        if index == 0 && !confidence.is_filtered() {
            return None;
        }

        Some(CallRecord {
            index,
            confidence,
            total_depth,
            genotype_quality,
            alleles: alleles.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn parameters() -> StorageParameters {
        StorageParameters::default()
    }

    fn observations(entries: &[(&str, &str, u32, Option<u32>)]) -> Vec<AlleleObservation> {
        entries
            .iter()
            .map(|(r, a, d, l)| AlleleObservation::aligned(r, a, *d, *l))
            .collect()
    }

    #[rstest]
    fn test_likelihood_call(parameters: StorageParameters) {
        let exclusions = Exclusions::default();
        let resolver = CallResolver::new(&parameters, &exclusions);
        let alleles = observations(&[("A", ".", 2, Some(200)), ("A", "G", 28, Some(0))]);
        let record = resolver.resolve("chr1", 100, &alleles).unwrap();
        assert_eq!(record.index, 1);
        assert_eq!(record.confidence, CallConfidence::Confident);
        assert_eq!(record.genotype_quality, Some(99));
        assert_eq!(record.to_string(), "1;30;99;A:.:2:200,A:G:28:0");
    }

    #[rstest]
    fn test_depth_call_without_likelihoods(parameters: StorageParameters) {
        let exclusions = Exclusions::default();
        let resolver = CallResolver::new(&parameters, &exclusions);
        let alleles = observations(&[("A", ".", 4, None), ("A", "ACGT", 6, Some(3))]);
        let record = resolver.resolve("chr1", 50, &alleles).unwrap();
        assert_eq!(record.index, 1);
        assert_eq!(record.genotype_quality, None);
        assert_eq!(record.confidence, CallConfidence::LowFrequency);
        assert_eq!(record.to_string(), "f1;10;-1;A:.:4:-1,A---:ACGT:6:3");
    }

    #[rstest]
    fn test_coverage_overrides_frequency(parameters: StorageParameters) {
        let exclusions = Exclusions::default();
        let resolver = CallResolver::new(&parameters, &exclusions);
        let alleles = observations(&[("C", ".", 1, None), ("C", "T", 1, None)]);
        let record = resolver.resolve("chr1", 7, &alleles).unwrap();
        assert_eq!(record.index, 0);
        assert_eq!(record.confidence, CallConfidence::LowCoverage);
    }

    #[rstest]
    fn test_coverage_prefix_wins_over_frequency_prefix() {
        let parameters = StorageParameters {
            minimal_coverage: 10.0,
            ..Default::default()
        };
        let exclusions = Exclusions::default();
        let resolver = CallResolver::new(&parameters, &exclusions);
        let alleles = observations(&[("C", ".", 1, None), ("C", "T", 1, None), ("C", "G", 2, None)]);
        let record = resolver.resolve("chr1", 7, &alleles).unwrap();
        assert!(record.frequency() < parameters.minimal_frequency);
        assert_eq!(record.to_string(), "x2;4;-1;C:.:1:-1,C:T:1:-1,C:G:2:-1");

        let parsed: CallRecord = record.to_string().parse().unwrap();
        assert_eq!(parsed.confidence, CallConfidence::LowCoverage);
        assert_eq!(parsed, record);
    }

    #[rstest]
    fn test_extreme_depths_saturate(parameters: StorageParameters) {
        let mut observation = AlleleObservation::new("A", "G", u32::MAX - 1, None);
        observation.absorb(&AlleleObservation::new("A", "G", 5, Some(3)));
        assert_eq!(observation.depth, u32::MAX);
        assert_eq!(observation.likelihood, Some(3));

        let exclusions = Exclusions::default();
        let resolver = CallResolver::new(&parameters, &exclusions);
        let alleles = vec![
            AlleleObservation::new("A", ".", u32::MAX - 10, None),
            AlleleObservation::new("A", "G", u32::MAX, None),
        ];
        let record = resolver.resolve("chr1", 3, &alleles).unwrap();
        assert_eq!(record.total_depth, u32::MAX);
        assert_eq!(record.index, 1);
        assert_eq!(record.confidence, CallConfidence::Confident);
    }

    #[rstest]
    fn test_confident_reference_is_implicit(parameters: StorageParameters) {
        let exclusions = Exclusions::default();
        let resolver = CallResolver::new(&parameters, &exclusions);
        let alleles = observations(&[("C", ".", 30, Some(0)), ("C", "T", 1, Some(90))]);
        assert_eq!(resolver.resolve("chr1", 7, &alleles), None);
    }

    #[rstest]
    fn test_excluded_variant_is_skipped(parameters: StorageParameters) {
        let mut exclusions = Exclusions::default();
        exclusions.exclude_variant("chr1", 200, "C", "T");
        let resolver = CallResolver::new(&parameters, &exclusions);
        let alleles = observations(&[("C", ".", 0, None), ("C", "T", 30, None)]);
        assert_eq!(resolver.resolve("chr1", 200, &alleles), None);
        assert!(resolver.resolve("chr1", 201, &alleles).is_some());
    }

    #[rstest]
    fn test_tie_keeps_first_allele(parameters: StorageParameters) {
        let exclusions = Exclusions::default();
        let resolver = CallResolver::new(&parameters, &exclusions);
        let alleles = observations(&[("C", ".", 5, None), ("C", "T", 10, None), ("C", "G", 10, None)]);
        let record = resolver.resolve("chr1", 7, &alleles).unwrap();
        assert_eq!(record.index, 1);
    }

    #[rstest]
    #[case("1;30;99;A:.:2:200,A:G:28:0")]
    #[case("f1;10;-1;A:.:4:-1,A---:ACGT:6:3")]
    #[case("x0;2;-1;ATG:.:2:-1")]
    #[case("2;41;12;AT:.:1:80,AT:A-:0:40,AT:AC:40:28")]
    fn test_call_record_round_trip(#[case] raw: &str) {
        let record: CallRecord = raw.parse().unwrap();
        assert_eq!(record.to_string(), raw);
        let reparsed: CallRecord = record.to_string().parse().unwrap();
        assert_eq!(reparsed, record);
    }

    #[rstest]
    #[case("1;30;A:.:2:200")]
    #[case("3;30;99;A:.:2:200,A:G:28:0")]
    #[case("1;30;99;A:.:2")]
    #[case("q1;30;99;A:.:2:200,A:G:28:0")]
    fn test_malformed_call_records(#[case] raw: &str) {
        assert!(raw.parse::<CallRecord>().is_err());
    }

    #[rstest]
    fn test_aligned_observation_realigns_mixed_indels() {
        let observation = AlleleObservation::aligned("ATTGC", "AGC", 3, None);
        assert_eq!(observation.reference, "ATTGC");
        assert_eq!(observation.alternative, "A--GC");
    }

    #[rstest]
    fn test_absorb_repeated_observation() {
        let mut first = AlleleObservation::new("A", "G", 4, Some(30));
        first.absorb(&AlleleObservation::new("A", "G", 6, Some(10)));
        assert_eq!(first.depth, 10);
        assert_eq!(first.likelihood, Some(10));
    }
}
