//! VCF genotype intake.
//!
//! Reads plain or gzipped VCF files. For every sample column the reference
//! and alternative alleles are turned into [AlleleObservation]s with their
//! depth (`AD`, `DP`) and the likelihood of the homozygous genotype (`PL`,
//! or `GL` converted to phred scale).
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use allelix_core::sequence::is_nucleotide_content;
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use fxhash::FxHashMap;
use log::{debug, info};
use rayon::prelude::*;

use crate::calls::AlleleObservation;
use crate::genotypes::{GenotypeRecord, GenotypeSource};

/// Sample names may carry a `$` suffix; everything behind it is dropped so
/// that several columns are merged into one sample.
pub const SAMPLE_MERGE_SEPARATOR: char = '$';

/// Open a VCF file, auto-detecting gzip/bgzf compression.
fn open_vcf(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).context(format!("Failed to open VCF: {}", path.display()))?;
    let capacity = 256 * 1024;
    let name = path.to_string_lossy();
    if name.ends_with(".gz") || name.ends_with(".bgz") {
        Ok(Box::new(BufReader::with_capacity(
            capacity,
            MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(capacity, file)))
    }
}

/// Index of the homozygous genotype of allele `allele` in a `PL`/`GL` list
/// for the given ploidy, following the VCF genotype ordering.
pub fn homozygous_likelihood_index(allele: usize, ploidy: usize) -> usize {
    match ploidy {
        0 | 1 => allele,
        2 => allele * (allele + 1) / 2 + allele,
        _ => binomial(allele + ploidy, ploidy) - 1,
    }
}

fn binomial(n: usize, k: usize) -> usize {
    let k = k.min(n - k);
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

fn parse_list<T: std::str::FromStr>(value: Option<&str>) -> Option<Vec<Option<T>>> {
    let value = value?;
    if value == "." {
        return None;
    }
    Some(value.split(',').map(|v| v.parse().ok()).collect())
}

/// Phred scaled likelihoods of the homozygous genotypes of `n` alleles, from
/// `PL` or, failing that, from log10 scaled `GL`.
fn homozygous_likelihoods(
    format: &FxHashMap<&str, &str>,
    n: usize,
    ploidy: usize,
) -> Vec<Option<u32>> {
    if let Some(pl) = parse_list::<u32>(format.get("PL").copied()) {
        return (0..n)
            .map(|i| pl.get(homozygous_likelihood_index(i, ploidy)).copied().flatten())
            .collect();
    }
    if let Some(gl) = parse_list::<f64>(format.get("GL").copied()) {
        return (0..n)
            .map(|i| {
                gl.get(homozygous_likelihood_index(i, ploidy))
                    .copied()
                    .flatten()
                    .map(|g| (-10.0 * g).round().max(0.0) as u32)
            })
            .collect();
    }
    vec![None; n]
}

/// Observations of one sample column, or `None` for missing genotypes.
fn parse_genotype(
    keys: &[&str],
    column: &str,
    reference: &str,
    alternatives: &[&str],
) -> Option<Vec<AlleleObservation>> {
    let format: FxHashMap<&str, &str> = keys.iter().copied().zip(column.split(':')).collect();
    let gt = format.get("GT").copied().unwrap_or(".");
    let called: Vec<&str> = gt.split(['/', '|']).collect();
    if called.iter().all(|a| *a == ".") {
        return None;
    }
    let ploidy = called.len();
    let homozygous_reference = called.iter().all(|a| *a == "0");
    let depth: Option<u32> = format.get("DP").and_then(|dp| dp.parse().ok());

    let n = alternatives.len() + 1;
    let depths: Vec<u32> = if homozygous_reference {
        vec![depth.unwrap_or(0)]
    } else {
        match parse_list::<u32>(format.get("AD").copied()) {
            Some(ad) => (0..n).map(|i| ad.get(i).copied().flatten().unwrap_or(0)).collect(),
            None => {
                // without allele depths the called allele takes the full depth
                let allele: Option<usize> = called.iter().find_map(|a| a.parse().ok());
                (0..n)
                    .map(|i| if Some(i) == allele { depth.unwrap_or(0) } else { 0 })
                    .collect()
            }
        }
    };
    let likelihoods = homozygous_likelihoods(&format, depths.len(), ploidy);

    let mut observations = Vec::with_capacity(depths.len());
    for (i, depth) in depths.iter().enumerate() {
        if i == 0 {
            observations.push(AlleleObservation::new(reference, ".", *depth, likelihoods[0]));
            continue;
        }
        let alternative = alternatives[i - 1];
        if alternative.starts_with('<') || !is_nucleotide_content(alternative) {
            debug!("Skipping symbolic allele {}", alternative);
            continue;
        }
        observations.push(AlleleObservation::aligned(
            reference,
            alternative,
            *depth,
            likelihoods[i],
        ));
    }
    Some(observations)
}

/// Read every genotype record of one VCF file.
pub fn read_vcf(path: &Path) -> Result<Vec<GenotypeRecord>> {
    let mut reader = open_vcf(path)?;
    let mut samples: Vec<String> = Vec::new();
    let mut records = Vec::new();
    let mut line_buf = String::new();
    let mut line_number = 0;

    loop {
        line_buf.clear();
        if reader.read_line(&mut line_buf)? == 0 {
            break;
        }
        line_number += 1;
        let line = line_buf.trim_end_matches('\n').trim_end_matches('\r');
        if let Some(header) = line.strip_prefix("#CHROM") {
            samples = header
                .split('\t')
                .skip(9)
                .map(|s| {
                    s.split(SAMPLE_MERGE_SEPARATOR)
                        .next()
                        .unwrap_or(s)
                        .to_string()
                })
                .collect();
            continue;
        }
        if line.starts_with('#') || line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 10 {
            continue;
        }
        let contig = fields[0];
        let position: u32 = fields[1].parse().context(format!(
            "Invalid POS field in {}:{}",
            path.display(),
            line_number
        ))?;
        let reference = fields[3].to_ascii_uppercase();
        if !is_nucleotide_content(&reference) {
            debug!("Skipping record with reference {} at {}:{}", reference, contig, position);
            continue;
        }
        let alternatives: Vec<&str> = fields[4].split(',').filter(|a| *a != ".").collect();
        let keys: Vec<&str> = fields[8].split(':').collect();

        for (sample, column) in samples.iter().zip(&fields[9..]) {
            if let Some(observations) = parse_genotype(&keys, column, &reference, &alternatives) {
                records.push(GenotypeRecord {
                    contig: contig.to_string(),
                    position,
                    sample: sample.clone(),
                    observations,
                });
            }
        }
    }
    info!("Read {} genotype records from {}", records.len(), path.display());
    Ok(records)
}

/// A set of VCF files, read in parallel.
#[derive(Debug, Clone)]
pub struct VcfGenotypeSource {
    paths: Vec<PathBuf>,
}

impl VcfGenotypeSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl GenotypeSource for VcfGenotypeSource {
    fn records(&mut self) -> Result<Vec<GenotypeRecord>> {
        let per_file: Vec<Vec<GenotypeRecord>> = self
            .paths
            .par_iter()
            .map(|path| read_vcf(path))
            .collect::<Result<_>>()?;
        Ok(per_file.into_iter().flatten().collect())
    }
}
