use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use allelix_core::config::BuildConfig;
use allelix_core::storage::Storage;
use allelix_core::storage::samples::read_sample_information;
use allelix_seqtype::{LinkageClustering, apply_clustering, update_sequence_types};
use allelix_stats::StorageStatistics;
use allelix_variants::annotation::{AnnotatedVcf, annotate_novel_variants};
use allelix_variants::genotypes::{GenotypeSource, ObservationTable};
use allelix_variants::gff::read_gff3;
use allelix_variants::merge::transfer_variants;
use allelix_variants::reference::{InMemoryReference, register_contigs};
use allelix_variants::vcf::VcfGenotypeSource;

const BUILD_STEPS: u64 = 8;

pub fn run_build(matches: &ArgMatches) -> Result<()> {
    let config = matches
        .get_one::<String>("config")
        .context("A path to a build configuration is required.")?;
    let config = BuildConfig::try_from(Path::new(config))
        .with_context(|| format!("Invalid build configuration: {config}"))?;

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set up the thread pool")?;
    }

    let progress = if matches.get_flag("no-progress") {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(BUILD_STEPS);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?,
        );
        pb
    };

    let storage = build_storage(&config, &progress)?;
    progress.set_message("Writing storage");
    storage
        .save(&config.output)
        .with_context(|| format!("Failed to write storage to {}", config.output.display()))?;
    progress.finish_with_message("Done");

    Ok(())
}

/// Open the storage to update, or a new one with the configured parameters.
fn open_storage(config: &BuildConfig) -> Result<Storage> {
    let exclusions = config.exclusions().context("Failed to read exclusion lists")?;
    let Some(path) = &config.storage else {
        return Ok(Storage::new(config.parameters.clone(), exclusions));
    };
    let mut storage = Storage::load(path)
        .with_context(|| format!("Failed to load storage from {}", path.display()))?;
    if storage.parameters != config.parameters {
        warn!("Build parameters differ from the stored ones, keeping the stored parameters");
    }
    if !exclusions.is_empty() {
        storage.exclusions = exclusions;
    }
    Ok(storage)
}

/// Run every build step on the configured inputs and return the storage.
pub fn build_storage(config: &BuildConfig, progress: &ProgressBar) -> Result<Storage> {
    let mut storage = open_storage(config)?;

    progress.set_message("Reading reference");
    if let Some(path) = &config.reference {
        let reference = InMemoryReference::try_from(path.as_path())
            .with_context(|| format!("Failed to read reference {}", path.display()))?;
        register_contigs(&mut storage, &reference);
    }
    progress.inc(1);

    progress.set_message("Reading features");
    if let Some(path) = &config.features {
        let records = read_gff3(path)?;
        let merged = records
            .iter()
            .filter_map(|record| storage.add_feature(record))
            .count();
        info!("Merged {} of {} feature records", merged, records.len());
    }
    storage.validate_features();
    progress.inc(1);

    progress.set_message("Resolving variant calls");
    let mut source = VcfGenotypeSource::new(config.vcf_files.clone());
    let mut table = ObservationTable::new();
    table.extend(source.records().context("Failed to read variant calls")?);
    let samples = table.resolve_into(&mut storage);
    if let Some(path) = &config.sample_information {
        let information = read_sample_information(path)
            .with_context(|| format!("Failed to read sample information {}", path.display()))?;
        storage.apply_sample_information(&information);
    }
    progress.inc(1);

    progress.set_message("Merging variants");
    let committed = transfer_variants(&mut storage, &samples)?;
    info!("Committed {} variants of {} samples", committed, samples.len());
    progress.inc(1);

    progress.set_message("Annotating variants");
    match (&config.annotated_vcf, storage.parameters.skip_annotation) {
        (Some(path), false) => {
            let service = AnnotatedVcf::try_from(path.as_path())
                .with_context(|| format!("Failed to read annotations {}", path.display()))?;
            annotate_novel_variants(&mut storage, &service);
        }
        _ => {
            let skipped = storage.take_novel_variants().len();
            info!("Leaving {} novel variants without annotation", skipped);
        }
    }
    progress.inc(1);

    progress.set_message("Aggregating alleles and proteoforms");
    let all_samples = storage.sample_names();
    update_sequence_types(&mut storage, &all_samples)?;
    progress.inc(1);

    progress.set_message("Clustering");
    apply_clustering(&mut storage, &LinkageClustering::default());
    progress.inc(1);

    progress.set_message("Computing statistics");
    storage.update_statistics();
    progress.inc(1);

    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use allelix_core::consts::{FREQUENCY, NUMBER_OF_CALLS};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    const FASTA: &str = ">chr1\nCCATGGCATGCAAATAAGG\n";
    const GFF: &str = "##gff-version 3
chr1\tsrc\tgene\t3\t17\t.\t+\t.\tID=gene-orf1;Name=orf1
chr1\tsrc\tCDS\t3\t17\t.\t+\t0\tParent=gene-orf1
";
    const VCF: &str = "##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2
chr1\t13\t.\tA\tG\t50\tPASS\t.\tGT:AD:DP\t1:0,20:20\t0:20:20
";

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[fixture]
    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ref.fa", FASTA);
        write(dir.path(), "genes.gff", GFF);
        write(dir.path(), "calls.vcf", VCF);
        write(dir.path(), "samples.tsv", "sample\tlineage\nS1\tB.1\nS3\tA\n");
        write(
            dir.path(),
            "build.toml",
            "vcf_files = [\"calls.vcf\"]\n\
             output = \"storage.json.gz\"\n\
             reference = \"ref.fa\"\n\
             features = \"genes.gff\"\n\
             sample_information = \"samples.tsv\"\n",
        );
        dir
    }

    #[rstest]
    fn test_build_storage(workspace: tempfile::TempDir) {
        let config = BuildConfig::try_from(workspace.path().join("build.toml").as_path()).unwrap();
        let storage = build_storage(&config, &ProgressBar::hidden()).unwrap();

        let information = storage.variant_information("chr1", 13, "G").unwrap();
        assert_eq!(information.samples.iter().collect::<Vec<_>>(), vec!["S1"]);
        assert_eq!(information.attributes.get(FREQUENCY), Some("5E-1"));

        let feature = storage.feature("orf1").unwrap();
        assert!(feature.is_coding());
        assert_eq!(feature.alleles.len(), 2);
        let proteoform = storage.sample("S1").unwrap().proteoforms["orf1"].clone();
        assert_eq!(
            feature.proteoform(&proteoform).unwrap().variants,
            BTreeMap::from([(4, "R".to_string())])
        );
        assert_eq!(
            storage.sample("S1").unwrap().attributes.get(NUMBER_OF_CALLS),
            Some("1")
        );
        assert_eq!(
            storage.sample("S1").unwrap().attributes.get("lineage"),
            Some("B.1")
        );
        assert!(storage.sample("S3").is_none());
        // confident reference calls are implicit
        assert_eq!(
            storage.sample("S2").unwrap().attributes.get(NUMBER_OF_CALLS),
            Some("0")
        );
    }

    #[rstest]
    fn test_update_existing_storage(workspace: tempfile::TempDir) {
        let config = BuildConfig::try_from(workspace.path().join("build.toml").as_path()).unwrap();
        let storage = build_storage(&config, &ProgressBar::hidden()).unwrap();
        storage.save(&config.output).unwrap();

        let mut update = BuildConfig::try_from(workspace.path().join("build.toml").as_path()).unwrap();
        update.storage = Some(config.output.clone());
        let updated = build_storage(&update, &ProgressBar::hidden()).unwrap();
        assert_eq!(updated.sample_count(), 2);
        assert_eq!(
            updated.feature("orf1").unwrap().alleles,
            storage.feature("orf1").unwrap().alleles
        );
    }
}
