mod build;

use anyhow::Result;
use clap::{Arg, Command};

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "allelix";
    pub const BIN_NAME: &str = "allelix";
    pub const DEFAULT_VERBOSITY: &str = "info";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Build population-scale catalogs of canonical variants, alleles and proteoforms from per-sample variant calls.")
        .subcommand_required(true)
        .arg(
            Arg::new("verbosity")
                .long("verbosity")
                .global(true)
                .default_value(consts::DEFAULT_VERBOSITY)
                .help("Log level (error, warn, info, debug, trace); RUST_LOG takes precedence"),
        )
        .subcommand(build::cli::create_build_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    let level = matches
        .get_one::<String>("verbosity")
        .map(String::as_str)
        .unwrap_or(consts::DEFAULT_VERBOSITY);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        //
        // BUILD
        //
        Some((build::cli::BUILD_CMD, matches)) => {
            build::handlers::run_build(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_is_consistent() {
        build_parser().debug_assert();
    }

    #[test]
    fn test_build_requires_config() {
        let matches = build_parser().try_get_matches_from([consts::BIN_NAME, build::cli::BUILD_CMD]);
        assert!(matches.is_err());
    }
}
