use clap::{Command, arg};

pub const BUILD_CMD: &str = "build";

pub fn create_build_cli() -> Command {
    Command::new(BUILD_CMD)
        .author("Databio")
        .about("Build or update a variant storage from VCF files, a reference and a feature annotation.")
        .arg(
            arg!(--config <CONFIG>)
                .required(true)
                .help("Path to the TOML build configuration"),
        )
        .arg(
            arg!(--"no-progress")
                .required(false)
                .help("Do not show a progress bar"),
        )
}
