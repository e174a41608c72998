use clap::{Parser, Subcommand};

use crate::{fuzz::Fuzz, test::Test};

mod build;
mod doc;
mod fuzz;
mod run;
mod test;

#[derive(Parser)]
#[command(about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build all crates in workspace
    Build {
        /// Build with release profile
        #[arg(short, long, default_value_t = false)]
        release: bool,

        /// Build with target architecture
        #[arg(short, long, default_value = "x86_64-unknown-uefi")]
        target: String,

        /// Space separated list of features
        #[arg(short, long)]
        features: Option<Vec<String>>,
    },

    /// Build docs for the bootscout-core crate
    Doc {
        /// Document private items in crate
        #[arg(short, long, default_value_t = false)]
        private: bool,

        /// Open in web browser after documenting
        #[arg(short, long, default_value_t = false)]
        open: bool,
    },

    /// Run bootscout-cli in VM with uefi-run
    Run {
        /// Path to the OVMF code file
        #[arg(long)]
        ovmf_code: Option<String>,

        /// Build with release profile
        #[arg(short, long, default_value_t = false)]
        release: bool,

        /// Add an additional file to the root of the image
        #[arg(long)]
        add_file: Option<String>,
    },

    /// Run unit tests and clippy on host, or the integration tests in a VM
    Test {
        #[command(subcommand)]
        command: Option<Test>,
    },

    /// Run one of the fuzz targets
    Fuzz {
        #[command(subcommand)]
        command: Fuzz,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Build {
            release,
            target,
            features,
        } => build::build_all_crates(release, &target, features)?,
        Commands::Doc { private, open } => doc::doc_crate(private, open)?,
        Commands::Run {
            ovmf_code,
            release,
            add_file,
        } => run::run_in_vm(
            "bootscout-cli",
            ovmf_code.as_deref(),
            release,
            add_file.as_deref(),
        )?,
        Commands::Test { command } => test::test_crate(command)?,
        Commands::Fuzz { command } => fuzz::fuzz_targets(command)?,
    }
    Ok(())
}
