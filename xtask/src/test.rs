use clap::Subcommand;
use duct::cmd;

use crate::run::run_in_vm;

#[derive(Subcommand)]
pub enum Test {
    /// Run unit tests and clippy on host
    Host,

    /// Run the firmware integration tests in a VM with uefi-run
    Vm {
        /// Path to the OVMF code file
        #[arg(long)]
        ovmf_code: Option<String>,
    },
}

pub fn test_crate(command: Option<Test>) -> anyhow::Result<()> {
    match command.unwrap_or(Test::Host) {
        Test::Host => test_on_host(),
        Test::Vm { ovmf_code } => run_in_vm("bootscout-tests", ovmf_code.as_deref(), false, None),
    }
}

fn test_on_host() -> anyhow::Result<()> {
    cmd!("cargo", "clippy", "--package", "bootscout-core").run()?;
    cmd!("cargo", "test", "--package", "bootscout-core", "--lib").run()?;
    Ok(())
}
