use clap::Subcommand;
use duct::cmd;

#[derive(Subcommand)]
pub enum Fuzz {
    /// Run the EFI executable header check
    Header,

    /// Run the MBR partition activation
    Mbr,

    /// Run the firmware boot option parser
    LoadOption,

    /// Run the configuration file parser
    Config,
}

pub fn fuzz_targets(command: Fuzz) -> anyhow::Result<()> {
    let mut args = vec!["fuzz", "run"];
    match command {
        Fuzz::Header => args.push("header"),
        Fuzz::Mbr => args.push("mbr"),
        Fuzz::LoadOption => args.push("load_option"),
        Fuzz::Config => args.push("config"),
    }

    cmd!("cargo", "install", "cargo-fuzz").run()?; // will not install if its already installed
    cmd("cargo", args).run()?;
    Ok(())
}
