// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A command line interface frontend to `bootscout`.

#![no_main]
#![no_std]

extern crate alloc;

use alloc::string::{String, ToString};

use bootscout_core::{
    BootResult,
    boot::{BootScout, launch::services::UefiImageServices},
    system::log_backend::UefiLogger,
    target::DiscoveredTarget,
};
use getargs::{Arg, Options};
use log::LevelFilter;
use uefi::{Status, boot, cstr16, entry, println, proto::loaded_image::LoadedImage};

/// The global logging instance.
static LOGGER: UefiLogger = UefiLogger::new(LevelFilter::Warn);

/// Parses an index argument, printing an error if it is missing or out of range.
fn parse_index(value: Option<&str>, arg: &str, len: usize) -> Option<usize> {
    let Some(value) = value else {
        println!("Error: An index was not passed into the {arg} argument");
        return None;
    };
    match value.parse::<usize>() {
        Ok(idx) if idx < len => Some(idx),
        Ok(_) => {
            println!("Error: The value passed to the {arg} argument was not in range of the list");
            None
        }
        Err(e) => {
            println!(
                "Error: {e} (The value passed to the {arg} argument could not be parsed as a number)"
            );
            None
        }
    }
}

/// Formats one line of the target list.
fn describe(i: usize, default: usize, target: &DiscoveredTarget) -> String {
    let marker = if i == default { '*' } else { ' ' };
    let shortcut = target
        .shortcut_digit
        .or(target.shortcut_letter)
        .map_or(String::new(), |x| alloc::format!(" [{x}]"));
    match target.qualified_path() {
        Some(path) => alloc::format!("{marker}{i}: {}{shortcut} ({path})", target.title),
        None => alloc::format!("{marker}{i}: {}{shortcut}", target.title),
    }
}

/// The actual main function of the program.
///
/// # Errors
///
/// May return an `Error` if the program could not obtain the `LoadedImage` protocol, or if the selected target
/// could not be started.
fn main_func() -> BootResult<()> {
    uefi::helpers::init()?; // initialize helpers (for print)

    let load_options = {
        let handle = boot::image_handle();
        let loaded_image = boot::open_protocol_exclusive::<LoadedImage>(handle)?;
        loaded_image
            .load_options_as_cstr16()
            .unwrap_or(cstr16!("bootscout-cli.efi")) // there is at least one argument, which is the filename
            .to_string()
    }; // loaded_image dropped here

    let mut options = load_options.split_whitespace();

    let Some(app_filename) = options.next() else {
        println!("Error: No load options were passed to the program");
        return Ok(());
    };

    LOGGER.install();

    let mut scout = BootScout::new()?;

    let mut opts = Options::new(options);
    while let Ok(Some(arg)) = opts.next_arg() {
        match arg {
            Arg::Short('l') | Arg::Long("list") => {
                let default = scout.menu().default_index();
                for (i, target) in scout.list().iter().enumerate() {
                    println!("{}", describe(i, default, target));
                    for sub in &target.sub_entries {
                        println!("      - {}", sub.title);
                    }
                }
                return Ok(());
            }
            Arg::Short('b') | Arg::Long("boot") => {
                let len = scout.list().len();
                let Some(idx) = parse_index(opts.value().ok(), "boot", len) else {
                    return Ok(());
                };
                return scout.launch(idx, None, &mut UefiImageServices);
            }
            Arg::Short('d') | Arg::Long("default") => {
                if scout.list().is_empty() {
                    println!("Error: There are no boot options to start");
                    return Ok(());
                }
                let idx = scout.menu().default_index();
                return scout.launch(idx, None, &mut UefiImageServices);
            }
            Arg::Short('x') | Arg::Long("hide") => {
                let len = scout.list().len();
                let Some(idx) = parse_index(opts.value().ok(), "hide", len) else {
                    return Ok(());
                };
                if !scout.hide(idx)? {
                    println!("Error: The boot option {idx} cannot be hidden");
                }
                return Ok(());
            }
            Arg::Short('u') | Arg::Long("unhide") => {
                scout.unhide_all()?;
                return Ok(());
            }
            Arg::Short('h') | Arg::Long("help") => break, // ignore any other arguments and break out of the while loop when help is specified
            Arg::Short(invalid) => println!("Error: Unknown short argument: -{invalid}"),
            Arg::Long(invalid) => println!("Error: Unknown long argument: --{invalid}"),
            Arg::Positional(invalid) => println!("Error: Unknown positional argument: {invalid}"),
        }
    }

    println!(
        r"Usage: {app_filename} [OPTIONS] [ARGS]...

-h, --help       display this help and exit
-l, --list       display discovered boot options and exit
-b, --boot       boot the given boot option index
-d, --default    boot the default boot option
-x, --hide       hide the given boot option index
-u, --unhide     show every hidden boot option again
"
    );

    Ok(())
}

/// The main function of the program.
///
/// This will not panic on a fatal error, rather, it will return control to the UEFI shell (or the firmware menu).
/// This program is intended to be ran as a shell script, so panicking here would not make any sense.
#[entry]
fn main() -> Status {
    if let Err(e) = main_func() {
        println!("Error: {e}");
    }
    Status::SUCCESS
}
