// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Hidden targets.
//!
//! The user can hide a target from the menu. Its tag is appended to one of four comma separated variables in the
//! boot manager's vendor namespace, and [`super::ScanPolicy::for_pass`] merges those lists into the exclusion lists of
//! every later pass.

use alloc::string::ToString;

use log::info;

use crate::{
    policy::tags::TagList,
    system::variable::{
        BOOTSCOUT_VENDOR, VarError, VariableStore, get_variable_str, set_variable_str,
    },
};

/// One of the hidden target lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HiddenList {
    /// EFI loaders, matched like `dont_scan_files`.
    Tags,

    /// Legacy targets, matched like `dont_scan_volumes`.
    Legacy,

    /// Firmware boot options, matched like `dont_scan_firmware`.
    Firmware,

    /// Tools, matched like `dont_scan_tools`.
    Tools,
}

impl HiddenList {
    /// Every hidden list.
    pub const ALL: [Self; 4] = [Self::Tags, Self::Legacy, Self::Firmware, Self::Tools];

    /// The name of the variable that stores the list.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn var_name(self) -> &'static str {
        match self {
            Self::Tags => "HiddenTags",
            Self::Legacy => "HiddenLegacy",
            Self::Firmware => "HiddenFirmware",
            Self::Tools => "HiddenTools",
        }
    }
}

/// Reads a hidden list. A missing variable is an empty list.
///
/// # Errors
///
/// May return an `Error` if the variable could not be read or is not a valid string.
pub fn read_hidden(vars: &dyn VariableStore, list: HiddenList) -> Result<TagList, VarError> {
    Ok(get_variable_str(vars, list.var_name(), &BOOTSCOUT_VENDOR)?
        .map(|x| TagList::parse(&x))
        .unwrap_or_default())
}

/// Appends a tag to a hidden list. Hiding an already hidden tag does nothing.
///
/// # Errors
///
/// May return an `Error` if the list could not be read or stored.
pub fn hide_target(
    vars: &mut dyn VariableStore,
    list: HiddenList,
    tag: &str,
) -> Result<(), VarError> {
    let mut hidden = read_hidden(vars, list)?;
    if hidden.contains(tag) {
        return Ok(());
    }

    hidden.push(tag);
    info!("Hiding \"{tag}\" through {}", list.var_name());
    set_variable_str(
        vars,
        list.var_name(),
        &BOOTSCOUT_VENDOR,
        None,
        Some(&hidden.to_string()),
    )
}

/// Removes a tag from a hidden list, deleting the variable when the list becomes empty.
///
/// # Errors
///
/// May return an `Error` if the list could not be read or stored.
pub fn unhide_target(
    vars: &mut dyn VariableStore,
    list: HiddenList,
    tag: &str,
) -> Result<bool, VarError> {
    let mut hidden = read_hidden(vars, list)?;
    if !hidden.remove(tag) {
        return Ok(false);
    }

    let value = hidden.to_string();
    set_variable_str(
        vars,
        list.var_name(),
        &BOOTSCOUT_VENDOR,
        None,
        (!hidden.is_empty()).then_some(value.as_str()),
    )?;
    Ok(true)
}

/// Deletes every hidden list.
///
/// # Errors
///
/// May return an `Error` if any of the variables could not be deleted.
pub fn unhide_all(vars: &mut dyn VariableStore) -> Result<(), VarError> {
    for list in HiddenList::ALL {
        set_variable_str(vars, list.var_name(), &BOOTSCOUT_VENDOR, None, None)?;
    }
    Ok(())
}
