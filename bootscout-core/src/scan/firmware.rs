// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Boot options recorded by the firmware.
//!
//! Every `Boot####` variable holds an `EFI_LOAD_OPTION`. The options named in `BootOrder` are offered as targets
//! that set `BootNext` and reboot, so the firmware starts them itself.

use alloc::{format, string::String, vec::Vec};

use log::{debug, trace, warn};
use thiserror::Error;
use uefi::runtime::VariableVendor;

use crate::{
    policy::{ScanPolicy, tags::TagList},
    system::{
        device_path::file_path_text,
        helper::{path_eq, string_to_ucs2_bytes, ucs2_bytes_to_string},
        variable::{VariableStore, get_variable_u16_list},
    },
    target::{DiscoveredTarget, MenuRow, TargetKind, builder::TargetBuilder},
};

/// The attribute bit of an active load option.
pub const LOAD_OPTION_ACTIVE: u32 = 0x0000_0001;

/// The name of the variable holding a boot option, such as `Boot0003`.
#[must_use = "Has no effect if the result is unused"]
pub fn boot_option_name(num: u16) -> String {
    format!("Boot{num:04X}")
}

/// An `Error` that may result from serializing a [`LoadOption`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoadOptionError {
    /// The device path list does not fit in the 16 bit length field.
    #[error("Device path of {0} bytes is too long for a load option")]
    PathTooLong(usize),
}

/// A parsed `EFI_LOAD_OPTION`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOption {
    /// The attributes.
    pub attributes: u32,

    /// The label.
    pub description: String,

    /// The device path list, including its end node.
    pub device_path: Vec<u8>,

    /// Data passed to the loaded image.
    pub optional_data: Vec<u8>,
}

impl LoadOption {
    /// Parses a load option. Returns [`None`] if the option is truncated or its label is not valid UCS-2.
    #[must_use = "Has no effect if the result is unused"]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let attributes = u32::from_le_bytes(bytes.get(0..4)?.try_into().ok()?);
        let path_len = usize::from(u16::from_le_bytes(bytes.get(4..6)?.try_into().ok()?));

        let rest = bytes.get(6..)?;
        let nul = rest.chunks_exact(2).position(|x| x == [0, 0])?;
        let description = ucs2_bytes_to_string(&rest[..nul * 2]).ok()?;

        let path_start = 6 + nul * 2 + 2;
        let device_path = bytes.get(path_start..path_start + path_len)?.to_vec();
        let optional_data = bytes.get(path_start + path_len..)?.to_vec();

        Some(Self {
            attributes,
            description,
            device_path,
            optional_data,
        })
    }

    /// Serializes the load option.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the device path is longer than a load option can describe.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LoadOptionError> {
        let path_len = u16::try_from(self.device_path.len())
            .map_err(|_| LoadOptionError::PathTooLong(self.device_path.len()))?;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.attributes.to_le_bytes());
        bytes.extend_from_slice(&path_len.to_le_bytes());
        bytes.extend_from_slice(&string_to_ucs2_bytes(&self.description));
        bytes.extend_from_slice(&self.device_path);
        bytes.extend_from_slice(&self.optional_data);
        Ok(bytes)
    }

    /// Checks if the option is active.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_active(&self) -> bool {
        self.attributes & LOAD_OPTION_ACTIVE != 0
    }
}

/// Reads the boot options named in `BootOrder`, in order, skipping the ones that cannot be read or parsed.
pub fn boot_order_options(vars: &dyn VariableStore) -> Vec<(u16, LoadOption)> {
    let order = match get_variable_u16_list(vars, "BootOrder", &VariableVendor::GLOBAL_VARIABLE) {
        Ok(order) => order,
        Err(e) => {
            warn!("Could not read BootOrder: {e}");
            return Vec::new();
        }
    };

    order
        .into_iter()
        .filter_map(|num| {
            let name = boot_option_name(num);
            match vars.get(&name, &VariableVendor::GLOBAL_VARIABLE) {
                Ok(Some(bytes)) => {
                    let option = LoadOption::parse(&bytes);
                    if option.is_none() {
                        debug!("{name} is not a valid load option");
                    }
                    option.map(|x| (num, x))
                }
                Ok(None) => None,
                Err(e) => {
                    debug!("Could not read {name}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Offers the active boot options of the firmware as targets.
///
/// Options whose label contains an entry of `dont_scan_firmware` are left out, and so are shells on the main row.
/// When `match_this` is given, only options whose label contains it are kept. The option that starts this boot
/// manager, recognized by `self_path`, is never offered.
pub fn scan_firmware_defined(
    vars: &dyn VariableStore,
    policy: &ScanPolicy,
    row: MenuRow,
    match_this: Option<&str>,
    self_path: Option<&str>,
) -> Vec<DiscoveredTarget> {
    let mut deny: TagList = policy.dont_scan_firmware.clone();
    if row == MenuRow::Main {
        deny.push("shell");
    }

    let mut targets = Vec::new();
    for (num, option) in boot_order_options(vars) {
        let label = option.description.as_str();
        if !option.is_active() {
            trace!("Boot{num:04X} ({label}) is inactive");
            continue;
        }
        if deny.any_within(label) {
            trace!("Boot{num:04X} ({label}) is excluded");
            continue;
        }
        if let Some(needle) = match_this
            && !label.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
        {
            continue;
        }
        if let Some(self_path) = self_path
            && file_path_text(&option.device_path).is_some_and(|x| path_eq(&x, self_path))
        {
            trace!("Boot{num:04X} starts this boot manager");
            continue;
        }

        let target = TargetBuilder::new(
            format!("Reboot into {label}"),
            TargetKind::Firmware {
                boot_num: num,
                device_path: option.device_path.clone(),
                description: option.description.clone(),
            },
        )
        .icon_hint("efi")
        .badge("vol_efi")
        .row(row)
        .build();
        targets.push(target);
    }

    targets
}

#[cfg(test)]
mod tests {
    use alloc::{borrow::ToOwned, vec};

    use proptest::prelude::*;

    use super::*;
    use crate::system::{
        device_path::{END_NODE, join_file_path},
        variable::memstore::MemVariableStore,
    };

    fn option(attributes: u32, description: &str, device_path: Vec<u8>) -> Vec<u8> {
        LoadOption {
            attributes,
            description: description.to_owned(),
            device_path,
            optional_data: Vec::new(),
        }
        .to_bytes()
        .unwrap()
    }

    fn store(options: &[(u16, Vec<u8>)]) -> MemVariableStore {
        let order: Vec<u8> = options.iter().flat_map(|(num, _)| num.to_le_bytes()).collect();
        options.iter().fold(
            MemVariableStore::new().with("BootOrder", &VariableVendor::GLOBAL_VARIABLE, &order),
            |store, (num, bytes)| store.with(&boot_option_name(*num), &VariableVendor::GLOBAL_VARIABLE, bytes),
        )
    }

    fn labels(targets: &[DiscoveredTarget]) -> Vec<&str> {
        targets.iter().map(|x| x.title.as_str()).collect()
    }

    #[test]
    fn parses_load_options() {
        let bytes = LoadOption {
            attributes: LOAD_OPTION_ACTIVE,
            description: "ubuntu".to_owned(),
            device_path: END_NODE.to_vec(),
            optional_data: vec![1, 2, 3],
        }
        .to_bytes()
        .unwrap();

        let option = LoadOption::parse(&bytes).unwrap();
        assert!(option.is_active());
        assert_eq!(option.description, "ubuntu");
        assert_eq!(option.device_path, END_NODE);
        assert_eq!(option.optional_data, [1, 2, 3]);
        assert!(LoadOption::parse(&bytes[..9]).is_none());
    }

    #[test]
    fn lists_active_options_in_order() {
        let vars = store(&[
            (0x0003, option(LOAD_OPTION_ACTIVE, "Windows Boot Manager", END_NODE.to_vec())),
            (0x0001, option(0, "Inactive", END_NODE.to_vec())),
            (0x000A, option(LOAD_OPTION_ACTIVE, "UEFI Shell", END_NODE.to_vec())),
            (0x0000, option(LOAD_OPTION_ACTIVE, "ubuntu", END_NODE.to_vec())),
        ]);

        let targets = scan_firmware_defined(&vars, &ScanPolicy::default(), MenuRow::Main, None, None);
        assert_eq!(labels(&targets), ["Reboot into Windows Boot Manager", "Reboot into ubuntu"]);
        assert_eq!(
            targets[0].kind,
            TargetKind::Firmware {
                boot_num: 3,
                device_path: END_NODE.to_vec(),
                description: "Windows Boot Manager".to_owned(),
            }
        );

        let tools = scan_firmware_defined(&vars, &ScanPolicy::default(), MenuRow::Tools, Some("SHELL"), None);
        assert_eq!(labels(&tools), ["Reboot into UEFI Shell"]);
        assert_eq!(tools[0].row, MenuRow::Tools);
    }

    #[test]
    fn denied_and_own_options_are_skipped() {
        let vars = store(&[
            (
                0x0000,
                option(
                    LOAD_OPTION_ACTIVE,
                    "bootscout",
                    join_file_path(&END_NODE, "EFI\\bootscout\\bootscout_x64.efi").unwrap(),
                ),
            ),
            (0x0001, option(LOAD_OPTION_ACTIVE, "Lenovo Diagnostics", END_NODE.to_vec())),
            (0x0002, option(LOAD_OPTION_ACTIVE, "Fedora", END_NODE.to_vec())),
        ]);
        let policy = ScanPolicy {
            dont_scan_firmware: TagList::parse("diagnostics"),
            ..ScanPolicy::default()
        };

        let targets = scan_firmware_defined(
            &vars,
            &policy,
            MenuRow::Main,
            None,
            Some("efi/bootscout/BOOTSCOUT_X64.EFI"),
        );
        assert_eq!(labels(&targets), ["Reboot into Fedora"]);
    }

    #[test]
    fn oversize_paths_are_rejected() {
        let mut option = LoadOption {
            attributes: LOAD_OPTION_ACTIVE,
            description: "huge".to_owned(),
            device_path: vec![0; usize::from(u16::MAX) + 1],
            optional_data: Vec::new(),
        };
        assert_eq!(
            option.to_bytes(),
            Err(LoadOptionError::PathTooLong(usize::from(u16::MAX) + 1))
        );

        option.device_path.pop();
        let bytes = option.to_bytes().unwrap();
        assert_eq!(LoadOption::parse(&bytes).unwrap().device_path.len(), usize::from(u16::MAX));
    }

    #[test]
    fn missing_boot_order_is_empty() {
        let targets = scan_firmware_defined(
            &MemVariableStore::new(),
            &ScanPolicy::default(),
            MenuRow::Main,
            None,
            None,
        );
        assert!(targets.is_empty());
    }

    proptest! {
        #[test]
        fn doesnt_panic(x in proptest::collection::vec(any::<u8>(), 0..128)) {
            let _ = LoadOption::parse(&x);
        }
    }
}
