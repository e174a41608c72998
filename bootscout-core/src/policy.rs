// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Scan policy.
//!
//! A [`ScanPolicy`] is the snapshot of exclusion lists and toggles that one discovery pass runs with. It is built from
//! the declared [`config::ScanConfig`] by [`ScanPolicy::for_pass`], which merges in the targets that the user has
//! hidden through the hidden target variables. The declared configuration is never modified, so the next pass starts
//! again from the declared lists.

use alloc::{format, string::String, vec::Vec};

use bitflags::bitflags;
use log::warn;

use crate::{
    policy::{config::ScanConfig, hidden::HiddenList, tags::TagList},
    system::{helper::Arch, variable::VariableStore},
};

pub mod config;
pub mod hidden;
pub mod tags;

/// Loaders that are never offered on their own because they only chain to another loader or are helper tools.
const DEFAULT_DONT_SCAN_FILES: [&str; 11] = [
    "shim.efi",
    "shim-fedora.efi",
    "shimx64.efi",
    "PreLoader.efi",
    "TextMode.efi",
    "ebounce.efi",
    "GraphicsConsole.efi",
    "MokManager.efi",
    "HashTool.efi",
    "HashTool-signed.efi",
    "bootmgr.efi",
];

/// A discovery source, in the vocabulary of the `scanfor` setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScanSource {
    /// Entries supplied by the caller, such as those parsed from manual stanzas.
    Manual,

    /// EFI loaders on internal volumes.
    Internal,

    /// Legacy boot records on internal disks.
    InternalLegacy,

    /// EFI loaders on external volumes.
    External,

    /// Legacy boot records on external disks.
    ExternalLegacy,

    /// EFI loaders on optical media.
    Optical,

    /// Legacy boot records on optical media.
    OpticalLegacy,

    /// Network boot loaders.
    Network,

    /// The boot options recorded by the firmware.
    Firmware,
}

impl ScanSource {
    /// Parses a `scanfor` token.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match &*token.to_ascii_lowercase() {
            "manual" => Self::Manual,
            "internal" => Self::Internal,
            "hdbios" => Self::InternalLegacy,
            "external" => Self::External,
            "biosexternal" => Self::ExternalLegacy,
            "optical" => Self::Optical,
            "cd" => Self::OpticalLegacy,
            "netboot" => Self::Network,
            "firmware" => Self::Firmware,
            _ => return None,
        })
    }

    /// Whether the source produces legacy boot records.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_legacy(self) -> bool {
        matches!(
            self,
            Self::InternalLegacy | Self::ExternalLegacy | Self::OpticalLegacy
        )
    }
}

/// An auxiliary tool or action, in the vocabulary of the `showtools` setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    /// An EFI shell.
    Shell,

    /// The `gptsync` hybrid MBR tool.
    Gptsync,

    /// The `gdisk` partition editor.
    Gdisk,

    /// A memory tester.
    Memtest,

    /// Machine owner key management tools.
    MokTool,

    /// The firmware update tool.
    FwUpdate,

    /// The macOS recovery system.
    AppleRecovery,

    /// The Windows recovery environment.
    WindowsRecovery,

    /// Power off.
    Shutdown,

    /// Restart.
    Reboot,

    /// Restart into the firmware setup.
    Firmware,
}

impl ToolKind {
    /// Parses a `showtools` token.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match &*token.to_ascii_lowercase() {
            "shell" => Self::Shell,
            "gptsync" => Self::Gptsync,
            "gdisk" => Self::Gdisk,
            "memtest" | "memtest86" => Self::Memtest,
            "mok_tool" => Self::MokTool,
            "fwupdate" => Self::FwUpdate,
            "apple_recovery" => Self::AppleRecovery,
            "windows_recovery" => Self::WindowsRecovery,
            "shutdown" => Self::Shutdown,
            "reboot" => Self::Reboot,
            "firmware" => Self::Firmware,
            _ => return None,
        })
    }
}

bitflags! {
    /// OS families that are started in graphics mode rather than text mode.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct GraphicsFor: u8 {
        /// macOS.
        const OSX = 1 << 0;

        /// Linux kernels with an EFI stub.
        const LINUX = 1 << 1;

        /// ELILO.
        const ELILO = 1 << 2;

        /// GRUB.
        const GRUB = 1 << 3;

        /// Windows.
        const WINDOWS = 1 << 4;
    }
}

impl GraphicsFor {
    /// Parses a `graphics_for` token.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match &*token.to_ascii_lowercase() {
            "osx" => Self::OSX,
            "linux" => Self::LINUX,
            "elilo" => Self::ELILO,
            "grub" => Self::GRUB,
            "windows" => Self::WINDOWS,
            _ => return None,
        })
    }
}

/// The exclusion lists and toggles of one discovery pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Volumes never scanned, by filesystem name, partition name or unique partition GUID.
    pub dont_scan_volumes: TagList,

    /// Directories never scanned, optionally qualified by a volume as `volume:dir`.
    pub dont_scan_dirs: TagList,

    /// Loaders never offered, as `[volume:][dir\]file`.
    pub dont_scan_files: TagList,

    /// Tools never offered, as `[volume:][dir\]file`.
    pub dont_scan_tools: TagList,

    /// Firmware boot options never offered, matched as a substring of their label.
    pub dont_scan_firmware: TagList,

    /// Extra directories scanned on every volume.
    pub also_scan_dirs: TagList,

    /// The sources scanned.
    pub scan_for: Vec<ScanSource>,

    /// The tools and actions offered on the second row.
    pub show_tools: Vec<ToolKind>,

    /// Fold Linux kernels of one directory into a single target.
    pub fold_linux_kernels: bool,

    /// Offer kernels that lack the `.efi` extension.
    pub scan_all_linux_kernels: bool,

    /// Offer whole disks with a protective MBR as legacy targets.
    pub deep_legacy_scan: bool,

    /// Leave the filesystem name of pre-boot volumes out of icon hints.
    pub group_preboot_volumes: bool,

    /// OS families started in graphics mode.
    pub graphics_for: GraphicsFor,

    /// Record the boot partition for the systemd loader interface.
    pub write_systemd_vars: bool,

    /// Report this macOS version to Apple firmware before starting a non-Apple OS.
    pub spoof_os_version: Option<String>,
}

impl ScanPolicy {
    /// Builds the policy of one pass from the declared configuration.
    ///
    /// When hidden targets are in use, the hidden tag, legacy, firmware and tool lists are merged into the matching
    /// exclusion lists. A hidden list that cannot be read is skipped.
    #[must_use = "Has no effect if the result is unused"]
    pub fn for_pass(config: &ScanConfig, vars: &dyn VariableStore) -> Self {
        let mut policy = config.policy.clone();
        if !config.use_hidden_tags {
            return policy;
        }

        for list in HiddenList::ALL {
            let hidden = match hidden::read_hidden(vars, list) {
                Ok(hidden) => hidden,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };
            let target = match list {
                HiddenList::Tags => &mut policy.dont_scan_files,
                HiddenList::Legacy => &mut policy.dont_scan_volumes,
                HiddenList::Firmware => &mut policy.dont_scan_firmware,
                HiddenList::Tools => &mut policy.dont_scan_tools,
            };
            target.merge(&hidden);
        }

        policy
    }

    /// Checks if a source is enabled.
    #[must_use = "Has no effect if the result is unused"]
    pub fn scans(&self, source: ScanSource) -> bool {
        self.scan_for.contains(&source)
    }

    /// Checks if a tool is enabled.
    #[must_use = "Has no effect if the result is unused"]
    pub fn shows(&self, tool: ToolKind) -> bool {
        self.show_tools.contains(&tool)
    }
}

impl Default for ScanPolicy {
    fn default() -> Self {
        let mut dont_scan_files: TagList = DEFAULT_DONT_SCAN_FILES.as_slice().into();
        if let Some(arch) = Arch::current() {
            dont_scan_files.push(&format!("fb{}.efi", arch.efi_suffix()));
            dont_scan_files.push(&format!("mm{}.efi", arch.efi_suffix()));
        }

        Self {
            dont_scan_volumes: TagList::parse("LRS_ESP"),
            dont_scan_dirs: TagList::new(),
            dont_scan_files,
            dont_scan_tools: TagList::new(),
            dont_scan_firmware: TagList::new(),
            also_scan_dirs: TagList::parse("boot"),
            scan_for: Vec::from([
                ScanSource::Internal,
                ScanSource::External,
                ScanSource::Optical,
                ScanSource::Manual,
            ]),
            show_tools: Vec::from([
                ToolKind::Shell,
                ToolKind::Memtest,
                ToolKind::Gdisk,
                ToolKind::AppleRecovery,
                ToolKind::WindowsRecovery,
                ToolKind::MokTool,
                ToolKind::FwUpdate,
                ToolKind::Shutdown,
                ToolKind::Reboot,
                ToolKind::Firmware,
            ]),
            fold_linux_kernels: true,
            scan_all_linux_kernels: true,
            deep_legacy_scan: false,
            group_preboot_volumes: true,
            graphics_for: GraphicsFor::OSX,
            write_systemd_vars: false,
            spoof_os_version: None,
        }
    }
}
