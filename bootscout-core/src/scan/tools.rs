// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Finds the utilities of the tools row.
//!
//! Most tools are looked for next to the boot manager, in the `EFI\tools` directory of its volume. The Secure Boot
//! key tools are also looked for in `EFI\tools` of every volume, and the recovery tools of macOS and Windows are
//! looked for on every volume.

use alloc::{borrow::ToOwned, format, rc::Rc, string::String, vec::Vec};

use log::trace;

use crate::{
    boot::action::{BootAction, firmware::firmware_ui_supported},
    policy::{ToolKind, tags::TagList},
    scan::{ScanSession, firmware::scan_firmware_defined, validate::is_valid_loader},
    system::{
        fs::VolumeFs,
        helper::{Arch, basename, dirname, join_path},
        variable::VariableStore,
    },
    target::{DiscoveredTarget, MenuRow, OsFamily, TargetKind, builder::TargetBuilder},
    volume::{Volume, VolumeCatalog},
};

/// The directory of tools.
const TOOLS_DIR: &str = "EFI\\tools";

/// Names of the Secure Boot key tools.
const MOK_NAMES: [&str; 5] = [
    "MokManager.efi",
    "HashTool.efi",
    "HashTool-signed.efi",
    "KeyTool.efi",
    "KeyTool-signed.efi",
];

/// Directories that may hold a memory tester.
const MEMTEST_DIRS: [&str; 4] = [
    "EFI\\tools\\memtest86",
    "EFI\\tools\\memtest",
    "EFI\\memtest86",
    "EFI\\memtest",
];

/// The macOS recovery loader.
const APPLE_RECOVERY: &str = "com.apple.recovery.boot\\boot.efi";

/// The Windows recovery loader.
const WINDOWS_RECOVERY: &str = "EFI\\Microsoft\\Boot\\LrsBootmgr.efi";

/// Places a shell is looked for, in order. Entries without a directory also match anywhere when used as a filter.
#[must_use = "Has no effect if the result is unused"]
pub fn shell_paths(arch: Arch) -> TagList {
    let sfx = arch.efi_suffix();
    [
        format!("{TOOLS_DIR}\\shell{sfx}.efi"),
        format!("{TOOLS_DIR}\\shell.efi"),
        format!("shell{sfx}.efi"),
        "shell.efi".to_owned(),
    ]
    .iter()
    .map(String::as_str)
    .collect()
}

/// Candidate paths of a tool that lives next to the boot manager.
fn own_volume_paths(tool: ToolKind, arch: Arch) -> Vec<String> {
    let sfx = arch.efi_suffix();
    match tool {
        ToolKind::Shell => shell_paths(arch).iter().map(String::from).collect(),
        ToolKind::Gptsync => Vec::from([
            format!("{TOOLS_DIR}\\gptsync.efi"),
            format!("{TOOLS_DIR}\\gptsync_{sfx}.efi"),
        ]),
        ToolKind::Gdisk => Vec::from([
            format!("{TOOLS_DIR}\\gdisk.efi"),
            format!("{TOOLS_DIR}\\gdisk_{sfx}.efi"),
        ]),
        ToolKind::Memtest => MEMTEST_DIRS
            .iter()
            .flat_map(|dir| {
                [
                    "memtest86.efi".to_owned(),
                    format!("memtest86_{sfx}.efi"),
                    format!("memtest86{sfx}.efi"),
                    format!("boot{sfx}.efi"),
                ]
                .map(|name| join_path(dir, &name))
            })
            .collect(),
        ToolKind::FwUpdate => Vec::from([format!("{TOOLS_DIR}\\fwup{sfx}.efi"), format!("fwup{sfx}.efi")]),
        _ => Vec::new(),
    }
}

/// The title and icon of a tool found on a volume.
fn describe(tool: ToolKind, volume: &Volume) -> (String, &'static str) {
    match tool {
        ToolKind::Shell => ("UEFI Shell".to_owned(), "tool_shell"),
        ToolKind::Gptsync => ("Make a hybrid MBR".to_owned(), "tool_part"),
        ToolKind::Gdisk => ("Disk partitioning tool".to_owned(), "tool_part"),
        ToolKind::Memtest => ("Memory test utility".to_owned(), "tool_memtest"),
        ToolKind::MokTool => (format!("Secure Boot key tool on {}", volume.display_name()), "tool_mok_tool"),
        ToolKind::FwUpdate => ("Firmware update utility".to_owned(), "tool_fwupdate"),
        ToolKind::AppleRecovery => (format!("Recovery for {}", volume.display_name()), "tool_apple_rescue"),
        ToolKind::WindowsRecovery => (
            format!("Microsoft recovery tool on {}", volume.display_name()),
            "tool_windows_rescue",
        ),
        ToolKind::Shutdown | ToolKind::Reboot | ToolKind::Firmware => (String::new(), "unknown"),
    }
}

/// Checks if a tool exists on a volume, is an executable for the running architecture, and is not excluded.
fn is_usable(session: &ScanSession, volume: &Volume, fs: &mut dyn VolumeFs, path: &str) -> bool {
    if !fs.exists(path) {
        return false;
    }
    if session.filter().filename_in(
        volume,
        &dirname(path),
        basename(path),
        &session.policy.dont_scan_tools,
    ) {
        trace!("Tool {path} is excluded");
        return false;
    }
    is_valid_loader(Some(fs), path, session.arch)
}

/// Builds the target of a tool.
fn tool_target(tool: ToolKind, volume: &Rc<Volume>, path: &str) -> DiscoveredTarget {
    let (title, icon) = describe(tool, volume);
    TargetBuilder::loader(title, volume.clone(), path)
        .icon_hint(icon)
        .row(MenuRow::Tools)
        .build()
}

/// Builds the target of a built-in action.
fn action_target(action: BootAction) -> DiscoveredTarget {
    TargetBuilder::new(action.title(), TargetKind::Action(action))
        .icon_hint(action.icon())
        .row(MenuRow::Tools)
        .build()
}

/// Finds the first usable candidate of a tool on the boot manager's own volume.
fn find_on_own_volume(
    session: &ScanSession,
    catalog: &dyn VolumeCatalog,
    tool: ToolKind,
) -> Option<DiscoveredTarget> {
    let volume = catalog.self_volume()?;
    let mut fs = catalog.open_fs(volume)?;
    own_volume_paths(tool, session.arch)
        .into_iter()
        .find(|path| is_usable(session, volume, fs.as_mut(), path))
        .map(|path| tool_target(tool, volume, &path))
}

/// Finds a tool at fixed paths on every volume.
fn find_on_every_volume(
    session: &ScanSession,
    catalog: &dyn VolumeCatalog,
    tool: ToolKind,
    paths: &[String],
) -> Vec<DiscoveredTarget> {
    let mut targets = Vec::new();
    for volume in catalog.volumes() {
        if !volume.has_fs || !session.filter().should_scan_volume(volume) {
            continue;
        }
        let Some(mut fs) = catalog.open_fs(volume) else {
            continue;
        };
        for path in paths {
            if is_usable(session, volume, fs.as_mut(), path) {
                targets.push(tool_target(tool, volume, path));
            }
        }
    }
    targets
}

/// Finds the Secure Boot key tools next to the boot manager and in `EFI\tools` of every volume.
fn find_mok_tools(session: &ScanSession, catalog: &dyn VolumeCatalog) -> Vec<DiscoveredTarget> {
    let mut targets = Vec::new();
    if let (Some(location), Some(volume)) = (&session.self_location, catalog.self_volume())
        && let Some(mut fs) = catalog.open_fs(volume)
    {
        for name in MOK_NAMES {
            let path = join_path(&location.dir, name);
            if is_usable(session, volume, fs.as_mut(), &path) {
                targets.push(tool_target(ToolKind::MokTool, volume, &path));
            }
        }
    }

    let paths: Vec<String> = MOK_NAMES.iter().map(|x| join_path(TOOLS_DIR, x)).collect();
    for target in find_on_every_volume(session, catalog, ToolKind::MokTool, &paths) {
        if !targets.iter().any(|x| x.same_loader(&target)) {
            targets.push(target);
        }
    }
    targets
}

/// The iPXE loaders that start a network boot, looked for on the boot manager's own volume.
const NETWORK_LOADERS: [&str; 2] = ["EFI\\tools\\ipxe.efi", "EFI\\tools\\ipxe_discover.efi"];

/// Offers a network boot target when an iPXE loader sits next to the boot manager.
pub fn scan_network(session: &ScanSession, catalog: &dyn VolumeCatalog) -> Option<DiscoveredTarget> {
    let volume = catalog.self_volume()?;
    let mut fs = catalog.open_fs(volume)?;
    let path = NETWORK_LOADERS
        .into_iter()
        .find(|path| is_usable(session, volume, fs.as_mut(), path))?;
    Some(
        TargetBuilder::loader("Load network boot", volume.clone(), path)
            .os(OsFamily::Network)
            .icon_hints(OsFamily::Network.icon_names().iter().copied())
            .badge("vol_net")
            .build(),
    )
}

/// Offers the tools enabled by the policy, in the order they are listed.
///
/// A missing shell is looked for among the boot options of the firmware instead. The firmware setup action is only
/// offered when the firmware supports it.
pub fn scan_tools(session: &ScanSession, catalog: &dyn VolumeCatalog, vars: &dyn VariableStore) -> Vec<DiscoveredTarget> {
    let mut targets = Vec::new();
    for &tool in &session.policy.show_tools {
        match tool {
            ToolKind::Shell => match find_on_own_volume(session, catalog, tool) {
                Some(target) => targets.push(target),
                None => targets.extend(scan_firmware_defined(
                    vars,
                    &session.policy,
                    MenuRow::Tools,
                    Some("shell"),
                    session.self_location.as_ref().map(|x| x.path.as_str()),
                )),
            },
            ToolKind::Gptsync | ToolKind::Gdisk | ToolKind::Memtest | ToolKind::FwUpdate => {
                targets.extend(find_on_own_volume(session, catalog, tool));
            }
            ToolKind::MokTool => targets.extend(find_mok_tools(session, catalog)),
            ToolKind::AppleRecovery => targets.extend(find_on_every_volume(
                session,
                catalog,
                tool,
                &[APPLE_RECOVERY.to_owned()],
            )),
            ToolKind::WindowsRecovery => targets.extend(find_on_every_volume(
                session,
                catalog,
                tool,
                &[WINDOWS_RECOVERY.to_owned()],
            )),
            ToolKind::Shutdown => targets.push(action_target(BootAction::Shutdown)),
            ToolKind::Reboot => targets.push(action_target(BootAction::Reboot)),
            ToolKind::Firmware => {
                if firmware_ui_supported(vars) {
                    targets.push(action_target(BootAction::ResetToFirmware));
                }
            }
        }
    }
    targets
}
