// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Finds EFI loaders in the directories of a volume.

use alloc::{
    collections::BTreeSet,
    format,
    rc::Rc,
    string::String,
    vec::Vec,
};

use log::{debug, trace};

use crate::{
    scan::{
        ScanSession,
        classify::{build_loader_target, is_kernel_name, linux_options},
        duplicate::duplicates_fallback,
        filter::split_volume,
        loader_list::LoaderListEntry,
        tools::shell_paths,
        validate::is_valid_loader,
    },
    system::{
        fs::VolumeFs,
        helper::{basename, extension, join_path, path_eq, wildcard_match_any},
    },
    target::{DiscoveredTarget, SubEntry},
    volume::Volume,
};

/// The directory holding the macOS loader.
const MACOS_DIR: &str = "System\\Library\\CoreServices";

/// The directory holding the Windows loader.
const MICROSOFT_DIR: &str = "EFI\\Microsoft\\Boot";

/// The Boot-Repair backup of the Windows loader.
const MICROSOFT_BACKUP: &str = "bkpbootmgfw.efi";

/// The Windows loader.
const MICROSOFT_LOADER: &str = "bootmgfw.efi";

/// The directory of the removable media fallback loader.
const FALLBACK_DIR: &str = "EFI\\BOOT";

/// Extensions of icon files that sit next to loaders.
const ICON_EXTENSIONS: [&str; 2] = [".icns", ".png"];

/// Patterns of Linux kernels that lack an `.efi` extension.
const KERNEL_PATTERNS: [&str; 3] = ["vmlinuz*", "bzImage*", "kernel*"];

/// The result of scanning one directory.
#[derive(Debug, Default)]
pub struct DirScan {
    /// The targets found.
    pub targets: Vec<DiscoveredTarget>,

    /// Whether one of the loaders is a copy of the fallback loader.
    pub found_fallback_duplicate: bool,
}

/// Checks if a directory entry is a loader candidate, before its contents are looked at.
fn is_candidate(session: &ScanSession, volume: &Volume, dir: &str, name: &str, patterns: &[&str]) -> bool {
    if name.starts_with('.') || !wildcard_match_any(name, patterns) {
        return false;
    }

    let ext = extension(name);
    if ICON_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(ext)) {
        return false;
    }

    if path_eq(dir, FALLBACK_DIR) && name.eq_ignore_ascii_case(&session.arch.fallback_name()) {
        return false;
    }

    !session
        .filter()
        .filename_in(volume, dir, name, &shell_paths(session.arch))
}

/// Scans one directory for loaders whose names match any of `patterns`.
///
/// Loaders are ordered newest first, with rescue kernels last. When kernel folding is enabled, every Linux kernel
/// after the first becomes a sub-entry of the first.
pub fn scan_loader_dir(
    session: &ScanSession,
    volume: &Rc<Volume>,
    fs: &mut dyn VolumeFs,
    dir: &str,
    patterns: &[&str],
) -> DirScan {
    let mut scan = DirScan::default();
    let filter = session.filter();
    if !filter.should_scan(volume, dir) {
        trace!("Skipping {dir} on {}", volume.display_name());
        return scan;
    }

    let entries = match fs.read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            trace!("Could not read {dir} on {}: {e}", volume.display_name());
            return scan;
        }
    };

    let mut loaders = BTreeSet::new();
    for entry in entries.into_iter().filter(|x| !x.is_dir) {
        let name = entry.name.as_str();
        if !is_candidate(session, volume, dir, name, patterns) {
            continue;
        }

        let path = join_path(dir, name);
        if fs.file_info(&path).map(|x| x.size).ok() != Some(entry.size) {
            trace!("{path} looks like a link, skipping");
            continue;
        }
        if fs.exists(&format!("{path}.signed")) {
            trace!("{path} has a signed counterpart, skipping");
            continue;
        }
        if filter.filename_in(volume, dir, name, &session.policy.dont_scan_files) {
            trace!("{path} is excluded");
            continue;
        }
        if !is_valid_loader(Some(&mut *fs), &path, session.arch) {
            continue;
        }

        loaders.insert(LoaderListEntry::new(path, entry.modified));
    }

    let mut first_kernel: Option<usize> = None;
    for loader in loaders {
        if !scan.found_fallback_duplicate {
            scan.found_fallback_duplicate = duplicates_fallback(fs, &loader.path, session.arch);
        }

        let name = basename(&loader.path);
        let kernel = is_kernel_name(name);
        if kernel
            && session.policy.fold_linux_kernels
            && let Some(first) = first_kernel.and_then(|x| scan.targets.get_mut(x))
        {
            debug!("Folding {} into {:?}", loader.path, first.loader_path);
            first.sub_entries.push(SubEntry {
                title: format!("Boot with {name} ({})", loader.timestamp.date_string()),
                load_options: Some(linux_options(volume, fs, &loader.path)),
                loader_path: Some(loader.path.clone()),
                graphics: first.graphics,
            });
            continue;
        }

        let title = format!("Boot {} from {}", loader.path, volume.display_name());
        scan.targets
            .push(build_loader_target(session, volume, fs, &loader.path, &title));
        if kernel && first_kernel.is_none() {
            first_kernel = Some(scan.targets.len() - 1);
        }
    }

    scan
}

/// Adds the targets of a directory scan to the targets of a volume, dropping loaders that are already present.
fn absorb(targets: &mut Vec<DiscoveredTarget>, found_duplicate: &mut bool, scan: DirScan) {
    *found_duplicate |= scan.found_fallback_duplicate;
    for target in scan.targets {
        if !targets.iter().any(|x| x.same_loader(&target)) {
            targets.push(target);
        }
    }
}

/// Scans every place on a volume that usually holds loaders.
///
/// The macOS and Windows loaders come first, then the root directory, the subdirectories of `EFI`, the extra
/// directories of the policy and finally the fallback loader. The fallback loader is left out if it is a copy of
/// another loader on the volume, or of the running boot manager.
pub fn scan_volume_loaders(
    session: &ScanSession,
    volume: &Rc<Volume>,
    fs: &mut dyn VolumeFs,
) -> Vec<DiscoveredTarget> {
    let mut patterns = Vec::from(["*.efi"]);
    if session.policy.scan_all_linux_kernels {
        patterns.extend(KERNEL_PATTERNS);
    }

    let mut targets = Vec::new();
    let mut found_duplicate = false;
    let mut scanned: Vec<String> = Vec::new();

    let scan = scan_loader_dir(session, volume, fs, MACOS_DIR, &["boot.efi", "xom.efi"]);
    absorb(&mut targets, &mut found_duplicate, scan);

    let windows = if fs.exists(&join_path(MICROSOFT_DIR, MICROSOFT_BACKUP)) {
        MICROSOFT_BACKUP
    } else {
        MICROSOFT_LOADER
    };
    let scan = scan_loader_dir(session, volume, fs, MICROSOFT_DIR, &[windows]);
    absorb(&mut targets, &mut found_duplicate, scan);

    let mut dirs = Vec::from([String::new()]);
    if let Ok(entries) = fs.read_dir("EFI") {
        dirs.extend(
            entries
                .into_iter()
                .filter(|x| x.is_dir && !x.name.starts_with('.') && !x.name.eq_ignore_ascii_case("tools"))
                .map(|x| join_path("EFI", &x.name)),
        );
    }
    for dir in session.policy.also_scan_dirs.iter() {
        let (qualifier, path) = split_volume(dir);
        if qualifier.is_none_or(|x| volume.matches_description(x)) {
            dirs.push(join_path("", path));
        }
    }

    for dir in dirs {
        if scanned.iter().any(|x| path_eq(x, &dir)) {
            continue;
        }
        let scan = scan_loader_dir(session, volume, fs, &dir, &patterns);
        absorb(&mut targets, &mut found_duplicate, scan);
        scanned.push(dir);
    }

    if !found_duplicate && let Some(fallback) = scan_fallback(session, volume, fs) {
        absorb(
            &mut targets,
            &mut found_duplicate,
            DirScan {
                targets: Vec::from([fallback]),
                found_fallback_duplicate: false,
            },
        );
    }

    targets
}

/// Builds the target of the fallback loader, unless it is excluded or it is the running boot manager.
fn scan_fallback(session: &ScanSession, volume: &Rc<Volume>, fs: &mut dyn VolumeFs) -> Option<DiscoveredTarget> {
    let path = session.arch.fallback_path();
    let name = session.arch.fallback_name();
    let filter = session.filter();

    if !fs.exists(&path)
        || !filter.should_scan(volume, FALLBACK_DIR)
        || filter.filename_in(volume, FALLBACK_DIR, &name, &session.policy.dont_scan_files)
    {
        return None;
    }

    if let Some(location) = &session.self_location
        && location.volume == volume.id
        && (path_eq(&location.path, &path) || duplicates_fallback(fs, &location.path, session.arch))
    {
        debug!("The fallback loader on {} is this boot manager", volume.display_name());
        return None;
    }

    if !is_valid_loader(Some(&mut *fs), &path, session.arch) {
        return None;
    }

    let title = format!("Boot fallback boot loader from {}", volume.display_name());
    Some(build_loader_target(session, volume, fs, &path, &title))
}
