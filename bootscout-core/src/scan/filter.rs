// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`PathFilter`], which decides whether a volume, directory or file may be scanned.
//!
//! Entries of the exclusion lists may carry a volume qualifier, as in `ESP:EFI\ubuntu` or
//! `Recovery HD:boot.efi`. A volume qualifier matches the filesystem label, the partition name, the unique
//! partition GUID or the device path text of a volume, ignoring case.

use crate::{
    policy::{ScanPolicy, tags::TagList},
    system::helper::{basename, dirname, normalize_path, path_eq},
    volume::{SelfLocation, Volume},
};

/// Splits an optional `volume:` prefix off a path.
#[must_use = "Has no effect if the result is unused"]
pub fn split_volume(path: &str) -> (Option<&str>, &str) {
    match path.split_once(':') {
        Some((volume, rest)) if !volume.is_empty() => (Some(volume), rest),
        Some((_, rest)) => (None, rest),
        None => (None, path),
    }
}

/// Scan filter over the policy of one pass.
#[derive(Clone, Copy, Debug)]
pub struct PathFilter<'a> {
    /// The policy of the pass.
    policy: &'a ScanPolicy,

    /// Where the boot manager was loaded from.
    self_location: Option<&'a SelfLocation>,
}

impl<'a> PathFilter<'a> {
    /// Creates a new [`PathFilter`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(policy: &'a ScanPolicy, self_location: Option<&'a SelfLocation>) -> Self {
        Self {
            policy,
            self_location,
        }
    }

    /// Checks if a volume may be scanned at all.
    #[must_use = "Has no effect if the result is unused"]
    pub fn should_scan_volume(&self, volume: &Volume) -> bool {
        !self
            .policy
            .dont_scan_volumes
            .iter()
            .any(|x| volume.matches_description(x))
    }

    /// Checks if a directory of a volume may be scanned.
    ///
    /// The directory may carry a `volume:` prefix, in which case it only applies to the named volume.
    #[must_use = "Has no effect if the result is unused"]
    pub fn should_scan(&self, volume: &Volume, path: &str) -> bool {
        let (target_volume, path) = split_volume(path);
        if target_volume.is_some_and(|x| !volume.matches_description(x)) {
            return false;
        }

        if let Some(location) = self.self_location
            && location.volume == volume.id
            && path_eq(path, &location.dir)
        {
            return false;
        }

        !self.policy.dont_scan_dirs.iter().any(|entry| {
            let (entry_volume, entry_path) = split_volume(entry);
            entry_volume.is_none_or(|x| volume.matches_description(x)) && path_eq(entry_path, path)
        })
    }

    /// Checks if a file matches any `[volume:][dir\]file` entry of a list.
    ///
    /// An entry without a directory matches the file in any directory, and an entry without a volume matches on any
    /// volume.
    #[must_use = "Has no effect if the result is unused"]
    pub fn filename_in(&self, volume: &Volume, dir: &str, file: &str, list: &TagList) -> bool {
        list.iter().any(|entry| {
            let (entry_volume, entry_path) = split_volume(entry);
            let entry_path = normalize_path(entry_path);
            let entry_dir = dirname(&entry_path);
            entry_volume.is_none_or(|x| volume.matches_description(x))
                && (entry_dir.is_empty() || path_eq(&entry_dir, dir))
                && basename(&entry_path).eq_ignore_ascii_case(file)
        })
    }
}
