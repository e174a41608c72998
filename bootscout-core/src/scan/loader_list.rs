// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`LoaderListEntry`], the ordering of loaders found in one directory.
//!
//! Loaders are held in a [`alloc::collections::BTreeSet`], so the order is fixed by [`Ord`]: rescue loaders after
//! everything else, then the newest first, then by path.

use alloc::string::String;
use core::cmp::Ordering;

use crate::system::{
    helper::{basename, contains_ignore_case},
    time::Timestamp,
};

/// The name marker of rescue kernels.
const RESCUE_MARKER: &str = "rescue";

/// One loader found during a directory scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderListEntry {
    /// The path of the loader.
    pub path: String,

    /// The modification time of the loader.
    pub timestamp: Timestamp,

    /// Whether the loader is a rescue kernel.
    pub rescue: bool,
}

impl LoaderListEntry {
    /// Creates a new [`LoaderListEntry`], deciding from the file name whether it is a rescue loader.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(path: String, timestamp: Timestamp) -> Self {
        let rescue = contains_ignore_case(basename(&path), RESCUE_MARKER);
        Self {
            path,
            timestamp,
            rescue,
        }
    }
}

impl Ord for LoaderListEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rescue
            .cmp(&other.rescue)
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for LoaderListEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use alloc::{collections::BTreeSet, format, vec::Vec};

    use proptest::prelude::*;

    use super::*;

    fn entry(path: &str, day: u8) -> LoaderListEntry {
        LoaderListEntry::new(path.into(), Timestamp::from_parts(2024, 1, day, 0, 0, 0))
    }

    #[test]
    fn rescue_sorts_last_even_when_newest() {
        let set: BTreeSet<_> = [
            entry("vmlinuz-0-rescue-abc", 30),
            entry("vmlinuz-5.10", 1),
            entry("vmlinuz-5.15", 20),
        ]
        .into_iter()
        .collect();
        let paths: Vec<_> = set.iter().map(|x| x.path.as_str()).collect();
        assert_eq!(paths, ["vmlinuz-5.15", "vmlinuz-5.10", "vmlinuz-0-rescue-abc"]);
    }

    #[test]
    fn ties_are_broken_by_path() {
        let set: BTreeSet<_> = [entry("b.efi", 1), entry("a.efi", 1)].into_iter().collect();
        assert_eq!(set.first().unwrap().path, "a.efi");
    }

    #[test]
    fn rescue_marker_is_case_insensitive_on_the_file_name() {
        assert!(entry("EFI\\fedora\\vmlinuz-0-RESCUE", 1).rescue);
        assert!(!entry("EFI\\rescue\\vmlinuz", 1).rescue);
    }

    proptest! {
        #[test]
        fn fold_order(days in proptest::collection::vec((1u8..28, any::<bool>()), 1..12)) {
            let set: BTreeSet<_> = days
                .iter()
                .enumerate()
                .map(|(i, &(day, rescue))| {
                    let name = if rescue { format!("vmlinuz-{i}-rescue") } else { format!("vmlinuz-{i}") };
                    entry(&name, day)
                })
                .collect();
            let entries: Vec<_> = set.into_iter().collect();

            for pair in entries.windows(2) {
                prop_assert!(!pair[0].rescue || pair[1].rescue);
                if pair[0].rescue == pair[1].rescue {
                    prop_assert!(pair[0].timestamp >= pair[1].timestamp);
                }
            }
        }
    }
}
