// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Fallback loader duplicate detection.
//!
//! Installers commonly copy their loader to the removable media fallback path as well. When a scanned loader is a
//! byte for byte copy of the fallback loader on the same volume, the fallback entry is left out of the menu.

use log::{debug, trace};

use crate::system::{
    fs::VolumeFs,
    helper::{Arch, path_eq},
};

/// Checks if the loader at `path` is a copy of the fallback loader of the same volume.
///
/// Sizes are compared first, so contents are only read when both files have the same size. A file that cannot be
/// read is never reported as a duplicate.
pub fn duplicates_fallback(fs: &mut dyn VolumeFs, path: &str, arch: Arch) -> bool {
    let fallback = arch.fallback_path();
    if path_eq(path, &fallback) {
        return false;
    }

    let (Ok(candidate), Ok(fallback_info)) = (fs.file_info(path), fs.file_info(&fallback)) else {
        return false;
    };
    if candidate.size != fallback_info.size {
        return false;
    }

    match (fs.read(path), fs.read(&fallback)) {
        (Ok(a), Ok(b)) => {
            let same = a == b;
            if same {
                trace!("{path} is a copy of the fallback loader");
            }
            same
        }
        (Err(e), _) | (_, Err(e)) => {
            debug!("Could not compare {path} with the fallback loader: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::fs::memfs::MemFs;

    const FALLBACK: &str = "EFI\\BOOT\\bootx64.efi";

    #[test]
    fn identical_copies_are_duplicates() {
        let mut fs = MemFs::new()
            .file(FALLBACK, b"grub image")
            .file("EFI\\ubuntu\\grubx64.efi", b"grub image");
        assert!(duplicates_fallback(&mut fs, "EFI\\ubuntu\\grubx64.efi", Arch::X64));
    }

    #[test]
    fn fallback_itself_is_not_a_duplicate() {
        let mut fs = MemFs::new().file(FALLBACK, b"grub image");
        assert!(!duplicates_fallback(&mut fs, "efi/boot/BOOTX64.EFI", Arch::X64));
        assert_eq!(fs.full_reads, 0);
    }

    #[test]
    fn size_mismatch_skips_reading() {
        let mut fs = MemFs::new()
            .file(FALLBACK, b"grub image")
            .file("EFI\\ubuntu\\grubx64.efi", b"other image, longer");
        assert!(!duplicates_fallback(&mut fs, "EFI\\ubuntu\\grubx64.efi", Arch::X64));
        assert_eq!(fs.full_reads, 0);
    }

    #[test]
    fn same_size_different_content() {
        let mut fs = MemFs::new()
            .file(FALLBACK, b"aaaa")
            .file("EFI\\a\\a.efi", b"aaab");
        assert!(!duplicates_fallback(&mut fs, "EFI\\a\\a.efi", Arch::X64));
    }

    #[test]
    fn missing_or_unreadable_files() {
        let mut fs = MemFs::new().file("EFI\\a\\a.efi", b"aaaa");
        assert!(!duplicates_fallback(&mut fs, "EFI\\a\\a.efi", Arch::X64));

        let mut fs = MemFs::new()
            .file(FALLBACK, b"aaaa")
            .file("EFI\\a\\a.efi", b"aaaa")
            .unreadable("EFI\\a\\a.efi");
        assert!(!duplicates_fallback(&mut fs, "EFI\\a\\a.efi", Arch::X64));
    }
}
