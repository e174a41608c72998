// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Executable header sniffing.
//!
//! A loader is only offered if its first sector looks like something the firmware can start: either an Apple fat
//! binary, or a PE/COFF image built for the running architecture.

use log::debug;
use object::pe::ImageDosHeader;

use crate::system::{fs::VolumeFs, helper::Arch};

/// The size of the header that is read.
pub const HEADER_SIZE: usize = 512;

/// The magic number of Apple fat binaries, which carry images for several architectures.
pub const FAT_BINARY_MAGIC: u32 = 0x0ef1_fab9;

/// The PE header must start below this offset, so that it fits in the header that was read.
const MAX_PE_OFFSET: usize = 0x180;

/// The signature of a PE header.
const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";

/// Checks if a file on a volume is a loader for `arch`.
///
/// A target without a filesystem cannot be checked and is assumed valid. A header that cannot be read in full is
/// invalid.
pub fn is_valid_loader(fs: Option<&mut dyn VolumeFs>, path: &str, arch: Arch) -> bool {
    let Some(fs) = fs else {
        return true;
    };

    let mut header = [0; HEADER_SIZE];
    match fs.read_header(path, &mut header) {
        Ok(HEADER_SIZE) => (),
        Ok(read) => {
            debug!("{path} is too short to be a loader ({read} bytes)");
            return false;
        }
        Err(e) => {
            debug!("Could not read the header of {path}: {e}");
            return false;
        }
    }

    let valid = is_valid_header(&header, arch);
    if !valid {
        debug!("{path} is not a {} loader", arch.efi_suffix());
    }
    valid
}

/// Checks if a header is an Apple fat binary or a PE image for `arch`.
#[must_use = "Has no effect if the result is unused"]
pub fn is_valid_header(header: &[u8], arch: Arch) -> bool {
    if header
        .get(0..4)
        .is_some_and(|x| u32::from_le_bytes([x[0], x[1], x[2], x[3]]) == FAT_BINARY_MAGIC)
    {
        return true;
    }

    let Ok(dos) = ImageDosHeader::parse(header) else {
        return false;
    };

    let Ok(offset) = usize::try_from(dos.nt_headers_offset()) else {
        return false;
    };
    if offset >= MAX_PE_OFFSET {
        return false;
    }

    header.get(offset..offset + 4) == Some(PE_SIGNATURE.as_slice())
        && header
            .get(offset + 4..offset + 6)
            .is_some_and(|x| u16::from_le_bytes([x[0], x[1]]) == arch.pe_machine())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::system::fs::memfs::{MemFs, pe_image};

    #[test]
    fn accepts_matching_machine() {
        let image = pe_image(Arch::X64.pe_machine(), b"");
        assert!(is_valid_header(&image, Arch::X64));
        assert!(!is_valid_header(&image, Arch::Aa64));
    }

    #[test]
    fn accepts_fat_binaries() {
        let mut header = [0; HEADER_SIZE];
        header[..4].copy_from_slice(&FAT_BINARY_MAGIC.to_le_bytes());
        assert!(is_valid_header(&header, Arch::Ia32));
    }

    #[test]
    fn rejects_far_pe_headers() {
        let mut image = pe_image(Arch::X64.pe_machine(), b"");
        image[0x3c..0x40].copy_from_slice(&0x180u32.to_le_bytes());
        assert!(!is_valid_header(&image, Arch::X64));
    }

    #[test]
    fn reads_from_volumes() {
        let mut fs = MemFs::new()
            .file("good.efi", &pe_image(Arch::X64.pe_machine(), b""))
            .file("short.efi", b"MZ")
            .file("text.efi", &[b'#'; 600])
            .file("broken.efi", &pe_image(Arch::X64.pe_machine(), b""))
            .unreadable("broken.efi");

        assert!(is_valid_loader(Some(&mut fs), "good.efi", Arch::X64));
        assert!(!is_valid_loader(Some(&mut fs), "short.efi", Arch::X64));
        assert!(!is_valid_loader(Some(&mut fs), "text.efi", Arch::X64));
        assert!(!is_valid_loader(Some(&mut fs), "broken.efi", Arch::X64));
        assert!(!is_valid_loader(Some(&mut fs), "missing.efi", Arch::X64));
        assert!(is_valid_loader(None, "anything.efi", Arch::X64));
    }

    proptest! {
        #[test]
        fn doesnt_panic(x in proptest::collection::vec(any::<u8>(), 0..600)) {
            let _ = is_valid_header(&x, Arch::X64);
        }
    }
}
