// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Legacy boot code detection.
//!
//! The first sector of a disk or partition is inspected for the `0x55AA` boot signature and for the message strings
//! that well known boot sectors carry, which name the OS that installed them.

use crate::{system::block::Sector, target::OsFamily};

/// Byte offset of the MBR partition table.
const PARTITION_TABLE: usize = 446;

/// Partition type of a GPT protective MBR entry.
const PROTECTIVE_MBR_TYPE: u8 = 0xee;

/// Known boot sector strings, and the family of the OS that installs them.
const SIGNATURES: &[(&[u8], OsFamily)] = &[
    (b"NTLDR", OsFamily::Windows),
    (b"BOOTMGR", OsFamily::Windows),
    (b"Geom\0Hard Disk\0Read\0 Error", OsFamily::Linux),
    (b"GRUB", OsFamily::Linux),
    (b"LILO", OsFamily::Linux),
    (b"SYSLINUX", OsFamily::Linux),
    (b"ISOLINUX", OsFamily::Linux),
    (b"Boot failed: ", OsFamily::FreeBsd),
    (b"BTX", OsFamily::FreeBsd),
];

/// What the first sector of a volume says about legacy booting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootCode {
    /// The sector carries the boot signature and some code.
    pub present: bool,

    /// The OS named by a known boot code string.
    pub os: Option<OsFamily>,

    /// The partition table is a GPT protective MBR.
    pub protective_mbr: bool,
}

/// Inspects a boot sector.
#[must_use = "Has no effect if the result is unused"]
pub fn detect(sector: &Sector) -> BootCode {
    let signed = sector[510] == 0x55 && sector[511] == 0xaa;
    if !signed || sector[0] == 0 {
        return BootCode::default();
    }

    let os = SIGNATURES
        .iter()
        .find(|(pattern, _)| contains(sector, pattern))
        .map(|&(_, os)| os);

    let protective_mbr = sector[PARTITION_TABLE..PARTITION_TABLE + 64]
        .chunks_exact(16)
        .any(|x| x[4] == PROTECTIVE_MBR_TYPE);

    BootCode {
        present: true,
        os,
        protective_mbr,
    }
}

/// Checks if a byte pattern occurs anywhere in a buffer.
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|x| x == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_sector(code: &[u8]) -> Sector {
        let mut sector = [0; 512];
        sector[..code.len()].copy_from_slice(code);
        sector[510] = 0x55;
        sector[511] = 0xaa;
        sector
    }

    #[test]
    fn unsigned_or_empty_sectors_have_no_code() {
        assert!(!detect(&[0; 512]).present);

        let mut sector = signed_sector(b"");
        assert!(!detect(&sector).present);
        sector[0] = 0xeb;
        sector[510] = 0;
        assert!(!detect(&sector).present);
    }

    #[test]
    fn names_the_installer() {
        let mut sector = signed_sector(&[0xeb, 0x63, 0x90]);
        sector[0x180..0x180 + 26].copy_from_slice(b"Geom\0Hard Disk\0Read\0 Error");
        let code = detect(&sector);
        assert!(code.present);
        assert_eq!(code.os, Some(OsFamily::Linux));

        let mut sector = signed_sector(&[0x33, 0xc0]);
        sector[0x160..0x167].copy_from_slice(b"BOOTMGR");
        assert_eq!(detect(&sector).os, Some(OsFamily::Windows));
    }

    #[test]
    fn flags_protective_mbr() {
        let mut sector = signed_sector(&[0xfa]);
        sector[PARTITION_TABLE + 4] = PROTECTIVE_MBR_TYPE;
        let code = detect(&sector);
        assert!(code.present);
        assert!(code.protective_mbr);
        assert_eq!(code.os, None);
    }
}
