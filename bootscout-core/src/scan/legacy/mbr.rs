// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! MBR partition activation.
//!
//! Legacy boot on Apple firmware starts whatever the MBR boot code chains to, which is the partition flagged active.
//! Before such a boot the target partition is flagged active in the MBR, or in the chain of extended boot records
//! for a logical partition, and every other partition is cleared.

use bytemuck::{Pod, Zeroable};
use log::{debug, trace};
use thiserror::Error;

use crate::system::block::{BlockError, Sector, SectorDevice};

/// The offset of the partition table in a boot record.
const TABLE_OFFSET: usize = 446;

/// The offset of the boot record signature.
const SIGNATURE_OFFSET: usize = 510;

/// The size of the boot code area of an MBR.
const BOOT_CODE_SIZE: usize = 440;

/// The flag of an active partition.
const ACTIVE: u8 = 0x80;

/// The flag of an inactive partition.
const INACTIVE: u8 = 0x00;

/// Partition types that hold extended boot records.
const EXTENDED_TYPES: [u8; 3] = [0x05, 0x0f, 0x85];

/// The longest extended boot record chain that is followed.
const MAX_CHAIN: usize = 128;

/// 16-bit boot code that relocates itself, then loads and starts the boot sector of the active partition.
///
/// It is installed when the boot code area of the MBR is empty, so that the firmware has something to start.
const STUB_BOOT_CODE: [u8; 97] = [
    0xfa, 0x31, 0xc0, 0x8e, 0xd0, 0xbc, 0x00, 0x7c, 0x8e, 0xd8, 0x8e, 0xc0, 0xfb, 0xfc, 0xbe, 0x00, 0x7c, 0xbf, 0x00,
    0x06, 0xb9, 0x00, 0x01, 0xf3, 0xa5, 0xea, 0x1e, 0x06, 0x00, 0x00, 0xbe, 0xbe, 0x07, 0xb9, 0x04, 0x00, 0x80, 0x3c,
    0x80, 0x74, 0x0a, 0x83, 0xc6, 0x10, 0xe2, 0xf6, 0xcd, 0x18, 0xf4, 0xeb, 0xfd, 0x89, 0xf5, 0x66, 0x8b, 0x44, 0x08,
    0x66, 0x6a, 0x00, 0x66, 0x50, 0x6a, 0x00, 0x68, 0x00, 0x7c, 0x6a, 0x01, 0x6a, 0x10, 0x89, 0xe6, 0xb4, 0x42, 0xcd,
    0x13, 0x72, 0xdf, 0x83, 0xc4, 0x10, 0x81, 0x3e, 0xfe, 0x7d, 0x55, 0xaa, 0x75, 0xd4, 0x89, 0xee, 0xea, 0x00, 0x7c,
    0x00, 0x00,
];

/// An `Error` that may result from activating a partition.
#[derive(Error, Debug)]
pub enum MbrError {
    /// A boot record lacks the `0x55 0xAA` signature.
    #[error("No boot record signature at LBA {lba}")]
    NoSignature {
        /// The block of the boot record.
        lba: u64,
    },

    /// A partition entry has a flag other than active or inactive, so the table is not trusted.
    #[error("Unexpected partition flag {flag:#04x} at LBA {lba}")]
    InvalidFlag {
        /// The block of the boot record.
        lba: u64,

        /// The flag found.
        flag: u8,
    },

    /// The disk could not be accessed.
    #[error("Block IO Error")]
    Block(#[from] BlockError),

    /// The extended boot record chain ended before the logical partition was reached.
    #[error("Partition {0} not found")]
    PartitionNotFound(usize),

    /// The extended boot record chain is too long, or loops.
    #[error("Extended boot record chain is too long")]
    ChainTooLong,
}

/// One entry of a partition table.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct MbrEntry {
    /// The boot flag.
    pub flags: u8,

    /// The CHS address of the first sector.
    pub start_chs: [u8; 3],

    /// The partition type.
    pub part_type: u8,

    /// The CHS address of the last sector.
    pub end_chs: [u8; 3],

    /// The first sector, relative to the disk or to the extended partition.
    pub start_lba: [u8; 4],

    /// The number of sectors.
    pub size: [u8; 4],
}

// SAFETY: `MbrEntry` is `repr(C)` and made only of byte arrays, so it has no padding and any bit pattern is valid.
unsafe impl Zeroable for MbrEntry {}

// SAFETY: see above, and the type is `Copy` and `'static`.
unsafe impl Pod for MbrEntry {}

impl MbrEntry {
    /// The first sector.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn start(&self) -> u32 {
        u32::from_le_bytes(self.start_lba)
    }

    /// The number of sectors.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn sectors(&self) -> u32 {
        u32::from_le_bytes(self.size)
    }

    /// Checks if the entry points at an extended boot record.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_extended(&self) -> bool {
        EXTENDED_TYPES.contains(&self.part_type)
    }
}

/// The partition table of a boot record.
fn table(sector: &mut Sector) -> &mut [MbrEntry] {
    bytemuck::cast_slice_mut(&mut sector[TABLE_OFFSET..SIGNATURE_OFFSET])
}

/// Reads a boot record and checks its signature.
fn read_record(disk: &mut dyn SectorDevice, lba: u64) -> Result<Sector, MbrError> {
    let sector = disk.read_sector(lba)?;
    if sector[SIGNATURE_OFFSET..] != [0x55, 0xaa] {
        return Err(MbrError::NoSignature { lba });
    }
    Ok(sector)
}

/// Checks the flag of a partition entry.
const fn check_flag(entry: &MbrEntry, lba: u64) -> Result<(), MbrError> {
    if entry.flags != ACTIVE && entry.flags != INACTIVE {
        return Err(MbrError::InvalidFlag {
            lba,
            flag: entry.flags,
        });
    }
    Ok(())
}

/// Marks partition `index` as the only active partition of a disk.
///
/// Indices 0 to 3 are the primary partitions. Higher indices are logical partitions, counted along the extended boot
/// record chain, in which case the extended partition and the links leading to the logical partition are flagged
/// active as well.
///
/// # Errors
///
/// May return an `Error` if a boot record is missing its signature or has an unexpected flag, if the disk could not
/// be read or written, or if a logical partition does not exist. A record with an unexpected flag is never written.
pub fn activate_mbr_partition(disk: &mut dyn SectorDevice, index: usize) -> Result<(), MbrError> {
    let mut mbr = read_record(disk, 0)?;

    if mbr[..BOOT_CODE_SIZE].iter().all(|&x| x == 0) {
        debug!("Installing boot code into an empty MBR");
        mbr[..STUB_BOOT_CODE.len()].copy_from_slice(&STUB_BOOT_CODE);
    }

    let mut ext_base = 0;
    for (i, entry) in table(&mut mbr).iter_mut().enumerate() {
        check_flag(entry, 0)?;
        entry.flags = if i == index {
            ACTIVE
        } else if index >= 4 && entry.is_extended() {
            ext_base = u64::from(entry.start());
            ACTIVE
        } else {
            INACTIVE
        };
    }
    disk.write_sector(0, &mbr)?;

    if index < 4 {
        return Ok(());
    }

    let mut logical = 4;
    let mut current = ext_base;
    let mut links = 0;
    while current != 0 {
        links += 1;
        if links > MAX_CHAIN {
            return Err(MbrError::ChainTooLong);
        }

        let mut record = read_record(disk, current)?;
        let mut next = 0;
        for entry in table(&mut record) {
            check_flag(entry, current)?;
            if entry.start() == 0 || entry.sectors() == 0 {
                break;
            }

            if entry.is_extended() {
                next = ext_base + u64::from(entry.start());
                entry.flags = if index >= logical { ACTIVE } else { INACTIVE };
                break;
            }

            entry.flags = if index == logical { ACTIVE } else { INACTIVE };
            logical += 1;
        }

        trace!("Writing extended boot record at LBA {current}");
        disk.write_sector(current, &record)?;

        if index < logical {
            return Ok(());
        }
        current = next;
    }

    Err(MbrError::PartitionNotFound(index))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::system::block::{SECTOR_SIZE, memdisk::MemDisk};

    fn record(entries: &[(u8, u8, u32, u32)]) -> Sector {
        let mut sector = [0; SECTOR_SIZE];
        sector[0] = 0xeb;
        sector[SIGNATURE_OFFSET] = 0x55;
        sector[SIGNATURE_OFFSET + 1] = 0xaa;
        for (slot, &(flags, part_type, start, size)) in table(&mut sector).iter_mut().zip(entries) {
            slot.flags = flags;
            slot.part_type = part_type;
            slot.start_lba = start.to_le_bytes();
            slot.size = size.to_le_bytes();
        }
        sector
    }

    fn flags(sector: &mut Sector) -> [u8; 4] {
        let table = table(sector);
        [table[0].flags, table[1].flags, table[2].flags, table[3].flags]
    }

    /// Two primaries, then an extended partition at 1000 with three logical partitions.
    fn disk() -> MemDisk {
        MemDisk::new()
            .with_sector(0, record(&[(0x80, 0x07, 63, 100), (0, 0x83, 200, 100), (0, 0x0f, 1000, 9000)]))
            .with_sector(1000, record(&[(0, 0x83, 63, 100), (0, 0x05, 500, 1000)]))
            .with_sector(1500, record(&[(0, 0x83, 63, 100), (0, 0x05, 2000, 1000)]))
            .with_sector(3000, record(&[(0, 0x83, 63, 100)]))
    }

    #[test]
    fn activates_a_primary_partition() {
        let mut disk = disk();
        activate_mbr_partition(&mut disk, 1).unwrap();
        assert_eq!(flags(&mut disk.sector(0)), [0, 0x80, 0, 0]);
        assert_eq!(disk.writes, [0]);
        assert_eq!(disk.sector(0)[0], 0xeb);
    }

    #[test]
    fn activates_a_logical_partition() {
        let mut disk = disk();
        activate_mbr_partition(&mut disk, 5).unwrap();

        assert_eq!(flags(&mut disk.sector(0)), [0, 0, 0x80, 0]);
        assert_eq!(flags(&mut disk.sector(1000)), [0, 0x80, 0, 0]);
        assert_eq!(flags(&mut disk.sector(1500)), [0x80, 0, 0, 0]);
        assert_eq!(disk.writes, [0, 1000, 1500]);
        assert_eq!(flags(&mut disk.sector(3000)), [0, 0, 0, 0]);
    }

    #[test]
    fn missing_logical_partition() {
        let mut disk = disk();
        assert!(matches!(
            activate_mbr_partition(&mut disk, 9),
            Err(MbrError::PartitionNotFound(9))
        ));
    }

    #[test]
    fn refuses_unexpected_flags() {
        let mut disk = MemDisk::new().with_sector(0, record(&[(0x12, 0x07, 63, 100)]));
        assert!(matches!(
            activate_mbr_partition(&mut disk, 0),
            Err(MbrError::InvalidFlag { lba: 0, flag: 0x12 })
        ));
        assert!(disk.writes.is_empty());
    }

    #[test]
    fn refuses_unsigned_records() {
        let mut disk = MemDisk::new();
        assert!(matches!(
            activate_mbr_partition(&mut disk, 0),
            Err(MbrError::NoSignature { lba: 0 })
        ));
    }

    #[test]
    fn installs_boot_code_into_empty_mbr() {
        let mut mbr = record(&[(0, 0x07, 63, 100)]);
        mbr[0] = 0;
        let mut disk = MemDisk::new().with_sector(0, mbr);
        activate_mbr_partition(&mut disk, 0).unwrap();
        let sector = disk.sector(0);
        assert_eq!(sector[..STUB_BOOT_CODE.len()], STUB_BOOT_CODE);
        assert_eq!(sector[SIGNATURE_OFFSET..], [0x55, 0xaa]);
    }

    #[test]
    fn write_failures_are_reported() {
        let mut disk = disk();
        disk.fail_write_at = Some(0);
        assert!(matches!(
            activate_mbr_partition(&mut disk, 0),
            Err(MbrError::Block(BlockError::Write { lba: 0, .. }))
        ));
    }

    #[test]
    fn looping_chains_end() {
        let mut disk = MemDisk::new()
            .with_sector(0, record(&[(0, 0x0f, 1000, 9000)]))
            .with_sector(1000, record(&[(0, 0x05, 0, 1000)]));
        // The link is skipped because its start is zero, so the chain ends without the partition.
        assert!(matches!(
            activate_mbr_partition(&mut disk, 4),
            Err(MbrError::PartitionNotFound(4))
        ));

        let mut disk = MemDisk::new()
            .with_sector(0, record(&[(0, 0x0f, 1000, 9000)]))
            .with_sector(1000, record(&[(0, 0x05, 1000, 1000)]))
            .with_sector(2000, record(&[(0, 0x05, 1000, 1000)]));
        assert!(matches!(activate_mbr_partition(&mut disk, 4), Err(MbrError::ChainTooLong)));
    }

    proptest! {
        #[test]
        fn only_the_target_primary_is_active(index in 0usize..4, active in 0usize..4) {
            let mut entries = [(0u8, 0x07u8, 63u32, 100u32); 4];
            entries[active].0 = 0x80;
            let mut disk = MemDisk::new().with_sector(0, record(&entries));
            activate_mbr_partition(&mut disk, index).unwrap();

            let flags = flags(&mut disk.sector(0));
            for (i, flag) in flags.into_iter().enumerate() {
                prop_assert_eq!(flag, if i == index { 0x80 } else { 0 });
            }
        }

        #[test]
        fn logical_activation_touches_only_its_path(
            (m, j) in (1usize..12).prop_flat_map(|m| (Just(m), 0..m)),
            ext_slot in 0usize..4,
            fill in any::<u8>(),
        ) {
            let ext_base = 1000u32;

            let mut primaries = [(0u8, 0x83u8, 0u32, 0u32); 4];
            for (i, entry) in primaries.iter_mut().enumerate() {
                *entry = (0, 0x83, 63 + u32::try_from(i).unwrap() * 200, 100);
            }
            primaries[ext_slot] = (0, 0x0f, ext_base, 100_000);

            // EBR k sits at `ext_base + 100 * k` and links to EBR k + 1.
            let ebr_lba = |k: usize| u64::from(ext_base) + 100 * u64::try_from(k).unwrap();
            let mut disk = MemDisk::new().with_sector(0, record(&primaries));
            for k in 0..m {
                let mut entries = vec![(0u8, 0x83u8, 63u32, 50u32)];
                if k + 1 < m {
                    entries.push((0, 0x05, 100 * u32::try_from(k + 1).unwrap(), 100));
                }
                let mut sector = record(&entries);
                sector[1..BOOT_CODE_SIZE].fill(fill);
                disk = disk.with_sector(ebr_lba(k), sector);
            }
            let before = disk.sectors.clone();

            activate_mbr_partition(&mut disk, 4 + j).unwrap();

            // (lba, slot) of every flag allowed to change, with its expected value.
            let mut allowed = vec![(0u64, ext_slot)];
            allowed.extend((0..j).map(|k| (ebr_lba(k), 1)));
            allowed.push((ebr_lba(j), 0));

            prop_assert_eq!(
                disk.sectors.keys().collect::<Vec<_>>(),
                before.keys().collect::<Vec<_>>()
            );
            for (lba, old) in &before {
                let new = disk.sector(*lba);
                for (offset, (&a, &b)) in old.iter().zip(new.iter()).enumerate() {
                    let flag_of = allowed.iter().find(|(x, slot)| {
                        x == lba && offset == TABLE_OFFSET + slot * size_of::<MbrEntry>()
                    });
                    match flag_of {
                        Some(_) => prop_assert_eq!(b, ACTIVE),
                        None => prop_assert_eq!(a, b, "LBA {} offset {} changed", lba, offset),
                    }
                }
            }
        }
    }
}
