// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! An in-memory [`SectorDevice`] for host side tests.

use std::collections::BTreeMap;

use uefi::Status;

use super::{BlockError, Sector, SectorDevice, SECTOR_SIZE};

/// A sparse disk. Sectors that were never written read back as zeroes.
#[derive(Clone, Debug, Default)]
pub(crate) struct MemDisk {
    /// The sectors that hold data.
    pub(crate) sectors: BTreeMap<u64, Sector>,

    /// Every LBA written, in order.
    pub(crate) writes: Vec<u64>,

    /// Writes to this LBA fail.
    pub(crate) fail_write_at: Option<u64>,
}

impl MemDisk {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_sector(mut self, lba: u64, sector: Sector) -> Self {
        self.sectors.insert(lba, sector);
        self
    }

    pub(crate) fn sector(&self, lba: u64) -> Sector {
        self.sectors.get(&lba).copied().unwrap_or([0; SECTOR_SIZE])
    }
}

impl SectorDevice for MemDisk {
    fn read_sector(&mut self, lba: u64) -> Result<Sector, BlockError> {
        Ok(self.sector(lba))
    }

    fn write_sector(&mut self, lba: u64, sector: &Sector) -> Result<(), BlockError> {
        if self.fail_write_at == Some(lba) {
            return Err(BlockError::Write {
                lba,
                status: Status::WRITE_PROTECTED,
            });
        }
        self.writes.push(lba);
        self.sectors.insert(lba, *sector);
        Ok(())
    }
}
