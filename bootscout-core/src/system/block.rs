// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Raw sector access.
//!
//! Legacy boot support has to look at, and sometimes rewrite, the partition table in the first sector of a disk.
//! [`SectorDevice`] is the small seam for that, implemented over [`BlockIO`] by [`UefiBlockDevice`].

use alloc::vec;

use thiserror::Error;
use uefi::{
    Handle, Status,
    boot::{self, OpenProtocolAttributes, OpenProtocolParams, ScopedProtocol},
    proto::media::block::{BlockIO, Lba},
};

#[cfg(test)]
pub(crate) mod memdisk;

/// The size of an MBR style sector. Disks with larger logical blocks expose the MBR in the first 512 bytes.
pub const SECTOR_SIZE: usize = 512;

/// A single sector.
pub type Sector = [u8; SECTOR_SIZE];

/// An `Error` that may result from accessing raw sectors.
#[derive(Error, Debug)]
pub enum BlockError {
    /// The device has no media inserted.
    #[error("No media present")]
    NoMedia,

    /// A sector could not be read.
    #[error("Failed to read LBA {lba}: {status}")]
    Read {
        /// The block that was being read.
        lba: u64,

        /// The status returned by the firmware.
        status: Status,
    },

    /// A sector could not be written.
    #[error("Failed to write LBA {lba}: {status}")]
    Write {
        /// The block that was being written.
        lba: u64,

        /// The status returned by the firmware.
        status: Status,
    },

    /// The device reports a block size smaller than one sector.
    #[error("Unsupported block size {0}")]
    BlockSize(u32),
}

/// A device that can read and write 512 byte sectors addressed by logical block.
pub trait SectorDevice {
    /// Reads the first 512 bytes of a logical block.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the block could not be read.
    fn read_sector(&mut self, lba: u64) -> Result<Sector, BlockError>;

    /// Replaces the first 512 bytes of a logical block.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the block could not be read back or written.
    fn write_sector(&mut self, lba: u64, sector: &Sector) -> Result<(), BlockError>;
}

/// A [`SectorDevice`] backed by the UEFI [`BlockIO`] protocol.
pub struct UefiBlockDevice(ScopedProtocol<BlockIO>);

impl UefiBlockDevice {
    /// Opens [`BlockIO`] on a handle without disconnecting the drivers already bound to it.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the handle does not support [`BlockIO`].
    pub fn open(handle: Handle) -> uefi::Result<Self> {
        // SAFETY: the protocol is only used while the handle stays valid, and filesystem drivers layered on top of
        // the block device keep working because the protocol is not opened exclusively.
        let io = unsafe {
            boot::open_protocol::<BlockIO>(
                OpenProtocolParams {
                    handle,
                    agent: boot::image_handle(),
                    controller: None,
                },
                OpenProtocolAttributes::GetProtocol,
            )?
        };
        Ok(Self(io))
    }

    /// Checks that media is present and returns the media id and block size.
    fn media(&self) -> Result<(u32, usize), BlockError> {
        let media = self.0.media();
        if !media.is_media_present() {
            return Err(BlockError::NoMedia);
        }
        let block_size = media.block_size();
        let size = usize::try_from(block_size).unwrap_or(0);
        if size < SECTOR_SIZE {
            return Err(BlockError::BlockSize(block_size));
        }
        Ok((media.media_id(), size))
    }
}

impl SectorDevice for UefiBlockDevice {
    fn read_sector(&mut self, lba: u64) -> Result<Sector, BlockError> {
        let (media_id, block_size) = self.media()?;
        let mut block = vec![0; block_size];
        self.0
            .read_blocks(media_id, Lba::from(lba), &mut block)
            .map_err(|e| BlockError::Read {
                lba,
                status: e.status(),
            })?;

        let mut sector = [0; SECTOR_SIZE];
        sector.copy_from_slice(&block[..SECTOR_SIZE]);
        Ok(sector)
    }

    fn write_sector(&mut self, lba: u64, sector: &Sector) -> Result<(), BlockError> {
        let (media_id, block_size) = self.media()?;

        // keep whatever follows the first 512 bytes of a larger block intact
        let mut block = vec![0; block_size];
        self.0
            .read_blocks(media_id, Lba::from(lba), &mut block)
            .map_err(|e| BlockError::Read {
                lba,
                status: e.status(),
            })?;
        block[..SECTOR_SIZE].copy_from_slice(sector);

        self.0
            .write_blocks(media_id, Lba::from(lba), &block)
            .map_err(|e| BlockError::Write {
                lba,
                status: e.status(),
            })?;
        let _ = self.0.flush_blocks();
        Ok(())
    }
}
