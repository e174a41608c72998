// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Where the legacy loader of Apple firmware may live.
//!
//! Apple firmware ships a legacy BIOS loader as a file in a firmware volume. Its device path is a memory mapped
//! node followed by a firmware volume file node with a fixed GUID. The memory ranges differ between models, so
//! candidate paths are collected from the images the firmware has already loaded, followed by known ranges.

use alloc::vec::Vec;

use log::warn;
use tinyvec::ArrayVec;
use uefi::{
    Guid,
    boot::MemoryType,
    guid,
    proto::device_path::{DevicePathNode, DevicePathNodeEnum, build},
};

use crate::system::device_path::{DevicePathError, build_path, first_node};

/// The name of the legacy loader file in the firmware volume.
pub const LEGACY_LOADER_GUID: Guid = guid!("2b0585eb-d8b8-49a9-8b8c-e21b01aef2b7");

/// The most candidate paths that are tried.
pub const MAX_LEGACY_PATHS: usize = 15;

/// A known memory range of the firmware volume holding the legacy loader.
#[derive(Clone, Copy, Debug)]
pub struct LegacyHint {
    /// The first byte of the range.
    pub start: u64,

    /// The last byte of the range.
    pub end: u64,

    /// Which firmware uses the range.
    pub description: &'static str,
}

/// Known firmware volume ranges, tried after the ones found in loaded images.
pub static HINTS: [LegacyHint; 3] = [
    LegacyHint {
        start: 0xffe0_0000,
        end: 0xfff9_ffff,
        description: "2 MiB firmware flash",
    },
    LegacyHint {
        start: 0xffc0_0000,
        end: 0xfff9_ffff,
        description: "4 MiB firmware flash",
    },
    LegacyHint {
        start: 0xff80_0000,
        end: 0xfff9_ffff,
        description: "8 MiB firmware flash",
    },
];

/// A memory mapped firmware volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FirmwareVolume {
    /// The memory type of the range.
    memory_type: MemoryType,

    /// The first byte of the range.
    start: u64,

    /// The last byte of the range.
    end: u64,
}

impl FirmwareVolume {
    /// Builds the path of the legacy loader file inside this firmware volume.
    fn loader_path(self) -> Result<Vec<u8>, DevicePathError> {
        let guid = LEGACY_LOADER_GUID.to_bytes();
        build_path(
            core::iter::empty::<&DevicePathNode>(),
            &[
                &build::hardware::MemoryMapped {
                    memory_type: self.memory_type,
                    start_address: self.start,
                    end_address: self.end,
                },
                &build::media::PiwgFirmwareFile { data: &guid },
            ],
        )
    }
}

/// The candidate device paths of the legacy loader, in the order they are tried.
#[derive(Clone, Debug, Default)]
pub struct LegacyDevicePathSet(ArrayVec<[Vec<u8>; 16]>);

impl LegacyDevicePathSet {
    /// Collects candidate paths.
    ///
    /// `image_paths` are the device paths of the images the firmware has loaded. The ones that start with a memory
    /// mapped node name a firmware volume, and each distinct node yields a candidate. The known ranges follow.
    #[must_use = "Has no effect if the result is unused"]
    pub fn build<'a>(image_paths: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let loaded = image_paths.into_iter().filter_map(|x| match first_node(x)? {
            DevicePathNodeEnum::HardwareMemoryMapped(node) => Some(FirmwareVolume {
                memory_type: node.memory_type(),
                start: node.start_address(),
                end: node.end_address(),
            }),
            _ => None,
        });
        let hinted = HINTS.iter().map(|x| FirmwareVolume {
            memory_type: MemoryType::MMIO,
            start: x.start,
            end: x.end,
        });

        let mut set = Self::default();
        for volume in loaded.chain(hinted) {
            if set.0.len() == MAX_LEGACY_PATHS {
                break;
            }
            match volume.loader_path() {
                Ok(path) if !set.0.contains(&path) => set.0.push(path),
                Ok(_) => (),
                Err(e) => warn!(
                    "Skipping firmware volume {:#x}-{:#x}: {e}",
                    volume.start, volume.end
                ),
            }
        }
        set
    }

    /// Iterates over the candidate paths.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(Vec::as_slice)
    }

    /// The number of candidate paths.
    #[must_use = "Has no effect if the result is unused"]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if there are no candidate paths.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
