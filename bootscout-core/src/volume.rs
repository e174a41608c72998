// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Volumes visible to the boot manager.
//!
//! A [`Volume`] is anything that carries a block device or a filesystem: whole disks, partitions, optical media and
//! network devices. Volumes are shared as [`Rc<Volume>`] between the catalog and every target found on them, and the
//! catalog is rebuilt wholesale on every rescan.

use alloc::{boxed::Box, format, rc::Rc, string::String, vec::Vec};
use core::cell::Cell;

use log::{debug, warn};
use uefi::{Guid, Handle};

use crate::{
    system::{block::SectorDevice, device_path, fs::VolumeFs},
    volume::bootcode::BootCode,
};

pub mod bootcode;
pub mod catalog;

#[cfg(test)]
pub(crate) mod memcatalog;

/// A catalog local identifier of a volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VolumeId(pub u32);

/// How a volume is attached to the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeKind {
    /// A fixed disk.
    Internal,

    /// A removable or USB disk.
    External,

    /// A CD, DVD or other optical disc.
    Optical,

    /// A network device.
    Network,
}

impl VolumeKind {
    /// The icon name of the badge drawn over targets on volumes of this kind.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn badge(self) -> &'static str {
        match self {
            Self::Internal => "vol_internal",
            Self::External => "vol_external",
            Self::Optical => "vol_optical",
            Self::Network => "vol_net",
        }
    }

    /// A human readable name.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Optical => "optical",
            Self::Network => "network",
        }
    }
}

/// A volume.
#[derive(Debug)]
pub struct Volume {
    /// The identifier of the volume within its catalog.
    pub id: VolumeId,

    /// How the volume is attached.
    pub kind: VolumeKind,

    /// The firmware handle of the volume, if it came from firmware.
    pub handle: Option<Handle>,

    /// The device path of the volume.
    pub device_path: Vec<u8>,

    /// Whether the volume carries a readable filesystem.
    pub has_fs: bool,

    /// The filesystem label.
    pub fs_name: Option<String>,

    /// The GPT partition name.
    pub part_name: Option<String>,

    /// The unique partition GUID.
    pub part_guid: Option<Guid>,

    /// Whether this volume is a whole disk rather than a partition.
    pub is_whole_disk: bool,

    /// The whole disk that contains this partition.
    pub whole_disk: Option<VolumeId>,

    /// The device path of the whole disk that contains this volume.
    pub whole_disk_path: Option<Vec<u8>>,

    /// The zero based index of this partition in an MBR partition table.
    pub mbr_index: Option<usize>,

    /// Whether this is an APFS pre-boot volume.
    pub is_preboot: bool,

    /// The observed boot code, cached for the lifetime of the catalog.
    boot_code: Cell<Option<BootCode>>,
}

impl Volume {
    /// Creates a [`Volume`] with nothing but an identifier and a kind.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(id: VolumeId, kind: VolumeKind) -> Self {
        Self {
            id,
            kind,
            handle: None,
            device_path: Vec::new(),
            has_fs: false,
            fs_name: None,
            part_name: None,
            part_guid: None,
            is_whole_disk: false,
            whole_disk: None,
            whole_disk_path: None,
            mbr_index: None,
            is_preboot: false,
            boot_code: Cell::new(None),
        }
    }

    /// The name shown for the volume: the filesystem label, else the partition name, else its kind.
    #[must_use = "Has no effect if the result is unused"]
    pub fn display_name(&self) -> String {
        self.fs_name
            .as_deref()
            .or(self.part_name.as_deref())
            .map_or_else(
                || {
                    if self.is_whole_disk {
                        format!("whole {} disk", self.kind.name())
                    } else {
                        format!("{} volume", self.kind.name())
                    }
                },
                String::from,
            )
    }

    /// The unique partition GUID as text.
    #[must_use = "Has no effect if the result is unused"]
    pub fn guid_string(&self) -> Option<String> {
        self.part_guid.map(|x| format!("{x}"))
    }

    /// The device path of the volume as text.
    #[must_use = "Has no effect if the result is unused"]
    pub fn device_path_text(&self) -> Option<String> {
        device_path::path_text(&self.device_path)
    }

    /// The name that hides the volume from legacy scans: the filesystem label, else the partition name, else the
    /// device path text.
    #[must_use = "Has no effect if the result is unused"]
    pub fn hide_name(&self) -> Option<String> {
        self.fs_name
            .clone()
            .or_else(|| self.part_name.clone())
            .or_else(|| self.device_path_text())
    }

    /// Checks a description against the filesystem name, partition name, unique GUID and device path text of the
    /// volume.
    #[must_use = "Has no effect if the result is unused"]
    pub fn matches_description(&self, description: &str) -> bool {
        let matches = |x: Option<&str>| x.is_some_and(|x| x.eq_ignore_ascii_case(description));
        matches(self.fs_name.as_deref())
            || matches(self.part_name.as_deref())
            || matches(self.guid_string().as_deref())
            || matches(self.device_path_text().as_deref())
    }

    /// The tag that identifies the volume in `volume:path` references.
    #[must_use = "Has no effect if the result is unused"]
    pub fn tag(&self) -> String {
        self.guid_string()
            .or_else(|| self.fs_name.clone())
            .or_else(|| self.part_name.clone())
            .unwrap_or_else(|| format!("{}", self.id.0))
    }

    /// The cached boot code observation, if the boot sector was already read.
    #[must_use = "Has no effect if the result is unused"]
    pub fn cached_boot_code(&self) -> Option<BootCode> {
        self.boot_code.get()
    }

    /// Records a boot code observation.
    pub fn cache_boot_code(&self, code: BootCode) {
        self.boot_code.set(Some(code));
    }
}

/// Where the running boot manager was loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelfLocation {
    /// The volume holding the boot manager.
    pub volume: VolumeId,

    /// The directory of the boot manager binary.
    pub dir: String,

    /// The path of the boot manager binary.
    pub path: String,
}

/// The set of visible volumes, and access to their contents.
pub trait VolumeCatalog {
    /// Every visible volume.
    fn volumes(&self) -> &[Rc<Volume>];

    /// Opens the filesystem of a volume.
    fn open_fs(&self, volume: &Volume) -> Option<Box<dyn VolumeFs>>;

    /// Opens the raw sectors of a volume.
    fn open_disk(&self, volume: &Volume) -> Option<Box<dyn SectorDevice>>;

    /// Where the running boot manager was loaded from.
    fn self_location(&self) -> Option<&SelfLocation>;

    /// Finds a volume by identifier.
    fn volume(&self, id: VolumeId) -> Option<&Rc<Volume>> {
        self.volumes().iter().find(|x| x.id == id)
    }

    /// The volume the boot manager was loaded from.
    fn self_volume(&self) -> Option<&Rc<Volume>> {
        self.self_location().and_then(|x| self.volume(x.volume))
    }

    /// Reads the boot sector of a volume once, and caches what it says.
    ///
    /// A volume whose boot sector cannot be read is recorded as having no boot code.
    fn boot_code(&self, volume: &Volume) -> BootCode {
        if let Some(code) = volume.cached_boot_code() {
            return code;
        }

        let code = match self.open_disk(volume).map(|mut x| x.read_sector(0)) {
            Some(Ok(sector)) => bootcode::detect(&sector),
            Some(Err(e)) => {
                warn!("Could not read the boot sector of {}: {e}", volume.display_name());
                BootCode::default()
            }
            None => BootCode::default(),
        };

        debug!("Boot code on {}: {code:?}", volume.display_name());
        volume.cache_boot_code(code);
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        system::block::memdisk::MemDisk, target::OsFamily, volume::memcatalog::MemCatalog,
    };

    #[test]
    fn display_name_falls_back() {
        let mut volume = Volume::new(VolumeId(1), VolumeKind::External);
        assert_eq!(volume.display_name(), "external volume");
        volume.part_name = Some("Basic data partition".into());
        assert_eq!(volume.display_name(), "Basic data partition");
        volume.fs_name = Some("ESP".into());
        assert_eq!(volume.display_name(), "ESP");
    }

    #[test]
    fn matches_any_description() {
        let mut volume = Volume::new(VolumeId(1), VolumeKind::Internal);
        volume.fs_name = Some("Recovery HD".into());
        volume.part_guid = Some(uefi::guid!("2b0585eb-d8b8-49a9-8b8c-e21b01aef2b7"));
        assert!(volume.matches_description("recovery hd"));
        assert!(volume.matches_description("2B0585EB-D8B8-49A9-8B8C-E21B01AEF2B7"));
        assert!(!volume.matches_description("Recovery"));
    }

    #[test]
    fn unnamed_volumes_hide_by_device_path() {
        let mut volume = Volume::new(VolumeId(1), VolumeKind::Internal);
        assert_eq!(volume.hide_name(), None);

        volume.device_path = device_path::build_path(
            core::iter::empty::<&uefi::proto::device_path::DevicePathNode>(),
            &[&uefi::proto::device_path::build::hardware::Pci {
                function: 0,
                device: 0x1f,
            }],
        )
        .unwrap();
        let name = volume.hide_name().unwrap();
        assert_eq!(name, "01.01-001f");
        assert!(volume.matches_description(&name));

        volume.part_name = Some("Basic data partition".into());
        assert_eq!(volume.hide_name().as_deref(), Some("Basic data partition"));
        assert!(volume.matches_description(&name));
    }

    #[test]
    fn boot_code_is_read_once() {
        let mut sector = [0; 512];
        sector[0] = 0xfa;
        sector[0x100..0x105].copy_from_slice(b"NTLDR");
        sector[510] = 0x55;
        sector[511] = 0xaa;

        let mut catalog = MemCatalog::new();
        let id = catalog.add_disk(
            Volume::new(VolumeId(0), VolumeKind::Internal),
            MemDisk::new().with_sector(0, sector),
        );
        let volume = catalog.volume(id).unwrap().clone();

        let code = catalog.boot_code(&volume);
        assert!(code.present);
        assert_eq!(code.os, Some(OsFamily::Windows));
        assert_eq!(catalog.disk_opens(), 1);

        let _ = catalog.boot_code(&volume);
        assert_eq!(catalog.disk_opens(), 1);
    }
}
