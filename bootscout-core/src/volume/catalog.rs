// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`UefiVolumeCatalog`], the [`VolumeCatalog`] built from firmware handles.
//!
//! Every handle that supports [`BlockIO`] becomes a [`Volume`]. Its kind is read off its device path, its names come
//! from the filesystem label and the GPT partition entry, and partitions are linked to the whole disk whose device
//! path is their parent.

use alloc::{boxed::Box, rc::Rc, string::String, vec::Vec};

use log::{debug, warn};
use uefi::{
    Guid, Handle,
    boot::{self, OpenProtocolAttributes, OpenProtocolParams, ScopedProtocol, SearchType},
    proto::{
        ProtocolPointer,
        device_path::{DevicePath, DevicePathNodeEnum},
        loaded_image::LoadedImage,
        media::{block::BlockIO, partition::PartitionInfo},
    },
};

use crate::{
    BootResult,
    system::{
        block::{SectorDevice, UefiBlockDevice},
        device_path::{self, node_enums},
        fs::{self as vfs, UefiFileSystem, VolumeFs},
        helper::dirname,
    },
    volume::{SelfLocation, Volume, VolumeCatalog, VolumeId, VolumeKind},
};

/// The volumes reported by firmware.
pub struct UefiVolumeCatalog {
    /// The volumes, in handle order.
    volumes: Vec<Rc<Volume>>,

    /// Where the boot manager was loaded from.
    self_location: Option<SelfLocation>,
}

impl UefiVolumeCatalog {
    /// Enumerates every block device and builds a [`UefiVolumeCatalog`].
    ///
    /// Handles that cannot be inspected are skipped.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the firmware could not list the block devices.
    pub fn new() -> BootResult<Self> {
        let handles = boot::locate_handle_buffer(SearchType::from_proto::<BlockIO>())?;

        let mut volumes = Vec::with_capacity(handles.len());
        for &handle in handles.iter() {
            let id = VolumeId(u32::try_from(volumes.len()).unwrap_or(u32::MAX));
            match volume_from_handle(handle, id) {
                Some(volume) => volumes.push(volume),
                None => debug!("Skipping a block device that could not be inspected"),
            }
        }

        link_whole_disks(&mut volumes);
        let self_location = locate_self(&volumes);

        Ok(Self {
            volumes: volumes.into_iter().map(Rc::new).collect(),
            self_location,
        })
    }
}

impl VolumeCatalog for UefiVolumeCatalog {
    fn volumes(&self) -> &[Rc<Volume>] {
        &self.volumes
    }

    fn open_fs(&self, volume: &Volume) -> Option<Box<dyn VolumeFs>> {
        if !volume.has_fs {
            return None;
        }
        match UefiFileSystem::from_handle(volume.handle?) {
            Ok(fs) => Some(vfs::boxed(fs)),
            Err(e) => {
                warn!("Could not open the filesystem of {}: {e}", volume.display_name());
                None
            }
        }
    }

    fn open_disk(&self, volume: &Volume) -> Option<Box<dyn SectorDevice>> {
        match UefiBlockDevice::open(volume.handle?) {
            Ok(disk) => Some(Box::new(disk)),
            Err(e) => {
                warn!("Could not open the block device of {}: {e}", volume.display_name());
                None
            }
        }
    }

    fn self_location(&self) -> Option<&SelfLocation> {
        self.self_location.as_ref()
    }
}

/// Decides the kind of a volume from its device path and removable media flag.
#[must_use = "Has no effect if the result is unused"]
pub fn classify_kind(path: &[u8], removable: bool) -> VolumeKind {
    let has = |f: fn(&DevicePathNodeEnum<'_>) -> bool| node_enums(path).any(|x| f(&x));
    if has(|x| matches!(x, DevicePathNodeEnum::MediaCdRom(_))) {
        VolumeKind::Optical
    } else if has(|x| {
        matches!(
            x,
            DevicePathNodeEnum::MessagingMacAddress(_)
                | DevicePathNodeEnum::MessagingIpv4(_)
                | DevicePathNodeEnum::MessagingIpv6(_)
        )
    }) {
        VolumeKind::Network
    } else if removable || has(|x| matches!(x, DevicePathNodeEnum::MessagingUsb(_))) {
        VolumeKind::External
    } else {
        VolumeKind::Internal
    }
}

/// Links every partition to the whole disk volume whose device path is its parent.
fn link_whole_disks(volumes: &mut [Volume]) {
    let disks: Vec<(VolumeId, Vec<u8>)> = volumes
        .iter()
        .filter(|x| x.is_whole_disk)
        .map(|x| (x.id, x.device_path.clone()))
        .collect();

    for volume in volumes.iter_mut() {
        if volume.is_whole_disk {
            volume.whole_disk_path = Some(volume.device_path.clone());
            continue;
        }
        let Some(parent) = device_path::parent(&volume.device_path) else {
            continue;
        };
        if let Some((id, path)) = disks.iter().find(|(_, path)| *path == parent) {
            volume.whole_disk = Some(*id);
            volume.whole_disk_path = Some(path.clone());
        }
    }
}

/// Opens a protocol without exclusive access, for reading properties only.
///
/// # Safety
///
/// The protocol must not be uninstalled while the returned [`ScopedProtocol`] is alive.
unsafe fn get_protocol<P: ProtocolPointer + ?Sized>(handle: Handle) -> Option<ScopedProtocol<P>> {
    // SAFETY: the caller guarantees the protocol stays installed for the lifetime of the scope.
    unsafe {
        boot::open_protocol::<P>(
            OpenProtocolParams {
                handle,
                agent: boot::image_handle(),
                controller: None,
            },
            OpenProtocolAttributes::GetProtocol,
        )
        .ok()
    }
}

/// Builds a [`Volume`] from a handle that supports [`BlockIO`].
fn volume_from_handle(handle: Handle, id: VolumeId) -> Option<Volume> {
    // SAFETY: nothing is uninstalled while the handle is read, and the scopes end with this function.
    let (path_proto, block, partition) = unsafe {
        (
            get_protocol::<DevicePath>(handle)?,
            get_protocol::<BlockIO>(handle)?,
            get_protocol::<PartitionInfo>(handle),
        )
    };

    let media = block.media();
    let device_path = device_path::to_bytes(&path_proto);
    let kind = classify_kind(&device_path, media.is_removable_media());

    let mut volume = Volume::new(id, kind);
    volume.handle = Some(handle);
    volume.is_whole_disk = !media.is_logical_partition();
    volume.mbr_index = device_path::mbr_partition_index(&device_path);
    volume.device_path = device_path;

    if let Some(entry) = partition.as_ref().and_then(|x| x.gpt_partition_entry()) {
        let partition_name = entry.partition_name;
        let name: Vec<u16> = partition_name
            .iter()
            .map(|&x| u16::from(x))
            .take_while(|&x| x != 0)
            .collect();
        volume.part_name = char::decode_utf16(name)
            .collect::<Result<String, _>>()
            .ok()
            .filter(|x| !x.is_empty());
        volume.part_guid = Some(entry.unique_partition_guid).filter(|x| *x != Guid::ZERO);
    }

    if media.is_media_present()
        && let Ok(mut fs) = UefiFileSystem::from_handle(handle)
    {
        volume.has_fs = true;
        volume.fs_name = fs.volume_label();
        volume.is_preboot = volume
            .fs_name
            .as_deref()
            .is_some_and(|x| x.eq_ignore_ascii_case("Preboot"));
    }

    Some(volume)
}

/// Finds the volume and path the boot manager was loaded from.
fn locate_self(volumes: &[Volume]) -> Option<SelfLocation> {
    let image = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle()).ok()?;
    let device = image.device()?;
    let path = device_path::file_path_text(&device_path::to_bytes(image.file_path()?))?;
    let volume = volumes.iter().find(|x| x.handle == Some(device))?;

    Some(SelfLocation {
        volume: volume.id,
        dir: dirname(&path),
        path,
    })
}

#[cfg(test)]
mod tests {
    use uefi::proto::device_path::{
        DevicePathNode,
        build::{self, BuildNode},
        media::{PartitionFormat, PartitionSignature},
    };

    use super::*;
    use crate::system::device_path::build_path;

    fn path(tail: &[&dyn BuildNode]) -> Vec<u8> {
        build_path(core::iter::empty::<&DevicePathNode>(), tail).unwrap()
    }

    const PCI: build::hardware::Pci = build::hardware::Pci {
        function: 0,
        device: 0x17,
    };

    const USB: build::messaging::Usb = build::messaging::Usb {
        parent_port_number: 3,
        interface: 0,
    };

    const CDROM: build::media::CdRom = build::media::CdRom {
        boot_entry: 1,
        partition_start: 0x40,
        partition_size: 0x1000,
    };

    const MAC: build::messaging::MacAddress = build::messaging::MacAddress {
        mac_address: [0x52; 32],
        interface_type: 1,
    };

    fn hard_drive() -> build::media::HardDrive {
        build::media::HardDrive {
            partition_number: 1,
            partition_start: 2048,
            partition_size: 1_048_576,
            partition_signature: PartitionSignature::Guid(uefi::guid!(
                "c12a7328-f81f-11d2-ba4b-00a0c93ec93b"
            )),
            partition_format: PartitionFormat::GPT,
        }
    }

    #[test]
    fn classifies_by_device_path() {
        let hd = hard_drive();

        assert_eq!(classify_kind(&path(&[&PCI, &hd]), false), VolumeKind::Internal);
        assert_eq!(classify_kind(&path(&[&PCI, &hd]), true), VolumeKind::External);
        assert_eq!(classify_kind(&path(&[&PCI, &USB, &hd]), false), VolumeKind::External);
        assert_eq!(classify_kind(&path(&[&PCI, &CDROM]), true), VolumeKind::Optical);
        assert_eq!(classify_kind(&path(&[&PCI, &MAC]), false), VolumeKind::Network);
    }

    #[test]
    fn partitions_link_to_their_disk() {
        let disk_path = path(&[&PCI]);
        let part_path = path(&[&PCI, &hard_drive()]);

        let mut disk = Volume::new(VolumeId(0), VolumeKind::Internal);
        disk.is_whole_disk = true;
        disk.device_path = disk_path.clone();
        let mut part = Volume::new(VolumeId(1), VolumeKind::Internal);
        part.device_path = part_path;

        let mut volumes = [disk, part];
        link_whole_disks(&mut volumes);
        assert_eq!(volumes[1].whole_disk, Some(VolumeId(0)));
        assert_eq!(volumes[1].whole_disk_path.as_deref(), Some(disk_path.as_slice()));
        assert_eq!(volumes[0].whole_disk_path.as_deref(), Some(disk_path.as_slice()));
    }
}
