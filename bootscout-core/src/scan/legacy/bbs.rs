// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Legacy boot records on PC firmware.
//!
//! Firmware with a compatibility support module lists its legacy devices as `Boot####` options whose device path is
//! a single BIOS boot specification node. The node names the device type and carries a status word and a label.

use alloc::{format, string::String, vec::Vec};

use bitflags::bitflags;
use log::trace;
use uefi::proto::device_path::DevicePathNodeEnum;

use crate::{
    policy::ScanPolicy,
    scan::firmware::boot_order_options,
    system::{
        device_path::first_node,
        variable::VariableStore,
    },
    target::{DiscoveredTarget, LegacyBoot, OsFamily, TargetKind, builder::TargetBuilder},
    volume::VolumeKind,
};

/// A floppy drive.
pub const BBS_FLOPPY: u16 = 0x01;

/// A hard disk.
pub const BBS_HARDDISK: u16 = 0x02;

/// A CD-ROM drive.
pub const BBS_CDROM: u16 = 0x03;

/// A PCMCIA device.
pub const BBS_PCMCIA: u16 = 0x04;

/// A USB device.
pub const BBS_USB: u16 = 0x05;

/// An embedded network controller.
pub const BBS_EMBEDDED_NETWORK: u16 = 0x06;

bitflags! {
    /// The status word of a BBS node.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BbsStatus: u16 {
        /// The device is enabled.
        const ENABLED = 1 << 8;

        /// Booting from the device failed before.
        const FAILED = 1 << 9;

        /// Media is present, but it is not known to be bootable.
        const MEDIA_PRESENT_UNKNOWN = 1 << 10;

        /// Media is present and bootable.
        const MEDIA_BOOTABLE = 1 << 11;
    }
}

/// A parsed BBS device path node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BbsNode {
    /// The device type.
    pub device_type: u16,

    /// The status word.
    pub status: BbsStatus,

    /// The label of the device.
    pub description: String,
}

impl BbsNode {
    /// Parses the first node of a device path, if it is a BBS node.
    #[must_use = "Has no effect if the result is unused"]
    pub fn parse(device_path: &[u8]) -> Option<Self> {
        let DevicePathNodeEnum::BiosBootSpecBootSpecification(node) = first_node(device_path)? else {
            return None;
        };
        let text = node.description_string();
        let end = text.iter().position(|&x| x == 0).unwrap_or(text.len());

        Some(Self {
            device_type: node.device_type(),
            status: BbsStatus::from_bits_retain(node.status_flag()),
            description: text[..end].iter().map(|&x| char::from(x)).collect(),
        })
    }

    /// The kind of volume the device counts as. Hard disks without media are taken to be removable drives.
    #[must_use = "Has no effect if the result is unused"]
    pub fn volume_kind(&self) -> Option<VolumeKind> {
        match self.device_type {
            BBS_HARDDISK
                if !self
                    .status
                    .intersects(BbsStatus::MEDIA_PRESENT_UNKNOWN | BbsStatus::MEDIA_BOOTABLE) =>
            {
                Some(VolumeKind::External)
            }
            BBS_HARDDISK => Some(VolumeKind::Internal),
            BBS_CDROM => Some(VolumeKind::Optical),
            BBS_USB => Some(VolumeKind::External),
            _ => None,
        }
    }
}

/// Offers the legacy boot records of the firmware whose device counts as `kind`.
///
/// Records whose label contains an entry of `dont_scan_volumes` are left out.
pub fn scan_bbs(vars: &dyn VariableStore, policy: &ScanPolicy, kind: VolumeKind) -> Vec<DiscoveredTarget> {
    let mut targets = Vec::new();
    for (num, option) in boot_order_options(vars) {
        let Some(node) = BbsNode::parse(&option.device_path) else {
            continue;
        };
        if node.volume_kind() != Some(kind) {
            continue;
        }
        if policy.dont_scan_volumes.any_within(&option.description) {
            trace!("Legacy record {} is excluded", option.description);
            continue;
        }

        let target = TargetBuilder::new(
            format!("Boot legacy target {}", option.description),
            TargetKind::Legacy(LegacyBoot::Bbs {
                boot_num: num,
                device_path: option.device_path.clone(),
                description: option.description.clone(),
            }),
        )
        .os(OsFamily::Unknown)
        .icon_hint("legacy")
        .badge(kind.badge())
        .build();
        targets.push(target);
    }
    targets
}

#[cfg(test)]
mod tests {
    use alloc::borrow::ToOwned;

    use uefi::{
        proto::device_path::{DevicePathNode, build},
        runtime::VariableVendor,
    };

    use super::*;
    use crate::{
        policy::tags::TagList,
        scan::firmware::{LOAD_OPTION_ACTIVE, LoadOption, boot_option_name},
        system::{
            device_path::{END_NODE, build_path},
            variable::memstore::MemVariableStore,
        },
    };

    fn bbs_path(device_type: u16, status: BbsStatus, label: &str) -> Vec<u8> {
        let mut description_string = label.as_bytes().to_vec();
        description_string.push(0);
        build_path(
            core::iter::empty::<&DevicePathNode>(),
            &[&build::bios_boot_spec::BootSpecification {
                device_type,
                status_flag: status.bits(),
                description_string: &description_string,
            }],
        )
        .unwrap()
    }

    fn store(paths: &[(&str, Vec<u8>)]) -> MemVariableStore {
        let mut store = MemVariableStore::new();
        let mut order = Vec::new();
        for (num, (label, path)) in (0u16..).zip(paths) {
            let option = LoadOption {
                attributes: LOAD_OPTION_ACTIVE,
                description: (*label).to_owned(),
                device_path: path.clone(),
                optional_data: Vec::new(),
            };
            store = store.with(
                &boot_option_name(num),
                &VariableVendor::GLOBAL_VARIABLE,
                &option.to_bytes().unwrap(),
            );
            order.extend_from_slice(&num.to_le_bytes());
        }
        store.with("BootOrder", &VariableVendor::GLOBAL_VARIABLE, &order)
    }

    #[test]
    fn parses_nodes() {
        let path = bbs_path(BBS_CDROM, BbsStatus::ENABLED, "SATA DVD");
        let node = BbsNode::parse(&path).unwrap();
        assert_eq!(node.device_type, BBS_CDROM);
        assert_eq!(node.description, "SATA DVD");
        assert!(BbsNode::parse(&END_NODE).is_none());
    }

    #[test]
    fn classifies_devices() {
        let present = BbsStatus::MEDIA_BOOTABLE;
        let kind = |t, s| BbsNode::parse(&bbs_path(t, s, "x")).unwrap().volume_kind();
        assert_eq!(kind(BBS_HARDDISK, present), Some(VolumeKind::Internal));
        assert_eq!(kind(BBS_HARDDISK, BbsStatus::ENABLED), Some(VolumeKind::External));
        assert_eq!(kind(BBS_CDROM, present), Some(VolumeKind::Optical));
        assert_eq!(kind(BBS_USB, present), Some(VolumeKind::External));
        assert_eq!(kind(BBS_EMBEDDED_NETWORK, present), None);
    }

    #[test]
    fn scans_records_of_one_kind() {
        let vars = store(&[
            ("Hard Disk", bbs_path(BBS_HARDDISK, BbsStatus::MEDIA_BOOTABLE, "WDC")),
            ("CD/DVD", bbs_path(BBS_CDROM, BbsStatus::MEDIA_BOOTABLE, "DVD")),
            ("Recovery Disk", bbs_path(BBS_HARDDISK, BbsStatus::MEDIA_BOOTABLE, "SSD")),
            ("ubuntu", END_NODE.to_vec()),
        ]);
        let policy = ScanPolicy {
            dont_scan_volumes: TagList::parse("recovery"),
            ..ScanPolicy::default()
        };

        let internal = scan_bbs(&vars, &policy, VolumeKind::Internal);
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].title, "Boot legacy target Hard Disk");
        assert!(matches!(
            &internal[0].kind,
            TargetKind::Legacy(LegacyBoot::Bbs { boot_num: 0, .. })
        ));

        let optical = scan_bbs(&vars, &policy, VolumeKind::Optical);
        assert_eq!(optical.len(), 1);
        assert_eq!(optical[0].badge, Some("vol_optical"));
    }
}
