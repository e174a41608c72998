// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Discovered targets.
//!
//! A [`DiscoveredTarget`] is one selectable menu entry. Everything the scanners find is expressed as one: an EFI
//! loader on a volume, a boot option recorded by the firmware, a legacy boot record, or a built-in action. The
//! [`builder::TargetBuilder`] is the usual way to construct one.

use alloc::{format, rc::Rc, string::String, vec::Vec};

use crate::{
    boot::action::BootAction,
    policy::{GraphicsFor, hidden::HiddenList},
    volume::Volume,
};

pub mod builder;

/// The family of operating system a target is believed to start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OsFamily {
    /// A Linux kernel started through its EFI stub.
    Linux,

    /// Another boot manager.
    BootManager,

    /// macOS.
    MacOs,

    /// The Apple Hardware Test.
    HwTest,

    /// The ELILO loader.
    Elilo,

    /// The GRUB loader.
    Grub,

    /// Windows.
    Windows,

    /// The XOM Windows loader for Macs.
    Xom,

    /// A network boot loader.
    Network,

    /// FreeBSD.
    FreeBsd,

    /// Anything else.
    #[default]
    Unknown,
}

impl OsFamily {
    /// The keyboard shortcut that selects targets of this family.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn shortcut(self) -> Option<char> {
        match self {
            Self::Linux => Some('L'),
            Self::BootManager => Some('R'),
            Self::MacOs => Some('M'),
            Self::Elilo => Some('E'),
            Self::Grub => Some('G'),
            Self::Windows => Some('W'),
            Self::Xom => Some('X'),
            Self::Network => Some('N'),
            Self::FreeBsd => Some('B'),
            Self::HwTest | Self::Unknown => None,
        }
    }

    /// Icon names for this family, most specific first.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn icon_names(self) -> &'static [&'static str] {
        match self {
            Self::Linux => &["linux"],
            Self::BootManager => &["refind"],
            Self::MacOs => &["mac"],
            Self::HwTest => &["hwtest"],
            Self::Elilo => &["elilo", "linux"],
            Self::Grub => &["grub", "linux"],
            Self::Windows => &["win8", "win"],
            Self::Xom => &["xom", "win", "win8"],
            Self::Network => &["network"],
            Self::FreeBsd => &["freebsd"],
            Self::Unknown => &["unknown"],
        }
    }

    /// The `graphics_for` flag that covers this family, if any.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn graphics_flag(self) -> Option<GraphicsFor> {
        match self {
            Self::MacOs => Some(GraphicsFor::OSX),
            Self::Linux => Some(GraphicsFor::LINUX),
            Self::Elilo => Some(GraphicsFor::ELILO),
            Self::Grub => Some(GraphicsFor::GRUB),
            Self::Windows | Self::Xom => Some(GraphicsFor::WINDOWS),
            _ => None,
        }
    }

    /// A human readable name.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::BootManager => "boot manager",
            Self::MacOs => "macOS",
            Self::HwTest => "Apple Hardware Test",
            Self::Elilo => "ELILO",
            Self::Grub => "GRUB",
            Self::Windows => "Windows",
            Self::Xom => "XOM",
            Self::Network => "network boot",
            Self::FreeBsd => "FreeBSD",
            Self::Unknown => "unknown OS",
        }
    }
}

/// How a legacy target is started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LegacyBoot {
    /// Apple style: activate the partition and chain to the firmware's legacy loader.
    Classic,

    /// Through the legacy BIOS protocol, with a BBS boot option recorded by the firmware.
    Bbs {
        /// The number of the `Boot####` option.
        boot_num: u16,

        /// The BBS device path of the option.
        device_path: Vec<u8>,

        /// The description of the option.
        description: String,
    },
}

/// What kind of target this is, and what is needed to start it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetKind {
    /// An EFI executable on a volume.
    Loader,

    /// A boot option recorded by the firmware, started by rebooting into it.
    Firmware {
        /// The number of the `Boot####` option.
        boot_num: u16,

        /// The device path of the option.
        device_path: Vec<u8>,

        /// The description of the option.
        description: String,
    },

    /// A legacy boot record.
    Legacy(LegacyBoot),

    /// A built-in action.
    Action(BootAction),
}

/// The menu row a target belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MenuRow {
    /// Operating systems.
    #[default]
    Main,

    /// Tools and actions.
    Tools,
}

/// An alternative way of starting a target, such as a different kernel or extra options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubEntry {
    /// The title.
    pub title: String,

    /// The load options passed instead of the target's own.
    pub load_options: Option<String>,

    /// The loader started instead of the target's own.
    pub loader_path: Option<String>,

    /// Whether the entry starts in graphics mode.
    pub graphics: bool,
}

/// A selectable menu entry.
#[derive(Clone, Debug)]
pub struct DiscoveredTarget {
    /// The title.
    pub title: String,

    /// What kind of target this is.
    pub kind: TargetKind,

    /// The volume the target lives on.
    pub volume: Option<Rc<Volume>>,

    /// The path of the EFI executable, relative to the root of the volume.
    pub loader_path: Option<String>,

    /// The load options passed to the loader.
    pub load_options: Option<String>,

    /// The OS family.
    pub os: OsFamily,

    /// Icon names, most specific first.
    pub icon_hints: Vec<String>,

    /// The icon name of the badge drawn over the target.
    pub badge: Option<&'static str>,

    /// Whether the target starts in graphics mode.
    pub graphics: bool,

    /// Alternative ways of starting the target.
    pub sub_entries: Vec<SubEntry>,

    /// The menu row.
    pub row: MenuRow,

    /// The letter shortcut.
    pub shortcut_letter: Option<char>,

    /// The digit shortcut, assigned by the menu.
    pub shortcut_digit: Option<char>,
}

impl DiscoveredTarget {
    /// The icon hints joined with commas.
    #[must_use = "Has no effect if the result is unused"]
    pub fn icon_hint_string(&self) -> String {
        self.icon_hints.join(",")
    }

    /// The loader path qualified with the tag of its volume, as used in hidden lists and `dont_scan_files`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn qualified_path(&self) -> Option<String> {
        let path = self.loader_path.as_deref()?;
        Some(match &self.volume {
            Some(volume) => format!("{}:{path}", volume.tag()),
            None => String::from(path),
        })
    }

    /// The hidden list and tag that hide this target, if it can be hidden.
    #[must_use = "Has no effect if the result is unused"]
    pub fn hide_tag(&self) -> Option<(HiddenList, String)> {
        match &self.kind {
            TargetKind::Loader => {
                let list = match self.row {
                    MenuRow::Main => HiddenList::Tags,
                    MenuRow::Tools => HiddenList::Tools,
                };
                Some((list, self.qualified_path()?))
            }
            TargetKind::Firmware { description, .. }
            | TargetKind::Legacy(LegacyBoot::Bbs { description, .. }) => {
                let list = if matches!(self.kind, TargetKind::Firmware { .. }) {
                    HiddenList::Firmware
                } else {
                    HiddenList::Legacy
                };
                Some((list, description.clone()))
            }
            TargetKind::Legacy(LegacyBoot::Classic) => {
                Some((HiddenList::Legacy, self.volume.as_ref()?.hide_name()?))
            }
            TargetKind::Action(_) => None,
        }
    }

    /// Checks if two targets start the same loader on the same volume.
    #[must_use = "Has no effect if the result is unused"]
    pub fn same_loader(&self, other: &Self) -> bool {
        let (Some(a), Some(b)) = (&self.loader_path, &other.loader_path) else {
            return false;
        };
        let same_volume = match (&self.volume, &other.volume) {
            (Some(x), Some(y)) => x.id == y.id,
            (None, None) => true,
            _ => false,
        };
        same_volume
            && matches!(self.kind, TargetKind::Loader)
            && matches!(other.kind, TargetKind::Loader)
            && crate::system::helper::path_eq(a, b)
    }
}

#[cfg(test)]
mod tests {
    use uefi::proto::device_path::{DevicePathNode, build};

    use super::*;
    use crate::{
        policy::{ScanPolicy, tags::TagList},
        scan::filter::PathFilter,
        system::device_path::build_path,
        target::builder::TargetBuilder,
        volume::{VolumeId, VolumeKind},
    };

    fn esp() -> Rc<Volume> {
        let mut volume = Volume::new(VolumeId(3), VolumeKind::Internal);
        volume.fs_name = Some("ESP".into());
        Rc::new(volume)
    }

    #[test]
    fn loader_hide_tags_are_volume_qualified() {
        let target = TargetBuilder::loader("Boot Fedora", esp(), "EFI\\fedora\\grubx64.efi").build();
        assert_eq!(
            target.hide_tag(),
            Some((HiddenList::Tags, "ESP:EFI\\fedora\\grubx64.efi".into()))
        );

        let tool = TargetBuilder::loader("gdisk", esp(), "EFI\\tools\\gdisk.efi")
            .row(MenuRow::Tools)
            .build();
        assert_eq!(tool.hide_tag().map(|x| x.0), Some(HiddenList::Tools));
    }

    #[test]
    fn firmware_and_actions() {
        let target = TargetBuilder::new(
            "Reboot into UEFI PXE",
            TargetKind::Firmware {
                boot_num: 3,
                device_path: Vec::new(),
                description: "UEFI PXE".into(),
            },
        )
        .build();
        assert_eq!(target.hide_tag(), Some((HiddenList::Firmware, "UEFI PXE".into())));

        let action = TargetBuilder::new("Reboot", TargetKind::Action(BootAction::Reboot)).build();
        assert_eq!(action.hide_tag(), None);
    }

    #[test]
    fn classic_hide_tags_match_their_volume() {
        let disk = |fs_name: Option<&str>| {
            let mut volume = Volume::new(VolumeId(5), VolumeKind::Internal);
            volume.is_whole_disk = true;
            volume.fs_name = fs_name.map(Into::into);
            volume.device_path = build_path(
                core::iter::empty::<&DevicePathNode>(),
                &[&build::hardware::Pci {
                    function: 2,
                    device: 0x1f,
                }],
            )
            .unwrap();
            Rc::new(volume)
        };
        let classic = |volume: Rc<Volume>| {
            TargetBuilder::new("Boot Windows", TargetKind::Legacy(LegacyBoot::Classic))
                .volume(volume)
                .build()
        };

        let unnamed = disk(None);
        let (list, tag) = classic(Rc::clone(&unnamed)).hide_tag().unwrap();
        assert_eq!(list, HiddenList::Legacy);
        assert_eq!(tag, "01.01-021f");
        assert!(unnamed.matches_description(&tag));

        let policy = ScanPolicy {
            dont_scan_volumes: TagList::parse(&tag),
            ..ScanPolicy::default()
        };
        assert!(!PathFilter::new(&policy, None).should_scan_volume(&unnamed));

        let named = classic(disk(Some("WINXP")));
        assert_eq!(named.hide_tag().map(|x| x.1).as_deref(), Some("WINXP"));

        let bare = Rc::new(Volume::new(VolumeId(6), VolumeKind::Internal));
        assert_eq!(classic(bare).hide_tag(), None);
    }

    #[test]
    fn same_loader_ignores_case_and_separators() {
        let volume = esp();
        let a = TargetBuilder::loader("a", Rc::clone(&volume), "EFI\\BOOT\\bootx64.efi").build();
        let b = TargetBuilder::loader("b", volume, "efi/boot/BOOTX64.EFI").build();
        let c = TargetBuilder::loader("c", esp(), "EFI\\BOOT\\bootx64.efi").build();
        assert!(a.same_loader(&b));
        assert!(a.same_loader(&c));

        let mut other = Volume::new(VolumeId(4), VolumeKind::External);
        other.fs_name = Some("USB".into());
        let d = TargetBuilder::loader("d", Rc::new(other), "EFI\\BOOT\\bootx64.efi").build();
        assert!(!a.same_loader(&d));
    }
}
