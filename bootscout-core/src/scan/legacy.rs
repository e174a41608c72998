// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Legacy (BIOS) boot discovery.
//!
//! There are two ways of starting a legacy OS. Apple firmware loads a legacy loader from its firmware volume, which
//! then starts whatever the active MBR partition holds ([`LegacyMode::Classic`]). PC firmware with a compatibility
//! support module lists legacy devices as boot options and starts them through the legacy BIOS protocol
//! ([`LegacyMode::Uefi`]).

use alloc::{format, vec::Vec};

use log::{debug, trace};
use uefi::boot::{self, SearchType};

use crate::{
    scan::ScanSession,
    system::{protos::LegacyBios, variable::VariableStore},
    target::{DiscoveredTarget, LegacyBoot, OsFamily, TargetKind, builder::TargetBuilder},
    volume::{Volume, VolumeCatalog, VolumeKind},
};

pub mod bbs;
pub mod hints;
pub mod mbr;

/// The legacy boot method offered by the firmware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LegacyMode {
    /// Legacy boot is not available.
    #[default]
    None,

    /// Apple style legacy boot through the firmware volume loader.
    Classic,

    /// Legacy boot through the legacy BIOS protocol.
    Uefi,
}

impl LegacyMode {
    /// Detects the legacy boot method of the running firmware.
    #[must_use = "Has no effect if the result is unused"]
    pub fn detect() -> Self {
        if boot::locate_handle_buffer(SearchType::from_proto::<LegacyBios>()).is_ok_and(|x| !x.is_empty()) {
            return Self::Uefi;
        }

        let vendor = format!("{}", uefi::system::firmware_vendor());
        if vendor.contains("Apple") {
            return Self::Classic;
        }

        debug!("No legacy boot support in firmware from {vendor}");
        Self::None
    }
}

/// Offers the legacy boot targets whose device counts as `kind`, using the legacy method of the pass.
pub fn scan_legacy(
    session: &ScanSession,
    catalog: &dyn VolumeCatalog,
    vars: &dyn VariableStore,
    kind: VolumeKind,
) -> Vec<DiscoveredTarget> {
    match session.legacy_mode {
        LegacyMode::None => Vec::new(),
        LegacyMode::Classic => scan_classic(session, catalog, kind),
        LegacyMode::Uefi => bbs::scan_bbs(vars, &session.policy, kind),
    }
}

/// Checks if another volume on the same disk carries boot code, in which case the whole disk is not offered.
fn partition_has_boot_code(catalog: &dyn VolumeCatalog, disk: &Volume) -> bool {
    catalog
        .volumes()
        .iter()
        .filter(|x| x.whole_disk == Some(disk.id))
        .any(|x| catalog.boot_code(x).present)
}

/// Offers volumes with legacy boot code.
///
/// A whole disk is only offered when none of its partitions has boot code. Without a deep scan, a whole disk whose
/// MBR only protects a GPT is not offered either.
pub fn scan_classic(session: &ScanSession, catalog: &dyn VolumeCatalog, kind: VolumeKind) -> Vec<DiscoveredTarget> {
    let filter = session.filter();
    let mut targets = Vec::new();

    for volume in catalog.volumes().iter().filter(|x| x.kind == kind) {
        if !filter.should_scan_volume(volume) {
            trace!("Skipping legacy scan of {}", volume.display_name());
            continue;
        }

        let code = catalog.boot_code(volume);
        if !code.present {
            continue;
        }

        if volume.is_whole_disk {
            if code.protective_mbr && !session.policy.deep_legacy_scan {
                trace!("{} has a protective MBR", volume.display_name());
                continue;
            }
            if partition_has_boot_code(catalog, volume) {
                continue;
            }
        }

        let os = code.os.unwrap_or(OsFamily::Unknown);
        let name = code.os.map_or("Legacy OS", OsFamily::name);
        let target = TargetBuilder::new(
            format!("Boot {name} from {}", volume.display_name()),
            TargetKind::Legacy(LegacyBoot::Classic),
        )
        .volume(volume.clone())
        .os(os)
        .icon_hints(os.icon_names().iter().copied())
        .icon_hint("legacy")
        .badge(volume.kind.badge())
        .build();
        targets.push(target);
    }

    targets
}
