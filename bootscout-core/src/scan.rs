// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Discovery.
//!
//! Every discovery pass runs with one [`ScanSession`]: the policy of the pass, the architecture of the running boot
//! manager, where the boot manager itself lives, and which legacy boot method the firmware offers. The scanners take
//! the session by reference and return the targets they found, so nothing about a pass outlives it.

use crate::{
    policy::ScanPolicy,
    scan::{filter::PathFilter, legacy::LegacyMode},
    system::helper::Arch,
    volume::{SelfLocation, VolumeCatalog},
};

pub mod classify;
pub mod directory;
pub mod duplicate;
pub mod filter;
pub mod firmware;
pub mod legacy;
pub mod loader_list;
pub mod tools;
pub mod validate;

/// The context of one discovery pass.
#[derive(Clone, Debug)]
pub struct ScanSession {
    /// The policy of the pass.
    pub policy: ScanPolicy,

    /// The architecture loaders must be built for.
    pub arch: Arch,

    /// Where the boot manager was loaded from.
    pub self_location: Option<SelfLocation>,

    /// The legacy boot method of the firmware.
    pub legacy_mode: LegacyMode,
}

impl ScanSession {
    /// Creates a [`ScanSession`] for the running architecture.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(policy: ScanPolicy, catalog: &dyn VolumeCatalog, legacy_mode: LegacyMode) -> Self {
        Self {
            policy,
            arch: Arch::current().unwrap_or(Arch::X64),
            self_location: catalog.self_location().cloned(),
            legacy_mode,
        }
    }

    /// The path filter of the pass.
    #[must_use = "Has no effect if the result is unused"]
    pub fn filter(&self) -> PathFilter<'_> {
        PathFilter::new(&self.policy, self.self_location.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{Volume, VolumeId, VolumeKind, memcatalog::MemCatalog};

    #[test]
    fn session_takes_the_self_location() {
        let mut catalog = MemCatalog::new();
        let id = catalog.add(Volume::new(VolumeId(0), VolumeKind::Internal));
        let catalog = catalog.with_self(id, "EFI\\bootscout\\bootscout_x64.efi");

        let session = ScanSession::new(ScanPolicy::default(), &catalog, LegacyMode::None);
        let location = session.self_location.unwrap();
        assert_eq!(location.volume, id);
        assert_eq!(location.dir, "EFI\\bootscout");
    }
}
