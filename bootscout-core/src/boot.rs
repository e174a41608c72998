// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootScout`], which ties discovery, the menu and launching together.

use alloc::{boxed::Box, vec::Vec};

use log::{error, info};

use crate::{
    BootResult,
    boot::launch::{ImageServices, LaunchError, Launcher},
    menu::MenuModel,
    policy::{ScanPolicy, config::ScanConfig, hidden},
    scan::{ScanSession, legacy::LegacyMode},
    system::variable::{RuntimeVariableStore, VariableStore},
    target::DiscoveredTarget,
    volume::{VolumeCatalog, catalog::UefiVolumeCatalog},
};

pub mod action;
pub mod launch;

/// The boot manager state: the configuration, the visible volumes and the menu of the last pass.
pub struct BootScout {
    /// The declared configuration.
    config: ScanConfig,

    /// The visible volumes.
    catalog: Box<dyn VolumeCatalog>,

    /// The firmware variables.
    vars: Box<dyn VariableStore>,

    /// The legacy boot method of the firmware.
    legacy_mode: LegacyMode,

    /// Entries supplied by the caller, merged first into every menu.
    manual: Vec<DiscoveredTarget>,

    /// The session of the last pass.
    session: ScanSession,

    /// The menu of the last pass.
    menu: MenuModel,
}

/// Builds the session of one discovery pass and assembles its menu.
fn run_pass(
    config: &ScanConfig,
    catalog: &dyn VolumeCatalog,
    vars: &dyn VariableStore,
    legacy_mode: LegacyMode,
    manual: &[DiscoveredTarget],
) -> (ScanSession, MenuModel) {
    let policy = ScanPolicy::for_pass(config, vars);
    let session = ScanSession::new(policy, catalog, legacy_mode);
    let menu = MenuModel::assemble(config, &session, catalog, vars, manual.to_vec());
    (session, menu)
}

impl BootScout {
    /// Creates a new [`BootScout`] from the firmware, then runs a discovery pass.
    ///
    /// The configuration is read from `\loader\bootscout.conf` on the boot manager's own volume.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the block devices of the firmware could not be listed.
    pub fn new() -> BootResult<Self> {
        let config = ScanConfig::new();
        let catalog = UefiVolumeCatalog::new()?;
        Ok(Self::with_parts(
            config,
            Box::new(catalog),
            Box::new(RuntimeVariableStore),
            LegacyMode::detect(),
        ))
    }

    /// Creates a new [`BootScout`] from its parts, then runs a discovery pass.
    #[must_use = "Has no effect if the result is unused"]
    pub fn with_parts(
        config: ScanConfig,
        catalog: Box<dyn VolumeCatalog>,
        vars: Box<dyn VariableStore>,
        legacy_mode: LegacyMode,
    ) -> Self {
        let manual = Vec::new();
        let (session, menu) = run_pass(&config, catalog.as_ref(), vars.as_ref(), legacy_mode, &manual);
        Self {
            config,
            catalog,
            vars,
            legacy_mode,
            manual,
            session,
            menu,
        }
    }

    /// Runs a new discovery pass and replaces the menu.
    ///
    /// The policy of the pass is rebuilt from the declared configuration and the current hidden lists.
    pub fn rescan(&mut self) {
        let (session, menu) = run_pass(
            &self.config,
            self.catalog.as_ref(),
            self.vars.as_ref(),
            self.legacy_mode,
            &self.manual,
        );
        self.session = session;
        self.menu = menu;
    }

    /// Replaces the visible volumes, such as after media was inserted, then rescans.
    pub fn replace_catalog(&mut self, catalog: Box<dyn VolumeCatalog>) {
        self.catalog = catalog;
        self.rescan();
    }

    /// Sets the entries that are merged first into every menu, then rescans.
    pub fn set_manual_entries(&mut self, entries: Vec<DiscoveredTarget>) {
        self.manual = entries;
        self.rescan();
    }

    /// The declared configuration.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The menu of the last pass.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn menu(&self) -> &MenuModel {
        &self.menu
    }

    /// The targets of the last pass.
    #[must_use = "Has no effect if the result is unused"]
    pub fn list(&self) -> &[DiscoveredTarget] {
        self.menu.targets()
    }

    /// Starts a target of the menu, or one of its sub entries.
    ///
    /// This returns if the target could not be started, or if it returned control.
    ///
    /// # Errors
    ///
    /// May return an `Error` if there is no target at `index`, or if it could not be started.
    pub fn launch<S: ImageServices>(
        &mut self,
        index: usize,
        sub_entry: Option<usize>,
        services: &mut S,
    ) -> BootResult<()> {
        let target = self.menu.get(index).ok_or(LaunchError::NotFound(index))?;
        Launcher::new(&self.session, self.catalog.as_ref(), self.vars.as_mut(), services)
            .launch(target, sub_entry)
            .inspect_err(|e| error!("{e}"))
    }

    /// Hides a target through its hidden list, then rescans. Returns `false` if the target cannot be hidden.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the hidden list could not be stored.
    pub fn hide(&mut self, index: usize) -> BootResult<bool> {
        let Some((list, tag)) = self.menu.get(index).and_then(DiscoveredTarget::hide_tag) else {
            return Ok(false);
        };
        hidden::hide_target(self.vars.as_mut(), list, &tag)?;
        self.rescan();
        Ok(true)
    }

    /// Clears every hidden list, then rescans.
    ///
    /// # Errors
    ///
    /// May return an `Error` if a hidden list could not be deleted.
    pub fn unhide_all(&mut self) -> BootResult<()> {
        hidden::unhide_all(self.vars.as_mut())?;
        info!("Every hidden target is shown again");
        self.rescan();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::{borrow::ToOwned, rc::Rc, string::String};
    use core::cell::Cell;

    use uefi::{
        Status,
        runtime::{VariableAttributes, VariableVendor},
    };

    use super::*;
    use crate::{
        boot::action::BootAction,
        policy::ToolKind,
        system::{
            fs::memfs::{MemFs, pe_image},
            helper::Arch,
            variable::{VarError, memstore::MemVariableStore},
        },
        target::TargetKind,
        volume::{Volume, VolumeId, VolumeKind, memcatalog::MemCatalog},
    };

    /// Services that load everything and return at once.
    #[derive(Default)]
    struct Returning {
        started: usize,
    }

    impl ImageServices for Returning {
        type Image = u8;

        fn load_from_device_path(&mut self, _device_path: &[u8]) -> Result<u8, Status> {
            Ok(0)
        }

        fn set_load_options(&mut self, _image: u8, _options: &str) -> Result<(), Status> {
            Ok(())
        }

        fn start(&mut self, _image: u8) -> Status {
            self.started += 1;
            Status::SUCCESS
        }

        fn unload(&mut self, _image: u8) {}

        fn legacy_boot(&mut self, _device_path: &[u8]) -> Status {
            Status::UNSUPPORTED
        }

        fn set_apple_os(&mut self, _version: &str) -> Status {
            Status::SUCCESS
        }

        fn reset_cold(&mut self) {}

        fn run_action(&mut self, _action: BootAction, _vars: &mut dyn VariableStore) {}

        fn legacy_loader_sources(&mut self) -> Vec<Vec<u8>> {
            Vec::new()
        }
    }

    /// Counts the reads of one hidden list, which happen once per pass.
    struct CountingStore {
        inner: MemVariableStore,
        reads: Rc<Cell<usize>>,
    }

    impl VariableStore for CountingStore {
        fn get(&self, name: &str, vendor: &VariableVendor) -> Result<Option<Vec<u8>>, VarError> {
            if name == "HiddenTags" {
                self.reads.set(self.reads.get() + 1);
            }
            self.inner.get(name, vendor)
        }

        fn set(
            &mut self,
            name: &str,
            vendor: &VariableVendor,
            attributes: VariableAttributes,
            data: &[u8],
        ) -> Result<(), VarError> {
            self.inner.set(name, vendor, attributes, data)
        }
    }

    fn scout(default_selection: Option<&str>) -> BootScout {
        let image = |x: &[u8]| pe_image(Arch::current().unwrap_or(Arch::X64).pe_machine(), x);
        let mut volume = Volume::new(VolumeId(0), VolumeKind::Internal);
        volume.fs_name = Some("ESP".to_owned());

        let mut catalog = MemCatalog::new();
        catalog.add_fs(
            volume,
            MemFs::new()
                .file("EFI\\Microsoft\\Boot\\bootmgfw.efi", &image(b"windows"))
                .file("EFI\\fedora\\grubx64.efi", &image(b"grub")),
        );

        let config = ScanConfig {
            default_selection: default_selection.map(String::from),
            policy: ScanPolicy {
                show_tools: Vec::from([ToolKind::Reboot]),
                ..ScanPolicy::default()
            },
            ..ScanConfig::default()
        };

        BootScout::with_parts(
            config,
            Box::new(catalog),
            Box::new(MemVariableStore::new()),
            LegacyMode::None,
        )
    }

    fn titles(scout: &BootScout) -> Vec<&str> {
        scout.list().iter().map(|x| x.title.as_str()).collect()
    }

    #[test]
    fn construction_runs_one_pass() {
        let reads = Rc::new(Cell::new(0));
        let store = CountingStore {
            inner: MemVariableStore::new(),
            reads: Rc::clone(&reads),
        };
        let mut scout = BootScout::with_parts(
            ScanConfig::default(),
            Box::new(MemCatalog::new()),
            Box::new(store),
            LegacyMode::None,
        );
        assert_eq!(reads.get(), 1);

        scout.rescan();
        assert_eq!(reads.get(), 2);
    }

    #[test]
    fn hiding_and_unhiding() {
        let mut scout = scout(None);
        assert_eq!(
            titles(&scout),
            [
                "Boot EFI\\Microsoft\\Boot\\bootmgfw.efi from ESP",
                "Boot EFI\\fedora\\grubx64.efi from ESP",
                "Reboot computer",
            ]
        );

        assert!(scout.hide(1).unwrap());
        assert_eq!(scout.list().len(), 2);
        assert!(!scout.hide(1).unwrap());

        scout.unhide_all().unwrap();
        assert_eq!(scout.list().len(), 3);
    }

    #[test]
    fn previous_boot_becomes_the_default() {
        let mut scout = scout(Some("+"));
        assert_eq!(scout.menu().default_index(), 0);

        let mut services = Returning::default();
        scout.launch(1, None, &mut services).unwrap();
        assert_eq!(services.started, 1);

        scout.rescan();
        assert_eq!(scout.menu().default_index(), 1);
    }

    #[test]
    fn launching_a_missing_target_fails() {
        let mut scout = scout(None);
        let mut services = Returning::default();
        let result = scout.launch(7, None, &mut services);
        assert!(matches!(
            result,
            Err(crate::error::BootError::LaunchError(LaunchError::NotFound(7)))
        ));
        assert!(matches!(scout.list()[2].kind, TargetKind::Action(BootAction::Reboot)));
    }
}
