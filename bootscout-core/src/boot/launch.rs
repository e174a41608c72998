// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Starts a [`DiscoveredTarget`].
//!
//! An EFI loader is validated, loaded, given its load options and the hints that the OS it starts expects, then
//! started. If it returns, it is unloaded and control goes back to the caller. Apple style legacy targets activate
//! their MBR partition and chain to the legacy loader in the firmware volume. BBS records are handed to the legacy
//! BIOS. Firmware boot options are started by setting `BootNext` and rebooting.
//!
//! Every firmware call goes through [`ImageServices`] so that the sequence can be followed on the host.

use alloc::{format, string::String, vec::Vec};

use log::{debug, error, info, warn};
use thiserror::Error;
use uefi::{
    Status,
    runtime::{VariableAttributes, VariableVendor},
};

use crate::{
    BootResult,
    boot::action::BootAction,
    scan::{
        ScanSession,
        legacy::{hints::LegacyDevicePathSet, mbr::activate_mbr_partition},
        validate::is_valid_loader,
    },
    system::{
        device_path::join_file_path,
        variable::{
            APPLE_VENDOR, BOOTSCOUT_VENDOR, LOADER_VENDOR, VariableStore, default_attributes, set_variable,
            set_variable_str,
        },
    },
    target::{DiscoveredTarget, LegacyBoot, OsFamily, TargetKind},
    volume::{Volume, VolumeCatalog, VolumeKind},
};

pub mod services;

/// The variable holding the title of the target that was started last.
pub const PREVIOUS_BOOT: &str = "PreviousBoot";

/// The Apple variable that tells the legacy loader which disk to start.
pub const BOOT_CAMP_HD: &str = "BootCampHD";

/// The loader interface variable holding the unique GUID of the partition the OS was started from.
pub const LOADER_DEVICE_PART_UUID: &str = "LoaderDevicePartUUID";

/// Load options given to the legacy loader for disks.
const LEGACY_HD_OPTIONS: &str = "HD";

/// Load options given to the legacy loader for optical media.
const LEGACY_CD_OPTIONS: &str = "CD";

/// Firmware services needed to start targets.
///
/// [`services::UefiImageServices`] implements this with boot services.
pub trait ImageServices {
    /// A loaded image.
    type Image: Copy;

    /// Loads an image from a complete device path.
    ///
    /// # Errors
    ///
    /// Returns the status of the firmware if the image could not be loaded.
    fn load_from_device_path(&mut self, device_path: &[u8]) -> Result<Self::Image, Status>;

    /// Sets the load options of a loaded image.
    ///
    /// # Errors
    ///
    /// Returns the status of the firmware if the options could not be set.
    fn set_load_options(&mut self, image: Self::Image, options: &str) -> Result<(), Status>;

    /// Starts a loaded image, returning the status it exits with.
    fn start(&mut self, image: Self::Image) -> Status;

    /// Unloads an image that has returned or was never started.
    fn unload(&mut self, image: Self::Image);

    /// Boots a BBS device path through the legacy BIOS. This only returns on failure.
    fn legacy_boot(&mut self, device_path: &[u8]) -> Status;

    /// Reports a macOS version to Apple firmware.
    fn set_apple_os(&mut self, version: &str) -> Status;

    /// Reboots the system with a cold reset.
    fn reset_cold(&mut self);

    /// Runs a built-in action.
    fn run_action(&mut self, action: BootAction, vars: &mut dyn VariableStore);

    /// The device paths of the images the firmware has loaded, where the legacy loader may be found.
    fn legacy_loader_sources(&mut self) -> Vec<Vec<u8>>;
}

/// The reason a launch failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// The target could not be loaded or started.
    Load,

    /// The target was rejected by Secure Boot or another integrity check.
    Security,
}

/// An `Error` that may result from launching a target.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// There is no target at the index.
    #[error("No target at index {0}")]
    NotFound(usize),

    /// The target does not name the volume it lives on.
    #[error("\"{0}\" has no volume")]
    MissingVolume(String),

    /// The target does not name a loader.
    #[error("\"{0}\" has no loader path")]
    MissingPath(String),

    /// The loader is not an EFI executable for this machine.
    #[error("\"{0}\" is not a valid loader for this machine")]
    Invalid(String),

    /// The firmware refused to load the loader.
    #[error("\"{title}\" could not be loaded: {status}")]
    Load {
        /// The title of the target.
        title: String,

        /// The status returned by the firmware.
        status: Status,
    },

    /// The firmware rejected the loader on security grounds.
    #[error("\"{title}\" was rejected by the firmware's security policy: {status}")]
    Security {
        /// The title of the target.
        title: String,

        /// The status returned by the firmware.
        status: Status,
    },

    /// None of the candidate paths of the legacy loader could be loaded.
    #[error("The legacy loader could not be found")]
    NoLegacyLoader,

    /// The loader was started, but exited with an error.
    #[error("\"{title}\" exited with {status}")]
    Exited {
        /// The title of the target.
        title: String,

        /// The status the loader exited with.
        status: Status,
    },
}

impl LaunchError {
    /// Classifies the failure.
    #[must_use = "Has no effect if the result is unused"]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Security { .. } => FailureClass::Security,
            Self::Exited { status, .. } if is_security_status(*status) => FailureClass::Security,
            _ => FailureClass::Load,
        }
    }

    /// Builds the error of a failed load.
    fn from_load(title: &str, status: Status) -> Self {
        let title = String::from(title);
        if is_security_status(status) {
            Self::Security { title, status }
        } else {
            Self::Load { title, status }
        }
    }
}

/// Checks if a status means the image was rejected on security grounds.
const fn is_security_status(status: Status) -> bool {
    matches!(status, Status::SECURITY_VIOLATION | Status::ACCESS_DENIED)
}

/// The attributes of variables that only live until the next reset.
fn volatile_attributes() -> VariableAttributes {
    VariableAttributes::BOOTSERVICE_ACCESS | VariableAttributes::RUNTIME_ACCESS
}

/// Starts targets with the policy of a pass.
pub struct Launcher<'a, S: ImageServices> {
    /// The session of the pass the target was found in.
    session: &'a ScanSession,

    /// The volumes of the pass.
    catalog: &'a dyn VolumeCatalog,

    /// Where hints for the started OS and the boot manager are stored.
    vars: &'a mut dyn VariableStore,

    /// The firmware services.
    services: &'a mut S,
}

impl<'a, S: ImageServices> Launcher<'a, S> {
    /// Creates a new [`Launcher`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(
        session: &'a ScanSession,
        catalog: &'a dyn VolumeCatalog,
        vars: &'a mut dyn VariableStore,
        services: &'a mut S,
    ) -> Self {
        Self {
            session,
            catalog,
            vars,
            services,
        }
    }

    /// Starts a target, or one of its sub entries.
    ///
    /// This returns `Ok` when a started loader returns control, or when the test double of a reset returns.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the target could not be started, the MBR partition could not be activated, or
    /// `BootNext` could not be set.
    pub fn launch(&mut self, target: &DiscoveredTarget, sub_entry: Option<usize>) -> BootResult<()> {
        info!("Starting {}", target.title);
        match &target.kind {
            TargetKind::Loader => self.launch_loader(target, sub_entry),
            TargetKind::Legacy(LegacyBoot::Classic) => self.launch_classic(target),
            TargetKind::Legacy(LegacyBoot::Bbs { device_path, .. }) => {
                self.record_previous(target);
                let status = self.services.legacy_boot(device_path);
                Err(LaunchError::from_load(&target.title, status).into())
            }
            TargetKind::Firmware { boot_num, .. } => {
                set_variable::<u16>(
                    self.vars,
                    "BootNext",
                    &VariableVendor::GLOBAL_VARIABLE,
                    None,
                    Some(*boot_num),
                )?;
                self.services.reset_cold();
                Ok(())
            }
            TargetKind::Action(action) => {
                self.services.run_action(*action, self.vars);
                Ok(())
            }
        }
    }

    /// Validates, loads, prepares and starts an EFI loader.
    fn launch_loader(&mut self, target: &DiscoveredTarget, sub_entry: Option<usize>) -> BootResult<()> {
        let sub = sub_entry.and_then(|x| target.sub_entries.get(x));
        let path = sub
            .and_then(|x| x.loader_path.as_deref())
            .or(target.loader_path.as_deref())
            .ok_or_else(|| LaunchError::MissingPath(target.title.clone()))?;
        let options = sub
            .and_then(|x| x.load_options.as_deref())
            .or(target.load_options.as_deref())
            .unwrap_or_default();
        let volume = target
            .volume
            .as_deref()
            .ok_or_else(|| LaunchError::MissingVolume(target.title.clone()))?;

        let mut fs = self.catalog.open_fs(volume);
        if !is_valid_loader(fs.as_deref_mut().map(|x| x as &mut dyn crate::system::fs::VolumeFs), path, self.session.arch) {
            return Err(LaunchError::Invalid(target.title.clone()).into());
        }

        let device_path = join_file_path(&volume.device_path, path)?;
        let image = self
            .services
            .load_from_device_path(&device_path)
            .map_err(|status| LaunchError::from_load(&target.title, status))?;

        let options = if target.os == OsFamily::MacOs {
            format!("{options} ")
        } else {
            String::from(options)
        };
        if let Err(status) = self.services.set_load_options(image, &options) {
            self.services.unload(image);
            return Err(LaunchError::Load {
                title: target.title.clone(),
                status,
            }
            .into());
        }

        self.write_os_hints(target, volume);
        self.record_previous(target);
        self.transfer(&target.title, image)
    }

    /// Activates the partition of a legacy target, then chains to the legacy loader of Apple firmware.
    fn launch_classic(&mut self, target: &DiscoveredTarget) -> BootResult<()> {
        let volume = target
            .volume
            .as_deref()
            .ok_or_else(|| LaunchError::MissingVolume(target.title.clone()))?;

        if let Some(index) = volume.mbr_index {
            self.activate(volume, index)?;
        }

        if volume.kind != VolumeKind::Optical {
            let disk_path = volume.whole_disk_path.as_deref().unwrap_or(&volume.device_path);
            if let Err(e) = self.vars.set(BOOT_CAMP_HD, &APPLE_VENDOR, default_attributes(), disk_path) {
                warn!("{e}");
            }
        }

        let sources = self.services.legacy_loader_sources();
        let candidates = LegacyDevicePathSet::build(sources.iter().map(Vec::as_slice));
        let image = candidates
            .iter()
            .find_map(|path| match self.services.load_from_device_path(path) {
                Ok(image) => Some(image),
                Err(status) => {
                    debug!("Legacy loader candidate failed to load: {status}");
                    None
                }
            })
            .ok_or(LaunchError::NoLegacyLoader)?;

        let options = if volume.kind == VolumeKind::Optical {
            LEGACY_CD_OPTIONS
        } else {
            LEGACY_HD_OPTIONS
        };
        if let Err(status) = self.services.set_load_options(image, options) {
            self.services.unload(image);
            return Err(LaunchError::Load {
                title: target.title.clone(),
                status,
            }
            .into());
        }

        self.record_previous(target);
        self.transfer(&target.title, image)
    }

    /// Makes the MBR partition of a volume the active one on its whole disk.
    fn activate(&self, volume: &Volume, index: usize) -> BootResult<()> {
        let Some(disk) = volume.whole_disk.and_then(|x| self.catalog.volume(x)) else {
            warn!("{} has no whole disk to activate it on", volume.display_name());
            return Ok(());
        };
        let Some(mut device) = self.catalog.open_disk(disk) else {
            warn!("Could not open {}", disk.display_name());
            return Ok(());
        };

        debug!("Activating MBR partition {index} of {}", disk.display_name());
        activate_mbr_partition(device.as_mut(), index).inspect_err(|e| error!("{e}"))?;
        Ok(())
    }

    /// Writes the variables and protocol calls that the started OS relies on.
    fn write_os_hints(&mut self, target: &DiscoveredTarget, volume: &Volume) {
        let policy = &self.session.policy;

        if policy.write_systemd_vars
            && matches!(target.os, OsFamily::Linux | OsFamily::Elilo | OsFamily::Grub)
            && let Some(guid) = volume.guid_string()
            && let Err(e) = set_variable_str(
                self.vars,
                LOADER_DEVICE_PART_UUID,
                &LOADER_VENDOR,
                Some(volatile_attributes()),
                Some(&guid.to_ascii_uppercase()),
            )
        {
            warn!("{e}");
        }

        if let Some(version) = &policy.spoof_os_version
            && target.os != OsFamily::MacOs
        {
            let status = self.services.set_apple_os(version);
            if status.is_error() {
                warn!("Could not report macOS {version} to the firmware: {status}");
            }
        }
    }

    /// Records the title of the target for the `+` default selection.
    fn record_previous(&mut self, target: &DiscoveredTarget) {
        if let Err(e) = set_variable_str(self.vars, PREVIOUS_BOOT, &BOOTSCOUT_VENDOR, None, Some(&target.title)) {
            warn!("{e}");
        }
    }

    /// Starts a prepared image and unloads it once it returns.
    fn transfer(&mut self, title: &str, image: S::Image) -> BootResult<()> {
        let status = self.services.start(image);
        info!("{title} returned with {status}");
        self.services.unload(image);

        if status.is_error() {
            return Err(LaunchError::Exited {
                title: String::from(title),
                status,
            }
            .into());
        }
        Ok(())
    }
}
