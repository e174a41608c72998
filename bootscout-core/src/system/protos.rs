// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Protocols that are not implemented in uefi-rs.
//!
//! [`LegacyBios`] is the compatibility support module interface used to hand a BBS boot option to the legacy BIOS on
//! PC firmware. [`AppleSetOs`] is the Apple firmware interface that tells the platform which OS is about to start,
//! which some Macs need before they expose all of their graphics hardware to a non-Apple OS.

use core::ffi::c_void;

use uefi::{CStr8, Status, guid, proto::unsafe_protocol};

/// The raw legacy BIOS protocol table. Only `legacy_boot` is called, the other members are kept for layout.
#[derive(Debug)]
#[repr(C)]
pub struct LegacyBiosProtocol {
    /// `Int86`.
    int86: *const c_void,

    /// `FarCall86`.
    far_call86: *const c_void,

    /// `CheckPciRom`.
    check_pci_rom: *const c_void,

    /// `InstallPciRom`.
    install_pci_rom: *const c_void,

    /// `LegacyBoot`.
    legacy_boot: unsafe extern "efiapi" fn(
        this: *mut Self,
        boot_option: *const u8,
        load_options_size: u32,
        load_options: *const c_void,
    ) -> Status,
}

impl LegacyBiosProtocol {
    /// The GUID of `EFI_LEGACY_BIOS_PROTOCOL`.
    const GUID: uefi::Guid = guid!("db9a1e3d-45cb-4abb-853b-e5387fdb2e2d");
}

/// The legacy BIOS (compatibility support module) protocol.
#[derive(Debug)]
#[repr(transparent)]
#[unsafe_protocol(LegacyBiosProtocol::GUID)]
pub struct LegacyBios(LegacyBiosProtocol);

impl LegacyBios {
    /// Boots a BBS device path through the legacy BIOS.
    ///
    /// On success this does not return.
    ///
    /// # Safety
    ///
    /// `boot_option` must be a complete, end-terminated device path whose first node is a BBS node.
    pub unsafe fn legacy_boot(&mut self, boot_option: &[u8]) -> Status {
        // SAFETY: the caller guarantees the device path is well formed, and no load options are passed.
        unsafe {
            (self.0.legacy_boot)(
                &raw mut self.0,
                boot_option.as_ptr(),
                0,
                core::ptr::null(),
            )
        }
    }
}

/// The raw Apple set OS protocol table.
#[derive(Debug)]
#[repr(C)]
pub struct AppleSetOsProtocol {
    /// The protocol revision.
    version: u64,

    /// Reports the version string of the OS about to start.
    set_os_version: unsafe extern "efiapi" fn(version: *const u8) -> Status,

    /// Reports the vendor string of the OS about to start.
    set_os_vendor: unsafe extern "efiapi" fn(vendor: *const u8) -> Status,
}

impl AppleSetOsProtocol {
    /// The GUID of the Apple set OS protocol.
    const GUID: uefi::Guid = guid!("c5c5da95-7d5c-45e6-b2f1-3fd52bb10077");
}

/// The Apple set OS protocol.
#[derive(Debug)]
#[repr(transparent)]
#[unsafe_protocol(AppleSetOsProtocol::GUID)]
pub struct AppleSetOs(AppleSetOsProtocol);

impl AppleSetOs {
    /// The protocol revision.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn version(&self) -> u64 {
        self.0.version
    }

    /// Reports the OS version string to the firmware.
    pub fn set_os_version(&mut self, version: &CStr8) -> Status {
        // SAFETY: the string is nul terminated and outlives the call.
        unsafe { (self.0.set_os_version)(version.as_ptr().cast()) }
    }

    /// Reports the OS vendor string to the firmware.
    pub fn set_os_vendor(&mut self, vendor: &CStr8) -> Status {
        // SAFETY: the string is nul terminated and outlives the call.
        unsafe { (self.0.set_os_vendor)(vendor.as_ptr().cast()) }
    }
}
