// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`UefiImageServices`], the [`ImageServices`] of boot services.

use alloc::{boxed::Box, vec::Vec};

use log::{debug, warn};
use uefi::{
    CStr8, CStr16, CString16, Handle, Status,
    boot::{self, OpenProtocolAttributes, OpenProtocolParams, SearchType},
    proto::{
        BootPolicy,
        device_path::LoadedImageDevicePath,
        loaded_image::LoadedImage,
    },
};

use crate::{
    boot::{
        action::{BootAction, power},
        launch::ImageServices,
    },
    system::{
        device_path::{self, as_device_path},
        protos::{AppleSetOs, LegacyBios},
        variable::VariableStore,
    },
};

/// The vendor reported to Apple firmware along with a spoofed macOS version.
const APPLE_OS_VENDOR: &[u8] = b"Apple Inc.\0";

/// Builds a nul terminated 8 bit string.
fn cstr8_bytes(text: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = text.bytes().filter(|&x| x != 0).collect();
    bytes.push(0);
    bytes
}

/// Loads and starts images with boot services.
#[derive(Clone, Copy, Debug, Default)]
pub struct UefiImageServices;

impl ImageServices for UefiImageServices {
    type Image = Handle;

    fn load_from_device_path(&mut self, device_path: &[u8]) -> Result<Handle, Status> {
        let device_path = as_device_path(device_path).map_err(|_| Status::INVALID_PARAMETER)?;
        let src = boot::LoadImageSource::FromDevicePath {
            device_path,
            boot_policy: BootPolicy::ExactMatch,
        };
        boot::load_image(boot::image_handle(), src).map_err(|e| e.status())
    }

    fn set_load_options(&mut self, image: Handle, options: &str) -> Result<(), Status> {
        let mut loaded = boot::open_protocol_exclusive::<LoadedImage>(image).map_err(|e| e.status())?;
        let options = Box::new(CString16::try_from(options).map_err(|_| Status::INVALID_PARAMETER)?);
        let size = u32::try_from(options.num_bytes()).map_err(|_| Status::BAD_BUFFER_SIZE)?;

        // the load options must outlive this function, as the image reads them once it is started
        let options: &'static CStr16 = Box::leak(options);

        // SAFETY: the options were leaked, so they stay valid for as long as the image may read them.
        unsafe {
            loaded.set_load_options(options.as_ptr().cast(), size);
        }
        Ok(())
    }

    fn start(&mut self, image: Handle) -> Status {
        match boot::start_image(image) {
            Ok(()) => Status::SUCCESS,
            Err(e) => e.status(),
        }
    }

    fn unload(&mut self, image: Handle) {
        if let Err(e) = boot::unload_image(image) {
            debug!("Image could not be unloaded: {e}");
        }
    }

    fn legacy_boot(&mut self, device_path: &[u8]) -> Status {
        let handle = match boot::get_handle_for_protocol::<LegacyBios>() {
            Ok(handle) => handle,
            Err(e) => return e.status(),
        };
        let mut bios = match boot::open_protocol_exclusive::<LegacyBios>(handle) {
            Ok(bios) => bios,
            Err(e) => return e.status(),
        };
        if as_device_path(device_path).is_err() {
            return Status::INVALID_PARAMETER;
        }

        // SAFETY: the device path was checked to be well formed, and it comes from a BBS boot option.
        unsafe { bios.legacy_boot(device_path) }
    }

    fn set_apple_os(&mut self, version: &str) -> Status {
        let handle = match boot::get_handle_for_protocol::<AppleSetOs>() {
            Ok(handle) => handle,
            Err(e) => return e.status(),
        };
        let mut set_os = match boot::open_protocol_exclusive::<AppleSetOs>(handle) {
            Ok(set_os) => set_os,
            Err(e) => return e.status(),
        };

        let version = cstr8_bytes(&alloc::format!("Mac OS X {version}"));
        let (Ok(version), Ok(vendor)) = (
            CStr8::from_bytes_with_nul(&version),
            CStr8::from_bytes_with_nul(APPLE_OS_VENDOR),
        ) else {
            return Status::INVALID_PARAMETER;
        };

        let status = set_os.set_os_version(version);
        if status.is_error() {
            return status;
        }
        set_os.set_os_vendor(vendor)
    }

    fn reset_cold(&mut self) {
        power::cold_reset();
    }

    fn run_action(&mut self, action: BootAction, vars: &mut dyn VariableStore) {
        action.run(vars);
    }

    fn legacy_loader_sources(&mut self) -> Vec<Vec<u8>> {
        let Ok(handles) = boot::locate_handle_buffer(SearchType::from_proto::<LoadedImage>()) else {
            warn!("Could not list the loaded images");
            return Vec::new();
        };

        handles
            .iter()
            .filter_map(|&handle| {
                // SAFETY: loaded images stay installed while their device paths are copied out.
                let path = unsafe {
                    boot::open_protocol::<LoadedImageDevicePath>(
                        OpenProtocolParams {
                            handle,
                            agent: boot::image_handle(),
                            controller: None,
                        },
                        OpenProtocolAttributes::GetProtocol,
                    )
                }
                .ok()?;
                Some(device_path::to_bytes(&path))
            })
            .collect()
    }
}
