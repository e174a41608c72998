// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`reset_to_firmware`] which allows to reboot to firmware setup

use log::error;
use uefi::{
    boot,
    runtime::{VariableAttributes, VariableVendor},
};

use crate::{
    boot::action::power,
    system::variable::{VarError, VariableStore, get_variable, set_variable},
};

/// The bit that indicates to the firmware if booting into firmware setup should be done.
const EFI_OS_INDICATIONS_BOOT_TO_FW_UI: u64 = 1;

/// Checks if the firmware supports rebooting into its setup, through `OsIndicationsSupported`.
#[must_use = "Has no effect if the result is unused"]
pub fn firmware_ui_supported(vars: &dyn VariableStore) -> bool {
    get_variable::<u64>(vars, "OsIndicationsSupported", &VariableVendor::GLOBAL_VARIABLE)
        .ok()
        .flatten()
        .is_some_and(|x| x & EFI_OS_INDICATIONS_BOOT_TO_FW_UI != 0)
}

/// Reboots to firmware setup using the `OsIndications` variable
///
/// If the `OsIndications` could not be set for some reason, the error will be displayed on screen for 5
/// seconds, then the system will reboot. This is because this function never returns, so control cannot be
/// returned to the main loop.
pub fn reset_to_firmware(vars: &mut dyn VariableStore) -> ! {
    if let Err(e) = set_reset_to_firmware_flag(vars) {
        error!("Failed to set OsIndications: {e}");
        boot::stall(5_000_000);
    }
    power::reset()
}

/// Sets the [`EFI_OS_INDICATIONS_BOOT_TO_FW_UI`] bit, creating `OsIndications` if it does not exist.
///
/// # Errors
///
/// May return an `Error` if the variable could not be read or written.
pub fn set_reset_to_firmware_flag(vars: &mut dyn VariableStore) -> Result<(), VarError> {
    let osind = get_variable::<u64>(vars, "OsIndications", &VariableVendor::GLOBAL_VARIABLE)?.unwrap_or(0);
    set_variable::<u64>(
        vars,
        "OsIndications",
        &VariableVendor::GLOBAL_VARIABLE,
        Some(
            VariableAttributes::NON_VOLATILE
                | VariableAttributes::BOOTSERVICE_ACCESS
                | VariableAttributes::RUNTIME_ACCESS,
        ),
        Some(osind | EFI_OS_INDICATIONS_BOOT_TO_FW_UI),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::variable::memstore::MemVariableStore;

    #[test]
    fn sets_the_flag_and_keeps_other_bits() {
        let mut vars =
            MemVariableStore::new().with("OsIndications", &VariableVendor::GLOBAL_VARIABLE, &4u64.to_le_bytes());
        set_reset_to_firmware_flag(&mut vars).unwrap();
        let value = get_variable::<u64>(&vars, "OsIndications", &VariableVendor::GLOBAL_VARIABLE).unwrap();
        assert_eq!(value, Some(5));

        let mut vars = MemVariableStore::new();
        set_reset_to_firmware_flag(&mut vars).unwrap();
        assert!(vars.contains("OsIndications", &VariableVendor::GLOBAL_VARIABLE));
    }

    #[test]
    fn support_is_read_from_firmware() {
        let vars = MemVariableStore::new();
        assert!(!firmware_ui_supported(&vars));
        let vars = vars.with("OsIndicationsSupported", &VariableVendor::GLOBAL_VARIABLE, &1u64.to_le_bytes());
        assert!(firmware_ui_supported(&vars));
    }
}
