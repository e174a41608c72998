// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootAction`], the built-in entries of the tools row that do not start a loader.

use crate::system::variable::VariableStore;

pub mod firmware;
pub mod power;

/// Built-in actions offered on the tools row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootAction {
    /// Reboot the system.
    Reboot,

    /// Shut down the system.
    Shutdown,

    /// Reboot the system into firmware setup.
    ResetToFirmware,
}

impl BootAction {
    /// The title of the action.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Reboot => "Reboot computer",
            Self::Shutdown => "Shut down computer",
            Self::ResetToFirmware => "Reboot into firmware user interface",
        }
    }

    /// The icon name of the action.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Reboot => "func_reset",
            Self::Shutdown => "func_shutdown",
            Self::ResetToFirmware => "func_firmware",
        }
    }

    /// Runs the action. None of them return.
    pub fn run(self, vars: &mut dyn VariableStore) -> ! {
        match self {
            Self::Reboot => power::reset(),
            Self::Shutdown => power::shutdown(),
            Self::ResetToFirmware => firmware::reset_to_firmware(vars),
        }
    }
}
