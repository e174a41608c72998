// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Resets that end the current boot: warm and cold reboots, and shutdown.

use uefi::{
    Status,
    runtime::{self, ResetType},
};

/// Reboots the system.
pub fn reset() -> ! {
    runtime::reset(ResetType::WARM, Status::SUCCESS, None)
}

/// Reboots the system with a cold reset. Some firmware only honors `BootNext` after one.
pub fn cold_reset() -> ! {
    runtime::reset(ResetType::COLD, Status::SUCCESS, None)
}

/// Shuts down the system.
pub fn shutdown() -> ! {
    runtime::reset(ResetType::SHUTDOWN, Status::SUCCESS, None)
}
