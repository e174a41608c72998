// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Panic handler for final EFI binaries.
//!
//! A boot manager that panics mid scan has nothing sensible to return to, so this prints the panic, waits for a key
//! (or 10 seconds when no keyboard is available) and then performs a cold reset, which gives the firmware a chance to
//! try the next entry of its own boot order.
//!
//! This is enabled when the `panic_handler` feature is enabled, in case the user wanted to roll their
//! own panic handler implementation or for fuzzing/testing.

#![cfg(feature = "panic_handler")]
use core::fmt::Write;

/// The panic handler.
#[panic_handler]
fn panic_handler(info: &core::panic::PanicInfo) -> ! {
    uefi::system::with_stdout(|stdout| {
        let _ = writeln!(stdout, "[PANIC]: {info}");
        let _ = writeln!(stdout, "Press a key to restart");
    });
    uefi::system::with_stdin(|stdin| {
        if let Some(event) = stdin.wait_for_key_event() {
            let _ = uefi::boot::wait_for_event(&mut [event]);
        } else {
            uefi::boot::stall(10_000_000);
        }
    });
    uefi::runtime::reset(uefi::runtime::ResetType::COLD, uefi::Status::ABORTED, None);
}
