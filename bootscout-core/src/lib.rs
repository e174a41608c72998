// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `bootscout` library crate.
//!
//! This is the discovery and launch engine of a UEFI boot manager. It finds everything on the machine that could be
//! booted (EFI executables on any visible volume, legacy BIOS boot records, and the boot options the firmware already
//! knows about), folds them into an ordered and de-duplicated [`menu::MenuModel`], and transfers control to whichever
//! target is selected.
//!
//! Drawing the menu is left to frontends such as `bootscout-cli`. Every firmware interaction sits behind a small
//! trait ([`volume::VolumeCatalog`], [`system::variable::VariableStore`], [`system::block::SectorDevice`],
//! [`boot::launch::ImageServices`]) so that the scanning logic can be exercised on the host.
//!
//! ## MSRV
//!
//! The minimum supported rust version is 1.88.0.

#![cfg_attr(not(any(fuzzing, test, doctest)), no_std)]

/// The primary result type that wraps around [`crate::error::BootError`].
pub type BootResult<T> = Result<T, crate::error::BootError>;

pub mod boot;
pub mod error;
pub mod menu;
pub mod policy;
pub mod scan;
pub mod system;
pub mod target;
pub mod volume;

extern crate alloc;
