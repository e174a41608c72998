// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootError`], which encapsulates other errors

use thiserror::Error;

/// An `Error` resulting from the program.
#[derive(Error, Debug)]
pub enum BootError {
    /// An error with UEFI, or a service from the [`uefi`] crate.
    #[error("UEFI Error: {0}")]
    Uefi(#[from] uefi::Error),

    /// A `String` could not be converted into a `CString16`
    #[error("String Conversion Error: {0}")]
    StrError(#[from] crate::system::helper::StrError),

    /// An error occurred while performing filesystem operations.
    #[error("Filesystem Error: {0}")]
    FsError(#[from] crate::system::fs::FsError),

    /// An error occurred while reading or writing a UEFI variable.
    #[error("Variable Error: {0}")]
    VarError(#[from] crate::system::variable::VarError),

    /// The configuration file could not be parsed.
    #[error("Config Error: {0}")]
    ConfigError(#[from] crate::policy::config::ConfigError),

    /// An error occurred while reading or writing raw sectors of a disk.
    #[error("Block Device Error: {0}")]
    BlockError(#[from] crate::system::block::BlockError),

    /// An error occurred while parsing or building a `DevicePath`.
    #[error("DevicePath Error: {0}")]
    DevicePathError(#[from] crate::system::device_path::DevicePathError),

    /// The MBR partition table could not be updated to activate a partition.
    #[error("MBR Error: {0}")]
    MbrError(#[from] crate::scan::legacy::mbr::MbrError),

    /// A target could not be launched.
    #[error("Launch Error: {0}")]
    LaunchError(#[from] crate::boot::launch::LaunchError),
}
