// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Filesystem helper functions for other modules.
//!
//! The scanners never talk to [`SimpleFileSystem`] directly. They go through the [`VolumeFs`] trait, which only
//! exposes what discovery needs: listing a directory, asking for the size and time of one file, reading a file or its
//! first few bytes, and the volume label. [`UefiFileSystem`] implements it over the UEFI protocol.
//!
//! These filesystem helpers are guaranteed to support FAT filesystems. This is mandated by the UEFI specification.
//! Other filesystems are visible as well whenever the firmware (or a loaded driver) provides [`SimpleFileSystem`] for
//! them.

use alloc::{borrow::ToOwned, boxed::Box, string::String, vec, vec::Vec};
use thiserror::Error;
use uefi::{
    CString16, Handle, Status,
    boot::{self, ScopedProtocol},
    fs::{COMMON_SKIP_DIRS, UefiDirectoryIter},
    proto::media::{
        file::{Directory, File, FileAttribute, FileInfo, FileMode, FileSystemVolumeLabel, RegularFile},
        fs::SimpleFileSystem,
    },
};

use crate::{
    BootResult,
    system::{
        helper::{normalize_path, str_to_cstr},
        time::Timestamp,
    },
};

#[cfg(test)]
pub(crate) mod memfs;

/// The size of one gigabyte in bytes. This is the default value if a file is too big to be read.
///
/// This is also a reasonable maximum size for files that may be read.
pub(crate) const ONE_GIGABYTE: usize = 1024 * 1024 * 1024;

/// An error that may result from performing filesystem operations
#[derive(Error, Debug)]
pub enum FsError {
    /// The provided buffer was too small.
    #[error("Buffer too small (require {0} bytes)")]
    BufTooSmall(usize),

    /// A file could not be opened.
    #[error("Failed to open file: {0}")]
    OpenErr(Status),

    /// A file could not be read.
    #[error("Failed to read file: {0}")]
    ReadErr(Status),

    /// The path could not be represented as a UEFI string.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Failed to get a volume label on a partition.
    #[error("Could not get volume label of a partition")]
    VolumeLabelErr,
}

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// The file name, without any directory components.
    pub name: String,

    /// The size of the file in bytes as reported by the listing.
    pub size: u64,

    /// The last modification time.
    pub modified: Timestamp,

    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Read access to the root of one volume.
///
/// All paths are canonical (see [`crate::system::helper::normalize_path`]), and the empty path is the root directory.
pub trait VolumeFs {
    /// Lists a directory, excluding `.` and `..`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the directory does not exist or could not be read.
    fn read_dir(&mut self, dir: &str) -> Result<Vec<DirEntry>, FsError>;

    /// Queries the size and time of a single file by opening it.
    ///
    /// This is deliberately a separate query from [`Self::read_dir`]: on filesystems that expose symbolic links, the
    /// two can disagree about the size of the same name.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the file does not exist or could not be queried.
    fn file_info(&mut self, path: &str) -> Result<DirEntry, FsError>;

    /// Reads the beginning of a file into `buf`, returning how many bytes were read.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the file does not exist or could not be read.
    fn read_header(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, FsError>;

    /// Reads the whole file.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the file does not exist or could not be read.
    fn read(&mut self, path: &str) -> Result<Vec<u8>, FsError>;

    /// Returns the label of the volume, if it has one.
    fn volume_label(&mut self) -> Option<String>;

    /// Checks if a file or directory exists.
    ///
    /// It makes no distinction between whether a file could not be verified to exist or a file that really
    /// does not exist. Both will return `false`.
    fn exists(&mut self, path: &str) -> bool {
        self.file_info(path).is_ok()
    }
}

/// A rust-ier wrapper around [`SimpleFileSystem`].
///
/// This is similar to [`uefi::fs::FileSystem`], with different design decisions.
pub struct UefiFileSystem(ScopedProtocol<SimpleFileSystem>);

impl UefiFileSystem {
    /// Create a new [`UefiFileSystem`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(fs: ScopedProtocol<SimpleFileSystem>) -> Self {
        Self(fs)
    }

    /// Create a new [`UefiFileSystem`] from a handle that supports [`SimpleFileSystem`].
    ///
    /// # Errors
    ///
    /// May return an `Error` if the handle does not actually support [`SimpleFileSystem`].
    pub fn from_handle(handle: Handle) -> BootResult<Self> {
        let fs = boot::open_protocol_exclusive(handle)?;
        Ok(Self(fs))
    }

    /// Create a new [`UefiFileSystem`] from the same filesystem as the boot manager.
    ///
    /// This is mainly used when the boot manager wants to read from a file on the same filesystem as itself (for
    /// example, the `ScanConfig` file).
    ///
    /// # Errors
    ///
    /// May return an `Error` if the boot image's filesystem does not support [`SimpleFileSystem`] for some reason.
    pub fn from_image_fs() -> BootResult<Self> {
        let fs = boot::get_image_file_system(boot::image_handle())?;
        Ok(Self(fs))
    }

    /// Gets a handle to a [`RegularFile`] in the filesystem.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume couldn't be opened, or the path does not point to a file.
    fn get_regular_file(&mut self, path: &str) -> Result<RegularFile, FsError> {
        let path = to_uefi_path(path)?;
        let mut root = self
            .0
            .open_volume()
            .map_err(|e| FsError::OpenErr(e.status()))?;
        root.open(&path, FileMode::Read, FileAttribute::empty())
            .map_err(|e| FsError::OpenErr(e.status()))?
            .into_regular_file()
            .ok_or(FsError::OpenErr(Status::INVALID_PARAMETER))
    }

    /// Gets a handle to a [`Directory`] in the filesystem. The empty path opens the root directory.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the volume couldn't be opened, or the path does not point to a folder.
    fn get_directory(&mut self, path: &str) -> Result<Directory, FsError> {
        let mut root = self
            .0
            .open_volume()
            .map_err(|e| FsError::OpenErr(e.status()))?;
        if normalize_path(path).is_empty() {
            return Ok(root);
        }

        let path = to_uefi_path(path)?;
        root.open(&path, FileMode::Read, FileAttribute::empty())
            .map_err(|e| FsError::OpenErr(e.status()))?
            .into_directory()
            .ok_or(FsError::OpenErr(Status::INVALID_PARAMETER))
    }
}

impl VolumeFs for UefiFileSystem {
    fn read_dir(&mut self, dir: &str) -> Result<Vec<DirEntry>, FsError> {
        let dir = self.get_directory(dir)?;
        Ok(UefiDirectoryIter::new(dir)
            .filter_map(Result::ok)
            .filter(|x| !COMMON_SKIP_DIRS.contains(&x.file_name())) // excludes "." and ".."
            .map(|x| info_to_entry(&x))
            .collect())
    }

    fn file_info(&mut self, path: &str) -> Result<DirEntry, FsError> {
        let path = to_uefi_path(path)?;
        let mut root = self
            .0
            .open_volume()
            .map_err(|e| FsError::OpenErr(e.status()))?;
        let mut file = root
            .open(&path, FileMode::Read, FileAttribute::empty())
            .map_err(|e| FsError::OpenErr(e.status()))?;
        let info = file
            .get_boxed_info::<FileInfo>()
            .map_err(|e| FsError::ReadErr(e.status()))?;
        Ok(info_to_entry(&info))
    }

    fn read_header(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, FsError> {
        let mut file = self.get_regular_file(path)?;
        file.read(buf).map_err(|e| FsError::ReadErr(e.status()))
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>, FsError> {
        let mut file = self.get_regular_file(path)?;

        let info = file
            .get_boxed_info::<FileInfo>()
            .map_err(|e| FsError::ReadErr(e.status()))?;

        let size = usize::try_from(info.file_size()).unwrap_or(ONE_GIGABYTE);

        let mut buf = vec![0; size];
        let read = file
            .read(&mut buf)
            .map_err(|e| FsError::ReadErr(e.status()))?;
        if read != size {
            return Err(FsError::BufTooSmall(size));
        }

        Ok(buf)
    }

    fn volume_label(&mut self) -> Option<String> {
        let mut root = self.0.open_volume().ok()?;
        let info = root.get_boxed_info::<FileSystemVolumeLabel>().ok()?;
        let label = String::from(info.volume_label());
        (!label.is_empty()).then_some(label)
    }
}

/// Converts a canonical path into the absolute form that [`SimpleFileSystem`] expects.
///
/// # Errors
///
/// May return an `Error` if the path contains characters that cannot be represented in UCS-2.
fn to_uefi_path(path: &str) -> Result<CString16, FsError> {
    let absolute = alloc::format!("\\{}", normalize_path(path));
    str_to_cstr(&absolute).map_err(|_| FsError::InvalidPath(path.to_owned()))
}

/// Converts a [`FileInfo`] into a [`DirEntry`].
fn info_to_entry(info: &FileInfo) -> DirEntry {
    DirEntry {
        name: String::from(info.file_name()),
        size: info.file_size(),
        modified: Timestamp::from_uefi(info.modification_time()),
        is_dir: info.attribute().contains(FileAttribute::DIRECTORY),
    }
}

/// Boxes a [`UefiFileSystem`] behind the [`VolumeFs`] trait.
pub(crate) fn boxed(fs: UefiFileSystem) -> Box<dyn VolumeFs> {
    Box::new(fs)
}
