// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Device path helpers.
//!
//! Device paths are kept as owned bytes wherever they are stored: inside `Boot####` load options, in discovered
//! targets and as candidate paths of the legacy loader. They are built with [`DevicePathBuilder`] and read back
//! through [`DevicePath`] and [`DevicePathNodeEnum`].

use alloc::{format, string::String, vec::Vec};
use core::fmt::Write;

use thiserror::Error;
use uefi::proto::device_path::{
    DevicePath, DevicePathNode, DevicePathNodeEnum,
    build::{self, BuildError, BuildNode, DevicePathBuilder},
    media::PartitionFormat,
};

use crate::system::helper::{StrError, normalize_path, str_to_cstr};

/// The end node that terminates every device path.
pub const END_NODE: [u8; 4] = [0x7f, 0xff, 0x04, 0x00];

/// An `Error` that may result from handling a device path.
#[derive(Error, Debug)]
pub enum DevicePathError {
    /// The bytes could not be interpreted as a device path.
    #[error("Could not convert bytes into a DevicePath")]
    Convert,

    /// A device path could not be built.
    #[error("Could not build a DevicePath: {0:?}")]
    Build(BuildError),

    /// A file path could not be converted into UCS-2.
    #[error("Invalid file path in DevicePath: {0}")]
    Str(#[from] StrError),
}

impl From<BuildError> for DevicePathError {
    fn from(value: BuildError) -> Self {
        Self::Build(value)
    }
}

/// Reinterprets bytes as a [`DevicePath`].
///
/// # Errors
///
/// May return an `Error` if the bytes are not a well formed device path.
pub fn as_device_path(bytes: &[u8]) -> Result<&DevicePath, DevicePathError> {
    <&DevicePath>::try_from(bytes).map_err(|_| DevicePathError::Convert)
}

/// Copies a [`DevicePath`] into owned bytes, including the end node.
#[must_use = "Has no effect if the result is unused"]
pub fn to_bytes(device_path: &DevicePath) -> Vec<u8> {
    device_path.as_bytes().to_vec()
}

/// Walks the nodes of a device path, excluding the end node. A malformed path has no nodes.
pub fn nodes(path: &[u8]) -> impl Iterator<Item = &DevicePathNode> {
    as_device_path(path).into_iter().flat_map(DevicePath::node_iter)
}

/// Walks the nodes of a device path that the firmware library knows the layout of.
pub fn node_enums(path: &[u8]) -> impl Iterator<Item = DevicePathNodeEnum<'_>> {
    nodes(path).filter_map(|x| x.as_enum().ok())
}

/// Returns the first node of a device path, if it is well formed.
#[must_use = "Has no effect if the result is unused"]
pub fn first_node(path: &[u8]) -> Option<DevicePathNodeEnum<'_>> {
    nodes(path).next().and_then(|x| x.as_enum().ok())
}

/// Builds a device path from existing nodes followed by new ones.
///
/// # Errors
///
/// May return an `Error` if a node could not be pushed.
pub fn build_path<'a>(
    prefix: impl IntoIterator<Item = &'a DevicePathNode>,
    tail: &[&dyn BuildNode],
) -> Result<Vec<u8>, DevicePathError> {
    let mut buf = Vec::new();
    let mut builder = DevicePathBuilder::with_vec(&mut buf);
    for node in prefix {
        builder = builder.push(&node)?;
    }
    for node in tail {
        builder = builder.push(*node)?;
    }
    builder.finalize()?;
    Ok(buf)
}

/// Appends a file path node to the device path of a volume. The leading backslash is added here.
///
/// # Errors
///
/// May return an `Error` if the path is not valid UCS-2, or if the volume path is malformed.
pub fn join_file_path(volume_path: &[u8], path: &str) -> Result<Vec<u8>, DevicePathError> {
    let volume = as_device_path(volume_path)?;
    let path_name = str_to_cstr(&format!("\\{}", normalize_path(path)))?;
    build_path(
        volume.node_iter(),
        &[&build::media::FilePath {
            path_name: &path_name,
        }],
    )
}

/// Removes the last node of a device path, producing the path of the parent device.
///
/// Returns [`None`] if the path has no nodes or is malformed.
#[must_use = "Has no effect if the result is unused"]
pub fn parent(path: &[u8]) -> Option<Vec<u8>> {
    let nodes: Vec<_> = nodes(path).collect();
    let (_, rest) = nodes.split_last()?;
    build_path(rest.iter().copied(), &[]).ok()
}

/// Extracts the text of every file path node in a device path, joined into one canonical path.
#[must_use = "Has no effect if the result is unused"]
pub fn file_path_text(path: &[u8]) -> Option<String> {
    let parts: Vec<String> = node_enums(path)
        .filter_map(|x| match x {
            DevicePathNodeEnum::MediaFilePath(file) => file.path_name().to_cstring16().ok(),
            _ => None,
        })
        .map(|x| String::from(&x))
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(normalize_path(&parts.join("\\")))
}

/// Renders a device path as text, one `type.subtype-data` group per node with the data in hex, joined by `/`.
///
/// Returns [`None`] if the path has no nodes or is malformed. The text has no commas or colons, so it can be kept in
/// a tag list without being read as a list separator or a volume qualifier.
#[must_use = "Has no effect if the result is unused"]
pub fn path_text(path: &[u8]) -> Option<String> {
    let mut text = String::new();
    for node in nodes(path) {
        if !text.is_empty() {
            text.push('/');
        }
        let _ = write!(text, "{:02x}.{:02x}-", node.device_type().0, node.sub_type().0);
        for byte in node.data() {
            let _ = write!(text, "{byte:02x}");
        }
    }
    (!text.is_empty()).then_some(text)
}

/// Returns the zero based MBR partition index described by the hard drive node of a path, if the partition lives on
/// an MBR formatted disk.
#[must_use = "Has no effect if the result is unused"]
pub fn mbr_partition_index(path: &[u8]) -> Option<usize> {
    let drive = node_enums(path).find_map(|x| match x {
        DevicePathNodeEnum::MediaHardDrive(drive) => Some(drive),
        _ => None,
    })?;
    if drive.partition_format() != PartitionFormat::MBR {
        return None;
    }
    usize::try_from(drive.partition_number()).ok()?.checked_sub(1)
}
