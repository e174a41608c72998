// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! An in-memory [`VolumeFs`] for host side tests.

use std::collections::BTreeMap;

use uefi::Status;

use super::{DirEntry, FsError, VolumeFs};
use crate::system::{
    helper::{basename, normalize_path},
    time::Timestamp,
};

/// One file of a [`MemFs`].
#[derive(Clone, Debug)]
struct MemFile {
    /// The path with its original casing.
    path: String,

    /// The content.
    data: Vec<u8>,

    /// The modification time.
    modified: Timestamp,

    /// The size reported by directory listings, when it should differ from the real size.
    listed_size: Option<u64>,

    /// Reads of the content fail.
    unreadable: bool,
}

/// A volume whose files live in a map, keyed by lower case canonical path.
#[derive(Clone, Debug, Default)]
pub(crate) struct MemFs {
    /// The files.
    files: BTreeMap<String, MemFile>,

    /// The volume label.
    label: Option<String>,

    /// How many whole file reads happened.
    pub(crate) full_reads: usize,
}

impl MemFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_owned());
        self
    }

    pub(crate) fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.add(path, data, Timestamp::default());
        self
    }

    pub(crate) fn file_at(mut self, path: &str, data: &[u8], modified: Timestamp) -> Self {
        self.add(path, data, modified);
        self
    }

    /// Makes the directory listing report a different size than opening the file does, which is how a symbolic link
    /// looks from firmware.
    pub(crate) fn symlink_like(mut self, path: &str) -> Self {
        if let Some(file) = self.files.get_mut(&key(path)) {
            file.listed_size = Some(file.data.len() as u64 + 1);
        }
        self
    }

    pub(crate) fn unreadable(mut self, path: &str) -> Self {
        if let Some(file) = self.files.get_mut(&key(path)) {
            file.unreadable = true;
        }
        self
    }

    fn add(&mut self, path: &str, data: &[u8], modified: Timestamp) {
        self.files.insert(
            key(path),
            MemFile {
                path: normalize_path(path),
                data: data.to_vec(),
                modified,
                listed_size: None,
                unreadable: false,
            },
        );
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = format!("{}\\", key(path));
        key(path).is_empty() || self.files.keys().any(|x| x.starts_with(&prefix))
    }
}

fn key(path: &str) -> String {
    normalize_path(path).to_ascii_lowercase()
}

impl VolumeFs for MemFs {
    fn read_dir(&mut self, dir: &str) -> Result<Vec<DirEntry>, FsError> {
        if !self.is_dir(dir) {
            return Err(FsError::OpenErr(Status::NOT_FOUND));
        }
        let dir = key(dir);

        let mut entries: Vec<DirEntry> = Vec::new();
        for (file_key, file) in &self.files {
            let rest = if dir.is_empty() {
                file_key.as_str()
            } else if let Some(rest) = file_key.strip_prefix(&format!("{dir}\\")) {
                rest
            } else {
                continue;
            };

            let original_rest = &file.path[file.path.len() - rest.len()..];
            if let Some((sub, _)) = original_rest.split_once('\\') {
                if !entries.iter().any(|x| x.name.eq_ignore_ascii_case(sub)) {
                    entries.push(DirEntry {
                        name: sub.to_owned(),
                        size: 0,
                        modified: Timestamp::default(),
                        is_dir: true,
                    });
                }
            } else {
                entries.push(DirEntry {
                    name: original_rest.to_owned(),
                    size: file.listed_size.unwrap_or(file.data.len() as u64),
                    modified: file.modified,
                    is_dir: false,
                });
            }
        }
        Ok(entries)
    }

    fn file_info(&mut self, path: &str) -> Result<DirEntry, FsError> {
        if let Some(file) = self.files.get(&key(path)) {
            return Ok(DirEntry {
                name: basename(&file.path).to_owned(),
                size: file.data.len() as u64,
                modified: file.modified,
                is_dir: false,
            });
        }
        if self.is_dir(path) && !key(path).is_empty() {
            return Ok(DirEntry {
                name: basename(&normalize_path(path)).to_owned(),
                size: 0,
                modified: Timestamp::default(),
                is_dir: true,
            });
        }
        Err(FsError::OpenErr(Status::NOT_FOUND))
    }

    fn read_header(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, FsError> {
        let file = self
            .files
            .get(&key(path))
            .ok_or(FsError::OpenErr(Status::NOT_FOUND))?;
        if file.unreadable {
            return Err(FsError::ReadErr(Status::DEVICE_ERROR));
        }
        let len = buf.len().min(file.data.len());
        buf[..len].copy_from_slice(&file.data[..len]);
        Ok(len)
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>, FsError> {
        self.full_reads += 1;
        let file = self
            .files
            .get(&key(path))
            .ok_or(FsError::OpenErr(Status::NOT_FOUND))?;
        if file.unreadable {
            return Err(FsError::ReadErr(Status::DEVICE_ERROR));
        }
        Ok(file.data.clone())
    }

    fn volume_label(&mut self) -> Option<String> {
        self.label.clone()
    }
}

/// Builds a minimal PE header that passes executable validation for the given machine tag.
pub(crate) fn pe_image(machine: u16, body: &[u8]) -> Vec<u8> {
    let mut image = vec![0u8; 512];
    image[0] = b'M';
    image[1] = b'Z';
    image[0x3c..0x40].copy_from_slice(&0x80u32.to_le_bytes());
    image[0x80..0x84].copy_from_slice(b"PE\0\0");
    image[0x84..0x86].copy_from_slice(&machine.to_le_bytes());
    image.extend_from_slice(body);
    image
}
