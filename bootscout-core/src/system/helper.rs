// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Various helper functions for other modules.
//!
//! Paths inside the crate are kept in one canonical form: backslash separated, without a leading or trailing
//! backslash, so that `EFI\BOOT\bootx64.efi` names a file relative to the root of a volume and the empty string names
//! the root itself. Only the filesystem layer adds the leading backslash that UEFI expects.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use thiserror::Error;
use uefi::CString16;

/// An `Error` that may result from converting a [`String`] to another format.
#[derive(Error, Debug)]
pub enum StrError {
    /// A [`String`] could not be converted into a [`CString16`]
    #[error("Could not convert String to CString16")]
    CstrFromStr(#[from] uefi::data_types::FromStrError),

    /// A UCS-2 buffer did not contain valid characters.
    #[error("Could not decode a UCS-2 string")]
    Ucs2Decode,
}

/// The CPU architecture a loader is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    /// 32-bit x86.
    Ia32,

    /// x86-64.
    X64,

    /// 32-bit ARM.
    Arm,

    /// 64-bit ARM.
    Aa64,
}

impl Arch {
    /// Gets the architecture the boot manager binary was built for.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn current() -> Option<Self> {
        if cfg!(target_arch = "x86") {
            Some(Self::Ia32)
        } else if cfg!(target_arch = "x86_64") {
            Some(Self::X64)
        } else if cfg!(target_arch = "arm") {
            Some(Self::Arm)
        } else if cfg!(target_arch = "aarch64") {
            Some(Self::Aa64)
        } else {
            None
        }
    }

    /// The suffix used in architecture specific file names, like `bootx64.efi` or `shellaa64.efi`.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn efi_suffix(self) -> &'static str {
        match self {
            Self::Ia32 => "ia32",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Aa64 => "aa64",
        }
    }

    /// The PE/COFF machine tag of executables built for this architecture.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn pe_machine(self) -> u16 {
        match self {
            Self::Ia32 => object::pe::IMAGE_FILE_MACHINE_I386,
            Self::X64 => object::pe::IMAGE_FILE_MACHINE_AMD64,
            Self::Arm => object::pe::IMAGE_FILE_MACHINE_THUMB,
            Self::Aa64 => object::pe::IMAGE_FILE_MACHINE_ARM64,
        }
    }

    /// The path of the removable media fallback loader, such as `EFI\BOOT\bootx64.efi`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn fallback_path(self) -> String {
        alloc::format!("EFI\\BOOT\\{}", self.fallback_name())
    }

    /// The file name of the removable media fallback loader, such as `bootx64.efi`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn fallback_name(self) -> String {
        alloc::format!("boot{}.efi", self.efi_suffix())
    }
}

/// Gets a [`CString16`] from an [`&str`].
///
/// # Errors
///
/// May return an `Error` if the string could not be converted into a [`CString16`], either due to unsupported
/// characters or an invalid nul character.
pub(crate) fn str_to_cstr(str: &str) -> Result<CString16, StrError> {
    Ok(CString16::try_from(str)?)
}

/// Decodes a little endian UCS-2 byte buffer into a [`String`], stopping at the first nul character.
///
/// # Errors
///
/// May return an `Error` if the buffer contains unpaired surrogates.
pub fn ucs2_bytes_to_string(bytes: &[u8]) -> Result<String, StrError> {
    let units = bytes
        .chunks_exact(2)
        .map(|x| u16::from_le_bytes([x[0], x[1]]))
        .take_while(|&x| x != 0);
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| StrError::Ucs2Decode)
}

/// Encodes a string into little endian UCS-2 bytes with a nul terminator.
#[must_use = "Has no effect if the result is unused"]
pub fn string_to_ucs2_bytes(str: &str) -> Vec<u8> {
    str.encode_utf16()
        .chain(core::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Normalizes a path into the canonical form used by the crate.
///
/// Forward slashes become backslashes, repeated separators collapse into one, and leading or trailing separators
/// are removed.
#[must_use = "Has no effect if the result is unused"]
pub fn normalize_path(path: &str) -> String {
    path.split(['\\', '/'])
        .filter(|x| !x.is_empty())
        .collect::<Vec<_>>()
        .join("\\")
}

/// Joins a directory and a file name into a canonical path.
#[must_use = "Has no effect if the result is unused"]
pub fn join_path(dir: &str, name: &str) -> String {
    normalize_path(&alloc::format!("{dir}\\{name}"))
}

/// Returns the last component of a path.
#[must_use = "Has no effect if the result is unused"]
pub fn basename(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Returns everything but the last component of a path, or an empty string for a file in the root.
#[must_use = "Has no effect if the result is unused"]
pub fn dirname(path: &str) -> String {
    let path = normalize_path(path);
    path.rsplit_once('\\')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default()
}

/// Returns the extension of a file name including the dot, or an empty string.
#[must_use = "Has no effect if the result is unused"]
pub fn extension(name: &str) -> &str {
    name.rfind('.').map_or("", |idx| &name[idx..])
}

/// Case insensitive substring check.
#[must_use = "Has no effect if the result is unused"]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// Case insensitive comparison of two paths after normalization.
#[must_use = "Has no effect if the result is unused"]
pub fn path_eq(a: &str, b: &str) -> bool {
    normalize_path(a).eq_ignore_ascii_case(&normalize_path(b))
}

/// Matches a file name against a wildcard pattern, ignoring ASCII case.
///
/// `*` matches any run of characters and `?` matches exactly one.
#[must_use = "Has no effect if the result is unused"]
pub fn wildcard_match(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().map(|x| x.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|x| x.to_ascii_lowercase()).collect();

    let (mut n, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            n += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, n));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&x| x == '*')
}

/// Matches a file name against any of a list of wildcard patterns.
#[must_use = "Has no effect if the result is unused"]
pub fn wildcard_match_any(name: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| wildcard_match(name, pattern))
}
