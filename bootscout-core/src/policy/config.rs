// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`ScanConfig`], the configuration file of the boot manager.
//!
//! This parses space separated key value pairs. Lists are comma separated, and a list whose first element is `+`
//! is appended to the default list instead of replacing it.
//!
//! Example configuration:
//!
//! ```text
//! # Seconds before the default target is launched
//! timeout 10
//!
//! # Select the last booted target, or a target whose title contains this text
//! default_selection +
//!
//! # Sources to scan, in menu order
//! scanfor internal,external,optical,hdbios,firmware
//!
//! # Keep the defaults and also skip this loader
//! dont_scan_files +,grubx64.efi
//!
//! # Volumes that are never scanned, by filesystem label, partition name or unique GUID
//! dont_scan_volumes "Recovery HD",LRS_ESP
//!
//! # Tools shown on the second row
//! showtools shell,memtest,shutdown,reboot,firmware
//! ```

use alloc::{borrow::ToOwned, string::String, vec::Vec};

use log::warn;
use thiserror::Error;

use crate::{
    policy::{GraphicsFor, ScanPolicy, ScanSource, ToolKind, tags::TagList},
    system::fs::{UefiFileSystem, VolumeFs},
};

/// The hardcoded configuration path for the [`ScanConfig`].
pub const CONFIG_PATH: &str = "loader\\bootscout.conf";

/// Configuration files above this size are not read.
const MAX_CONFIG_SIZE: usize = 64 * 1024;

/// An `Error` that may result from parsing the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file was not valid UTF-8.
    #[error("Configuration file is not valid UTF-8")]
    NotUtf8(#[from] core::str::Utf8Error),

    /// The configuration file was too large to be read.
    #[error("Configuration file is {0} bytes, which is over the limit")]
    TooLarge(usize),
}

/// The configuration file for the boot manager.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// The timeout in seconds before the default target is selected. Negative values wait forever.
    pub timeout: i64,

    /// The default selection. `+` selects the previously booted target.
    pub default_selection: Option<String>,

    /// Whether the hidden target variables are merged into the scan policy.
    pub use_hidden_tags: bool,

    /// The declared scan policy, before hidden targets are merged in.
    pub policy: ScanPolicy,
}

impl ScanConfig {
    /// Creates a new [`ScanConfig`] from the configuration file on the boot manager's own volume.
    ///
    /// A missing or unreadable configuration file yields the default configuration.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new() -> Self {
        let mut fs = match UefiFileSystem::from_image_fs() {
            Ok(fs) => fs,
            Err(e) => {
                warn!("Could not open the boot manager volume: {e}");
                return Self::default();
            }
        };
        Self::from_fs(&mut fs)
    }

    /// Reads the configuration file from a filesystem.
    pub fn from_fs(fs: &mut dyn VolumeFs) -> Self {
        if !fs.exists(CONFIG_PATH) {
            return Self::default();
        }

        let content = match fs.read(CONFIG_PATH) {
            Ok(content) => content,
            Err(e) => {
                warn!("{e}");
                return Self::default();
            }
        };

        Self::parse(&content).unwrap_or_else(|e| {
            warn!("{e}");
            Self::default()
        })
    }

    /// Parses the contents of a [`ScanConfig`] format file.
    ///
    /// Unknown keys are ignored, and a malformed value leaves the default in place.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the content is too large or is not valid UTF-8.
    pub fn parse(content: &[u8]) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_SIZE {
            return Err(ConfigError::TooLarge(content.len()));
        }

        let mut config = Self::default();
        let content = str::from_utf8(content)?;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            let value = value.trim();
            let policy = &mut config.policy;

            match &*key.to_ascii_lowercase() {
                "timeout" => {
                    if let Ok(value) = value.parse() {
                        config.timeout = value;
                    }
                }
                "default_selection" => {
                    let value = value.trim_matches('"');
                    config.default_selection = (!value.is_empty()).then(|| value.to_owned());
                }
                "scanfor" => {
                    if let Some(sources) = parse_tokens(value, ScanSource::from_token) {
                        policy.scan_for = sources;
                    }
                }
                "showtools" => {
                    if let Some(tools) = parse_tokens(value, ToolKind::from_token) {
                        policy.show_tools = tools;
                    }
                }
                "graphics_for" => {
                    policy.graphics_for = TagList::parse(value)
                        .iter()
                        .filter_map(GraphicsFor::from_token)
                        .fold(GraphicsFor::empty(), |acc, x| acc | x);
                }
                "dont_scan_volumes" => apply_list(&mut policy.dont_scan_volumes, value),
                "dont_scan_dirs" => apply_list(&mut policy.dont_scan_dirs, value),
                "dont_scan_files" => apply_list(&mut policy.dont_scan_files, value),
                "dont_scan_tools" => apply_list(&mut policy.dont_scan_tools, value),
                "dont_scan_firmware" => apply_list(&mut policy.dont_scan_firmware, value),
                "also_scan_dirs" => apply_list(&mut policy.also_scan_dirs, value),
                "fold_linux_kernels" => set_bool(&mut policy.fold_linux_kernels, value),
                "scan_all_linux_kernels" => set_bool(&mut policy.scan_all_linux_kernels, value),
                "deep_legacy_scan" => set_bool(&mut policy.deep_legacy_scan, value),
                "group_preboot_volumes" => set_bool(&mut policy.group_preboot_volumes, value),
                "write_systemd_vars" => set_bool(&mut policy.write_systemd_vars, value),
                "spoof_os_version" => {
                    let value = value.trim_matches('"');
                    policy.spoof_os_version = (!value.is_empty()).then(|| value.to_owned());
                }
                "use_hidden_tags" => set_bool(&mut config.use_hidden_tags, value),
                _ => (),
            }
        }

        Ok(config)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: 20,
            default_selection: None,
            use_hidden_tags: true,
            policy: ScanPolicy::default(),
        }
    }
}

/// Replaces a list, or appends to it when the first element is `+`.
fn apply_list(list: &mut TagList, value: &str) {
    let parsed = TagList::parse(value);
    let mut tags = parsed.iter();
    if tags.next() == Some("+") {
        list.merge(&tags.collect());
    } else {
        drop(tags);
        *list = parsed;
    }
}

/// Parses a list of known tokens. Unknown tokens are skipped, and a list with no known token is rejected.
fn parse_tokens<T: PartialEq>(value: &str, from_token: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
    let mut items = Vec::new();
    for token in TagList::parse(value).iter() {
        match from_token(&token.to_ascii_lowercase()) {
            Some(item) if !items.contains(&item) => items.push(item),
            Some(_) => (),
            None => warn!("Unknown configuration token \"{token}\""),
        }
    }
    (!items.is_empty()).then_some(items)
}

/// Sets a boolean from the usual spellings, leaving it unchanged on anything else.
fn set_bool(target: &mut bool, value: &str) {
    match &*value.to_ascii_lowercase() {
        "true" | "on" | "yes" | "1" => *target = true,
        "false" | "off" | "no" | "0" => *target = false,
        _ => warn!("Invalid boolean \"{value}\""),
    }
}
