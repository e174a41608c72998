// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Target builder.

use alloc::{borrow::ToOwned, rc::Rc, string::String, vec::Vec};

use crate::{
    system::helper::normalize_path,
    target::{DiscoveredTarget, MenuRow, OsFamily, SubEntry, TargetKind},
    volume::Volume,
};

/// A builder to configure a [`DiscoveredTarget`]
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use bootscout_core::{
///     target::{MenuRow, OsFamily, builder::TargetBuilder},
///     volume::{Volume, VolumeId, VolumeKind},
/// };
///
/// let volume = Rc::new(Volume::new(VolumeId(0), VolumeKind::Internal));
/// let target = TargetBuilder::loader("Boot gdisk", volume, "EFI/tools/gdisk_x64.efi")
///     .row(MenuRow::Tools)
///     .os(OsFamily::Unknown)
///     .build();
///
/// assert_eq!(target.loader_path.as_deref(), Some("EFI\\tools\\gdisk_x64.efi"));
/// ```
#[must_use = "Has no effect if the result is unused"]
pub struct TargetBuilder {
    /// The inner [`DiscoveredTarget`] that the builder operates on.
    target: DiscoveredTarget,
}

impl TargetBuilder {
    /// Constructs a new target of a given kind.
    pub fn new(title: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            target: DiscoveredTarget {
                title: title.into(),
                kind,
                volume: None,
                loader_path: None,
                load_options: None,
                os: OsFamily::Unknown,
                icon_hints: Vec::new(),
                badge: None,
                graphics: false,
                sub_entries: Vec::new(),
                row: MenuRow::Main,
                shortcut_letter: None,
                shortcut_digit: None,
            },
        }
    }

    /// Constructs a new loader target on a volume. The badge of the volume kind is set as well.
    pub fn loader(title: impl Into<String>, volume: Rc<Volume>, path: &str) -> Self {
        let badge = volume.kind.badge();
        Self::new(title, TargetKind::Loader)
            .volume(volume)
            .loader_path(path)
            .badge(badge)
    }

    /// Sets the volume of a target.
    pub fn volume(mut self, volume: Rc<Volume>) -> Self {
        self.target.volume = Some(volume);
        self
    }

    /// Sets the loader path of a target. The path is normalized.
    pub fn loader_path(mut self, path: &str) -> Self {
        self.target.loader_path = Some(normalize_path(path));
        self
    }

    /// Sets the load options of a target.
    ///
    /// Empty options are the same as no options.
    pub fn load_options(mut self, options: impl Into<String>) -> Self {
        let options = options.into();
        self.target.load_options = (!options.is_empty()).then_some(options);
        self
    }

    /// Sets the OS family, and the letter shortcut that comes with it.
    pub fn os(mut self, os: OsFamily) -> Self {
        self.target.os = os;
        self.target.shortcut_letter = os.shortcut();
        self
    }

    /// Adds an icon hint, if it is not already present.
    pub fn icon_hint(mut self, hint: &str) -> Self {
        let hint = hint.to_ascii_lowercase();
        if !hint.is_empty() && !self.target.icon_hints.contains(&hint) {
            self.target.icon_hints.push(hint);
        }
        self
    }

    /// Adds several icon hints.
    pub fn icon_hints<'a>(self, hints: impl IntoIterator<Item = &'a str>) -> Self {
        hints.into_iter().fold(self, Self::icon_hint)
    }

    /// Sets the badge icon.
    pub fn badge(mut self, badge: &'static str) -> Self {
        self.target.badge = Some(badge);
        self
    }

    /// Sets whether the target starts in graphics mode.
    pub fn graphics(mut self, graphics: bool) -> Self {
        self.target.graphics = graphics;
        self
    }

    /// Adds a sub-entry.
    pub fn sub_entry(mut self, entry: SubEntry) -> Self {
        self.target.sub_entries.push(entry);
        self
    }

    /// Adds a sub-entry that only changes the load options.
    pub fn sub_options(self, title: &str, options: &str) -> Self {
        let graphics = self.target.graphics;
        self.sub_entry(SubEntry {
            title: title.to_owned(),
            load_options: Some(options.to_owned()),
            loader_path: None,
            graphics,
        })
    }

    /// Sets the menu row.
    pub fn row(mut self, row: MenuRow) -> Self {
        self.target.row = row;
        self
    }

    /// Overrides the letter shortcut.
    pub fn shortcut_letter(mut self, letter: Option<char>) -> Self {
        self.target.shortcut_letter = letter;
        self
    }

    /// Builds a [`DiscoveredTarget`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn build(self) -> DiscoveredTarget {
        self.target
    }
}
