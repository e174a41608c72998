// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`MenuModel`], the ordered list of targets shown to the user.
//!
//! The sources are merged in a fixed order: manual entries, EFI loaders and legacy records for internal, external
//! and optical media, network boot, then the boot options of the firmware. Tools follow, and the built-in actions
//! come last. The model is rebuilt on every rescan and never changed in place.

use alloc::vec::Vec;

use log::{debug, info, warn};

use crate::{
    boot::launch::PREVIOUS_BOOT,
    policy::{ScanSource, config::ScanConfig},
    scan::{
        ScanSession, directory::scan_volume_loaders, firmware::scan_firmware_defined, legacy::scan_legacy,
        tools::{scan_network, scan_tools},
    },
    system::{
        helper::contains_ignore_case,
        variable::{BOOTSCOUT_VENDOR, VariableStore, get_variable_str},
    },
    target::{DiscoveredTarget, MenuRow, TargetKind},
    volume::{VolumeCatalog, VolumeKind},
};

/// The order in which the sources are merged.
const SOURCE_ORDER: [ScanSource; 9] = [
    ScanSource::Manual,
    ScanSource::Internal,
    ScanSource::InternalLegacy,
    ScanSource::External,
    ScanSource::ExternalLegacy,
    ScanSource::Optical,
    ScanSource::OpticalLegacy,
    ScanSource::Network,
    ScanSource::Firmware,
];

/// The most targets that get a digit shortcut.
const MAX_DIGIT_SHORTCUTS: usize = 10;

/// Offers the EFI loaders of every scannable volume of one kind.
fn scan_loaders(session: &ScanSession, catalog: &dyn VolumeCatalog, kind: VolumeKind) -> Vec<DiscoveredTarget> {
    let filter = session.filter();
    let mut targets = Vec::new();
    for volume in catalog.volumes().iter().filter(|x| x.kind == kind && x.has_fs) {
        if !filter.should_scan_volume(volume) {
            debug!("Skipping {}", volume.display_name());
            continue;
        }
        let Some(mut fs) = catalog.open_fs(volume) else {
            continue;
        };
        targets.extend(scan_volume_loaders(session, volume, fs.as_mut()));
    }
    targets
}

/// Runs the scanner of one source.
fn scan_source(
    session: &ScanSession,
    catalog: &dyn VolumeCatalog,
    vars: &dyn VariableStore,
    source: ScanSource,
) -> Vec<DiscoveredTarget> {
    match source {
        ScanSource::Manual => Vec::new(),
        ScanSource::Internal => scan_loaders(session, catalog, VolumeKind::Internal),
        ScanSource::External => scan_loaders(session, catalog, VolumeKind::External),
        ScanSource::Optical => scan_loaders(session, catalog, VolumeKind::Optical),
        ScanSource::InternalLegacy => scan_legacy(session, catalog, vars, VolumeKind::Internal),
        ScanSource::ExternalLegacy => scan_legacy(session, catalog, vars, VolumeKind::External),
        ScanSource::OpticalLegacy => scan_legacy(session, catalog, vars, VolumeKind::Optical),
        ScanSource::Network => scan_network(session, catalog).into_iter().collect(),
        ScanSource::Firmware => scan_firmware_defined(
            vars,
            &session.policy,
            MenuRow::Main,
            None,
            session.self_location.as_ref().map(|x| x.path.as_str()),
        ),
    }
}

/// Appends targets, dropping loaders that are already present.
fn push_unique(targets: &mut Vec<DiscoveredTarget>, found: impl IntoIterator<Item = DiscoveredTarget>) {
    for target in found {
        if targets.iter().any(|x| x.same_loader(&target)) {
            debug!("Dropping duplicate target {}", target.title);
            continue;
        }
        targets.push(target);
    }
}

/// Gives the digits `1` to `9`, then `0`, to the leading run of main row targets.
fn assign_digits(targets: &mut [DiscoveredTarget]) {
    for target in targets.iter_mut() {
        target.shortcut_digit = None;
    }
    let leading = targets
        .iter_mut()
        .take_while(|x| x.row == MenuRow::Main)
        .take(MAX_DIGIT_SHORTCUTS);
    for (i, target) in (1u32..).zip(leading) {
        target.shortcut_digit = char::from_digit(i % 10, 10);
    }
}

/// Picks the default target.
///
/// `+` selects the target booted last time. Any other value selects the first target whose title contains it.
fn default_index(targets: &[DiscoveredTarget], selection: Option<&str>, vars: &dyn VariableStore) -> usize {
    let Some(selection) = selection.filter(|x| !x.is_empty()) else {
        return 0;
    };

    if selection == "+" {
        let previous = match get_variable_str(vars, PREVIOUS_BOOT, &BOOTSCOUT_VENDOR) {
            Ok(previous) => previous,
            Err(e) => {
                warn!("{e}");
                None
            }
        };
        return previous
            .and_then(|previous| targets.iter().position(|x| x.title == previous))
            .unwrap_or(0);
    }

    targets
        .iter()
        .position(|x| contains_ignore_case(&x.title, selection))
        .unwrap_or(0)
}

/// The ordered, de-duplicated menu of one discovery pass.
#[derive(Clone, Debug, Default)]
pub struct MenuModel {
    /// The targets, in menu order.
    targets: Vec<DiscoveredTarget>,

    /// The index of the default target.
    default_index: usize,

    /// The timeout in seconds before the default target is started.
    timeout: i64,
}

impl MenuModel {
    /// Runs every enabled scanner and assembles the menu.
    ///
    /// `manual` holds the entries the caller supplies, such as parsed manual stanzas. They come first when the
    /// `manual` source is enabled.
    #[must_use = "Has no effect if the result is unused"]
    pub fn assemble(
        config: &ScanConfig,
        session: &ScanSession,
        catalog: &dyn VolumeCatalog,
        vars: &dyn VariableStore,
        manual: Vec<DiscoveredTarget>,
    ) -> Self {
        let mut targets = Vec::new();
        let mut manual = Some(manual);

        for source in SOURCE_ORDER {
            if !session.policy.scans(source) {
                continue;
            }
            let found = if source == ScanSource::Manual {
                manual.take().unwrap_or_default()
            } else {
                scan_source(session, catalog, vars, source)
            };
            debug!("{source:?} offered {} targets", found.len());
            push_unique(&mut targets, found);
        }

        let (actions, tools): (Vec<_>, Vec<_>) = scan_tools(session, catalog, vars)
            .into_iter()
            .partition(|x| matches!(x.kind, TargetKind::Action(_)));
        push_unique(&mut targets, tools);
        push_unique(&mut targets, actions);

        assign_digits(&mut targets);
        let default_index = default_index(&targets, config.default_selection.as_deref(), vars);
        info!("Assembled a menu of {} targets", targets.len());

        Self {
            targets,
            default_index,
            timeout: config.timeout,
        }
    }

    /// Builds a menu from targets that were already discovered.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_targets(mut targets: Vec<DiscoveredTarget>, default_index: usize, timeout: i64) -> Self {
        assign_digits(&mut targets);
        Self {
            default_index: if default_index < targets.len() { default_index } else { 0 },
            targets,
            timeout,
        }
    }

    /// The targets, in menu order.
    #[must_use = "Has no effect if the result is unused"]
    pub fn targets(&self) -> &[DiscoveredTarget] {
        &self.targets
    }

    /// Gets a target by index.
    #[must_use = "Has no effect if the result is unused"]
    pub fn get(&self, index: usize) -> Option<&DiscoveredTarget> {
        self.targets.get(index)
    }

    /// The number of targets.
    #[must_use = "Has no effect if the result is unused"]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Checks if the menu has no targets.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The index of the default target.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn default_index(&self) -> usize {
        self.default_index
    }

    /// The timeout in seconds. A negative timeout waits forever.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn timeout(&self) -> i64 {
        self.timeout
    }

    /// Finds the target selected by a key. Digits are checked first, then letters, case insensitively.
    #[must_use = "Has no effect if the result is unused"]
    pub fn by_shortcut(&self, key: char) -> Option<usize> {
        if key.is_ascii_digit() {
            return self.targets.iter().position(|x| x.shortcut_digit == Some(key));
        }
        let key = key.to_ascii_uppercase();
        self.targets
            .iter()
            .position(|x| x.shortcut_letter == Some(key))
    }
}
