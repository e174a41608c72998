// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Simple UEFI backend for the [`log`] crate.
//!
//! Discovery logs every candidate it turns down: policy exclusions at `trace`, header validation failures at
//! `debug`, and media or launch failures at `warn` and `error`. The frontends pick how much of that reaches the
//! console through the level given to [`UefiLogger::new`].

use core::fmt::Write;

use alloc::boxed::Box;
use log::{LevelFilter, Metadata, Record};
use uefi::{runtime, system::with_stdout};

/// A simple logging backend for UEFI.
pub struct UefiLogger {
    /// The most verbose level that gets printed.
    level: LevelFilter,
}

impl UefiLogger {
    /// Constructs a new [`UefiLogger`] printing records up to `level`.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Constructs a new [`UefiLogger`], then immediately leaks it so that it can be used with `set_logger`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn static_new(level: LevelFilter) -> &'static Self {
        Box::leak(Box::new(Self::new(level)))
    }

    /// Installs this logger as the global logger and sets the matching max level.
    ///
    /// Does nothing if a logger was already installed.
    pub fn install(&'static self) {
        if log::set_logger(self).is_ok() {
            log::set_max_level(self.level);
        }
    }
}

impl Default for UefiLogger {
    fn default() -> Self {
        Self::new(LevelFilter::Info)
    }
}

impl log::Log for UefiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let time = runtime::get_time().unwrap_or(runtime::Time::invalid());
            let level = record.level();
            let file = record.file().unwrap_or_default();
            let line = record.line().unwrap_or_default();
            let args = record.args();
            with_stdout(|stdout| {
                let _ = stdout.write_fmt(format_args!("[{time} {level} {file}:{line}] - {args}\n"));
            });
        }
    }

    fn flush(&self) {}
}
