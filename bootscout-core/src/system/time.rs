// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! File timestamps.
//!
//! Loaders found in one directory are ordered newest first. UEFI hands out modification times as a broken down
//! [`uefi::runtime::Time`], which does not order on its own, so it is packed into a [`Timestamp`] that compares the way
//! the calendar does.

use alloc::{format, string::String};

/// A sortable modification time.
///
/// The fields are packed from most to least significant (year, month, day, hour, minute, second), so the natural
/// integer order is the chronological order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Builds a [`Timestamp`] from calendar parts.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn from_parts(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self(
            (year as u64) << 40
                | (month as u64) << 32
                | (day as u64) << 24
                | (hour as u64) << 16
                | (minute as u64) << 8
                | second as u64,
        )
    }

    /// Converts a firmware time into a [`Timestamp`]. The time zone and daylight fields are ignored.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_uefi(time: &uefi::runtime::Time) -> Self {
        Self::from_parts(
            time.year(),
            time.month(),
            time.day(),
            time.hour(),
            time.minute(),
            time.second(),
        )
    }

    /// The year.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn year(self) -> u16 {
        (self.0 >> 40) as u16
    }

    /// The month, starting from 1.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn month(self) -> u8 {
        (self.0 >> 32) as u8
    }

    /// The day of the month, starting from 1.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn day(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Formats the date part as `YYYY-MM-DD`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn date_string(self) -> String {
        format!("{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_chronologically() {
        let older = Timestamp::from_parts(2023, 12, 31, 23, 59, 59);
        let newer = Timestamp::from_parts(2024, 1, 1, 0, 0, 0);
        assert!(older < newer);
        assert!(Timestamp::from_parts(2024, 1, 1, 0, 0, 1) > newer);
    }

    #[test]
    fn formats_date() {
        let ts = Timestamp::from_parts(2024, 3, 7, 10, 0, 0);
        assert_eq!(ts.date_string(), "2024-03-07");
    }
}
