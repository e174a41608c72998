// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`TagList`], the comma separated lists used by every exclusion setting.

use alloc::{
    borrow::ToOwned,
    string::{String, ToString},
    vec::Vec,
};

use crate::system::helper::contains_ignore_case;

/// An ordered list of tags compared without regard to ASCII case.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagList(Vec<String>);

impl TagList {
    /// Creates an empty [`TagList`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Splits a comma separated value into a [`TagList`].
    ///
    /// Surrounding whitespace and double quotes are stripped from each element, and empty elements are dropped.
    #[must_use = "Has no effect if the result is unused"]
    pub fn parse(value: &str) -> Self {
        let mut list = Self::new();
        for tag in value.split(',') {
            list.push(tag.trim().trim_matches('"').trim());
        }
        list
    }

    /// Appends a tag unless it is empty or already present.
    pub fn push(&mut self, tag: &str) {
        if !tag.is_empty() && !self.contains(tag) {
            self.0.push(tag.to_owned());
        }
    }

    /// Appends every tag from another list that is not already present.
    pub fn merge(&mut self, other: &Self) {
        for tag in &other.0 {
            self.push(tag);
        }
    }

    /// Checks if a tag is in the list.
    #[must_use = "Has no effect if the result is unused"]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|x| x.eq_ignore_ascii_case(tag))
    }

    /// Checks if any tag of the list appears inside `haystack`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn any_within(&self, haystack: &str) -> bool {
        self.0.iter().any(|x| contains_ignore_case(haystack, x))
    }

    /// Removes a tag, returning whether it was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        let len = self.0.len();
        self.0.retain(|x| !x.eq_ignore_ascii_case(tag));
        self.0.len() != len
    }

    /// Iterates over the tags.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Checks if the list is empty.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of tags.
    #[must_use = "Has no effect if the result is unused"]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'a> FromIterator<&'a str> for TagList {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut list = Self::new();
        for tag in iter {
            list.push(tag);
        }
        list
    }
}

impl core::fmt::Display for TagList {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl From<TagList> for Vec<String> {
    fn from(list: TagList) -> Self {
        list.0
    }
}

impl From<&[&str]> for TagList {
    fn from(tags: &[&str]) -> Self {
        tags.iter().copied().collect()
    }
}

/// Joins tags for storage, the inverse of [`TagList::parse`].
#[must_use = "Has no effect if the result is unused"]
pub fn join(tags: &TagList) -> String {
    tags.to_string()
}
