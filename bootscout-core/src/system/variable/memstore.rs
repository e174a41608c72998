// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! An in-memory [`VariableStore`] for host side tests.

use std::collections::BTreeMap;

use uefi::runtime::{VariableAttributes, VariableVendor};

use super::{VarError, VariableStore};

/// Variables kept in a map keyed by vendor and name.
#[derive(Clone, Debug, Default)]
pub(crate) struct MemVariableStore {
    /// The stored values.
    vars: BTreeMap<([u8; 16], String), Vec<u8>>,
}

impl MemVariableStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, name: &str, vendor: &VariableVendor, data: &[u8]) -> Self {
        self.vars.insert((vendor.0.to_bytes(), name.to_owned()), data.to_vec());
        self
    }

    pub(crate) fn contains(&self, name: &str, vendor: &VariableVendor) -> bool {
        self.vars.contains_key(&(vendor.0.to_bytes(), name.to_owned()))
    }
}

impl VariableStore for MemVariableStore {
    fn get(&self, name: &str, vendor: &VariableVendor) -> Result<Option<Vec<u8>>, VarError> {
        Ok(self.vars.get(&(vendor.0.to_bytes(), name.to_owned())).cloned())
    }

    fn set(
        &mut self,
        name: &str,
        vendor: &VariableVendor,
        _attributes: VariableAttributes,
        data: &[u8],
    ) -> Result<(), VarError> {
        let key = (vendor.0.to_bytes(), name.to_owned());
        if data.is_empty() {
            self.vars.remove(&key);
        } else {
            self.vars.insert(key, data.to_vec());
        }
        Ok(())
    }
}
