// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! UEFI variable storage helpers.
//!
//! Everything that reads or writes a firmware variable goes through a [`VariableStore`]: the platform boot list
//! (`BootOrder`, `Boot####`, `BootNext`), the hidden target lists and the hints left for the next boot. The runtime
//! services implementation is [`RuntimeVariableStore`]; the typed helpers on top work with any store.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use thiserror::Error;
use uefi::{
    Status, guid,
    runtime::{self, VariableAttributes, VariableVendor},
};

use crate::system::helper::{str_to_cstr, ucs2_bytes_to_string};

#[cfg(test)]
pub(crate) mod memstore;

/// The custom variable namespace for the boot manager.
pub const BOOTSCOUT_VENDOR: VariableVendor =
    VariableVendor(guid!("23600d08-561e-4e68-a024-1d7d6e04ee4e"));

/// The variable namespace of the Boot Loader Interface, shared with systemd.
pub const LOADER_VENDOR: VariableVendor =
    VariableVendor(guid!("4a67b082-0a4c-41cf-b6c7-440b29bb8c4f"));

/// The Apple firmware variable namespace.
pub const APPLE_VENDOR: VariableVendor =
    VariableVendor(guid!("7c436110-ab2a-4bbb-a880-fe41995c9f82"));

/// An `Error` that may result from attempting to get or set a UEFI variable.
#[derive(Error, Debug)]
pub enum VarError {
    /// The variable could not be obtained.
    #[error("Failed to get variable {name}: {status}")]
    GetErr {
        /// The name of the variable.
        name: String,

        /// The status returned by the firmware.
        status: Status,
    },

    /// The variable could not be stored.
    #[error("Failed to set variable {name}: {status}")]
    SetErr {
        /// The name of the variable.
        name: String,

        /// The status returned by the firmware.
        status: Status,
    },

    /// The variable name could not be converted into UCS-2.
    #[error("Invalid variable name {0}")]
    NameErr(String),

    /// The variable did not contain a valid UCS-2 string.
    #[error("Variable {0} does not hold a valid string")]
    StrErr(String),
}

/// Storage for firmware variables.
///
/// Variables are addressed by name and vendor namespace. Storing an empty value deletes the variable.
pub trait VariableStore {
    /// Gets the raw content of a variable, or [`None`] if it does not exist.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the variable exists but could not be read.
    fn get(&self, name: &str, vendor: &VariableVendor) -> Result<Option<Vec<u8>>, VarError>;

    /// Sets the raw content of a variable. An empty `data` deletes it.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the variable could not be stored.
    fn set(
        &mut self,
        name: &str,
        vendor: &VariableVendor,
        attributes: VariableAttributes,
        data: &[u8],
    ) -> Result<(), VarError>;
}

/// UEFI variable storage implementation with runtime services.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuntimeVariableStore;

impl VariableStore for RuntimeVariableStore {
    fn get(&self, name: &str, vendor: &VariableVendor) -> Result<Option<Vec<u8>>, VarError> {
        let cname = str_to_cstr(name).map_err(|_| VarError::NameErr(name.to_string()))?;
        match runtime::get_variable_boxed(&cname, vendor) {
            Ok((data, _)) => Ok(Some(data.into_vec())),
            Err(e) if e.status() == Status::NOT_FOUND => Ok(None),
            Err(e) => Err(VarError::GetErr {
                name: name.to_string(),
                status: e.status(),
            }),
        }
    }

    fn set(
        &mut self,
        name: &str,
        vendor: &VariableVendor,
        attributes: VariableAttributes,
        data: &[u8],
    ) -> Result<(), VarError> {
        let cname = str_to_cstr(name).map_err(|_| VarError::NameErr(name.to_string()))?;
        match runtime::set_variable(&cname, vendor, attributes, data) {
            Ok(()) => Ok(()),
            Err(e) if data.is_empty() && e.status() == Status::NOT_FOUND => Ok(()), // deleting a missing variable
            Err(e) => Err(VarError::SetErr {
                name: name.to_string(),
                status: e.status(),
            }),
        }
    }
}

/// The attributes used when none are given: persistent, and visible to boot and runtime services.
#[must_use = "Has no effect if the result is unused"]
pub fn default_attributes() -> VariableAttributes {
    VariableAttributes::NON_VOLATILE
        | VariableAttributes::BOOTSERVICE_ACCESS
        | VariableAttributes::RUNTIME_ACCESS
}

/// A value that can be stored in a UEFI variable.
///
/// This is essentially a type that can be converted into and from a vector of bytes, little endian.
pub trait UefiVariable: Sized {
    /// Convert `Self` to a vector of bytes.
    fn to_bytes(self) -> Vec<u8>;

    /// Convert a byte slice to `Self`, or [`None`] if the size does not match.
    fn from_bytes(bytes: &[u8]) -> Option<Self>;
}

/// Implements [`UefiVariable`] for fixed size integers.
macro_rules! int_variable {
    ($($ty:ty),*) => {
        $(
            impl UefiVariable for $ty {
                fn to_bytes(self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }
                fn from_bytes(bytes: &[u8]) -> Option<Self> {
                    Some(Self::from_le_bytes(bytes.try_into().ok()?))
                }
            }
        )*
    };
}

int_variable!(u8, u16, u32, u64);

impl UefiVariable for bool {
    fn to_bytes(self) -> Vec<u8> {
        alloc::vec![u8::from(self)]
    }
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [x] => Some(*x > 0),
            _ => None,
        }
    }
}

/// Gets a typed variable. A missing variable, or one with an unexpected size, yields [`None`].
///
/// # Errors
///
/// May return an `Error` if the variable could not be read.
pub fn get_variable<T: UefiVariable>(
    store: &dyn VariableStore,
    name: &str,
    vendor: &VariableVendor,
) -> Result<Option<T>, VarError> {
    Ok(store.get(name, vendor)?.and_then(|x| T::from_bytes(&x)))
}

/// Sets a typed variable. Passing [`None`] for the value deletes the variable.
///
/// If None is specified for the attributes, then [`default_attributes`] are used.
///
/// # Errors
///
/// May return an `Error` if the variable could not be stored.
pub fn set_variable<T: UefiVariable>(
    store: &mut dyn VariableStore,
    name: &str,
    vendor: &VariableVendor,
    attrs: Option<VariableAttributes>,
    value: Option<T>,
) -> Result<(), VarError> {
    let value = value.map_or_else(Vec::new, UefiVariable::to_bytes);
    store.set(
        name,
        vendor,
        attrs.unwrap_or_else(default_attributes),
        &value,
    )
}

/// Gets a variable holding a nul terminated UCS-2 string.
///
/// # Errors
///
/// May return an `Error` if the variable could not be read or does not hold a valid string.
pub fn get_variable_str(
    store: &dyn VariableStore,
    name: &str,
    vendor: &VariableVendor,
) -> Result<Option<String>, VarError> {
    store
        .get(name, vendor)?
        .map(|x| ucs2_bytes_to_string(&x).map_err(|_| VarError::StrErr(name.to_string())))
        .transpose()
}

/// Sets a variable to a nul terminated UCS-2 string. Passing [`None`] deletes the variable.
///
/// # Errors
///
/// May return an `Error` if the variable could not be stored.
pub fn set_variable_str(
    store: &mut dyn VariableStore,
    name: &str,
    vendor: &VariableVendor,
    attrs: Option<VariableAttributes>,
    value: Option<&str>,
) -> Result<(), VarError> {
    let units: Vec<u16> = value
        .map(|x| x.encode_utf16().chain(core::iter::once(0)).collect())
        .unwrap_or_default();
    store.set(
        name,
        vendor,
        attrs.unwrap_or_else(default_attributes),
        bytemuck::cast_slice(&units),
    )
}

/// Gets a variable holding an array of little endian `u16`, such as `BootOrder`.
///
/// # Errors
///
/// May return an `Error` if the variable could not be read.
pub fn get_variable_u16_list(
    store: &dyn VariableStore,
    name: &str,
    vendor: &VariableVendor,
) -> Result<Vec<u16>, VarError> {
    Ok(store
        .get(name, vendor)?
        .map(|x| {
            x.chunks_exact(2)
                .map(|x| u16::from_le_bytes([x[0], x[1]]))
                .collect()
        })
        .unwrap_or_default())
}
