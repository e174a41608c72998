// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! System re-exports

pub mod block;
pub mod device_path;
pub mod fs;
pub mod helper;
pub mod log_backend;
pub mod protos;
pub mod time;
pub mod variable;

mod global_allocator;
mod panic_handler;
