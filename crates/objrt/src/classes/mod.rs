// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concrete classes shipped with the runtime.
//!
//! Both derive directly from [`Object`](crate::Object) and are part of
//! [`ClassCatalog::builtin`](crate::ClassCatalog::builtin).

mod gpu_group;
mod os;

pub use gpu_group::{GpuGroup, GPU_GROUP_CLASS};
pub use os::{Os, OsProperty, OS_CLASS};
