// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # objrt - single-inheritance object runtime
//!
//! A generic object model for code that lives in raw, allocator-provided
//! storage: class descriptors, flattened RTTI tables, constructor and
//! destructor chaining, dynamic casts and a parent/child ownership tree.
//!
//! ## Quick Start
//!
//! ```rust
//! use objrt::classes::Os;
//! use objrt::{Class, CreateFlags, Object, Runtime};
//!
//! fn main() -> objrt::Result<()> {
//!     let mut rt = Runtime::builder().build()?;
//!
//!     let os = rt.create::<Os>(None, CreateFlags::NONE)?;
//!     assert!(rt.is_instance_of(os, Object::class_def().id));
//!
//!     rt.destroy(os)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  define_class!  ->  ClassDef + CastInfo (static, one per class)     |
//! +---------------------------------------------------------------------+
//! |  Runtime: create / destroy / cast / add_child / remove_child        |
//! |    arena of ObjectId -> { storage, parent, children }               |
//! +---------------------------------------------------------------------+
//! |  Allocator (System / Tracking / Slab)   |   AssertHook (Violation)  |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ClassDef`] | Static class descriptor (id, size, factory, RTTI table) |
//! | [`CastInfo`] | Flattened list of a class and all of its ancestors |
//! | [`Object`] | Root class; header embedded in every instance |
//! | [`Runtime`] | Owns instances and runs the construction/destruction pipelines |
//! | [`ClassCatalog`] | Classes a runtime may instantiate by id |

/// Allocator collaborators (system, tracking, slab-backed).
pub mod alloc;
/// Invariant-violation reporting hook.
pub mod assert;
/// Class descriptors, RTTI tables and the `define_class!` macro.
pub mod class;
/// Sample classes built on the runtime.
pub mod classes;
/// Runtime configuration (defaults, YAML, environment overrides).
pub mod config;
/// Error taxonomy.
pub mod error;
/// The root `Object` class and creation flags.
pub mod object;
/// Object arena, construction/destruction pipelines, casts, ownership tree.
pub mod runtime;

mod catalog;

pub use self::alloc::{AllocError, Allocator, SlabAllocator, SystemAllocator, TrackingAllocator};
pub use assert::{AssertHook, Violation};
pub use catalog::ClassCatalog;
pub use class::{CastInfo, Class, ClassDef, ClassId, Lifecycle, RttiEntry};
pub use config::RuntimeConfig;
pub use error::{ConstructError, Error, Result};
pub use object::{CreateFlags, Object};
pub use runtime::{ObjectId, Runtime, RuntimeBuilder, RuntimeStats};

/// objrt version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
