// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the object runtime.
//!
//! Cast misses are not errors: [`Runtime::cast`](crate::Runtime::cast) returns
//! `Option`. Invariant violations go to the assert hook
//! ([`Violation`](crate::Violation)); the variants below are the recoverable
//! outcomes a caller is expected to handle.

use crate::class::ClassId;
use crate::runtime::ObjectId;
use std::borrow::Cow;
use thiserror::Error;

/// Errors returned by runtime operations.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// The allocator could not satisfy the request.
    #[error("out of memory allocating {size} bytes (align {align})")]
    OutOfMemory { size: usize, align: usize },
    /// In-place construction was requested without storage.
    #[error("in-place construction requires non-null storage")]
    NullStorage,
    /// Caller-supplied storage does not satisfy the class alignment.
    #[error("storage is not aligned to {align} bytes")]
    MisalignedStorage { align: usize },
    /// The configured live-object limit is reached.
    #[error("live object limit reached ({0})")]
    ResourceLimitExceeded(usize),

    // ========================================================================
    // Class Errors
    // ========================================================================
    /// No class with this id is in the runtime's catalog.
    #[error("unknown class id {0}")]
    UnknownClass(ClassId),
    /// The class descriptor or its RTTI table is malformed.
    #[error("invalid class {class}: {reason}")]
    InvalidClass { class: ClassId, reason: &'static str },
    /// Two catalog entries share one class id.
    #[error("duplicate class id {0}")]
    DuplicateClassId(ClassId),
    /// A constructor in the chain failed; `class` names the failing relative.
    #[error("constructor of {name} ({class}) failed: {source}")]
    ConstructionFailed {
        class: ClassId,
        name: &'static str,
        #[source]
        source: ConstructError,
    },

    // ========================================================================
    // Object / Tree Errors
    // ========================================================================
    /// The handle does not name a live object.
    #[error("stale or unknown object handle {0}")]
    InvalidHandle(ObjectId),
    /// The owner/parent cannot be viewed as an `Object`.
    #[error("object {0} cannot be viewed as an Object")]
    InvalidAncestor(ObjectId),
    /// The child is already linked under another parent.
    #[error("object {child} already has parent {parent}")]
    AlreadyParented { child: ObjectId, parent: ObjectId },
    /// Linking would make the ownership tree cyclic.
    #[error("linking {child} under {parent} would create a cycle")]
    WouldCycle { parent: ObjectId, child: ObjectId },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
    /// Configuration file not found at the given path.
    #[error("config file not found: {0}")]
    ConfigFileNotFound(String),
}

/// Convenient alias for runtime results.
pub type Result<T> = core::result::Result<T, Error>;

/// Failure reported by a class constructor.
///
/// Carried inside [`Error::ConstructionFailed`] together with the id of the
/// class whose constructor produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConstructError {
    message: Cow<'static, str>,
}

impl ConstructError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_failed_display_names_class() {
        let err = Error::ConstructionFailed {
            class: ClassId(0xaa1d70),
            name: "OBJOS",
            source: ConstructError::new("no display"),
        };
        assert_eq!(
            err.to_string(),
            "constructor of OBJOS (0xaa1d70) failed: no display"
        );
    }

    #[test]
    fn test_construct_error_source_is_exposed() {
        use std::error::Error as _;

        let err = Error::ConstructionFailed {
            class: ClassId(1),
            name: "Leaf",
            source: ConstructError::new("boom"),
        };
        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "boom");
    }
}
