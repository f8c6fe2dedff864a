// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Invariant-violation reporting.
//!
//! Violations are programming errors (stale handles, malformed class
//! tables, parents destroyed before their children). The runtime reports
//! each one to its [`AssertHook`] and then carries on with a defined
//! fallback; with `panic_on_violation` set it panics after reporting.

use crate::class::ClassId;
use crate::runtime::ObjectId;
use std::fmt;

/// Callback receiving every [`Violation`].
pub type AssertHook = Box<dyn Fn(&Violation)>;

/// A broken runtime invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// An operation was handed a handle that names no live object.
    StaleHandle {
        op: &'static str,
        handle: ObjectId,
    },
    /// A class descriptor failed validation.
    MalformedClass {
        class: ClassId,
        reason: &'static str,
    },
    /// Two classes registered in one catalog share an id.
    DuplicateClassId(ClassId),
    /// An object was destroyed while it still owned children.
    OrphanedChildren { parent: ObjectId, count: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleHandle { op, handle } => {
                write!(f, "{op}: stale object handle {handle}")
            }
            Self::MalformedClass { class, reason } => {
                write!(f, "class {class} is malformed: {reason}")
            }
            Self::DuplicateClassId(class) => write!(f, "class id {class} registered twice"),
            Self::OrphanedChildren { parent, count } => {
                write!(f, "object {parent} destroyed with {count} live children")
            }
        }
    }
}

/// Default hook: log at error level.
pub fn log_violation(violation: &Violation) {
    log::error!("[objrt] invariant violated: {}", violation);
}

pub fn default_hook() -> AssertHook {
    Box::new(log_violation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_violation_display() {
        let handle = ObjectId::new(4, 2);
        assert_eq!(
            Violation::StaleHandle {
                op: "destroy",
                handle
            }
            .to_string(),
            "destroy: stale object handle #4v2"
        );
        assert_eq!(
            Violation::OrphanedChildren {
                parent: handle,
                count: 3
            }
            .to_string(),
            "object #4v2 destroyed with 3 live children"
        );
        assert_eq!(
            Violation::DuplicateClassId(ClassId(0xaa1d70)).to_string(),
            "class id 0xaa1d70 registered twice"
        );
    }

    #[test]
    fn test_custom_hook_receives_violation() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let hook: AssertHook = Box::new(move |v: &Violation| sink.borrow_mut().push(v.clone()));

        hook(&Violation::DuplicateClassId(ClassId(7)));
        assert_eq!(seen.borrow().as_slice(), &[Violation::DuplicateClassId(ClassId(7))]);
    }
}
