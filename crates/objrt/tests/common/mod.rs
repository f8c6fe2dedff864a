// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instrumented three-level class chain shared by the integration tests.
//!
//! `Leaf` puts a field before its base, so its ancestors sit at non-zero
//! offsets.

#![allow(dead_code)]

use objrt::object::OBJECT_CLASS;
use objrt::{define_class, ConstructError, Lifecycle, Object, Violation};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

thread_local! {
    static EVENTS: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    static FAIL_IN: Cell<Option<&'static str>> = const { Cell::new(None) };
}

fn record(event: &'static str) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

fn should_fail(class: &'static str) -> bool {
    FAIL_IN.with(|fail| fail.get() == Some(class))
}

/// Drain the lifecycle events recorded on this thread.
pub fn take_events() -> Vec<&'static str> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

/// Make the constructor of `class` ("Root", "Mid" or "Leaf") fail.
pub fn fail_in(class: Option<&'static str>) {
    FAIL_IN.with(|fail| fail.set(class));
}

/// Assert hook that records every violation.
pub fn violation_sink() -> (Rc<RefCell<Vec<Violation>>>, impl Fn(&Violation) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    (seen, move |v: &Violation| sink.borrow_mut().push(v.clone()))
}

#[repr(C)]
#[derive(Debug)]
pub struct Root {
    pub base: Object,
    pub value: u32,
}

impl Lifecycle for Root {
    fn construct(&mut self) -> Result<(), ConstructError> {
        record("ctor Root");
        if should_fail("Root") {
            return Err(ConstructError::new("Root refused"));
        }
        self.value = 7;
        Ok(())
    }

    fn destruct(&mut self) {
        record("dtor Root");
    }
}

define_class! {
    pub static ROOT_CLASS: Root {
        id: 0x100001,
        name: "Root",
        ancestors: [Object: OBJECT_CLASS => base],
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct Mid {
    pub base: Root,
    pub ready: bool,
}

impl Lifecycle for Mid {
    fn construct(&mut self) -> Result<(), ConstructError> {
        record("ctor Mid");
        if should_fail("Mid") {
            return Err(ConstructError::new("Mid refused"));
        }
        // Root is constructed first.
        self.ready = self.base.value == 7;
        Ok(())
    }

    fn destruct(&mut self) {
        record("dtor Mid");
    }
}

define_class! {
    pub static MID_CLASS: Mid {
        id: 0x100002,
        name: "Mid",
        ancestors: [
            Root: ROOT_CLASS => base,
            Object: OBJECT_CLASS => base.base,
        ],
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct Leaf {
    pub tag: u64,
    pub base: Mid,
    pub saw_ready_base: bool,
}

impl Lifecycle for Leaf {
    fn construct(&mut self) -> Result<(), ConstructError> {
        record("ctor Leaf");
        if should_fail("Leaf") {
            return Err(ConstructError::new("Leaf refused"));
        }
        self.saw_ready_base = self.base.ready;
        self.tag = 0x1eaf;
        Ok(())
    }

    fn destruct(&mut self) {
        record("dtor Leaf");
    }
}

define_class! {
    pub static LEAF_CLASS: Leaf {
        id: 0x100003,
        name: "Leaf",
        ancestors: [
            Mid: MID_CLASS => base,
            Root: ROOT_CLASS => base.base,
            Object: OBJECT_CLASS => base.base.base,
        ],
    }
}
