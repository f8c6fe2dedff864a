// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The root class.
//!
//! Every instance embeds exactly one [`Object`] segment at the bottom of its
//! base chain. The segment doubles as the instance header: it records the
//! concrete class, the RTTI entry of the segment itself, the creation flags
//! and the arena handle.

use crate::class::{ClassDef, ClassId, Lifecycle, RttiEntry};
use crate::define_class;
use crate::runtime::ObjectId;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Class id of [`Object`].
pub const OBJECT_CLASS_ID: ClassId = ClassId(0x497031);

/// Root of every class hierarchy.
///
/// All-zero is the unwired state; the runtime fills the fields in during
/// construction.
#[repr(C)]
#[derive(Debug)]
pub struct Object {
    class: Option<&'static ClassDef>,
    entry: Option<&'static RttiEntry>,
    create_flags: CreateFlags,
    handle: u64,
}

impl Lifecycle for Object {}

define_class! {
    /// Descriptor of [`Object`].
    pub static OBJECT_CLASS: Object {
        id: OBJECT_CLASS_ID.0,
        name: "Object",
        ancestors: [],
    }
}

impl Object {
    /// Concrete (most derived) class, once wired.
    pub fn class(&self) -> Option<&'static ClassDef> {
        self.class
    }

    /// RTTI entry describing this `Object` segment within the concrete class.
    pub fn entry(&self) -> Option<&'static RttiEntry> {
        self.entry
    }

    pub fn create_flags(&self) -> CreateFlags {
        self.create_flags
    }

    /// Arena handle of the instance.
    pub fn handle(&self) -> Option<ObjectId> {
        ObjectId::from_bits(self.handle)
    }

    pub fn is_wired(&self) -> bool {
        self.class.is_some() && self.entry.is_some()
    }

    /// True if the concrete class is `class` or derives from it.
    pub fn is_instance_of(&self, class: ClassId) -> bool {
        self.class.is_some_and(|def| def.is_a(class))
    }

    pub(crate) fn set_identity(&mut self, handle: ObjectId, flags: CreateFlags) {
        self.handle = handle.to_bits();
        self.create_flags = flags;
    }

    /// Record metadata: the segment's own entry first, then the class.
    pub(crate) fn wire(&mut self, class: &'static ClassDef, entry: &'static RttiEntry) {
        self.entry = Some(entry);
        self.class = Some(class);
    }
}

/// Options controlling object creation.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CreateFlags(u32);

impl CreateFlags {
    pub const NONE: Self = Self(0);
    /// Do not link the new object under its owner.
    pub const SKIP_PARENT_LINK: Self = Self(0x1);
    /// Storage was supplied by the caller; the runtime never frees it.
    pub const IN_PLACE_CONSTRUCT: Self = Self(0x2);

    const ALL: u32 = Self::SKIP_PARENT_LINK.0 | Self::IN_PLACE_CONSTRUCT.0;

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Keep only known bits.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CreateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for CreateFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Debug for CreateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "CreateFlags(NONE)");
        }
        let mut names = Vec::new();
        if self.contains(Self::SKIP_PARENT_LINK) {
            names.push("SKIP_PARENT_LINK");
        }
        if self.contains(Self::IN_PLACE_CONSTRUCT) {
            names.push("IN_PLACE_CONSTRUCT");
        }
        write!(f, "CreateFlags({})", names.join(" | "))
    }
}
