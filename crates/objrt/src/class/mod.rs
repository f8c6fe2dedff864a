// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Class descriptors and flattened RTTI tables.
//!
//! Every class has exactly one static [`ClassDef`], produced by
//! [`define_class!`](crate::define_class). Its [`CastInfo`] lists the class
//! itself followed by every ancestor, each with the byte offset of that
//! ancestor's segment inside the concrete object and the thunks that run the
//! ancestor's constructor and destructor on that segment.
//!
//! ```text
//! Leaf { tag, base: Mid { base: Root { base: Object, .. }, .. }, .. }
//!
//! relatives[0]  Leaf    offset 0
//! relatives[1]  Mid     offset_of!(Leaf, base)
//! relatives[2]  Root    offset_of!(Leaf, base.base)
//! relatives[3]  Object  offset_of!(Leaf, base.base.base)
//! ```

mod macros;

use crate::error::{ConstructError, Result};
use crate::object::{CreateFlags, OBJECT_CLASS_ID};
use crate::runtime::{ObjectId, Runtime};
use std::alloc::Layout;
use std::any::TypeId;
use std::fmt;
use std::ptr::NonNull;

/// Unique class identity, stable across a build.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self)
    }
}

/// Factory entry point stored in every descriptor.
pub type CreateFn = fn(&mut Runtime, Option<ObjectId>, CreateFlags) -> Result<ObjectId>;

/// Runs one class's constructor on its segment.
pub type CtorThunk = unsafe fn(NonNull<u8>) -> core::result::Result<(), ConstructError>;

/// Runs one class's destructor on its segment.
pub type DtorThunk = unsafe fn(NonNull<u8>);

/// Static class descriptor.
pub struct ClassDef {
    pub id: ClassId,
    /// Size in bytes of a concrete instance.
    pub size: usize,
    pub align: usize,
    /// Human-readable name; only kept in debug builds.
    pub name: Option<&'static str>,
    /// Rust type of a concrete instance.
    pub instance_type: fn() -> TypeId,
    pub create: CreateFn,
    pub cast_info: CastInfo,
}

impl ClassDef {
    /// Name for diagnostics, `"<class>"` when names are compiled out.
    pub fn display_name(&self) -> &'static str {
        self.name.unwrap_or("<class>")
    }

    pub fn relatives(&self) -> &'static [RttiEntry] {
        self.cast_info.relatives
    }

    /// Storage layout of a concrete instance.
    pub fn layout(&self) -> Option<Layout> {
        Layout::from_size_align(self.size, self.align).ok()
    }

    /// Entry of the `Object` segment, which holds the instance header.
    pub fn header_entry(&self) -> Option<&'static RttiEntry> {
        self.cast_info
            .relatives
            .last()
            .filter(|entry| entry.class.id == OBJECT_CLASS_ID)
    }

    /// True if instances of this class are also instances of `class`.
    pub fn is_a(&self, class: ClassId) -> bool {
        self.cast_info.find(class).is_some()
    }

    /// Check the RTTI table invariants.
    ///
    /// The class itself must come first at offset 0, every ancestor segment
    /// must lie inside the object at its own alignment and have the Rust type
    /// its descriptor names, and no class may appear twice. Past the first
    /// entry the table must be the direct base's own table shifted by the
    /// base's offset, and the chain must end at `Object`.
    pub fn validate(&self) -> core::result::Result<(), &'static str> {
        if self.size == 0 {
            return Err("zero-sized class");
        }
        if self.layout().is_none() {
            return Err("invalid size/alignment");
        }

        let relatives = self.cast_info.relatives;
        let Some(this) = relatives.first() else {
            return Err("empty RTTI table");
        };
        if this.class.id != self.id {
            return Err("first relative is not the class itself");
        }
        if this.offset != 0 {
            return Err("class segment must start at offset 0");
        }

        for (index, entry) in relatives.iter().enumerate() {
            let end = entry.offset.checked_add(entry.class.size);
            if end.map_or(true, |end| end > self.size) {
                return Err("ancestor segment exceeds object size");
            }
            if entry.class.align == 0 || entry.offset % entry.class.align != 0 {
                return Err("misaligned ancestor segment");
            }
            if (entry.segment_type)() != (entry.class.instance_type)() {
                return Err("RTTI entry type does not match its class");
            }
            if relatives[..index]
                .iter()
                .any(|earlier| earlier.class.id == entry.class.id)
            {
                return Err("class id repeated in RTTI table");
            }
        }

        if let Some(base) = relatives.get(1) {
            let inherited = base.class.relatives();
            if relatives.len() != inherited.len() + 1 {
                return Err("ancestors differ from the direct base's table");
            }
            let mirrors_base = relatives[1..].iter().zip(inherited).all(|(entry, from_base)| {
                std::ptr::eq(entry.class, from_base.class)
                    && base.offset.checked_add(from_base.offset) == Some(entry.offset)
            });
            if !mirrors_base {
                return Err("ancestors differ from the direct base's table");
            }
            // Shorter table each step, so this terminates.
            base.class
                .validate()
                .map_err(|_| "direct base has a malformed RTTI table")?;
        }

        if self.header_entry().is_none() {
            return Err("RTTI table does not end at Object");
        }
        Ok(())
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("align", &self.align)
            .field("cast_info", &self.cast_info)
            .finish()
    }
}

/// Dynamic casting information: the class and all of its ancestors.
#[derive(Clone, Copy)]
pub struct CastInfo {
    /// Most derived first, `Object` last.
    pub relatives: &'static [RttiEntry],
}

impl CastInfo {
    /// Linear scan for `class`.
    pub fn find(&self, class: ClassId) -> Option<&'static RttiEntry> {
        self.relatives.iter().find(|entry| entry.class.id == class)
    }

    pub fn len(&self) -> usize {
        self.relatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relatives.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'static, RttiEntry> {
        self.relatives.iter()
    }
}

impl fmt::Debug for CastInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.relatives.iter()).finish()
    }
}

/// One relative of a concrete class.
#[derive(Clone, Copy)]
pub struct RttiEntry {
    pub class: &'static ClassDef,
    /// Byte offset of this relative's segment inside the concrete object.
    pub offset: usize,
    /// Rust type the thunks operate on; must be `class`'s instance type.
    pub segment_type: fn() -> TypeId,
    pub ctor: CtorThunk,
    pub dtor: DtorThunk,
}

impl fmt::Debug for RttiEntry {
    // Only the id: `class` points back into the table being printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RttiEntry")
            .field("class", &self.class.id)
            .field("name", &self.class.name)
            .field("offset", &self.offset)
            .finish()
    }
}

/// Per-class constructor and destructor.
///
/// The construction pipeline calls `construct` root-to-leaf, so an
/// implementation may rely on every ancestor segment already being
/// constructed. `destruct` runs leaf-to-root. Neither should chain to the
/// base class; the runtime does that from the RTTI table.
pub trait Lifecycle {
    fn construct(&mut self) -> core::result::Result<(), ConstructError> {
        Ok(())
    }

    fn destruct(&mut self) {}
}

/// A type with a static class descriptor.
///
/// Implemented by [`define_class!`](crate::define_class).
///
/// # Safety
///
/// - `class_def()` must return a descriptor whose size, alignment and RTTI
///   offsets describe `Self`, with thunks bound to the listed types.
/// - The all-zero bit pattern must be a valid `Self`: storage is zeroed
///   before any constructor runs. Plain integers, `bool`, `Option<&T>`
///   and nested classes qualify; references, `NonZero*` and enums without
///   a zero discriminant do not.
/// - `Self` must not need `Drop`; release resources in
///   [`Lifecycle::destruct`].
pub unsafe trait Class: Lifecycle + Sized + 'static {
    fn class_def() -> &'static ClassDef;
}

/// `Some(name)` in debug builds, `None` otherwise.
pub const fn debug_name(name: &'static str) -> Option<&'static str> {
    if cfg!(debug_assertions) {
        Some(name)
    } else {
        None
    }
}

/// Constructor thunk for `T`.
///
/// # Safety
///
/// `segment` must point to a zero-initialized or partially constructed `T`
/// inside live object storage, with no other live reference to it.
#[doc(hidden)]
pub unsafe fn construct_segment<T: Class>(
    segment: NonNull<u8>,
) -> core::result::Result<(), ConstructError> {
    // SAFETY: guaranteed by the caller (see above).
    let this = unsafe { segment.cast::<T>().as_mut() };
    this.construct()
}

/// Destructor thunk for `T`.
///
/// # Safety
///
/// Same contract as [`construct_segment`]; `T`'s constructor must have
/// succeeded on this segment.
#[doc(hidden)]
pub unsafe fn destruct_segment<T: Class>(segment: NonNull<u8>) {
    // SAFETY: guaranteed by the caller (see above).
    let this = unsafe { segment.cast::<T>().as_mut() };
    this.destruct();
}

/// Factory stored in `ClassDef::create` for `T`.
#[doc(hidden)]
pub fn create_instance<T: Class>(
    runtime: &mut Runtime,
    owner: Option<ObjectId>,
    flags: CreateFlags,
) -> Result<ObjectId> {
    runtime.create_class(T::class_def(), owner, flags)
}
