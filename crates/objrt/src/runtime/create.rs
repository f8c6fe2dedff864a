// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Construction pipeline.
//!
//! 1. Obtain storage (allocator, or caller-supplied for in-place)
//! 2. Zero it
//! 3. Reserve the arena slot (class and flags), mirror handle and flags in the header
//! 4. Link under the owner unless `SKIP_PARENT_LINK`
//! 5. Wire the header: segment entry, then concrete class
//! 6. Run constructors root-to-leaf
//!
//! A failing step undoes everything before it. When constructor `k` fails,
//! only the constructors that already succeeded get their destructors,
//! leaf-most first.

use super::{ObjectId, Runtime};
use crate::assert::Violation;
use crate::class::{Class, ClassDef, ClassId, RttiEntry};
use crate::error::{Error, Result};
use crate::object::{CreateFlags, Object};
use std::alloc::Layout;
use std::ptr::{self, NonNull};

impl Runtime {
    /// Create an instance of `T`, optionally owned by `owner`.
    pub fn create<T: Class>(
        &mut self,
        owner: Option<ObjectId>,
        flags: CreateFlags,
    ) -> Result<ObjectId> {
        self.create_class(T::class_def(), owner, flags)
    }

    /// Create an instance of the catalog class `class` through its factory.
    pub fn create_by_id(
        &mut self,
        class: ClassId,
        owner: Option<ObjectId>,
        flags: CreateFlags,
    ) -> Result<ObjectId> {
        let def = self.catalog.lookup(class).ok_or(Error::UnknownClass(class))?;
        (def.create)(self, owner, flags)
    }

    /// Create an instance of `def` in allocator storage.
    ///
    /// `IN_PLACE_CONSTRUCT` needs storage and is refused here with
    /// [`Error::NullStorage`]; use [`create_in_place`](Self::create_in_place).
    pub fn create_class(
        &mut self,
        def: &'static ClassDef,
        owner: Option<ObjectId>,
        flags: CreateFlags,
    ) -> Result<ObjectId> {
        if flags.contains(CreateFlags::IN_PLACE_CONSTRUCT) {
            return Err(Error::NullStorage);
        }
        self.construct(def, owner, flags, None)
    }

    /// Construct an instance of `def` in caller-supplied storage.
    ///
    /// The runtime never frees `storage`. On failure it is left zeroed.
    ///
    /// # Safety
    ///
    /// `storage` must be null or valid for reads and writes of `def.size`
    /// bytes, not used by anything else, and must stay valid until the
    /// object is destroyed (explicitly or when the runtime is dropped).
    pub unsafe fn create_in_place(
        &mut self,
        def: &'static ClassDef,
        owner: Option<ObjectId>,
        flags: CreateFlags,
        storage: *mut u8,
    ) -> Result<ObjectId> {
        let storage = NonNull::new(storage).ok_or(Error::NullStorage)?;
        self.construct(
            def,
            owner,
            flags | CreateFlags::IN_PLACE_CONSTRUCT,
            Some(storage),
        )
    }

    fn construct(
        &mut self,
        def: &'static ClassDef,
        owner: Option<ObjectId>,
        flags: CreateFlags,
        placed: Option<NonNull<u8>>,
    ) -> Result<ObjectId> {
        let (layout, header_entry) = self.check_class(def)?;

        if let Some(limit) = self.config.max_live_objects {
            if self.stats.live >= limit {
                return Err(Error::ResourceLimitExceeded(limit));
            }
        }

        // 1. storage
        let storage = match placed {
            Some(storage) => {
                if storage.as_ptr() as usize % def.align != 0 {
                    return Err(Error::MisalignedStorage { align: def.align });
                }
                storage
            }
            None => self.allocator.allocate(layout).map_err(|_| Error::OutOfMemory {
                size: def.size,
                align: def.align,
            })?,
        };

        // 2. zero
        // SAFETY: storage is valid for def.size bytes (allocator or caller contract).
        unsafe { ptr::write_bytes(storage.as_ptr(), 0, def.size) };

        // SAFETY: validate() keeps the Object segment inside the object.
        let header = unsafe { storage.add(header_entry.offset) }.cast::<Object>();

        // 3. arena slot
        let id = match self.reserve_slot(storage, def, flags, header) {
            Ok(id) => id,
            Err(err) => {
                self.release_storage(storage, layout, flags);
                return Err(err);
            }
        };
        // SAFETY: header is a zeroed Object inside storage nobody else references.
        unsafe { (*header.as_ptr()).set_identity(id, flags) };

        // 4. ownership link
        if let Some(owner) = owner.filter(|_| !flags.contains(CreateFlags::SKIP_PARENT_LINK)) {
            if let Err(err) = self.add_child(owner, id) {
                self.abandon(id, storage, layout, flags);
                return Err(err);
            }
        }

        // 5. wire metadata
        // SAFETY: as above.
        unsafe { (*header.as_ptr()).wire(def, header_entry) };

        // 6. constructors, root to leaf
        let relatives = def.relatives();
        for (depth, entry) in relatives.iter().enumerate().rev() {
            // SAFETY: the segment lies inside storage; every ancestor segment
            // below it is already constructed.
            let status = unsafe { (entry.ctor)(storage.add(entry.offset)) };
            if let Err(source) = status {
                log::warn!(
                    "[objrt] constructor of {} failed while creating {} {}: {}",
                    entry.class.display_name(),
                    def.display_name(),
                    id,
                    source
                );
                // SAFETY: relatives[depth + 1..] are exactly the constructed segments.
                unsafe { Self::run_dtors(storage, &relatives[depth + 1..]) };
                self.abandon(id, storage, layout, flags);
                self.stats.construction_failures += 1;
                return Err(Error::ConstructionFailed {
                    class: entry.class.id,
                    name: entry.class.display_name(),
                    source,
                });
            }
        }

        self.stats.created += 1;
        self.stats.live += 1;
        log::debug!(
            "[objrt] created {} {} ({} bytes, flags {:?})",
            def.display_name(),
            id,
            def.size,
            flags
        );
        Ok(id)
    }

    /// Validate `def`, reporting malformed descriptors.
    fn check_class(&self, def: &'static ClassDef) -> Result<(Layout, &'static RttiEntry)> {
        let checked = def.validate().and_then(|()| {
            let layout = def.layout().ok_or("invalid size/alignment")?;
            let header = def.header_entry().ok_or("RTTI table does not end at Object")?;
            Ok((layout, header))
        });
        checked.map_err(|reason| {
            self.report(Violation::MalformedClass {
                class: def.id,
                reason,
            });
            Error::InvalidClass {
                class: def.id,
                reason,
            }
        })
    }

    /// Run destructors over `entries` in table order (leaf-most first).
    ///
    /// # Safety
    ///
    /// Every listed segment of `storage` must be constructed.
    pub(super) unsafe fn run_dtors(storage: NonNull<u8>, entries: &[RttiEntry]) {
        for entry in entries {
            // SAFETY: guaranteed by the caller.
            unsafe { (entry.dtor)(storage.add(entry.offset)) };
        }
    }

    /// Undo a partial construction: unlink, free the slot, zero and release storage.
    fn abandon(&mut self, id: ObjectId, storage: NonNull<u8>, layout: Layout, flags: CreateFlags) {
        self.detach_from_parent(id);
        self.release_slot(id);
        // SAFETY: storage is still owned by this construction.
        unsafe { ptr::write_bytes(storage.as_ptr(), 0, layout.size()) };
        self.release_storage(storage, layout, flags);
    }

    /// Return allocator storage; in-place storage stays with the caller.
    pub(super) fn release_storage(&self, storage: NonNull<u8>, layout: Layout, flags: CreateFlags) {
        if flags.contains(CreateFlags::IN_PLACE_CONSTRUCT) {
            return;
        }
        // SAFETY: storage came from this allocator with this layout.
        unsafe { self.allocator.free(storage, layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{GpuGroup, Os, OsProperty, GPU_GROUP_CLASS, OS_CLASS};
    use crate::object::OBJECT_CLASS_ID;

    #[test]
    fn test_create_os_runs_its_constructor() {
        let mut rt = Runtime::builder().build().expect("runtime should build");
        let os = rt.create::<Os>(None, CreateFlags::NONE).expect("create");

        let header = rt.header(os).expect("live object");
        assert!(header.is_wired());
        assert_eq!(header.handle(), Some(os));
        assert!(header.is_instance_of(OBJECT_CLASS_ID));

        let os_ref = rt.get::<Os>(os).expect("typed view");
        assert!(!os_ref.property(OsProperty::SupportsDisplayRemapper));
        rt.destroy(os).expect("destroy");
    }

    #[test]
    fn test_create_by_id_uses_catalog() {
        let mut rt = Runtime::builder().build().expect("runtime should build");
        let group = rt
            .create_by_id(GPU_GROUP_CLASS.id, None, CreateFlags::NONE)
            .expect("create by id");
        assert!(rt.get::<GpuGroup>(group).is_some());

        let err = rt
            .create_by_id(ClassId(0xdead), None, CreateFlags::NONE)
            .expect_err("unknown class");
        assert!(matches!(err, Error::UnknownClass(ClassId(0xdead))));
    }

    #[test]
    fn test_in_place_flag_without_storage_is_refused() {
        let mut rt = Runtime::builder().build().expect("runtime should build");
        let err = rt
            .create_class(&OS_CLASS, None, CreateFlags::IN_PLACE_CONSTRUCT)
            .expect_err("no storage");
        assert!(matches!(err, Error::NullStorage));

        // SAFETY: null storage is rejected before any access.
        let err = unsafe { rt.create_in_place(&OS_CLASS, None, CreateFlags::NONE, ptr::null_mut()) }
            .expect_err("null storage");
        assert!(matches!(err, Error::NullStorage));
        assert!(rt.is_empty());
    }

    #[test]
    fn test_live_limit() {
        let config = crate::RuntimeConfig::new().with_max_live_objects(Some(1));
        let mut rt = Runtime::builder()
            .config(config)
            .build()
            .expect("runtime should build");
        let first = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let err = rt
            .create::<Os>(None, CreateFlags::NONE)
            .expect_err("limit reached");
        assert!(matches!(err, Error::ResourceLimitExceeded(1)));

        rt.destroy(first).expect("destroy");
        rt.create::<Os>(None, CreateFlags::NONE)
            .expect("room again after destroy");
    }
}
