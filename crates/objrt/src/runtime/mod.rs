// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object arena and the operations on it.
//!
//! A [`Runtime`] owns every object it creates. Objects are named by
//! generational [`ObjectId`]s; the arena slot behind an id records the
//! object's storage, concrete class, creation flags, `Object` header and
//! ownership links. The header inside the object mirrors class and flags
//! for code holding a typed view; the runtime itself only trusts the slot.
//!
//! - `create.rs`: construction pipeline
//! - `destroy.rs`: destruction pipeline
//! - `tree.rs`: parent/child ownership tree

mod create;
mod destroy;
mod handle;
mod tree;

pub use handle::ObjectId;

use crate::alloc::{Allocator, SystemAllocator};
use crate::assert::{default_hook, AssertHook, Violation};
use crate::catalog::ClassCatalog;
use crate::class::{Class, ClassDef, ClassId};
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::object::{CreateFlags, Object};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

/// Lifetime counters of a runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub live: usize,
    pub created: u64,
    pub destroyed: u64,
    pub construction_failures: u64,
}

/// Arena entry of a live object.
pub(crate) struct Node {
    pub(crate) storage: NonNull<u8>,
    pub(crate) class: &'static ClassDef,
    pub(crate) flags: CreateFlags,
    pub(crate) header: NonNull<Object>,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Owner of objects, their storage and their ownership tree.
pub struct Runtime {
    allocator: Arc<dyn Allocator>,
    catalog: ClassCatalog,
    config: RuntimeConfig,
    assert_hook: AssertHook,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    stats: RuntimeStats,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    pub fn stats(&self) -> RuntimeStats {
        self.stats
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.stats.live
    }

    pub fn is_empty(&self) -> bool {
        self.stats.live == 0
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.node(id).is_some()
    }

    /// Handles of every live object, in slot order.
    pub fn objects(&self) -> Vec<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.node.is_some())
            .map(|(index, slot)| ObjectId::new(index as u32, slot.generation))
            .collect()
    }

    // ========================================================================
    // Dynamic cast
    // ========================================================================

    /// View `id` as an instance of `target`.
    ///
    /// Returns a pointer to the `target` segment inside the object, or
    /// `None` if the object's class is neither `target` nor derived from it.
    /// A stale handle is reported as a violation and also yields `None`.
    pub fn cast(&self, id: ObjectId, target: ClassId) -> Option<NonNull<u8>> {
        let Some(node) = self.node(id) else {
            self.report(Violation::StaleHandle { op: "cast", handle: id });
            return None;
        };
        Self::cast_node(node, target)
    }

    /// Typed view of `id` as `T`.
    pub fn get<T: Class>(&self, id: ObjectId) -> Option<&T> {
        let segment = self.typed_segment::<T>(id, "get")?;
        // SAFETY: the segment is a live, constructed `T`; the shared borrow of
        // the runtime keeps `get_mut`/`destroy` out while it is held.
        Some(unsafe { segment.cast::<T>().as_ref() })
    }

    /// Mutable typed view of `id` as `T`.
    pub fn get_mut<T: Class>(&mut self, id: ObjectId) -> Option<&mut T> {
        let segment = self.typed_segment::<T>(id, "get_mut")?;
        // SAFETY: as in `get`, with exclusivity from `&mut self`.
        Some(unsafe { segment.cast::<T>().as_mut() })
    }

    pub fn is_instance_of(&self, id: ObjectId, class: ClassId) -> bool {
        self.cast(id, class).is_some()
    }

    /// Concrete class of `id`.
    pub fn class_of(&self, id: ObjectId) -> Option<&'static ClassDef> {
        match self.node(id) {
            Some(node) => Some(node.class),
            None => {
                self.report(Violation::StaleHandle {
                    op: "class_of",
                    handle: id,
                });
                None
            }
        }
    }

    /// The `Object` header of `id`.
    pub fn header(&self, id: ObjectId) -> Option<&Object> {
        let Some(node) = self.node(id) else {
            self.report(Violation::StaleHandle {
                op: "header",
                handle: id,
            });
            return None;
        };
        // SAFETY: header points into live storage owned by this runtime.
        Some(unsafe { node.header.as_ref() })
    }

    fn typed_segment<T: Class>(&self, id: ObjectId, op: &'static str) -> Option<NonNull<u8>> {
        let def = T::class_def();
        let Some(node) = self.node(id) else {
            self.report(Violation::StaleHandle { op, handle: id });
            return None;
        };
        let entry = node.class.cast_info.find(def.id)?;
        // Same id from a different descriptor would mean a different layout.
        if !std::ptr::eq(entry.class, def) {
            return None;
        }
        // SAFETY: validated tables keep every segment inside the object.
        Some(unsafe { node.storage.add(entry.offset) })
    }

    /// Cast without violation reporting.
    pub(crate) fn cast_node(node: &Node, target: ClassId) -> Option<NonNull<u8>> {
        let entry = node.class.cast_info.find(target)?;
        // SAFETY: validated tables keep every segment inside the object.
        Some(unsafe { node.storage.add(entry.offset) })
    }

    // ========================================================================
    // Arena
    // ========================================================================

    pub(crate) fn node(&self, id: ObjectId) -> Option<&Node> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn node_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    fn reserve_slot(
        &mut self,
        storage: NonNull<u8>,
        class: &'static ClassDef,
        flags: CreateFlags,
        header: NonNull<Object>,
    ) -> Result<ObjectId> {
        let node = Node {
            storage,
            class,
            flags,
            header,
            parent: None,
            children: Vec::new(),
        };

        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return Ok(ObjectId::new(index, slot.generation));
        }

        let index = u32::try_from(self.slots.len())
            .map_err(|_| Error::ResourceLimitExceeded(self.slots.len()))?;
        self.slots.push(Slot {
            generation: 1,
            node: Some(node),
        });
        Ok(ObjectId::new(index, 1))
    }

    /// Retire the slot so every outstanding copy of `id` goes stale.
    fn release_slot(&mut self, id: ObjectId) {
        let Some(slot) = self.slots.get_mut(id.index() as usize) else {
            return;
        };
        slot.node = None;
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        self.free_slots.push(id.index());
    }

    pub(crate) fn report(&self, violation: Violation) {
        (self.assert_hook)(&violation);
        if self.config.panic_on_violation {
            panic!("objrt invariant violated: {violation}");
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("classes", &self.catalog.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if self.stats.live == 0 {
            return;
        }
        log::warn!(
            "[objrt] runtime dropped with {} live objects, destroying them",
            self.stats.live
        );
        let roots: Vec<ObjectId> = self
            .objects()
            .into_iter()
            .filter(|&id| self.node(id).is_some_and(|node| node.parent.is_none()))
            .collect();
        for root in roots {
            if let Err(e) = self.destroy_tree(root) {
                log::error!("[objrt] failed to destroy {} on drop: {}", root, e);
            }
        }
    }
}

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    allocator: Option<Arc<dyn Allocator>>,
    catalog: Option<ClassCatalog>,
    extra_classes: Vec<&'static ClassDef>,
    config: RuntimeConfig,
    assert_hook: Option<AssertHook>,
}

impl RuntimeBuilder {
    /// Storage source; defaults to [`SystemAllocator`].
    #[must_use]
    pub fn allocator<A: Allocator + 'static>(mut self, allocator: Arc<A>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Replace the builtin catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: ClassCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Register additional classes; checked by [`build`](Self::build).
    #[must_use]
    pub fn classes(mut self, classes: &[&'static ClassDef]) -> Self {
        self.extra_classes.extend_from_slice(classes);
        self
    }

    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Receive invariant violations; defaults to logging them.
    #[must_use]
    pub fn assert_hook(mut self, hook: impl Fn(&Violation) + 'static) -> Self {
        self.assert_hook = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Result<Runtime> {
        let assert_hook = self.assert_hook.unwrap_or_else(default_hook);

        let catalog = self
            .catalog
            .unwrap_or_else(ClassCatalog::builtin)
            .with_classes(&self.extra_classes);
        let catalog = match catalog {
            Ok(catalog) => catalog,
            Err(err) => {
                let violation = match &err {
                    Error::DuplicateClassId(class) => Some(Violation::DuplicateClassId(*class)),
                    Error::InvalidClass { class, reason } => Some(Violation::MalformedClass {
                        class: *class,
                        reason: *reason,
                    }),
                    _ => None,
                };
                if let Some(violation) = violation {
                    assert_hook(&violation);
                }
                return Err(err);
            }
        };

        log::debug!(
            "[objrt] runtime ready: {} classes, scrub_on_release={}, max_live_objects={:?}",
            catalog.len(),
            self.config.scrub_on_release,
            self.config.max_live_objects
        );

        Ok(Runtime {
            allocator: self.allocator.unwrap_or_else(|| Arc::new(SystemAllocator)),
            catalog,
            config: self.config,
            assert_hook,
            slots: Vec::new(),
            free_slots: Vec::new(),
            stats: RuntimeStats::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{GpuGroup, Os};
    use crate::object::{CreateFlags, OBJECT_CLASS_ID};

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut rt = Runtime::builder().build().expect("runtime should build");
        let a = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        rt.destroy(a).expect("destroy");

        let b = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        assert_eq!(a.index(), b.index());
        assert_eq!(b.generation(), a.generation() + 1);
        assert!(!rt.contains(a));
        assert!(rt.contains(b));
        rt.destroy(b).expect("destroy");
    }

    #[test]
    fn test_typed_get_rejects_other_class() {
        let mut rt = Runtime::builder().build().expect("runtime should build");
        let os = rt.create::<Os>(None, CreateFlags::NONE).expect("create");

        assert!(rt.get::<Os>(os).is_some());
        assert!(rt.get::<Object>(os).is_some());
        assert!(rt.get::<GpuGroup>(os).is_none());
        assert_eq!(rt.class_of(os).map(|def| def.id), Some(Os::class_def().id));
        rt.destroy(os).expect("destroy");
    }

    #[test]
    fn test_objects_lists_live_handles() {
        let mut rt = Runtime::builder().build().expect("runtime should build");
        let a = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let b = rt.create::<GpuGroup>(None, CreateFlags::NONE).expect("create");
        assert_eq!(rt.objects(), vec![a, b]);
        assert_eq!(rt.len(), 2);
        rt.destroy(a).expect("destroy");
        assert_eq!(rt.objects(), vec![b]);
        assert!(rt.is_instance_of(b, OBJECT_CLASS_ID));
    }

    #[test]
    fn test_drop_releases_remaining_objects() {
        let tracker = Arc::new(crate::alloc::TrackingAllocator::new());
        {
            let mut rt = Runtime::builder()
                .allocator(Arc::clone(&tracker))
                .build()
                .expect("runtime should build");
            let parent = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
            rt.create::<GpuGroup>(Some(parent), CreateFlags::NONE)
                .expect("create");
        }
        assert!(tracker.is_balanced());
    }
}
