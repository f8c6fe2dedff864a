// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{ObjectId, Runtime};
use crate::assert::Violation;
use crate::error::{Error, Result};
use std::ptr;

impl Runtime {
    /// Destroy one object.
    ///
    /// Destructors run leaf-to-root, then the object is unlinked from its
    /// parent, its storage is scrubbed (if configured) and released, and the
    /// handle goes stale. Children still attached are detached and become
    /// roots; that is reported as a violation.
    pub fn destroy(&mut self, id: ObjectId) -> Result<()> {
        let Some(node) = self.node(id) else {
            self.report(Violation::StaleHandle {
                op: "destroy",
                handle: id,
            });
            return Err(Error::InvalidHandle(id));
        };
        let (storage, class, flags) = (node.storage, node.class, node.flags);
        let Some(layout) = class.layout() else {
            return Err(Error::InvalidClass {
                class: class.id,
                reason: "invalid size/alignment",
            });
        };
        let orphans = match self.node_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => Vec::new(),
        };

        // SAFETY: a live object has every segment constructed.
        unsafe { Self::run_dtors(storage, class.relatives()) };

        if !orphans.is_empty() {
            log::warn!(
                "[objrt] destroying {} {} with {} live children",
                class.display_name(),
                id,
                orphans.len()
            );
            for child in &orphans {
                if let Some(child_node) = self.node_mut(*child) {
                    child_node.parent = None;
                }
            }
            self.report(Violation::OrphanedChildren {
                parent: id,
                count: orphans.len(),
            });
        }

        self.detach_from_parent(id);

        if self.config.scrub_on_release {
            // SAFETY: storage stays owned by this object until released below.
            unsafe { ptr::write_bytes(storage.as_ptr(), 0, class.size) };
        }
        self.release_storage(storage, layout, flags);
        self.release_slot(id);

        self.stats.destroyed += 1;
        self.stats.live -= 1;
        log::debug!("[objrt] destroyed {} {}", class.display_name(), id);
        Ok(())
    }

    /// Destroy `root` and everything below it, children before parents.
    ///
    /// Returns the number of objects destroyed.
    pub fn destroy_tree(&mut self, root: ObjectId) -> Result<usize> {
        if !self.contains(root) {
            self.report(Violation::StaleHandle {
                op: "destroy_tree",
                handle: root,
            });
            return Err(Error::InvalidHandle(root));
        }

        // Reversed pre-order puts every descendant before its ancestors.
        let mut order = self.descendants(root);
        order.reverse();
        order.push(root);

        for id in &order {
            self.destroy(*id)?;
        }
        Ok(order.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::TrackingAllocator;
    use crate::classes::{GpuGroup, Os};
    use crate::object::CreateFlags;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    #[test]
    fn test_destroy_twice_reports_stale_handle() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut rt = Runtime::builder()
            .assert_hook(move |v| sink.borrow_mut().push(v.clone()))
            .build()
            .expect("runtime should build");

        let os = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        rt.destroy(os).expect("first destroy");
        let err = rt.destroy(os).expect_err("second destroy");

        assert!(matches!(err, Error::InvalidHandle(id) if id == os));
        assert_eq!(
            seen.borrow().as_slice(),
            &[Violation::StaleHandle {
                op: "destroy",
                handle: os
            }]
        );
    }

    #[test]
    fn test_destroy_tree_frees_everything() {
        let tracker = Arc::new(TrackingAllocator::new());
        let mut rt = Runtime::builder()
            .allocator(Arc::clone(&tracker))
            .build()
            .expect("runtime should build");

        let root = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let a = rt.create::<GpuGroup>(Some(root), CreateFlags::NONE).expect("create");
        rt.create::<GpuGroup>(Some(a), CreateFlags::NONE).expect("create");
        rt.create::<GpuGroup>(Some(root), CreateFlags::NONE).expect("create");

        assert_eq!(rt.destroy_tree(root).expect("destroy tree"), 4);
        assert!(rt.is_empty());
        assert!(tracker.is_balanced());
        assert_eq!(rt.stats().destroyed, 4);
    }

    #[test]
    fn test_destroying_parent_orphans_children() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut rt = Runtime::builder()
            .assert_hook(move |v| sink.borrow_mut().push(v.clone()))
            .build()
            .expect("runtime should build");

        let parent = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let child = rt.create::<GpuGroup>(Some(parent), CreateFlags::NONE).expect("create");
        rt.destroy(parent).expect("destroy parent");

        assert!(rt.contains(child));
        assert_eq!(rt.parent(child), None);
        assert_eq!(
            seen.borrow().as_slice(),
            &[Violation::OrphanedChildren { parent, count: 1 }]
        );
        rt.destroy(child).expect("destroy child");
    }
}
