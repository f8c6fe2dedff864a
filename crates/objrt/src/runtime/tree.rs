// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parent/child ownership tree.
//!
//! Links live in the arena, not in object storage. A child has at most one
//! parent and the graph stays acyclic.

use super::{ObjectId, Runtime};
use crate::class::ClassId;
use crate::error::{Error, Result};
use crate::object::OBJECT_CLASS_ID;

impl Runtime {
    /// Link `child` under `parent`.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<()> {
        if !self.is_object(parent) {
            return Err(Error::InvalidAncestor(parent));
        }
        let Some(child_node) = self.node(child) else {
            return Err(Error::InvalidHandle(child));
        };
        if let Some(existing) = child_node.parent {
            return Err(Error::AlreadyParented {
                child,
                parent: existing,
            });
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::WouldCycle { parent, child });
        }

        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(child);
        }
        if let Some(child_node) = self.node_mut(child) {
            child_node.parent = Some(parent);
        }
        log::trace!("[objrt] linked {} under {}", child, parent);
        Ok(())
    }

    /// Unlink `child` from `parent`.
    ///
    /// `Ok(false)` if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<bool> {
        if !self.is_object(parent) {
            return Err(Error::InvalidAncestor(parent));
        }
        let Some(parent_node) = self.node_mut(parent) else {
            return Err(Error::InvalidAncestor(parent));
        };
        let Some(pos) = parent_node.children.iter().position(|&c| c == child) else {
            return Ok(false);
        };
        parent_node.children.remove(pos);

        if let Some(child_node) = self.node_mut(child) {
            if child_node.parent == Some(parent) {
                child_node.parent = None;
            }
        }
        log::trace!("[objrt] unlinked {} from {}", child, parent);
        Ok(true)
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Direct children in insertion order; empty for a stale handle.
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Every object below `id`, pre-order, excluding `id`.
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack: Vec<ObjectId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Nearest proper ancestor of `id` that is an instance of `class`.
    pub fn find_ancestor(&self, id: ObjectId, class: ClassId) -> Option<ObjectId> {
        let mut current = self.parent(id);
        while let Some(candidate) = current {
            if self
                .node(candidate)
                .is_some_and(|node| Self::cast_node(node, class).is_some())
            {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Remove `id` from its parent's child list, if it has a parent.
    pub(crate) fn detach_from_parent(&mut self, id: ObjectId) {
        let Some(parent) = self.node_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.retain(|&c| c != id);
        }
    }

    fn is_object(&self, id: ObjectId) -> bool {
        self.node(id)
            .is_some_and(|node| Self::cast_node(node, OBJECT_CLASS_ID).is_some())
    }

    fn is_ancestor_or_self(&self, candidate: ObjectId, of: ObjectId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{GpuGroup, Os, OS_CLASS};
    use crate::object::CreateFlags;

    fn runtime() -> Runtime {
        Runtime::builder().build().expect("runtime should build")
    }

    #[test]
    fn test_create_with_owner_links_child() {
        let mut rt = runtime();
        let os = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let group = rt.create::<GpuGroup>(Some(os), CreateFlags::NONE).expect("create");

        assert_eq!(rt.parent(group), Some(os));
        assert_eq!(rt.children(os), &[group]);
        assert_eq!(rt.find_ancestor(group, OS_CLASS.id), Some(os));
        assert_eq!(rt.find_ancestor(os, OS_CLASS.id), None);
    }

    #[test]
    fn test_skip_parent_link() {
        let mut rt = runtime();
        let os = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let group = rt
            .create::<GpuGroup>(Some(os), CreateFlags::SKIP_PARENT_LINK)
            .expect("create");

        assert_eq!(rt.parent(group), None);
        assert!(rt.children(os).is_empty());
    }

    #[test]
    fn test_cycle_and_double_parent_rejected() {
        let mut rt = runtime();
        let a = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let b = rt.create::<GpuGroup>(Some(a), CreateFlags::NONE).expect("create");
        let c = rt.create::<GpuGroup>(None, CreateFlags::NONE).expect("create");

        assert!(matches!(rt.add_child(b, a), Err(Error::WouldCycle { .. })));
        assert!(matches!(rt.add_child(a, a), Err(Error::WouldCycle { .. })));
        assert!(matches!(
            rt.add_child(c, b),
            Err(Error::AlreadyParented { parent, .. }) if parent == a
        ));
    }

    #[test]
    fn test_remove_absent_child_is_noop() {
        let mut rt = runtime();
        let a = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let b = rt.create::<GpuGroup>(None, CreateFlags::NONE).expect("create");

        assert!(!rt.remove_child(a, b).expect("remove"));
        rt.add_child(a, b).expect("link");
        assert!(rt.remove_child(a, b).expect("remove"));
        assert_eq!(rt.parent(b), None);
        assert!(rt.children(a).is_empty());
    }

    #[test]
    fn test_stale_parent_is_invalid_ancestor() {
        let mut rt = runtime();
        let a = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let b = rt.create::<GpuGroup>(None, CreateFlags::NONE).expect("create");
        rt.destroy(a).expect("destroy");

        assert!(matches!(rt.add_child(a, b), Err(Error::InvalidAncestor(id)) if id == a));
        assert!(matches!(rt.remove_child(a, b), Err(Error::InvalidAncestor(_))));
        assert!(matches!(
            rt.create::<GpuGroup>(Some(a), CreateFlags::NONE),
            Err(Error::InvalidAncestor(_))
        ));
        assert_eq!(rt.len(), 1);
    }

    #[test]
    fn test_descendants_pre_order() {
        let mut rt = runtime();
        let root = rt.create::<Os>(None, CreateFlags::NONE).expect("create");
        let a = rt.create::<GpuGroup>(Some(root), CreateFlags::NONE).expect("create");
        let a1 = rt.create::<GpuGroup>(Some(a), CreateFlags::NONE).expect("create");
        let b = rt.create::<GpuGroup>(Some(root), CreateFlags::NONE).expect("create");

        assert_eq!(rt.descendants(root), vec![a, a1, b]);
        assert!(rt.descendants(b).is_empty());
    }
}
