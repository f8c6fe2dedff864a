// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::class::{ClassDef, ClassId};
use crate::classes::{GPU_GROUP_CLASS, OS_CLASS};
use crate::error::{Error, Result};
use crate::object::OBJECT_CLASS;

/// Set of classes a runtime can instantiate by id.
///
/// Every descriptor is validated on insertion and ids are unique.
#[derive(Debug, Clone)]
pub struct ClassCatalog {
    classes: Vec<&'static ClassDef>,
}

impl ClassCatalog {
    /// Empty catalog.
    pub fn empty() -> Self {
        Self {
            classes: Vec::new(),
        }
    }

    pub fn new(classes: &[&'static ClassDef]) -> Result<Self> {
        Self::empty().with_classes(classes)
    }

    /// `Object`, `Os` and `GpuGroup`.
    pub fn builtin() -> Self {
        Self {
            classes: vec![&OBJECT_CLASS, &OS_CLASS, &GPU_GROUP_CLASS],
        }
    }

    /// Add classes, checking each one.
    pub fn with_classes(mut self, classes: &[&'static ClassDef]) -> Result<Self> {
        for &def in classes {
            self.insert(def)?;
        }
        Ok(self)
    }

    pub fn insert(&mut self, def: &'static ClassDef) -> Result<()> {
        def.validate().map_err(|reason| Error::InvalidClass {
            class: def.id,
            reason,
        })?;
        if self.lookup(def.id).is_some() {
            return Err(Error::DuplicateClassId(def.id));
        }
        self.classes.push(def);
        Ok(())
    }

    pub fn lookup(&self, id: ClassId) -> Option<&'static ClassDef> {
        self.classes.iter().copied().find(|def| def.id == id)
    }

    pub fn contains(&self, id: ClassId) -> bool {
        self.lookup(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ClassDef> + '_ {
        self.classes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::OBJECT_CLASS_ID;

    #[test]
    fn test_builtin_lookup() {
        let catalog = ClassCatalog::builtin();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.contains(OBJECT_CLASS_ID));
        assert_eq!(
            catalog.lookup(ClassId(0xaa1d70)).map(|def| def.id),
            Some(OS_CLASS.id)
        );
        assert!(catalog.lookup(ClassId(0x123456)).is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = ClassCatalog::new(&[&OS_CLASS, &OBJECT_CLASS, &OS_CLASS])
            .expect_err("duplicate id must be rejected");
        assert!(matches!(err, Error::DuplicateClassId(id) if id == OS_CLASS.id));
    }

    #[test]
    fn test_builtin_classes_are_unique() {
        let catalog = ClassCatalog::builtin();
        let ids: Vec<ClassId> = catalog.iter().map(|def| def.id).collect();
        let rebuilt = ClassCatalog::new(&catalog.iter().collect::<Vec<_>>())
            .expect("builtin classes are valid and unique");
        assert_eq!(rebuilt.len(), ids.len());
    }
}
