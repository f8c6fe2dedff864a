// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `OBJOS`: host operating-system services object.

use crate::class::Lifecycle;
use crate::define_class;
use crate::error::ConstructError;
use crate::object::{Object, OBJECT_CLASS};

/// Boolean properties of [`Os`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum OsProperty {
    SupportsDisplayRemapper = 1 << 0,
}

impl OsProperty {
    fn mask(self) -> u32 {
        self as u32
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct Os {
    pub base: Object,
    properties: u32,
}

impl Os {
    pub fn property(&self, property: OsProperty) -> bool {
        self.properties & property.mask() != 0
    }

    pub fn set_property(&mut self, property: OsProperty, value: bool) {
        if value {
            self.properties |= property.mask();
        } else {
            self.properties &= !property.mask();
        }
    }
}

impl Lifecycle for Os {
    fn construct(&mut self) -> Result<(), ConstructError> {
        self.set_property(OsProperty::SupportsDisplayRemapper, false);
        Ok(())
    }
}

define_class! {
    /// Descriptor of [`Os`].
    pub static OS_CLASS: Os {
        id: 0xaa1d70,
        name: "OBJOS",
        ancestors: [Object: OBJECT_CLASS => base],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties() {
        // SAFETY: Os is valid when all-zero.
        let mut os: Os = unsafe { std::mem::zeroed() };
        os.set_property(OsProperty::SupportsDisplayRemapper, true);
        assert!(os.property(OsProperty::SupportsDisplayRemapper));

        os.construct().expect("Os constructor never fails");
        assert!(!os.property(OsProperty::SupportsDisplayRemapper));
    }

    #[test]
    fn test_upcast_to_object() {
        // SAFETY: Os is valid when all-zero.
        let os: Os = unsafe { std::mem::zeroed() };
        let base: &Object = os.as_ref();
        assert!(std::ptr::eq(base, &os.base));
    }
}
