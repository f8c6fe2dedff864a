// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;

/// Generational handle to an object owned by a [`Runtime`](crate::Runtime).
///
/// Encoded as: upper 32 bits = generation, lower 32 bits = slot index.
/// Generations start at 1, so the all-zero encoding never names an object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }

    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Decode a handle; `None` for generation 0.
    pub const fn from_bits(bits: u64) -> Option<Self> {
        let generation = (bits >> 32) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self {
            index: bits as u32,
            generation,
        })
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_encoding() {
        let h = ObjectId::new(42, 1337);
        assert_eq!(h.to_bits(), (1337u64 << 32) | 42);
        assert_eq!(ObjectId::from_bits(h.to_bits()), Some(h));
        assert_eq!(h.to_string(), "#42v1337");
    }

    #[test]
    fn test_zero_generation_is_none() {
        assert_eq!(ObjectId::from_bits(0), None);
        assert_eq!(ObjectId::from_bits(7), None);
    }
}
