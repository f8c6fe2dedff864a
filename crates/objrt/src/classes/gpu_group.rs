// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `OBJGPUGRP`: a set of GPUs managed together.

use crate::class::Lifecycle;
use crate::define_class;
use crate::object::{Object, OBJECT_CLASS};

/// Highest GPU instance a group can hold, exclusive.
pub const MAX_GPUS: u32 = 32;

#[repr(C)]
#[derive(Debug)]
pub struct GpuGroup {
    pub base: Object,
    gpu_mask: u32,
}

impl GpuGroup {
    /// Bit `n` set means GPU instance `n` belongs to the group.
    pub fn gpu_mask(&self) -> u32 {
        self.gpu_mask
    }

    /// Add a GPU; `false` if `instance` is out of range or already present.
    pub fn add_gpu(&mut self, instance: u32) -> bool {
        if instance >= MAX_GPUS || self.contains(instance) {
            return false;
        }
        self.gpu_mask |= 1 << instance;
        true
    }

    pub fn remove_gpu(&mut self, instance: u32) -> bool {
        if !self.contains(instance) {
            return false;
        }
        self.gpu_mask &= !(1 << instance);
        true
    }

    pub fn contains(&self, instance: u32) -> bool {
        instance < MAX_GPUS && self.gpu_mask & (1 << instance) != 0
    }

    pub fn gpu_count(&self) -> u32 {
        self.gpu_mask.count_ones()
    }

    /// GPU instances in ascending order.
    pub fn gpus(&self) -> impl Iterator<Item = u32> + '_ {
        (0..MAX_GPUS).filter(move |&n| self.contains(n))
    }
}

impl Lifecycle for GpuGroup {
    fn destruct(&mut self) {
        if self.gpu_mask != 0 {
            log::debug!("[objrt] releasing gpu group with mask {:#x}", self.gpu_mask);
        }
        self.gpu_mask = 0;
    }
}

define_class! {
    /// Descriptor of [`GpuGroup`].
    pub static GPU_GROUP_CLASS: GpuGroup {
        id: 0xe40531,
        name: "OBJGPUGRP",
        ancestors: [Object: OBJECT_CLASS => base],
    }
}
