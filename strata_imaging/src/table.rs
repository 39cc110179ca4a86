// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

/// Id-indexed storage for the resources a backend holds.
///
/// Released slots stay allocated, so a raw id is never handed out twice.
#[derive(Clone, Debug)]
pub struct ResourceTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResourceTable<T> {
    /// An empty table.
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Store `value` and return its raw id.
    ///
    /// # Panics
    ///
    /// If more than `u32::MAX` resources are created.
    pub fn insert(&mut self, value: T) -> u32 {
        let id =
            u32::try_from(self.slots.len()).expect("ResourceTable: too many resources for u32 id");
        self.slots.push(Some(value));
        id
    }

    /// Release `id`, returning what it held. Unknown or released ids are ignored.
    pub fn remove(&mut self, id: u32) -> Option<T> {
        self.slots.get_mut(id as usize).and_then(Option::take)
    }

    /// The value behind `id`, if it is alive.
    pub fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    /// Number of live entries.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
