use core::cell::Cell;
use std::process::abort;

use crate::mem::ref_counter_update::RefCounterUpdate;

use super::BlockVTable;

/// A non-atomic reference counter.
#[derive(Debug, Default)]
#[repr(transparent)]
pub struct Counter(Cell<usize>);

impl Counter {
    #[inline(always)]
    pub const fn new(value: usize) -> Self {
        Self(Cell::new(value))
    }
    /// Returns the value of the counter after the update.
    #[inline(always)]
    pub fn update(&self, i: RefCounterUpdate) -> usize {
        let value = self.0.get();
        let result = match i {
            RefCounterUpdate::Read => return value,
            RefCounterUpdate::AddRef => match value.checked_add(1) {
                Some(result) => result,
                None => abort(),
            },
            RefCounterUpdate::Release => {
                debug_assert!(value > 0, "reference counter underflow");
                value - 1
            }
        };
        self.0.set(result);
        result
    }
}

/// The type-erased prefix of every control block.
#[repr(C)]
pub struct BlockHeader {
    pub(super) vtable: &'static BlockVTable,
    pub(super) owners: Counter,
    pub(super) observers: Counter,
}

impl BlockHeader {
    #[inline(always)]
    pub const fn new(vtable: &'static BlockVTable, owners: usize, observers: usize) -> Self {
        Self {
            vtable,
            owners: Counter::new(owners),
            observers: Counter::new(observers),
        }
    }
}
