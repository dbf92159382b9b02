use core::alloc::Layout;
use std::alloc::{alloc, dealloc};

use super::manager::Manager;

/// The process heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct Global();

pub const GLOBAL: Global = Global();

impl Manager for Global {
    #[inline(always)]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        alloc(layout)
    }
    #[inline(always)]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        dealloc(ptr, layout)
    }
}
