use core::{alloc::Layout, cell::Cell};

use super::{global::GLOBAL, manager::Manager};

/// A heap manager which keeps track of its live blocks.
#[derive(Debug, Default)]
pub struct Local {
    blocks: Cell<usize>,
    size: Cell<usize>,
}

impl Local {
    /// The number of live blocks.
    pub fn blocks(&self) -> usize {
        self.blocks.get()
    }
    /// The total size of live blocks, in bytes.
    pub fn size(&self) -> usize {
        self.size.get()
    }
}

impl Manager for &Local {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let p = GLOBAL.alloc(layout);
        if !p.is_null() {
            self.blocks.set(self.blocks.get() + 1);
            self.size.set(self.size.get() + layout.size());
        }
        p
    }
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.blocks.set(self.blocks.get() - 1);
        self.size.set(self.size.get() - layout.size());
        GLOBAL.dealloc(ptr, layout)
    }
}
