use core::{alloc::Layout, ptr::drop_in_place};
use std::alloc::handle_alloc_error;

use super::{
    block::combined::CombinedBlock,
    error::AllocError,
    new_in_place::{Fixed, Init, NewInPlace},
    shared::Shared,
};

/// An allocator descriptor. A block keeps the manager it was allocated with and returns its
/// memory to the same manager.
pub trait Manager: Sized {
    // required:
    /// Returns null if the memory can't be allocated.
    unsafe fn alloc(&self, layout: Layout) -> *mut u8;
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout);
    // optional:
    /// Destroys an object constructed in memory of this manager.
    #[inline(always)]
    unsafe fn destroy<T>(&self, p: *mut T) {
        drop_in_place(p)
    }
    /// Allocate a block for a new object together with its counters and initialize the object
    /// with the `new_in_place`.
    fn try_shared_new<N: NewInPlace>(self, new_in_place: N) -> Result<Shared<N::Result>, AllocError>
    where
        Self: 'static,
    {
        let block = CombinedBlock::try_new(1, 0, self, new_in_place)?;
        Ok(unsafe { Shared::from_block(block) })
    }
    fn shared_new<N: NewInPlace>(self, new_in_place: N) -> Shared<N::Result>
    where
        Self: 'static,
    {
        match self.try_shared_new(new_in_place) {
            Ok(result) => result,
            Err(e) => handle_alloc_error(e.layout()),
        }
    }
    fn fixed_new<T>(self, value: T) -> Shared<T>
    where
        Self: 'static,
    {
        self.shared_new(Fixed(value))
    }
    fn init_new<T>(self, f: impl FnOnce() -> T) -> Shared<T>
    where
        Self: 'static,
    {
        self.shared_new(Init(f))
    }
}
