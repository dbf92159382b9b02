use core::{
    alloc::Layout,
    mem::{forget, MaybeUninit},
    ptr::{addr_of, addr_of_mut, NonNull},
};

use log::trace;

use crate::mem::{error::AllocError, manager::Manager, new_in_place::NewInPlace};

use super::{header::BlockHeader, BlockRef, ControlBlock};

/// A control block which stores the payload inline, one allocation for both.
#[repr(C)]
pub struct CombinedBlock<T, M: Manager> {
    header: BlockHeader,
    manager: M,
    object: MaybeUninit<T>,
}

/// Returns the memory to the manager if the payload construction unwinds.
struct Unwind<'a, M: Manager> {
    manager: &'a M,
    ptr: *mut u8,
    layout: Layout,
}

impl<M: Manager> Drop for Unwind<'_, M> {
    fn drop(&mut self) {
        unsafe { self.manager.dealloc(self.ptr, self.layout) }
    }
}

impl<T, M: Manager> CombinedBlock<T, M> {
    const LAYOUT: Layout = Layout::new::<Self>();
    /// Allocates a block with `manager` and initializes the payload with `new_in_place`.
    pub fn try_new<N: NewInPlace<Result = T>>(
        owners: usize,
        observers: usize,
        manager: M,
        new_in_place: N,
    ) -> Result<BlockRef, AllocError> {
        unsafe {
            let p = manager.alloc(Self::LAYOUT) as *mut Self;
            let Some(block) = NonNull::new(p) else {
                return Err(AllocError::new(Self::LAYOUT));
            };
            {
                let unwind = Unwind {
                    manager: &manager,
                    ptr: p as *mut u8,
                    layout: Self::LAYOUT,
                };
                new_in_place.new_in_place(addr_of_mut!((*p).object) as *mut T);
                forget(unwind);
            }
            addr_of_mut!((*p).header).write(BlockHeader::new(Self::VTABLE, owners, observers));
            addr_of_mut!((*p).manager).write(manager);
            trace!("block {:p}: combined, {} bytes", p, Self::LAYOUT.size());
            Ok(BlockRef::new(block.cast()))
        }
    }
}

unsafe impl<T, M: Manager> ControlBlock for CombinedBlock<T, M> {
    #[inline(always)]
    unsafe fn address(this: *const Self) -> *mut () {
        addr_of!((*this).object) as *mut ()
    }
    unsafe fn release_payload(this: *mut Self) {
        let object = addr_of_mut!((*this).object) as *mut T;
        (*addr_of!((*this).manager)).destroy(object);
    }
    unsafe fn release_storage(this: *mut Self) {
        let manager = addr_of!((*this).manager).read();
        manager.dealloc(this as *mut u8, Self::LAYOUT);
    }
}
