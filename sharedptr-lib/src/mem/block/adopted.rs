use core::{
    alloc::Layout,
    mem::replace,
    ptr::{null_mut, NonNull},
};

use log::trace;

use crate::mem::{deleter::Deleter, error::AllocError, manager::Manager};

use super::{header::BlockHeader, BlockRef, ControlBlock};

/// A control block for a payload allocated elsewhere. Only the block itself is freed by `M`,
/// the payload is handed to `D`.
#[repr(C)]
pub struct AdoptedBlock<T, D: Deleter<T>, M: Manager> {
    header: BlockHeader,
    ptr: *mut T,
    deleter: Option<D>,
    manager: M,
}

impl<T, D: Deleter<T>, M: Manager> AdoptedBlock<T, D, M> {
    const LAYOUT: Layout = Layout::new::<Self>();
    /// Allocates a block adopting `ptr`.
    ///
    /// If the manager fails to allocate, `deleter` is still applied to a non-null `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid to be passed to `deleter`.
    pub unsafe fn try_new(
        ptr: *mut T,
        owners: usize,
        observers: usize,
        deleter: D,
        manager: M,
    ) -> Result<BlockRef, AllocError> {
        let p = manager.alloc(Self::LAYOUT) as *mut Self;
        let Some(block) = NonNull::new(p) else {
            if !ptr.is_null() {
                deleter.delete(ptr);
            }
            return Err(AllocError::new(Self::LAYOUT));
        };
        p.write(Self {
            header: BlockHeader::new(Self::VTABLE, owners, observers),
            ptr,
            deleter: Some(deleter),
            manager,
        });
        trace!(
            "block {:p}: adopted {:p}, {} bytes",
            p,
            ptr,
            Self::LAYOUT.size()
        );
        Ok(BlockRef::new(block.cast()))
    }
}

unsafe impl<T, D: Deleter<T>, M: Manager> ControlBlock for AdoptedBlock<T, D, M> {
    #[inline(always)]
    unsafe fn address(this: *const Self) -> *mut () {
        (*this).ptr as *mut ()
    }
    unsafe fn release_payload(this: *mut Self) {
        let ptr = replace(&mut (*this).ptr, null_mut());
        if let (false, Some(deleter)) = (ptr.is_null(), (*this).deleter.take()) {
            deleter.delete(ptr);
        }
    }
    unsafe fn release_storage(this: *mut Self) {
        let Self {
            manager, deleter, ..
        } = this.read();
        drop(deleter);
        manager.dealloc(this as *mut u8, Self::LAYOUT);
    }
}
