pub mod adopted;
pub mod combined;
pub mod header;

use core::ptr::NonNull;

use log::trace;

use self::header::BlockHeader;

use super::ref_counter_update::RefCounterUpdate;

/// Block = (Header, Payload or a pointer to it, Manager)
///
/// # Safety
///
/// `Self` must be `#[repr(C)]` with a [`BlockHeader`] as its first field, so a pointer to the
/// header is a pointer to the block.
pub unsafe trait ControlBlock: Sized {
    // required:
    unsafe fn address(this: *const Self) -> *mut ();
    /// Runs the payload destruction. Called once, when the last owner goes away.
    unsafe fn release_payload(this: *mut Self);
    /// Returns the block memory to its manager. Called once, after `release_payload`.
    unsafe fn release_storage(this: *mut Self);
    // optional:
    const VTABLE: &'static BlockVTable = &BlockVTable {
        address: address::<Self>,
        release_payload: release_payload::<Self>,
        release_storage: release_storage::<Self>,
    };
}

/// Dispatch table shared by all blocks of one concrete type.
pub struct BlockVTable {
    address: unsafe fn(*const BlockHeader) -> *mut (),
    release_payload: unsafe fn(*mut BlockHeader),
    release_storage: unsafe fn(*mut BlockHeader),
}

unsafe fn address<B: ControlBlock>(header: *const BlockHeader) -> *mut () {
    B::address(header as *const B)
}

unsafe fn release_payload<B: ControlBlock>(header: *mut BlockHeader) {
    B::release_payload(header as *mut B)
}

unsafe fn release_storage<B: ControlBlock>(header: *mut BlockHeader) {
    B::release_storage(header as *mut B)
}

/// A non-generic pointer to a control block of any concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct BlockRef(NonNull<BlockHeader>);

impl BlockRef {
    /// # Safety
    ///
    /// `header` must be the header of a live block built by a [`ControlBlock`] implementation.
    #[inline(always)]
    pub unsafe fn new(header: NonNull<BlockHeader>) -> Self {
        Self(header)
    }
    #[inline(always)]
    fn header(&self) -> &BlockHeader {
        unsafe { self.0.as_ref() }
    }
    #[inline(always)]
    pub fn owners(self, i: RefCounterUpdate) -> usize {
        self.header().owners.update(i)
    }
    #[inline(always)]
    pub fn observers(self, i: RefCounterUpdate) -> usize {
        self.header().observers.update(i)
    }
    /// The payload address. Null only for an adopted null pointer or a released adopted payload.
    #[inline(always)]
    pub fn address(self) -> *mut () {
        unsafe { (self.header().vtable.address)(self.0.as_ptr()) }
    }
    /// Drops one owner reference.
    ///
    /// # Safety
    ///
    /// The caller must own one owner reference and must not use it afterwards.
    pub unsafe fn release_owner(self) {
        if self.owners(RefCounterUpdate::Release) != 0 {
            return;
        }
        // The owners hold one observer reference while the payload is released. A payload can
        // observe its own block and its drop must not free the storage under us.
        self.observers(RefCounterUpdate::AddRef);
        trace!("block {:p}: release payload", self.0);
        let release_payload = self.header().vtable.release_payload;
        release_payload(self.0.as_ptr());
        self.release_observer();
    }
    /// Drops one observer reference.
    ///
    /// # Safety
    ///
    /// The caller must own one observer reference and must not use it afterwards.
    pub unsafe fn release_observer(self) {
        if self.observers(RefCounterUpdate::Release) == 0
            && self.owners(RefCounterUpdate::Read) == 0
        {
            trace!("block {:p}: release storage", self.0);
            let release_storage = self.header().vtable.release_storage;
            release_storage(self.0.as_ptr());
        }
    }
}

#[cfg(test)]
mod test {
    use core::cell::Cell;

    use wasm_bindgen_test::wasm_bindgen_test;

    use crate::mem::{
        block::combined::CombinedBlock, local::Local, new_in_place::Fixed,
        ref_counter_update::RefCounterUpdate,
    };

    struct Probe<'a>(&'a Cell<usize>);

    impl Drop for Probe<'_> {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_two_phase_release() {
        let local = Local::default();
        let dropped = Cell::new(0);
        let block = CombinedBlock::try_new(1, 0, &local, Fixed(Probe(&dropped))).unwrap();
        assert_eq!(block.owners(RefCounterUpdate::Read), 1);
        assert_eq!(block.observers(RefCounterUpdate::Read), 0);
        assert_eq!(local.blocks(), 1);
        block.observers(RefCounterUpdate::AddRef);
        unsafe { block.release_owner() };
        assert_eq!(dropped.get(), 1);
        assert_eq!(local.blocks(), 1);
        assert_eq!(block.owners(RefCounterUpdate::Read), 0);
        assert_eq!(block.observers(RefCounterUpdate::Read), 1);
        unsafe { block.release_observer() };
        assert_eq!(dropped.get(), 1);
        assert_eq!(local.blocks(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_single_owner() {
        let local = Local::default();
        let dropped = Cell::new(0);
        let block = CombinedBlock::try_new(1, 0, &local, Fixed(Probe(&dropped))).unwrap();
        block.owners(RefCounterUpdate::AddRef);
        unsafe { block.release_owner() };
        assert_eq!(dropped.get(), 0);
        assert_eq!(block.owners(RefCounterUpdate::Read), 1);
        unsafe { block.release_owner() };
        assert_eq!(dropped.get(), 1);
        assert_eq!(local.blocks(), 0);
        assert_eq!(local.size(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_address() {
        let local = Local::default();
        let block = CombinedBlock::try_new(1, 0, &local, Fixed(42u64)).unwrap();
        let p = block.address() as *const u64;
        assert_eq!(p as usize % core::mem::align_of::<u64>(), 0);
        assert_eq!(unsafe { *p }, 42);
        unsafe { block.release_owner() };
        assert_eq!(local.blocks(), 0);
    }
}
