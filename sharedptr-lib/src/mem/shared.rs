use core::{
    fmt,
    marker::PhantomData,
    mem::{swap, take, ManuallyDrop},
    ops::Deref,
    ptr::null_mut,
};
use std::alloc::handle_alloc_error;

use super::{
    block::{adopted::AdoptedBlock, BlockRef},
    deleter::{DefaultDelete, Deleter},
    error::AllocError,
    global::GLOBAL,
    manager::Manager,
    ref_counter_update::RefCounterUpdate,
    weak::Weak,
};

/// An owning reference to an object in a control block.
///
/// The object is destroyed when the last `Shared` of the block goes away. The block itself is
/// freed when no `Shared` or [`Weak`] refers to it.
pub struct Shared<T> {
    block: Option<BlockRef>,
    _0: PhantomData<T>,
}

impl<T> Shared<T> {
    /// An empty reference.
    #[inline(always)]
    pub const fn null() -> Self {
        Self {
            block: None,
            _0: PhantomData,
        }
    }
    /// Takes over one owner reference of the `block`.
    #[inline(always)]
    pub(crate) unsafe fn from_block(block: BlockRef) -> Self {
        Self {
            block: Some(block),
            _0: PhantomData,
        }
    }
    #[inline(always)]
    pub(crate) fn block(&self) -> Option<BlockRef> {
        self.block
    }
    /// Allocates the object and its counters on the heap in one block.
    pub fn new(value: T) -> Self {
        GLOBAL.fixed_new(value)
    }
    /// Adopts an object allocated by [`Box`].
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from [`Box::into_raw`], and must not be owned by anything else.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self::from_raw_in(ptr, DefaultDelete, GLOBAL)
    }
    /// Adopts `ptr`, `deleter` is called on it when the last owner goes away.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid to be passed to `deleter`.
    pub unsafe fn from_raw_with<D: Deleter<T> + 'static>(ptr: *mut T, deleter: D) -> Self {
        Self::from_raw_in(ptr, deleter, GLOBAL)
    }
    /// Adopts `ptr`, the control block is allocated with `manager`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid to be passed to `deleter`.
    pub unsafe fn from_raw_in<D: Deleter<T> + 'static, M: Manager + 'static>(
        ptr: *mut T,
        deleter: D,
        manager: M,
    ) -> Self {
        match Self::try_from_raw_in(ptr, deleter, manager) {
            Ok(result) => result,
            Err(e) => handle_alloc_error(e.layout()),
        }
    }
    /// Adopts `ptr`, the control block is allocated with `manager`.
    ///
    /// If the block can't be allocated, `deleter` is applied to `ptr` before the error is
    /// returned.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid to be passed to `deleter`.
    pub unsafe fn try_from_raw_in<D: Deleter<T> + 'static, M: Manager + 'static>(
        ptr: *mut T,
        deleter: D,
        manager: M,
    ) -> Result<Self, AllocError> {
        let block = AdoptedBlock::try_new(ptr, 1, 0, deleter, manager)?;
        Ok(Self::from_block(block))
    }
    /// The number of `Shared` references to the object, `0` for an empty reference.
    #[inline(always)]
    pub fn use_count(&self) -> usize {
        self.block
            .map_or(0, |block| block.owners(RefCounterUpdate::Read))
    }
    /// The number of [`Weak`] references to the object.
    #[inline(always)]
    pub fn observer_count(&self) -> usize {
        self.block
            .map_or(0, |block| block.observers(RefCounterUpdate::Read))
    }
    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.block.is_none()
    }
    /// The address of the object, or null for an empty reference.
    #[inline(always)]
    pub fn get(&self) -> *mut T {
        self.block
            .map_or(null_mut(), |block| block.address() as *mut T)
    }
    #[inline(always)]
    pub fn as_ref(&self) -> Option<&T> {
        unsafe { self.get().as_ref() }
    }
    /// A mutable reference to the object if no other `Shared` or [`Weak`] refers to it.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        let block = self.block?;
        if block.owners(RefCounterUpdate::Read) == 1
            && block.observers(RefCounterUpdate::Read) == 0
        {
            unsafe { self.get().as_mut() }
        } else {
            None
        }
    }
    #[inline(always)]
    pub fn downgrade(&self) -> Weak<T> {
        Weak::from(self)
    }
    /// Exchanges the blocks of two references. Counters are not touched.
    #[inline(always)]
    pub fn swap(&mut self, other: &mut Self) {
        swap(&mut self.block, &mut other.block)
    }
    /// Moves the block out, leaving this reference empty.
    #[inline(always)]
    pub fn take(&mut self) -> Self {
        take(self)
    }
    /// Makes this reference share the block of `other`.
    pub fn assign(&mut self, other: &Self) {
        self.swap(&mut other.clone())
    }
    /// Releases the current block, leaving this reference empty.
    pub fn reset(&mut self) {
        self.swap(&mut Self::null())
    }
    /// Releases the current block and adopts `ptr` in a new one.
    ///
    /// # Safety
    ///
    /// The same as for [`Shared::from_raw`].
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        self.swap(&mut Self::from_raw(ptr))
    }
    /// Returns `true` if both references share one block, or both are empty.
    #[inline(always)]
    pub fn ptr_eq(lhs: &Self, rhs: &Self) -> bool {
        lhs.block == rhs.block
    }
    /// Reinterprets the object as `U`, keeping the same block and counters.
    ///
    /// # Safety
    ///
    /// The object address must be valid for reads of `U` and `U` must be droppable as `T` is.
    /// The block still destroys the object as `T`.
    pub unsafe fn cast<U>(this: Self) -> Shared<U> {
        let this = ManuallyDrop::new(this);
        Shared {
            block: this.block,
            _0: PhantomData,
        }
    }
}

impl<T> Clone for Shared<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            block.owners(RefCounterUpdate::AddRef);
        }
        Self {
            block: self.block,
            _0: PhantomData,
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block {
            unsafe { block.release_owner() }
        }
    }
}

impl<T> Default for Shared<T> {
    #[inline(always)]
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;
    /// # Panics
    ///
    /// If the reference is empty or the adopted pointer is null.
    #[inline(always)]
    fn deref(&self) -> &T {
        match self.as_ref() {
            Some(result) => result,
            None => panic!("dereference of a null shared pointer"),
        }
    }
}

impl<T> From<Box<T>> for Shared<T> {
    fn from(value: Box<T>) -> Self {
        unsafe { Self::from_raw(Box::into_raw(value)) }
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_ref() {
            Some(value) => f.debug_tuple("Shared").field(value).finish(),
            None => f.write_str("Shared(null)"),
        }
    }
}

impl<T> fmt::Pointer for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.get(), f)
    }
}

#[cfg(test)]
mod test {
    use core::{alloc::Layout, cell::Cell, ptr::null_mut};
    use std::rc::Rc;

    use wasm_bindgen_test::wasm_bindgen_test;

    use crate::mem::{local::Local, make_shared, manager::Manager};

    use super::Shared;

    struct Probe<'a>(&'a Cell<usize>);

    impl Drop for Probe<'_> {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn local() -> &'static Local {
        Box::leak(Box::default())
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_copy_and_drop() {
        let o1 = make_shared(42);
        assert_eq!(o1.use_count(), 1);
        let o2 = o1.clone();
        assert_eq!(o1.use_count(), 2);
        assert_eq!(o2.use_count(), 2);
        drop(o1);
        assert_eq!(o2.use_count(), 1);
        assert_eq!(*o2, 42);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_use_count_follows_owners() {
        let dropped = Cell::new(0);
        let mut owners = vec![make_shared(Probe(&dropped))];
        for i in 1..5 {
            owners.push(owners[0].clone());
            assert_eq!(owners[0].use_count(), i + 1);
        }
        let moved = owners.pop().unwrap();
        assert_eq!(moved.use_count(), 5);
        let mut taken = owners[0].clone();
        let other = taken.take();
        assert!(taken.is_null());
        assert_eq!(taken.use_count(), 0);
        assert_eq!(other.use_count(), 6);
        drop(other);
        drop(taken);
        owners.truncate(1);
        assert_eq!(moved.use_count(), 2);
        assert_eq!(dropped.get(), 0);
        drop(owners);
        assert_eq!(dropped.get(), 0);
        drop(moved);
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_adopted_deleter() {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let ptr = Box::into_raw(Box::new(5u8));
        let o1 = unsafe {
            Shared::from_raw_with(ptr, move |p: *mut u8| {
                drop(Box::from_raw(p));
                c.set(c.get() + 1);
            })
        };
        assert_eq!(o1.get(), ptr);
        let o2 = o1.clone();
        drop(o1);
        assert_eq!(calls.get(), 0);
        drop(o2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_adopted_manager() {
        let local = local();
        let dropped = Rc::new(Cell::new(0));
        struct Owned(Rc<Cell<usize>>);
        impl Drop for Owned {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }
        let ptr = Box::into_raw(Box::new(Owned(dropped.clone())));
        let o = unsafe { Shared::from_raw_in(ptr, crate::mem::deleter::DefaultDelete, local) };
        assert_eq!(local.blocks(), 1);
        let w = o.downgrade();
        drop(o);
        assert_eq!(dropped.get(), 1);
        assert_eq!(local.blocks(), 1);
        drop(w);
        assert_eq!(local.blocks(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_try_from_raw_in() {
        struct Exhausted();
        impl Manager for Exhausted {
            unsafe fn alloc(&self, _: Layout) -> *mut u8 {
                null_mut()
            }
            unsafe fn dealloc(&self, _: *mut u8, _: Layout) {
                panic!()
            }
        }
        let dropped = Rc::new(Cell::new(0));
        let d = dropped.clone();
        let ptr = Box::into_raw(Box::new(1));
        let result = unsafe {
            Shared::try_from_raw_in(
                ptr,
                move |p: *mut i32| {
                    drop(Box::from_raw(p));
                    d.set(d.get() + 1);
                },
                Exhausted(),
            )
        };
        assert!(result.is_err());
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_from_box() {
        let o: Shared<String> = Box::new("box".to_string()).into();
        assert_eq!(o.use_count(), 1);
        assert_eq!(o.as_str(), "box");
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_null() {
        let o = Shared::<i32>::default();
        assert!(o.is_null());
        assert_eq!(o.use_count(), 0);
        assert!(o.get().is_null());
        assert!(o.as_ref().is_none());
        let c = o.clone();
        assert!(c.is_null());
        assert!(Shared::ptr_eq(&o, &c));
        assert_eq!(format!("{:?}", o), "Shared(null)");
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_adopted_null() {
        let o = unsafe { Shared::<i32>::from_raw(null_mut()) };
        assert!(!o.is_null());
        assert_eq!(o.use_count(), 1);
        assert!(o.get().is_null());
    }

    #[test]
    #[should_panic]
    fn test_deref_null() {
        let o = Shared::<i32>::null();
        let _value: i32 = *o;
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_reset() {
        let dropped = Cell::new(0);
        let mut o = make_shared(Probe(&dropped));
        let c = o.clone();
        o.reset();
        assert!(o.is_null());
        assert_eq!(c.use_count(), 1);
        assert_eq!(dropped.get(), 0);
        drop(c);
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_reset_raw() {
        let mut o = make_shared(1);
        let old = o.clone();
        unsafe { o.reset_raw(Box::into_raw(Box::new(2))) };
        assert_eq!(*o, 2);
        assert_eq!(o.use_count(), 1);
        assert_eq!(*old, 1);
        assert_eq!(old.use_count(), 1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_assign() {
        let dropped = Cell::new(0);
        let a = make_shared(Probe(&dropped));
        let mut b = make_shared(Probe(&dropped));
        b.assign(&a);
        assert_eq!(dropped.get(), 1);
        assert!(Shared::ptr_eq(&a, &b));
        assert_eq!(a.use_count(), 2);
        b.assign(&b.clone());
        assert_eq!(a.use_count(), 2);
        let mut c = make_shared(Probe(&dropped));
        c.swap(&mut b);
        assert_eq!(b.use_count(), 1);
        assert_eq!(c.use_count(), 2);
        drop(b);
        assert_eq!(dropped.get(), 2);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_get_mut() {
        let mut o = make_shared(vec![1]);
        o.get_mut().unwrap().push(2);
        assert_eq!(*o, [1, 2]);
        let c = o.clone();
        assert!(o.get_mut().is_none());
        drop(c);
        let w = o.downgrade();
        assert!(o.get_mut().is_none());
        drop(w);
        assert!(o.get_mut().is_some());
        assert!(Shared::<i32>::null().get_mut().is_none());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_cast() {
        #[repr(transparent)]
        struct Meters(u32);
        let o = make_shared(Meters(3));
        let c = o.clone();
        let m: Shared<u32> = unsafe { Shared::cast(c) };
        assert_eq!(*m, 3);
        assert_eq!(o.use_count(), 2);
        assert_eq!(m.get() as *mut Meters, o.get());
        drop(o);
        assert_eq!(m.use_count(), 1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_local_combined() {
        let local = local();
        let dropped = Cell::new(0);
        {
            let o = local.fixed_new(Probe(&dropped));
            assert_eq!(local.blocks(), 1);
            let _c = o.clone();
        }
        assert_eq!(dropped.get(), 1);
        assert_eq!(local.blocks(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_debug() {
        assert_eq!(format!("{:?}", make_shared(7)), "Shared(7)");
    }
}
