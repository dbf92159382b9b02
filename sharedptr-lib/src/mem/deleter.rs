/// The destruction action of an adopted payload.
pub trait Deleter<T> {
    /// # Safety
    ///
    /// `p` is the non-null pointer the block was created with. It's passed exactly once.
    unsafe fn delete(self, p: *mut T);
}

/// Frees a single object allocated by [`Box`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultDelete;

impl<T> Deleter<T> for DefaultDelete {
    #[inline(always)]
    unsafe fn delete(self, p: *mut T) {
        drop(Box::from_raw(p))
    }
}

impl<T, F: FnOnce(*mut T)> Deleter<T> for F {
    #[inline(always)]
    unsafe fn delete(self, p: *mut T) {
        self(p)
    }
}
