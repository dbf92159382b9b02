/// Constructs an object directly in memory provided by a control block.
pub trait NewInPlace {
    type Result;
    unsafe fn new_in_place(self, p: *mut Self::Result);
}

/// Moves an existing value into place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Fixed<T>(pub T);

impl<T> NewInPlace for Fixed<T> {
    type Result = T;
    #[inline(always)]
    unsafe fn new_in_place(self, p: *mut T) {
        p.write(self.0)
    }
}

/// Builds the value with a function at the time the memory is ready.
#[repr(transparent)]
pub struct Init<F>(pub F);

impl<R, F: FnOnce() -> R> NewInPlace for Init<F> {
    type Result = R;
    #[inline(always)]
    unsafe fn new_in_place(self, p: *mut R) {
        p.write((self.0)())
    }
}
