use core::{
    fmt,
    marker::PhantomData,
    mem::{swap, take, ManuallyDrop},
};

use super::{block::BlockRef, ref_counter_update::RefCounterUpdate, shared::Shared};

/// A non-owning reference to an object in a control block.
///
/// `Weak` keeps the block alive but not the object.
pub struct Weak<T> {
    block: Option<BlockRef>,
    _0: PhantomData<T>,
}

impl<T> Weak<T> {
    #[inline(always)]
    pub const fn null() -> Self {
        Self {
            block: None,
            _0: PhantomData,
        }
    }
    #[inline(always)]
    fn observe(block: Option<BlockRef>) -> Self {
        if let Some(block) = block {
            block.observers(RefCounterUpdate::AddRef);
        }
        Self {
            block,
            _0: PhantomData,
        }
    }
    /// The number of [`Shared`] references to the object.
    #[inline(always)]
    pub fn use_count(&self) -> usize {
        self.block
            .map_or(0, |block| block.owners(RefCounterUpdate::Read))
    }
    /// Returns `true` if the object is gone or the reference is empty.
    #[inline(always)]
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }
    /// Returns an owning reference, or an empty one if the object is gone.
    pub fn lock(&self) -> Shared<T> {
        match self.block {
            Some(block) if block.owners(RefCounterUpdate::Read) != 0 => {
                block.owners(RefCounterUpdate::AddRef);
                unsafe { Shared::from_block(block) }
            }
            _ => Shared::null(),
        }
    }
    #[inline(always)]
    pub fn swap(&mut self, other: &mut Self) {
        swap(&mut self.block, &mut other.block)
    }
    #[inline(always)]
    pub fn take(&mut self) -> Self {
        take(self)
    }
    pub fn assign(&mut self, other: &Self) {
        self.swap(&mut other.clone())
    }
    /// Makes this reference observe the object of `shared`.
    pub fn assign_shared(&mut self, shared: &Shared<T>) {
        self.swap(&mut Self::from(shared))
    }
    pub fn reset(&mut self) {
        self.swap(&mut Self::null())
    }
    #[inline(always)]
    pub fn ptr_eq(lhs: &Self, rhs: &Self) -> bool {
        lhs.block == rhs.block
    }
    /// Reinterprets the object as `U`, keeping the same block and counters.
    ///
    /// # Safety
    ///
    /// The same as for [`Shared::cast`].
    pub unsafe fn cast<U>(this: Self) -> Weak<U> {
        let this = ManuallyDrop::new(this);
        Weak {
            block: this.block,
            _0: PhantomData,
        }
    }
}

impl<T> From<&Shared<T>> for Weak<T> {
    #[inline(always)]
    fn from(shared: &Shared<T>) -> Self {
        Self::observe(shared.block())
    }
}

impl<T> Clone for Weak<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        Self::observe(self.block)
    }
}

impl<T> Drop for Weak<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block {
            unsafe { block.release_observer() }
        }
    }
}

impl<T> Default for Weak<T> {
    #[inline(always)]
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Weak)")
    }
}
