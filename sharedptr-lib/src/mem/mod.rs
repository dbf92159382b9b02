mod block;
pub mod deleter;
pub mod error;
pub mod global;
pub mod local;
pub mod manager;
pub mod new_in_place;
pub mod ref_counter_update;
pub mod shared;
pub mod weak;

use self::{
    error::AllocError, global::GLOBAL, manager::Manager, new_in_place::Fixed, shared::Shared,
};

/// Allocates `value` and its counters on the heap in one block.
pub fn make_shared<T>(value: T) -> Shared<T> {
    GLOBAL.fixed_new(value)
}

/// Allocates a block on the heap and initializes the object with `f` in place.
pub fn make_shared_with<T>(f: impl FnOnce() -> T) -> Shared<T> {
    GLOBAL.init_new(f)
}

/// Allocates `value` and its counters in one block of `manager`.
pub fn allocate_shared<M: Manager + 'static, T>(manager: M, value: T) -> Shared<T> {
    manager.fixed_new(value)
}

pub fn try_allocate_shared<M: Manager + 'static, T>(
    manager: M,
    value: T,
) -> Result<Shared<T>, AllocError> {
    manager.try_shared_new(Fixed(value))
}
