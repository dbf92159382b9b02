#![allow(clippy::missing_safety_doc)]
pub mod mem;

pub use mem::{
    allocate_shared, make_shared, make_shared_with, shared::Shared, try_allocate_shared,
    weak::Weak,
};
