/// Update a reference count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefCounterUpdate {
    AddRef = 1,
    Read = 0,
    Release = -1,
}
