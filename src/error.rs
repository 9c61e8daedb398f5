//! Error types for configuration and validation failures.
//!
//! Hot allocation paths (`Buddy::allocate`, `Slab::allocate`, ...) stay on
//! `Option`/`bool` per the allocator contract; `HeapError` only surfaces at
//! boundaries where a caller benefits from knowing *why* something failed,
//! such as building a [`crate::config::HeapConfig`].

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("requested size {requested} overflows when padded to a block header")]
    InvalidArgument { requested: usize },

    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: usize },

    #[error("{field} ({value}) is smaller than the minimum of {minimum}")]
    TooSmall {
        field: &'static str,
        value: usize,
        minimum: usize,
    },

    #[error("heap is out of memory")]
    OutOfMemory,
}
