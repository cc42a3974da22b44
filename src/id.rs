//! Opaque identity handles for predicates and operations.
//!
//! Closures have no usable identity of their own, so every registered
//! predicate and every constructed operation receives a
//! [`NonZeroU64`] id from a process-wide [`AtomicIdAllocator`]. Equality and
//! deduplication compare these ids, never the closures.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Create an id from a raw `u64`.
            ///
            /// Returns `None` if `raw` is zero.
            pub fn new(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map($name)
            }

            /// Get the underlying `u64` value.
            pub fn get(self) -> u64 {
                self.0.get()
            }

            /// Allocate a fresh id from the process-wide allocator for this kind.
            pub fn allocate() -> RegistryResult<Self> {
                static ALLOCATOR: AtomicIdAllocator = AtomicIdAllocator::new($prefix);
                ALLOCATOR.next_raw().map($name)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a registered predicate.
    PredicateId,
    "pred"
);

define_id!(
    /// Identity of a constructed generic operation.
    ///
    /// Never reused, so an operation built under one registry cannot alias an
    /// operation of another.
    OperationId,
    "op"
);

/// Thread-safe monotonic id allocator.
///
/// Produces increasing ids starting from 1.
#[derive(Debug)]
pub struct AtomicIdAllocator {
    kind: &'static str,
    next: AtomicU64,
}

impl AtomicIdAllocator {
    /// Create a new allocator that starts from id 1.
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next raw id.
    ///
    /// Returns an error once the id space is exhausted (after 2^64 - 1 allocations).
    pub fn next_raw(&self) -> RegistryResult<NonZeroU64> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        NonZeroU64::new(raw).ok_or(RegistryError::IdSpaceExhausted { kind: self.kind })
    }

    /// Return the next id that *would* be allocated, without consuming it.
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<OperationId>>(),
            std::mem::size_of::<OperationId>()
        );
    }

    #[test]
    fn id_zero_is_none() {
        assert!(PredicateId::new(0).is_none());
        assert_eq!(PredicateId::new(42).unwrap().get(), 42);
    }

    #[test]
    fn allocator_produces_sequential_ids() {
        let alloc = AtomicIdAllocator::new("test");
        assert_eq!(alloc.next_raw().unwrap().get(), 1);
        assert_eq!(alloc.next_raw().unwrap().get(), 2);
        assert_eq!(alloc.peek_next(), 3);
    }

    #[test]
    fn allocated_ids_are_distinct() {
        let a = OperationId::allocate().unwrap();
        let b = OperationId::allocate().unwrap();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn display_uses_kind_prefix() {
        let id = OperationId::new(7).unwrap();
        assert_eq!(id.to_string(), "op:7");
    }
}
