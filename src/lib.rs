#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Error types for fallible allocation.
pub mod error;

/// A `HashMap` over the linear-probing table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a key-value map interface with configurable hashers.
pub mod hash_map;

/// A hash set over the linear-probing table.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a set interface with configurable hashers.
pub mod hash_set;

pub mod hash_table;

/// Allocation and hashing policy.
pub mod policy;

pub use error::TryReserveError;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::Cursor;
pub use hash_table::Entry;
pub use hash_table::HashTable;
pub use hash_table::normalize_capacity;
pub use policy::Allocator;
#[cfg(any(feature = "foldhash", feature = "std"))]
pub use policy::DefaultHashBuilder;
pub use policy::Global;
