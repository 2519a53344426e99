//! Errors returned by the fallible (`try_*`) operations.
use core::alloc::Layout;
use core::alloc::LayoutError;
use core::error;
use core::fmt;

/// The error returned when a table could not obtain the memory it needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TryReserveError {
    /// The requested capacity, or the size of the buffer backing it, does not
    /// fit in `usize`.
    CapacityOverflow,
    /// The allocator refused the request.
    AllocError {
        /// The layout of the rejected allocation.
        layout: Layout,
    },
}

impl From<LayoutError> for TryReserveError {
    fn from(_: LayoutError) -> Self {
        TryReserveError::CapacityOverflow
    }
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            TryReserveError::CapacityOverflow => f.write_str("hash table capacity overflow"),
            TryReserveError::AllocError { layout } => write!(
                f,
                "failed to allocate {} bytes (align {}) for hash table",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl error::Error for TryReserveError {}
