#[cfg(not(feature = "allocator-api2"))]
use core::alloc::Layout;
#[cfg(not(feature = "allocator-api2"))]
use core::fmt;
#[cfg(not(feature = "allocator-api2"))]
use core::ptr::NonNull;

cfg_if::cfg_if! {
    if #[cfg(feature = "allocator-api2")] {
        pub use allocator_api2::alloc::AllocError;
        pub use allocator_api2::alloc::Allocator;
        pub use allocator_api2::alloc::Global;
    } else {
        /// The error returned by an [`Allocator`] that could not satisfy a request.
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct AllocError;

        impl fmt::Display for AllocError {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("memory allocation failed")
            }
        }

        impl core::error::Error for AllocError {}

        /// The allocation policy a [`HashTable`] draws its slot buffer from.
        ///
        /// The table asks for exactly one buffer at a time (plus the replacement
        /// buffer while rehashing) and always hands it back with the layout it was
        /// allocated with.
        ///
        /// # Safety
        ///
        /// A successful `allocate` must return a pointer valid for reads and writes
        /// of `layout.size()` bytes, aligned to `layout.align()`, that stays valid
        /// until it is passed to `deallocate` with the same layout.
        ///
        /// [`HashTable`]: crate::hash_table::HashTable
        pub unsafe trait Allocator {
            /// Allocates a block of memory described by `layout`.
            ///
            /// The returned slice covers at least `layout.size()` bytes. `layout`
            /// never has a size of zero.
            fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError>;

            /// Releases a block previously returned by [`allocate`].
            ///
            /// # Safety
            ///
            /// `ptr` must have been returned by `allocate` on this allocator with the
            /// same `layout`, and must not be used afterwards.
            ///
            /// [`allocate`]: Allocator::allocate
            unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
        }

        unsafe impl<A: Allocator + ?Sized> Allocator for &A {
            #[inline]
            fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
                (**self).allocate(layout)
            }

            #[inline]
            unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
                // SAFETY: Forwarded contract.
                unsafe { (**self).deallocate(ptr, layout) }
            }
        }

        /// The global heap, via `alloc::alloc`.
        #[derive(Clone, Copy, Debug, Default)]
        pub struct Global;

        unsafe impl Allocator for Global {
            #[inline]
            fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
                debug_assert!(layout.size() != 0);
                // SAFETY: The table never requests a zero-sized layout.
                let raw = unsafe { alloc::alloc::alloc(layout) };
                let ptr = NonNull::new(raw).ok_or(AllocError)?;
                Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
            }

            #[inline]
            unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
                // SAFETY: Caller guarantees `ptr` came from `allocate` with `layout`.
                unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
            }
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hash builder used by [`HashSet`] and [`HashMap`] when none is
        /// given: a fast, non-cryptographic, randomly seeded mixing hash.
        ///
        /// [`HashSet`]: crate::HashSet
        /// [`HashMap`]: crate::HashMap
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hash builder used by [`HashSet`] and [`HashMap`] when none is
        /// given.
        ///
        /// [`HashSet`]: crate::HashSet
        /// [`HashMap`]: crate::HashMap
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    }
}
