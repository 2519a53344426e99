//! The open-addressing table engine.
//!
//! [`HashTable`] stores values of type `T` in one contiguous buffer of slots,
//! each tagged by a [`Control`] byte. Lookups walk a linear, wrapping probe
//! sequence from `hash & (capacity - 1)`. Erased slots become tombstones that
//! later inserts may reuse; tombstones keep counting against the 7/8 load
//! budget until the next rehash discards them.
//!
//! Like the set and map built on top of it, the table does not know how to
//! hash or compare its elements: every call takes the element's hash, an
//! equality predicate, and (for calls that may insert) a `hasher` used to
//! rehash existing elements when the buffer is rebuilt.
use alloc::alloc::handle_alloc_error;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use crate::error::TryReserveError;
use crate::policy::Allocator;
use crate::policy::Global;

/// Smallest capacity a table is ever created with.
const MIN_CAPACITY: usize = 16;

/// Per-slot state tag.
///
/// `Empty` is zero so a freshly zeroed control array is all-empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Control {
    /// Never written since the buffer was (re)built.
    Empty = 0,
    /// Holds a live element.
    Full = 1,
    /// Tombstone left by an erase. Reusable, but still charged against the
    /// growth budget.
    Deleted = 2,
    /// Trailing tag past the last slot. Only iteration ever reads it.
    Sentinel = 3,
}

/// Rounds a requested capacity up to the capacity a table is created with:
/// `16` for anything up to `16`, otherwise the next power of two.
///
/// # Panics
///
/// Panics if the next power of two does not fit in `usize`.
///
/// # Examples
///
/// ```rust
/// # use lin_hash::hash_table::normalize_capacity;
/// assert_eq!(normalize_capacity(0), 16);
/// assert_eq!(normalize_capacity(250), 256);
/// assert_eq!(normalize_capacity(256), 256);
/// ```
pub fn normalize_capacity(requested: usize) -> usize {
    checked_normalize_capacity(requested).expect("hash table capacity overflow")
}

#[inline]
fn checked_normalize_capacity(requested: usize) -> Option<usize> {
    if requested <= MIN_CAPACITY {
        Some(MIN_CAPACITY)
    } else {
        requested.checked_next_power_of_two()
    }
}

/// Maximum number of non-empty slots for `capacity` (7/8 load).
#[inline(always)]
fn growth_to_capacity(capacity: usize) -> usize {
    capacity - capacity / 8
}

/// The growth budget of a freshly rebuilt buffer holding `size` elements.
///
/// # Examples
///
/// ```rust
/// # use lin_hash::hash_table::reset_growth_left;
/// assert_eq!(reset_growth_left(16, 0), 14);
/// assert_eq!(reset_growth_left(32, 14), 14);
/// ```
#[inline]
pub fn reset_growth_left(capacity: usize, size: usize) -> usize {
    growth_to_capacity(capacity) - size
}

/// Whether running out of memory is reported to the caller or is fatal.
#[derive(Clone, Copy)]
pub(crate) enum Fallibility {
    Fallible,
    Infallible,
}

impl Fallibility {
    #[cold]
    fn capacity_overflow(self) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::CapacityOverflow,
            Fallibility::Infallible => panic!("hash table capacity overflow"),
        }
    }

    #[cold]
    fn alloc_err(self, layout: Layout) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::AllocError { layout },
            Fallibility::Infallible => handle_alloc_error(layout),
        }
    }
}

/// Unwraps the result of an operation run with [`Fallibility::Infallible`],
/// which aborts or panics instead of returning an error.
#[inline(always)]
pub(crate) fn infallible<R>(result: Result<R, TryReserveError>) -> R {
    match result {
        Ok(value) => value,
        Err(_) => unreachable!("infallible allocation path returned an error"),
    }
}

/// Layout of one slot buffer: `capacity + 1` control tags (the last one is
/// the sentinel) followed by `capacity` slots.
#[derive(Debug, Clone, Copy)]
struct DataLayout {
    layout: Layout,
    slots_offset: usize,
}

impl DataLayout {
    fn new<T>(capacity: usize) -> Result<Self, TryReserveError> {
        let ctrl_len = capacity
            .checked_add(1)
            .ok_or(TryReserveError::CapacityOverflow)?;
        let ctrl_layout = Layout::array::<Control>(ctrl_len)?;
        let slots_layout = Layout::array::<MaybeUninit<T>>(capacity)?;

        let (layout, slots_offset) = ctrl_layout.extend(slots_layout)?;

        Ok(DataLayout {
            layout: layout.pad_to_align(),
            slots_offset,
        })
    }
}

/// Allocates a buffer for `capacity` slots with every tag `Empty` and the
/// sentinel in place. Slot memory is left uninitialized.
fn allocate_buffer<A: Allocator>(
    allocator: &A,
    layout: &DataLayout,
    capacity: usize,
    fallibility: Fallibility,
) -> Result<NonNull<u8>, TryReserveError> {
    let raw = allocator
        .allocate(layout.layout)
        .map_err(|_| fallibility.alloc_err(layout.layout))?
        .cast::<u8>();

    // SAFETY: The allocation holds `capacity + 1` control bytes at offset 0.
    unsafe {
        core::ptr::write_bytes(raw.as_ptr(), Control::Empty as u8, capacity);
        raw.as_ptr().add(capacity).write(Control::Sentinel as u8);
    }

    Ok(raw)
}

/// Debug statistics for hash table analysis.
///
/// Available with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub len: usize,
    /// Number of slots in the buffer
    pub capacity: usize,
    /// Inserts into empty slots left before the next rehash
    pub growth_left: usize,
    /// Slots tagged `Full`
    pub full_slots: usize,
    /// Slots tagged `Deleted`
    pub deleted_slots: usize,
    /// Slots tagged `Empty`
    pub empty_slots: usize,
    /// Load factor (len / capacity)
    pub load_factor: f64,
    /// Share of non-empty slots that are tombstones
    pub tombstone_ratio: f64,
    /// Longest distance between an element and its start index
    pub max_probe_length: usize,
    /// Total memory in bytes used by the buffer
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.len,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Slots: {} full, {} deleted, {} empty",
            self.full_slots, self.deleted_slots, self.empty_slots
        );
        println!(
            "Growth left: {} (tombstones {:.2}% of used slots)",
            self.growth_left,
            self.tombstone_ratio * 100.0
        );
        println!("Longest probe: {}", self.max_probe_length);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Number of live elements at each displacement from their start index.
///
/// Available with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// `bins[d]` counts elements stored `d` slots past their start index.
    pub bins: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Pretty-prints the histogram as a horizontal bar chart on stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = *self.bins.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "probe histogram ({} entries):",
            self.bins.iter().sum::<usize>()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                7 => Some('▉'),
                _ => None,
            };
            if let Some(ch) = partial {
                bar.push(ch);
            }
            bar
        };

        for (distance, &count) in self.bins.iter().enumerate() {
            println!("{:>4} | {} ({})", distance, make_bar(count), count);
        }
    }
}

/// An open-addressing hash table with linear probing and tombstone reuse.
///
/// `HashTable<T, A>` stores values of type `T` in a buffer obtained from the
/// allocator `A`. The buffer always has a power-of-two number of slots, at
/// least 16, and is never more than 7/8 non-empty: the table tracks a growth
/// budget (`growth_left`) that every insert into a never-used slot spends and
/// that erases do not give back. When an insert finds the budget exhausted,
/// the buffer is rebuilt from its live elements only, doubling its capacity
/// unless fewer than half of the budget's slots hold live elements.
///
/// Values are relocated with a plain bitwise move when the buffer is
/// rebuilt, so every address handed out by the table (through references or
/// a [`Cursor`]) is only valid until the next insert.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use lin_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(100);
///
/// let alice = Person {
///     id: 123,
///     name: "Alice".to_string(),
/// };
/// let (_, inserted) = table.insert(
///     hash_id(123),
///     alice,
///     |p: &Person| p.id == 123,
///     |p: &Person| hash_id(p.id),
/// );
/// assert!(inserted);
///
/// assert!(table.contains(hash_id(123), |p| p.id == 123));
/// assert!(table.erase(hash_id(123), |p| p.id == 123));
/// assert!(table.is_empty());
/// ```
pub struct HashTable<T, A: Allocator = Global> {
    layout: DataLayout,
    alloc: NonNull<u8>,

    capacity: usize,
    len: usize,
    growth_left: usize,

    allocator: A,
    _phantom: PhantomData<T>,
}

// SAFETY: The table owns its elements and buffer outright, like a `Vec`.
unsafe impl<T: Send, A: Allocator + Send> Send for HashTable<T, A> {}
// SAFETY: Shared access only hands out `&T`.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for HashTable<T, A> {}

impl<T, A: Allocator> Debug for HashTable<T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;

        // SAFETY: The control array always covers `capacity + 1` tags.
        let ctrl = unsafe { self.ctrl_ptr().as_ref() };
        let control_map = ctrl
            .chunks(16)
            .map(|w| {
                let mut row = String::with_capacity(w.len() * 3);
                for (i, c) in w.iter().enumerate() {
                    if i > 0 {
                        row.push(' ');
                    }
                    row.push_str(match c {
                        Control::Empty => "..",
                        Control::Full => "FF",
                        Control::Deleted => "DD",
                        Control::Sentinel => "SS",
                    });
                }
                row
            })
            .collect::<Vec<_>>();

        f.debug_struct("HashTable")
            .field("control", &control_map)
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("growth_left", &self.growth_left)
            .finish()
    }
}

impl<T, A> Clone for HashTable<T, A>
where
    T: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        let mut new_table = Self::with_capacity_in(self.capacity, self.allocator.clone());
        debug_assert_eq!(new_table.capacity, self.capacity);

        // SAFETY: Both tables have the same capacity, so every index below is in
        // bounds for both. Only slots tagged `Full` in `self` are read, and a
        // slot is tagged `Full` in the clone only after its value is written.
        unsafe {
            for index in 0..self.capacity {
                match self.ctrl(index) {
                    Control::Full => {
                        let value = self.slot(index).clone();
                        new_table.slot_ptr(index).write(value);
                        new_table.set_ctrl(index, Control::Full);
                        new_table.len += 1;
                    }
                    Control::Deleted => new_table.set_ctrl(index, Control::Deleted),
                    Control::Empty | Control::Sentinel => {}
                }
            }
        }

        new_table.growth_left = self.growth_left;
        debug_assert_eq!(new_table.len, self.len);
        new_table
    }
}

impl<T, A: Allocator> Drop for HashTable<T, A> {
    fn drop(&mut self) {
        // SAFETY: Only `Full` slots are dropped, and the buffer is returned to the
        // allocator it came from with the layout it was allocated with.
        unsafe {
            self.drop_elements();
            self.allocator.deallocate(self.alloc, self.layout.layout);
        }
    }
}

impl<T> HashTable<T> {
    /// Creates a new hash table able to hold at least `capacity` slots.
    ///
    /// The capacity is rounded up by [`normalize_capacity`]; a request of `0`
    /// gives a 16-slot table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 128);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::TryReserveError;
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let err = HashTable::<u64>::try_with_capacity(usize::MAX).unwrap_err();
    /// assert_eq!(err, TryReserveError::CapacityOverflow);
    /// ```
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        Self::try_with_capacity_in(capacity, Global)
    }
}

impl<T, A: Allocator> HashTable<T, A> {
    /// Creates a new hash table drawing its buffer from `allocator`.
    ///
    /// Allocation failure is fatal; see
    /// [`try_with_capacity_in`](Self::try_with_capacity_in).
    pub fn with_capacity_in(capacity: usize, allocator: A) -> Self {
        infallible(Self::new_in(capacity, allocator, Fallibility::Infallible))
    }

    /// Creates a new hash table drawing its buffer from `allocator`, returning
    /// an error if the buffer cannot be allocated.
    pub fn try_with_capacity_in(capacity: usize, allocator: A) -> Result<Self, TryReserveError> {
        Self::new_in(capacity, allocator, Fallibility::Fallible)
    }

    fn new_in(
        capacity: usize,
        allocator: A,
        fallibility: Fallibility,
    ) -> Result<Self, TryReserveError> {
        let capacity =
            checked_normalize_capacity(capacity).ok_or_else(|| fallibility.capacity_overflow())?;
        let layout =
            DataLayout::new::<T>(capacity).map_err(|_| fallibility.capacity_overflow())?;
        let alloc = allocate_buffer(&allocator, &layout, capacity, fallibility)?;

        Ok(Self {
            layout,
            alloc,
            capacity,
            len: 0,
            growth_left: reset_growth_left(capacity, 0),
            allocator,
            _phantom: PhantomData,
        })
    }

    fn ctrl_ptr(&self) -> NonNull<[Control]> {
        NonNull::slice_from_raw_parts(self.alloc.cast(), self.capacity + 1)
    }

    /// Pointer to the slot at `index`.
    ///
    /// # Safety
    ///
    /// `index` must be less than `capacity`.
    #[inline(always)]
    unsafe fn slot_ptr(&self, index: usize) -> *mut T {
        debug_assert!(index < self.capacity);
        // SAFETY: The slots array starts at `slots_offset` and holds `capacity`
        // elements; caller ensures `index` is within it.
        unsafe {
            self.alloc
                .add(self.layout.slots_offset)
                .cast::<T>()
                .as_ptr()
                .add(index)
        }
    }

    /// Read the control tag at `index`
    ///
    /// # Safety
    ///
    /// `index` must be at most `capacity` (the sentinel's index).
    #[inline(always)]
    unsafe fn ctrl(&self, index: usize) -> Control {
        // SAFETY: Caller ensures `index` is within the control array.
        unsafe { *self.ctrl_ptr().as_ref().get_unchecked(index) }
    }

    /// Write the control tag at `index`
    ///
    /// # Safety
    ///
    /// `index` must be less than `capacity`; the sentinel is never rewritten.
    #[inline(always)]
    unsafe fn set_ctrl(&mut self, index: usize, ctrl: Control) {
        debug_assert!(index < self.capacity);
        debug_assert_ne!(ctrl, Control::Sentinel);
        // SAFETY: Caller ensures `index` is a data slot's tag.
        unsafe {
            *self.ctrl_ptr().as_mut().get_unchecked_mut(index) = ctrl;
        }
    }

    /// Reference to the element at `index`
    ///
    /// # Safety
    ///
    /// The slot at `index` must be tagged `Full`.
    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> &T {
        // SAFETY: `Full` slots are initialized.
        unsafe { &*self.slot_ptr(index) }
    }

    /// Mutable reference to the element at `index`
    ///
    /// # Safety
    ///
    /// The slot at `index` must be tagged `Full`.
    #[inline(always)]
    pub(crate) unsafe fn slot_mut(&mut self, index: usize) -> &mut T {
        // SAFETY: `Full` slots are initialized.
        unsafe { &mut *self.slot_ptr(index) }
    }

    /// Drops every live element without touching the tags.
    ///
    /// # Safety
    ///
    /// The caller must retag or free the buffer before it is read again.
    unsafe fn drop_elements(&mut self) {
        if core::mem::needs_drop::<T>() && self.len > 0 {
            for index in 0..self.capacity {
                // SAFETY: `index < capacity`, and only `Full` slots are dropped.
                unsafe {
                    if self.ctrl(index) == Control::Full {
                        core::ptr::drop_in_place(self.slot_ptr(index));
                    }
                }
            }
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.capacity - 1
    }

    #[inline(always)]
    fn start_index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask()
    }

    /// First `Empty` or `Deleted` slot on the probe sequence of `hash`.
    ///
    /// Terminates because the growth budget keeps at least
    /// `capacity / 8` slots `Empty`.
    #[inline]
    fn find_first_reusable(&self, hash: u64) -> usize {
        let mask = self.mask();
        let mut index = self.start_index(hash);
        loop {
            // SAFETY: `index` is masked into `0..capacity`.
            match unsafe { self.ctrl(index) } {
                Control::Empty | Control::Deleted => return index,
                Control::Full | Control::Sentinel => {}
            }
            index = (index + 1) & mask;
        }
    }

    /// Index of the live element matching `eq` on the probe sequence of
    /// `hash`.
    ///
    /// Tombstones do not end the search: the element may have been placed
    /// after a slot that was erased later.
    #[inline]
    fn find_index(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<usize> {
        let mask = self.mask();
        let mut index = self.start_index(hash);
        loop {
            // SAFETY: `index` is masked into `0..capacity`; `Full` slots are
            // initialized.
            unsafe {
                match self.ctrl(index) {
                    Control::Empty => return None,
                    Control::Full => {
                        if eq(self.slot(index)) {
                            return Some(index);
                        }
                    }
                    Control::Deleted | Control::Sentinel => {}
                }
            }
            index = (index + 1) & mask;
        }
    }

    /// Single probe pass for insertion: `Ok(index)` of the matching live
    /// element, or `Err(index)` of the slot a new element should go to (the
    /// first tombstone seen, else the terminating empty slot).
    #[inline]
    pub(crate) fn find_or_find_insert_slot(
        &self,
        hash: u64,
        eq: impl Fn(&T) -> bool,
    ) -> Result<usize, usize> {
        let mask = self.mask();
        let mut index = self.start_index(hash);
        let mut tombstone = None;
        loop {
            // SAFETY: `index` is masked into `0..capacity`; `Full` slots are
            // initialized.
            unsafe {
                match self.ctrl(index) {
                    Control::Empty => return Err(tombstone.unwrap_or(index)),
                    Control::Full => {
                        if eq(self.slot(index)) {
                            return Ok(index);
                        }
                    }
                    Control::Deleted => {
                        if tombstone.is_none() {
                            tombstone = Some(index);
                        }
                    }
                    Control::Sentinel => {}
                }
            }
            index = (index + 1) & mask;
        }
    }

    /// Stores `value` for a key known to be absent, at `candidate` or, when
    /// the growth budget is exhausted and `candidate` is not a tombstone, at
    /// its new site after a rehash. Returns the slot index.
    ///
    /// On error the table is unchanged and `value` is dropped.
    ///
    /// # Safety
    ///
    /// `candidate` must come from [`find_or_find_insert_slot`] for `hash` with
    /// no mutation of the table in between.
    ///
    /// [`find_or_find_insert_slot`]: Self::find_or_find_insert_slot
    pub(crate) unsafe fn insert_in_slot(
        &mut self,
        hash: u64,
        candidate: usize,
        value: T,
        hasher: &impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<usize, TryReserveError> {
        let mut index = candidate;
        // SAFETY: Caller guarantees `candidate` is a non-full data slot.
        let ctrl = unsafe { self.ctrl(index) };
        debug_assert!(matches!(ctrl, Control::Empty | Control::Deleted));

        if self.growth_left == 0 && ctrl != Control::Deleted {
            self.grow_rehash(hasher, fallibility)?;
            index = self.find_first_reusable(hash);
        }

        // SAFETY: `index` is a non-full data slot: either the caller's candidate
        // or a fresh result of `find_first_reusable`.
        unsafe {
            if self.ctrl(index) == Control::Empty {
                debug_assert!(self.growth_left > 0);
                self.growth_left -= 1;
            }
            self.slot_ptr(index).write(value);
            self.set_ctrl(index, Control::Full);
        }
        self.len += 1;

        Ok(index)
    }

    /// Removes the element at `index`, leaving a tombstone.
    ///
    /// # Safety
    ///
    /// The slot at `index` must be tagged `Full`.
    unsafe fn take_slot(&mut self, index: usize) -> T {
        // SAFETY: Caller guarantees the slot is live; it is retagged before the
        // value is handed out so it is never read twice.
        unsafe {
            self.set_ctrl(index, Control::Deleted);
            self.len -= 1;
            self.slot_ptr(index).read()
        }
    }

    #[cold]
    #[inline(never)]
    fn grow_rehash(
        &mut self,
        hasher: &impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        // A budget exhausted mostly by tombstones is repaid by rebuilding at the
        // same size; otherwise the table doubles.
        let new_capacity = if self.len >= growth_to_capacity(self.capacity) / 2 {
            self.capacity
                .checked_mul(2)
                .ok_or_else(|| fallibility.capacity_overflow())?
        } else {
            self.capacity
        };

        self.resize_rehash(new_capacity, hasher, fallibility)
    }

    fn resize_rehash(
        &mut self,
        new_capacity: usize,
        hasher: &impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        debug_assert!(new_capacity.is_power_of_two() && new_capacity >= self.capacity);

        // Every live element is hashed before any of them moves, so a panicking
        // hasher leaves the table as it was.
        let mut pending: Vec<(usize, u64)> = Vec::new();
        if pending.try_reserve_exact(self.len).is_err() {
            let layout = Layout::array::<(usize, u64)>(self.len)
                .map_err(|_| fallibility.capacity_overflow())?;
            return Err(fallibility.alloc_err(layout));
        }
        for index in 0..self.capacity {
            // SAFETY: `index < capacity`; `Full` slots are initialized.
            unsafe {
                if self.ctrl(index) == Control::Full {
                    pending.push((index, hasher(self.slot(index))));
                }
            }
        }

        let new_layout =
            DataLayout::new::<T>(new_capacity).map_err(|_| fallibility.capacity_overflow())?;
        let new_alloc = allocate_buffer(&self.allocator, &new_layout, new_capacity, fallibility)?;

        let old_layout = core::mem::replace(&mut self.layout, new_layout);
        let old_alloc = core::mem::replace(&mut self.alloc, new_alloc);
        self.capacity = new_capacity;

        // SAFETY: `pending` holds exactly the live slots of the old buffer. Each
        // value is moved bitwise into an empty slot of the new buffer; the old
        // buffer is then freed without dropping anything, so every value keeps
        // exactly one owner.
        unsafe {
            let old_slots = old_alloc
                .add(old_layout.slots_offset)
                .cast::<T>()
                .as_ptr();

            for (old_index, hash) in pending {
                let target = self.find_first_reusable(hash);
                core::ptr::copy_nonoverlapping(old_slots.add(old_index), self.slot_ptr(target), 1);
                self.set_ctrl(target, Control::Full);
            }

            self.allocator.deallocate(old_alloc, old_layout.layout);
        }

        self.growth_left = reset_growth_left(self.capacity, self.len);
        Ok(())
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table contains no elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<i32> = HashTable::with_capacity(10);
    /// assert!(table.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots in the buffer.
    ///
    /// Always a power of two, at least 16. At most 7/8 of the slots are used
    /// before the table grows.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns how many inserts into never-used slots remain before the
    /// buffer must be rebuilt.
    ///
    /// Erasing does not raise this number: tombstones stay charged until the
    /// next rebuild. Inserts that reuse a tombstone do not lower it.
    pub fn growth_left(&self) -> usize {
        self.growth_left
    }

    /// Returns a reference to the allocator backing this table.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Inserts `value` unless an element matching `eq` is already present.
    ///
    /// Returns a cursor at the stored element and whether `value` was
    /// inserted. When an equal element already exists it is left untouched
    /// and `value` is dropped.
    ///
    /// `hasher` must return, for every element already in the table, the
    /// hash it was inserted with; it is only called when the buffer is
    /// rebuilt.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use lin_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::with_capacity(0);
    ///
    /// let (cursor, inserted) = table.insert(hash_u64(7), 7u64, |&n: &u64| n == 7, |&n| hash_u64(n));
    /// assert!(inserted);
    /// assert_eq!(cursor.get(), Some(&7));
    ///
    /// let (_, inserted) = table.insert(hash_u64(7), 7u64, |&n: &u64| n == 7, |&n| hash_u64(n));
    /// assert!(!inserted);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn insert(
        &mut self,
        hash: u64,
        value: T,
        eq: impl Fn(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
    ) -> (Cursor<'_, T, A>, bool) {
        infallible(self.insert_impl(hash, value, eq, hasher, false, Fallibility::Infallible))
    }

    /// Fallible version of [`insert`](Self::insert).
    ///
    /// If the buffer has to be rebuilt and the new one cannot be allocated,
    /// the table is left unchanged, `value` is dropped and the error is
    /// returned.
    pub fn try_insert(
        &mut self,
        hash: u64,
        value: T,
        eq: impl Fn(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<(Cursor<'_, T, A>, bool), TryReserveError> {
        self.insert_impl(hash, value, eq, hasher, false, Fallibility::Fallible)
    }

    /// Inserts `value`, replacing (and dropping) the element matching `eq` if
    /// there is one.
    ///
    /// Returns a cursor at the stored element and whether the element is
    /// new. Replacing never changes the length or the growth budget.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<(u32, &str)> = HashTable::with_capacity(0);
    /// let hash = |&(k, _): &(u32, &str)| k as u64;
    ///
    /// table.insert_or_assign(1, (1, "one"), |&(k, _)| k == 1, hash);
    /// let (cursor, inserted) = table.insert_or_assign(1, (1, "uno"), |&(k, _)| k == 1, hash);
    /// assert!(!inserted);
    /// assert_eq!(cursor.get(), Some(&(1, "uno")));
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn insert_or_assign(
        &mut self,
        hash: u64,
        value: T,
        eq: impl Fn(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
    ) -> (Cursor<'_, T, A>, bool) {
        infallible(self.insert_impl(hash, value, eq, hasher, true, Fallibility::Infallible))
    }

    /// Fallible version of [`insert_or_assign`](Self::insert_or_assign).
    pub fn try_insert_or_assign(
        &mut self,
        hash: u64,
        value: T,
        eq: impl Fn(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<(Cursor<'_, T, A>, bool), TryReserveError> {
        self.insert_impl(hash, value, eq, hasher, true, Fallibility::Fallible)
    }

    fn insert_impl(
        &mut self,
        hash: u64,
        value: T,
        eq: impl Fn(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
        assign: bool,
        fallibility: Fallibility,
    ) -> Result<(Cursor<'_, T, A>, bool), TryReserveError> {
        let (index, inserted) = match self.find_or_find_insert_slot(hash, eq) {
            Ok(index) => {
                if assign {
                    // SAFETY: `index` was just found as a live slot.
                    unsafe { *self.slot_mut(index) = value };
                }
                (index, false)
            }
            // SAFETY: `candidate` was just produced for `hash`.
            Err(candidate) => (
                unsafe { self.insert_in_slot(hash, candidate, value, &hasher, fallibility)? },
                true,
            ),
        };

        Ok((Cursor::at(self, index), inserted))
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// The returned [`Entry`] remembers where the probe ended, so a
    /// following insert through a [`VacantEntry`] does not probe again
    /// unless the buffer has to be rebuilt.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use lin_hash::hash_table::Entry;
    /// # use lin_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s: &String| s == "hello", |s: &String| hash_str(s)) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// let value = table
    ///     .entry(hash, |s: &String| s == "hello", |s: &String| hash_str(s))
    ///     .or_insert("other".to_string());
    /// assert_eq!(value.as_str(), "hello");
    /// ```
    pub fn entry<H>(&mut self, hash: u64, eq: impl Fn(&T) -> bool, hasher: H) -> Entry<'_, T, H, A>
    where
        H: Fn(&T) -> u64,
    {
        match self.find_or_find_insert_slot(hash, eq) {
            Ok(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            Err(candidate) => Entry::Vacant(VacantEntry {
                table: self,
                hash,
                candidate,
                hasher,
            }),
        }
    }

    /// Finds the element matching `eq` and returns a cursor positioned on it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(0);
    /// table.insert(42, 42u64, |&n: &u64| n == 42, |&n| n);
    ///
    /// let cursor = table.find(42, |&n| n == 42).expect("present");
    /// assert_eq!(cursor.get(), Some(&42));
    /// assert!(table.find(99, |&n| n == 99).is_none());
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<Cursor<'_, T, A>> {
        if self.len == 0 {
            return None;
        }
        self.find_index(hash, eq).map(|index| Cursor::at(self, index))
    }

    /// Returns a reference to the element matching `eq`, if any.
    #[inline]
    pub fn get(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns live slots.
        Some(unsafe { self.slot(index) })
    }

    /// Returns a mutable reference to the element matching `eq`, if any.
    ///
    /// The element must keep hashing to `hash` and comparing equal the way it
    /// did when it was inserted.
    #[inline]
    pub fn get_mut(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&mut T> {
        if self.len == 0 {
            return None;
        }
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns live slots.
        Some(unsafe { self.slot_mut(index) })
    }

    /// Returns `true` if an element matching `eq` is present.
    #[inline]
    pub fn contains(&self, hash: u64, eq: impl Fn(&T) -> bool) -> bool {
        self.find(hash, eq).is_some()
    }

    /// Removes and drops the element matching `eq`.
    ///
    /// Returns `false` if there was none. The vacated slot becomes a
    /// tombstone; the growth budget is not refunded.
    pub fn erase(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> bool {
        match self.remove(hash, eq) {
            Some(value) => {
                drop(value);
                true
            }
            None => false,
        }
    }

    /// Removes and returns the element matching `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(0);
    /// table.insert(42, 42u64, |&n: &u64| n == 42, |&n| n);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert_eq!(table.remove(42, |&n| n == 42), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns live slots.
        Some(unsafe { self.take_slot(index) })
    }

    /// Removes all elements, keeping the capacity.
    ///
    /// Every slot goes back to `Empty`, so the growth budget is fully
    /// restored.
    pub fn clear(&mut self) {
        // SAFETY: Live elements are dropped, then every data tag is rewritten.
        unsafe {
            self.drop_elements();
            core::ptr::write_bytes(
                self.alloc.as_ptr(),
                Control::Empty as u8,
                self.capacity,
            );
        }
        self.len = 0;
        self.growth_left = reset_growth_left(self.capacity, 0);
    }

    /// Returns a cursor on the first live slot, or an exhausted cursor if the
    /// table is empty.
    pub fn cursor(&self) -> Cursor<'_, T, A> {
        self.cursor_at(0)
    }

    /// Returns a cursor on the first live slot at or after `index`.
    ///
    /// Indices at or past the capacity give an exhausted cursor.
    pub fn cursor_at(&self, index: usize) -> Cursor<'_, T, A> {
        Cursor {
            table: self,
            index: self.skip_to_live(index.min(self.capacity)),
        }
    }

    /// First index at or after `from` tagged `Full` or `Sentinel`.
    #[inline]
    fn skip_to_live(&self, mut from: usize) -> usize {
        debug_assert!(from <= self.capacity);
        loop {
            // SAFETY: The scan starts at most at the sentinel and stops on it.
            match unsafe { self.ctrl(from) } {
                Control::Full | Control::Sentinel => return from,
                Control::Empty | Control::Deleted => from += 1,
            }
        }
    }

    /// Returns an iterator over all elements, in slot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(0);
    /// for n in 0..5u64 {
    ///     table.insert(n, n, |&v: &u64| v == n, |&v| v);
    /// }
    ///
    /// let mut values: Vec<u64> = table.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, vec![0, 1, 2, 3, 4]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T, A> {
        Iter {
            cursor: self.cursor(),
            remaining: self.len,
        }
    }

    /// Returns an iterator yielding mutable references to all elements.
    ///
    /// Elements must keep their hash and equality unchanged.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            ctrl: self.alloc.cast(),
            // SAFETY: Index 0 is always a data slot (capacity >= 16).
            slots: unsafe { NonNull::new_unchecked(self.slot_ptr(0)) },
            index: 0,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    /// Returns an iterator that removes and yields all elements.
    ///
    /// After the iterator is dropped the table is empty, with every slot
    /// `Empty` and its capacity unchanged.
    pub fn drain(&mut self) -> Drain<'_, T, A> {
        Drain {
            table: self,
            index: 0,
        }
    }

    /// Returns detailed utilization statistics.
    ///
    /// `hasher` must be the one the table is used with; it determines each
    /// element's start index.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self, hasher: impl Fn(&T) -> u64) -> DebugStats {
        let mut full_slots = 0;
        let mut deleted_slots = 0;
        let mut empty_slots = 0;
        let mut max_probe_length = 0;

        for index in 0..self.capacity {
            // SAFETY: `index < capacity`; `Full` slots are initialized.
            unsafe {
                match self.ctrl(index) {
                    Control::Full => {
                        full_slots += 1;
                        let start = self.start_index(hasher(self.slot(index)));
                        max_probe_length = max_probe_length.max(index.wrapping_sub(start) & self.mask());
                    }
                    Control::Deleted => deleted_slots += 1,
                    Control::Empty => empty_slots += 1,
                    Control::Sentinel => unreachable!("sentinel inside the data slots"),
                }
            }
        }

        let used = full_slots + deleted_slots;
        DebugStats {
            len: self.len,
            capacity: self.capacity,
            growth_left: self.growth_left,
            full_slots,
            deleted_slots,
            empty_slots,
            load_factor: self.len as f64 / self.capacity as f64,
            tombstone_ratio: if used == 0 {
                0.0
            } else {
                deleted_slots as f64 / used as f64
            },
            max_probe_length,
            total_bytes: self.layout.layout.size(),
        }
    }

    /// Computes a histogram of probe lengths for the current table state.
    ///
    /// The probe length of an element is the number of slots between its
    /// start index and the slot it lives in, wrapping around the end.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self, hasher: impl Fn(&T) -> u64) -> ProbeHistogram {
        let mut bins = Vec::new();

        for index in 0..self.capacity {
            // SAFETY: `index < capacity`; `Full` slots are initialized.
            unsafe {
                if self.ctrl(index) == Control::Full {
                    let start = self.start_index(hasher(self.slot(index)));
                    let distance = index.wrapping_sub(start) & self.mask();
                    if bins.len() <= distance {
                        bins.resize(distance + 1, 0);
                    }
                    bins[distance] += 1;
                }
            }
        }

        ProbeHistogram { bins }
    }

    #[inline(always)]
    fn control_tag(&self, index: usize) -> Control {
        assert!(index <= self.capacity);
        // SAFETY: Bounds checked above.
        unsafe { self.ctrl(index) }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, T, H, A: Allocator = Global> {
    /// A vacant entry - no matching element is present
    Vacant(VacantEntry<'a, T, H, A>),
    /// An occupied entry - a matching element is present
    Occupied(OccupiedEntry<'a, T, A>),
}

impl<'a, T, H, A> Entry<'a, T, H, A>
where
    H: Fn(&T) -> u64,
    A: Allocator,
{
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the stored element.
    pub fn or_insert(self, default: T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the value computed by `default` if the entry is vacant and
    /// returns a mutable reference to the stored element.
    ///
    /// `default` is not called when the entry is occupied.
    pub fn or_insert_with(self, default: impl FnOnce() -> T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to the element if the entry is occupied; returns `None`
    /// without inserting anything otherwise.
    pub fn and_modify(self, f: impl FnOnce(&mut T)) -> Option<&'a mut T> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `T::default()` if the entry is vacant and returns a mutable
    /// reference to the stored element.
    pub fn or_default(self) -> &'a mut T
    where
        T: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the hash table.
///
/// Holds the slot the probe ended on: the first tombstone on the probe
/// sequence, or the empty slot that terminated it.
pub struct VacantEntry<'a, T, H, A: Allocator = Global> {
    table: &'a mut HashTable<T, A>,
    hash: u64,
    candidate: usize,
    hasher: H,
}

impl<'a, T, H, A> VacantEntry<'a, T, H, A>
where
    H: Fn(&T) -> u64,
    A: Allocator,
{
    /// Inserts `value` and returns a mutable reference to it.
    pub fn insert(self, value: T) -> &'a mut T {
        infallible(self.insert_impl(value, Fallibility::Infallible))
    }

    /// Inserts `value`, or returns an error (dropping `value`) if the buffer
    /// had to be rebuilt and could not be allocated.
    pub fn try_insert(self, value: T) -> Result<&'a mut T, TryReserveError> {
        self.insert_impl(value, Fallibility::Fallible)
    }

    fn insert_impl(self, value: T, fallibility: Fallibility) -> Result<&'a mut T, TryReserveError> {
        let VacantEntry {
            table,
            hash,
            candidate,
            hasher,
        } = self;

        // SAFETY: `candidate` was produced by `entry` for `hash`, and the entry
        // has held the only borrow of the table since.
        unsafe {
            let index = table.insert_in_slot(hash, candidate, value, &hasher, fallibility)?;
            Ok(&mut *table.slot_ptr(index))
        }
    }
}

/// A view into an occupied entry in the hash table.
pub struct OccupiedEntry<'a, T, A: Allocator = Global> {
    table: &'a mut HashTable<T, A>,
    index: usize,
}

impl<'a, T, A: Allocator> OccupiedEntry<'a, T, A> {
    /// Gets a reference to the element in the entry.
    pub fn get(&self) -> &T {
        // SAFETY: The entry points at a live slot.
        unsafe { self.table.slot(self.index) }
    }

    /// Gets a mutable reference to the element in the entry.
    pub fn get_mut(&mut self) -> &mut T {
        // SAFETY: The entry points at a live slot.
        unsafe { self.table.slot_mut(self.index) }
    }

    /// Converts the entry into a mutable reference with the lifetime of the
    /// table borrow.
    pub fn into_mut(self) -> &'a mut T {
        // SAFETY: The entry points at a live slot and owns the table borrow.
        unsafe { &mut *self.table.slot_ptr(self.index) }
    }

    /// Removes the element from the table, leaving a tombstone, and returns
    /// it.
    pub fn remove(self) -> T {
        // SAFETY: The entry points at a live slot.
        unsafe { self.table.take_slot(self.index) }
    }
}

/// A read-only position in a [`HashTable`].
///
/// A cursor is either on a live slot, or exhausted once it reaches the
/// sentinel past the last slot. Advancing skips empty slots and tombstones.
/// Cursors are forward-only and follow slot order, not insertion order.
///
/// # Examples
///
/// ```rust
/// # use lin_hash::hash_table::HashTable;
/// #
/// let mut table = HashTable::with_capacity(0);
/// table.insert(3, 3u64, |&v: &u64| v == 3, |&v| v);
/// table.insert(9, 9u64, |&v: &u64| v == 9, |&v| v);
///
/// let mut cursor = table.cursor();
/// assert_eq!(cursor.get(), Some(&3));
/// cursor.move_next();
/// assert_eq!(cursor.get(), Some(&9));
/// cursor.move_next();
/// assert!(cursor.is_exhausted());
/// assert_eq!(cursor.get(), None);
/// ```
pub struct Cursor<'a, T, A: Allocator = Global> {
    table: &'a HashTable<T, A>,
    index: usize,
}

impl<T, A: Allocator> Clone for Cursor<'_, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: Allocator> Copy for Cursor<'_, T, A> {}

impl<T, A: Allocator> Debug for Cursor<'_, T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.index)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

impl<'a, T, A: Allocator> Cursor<'a, T, A> {
    #[inline]
    pub(crate) fn at(table: &'a HashTable<T, A>, index: usize) -> Self {
        debug_assert_eq!(table.control_tag(index), Control::Full);
        Cursor { table, index }
    }

    /// Returns the element under the cursor, or `None` once exhausted.
    #[inline]
    pub fn get(&self) -> Option<&'a T> {
        if self.is_exhausted() {
            return None;
        }
        // SAFETY: A cursor that is not exhausted sits on a live slot.
        Some(unsafe { self.table.slot(self.index) })
    }

    /// Advances to the next live slot, or to the sentinel.
    ///
    /// Does nothing once exhausted.
    #[inline]
    pub fn move_next(&mut self) {
        if !self.is_exhausted() {
            self.index = self.table.skip_to_live(self.index + 1);
        }
    }

    /// Returns the slot index under the cursor; equal to the capacity once
    /// exhausted.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` once the cursor has reached the sentinel.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        // SAFETY: `index` never exceeds the sentinel's index.
        unsafe { self.table.ctrl(self.index) == Control::Sentinel }
    }
}

impl<'a, T, A: Allocator> Iterator for Cursor<'a, T, A> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.get()?;
        self.move_next();
        Some(item)
    }
}

impl<T, A: Allocator> FusedIterator for Cursor<'_, T, A> {}

/// An iterator over the elements of a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, T, A: Allocator = Global> {
    cursor: Cursor<'a, T, A>,
    remaining: usize,
}

impl<T, A: Allocator> Clone for Iter<'_, T, A> {
    fn clone(&self) -> Self {
        Iter {
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<'a, T, A: Allocator> Iterator for Iter<'a, T, A> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.cursor.next()?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, A: Allocator> ExactSizeIterator for Iter<'_, T, A> {}

impl<T, A: Allocator> FusedIterator for Iter<'_, T, A> {}

/// A mutable iterator over the elements of a [`HashTable`].
///
/// This struct is created by the [`iter_mut`] method on [`HashTable`].
///
/// [`iter_mut`]: HashTable::iter_mut
pub struct IterMut<'a, T> {
    ctrl: NonNull<Control>,
    slots: NonNull<T>,
    index: usize,
    remaining: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // SAFETY: The scan stops at the sentinel, which terminates the control
        // array; each live slot is yielded once, so the references never alias.
        unsafe {
            loop {
                match *self.ctrl.as_ptr().add(self.index) {
                    Control::Full => {
                        let item = &mut *self.slots.as_ptr().add(self.index);
                        self.index += 1;
                        self.remaining -= 1;
                        return Some(item);
                    }
                    Control::Sentinel => return None,
                    Control::Empty | Control::Deleted => self.index += 1,
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

/// A draining iterator over the elements of a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, T, A: Allocator = Global> {
    table: &'a mut HashTable<T, A>,
    index: usize,
}

impl<T, A: Allocator> Drop for Drain<'_, T, A> {
    fn drop(&mut self) {
        for _ in &mut *self {}

        // Tombstones past the last live slot are never reached by `next`.
        // SAFETY: The table is empty, so only tags are rewritten.
        unsafe {
            core::ptr::write_bytes(
                self.table.alloc.as_ptr(),
                Control::Empty as u8,
                self.table.capacity,
            );
        }
        self.table.growth_left = reset_growth_left(self.table.capacity, 0);
    }
}

impl<T, A: Allocator> Iterator for Drain<'_, T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.table.len == 0 {
            return None;
        }

        // SAFETY: `index` stays within `0..=capacity`; values are read out of
        // live slots exactly once, and the slot is retagged `Empty` first. Any
        // tombstones passed along the way are cleared too.
        unsafe {
            loop {
                match self.table.ctrl(self.index) {
                    Control::Full => {
                        self.table.set_ctrl(self.index, Control::Empty);
                        self.table.len -= 1;
                        let value = self.table.slot_ptr(self.index).read();
                        self.index += 1;
                        return Some(value);
                    }
                    Control::Deleted => {
                        self.table.set_ctrl(self.index, Control::Empty);
                        self.index += 1;
                    }
                    Control::Empty => self.index += 1,
                    Control::Sentinel => return None,
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len, Some(self.table.len))
    }
}
