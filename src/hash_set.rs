use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::error::TryReserveError;
use crate::hash_table::Cursor;
use crate::hash_table::Fallibility;
use crate::hash_table::HashTable;
use crate::hash_table::infallible;
use crate::policy::Allocator;
use crate::policy::Global;

/// A hash set stored in a linear-probing [`HashTable`].
///
/// `HashSet<T, S, A>` stores values of type `T` where `T` implements
/// `Hash + Eq`, hashes them with the builder `S`, and draws its buffer from
/// the allocator `A`.
///
/// # Performance Characteristics
///
/// - **Memory**: 1 control byte per slot, plus the size of `T` per slot.
/// - **Load**: at most 7/8 of the slots are non-empty; tombstones count
///   until the next rebuild.
#[derive(Clone)]
pub struct HashSet<T, S, A: Allocator = Global> {
    table: HashTable<T, A>,
    hash_builder: S,
}

impl<T, S, A> PartialEq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, A> Eq for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<T, S, A> Debug for HashSet<T, S, A>
where
    T: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.table.iter()).finish()
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use lin_hash::hash_set::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// assert_eq!(set.capacity(), 16);
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a new hash set with at least the specified capacity and the
    /// given hasher builder.
    ///
    /// The capacity is rounded up to a power of two, at least 16.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use lin_hash::hash_set::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_capacity_and_hasher(100, RandomState::new());
    /// assert_eq!(set.capacity(), 128);
    /// # }
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_and_hasher_in(capacity, hash_builder, Global)
    }

    /// Fallible version of
    /// [`with_capacity_and_hasher`](Self::with_capacity_and_hasher).
    pub fn try_with_capacity_and_hasher(
        capacity: usize,
        hash_builder: S,
    ) -> Result<Self, TryReserveError> {
        Self::try_with_capacity_and_hasher_in(capacity, hash_builder, Global)
    }
}

impl<T, S, A> HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Creates a new hash set whose buffer comes from `allocator`.
    pub fn with_capacity_and_hasher_in(capacity: usize, hash_builder: S, allocator: A) -> Self {
        Self {
            table: HashTable::with_capacity_in(capacity, allocator),
            hash_builder,
        }
    }

    /// Fallible version of
    /// [`with_capacity_and_hasher_in`](Self::with_capacity_and_hasher_in).
    pub fn try_with_capacity_and_hasher_in(
        capacity: usize,
        hash_builder: S,
        allocator: A,
    ) -> Result<Self, TryReserveError> {
        Ok(Self {
            table: HashTable::try_with_capacity_in(capacity, allocator)?,
            hash_builder,
        })
    }

    /// Returns the number of elements in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32, DefaultHashBuilder> = HashSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the underlying table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all elements from the set, keeping its capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Adds a value to the set.
    ///
    /// Returns a cursor at the stored value and whether `value` was newly
    /// inserted. If an equal value was already present it is kept and
    /// `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32, DefaultHashBuilder> = HashSet::new();
    /// let (cursor, inserted) = set.insert(37);
    /// assert!(inserted);
    /// assert_eq!(cursor.get(), Some(&37));
    /// assert!(!set.insert(37).1);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> (Cursor<'_, T, A>, bool) {
        infallible(self.insert_impl(value, Fallibility::Infallible))
    }

    /// Fallible version of [`insert`](Self::insert).
    ///
    /// On error the set is unchanged and `value` is dropped.
    pub fn try_insert(&mut self, value: T) -> Result<(Cursor<'_, T, A>, bool), TryReserveError> {
        self.insert_impl(value, Fallibility::Fallible)
    }

    fn insert_impl(
        &mut self,
        value: T,
        fallibility: Fallibility,
    ) -> Result<(Cursor<'_, T, A>, bool), TryReserveError> {
        let hash = self.hash_builder.hash_one(&value);
        let hash_builder = &self.hash_builder;

        let (index, inserted) = match self.table.find_or_find_insert_slot(hash, |v| v == &value) {
            Ok(index) => (index, false),
            Err(candidate) => {
                // SAFETY: `candidate` was just produced for `hash`.
                let index = unsafe {
                    self.table.insert_in_slot(
                        hash,
                        candidate,
                        value,
                        &|v: &T| hash_builder.hash_one(v),
                        fallibility,
                    )?
                };
                (index, true)
            }
        };

        Ok((Cursor::at(&self.table, index), inserted))
    }

    /// Returns `true` if the set contains a value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32, DefaultHashBuilder> = HashSet::new();
    /// set.insert(1);
    /// assert!(set.contains(&1));
    /// assert!(!set.contains(&2));
    /// # }
    /// ```
    pub fn contains(&self, value: &T) -> bool {
        let hash = self.hash_builder.hash_one(value);
        self.table.contains(hash, |v| v == value)
    }

    /// Returns a cursor positioned on the value equal to `value`, if any.
    pub fn find(&self, value: &T) -> Option<Cursor<'_, T, A>> {
        let hash = self.hash_builder.hash_one(value);
        self.table.find(hash, |v| v == value)
    }

    /// Returns a reference to the stored value equal to `value`, if any.
    pub fn get(&self, value: &T) -> Option<&T> {
        let hash = self.hash_builder.hash_one(value);
        self.table.get(hash, |v| v == value)
    }

    /// Removes a value from the set. Returns whether the value was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32, DefaultHashBuilder> = HashSet::new();
    /// set.insert(1);
    /// assert!(set.erase(&1));
    /// assert!(!set.erase(&1));
    /// # }
    /// ```
    pub fn erase(&mut self, value: &T) -> bool {
        let hash = self.hash_builder.hash_one(value);
        self.table.erase(hash, |v| v == value)
    }

    /// Removes and returns the stored value equal to `value`, if any.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let hash = self.hash_builder.hash_one(value);
        self.table.remove(hash, |v| v == value)
    }

    /// Returns an iterator over the values of the set, in slot order.
    pub fn iter(&self) -> crate::hash_table::Iter<'_, T, A> {
        self.table.iter()
    }

    /// Removes and yields every value, leaving the set empty with its
    /// capacity intact.
    pub fn drain(&mut self) -> crate::hash_table::Drain<'_, T, A> {
        self.table.drain()
    }

    /// Returns utilization statistics of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats(|v| self.hash_builder.hash_one(v))
    }

    /// Returns the probe-length histogram of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table.probe_histogram(|v| self.hash_builder.hash_one(v))
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates a new hash set using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashSet;
    ///
    /// let set: HashSet<i32, DefaultHashBuilder> = HashSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash set with at least the specified capacity using the
    /// default hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S> Default for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, S, A> IntoIterator for &'a HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type IntoIter = crate::hash_table::Iter<'a, T, A>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HashSet::new();
        set.extend(iter);
        set
    }
}

impl<T, S, A> Extend<T> for HashSet<T, S, A>
where
    T: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    /// Sends every value to the same start index.
    #[derive(Clone, Default)]
    struct ConstantHashBuilder;

    struct ConstantHasher;

    impl Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            0
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    impl BuildHasher for ConstantHashBuilder {
        type Hasher = ConstantHasher;

        fn build_hasher(&self) -> Self::Hasher {
            ConstantHasher
        }
    }

    #[test]
    fn test_new_and_with_hasher() {
        let set: HashSet<i32, SipHashBuilder> = HashSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(set.capacity(), 16);

        let set: HashSet<i32, _> = HashSet::with_hasher(SipHashBuilder::default());
        assert!(set.is_empty());
    }

    #[test]
    fn test_with_capacity() {
        let set: HashSet<i32, SipHashBuilder> = HashSet::with_capacity(100);
        assert_eq!(set.capacity(), 128);

        let set: HashSet<i32, SipHashBuilder> = HashSet::with_capacity(3353);
        assert_eq!(set.capacity(), 4096);
    }

    #[test]
    fn test_try_with_capacity() {
        let set =
            HashSet::<u64, _>::try_with_capacity_and_hasher(10, SipHashBuilder::default()).unwrap();
        assert_eq!(set.capacity(), 16);

        let err = HashSet::<u64, _>::try_with_capacity_and_hasher(usize::MAX, SipHashBuilder::default())
            .unwrap_err();
        assert_eq!(err, TryReserveError::CapacityOverflow);
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        let (cursor, inserted) = set.insert(1);
        assert!(inserted);
        assert_eq!(cursor.get(), Some(&1));
        assert!(set.insert(2).1);
        assert!(set.insert(3).1);

        let (cursor, inserted) = set.insert(1);
        assert!(!inserted);
        assert_eq!(cursor.get(), Some(&1));

        assert!(set.contains(&1));
        assert!(set.contains(&2));
        assert!(set.contains(&3));
        assert!(!set.contains(&4));

        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_try_insert() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        for i in 0..100u32 {
            let (_, inserted) = set.try_insert(i).unwrap();
            assert!(inserted);
        }
        let (_, inserted) = set.try_insert(5).unwrap();
        assert!(!inserted);
        assert_eq!(set.len(), 100);
    }

    #[test]
    fn test_erase() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        set.insert(1);
        set.insert(2);

        assert!(set.erase(&1));
        assert!(!set.erase(&1));
        assert!(!set.contains(&1));
        assert!(set.contains(&2));

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_take() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        set.insert("hello".to_string());

        let taken = set.take(&"hello".to_string());
        assert_eq!(taken, Some("hello".to_string()));
        assert!(!set.contains(&"hello".to_string()));
        assert_eq!(set.len(), 0);

        assert_eq!(set.take(&"missing".to_string()), None);
    }

    #[test]
    fn test_get_and_find() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.insert(42);

        assert_eq!(set.get(&42), Some(&42));
        assert_eq!(set.get(&43), None);

        let cursor = set.find(&42).expect("present");
        assert_eq!(cursor.get(), Some(&42));
        assert!(set.find(&43).is_none());
    }

    #[test]
    fn test_clear() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for i in 0..10 {
            set.insert(i);
        }
        let capacity = set.capacity();

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.capacity(), capacity);

        for i in 0..10 {
            assert!(!set.contains(&i));
        }
    }

    #[test]
    fn test_iter() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for i in 0..5 {
            set.insert(i);
        }

        let mut values: Vec<_> = set.iter().cloned().collect();
        values.sort();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);

        let mut by_ref: Vec<_> = (&set).into_iter().cloned().collect();
        by_ref.sort();
        assert_eq!(by_ref, values);
    }

    #[test]
    fn test_drain() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for i in 0..5 {
            set.insert(i);
        }

        let mut drained: Vec<_> = set.drain().collect();
        drained.sort();

        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(set.is_empty());
        assert!(set.insert(3).1);
    }

    #[test]
    fn test_multiple_insertions() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for i in 0..100 {
            assert!(set.insert(i).1);
        }

        for i in 0..100 {
            assert!(!set.insert(i).1);
        }

        assert_eq!(set.len(), 100);
    }

    #[test]
    fn test_collision_handling() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for i in 0..1000 {
            assert!(set.insert(i).1);
        }

        assert_eq!(set.len(), 1000);

        for i in (0..1000).step_by(2) {
            assert!(set.erase(&i));
        }

        assert_eq!(set.len(), 500);

        for i in (1..1000).step_by(2) {
            assert!(set.contains(&i));
        }

        for i in (0..1000).step_by(2) {
            assert!(!set.contains(&i));
        }
    }

    #[test]
    fn test_constant_hash() {
        let mut set: HashSet<u32, ConstantHashBuilder> = HashSet::new();

        for i in 0..37 {
            assert!(set.insert(i).1);
        }
        assert_eq!(set.capacity(), 64);

        for i in 0..37 {
            assert!(set.erase(&i));
            for j in i + 1..37 {
                assert!(set.contains(&j));
                assert!(!set.insert(j).1);
            }
        }
        assert!(set.is_empty());
    }

    #[test]
    fn test_string_values() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        assert!(set.insert("hello".to_string()).1);
        assert!(set.insert("world".to_string()).1);
        assert!(set.insert("rust".to_string()).1);

        assert!(set.contains(&"hello".to_string()));
        assert!(!set.contains(&"missing".to_string()));

        assert_eq!(set.len(), 3);

        assert!(!set.insert("hello".to_string()).1);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_default_trait() {
        let set: HashSet<i32, SipHashBuilder> = HashSet::default();
        assert!(set.is_empty());
    }

    #[test]
    fn test_equality_and_clone() {
        let a: HashSet<i32, SipHashBuilder> = (0..20).collect();
        let mut b = a.clone();
        assert_eq!(a, b);

        b.erase(&3);
        assert_ne!(a, b);

        b.insert(3);
        assert_eq!(a, b);

        b.erase(&3);
        b.insert(99);
        assert_ne!(a, b);
    }

    #[test]
    fn test_extend() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.extend(vec![1, 2, 3]);
        set.extend(vec![3, 4]);

        assert_eq!(set.len(), 4);
        for i in 1..=4 {
            assert!(set.contains(&i));
        }
    }

    #[test]
    fn test_debug_format() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.insert("only".to_string());
        assert_eq!(alloc::format!("{:?}", set), "{\"only\"}");
    }

    #[test]
    fn test_complex_values() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        let vec1 = vec![1, 2, 3];
        let vec2 = vec![4, 5, 6];
        let vec3 = vec![1, 2, 3];

        assert!(set.insert(vec1.clone()).1);
        assert!(set.insert(vec2.clone()).1);
        assert!(!set.insert(vec3).1);

        assert_eq!(set.len(), 2);
        assert!(set.contains(&vec1));
        assert!(set.contains(&vec2));
    }

    #[test]
    fn test_edge_cases() {
        let mut set: HashSet<String, _> = HashSet::with_hasher(SipHashBuilder::default());

        assert!(!set.erase(&"a".to_string()));
        assert_eq!(set.take(&"a".to_string()), None);
        assert_eq!(set.get(&"a".to_string()), None);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
        assert_eq!(set.drain().count(), 0);
    }

    #[test]
    fn test_insert_erase_cycle() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for _ in 0..10 {
            for i in 0..50 {
                assert!(set.insert(i).1);
            }
            assert_eq!(set.len(), 50);

            for i in 0..50 {
                assert!(set.erase(&i));
            }
            assert!(set.is_empty());
        }
        assert!(set.capacity() <= 128);
    }
}
