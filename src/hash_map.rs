use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::error::TryReserveError;
use crate::hash_table::Cursor;
use crate::hash_table::Fallibility;
use crate::hash_table::HashTable;
use crate::hash_table::infallible;
use crate::policy::Allocator;
use crate::policy::Global;

/// A hash map stored in a linear-probing [`HashTable`] of `(K, V)` pairs.
///
/// `HashMap<K, V, S, A>` hashes keys with the builder `S` and draws its
/// buffer from the allocator `A`. Values move when the table is rebuilt, so
/// references and cursors into the map only live until the next insert.
///
/// # Performance Characteristics
///
/// - **Memory**: 1 control byte per slot, plus the size of `(K, V)` per slot.
#[derive(Clone)]
pub struct HashMap<K, V, S, A: Allocator = Global> {
    table: HashTable<(K, V), A>,
    hash_builder: S,
}

impl<K, V, S, A> Debug for HashMap<K, V, S, A>
where
    K: Debug,
    V: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.table.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S, A> PartialEq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    A: Allocator,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter()
            .all(|(k, v)| other.get(k).is_some_and(|theirs| *v == *theirs))
    }
}

impl<K, V, S, A> Eq for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    A: Allocator,
{
}

impl<'a, K, V, A: Allocator> Cursor<'a, (K, V), A> {
    /// Returns the key under the cursor, or `None` once exhausted.
    pub fn key(&self) -> Option<&'a K> {
        self.get().map(|(k, _)| k)
    }

    /// Returns the value under the cursor, or `None` once exhausted.
    pub fn value(&self) -> Option<&'a V> {
        self.get().map(|(_, v)| v)
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a new hash map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use lin_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a new hash map with at least the specified capacity and the
    /// given hasher builder.
    ///
    /// The capacity is rounded up to a power of two, at least 16.
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

impl<K, V, S, A> HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Creates a new hash map whose buffer comes from `allocator`.
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

    /// Returns the number of key-value pairs in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no key-value pairs.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the underlying table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all key-value pairs, keeping the capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Inserts a key-value pair if `key` is not already present.
    ///
    /// Returns a cursor at the stored pair and whether the pair was newly
    /// inserted. An existing pair is never overwritten; the given key and
    /// value are dropped instead. Use [`insert_or_assign`] to overwrite.
    ///
    /// [`insert_or_assign`]: Self::insert_or_assign
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str, DefaultHashBuilder> = HashMap::new();
    /// let (cursor, inserted) = map.insert(1, "a");
    /// assert!(inserted);
    /// assert_eq!(cursor.value(), Some(&"a"));
    ///
    /// let (cursor, inserted) = map.insert(1, "b");
    /// assert!(!inserted);
    /// assert_eq!(cursor.value(), Some(&"a"));
    /// # }
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (Cursor<'_, (K, V), A>, bool) {
        infallible(self.insert_impl(key, value, false, Fallibility::Infallible))
    }

    /// Fallible version of [`insert`](Self::insert).
    pub fn try_insert(
        &mut self,
        key: K,
        value: V,
    ) -> Result<(Cursor<'_, (K, V), A>, bool), TryReserveError> {
        self.insert_impl(key, value, false, Fallibility::Fallible)
    }

    /// Inserts a key-value pair, overwriting the value if `key` is already
    /// present.
    ///
    /// On overwrite the stored key is kept and the given one is dropped.
    /// Returns a cursor at the stored pair and whether the key is new.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str, DefaultHashBuilder> = HashMap::new();
    /// map.insert_or_assign(1, "a");
    /// let (cursor, inserted) = map.insert_or_assign(1, "b");
    /// assert!(!inserted);
    /// assert_eq!(cursor.value(), Some(&"b"));
    /// assert_eq!(map.len(), 1);
    /// # }
    /// ```
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (Cursor<'_, (K, V), A>, bool) {
        infallible(self.insert_impl(key, value, true, Fallibility::Infallible))
    }

    /// Fallible version of [`insert_or_assign`](Self::insert_or_assign).
    pub fn try_insert_or_assign(
        &mut self,
        key: K,
        value: V,
    ) -> Result<(Cursor<'_, (K, V), A>, bool), TryReserveError> {
        self.insert_impl(key, value, true, Fallibility::Fallible)
    }

    fn insert_impl(
        &mut self,
        key: K,
        value: V,
        assign: bool,
        fallibility: Fallibility,
    ) -> Result<(Cursor<'_, (K, V), A>, bool), TryReserveError> {
        let hash = self.hash_builder.hash_one(&key);
        let hash_builder = &self.hash_builder;

        let (index, inserted) = match self.table.find_or_find_insert_slot(hash, |(k, _)| k == &key)
        {
            Ok(index) => {
                if assign {
                    // SAFETY: `index` was just found as a live slot.
                    unsafe { self.table.slot_mut(index).1 = value };
                }
                (index, false)
            }
            Err(candidate) => {
                // SAFETY: `candidate` was just produced for `hash`.
                let index = unsafe {
                    self.table.insert_in_slot(
                        hash,
                        candidate,
                        (key, value),
                        &|(k, _): &(K, V)| hash_builder.hash_one(k),
                        fallibility,
                    )?
                };
                (index, true)
            }
        };

        Ok((Cursor::at(&self.table, index), inserted))
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str, DefaultHashBuilder> = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// # }
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        let hash = self.hash_builder.hash_one(key);
        self.table.get(hash, |(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.hash_builder.hash_one(key);
        self.table.get_mut(hash, |(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns a cursor positioned on the pair for `key`, if present.
    pub fn find(&self, key: &K) -> Option<Cursor<'_, (K, V), A>> {
        let hash = self.hash_builder.hash_one(key);
        self.table.find(hash, |(k, _)| k == key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key(&self, key: &K) -> bool {
        let hash = self.hash_builder.hash_one(key);
        self.table.contains(hash, |(k, _)| k == key)
    }

    /// Removes the pair for `key`. Returns whether it was present.
    pub fn erase(&mut self, key: &K) -> bool {
        let hash = self.hash_builder.hash_one(key);
        self.table.erase(hash, |(k, _)| k == key)
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, &str, DefaultHashBuilder> = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// # }
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, |(k, _)| k == key)
    }

    /// An iterator visiting all key-value pairs in slot order.
    pub fn iter(&self) -> Iter<'_, K, V, A> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// An iterator visiting all keys in slot order.
    pub fn keys(&self) -> Keys<'_, K, V, A> {
        Keys {
            inner: self.table.iter(),
        }
    }

    /// An iterator visiting all values in slot order.
    pub fn values(&self) -> Values<'_, K, V, A> {
        Values {
            inner: self.table.iter(),
        }
    }

    /// An iterator visiting all values mutably in slot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashMap;
    ///
    /// let mut map: HashMap<&str, i32, DefaultHashBuilder> = HashMap::new();
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    ///
    /// for value in map.values_mut() {
    ///     *value *= 10;
    /// }
    /// assert_eq!(map.get(&"a"), Some(&10));
    /// assert_eq!(map.get(&"b"), Some(&20));
    /// # }
    /// ```
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Removes and yields every pair, leaving the map empty with its
    /// capacity intact.
    pub fn drain(&mut self) -> crate::hash_table::Drain<'_, (K, V), A> {
        self.table.drain()
    }

    /// Returns utilization statistics of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table
            .debug_stats(|(k, _)| self.hash_builder.hash_one(k))
    }

    /// Returns the probe-length histogram of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table
            .probe_histogram(|(k, _)| self.hash_builder.hash_one(k))
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates a new hash map using the default hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash map with at least the specified capacity using the
    /// default hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HashMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, A> Extend<(K, V)> for HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    /// Later pairs overwrite the values of earlier ones with the same key.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert_or_assign(k, v);
        }
    }
}

impl<'a, K, V, S, A> IntoIterator for &'a HashMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator,
{
    type IntoIter = Iter<'a, K, V, A>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of a `HashMap`.
pub struct Iter<'a, K, V, A: Allocator = Global> {
    inner: crate::hash_table::Iter<'a, (K, V), A>,
}

impl<'a, K, V, A: Allocator> Iterator for Iter<'a, K, V, A> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for Iter<'_, K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for Iter<'_, K, V, A> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V, A: Allocator = Global> {
    inner: crate::hash_table::Iter<'a, (K, V), A>,
}

impl<'a, K, V, A: Allocator> Iterator for Keys<'a, K, V, A> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for Keys<'_, K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for Keys<'_, K, V, A> {}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V, A: Allocator = Global> {
    inner: crate::hash_table::Iter<'a, (K, V), A>,
}

impl<'a, K, V, A: Allocator> Iterator for Values<'a, K, V, A> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for Values<'_, K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for Values<'_, K, V, A> {}

/// A mutable iterator over the values of a `HashMap`.
pub struct ValuesMut<'a, K, V> {
    inner: crate::hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}
