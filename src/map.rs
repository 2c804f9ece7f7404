//! An ordered map backed by an [`AvlTree`].

use core::{
    borrow::Borrow, fmt, iter::FusedIterator, marker::PhantomPinned, mem, ptr::NonNull,
};

use cordyceps::Linked;

use crate::{AvlTree, BuildError, Entry, Links, Order, SearchCosts, TreeNode};

/// An ordered map based on an [AVL tree].
///
/// # Examples
///
/// ```
/// use cordyceps_avl::AvlMap;
///
/// let mut map = AvlMap::new();
/// assert_eq!(map.put(10, "ten"), None);
/// assert_eq!(map.put(2, "two"), None);
/// assert_eq!(map.put(2, "deux"), Some("two"));
///
/// assert_eq!(map.len(), 2);
/// assert_eq!(map.get(&2), Some(&"deux"));
/// assert_eq!(map.remove(&10), Some("ten"));
/// assert_eq!(map.remove(&10), None);
/// ```
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlMap<K: Ord, V> {
    pub(crate) tree: AvlTree<MapNode<K, V>>,
}

pub(crate) struct MapNode<K, V> {
    links: Links<MapNode<K, V>>,
    pub(crate) key: K,
    pub(crate) value: V,
    _unpin: PhantomPinned,
}

impl<K, V> MapNode<K, V> {
    fn new(key: K, value: V) -> Box<Self> {
        Box::new(MapNode {
            links: Links::new(),
            key,
            value,
            _unpin: PhantomPinned,
        })
    }

    fn into_pair(self: Box<Self>) -> (K, V) {
        let MapNode { key, value, .. } = *self;
        (key, value)
    }
}

unsafe impl<K, V> Linked<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<MapNode<K, V>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord, V> TreeNode<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }

    fn swap_contents(&mut self, other: &mut Self) {
        mem::swap(&mut self.key, &mut other.key);
        mem::swap(&mut self.value, &mut other.value);
    }
}

impl<K: Ord, V> AvlMap<K, V> {
    /// Creates a new, empty `AvlMap`.
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::new(),
        }
    }

    /// Builds a map from pairs sorted in strictly ascending key order, without any rotations.
    ///
    /// # Errors
    ///
    /// Returns an error if the keys are out of order or contain a duplicate. No map is built in
    /// that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use cordyceps_avl::{AvlMap, BuildError};
    ///
    /// let map = AvlMap::from_sorted((0..10).map(|k| (k, k + 1))).unwrap();
    /// assert_eq!(map.height(), 3);
    ///
    /// let err = AvlMap::from_sorted([(2, ()), (1, ())]).unwrap_err();
    /// assert_eq!(err, BuildError::Unsorted { index: 1 });
    /// ```
    pub fn from_sorted<I>(pairs: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let nodes = pairs
            .into_iter()
            .map(|(key, value)| MapNode::new(key, value));

        Ok(Self {
            tree: AvlTree::try_from_sorted(nodes)?,
        })
    }

    /// Returns `true` if the map contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    #[doc(alias = "size")]
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the underlying tree, or -1 if the map is empty.
    pub fn height(&self) -> i32 {
        self.tree.height()
    }

    /// Returns `true` if the map contains a value associated with `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the value associated with `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|node| &node.get_ref().value)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .get_mut(key)
            // SAFETY: Pinning is not structural for `node.value`.
            .map(|node| unsafe { &mut node.get_unchecked_mut().value })
    }

    /// Associates `value` with `key`, returning the value previously associated with it.
    ///
    /// An existing key keeps its node and only has its value replaced. A new key is linked in as a
    /// leaf and the tree is rebalanced on the path back to the root.
    #[doc(alias = "insert")]
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        match self.tree.entry(&key) {
            Entry::Occupied(mut occupied) => {
                // SAFETY: Only the value is modified, which is not structurally pinned.
                let node = unsafe { occupied.get_mut().get_unchecked_mut() };
                Some(mem::replace(&mut node.value, value))
            }
            Entry::Vacant(vacant) => {
                // SAFETY: the entry was located with this very key.
                unsafe { vacant.insert(MapNode::new(key, value)) };
                None
            }
        }
    }

    /// Removes the value associated with `key` from the map.
    ///
    /// Recurses from the root, and on a node with two children replaces its pair with the
    /// in-order successor's before removing the successor's node.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(|node| node.value)
    }

    /// Removes the value associated with `key` from the map without recursing.
    ///
    /// The node holding `key` is unlinked directly and its in-order successor, if it has two
    /// children, is transplanted into its place. The resulting map contents are the same as with
    /// [`AvlMap::remove`].
    #[inline]
    pub fn remove_iterative<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove_iterative(key).map(|node| node.value)
    }

    /// Returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first().map(MapNode::into_pair)
    }

    /// Returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last().map(MapNode::into_pair)
    }

    /// Clears the map, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.traversal(Order::InOrder)
    }

    /// Returns an iterator visiting each entry before the entries of its subtrees.
    pub fn pre_order(&self) -> Iter<'_, K, V> {
        self.traversal(Order::PreOrder)
    }

    /// Returns an iterator visiting each entry after the entries of its subtrees.
    pub fn post_order(&self) -> Iter<'_, K, V> {
        self.traversal(Order::PostOrder)
    }

    /// Returns an iterator over the entries of the map in the given order.
    pub fn traversal(&self, order: Order) -> Iter<'_, K, V> {
        Iter {
            inner: self.tree.traversal(order),
        }
    }

    /// Returns an iterator over the keys of the map, in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values of the map, ordered by key.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Returns the average comparison counts of successful and unsuccessful lookups.
    pub fn search_costs(&self) -> SearchCosts {
        self.tree.search_costs()
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }
}

impl<K: Ord + fmt::Display, V> AvlMap<K, V> {
    /// Renders the keys of the underlying tree sideways. See [`AvlTree::draw`].
    pub fn draw(&self) -> String {
        self.tree.draw()
    }

    /// Writes the keys in the given order on a single line. See [`AvlTree::write_traversal`].
    pub fn write_traversal<W: fmt::Write>(&self, order: Order, w: W) -> fmt::Result {
        self.tree.write_traversal(order, w)
    }

    /// Writes a Graphviz description of the underlying tree. See [`AvlTree::dotgraph`].
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, w: W) -> fmt::Result {
        self.tree.dotgraph(name, w)
    }
}

impl<K: Ord, V> Default for AvlMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Builds a map by inserting the pairs one at a time, in the order given.
///
/// Later pairs overwrite the values of earlier pairs with equal keys.
impl<K: Ord, V> FromIterator<(K, V)> for AvlMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AvlMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a AvlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of an [`AvlMap`].
///
/// Cloning the iterator yields an independent traversal from the same position.
pub struct Iter<'a, K: Ord, V> {
    inner: crate::Iter<'a, MapNode<K, V>>,
}

impl<'a, K: Ord, V> Iter<'a, K, V> {
    /// Returns the order this iterator visits entries in.
    pub fn order(&self) -> Order {
        self.inner.order()
    }
}

impl<'a, K: Ord, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: Ord, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K: Ord, V> FusedIterator for Iter<'a, K, V> {}
