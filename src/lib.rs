//! An intrusive AVL tree, and an ordered map built on top of it.

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)`. A missing subtree has height -1, so leaves have
//   height 0.
// - The parent of a node `x` is denoted `p(x)`.
// - The balance factor of `x` is `h(left(x)) - h(right(x))`.
//
// The invariants of an AVL tree are:
// 1. Keys are in binary search tree order.
// 2. Every balance factor is -1, 0 or 1.
// 3. `h(x) = 1 + max(h(left(x)), h(right(x)))` for every node `x`.
// 4. Every child's parent link points back at its parent, and the root has no parent.
//
// Every structural edit recomputes the heights of the nodes whose subtrees changed, bottom-up,
// before control returns to the caller.

use core::{
    cell::UnsafeCell,
    cmp::Ordering,
    fmt,
    marker::PhantomPinned,
    mem,
    ops::Not,
    pin::Pin,
    ptr::{self, NonNull},
};
use std::borrow::Borrow;

use cordyceps::Linked;

mod debug;
mod entry;
mod error;
mod iter;
pub mod map;
#[cfg(any(test, feature = "model"))]
pub mod model;
mod stats;
#[cfg(test)]
mod tests;

pub use entry::{Entry, OccupiedEntry, VacantEntry};
pub use error::BuildError;
pub use iter::{Iter, Order};
pub use map::AvlMap;
pub use stats::SearchCosts;

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord;

    fn key(&self) -> &Self::Key;

    /// Exchanges the keys and payloads of `self` and `other`, leaving both nodes' links in place.
    ///
    /// [`AvlTree::remove`] uses this to move the in-order successor's contents into the node being
    /// removed. The node handed back to the caller is then the successor's node, carrying the
    /// removed key.
    fn swap_contents(&mut self, other: &mut Self);
}

/// An intrusive AVL tree.
///
/// Every node caches the height of its subtree, and the heights of the two subtrees of any node
/// differ by at most one. Lookups, insertions and removals complete in _O(log(n))_ time.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    height: i8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

// Compares addresses only, ignoring any pointer metadata.
#[inline]
fn is_node<T: ?Sized>(link: Link<T>, node: NonNull<T>) -> bool {
    link.is_some_and(|link| ptr::addr_eq(link.as_ptr(), node.as_ptr()))
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Builds a balanced tree from items sorted in strictly ascending key order.
    ///
    /// The middle item of every range becomes the root of that range's subtree, so the result is
    /// balanced without performing any rotations. This operation completes in _O(n)_ time.
    ///
    /// If two neighbouring items are out of order or have equal keys, all items are dropped and
    /// an error naming the offending position is returned.
    pub fn try_from_sorted<I>(items: I) -> Result<AvlTree<T>, BuildError>
    where
        I: IntoIterator<Item = T::Handle>,
    {
        let nodes: Vec<NonNull<T>> = items.into_iter().map(T::into_ptr).collect();

        let violation = nodes.windows(2).enumerate().find_map(|(index, pair)| {
            let ordering = unsafe { pair[0].as_ref().key().cmp(pair[1].as_ref().key()) };

            match ordering {
                Ordering::Less => None,
                Ordering::Equal => Some(BuildError::DuplicateKey { index: index + 1 }),
                Ordering::Greater => Some(BuildError::Unsorted { index: index + 1 }),
            }
        });

        if let Some(error) = violation {
            for node in nodes {
                drop(unsafe { T::from_ptr(node) });
            }

            return Err(error);
        }

        let mut tree = AvlTree::new();
        tree.root = unsafe { tree.build_balanced(&nodes, None) };

        tracing::debug!(len = tree.len, height = tree.height(), "built balanced tree");

        Ok(tree)
    }

    // Links the middle node of `nodes` above balanced subtrees built from each half, and returns
    // it. The nodes must be sorted and not linked into any tree.
    unsafe fn build_balanced(&mut self, nodes: &[NonNull<T>], parent: Link<T>) -> Link<T> {
        if nodes.is_empty() {
            return None;
        }

        let mid = (nodes.len() - 1) / 2;
        let node = nodes[mid];

        unsafe {
            let links = T::links(node).as_mut();
            links.clear();
            links.set_parent(parent);

            let left = self.build_balanced(&nodes[..mid], Some(node));
            let right = self.build_balanced(&nodes[mid + 1..], Some(node));

            let links = T::links(node).as_mut();
            links.set_left(left);
            links.set_right(right);
            self.update_height(node);
        }

        self.len += 1;

        Some(node)
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree. An empty tree has height -1 and a single node has height 0.
    pub fn height(&self) -> i32 {
        i32::from(unsafe { self.height_of(self.root) })
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let mut count = 0;

        if let Some(root) = self.root {
            unsafe {
                assert_eq!(
                    T::links(root).as_ref().parent(),
                    None,
                    "root must not have a parent"
                );
                self.assert_invariants_at(root, None, None, &mut count);
            }
        }

        assert_eq!(count, self.len, "len must match the number of reachable nodes");
    }

    // Checks the subtree rooted at `node`, whose keys must lie strictly between `lower` and
    // `upper`, and returns its height.
    unsafe fn assert_invariants_at<'a>(
        &self,
        node: NonNull<T>,
        lower: Option<&'a T::Key>,
        upper: Option<&'a T::Key>,
        count: &mut usize,
    ) -> i8
    where
        T: 'a,
    {
        *count += 1;

        unsafe {
            let key: &'a T::Key = node.as_ref().key();

            if let Some(lower) = lower {
                assert!(lower < key, "keys must be in ascending order");
            }
            if let Some(upper) = upper {
                assert!(key < upper, "keys must be in ascending order");
            }

            let mut heights = [-1; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = T::links(node).as_ref().child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = T::links(child)
                        .as_ref()
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent);

                    let (lower, upper) = match dir {
                        Dir::Left => (lower, Some(key)),
                        Dir::Right => (Some(key), upper),
                    };

                    heights[dir as usize] = self.assert_invariants_at(child, lower, upper, count);
                }
            }

            let [left, right] = heights;
            assert!((left - right).abs() <= 1, "balance factor out of range");

            let height = 1 + left.max(right);
            assert_eq!(
                T::links(node).as_ref().height(),
                height,
                "cached height is stale"
            );

            height
        }
    }

    /// Returns `true` if the tree contains an element with the given key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the node corresponding to `key`.
    ///
    /// The node's key must not be modified in a way that changes its ordering.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = T::links(cur).as_ref().left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = T::links(cur).as_ref().right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        let root = self.root?;

        unsafe {
            let first = self.min_in_subtree(root);
            Some(Pin::new_unchecked(first.as_ref()))
        }
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        let root = self.root?;

        unsafe {
            let last = self.max_in_subtree(root);
            Some(Pin::new_unchecked(last.as_ref()))
        }
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let root = self.root?;

        unsafe {
            let first = self.min_in_subtree(root);
            Some(self.remove_at(first))
        }
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let root = self.root?;

        unsafe {
            let last = self.max_in_subtree(root);
            Some(self.remove_at(last))
        }
    }

    /// Returns the entry for `key`, which is either the node holding it or the empty slot where a
    /// node with that key belongs.
    pub fn entry<Q>(&mut self, key: &Q) -> Entry<'_, T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return unsafe { Entry::vacant_root(self) };
        };

        loop {
            unsafe {
                let dir = match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => Dir::Left,
                    Ordering::Equal => return Entry::occupied(self, cur),
                    Ordering::Greater => Dir::Right,
                };

                match T::links(cur).as_ref().child(dir) {
                    Some(child) => cur = child,
                    None => return Entry::vacant_child(self, cur, dir),
                }
            }
        }
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already holds an item with an equal key, that item is replaced in place and
    /// returned. Otherwise the item is linked in as a new leaf and its ancestors are rebalanced.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        // SAFETY: `ptr` was just produced from an owned handle and is not linked into any tree.
        let key = unsafe { ptr.as_ref() }.key();

        match self.entry(key) {
            Entry::Occupied(mut occupied) => Some(unsafe { occupied.replace_ptr(ptr) }),
            Entry::Vacant(vacant) => {
                unsafe { vacant.insert_ptr(ptr) };
                None
            }
        }
    }

    // Links `ptr` in as the root of an empty tree.
    pub(crate) unsafe fn insert_as_root(&mut self, ptr: NonNull<T>) {
        debug_assert!(self.root.is_none());

        unsafe { T::links(ptr).as_mut().clear() };

        self.root = Some(ptr);
        self.len += 1;
    }

    // Links `ptr` in as the `dir` child of `parent`, which must be empty, and rebalances the path
    // back up to the root.
    pub(crate) unsafe fn insert_as_child(&mut self, parent: NonNull<T>, dir: Dir, ptr: NonNull<T>) {
        unsafe {
            debug_assert!(T::links(parent).as_ref().child(dir).is_none());

            let links = T::links(ptr).as_mut();
            links.clear();
            links.set_parent(Some(parent));

            T::links(parent).as_mut().set_child(dir, Some(ptr));
            self.len += 1;

            self.rebalance_from(Some(parent));
        }
    }

    /// Removes the element with the given key, rebalancing recursively on the way back up.
    ///
    /// If the element has two children, its contents are exchanged with those of its in-order
    /// successor and the successor's node is unlinked instead. The returned handle always carries
    /// the removed key, but it may be a different node than the one originally inserted with that
    /// key.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let root = self.root?;

        unsafe {
            if self.len == 1 {
                if key.cmp(root.as_ref().key().borrow()) != Ordering::Equal {
                    return None;
                }

                self.root = None;
                self.len = 0;
                T::links(root).as_mut().clear();

                return Some(T::from_ptr(root));
            }

            let (new_root, removed) = self.remove_in(root, key);
            self.root = new_root;
            self.maybe_set_parent(new_root, None);

            let removed = removed?;
            T::links(removed).as_mut().clear();
            self.len -= 1;

            tracing::trace!(len = self.len, "removed by successor copy");

            Some(T::from_ptr(removed))
        }
    }

    // Removes `key` from the subtree rooted at `node`. Returns the new root of the subtree and
    // the unlinked node, if any.
    //
    // The new subtree root's parent link is correct, but the parent's child link is left to the
    // caller.
    unsafe fn remove_in<Q>(&mut self, node: NonNull<T>, key: &Q) -> (Link<T>, Link<T>)
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        unsafe {
            let dir = match key.cmp(node.as_ref().key().borrow()) {
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
                Ordering::Equal => {
                    let left = T::links(node).as_ref().left();
                    let right = T::links(node).as_ref().right();

                    match (left, right) {
                        (Some(_), Some(right)) => {
                            // The target key moves into the successor's node, which is the
                            // minimum of the right subtree, so the search continues there.
                            let successor = self.min_in_subtree(right);
                            T::swap_contents(&mut *node.as_ptr(), &mut *successor.as_ptr());
                            Dir::Right
                        }

                        (child, None) | (None, child) => {
                            self.maybe_set_parent(child, T::links(node).as_ref().parent());
                            return (child, Some(node));
                        }
                    }
                }
            };

            let Some(child) = T::links(node).as_ref().child(dir) else {
                // Key not present.
                return (Some(node), None);
            };

            let (new_child, removed) = self.remove_in(child, key);
            T::links(node).as_mut().set_child(dir, new_child);
            self.maybe_set_parent(new_child, Some(node));

            (Some(self.rebalance_at(node)), removed)
        }
    }

    /// Removes the element with the given key without recursion.
    ///
    /// The node holding `key` is unlinked and returned. If it has two children, its in-order
    /// successor is transplanted into its position.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove_iterative<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        unsafe {
            let parent = T::links(node).as_ref().parent();
            let left = T::links(node).as_ref().left();
            let right = T::links(node).as_ref().right();

            // The lowest node whose subtree lost a node. Everything from here to the root may need
            // rebalancing.
            let rebalance_start = match (left, right) {
                (Some(left), Some(right)) => {
                    let successor = self.min_in_subtree(right);

                    let start = if ptr::addr_eq(successor.as_ptr(), right.as_ptr()) {
                        Some(successor)
                    } else {
                        // Elevate the successor's right child to replace it, then hang the
                        // target's right subtree under the successor.
                        let successor_parent = T::links(successor).as_ref().parent();
                        self.transplant(successor, T::links(successor).as_ref().right());

                        T::links(successor).as_mut().set_right(Some(right));
                        T::links(right).as_mut().set_parent(Some(successor));

                        successor_parent
                    };

                    self.transplant(node, Some(successor));
                    T::links(successor).as_mut().set_left(Some(left));
                    T::links(left).as_mut().set_parent(Some(successor));

                    start
                }

                (child, None) | (None, child) => {
                    self.transplant(node, child);
                    parent
                }
            };

            self.rebalance_from(rebalance_start);

            T::links(node).as_mut().clear();
            self.len -= 1;

            tracing::trace!(len = self.len, "removed by transplant");

            T::from_ptr(node)
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root.take();

        while let Some(cur) = opt_cur {
            unsafe {
                let links = T::links(cur).as_mut();

                // Descend until reaching a leaf.
                if let Some(child) = links.left().or(links.right()) {
                    opt_cur = Some(child);
                    continue;
                }

                // Detach the leaf from its parent, drop it, and climb back up.
                let parent = links.parent();
                if let Some(parent) = parent {
                    let dir = self.which_child(parent, cur);
                    T::links(parent).as_mut().set_child(dir, None);
                }

                links.clear();
                drop(T::from_ptr(cur));

                opt_cur = parent;
            }
        }

        tracing::debug!(removed = self.len, "cleared tree");
        self.len = 0;
    }

    // Rebalancing ============================================================

    // Rebalances every node from `opt_node` up to the root.
    unsafe fn rebalance_from(&mut self, mut opt_node: Link<T>) {
        while let Some(node) = opt_node {
            unsafe {
                let top = self.rebalance_at(node);
                opt_node = T::links(top).as_ref().parent();
            }
        }
    }

    // Restores the balance invariant at `node`, assuming it holds in both subtrees, and returns the
    // root of the resulting subtree. Heights are recomputed for every node that moved.
    unsafe fn rebalance_at(&mut self, node: NonNull<T>) -> NonNull<T> {
        unsafe {
            let factor = self.balance_factor(node);

            if factor > 1 {
                let x = T::links(node)
                    .as_ref()
                    .left()
                    .expect("left-heavy node must have a left child");

                // Prefer a single rotation unless the inner grandchild is strictly taller.
                if self.balance_factor(x) >= 0 {
                    self.rotate_at(node, x)
                } else {
                    let y = T::links(x)
                        .as_ref()
                        .right()
                        .expect("right-heavy node must have a right child");
                    self.rotate_twice_at(node, x, y)
                }
            } else if factor < -1 {
                let x = T::links(node)
                    .as_ref()
                    .right()
                    .expect("right-heavy node must have a right child");

                if self.balance_factor(x) <= 0 {
                    self.rotate_at(node, x)
                } else {
                    let y = T::links(x)
                        .as_ref()
                        .left()
                        .expect("left-heavy node must have a left child");
                    self.rotate_twice_at(node, x, y)
                }
            } else {
                self.update_height(node);
                node
            }
        }
    }

    // Performs a rotation, moving `up` up and its parent `down` down. Returns `up`.
    //
    // The heights of `down` and then `up` are recomputed.
    unsafe fn rotate_at(&mut self, down: NonNull<T>, up: NonNull<T>) -> NonNull<T> {
        unsafe {
            // - `down` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let dir = if is_node(T::links(down).as_ref().right(), up) {
                Dir::Left
            } else {
                Dir::Right
            };

            debug_assert_eq!(T::links(up).as_ref().parent(), Some(down));

            let across = T::links(up).as_ref().child(dir);
            T::links(down).as_mut().set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            T::links(up).as_mut().set_child(dir, Some(down));
            let parent = T::links(down).as_mut().set_parent(Some(up));
            T::links(up).as_mut().set_parent(parent);

            self.replace_child_or_set_root(parent, down, Some(up));

            self.update_height(down);
            self.update_height(up);

            tracing::trace!(direction = ?dir, "single rotation");

            up
        }
    }

    // Performs a double rotation, lifting the grandchild `up` over its parent `down_first` and its
    // grandparent `down_second`. Returns `up`.
    //
    // The heights of both lowered nodes and then `up` are recomputed.
    unsafe fn rotate_twice_at(
        &mut self,
        down_second: NonNull<T>,
        down_first: NonNull<T>,
        up: NonNull<T>,
    ) -> NonNull<T> {
        unsafe {
            let dir = if is_node(T::links(down_first).as_ref().right(), up) {
                Dir::Right
            } else {
                Dir::Left
            };

            let across_first = T::links(up).as_ref().child(!dir);
            let across_second = T::links(up).as_ref().child(dir);

            self.maybe_set_parent(across_first, Some(down_first));

            T::links(down_first).as_mut().set_child(dir, across_first);
            T::links(down_first).as_mut().set_parent(Some(up));

            self.maybe_set_parent(across_second, Some(down_second));

            T::links(down_second)
                .as_mut()
                .set_child(!dir, across_second);
            let parent = T::links(down_second).as_mut().set_parent(Some(up));

            T::links(up).as_mut().set_parent(parent);
            T::links(up).as_mut().set_child(!dir, Some(down_first));
            T::links(up).as_mut().set_child(dir, Some(down_second));

            self.replace_child_or_set_root(parent, down_second, Some(up));

            self.update_height(down_first);
            self.update_height(down_second);
            self.update_height(up);

            tracing::trace!(inner = ?dir, "double rotation");

            up
        }
    }

    // Support methods ========================================================

    // Returns the minimum node in the subtree rooted at `root`.
    #[inline]
    unsafe fn min_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        let mut cur = root;

        while let Some(left) = unsafe { T::links(cur).as_ref().left() } {
            cur = left;
        }

        cur
    }

    // Returns the maximum node in the subtree rooted at `root`.
    #[inline]
    unsafe fn max_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        let mut cur = root;

        while let Some(right) = unsafe { T::links(cur).as_ref().right() } {
            cur = right;
        }

        cur
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { T::links(node).as_mut().set_parent(parent) };
    }

    // Puts `new` (which may be `None`) in the position `old` occupies under its parent, and points
    // `new` back at that parent. `old`'s own links are not updated.
    unsafe fn transplant(&mut self, old: NonNull<T>, new: Link<T>) {
        unsafe {
            let parent = T::links(old).as_ref().parent();
            self.replace_child_or_set_root(parent, old, new);
            self.maybe_set_parent(new, parent);
        }
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that `old_child` is a child node of `parent`.
    #[inline]
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);
            T::links(parent).as_mut().set_child(dir, new_child);
        }
    }

    unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        let links = unsafe { T::links(parent).as_ref() };

        if is_node(links.left(), child) {
            Dir::Left
        } else {
            debug_assert_eq!(
                links.right(),
                Some(child),
                "`child` must be a child of `parent`"
            );
            Dir::Right
        }
    }

    /// Returns the height of the pointed-to node, or -1 if there is none.
    unsafe fn height_of(&self, node: Link<T>) -> i8 {
        node.map(|n| unsafe { T::links(n).as_ref().height() })
            .unwrap_or(-1)
    }

    unsafe fn balance_factor(&self, node: NonNull<T>) -> i8 {
        unsafe {
            let links = T::links(node).as_ref();
            self.height_of(links.left()) - self.height_of(links.right())
        }
    }

    #[inline]
    unsafe fn update_height(&mut self, node: NonNull<T>) {
        unsafe {
            let height = {
                let links = T::links(node).as_ref();
                1 + self.height_of(links.left()).max(self.height_of(links.right()))
            };

            T::links(node).as_mut().set_height(height);
        }
    }

    #[inline]
    pub(crate) unsafe fn links<'a>(&self, node: NonNull<T>) -> &'a Links<T> {
        unsafe { T::links(node).as_ref() }
    }

    #[inline]
    pub(crate) unsafe fn links_mut<'a>(&mut self, node: NonNull<T>) -> &'a mut Links<T> {
        unsafe { T::links(node).as_mut() }
    }
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn height(&self) -> i8 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_height(&mut self, height: i8) {
        self.inner.get_mut().height = height;
    }

    // Resets the links to those of a detached leaf.
    #[inline]
    fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.height = 0;
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("height", &self.height())
            .finish()
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}
