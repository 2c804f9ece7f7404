use core::{fmt, iter::FusedIterator, ptr::NonNull};

use crate::{AvlTree, Dir, Link, Links, TreeNode};

/// The order in which a traversal visits the nodes of a tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Order {
    /// Each node before its left and right subtrees.
    PreOrder,
    /// The left subtree, then the node, then the right subtree. Keys come out ascending.
    InOrder,
    /// Both subtrees before the node itself.
    PostOrder,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Order::PreOrder => "Preorder",
            Order::InOrder => "Inorder",
            Order::PostOrder => "Postorder",
        })
    }
}

/// A lazy traversal over the nodes of an [`AvlTree`].
///
/// The traversal walks parent links rather than keeping a stack, so it holds only a cursor. Clone
/// it to restart from the current position, or ask the tree for a fresh one.
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,
    order: Order,
    next: Link<T>,
    len: usize,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>, order: Order) -> Self {
        let next = tree.root.map(|root| unsafe {
            match order {
                Order::PreOrder => root,
                Order::InOrder => tree.min_in_subtree(root),
                Order::PostOrder => tree.postorder_first(root),
            }
        });

        Iter {
            tree,
            order,
            next,
            len: tree.len(),
        }
    }

    /// Returns the order this traversal visits nodes in.
    pub fn order(&self) -> Order {
        self.order
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Clone for Iter<'tree, T> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            order: self.order,
            next: self.next,
            len: self.len,
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;

        unsafe {
            self.next = match self.order {
                Order::PreOrder => self.tree.preorder_next(cur),
                Order::InOrder => self.tree.successor_raw(cur),
                Order::PostOrder => self.tree.postorder_next(cur),
            };

            self.len -= 1;

            Some(cur.as_ref())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> FusedIterator for Iter<'tree, T> {}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns an iterator over the tree's elements in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self, Order::InOrder)
    }

    /// Returns an iterator over the tree's elements in the given order.
    pub fn traversal(&self, order: Order) -> Iter<'_, T> {
        Iter::new(self, order)
    }

    // Returns the in-order successor of `node`.
    pub(crate) unsafe fn successor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe {
            if let Some(right) = T::links(node).as_ref().right() {
                return Some(self.min_in_subtree(right));
            }

            // Ascend until arriving from a left child.
            let mut cur = node;
            while let Some(parent) = T::links(cur).as_ref().parent() {
                if self.which_child(parent, cur) == Dir::Left {
                    return Some(parent);
                }

                cur = parent;
            }

            None
        }
    }

    pub(crate) unsafe fn preorder_next(&self, node: NonNull<T>) -> Link<T> {
        unsafe {
            let links = T::links(node).as_ref();
            if let Some(child) = links.left().or(links.right()) {
                return Some(child);
            }

            // Ascend until finding an unvisited right subtree.
            let mut cur = node;
            while let Some(parent) = T::links(cur).as_ref().parent() {
                if self.which_child(parent, cur) == Dir::Left {
                    if let Some(right) = T::links(parent).as_ref().right() {
                        return Some(right);
                    }
                }

                cur = parent;
            }

            None
        }
    }

    // Returns the first node of a post-order traversal of the subtree rooted at `root`.
    pub(crate) unsafe fn postorder_first(&self, root: NonNull<T>) -> NonNull<T> {
        let mut cur = root;

        loop {
            let links = unsafe { T::links(cur).as_ref() };

            match links.left().or(links.right()) {
                Some(child) => cur = child,
                None => return cur,
            }
        }
    }

    pub(crate) unsafe fn postorder_next(&self, node: NonNull<T>) -> Link<T> {
        unsafe {
            let parent = T::links(node).as_ref().parent()?;

            if self.which_child(parent, node) == Dir::Left {
                if let Some(right) = T::links(parent).as_ref().right() {
                    return Some(self.postorder_first(right));
                }
            }

            Some(parent)
        }
    }
}

impl<'tree, T> IntoIterator for &'tree AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
