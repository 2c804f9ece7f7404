use core::ptr::NonNull;

use crate::{AvlTree, Links, TreeNode};

/// Average number of key comparisons a lookup performs.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SearchCosts {
    /// Averaged over every key present in the tree.
    pub successful: f64,
    /// Averaged over every empty child slot, each of which stands for the range of absent keys
    /// that a failed lookup ends at.
    pub unsuccessful: f64,
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Computes the average comparison counts of successful and unsuccessful lookups.
    ///
    /// A node at depth `d` (the root has depth 0) is found after `d + 1` comparisons, and a lookup
    /// that falls off below it also costs `d + 1`. An empty tree costs nothing either way.
    pub fn search_costs(&self) -> SearchCosts {
        let Some(root) = self.root else {
            return SearchCosts::default();
        };

        let mut internal = 0usize;
        let mut external = 0usize;
        let mut stack: Vec<(NonNull<T>, usize)> = vec![(root, 1)];

        while let Some((node, cost)) = stack.pop() {
            internal += cost;

            let links = unsafe { T::links(node).as_ref() };
            for child in [links.left(), links.right()] {
                match child {
                    Some(child) => stack.push((child, cost + 1)),
                    None => external += cost,
                }
            }
        }

        // A tree of `n` nodes has `n + 1` empty child slots.
        SearchCosts {
            successful: internal as f64 / self.len as f64,
            unsuccessful: external as f64 / (self.len + 1) as f64,
        }
    }
}
