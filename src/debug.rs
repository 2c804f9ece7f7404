extern crate std;

use core::ptr::NonNull;
use std::{collections::VecDeque, fmt, prelude::v1::*};

use crate::{AvlTree, Dir, Links, Order, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Display,
{
    /// Renders the tree sideways: the root sits at the left margin, right subtrees above their
    /// parent and left subtrees below it.
    ///
    /// ```text
    ///     ┌── 12
    /// ┌── 10
    /// 5
    /// └── 2
    /// ```
    pub fn draw(&self) -> String {
        let mut out = String::new();
        // Writing to a `String` cannot fail.
        let _ = self.write_drawing(&mut out);
        out
    }

    /// Writes the drawing produced by [`AvlTree::draw`] to `w`, one line per node.
    pub fn write_drawing<W: fmt::Write>(&self, mut w: W) -> fmt::Result {
        match self.root {
            Some(root) => unsafe { self.write_subtree(&mut w, root, None, "") },
            None => Ok(()),
        }
    }

    unsafe fn write_subtree<W: fmt::Write>(
        &self,
        w: &mut W,
        node: NonNull<T>,
        side: Option<Dir>,
        prefix: &str,
    ) -> fmt::Result {
        let links = unsafe { T::links(node).as_ref() };

        // Subtrees between this node and its parent need a rule carrying the parent's edge.
        let (upper, connector, lower) = match side {
            None => ("", "", ""),
            Some(Dir::Left) => ("│   ", "└── ", "    "),
            Some(Dir::Right) => ("    ", "┌── ", "│   "),
        };

        if let Some(right) = links.right() {
            let prefix = format!("{prefix}{upper}");
            unsafe { self.write_subtree(w, right, Some(Dir::Right), &prefix)? };
        }

        let key = unsafe { node.as_ref() }.key();
        writeln!(w, "{prefix}{connector}{key}")?;

        if let Some(left) = links.left() {
            let prefix = format!("{prefix}{lower}");
            unsafe { self.write_subtree(w, left, Some(Dir::Left), &prefix)? };
        }

        Ok(())
    }

    /// Writes the keys in the given order on a single line, e.g.
    /// `Inorder traversal: 1, 2, 3`.
    pub fn write_traversal<W: fmt::Write>(&self, order: Order, mut w: W) -> fmt::Result {
        write!(w, "{order} traversal: ")?;

        for (i, node) in self.traversal(order).enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            write!(w, "{}", node.key())?;
        }

        Ok(())
    }

    /// Writes a Graphviz description of the tree, one rank per level, with each node labelled
    /// `key:height` and missing children drawn as points.
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, mut w: W) -> fmt::Result {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _ in 0..queue.len() {
                let node = match queue.pop_front() {
                    Some(Item::Node(node)) => node,
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let key = unsafe { node.as_ref() }.key();
                let height = unsafe { self.links(node).height() };
                write!(w, "\"graph{name}-{key}\" [label=\"{key}:{height}\"]; ")?;

                for child in unsafe { [self.links(node).left(), self.links(node).right()] } {
                    match child {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref() }.key();

                            queue.push_back(Item::Node(child));
                            writeln!(
                                links,
                                "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";"
                            )?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                links,
                                "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}
