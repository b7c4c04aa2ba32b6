//! Canonical serializer and debug dump for [`FilterNode`].
//!
//! The canonical form never quotes and never inserts spaces: leaves render
//! as `(field,op,value)`, any other list as `[a,b,...]`.

use super::ast::FilterNode;
use std::fmt::{self, Write};

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Value(Some(scalar)) => write!(f, "{}", scalar),
            FilterNode::Value(None) => Ok(()),
            _ => {
                let (open, close) = if self.looks_like_leaf() {
                    ('(', ')')
                } else {
                    ('[', ']')
                };
                f.write_char(open)?;
                for (i, child) in self.children().iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_char(close)
            }
        }
    }
}

impl FilterNode {
    /// Canonical text of this node.
    ///
    /// Leaf-shaped lists print as leaves but are not promoted, since this
    /// takes `&self`; use [`FilterNode::canonical`] to memoize as well.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Canonical text, promoting every leaf-shaped node of the tree to
    /// `Leaf` on the way. The output is the same as [`FilterNode::render`].
    pub fn canonical(&mut self) -> String {
        self.promote_leaves();
        self.to_string()
    }

    fn promote_leaves(&mut self) {
        self.is_leaf_node();
        match self {
            FilterNode::Leaf(triple) => triple.iter_mut().for_each(FilterNode::promote_leaves),
            FilterNode::List(children) => children.iter_mut().for_each(FilterNode::promote_leaves),
            FilterNode::Value(_) => {}
        }
    }

    /// Multi-line dump of the tree, one node per line.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = write_pretty(self, 0, &mut out);
        out
    }
}

fn write_pretty(node: &FilterNode, depth: usize, out: &mut String) -> fmt::Result {
    let indent = "  ".repeat(depth);
    match node {
        FilterNode::Value(Some(scalar)) => writeln!(out, "{}Value({:?})", indent, scalar),
        FilterNode::Value(None) => writeln!(out, "{}Value(empty)", indent),
        FilterNode::Leaf(_) => {
            writeln!(out, "{}Leaf", indent)?;
            node.children()
                .iter()
                .try_for_each(|child| write_pretty(child, depth + 1, out))
        }
        FilterNode::List(children) => {
            writeln!(out, "{}List({})", indent, children.len())?;
            children
                .iter()
                .try_for_each(|child| write_pretty(child, depth + 1, out))
        }
    }
}
