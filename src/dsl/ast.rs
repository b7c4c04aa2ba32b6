//! AST types for filter domains.
//!
//! A [`FilterNode`] is a bare scalar, a `(field, operator, value)` leaf or an
//! ordered list of nodes. Boolean composition uses prefix notation:
//! `[&, (a,=,1), (b,=,2)]`.

use serde::Serialize;
use std::fmt;
use std::ops::{Bound, RangeBounds};

/// Comparison operators accepted as the middle element of a leaf.
pub const COMPARISON_OPERATORS: &[&str] = &[
    "=",
    "!=",
    "<=",
    "<",
    ">",
    ">=",
    "=?",
    "=like",
    "=ilike",
    "like",
    "not like",
    "ilike",
    "not ilike",
    "in",
    "not in",
    "child_of",
    "inselect",
    "not inselect",
    "=LIKE",
    "=ILIKE",
    "LIKE",
    "NOT LIKE",
    "ILIKE",
    "NOT ILIKE",
    "IN",
    "NOT IN",
    "CHILD_OF",
];

pub const NOT_OPERATOR: &str = "!";
pub const OR_OPERATOR: &str = "|";
pub const AND_OPERATOR: &str = "&";

/// Prefix boolean operators.
pub const BOOLEAN_OPERATORS: &[&str] = &[NOT_OPERATOR, OR_OPERATOR, AND_OPERATOR];

pub fn is_comparison_operator(text: &str) -> bool {
    COMPARISON_OPERATORS.contains(&text)
}

pub fn is_boolean_operator(text: &str) -> bool {
    BOOLEAN_OPERATORS.contains(&text)
}

/// A scalar carried by a [`FilterNode::Value`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(n) => write!(f, "{}", n),
        }
    }
}

/// Anything that can be pushed into a node: a scalar or a whole sub-tree.
///
/// The distinction matters for shape coercion: a scalar pushed into an empty
/// `Value` fills it, a node always forces `List` shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Scalar(Scalar),
    Node(FilterNode),
}

impl Item {
    pub fn into_node(self) -> FilterNode {
        match self {
            Item::Scalar(s) => FilterNode::Value(Some(s)),
            Item::Node(node) => node,
        }
    }
}

impl From<Scalar> for Item {
    fn from(value: Scalar) -> Self {
        Item::Scalar(value)
    }
}

impl From<FilterNode> for Item {
    fn from(value: FilterNode) -> Self {
        Item::Node(value)
    }
}

macro_rules! impl_scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(value.into())
                }
            }

            impl From<$ty> for Item {
                fn from(value: $ty) -> Self {
                    Item::Scalar(value.into())
                }
            }
        )*
    };
}

impl_scalar_from! {
    &str => Str,
    String => Str,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
}

/// Shape of a node as reported by [`FilterNode::node_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Value,
    Leaf,
    List,
}

/// A node of a filter domain.
///
/// `Leaf` is a memoized classification of a 3-child `List`; see
/// [`FilterNode::is_leaf_node`]. Every child is owned by its parent, and
/// `Clone` is a deep copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterNode {
    Value(Option<Scalar>),
    Leaf(Box<[FilterNode; 3]>),
    List(Vec<FilterNode>),
}

impl Default for FilterNode {
    fn default() -> Self {
        FilterNode::Value(None)
    }
}

impl FilterNode {
    /// An empty `Value` node.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(scalar: impl Into<Scalar>) -> Self {
        FilterNode::Value(Some(scalar.into()))
    }

    /// Build a node from items.
    ///
    /// No items yields an empty `Value`, a single node item is returned as-is,
    /// anything else becomes a `List` with one child per item.
    pub fn from_items<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        let mut items: Vec<Item> = items.into_iter().map(Into::into).collect();
        match items.len() {
            0 => FilterNode::default(),
            1 if matches!(items[0], Item::Node(_)) => items.remove(0).into_node(),
            _ => FilterNode::List(items.into_iter().map(Item::into_node).collect()),
        }
    }

    /// Build a `(field, operator, value)` triple, promoted to `Leaf` when
    /// `operator` is a recognized comparison operator.
    pub fn leaf(field: impl Into<Item>, operator: &str, value: impl Into<Item>) -> Self {
        let mut node = FilterNode::List(vec![
            field.into().into_node(),
            FilterNode::value(operator),
            value.into().into_node(),
        ]);
        node.is_leaf_node();
        node
    }

    pub fn children(&self) -> &[FilterNode] {
        match self {
            FilterNode::Value(_) => &[],
            FilterNode::Leaf(triple) => &triple[..],
            FilterNode::List(children) => children,
        }
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        match self {
            FilterNode::Value(scalar) => scalar.as_ref(),
            _ => None,
        }
    }

    pub fn count(&self) -> usize {
        self.children().len()
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            FilterNode::Value(_) => NodeType::Value,
            FilterNode::Leaf(_) => NodeType::Leaf,
            FilterNode::List(_) => NodeType::List,
        }
    }

    pub fn is_value_node(&self) -> bool {
        matches!(self, FilterNode::Value(_))
    }

    pub fn is_list_node(&self) -> bool {
        matches!(self, FilterNode::List(_))
    }

    /// Classify this node as a leaf, promoting a qualifying 3-child `List` to
    /// the `Leaf` variant. The promotion sticks for later calls.
    pub fn is_leaf_node(&mut self) -> bool {
        if let FilterNode::List(children) = self
            && is_leaf_shaped(children)
        {
            let children = std::mem::take(children);
            *self = match <[FilterNode; 3]>::try_from(children) {
                Ok(triple) => FilterNode::Leaf(Box::new(triple)),
                Err(children) => FilterNode::List(children),
            };
        }
        matches!(self, FilterNode::Leaf(_))
    }

    /// Leaf classification without promotion.
    pub fn looks_like_leaf(&self) -> bool {
        match self {
            FilterNode::Leaf(_) => true,
            FilterNode::List(children) => is_leaf_shaped(children),
            FilterNode::Value(_) => false,
        }
    }

    /// True for a `Value` without scalar and for a `List` without children.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterNode::Value(scalar) => scalar.is_none(),
            FilterNode::List(children) => children.is_empty(),
            FilterNode::Leaf(_) => false,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, FilterNode::Value(Some(Scalar::Str(_))))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, FilterNode::Value(Some(Scalar::Int(_))))
    }

    pub fn get(&self, idx: usize) -> Option<&FilterNode> {
        self.children().get(idx)
    }

    /// The child at `idx`. Out of range is fatal.
    #[track_caller]
    pub fn child(&self, idx: usize) -> &FilterNode {
        match self.children().get(idx) {
            Some(child) => child,
            None => fatal(
                self,
                format!("child index {} out of range for {} children", idx, self.count()),
            ),
        }
    }

    /// Positional `(field, operator, value)` access. Fatal unless the node
    /// classifies as a leaf.
    #[track_caller]
    pub fn leaf_parts(&self) -> (&FilterNode, &FilterNode, &FilterNode) {
        if !self.looks_like_leaf() {
            fatal(self, format!("{:?} node is not a leaf", self.node_type()));
        }
        let children = self.children();
        (&children[0], &children[1], &children[2])
    }

    /// Canonical text of the child at `idx`.
    ///
    /// An empty node renders as `""` for any index; otherwise an index past
    /// `count()` is fatal.
    #[track_caller]
    pub fn render_child(&self, idx: usize) -> String {
        if self.is_empty() {
            return String::new();
        }
        self.child(idx).render()
    }

    /// Rendered text of the children selected by `range`.
    #[track_caller]
    pub fn strings<R: RangeBounds<usize>>(&self, range: R) -> Vec<String> {
        let children = self.children();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => children.len(),
        };
        if start > end || end > children.len() {
            fatal(
                self,
                format!(
                    "child range {}..{} out of range for {} children",
                    start,
                    end,
                    children.len()
                ),
            );
        }
        children[start..end].iter().map(FilterNode::render).collect()
    }

    /// Scalars one level below this node. A child with children of its own
    /// contributes its children's scalars instead of itself.
    pub fn flatten(&self) -> Vec<Scalar> {
        let mut out = Vec::new();
        for child in self.children() {
            if child.count() > 0 {
                out.extend(child.children().iter().filter_map(|c| c.scalar().cloned()));
            } else if let Some(scalar) = child.scalar() {
                out.push(scalar.clone());
            }
        }
        out
    }

    /// True if the rendered text matches a scalar candidate, or the scalar
    /// matches a node candidate's scalar.
    pub fn value_in<I, T>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        let rendered = self.render();
        candidates.into_iter().any(|candidate| match candidate.into() {
            Item::Scalar(s) => s.to_string() == rendered,
            Item::Node(node) => self.scalar().is_some() && self.scalar() == node.scalar(),
        })
    }

    /// Copy with the children in reverse order.
    pub fn reversed(&self) -> FilterNode {
        match self {
            FilterNode::Value(_) => self.clone(),
            _ => FilterNode::List(self.children().iter().rev().cloned().collect()),
        }
    }

    /// Leaves in depth-first order.
    pub fn leaves(&self) -> Vec<&FilterNode> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    pub fn push(&mut self, item: impl Into<Item>) -> &mut Self {
        match item.into() {
            Item::Scalar(s) if matches!(self, FilterNode::Value(None)) => {
                *self = FilterNode::Value(Some(s));
            }
            item => self.list_mut().push(item.into_node()),
        }
        self
    }

    pub fn push_all<I, T>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        for item in items {
            self.push(item);
        }
        self
    }

    /// Insert `item` at `idx`, shifting later children right. Requires
    /// `idx <= count()`.
    #[track_caller]
    pub fn insert(&mut self, idx: usize, item: impl Into<Item>) -> &mut Self {
        let count = self.count();
        if idx > count {
            fatal(
                self,
                format!("insert index {} out of range for {} children", idx, count),
            );
        }
        match item.into() {
            Item::Scalar(s) if matches!(self, FilterNode::Value(None)) => {
                *self = FilterNode::Value(Some(s));
            }
            item => self.list_mut().insert(idx, item.into_node()),
        }
        self
    }

    /// Splice `other`'s children into this node. `other` is consumed.
    pub fn merge(&mut self, other: FilterNode) -> &mut Self {
        let children = other.into_children();
        self.list_mut().extend(children);
        self
    }

    #[track_caller]
    pub fn remove(&mut self, idx: usize) -> &mut Self {
        if self.is_value_node() {
            return self;
        }
        let count = self.count();
        if idx >= count {
            fatal(
                self,
                format!("remove index {} out of range for {} children", idx, count),
            );
        }
        self.list_mut().remove(idx);
        self
    }

    /// Combine `node` into this node under the prefix boolean `operator`.
    pub fn op(&mut self, operator: &str, mut node: FilterNode) -> &mut Self {
        if node.is_empty() {
            return self;
        }
        if self.is_value_node() || self.is_empty() {
            *self = node;
            return self;
        }

        let prefixed = self.starts_with_boolean_operator();
        if self.is_leaf_node() || !prefixed {
            let operand = std::mem::take(self);
            let mut group = FilterNode::List(vec![FilterNode::value(operator), operand]);
            if node.is_leaf_node() {
                group.push(node);
            } else {
                group.merge(node);
            }
            *self = group;
        } else {
            self.insert(0, operator);
            if node.is_leaf_node() {
                self.push(node);
            } else {
                self.merge(node);
            }
        }
        self
    }

    pub fn and<I>(&mut self, nodes: I) -> &mut Self
    where
        I: IntoIterator<Item = FilterNode>,
    {
        for node in nodes {
            self.op(AND_OPERATOR, node);
        }
        self
    }

    pub fn or<I>(&mut self, nodes: I) -> &mut Self
    where
        I: IntoIterator<Item = FilterNode>,
    {
        for node in nodes {
            self.op(OR_OPERATOR, node);
        }
        self
    }

    /// AND a `(field, IN, [args...])` leaf into this node. Nested argument
    /// lists are flattened one level. No arguments is a no-op.
    pub fn in_values<I, T>(&mut self, field: impl Into<Item>, args: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        let args: Vec<FilterNode> = args.into_iter().map(|a| a.into().into_node()).collect();
        if args.is_empty() {
            tracing::debug!("in_values called without arguments; filter left unchanged");
            return self;
        }
        let values = FilterNode::List(args)
            .flatten()
            .into_iter()
            .map(|s| FilterNode::Value(Some(s)))
            .collect();
        let leaf = FilterNode::leaf(field, "IN", FilterNode::List(values));
        self.and([leaf])
    }

    fn starts_with_boolean_operator(&self) -> bool {
        self.children()
            .first()
            .and_then(FilterNode::scalar)
            .and_then(Scalar::as_str)
            .is_some_and(is_boolean_operator)
    }

    pub(crate) fn into_children(self) -> Vec<FilterNode> {
        match self {
            FilterNode::Value(None) => Vec::new(),
            FilterNode::Value(Some(s)) => vec![FilterNode::Value(Some(s))],
            FilterNode::Leaf(triple) => Vec::from(*triple),
            FilterNode::List(children) => children,
        }
    }

    /// Coerce to `List` shape, keeping any scalar as the first child.
    fn list_mut(&mut self) -> &mut Vec<FilterNode> {
        if !self.is_list_node() {
            let children = std::mem::take(self).into_children();
            *self = FilterNode::List(children);
        }
        let FilterNode::List(children) = self else {
            unreachable!("node was just coerced to a list");
        };
        children
    }
}

fn is_leaf_shaped(children: &[FilterNode]) -> bool {
    children.len() == 3
        && children[1]
            .scalar()
            .and_then(Scalar::as_str)
            .is_some_and(is_comparison_operator)
}

fn collect_leaves<'a>(node: &'a FilterNode, out: &mut Vec<&'a FilterNode>) {
    if node.looks_like_leaf() {
        out.push(node);
        return;
    }
    for child in node.children() {
        collect_leaves(child, out);
    }
}

/// Structural misuse: dump the tree and abort.
#[track_caller]
fn fatal(node: &FilterNode, message: String) -> ! {
    let dump = node.pretty();
    tracing::error!("{}\n{}", message, dump);
    panic!("{}\n{}", message, dump);
}
