//! Opt-in NOT distribution for prefix-notation domains.
//!
//! `!` is a pass-through token everywhere else; this pass pushes it down with
//! De Morgan's laws and folds it into leaf operators where an inverse exists.

use super::ast::{AND_OPERATOR, FilterNode, NOT_OPERATOR, OR_OPERATOR, Scalar, is_boolean_operator};

/// Comparison operators and their negation.
const OPERATOR_INVERSES: &[(&str, &str)] = &[
    ("=", "!="),
    ("!=", "="),
    ("<", ">="),
    (">=", "<"),
    (">", "<="),
    ("<=", ">"),
    ("in", "not in"),
    ("not in", "in"),
    ("like", "not like"),
    ("not like", "like"),
    ("ilike", "not ilike"),
    ("not ilike", "ilike"),
    ("inselect", "not inselect"),
    ("not inselect", "inselect"),
    ("IN", "NOT IN"),
    ("NOT IN", "IN"),
    ("LIKE", "NOT LIKE"),
    ("NOT LIKE", "LIKE"),
    ("ILIKE", "NOT ILIKE"),
    ("NOT ILIKE", "ILIKE"),
];

pub fn inverse_operator(op: &str) -> Option<&'static str> {
    OPERATOR_INVERSES
        .iter()
        .find(|(from, _)| *from == op)
        .map(|(_, to)| *to)
}

fn boolean_operator(node: &FilterNode) -> Option<&str> {
    node.scalar()
        .and_then(Scalar::as_str)
        .filter(|s| is_boolean_operator(s))
}

impl FilterNode {
    /// Return a copy with every `!` distributed over its operand.
    pub fn distribute_not(&self) -> FilterNode {
        if self.is_value_node() || self.looks_like_leaf() {
            return self.clone();
        }

        let items = self.children();
        let mut out = Vec::with_capacity(items.len());
        let mut pos = 0;
        while pos < items.len() {
            distribute(items, &mut pos, false, &mut out);
        }
        FilterNode::List(out)
    }
}

/// Emit the expression starting at `items[*pos]`, negated if `negate`.
fn distribute(items: &[FilterNode], pos: &mut usize, negate: bool, out: &mut Vec<FilterNode>) {
    let Some(item) = items.get(*pos) else {
        if negate {
            out.push(FilterNode::value(NOT_OPERATOR));
        }
        return;
    };
    *pos += 1;

    match boolean_operator(item) {
        Some(NOT_OPERATOR) => distribute(items, pos, !negate, out),
        Some(op) => {
            let op = match (negate, op) {
                (true, AND_OPERATOR) => OR_OPERATOR,
                (true, _) => AND_OPERATOR,
                (false, _) => op,
            };
            out.push(FilterNode::value(op));
            distribute(items, pos, negate, out);
            distribute(items, pos, negate, out);
        }
        None if item.looks_like_leaf() => out.extend(negate_leaf(item, negate)),
        None => {
            if negate {
                out.push(FilterNode::value(NOT_OPERATOR));
            }
            out.push(item.distribute_not());
        }
    }
}

fn negate_leaf(leaf: &FilterNode, negate: bool) -> Vec<FilterNode> {
    if !negate {
        return vec![leaf.clone()];
    }
    let (field, op, value) = leaf.leaf_parts();
    match op.scalar().and_then(Scalar::as_str).and_then(inverse_operator) {
        Some(inverse) => vec![FilterNode::leaf(field.clone(), inverse, value.clone())],
        None => vec![FilterNode::value(NOT_OPERATOR), leaf.clone()],
    }
}
