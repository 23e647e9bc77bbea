//! Syntax tree walking.
//!
//! A single pre-order `walk_node` function with a closure visitor, in place
//! of a visitor trait. Closure bodies (string literals inside `=>`, block
//! bodies) are walked like any other child.
//!
//! # Examples
//!
//! ```
//! use tplexpr_ast::{walk::walk_node, Node};
//!
//! let tree = Node::Compound(vec![Node::Var("a".into()), Node::Var("b".into())]);
//! let mut vars = Vec::new();
//! walk_node(&tree, &mut |node| {
//!     if let Node::Var(name) = node {
//!         vars.push(name.clone());
//!     }
//! });
//! assert_eq!(vars, ["a", "b"]);
//! ```

use crate::{IncludeTarget, Node};

/// Walk `node` in pre-order, calling `visitor` for every node.
pub fn walk_node<V>(node: &Node, visitor: &mut V)
where
    V: FnMut(&Node),
{
    visitor(node);

    match node {
        Node::Text(_)
        | Node::Var(_)
        | Node::Number(_)
        | Node::Include(IncludeTarget::Static(_))
        | Node::Break
        | Node::Continue => {}

        Node::Call { args, .. } => {
            for arg in args {
                walk_node(arg, visitor);
            }
        }
        Node::DynCall { callee, args } => {
            walk_node(callee, visitor);
            for arg in args {
                walk_node(arg, visitor);
            }
        }
        Node::Attr { receiver, .. } => walk_node(receiver, visitor),
        Node::Subprog(subprog) | Node::Block { subprog, .. } => walk_node(&subprog.body, visitor),
        Node::Compare { lhs, rhs, .. } => {
            walk_node(lhs, visitor);
            walk_node(rhs, visitor);
        }
        Node::And(nodes) | Node::Or(nodes) | Node::Compound(nodes) => {
            for n in nodes {
                walk_node(n, visitor);
            }
        }
        Node::Binary { first, rest } => {
            walk_node(first, visitor);
            for (_, n) in rest {
                walk_node(n, visitor);
            }
        }
        Node::If {
            branches,
            else_body,
        } => {
            for branch in branches {
                walk_node(&branch.cond, visitor);
                walk_node(&branch.body, visitor);
            }
            if let Some(body) = else_body {
                walk_node(body, visitor);
            }
        }
        Node::Declare { value, .. } | Node::Assign { value, .. } => walk_node(value, visitor),
        Node::For { iterable, body, .. } => {
            walk_node(iterable, visitor);
            walk_node(body, visitor);
        }
        Node::Include(IncludeTarget::Dynamic(name)) => walk_node(name, visitor),
        Node::Discard(body) => walk_node(body, visitor),
        Node::Object { base, keys } => {
            if let Some(base) = base {
                walk_node(base, visitor);
            }
            for key in keys {
                walk_node(&key.value, visitor);
            }
        }
    }
}

/// Names of all templates included by a statically known name.
pub fn static_includes(node: &Node) -> Vec<String> {
    let mut names = Vec::new();
    walk_node(node, &mut |n| {
        if let Node::Include(IncludeTarget::Static(name)) = n {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    });
    names
}
