// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Syntax tree for tplexpr templates.
//!
//! The parser produces a single [`Node`] per template (a
//! [`Node::Compound`] when the template has more than one top-level
//! element). Nodes are plain data; the compiler in the `tplexpr` crate walks
//! them with one `match` and decides per node whether the result is written
//! to the output or pushed for an enclosing expression.

mod node;
pub mod walk;

pub use node::{BinaryOp, CompareOp, IfBranch, IncludeTarget, Node, ObjectKey, Subprog};
