//! Node definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operators (`==`, `!=`, `>`, `>=`, `<`, `<=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Verb used in type error messages ("can not add list to string").
    pub fn verb(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "subtract",
            BinaryOp::Mul => "multiply",
            BinaryOp::Div => "divide",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closure literal: parameter names plus a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subprog {
    pub params: Vec<String>,
    pub body: Box<Node>,
}

/// One `if`/`elseif` arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfBranch {
    pub cond: Node,
    pub body: Node,
}

/// `key => value` inside an `object(...)` literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectKey {
    pub key: String,
    pub value: Node,
}

/// What an `include` refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IncludeTarget {
    /// Name known at compile time (`include("header")`)
    Static(String),
    /// Name computed at run time
    Dynamic(Box<Node>),
}

/// A template syntax tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Literal text, also every string literal without substitutions
    Text(String),

    /// Variable reference
    Var(String),

    /// Numeric literal as written in the source
    Number(String),

    /// Call of a named value: `name(args...)` or `recv.name(args...)`
    /// (the receiver becomes the first argument)
    Call { name: String, args: Vec<Node> },

    /// Call of a computed value: `(expr)(args...)`
    DynCall { callee: Box<Node>, args: Vec<Node> },

    /// Attribute access: `recv.name`
    Attr { receiver: Box<Node>, name: String },

    /// Closure literal: `(a, b) => "body"`
    Subprog(Subprog),

    /// `lhs <op> rhs`
    Compare {
        op: CompareOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },

    /// `a && b && ...`, yields the first falsy operand or the last one
    And(Vec<Node>),

    /// `a || b || ...`, yields the first truthy operand or the last one
    Or(Vec<Node>),

    /// Left-associative chain at one precedence level: `first op1 x op2 y ...`
    Binary {
        first: Box<Node>,
        rest: Vec<(BinaryOp, Node)>,
    },

    /// `block(name, params...) body endblock`, binds a closure to `name`
    Block { name: String, subprog: Subprog },

    /// `if c then ... elseif c then ... else ... endif`
    If {
        branches: Vec<IfBranch>,
        else_body: Option<Box<Node>>,
    },

    /// `declare(name, value)` or `name := value`
    Declare { name: String, value: Box<Node> },

    /// `name = value`, rebinding without a new scope entry
    Assign { name: String, value: Box<Node> },

    /// `for var in iterable do body endfor`
    For {
        var: String,
        iterable: Box<Node>,
        body: Box<Node>,
    },

    /// `include(name)`
    Include(IncludeTarget),

    /// `discard body enddiscard`
    Discard(Box<Node>),

    /// `object(k => v, ...)` or `object(base, k => v, ...)`
    Object {
        base: Option<Box<Node>>,
        keys: Vec<ObjectKey>,
    },

    /// Sequence of nodes
    Compound(Vec<Node>),

    Break,
    Continue,
}

impl Node {
    /// Short descriptive name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Node::Text(_) => "text",
            Node::Var(_) => "variable",
            Node::Number(_) => "number",
            Node::Call { .. } => "call",
            Node::DynCall { .. } => "dynamic call",
            Node::Attr { .. } => "attribute",
            Node::Subprog(_) => "closure",
            Node::Compare { .. } => "comparison",
            Node::And(_) => "and",
            Node::Or(_) => "or",
            Node::Binary { .. } => "arithmetic",
            Node::Block { .. } => "block",
            Node::If { .. } => "if",
            Node::Declare { .. } => "declare",
            Node::Assign { .. } => "assignment",
            Node::For { .. } => "for",
            Node::Include(_) => "include",
            Node::Discard(_) => "discard",
            Node::Object { .. } => "object",
            Node::Compound(_) => "sequence",
            Node::Break => "break",
            Node::Continue => "continue",
        }
    }

    /// Statements produce output (or bindings) rather than a value.
    ///
    /// The compiler wraps these in a capture when their value is needed.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Node::Block { .. }
                | Node::If { .. }
                | Node::Declare { .. }
                | Node::Assign { .. }
                | Node::For { .. }
                | Node::Include(_)
                | Node::Discard(_)
                | Node::Compound(_)
                | Node::Break
                | Node::Continue
        )
    }

    /// Collapse a parsed sequence: no nodes is empty text, one node is itself.
    pub fn sequence(mut nodes: Vec<Node>) -> Node {
        match nodes.len() {
            0 => Node::Text(String::new()),
            1 => nodes.remove(0),
            _ => Node::Compound(nodes),
        }
    }
}
