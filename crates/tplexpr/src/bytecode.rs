//! Bytecode instruction set
//!
//! Flat instruction encoding for the stack machine. Most value-producing
//! instructions carry a [`Mode`]: in [`Mode::Emit`] the result goes straight
//! to the output, in [`Mode::Push`] it is left on the operand stack. This
//! lets one compiled expression serve both as a statement and as an operand.
//!
//! Jump offsets are relative to the instruction *after* the jump.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;
use tplexpr_ast::{BinaryOp, CompareOp};

use crate::filters::ValueFilter;

/// Index into the program's string table
pub type StrId = u32;

/// Where an instruction delivers its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    /// Write the result to the current output
    Emit,
    /// Push the result onto the operand stack
    Push,
}

/// Bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Op {
    // === Literals and loads ===
    /// Literal text (index into string table)
    Text(Mode, StrId),

    /// Number literal
    Number(Mode, f64),

    /// Variable lookup; undefined names go through the name-error hook
    Fetch(Mode, StrId),

    /// Attribute of the popped receiver
    Attr(Mode, StrId),

    /// Build a closure over the current context (index into sub-programs)
    Subprog(Mode, u32),

    // === Calls ===
    /// Call a named value with `argc` popped arguments
    Call { mode: Mode, name: StrId, argc: u16 },

    /// Call a popped value with `argc` popped arguments (callee below args)
    CallDyn { mode: Mode, argc: u16 },

    // === Operators ===
    /// Compare the top two values (pop b, pop a, produce a op b)
    Compare(Mode, CompareOp),

    /// Arithmetic on the top two values (pop b, pop a, produce a op b)
    Binary(Mode, BinaryOp),

    // === Control flow ===
    /// Jump unconditionally
    Jump(i32),

    /// Jump if the top of stack is truthy (does not pop)
    JumpIfTrue(i32),

    /// Jump if the top of stack is falsy (does not pop)
    JumpIfFalse(i32),

    // === Stack ===
    /// Pop and emit
    EmitPop,

    /// Pop and drop
    Discard,

    // === Bindings ===
    /// Pop and bind in the current scope, remembering the shadowed binding
    Declare(StrId),

    /// Pop and rebind without a shadow record
    Assign(StrId),

    /// Open a scope
    BeginScope,

    /// Close the innermost scope, restoring shadowed bindings
    EndScope,

    // === Iteration ===
    /// Pop a value and push its iterator on the iterator stack
    PushIter,

    /// Assign the next value of the innermost iterator to `var`, or jump
    /// when it is exhausted
    IterNextOrJump { var: StrId, offset: i32 },

    /// Drop the innermost iterator
    PopIter,

    // === Output ===
    /// Activate an output filter (index into filter table)
    PushFilter(u32),

    /// Deactivate the innermost output filter
    PopFilter,

    /// Redirect output into a collector
    BeginCapture,

    /// Close the innermost collector and deliver its collapsed value
    EndCapture(Mode),

    // === Templates ===
    /// Evaluate a named template in place
    Include(StrId),

    /// Evaluate the template named by the popped value in place
    IncludeDyn,

    // === Objects ===
    /// Push an empty object
    PushObject,

    /// Pop a value and push it back as an object to extend
    ExtendObject,

    /// Pop a value and set it as key `name` of the object on top of the stack
    AssignKey(StrId),
}

/// A compiled instruction sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Chunk {
    /// The instruction sequence
    pub ops: Vec<Op>,
}

impl Chunk {
    /// Create a new, empty chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an instruction
    pub fn emit(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// Current instruction offset (for jump patching)
    pub fn offset(&self) -> usize {
        self.ops.len()
    }

    /// Offset of a jump at `at` that lands on `target`.
    pub fn jump_offset(at: usize, target: usize) -> i32 {
        target as i32 - at as i32 - 1
    }

    /// Point the jump instruction at `at` to `target`.
    ///
    /// Non-jump instructions are left untouched.
    pub fn patch_jump(&mut self, at: usize, target: usize) {
        let offset = Self::jump_offset(at, target);
        match self.ops.get_mut(at) {
            Some(Op::Jump(o) | Op::JumpIfTrue(o) | Op::JumpIfFalse(o)) => *o = offset,
            Some(Op::IterNextOrJump { offset: o, .. }) => *o = offset,
            _ => debug_assert!(false, "patched a non-jump instruction at {at}"),
        }
    }
}

/// A compiled closure body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subprog {
    pub params: Vec<String>,
    pub code: Chunk,
}

/// A named, includable template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub name: String,
    pub code: Chunk,
}

/// Everything one compile session produced.
///
/// Immutable once built; contexts and closures share it through an `Rc`.
#[derive(Debug, Default, Serialize)]
pub struct Program {
    /// Top-level code
    pub code: Chunk,

    /// Literal text and names
    pub strings: Vec<Rc<str>>,

    /// Closure bodies
    pub subprogs: Vec<Subprog>,

    /// Named templates
    pub templates: IndexMap<String, Template>,

    /// Output filters referenced by `PushFilter`
    #[serde(skip)]
    pub filters: Vec<Rc<dyn ValueFilter>>,

    /// Index of the host output filter, which callees do not inherit
    pub output_filter: Option<u32>,
}

impl Program {
    /// String-table entry; out-of-range ids read as empty.
    pub fn string(&self, id: StrId) -> Rc<str> {
        self.strings
            .get(id as usize)
            .cloned()
            .unwrap_or_else(|| Rc::from(""))
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }
}
