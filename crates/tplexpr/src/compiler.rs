//! Bytecode compiler
//!
//! Compiles template syntax trees to flat bytecode. Every node is compiled
//! by one `compile_node(node, mode)` match: expressions append a final
//! instruction in either [`Mode::Emit`] or [`Mode::Push`], while statement
//! nodes used as operands are compiled in emit mode inside a capture
//! bracket that collapses their output into one pushed value.
//!
//! Closure bodies and named templates are compiled into their own chunks so
//! their instructions never interleave with the enclosing code.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;
use tplexpr_ast::{IfBranch, IncludeTarget, Node, ObjectKey, Subprog as SubprogNode};

use crate::bytecode::{Chunk, Mode, Op, Program, StrId, Subprog, Template};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::filters::{DiscardFilter, ValueFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopJump {
    Break,
    Continue,
}

impl LoopJump {
    fn keyword(self) -> &'static str {
        match self {
            LoopJump::Break => "break",
            LoopJump::Continue => "continue",
        }
    }
}

/// Jumps recorded while compiling one loop body, patched once the loop
/// head and end are known.
#[derive(Debug)]
struct LoopFrame {
    jumps: Vec<(usize, LoopJump)>,
    filter_depth: usize,
    capture_depth: usize,
}

/// Per-chunk compilation state, swapped out while a nested chunk compiles.
#[derive(Debug, Default)]
struct ChunkState {
    chunk: Chunk,
    loops: Vec<LoopFrame>,
    filter_depth: usize,
    capture_depth: usize,
}

/// Template compiler
///
/// Accumulates top-level code, closures and named templates across any
/// number of sources, then [`finish`](Compiler::finish)es into a
/// [`Context`] ready for evaluation.
///
/// ```
/// use tplexpr::Compiler;
///
/// let mut compiler = Compiler::new();
/// compiler.parse_template("greet", "Hello $name").unwrap();
/// let mut ctx = compiler.finish();
///
/// let vars = tplexpr::VarsBuilder::new().set("name", "World").build();
/// assert_eq!(ctx.eval_template_to_string("greet", &vars).unwrap(), "Hello World");
/// ```
#[derive(Debug, Default)]
pub struct Compiler {
    state: ChunkState,
    strings: Vec<Rc<str>>,
    string_ids: HashMap<Rc<str>, StrId>,
    subprogs: Vec<Subprog>,
    templates: IndexMap<String, Template>,
    filters: Vec<Rc<dyn ValueFilter>>,
    discard: Option<u32>,
    base_filter: Option<u32>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter the output of interpolations in every body compiled from now
    /// on. Literal template text is written unfiltered.
    pub fn with_output_filter(mut self, filter: Rc<dyn ValueFilter>) -> Self {
        let idx = self.add_filter(filter);
        self.base_filter = Some(idx);
        self
    }

    /// Parse `source` and append it to the top-level code.
    pub fn parse(&mut self, source: &str) -> Result<()> {
        let node = tplexpr_parser::parse(source)?;
        self.compile(&node)
    }

    /// Append `node` to the top-level code. Nothing is kept if it fails.
    pub fn compile(&mut self, node: &Node) -> Result<()> {
        let offset = self.state.chunk.offset();
        let subprogs = self.subprogs.len();
        if let Err(err) = self.compile_body(node) {
            self.state.chunk.ops.truncate(offset);
            self.state.loops.clear();
            self.state.filter_depth = 0;
            self.state.capture_depth = 0;
            self.subprogs.truncate(subprogs);
            return Err(err);
        }
        Ok(())
    }

    /// Parse `source` and register it as template `name`.
    pub fn parse_template(&mut self, name: &str, source: &str) -> Result<()> {
        let node = tplexpr_parser::parse(source)?;
        self.compile_template(name, &node)
    }

    /// Register `node` as template `name`. Nothing is kept if it fails.
    pub fn compile_template(&mut self, name: &str, node: &Node) -> Result<()> {
        if self.templates.contains_key(name) {
            return Err(Error::TemplateExists(name.to_string()));
        }

        let subprogs = self.subprogs.len();
        let (code, result) = self.isolated(|c| c.compile_body(node));
        if let Err(err) = result {
            self.subprogs.truncate(subprogs);
            return Err(err);
        }

        debug!(template = name, ops = code.ops.len(), "template compiled");
        self.templates.insert(
            name.to_string(),
            Template {
                name: name.to_string(),
                code,
            },
        );
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Finish the session into an immutable program.
    pub fn into_program(self) -> Program {
        Program {
            code: self.state.chunk,
            strings: self.strings,
            subprogs: self.subprogs,
            templates: self.templates,
            filters: self.filters,
            output_filter: self.base_filter,
        }
    }

    /// Finish the session into a context that evaluates it.
    pub fn finish(self) -> Context {
        Context::with_program(Rc::new(self.into_program()))
    }

    /// Add a string to the string table, returning its index
    fn add_string(&mut self, text: &str) -> StrId {
        if let Some(&id) = self.string_ids.get(text) {
            return id;
        }
        let id = self.strings.len() as StrId;
        let text: Rc<str> = Rc::from(text);
        self.strings.push(Rc::clone(&text));
        self.string_ids.insert(text, id);
        id
    }

    /// Add an output filter, returning its index
    fn add_filter(&mut self, filter: Rc<dyn ValueFilter>) -> u32 {
        if let Some(idx) = self
            .filters
            .iter()
            .position(|f| std::ptr::addr_eq(Rc::as_ptr(f), Rc::as_ptr(&filter)))
        {
            return idx as u32;
        }
        let idx = self.filters.len() as u32;
        self.filters.push(filter);
        idx
    }

    fn discard_filter(&mut self) -> u32 {
        match self.discard {
            Some(idx) => idx,
            None => {
                let idx = self.add_filter(Rc::new(DiscardFilter));
                self.discard = Some(idx);
                idx
            }
        }
    }

    fn emit(&mut self, op: Op) {
        self.state.chunk.emit(op);
    }

    fn offset(&self) -> usize {
        self.state.chunk.offset()
    }

    fn patch_jump(&mut self, at: usize, target: usize) {
        self.state.chunk.patch_jump(at, target);
    }

    /// Run `f` against a fresh chunk, returning what it compiled.
    fn isolated(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> (Chunk, Result<()>) {
        let saved = std::mem::take(&mut self.state);
        let result = f(self);
        let state = std::mem::replace(&mut self.state, saved);
        (state.chunk, result)
    }

    /// Compile a template body. With an output filter installed, every
    /// top-level interpolation is bracketed by it; literal text is not.
    fn compile_body(&mut self, node: &Node) -> Result<()> {
        let Some(idx) = self.base_filter else {
            return self.compile_node(node, Mode::Emit);
        };
        let nodes = match node {
            Node::Compound(nodes) => nodes.as_slice(),
            single => std::slice::from_ref(single),
        };
        for node in nodes {
            match node {
                Node::Text(_) => self.compile_node(node, Mode::Emit)?,
                _ => self.with_filter(idx, |c| c.compile_node(node, Mode::Emit))?,
            }
        }
        Ok(())
    }

    fn with_filter(&mut self, idx: u32, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.emit(Op::PushFilter(idx));
        self.state.filter_depth += 1;
        let result = f(self);
        self.state.filter_depth -= 1;
        result?;
        self.emit(Op::PopFilter);
        Ok(())
    }

    fn compile_node(&mut self, node: &Node, mode: Mode) -> Result<()> {
        if mode == Mode::Push && node.is_statement() {
            self.emit(Op::BeginCapture);
            self.state.capture_depth += 1;
            let result = self.compile_node(node, Mode::Emit);
            self.state.capture_depth -= 1;
            result?;
            self.emit(Op::EndCapture(Mode::Push));
            return Ok(());
        }

        match node {
            Node::Text(text) => {
                let id = self.add_string(text);
                self.emit(Op::Text(mode, id));
            }

            Node::Var(name) => {
                let id = self.add_string(name);
                self.emit(Op::Fetch(mode, id));
            }

            Node::Number(text) => {
                let n = text
                    .parse::<f64>()
                    .map_err(|_| Error::InvalidNumber(text.clone()))?;
                self.emit(Op::Number(mode, n));
            }

            Node::Call { name, args } => {
                let argc = self.compile_args(args)?;
                let name = self.add_string(name);
                self.emit(Op::Call { mode, name, argc });
            }

            Node::DynCall { callee, args } => {
                self.compile_node(callee, Mode::Push)?;
                let argc = self.compile_args(args)?;
                self.emit(Op::CallDyn { mode, argc });
            }

            Node::Attr { receiver, name } => {
                self.compile_node(receiver, Mode::Push)?;
                let id = self.add_string(name);
                self.emit(Op::Attr(mode, id));
            }

            Node::Subprog(subprog) => {
                let idx = self.compile_subprog(subprog)?;
                self.emit(Op::Subprog(mode, idx));
            }

            Node::Compare { op, lhs, rhs } => {
                self.compile_node(lhs, Mode::Push)?;
                self.compile_node(rhs, Mode::Push)?;
                self.emit(Op::Compare(mode, *op));
            }

            Node::And(operands) => self.compile_logic(operands, mode, true)?,

            Node::Or(operands) => self.compile_logic(operands, mode, false)?,

            Node::Binary { first, rest } => {
                self.compile_node(first, Mode::Push)?;
                for (i, (op, operand)) in rest.iter().enumerate() {
                    self.compile_node(operand, Mode::Push)?;
                    let last = i + 1 == rest.len();
                    self.emit(Op::Binary(if last { mode } else { Mode::Push }, *op));
                }
            }

            Node::Block { name, subprog } => {
                let idx = self.compile_subprog(subprog)?;
                self.emit(Op::Subprog(Mode::Push, idx));
                let id = self.add_string(name);
                self.emit(Op::Declare(id));
            }

            Node::If {
                branches,
                else_body,
            } => self.compile_if(branches, else_body.as_deref(), mode)?,

            Node::Declare { name, value } => {
                self.compile_node(value, Mode::Push)?;
                let id = self.add_string(name);
                self.emit(Op::Declare(id));
            }

            Node::Assign { name, value } => {
                self.compile_node(value, Mode::Push)?;
                let id = self.add_string(name);
                self.emit(Op::Assign(id));
            }

            Node::For {
                var,
                iterable,
                body,
            } => self.compile_for(var, iterable, body)?,

            Node::Include(IncludeTarget::Static(name)) => {
                let id = self.add_string(name);
                self.emit(Op::Include(id));
            }

            Node::Include(IncludeTarget::Dynamic(target)) => {
                self.compile_node(target, Mode::Push)?;
                self.emit(Op::IncludeDyn);
            }

            Node::Discard(body) => {
                let idx = self.discard_filter();
                self.with_filter(idx, |c| c.compile_node(body, mode))?;
            }

            Node::Object { base, keys } => self.compile_object(base.as_deref(), keys, mode)?,

            Node::Compound(nodes) => {
                for node in nodes {
                    self.compile_node(node, mode)?;
                }
            }

            Node::Break => self.compile_loop_jump(LoopJump::Break)?,

            Node::Continue => self.compile_loop_jump(LoopJump::Continue)?,
        }
        Ok(())
    }

    fn compile_args(&mut self, args: &[Node]) -> Result<u16> {
        for arg in args {
            self.compile_node(arg, Mode::Push)?;
        }
        u16::try_from(args.len())
            .map_err(|_| Error::host(format!("call with {} arguments", args.len())))
    }

    fn compile_subprog(&mut self, subprog: &SubprogNode) -> Result<u32> {
        let (code, result) = self.isolated(|c| c.compile_body(&subprog.body));
        result?;
        let idx = self.subprogs.len() as u32;
        self.subprogs.push(Subprog {
            params: subprog.params.clone(),
            code,
        });
        Ok(idx)
    }

    /// Short-circuit `&&` / `||`: every operand but the last jumps to the
    /// end with its value still on the stack, otherwise it is discarded.
    fn compile_logic(&mut self, operands: &[Node], mode: Mode, and: bool) -> Result<()> {
        let mut exits = Vec::with_capacity(operands.len());
        for (i, operand) in operands.iter().enumerate() {
            self.compile_node(operand, Mode::Push)?;
            if i + 1 < operands.len() {
                exits.push(self.offset());
                self.emit(if and {
                    Op::JumpIfFalse(0)
                } else {
                    Op::JumpIfTrue(0)
                });
                self.emit(Op::Discard);
            }
        }

        let end = self.offset();
        for at in exits {
            self.patch_jump(at, end);
        }
        if mode == Mode::Emit {
            self.emit(Op::EmitPop);
        }
        Ok(())
    }

    /// ```text
    ///       cond0; jump-if-false L1; discard; body0; jump END
    /// L1:   discard; cond1; jump-if-false L2; discard; body1; jump END
    /// L2:   discard; else-body
    /// END:
    /// ```
    fn compile_if(
        &mut self,
        branches: &[IfBranch],
        else_body: Option<&Node>,
        mode: Mode,
    ) -> Result<()> {
        let mut exits = Vec::with_capacity(branches.len());
        for branch in branches {
            self.compile_node(&branch.cond, Mode::Push)?;
            let skip = self.offset();
            self.emit(Op::JumpIfFalse(0));
            self.emit(Op::Discard);
            self.compile_node(&branch.body, mode)?;
            exits.push(self.offset());
            self.emit(Op::Jump(0));

            let next = self.offset();
            self.patch_jump(skip, next);
            self.emit(Op::Discard);
        }

        if let Some(else_body) = else_body {
            self.compile_node(else_body, mode)?;
        }

        let end = self.offset();
        for at in exits {
            self.patch_jump(at, end);
        }
        Ok(())
    }

    /// ```text
    ///       iterable; push-iter; begin-scope; declare var
    /// HEAD: iter-next-or-jump var END
    ///       body
    ///       jump HEAD
    /// END:  end-scope; pop-iter
    /// ```
    fn compile_for(&mut self, var: &str, iterable: &Node, body: &Node) -> Result<()> {
        self.compile_node(iterable, Mode::Push)?;
        self.emit(Op::PushIter);
        self.emit(Op::BeginScope);

        let var = self.add_string(var);
        let empty = self.add_string("");
        self.emit(Op::Text(Mode::Push, empty));
        self.emit(Op::Declare(var));

        let head = self.offset();
        self.emit(Op::IterNextOrJump { var, offset: 0 });

        self.state.loops.push(LoopFrame {
            jumps: Vec::new(),
            filter_depth: self.state.filter_depth,
            capture_depth: self.state.capture_depth,
        });
        let result = self.compile_node(body, Mode::Emit);
        let frame = self.state.loops.pop();
        result?;

        self.emit(Op::Jump(Chunk::jump_offset(self.offset(), head)));
        let end = self.offset();
        self.patch_jump(head, end);
        for (at, jump) in frame.map(|f| f.jumps).unwrap_or_default() {
            let target = match jump {
                LoopJump::Break => end,
                LoopJump::Continue => head,
            };
            self.patch_jump(at, target);
        }

        self.emit(Op::EndScope);
        self.emit(Op::PopIter);
        Ok(())
    }

    /// `break` / `continue` must sit in emit position of a loop body; any
    /// output filters opened since the loop began are closed before jumping.
    fn compile_loop_jump(&mut self, jump: LoopJump) -> Result<()> {
        let Some(frame) = self.state.loops.last() else {
            return Err(Error::LoopControl(jump.keyword()));
        };
        if frame.capture_depth != self.state.capture_depth {
            return Err(Error::LoopControl(jump.keyword()));
        }

        for _ in frame.filter_depth..self.state.filter_depth {
            self.emit(Op::PopFilter);
        }
        let at = self.offset();
        self.emit(Op::Jump(0));
        if let Some(frame) = self.state.loops.last_mut() {
            frame.jumps.push((at, jump));
        }
        Ok(())
    }

    fn compile_object(&mut self, base: Option<&Node>, keys: &[ObjectKey], mode: Mode) -> Result<()> {
        match base {
            Some(base) => {
                self.compile_node(base, Mode::Push)?;
                self.emit(Op::ExtendObject);
            }
            None => self.emit(Op::PushObject),
        }

        for key in keys {
            self.compile_node(&key.value, Mode::Push)?;
            let id = self.add_string(&key.key);
            self.emit(Op::AssignKey(id));
        }

        if mode == Mode::Emit {
            self.emit(Op::EmitPop);
        }
        Ok(())
    }
}
