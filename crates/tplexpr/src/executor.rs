//! Bytecode executor
//!
//! Stack-based VM that executes compiled bytecode against a [`Context`].
//!
//! Output goes to the innermost open capture, or to the writer passed in
//! when no capture is open. Before a value is written, the innermost output
//! filter is applied, but only if it was pushed after the current capture
//! began: a capture collects raw values for an enclosing expression.
//!
//! The host output filter (see `Compiler::with_output_filter`) is special.
//! It only escapes values this machine emits itself, at the outermost
//! output level, and only when no other filter is active. Included
//! templates and closures called in emit position never inherit it, so
//! their literal text is written as is.

use std::rc::Rc;

use tracing::trace;

use crate::bytecode::{Mode, Op, Program};
use crate::context::Context;
use crate::error::Result;
use crate::filters::ValueFilter;
use crate::value::{binary_op, compare, Closure, Function, ObjectRef, Value};
use crate::writer::{ReturnValue, ValueWriter};

/// Instructions executed between deadline checks
const DEADLINE_INTERVAL: u32 = 256;

/// Execute `code` with `ctx`, writing produced values to `out`.
///
/// Scopes, iterators and filters opened by `code` are closed again when
/// execution ends, whether it finished or failed.
pub(crate) fn eval(ctx: &mut Context, code: &[Op], out: &mut dyn ValueWriter) -> Result<()> {
    Machine::new(ctx, out, 0, true).run(code)
}

/// Like [`eval`], but with the host output filter disabled unless
/// `escape` is set. Used for closure bodies whose output becomes a value.
pub(crate) fn eval_body(
    ctx: &mut Context,
    code: &[Op],
    out: &mut dyn ValueWriter,
    escape: bool,
) -> Result<()> {
    Machine::new(ctx, out, 0, escape).run(code)
}

struct Capture {
    ret: ReturnValue,
    filter_depth: usize,
}

struct Machine<'a> {
    ctx: &'a mut Context,
    program: Rc<Program>,
    out: &'a mut dyn ValueWriter,
    stack: Vec<Value>,
    captures: Vec<Capture>,
    /// Filters below this depth belong to an enclosing capture
    filter_floor: usize,
    /// Whether the host output filter may activate
    escape: bool,
    scopes: usize,
    /// One entry per executed `PushFilter`: whether it pushed onto the context
    filters: Vec<bool>,
    iters: usize,
}

impl<'a> Machine<'a> {
    fn new(
        ctx: &'a mut Context,
        out: &'a mut dyn ValueWriter,
        filter_floor: usize,
        escape: bool,
    ) -> Self {
        let program = Rc::clone(ctx.program_rc());
        Self {
            ctx,
            program,
            out,
            stack: Vec::with_capacity(32),
            captures: Vec::new(),
            filter_floor,
            escape,
            scopes: 0,
            filters: Vec::new(),
            iters: 0,
        }
    }

    fn run(&mut self, code: &[Op]) -> Result<()> {
        let mut ip = 0;
        let mut steps: u32 = 0;

        while ip < code.len() {
            if steps % DEADLINE_INTERVAL == 0 {
                self.ctx.check_deadline()?;
            }
            steps = steps.wrapping_add(1);

            let op = code[ip];
            ip += 1;

            match op {
                Op::Text(mode, id) => {
                    let text = self.program.string(id);
                    self.produce(Value::String(text), mode)?;
                }

                Op::Number(mode, n) => {
                    self.produce(Value::Number(n), mode)?;
                }

                Op::Fetch(mode, id) => {
                    let name = self.program.string(id);
                    let value = self.ctx.lookup(&name)?;
                    self.produce(value, mode)?;
                }

                Op::Attr(mode, id) => {
                    let receiver = self.pop();
                    let name = self.program.string(id);
                    let value = match receiver.attr(&name) {
                        Some(value) => value,
                        None => self.ctx.name_error(&name)?,
                    };
                    self.produce(value, mode)?;
                }

                Op::Subprog(mode, idx) => {
                    let closure = Closure::new(idx as usize, self.ctx.capture());
                    self.produce(Value::Function(Function::Closure(Rc::new(closure))), mode)?;
                }

                Op::Call { mode, name, argc } => {
                    let args = self.pop_n(argc);
                    let name = self.program.string(name);
                    let callee = self.ctx.lookup(&name)?;
                    trace!(function = &*name, argc, "call");
                    self.call(&callee, &args, mode)?;
                }

                Op::CallDyn { mode, argc } => {
                    let args = self.pop_n(argc);
                    let callee = self.pop();
                    self.call(&callee, &args, mode)?;
                }

                Op::Compare(mode, op) => {
                    let b = self.pop();
                    let a = self.pop();
                    self.produce(Value::Bool(compare(&a, &b, op)), mode)?;
                }

                Op::Binary(mode, op) => {
                    let b = self.pop();
                    let a = self.pop();
                    let value = binary_op(&a, &b, op)?;
                    self.produce(value, mode)?;
                }

                Op::Jump(offset) => {
                    ip = jump(ip, offset, code.len());
                }

                Op::JumpIfTrue(offset) => {
                    if self.stack.last().is_some_and(Value::truthy) {
                        ip = jump(ip, offset, code.len());
                    }
                }

                Op::JumpIfFalse(offset) => {
                    if !self.stack.last().is_some_and(Value::truthy) {
                        ip = jump(ip, offset, code.len());
                    }
                }

                Op::EmitPop => {
                    let value = self.pop();
                    self.emit(value)?;
                }

                Op::Discard => {
                    self.stack.pop();
                }

                Op::Declare(id) => {
                    let value = self.pop();
                    self.ctx.declare(self.program.string(id).to_string(), value);
                }

                Op::Assign(id) => {
                    let value = self.pop();
                    self.ctx.assign(self.program.string(id).to_string(), value);
                }

                Op::BeginScope => {
                    self.ctx.begin_scope();
                    self.scopes += 1;
                }

                Op::EndScope => {
                    if self.scopes > 0 {
                        self.ctx.end_scope();
                        self.scopes -= 1;
                    }
                }

                Op::PushIter => {
                    let iter = self.pop().coerce_iter()?;
                    self.ctx.iters.push(iter);
                    self.iters += 1;
                }

                Op::IterNextOrJump { var, offset } => {
                    let next = match self.ctx.iters.last() {
                        Some(iter) => iter.next_value()?,
                        None => None,
                    };
                    match next {
                        Some(value) => {
                            self.ctx.assign(self.program.string(var).to_string(), value)
                        }
                        None => ip = jump(ip, offset, code.len()),
                    }
                }

                Op::PopIter => {
                    if self.iters > 0 {
                        self.ctx.iters.pop();
                        self.iters -= 1;
                    }
                }

                Op::PushFilter(idx) => {
                    if let Some(filter) = self.program.filters.get(idx as usize) {
                        let filter = Rc::clone(filter);
                        let pushed = !self.is_output_filter(&filter) || self.escaping();
                        if pushed {
                            self.ctx.push_filter(filter);
                        }
                        self.filters.push(pushed);
                    }
                }

                Op::PopFilter => {
                    if self.filters.pop() == Some(true) {
                        self.ctx.filters.pop();
                    }
                }

                Op::BeginCapture => {
                    self.captures.push(Capture {
                        ret: ReturnValue::default(),
                        filter_depth: self.ctx.filters.len(),
                    });
                }

                Op::EndCapture(mode) => {
                    if let Some(capture) = self.captures.pop() {
                        self.produce(capture.ret.finish(), mode)?;
                    }
                }

                Op::Include(id) => {
                    let name = self.program.string(id);
                    self.include(&name)?;
                }

                Op::IncludeDyn => {
                    let name = self.pop().coerce_string()?;
                    self.include(&name)?;
                }

                Op::PushObject => {
                    self.stack.push(Value::Object(ObjectRef::default()));
                }

                Op::ExtendObject => {
                    let base = self.pop().coerce_object()?;
                    self.stack.push(Value::Object(base));
                }

                Op::AssignKey(id) => {
                    let value = self.pop();
                    let name = self.program.string(id);
                    if let Some(Value::Object(object)) = self.stack.last_mut() {
                        object.set_key(&name, value)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    fn pop_n(&mut self, n: u16) -> Vec<Value> {
        let at = self.stack.len().saturating_sub(n as usize);
        self.stack.split_off(at)
    }

    fn floor(&self) -> usize {
        self.captures
            .last()
            .map_or(self.filter_floor, |capture| capture.filter_depth)
    }

    /// The innermost filter, if it applies at the current capture level.
    fn active_filter(&self) -> Option<Rc<dyn ValueFilter>> {
        if self.ctx.filters.len() > self.floor() {
            self.ctx.filters.last().cloned()
        } else {
            None
        }
    }

    fn is_output_filter(&self, filter: &Rc<dyn ValueFilter>) -> bool {
        self.program
            .output_filter
            .and_then(|idx| self.program.filters.get(idx as usize))
            .is_some_and(|host| std::ptr::addr_eq(Rc::as_ptr(host), Rc::as_ptr(filter)))
    }

    /// The host output filter activates only where output reaches the
    /// machine's writer unfiltered.
    fn escaping(&self) -> bool {
        self.escape && self.captures.is_empty() && self.active_filter().is_none()
    }

    /// The filter a callee writing to our sink inherits.
    fn inherited_filter(&self) -> Option<Rc<dyn ValueFilter>> {
        self.active_filter()
            .filter(|filter| !self.is_output_filter(filter))
    }

    fn sink(&mut self) -> &mut dyn ValueWriter {
        match self.captures.last_mut() {
            Some(capture) => &mut capture.ret,
            None => &mut *self.out,
        }
    }

    fn emit(&mut self, value: Value) -> Result<()> {
        let value = match self.active_filter() {
            Some(filter) => Value::from(filter.filter(&value.coerce_string()?)?),
            None => value,
        };
        self.sink().write_value(value)
    }

    fn produce(&mut self, value: Value, mode: Mode) -> Result<()> {
        match mode {
            Mode::Emit => self.emit(value),
            Mode::Push => {
                self.stack.push(value);
                Ok(())
            }
        }
    }

    /// Closures in emit position write straight to the current output under
    /// the inherited filter; every other call produces a single value.
    fn call(&mut self, callee: &Value, args: &[Value], mode: Mode) -> Result<()> {
        match (callee, mode) {
            (Value::Function(Function::Closure(closure)), Mode::Emit) => {
                let filter = self.inherited_filter();
                let escape = self.escape && self.captures.is_empty();
                closure.invoke(args, filter, escape, self.sink())
            }
            _ => {
                let value = callee.call(args)?;
                self.produce(value, mode)
            }
        }
    }

    /// Run a named template in place, sharing this context.
    fn include(&mut self, name: &str) -> Result<()> {
        let program = Rc::clone(&self.program);
        let Some(template) = program.template(name) else {
            return match self.ctx.template_not_found(name)? {
                Some(value) => self.emit(value),
                None => Ok(()),
            };
        };

        trace!(template = name, "include");
        let floor = match self.active_filter() {
            Some(filter) if self.is_output_filter(&filter) => self.ctx.filters.len(),
            _ => self.floor(),
        };
        let escape = self.escape && self.captures.is_empty();
        let out: &mut dyn ValueWriter = match self.captures.last_mut() {
            Some(capture) => &mut capture.ret,
            None => &mut *self.out,
        };
        Machine::new(&mut *self.ctx, out, floor, escape).run(&template.code.ops)
    }
}

impl Drop for Machine<'_> {
    fn drop(&mut self) {
        for _ in 0..self.scopes {
            self.ctx.end_scope();
        }
        let pushed = self.filters.iter().filter(|pushed| **pushed).count();
        let filters = self.ctx.filters.len().saturating_sub(pushed);
        self.ctx.filters.truncate(filters);
        let iters = self.ctx.iters.len().saturating_sub(self.iters);
        self.ctx.iters.truncate(iters);
    }
}

/// Target of a relative jump; out-of-range targets end execution.
fn jump(ip: usize, offset: i32, len: usize) -> usize {
    ip.checked_add_signed(offset as isize)
        .map_or(len, |target| target.min(len))
}
