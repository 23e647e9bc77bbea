//! Evaluation context
//!
//! A [`Context`] owns the variable bindings, the scope bookkeeping and the
//! per-evaluation stacks (iterators, output filters) of one evaluation. It
//! holds the compiled [`Program`] behind an `Rc` so closures and cloned
//! contexts share it.
//!
//! Scopes are recorded as a list of shadowed bindings. `declare` remembers
//! what a name was bound to before; closing a scope restores those bindings
//! newest-first. `assign` rebinds without a shadow record, so it survives
//! the scope it was made in.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::builder::Vars;
use crate::bytecode::Program;
use crate::error::{Error, Result};
use crate::executor;
use crate::filters::ValueFilter;
use crate::value::{IterRef, Value};
use crate::writer::{IoWriter, StringWriter, ValueWriter};

/// Hook consulted when a name or template cannot be resolved.
pub type LookupHook = dyn Fn(&str) -> Result<Value>;

/// Variable bindings, scopes and hooks for evaluating a [`Program`].
#[derive(Clone)]
pub struct Context {
    vars: Rc<HashMap<String, Value>>,
    shadowed: Vec<(String, Option<Value>)>,
    scope: usize,
    prev_scopes: Vec<usize>,
    pub(crate) iters: Vec<IterRef>,
    pub(crate) filters: Vec<Rc<dyn ValueFilter>>,
    program: Rc<Program>,
    name_error: Option<Rc<LookupHook>>,
    template_not_found: Option<Rc<LookupHook>>,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::with_program(Rc::new(Program::default()))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("vars", &self.vars.len())
            .field("scopes", &self.prev_scopes.len())
            .field("templates", &self.program.templates.len())
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// An empty context with no program.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: Rc<Program>) -> Self {
        Self {
            vars: Rc::default(),
            shadowed: Vec::new(),
            scope: 0,
            prev_scopes: Vec::new(),
            iters: Vec::new(),
            filters: Vec::new(),
            program,
            name_error: None,
            template_not_found: None,
            deadline: None,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub(crate) fn program_rc(&self) -> &Rc<Program> {
        &self.program
    }

    /// Snapshot for a closure: shares bindings, program, hooks and
    /// deadline, but starts with empty scope and evaluation stacks.
    pub(crate) fn capture(&self) -> Context {
        Context {
            vars: Rc::clone(&self.vars),
            shadowed: Vec::new(),
            scope: 0,
            prev_scopes: Vec::new(),
            iters: Vec::new(),
            filters: Vec::new(),
            program: Rc::clone(&self.program),
            name_error: self.name_error.clone(),
            template_not_found: self.template_not_found.clone(),
            deadline: self.deadline,
        }
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    /// Bind `name` in the current scope. The previous binding comes back
    /// when the scope ends.
    pub fn declare(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let previous = Rc::make_mut(&mut self.vars).insert(name.clone(), value.into());
        self.shadowed.push((name, previous));
        self.scope += 1;
    }

    /// Rebind `name` without recording the previous binding.
    pub fn assign(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        Rc::make_mut(&mut self.vars).insert(name.into(), value.into());
    }

    /// Current binding of `name`, if any.
    pub fn try_lookup(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    /// Current binding of `name`, falling back to the name-error hook.
    pub fn lookup(&self, name: &str) -> Result<Value> {
        match self.vars.get(name) {
            Some(value) => Ok(value.clone()),
            None => self.name_error(name),
        }
    }

    pub(crate) fn name_error(&self, name: &str) -> Result<Value> {
        match &self.name_error {
            Some(hook) => hook(name),
            None => Ok(Value::Nil),
        }
    }

    /// `None` when no hook is installed: the include writes nothing.
    pub(crate) fn template_not_found(&self, name: &str) -> Result<Option<Value>> {
        match &self.template_not_found {
            Some(hook) => hook(name).map(Some),
            None => {
                warn!(template = name, "included template not found");
                Ok(None)
            }
        }
    }

    pub fn begin_scope(&mut self) {
        self.prev_scopes.push(self.scope);
        self.scope = 0;
    }

    /// Close the innermost scope. Without an open scope this does nothing.
    pub fn end_scope(&mut self) {
        let Some(prev) = self.prev_scopes.pop() else {
            return;
        };
        let vars = Rc::make_mut(&mut self.vars);
        for _ in 0..self.scope {
            let Some((name, previous)) = self.shadowed.pop() else {
                break;
            };
            match previous {
                Some(value) => vars.insert(name, value),
                None => vars.remove(&name),
            };
        }
        self.scope = prev;
    }

    /// Open a scope that ends when the guard drops.
    pub fn scoped(&mut self) -> Scope<'_> {
        self.begin_scope();
        Scope { ctx: self }
    }

    pub(crate) fn push_filter(&mut self, filter: Rc<dyn ValueFilter>) {
        self.filters.push(filter);
    }

    // =========================================================================
    // Hooks and limits
    // =========================================================================

    /// Resolve undefined names through `hook` instead of yielding nil.
    ///
    /// Returning an error from the hook aborts the evaluation.
    pub fn set_name_error(&mut self, hook: impl Fn(&str) -> Result<Value> + 'static) {
        self.name_error = Some(Rc::new(hook));
    }

    /// Resolve includes of unknown templates through `hook`; its value is
    /// written in place of the template.
    pub fn set_template_not_found(&mut self, hook: impl Fn(&str) -> Result<Value> + 'static) {
        self.template_not_found = Some(Rc::new(hook));
    }

    /// Abort evaluations that run past `deadline`.
    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    pub fn clear_deadline(&mut self) {
        self.deadline = None;
    }

    pub fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluate the top-level code into a string.
    pub fn eval_to_string(&mut self) -> Result<String> {
        let mut out = StringWriter::new();
        self.eval(&mut out)?;
        Ok(out.into_string())
    }

    /// Evaluate the top-level code into `w`.
    pub fn eval_to_writer(&mut self, w: impl io::Write) -> Result<()> {
        self.eval(&mut IoWriter::new(w))
    }

    /// Evaluate the top-level code, writing each produced value to `out`.
    pub fn eval(&mut self, out: &mut dyn ValueWriter) -> Result<()> {
        let program = Rc::clone(&self.program);
        executor::eval(self, &program.code.ops, out)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.program.templates.contains_key(name)
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.program.templates.keys().map(String::as_str)
    }

    /// Render template `name` with `vars` declared in a fresh scope.
    pub fn eval_template_to_string(&mut self, name: &str, vars: &Vars) -> Result<String> {
        let mut out = StringWriter::new();
        self.eval_template(name, vars, &mut out)?;
        Ok(out.into_string())
    }

    pub fn eval_template_to_writer(
        &mut self,
        name: &str,
        vars: &Vars,
        w: impl io::Write,
    ) -> Result<()> {
        self.eval_template(name, vars, &mut IoWriter::new(w))
    }

    pub fn eval_template(
        &mut self,
        name: &str,
        vars: &Vars,
        out: &mut dyn ValueWriter,
    ) -> Result<()> {
        let program = Rc::clone(&self.program);
        let template = program
            .template(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;
        debug!(template = name, vars = vars.len(), "evaluating template");

        let mut scope = self.scoped();
        for (key, value) in vars {
            scope.declare(key.clone(), value.clone());
        }
        executor::eval(&mut scope, &template.code.ops, out)
    }
}

/// A scope opened by [`Context::scoped`]; closes itself when dropped.
pub struct Scope<'a> {
    ctx: &'a mut Context,
}

impl Deref for Scope<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.ctx.end_scope();
    }
}
