use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::{Args, Value};
use crate::context::Context;
use crate::error::Result;
use crate::executor;
use crate::filters::ValueFilter;
use crate::writer::{ReturnValue, ValueWriter};

/// Signature of a native function value.
pub type NativeFn = dyn Fn(&Args<'_>) -> Result<Value>;

/// A callable value: either host code or a compiled closure.
#[derive(Clone)]
pub enum Function {
    Native(Rc<NativeFn>),
    Closure(Rc<Closure>),
}

impl Function {
    /// Call the function and collapse everything it writes into one value.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Function::Native(f) => f(&Args::new(args)),
            Function::Closure(closure) => {
                let mut ret = ReturnValue::default();
                closure.invoke(args, None, false, &mut ret)?;
                Ok(ret.finish())
            }
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Native(a), Function::Native(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (Function::Closure(a), Function::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native(_) => f.write_str("<native>"),
            Function::Closure(closure) => write!(f, "<subprog {}>", closure.index),
        }
    }
}

/// A compiled sub-program bound to the environment it was created in.
///
/// The environment is a snapshot of the defining context's bindings taken
/// when the closure value is built. Each call starts from that snapshot, so
/// bindings made while the body runs never outlive the call.
pub struct Closure {
    index: usize,
    env: Context,
}

impl Closure {
    pub(crate) fn new(index: usize, env: Context) -> Self {
        Self { index, env }
    }

    /// Index of the sub-program in the program's sub-program table.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn params(&self) -> &[String] {
        self.env
            .program()
            .subprogs
            .get(self.index)
            .map_or(&[], |subprog| subprog.params.as_slice())
    }

    /// Run the body with `args` bound to the parameters, writing each
    /// produced value to `out`. Missing arguments bind as nil.
    ///
    /// `filter` seeds the body's output-filter stack. `escape` enables the
    /// host output filter inside the body.
    pub(crate) fn invoke(
        &self,
        args: &[Value],
        filter: Option<Rc<dyn ValueFilter>>,
        escape: bool,
        out: &mut dyn ValueWriter,
    ) -> Result<()> {
        let program = Rc::clone(self.env.program_rc());
        let Some(subprog) = program.subprogs.get(self.index) else {
            return Ok(());
        };
        trace!(subprog = self.index, argc = args.len(), "closure call");

        let mut env = self.env.clone();
        if let Some(filter) = filter {
            env.push_filter(filter);
        }
        let mut scope = env.scoped();
        for (i, param) in subprog.params.iter().enumerate() {
            scope.declare(param.clone(), args.get(i).cloned().unwrap_or_default());
        }
        executor::eval_body(&mut scope, &subprog.code.ops, out, escape)
    }
}
