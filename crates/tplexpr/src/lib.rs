// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! tplexpr - template expression engine
//!
//! Compiles template syntax trees to flat bytecode and evaluates it on a
//! stack machine.
//!
//! ```
//! use tplexpr::{builtins, Compiler};
//!
//! let mut compiler = Compiler::new();
//! compiler.parse("${list(1, 2, 3).join(\", \")}").unwrap();
//! let mut ctx = compiler.finish();
//! builtins::install(&mut ctx);
//! assert_eq!(ctx.eval_to_string().unwrap(), "1, 2, 3");
//! ```

pub mod builder;
pub mod builtins;
pub mod bytecode;
pub mod compiler;
pub mod context;
pub mod error;
mod executor;
pub mod filters;
pub mod value;
pub mod writer;

pub use builder::{ListBuilder, ObjectBuilder, Vars, VarsBuilder};
pub use bytecode::{Chunk, Mode, Op, Program};
pub use compiler::Compiler;
pub use context::{Context, Scope};
pub use error::{Error, Result};
pub use filters::{DiscardFilter, HtmlEscapeFilter, ValueFilter};
pub use value::{
    to_value, Args, Function, IterRef, Kind, ListIter, Object, ObjectRef, RangeIter, Value,
    ValueIter,
};
pub use writer::{IoWriter, ReturnValue, StringWriter, ValueWriter};

pub use tplexpr_ast as ast;
pub use tplexpr_parser::{parse, ParseError};

/// Compile `source` as top-level code into a context with the builtins
/// installed.
pub fn compile(source: &str) -> Result<Context> {
    let mut compiler = Compiler::new();
    compiler.parse(source)?;
    let mut ctx = compiler.finish();
    builtins::install(&mut ctx);
    Ok(ctx)
}

/// Compile and evaluate `source` with the builtins and `vars` declared.
pub fn render(source: &str, vars: &Vars) -> Result<String> {
    let mut ctx = compile(source)?;
    for (name, value) in vars {
        ctx.declare(name.clone(), value.clone());
    }
    ctx.eval_to_string()
}
