//! Builtin function library
//!
//! Builtins are ordinary values declared into a [`Context`]; templates call
//! them like any other named value and may shadow them. Native builtins take
//! their receiver as the first argument, so `items.join(",")` and
//! `join(items, ",")` are the same call.

mod base;
mod convert;
mod list;
mod number;
mod string;

use crate::context::Context;
use crate::error::Result;
use crate::value::{Args, Value};

/// Native builtin signature
type Builtin = fn(&Args<'_>) -> Result<Value>;

/// Declare every builtin group into `ctx`.
pub fn install(ctx: &mut Context) {
    install_base(ctx);
    install_number(ctx);
    install_list(ctx);
    install_string(ctx);
    install_convert(ctx);
}

/// `list`, `range`, `get`, `json`, `kind`, `len` and the `true`, `false`
/// and `nil` constants.
pub fn install_base(ctx: &mut Context) {
    declare_all(ctx, base::FUNCTIONS);
    ctx.declare("true", true);
    ctx.declare("false", false);
    ctx.declare("nil", Value::Nil);
}

/// Math functions and the `NaN` constant.
pub fn install_number(ctx: &mut Context) {
    declare_all(ctx, number::FUNCTIONS);
    ctx.declare("NaN", f64::NAN);
}

pub fn install_list(ctx: &mut Context) {
    declare_all(ctx, list::FUNCTIONS);
}

pub fn install_string(ctx: &mut Context) {
    declare_all(ctx, string::FUNCTIONS);
}

pub fn install_convert(ctx: &mut Context) {
    declare_all(ctx, convert::FUNCTIONS);
}

fn declare_all(ctx: &mut Context, functions: &[(&str, Builtin)]) {
    for &(name, f) in functions {
        ctx.declare(name, Value::function(f));
    }
}
