use super::Builtin;
use crate::error::Result;
use crate::value::{Args, Value};

/// One-argument math function; a missing argument reads as zero.
macro_rules! unary {
    ($f:expr) => {
        |args: &Args<'_>| -> Result<Value> {
            let f: fn(f64) -> f64 = $f;
            Ok(Value::Number(f(args.number_or(0, 0.0)?)))
        }
    };
}

macro_rules! binary {
    ($f:expr) => {
        |args: &Args<'_>| -> Result<Value> {
            let f: fn(f64, f64) -> f64 = $f;
            Ok(Value::Number(f(args.number_or(0, 0.0)?, args.number_or(1, 0.0)?)))
        }
    };
}

pub(super) const FUNCTIONS: &[(&str, Builtin)] = &[
    ("abs", unary!(f64::abs)),
    ("acos", unary!(f64::acos)),
    ("acosh", unary!(f64::acosh)),
    ("asin", unary!(f64::asin)),
    ("asinh", unary!(f64::asinh)),
    ("atan", unary!(f64::atan)),
    ("atan2", binary!(f64::atan2)),
    ("atanh", unary!(f64::atanh)),
    ("cbrt", unary!(f64::cbrt)),
    ("ceil", unary!(f64::ceil)),
    ("cos", unary!(f64::cos)),
    ("cosh", unary!(f64::cosh)),
    ("exp", unary!(f64::exp)),
    ("exp2", unary!(f64::exp2)),
    ("floor", unary!(f64::floor)),
    ("hypot", binary!(f64::hypot)),
    ("inf", inf),
    ("isInf", is_inf),
    ("isNaN", is_nan),
    ("log", unary!(f64::ln)),
    ("log10", unary!(f64::log10)),
    ("log2", unary!(f64::log2)),
    ("max", max),
    ("min", min),
    ("mod", binary!(|a, b| a % b)),
    ("pow", binary!(f64::powf)),
    ("round", unary!(f64::round)),
    ("roundToEven", unary!(f64::round_ties_even)),
    ("sin", unary!(f64::sin)),
    ("sinh", unary!(f64::sinh)),
    ("sqrt", unary!(f64::sqrt)),
    ("tan", unary!(f64::tan)),
    ("tanh", unary!(f64::tanh)),
    ("trunc", unary!(f64::trunc)),
];

/// `inf(sign)`: negative infinity for a negative sign, positive otherwise.
fn inf(args: &Args<'_>) -> Result<Value> {
    let sign = args.number_or(0, 0.0)?;
    Ok(Value::Number(if sign < 0.0 {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    }))
}

/// `isInf(n, sign)`: a positive sign matches only +inf, a negative sign
/// only -inf, zero either.
fn is_inf(args: &Args<'_>) -> Result<Value> {
    let n = args.number_or(0, 0.0)?;
    let sign = args.number_or(1, 0.0)?;
    let matches = if sign > 0.0 {
        n == f64::INFINITY
    } else if sign < 0.0 {
        n == f64::NEG_INFINITY
    } else {
        n.is_infinite()
    };
    Ok(Value::Bool(matches))
}

fn is_nan(args: &Args<'_>) -> Result<Value> {
    Ok(Value::Bool(args.number_or(0, 0.0)?.is_nan()))
}

fn max(args: &Args<'_>) -> Result<Value> {
    fold(args, |acc, n| if n > acc { n } else { acc })
}

fn min(args: &Args<'_>) -> Result<Value> {
    fold(args, |acc, n| if n < acc { n } else { acc })
}

/// Fold all arguments as numbers; nil without arguments.
fn fold(args: &Args<'_>, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
    let mut acc = None;
    for value in args.as_slice() {
        let n = value.coerce_number()?;
        acc = Some(acc.map_or(n, |acc| f(acc, n)));
    }
    Ok(acc.map_or(Value::Nil, Value::Number))
}
