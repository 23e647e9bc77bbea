use super::Builtin;
use crate::error::{Error, Result};
use crate::value::{Args, RangeIter, Value};

pub(super) const FUNCTIONS: &[(&str, Builtin)] = &[
    ("list", list),
    ("range", range),
    ("get", get),
    ("json", json),
    ("kind", kind),
    ("len", len),
];

fn list(args: &Args<'_>) -> Result<Value> {
    Ok(Value::list(args.as_slice().to_vec()))
}

/// `range()`, `range(stop)`, `range(start, stop)` or
/// `range(start, stop, step)`; bounds are truncated to integers.
fn range(args: &Args<'_>) -> Result<Value> {
    let int = |i: usize| args.get(i).coerce_number().map(|n| n as i64);
    let (start, stop, step) = match args.len() {
        0 => (0, 0, 1),
        1 => (0, int(0)?, 1),
        2 => (int(0)?, int(1)?, 1),
        _ => (int(0)?, int(1)?, int(2)?),
    };
    Ok(Value::iterator(RangeIter::new(start, stop, step)))
}

/// `get(object, key, default)`
fn get(args: &Args<'_>) -> Result<Value> {
    let object = args.get(0).coerce_object()?;
    let key = args.get(1).coerce_string()?;
    Ok(object.key(&key).unwrap_or_else(|| args.get(2)))
}

fn json(args: &Args<'_>) -> Result<Value> {
    let json = args.get(0).to_json()?;
    serde_json::to_string(&json)
        .map(Value::from)
        .map_err(|e| Error::host(e.to_string()))
}

fn kind(args: &Args<'_>) -> Result<Value> {
    Ok(Value::from(args.get(0).kind().as_str()))
}

/// Characters of a string, elements of a list, keys of an object.
fn len(args: &Args<'_>) -> Result<Value> {
    let n = match args.get(0) {
        Value::String(s) => s.chars().count(),
        Value::Object(object) => object.len(),
        other => other.coerce_list()?.len(),
    };
    Ok(Value::from(n))
}
