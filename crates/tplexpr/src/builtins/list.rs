use std::cmp::Ordering;

use super::Builtin;
use crate::error::Result;
use crate::value::{Args, Value};

pub(super) const FUNCTIONS: &[(&str, Builtin)] = &[
    ("map", map),
    ("filter", filter),
    ("reversed", reversed),
    ("join", join),
    ("append", append),
    ("extend", extend),
    ("sorted", sorted),
];

/// `map(list, fn)`: calls `fn(value, index)` for every element.
fn map(args: &Args<'_>) -> Result<Value> {
    let values = args.get(0).coerce_list()?;
    let f = args.get(1);
    if f.is_nil() {
        return Ok(Value::List(values));
    }
    let mapped = values
        .iter()
        .enumerate()
        .map(|(i, value)| f.call(&[value.clone(), Value::from(i)]))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::list(mapped))
}

/// `filter(list, fn)`: keeps elements for which `fn(value)` is truthy.
fn filter(args: &Args<'_>) -> Result<Value> {
    let values = args.get(0).coerce_list()?;
    let f = args.get(1);
    if f.is_nil() {
        return Ok(Value::List(values));
    }
    let mut kept = Vec::new();
    for value in values.iter() {
        if f.call(std::slice::from_ref(value))?.truthy() {
            kept.push(value.clone());
        }
    }
    Ok(Value::list(kept))
}

fn reversed(args: &Args<'_>) -> Result<Value> {
    let values = args.get(0).coerce_list()?;
    Ok(Value::list(values.iter().rev().cloned().collect()))
}

fn join(args: &Args<'_>) -> Result<Value> {
    let values = args.get(0).coerce_list()?;
    let sep = args.get(1).coerce_string()?;
    let parts = values
        .iter()
        .map(Value::coerce_string)
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::from(parts.join(&sep)))
}

/// `append(list, values...)`
fn append(args: &Args<'_>) -> Result<Value> {
    let mut values = args.get(0).coerce_list()?.to_vec();
    values.extend(args.as_slice().iter().skip(1).cloned());
    Ok(Value::list(values))
}

/// `extend(list, other)`
fn extend(args: &Args<'_>) -> Result<Value> {
    let mut values = args.get(0).coerce_list()?.to_vec();
    values.extend(args.get(1).coerce_list()?.iter().cloned());
    Ok(Value::list(values))
}

/// `sorted(list, reverse)`: numbers and strings in their natural order,
/// values of different kinds grouped by kind.
fn sorted(args: &Args<'_>) -> Result<Value> {
    let mut values = args.get(0).coerce_list()?.to_vec();
    if args.get(1).truthy() {
        values.sort_by(|a, b| order(b, a));
    } else {
        values.sort_by(order);
    }
    Ok(Value::list(values))
}

fn order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => (a.kind() as u8).cmp(&(b.kind() as u8)),
    }
}
