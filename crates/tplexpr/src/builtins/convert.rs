use super::Builtin;
use crate::error::Result;
use crate::value::{Args, Value};

pub(super) const FUNCTIONS: &[(&str, Builtin)] = &[
    ("toBool", to_bool),
    ("toNumber", to_number),
    ("toString", to_string),
    ("toList", to_list),
    ("toObject", to_object),
    ("bool", to_bool),
    ("number", to_number),
    ("string", to_string),
];

fn to_bool(args: &Args<'_>) -> Result<Value> {
    Ok(Value::Bool(args.get(0).truthy()))
}

fn to_number(args: &Args<'_>) -> Result<Value> {
    Ok(Value::Number(args.get(0).coerce_number()?))
}

fn to_string(args: &Args<'_>) -> Result<Value> {
    Ok(Value::from(args.get(0).coerce_string()?))
}

fn to_list(args: &Args<'_>) -> Result<Value> {
    Ok(Value::List(args.get(0).coerce_list()?))
}

fn to_object(args: &Args<'_>) -> Result<Value> {
    Ok(Value::Object(args.get(0).coerce_object()?))
}
