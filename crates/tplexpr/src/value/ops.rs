//! Comparison and arithmetic between values.

use std::cmp::Ordering;
use std::rc::Rc;

use tplexpr_ast::{BinaryOp, CompareOp};

use super::Value;
use crate::error::{Error, Result};

/// Compare two values.
///
/// Values of different kinds are never equal and never ordered. Strings
/// and numbers are fully ordered, booleans and nil only support equality,
/// and lists, objects, functions and iterators compare by identity.
pub fn compare(a: &Value, b: &Value, op: CompareOp) -> bool {
    if a.kind() != b.kind() {
        return op == CompareOp::Ne;
    }

    match (a, b) {
        (Value::String(l), Value::String(r)) => ordered(l.cmp(r), op),
        (Value::Number(l), Value::Number(r)) => match op {
            CompareOp::Eq => l == r,
            CompareOp::Ne => l != r,
            CompareOp::Gt => l > r,
            CompareOp::Ge => l >= r,
            CompareOp::Lt => l < r,
            CompareOp::Le => l <= r,
        },
        (Value::Nil, Value::Nil) => equality(true, op),
        (Value::Bool(l), Value::Bool(r)) => equality(l == r, op),
        (Value::List(l), Value::List(r)) => equality(Rc::ptr_eq(l, r), op),
        (Value::Object(l), Value::Object(r)) => equality(l.ptr_eq(r), op),
        (Value::Function(l), Value::Function(r)) => equality(l.ptr_eq(r), op),
        (Value::Iterator(l), Value::Iterator(r)) => equality(l.ptr_eq(r), op),
        _ => false,
    }
}

fn ordered(ordering: Ordering, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => ordering.is_eq(),
        CompareOp::Ne => ordering.is_ne(),
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::Ge => ordering.is_ge(),
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Le => ordering.is_le(),
    }
}

fn equality(same: bool, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => same,
        CompareOp::Ne => !same,
        _ => false,
    }
}

/// Apply an arithmetic operator.
///
/// * list `+` list concatenates, list `+` anything else appends it
/// * list `-` list keeps the left elements equal to no right element
/// * string `+` string concatenates
/// * number supports `+ - * /`
/// * object `+` object merges, right side wins
pub fn binary_op(a: &Value, b: &Value, op: BinaryOp) -> Result<Value> {
    match (a, b, op) {
        (Value::List(l), Value::List(r), BinaryOp::Add) => {
            let mut items = Vec::with_capacity(l.len() + r.len());
            items.extend(l.iter().cloned());
            items.extend(r.iter().cloned());
            Ok(Value::list(items))
        }
        (Value::List(l), Value::List(r), BinaryOp::Sub) => Ok(Value::list(
            l.iter()
                .filter(|x| !r.iter().any(|y| compare(x, y, CompareOp::Eq)))
                .cloned()
                .collect(),
        )),
        (Value::List(l), other, BinaryOp::Add) => {
            let mut items = Vec::with_capacity(l.len() + 1);
            items.extend(l.iter().cloned());
            items.push(other.clone());
            Ok(Value::list(items))
        }
        (Value::String(l), Value::String(r), BinaryOp::Add) => {
            Ok(Value::from(format!("{l}{r}")))
        }
        (Value::Number(l), Value::Number(r), op) => Ok(Value::Number(match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => l / r,
        })),
        (Value::Object(l), Value::Object(r), BinaryOp::Add) => Ok(Value::Object(l.merge(r))),
        _ => Err(Error::Type {
            op: op.verb(),
            from: a.kind(),
            to: b.kind(),
        }),
    }
}
