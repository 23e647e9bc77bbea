//! Dynamic value model
//!
//! Every template value is one of eight kinds. Each kind answers the same
//! set of coercions (truthiness, number, string, list, iterator, object view
//! and call), so the virtual machine never needs to know which kind it is
//! holding. Coercions are total: they either succeed or return
//! [`Error::Type`], they never panic.
//!
//! | kind     | bool        | number      | string               | list / iter   |
//! |----------|-------------|-------------|----------------------|---------------|
//! | nil      | false       | 0           | ""                   | empty         |
//! | bool     | itself      | 1 / 0       | "true" / "false"     | itself        |
//! | number   | != 0        | itself      | `f64` display form   | itself        |
//! | string   | non-empty   | parsed      | itself               | itself        |
//! | list     | non-empty   | error       | elements, spaced     | elements      |
//! | object   | non-empty   | error       | keys, spaced         | keys          |
//! | function | true        | error       | result of `f()`      | result of `f()` |
//! | iterator | true        | error       | drained, spaced      | drained       |

mod args;
mod function;
mod iter;
mod json;
mod object;
mod ops;

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};

pub use args::Args;
pub use function::{Closure, Function, NativeFn};
pub use iter::{IterRef, ListIter, RangeIter, ValueIter};
pub use json::to_value;
pub use object::{Object, ObjectRef};
pub use ops::{binary_op, compare};

/// Maximum number of values drained from an iterator by a list or string
/// coercion.
pub const ITER_LIST_LIMIT: usize = 10_000;

/// The kind of a [`Value`], as reported by the `kind` builtin and in type
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Nil,
    String,
    Bool,
    Number,
    List,
    Object,
    Function,
    Iterator,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Nil => "nil",
            Kind::String => "string",
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::List => "list",
            Kind::Object => "object",
            Kind::Function => "function",
            Kind::Iterator => "iterator",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically typed template value.
///
/// Cloning is cheap: strings, lists, objects, functions and iterators are
/// reference counted. Lists and map-backed objects are copy-on-write.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    List(Rc<Vec<Value>>),
    Object(ObjectRef),
    Function(Function),
    Iterator(IterRef),
}

impl Value {
    /// Wrap a native function.
    pub fn function(f: impl Fn(&Args<'_>) -> Result<Value> + 'static) -> Value {
        Value::Function(Function::Native(Rc::new(f)))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(items))
    }

    pub fn object(map: IndexMap<String, Value>) -> Value {
        Value::Object(ObjectRef::Map(Rc::new(map)))
    }

    /// Expose a host object through the [`Object`] capability.
    pub fn host_object(object: impl Object + 'static) -> Value {
        Value::Object(ObjectRef::Host(Rc::new(object)))
    }

    pub fn iterator(iter: impl ValueIter + 'static) -> Value {
        Value::Iterator(IterRef::new(iter))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::List(_) => Kind::List,
            Value::Object(_) => Kind::Object,
            Value::Function(_) => Kind::Function,
            Value::Iterator(_) => Kind::Iterator,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Object(object) => !object.is_empty(),
            Value::Function(_) | Value::Iterator(_) => true,
        }
    }

    pub fn coerce_number(&self) -> Result<f64> {
        match self {
            Value::Nil => Ok(0.0),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Ok(*n),
            Value::String(s) => s
                .parse::<f64>()
                .map_err(|_| Error::convert(Kind::String, Kind::Number)),
            other => Err(Error::convert(other.kind(), Kind::Number)),
        }
    }

    pub fn coerce_string(&self) -> Result<String> {
        match self {
            Value::Nil => Ok(String::new()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s.to_string()),
            Value::List(items) => join_spaced(items.iter().cloned().map(Ok)),
            Value::Object(object) => Ok(object.keys().join(" ")),
            Value::Function(f) => f.call(&[])?.coerce_string(),
            Value::Iterator(iter) => {
                let mut out = String::new();
                for i in 0..ITER_LIST_LIMIT {
                    let Some(value) = iter.next_value()? else {
                        return Ok(out);
                    };
                    if i != 0 {
                        out.push(' ');
                    }
                    out.push_str(&value.coerce_string()?);
                }
                if iter.next_value()?.is_some() {
                    out.push_str(" ...");
                }
                Ok(out)
            }
        }
    }

    pub fn coerce_list(&self) -> Result<Rc<Vec<Value>>> {
        match self {
            Value::Nil => Ok(Rc::new(Vec::new())),
            Value::List(items) => Ok(Rc::clone(items)),
            Value::Object(object) => Ok(Rc::new(
                object.keys().into_iter().map(Value::from).collect(),
            )),
            Value::Function(f) => f.call(&[])?.coerce_list(),
            Value::Iterator(iter) => {
                let mut items = Vec::new();
                while let Some(value) = iter.next_value()? {
                    if items.len() == ITER_LIST_LIMIT {
                        return Err(Error::IterListLimit);
                    }
                    items.push(value);
                }
                Ok(Rc::new(items))
            }
            scalar => Ok(Rc::new(vec![scalar.clone()])),
        }
    }

    pub fn coerce_iter(&self) -> Result<IterRef> {
        match self {
            Value::Nil => Ok(IterRef::empty()),
            Value::List(items) => Ok(IterRef::new(ListIter::new(Rc::clone(items)))),
            Value::Object(_) => Ok(IterRef::new(ListIter::new(self.coerce_list()?))),
            Value::Function(f) => f.call(&[])?.coerce_iter(),
            Value::Iterator(iter) => Ok(iter.clone()),
            scalar => Ok(IterRef::single(scalar.clone())),
        }
    }

    /// Object view of this value. Lists are viewed by index; scalars have
    /// no object view.
    pub fn coerce_object(&self) -> Result<ObjectRef> {
        match self {
            Value::Nil => Ok(ObjectRef::default()),
            Value::Object(object) => Ok(object.clone()),
            Value::List(items) => Ok(ObjectRef::Map(Rc::new(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v.clone()))
                    .collect(),
            ))),
            Value::Function(f) => f.call(&[])?.coerce_object(),
            other => Err(Error::convert(other.kind(), Kind::Object)),
        }
    }

    /// Attribute lookup: list elements by decimal index, object keys by name.
    pub fn attr(&self, name: &str) -> Option<Value> {
        match self {
            Value::List(items) => name.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
            Value::Object(object) => object.key(name),
            _ => None,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::List(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            Value::Object(object) => object.keys(),
            _ => Vec::new(),
        }
    }

    /// Call this value with `args`.
    ///
    /// Functions run; iterators yield their next value (nil once
    /// exhausted); every other value returns itself.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Function(f) => f.call(args),
            Value::Iterator(iter) => Ok(iter.next_value()?.unwrap_or_default()),
            other => Ok(other.clone()),
        }
    }
}

fn join_spaced(values: impl Iterator<Item = Result<Value>>) -> Result<String> {
    let mut out = String::new();
    for (i, value) in values.enumerate() {
        if i != 0 {
            out.push(' ');
        }
        out.push_str(&value?.coerce_string()?);
    }
    Ok(out)
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Nil"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Object(object) => f.debug_tuple("Object").field(object).finish(),
            Value::Function(func) => f.debug_tuple("Function").field(func).finish(),
            Value::Iterator(_) => f.write_str("Iterator(..)"),
        }
    }
}

/// Structural equality for host code and tests. Template comparisons use
/// [`compare`], which compares lists and objects by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Iterator(a), Value::Iterator(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    // =============================================================================
    // Coercions
    // =============================================================================

    #[test]
    fn test_nil_coerces_to_empty() {
        let nil = Value::Nil;
        assert!(!nil.truthy());
        assert_eq!(nil.coerce_number().unwrap(), 0.0);
        assert_eq!(nil.coerce_string().unwrap(), "");
        assert!(nil.coerce_list().unwrap().is_empty());
        assert!(nil.coerce_iter().unwrap().next_value().unwrap().is_none());
        assert!(nil.coerce_object().unwrap().is_empty());
    }

    #[test]
    fn test_bool_coercions() {
        assert_eq!(Value::Bool(true).coerce_number().unwrap(), 1.0);
        assert_eq!(Value::Bool(false).coerce_string().unwrap(), "false");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(s("2.5").coerce_number().unwrap(), 2.5);
        let err = s("abc").coerce_number().unwrap_err();
        assert_eq!(err.to_string(), "type error: can not convert string to number");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(Value::from(3).coerce_string().unwrap(), "3");
        assert_eq!(Value::from(2.5).coerce_string().unwrap(), "2.5");
        assert_eq!(Value::from(-0.25).coerce_string().unwrap(), "-0.25");
        assert_eq!(Value::from(f64::NAN).coerce_string().unwrap(), "NaN");
    }

    #[test]
    fn test_list_string_is_space_joined() {
        let list = Value::list(vec![s("a"), Value::from(1), Value::Bool(true)]);
        assert_eq!(list.coerce_string().unwrap(), "a 1 true");
    }

    #[test]
    fn test_object_string_joins_keys() {
        let mut map = IndexMap::new();
        map.insert("a".to_string(), Value::from(1));
        map.insert("b".to_string(), Value::from(2));
        let object = Value::object(map);
        assert_eq!(object.coerce_string().unwrap(), "a b");
        assert_eq!(*object.coerce_list().unwrap(), vec![s("a"), s("b")]);
    }

    #[test]
    fn test_scalar_list_is_single_element() {
        assert_eq!(*Value::from(4).coerce_list().unwrap(), vec![Value::from(4)]);
        assert_eq!(*s("x").coerce_list().unwrap(), vec![s("x")]);
    }

    #[test]
    fn test_list_object_view() {
        let list = Value::list(vec![s("a"), s("b")]);
        assert_eq!(list.attr("1"), Some(s("b")));
        assert_eq!(list.attr("2"), None);
        assert_eq!(list.attr("-1"), None);
        assert_eq!(list.keys(), vec!["0", "1"]);
    }

    #[test]
    fn test_function_forced_by_coercion() {
        let f = Value::function(|_| Ok(Value::list(vec![s("x"), s("y")])));
        assert_eq!(f.coerce_string().unwrap(), "x y");
        assert_eq!(f.coerce_list().unwrap().len(), 2);
        assert_eq!(
            f.coerce_number().unwrap_err().to_string(),
            "type error: can not convert function to number"
        );
    }

    #[test]
    fn test_iterator_call_yields_next() {
        let iter = Value::iterator(RangeIter::new(0, 2, 1));
        assert_eq!(iter.call(&[]).unwrap(), Value::from(0));
        assert_eq!(iter.call(&[]).unwrap(), Value::from(1));
        assert_eq!(iter.call(&[]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_iterator_list_limit() {
        let long = Value::iterator(RangeIter::new(0, ITER_LIST_LIMIT as i64 + 1, 1));
        assert!(matches!(long.coerce_list(), Err(Error::IterListLimit)));

        let exact = Value::iterator(RangeIter::new(0, ITER_LIST_LIMIT as i64, 1));
        assert_eq!(exact.coerce_list().unwrap().len(), ITER_LIST_LIMIT);
    }

    #[test]
    fn test_iterator_string_truncates() {
        let long = Value::iterator(RangeIter::new(0, ITER_LIST_LIMIT as i64 + 5, 1));
        assert!(long.coerce_string().unwrap().ends_with(" ..."));
    }

    #[test]
    fn test_scalar_call_returns_itself() {
        assert_eq!(s("x").call(&[Value::from(1)]).unwrap(), s("x"));
    }
}
