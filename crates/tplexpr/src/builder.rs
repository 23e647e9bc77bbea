//! Builders for host-side values.
//!
//! ```
//! use tplexpr::{ListBuilder, VarsBuilder};
//!
//! let vars = VarsBuilder::new()
//!     .set_string("title", "Index")
//!     .set_list("items", ListBuilder::new().add_string("a").add_number(2.0))
//!     .build();
//! assert_eq!(vars.len(), 2);
//! ```

use indexmap::IndexMap;

use crate::value::Value;

/// Variables passed to a template evaluation, in declaration order.
pub type Vars = IndexMap<String, Value>;

/// Builds a [`Vars`] map.
#[derive(Debug, Clone, Default)]
pub struct VarsBuilder {
    vars: Vars,
}

impl VarsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn set_string(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, Value::from(value.into()))
    }

    pub fn set_bool(self, name: impl Into<String>, value: bool) -> Self {
        self.set(name, value)
    }

    pub fn set_number(self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value)
    }

    pub fn set_list(self, name: impl Into<String>, list: ListBuilder) -> Self {
        self.set(name, list.build())
    }

    pub fn set_object(self, name: impl Into<String>, object: ObjectBuilder) -> Self {
        self.set(name, object.build())
    }

    pub fn build(self) -> Vars {
        self.vars
    }
}

/// Builds an object value.
#[derive(Debug, Clone, Default)]
pub struct ObjectBuilder {
    keys: IndexMap<String, Value>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keys.insert(key.into(), value.into());
        self
    }

    pub fn set_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, Value::from(value.into()))
    }

    pub fn set_bool(self, key: impl Into<String>, value: bool) -> Self {
        self.set(key, value)
    }

    pub fn set_number(self, key: impl Into<String>, value: f64) -> Self {
        self.set(key, value)
    }

    pub fn set_list(self, key: impl Into<String>, list: ListBuilder) -> Self {
        self.set(key, list.build())
    }

    pub fn set_object(self, key: impl Into<String>, object: ObjectBuilder) -> Self {
        self.set(key, object.build())
    }

    pub fn build(self) -> Value {
        Value::object(self.keys)
    }
}

/// Builds a list value.
#[derive(Debug, Clone, Default)]
pub struct ListBuilder {
    items: Vec<Value>,
}

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, value: impl Into<Value>) -> Self {
        self.items.push(value.into());
        self
    }

    pub fn add_string(self, value: impl Into<String>) -> Self {
        self.add(Value::from(value.into()))
    }

    pub fn add_bool(self, value: bool) -> Self {
        self.add(value)
    }

    pub fn add_number(self, value: f64) -> Self {
        self.add(value)
    }

    pub fn add_list(self, list: ListBuilder) -> Self {
        self.add(list.build())
    }

    pub fn add_object(self, object: ObjectBuilder) -> Self {
        self.add(object.build())
    }

    pub fn build(self) -> Value {
        Value::list(self.items)
    }
}
