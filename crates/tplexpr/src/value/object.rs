use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::Value;
use crate::error::Result;

/// Capability implemented by host values that want to behave as objects.
///
/// `set_key` takes `&self`; implementors that accept writes use interior
/// mutability.
pub trait Object {
    fn key(&self, name: &str) -> Option<Value>;

    fn set_key(&self, name: &str, value: Value) -> Result<()>;

    fn keys(&self) -> Vec<String>;
}

/// An object value: a plain ordered map, or a host object.
#[derive(Clone)]
pub enum ObjectRef {
    Map(Rc<IndexMap<String, Value>>),
    Host(Rc<dyn Object>),
}

impl Default for ObjectRef {
    fn default() -> Self {
        ObjectRef::Map(Rc::new(IndexMap::new()))
    }
}

impl ObjectRef {
    pub fn key(&self, name: &str) -> Option<Value> {
        match self {
            ObjectRef::Map(map) => map.get(name).cloned(),
            ObjectRef::Host(host) => host.key(name),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match self {
            ObjectRef::Map(map) => map.keys().cloned().collect(),
            ObjectRef::Host(host) => host.keys(),
        }
    }

    /// Set a key. Maps shared with other values are copied first.
    pub fn set_key(&mut self, name: &str, value: Value) -> Result<()> {
        match self {
            ObjectRef::Map(map) => {
                Rc::make_mut(map).insert(name.to_string(), value);
                Ok(())
            }
            ObjectRef::Host(host) => host.set_key(name, value),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ObjectRef::Map(map) => map.len(),
            ObjectRef::Host(host) => host.keys().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key/value pairs in key order. Keys a host object lists but cannot
    /// resolve are skipped.
    pub fn entries(&self) -> Vec<(String, Value)> {
        match self {
            ObjectRef::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ObjectRef::Host(host) => host
                .keys()
                .into_iter()
                .filter_map(|k| host.key(&k).map(|v| (k, v)))
                .collect(),
        }
    }

    /// A new map holding the keys of `self` overwritten by those of `other`.
    pub fn merge(&self, other: &ObjectRef) -> ObjectRef {
        let mut merged = match self {
            ObjectRef::Map(map) => (**map).clone(),
            ObjectRef::Host(_) => self.entries().into_iter().collect(),
        };
        match other {
            ObjectRef::Map(map) => {
                merged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            ObjectRef::Host(_) => merged.extend(other.entries()),
        }
        ObjectRef::Map(Rc::new(merged))
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        match (self, other) {
            (ObjectRef::Map(a), ObjectRef::Map(b)) => Rc::ptr_eq(a, b),
            (ObjectRef::Host(a), ObjectRef::Host(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ObjectRef::Map(a), ObjectRef::Map(b)) => a == b,
            _ => self.ptr_eq(other),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Map(map) => f.debug_map().entries(map.iter()).finish(),
            ObjectRef::Host(host) => f.debug_tuple("Host").field(&host.keys()).finish(),
        }
    }
}
