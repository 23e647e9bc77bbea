//! Conversion between template values and `serde` data.

use serde::Serialize;
use serde_json::{Map, Number};

use super::Value;
use crate::error::{Error, Result};

impl Value {
    /// Build a value from JSON. Objects keep their key order.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Nil, Value::Number),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::list(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON. Iterators are drained, functions are called with no
    /// arguments, and non-finite numbers become `null`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Value::Nil => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => json_number(*n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::List(_) | Value::Iterator(_) => serde_json::Value::Array(
                self.coerce_list()?
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<_>>()?,
            ),
            Value::Object(object) => {
                let mut map = Map::new();
                for (key, value) in object.entries() {
                    map.insert(key, value.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Value::Function(f) => f.call(&[])?.to_json()?,
        })
    }
}

/// Integral numbers within the exactly representable range serialize
/// without a fraction.
fn json_number(n: f64) -> serde_json::Value {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= EXACT {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

/// Convert any serializable host value into a template value.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map(Value::from_json)
        .map_err(|err| Error::host(err.to_string()))
}
