use super::Value;
use crate::error::Result;

/// Positional arguments passed to a native function.
///
/// Missing arguments read as nil, so builtins can treat every parameter as
/// optional.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument `i`, or nil when absent.
    pub fn get(&self, i: usize) -> Value {
        self.values.get(i).cloned().unwrap_or_default()
    }

    /// Argument `i`, or `default` when absent.
    pub fn get_or(&self, i: usize, default: Value) -> Value {
        self.values.get(i).cloned().unwrap_or(default)
    }

    /// Argument `i` as a number, or `default` when absent.
    pub fn number_or(&self, i: usize, default: f64) -> Result<f64> {
        match self.values.get(i) {
            Some(value) => value.coerce_number(),
            None => Ok(default),
        }
    }

    pub fn as_slice(&self) -> &'a [Value] {
        self.values
    }
}
