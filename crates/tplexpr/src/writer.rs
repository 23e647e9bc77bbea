//! Output sinks for evaluated values.

use std::io;

use crate::error::Result;
use crate::value::Value;

/// Receives every value a template emits.
///
/// Output filters have already been applied by the time a value reaches a
/// writer.
pub trait ValueWriter {
    fn write_value(&mut self, value: Value) -> Result<()>;
}

/// Collects output into a `String`.
#[derive(Debug, Default)]
pub struct StringWriter {
    buf: String,
}

impl StringWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl ValueWriter for StringWriter {
    fn write_value(&mut self, value: Value) -> Result<()> {
        match value {
            Value::String(s) => self.buf.push_str(&s),
            other => self.buf.push_str(&other.coerce_string()?),
        }
        Ok(())
    }
}

/// Streams output into an [`io::Write`].
#[derive(Debug)]
pub struct IoWriter<W> {
    inner: W,
}

impl<W: io::Write> IoWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> ValueWriter for IoWriter<W> {
    fn write_value(&mut self, value: Value) -> Result<()> {
        let text = value.coerce_string()?;
        self.inner.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// Collapses everything a call writes into a single return value.
///
/// No writes yield nil, one write yields that value unchanged, and two or
/// more writes yield the concatenation of their string forms.
#[derive(Debug, Default)]
pub struct ReturnValue {
    first: Option<Value>,
    joined: Option<String>,
}

impl ReturnValue {
    pub fn finish(self) -> Value {
        match (self.joined, self.first) {
            (Some(joined), _) => Value::from(joined),
            (None, Some(value)) => value,
            (None, None) => Value::Nil,
        }
    }
}

impl ValueWriter for ReturnValue {
    fn write_value(&mut self, value: Value) -> Result<()> {
        if let Some(joined) = &mut self.joined {
            joined.push_str(&value.coerce_string()?);
            return Ok(());
        }
        match self.first.take() {
            None => self.first = Some(value),
            Some(first) => {
                let mut joined = first.coerce_string()?;
                joined.push_str(&value.coerce_string()?);
                self.joined = Some(joined);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_value_no_writes_is_nil() {
        assert_eq!(ReturnValue::default().finish(), Value::Nil);
    }

    #[test]
    fn test_return_value_single_write_keeps_kind() {
        let mut ret = ReturnValue::default();
        let list = Value::list(vec![Value::from(1), Value::from(2)]);
        ret.write_value(list.clone()).unwrap();
        assert_eq!(ret.finish(), list);
    }

    #[test]
    fn test_return_value_concatenates() {
        let mut ret = ReturnValue::default();
        ret.write_value(Value::from("Hello ")).unwrap();
        ret.write_value(Value::from(2)).unwrap();
        ret.write_value(Value::Bool(true)).unwrap();
        assert_eq!(ret.finish(), Value::from("Hello 2true"));
    }

    #[test]
    fn test_io_writer() {
        let mut out = IoWriter::new(Vec::new());
        out.write_value(Value::from("a")).unwrap();
        out.write_value(Value::Number(1.5)).unwrap();
        assert_eq!(out.into_inner(), b"a1.5");
    }
}
