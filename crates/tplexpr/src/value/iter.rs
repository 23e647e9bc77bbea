use std::cell::RefCell;
use std::rc::Rc;

use super::Value;
use crate::error::{Error, Result};

/// A source of values consumed by `for` loops and iterator coercions.
pub trait ValueIter {
    /// Advance and return the next value, or `None` when exhausted.
    fn next_value(&mut self) -> Result<Option<Value>>;
}

/// Shared handle to an iterator.
///
/// Clones advance the same underlying iterator, so an iterator value
/// consumed by one loop is exhausted for everybody holding it.
#[derive(Clone)]
pub struct IterRef(Rc<RefCell<Box<dyn ValueIter>>>);

impl IterRef {
    pub fn new(iter: impl ValueIter + 'static) -> Self {
        Self(Rc::new(RefCell::new(Box::new(iter))))
    }

    pub fn empty() -> Self {
        Self::new(Single(None))
    }

    pub fn single(value: Value) -> Self {
        Self::new(Single(Some(value)))
    }

    /// Adapt a Rust iterator.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self::new(Adapter(values.into_iter()))
    }

    pub fn next_value(&self) -> Result<Option<Value>> {
        let mut iter = self
            .0
            .try_borrow_mut()
            .map_err(|_| Error::host("iterator advanced from inside its own step"))?;
        iter.next_value()
    }

    pub fn ptr_eq(&self, other: &IterRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

struct Single(Option<Value>);

impl ValueIter for Single {
    fn next_value(&mut self) -> Result<Option<Value>> {
        Ok(self.0.take())
    }
}

struct Adapter<I>(I);

impl<I: Iterator<Item = Value>> ValueIter for Adapter<I> {
    fn next_value(&mut self) -> Result<Option<Value>> {
        Ok(self.0.next())
    }
}

/// Iterates a shared list without copying it.
pub struct ListIter {
    items: Rc<Vec<Value>>,
    pos: usize,
}

impl ListIter {
    pub fn new(items: Rc<Vec<Value>>) -> Self {
        Self { items, pos: 0 }
    }
}

impl ValueIter for ListIter {
    fn next_value(&mut self) -> Result<Option<Value>> {
        let value = self.items.get(self.pos).cloned();
        if value.is_some() {
            self.pos += 1;
        }
        Ok(value)
    }
}

/// Half-open integer range with a step.
///
/// The range is empty when the step points away from `stop`, and a zero
/// step yields nothing.
#[derive(Debug, Clone)]
pub struct RangeIter {
    next: i64,
    stop: i64,
    step: i64,
}

impl RangeIter {
    pub fn new(start: i64, stop: i64, step: i64) -> Self {
        Self {
            next: start,
            stop,
            step,
        }
    }
}

impl ValueIter for RangeIter {
    fn next_value(&mut self) -> Result<Option<Value>> {
        let done = match self.step {
            0 => true,
            step if step > 0 => self.next >= self.stop,
            _ => self.next <= self.stop,
        };
        if done {
            return Ok(None);
        }
        let value = self.next;
        self.next = self.next.saturating_add(self.step);
        Ok(Some(Value::from(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(iter: &IterRef) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(v) = iter.next_value().unwrap() {
            out.push(v);
        }
        out
    }

    fn numbers(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&n| Value::from(n)).collect()
    }

    #[test]
    fn test_range_half_open() {
        assert_eq!(drain(&IterRef::new(RangeIter::new(1, 6, 1))), numbers(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_range_negative_step() {
        assert_eq!(drain(&IterRef::new(RangeIter::new(2, 0, -1))), numbers(&[2, 1]));
        assert_eq!(drain(&IterRef::new(RangeIter::new(0, -1, -1))), numbers(&[0]));
    }

    #[test]
    fn test_range_step_sign_disagrees() {
        assert!(drain(&IterRef::new(RangeIter::new(0, -1, 1))).is_empty());
        assert!(drain(&IterRef::new(RangeIter::new(0, 5, 0))).is_empty());
    }

    #[test]
    fn test_clones_share_position() {
        let a = IterRef::from_values(numbers(&[1, 2, 3]));
        let b = a.clone();
        assert_eq!(a.next_value().unwrap(), Some(Value::from(1)));
        assert_eq!(b.next_value().unwrap(), Some(Value::from(2)));
        assert!(a.ptr_eq(&b));
    }
}
