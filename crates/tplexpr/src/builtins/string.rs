use tplexpr_ast::CompareOp;

use super::Builtin;
use crate::error::Result;
use crate::filters::escape_html;
use crate::value::{compare, Args, Value};

pub(super) const FUNCTIONS: &[(&str, Builtin)] = &[
    ("upper", upper),
    ("lower", lower),
    ("trim", trim),
    ("split", split),
    ("replace", replace),
    ("contains", contains),
    ("escape", escape),
];

fn upper(args: &Args<'_>) -> Result<Value> {
    Ok(Value::from(args.get(0).coerce_string()?.to_uppercase()))
}

fn lower(args: &Args<'_>) -> Result<Value> {
    Ok(Value::from(args.get(0).coerce_string()?.to_lowercase()))
}

fn trim(args: &Args<'_>) -> Result<Value> {
    Ok(Value::from(args.get(0).coerce_string()?.trim()))
}

/// `split(text, sep)`: whitespace-separated words without a separator,
/// single characters with an empty one.
fn split(args: &Args<'_>) -> Result<Value> {
    let text = args.get(0).coerce_string()?;
    let parts: Vec<Value> = match args.get(1) {
        Value::Nil => text.split_whitespace().map(Value::from).collect(),
        sep => {
            let sep = sep.coerce_string()?;
            if sep.is_empty() {
                text.chars().map(|c| Value::from(c.to_string())).collect()
            } else {
                text.split(sep.as_str()).map(Value::from).collect()
            }
        }
    };
    Ok(Value::list(parts))
}

/// `replace(text, from, to)`
fn replace(args: &Args<'_>) -> Result<Value> {
    let text = args.get(0).coerce_string()?;
    let from = args.get(1).coerce_string()?;
    if from.is_empty() {
        return Ok(Value::from(text));
    }
    let to = args.get(2).coerce_string()?;
    Ok(Value::from(text.replace(&from, &to)))
}

/// `contains(haystack, needle)`: element membership for lists, key
/// membership for objects, substring search otherwise.
fn contains(args: &Args<'_>) -> Result<Value> {
    let needle = args.get(1);
    let found = match args.get(0) {
        Value::List(items) => items.iter().any(|v| compare(v, &needle, CompareOp::Eq)),
        Value::Object(object) => object.key(&needle.coerce_string()?).is_some(),
        haystack => haystack
            .coerce_string()?
            .contains(needle.coerce_string()?.as_str()),
    };
    Ok(Value::Bool(found))
}

fn escape(args: &Args<'_>) -> Result<Value> {
    Ok(Value::from(escape_html(&args.get(0).coerce_string()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::test_util::{call, list, num};

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(call(upper, &[s("Hello")]), s("HELLO"));
        assert_eq!(call(lower, &[s("Hello")]), s("hello"));
        assert_eq!(call(trim, &[s("  x \n")]), s("x"));
        assert_eq!(call(upper, &[num(1.5)]), s("1.5"));
    }

    #[test]
    fn test_split() {
        assert_eq!(call(split, &[s(" a  b ")]), list(&[s("a"), s("b")]));
        assert_eq!(call(split, &[s("a,b,"), s(",")]), list(&[s("a"), s("b"), s("")]));
        assert_eq!(call(split, &[s("ab"), s("")]), list(&[s("a"), s("b")]));
    }

    #[test]
    fn test_replace() {
        assert_eq!(call(replace, &[s("a-b-c"), s("-"), s("+")]), s("a+b+c"));
        assert_eq!(call(replace, &[s("abc"), s("")]), s("abc"));
    }

    #[test]
    fn test_contains() {
        assert_eq!(call(contains, &[s("hello"), s("ell")]), Value::Bool(true));
        assert_eq!(call(contains, &[list(&[num(1.0)]), num(1.0)]), Value::Bool(true));
        assert_eq!(call(contains, &[list(&[num(1.0)]), s("1")]), Value::Bool(false));
    }

    #[test]
    fn test_escape() {
        assert_eq!(call(escape, &[s("<a href='x'>")]), s("&lt;a href=&#39;x&#39;&gt;"));
    }
}
