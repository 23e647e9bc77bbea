//! Output filters.
//!
//! A filter rewrites the string form of every value emitted while it is the
//! innermost active filter. Filters are registered with the compiler and
//! bracket a compiled body with push/pop instructions.

use std::fmt;

use crate::error::Result;

/// Text transform applied to emitted output.
pub trait ValueFilter: fmt::Debug {
    fn filter(&self, text: &str) -> Result<String>;
}

/// Drops all output. Used by `discard ... enddiscard`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardFilter;

impl ValueFilter for DiscardFilter {
    fn filter(&self, _text: &str) -> Result<String> {
        Ok(String::new())
    }
}

/// Escapes `& < > " '` for HTML text and attribute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEscapeFilter;

impl ValueFilter for HtmlEscapeFilter {
    fn filter(&self, text: &str) -> Result<String> {
        Ok(escape_html(text))
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
