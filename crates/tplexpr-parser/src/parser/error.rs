//! Parse error types.

use std::fmt;
use std::ops::Range;
use tplexpr_lexer::{ScanError, TokenKind};

/// Parse error with source location and context.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Kind of parse error
    pub kind: ParseErrorKind,
    /// Byte range in the template source
    pub span: Range<usize>,
    /// Human-readable error message
    pub message: String,
}

/// Category of parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// The scanner rejected the input (bad escape, unterminated string,
    /// stray `$`, unexpected character, end of input inside `${`).
    Scan(ScanError),

    /// A token other than the expected ones was found.
    ///
    /// Example: `${for x of xs do ...}` (expected `in`, found identifier).
    UnexpectedToken,

    /// Input ended while a construct was still open.
    ///
    /// Example: `${if x then}yes` without `${endif}`.
    UnexpectedEof,

    /// Tokens are well-formed but the construct is not allowed.
    ///
    /// Example: a second `else` in the same `if`.
    InvalidSyntax,
}

impl ParseError {
    /// Create an "unexpected token" error listing what would have been accepted.
    pub fn unexpected_token(found: &TokenKind, expected: &[&str], span: Range<usize>) -> Self {
        let found_text = found.to_string();
        let message = match expected {
            [] => format!("unexpected {found_text}"),
            [one] => format!("unexpected {found_text}, expected {one}"),
            many => format!(
                "unexpected {found_text}, expected one of {}",
                many.join(", ")
            ),
        };
        Self {
            kind: if matches!(found, TokenKind::Eof) {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::UnexpectedToken
            },
            span,
            message,
        }
    }

    /// Create an "invalid syntax" error.
    pub fn invalid_syntax(message: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            span,
            message: message.into(),
        }
    }

    /// Wrap a scan error; `base` shifts its offset into the enclosing source.
    pub fn scan(err: &ScanError, base: usize) -> Self {
        let at = base + err.offset();
        Self {
            kind: ParseErrorKind::Scan(err.clone()),
            span: at..at,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParseErrorKind::Scan(_) => f.write_str(&self.message),
            _ => write!(
                f,
                "syntax error: {} at {}..{}",
                self.message, self.span.start, self.span.end
            ),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ScanError> for ParseError {
    fn from(err: ScanError) -> Self {
        Self::scan(&err, 0)
    }
}
