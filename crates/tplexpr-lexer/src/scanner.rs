//! The mode-switching scanner.

use std::ops::Range;

use crate::{Keyword, Lexeme, Token, TokenKind};
use logos::Logos;
use thiserror::Error;

/// Errors produced while scanning. Scanning stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("syntax error: `$` at end of input (offset {offset})")]
    TrailingDollar { offset: usize },

    #[error("syntax error: unexpected {found:?} after `$` (offset {offset})")]
    UnexpectedAfterDollar { offset: usize, found: char },

    #[error("syntax error: unexpected character {found:?} (offset {offset})")]
    UnexpectedInput { offset: usize, found: char },

    #[error("syntax error: unexpected end of input inside `${{` (offset {offset})")]
    EofInExpression { offset: usize },

    #[error("syntax error: unterminated string (offset {offset})")]
    UnterminatedString { offset: usize },

    #[error("syntax error: invalid escape sequence `\\{found}` (offset {offset})")]
    BadEscape { offset: usize, found: char },
}

impl ScanError {
    /// Byte offset the error refers to.
    pub fn offset(&self) -> usize {
        match self {
            ScanError::TrailingDollar { offset }
            | ScanError::UnexpectedAfterDollar { offset, .. }
            | ScanError::UnexpectedInput { offset, .. }
            | ScanError::EofInExpression { offset }
            | ScanError::UnterminatedString { offset }
            | ScanError::BadEscape { offset, .. } => *offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Text,
    Expr,
    Var,
}

/// Incremental scanner over an immutable source buffer.
///
/// The cursor never moves backwards; callers needing lookahead buffer the
/// returned tokens themselves.
pub struct Scanner<'src> {
    source: &'src str,
    pos: usize,
    mode: Mode,
    /// Whether the previous expression token ended an operand. Decides
    /// between `-` as an operator and `-` as the sign of a number.
    after_operand: bool,
    error: Option<ScanError>,
    /// Error found after text that has not been returned yet
    pending: Option<ScanError>,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            mode: Mode::Text,
            after_operand: false,
            error: None,
            pending: None,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Produce the next token.
    ///
    /// After [`TokenKind::Eof`] every further call yields `Eof` again; after
    /// an error every further call yields the same error.
    pub fn next_token(&mut self) -> Result<Token, ScanError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if let Some(err) = self.pending.take() {
            self.error = Some(err.clone());
            return Err(err);
        }
        let result = loop {
            let step = match self.mode {
                Mode::Text => self.scan_text(),
                Mode::Var => Ok(Some(self.scan_var())),
                Mode::Expr => self.scan_expr(),
            };
            match step {
                Ok(Some(token)) => break Ok(token),
                Ok(None) => continue,
                Err(err) => break Err(err),
            }
        };
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    /// Text mode. Returns `None` when a mode switch produced no text.
    fn scan_text(&mut self) -> Result<Option<Token>, ScanError> {
        let bytes = self.source.as_bytes();
        let start = self.pos;
        if start >= bytes.len() {
            return Ok(Some(Token::new(TokenKind::Eof, start..start)));
        }

        let mut text = String::new();
        let mut end = start;
        while self.pos < bytes.len() {
            let Some(rel) = self.source[self.pos..].find('$') else {
                text.push_str(&self.source[self.pos..]);
                self.pos = bytes.len();
                end = self.pos;
                break;
            };
            let dollar = self.pos + rel;
            text.push_str(&self.source[self.pos..dollar]);
            end = dollar;

            match bytes.get(dollar + 1) {
                Some(b'$') => {
                    text.push('$');
                    self.pos = dollar + 2;
                    end = self.pos;
                }
                Some(b'{') => {
                    self.pos = dollar + 2;
                    self.mode = Mode::Expr;
                    self.after_operand = false;
                    break;
                }
                Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {
                    self.pos = dollar + 1;
                    self.mode = Mode::Var;
                    break;
                }
                Some(_) => {
                    let found = self.source[dollar + 1..].chars().next().unwrap_or('$');
                    return self.text_then_error(
                        text,
                        start..end,
                        ScanError::UnexpectedAfterDollar {
                            offset: dollar,
                            found,
                        },
                    );
                }
                None => {
                    return self.text_then_error(
                        text,
                        start..end,
                        ScanError::TrailingDollar { offset: dollar },
                    )
                }
            }
        }

        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Token::new(TokenKind::Text(text), start..end)))
    }

    /// Text scanned before an error is still a token; the error follows it.
    fn text_then_error(
        &mut self,
        text: String,
        span: Range<usize>,
        err: ScanError,
    ) -> Result<Option<Token>, ScanError> {
        if text.is_empty() {
            return Err(err);
        }
        self.pos = self.source.len();
        self.pending = Some(err);
        Ok(Some(Token::new(TokenKind::Text(text), span)))
    }

    fn scan_var(&mut self) -> Token {
        let start = self.pos;
        let len = self.source[start..]
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        self.pos = start + len;
        self.mode = Mode::Text;
        Token::new(
            TokenKind::Ident(self.source[start..self.pos].to_string()),
            start..self.pos,
        )
    }

    /// Expression mode. Returns `None` after a closing brace.
    fn scan_expr(&mut self) -> Result<Option<Token>, ScanError> {
        let base = self.pos;
        let mut lexer = Lexeme::lexer(&self.source[base..]);
        let lexeme = match lexer.next() {
            None => {
                return Err(ScanError::EofInExpression {
                    offset: self.source.len(),
                })
            }
            Some(Err(())) => {
                let offset = base + lexer.span().start;
                let found = self.source[offset..].chars().next().unwrap_or('\0');
                return Err(ScanError::UnexpectedInput { offset, found });
            }
            Some(Ok(lexeme)) => lexeme,
        };
        let span = base + lexer.span().start..base + lexer.span().end;
        let slice = lexer.slice();
        self.pos = span.end;

        let kind = match lexeme {
            Lexeme::Close => {
                self.mode = Mode::Text;
                return Ok(None);
            }
            Lexeme::CloseTrim => {
                let ws = self.source[self.pos..]
                    .bytes()
                    .take_while(u8::is_ascii_whitespace)
                    .count();
                self.pos += ws;
                self.mode = Mode::Text;
                return Ok(None);
            }
            Lexeme::Quote => {
                let (body, end) = self.scan_string(span.start)?;
                self.pos = end;
                self.after_operand = true;
                return Ok(Some(Token::new(TokenKind::Str(body), span.start..end)));
            }
            Lexeme::Ident => match Keyword::lookup(slice) {
                Some(kw) => TokenKind::Keyword(kw),
                None => TokenKind::Ident(slice.to_string()),
            },
            Lexeme::Number => TokenKind::Number(slice.to_string()),
            Lexeme::Minus if !self.after_operand => match self.signed_number(span.end) {
                Some((text, end)) => {
                    self.pos = end;
                    self.after_operand = true;
                    return Ok(Some(Token::new(TokenKind::Number(text), span.start..end)));
                }
                None => TokenKind::Minus,
            },
            other => other.punct().unwrap_or(TokenKind::Minus),
        };

        self.after_operand = kind.ends_operand();
        Ok(Some(Token::new(kind, span)))
    }

    /// A digit directly after `-` makes the pair a single signed number.
    fn signed_number(&self, after_minus: usize) -> Option<(String, usize)> {
        if !self.source.as_bytes().get(after_minus)?.is_ascii_digit() {
            return None;
        }
        let mut lexer = Lexeme::lexer(&self.source[after_minus..]);
        match lexer.next() {
            Some(Ok(Lexeme::Number)) => {
                let end = after_minus + lexer.span().end;
                Some((format!("-{}", lexer.slice()), end))
            }
            _ => None,
        }
    }

    /// Scan a quoted string whose opening quote sits at `open`.
    ///
    /// Returns the unescaped body and the offset just past the closing quote.
    fn scan_string(&self, open: usize) -> Result<(String, usize), ScanError> {
        let quote = self.source.as_bytes()[open] as char;
        let mut body = String::new();
        let mut chars = self.source[open + 1..].char_indices();
        while let Some((i, c)) = chars.next() {
            if c == quote {
                return Ok((body, open + 1 + i + c.len_utf8()));
            }
            if c != '\\' {
                body.push(c);
                continue;
            }
            let Some((_, escaped)) = chars.next() else {
                break;
            };
            body.push(match escaped {
                '\\' => '\\',
                '"' => '"',
                '\'' => '\'',
                'r' => '\r',
                'n' => '\n',
                'b' => '\u{8}',
                found => {
                    return Err(ScanError::BadEscape {
                        offset: open + 1 + i,
                        found,
                    })
                }
            });
        }
        Err(ScanError::UnterminatedString { offset: open })
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, ScanError>;

    /// Yields tokens up to, but not including, `Eof`; stops after an error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.is_eof() => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_error(source: &str) -> ScanError {
        let mut scanner = Scanner::new(source);
        loop {
            match scanner.next_token() {
                Ok(token) if token.is_eof() => panic!("expected scan error for {source:?}"),
                Ok(_) => continue,
                Err(err) => return err,
            }
        }
    }

    #[test]
    fn test_trailing_dollar() {
        assert_eq!(
            first_error("Hello $"),
            ScanError::TrailingDollar { offset: 6 }
        );
    }

    #[test]
    fn test_dollar_followed_by_junk() {
        assert_eq!(
            first_error("a $1"),
            ScanError::UnexpectedAfterDollar {
                offset: 2,
                found: '1'
            }
        );
    }

    #[test]
    fn test_eof_in_expression() {
        assert!(matches!(
            first_error("${x"),
            ScanError::EofInExpression { .. }
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            first_error(r#"${"abc}"#),
            ScanError::UnterminatedString { offset: 2 }
        );
    }

    #[test]
    fn test_bad_escape() {
        assert_eq!(
            first_error(r#"${"a\qb"}"#),
            ScanError::BadEscape {
                offset: 4,
                found: 'q'
            }
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            first_error("${a # b}"),
            ScanError::UnexpectedInput {
                offset: 4,
                found: '#'
            }
        );
    }

    #[test]
    fn test_error_is_sticky() {
        let mut scanner = Scanner::new("$");
        let first = scanner.next_token().unwrap_err();
        assert_eq!(scanner.next_token().unwrap_err(), first);
    }

    #[test]
    fn test_text_before_error_is_kept() {
        let mut scanner = Scanner::new("ab $");
        let token = scanner.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Text("ab ".into()));
        assert_eq!(token.span, 0..3);
        assert_eq!(
            scanner.next_token().unwrap_err(),
            ScanError::TrailingDollar { offset: 3 }
        );
        assert!(scanner.next_token().is_err());

        let items: Vec<_> = Scanner::new("x $1").collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(ScanError::UnexpectedAfterDollar { offset: 2, found: '1' })
        ));
    }

    #[test]
    fn test_eof_repeats() {
        let mut scanner = Scanner::new("x");
        assert!(!scanner.next_token().unwrap().is_eof());
        assert!(scanner.next_token().unwrap().is_eof());
        assert!(scanner.next_token().unwrap().is_eof());
    }

    #[test]
    fn test_iterator_stops_before_eof() {
        let tokens: Vec<_> = Scanner::new("a${b}c").collect::<Result<_, _>>().unwrap();
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_adjacent_expressions() {
        let tokens: Vec<_> = Scanner::new("${a}${b}")
            .map(|t| t.unwrap().kind)
            .collect();
        assert_eq!(
            tokens,
            vec![TokenKind::Ident("a".into()), TokenKind::Ident("b".into())]
        );
    }
}
