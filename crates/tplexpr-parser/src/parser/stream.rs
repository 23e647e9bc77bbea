//! Buffered token stream over the scanner.

use super::ParseError;
use std::collections::VecDeque;
use std::ops::Range;
use tplexpr_lexer::{Keyword, ScanError, Scanner, Token, TokenKind};

/// Token stream with unbounded lookahead.
///
/// Tokens are pulled from the [`Scanner`] on demand and kept in a buffer
/// until consumed. A scan error ends the stream: from then on the stream
/// reports end of input, and every error built through
/// [`TokenStream::unexpected`] is replaced by the scan error, which is what
/// the caller gets to see.
pub struct TokenStream<'src> {
    scanner: Scanner<'src>,
    buffer: VecDeque<Token>,
    /// Added to every span, for strings parsed out of an enclosing template
    base: usize,
    scan_error: Option<ScanError>,
    /// End of the last consumed token
    last_end: usize,
}

impl<'src> TokenStream<'src> {
    pub fn new(source: &'src str, base: usize) -> Self {
        Self {
            scanner: Scanner::new(source),
            buffer: VecDeque::new(),
            base,
            scan_error: None,
            last_end: base,
        }
    }

    /// Make sure at least `n + 1` tokens are buffered.
    fn fill(&mut self, n: usize) {
        while self.buffer.len() <= n {
            if self.buffer.back().is_some_and(Token::is_eof) {
                let eof = self.buffer.back().cloned();
                self.buffer.extend(eof);
                continue;
            }
            let token = match self.scanner.next_token() {
                Ok(token) => token,
                Err(err) => {
                    let at = self.base + err.offset();
                    self.scan_error = Some(err);
                    Token::new(TokenKind::Eof, at..at)
                }
            };
            let span = token.span.start + self.base..token.span.end + self.base;
            self.buffer.push_back(Token::new(token.kind, span));
        }
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&mut self) -> &TokenKind {
        self.peek_nth(0)
    }

    /// Peek at the nth token ahead without consuming.
    pub fn peek_nth(&mut self, n: usize) -> &TokenKind {
        self.fill(n);
        &self.buffer[n].kind
    }

    /// Consume and return the current token.
    pub fn advance(&mut self) -> Token {
        self.fill(0);
        let token = self
            .buffer
            .pop_front()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, self.last_end..self.last_end));
        self.last_end = token.span.end;
        token
    }

    /// Check whether the current token has the same kind as `expected`
    /// (payloads are ignored).
    pub fn check(&mut self, expected: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(expected)
    }

    pub fn check_keyword(&mut self, kw: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    /// Consume `expected` or fail listing it as the expected token.
    pub fn expect(&mut self, expected: TokenKind) -> Result<Range<usize>, ParseError> {
        if self.check(&expected) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&[&expected.to_string()]))
        }
    }

    pub fn expect_keyword(&mut self, kw: Keyword) -> Result<Range<usize>, ParseError> {
        if self.check_keyword(kw) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&[&format!("`{kw}`")]))
        }
    }

    /// Consume an identifier and return its name.
    pub fn expect_ident(&mut self) -> Result<String, ParseError> {
        if matches!(self.peek(), TokenKind::Ident(_)) {
            if let TokenKind::Ident(name) = self.advance().kind {
                return Ok(name);
            }
        }
        Err(self.unexpected(&["identifier"]))
    }

    /// Consume an attribute name: an identifier or a list index.
    pub fn expect_attr_name(&mut self) -> Result<String, ParseError> {
        let is_index = matches!(
            self.peek(),
            TokenKind::Number(n) if n.bytes().all(|b| b.is_ascii_digit())
        );
        if is_index {
            if let TokenKind::Number(index) = self.advance().kind {
                return Ok(index);
            }
        }
        if matches!(self.peek(), TokenKind::Ident(_)) {
            return self.expect_ident();
        }
        Err(self.unexpected(&["identifier", "index"]))
    }

    /// Build an error for the current token, naming the expected set.
    ///
    /// Returns the pending scan error instead, if there is one.
    pub fn unexpected(&mut self, expected: &[&str]) -> ParseError {
        self.fill(0);
        if let Some(err) = &self.scan_error {
            return ParseError::scan(err, self.base);
        }
        let token = &self.buffer[0];
        ParseError::unexpected_token(&token.kind, expected, token.span.clone())
    }

    /// Byte span of the current token.
    pub fn current_span(&mut self) -> Range<usize> {
        self.fill(0);
        self.buffer[0].span.clone()
    }

    /// Span from `start` to the end of the last consumed token.
    pub fn span_from(&self, start: usize) -> Range<usize> {
        start..self.last_end.max(start)
    }

    /// Take the scan error that ended this stream, if any.
    pub fn finish(self) -> Result<(), ParseError> {
        match &self.scan_error {
            Some(err) => Err(ParseError::scan(err, self.base)),
            None => Ok(()),
        }
    }
}
