//! Hand-written recursive descent parser for tplexpr templates.
//!
//! ## Architecture
//!
//! - `stream`: [`TokenStream`] over the scanner with unbounded lookahead
//! - `error`: [`ParseError`] and its kinds
//! - `expr`: operator precedence, postfix chains and atoms
//! - `stmt`: keyword statements (`if`, `for`, `block`, `declare`, ...)
//!
//! A template is a *sequence*: text and expressions one after another until
//! end of input or a token that closes an enclosing construct. Quoted strings
//! are parsed as templates of their own by a fresh stream over the string
//! body.

mod error;
mod expr;
mod stmt;
mod stream;

pub use error::{ParseError, ParseErrorKind};
use stream::TokenStream;

use tplexpr_ast::Node;
use tplexpr_lexer::{Keyword, TokenKind};

/// Parse a complete template.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    parse_at(source, 0)
}

/// Parse a template whose text starts at byte `base` of a larger source.
pub(crate) fn parse_at(source: &str, base: usize) -> Result<Node, ParseError> {
    let mut stream = TokenStream::new(source, base);
    let result = parse_sequence(&mut stream).and_then(|node| {
        if matches!(stream.peek(), TokenKind::Eof) {
            Ok(node)
        } else {
            Err(stream.unexpected(&["end of input"]))
        }
    });
    match result {
        Ok(node) => stream.finish().map(|_| node),
        Err(err) => Err(err),
    }
}

/// Tokens at which a sequence stops; the enclosing construct decides
/// whether they are acceptable there.
fn ends_sequence(token: &TokenKind) -> bool {
    match token {
        TokenKind::Eof | TokenKind::RParen | TokenKind::Comma => true,
        TokenKind::Keyword(kw) => matches!(
            kw,
            Keyword::EndBlock
                | Keyword::EndTemplate
                | Keyword::Then
                | Keyword::ElseIf
                | Keyword::Else
                | Keyword::EndIf
                | Keyword::In
                | Keyword::Do
                | Keyword::EndFor
                | Keyword::EndDiscard
        ),
        _ => false,
    }
}

/// Parse nodes until a sequence-ending token.
pub(crate) fn parse_sequence(stream: &mut TokenStream) -> Result<Node, ParseError> {
    let mut nodes = Vec::new();
    while !ends_sequence(stream.peek()) {
        nodes.push(expr::parse_expr(stream)?);
    }
    Ok(Node::sequence(nodes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_template() {
        assert_eq!(parse("").unwrap(), Node::Text(String::new()));
    }

    #[test]
    fn test_single_node_is_unwrapped() {
        assert_eq!(parse("hello").unwrap(), Node::Text("hello".into()));
    }

    #[test]
    fn test_stray_closer_at_top_level() {
        let err = parse("${endif}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
        assert!(err.message.contains("end of input"), "{}", err.message);
    }

    #[test]
    fn test_scan_error_wins() {
        let err = parse("Hello $").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Scan(_)));
        assert_eq!(err.span, 6..6);
    }
}
