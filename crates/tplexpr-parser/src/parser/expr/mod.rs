//! Expression parser.
//!
//! ## Precedence Levels (loosest to tightest)
//!
//! 1. `||` - flattened into one [`Node::Or`]
//! 2. `&&` - flattened into one [`Node::And`]
//! 3. `==`, `!=`, `>`, `>=`, `<`, `<=` - left associative
//! 4. `+`, `-` - one left-associative [`Node::Binary`] chain
//! 5. `*`, `/` - one left-associative [`Node::Binary`] chain
//! 6. Postfix: `(args)`, `.name`, `.name(args)`
//!
//! ## Module Organization
//!
//! - `pratt` - precedence climbing over the binary operators
//! - `atoms` - literals, variables, groups, closures and postfix chains

mod atoms;
mod pratt;

use super::{ParseError, TokenStream};
use tplexpr_ast::Node;
use tplexpr_lexer::TokenKind;

/// Parse one expression.
pub(super) fn parse_expr(stream: &mut TokenStream) -> Result<Node, ParseError> {
    pratt::parse_pratt(stream, 0)
}

/// Parse a parenthesised, comma separated argument list.
pub(super) fn parse_call_args(stream: &mut TokenStream) -> Result<Vec<Node>, ParseError> {
    stream.expect(TokenKind::LParen)?;
    let mut args = Vec::new();

    if !stream.check(&TokenKind::RParen) {
        loop {
            args.push(parse_expr(stream)?);
            if stream.check(&TokenKind::Comma) {
                stream.advance();
            } else {
                break;
            }
        }
    }

    if !stream.check(&TokenKind::RParen) {
        return Err(stream.unexpected(&["`,`", "`)`"]));
    }
    stream.advance();
    Ok(args)
}
