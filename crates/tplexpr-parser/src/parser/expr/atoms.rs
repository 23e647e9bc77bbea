//! Atomic expressions and postfix chains.

use super::super::{parse_at, parse_sequence, stmt, ParseError, TokenStream};
use super::{parse_call_args, parse_expr};
use tplexpr_ast::{Node, Subprog};
use tplexpr_lexer::{Keyword, TokenKind};

/// Parse an atom followed by any number of calls and attribute accesses.
///
/// `f(args)` names a call, `(expr)(args)` is a dynamic call,
/// `recv.name(args)` calls `name` with the receiver prepended and
/// `recv.name` reads an attribute. Literal text never starts a chain.
pub(super) fn parse_postfix(stream: &mut TokenStream) -> Result<Node, ParseError> {
    if matches!(stream.peek(), TokenKind::Text(_)) {
        return parse_atom(stream);
    }
    let mut node = parse_atom(stream)?;

    loop {
        match stream.peek() {
            TokenKind::LParen => {
                let args = parse_call_args(stream)?;
                node = match node {
                    Node::Var(name) => Node::Call { name, args },
                    callee => Node::DynCall {
                        callee: Box::new(callee),
                        args,
                    },
                };
            }
            TokenKind::Dot => {
                stream.advance();
                let name = stream.expect_attr_name()?;
                if stream.check(&TokenKind::LParen) {
                    let mut args = parse_call_args(stream)?;
                    args.insert(0, node);
                    node = Node::Call { name, args };
                } else {
                    node = Node::Attr {
                        receiver: Box::new(node),
                        name,
                    };
                }
            }
            _ => return Ok(node),
        }
    }
}

/// Parse atomic expressions (literals, variables, groups, closures, statements).
fn parse_atom(stream: &mut TokenStream) -> Result<Node, ParseError> {
    match stream.peek() {
        TokenKind::Text(_) | TokenKind::Number(_) => Ok(match stream.advance().kind {
            TokenKind::Number(n) => Node::Number(n),
            TokenKind::Text(text) => Node::Text(text),
            _ => Node::Text(String::new()),
        }),
        TokenKind::Str(_) => {
            let token = stream.advance();
            match token.kind {
                TokenKind::Str(body) => parse_at(&body, token.span.start + 1),
                _ => Ok(Node::Text(String::new())),
            }
        }
        TokenKind::Ident(_) => parse_identifier(stream),
        TokenKind::LParen => parse_parenthesized(stream),
        TokenKind::Keyword(kw) => {
            let kw = *kw;
            match kw {
                Keyword::If => stmt::parse_if(stream),
                Keyword::For => stmt::parse_for(stream),
                Keyword::Block | Keyword::Template => stmt::parse_block(stream),
                Keyword::Declare => stmt::parse_declare(stream),
                Keyword::Include => stmt::parse_include(stream),
                Keyword::Discard => stmt::parse_discard(stream),
                Keyword::Object => stmt::parse_object(stream),
                Keyword::Break => {
                    stream.advance();
                    Ok(Node::Break)
                }
                Keyword::Continue => {
                    stream.advance();
                    Ok(Node::Continue)
                }
                _ => Err(stream.unexpected(&["expression"])),
            }
        }
        _ => Err(stream.unexpected(&["expression"])),
    }
}

/// `name`, `name := value` or `name = value`.
fn parse_identifier(stream: &mut TokenStream) -> Result<Node, ParseError> {
    let binding = match stream.peek_nth(1) {
        TokenKind::ColonEq => Some(true),
        TokenKind::Assign => Some(false),
        _ => None,
    };
    let name = stream.expect_ident()?;
    let Some(declare) = binding else {
        return Ok(Node::Var(name));
    };

    stream.advance();
    let value = Box::new(parse_expr(stream)?);
    Ok(if declare {
        Node::Declare { name, value }
    } else {
        Node::Assign { name, value }
    })
}

/// Find the token right after the `)` matching the `(` at the front of the
/// stream, without consuming anything.
fn token_after_group(stream: &mut TokenStream) -> Result<TokenKind, ParseError> {
    let mut depth = 0usize;
    let mut i = 0;
    loop {
        match stream.peek_nth(i) {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Ok(stream.peek_nth(i + 1).clone());
                }
            }
            TokenKind::Eof => {
                // Report at the end of input, not at the `(`.
                for _ in 0..i {
                    stream.advance();
                }
                return Err(stream.unexpected(&["`)`"]));
            }
            _ => {}
        }
        i += 1;
    }
}

/// `(expr...)` grouping or a `(params) => "body"` closure.
fn parse_parenthesized(stream: &mut TokenStream) -> Result<Node, ParseError> {
    if matches!(token_after_group(stream)?, TokenKind::Arrow) {
        return parse_closure(stream);
    }

    stream.expect(TokenKind::LParen)?;
    let inner = parse_sequence(stream)?;
    stream.expect(TokenKind::RParen)?;
    Ok(inner)
}

fn parse_closure(stream: &mut TokenStream) -> Result<Node, ParseError> {
    stream.expect(TokenKind::LParen)?;
    let mut params = Vec::new();
    while !stream.check(&TokenKind::RParen) {
        params.push(stream.expect_ident()?);
        if stream.check(&TokenKind::Comma) {
            stream.advance();
        } else if !stream.check(&TokenKind::RParen) {
            return Err(stream.unexpected(&["`,`", "`)`"]));
        }
    }
    stream.advance();
    stream.expect(TokenKind::Arrow)?;

    if !matches!(stream.peek(), TokenKind::Str(_)) {
        return Err(stream.unexpected(&["string"]));
    }
    let token = stream.advance();
    let body = match token.kind {
        TokenKind::Str(body) => parse_at(&body, token.span.start + 1)?,
        _ => Node::Text(String::new()),
    };
    Ok(Node::Subprog(Subprog {
        params,
        body: Box::new(body),
    }))
}
