//! Keyword statements.
//!
//! Every statement with a body needs its explicit closer; bodies are
//! sequences, so they may freely mix text and expressions:
//!
//! ```text
//! ${if user then}Hi $user${else}Hi stranger${endif}
//! ${for x in items do}<li>$x</li>${endfor}
//! ${block(row, cells)}<tr>$cells</tr>${endblock}
//! ```

use super::expr::{parse_expr, parse_call_args};
use super::{parse_sequence, ParseError, TokenStream};
use tplexpr_ast::{IfBranch, IncludeTarget, Node, ObjectKey, Subprog};
use tplexpr_lexer::{Keyword, TokenKind};

/// `if c then ... (elseif c then ...)* (else ...)? endif`
pub(super) fn parse_if(stream: &mut TokenStream) -> Result<Node, ParseError> {
    stream.expect_keyword(Keyword::If)?;
    let mut branches = Vec::new();
    let mut else_body = None;

    loop {
        let cond = parse_expr(stream)?;
        stream.expect_keyword(Keyword::Then)?;
        let body = parse_sequence(stream)?;
        branches.push(IfBranch { cond, body });

        match stream.peek() {
            TokenKind::Keyword(Keyword::ElseIf) => {
                stream.advance();
            }
            TokenKind::Keyword(Keyword::Else) => {
                stream.advance();
                else_body = Some(Box::new(parse_sequence(stream)?));
                if matches!(
                    stream.peek(),
                    TokenKind::Keyword(Keyword::Else | Keyword::ElseIf)
                ) {
                    let span = stream.current_span();
                    return Err(ParseError::invalid_syntax(
                        "duplicate `else` in `if`",
                        span,
                    ));
                }
                stream.expect_keyword(Keyword::EndIf)?;
                break;
            }
            TokenKind::Keyword(Keyword::EndIf) => {
                stream.advance();
                break;
            }
            _ => return Err(stream.unexpected(&["`elseif`", "`else`", "`endif`"])),
        }
    }

    Ok(Node::If {
        branches,
        else_body,
    })
}

/// `for var in iterable do ... endfor`
pub(super) fn parse_for(stream: &mut TokenStream) -> Result<Node, ParseError> {
    stream.expect_keyword(Keyword::For)?;
    let var = stream.expect_ident()?;
    stream.expect_keyword(Keyword::In)?;
    let iterable = Box::new(parse_expr(stream)?);
    stream.expect_keyword(Keyword::Do)?;
    let body = Box::new(parse_sequence(stream)?);
    stream.expect_keyword(Keyword::EndFor)?;
    Ok(Node::For {
        var,
        iterable,
        body,
    })
}

/// `block(name, params...) ... endblock`, or the same with `template`.
pub(super) fn parse_block(stream: &mut TokenStream) -> Result<Node, ParseError> {
    let closer = match stream.peek() {
        TokenKind::Keyword(Keyword::Template) => Keyword::EndTemplate,
        _ => Keyword::EndBlock,
    };
    stream.advance();

    stream.expect(TokenKind::LParen)?;
    let name = stream.expect_ident()?;
    let mut params = Vec::new();
    while stream.check(&TokenKind::Comma) {
        stream.advance();
        params.push(stream.expect_ident()?);
    }
    if !stream.check(&TokenKind::RParen) {
        return Err(stream.unexpected(&["`,`", "`)`"]));
    }
    stream.advance();

    let body = parse_sequence(stream)?;
    stream.expect_keyword(closer)?;
    Ok(Node::Block {
        name,
        subprog: Subprog {
            params,
            body: Box::new(body),
        },
    })
}

/// `declare(name, value)`
pub(super) fn parse_declare(stream: &mut TokenStream) -> Result<Node, ParseError> {
    stream.expect_keyword(Keyword::Declare)?;
    stream.expect(TokenKind::LParen)?;
    let name = stream.expect_ident()?;
    stream.expect(TokenKind::Comma)?;
    let value = Box::new(parse_expr(stream)?);
    stream.expect(TokenKind::RParen)?;
    Ok(Node::Declare { name, value })
}

/// `include(name)`; a literal name is resolved statically.
pub(super) fn parse_include(stream: &mut TokenStream) -> Result<Node, ParseError> {
    stream.expect_keyword(Keyword::Include)?;
    let span = stream.current_span();
    let mut args = parse_call_args(stream)?;
    if args.len() != 1 {
        return Err(ParseError::invalid_syntax(
            format!("`include` takes one argument, found {}", args.len()),
            stream.span_from(span.start),
        ));
    }
    let target = match args.remove(0) {
        Node::Text(name) => IncludeTarget::Static(name),
        dynamic => IncludeTarget::Dynamic(Box::new(dynamic)),
    };
    Ok(Node::Include(target))
}

/// `discard ... enddiscard`
pub(super) fn parse_discard(stream: &mut TokenStream) -> Result<Node, ParseError> {
    stream.expect_keyword(Keyword::Discard)?;
    let body = parse_sequence(stream)?;
    stream.expect_keyword(Keyword::EndDiscard)?;
    Ok(Node::Discard(Box::new(body)))
}

/// `object(k => v, ...)` or `object(base, k => v, ...)`
pub(super) fn parse_object(stream: &mut TokenStream) -> Result<Node, ParseError> {
    stream.expect_keyword(Keyword::Object)?;
    stream.expect(TokenKind::LParen)?;
    let mut base = None;
    let mut keys = Vec::new();

    while !stream.check(&TokenKind::RParen) {
        let is_key = matches!(stream.peek(), TokenKind::Ident(_) | TokenKind::Str(_))
            && matches!(stream.peek_nth(1), TokenKind::Arrow);

        if is_key {
            let key = match stream.advance().kind {
                TokenKind::Ident(key) | TokenKind::Str(key) => key,
                _ => String::new(),
            };
            stream.advance();
            let value = parse_expr(stream)?;
            keys.push(ObjectKey { key, value });
        } else if base.is_none() && keys.is_empty() {
            base = Some(Box::new(parse_expr(stream)?));
        } else {
            return Err(stream.unexpected(&["`key => value`"]));
        }

        if stream.check(&TokenKind::Comma) {
            stream.advance();
        } else if !stream.check(&TokenKind::RParen) {
            return Err(stream.unexpected(&["`,`", "`)`"]));
        }
    }
    stream.advance();

    Ok(Node::Object { base, keys })
}
