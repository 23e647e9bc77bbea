//! Precedence climbing for binary operators.

use super::super::{ParseError, TokenStream};
use super::atoms;
use tplexpr_ast::{BinaryOp, CompareOp, Node};
use tplexpr_lexer::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Infix {
    Or,
    And,
    Compare(CompareOp),
    Arith(BinaryOp),
}

/// Get binary operator metadata (precedence and operator).
///
/// Higher precedence binds tighter; every level is left associative.
fn infix_info(token: &TokenKind) -> Option<(u8, Infix)> {
    match token {
        TokenKind::OrOr => Some((10, Infix::Or)),
        TokenKind::AndAnd => Some((20, Infix::And)),
        TokenKind::EqEq => Some((30, Infix::Compare(CompareOp::Eq))),
        TokenKind::NotEq => Some((30, Infix::Compare(CompareOp::Ne))),
        TokenKind::Gt => Some((30, Infix::Compare(CompareOp::Gt))),
        TokenKind::GtEq => Some((30, Infix::Compare(CompareOp::Ge))),
        TokenKind::Lt => Some((30, Infix::Compare(CompareOp::Lt))),
        TokenKind::LtEq => Some((30, Infix::Compare(CompareOp::Le))),
        TokenKind::Plus => Some((40, Infix::Arith(BinaryOp::Add))),
        TokenKind::Minus => Some((40, Infix::Arith(BinaryOp::Sub))),
        TokenKind::Star => Some((50, Infix::Arith(BinaryOp::Mul))),
        TokenKind::Slash => Some((50, Infix::Arith(BinaryOp::Div))),
        _ => None,
    }
}

pub(super) fn parse_pratt(stream: &mut TokenStream, min_prec: u8) -> Result<Node, ParseError> {
    let mut left = atoms::parse_postfix(stream)?;
    // Precedence of the chain `left` was built into by this call, if any.
    let mut chain: Option<u8> = None;

    while let Some((prec, op)) = infix_info(stream.peek()) {
        if prec < min_prec {
            break;
        }
        stream.advance();
        let right = parse_pratt(stream, prec + 1)?;

        left = match (op, left) {
            (Infix::Or, Node::Or(mut operands)) if chain == Some(prec) => {
                operands.push(right);
                Node::Or(operands)
            }
            (Infix::Or, left) => Node::Or(vec![left, right]),
            (Infix::And, Node::And(mut operands)) if chain == Some(prec) => {
                operands.push(right);
                Node::And(operands)
            }
            (Infix::And, left) => Node::And(vec![left, right]),
            (Infix::Compare(op), left) => Node::Compare {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            },
            (Infix::Arith(op), Node::Binary { first, mut rest }) if chain == Some(prec) => {
                rest.push((op, right));
                Node::Binary { first, rest }
            }
            (Infix::Arith(op), left) => Node::Binary {
                first: Box::new(left),
                rest: vec![(op, right)],
            },
        };
        chain = Some(prec);
    }

    Ok(left)
}
