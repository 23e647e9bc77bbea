// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for tplexpr templates.
//!
//! A template is literal text with embedded expressions. The [`Scanner`]
//! walks the source once and switches between three modes:
//!
//! - **text**: copies bytes verbatim into a [`TokenKind::Text`] token until a `$`
//! - **expr**: entered by `${`, produces punctuation, keywords, identifiers,
//!   numbers and strings until `}` (or `%}`, which also swallows following
//!   whitespace)
//! - **bare-var**: entered by `$name`, produces a single identifier
//!
//! Expression punctuation is matched with logos; keywords are resolved
//! through [`Keyword::lookup`] so that they stay ordinary identifiers in
//! bare-var mode.
//!
//! # Examples
//!
//! ```
//! # use tplexpr_lexer::{Scanner, TokenKind};
//! let mut scanner = Scanner::new("Hello $name!");
//! assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Text("Hello ".into()));
//! assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Ident("name".into()));
//! ```

mod scanner;

pub use scanner::{ScanError, Scanner};

use logos::Logos;
use std::fmt;
use std::ops::Range;

/// A scanned token together with its byte span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What was scanned
    pub kind: TokenKind,
    /// Byte range in the scanned input
    pub span: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Token kinds produced by the [`Scanner`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Literal template text (escapes such as `$$` already resolved)
    Text(String),
    /// Identifier (`name`, also every bare `$name`)
    Ident(String),
    /// Reserved word inside `${ ... }`
    Keyword(Keyword),
    /// Numeric literal, kept as written (may carry a leading `-`)
    Number(String),
    /// Quoted string literal with escapes resolved
    Str(String),

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `=`
    Assign,
    /// `=>`
    Arrow,
    /// `:`
    Colon,
    /// `:=`
    ColonEq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,

    /// End of input (only produced in text mode)
    Eof,
}

impl TokenKind {
    /// True for tokens after which a binary operator, not an operand, is expected.
    pub(crate) fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident(_) | TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::RParen
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Text(_) => write!(f, "text"),
            TokenKind::Ident(name) => write!(f, "identifier `{name}`"),
            TokenKind::Keyword(kw) => write!(f, "`{kw}`"),
            TokenKind::Number(n) => write!(f, "number `{n}`"),
            TokenKind::Str(_) => write!(f, "string"),
            TokenKind::LParen => write!(f, "`(`"),
            TokenKind::RParen => write!(f, "`)`"),
            TokenKind::Dot => write!(f, "`.`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Assign => write!(f, "`=`"),
            TokenKind::Arrow => write!(f, "`=>`"),
            TokenKind::Colon => write!(f, "`:`"),
            TokenKind::ColonEq => write!(f, "`:=`"),
            TokenKind::EqEq => write!(f, "`==`"),
            TokenKind::NotEq => write!(f, "`!=`"),
            TokenKind::Gt => write!(f, "`>`"),
            TokenKind::GtEq => write!(f, "`>=`"),
            TokenKind::Lt => write!(f, "`<`"),
            TokenKind::LtEq => write!(f, "`<=`"),
            TokenKind::AndAnd => write!(f, "`&&`"),
            TokenKind::OrOr => write!(f, "`||`"),
            TokenKind::Plus => write!(f, "`+`"),
            TokenKind::Minus => write!(f, "`-`"),
            TokenKind::Star => write!(f, "`*`"),
            TokenKind::Slash => write!(f, "`/`"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// Reserved words of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Block,
    EndBlock,
    Template,
    EndTemplate,
    If,
    Then,
    ElseIf,
    Else,
    EndIf,
    For,
    In,
    Do,
    EndFor,
    Break,
    Continue,
    Declare,
    Include,
    Discard,
    EndDiscard,
    Object,
}

/// Keyword table, the single source of truth for keyword spelling.
const KEYWORDS: &[(&str, Keyword)] = &[
    ("block", Keyword::Block),
    ("endblock", Keyword::EndBlock),
    ("template", Keyword::Template),
    ("endtemplate", Keyword::EndTemplate),
    ("if", Keyword::If),
    ("then", Keyword::Then),
    ("elseif", Keyword::ElseIf),
    ("else", Keyword::Else),
    ("endif", Keyword::EndIf),
    ("for", Keyword::For),
    ("in", Keyword::In),
    ("do", Keyword::Do),
    ("endfor", Keyword::EndFor),
    ("break", Keyword::Break),
    ("continue", Keyword::Continue),
    ("declare", Keyword::Declare),
    ("include", Keyword::Include),
    ("discard", Keyword::Discard),
    ("enddiscard", Keyword::EndDiscard),
    ("object", Keyword::Object),
];

impl Keyword {
    /// Resolve an identifier to a keyword, if it is one.
    pub fn lookup(ident: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(text, _)| *text == ident)
            .map(|(_, kw)| *kw)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map(|(text, _)| *text)
            .unwrap_or("?")
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expression-mode lexemes recognised by logos.
///
/// Strings are only *started* here (`Quote`); their body, escapes and
/// termination are handled by the scanner so that each failure gets its own
/// error.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub(crate) enum Lexeme {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("=")]
    Assign,
    #[token("=>")]
    Arrow,
    #[token(":")]
    Colon,
    #[token(":=")]
    ColonEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("}")]
    Close,
    #[token("%}")]
    CloseTrim,
    #[token("\"")]
    #[token("'")]
    Quote,
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,
}

impl Lexeme {
    /// Map a punctuation lexeme onto its token kind.
    ///
    /// Returns `None` for lexemes carrying text or switching modes.
    pub(crate) fn punct(self) -> Option<TokenKind> {
        let kind = match self {
            Lexeme::LParen => TokenKind::LParen,
            Lexeme::RParen => TokenKind::RParen,
            Lexeme::Dot => TokenKind::Dot,
            Lexeme::Comma => TokenKind::Comma,
            Lexeme::Assign => TokenKind::Assign,
            Lexeme::Arrow => TokenKind::Arrow,
            Lexeme::Colon => TokenKind::Colon,
            Lexeme::ColonEq => TokenKind::ColonEq,
            Lexeme::EqEq => TokenKind::EqEq,
            Lexeme::NotEq => TokenKind::NotEq,
            Lexeme::Gt => TokenKind::Gt,
            Lexeme::GtEq => TokenKind::GtEq,
            Lexeme::Lt => TokenKind::Lt,
            Lexeme::LtEq => TokenKind::LtEq,
            Lexeme::AndAnd => TokenKind::AndAnd,
            Lexeme::OrOr => TokenKind::OrOr,
            Lexeme::Plus => TokenKind::Plus,
            Lexeme::Minus => TokenKind::Minus,
            Lexeme::Star => TokenKind::Star,
            Lexeme::Slash => TokenKind::Slash,
            Lexeme::Close
            | Lexeme::CloseTrim
            | Lexeme::Quote
            | Lexeme::Ident
            | Lexeme::Number => return None,
        };
        Some(kind)
    }
}

/// Scan a whole template, stopping at the first error.
///
/// The returned vector always ends with an [`TokenKind::Eof`] token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScanError> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token()?;
        let eof = token.is_eof();
        tokens.push(token);
        if eof {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("scan failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn text(s: &str) -> TokenKind {
        TokenKind::Text(s.to_string())
    }

    fn ident(s: &str) -> TokenKind {
        TokenKind::Ident(s.to_string())
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(kinds("Hello World"), vec![text("Hello World"), TokenKind::Eof]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_bare_var() {
        assert_eq!(
            kinds("Hello $World!"),
            vec![text("Hello "), ident("World"), text("!"), TokenKind::Eof]
        );
        assert_eq!(kinds("$Hello"), vec![ident("Hello"), TokenKind::Eof]);
    }

    #[test]
    fn test_bare_var_is_never_keyword() {
        assert_eq!(kinds("$if"), vec![ident("if"), TokenKind::Eof]);
    }

    #[test]
    fn test_dollar_escape() {
        assert_eq!(kinds("cost: $$5"), vec![text("cost: $5"), TokenKind::Eof]);
    }

    #[test]
    fn test_expression_tokens() {
        assert_eq!(
            kinds(r#"${v."$it"}"#),
            vec![
                ident("v"),
                TokenKind::Dot,
                TokenKind::Str("$it".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_bare_var_followed_by_text_dot() {
        assert_eq!(
            kinds(r#"$v."$it""#),
            vec![ident("v"), text(".\""), ident("it"), text("\""), TokenKind::Eof]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("${for x in xs do x endfor}"),
            vec![
                TokenKind::Keyword(Keyword::For),
                ident("x"),
                TokenKind::Keyword(Keyword::In),
                ident("xs"),
                TokenKind::Keyword(Keyword::Do),
                ident("x"),
                TokenKind::Keyword(Keyword::EndFor),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("${== != > >= < <= && || + - * / => := = :}"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Arrow,
                TokenKind::ColonEq,
                TokenKind::Assign,
                TokenKind::Colon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("${1 2.5 6e3 1.5E-2}"),
            vec![
                TokenKind::Number("1".into()),
                TokenKind::Number("2.5".into()),
                TokenKind::Number("6e3".into()),
                TokenKind::Number("1.5E-2".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_signed_number_only_in_operand_position() {
        assert_eq!(
            kinds("${f(0, -1)}"),
            vec![
                ident("f"),
                TokenKind::LParen,
                TokenKind::Number("0".into()),
                TokenKind::Comma,
                TokenKind::Number("-1".into()),
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds("${2 -1}"),
            vec![
                TokenKind::Number("2".into()),
                TokenKind::Minus,
                TokenKind::Number("1".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"${"a\"b\\c\n" 'it\'s'}"#),
            vec![
                TokenKind::Str("a\"b\\c\n".into()),
                TokenKind::Str("it's".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_close_trim_swallows_whitespace() {
        assert_eq!(
            kinds("${x %}  \n Hello"),
            vec![ident("x"), text("Hello"), TokenKind::Eof]
        );
        assert_eq!(
            kinds("${x}  Hello"),
            vec![ident("x"), text("  Hello"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("ab${cd}").unwrap();
        assert_eq!(tokens[0].span, 0..2);
        assert_eq!(tokens[1].span, 4..6);
    }

    #[test]
    fn test_keyword_table_round_trip() {
        for (text, kw) in KEYWORDS {
            assert_eq!(Keyword::lookup(text), Some(*kw));
            assert_eq!(kw.as_str(), *text);
        }
        assert_eq!(Keyword::lookup("name"), None);
    }
}
