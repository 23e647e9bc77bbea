// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Hand-written recursive descent parser for tplexpr templates.
//!
//! ```
//! use tplexpr_ast::Node;
//!
//! let tree = tplexpr_parser::parse("Hello $name").unwrap();
//! assert_eq!(
//!     tree,
//!     Node::Compound(vec![Node::Text("Hello ".into()), Node::Var("name".into())])
//! );
//! ```

pub mod parser;

pub use parser::{parse, ParseError, ParseErrorKind};

// Re-export the tree and token types so callers need only this crate
pub use tplexpr_ast as ast;
pub use tplexpr_lexer::{Keyword, ScanError, Token, TokenKind};
