//! Engine errors

use thiserror::Error;
use tplexpr_parser::ParseError;

use crate::value::{Kind, ITER_LIST_LIMIT};

/// Engine result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while compiling or evaluating templates
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error("name '{name}' is not defined")]
    Name { name: String },

    #[error("type error: can not {op} {from} to {to}")]
    Type {
        op: &'static str,
        from: Kind,
        to: Kind,
    },

    #[error("create template '{0}': template exists already")]
    TemplateExists(String),

    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    #[error("iterator to list limit of {ITER_LIST_LIMIT} values exhausted")]
    IterListLimit,

    #[error("output filter failed: {0}")]
    Filter(String),

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("syntax error: `{0}` outside of a for loop body")]
    LoopControl(&'static str),

    #[error("render deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Host(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// A failed conversion of a `from` value into `to`.
    pub fn convert(from: Kind, to: Kind) -> Self {
        Error::Type {
            op: "convert",
            from,
            to,
        }
    }

    /// Error raised by host code (builtins, hooks, bridged values).
    pub fn host(message: impl Into<String>) -> Self {
        Error::Host(message.into())
    }
}
