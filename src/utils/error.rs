//! Fatal front-end errors
//!
//! Only problems that make a file unusable live here. Semantic problems are
//! reported as `sema::Diagnostic` values and never abort analysis.

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal front-end error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Lexer Errors ====================

    #[error("undefined code content: {ch}")]
    InvalidToken { ch: char, span: Span },

    #[error("string is not finished")]
    UnterminatedString { span: Span },

    #[error("rune is not finished")]
    UnterminatedRune { span: Span },

    #[error("missing block comment close")]
    UnterminatedComment { span: Span },

    // ==================== Parser Errors ====================

    #[error("invalid syntax: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("expected identifier")]
    ExpectedIdent { span: Span },

    #[error("expected data-type")]
    ExpectedType { span: Span },

    #[error("expected expression")]
    ExpectedExpr { span: Span },

    #[error("invalid operator")]
    InvalidOperator { span: Span },
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Span {
        match self {
            Self::InvalidToken { span, .. } => *span,
            Self::UnterminatedString { span } => *span,
            Self::UnterminatedRune { span } => *span,
            Self::UnterminatedComment { span } => *span,
            Self::UnexpectedToken { span, .. } => *span,
            Self::ExpectedIdent { span } => *span,
            Self::ExpectedType { span } => *span,
            Self::ExpectedExpr { span } => *span,
            Self::InvalidOperator { span } => *span,
        }
    }
}
