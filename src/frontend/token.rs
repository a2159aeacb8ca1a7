//! Token definitions for Jane source text

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, span }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    /// fn
    Fn,
    /// let
    Let,
    /// mut
    Mut,
    /// const
    Const,
    /// if
    If,
    /// else
    Else,
    /// loop
    Loop,
    /// while
    While,
    /// for
    For,
    /// in
    In,
    /// return
    Return,
    /// match
    Match,
    /// struct
    Struct,
    /// impl
    Impl,
    /// enum
    Enum,
    /// trait
    Trait,
    /// type
    Type,
    /// unsafe
    Unsafe,
    /// break
    Break,
    /// continue
    Continue,
    /// goto
    Goto,
    /// fallthrough
    Fallthrough,
    /// true
    True,
    /// false
    False,
    /// nil
    Nil,
    /// as (cast)
    As,
    /// self (method receiver)
    SelfKw,

    // ============ Identifiers and Literals ============
    /// Identifier (variable name, type name, etc.)
    Ident(String),
    /// Integer literal
    IntLit(u64),
    /// Floating-point literal
    FloatLit(f64),
    /// String literal
    StringLit(String),
    /// Rune literal
    CharLit(char),

    // ============ Operators ============
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// ==
    EqEq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// &&
    AndAnd,
    /// ||
    OrOr,
    /// !
    Not,
    /// &
    And,
    /// |
    Or,
    /// ^
    Caret,
    /// ~
    Tilde,
    /// <<
    Shl,
    /// >>
    Shr,
    /// +=
    PlusEq,
    /// -=
    MinusEq,
    /// *=
    StarEq,
    /// /=
    SlashEq,
    /// %=
    PercentEq,
    /// &=
    AndEq,
    /// |=
    OrEq,
    /// ^=
    CaretEq,
    /// <<=
    ShlEq,
    /// >>=
    ShrEq,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// =>
    FatArrow,
    /// ->
    Arrow,
    /// .
    Dot,
    /// ...
    DotDotDot,
    /// ::
    ColonColon,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// ,
    Comma,
    /// :
    Colon,
    /// ;
    Semicolon,

    // ============ Special ============
    /// End of file
    Eof,
}

impl TokenKind {
    /// Try to convert an identifier to a keyword
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "fn" => Some(TokenKind::Fn),
            "let" => Some(TokenKind::Let),
            "mut" => Some(TokenKind::Mut),
            "const" => Some(TokenKind::Const),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "loop" => Some(TokenKind::Loop),
            "while" => Some(TokenKind::While),
            "for" => Some(TokenKind::For),
            "in" => Some(TokenKind::In),
            "return" => Some(TokenKind::Return),
            "match" => Some(TokenKind::Match),
            "struct" => Some(TokenKind::Struct),
            "impl" => Some(TokenKind::Impl),
            "enum" => Some(TokenKind::Enum),
            "trait" => Some(TokenKind::Trait),
            "type" => Some(TokenKind::Type),
            "unsafe" => Some(TokenKind::Unsafe),
            "break" => Some(TokenKind::Break),
            "continue" => Some(TokenKind::Continue),
            "goto" => Some(TokenKind::Goto),
            "fallthrough" => Some(TokenKind::Fallthrough),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "nil" => Some(TokenKind::Nil),
            "as" => Some(TokenKind::As),
            "self" => Some(TokenKind::SelfKw),
            _ => None,
        }
    }

    /// Get the precedence of a binary operator (for Pratt parsing)
    /// Returns None if not a binary operator
    pub fn binary_precedence(&self) -> Option<u8> {
        match self {
            // Logical OR (lowest)
            TokenKind::OrOr => Some(2),

            // Logical AND
            TokenKind::AndAnd => Some(3),

            // Bitwise OR
            TokenKind::Or => Some(4),

            // Bitwise XOR
            TokenKind::Caret => Some(5),

            // Bitwise AND
            TokenKind::And => Some(6),

            // Equality
            TokenKind::EqEq | TokenKind::Ne => Some(7),

            // Comparison
            TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => Some(8),

            // Shift
            TokenKind::Shl | TokenKind::Shr => Some(9),

            // Additive
            TokenKind::Plus | TokenKind::Minus => Some(10),

            // Multiplicative (highest for binary)
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(11),

            // Cast (as) - binds tighter than multiplication
            TokenKind::As => Some(12),

            _ => None,
        }
    }

    /// Whether this token is an assignment operator at statement level
    pub fn is_assign_op(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::AndEq
                | TokenKind::OrEq
                | TokenKind::CaretEq
                | TokenKind::ShlEq
                | TokenKind::ShrEq
        )
    }
}
