//! Lexer for Jane source text
//!
//! Converts source code into a stream of tokens. Spans are character offsets.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    /// File ID for span tracking
    file_id: usize,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str, file_id: usize) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            file_id,
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    /// Consume the next character if it matches
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.file_id)
    }

    /// Create a token with the current span
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span())
    }

    /// Skip whitespace and comments
    fn skip_whitespace(&mut self) -> Result<()> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                // Line comment
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                // Block comment
                '/' if self.peek_next() == Some('*') => {
                    let open = self.pos;
                    self.advance();
                    self.advance();
                    let mut depth = 1;
                    while depth > 0 {
                        match (self.peek(), self.peek_next()) {
                            (None, _) => {
                                return Err(Error::UnterminatedComment {
                                    span: Span::new(open, open + 2, self.file_id),
                                });
                            }
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                depth -= 1;
                            }
                            (Some('/'), Some('*')) => {
                                self.advance();
                                self.advance();
                                depth += 1;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));
        self.make_token(kind)
    }

    fn read_digits(&mut self, radix: u32) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_digit(radix) {
                digits.push(c);
                self.advance();
            } else if c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    /// Read a number literal (integer or float)
    fn read_number(&mut self) -> Token {
        if self.peek() == Some('0') {
            let radix = match self.peek_next() {
                Some('x') | Some('X') => 16,
                Some('b') | Some('B') => 2,
                Some('o') | Some('O') => 8,
                _ => 10,
            };
            if radix != 10 {
                self.advance();
                self.advance();
                let digits = self.read_digits(radix);
                let value = u64::from_str_radix(&digits, radix).unwrap_or(u64::MAX);
                return self.make_token(TokenKind::IntLit(value));
            }
        }

        let mut text = self.read_digits(10);
        let mut is_float = false;

        if self.peek() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            text.push('.');
            text.push_str(&self.read_digits(10));
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.advance();
            text.push('e');
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.advance();
                text.push(sign);
            }
            text.push_str(&self.read_digits(10));
        }

        if is_float {
            let value = text.parse().unwrap_or(0.0);
            self.make_token(TokenKind::FloatLit(value))
        } else {
            match text.parse::<u64>() {
                Ok(value) => self.make_token(TokenKind::IntLit(value)),
                // Too large for any integer type, keep it as a float constant
                Err(_) => self.make_token(TokenKind::FloatLit(text.parse().unwrap_or(f64::MAX))),
            }
        }
    }

    fn read_escape(&mut self) -> Option<char> {
        match self.advance()? {
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            '0' => Some('\0'),
            c => Some(c),
        }
    }

    /// Read a string literal
    fn read_string(&mut self) -> Result<Token> {
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => {
                    if let Some(c) = self.read_escape() {
                        value.push(c);
                    }
                }
                Some('\n') | None => {
                    return Err(Error::UnterminatedString { span: self.make_span() });
                }
                Some(c) => value.push(c),
            }
        }

        Ok(self.make_token(TokenKind::StringLit(value)))
    }

    /// Read a rune literal
    fn read_char(&mut self) -> Result<Token> {
        self.advance(); // opening quote
        let c = match self.advance() {
            Some('\\') => self.read_escape(),
            Some('\'') | Some('\n') | None => None,
            other => other,
        };
        match (c, self.advance()) {
            (Some(c), Some('\'')) => Ok(self.make_token(TokenKind::CharLit(c))),
            _ => Err(Error::UnterminatedRune { span: self.make_span() }),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace()?;
        self.start = self.pos;

        let Some(c) = self.peek() else {
            return Ok(Token::eof(self.make_span()));
        };

        if c.is_alphabetic() || c == '_' {
            return Ok(self.read_identifier());
        }
        if c.is_ascii_digit() {
            return Ok(self.read_number());
        }
        if c == '"' {
            return self.read_string();
        }
        if c == '\'' {
            return self.read_char();
        }

        self.advance();
        let kind = match c {
            '+' => {
                if self.eat('=') {
                    TokenKind::PlusEq
                } else if self.eat('+') {
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('>') {
                    TokenKind::Arrow
                } else if self.eat('=') {
                    TokenKind::MinusEq
                } else if self.eat('-') {
                    TokenKind::MinusMinus
                } else {
                    TokenKind::Minus
                }
            }
            '*' => if self.eat('=') { TokenKind::StarEq } else { TokenKind::Star },
            '/' => if self.eat('=') { TokenKind::SlashEq } else { TokenKind::Slash },
            '%' => if self.eat('=') { TokenKind::PercentEq } else { TokenKind::Percent },
            '^' => if self.eat('=') { TokenKind::CaretEq } else { TokenKind::Caret },
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else if self.eat('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Eq
                }
            }
            '!' => if self.eat('=') { TokenKind::Ne } else { TokenKind::Not },
            '<' => {
                if self.eat('=') {
                    TokenKind::Le
                } else if self.eat('<') {
                    if self.eat('=') { TokenKind::ShlEq } else { TokenKind::Shl }
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::Ge
                } else if self.eat('>') {
                    if self.eat('=') { TokenKind::ShrEq } else { TokenKind::Shr }
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AndAnd
                } else if self.eat('=') {
                    TokenKind::AndEq
                } else {
                    TokenKind::And
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::OrOr
                } else if self.eat('=') {
                    TokenKind::OrEq
                } else {
                    TokenKind::Or
                }
            }
            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::DotDotDot
                } else {
                    TokenKind::Dot
                }
            }
            ':' => if self.eat(':') { TokenKind::ColonColon } else { TokenKind::Colon },
            '~' => TokenKind::Tilde,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            _ => return Err(Error::InvalidToken { ch: c, span: self.make_span() }),
        };

        Ok(self.make_token(kind))
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, 0)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = kinds("fn main() { }");
        assert!(matches!(tokens[0], TokenKind::Fn));
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "main"));
        assert!(matches!(tokens[2], TokenKind::LParen));
        assert!(matches!(tokens[3], TokenKind::RParen));
        assert!(matches!(tokens[4], TokenKind::LBrace));
        assert!(matches!(tokens[5], TokenKind::RBrace));
        assert!(matches!(tokens[6], TokenKind::Eof));
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds("42 3.14 0xFF_FF 0b101 18446744073709551615");
        assert!(matches!(tokens[0], TokenKind::IntLit(42)));
        assert!(matches!(tokens[1], TokenKind::FloatLit(f) if (f - 3.14).abs() < 0.001));
        assert!(matches!(tokens[2], TokenKind::IntLit(0xFFFF)));
        assert!(matches!(tokens[3], TokenKind::IntLit(5)));
        assert!(matches!(tokens[4], TokenKind::IntLit(u64::MAX)));
    }

    #[test]
    fn test_strings_and_runes() {
        let tokens = kinds(r#""hello\nworld" 'a' '\n'"#);
        assert!(matches!(tokens[0], TokenKind::StringLit(ref s) if s == "hello\nworld"));
        assert!(matches!(tokens[1], TokenKind::CharLit('a')));
        assert!(matches!(tokens[2], TokenKind::CharLit('\n')));
    }

    #[test]
    fn test_compound_operators() {
        let tokens = kinds("<<= >>= ++ -- ... :: =>");
        assert_eq!(
            &tokens[..7],
            &[
                TokenKind::ShlEq,
                TokenKind::ShrEq,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::DotDotDot,
                TokenKind::ColonColon,
                TokenKind::FatArrow,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        let tokens = kinds("goto fallthrough nil self unsafe");
        assert!(matches!(tokens[0], TokenKind::Goto));
        assert!(matches!(tokens[1], TokenKind::Fallthrough));
        assert!(matches!(tokens[2], TokenKind::Nil));
        assert!(matches!(tokens[3], TokenKind::SelfKw));
        assert!(matches!(tokens[4], TokenKind::Unsafe));
    }

    #[test]
    fn test_unterminated_string_is_fatal() {
        let err = Lexer::new("\"abc", 0).tokenize().unwrap_err();
        assert!(matches!(err, Error::UnterminatedString { .. }));
    }
}
