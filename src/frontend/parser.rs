//! Parser for Jane
//!
//! Recursive descent parser with Pratt parsing for expressions.

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Lexer failure, reported by `parse_program`
    lex_error: Option<Error>,
    /// Struct literals are disabled while parsing statement headers
    no_struct_literal: bool,
}

impl Parser {
    /// Create a new parser from a lexer
    pub fn new(mut lexer: Lexer) -> Self {
        match lexer.tokenize() {
            Ok(tokens) => Self::from_tokens(tokens),
            Err(err) => {
                let mut parser = Self::from_tokens(vec![Token::eof(err.span())]);
                parser.lex_error = Some(err);
                parser
            }
        }
    }

    /// Create a parser from pre-tokenized input
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::eof(Span::dummy()));
        }
        Self {
            tokens,
            pos: 0,
            lex_error: None,
            no_struct_literal: false,
        }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> &TokenKind {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + 1).min(last)].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("{:?}", expected)))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::UnexpectedToken {
            expected: expected.to_string(),
            got: format!("{:?}", self.current_kind()),
            span: self.current().span,
        }
    }

    /// Span from `start` to the last consumed token
    fn span_from(&self, start: Span) -> Span {
        start.merge(&self.tokens[self.pos.saturating_sub(1)].span)
    }

    fn is_ident(&self, name: &str) -> bool {
        matches!(self.current_kind(), TokenKind::Ident(n) if n == name)
    }

    /// Run `f` with struct literals enabled or disabled, restoring the flag afterwards
    fn with_struct_literals<T>(
        &mut self,
        allowed: bool,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.no_struct_literal;
        self.no_struct_literal = !allowed;
        let result = f(self);
        self.no_struct_literal = saved;
        result
    }

    // ==================== Parsing Methods ====================

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program> {
        if let Some(err) = self.lex_error.take() {
            return Err(err);
        }

        let mut items = Vec::new();
        while !self.is_at_end() {
            if self.consume(&TokenKind::Semicolon) {
                continue;
            }
            items.push(self.parse_item()?);
        }

        Ok(Program { items })
    }

    /// Parse a top-level item
    fn parse_item(&mut self) -> Result<Item> {
        match self.current_kind() {
            TokenKind::Fn | TokenKind::Unsafe => Ok(Item::Function(self.parse_function()?)),
            TokenKind::Struct => Ok(Item::Struct(self.parse_struct()?)),
            TokenKind::Enum => Ok(Item::Enum(self.parse_enum()?)),
            TokenKind::Trait => Ok(Item::Trait(self.parse_trait()?)),
            TokenKind::Impl => Ok(Item::Impl(self.parse_impl()?)),
            TokenKind::Type => Ok(Item::TypeAlias(self.parse_type_alias()?)),
            TokenKind::Const | TokenKind::Let => Ok(Item::Global(self.parse_global()?)),
            _ => Err(self.unexpected("item (fn, struct, enum, trait, impl, type, const, let)")),
        }
    }

    /// Parse a function definition
    fn parse_function(&mut self) -> Result<Function> {
        let start = self.current().span;
        let is_unsafe = self.consume(&TokenKind::Unsafe);
        self.expect(TokenKind::Fn)?;

        let name = self.parse_ident()?;
        let generics = self.parse_generic_params()?;

        self.expect(TokenKind::LParen)?;
        let (receiver, params) = self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        let ret = self.parse_ret_type()?;
        let body = self.parse_block()?;

        Ok(Function {
            name,
            is_unsafe,
            generics,
            receiver,
            params,
            ret,
            body,
            span: self.span_from(start),
        })
    }

    /// `[T, U]` after a function or struct name
    fn parse_generic_params(&mut self) -> Result<Vec<Ident>> {
        let mut generics = Vec::new();
        if self.consume(&TokenKind::LBracket) {
            loop {
                generics.push(self.parse_ident()?);
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBracket)?;
        }
        Ok(generics)
    }

    fn parse_receiver(&mut self) -> Option<Receiver> {
        let start = self.current().span;
        if self.check(&TokenKind::SelfKw) {
            self.advance();
            return Some(Receiver { by_ref: false, span: start });
        }
        if self.check(&TokenKind::And) && matches!(self.peek_kind(), TokenKind::SelfKw) {
            self.advance();
            self.advance();
            return Some(Receiver { by_ref: true, span: self.span_from(start) });
        }
        None
    }

    fn parse_params(&mut self) -> Result<(Option<Receiver>, Vec<Param>)> {
        let receiver = self.parse_receiver();
        if receiver.is_some() && !self.consume(&TokenKind::Comma) {
            return Ok((receiver, Vec::new()));
        }

        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            params.push(self.parse_param()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok((receiver, params))
    }

    fn parse_param(&mut self) -> Result<Param> {
        let start = self.current().span;
        let mutable = self.consume(&TokenKind::Mut);
        let variadic = self.consume(&TokenKind::DotDotDot);
        let name = self.parse_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let default = if self.consume(&TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Param {
            name,
            ty,
            mutable,
            variadic,
            default,
            span: self.span_from(start),
        })
    }

    /// `-> T` or `-> (a: T, b: U)`
    fn parse_ret_type(&mut self) -> Result<RetType> {
        if !self.consume(&TokenKind::Arrow) {
            return Ok(RetType::default());
        }

        let named = self.check(&TokenKind::LParen)
            && matches!(self.peek_kind(), TokenKind::Ident(_))
            && matches!(
                self.tokens.get(self.pos + 2).map(|t| &t.kind),
                Some(TokenKind::Colon)
            );
        if !named {
            return Ok(RetType { ty: Some(self.parse_type()?), names: Vec::new() });
        }

        let start = self.current().span;
        self.expect(TokenKind::LParen)?;
        let mut names = Vec::new();
        let mut types = Vec::new();
        loop {
            names.push(self.parse_ident()?);
            self.expect(TokenKind::Colon)?;
            types.push(self.parse_type()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let span = self.span_from(start);

        let ty = if types.len() == 1 {
            types.pop()
        } else {
            Some(TypeExpr::Tuple(types, span))
        };
        Ok(RetType { ty, names })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Ident::new(name.clone(), token.span))
            }
            TokenKind::SelfKw => {
                self.advance();
                Ok(Ident::new("self", token.span))
            }
            _ => Err(Error::ExpectedIdent { span: token.span }),
        }
    }

    // ==================== Type Parsing ====================

    fn parse_type(&mut self) -> Result<TypeExpr> {
        let start = self.current().span;

        match self.current_kind() {
            TokenKind::Star => {
                self.advance();
                if self.consume(&TokenKind::Unsafe) {
                    return Ok(TypeExpr::UnsafePtr(self.span_from(start)));
                }
                let inner = self.parse_type()?;
                Ok(TypeExpr::Pointer(Box::new(inner), self.span_from(start)))
            }
            TokenKind::And => {
                self.advance();
                let inner = self.parse_type()?;
                Ok(TypeExpr::Ref(Box::new(inner), self.span_from(start)))
            }
            // `&&T` lexes as one token
            TokenKind::AndAnd => {
                self.advance();
                let inner = self.parse_type()?;
                let span = self.span_from(start);
                Ok(TypeExpr::Ref(Box::new(TypeExpr::Ref(Box::new(inner), span)), span))
            }
            TokenKind::LBracket => self.parse_bracket_type(),
            TokenKind::Fn => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let mut params = Vec::new();
                let mut variadic = false;
                while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                    variadic = self.consume(&TokenKind::DotDotDot);
                    params.push(self.parse_type()?);
                    if !self.consume(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
                let ret = if self.consume(&TokenKind::Arrow) {
                    Some(Box::new(self.parse_type()?))
                } else {
                    None
                };
                Ok(TypeExpr::Fn {
                    params,
                    variadic,
                    ret,
                    span: self.span_from(start),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let mut types = vec![self.parse_type()?];
                while self.consume(&TokenKind::Comma) {
                    types.push(self.parse_type()?);
                }
                self.expect(TokenKind::RParen)?;
                if types.len() == 1 {
                    return Ok(types.remove(0));
                }
                Ok(TypeExpr::Tuple(types, self.span_from(start)))
            }
            TokenKind::Ident(_) => {
                let name = self.parse_ident()?;
                let mut generics = Vec::new();
                if self.consume(&TokenKind::LBracket) {
                    generics = self.parse_type_list(&TokenKind::RBracket)?;
                    self.expect(TokenKind::RBracket)?;
                }
                Ok(TypeExpr::Named {
                    name,
                    generics,
                    span: self.span_from(start),
                })
            }
            _ => Err(Error::ExpectedType { span: start }),
        }
    }

    /// Slice, array or map type
    fn parse_bracket_type(&mut self) -> Result<TypeExpr> {
        let start = self.current().span;
        self.expect(TokenKind::LBracket)?;

        if self.consume(&TokenKind::RBracket) {
            let elem = self.parse_type()?;
            return Ok(TypeExpr::Slice(Box::new(elem), self.span_from(start)));
        }

        if self.consume(&TokenKind::DotDotDot) {
            self.expect(TokenKind::RBracket)?;
            let elem = self.parse_type()?;
            return Ok(TypeExpr::Array {
                size: None,
                elem: Box::new(elem),
                span: self.span_from(start),
            });
        }

        // `[K:V]` when a type followed by a colon parses, `[N]T` otherwise
        let saved = self.pos;
        if let Ok(key) = self.parse_type() {
            if self.consume(&TokenKind::Colon) {
                let value = self.parse_type()?;
                self.expect(TokenKind::RBracket)?;
                return Ok(TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                    span: self.span_from(start),
                });
            }
        }
        self.pos = saved;

        let size = self.with_struct_literals(true, |p| p.parse_expr())?;
        self.expect(TokenKind::RBracket)?;
        let elem = self.parse_type()?;
        Ok(TypeExpr::Array {
            size: Some(Box::new(size)),
            elem: Box::new(elem),
            span: self.span_from(start),
        })
    }

    fn parse_type_list(&mut self, close: &TokenKind) -> Result<Vec<TypeExpr>> {
        let mut types = Vec::new();
        while !self.check(close) && !self.is_at_end() {
            types.push(self.parse_type()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(types)
    }

    // ==================== Statement Parsing ====================

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.current().span;
        let is_unsafe = self.consume(&TokenKind::Unsafe);
        self.expect(TokenKind::LBrace)?;

        let stmts = self.with_struct_literals(true, |p| {
            let mut stmts = Vec::new();
            while !p.check(&TokenKind::RBrace) && !p.is_at_end() {
                if p.consume(&TokenKind::Semicolon) {
                    continue;
                }
                stmts.push(p.parse_stmt()?);
            }
            Ok(stmts)
        })?;

        self.expect(TokenKind::RBrace)?;

        Ok(Block {
            stmts,
            is_unsafe,
            span: self.span_from(start),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        let stmt = match self.current_kind() {
            TokenKind::Let => self.parse_let_stmt()?,
            TokenKind::Const => {
                let global = self.parse_global()?;
                Stmt::Let {
                    name: global.name,
                    mutable: false,
                    constant: true,
                    ty: global.ty,
                    value: Some(global.value),
                    span: global.span,
                }
            }
            TokenKind::Return => self.parse_return_stmt()?,
            TokenKind::If => self.parse_if_stmt()?,
            TokenKind::Loop | TokenKind::While | TokenKind::For => self.parse_loop_stmt()?,
            TokenKind::Match => self.parse_match_stmt()?,
            TokenKind::Break => {
                self.advance();
                let label = self.parse_jump_label()?;
                Stmt::Break { label, span: self.span_from(start) }
            }
            TokenKind::Continue => {
                self.advance();
                let label = self.parse_jump_label()?;
                Stmt::Continue { label, span: self.span_from(start) }
            }
            TokenKind::Goto => {
                self.advance();
                let label = self.parse_ident()?;
                Stmt::Goto { label, span: self.span_from(start) }
            }
            TokenKind::Fallthrough => {
                self.advance();
                Stmt::Fallthrough { span: start }
            }
            TokenKind::LBrace | TokenKind::Unsafe => Stmt::Block(self.parse_block()?),
            TokenKind::Type => Stmt::TypeAlias(self.parse_type_alias()?),
            TokenKind::Ident(_) if matches!(self.peek_kind(), TokenKind::Colon) => {
                let name = self.parse_ident()?;
                self.advance();
                Stmt::Label { name, span: self.span_from(start) }
            }
            _ => self.parse_expr_stmt()?,
        };
        self.consume(&TokenKind::Semicolon);
        Ok(stmt)
    }

    /// Optional label after `break`/`continue`
    fn parse_jump_label(&mut self) -> Result<Option<Ident>> {
        let ends_stmt = matches!(
            self.peek_kind(),
            TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Eof
        );
        if matches!(self.current_kind(), TokenKind::Ident(_)) && ends_stmt {
            return Ok(Some(self.parse_ident()?));
        }
        Ok(None)
    }

    fn parse_let_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::Let)?;

        if self.consume(&TokenKind::LParen) {
            let mut names = Vec::new();
            loop {
                let mutable = self.consume(&TokenKind::Mut);
                names.push(LetName { name: self.parse_ident()?, mutable });
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
            self.expect(TokenKind::Eq)?;
            let values = self.parse_exprs()?;
            return Ok(Stmt::LetMulti {
                names,
                values,
                span: self.span_from(start),
            });
        }

        let mutable = self.consume(&TokenKind::Mut);
        let name = self.parse_ident()?;

        let ty = if self.consume(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let value = if self.consume(&TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Stmt::Let {
            name,
            mutable,
            constant: false,
            ty,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::Return)?;

        let values = if !self.check(&TokenKind::Semicolon)
            && !self.check(&TokenKind::RBrace)
            && !self.is_at_end()
        {
            self.parse_exprs()?
        } else {
            Vec::new()
        };

        Ok(Stmt::Return {
            values,
            span: self.span_from(start),
        })
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        let mut branches = Vec::new();
        let mut else_block = None;

        self.expect(TokenKind::If)?;
        loop {
            let cond = self.parse_cond_expr()?;
            let body = self.parse_block()?;
            branches.push(IfBranch { cond, body });

            if !self.consume(&TokenKind::Else) {
                break;
            }
            if !self.consume(&TokenKind::If) {
                else_block = Some(self.parse_block()?);
                break;
            }
        }

        Ok(Stmt::If {
            branches,
            else_block,
            span: self.span_from(start),
        })
    }

    fn parse_loop_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        let kind = match self.advance().kind {
            TokenKind::While => LoopKind::While(self.parse_cond_expr()?),
            TokenKind::For => {
                let mut vars = vec![self.parse_ident()?];
                while self.consume(&TokenKind::Comma) {
                    vars.push(self.parse_ident()?);
                }
                self.expect(TokenKind::In)?;
                let iter = self.parse_cond_expr()?;
                LoopKind::ForEach { vars, iter }
            }
            _ => LoopKind::Infinite,
        };
        let body = self.parse_block()?;

        Ok(Stmt::Loop {
            kind,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_match_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        self.expect(TokenKind::Match)?;

        let expr = if self.check(&TokenKind::LBrace) {
            None
        } else {
            Some(self.parse_cond_expr()?)
        };

        self.expect(TokenKind::LBrace)?;
        let mut cases = Vec::new();
        let mut default = None;
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let case_start = self.current().span;
            let exprs = if self.is_ident("_") && matches!(self.peek_kind(), TokenKind::FatArrow) {
                self.advance();
                Vec::new()
            } else {
                self.with_struct_literals(false, |p| p.parse_exprs())?
            };
            self.expect(TokenKind::FatArrow)?;
            let body = self.parse_block()?;
            let case = Case {
                exprs,
                body,
                span: self.span_from(case_start),
            };
            if case.exprs.is_empty() {
                default = Some(case);
            } else {
                cases.push(case);
            }
            self.consume(&TokenKind::Comma);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Stmt::Match {
            expr,
            cases,
            default,
            span: self.span_from(start),
        })
    }

    /// Expression, assignment or postfix statement
    fn parse_expr_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        let targets = self.parse_exprs()?;

        if self.current_kind().is_assign_op() {
            let op = Self::assign_op(&self.advance().kind);
            let values = self.parse_exprs()?;
            return Ok(Stmt::Assign {
                targets,
                op,
                values,
                span: self.span_from(start),
            });
        }

        let mut targets = targets;
        if targets.len() != 1 {
            return Err(self.unexpected("assignment"));
        }
        let expr = targets.remove(0);

        let increment = match self.current_kind() {
            TokenKind::PlusPlus => Some(true),
            TokenKind::MinusMinus => Some(false),
            _ => None,
        };
        if let Some(increment) = increment {
            self.advance();
            return Ok(Stmt::Postfix {
                expr,
                increment,
                span: self.span_from(start),
            });
        }

        Ok(Stmt::Expr(expr))
    }

    // ==================== Expression Parsing (Pratt) ====================

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_exprs(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.consume(&TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    /// Expression in a statement header, where `{` opens the body
    fn parse_cond_expr(&mut self) -> Result<Expr> {
        self.with_struct_literals(false, |p| p.parse_expr())
    }

    /// Parse expression with binding power (Pratt parsing)
    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op_token = self.current().clone();
            let Some(bp) = op_token.kind.binary_precedence() else {
                break;
            };

            if bp < min_bp {
                break;
            }

            self.advance();

            if op_token.kind == TokenKind::As {
                let ty = self.parse_type()?;
                let span = left.span().merge(&ty.span());
                left = Expr::Cast {
                    expr: Box::new(left),
                    ty,
                    span,
                };
                continue;
            }

            let op = Self::token_to_binop(&op_token.kind, op_token.span)?;
            let right = self.parse_expr_bp(bp + 1)?;
            let span = left.span().merge(&right.span());

            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let op = match token.kind {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Plus => UnOp::Plus,
            TokenKind::Not => UnOp::Not,
            TokenKind::Tilde => UnOp::BitNot,
            TokenKind::Star => UnOp::Deref,
            TokenKind::And => UnOp::Ref,
            _ => return self.parse_primary(),
        };
        self.advance();
        let expr = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            span: token.span.merge(&expr.span()),
            expr: Box::new(expr),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        let expr = match &token.kind {
            // Literals
            TokenKind::IntLit(n) => {
                self.advance();
                Expr::Literal(Literal::Int(*n, token.span))
            }
            TokenKind::FloatLit(n) => {
                self.advance();
                Expr::Literal(Literal::Float(*n, token.span))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Expr::Literal(Literal::Str(s.clone(), token.span))
            }
            TokenKind::CharLit(c) => {
                self.advance();
                Expr::Literal(Literal::Char(*c, token.span))
            }
            TokenKind::True => {
                self.advance();
                Expr::Literal(Literal::Bool(true, token.span))
            }
            TokenKind::False => {
                self.advance();
                Expr::Literal(Literal::Bool(false, token.span))
            }
            TokenKind::Nil => {
                self.advance();
                Expr::Literal(Literal::Nil(token.span))
            }

            // Identifier, generic instantiation or struct literal
            TokenKind::Ident(_) | TokenKind::SelfKw => {
                let name = self.parse_ident()?;

                let mut generics = Vec::new();
                let explicit = self.check(&TokenKind::ColonColon)
                    && matches!(self.peek_kind(), TokenKind::LBracket);
                if explicit {
                    self.advance();
                    self.advance();
                    generics = self.parse_type_list(&TokenKind::RBracket)?;
                    self.expect(TokenKind::RBracket)?;
                }

                if self.check(&TokenKind::LBrace) && !self.no_struct_literal {
                    self.advance();
                    let args = self.parse_args(&TokenKind::RBrace)?;
                    self.expect(TokenKind::RBrace)?;
                    return self.parse_postfix(Expr::StructLit {
                        name,
                        generics,
                        args,
                        span: self.span_from(token.span),
                    });
                }

                if explicit {
                    Expr::Generic {
                        name,
                        generics,
                        span: self.span_from(token.span),
                    }
                } else {
                    Expr::Ident(name)
                }
            }

            // Parenthesized
            TokenKind::LParen => {
                self.advance();
                let inner = self.with_struct_literals(true, |p| p.parse_expr())?;
                self.expect(TokenKind::RParen)?;
                inner
            }

            // Slice literal
            TokenKind::LBracket => {
                self.advance();
                let elements = self.with_struct_literals(true, |p| {
                    let mut elements = Vec::new();
                    while !p.check(&TokenKind::RBracket) && !p.is_at_end() {
                        elements.push(p.parse_expr()?);
                        if !p.consume(&TokenKind::Comma) {
                            break;
                        }
                    }
                    Ok(elements)
                })?;
                self.expect(TokenKind::RBracket)?;
                Expr::Array {
                    elements,
                    span: self.span_from(token.span),
                }
            }

            _ => return Err(Error::ExpectedExpr { span: token.span }),
        };

        self.parse_postfix(expr)
    }

    /// Call or struct-literal arguments up to `close`
    fn parse_args(&mut self, close: &TokenKind) -> Result<Vec<Arg>> {
        self.with_struct_literals(true, |p| {
            let mut args = Vec::new();
            while !p.check(close) && !p.is_at_end() {
                let start = p.current().span;
                let name = if matches!(p.current_kind(), TokenKind::Ident(_))
                    && matches!(p.peek_kind(), TokenKind::Colon)
                {
                    let name = p.parse_ident()?;
                    p.advance();
                    Some(name)
                } else {
                    None
                };
                let value = p.parse_expr()?;
                args.push(Arg {
                    name,
                    value,
                    span: p.span_from(start),
                });
                if !p.consume(&TokenKind::Comma) {
                    break;
                }
            }
            Ok(args)
        })
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            if self.consume(&TokenKind::LParen) {
                let args = self.parse_args(&TokenKind::RParen)?;
                self.expect(TokenKind::RParen)?;
                expr = Expr::Call {
                    span: self.span_from(expr.span()),
                    func: Box::new(expr),
                    args,
                };
            } else if self.consume(&TokenKind::Dot) {
                let field = self.parse_ident()?;
                expr = Expr::Field {
                    span: expr.span().merge(&field.span),
                    expr: Box::new(expr),
                    field,
                };
            } else if self.consume(&TokenKind::LBracket) {
                let index = self.with_struct_literals(true, |p| p.parse_expr())?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    span: self.span_from(expr.span()),
                    expr: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.consume(&TokenKind::DotDotDot) {
                expr = Expr::Variadic {
                    span: self.span_from(expr.span()),
                    expr: Box::new(expr),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    // ==================== Item Parsing ====================

    fn parse_struct(&mut self) -> Result<StructDef> {
        let start = self.current().span;
        self.expect(TokenKind::Struct)?;
        let name = self.parse_ident()?;
        let generics = self.parse_generic_params()?;

        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let field_start = self.current().span;
            let field_name = self.parse_ident()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            let default = if self.consume(&TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            fields.push(Field {
                name: field_name,
                ty,
                default,
                span: self.span_from(field_start),
            });
            if !self.consume(&TokenKind::Comma) {
                self.consume(&TokenKind::Semicolon);
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(StructDef {
            name,
            generics,
            fields,
            span: self.span_from(start),
        })
    }

    fn parse_enum(&mut self) -> Result<EnumDef> {
        let start = self.current().span;
        self.expect(TokenKind::Enum)?;
        let name = self.parse_ident()?;
        let base = if self.consume(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let item_start = self.current().span;
            let item_name = self.parse_ident()?;
            let value = if self.consume(&TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            items.push(EnumItem {
                name: item_name,
                value,
                span: self.span_from(item_start),
            });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(EnumDef {
            name,
            base,
            items,
            span: self.span_from(start),
        })
    }

    fn parse_trait(&mut self) -> Result<TraitDef> {
        let start = self.current().span;
        self.expect(TokenKind::Trait)?;
        let name = self.parse_ident()?;

        self.expect(TokenKind::LBrace)?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            methods.push(self.parse_fn_sig()?);
            self.consume(&TokenKind::Semicolon);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(TraitDef {
            name,
            methods,
            span: self.span_from(start),
        })
    }

    fn parse_fn_sig(&mut self) -> Result<FnSig> {
        let start = self.current().span;
        self.expect(TokenKind::Fn)?;
        let name = self.parse_ident()?;

        self.expect(TokenKind::LParen)?;
        let (receiver, params) = self.parse_params()?;
        self.expect(TokenKind::RParen)?;
        let ret = self.parse_ret_type()?;

        Ok(FnSig {
            name,
            receiver,
            params,
            ret,
            span: self.span_from(start),
        })
    }

    fn parse_impl(&mut self) -> Result<ImplBlock> {
        let start = self.current().span;
        self.expect(TokenKind::Impl)?;

        let first = self.parse_ident()?;
        let (target, trait_name) = if self.consume(&TokenKind::For) {
            (self.parse_ident()?, Some(first))
        } else {
            (first, None)
        };

        self.expect(TokenKind::LBrace)?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            methods.push(self.parse_function()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(ImplBlock {
            target,
            trait_name,
            methods,
            span: self.span_from(start),
        })
    }

    fn parse_type_alias(&mut self) -> Result<TypeAlias> {
        let start = self.current().span;
        self.expect(TokenKind::Type)?;
        let name = self.parse_ident()?;
        self.expect(TokenKind::Eq)?;
        let ty = self.parse_type()?;

        Ok(TypeAlias {
            name,
            ty,
            span: self.span_from(start),
        })
    }

    fn parse_global(&mut self) -> Result<GlobalDef> {
        let start = self.current().span;
        let constant = self.advance().kind == TokenKind::Const;
        let mutable = !constant && self.consume(&TokenKind::Mut);
        let name = self.parse_ident()?;

        let ty = if self.consume(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;

        Ok(GlobalDef {
            name,
            constant,
            mutable,
            ty,
            value,
            span: self.span_from(start),
        })
    }

    fn token_to_binop(kind: &TokenKind, span: Span) -> Result<BinOp> {
        match kind {
            TokenKind::Plus => Ok(BinOp::Add),
            TokenKind::Minus => Ok(BinOp::Sub),
            TokenKind::Star => Ok(BinOp::Mul),
            TokenKind::Slash => Ok(BinOp::Div),
            TokenKind::Percent => Ok(BinOp::Mod),
            TokenKind::EqEq => Ok(BinOp::Eq),
            TokenKind::Ne => Ok(BinOp::Ne),
            TokenKind::Lt => Ok(BinOp::Lt),
            TokenKind::Le => Ok(BinOp::Le),
            TokenKind::Gt => Ok(BinOp::Gt),
            TokenKind::Ge => Ok(BinOp::Ge),
            TokenKind::AndAnd => Ok(BinOp::And),
            TokenKind::OrOr => Ok(BinOp::Or),
            TokenKind::And => Ok(BinOp::BitAnd),
            TokenKind::Or => Ok(BinOp::BitOr),
            TokenKind::Caret => Ok(BinOp::BitXor),
            TokenKind::Shl => Ok(BinOp::Shl),
            TokenKind::Shr => Ok(BinOp::Shr),
            _ => Err(Error::InvalidOperator { span }),
        }
    }

    /// Binary operator of a compound assignment, None for plain `=`
    fn assign_op(kind: &TokenKind) -> Option<BinOp> {
        match kind {
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Mod),
            TokenKind::AndEq => Some(BinOp::BitAnd),
            TokenKind::OrEq => Some(BinOp::BitOr),
            TokenKind::CaretEq => Some(BinOp::BitXor),
            TokenKind::ShlEq => Some(BinOp::Shl),
            TokenKind::ShrEq => Some(BinOp::Shr),
            _ => None,
        }
    }
}

// Helper for Expr span
impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(lit) => lit.span(),
            Expr::Ident(ident) => ident.span,
            Expr::Generic { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Call { span, .. } => *span,
            Expr::Field { span, .. } => *span,
            Expr::Index { span, .. } => *span,
            Expr::StructLit { span, .. } => *span,
            Expr::Array { span, .. } => *span,
            Expr::Cast { span, .. } => *span,
            Expr::Variadic { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Program> {
        let lexer = Lexer::new(source, 0);
        let mut parser = Parser::new(lexer);
        parser.parse_program()
    }

    fn body(source: &str) -> Vec<Stmt> {
        let program = parse(source).unwrap();
        match program.items.into_iter().next() {
            Some(Item::Function(f)) => f.body.stmts,
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_function() {
        let program = parse("fn main() {}").unwrap();
        assert_eq!(program.items.len(), 1);
    }

    #[test]
    fn test_generic_function_with_defaults() {
        let program = parse("fn pick[T](a: T, mut b: T = a, ...rest: T) -> T { return a }").unwrap();
        let Item::Function(f) = &program.items[0] else { panic!() };
        assert_eq!(f.generics.len(), 1);
        assert_eq!(f.params.len(), 3);
        assert!(f.params[1].mutable && f.params[1].default.is_some());
        assert!(f.params[2].variadic);
    }

    #[test]
    fn test_named_returns() {
        let program = parse("fn div(a: int, b: int) -> (q: int, r: int) { return }").unwrap();
        let Item::Function(f) = &program.items[0] else { panic!() };
        assert_eq!(f.ret.names.len(), 2);
        assert!(matches!(f.ret.ty, Some(TypeExpr::Tuple(ref ts, _)) if ts.len() == 2));
    }

    #[test]
    fn test_type_shapes() {
        let program = parse("type A = [int:[]str]\ntype B = [4]*u8\ntype C = fn(int, ...str) -> bool").unwrap();
        assert!(matches!(&program.items[0], Item::TypeAlias(a) if matches!(a.ty, TypeExpr::Map { .. })));
        assert!(matches!(&program.items[1], Item::TypeAlias(a) if matches!(a.ty, TypeExpr::Array { size: Some(_), .. })));
        assert!(matches!(&program.items[2], Item::TypeAlias(a) if matches!(a.ty, TypeExpr::Fn { variadic: true, .. })));
    }

    #[test]
    fn test_struct_literal_disabled_in_conditions() {
        let stmts = body("fn main() { if x == y { return } }");
        let Stmt::If { branches, .. } = &stmts[0] else { panic!() };
        assert!(matches!(branches[0].cond, Expr::Binary { op: BinOp::Eq, .. }));
    }

    #[test]
    fn test_explicit_generics_and_struct_literal() {
        let stmts = body("fn main() { let b = Box::[int]{v: 5}; id::[int](3) }");
        let Stmt::Let { value: Some(Expr::StructLit { generics, args, .. }), .. } = &stmts[0] else {
            panic!()
        };
        assert_eq!(generics.len(), 1);
        assert!(args[0].name.is_some());
        assert!(matches!(&stmts[1], Stmt::Expr(Expr::Call { func, .. }) if matches!(**func, Expr::Generic { .. })));
    }

    #[test]
    fn test_labels_goto_and_match() {
        let stmts = body("fn main() { top: goto top; match x { 1, 2 => { fallthrough } _ => {} } }");
        assert!(matches!(stmts[0], Stmt::Label { .. }));
        assert!(matches!(stmts[1], Stmt::Goto { .. }));
        let Stmt::Match { cases, default, .. } = &stmts[2] else { panic!() };
        assert_eq!(cases[0].exprs.len(), 2);
        assert!(default.is_some());
    }

    #[test]
    fn test_assignments() {
        let stmts = body("fn main() { a, b = 1, 2; x <<= 3; i++ }");
        assert!(matches!(&stmts[0], Stmt::Assign { targets, op: None, .. } if targets.len() == 2));
        assert!(matches!(stmts[1], Stmt::Assign { op: Some(BinOp::Shl), .. }));
        assert!(matches!(stmts[2], Stmt::Postfix { increment: true, .. }));
    }

    #[test]
    fn test_precedence_and_cast() {
        let stmts = body("fn main() { let x = 1 + 2 * 3 as u8 }");
        let Stmt::Let { value: Some(Expr::Binary { op: BinOp::Add, right, .. }), .. } = &stmts[0] else {
            panic!()
        };
        assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_lex_error_surfaces() {
        assert!(matches!(parse("fn main() { $ }"), Err(Error::InvalidToken { ch: '$', .. })));
    }
}
