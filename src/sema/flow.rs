//! Control flow
//!
//! Structural return reachability, labels and `goto`, `break`/`continue`
//! targets and `fallthrough` placement.

use crate::frontend::ast::{Case, Ident, LoopKind, Stmt};
use crate::sema::checker::{Checker, GotoInfo, LabelInfo};
use crate::sema::diagnostic::DiagKind;
use crate::sema::scope::BlockId;
use crate::utils::Span;

// ==================== Returns ====================

/// Every path through `stmts` ends in a `return`
pub fn block_returns(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_returns)
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { .. } => true,
        Stmt::Block(block) => block_returns(&block.stmts),
        Stmt::If {
            branches,
            else_block: Some(else_block),
            ..
        } => branches.iter().all(|b| block_returns(&b.body.stmts)) && block_returns(&else_block.stmts),
        Stmt::Match {
            cases,
            default: Some(default),
            ..
        } => cases_return(cases, default),
        Stmt::Loop {
            kind: LoopKind::Infinite,
            body,
            ..
        } => !breaks_out(&body.stmts) && block_returns(&body.stmts),
        _ => false,
    }
}

/// A case returns when its body does or it falls through into one that does
fn cases_return(cases: &[Case], default: &Case) -> bool {
    let mut next_returns = block_returns(&default.body.stmts);
    if !next_returns {
        return false;
    }
    for case in cases.iter().rev() {
        let falls = matches!(case.body.stmts.last(), Some(Stmt::Fallthrough { .. }));
        let returns = block_returns(&case.body.stmts) || (falls && next_returns);
        if !returns {
            return false;
        }
        next_returns = returns;
    }
    true
}

/// A `break` that leaves the enclosing loop
fn breaks_out(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Stmt::Break { .. } => true,
        Stmt::Block(block) => breaks_out(&block.stmts),
        Stmt::If {
            branches, else_block, ..
        } => {
            branches.iter().any(|b| breaks_out(&b.body.stmts))
                || else_block.as_ref().map_or(false, |b| breaks_out(&b.stmts))
        }
        _ => false,
    })
}

// ==================== Labels and jumps ====================

impl<'p> Checker<'p> {
    pub(crate) fn check_label(&mut self, name: &Ident, span: Span) {
        let Some(block) = self.current else { return };
        let index = self.index;
        let Some(ctx) = self.func.as_mut() else { return };
        if ctx.labels.iter().any(|l| l.name == name.name) {
            self.push(DiagKind::LabelExist(name.name.clone()), span);
            return;
        }
        ctx.labels.push(LabelInfo {
            name: name.name.clone(),
            block,
            index,
            span,
            used: false,
        });
    }

    pub(crate) fn check_goto(&mut self, label: &Ident, span: Span) {
        let Some(block) = self.current else { return };
        let index = self.index;
        if let Some(ctx) = self.func.as_mut() {
            ctx.gotos.push(GotoInfo {
                label: label.name.clone(),
                block,
                index,
                span,
            });
        }
    }

    /// Resolves every `goto` of the body, then reports unused labels
    pub(crate) fn check_gotos(&mut self) {
        let Some(mut ctx) = self.func.take() else { return };
        for goto in &ctx.gotos {
            let Some(label) = ctx.labels.iter_mut().find(|l| l.name == goto.label) else {
                self.push(DiagKind::LabelNotExist(goto.label.clone()), goto.span);
                continue;
            };
            label.used = true;
            if self.jumps_declarations(goto, label) {
                self.push(DiagKind::GotoJumpsDeclarations(goto.label.clone()), goto.span);
            }
        }
        if self.opts.report_unused {
            for label in ctx.labels.iter().filter(|l| !l.used) {
                self.push(DiagKind::DeclaredButNotUsed(format!("{}:", label.name)), label.span);
            }
        }
        ctx.gotos.clear();
        self.func = Some(ctx);
    }

    /// A jump skips a declaration when one sits between the position the
    /// jump leaves in the common ancestor and the label, or earlier in a
    /// block the jump enters.
    fn jumps_declarations(&self, goto: &GotoInfo, label: &LabelInfo) -> bool {
        let common = self
            .scopes
            .ancestors(label.block)
            .find(|b| self.scopes.is_ancestor(*b, goto.block));
        let Some(common) = common else { return false };

        let from = self.position_in(goto.block, goto.index, common);
        let to = self.position_in(label.block, label.index, common);
        if to > from && self.declares_between(common, from, to) {
            return true;
        }

        // Blocks entered on the way down to the label
        let mut block = label.block;
        let mut index = label.index;
        while block != common {
            if self.declares_before(block, index) {
                return true;
            }
            let b = self.scopes.block(block);
            index = b.index_in_parent;
            match b.parent {
                Some(parent) => block = parent,
                None => break,
            }
        }
        false
    }

    /// Statement index inside `ancestor` that contains position `index` of `block`
    fn position_in(&self, mut block: BlockId, mut index: usize, ancestor: BlockId) -> usize {
        while block != ancestor {
            let b = self.scopes.block(block);
            index = b.index_in_parent;
            match b.parent {
                Some(parent) => block = parent,
                None => break,
            }
        }
        index
    }

    /// A declaration strictly between `from` and `to`
    fn declares_between(&self, block: BlockId, from: usize, to: usize) -> bool {
        self.scopes.block(block).decls.iter().any(|d| *d > from && *d < to)
    }

    fn declares_before(&self, block: BlockId, index: usize) -> bool {
        self.scopes.block(block).decls.iter().any(|d| *d < index)
    }

    pub(crate) fn check_break(&mut self, label: Option<&Ident>, span: Span) {
        self.check_jump(label, span, false);
    }

    pub(crate) fn check_continue(&mut self, label: Option<&Ident>, span: Span) {
        self.check_jump(label, span, true);
    }

    fn check_jump(&mut self, label: Option<&Ident>, span: Span, is_continue: bool) {
        let out_of_scope = if is_continue {
            DiagKind::ContinueAtOutOfValidScope
        } else {
            DiagKind::BreakAtOutOfValidScope
        };
        let Some(ctx) = self.func.as_mut() else {
            self.push(out_of_scope, span);
            return;
        };
        let valid = |is_loop: bool| !is_continue || is_loop;

        let Some(label) = label else {
            if !ctx.breakables.iter().any(|b| valid(b.is_loop)) {
                self.push(out_of_scope, span);
            }
            return;
        };

        let known = ctx.labels.iter_mut().find(|l| l.name == label.name);
        let exists = known.is_some();
        if let Some(info) = known {
            info.used = true;
        }
        let target = ctx
            .breakables
            .iter()
            .rev()
            .find(|b| b.label.as_deref() == Some(label.name.as_str()))
            .map(|b| b.is_loop);
        match target {
            Some(is_loop) if valid(is_loop) => {}
            Some(_) => self.push(DiagKind::InvalidLabel, label.span),
            None if exists => self.push(DiagKind::InvalidLabel, label.span),
            None => self.push(DiagKind::LabelNotExist(label.name.clone()), label.span),
        }
    }

    /// `fallthrough` must be the last statement of a non-final match case
    pub(crate) fn check_fallthrough(&mut self, span: Span) {
        let case = self.func.as_ref().and_then(|f| f.case);
        match case {
            Some(case) if Some(case.block) == self.current && self.index + 1 == case.len => {
                if case.is_final {
                    self.push(DiagKind::FallthroughIntoFinalCase, span);
                }
            }
            _ => self.push(DiagKind::FallthroughWrongUse, span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{Item, Program};
    use crate::frontend::{lexer::Lexer, parser::Parser};

    fn body(src: &str) -> Vec<Stmt> {
        let program: Program = Parser::new(Lexer::new(src, 0)).parse_program().unwrap();
        match program.items.into_iter().next() {
            Some(Item::Function(f)) => f.body.stmts,
            other => panic!("expected a function, got {:?}", other),
        }
    }

    #[test]
    fn test_if_needs_else() {
        assert!(!block_returns(&body("fn f() -> int { if true { return 1 } }")));
        assert!(block_returns(&body(
            "fn f() -> int { if true { return 1 } else { return 2 } }"
        )));
        assert!(!block_returns(&body(
            "fn f() -> int { if true { return 1 } else if false { return 2 } }"
        )));
    }

    #[test]
    fn test_match_needs_default_and_chains() {
        assert!(!block_returns(&body("fn f() -> int { match x { 1 => { return 1 } } }")));
        assert!(block_returns(&body(
            "fn f() -> int { match x { 1 => { fallthrough } 2 => { return 2 } _ => { return 0 } } }"
        )));
        assert!(!block_returns(&body(
            "fn f() -> int { match x { 1 => { } _ => { return 0 } } }"
        )));
    }

    #[test]
    fn test_nested_blocks_and_loops() {
        assert!(block_returns(&body("fn f() -> int { { { return 1 } } }")));
        assert!(block_returns(&body("fn f() -> int { loop { return 1 } }")));
        assert!(!block_returns(&body("fn f() -> int { loop { break } }")));
        assert!(!block_returns(&body("fn f() -> int { while true { return 1 } }")));
    }
}
