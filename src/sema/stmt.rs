//! Statement checker

use crate::frontend::ast::{self, BinOp, Block, Case, Expr, Ident, IfBranch, LetName, LoopKind, Stmt, TypeExpr};
use crate::sema::checker::{Breakable, CaseInfo, Checker};
use crate::sema::diagnostic::DiagKind;
use crate::sema::expr::pin_const;
use crate::sema::scope::{LocalAlias, Var};
use crate::sema::value::{Const, Value};
use crate::types::{bits, Type, TypeId};
use crate::utils::Span;

fn is_bool(ty: &Type) -> bool {
    ty.id == TypeId::Bool && ty.is_pure()
}

fn is_numeric(ty: &Type) -> bool {
    ty.is_pure() && bits::is_numeric(ty.id)
}

impl<'p> Checker<'p> {
    pub(crate) fn check_stmts(&mut self, stmts: &[Stmt]) {
        for (i, stmt) in stmts.iter().enumerate() {
            self.index = i;
            let label = match i.checked_sub(1).map(|prev| &stmts[prev]) {
                Some(Stmt::Label { name, .. }) => Some(name.name.as_str()),
                _ => None,
            };
            self.check_stmt(stmt, label);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, label: Option<&str>) {
        match stmt {
            Stmt::Let {
                name,
                mutable,
                constant,
                ty,
                value,
                span,
            } => self.check_let(name, *mutable, *constant, ty.as_ref(), value.as_ref(), *span),
            Stmt::LetMulti { names, values, span } => self.check_let_multi(names, values, *span),
            Stmt::Assign {
                targets,
                op,
                values,
                span,
            } => match op {
                Some(op) => self.check_compound(targets, *op, values, *span),
                None => self.check_assign(targets, values, *span),
            },
            Stmt::Postfix { expr, increment, span } => self.check_postfix(expr, *increment, *span),
            Stmt::Expr(expr) => {
                self.eval(expr, None);
            }
            Stmt::Return { values, span } => self.check_return(values, *span),
            Stmt::If {
                branches, else_block, ..
            } => self.check_if(branches, else_block.as_ref()),
            Stmt::Loop { kind, body, .. } => self.check_loop(kind, body, label),
            Stmt::Match {
                expr,
                cases,
                default,
                ..
            } => self.check_match(expr.as_ref(), cases, default.as_ref(), label),
            Stmt::Break { label, span } => self.check_break(label.as_ref(), *span),
            Stmt::Continue { label, span } => self.check_continue(label.as_ref(), *span),
            Stmt::Goto { label, span } => self.check_goto(label, *span),
            Stmt::Label { name, span } => self.check_label(name, *span),
            Stmt::Fallthrough { span } => self.check_fallthrough(*span),
            Stmt::Block(block) => self.check_block(block),
            Stmt::TypeAlias(alias) => self.check_local_alias(alias),
        }
    }

    fn check_block(&mut self, block: &Block) {
        self.with_block(block.is_unsafe, |c, _| c.check_stmts(&block.stmts));
    }

    /// Marks the current statement as a declaration for jump checks
    fn record_decl(&mut self) {
        if let Some(block) = self.current {
            let index = self.index;
            self.scopes.block_mut(block).decls.push(index);
        }
    }

    fn declare_local(&mut self, name: &Ident, ty: Type, mutable: bool, constant: Option<Const>) {
        self.declare(Var {
            name: name.name.clone(),
            ty,
            mutable,
            constant,
            used: false,
            is_param: false,
            span: name.span,
        });
    }

    // ==================== Declarations ====================

    fn check_let(
        &mut self,
        name: &Ident,
        mutable: bool,
        constant: bool,
        texpr: Option<&TypeExpr>,
        value: Option<&Expr>,
        span: Span,
    ) {
        self.record_decl();
        let declared = match texpr {
            Some(texpr) => match self.resolve(texpr, true) {
                (ty, true) => Some(ty),
                _ => None,
            },
            None => None,
        };

        let evaluated = match value {
            None => {
                if constant {
                    self.push(DiagKind::MissingConstValue, span);
                } else if texpr.is_none() {
                    self.push(DiagKind::MissingAutotypeValue, span);
                }
                None
            }
            Some(expr) => self.declared_value(expr, declared.as_ref()),
        };

        let ty = match (declared, &evaluated, value) {
            (Some(ty), Some(v), Some(expr)) => {
                if self.assign(&ty, v, expr.span()) {
                    self.check_mutability(mutable, &ty, v, span);
                }
                if ty.is_array() && ty.size.is_none() && v.ty.is_array() {
                    v.ty.clone()
                } else {
                    ty
                }
            }
            (Some(ty), _, _) => ty,
            (None, Some(v), Some(expr)) => self.autotype(v, expr.span()),
            _ => Type::void(),
        };

        let pinned = match (constant, &evaluated, value) {
            (true, Some(v), Some(expr)) => {
                if !v.is_const() || !ty.allowed_for_const() {
                    self.push(DiagKind::ExprNotConst, expr.span());
                    None
                } else {
                    v.constant.clone().map(|c| pin_const(c, &ty, self.opts.word_size))
                }
            }
            _ => None,
        };
        log::trace!("let {}: {}", name.name, ty);
        self.declare_local(name, ty, mutable, pinned);
    }

    /// Evaluates the value of a declaration; `None` when it failed
    fn declared_value(&mut self, expr: &Expr, hint: Option<&Type>) -> Option<Value> {
        let mark = self.failure_mark();
        let value = self.eval_any(expr, hint);
        if value.is_type {
            self.push(DiagKind::AssignTypeNotSupportValue, expr.span());
            return None;
        }
        (!self.failed_since(mark, &value)).then_some(value)
    }

    /// Type a declaration without annotation takes from its value
    fn autotype(&mut self, value: &Value, span: Span) -> Type {
        if value.ty.is_nil() {
            self.push(DiagKind::NilForAutotype, span);
            return Type::void();
        }
        if value.ty.is_void() {
            self.push(DiagKind::VoidForAutotype, span);
            return Type::void();
        }
        if value.ty.is_fn() {
            self.assign(&value.ty, value, span);
        }
        value.ty.clone()
    }

    fn check_let_multi(&mut self, names: &[LetName], values: &[Expr], span: Span) {
        self.record_decl();
        let evaluated = self.multi_values(names.len(), values);
        self.check_counts(names.len(), evaluated.len(), span);
        for (i, name) in names.iter().enumerate() {
            let value_span = values.get(i).or_else(|| values.first()).map_or(span, Expr::span);
            let ty = match evaluated.get(i) {
                Some(Some(v)) => self.autotype(v, value_span),
                _ => Type::void(),
            };
            self.declare_local(&name.name, ty, name.mutable, None);
        }
    }

    /// Values of a multi-target statement; one tuple-valued expression spreads
    fn multi_values(&mut self, targets: usize, values: &[Expr]) -> Vec<Option<Value>> {
        if targets > 1 && values.len() == 1 {
            return match self.eval_checked(&values[0], None) {
                Some(v) if v.ty.is_tuple() => v.ty.types().iter().map(|t| Some(Value::new(t.clone()))).collect(),
                Some(v) => vec![Some(v)],
                None => vec![None; targets],
            };
        }
        values.iter().map(|e| self.eval_checked(e, None)).collect()
    }

    fn check_counts(&mut self, targets: usize, values: usize, span: Span) -> bool {
        if targets > values {
            self.push(DiagKind::OverflowMultiAssignIdentifiers, span);
            return false;
        }
        if targets < values {
            self.push(DiagKind::MissingMultiAssignIdentifiers, span);
            return false;
        }
        true
    }

    fn check_local_alias(&mut self, alias: &ast::TypeAlias) {
        let Some(block) = self.current else { return };
        let name = &alias.name.name;
        let exists = self.scopes.block(block).aliases.iter().any(|a| &a.name == name)
            || self.scopes.find_local(block, name).is_some();
        if exists {
            self.push(DiagKind::ExistId(name.clone()), alias.name.span);
            return;
        }
        let Some(ty) = self.resolve_type(&alias.ty) else { return };
        self.scopes.block_mut(block).aliases.push(LocalAlias {
            name: name.clone(),
            ty,
            used: false,
            span: alias.name.span,
        });
    }

    // ==================== Assignments ====================

    /// Left side must be a mutable, non-constant lvalue
    fn check_lvalue(&mut self, target: &Value, span: Span) -> bool {
        if !target.lvalue {
            self.push(DiagKind::AssignRequireLvalue, span);
            return false;
        }
        if target.is_const() {
            self.push(DiagKind::AssignConst, span);
            return false;
        }
        if !target.mutable {
            self.push(DiagKind::AssignmentToNonMut, span);
            return false;
        }
        true
    }

    fn is_discard(expr: &Expr) -> bool {
        matches!(expr, Expr::Ident(id) if id.name == "_")
    }

    fn check_assign(&mut self, targets: &[Expr], values: &[Expr], span: Span) {
        if targets.len() == 1 && values.len() == 1 {
            let (target, value) = (&targets[0], &values[0]);
            if Self::is_discard(target) {
                self.eval(value, None);
                return;
            }
            let Some(t) = self.eval_checked(target, None) else {
                self.eval(value, None);
                return;
            };
            let Some(v) = self.eval_checked(value, Some(&t.ty)) else { return };
            self.store(target, &t, &v, value.span());
            return;
        }

        let evaluated = self.multi_values(targets.len(), values);
        if !self.check_counts(targets.len(), evaluated.len(), span) {
            return;
        }
        for (i, (target, value)) in targets.iter().zip(evaluated).enumerate() {
            let value_span = values.get(i).unwrap_or(&values[0]).span();
            if Self::is_discard(target) {
                continue;
            }
            let (Some(t), Some(v)) = (self.eval_checked(target, None), value) else {
                continue;
            };
            self.store(target, &t, &v, value_span);
        }
    }

    fn store(&mut self, target: &Expr, t: &Value, v: &Value, value_span: Span) {
        if self.check_lvalue(t, target.span()) && self.assign(&t.ty, v, value_span) {
            self.check_mutability(t.mutable, &t.ty, v, value_span);
        }
    }

    /// `a op= b` folds through the solver before the store
    fn check_compound(&mut self, targets: &[Expr], op: BinOp, values: &[Expr], span: Span) {
        if !self.check_counts(targets.len(), values.len(), span) {
            return;
        }
        let (target, value) = (&targets[0], &values[0]);
        let Some(t) = self.eval_checked(target, None) else { return };
        let Some(v) = self.eval_checked(value, Some(&t.ty)) else { return };
        if !self.check_lvalue(&t, target.span()) {
            return;
        }
        let result = self.solve(&t, op, &v, span);
        if !result.ty.is_void() {
            self.assign(&t.ty, &result, value.span());
        }
    }

    fn check_postfix(&mut self, expr: &Expr, increment: bool, span: Span) {
        let Some(v) = self.eval_checked(expr, None) else { return };
        if !self.check_lvalue(&v, expr.span()) {
            return;
        }
        if is_numeric(&v.ty) || (v.ty.is_ref() && is_numeric(&v.ty.elem())) {
            return;
        }
        if v.ty.is_explicit_ptr() {
            self.require_unsafe(span);
            return;
        }
        let op = if increment { "++" } else { "--" };
        self.push(DiagKind::InvalidTypeUnaryOperator(op.to_string()), span);
    }

    // ==================== Returns ====================

    fn check_return(&mut self, values: &[Expr], span: Span) {
        let Some((ret, named)) = self.func.as_ref().map(|f| (f.ret.clone(), f.named_ret)) else {
            return;
        };
        if values.is_empty() {
            if !ret.is_void() && !named {
                self.push(DiagKind::RequireReturnValue, span);
            }
            return;
        }
        if ret.is_void() {
            self.push(DiagKind::VoidFunctionReturnValue, span);
            for value in values {
                self.eval(value, None);
            }
            return;
        }

        let wanted: Vec<Type> = if ret.is_tuple() {
            ret.types().to_vec()
        } else {
            vec![ret.clone()]
        };
        if values.len() == 1 && wanted.len() > 1 {
            let Some(v) = self.eval_checked(&values[0], None) else { return };
            if v.ty.is_tuple() {
                self.assign(&ret, &v, values[0].span());
            } else {
                self.push(DiagKind::MissingMultiReturn, span);
            }
            return;
        }
        if values.len() > wanted.len() {
            self.push(DiagKind::OverflowReturn, span);
        } else if values.len() < wanted.len() {
            self.push(DiagKind::MissingMultiReturn, span);
        }
        for (i, expr) in values.iter().enumerate() {
            let Some(ty) = wanted.get(i) else {
                self.eval(expr, None);
                continue;
            };
            let Some(v) = self.eval_checked(expr, Some(ty)) else { continue };
            if self.assign(ty, &v, expr.span()) && ty.is_mut() && v.lvalue && !v.mutable {
                self.push(DiagKind::RetWithMutTypedNonMut, expr.span());
            }
        }
    }

    // ==================== Branches and loops ====================

    fn check_condition(&mut self, cond: &Expr, kind: DiagKind) {
        if let Some(v) = self.eval_checked(cond, None) {
            if !is_bool(&v.ty) {
                self.push(kind, cond.span());
            }
        }
    }

    fn check_if(&mut self, branches: &[IfBranch], else_block: Option<&Block>) {
        for branch in branches {
            self.check_condition(&branch.cond, DiagKind::IfRequireBoolExpr);
            self.check_block(&branch.body);
        }
        if let Some(block) = else_block {
            self.check_block(block);
        }
    }

    fn push_breakable(&mut self, label: Option<&str>, is_loop: bool) {
        if let Some(ctx) = self.func.as_mut() {
            ctx.breakables.push(Breakable {
                label: label.map(str::to_string),
                is_loop,
            });
        }
    }

    fn pop_breakable(&mut self) {
        if let Some(ctx) = self.func.as_mut() {
            ctx.breakables.pop();
        }
    }

    fn check_loop(&mut self, kind: &LoopKind, body: &Block, label: Option<&str>) {
        let vars = match kind {
            LoopKind::Infinite => Vec::new(),
            LoopKind::While(cond) => {
                self.check_condition(cond, DiagKind::IterWhileRequireBoolExpr);
                Vec::new()
            }
            LoopKind::ForEach { vars, iter } => {
                if let Some(extra) = vars.get(2) {
                    self.push(DiagKind::MuchForeachVars, extra.span);
                }
                let (key, elem) = match self.eval_checked(iter, None) {
                    Some(v) => self.foreach_types(&v.ty, iter.span()),
                    None => (Type::void(), Type::void()),
                };
                vars.iter().zip([key, elem]).collect()
            }
        };

        self.push_breakable(label, true);
        self.with_block(body.is_unsafe, |c, _| {
            for (var, ty) in vars {
                c.declare_local(var, ty, false, None);
            }
            c.check_stmts(&body.stmts);
        });
        self.pop_breakable();
    }

    /// Key and element types of an enumerable
    fn foreach_types(&mut self, ty: &Type, span: Span) -> (Type, Type) {
        let index = Type::primitive(TypeId::Int);
        if ty.is_pure() && ty.id == TypeId::Str {
            return (index, Type::primitive(TypeId::U8));
        }
        if ty.is_slice() || ty.is_array() {
            return (index, ty.component().cloned().unwrap_or_default());
        }
        if let [key, value] = ty.types() {
            if ty.is_map() {
                return (key.clone(), value.clone());
            }
        }
        self.push(DiagKind::IterForeachRequireEnumerableExpr, span);
        (Type::void(), Type::void())
    }

    fn check_match(&mut self, subject: Option<&Expr>, cases: &[Case], default: Option<&Case>, label: Option<&str>) {
        let has_subject = subject.is_some();
        let subject = subject.and_then(|e| self.eval_checked(e, None));

        self.push_breakable(label, false);
        let all: Vec<&Case> = cases.iter().chain(default).collect();
        for (i, case) in all.iter().enumerate() {
            for expr in &case.exprs {
                let Some(v) = self.eval_checked(expr, subject.as_ref().map(|s| &s.ty)) else {
                    continue;
                };
                match &subject {
                    Some(s) => {
                        self.solve(s, BinOp::Eq, &v, expr.span());
                    }
                    None if !has_subject => {
                        self.assign(&Type::bool(), &v, expr.span());
                    }
                    None => {}
                }
            }

            let saved = self.func.as_ref().and_then(|f| f.case);
            let is_final = i + 1 == all.len();
            self.with_block(case.body.is_unsafe, |c, block| {
                if let Some(ctx) = c.func.as_mut() {
                    ctx.case = Some(CaseInfo {
                        block,
                        len: case.body.stmts.len(),
                        is_final,
                    });
                }
                c.check_stmts(&case.body.stmts);
            });
            if let Some(ctx) = self.func.as_mut() {
                ctx.case = saved;
            }
        }
        self.pop_breakable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::Item;
    use crate::frontend::{lexer::Lexer, parser::Parser};
    use crate::sema::checker::FnContext;
    use crate::sema::defs::Package;
    use crate::sema::CheckOptions;
    use pretty_assertions::assert_eq;

    fn check_with(src: &str, report_unused: bool) -> Vec<&'static str> {
        let program = Parser::new(Lexer::new(src, 0)).parse_program().unwrap();
        let Some(Item::Function(f)) = program.items.into_iter().next() else {
            panic!("expected a function");
        };
        let pkg = Package::new();
        let opts = CheckOptions {
            report_unused,
            ..CheckOptions::default()
        };
        let mut c = Checker::new(&pkg, &opts);
        c.func = Some(FnContext::default());
        c.with_block(false, |c, _| {
            c.check_stmts(&f.body.stmts);
            c.check_gotos();
        });
        c.diags.iter().map(|d| d.key()).collect()
    }

    fn check(src: &str) -> Vec<&'static str> {
        check_with(src, false)
    }

    #[test]
    fn test_assignment_targets() {
        assert_eq!(check("fn f() { let x = 1; x = 2 }"), vec!["assignment_to_non_mut"]);
        assert_eq!(check("fn f() { const c = 3; c = 4 }"), vec!["assign_const"]);
        assert_eq!(check("fn f() { 1 = 2 }"), vec!["assign_require_lvalue"]);
        assert_eq!(check("fn f() { let mut x = 1; x += 2; x++ }"), Vec::<&str>::new());
        assert_eq!(check("fn f() { let mut s = \"a\"; s++ }"), vec!["invalid_type_unary_operator"]);
        assert_eq!(check("fn f() { _ = 5 }"), Vec::<&str>::new());
    }

    #[test]
    fn test_declarations() {
        assert_eq!(check("fn f() { let x = nil }"), vec!["nil_for_autotype"]);
        assert_eq!(check("fn f() { let x }"), vec!["missing_autotype_value"]);
        assert_eq!(check("fn f() { let x: u8 = 256 }"), vec!["overflow_limits"]);
        assert_eq!(check("fn f() { let x = 1; let x = 2 }"), vec!["exist_id"]);
        assert_eq!(check("fn f() { let x = 1; { let x = 2 } }"), Vec::<&str>::new());
        assert_eq!(
            check("fn f() { let (a, b) = 1, 2, 3 }"),
            vec!["missing_multi_assign_identifiers"]
        );
        assert_eq!(
            check("fn f() { let (a, b, c) = 1, 2 }"),
            vec!["overflow_multi_assign_identifiers"]
        );
    }

    #[test]
    fn test_local_aliases() {
        assert_eq!(check("fn f() { type T = int; let x: T = 1 }"), Vec::<&str>::new());
        assert_eq!(check("fn f() { type T = int; type T = u8 }"), vec!["exist_id"]);
    }

    #[test]
    fn test_conditions_and_foreach() {
        assert_eq!(check("fn f() { if 1 { } }"), vec!["if_require_bool_expr"]);
        assert_eq!(check("fn f() { while \"a\" { } }"), vec!["iter_while_require_bool_expr"]);
        assert_eq!(
            check("fn f() { for i, c in \"ab\" { let x: u8 = c; let y: int = i } }"),
            Vec::<&str>::new()
        );
        assert_eq!(check("fn f() { for a, b, c in \"ab\" { } }"), vec!["much_foreach_vars"]);
        assert_eq!(
            check("fn f() { for x in 5 { } }"),
            vec!["iter_foreach_require_enumerable_expr"]
        );
    }

    #[test]
    fn test_break_and_continue_targets() {
        assert_eq!(check("fn f() { break }"), vec!["break_at_out_of_valid_scope"]);
        assert_eq!(
            check("fn f() { match { true => { continue } } }"),
            vec!["continue_at_out_of_valid_scope"]
        );
        assert_eq!(check("fn f() { outer: loop { loop { break outer } } }"), Vec::<&str>::new());
        assert_eq!(
            check("fn f() { outer: loop { } loop { continue outer } }"),
            vec!["invalid_label"]
        );
        assert_eq!(check("fn f() { loop { break nowhere } }"), vec!["label_not_exist"]);
    }

    #[test]
    fn test_goto_over_declarations() {
        assert_eq!(check("fn f() { goto end; let x = 1; end: }"), vec!["goto_jumps_declarations"]);
        assert_eq!(check("fn f() { top: let x = 1; goto top }"), Vec::<&str>::new());
        assert_eq!(
            check("fn f() { goto inner; { let y = 1; inner: } }"),
            vec!["goto_jumps_declarations"]
        );
        assert_eq!(check("fn f() { goto missing }"), vec!["label_not_exist"]);
        assert_eq!(check("fn f() { a: a: }"), vec!["label_exist"]);
    }

    #[test]
    fn test_fallthrough_placement() {
        assert_eq!(check("fn f() { match 1 { 1 => { fallthrough } _ => { } } }"), Vec::<&str>::new());
        assert_eq!(
            check("fn f() { match 1 { 1 => { fallthrough; let a = 2 } _ => { } } }"),
            vec!["fallthrough_wrong_use"]
        );
        assert_eq!(
            check("fn f() { match 1 { 1 => { } _ => { fallthrough } } }"),
            vec!["fallthrough_into_final_case"]
        );
        assert_eq!(check("fn f() { fallthrough }"), vec!["fallthrough_wrong_use"]);
    }

    #[test]
    fn test_void_function_returns_value() {
        assert_eq!(check("fn f() { return 1 }"), vec!["void_function_return_value"]);
        assert_eq!(check("fn f() { return }"), Vec::<&str>::new());
    }

    #[test]
    fn test_unused_variables_and_labels() {
        assert_eq!(
            check_with("fn f() { let x = 1; top: }", true),
            vec!["declared_but_not_used", "declared_but_not_used"]
        );
        assert_eq!(check_with("fn f() { let x = 1; let y = x; println(y) }", true), Vec::<&str>::new());
    }
}
