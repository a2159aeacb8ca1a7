//! Per-file worker context
//!
//! A `Checker` owns everything one worker mutates: diagnostics, the block
//! arena, the generic binding stack, expression annotations and the
//! instantiation requests it discovers. The package table is only read, so
//! workers of sibling files never share mutable state.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::frontend::ast::BinOp;
use crate::sema::assign::AssignCheck;
use crate::sema::defs::{AliasId, FuncId, GlobalId, Package};
use crate::sema::diagnostic::{DiagKind, Diagnostics};
use crate::sema::flow;
use crate::sema::generics::BindingStack;
use crate::sema::scope::{BlockId, ScopeArena, Var, VarId};
use crate::sema::solver::Solver;
use crate::sema::value::{Const, Value};
use crate::sema::CheckOptions;
use crate::types::{StructId, Type, WordSize};
use crate::utils::Span;

/// Resolved type of one checked expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub span: Span,
    pub ty: Type,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<Const>,
}

/// Generic instantiation discovered while checking
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Func {
        id: FuncId,
        generics: Vec<Type>,
        span: Span,
    },
    Struct {
        id: StructId,
        generics: Vec<Type>,
        span: Span,
    },
}

impl Request {
    pub fn span(&self) -> Span {
        match self {
            Request::Func { span, .. } | Request::Struct { span, .. } => *span,
        }
    }
}

// ==================== Function context ====================

/// Statement a `break` may leave
#[derive(Debug, Clone)]
pub(crate) struct Breakable {
    pub label: Option<String>,
    /// Loops also accept `continue`
    pub is_loop: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct LabelInfo {
    pub name: String,
    pub block: BlockId,
    pub index: usize,
    pub span: Span,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct GotoInfo {
    pub label: String,
    pub block: BlockId,
    pub index: usize,
    pub span: Span,
}

/// Match case whose block is being checked
#[derive(Debug, Clone, Copy)]
pub(crate) struct CaseInfo {
    pub block: BlockId,
    pub len: usize,
    pub is_final: bool,
}

/// Function body being checked
#[derive(Debug, Default)]
pub(crate) struct FnContext {
    pub ret: Type,
    pub named_ret: bool,
    pub is_unsafe: bool,
    pub labels: Vec<LabelInfo>,
    pub gotos: Vec<GotoInfo>,
    pub breakables: Vec<Breakable>,
    pub case: Option<CaseInfo>,
}

// ==================== Checker ====================

/// What a worker hands back at a join
#[derive(Debug, Default)]
pub struct Outcome {
    pub diags: Diagnostics,
    pub annotations: Vec<Annotation>,
    pub requests: Vec<Request>,
}

/// Semantic checker of one worker
pub struct Checker<'p> {
    pub(crate) pkg: &'p Package,
    pub(crate) opts: &'p CheckOptions,
    pub(crate) diags: Diagnostics,
    pub(crate) scopes: ScopeArena,
    pub(crate) current: Option<BlockId>,
    /// Index of the statement being checked inside `current`
    pub(crate) index: usize,
    pub(crate) bindings: BindingStack,
    /// Unbound generic names of the template being resolved
    pub(crate) template_generics: Vec<String>,
    pub(crate) func: Option<FnContext>,
    pub(crate) annotations: Vec<Annotation>,
    pub(crate) requests: Vec<Request>,
    pub(crate) alias_stack: Vec<AliasId>,
    pub(crate) alias_cache: HashMap<AliasId, Option<Type>>,
    pub(crate) cyclic_aliases: HashSet<AliasId>,
    pub(crate) global_stack: Vec<GlobalId>,
    pub(crate) global_cache: HashMap<GlobalId, Value>,
    pub(crate) cyclic_globals: HashSet<GlobalId>,
    /// Report diagnostics of lazily evaluated globals
    pub(crate) report_globals: bool,
    /// Reads of variables or globals whose declaration already failed
    pub(crate) void_reads: usize,
}

impl<'p> Checker<'p> {
    pub fn new(pkg: &'p Package, opts: &'p CheckOptions) -> Self {
        Self {
            pkg,
            opts,
            diags: Diagnostics::new(),
            scopes: ScopeArena::new(),
            current: None,
            index: 0,
            bindings: BindingStack::new(),
            template_generics: Vec::new(),
            func: None,
            annotations: Vec::new(),
            requests: Vec::new(),
            alias_stack: Vec::new(),
            alias_cache: HashMap::new(),
            cyclic_aliases: HashSet::new(),
            global_stack: Vec::new(),
            global_cache: HashMap::new(),
            cyclic_globals: HashSet::new(),
            report_globals: false,
            void_reads: 0,
        }
    }

    pub fn finish(self) -> Outcome {
        Outcome {
            diags: self.diags,
            annotations: self.annotations,
            requests: self.requests,
        }
    }

    pub fn word_size(&self) -> WordSize {
        self.opts.word_size
    }

    pub(crate) fn push(&mut self, kind: DiagKind, span: Span) {
        self.diags.push(kind, span);
    }

    /// Runs `f` and drops the diagnostics it produced
    /// Position to test a later evaluation against with `failed_since`
    pub(crate) fn failure_mark(&self) -> (usize, usize) {
        (self.diags.len(), self.void_reads)
    }

    /// A void value is a failure once an error was reported for it, here
    /// or at the declaration it was read from
    pub(crate) fn failed_since(&self, mark: (usize, usize), value: &Value) -> bool {
        value.ty.is_void()
            && (self.void_reads > mark.1 || self.diags.iter().skip(mark.0).any(|d| d.is_error()))
    }

    pub(crate) fn quietly<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let mark = self.diags.len();
        let result = f(self);
        self.diags.truncate(mark);
        result
    }

    pub(crate) fn annotate(&mut self, span: Span, value: &Value) {
        if value.is_type {
            return;
        }
        self.annotations.push(Annotation {
            span,
            ty: value.ty.clone(),
            constant: value.constant.clone(),
        });
    }

    pub(crate) fn request(&mut self, request: Request) {
        log::trace!("instantiation request {:?}", request);
        self.requests.push(request);
    }

    // ==================== Shared checks ====================

    pub(crate) fn in_unsafe(&self) -> bool {
        self.func.as_ref().map_or(false, |f| f.is_unsafe)
            || self.current.map_or(false, |b| self.scopes.in_unsafe(b))
    }

    /// Reports an unsafe operation outside an unsafe scope
    pub(crate) fn require_unsafe(&mut self, span: Span) -> bool {
        if self.in_unsafe() {
            return true;
        }
        self.push(DiagKind::UnsafeBehaviorAtOutOfUnsafeScope, span);
        false
    }

    pub(crate) fn assign(&mut self, target: &Type, value: &Value, span: Span) -> bool {
        let pkg = self.pkg;
        AssignCheck::new(pkg, self.opts.word_size, &mut self.diags, span).check(target, value)
    }

    pub(crate) fn solve(&mut self, l: &Value, op: BinOp, r: &Value, span: Span) -> Value {
        let pkg = self.pkg;
        Solver::new(pkg, self.opts.word_size, &mut self.diags, span).solve(l, op, r)
    }

    /// Non-mutable storage must not flow into a mutable slot of a shared type
    pub(crate) fn check_mutability(&mut self, mutable: bool, ty: &Type, value: &Value, span: Span) {
        if mutable && ty.is_mut() && value.lvalue && !value.mutable {
            self.push(DiagKind::AssignmentNonMutToMut, span);
        }
    }

    // ==================== Blocks ====================

    /// Runs `f` inside a fresh child block of the current one
    pub(crate) fn with_block<T>(&mut self, is_unsafe: bool, f: impl FnOnce(&mut Self, BlockId) -> T) -> T {
        let (parent, index) = (self.current, self.index);
        let block = self.scopes.push_block(parent, index, is_unsafe);
        self.current = Some(block);
        self.index = 0;
        let result = f(self, block);
        if self.opts.report_unused {
            for (name, span) in self.scopes.unused(block) {
                self.push(DiagKind::DeclaredButNotUsed(name), span);
            }
        }
        self.current = parent;
        self.index = index;
        result
    }

    /// Declares a variable in the current block. `_` is never declared.
    pub(crate) fn declare(&mut self, var: Var) -> Option<VarId> {
        if var.name == "_" {
            return None;
        }
        let block = self.current?;
        let (name, span) = (var.name.clone(), var.span);
        match self.scopes.declare(block, var) {
            Ok(id) => Some(id),
            Err(_) => {
                self.push(DiagKind::ExistId(name), span);
                None
            }
        }
    }

    pub(crate) fn declare_param(&mut self, name: &str, ty: Type, mutable: bool, span: Span) {
        self.declare(Var {
            name: name.to_string(),
            ty,
            mutable,
            constant: None,
            used: false,
            is_param: true,
            span,
        });
    }

    pub(crate) fn lookup_var(&self, name: &str) -> Option<VarId> {
        self.scopes.lookup(self.current?, name)
    }

    // ==================== Bodies ====================

    /// Checks a function body, binding the owner's and the function's generics
    pub fn check_body(&mut self, id: FuncId, owner_generics: &[Type], generics: &[Type]) {
        let pkg = self.pkg;
        let info = pkg.func(id);
        log::debug!("checking {}", info.qualified_name(pkg));

        self.bindings.push_scope();
        if let Some(owner) = info.owner {
            let names = &pkg.struct_info(owner).generics;
            for (name, ty) in names.iter().zip(owner_generics) {
                self.bindings.bind(name, ty.clone());
            }
        }
        for (name, ty) in info.generics.iter().zip(generics) {
            self.bindings.bind(name, ty.clone());
        }

        let sig = self.instantiate_sig(id, owner_generics, generics);

        self.func = Some(FnContext {
            ret: sig.ret.clone(),
            named_ret: !info.ast.ret.names.is_empty(),
            is_unsafe: info.ast.is_unsafe,
            ..FnContext::default()
        });

        let body = &info.ast.body;
        self.with_block(body.is_unsafe, |c, _| {
            if let (Some(owner), Some(receiver)) = (info.owner, info.ast.receiver) {
                let ty = Type::structure(owner, &pkg.struct_info(owner).name, owner_generics.to_vec());
                let ty = if receiver.by_ref { ty.reference_to() } else { ty };
                c.declare_param("self", ty, receiver.by_ref, receiver.span);
            }
            for (param, resolved) in info.ast.params.iter().zip(&sig.params) {
                c.declare_param(&param.name.name, resolved.ty.clone(), param.mutable, param.name.span);
            }
            let ret_types = if sig.ret.is_tuple() {
                sig.ret.types().to_vec()
            } else {
                vec![sig.ret.clone()]
            };
            for (name, ty) in info.ast.ret.names.iter().zip(ret_types) {
                c.declare_param(&name.name, ty, true, name.span);
            }
            c.check_stmts(&body.stmts);
            c.check_gotos();
        });

        if !sig.ret.is_void() && !flow::block_returns(&body.stmts) {
            self.push(DiagKind::MissingRet, body.span);
        }

        self.func = None;
        self.bindings.pop_scope();
    }

    /// Field layout of a struct under `generics`; checks field defaults
    pub fn check_struct(&mut self, def: StructId, generics: &[Type]) -> Vec<(String, Type)> {
        let pkg = self.pkg;
        let info = pkg.struct_info(def);
        self.bindings.push_all(&info.generics, generics);

        let mut layout = Vec::with_capacity(info.fields.len());
        for (field, template) in info.ast.fields.iter().zip(&info.fields) {
            let ty = if generics.is_empty() {
                template.ty.clone()
            } else {
                self.quietly(|c| c.resolve_type(&field.ty)).unwrap_or_default()
            };
            if let Some(default) = &field.default {
                self.with_block(false, |c, _| {
                    let value = c.eval(default, Some(&ty));
                    c.assign(&ty, &value, default.span());
                });
            }
            layout.push((field.name.name.clone(), ty));
        }

        self.bindings.pop_scope();
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quietly_drops_diagnostics() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut checker = Checker::new(&pkg, &opts);
        checker.push(DiagKind::MissingRet, Span::dummy());
        checker.quietly(|c| c.push(DiagKind::DivideByZero, Span::dummy()));
        assert_eq!(checker.diags.len(), 1);
    }

    #[test]
    fn test_blocks_report_unused_and_restore() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut checker = Checker::new(&pkg, &opts);
        checker.with_block(false, |c, root| {
            c.declare(Var {
                name: "x".into(),
                ty: Type::primitive(TypeId::Int),
                mutable: false,
                constant: None,
                used: false,
                is_param: false,
                span: Span::dummy(),
            });
            c.with_block(true, |c, _| assert!(c.in_unsafe()));
            assert_eq!(c.current, Some(root));
            assert!(!c.in_unsafe());
        });
        assert_eq!(checker.current, None);
        let keys: Vec<&str> = checker.diags.iter().map(|d| d.key()).collect();
        assert_eq!(keys, vec!["declared_but_not_used"]);
    }

    #[test]
    fn test_redeclaration_reports_exist_id() {
        let pkg = Package::new();
        let opts = CheckOptions {
            report_unused: false,
            ..CheckOptions::default()
        };
        let mut checker = Checker::new(&pkg, &opts);
        checker.with_block(false, |c, _| {
            c.declare_param("a", Type::primitive(TypeId::Int), false, Span::dummy());
            c.declare_param("a", Type::primitive(TypeId::Int), false, Span::dummy());
            c.declare_param("_", Type::primitive(TypeId::Int), false, Span::dummy());
        });
        let keys: Vec<&str> = checker.diags.iter().map(|d| d.key()).collect();
        assert_eq!(keys, vec!["exist_id"]);
    }
}
