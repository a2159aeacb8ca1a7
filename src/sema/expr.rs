//! Expression checker
//!
//! `eval` computes the `Value` of an expression: its resolved type, its
//! folded constant when there is one, and whether it can be assigned to.
//! Every evaluated expression is annotated with its type.

use crate::frontend::ast::{Arg, Expr, Ident, Literal, TypeExpr, UnOp};
use crate::sema::checker::{Checker, Request};
use crate::sema::defs::{self, FuncId, GlobalId, Symbol};
use crate::sema::diagnostic::DiagKind;
use crate::sema::generics;
use crate::sema::value::{Const, Value};
use crate::types::{bits, Definitions, FnSig, Type, TypeId, WordSize};
use crate::utils::Span;

/// What a call expression invokes
enum Callee {
    Known(FnSig),
    /// Generic function whose generics are inferred from the arguments
    Template { id: FuncId, owner: Vec<Type> },
}

/// Result of a `.name` lookup
enum Member {
    Value(Value),
    Method { id: FuncId, owner: Vec<Type> },
}

impl<'p> Checker<'p> {
    /// Evaluates a value expression. Naming a type here is an error.
    pub fn eval(&mut self, expr: &Expr, hint: Option<&Type>) -> Value {
        let value = self.eval_any(expr, hint);
        if value.is_type {
            self.push(DiagKind::InvalidTypeSource, expr.span());
            return Value::void();
        }
        value
    }

    /// Like `eval`, but `None` when evaluation failed with an error
    pub(crate) fn eval_checked(&mut self, expr: &Expr, hint: Option<&Type>) -> Option<Value> {
        let mark = self.failure_mark();
        let value = self.eval(expr, hint);
        (!self.failed_since(mark, &value)).then_some(value)
    }

    /// Evaluates an expression that may also name a type
    pub(crate) fn eval_any(&mut self, expr: &Expr, hint: Option<&Type>) -> Value {
        let value = match expr {
            Expr::Literal(lit) => literal(lit),
            Expr::Ident(id) => self.ident(id),
            Expr::Generic { name, generics, span } => self.explicit_generics(name, generics, *span),
            Expr::Binary { left, op, right, span } => {
                let l = self.eval(left, None);
                let r = self.eval(right, None);
                if l.ty.is_void() || r.ty.is_void() {
                    Value::void()
                } else {
                    self.solve(&l, *op, &r, *span)
                }
            }
            Expr::Unary { op, expr, span } => self.unary(*op, expr, hint, *span),
            Expr::Call { func, args, span } => self.call(func, args, *span),
            Expr::Field { expr, field, span } => self.field(expr, field, *span),
            Expr::Index { expr, index, span } => self.subscript(expr, index, *span),
            Expr::StructLit {
                name,
                generics,
                args,
                span,
            } => self.struct_literal(name, generics, args, *span),
            Expr::Array { elements, span } => self.array_literal(elements, hint, *span),
            Expr::Cast { expr, ty, span } => self.cast(expr, ty, *span),
            Expr::Variadic { expr, span } => {
                self.push(DiagKind::VariadicWithNonVariadicable, *span);
                self.eval(expr, None);
                Value::void()
            }
        };
        self.annotate(expr.span(), &value);
        value
    }

    // ==================== Names ====================

    fn ident(&mut self, id: &Ident) -> Value {
        if let Some(var_id) = self.lookup_var(&id.name) {
            let var = self.scopes.var_mut(var_id);
            var.used = true;
            let mut value = Value::new(var.ty.clone()).lvalue(var.mutable);
            value.constant = var.constant.clone();
            if value.ty.is_void() {
                self.void_reads += 1;
            }
            return value;
        }
        if let Some(sig) = defs::builtin_func(&id.name) {
            return Value::new(Type::func(sig));
        }
        let pkg = self.pkg;
        match pkg.lookup(&id.name) {
            Some(Symbol::Global(gid)) => {
                let value = self.global_value(gid);
                if value.ty.is_void() {
                    self.void_reads += 1;
                }
                value
            }
            Some(Symbol::Func(fid)) => {
                let info = pkg.func(fid);
                let mut value = Value::new(Type::func(info.sig.clone()));
                value.is_generic_fn = info.is_generic();
                value
            }
            Some(_) => self.type_value(id, &[], id.span),
            None => {
                self.push(DiagKind::IdNotExist(id.name.clone()), id.span);
                Value::void()
            }
        }
    }

    fn type_value(&mut self, name: &Ident, generics: &[TypeExpr], span: Span) -> Value {
        match self.resolve_named(name, generics, span) {
            Some(ty) => Value {
                is_type: true,
                ..Value::new(ty)
            },
            None => Value::void(),
        }
    }

    /// `name::[T, ..]` in expression position
    fn explicit_generics(&mut self, name: &Ident, generics: &[TypeExpr], span: Span) -> Value {
        let pkg = self.pkg;
        let Some(Symbol::Func(fid)) = pkg.lookup(&name.name) else {
            return self.type_value(name, generics, span);
        };
        let info = pkg.func(fid);
        if let Some(kind) = generics::check_quantity(info.generics.len(), generics.len()) {
            self.push(kind, span);
            return Value::void();
        }
        let Some(types) = self.resolve_generic_args(generics) else {
            return Value::void();
        };
        let sig = self.instantiate_sig(fid, &[], &types);
        if !types.iter().any(Type::has_generic) {
            self.request(Request::Func {
                id: fid,
                generics: types,
                span,
            });
        }
        Value::new(Type::func(sig))
    }

    /// Value of a package-level `let`/`const`, evaluated on first use
    pub(crate) fn global_value(&mut self, id: GlobalId) -> Value {
        let pkg = self.pkg;
        let info = &pkg.globals[id.0];
        if let Some(value) = &info.value {
            return value.clone();
        }
        if self.cyclic_globals.contains(&id) {
            return Value::void();
        }
        if let Some(value) = self.global_cache.get(&id) {
            return value.clone();
        }
        if let Some(pos) = self.global_stack.iter().position(|g| *g == id) {
            let members: Vec<GlobalId> = self.global_stack[pos..].to_vec();
            self.cyclic_globals.extend(members);
            self.push(DiagKind::IllegalCycle(info.name.clone()), info.ast.name.span);
            return Value::void();
        }

        // Globals see no blocks, generics or function context
        let current = self.current.take();
        let templates = std::mem::take(&mut self.template_generics);
        let bindings = std::mem::take(&mut self.bindings);
        let func = self.func.take();
        self.global_stack.push(id);
        let value = if self.report_globals {
            self.eval_global(id)
        } else {
            self.quietly(|c| c.eval_global(id))
        };
        self.global_stack.pop();
        self.func = func;
        self.bindings = bindings;
        self.template_generics = templates;
        self.current = current;

        let value = if self.cyclic_globals.contains(&id) {
            Value::void()
        } else {
            value
        };
        self.global_cache.insert(id, value.clone());
        value
    }

    fn eval_global(&mut self, id: GlobalId) -> Value {
        let pkg = self.pkg;
        let def = &pkg.globals[id.0].ast;
        let declared = match &def.ty {
            Some(texpr) => match self.resolve(texpr, true) {
                (ty, true) => Some(ty),
                _ => None,
            },
            None => None,
        };
        let Some(value) = self.eval_checked(&def.value, declared.as_ref()) else {
            return Value::void();
        };
        let ty = match declared {
            Some(ty) => {
                if self.assign(&ty, &value, def.value.span()) {
                    self.check_mutability(def.mutable, &ty, &value, def.span);
                }
                ty
            }
            None if value.ty.is_nil() => {
                self.push(DiagKind::NilForAutotype, def.value.span());
                return Value::void();
            }
            None if value.ty.is_void() => {
                self.push(DiagKind::VoidForAutotype, def.value.span());
                return Value::void();
            }
            None => value.ty.clone(),
        };
        let constant = if def.constant {
            if !value.is_const() {
                self.push(DiagKind::ExprNotConst, def.value.span());
            }
            value.constant.map(|c| pin_const(c, &ty, self.opts.word_size))
        } else {
            None
        };
        Value {
            constant,
            ..Value::new(ty).lvalue(def.mutable)
        }
    }

    // ==================== Operators ====================

    fn unary(&mut self, op: UnOp, operand: &Expr, hint: Option<&Type>, span: Span) -> Value {
        let v = self.eval(operand, if matches!(op, UnOp::Ref | UnOp::Deref) { None } else { hint });
        if v.ty.is_void() {
            return Value::void();
        }
        let invalid = |c: &mut Self| {
            c.push(DiagKind::InvalidTypeUnaryOperator(op.symbol().to_string()), span);
            Value::void()
        };
        match op {
            UnOp::Neg | UnOp::Plus | UnOp::BitNot => {
                let numeric = v.ty.is_pure() && bits::is_numeric(v.ty.id);
                if !numeric || (op == UnOp::BitNot && !bits::is_integer(v.ty.id)) {
                    return invalid(self);
                }
                let constant = v.constant.map(|c| match (op, c) {
                    (UnOp::Neg, Const::Int(x)) => Const::Int(x.wrapping_neg()),
                    (UnOp::Neg, Const::Uint(x)) => Const::Uint(x.wrapping_neg()),
                    (UnOp::Neg, Const::Float(x)) => Const::Float(-x),
                    (UnOp::BitNot, Const::Int(x)) => Const::Int(!x),
                    (UnOp::BitNot, Const::Uint(x)) => Const::Uint(!x),
                    (_, c) => c,
                });
                Value {
                    constant,
                    is_rune: v.is_rune,
                    ..Value::new(v.ty)
                }
            }
            UnOp::Not => {
                if v.ty.id != TypeId::Bool || !v.ty.is_pure() {
                    return invalid(self);
                }
                Value {
                    constant: v.constant.map(|c| Const::Bool(!c.as_bool())),
                    ..Value::new(v.ty)
                }
            }
            UnOp::Deref => {
                if !v.ty.is_explicit_ptr() {
                    return invalid(self);
                }
                self.require_unsafe(span);
                Value::new(v.ty.elem()).lvalue(true)
            }
            UnOp::Ref => {
                if !v.lvalue || v.ty.is_ref() {
                    return invalid(self);
                }
                Value::new(v.ty.pointer_to())
            }
        }
    }

    fn cast(&mut self, operand: &Expr, texpr: &TypeExpr, span: Span) -> Value {
        let (target, ok) = self.resolve(texpr, true);
        let v = self.eval(operand, None);
        if !ok || v.ty.is_void() {
            return Value::void();
        }
        if v.ty == target || target.is_any() {
            return Value {
                constant: v.constant,
                ..Value::new(target)
            };
        }

        let from = match v.ty.enum_def() {
            Some(def) if v.ty.is_pure() => self.pkg.enum_base(def),
            _ => v.ty.clone(),
        };
        let numeric = |t: &Type| t.is_pure() && bits::is_numeric(t.id);
        let byte_or_rune_slice = |t: &Type| {
            t.is_slice() && t.component().map_or(false, |c| matches!(c.kind.as_str(), "u8" | "i32"))
        };
        let is_str = |t: &Type| t.is_pure() && t.id == TypeId::Str;

        let allowed = v.ty.is_any()
            || (numeric(&target) && numeric(&from))
            || (target.is_ptr() && (v.ty.is_ptr() || (v.ty.is_pure() && v.ty.id == TypeId::Uintptr)))
            || (target.is_pure() && target.id == TypeId::Uintptr && v.ty.is_ptr())
            || (is_str(&target) && byte_or_rune_slice(&v.ty))
            || (byte_or_rune_slice(&target) && is_str(&v.ty));
        if !allowed {
            self.push(DiagKind::TypeNotSupportsCastingTo(v.ty.kind.clone(), target.kind.clone()), span);
            return Value::void();
        }
        let constant = match v.constant {
            Some(c) if numeric(&target) => Some(pin_const(c, &target, self.opts.word_size)),
            _ => None,
        };
        Value {
            constant,
            ..Value::new(target)
        }
    }

    // ==================== Calls ====================

    fn call(&mut self, func: &Expr, args: &[Arg], span: Span) -> Value {
        match self.callee(func) {
            Some(Callee::Known(sig)) => {
                if sig.is_unsafe {
                    self.require_unsafe(span);
                }
                self.call_args(&sig, args, span);
                Value::new(sig.ret)
            }
            Some(Callee::Template { id, owner }) => self.infer_call(id, &owner, args, span),
            None => Value::void(),
        }
    }

    fn callee(&mut self, func: &Expr) -> Option<Callee> {
        let pkg = self.pkg;
        match func {
            Expr::Ident(id) if self.lookup_var(&id.name).is_none() && defs::builtin_func(&id.name).is_none() => {
                if let Some(Symbol::Func(fid)) = pkg.lookup(&id.name) {
                    if pkg.func(fid).is_generic() {
                        self.annotate_fn(func.span(), fid);
                        return Some(Callee::Template { id: fid, owner: Vec::new() });
                    }
                }
            }
            Expr::Field { expr, field, span } => {
                let base = self.eval_any(expr, None);
                if base.ty.is_void() {
                    return None;
                }
                return match self.member(&base, field, *span)? {
                    Member::Method { id, owner } if pkg.func(id).is_generic() => {
                        self.annotate_fn(*span, id);
                        Some(Callee::Template { id, owner })
                    }
                    Member::Method { id, owner } => {
                        let sig = self.instantiate_sig(id, &owner, &[]);
                        self.annotate(*span, &Value::new(Type::func(sig.clone())));
                        Some(Callee::Known(sig))
                    }
                    Member::Value(value) => {
                        self.annotate(*span, &value);
                        self.known(&value, *span)
                    }
                };
            }
            _ => {}
        }
        let mark = self.diags.len();
        let value = self.eval_any(func, None);
        if value.ty.is_void() && self.diags.len() > mark {
            return None;
        }
        self.known(&value, func.span())
    }

    fn known(&mut self, value: &Value, span: Span) -> Option<Callee> {
        match value.ty.fn_sig() {
            Some(sig) if !value.is_type && value.ty.is_fn() => Some(Callee::Known(sig.clone())),
            _ => {
                self.push(DiagKind::NotFunctionCall, span);
                None
            }
        }
    }

    fn annotate_fn(&mut self, span: Span, id: FuncId) {
        let mut value = Value::new(Type::func(self.pkg.func(id).sig.clone()));
        value.is_generic_fn = true;
        self.annotate(span, &value);
    }

    // ==================== Members ====================

    fn field(&mut self, base: &Expr, name: &Ident, span: Span) -> Value {
        let base = self.eval_any(base, None);
        if base.ty.is_void() {
            return Value::void();
        }
        match self.member(&base, name, span) {
            Some(Member::Value(value)) => value,
            Some(Member::Method { id, owner }) => {
                let generic = self.pkg.func(id).is_generic();
                let sig = self.instantiate_sig(id, &owner, &[]);
                Value {
                    is_method: true,
                    is_generic_fn: generic,
                    ..Value::new(Type::func(sig))
                }
            }
            None => Value::void(),
        }
    }

    fn member(&mut self, base: &Value, name: &Ident, span: Span) -> Option<Member> {
        let pkg = self.pkg;
        let missing = |c: &mut Self| {
            c.push(DiagKind::ObjHaveNotId(name.name.clone()), name.span);
            None
        };

        if base.is_type {
            let ty = &base.ty;
            if let Some(def) = ty.enum_def() {
                let info = pkg.enum_info(def);
                return match info.items.iter().find(|(item, _)| *item == name.name) {
                    Some((_, value)) => Some(Member::Value(Value::constant(ty.clone(), value.clone()))),
                    None => missing(self),
                };
            }
            if let Some((def, generics)) = ty.struct_def().filter(|_| ty.is_pure()) {
                if let Some(id) = pkg.method(def, &name.name) {
                    if pkg.func(id).receiver().is_none() {
                        return Some(Member::Method {
                            id,
                            owner: generics.to_vec(),
                        });
                    }
                }
            }
            return missing(self);
        }

        let mut ty = base.ty.clone();
        let (mut lvalue, mut mutable) = (base.lvalue, base.mutable);
        if ty.is_ref() {
            ty = ty.elem();
            lvalue = true;
            mutable = true;
        } else if ty.is_explicit_ptr() {
            self.require_unsafe(span);
            ty = ty.elem();
            lvalue = true;
            mutable = true;
        }

        let enumerable = (ty.is_pure() && ty.id == TypeId::Str) || ty.is_slice() || ty.is_array() || ty.is_map();
        if name.name == "len" && enumerable {
            let int = Type::primitive(TypeId::Int);
            let constant = match (&base.constant, ty.size) {
                (Some(Const::Str(s)), _) => Some(Const::Int(s.len() as i64)),
                (_, Some(n)) if ty.is_array() => Some(Const::Int(n as i64)),
                _ => None,
            };
            return Some(Member::Value(Value {
                constant,
                ..Value::new(int)
            }));
        }

        if let Some((def, generics)) = ty.struct_def().filter(|_| ty.is_pure()) {
            let generics = generics.to_vec();
            let fields = self.struct_fields(def, &generics);
            if let Some((_, field_ty)) = fields.into_iter().find(|(n, _)| *n == name.name) {
                let mut value = Value::new(field_ty);
                if lvalue {
                    value = value.lvalue(mutable);
                }
                return Some(Member::Value(value));
            }
            if let Some(id) = pkg.method(def, &name.name) {
                if pkg.func(id).receiver().is_some() {
                    return Some(Member::Method { id, owner: generics });
                }
            }
            return missing(self);
        }

        if let Some(def) = ty.trait_def().filter(|_| ty.is_pure()) {
            if let Some(method) = pkg.trait_info(def).methods.iter().find(|m| m.name == name.name) {
                return Some(Member::Value(Value {
                    is_method: true,
                    ..Value::new(Type::func(method.sig.clone()))
                }));
            }
        }
        missing(self)
    }

    fn subscript(&mut self, base: &Expr, index: &Expr, span: Span) -> Value {
        let b = self.eval(base, None);
        let i = self.eval(index, None);
        if b.ty.is_void() || i.ty.is_void() {
            return Value::void();
        }
        let ty = if b.ty.is_ref() { b.ty.elem() } else { b.ty.clone() };
        let integer_index = |c: &mut Self| {
            if !i.ty.is_pure() || !bits::is_integer(i.ty.id) {
                c.push(DiagKind::IncompatibleTypes("int".to_string(), i.ty.kind.clone()), index.span());
                return false;
            }
            if let Some(Const::Int(n)) = i.constant {
                if n < 0 {
                    c.push(DiagKind::OverflowLimits, index.span());
                    return false;
                }
            }
            true
        };

        if ty.is_explicit_ptr() {
            self.require_unsafe(span);
            integer_index(self);
            return Value::new(ty.elem()).lvalue(true);
        }
        if ty.is_slice() || ty.is_array() {
            if integer_index(self) {
                if let (Some(size), Some(n)) = (ty.size, i.constant.as_ref()) {
                    if ty.is_array() && n.as_u64() >= size {
                        self.push(DiagKind::OverflowLimits, index.span());
                    }
                }
            }
            let elem = ty.component().cloned().unwrap_or_default();
            return Value::new(elem).lvalue(b.mutable || b.ty.is_ref());
        }
        if ty.is_map() {
            let (key, value) = match ty.types() {
                [key, value] => (key.clone(), value.clone()),
                _ => return Value::void(),
            };
            self.assign(&key, &i, index.span());
            return Value::new(value).lvalue(b.mutable || b.ty.is_ref());
        }
        if ty.is_pure() && ty.id == TypeId::Str {
            if !integer_index(self) {
                return Value::void();
            }
            let byte = Type::primitive(TypeId::U8);
            return match (&b.constant, &i.constant) {
                (Some(Const::Str(s)), Some(n)) => match s.as_bytes().get(n.as_u64() as usize) {
                    Some(v) => Value::constant(byte, Const::Uint(*v as u64)),
                    None => {
                        self.push(DiagKind::OverflowLimits, index.span());
                        Value::new(byte)
                    }
                },
                _ => Value::new(byte),
            };
        }
        self.push(DiagKind::NotSupportsIndexing(ty.kind.clone()), span);
        Value::void()
    }

    // ==================== Literals ====================

    fn struct_literal(&mut self, name: &Ident, generics: &[TypeExpr], args: &[Arg], span: Span) -> Value {
        let Some(ty) = self.resolve_named(name, generics, span) else {
            return Value::void();
        };
        let Some((def, gens)) = ty.struct_def().filter(|_| ty.is_pure()) else {
            self.push(DiagKind::InvalidTypeSource, name.span);
            return Value::void();
        };
        let gens = gens.to_vec();
        let fields = self.struct_fields(def, &gens);
        self.struct_args(def, &fields, args, span);
        Value::new(ty)
    }

    fn array_literal(&mut self, elements: &[Expr], hint: Option<&Type>, span: Span) -> Value {
        let hint = hint.filter(|h| h.is_slice() || h.is_array());
        let mut elem = hint.and_then(|h| h.component().cloned());
        for expr in elements {
            let Some(value) = self.eval_checked(expr, elem.as_ref()) else {
                continue;
            };
            match &elem {
                Some(ty) => {
                    self.assign(ty, &value, expr.span());
                }
                None if value.ty.is_nil() => self.push(DiagKind::NilForAutotype, expr.span()),
                None => elem = Some(value.ty.clone()),
            }
        }
        let elem = elem.unwrap_or_else(|| Type::primitive(TypeId::Any));
        let len = elements.len() as u64;
        match hint {
            Some(h) if h.is_array() => {
                if let Some(size) = h.size {
                    if len > size {
                        self.push(DiagKind::OverflowLimits, span);
                    }
                }
                Value::new(Type::array(elem, Some(h.size.unwrap_or(len))))
            }
            _ => Value::new(Type::slice(elem)),
        }
    }
}

fn literal(lit: &Literal) -> Value {
    let span = lit.span();
    let mut value = match lit {
        Literal::Int(v, _) => match i64::try_from(*v) {
            Ok(v) => Value::constant(Type::primitive(TypeId::Int), Const::Int(v)),
            Err(_) => Value::constant(Type::primitive(TypeId::U64), Const::Uint(*v)),
        },
        Literal::Float(v, _) => Value::constant(Type::primitive(TypeId::F64), Const::Float(*v)),
        Literal::Str(v, _) => Value::constant(Type::primitive(TypeId::Str), Const::Str(v.clone())),
        Literal::Char(c, _) => Value {
            is_rune: true,
            ..Value::constant(Type::primitive(TypeId::I32), Const::Int(*c as i64))
        },
        Literal::Bool(v, _) => Value::constant(Type::bool(), Const::Bool(*v)),
        Literal::Nil(_) => Value::new(Type::nil()),
    };
    value.ty = value.ty.with_span(span);
    value
}

/// Converts a constant to the representation of `ty`, truncating integers
/// to its width
pub(crate) fn pin_const(c: Const, ty: &Type, ws: WordSize) -> Const {
    if !ty.is_pure() || !bits::is_numeric(ty.id) || !c.is_numeric() {
        return c;
    }
    let width = bits::bit_size(ty.id, ws);
    match c.cast_to(ty.id) {
        Const::Uint(v) if width < 64 => Const::Uint(v & ((1u64 << width) - 1)),
        Const::Int(v) if width < 64 => {
            let shift = 64 - width;
            Const::Int((v << shift) >> shift)
        }
        Const::Float(v) if ty.id == TypeId::F32 => Const::Float(v as f32 as f64),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::BinOp;
    use crate::sema::defs::Package;
    use crate::sema::CheckOptions;
    use pretty_assertions::assert_eq;

    fn lit(v: u64) -> Expr {
        Expr::Literal(Literal::Int(v, Span::dummy()))
    }

    fn binary(l: Expr, op: BinOp, r: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(l),
            op,
            right: Box::new(r),
            span: Span::dummy(),
        }
    }

    fn keys(c: &Checker) -> Vec<&'static str> {
        c.diags.iter().map(|d| d.key()).collect()
    }

    #[test]
    fn test_literal_categories() {
        assert_eq!(literal(&Literal::Int(5, Span::dummy())).ty.id, TypeId::Int);
        assert_eq!(literal(&Literal::Int(u64::MAX, Span::dummy())).ty.id, TypeId::U64);
        assert_eq!(literal(&Literal::Float(1.5, Span::dummy())).ty.id, TypeId::F64);
        let rune = literal(&Literal::Char('a', Span::dummy()));
        assert!(rune.is_rune);
        assert_eq!(rune.constant, Some(Const::Int(97)));
        assert!(!literal(&Literal::Nil(Span::dummy())).is_const());
    }

    #[test]
    fn test_folding_is_annotated() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        let v = c.eval(&binary(lit(1), BinOp::Add, lit(2)), None);
        assert_eq!(v.constant, Some(Const::Int(3)));
        assert_eq!(v.ty.id, TypeId::I8);
        assert_eq!(c.annotations.len(), 3);
        assert_eq!(c.annotations[2].constant, Some(Const::Int(3)));
    }

    #[test]
    fn test_unary_rules() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        let neg = Expr::Unary {
            op: UnOp::Neg,
            expr: Box::new(lit(4)),
            span: Span::dummy(),
        };
        assert_eq!(c.eval(&neg, None).constant, Some(Const::Int(-4)));

        let not_int = Expr::Unary {
            op: UnOp::Not,
            expr: Box::new(lit(4)),
            span: Span::dummy(),
        };
        assert!(c.eval(&not_int, None).ty.is_void());
        let addr_of_literal = Expr::Unary {
            op: UnOp::Ref,
            expr: Box::new(lit(4)),
            span: Span::dummy(),
        };
        c.eval(&addr_of_literal, None);
        assert_eq!(keys(&c), vec!["invalid_type_unary_operator"; 2]);
    }

    #[test]
    fn test_numeric_cast_truncates() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        let cast = Expr::Cast {
            expr: Box::new(lit(300)),
            ty: TypeExpr::named("u8", Span::dummy()),
            span: Span::dummy(),
        };
        let v = c.eval(&cast, None);
        assert_eq!(v.ty.id, TypeId::U8);
        assert_eq!(v.constant, Some(Const::Uint(44)));

        let bad = Expr::Cast {
            expr: Box::new(lit(1)),
            ty: TypeExpr::named("str", Span::dummy()),
            span: Span::dummy(),
        };
        assert!(c.eval(&bad, None).ty.is_void());
        assert_eq!(keys(&c), vec!["type_not_supports_casting_to"]);
    }

    #[test]
    fn test_pin_const_sign_extends() {
        let i8_ = Type::primitive(TypeId::I8);
        assert_eq!(pin_const(Const::Int(200), &i8_, WordSize::Bits64), Const::Int(-56));
        let u16_ = Type::primitive(TypeId::U16);
        assert_eq!(pin_const(Const::Int(-1), &u16_, WordSize::Bits64), Const::Uint(65535));
    }

    #[test]
    fn test_spread_outside_call() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        let spread = Expr::Variadic {
            expr: Box::new(lit(1)),
            span: Span::dummy(),
        };
        assert!(c.eval(&spread, None).ty.is_void());
        assert_eq!(keys(&c), vec!["variadic_with_non_variadicable"]);
    }
}
