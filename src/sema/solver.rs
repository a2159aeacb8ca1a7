//! Constant Solver
//!
//! Computes the static result type of a binary operation and folds it when
//! both operands are constants. Folding works over three constant kinds:
//! `i64`, `u64` and `f64`. Dispatch picks the first matching type domain.

use crate::frontend::ast::BinOp;
use crate::sema::diagnostic::{DiagKind, Diagnostics};
use crate::sema::value::{Const, Value};
use crate::types::{bits, CompatChecker, Definitions, Type, TypeId, WordSize};
use crate::utils::Span;

/// Binary operation solver
pub struct Solver<'a, D: Definitions + ?Sized> {
    defs: &'a D,
    word_size: WordSize,
    diags: &'a mut Diagnostics,
    /// Operator position
    span: Span,
}

impl<'a, D: Definitions + ?Sized> Solver<'a, D> {
    pub fn new(defs: &'a D, word_size: WordSize, diags: &'a mut Diagnostics, span: Span) -> Self {
        Self {
            defs,
            word_size,
            diags,
            span,
        }
    }

    pub fn solve(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        let mut v = self.dispatch(l.clone(), op, r.clone());
        self.finalize(&mut v, l, r);
        v
    }

    fn dispatch(&mut self, l: Value, op: BinOp, r: Value) -> Value {
        let (lt, rt) = (&l.ty, &r.ty);
        if matches!(op, BinOp::And | BinOp::Or) {
            self.logical(&l, op, &r)
        } else if lt.is_fn() || rt.is_fn() {
            self.function(&l, op, &r)
        } else if lt.is_array() || rt.is_array() {
            self.comparable_only(&l, op, &r)
        } else if lt.is_slice() || rt.is_slice() {
            self.comparable_only(&l, op, &r)
        } else if lt.is_map() || rt.is_map() {
            self.comparable_only(&l, op, &r)
        } else if lt.is_ptr() || rt.is_ptr() {
            self.pointer(l, op, r)
        } else if lt.is_enum() || rt.is_enum() {
            self.enumeration(l, op, r)
        } else if lt.is_struct() || rt.is_struct() {
            self.structure(&l, op, &r)
        } else if lt.is_trait() || rt.is_trait() {
            self.comparable_only(&l, op, &r)
        } else if lt.is_nil() || rt.is_nil() {
            self.nil(&l, op, &r)
        } else if lt.id == TypeId::Any || rt.id == TypeId::Any {
            self.equality_only(op, "any")
        } else if lt.id == TypeId::Bool || rt.id == TypeId::Bool {
            self.boolean(&l, op, &r)
        } else if lt.id == TypeId::Str || rt.id == TypeId::Str {
            self.string(&l, op, &r)
        } else if bits::is_float(lt.id) || bits::is_float(rt.id) {
            self.float(l, op, r)
        } else if bits::is_unsigned_integer(lt.id) || bits::is_unsigned_integer(rt.id) {
            self.integer(&l, op, &r, false)
        } else if bits::is_signed_numeric(lt.id) || bits::is_signed_numeric(rt.id) {
            self.integer(&l, op, &r, true)
        } else {
            self.incompatible(&l.ty, &r.ty);
            Value::void()
        }
    }

    // ==================== Helpers ====================

    fn push(&mut self, kind: DiagKind) {
        self.diags.push(kind, self.span);
    }

    fn incompatible(&mut self, l: &Type, r: &Type) {
        self.push(DiagKind::IncompatibleTypes(l.kind.clone(), r.kind.clone()));
    }

    fn not_for(&mut self, op: BinOp, ty: &str) -> Value {
        self.push(DiagKind::OperatorNotForType {
            op: op.symbol().to_string(),
            ty: ty.to_string(),
        });
        Value::void()
    }

    fn compatible(&self, l: &Type, r: &Type, ignore_any: bool) -> bool {
        CompatChecker::new(self.defs, self.word_size)
            .ignore_any(ignore_any)
            .allow_assign(true)
            .check(l, r)
            .is_ok()
    }

    fn equality_only(&mut self, op: BinOp, ty: &str) -> Value {
        match op {
            BinOp::Eq | BinOp::Ne => Value::new(Type::bool()),
            _ => self.not_for(op, ty),
        }
    }

    /// Result type of an arithmetic operator: the wider operand
    fn promoted(&self, l: &Type, r: &Type) -> Type {
        if bits::type_greater_than(r.id, l.id, self.word_size) {
            r.clone()
        } else {
            l.clone()
        }
    }

    // ==================== Domains ====================

    fn logical(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        if l.ty.id != TypeId::Bool || r.ty.id != TypeId::Bool || !l.ty.is_pure() || !r.ty.is_pure() {
            self.push(DiagKind::LogicalNotBool);
            return Value::void();
        }
        let mut v = Value::new(Type::bool());
        if let (Some(a), Some(b)) = (&l.constant, &r.constant) {
            let folded = match op {
                BinOp::And => a.as_bool() && b.as_bool(),
                _ => a.as_bool() || b.as_bool(),
            };
            v.constant = Some(Const::Bool(folded));
        }
        v
    }

    /// Functions compare only against nil
    fn function(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        if !l.ty.is_nil() && !r.ty.is_nil() {
            self.incompatible(&r.ty, &l.ty);
            return Value::void();
        }
        self.equality_only(op, "nil")
    }

    fn comparable_only(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        if !self.compatible(&l.ty, &r.ty, true) {
            self.incompatible(&r.ty, &l.ty);
            return Value::void();
        }
        let ty = if l.ty.is_nil() { r.ty.kind.clone() } else { l.ty.kind.clone() };
        self.equality_only(op, &ty)
    }

    fn pointer(&mut self, l: Value, op: BinOp, r: Value) -> Value {
        if !self.compatible(&l.ty, &r.ty, true) {
            self.incompatible(&r.ty, &l.ty);
            return Value::void();
        }
        let l = if l.ty.is_ptr() { l } else { r };
        match op {
            BinOp::Add | BinOp::Sub => Value::new(l.ty),
            op if op.is_comparison() => Value::new(Type::bool()),
            _ => self.not_for(op, "pointer"),
        }
    }

    /// Enums operate as their base type
    fn enumeration(&mut self, mut l: Value, op: BinOp, mut r: Value) -> Value {
        if let Some(def) = l.ty.enum_def() {
            l.ty = self.defs.enum_base(def);
        }
        if let Some(def) = r.ty.enum_def() {
            r.ty = self.defs.enum_base(def);
        }
        if l.ty.is_enum() || r.ty.is_enum() {
            self.incompatible(&r.ty, &l.ty);
            return Value::void();
        }
        self.dispatch(l, op, r)
    }

    fn structure(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        if l.ty.kind != r.ty.kind {
            self.incompatible(&r.ty, &l.ty);
            return Value::void();
        }
        self.equality_only(op, "struct")
    }

    fn nil(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        if !self.compatible(&l.ty, &r.ty, false) {
            self.incompatible(&r.ty, &l.ty);
            return Value::void();
        }
        self.equality_only(op, "nil")
    }

    fn boolean(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        if !self.compatible(&l.ty, &r.ty, true) {
            self.incompatible(&r.ty, &l.ty);
            return Value::void();
        }
        let mut v = self.equality_only(op, "bool");
        if let (false, Some(a), Some(b)) = (v.ty.is_void(), &l.constant, &r.constant) {
            let eq = a == b;
            v.constant = Some(Const::Bool(if op == BinOp::Eq { eq } else { !eq }));
        }
        v
    }

    fn string(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        if l.ty.id != r.ty.id || !l.ty.is_pure() || !r.ty.is_pure() {
            self.incompatible(&l.ty, &r.ty);
            return Value::void();
        }
        let folded = match (&l.constant, &r.constant) {
            (Some(Const::Str(a)), Some(Const::Str(b))) => Some((a.clone(), b.clone())),
            _ => None,
        };
        match op {
            BinOp::Add => {
                let mut v = Value::new(Type::primitive(TypeId::Str));
                v.constant = folded.map(|(a, b)| Const::Str(a + &b));
                v
            }
            BinOp::Eq | BinOp::Ne => {
                let mut v = Value::new(Type::bool());
                v.constant = folded.map(|(a, b)| Const::Bool((a == b) == (op == BinOp::Eq)));
                v
            }
            _ => self.not_for(op, "str"),
        }
    }

    fn float(&mut self, mut l: Value, op: BinOp, mut r: Value) -> Value {
        if !bits::is_numeric(l.ty.id) || !bits::is_numeric(r.ty.id) {
            self.incompatible(&r.ty, &l.ty);
            return Value::void();
        }
        match op {
            op if op.is_comparison() => self.compare(&l, op, &r),
            BinOp::Add | BinOp::Sub | BinOp::Mul => {
                let ty = self.promoted(&l.ty, &r.ty);
                self.arith(&l, op, &r, ty)
            }
            BinOp::Div => {
                // The float side takes the integer side's type
                let (li, ri) = (bits::is_integer(l.ty.id), bits::is_integer(r.ty.id));
                if li && !ri {
                    r.ty = l.ty.clone();
                } else if ri && !li {
                    l.ty = r.ty.clone();
                }
                let ty = self.promoted(&l.ty, &r.ty);
                self.arith(&l, op, &r, ty)
            }
            BinOp::Mod => match self.float_mod(l, r) {
                Some(v) => v,
                None => {
                    self.push(DiagKind::OperatorNotForFloat(op.symbol().to_string()));
                    Value::void()
                }
            },
            _ => {
                self.push(DiagKind::OperatorNotForFloat(op.symbol().to_string()));
                Value::void()
            }
        }
    }

    /// `%` with a float operand is valid when the other side is an integer
    /// and the float fits the integer domain
    fn float_mod(&mut self, mut l: Value, mut r: Value) -> Option<Value> {
        if !bits::is_integer(l.ty.id) {
            if !bits::is_integer(r.ty.id) {
                return None;
            }
            std::mem::swap(&mut l, &mut r);
        }
        let fits_i64 = r.constant.as_ref().map_or(true, Const::fits_i64);
        let fits_u64 = r.constant.as_ref().map_or(true, Const::fits_u64);
        if bits::is_signed_integer(l.ty.id) {
            if fits_i64 {
                return Some(self.integer(&l, BinOp::Mod, &r, true));
            }
            if fits_u64 {
                return Some(self.integer(&l, BinOp::Mod, &r, false));
            }
        } else if fits_i64 || fits_u64 {
            return Some(self.integer(&l, BinOp::Mod, &r, false));
        }
        None
    }

    fn integer(&mut self, l: &Value, op: BinOp, r: &Value, signed: bool) -> Value {
        if !bits::is_numeric(l.ty.id) || !bits::is_numeric(r.ty.id) {
            self.incompatible(&r.ty, &l.ty);
            return Value::void();
        }
        match op {
            op if op.is_comparison() => self.compare(l, op, r),
            BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Mod
            | BinOp::BitAnd
            | BinOp::BitOr
            | BinOp::BitXor => {
                let ty = self.promoted(&l.ty, &r.ty);
                self.arith(l, op, r, ty)
            }
            BinOp::Shl | BinOp::Shr => self.shift(l, op, r),
            _ => {
                let symbol = op.symbol().to_string();
                self.push(if signed {
                    DiagKind::OperatorNotForInt(symbol)
                } else {
                    DiagKind::OperatorNotForUint(symbol)
                });
                Value::void()
            }
        }
    }

    // ==================== Folding ====================

    fn compare(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        let mut v = Value::new(Type::bool());
        if let (Some(a), Some(b)) = (&l.constant, &r.constant) {
            // The right operand is cast to the left operand's kind
            let ord = match a {
                Const::Float(x) => x.partial_cmp(&b.as_f64()),
                Const::Int(x) => Some(x.cmp(&b.as_i64())),
                Const::Uint(x) => Some(x.cmp(&b.as_u64())),
                _ => None,
            };
            if let Some(ord) = ord {
                use std::cmp::Ordering::*;
                let result = match op {
                    BinOp::Eq => ord == Equal,
                    BinOp::Ne => ord != Equal,
                    BinOp::Lt => ord == Less,
                    BinOp::Le => ord != Greater,
                    BinOp::Gt => ord == Greater,
                    _ => ord != Less,
                };
                v.constant = Some(Const::Bool(result));
            }
        }
        v
    }

    fn arith(&mut self, l: &Value, op: BinOp, r: &Value, ty: Type) -> Value {
        let mut v = Value::new(ty);
        let (Some(a), Some(b)) = (&l.constant, &r.constant) else {
            return v;
        };
        // The left kind decides; the static type is the promoted one
        let folded = match a {
            Const::Float(x) => self.fold_float(*x, op, b.as_f64()),
            Const::Int(x) => self.fold_signed(*x, op, b.as_i64()),
            Const::Uint(x) => self.fold_unsigned(*x, op, b.as_u64()),
            _ => None,
        };
        v.constant = folded;
        v
    }

    fn fold_float(&mut self, a: f64, op: BinOp, b: f64) -> Option<Const> {
        let value = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => {
                if b == 0.0 {
                    self.push(DiagKind::DivideByZero);
                    0.0
                } else {
                    a / b
                }
            }
            _ => return None,
        };
        Some(Const::Float(value))
    }

    fn fold_signed(&mut self, a: i64, op: BinOp, b: i64) -> Option<Const> {
        let value = match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div | BinOp::Mod if b == 0 => {
                self.push(DiagKind::DivideByZero);
                0
            }
            BinOp::Div => a.wrapping_div(b),
            BinOp::Mod => a.wrapping_rem(b),
            BinOp::BitAnd => a & b,
            BinOp::BitOr => a | b,
            BinOp::BitXor => a ^ b,
            _ => return None,
        };
        Some(Const::Int(value))
    }

    fn fold_unsigned(&mut self, a: u64, op: BinOp, b: u64) -> Option<Const> {
        let value = match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div | BinOp::Mod if b == 0 => {
                self.push(DiagKind::DivideByZero);
                0
            }
            BinOp::Div => a / b,
            BinOp::Mod => a % b,
            BinOp::BitAnd => a & b,
            BinOp::BitOr => a | b,
            BinOp::BitXor => a ^ b,
            _ => return None,
        };
        Some(Const::Uint(value))
    }

    fn shift(&mut self, l: &Value, op: BinOp, r: &Value) -> Value {
        let mut v = Value::new(Type::primitive(TypeId::U64));
        if !is_ok_for_shifting(r) {
            self.push(DiagKind::BitshiftMustUnsigned);
        }
        let (Some(a), Some(b)) = (&l.constant, &r.constant) else {
            return v;
        };
        let amount = b.as_u64();
        let folded = match a {
            Const::Int(x) if *x < 0 => {
                let shifted = if amount >= 64 {
                    if op == BinOp::Shr { -1 } else { 0 }
                } else if op == BinOp::Shl {
                    x.wrapping_shl(amount as u32)
                } else {
                    x >> amount
                };
                Const::Int(shifted)
            }
            _ => {
                let x = a.as_u64();
                let shifted = if amount >= 64 {
                    0
                } else if op == BinOp::Shl {
                    x << amount
                } else {
                    x >> amount
                };
                Const::Uint(shifted)
            }
        };
        v.ty = Type::primitive(bits::shift_result(amount));
        v.constant = Some(folded);
        v
    }

    /// Constness and smallest-category normalisation
    fn finalize(&self, v: &mut Value, l: &Value, r: &Value) {
        if v.ty.is_void() || !(l.is_const() && r.is_const()) {
            v.constant = None;
            return;
        }
        if v.constant.is_none() {
            // Non-foldable operator over constants
            return;
        }
        v.is_rune = l.is_rune && r.is_rune;
        if l.is_rune || r.is_rune {
            return;
        }
        let id = match v.constant {
            Some(Const::Float(x)) => bits::float_from_bits(bits::bitsize_float(x)),
            Some(Const::Int(x)) => bits::int_from_bits(bits::bitsize_int(x)),
            Some(Const::Uint(x)) => bits::uint_from_bits(bits::bitsize_uint(x)),
            _ => return,
        };
        v.ty = Type::primitive(id).with_span(v.ty.span);
    }
}

/// Shift amounts must be non-negative integers
fn is_ok_for_shifting(r: &Value) -> bool {
    if !r.ty.is_pure() || !bits::is_integer(r.ty.id) {
        return false;
    }
    match &r.constant {
        None => true,
        Some(Const::Int(x)) => *x >= 0,
        Some(Const::Uint(_)) => true,
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumId, StructId, TraitId};
    use pretty_assertions::assert_eq;

    struct Defs;

    impl Definitions for Defs {
        fn implements(&self, _: StructId, _: TraitId) -> bool {
            false
        }
        fn has_ref_receiver(&self, _: TraitId) -> bool {
            false
        }
        fn enum_base(&self, _: EnumId) -> Type {
            Type::primitive(TypeId::U8)
        }
    }

    fn solve(l: &Value, op: BinOp, r: &Value) -> (Value, Vec<&'static str>) {
        let mut diags = Diagnostics::new();
        let v = Solver::new(&Defs, WordSize::Bits64, &mut diags, Span::dummy()).solve(l, op, r);
        (v, diags.iter().map(|d| d.key()).collect())
    }

    fn int(v: i64) -> Value {
        Value::constant(Type::primitive(TypeId::Int), Const::Int(v))
    }

    fn i64_(v: i64) -> Value {
        Value::constant(Type::primitive(TypeId::I64), Const::Int(v))
    }

    fn float(v: f64) -> Value {
        Value::constant(Type::primitive(TypeId::F64), Const::Float(v))
    }

    fn var(id: TypeId) -> Value {
        Value::new(Type::primitive(id))
    }

    #[test]
    fn test_divide_by_zero_recovers() {
        let (v, diags) = solve(&i64_(10), BinOp::Div, &i64_(0));
        assert_eq!(diags, vec!["divide_by_zero"]);
        assert_eq!(v.constant, Some(Const::Int(0)));

        let (v, diags) = solve(&float(1.5), BinOp::Div, &float(0.0));
        assert_eq!(diags, vec!["divide_by_zero"]);
        assert_eq!(v.constant, Some(Const::Float(0.0)));

        let (v, diags) = solve(&i64_(7), BinOp::Div, &i64_(2));
        assert!(diags.is_empty());
        assert_eq!(v.constant, Some(Const::Int(3)));

        let (v, diags) = solve(&i64_(7), BinOp::Mod, &i64_(0));
        assert_eq!(diags, vec!["divide_by_zero"]);
        assert_eq!(v.constant, Some(Const::Int(0)));
    }

    #[test]
    fn test_promotion_to_smallest_category() {
        let (v, _) = solve(&int(1), BinOp::Add, &int(2));
        assert_eq!(v.ty.id, TypeId::I8);
        assert_eq!(v.constant, Some(Const::Int(3)));

        let (v, _) = solve(&int(100), BinOp::Add, &int(100));
        assert_eq!(v.ty.id, TypeId::I16);

        let (v, _) = solve(&int(70_000), BinOp::Mul, &int(70_000));
        assert_eq!(v.ty.id, TypeId::I64);

        let big = Value::constant(Type::primitive(TypeId::U64), Const::Uint(300));
        let (v, _) = solve(&big, BinOp::Sub, &int(100));
        assert_eq!(v.ty.id, TypeId::U8);
        assert_eq!(v.constant, Some(Const::Uint(200)));
    }

    #[test]
    fn test_rune_operands_keep_category() {
        let mut rune = Value::constant(Type::primitive(TypeId::I32), Const::Int('a' as i64));
        rune.is_rune = true;
        let (v, _) = solve(&rune, BinOp::Add, &int(1));
        assert_eq!(v.constant, Some(Const::Int('b' as i64)));
        assert_eq!(v.ty.id, TypeId::Int);
        assert!(!v.is_rune);
    }

    #[test]
    fn test_non_constant_keeps_static_type() {
        let (v, diags) = solve(&var(TypeId::I32), BinOp::Add, &var(TypeId::I64));
        assert!(diags.is_empty());
        assert_eq!(v.ty.id, TypeId::I64);
        assert!(!v.is_const());

        let (v, _) = solve(&var(TypeId::I64), BinOp::Add, &int(1));
        assert!(!v.is_const());
        assert_eq!(v.ty.id, TypeId::I64);
    }

    #[test]
    fn test_float_domain() {
        let (v, _) = solve(&float(2.5), BinOp::Add, &int(1));
        assert_eq!(v.constant, Some(Const::Float(3.5)));
        assert_eq!(v.ty.id, TypeId::F32);

        let (v, _) = solve(&float(1.5), BinOp::Lt, &int(2));
        assert_eq!(v.constant, Some(Const::Bool(true)));

        let (_, diags) = solve(&float(1.5), BinOp::BitAnd, &float(2.0));
        assert_eq!(diags, vec!["operator_not_for_float"]);

        let (_, diags) = solve(&float(1.5), BinOp::Mod, &float(2.0));
        assert_eq!(diags, vec!["operator_not_for_float"]);

        let (v, diags) = solve(&int(7), BinOp::Mod, &float(2.0));
        assert!(diags.is_empty());
        assert_eq!(v.constant, Some(Const::Int(1)));
    }

    #[test]
    fn test_mixed_kinds_fold_as_left_operand() {
        let (v, diags) = solve(&int(1), BinOp::Add, &float(2.5));
        assert!(diags.is_empty());
        assert_eq!(v.constant, Some(Const::Int(3)));
        assert_eq!(v.ty.id, TypeId::I8);

        let (v, _) = solve(&int(7), BinOp::Mul, &float(0.5));
        assert_eq!(v.constant, Some(Const::Int(0)));

        let (v, _) = solve(&int(1), BinOp::Lt, &float(1.5));
        assert_eq!(v.constant, Some(Const::Bool(false)));

        let (v, _) = solve(&float(1.5), BinOp::Gt, &int(1));
        assert_eq!(v.constant, Some(Const::Bool(true)));

        let (v, _) = solve(&float(1.5), BinOp::Div, &int(2));
        assert_eq!(v.constant, Some(Const::Float(0.75)));
    }

    #[test]
    fn test_shift_rules() {
        let (v, diags) = solve(&int(1), BinOp::Shl, &int(10));
        assert!(diags.is_empty());
        assert_eq!(v.constant, Some(Const::Uint(1024)));
        assert_eq!(v.ty.id, TypeId::U16);

        let (_, diags) = solve(&int(1), BinOp::Shl, &int(-1));
        assert_eq!(diags, vec!["bitshift_must_unsigned"]);

        let (v, _) = solve(&int(-8), BinOp::Shr, &int(1));
        assert_eq!(v.constant, Some(Const::Int(-4)));

        let (v, _) = solve(&var(TypeId::I32), BinOp::Shl, &var(TypeId::U8));
        assert_eq!(v.ty.id, TypeId::U64);
    }

    #[test]
    fn test_string_and_bool_domains() {
        let s = |x: &str| Value::constant(Type::primitive(TypeId::Str), Const::Str(x.into()));
        let (v, _) = solve(&s("ab"), BinOp::Add, &s("cd"));
        assert_eq!(v.constant, Some(Const::Str("abcd".into())));
        let (_, diags) = solve(&s("ab"), BinOp::Sub, &s("cd"));
        assert_eq!(diags, vec!["operator_not_for_janetype"]);
        let (_, diags) = solve(&s("ab"), BinOp::Add, &int(1));
        assert_eq!(diags, vec!["incompatible_types"]);

        let b = |x: bool| Value::constant(Type::bool(), Const::Bool(x));
        let (v, _) = solve(&b(true), BinOp::And, &b(false));
        assert_eq!(v.constant, Some(Const::Bool(false)));
        let (_, diags) = solve(&b(true), BinOp::And, &int(1));
        assert_eq!(diags, vec!["logical_not_bool"]);
    }

    #[test]
    fn test_nil_pointer_and_enum_domains() {
        let nil = Value::new(Type::nil());
        let ptr = Value::new(Type::primitive(TypeId::Int).pointer_to());
        let (v, diags) = solve(&ptr, BinOp::Eq, &nil);
        assert!(diags.is_empty());
        assert_eq!(v.ty, Type::bool());

        let (v, _) = solve(&ptr, BinOp::Add, &ptr);
        assert_eq!(v.ty.kind, "*int");
        let (_, diags) = solve(&ptr, BinOp::Mul, &ptr);
        assert_eq!(diags, vec!["operator_not_for_janetype"]);

        let color = Value::constant(Type::enumeration(EnumId(0), "Color"), Const::Uint(2));
        let (v, diags) = solve(&color, BinOp::Eq, &color);
        assert!(diags.is_empty());
        assert_eq!(v.constant, Some(Const::Bool(true)));
    }
}
