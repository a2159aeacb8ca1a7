//! Assignability of a value into a typed slot
//!
//! Runs three stages: function-value validity, constant range, then the
//! structural type check.

use crate::sema::diagnostic::{DiagKind, Diagnostics};
use crate::sema::value::{Const, Value};
use crate::types::{bits, CompatChecker, Compatibility, Definitions, Type, WordSize};
use crate::utils::Span;

/// One assignment check
pub struct AssignCheck<'a, D: Definitions + ?Sized> {
    defs: &'a D,
    word_size: WordSize,
    diags: &'a mut Diagnostics,
    span: Span,
    pub ignore_any: bool,
    pub allow_assign: bool,
}

impl<'a, D: Definitions + ?Sized> AssignCheck<'a, D> {
    pub fn new(defs: &'a D, word_size: WordSize, diags: &'a mut Diagnostics, span: Span) -> Self {
        Self {
            defs,
            word_size,
            diags,
            span,
            ignore_any: false,
            allow_assign: true,
        }
    }

    /// Returns false when a diagnostic was recorded
    pub fn check(&mut self, target: &Type, value: &Value) -> bool {
        if !self.check_validity(value) {
            return false;
        }
        match self.check_const(target, value) {
            Some(ok) => ok,
            None => self.check_type(target, &value.ty),
        }
    }

    /// Methods and generic templates are not first-class values
    fn check_validity(&mut self, value: &Value) -> bool {
        if !value.ty.is_fn() {
            return true;
        }
        if value.is_method {
            self.diags.push(DiagKind::MethodAsAnonymousFn, self.span);
            return false;
        }
        if value.is_generic_fn {
            self.diags.push(DiagKind::GenericedFnAsAnonymousFn, self.span);
            return false;
        }
        true
    }

    /// `None` when the range check does not apply
    fn check_const(&mut self, target: &Type, value: &Value) -> Option<bool> {
        let folded = value.constant.as_ref()?;
        if !target.is_pure() || !value.ty.is_pure() || !bits::is_numeric(value.ty.id) {
            return None;
        }
        let fits = if bits::is_float(target.id) {
            float_assignable(target, folded)
        } else if bits::is_integer(target.id) {
            self.int_assignable(target, folded)
        } else {
            return None;
        };
        if !fits {
            self.diags.push(DiagKind::OverflowLimits, self.span);
        }
        Some(fits)
    }

    fn int_assignable(&self, target: &Type, folded: &Const) -> bool {
        let ws = self.word_size;
        if bits::is_signed_integer(target.id) {
            let (min, max) = (bits::min_signed(target.id, ws), bits::max_signed(target.id, ws));
            match *folded {
                Const::Float(v) => v.fract() == 0.0 && v >= min as f64 && v <= max as f64,
                Const::Uint(v) => v <= max as u64,
                Const::Int(v) => v >= min && v <= max,
                _ => false,
            }
        } else {
            let max = bits::max_unsigned(target.id, ws);
            match *folded {
                Const::Float(v) => v >= 0.0 && v.fract() == 0.0 && v <= max as f64,
                Const::Uint(v) => v <= max,
                Const::Int(v) => v >= 0 && (v as u64) <= max,
                _ => false,
            }
        }
    }

    fn check_type(&mut self, target: &Type, given: &Type) -> bool {
        if given.is_void() {
            self.incompatible(target, given);
            return false;
        }
        if !self.ignore_any && target.is_any() {
            return true;
        }
        if target.is_tuple() || given.is_tuple() {
            return self.check_tuple(target, given);
        }
        let result = CompatChecker::new(self.defs, self.word_size)
            .ignore_any(self.ignore_any)
            .allow_assign(self.allow_assign)
            .check(target, given);
        match result {
            Compatibility::Compatible => true,
            Compatibility::TraitNeedsReference => {
                self.diags.push(
                    DiagKind::TraitHasReferenceParameteredFunction(target.kind.clone()),
                    self.span,
                );
                false
            }
            Compatibility::Incompatible => {
                self.incompatible(target, given);
                false
            }
        }
    }

    fn check_tuple(&mut self, target: &Type, given: &Type) -> bool {
        let (ts, gs) = (target.types(), given.types());
        if !target.is_tuple() || !given.is_tuple() || ts.len() != gs.len() {
            self.incompatible(target, given);
            return false;
        }
        let mut ok = true;
        for (t, g) in ts.iter().zip(gs) {
            ok &= self.check_type(t, g);
        }
        ok
    }

    fn incompatible(&mut self, target: &Type, given: &Type) {
        self.diags.push(
            DiagKind::IncompatibleTypes(target.kind.clone(), given.kind.clone()),
            self.span,
        );
    }
}

fn float_assignable(target: &Type, folded: &Const) -> bool {
    let v = folded.as_f64();
    let max = bits::max_float(target.id);
    v.is_finite() && v >= -max && v <= max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumId, StructId, TraitId, TypeId};
    use pretty_assertions::assert_eq;

    struct NoDefs;

    impl Definitions for NoDefs {
        fn implements(&self, _: StructId, _: TraitId) -> bool {
            false
        }
        fn has_ref_receiver(&self, _: TraitId) -> bool {
            false
        }
        fn enum_base(&self, _: EnumId) -> Type {
            Type::primitive(TypeId::U32)
        }
    }

    fn run(target: &Type, value: &Value) -> (bool, Vec<&'static str>) {
        let mut diags = Diagnostics::new();
        let ok = AssignCheck::new(&NoDefs, WordSize::Bits64, &mut diags, Span::dummy())
            .check(target, value);
        (ok, diags.iter().map(|d| d.key()).collect())
    }

    fn int_const(v: i64) -> Value {
        Value::constant(Type::primitive(TypeId::Int), Const::Int(v))
    }

    #[test]
    fn test_constant_range() {
        assert_eq!(run(&Type::primitive(TypeId::U8), &int_const(255)), (true, vec![]));
        assert_eq!(
            run(&Type::primitive(TypeId::U8), &int_const(256)),
            (false, vec!["overflow_limits"])
        );
        assert_eq!(
            run(&Type::primitive(TypeId::U8), &int_const(-1)),
            (false, vec!["overflow_limits"])
        );
        assert_eq!(run(&Type::primitive(TypeId::I8), &int_const(-128)), (true, vec![]));
    }

    #[test]
    fn test_float_constant_into_integer() {
        let whole = Value::constant(Type::primitive(TypeId::F64), Const::Float(4.0));
        let frac = Value::constant(Type::primitive(TypeId::F64), Const::Float(4.5));
        assert_eq!(run(&Type::primitive(TypeId::I32), &whole), (true, vec![]));
        assert_eq!(
            run(&Type::primitive(TypeId::I32), &frac),
            (false, vec!["overflow_limits"])
        );
    }

    #[test]
    fn test_non_constant_uses_lattice() {
        let var = Value::new(Type::primitive(TypeId::I64));
        assert_eq!(
            run(&Type::primitive(TypeId::I32), &var),
            (false, vec!["incompatible_types"])
        );
        assert_eq!(run(&Type::primitive(TypeId::Any), &var), (true, vec![]));
        assert_eq!(
            run(&Type::primitive(TypeId::Int), &Value::void()),
            (false, vec!["incompatible_types"])
        );
    }

    #[test]
    fn test_methods_are_not_values() {
        let mut method = Value::new(Type::func(crate::types::FnSig {
            params: Vec::new(),
            ret: Type::void(),
            is_method: true,
            generic: false,
            is_unsafe: false,
        }));
        method.is_method = true;
        let target = method.ty.clone();
        assert_eq!(run(&target, &method), (false, vec!["method_as_anonymous_fn"]));
    }

    #[test]
    fn test_tuples_compare_componentwise() {
        let int = Type::primitive(TypeId::Int);
        let target = Type::tuple(vec![int.clone(), Type::primitive(TypeId::Str)]);
        let same = Value::new(target.clone());
        let swapped = Value::new(Type::tuple(vec![Type::primitive(TypeId::Str), int]));
        assert_eq!(run(&target, &same), (true, vec![]));
        assert_eq!(run(&target, &swapped).1.len(), 2);
    }
}
