//! Type Compatibility Checker
//!
//! Pairwise structural compatibility between a required and a given type.
//! A plain mismatch is returned silently; callers decide whether to report
//! it. Only the trait reference-receiver rule produces its own error.

use crate::types::bits::{self, WordSize};
use crate::types::{Definitions, Type};

/// Outcome of a compatibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    Incompatible,
    /// Struct passed by value where the trait has `&self` methods
    TraitNeedsReference,
}

impl Compatibility {
    pub fn is_ok(&self) -> bool {
        *self == Compatibility::Compatible
    }

    fn from_bool(ok: bool) -> Self {
        if ok {
            Compatibility::Compatible
        } else {
            Compatibility::Incompatible
        }
    }
}

/// Compatibility checker over package definitions
pub struct CompatChecker<'a, D: Definitions + ?Sized> {
    defs: &'a D,
    word_size: WordSize,
    /// `any` does not accept everything
    pub ignore_any: bool,
    /// Plain values may be stored into reference slots
    pub allow_assign: bool,
}

impl<'a, D: Definitions + ?Sized> CompatChecker<'a, D> {
    pub fn new(defs: &'a D, word_size: WordSize) -> Self {
        Self {
            defs,
            word_size,
            ignore_any: false,
            allow_assign: false,
        }
    }

    pub fn ignore_any(mut self, ignore: bool) -> Self {
        self.ignore_any = ignore;
        self
    }

    pub fn allow_assign(mut self, allow: bool) -> Self {
        self.allow_assign = allow;
        self
    }

    /// Check `given` against `required`
    pub fn check(&self, required: &Type, given: &Type) -> Compatibility {
        let (l, r) = (required, given);

        if l.is_trait() || r.is_trait() {
            return if r.is_trait() && !l.is_trait() {
                self.check_trait(r, l)
            } else {
                self.check_trait(l, r)
            };
        }

        if l.is_ref() || r.is_ref() {
            if !l.is_ref() {
                // A reference never fits a plain slot
                return Compatibility::from_bool(l.kind == r.kind);
            }
            return self.check_ref(l, r);
        }

        if l.is_ptr() || r.is_ptr() {
            let (l, r) = if !l.is_ptr() { (r, l) } else { (l, r) };
            return Compatibility::from_bool(self.check_ptr(l, r));
        }

        if l.is_slice() || r.is_slice() {
            let (l, r) = if r.is_slice() { (r, l) } else { (l, r) };
            return Compatibility::from_bool(r.is_nil() || l.kind == r.kind);
        }

        if l.is_array() || r.is_array() {
            let (l, r) = if r.is_array() && !l.is_array() { (r, l) } else { (l, r) };
            return Compatibility::from_bool(self.check_array(l, r));
        }

        if l.is_map() || r.is_map() {
            let (l, r) = if r.is_map() { (r, l) } else { (l, r) };
            return Compatibility::from_bool(r.is_nil() || l.kind == r.kind);
        }

        if l.is_nil_compatible() {
            return Compatibility::from_bool(r.is_nil());
        }
        if r.is_nil_compatible() {
            return Compatibility::from_bool(l.is_nil());
        }

        if l.is_enum() || r.is_enum() {
            return Compatibility::from_bool(l.id == r.id && l.kind == r.kind);
        }

        if l.is_struct() || r.is_struct() {
            let (l, r) = if r.is_struct() && !l.is_struct() { (r, l) } else { (l, r) };
            return Compatibility::from_bool(self.check_struct(l, r));
        }

        if l.is_tuple() || r.is_tuple() {
            return Compatibility::from_bool(l == r);
        }

        Compatibility::from_bool(bits::types_are_compatible(
            l.id,
            r.id,
            self.ignore_any,
            self.word_size,
        ))
    }

    fn check_ref(&self, l: &Type, r: &Type) -> Compatibility {
        if l.kind == r.kind {
            return Compatibility::Compatible;
        }
        if !self.allow_assign {
            return Compatibility::Incompatible;
        }
        self.check(&l.elem(), r)
    }

    fn check_ptr(&self, l: &Type, r: &Type) -> bool {
        if r.is_nil() {
            return true;
        }
        if l.is_unsafe_ptr() {
            return r.is_ptr();
        }
        l.kind == r.kind
    }

    fn check_array(&self, l: &Type, r: &Type) -> bool {
        if !l.is_array() || !r.is_array() {
            return false;
        }
        let size_ok = l.size.is_none() || l.size == r.size;
        let elem_ok = match (l.component(), r.component()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        size_ok && elem_ok
    }

    fn check_struct(&self, l: &Type, r: &Type) -> bool {
        let (Some((ldef, lgen)), Some((rdef, rgen))) = (l.struct_def(), r.struct_def()) else {
            return false;
        };
        if ldef != rdef || l.modifiers() != r.modifiers() {
            return false;
        }
        lgen.len() == rgen.len() && lgen.iter().zip(rgen).all(|(a, b)| a == b)
    }

    /// `l` is the trait side
    fn check_trait(&self, l: &Type, r: &Type) -> Compatibility {
        if r.is_nil() {
            return Compatibility::Compatible;
        }
        let Some(trait_id) = l.trait_def() else {
            return Compatibility::Incompatible;
        };

        let (r, by_ref) = if r.is_ref() { (r.elem(), true) } else { (r.clone(), false) };

        if r.is_struct() {
            if !l.modifiers().is_empty() || !r.modifiers().is_empty() {
                return Compatibility::Incompatible;
            }
            let Some((def, _)) = r.struct_def() else {
                return Compatibility::Incompatible;
            };
            if !self.defs.implements(def, trait_id) {
                return Compatibility::Incompatible;
            }
            if self.defs.has_ref_receiver(trait_id) && !by_ref {
                return Compatibility::TraitNeedsReference;
            }
            return Compatibility::Compatible;
        }

        if r.is_trait() && !by_ref {
            return Compatibility::from_bool(
                r.trait_def() == Some(trait_id) && l.modifiers() == r.modifiers(),
            );
        }

        Compatibility::Incompatible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumId, StructId, TraitId, TypeId};
    use pretty_assertions::assert_eq;

    /// Struct 0 implements trait 0; trait 1 has a `&self` method and struct 0 implements it too
    struct Fixture;

    impl Definitions for Fixture {
        fn implements(&self, def: StructId, _tr: TraitId) -> bool {
            def == StructId(0)
        }

        fn has_ref_receiver(&self, tr: TraitId) -> bool {
            tr == TraitId(1)
        }

        fn enum_base(&self, _: EnumId) -> Type {
            Type::primitive(TypeId::U32)
        }
    }

    fn checker() -> CompatChecker<'static, Fixture> {
        CompatChecker::new(&Fixture, WordSize::Bits64)
    }

    fn int() -> Type {
        Type::primitive(TypeId::Int)
    }

    #[test]
    fn test_reference_rule_is_asymmetric() {
        let c = checker().allow_assign(true);
        assert_eq!(c.check(&int().reference_to(), &int()), Compatibility::Compatible);
        assert_eq!(c.check(&int(), &int().reference_to()), Compatibility::Incompatible);
        let strict = checker();
        assert_eq!(strict.check(&int().reference_to(), &int()), Compatibility::Incompatible);
        assert!(strict.check(&int().reference_to(), &int().reference_to()).is_ok());
    }

    #[test]
    fn test_nil_compatible_shapes() {
        let c = checker();
        assert!(c.check(&Type::slice(int()), &Type::nil()).is_ok());
        assert!(c.check(&int().pointer_to(), &Type::nil()).is_ok());
        assert!(c.check(&Type::map(int(), int()), &Type::nil()).is_ok());
        assert!(!c.check(&int(), &Type::nil()).is_ok());
    }

    #[test]
    fn test_arrays_need_equal_size() {
        let c = checker();
        assert!(c.check(&Type::array(int(), Some(3)), &Type::array(int(), Some(3))).is_ok());
        assert!(!c.check(&Type::array(int(), Some(3)), &Type::array(int(), Some(4))).is_ok());
        assert!(c.check(&Type::array(int(), None), &Type::array(int(), Some(4))).is_ok());
    }

    #[test]
    fn test_structs_compare_definition_and_generics() {
        let c = checker();
        let a = Type::structure(StructId(2), "Box", vec![int()]);
        let b = Type::structure(StructId(2), "Box", vec![int()]);
        let other = Type::structure(StructId(2), "Box", vec![Type::primitive(TypeId::Str)]);
        let twin = Type::structure(StructId(3), "Box", vec![int()]);
        assert!(c.check(&a, &b).is_ok());
        assert!(!c.check(&a, &other).is_ok());
        assert!(!c.check(&a, &twin).is_ok());
    }

    #[test]
    fn test_trait_rules() {
        let c = checker();
        let plain_trait = Type::trait_object(TraitId(0), "Shape");
        let ref_trait = Type::trait_object(TraitId(1), "Mutator");
        let point = Type::structure(StructId(0), "Point", Vec::new());
        let other = Type::structure(StructId(5), "Other", Vec::new());

        assert!(c.check(&plain_trait, &point).is_ok());
        assert!(!c.check(&plain_trait, &other).is_ok());
        assert_eq!(c.check(&ref_trait, &point), Compatibility::TraitNeedsReference);
        assert!(c.check(&ref_trait, &point.reference_to()).is_ok());
        assert!(c.check(&plain_trait, &Type::nil()).is_ok());
        assert!(!c.check(&plain_trait, &ref_trait).is_ok());
    }

    #[test]
    fn test_primitive_fallback() {
        let c = checker();
        assert!(c.check(&Type::primitive(TypeId::I64), &Type::primitive(TypeId::U8)).is_ok());
        assert!(!c.check(&Type::primitive(TypeId::U8), &Type::primitive(TypeId::I8)).is_ok());
        assert!(c.check(&Type::primitive(TypeId::Any), &int()).is_ok());
        assert!(!checker().ignore_any(true).check(&Type::primitive(TypeId::Any), &int()).is_ok());
    }
}
