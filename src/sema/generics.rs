//! Generic bindings, arity checks, inference and instantiation records

use crate::sema::diagnostic::DiagKind;
use crate::types::{Type, TypeId};

// ==================== Binding stack ====================

/// Generic parameter bound to a concrete type
#[derive(Debug, Clone, PartialEq)]
pub struct GenericBinding {
    pub name: String,
    pub ty: Type,
}

/// Scoped generic bindings. Inner frames shadow outer ones.
#[derive(Debug, Default)]
pub struct BindingStack {
    frames: Vec<Vec<GenericBinding>>,
}

impl BindingStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.frames.pop();
    }

    /// Binds `name` in the innermost frame
    pub fn bind(&mut self, name: &str, ty: Type) {
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        if let Some(frame) = self.frames.last_mut() {
            log::trace!("bind generic {} = {}", name, ty);
            frame.push(GenericBinding {
                name: name.to_string(),
                ty,
            });
        }
    }

    /// Pushes a frame binding `names` pairwise to `types`
    pub fn push_all(&mut self, names: &[String], types: &[Type]) {
        self.push_scope();
        for (name, ty) in names.iter().zip(types) {
            self.bind(name, ty.clone());
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|b| b.name == name)
            .map(|b| &b.ty)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

// ==================== Arity ====================

/// Checks the generic argument count of a reference
pub fn check_quantity(required: usize, given: usize) -> Option<DiagKind> {
    match (required, given) {
        (0, g) if g > 0 => Some(DiagKind::GenericsNotSupports),
        (r, 0) if r > 0 => Some(DiagKind::HasGenerics),
        (r, g) if g > r => Some(DiagKind::GenericsOverflow),
        (r, g) if g < r => Some(DiagKind::MissingGenerics),
        _ => None,
    }
}

/// Every generic parameter occurs in at least one parameter type
pub fn is_inferable(generics: &[String], params: &[Type]) -> bool {
    generics
        .iter()
        .all(|g| params.iter().any(|p| mentions_generic(p, g)))
}

fn mentions_generic(ty: &Type, name: &str) -> bool {
    if ty.id == TypeId::Generic {
        return ty.kind.trim_start_matches(|c: char| c == '*' || c == '&') == name;
    }
    if ty.component().map_or(false, |c| mentions_generic(c, name)) {
        return true;
    }
    if let Some(sig) = ty.fn_sig() {
        return sig.params.iter().any(|p| mentions_generic(&p.ty, name))
            || mentions_generic(&sig.ret, name);
    }
    if let Some((_, generics)) = ty.struct_def() {
        return generics.iter().any(|g| mentions_generic(g, name));
    }
    ty.types().iter().any(|t| mentions_generic(t, name))
}

// ==================== Inference ====================

/// Generic types discovered from argument types. The first inference wins.
#[derive(Debug, Default)]
pub struct Inferred {
    pub bindings: Vec<GenericBinding>,
    /// (name, kept, ignored)
    pub conflicts: Vec<(String, Type, Type)>,
}

impl Inferred {
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.bindings.iter().find(|b| b.name == name).map(|b| &b.ty)
    }

    fn record(&mut self, name: &str, ty: Type) {
        match self.get(name) {
            Some(existing) if *existing != ty => {
                self.conflicts.push((name.to_string(), existing.clone(), ty));
            }
            Some(_) => {}
            None => {
                log::trace!("inferred generic {} = {}", name, ty);
                self.bindings.push(GenericBinding {
                    name: name.to_string(),
                    ty,
                });
            }
        }
    }

    /// Bound types in the order of `names`; `None` if one is missing
    pub fn ordered(&self, names: &[String]) -> Option<Vec<Type>> {
        names.iter().map(|n| self.get(n).cloned()).collect()
    }
}

/// Walks a template parameter type alongside an argument type.
/// Returns false when the shapes disagree.
pub fn infer(param: &Type, arg: &Type, out: &mut Inferred) -> bool {
    if !param.has_generic() {
        return true;
    }
    if arg.is_void() || arg.is_nil() {
        return false;
    }

    if param.id == TypeId::Generic {
        let mods = param.modifiers();
        if !arg.kind.starts_with(mods) || arg.modifiers().len() < mods.len() {
            return false;
        }
        let mut concrete = arg.clone();
        for _ in 0..mods.len() {
            concrete = concrete.elem();
        }
        out.record(&param.kind[mods.len()..], concrete);
        return true;
    }

    if param.modifiers() != arg.modifiers() {
        return false;
    }

    if let Some(sig) = param.fn_sig() {
        let Some(given) = arg.fn_sig() else {
            return false;
        };
        if sig.params.len() != given.params.len() {
            return false;
        }
        let mut ok = true;
        for (p, a) in sig.params.iter().zip(&given.params) {
            ok &= infer(&p.ty, &a.ty, out);
        }
        return infer(&sig.ret, &given.ret, out) && ok;
    }

    if param.is_map() {
        if !arg.is_map() {
            return false;
        }
        let (p, a) = (param.types(), arg.types());
        if p.len() != 2 || a.len() != 2 {
            return false;
        }
        let key = infer(&p[0], &a[0], out);
        let value = infer(&p[1], &a[1], out);
        return key && value;
    }

    if param.is_slice() || param.is_array() {
        let (mut p, mut a) = (param, arg);
        while p.is_slice() || p.is_array() {
            if p.is_slice() != a.is_slice() || p.is_array() != a.is_array() {
                return false;
            }
            match (p.component(), a.component()) {
                (Some(pc), Some(ac)) => {
                    p = pc;
                    a = ac;
                }
                _ => return false,
            }
        }
        return infer(p, a, out);
    }

    if let Some((pdef, pgen)) = param.struct_def() {
        let Some((adef, agen)) = arg.struct_def() else {
            return false;
        };
        if pdef != adef || pgen.len() != agen.len() {
            return false;
        }
        let mut ok = true;
        for (p, a) in pgen.iter().zip(agen) {
            ok &= infer(p, a, out);
        }
        return ok;
    }

    false
}

// ==================== Instantiation records ====================

/// Ordered list of distinct concrete generic argument lists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Combines {
    list: Vec<Vec<Type>>,
}

impl Combines {
    pub fn contains(&self, generics: &[Type]) -> bool {
        self.list.iter().any(|c| c.as_slice() == generics)
    }

    /// Appends a combination; false when it was already recorded
    pub fn insert(&mut self, generics: Vec<Type>) -> bool {
        if self.contains(&generics) {
            return false;
        }
        self.list.push(generics);
        true
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec<Type>> {
        self.list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FnSig, Param};
    use pretty_assertions::assert_eq;

    fn int() -> Type {
        Type::primitive(TypeId::Int)
    }

    fn str_() -> Type {
        Type::primitive(TypeId::Str)
    }

    #[test]
    fn test_quantity_outcomes() {
        assert_eq!(check_quantity(0, 1), Some(DiagKind::GenericsNotSupports));
        assert_eq!(check_quantity(2, 0), Some(DiagKind::HasGenerics));
        assert_eq!(check_quantity(1, 2), Some(DiagKind::GenericsOverflow));
        assert_eq!(check_quantity(3, 2), Some(DiagKind::MissingGenerics));
        assert_eq!(check_quantity(2, 2), None);
        assert_eq!(check_quantity(0, 0), None);
    }

    #[test]
    fn test_binding_shadowing() {
        let mut stack = BindingStack::new();
        stack.push_all(&["T".to_string()], &[int()]);
        stack.push_all(&["T".to_string()], &[str_()]);
        assert_eq!(stack.lookup("T"), Some(&str_()));
        stack.pop_scope();
        assert_eq!(stack.lookup("T"), Some(&int()));
        stack.pop_scope();
        assert_eq!(stack.lookup("T"), None);
    }

    #[test]
    fn test_infer_through_shapes() {
        let mut out = Inferred::default();
        let param = Type::map(Type::generic("K"), Type::slice(Type::generic("V")));
        let arg = Type::map(str_(), Type::slice(int()));
        assert!(infer(&param, &arg, &mut out));
        assert_eq!(out.get("K"), Some(&str_()));
        assert_eq!(out.get("V"), Some(&int()));

        let mut out = Inferred::default();
        assert!(!infer(&param, &Type::slice(int()), &mut out));
        assert!(out.bindings.is_empty());
    }

    #[test]
    fn test_infer_pointer_and_fn() {
        let mut out = Inferred::default();
        assert!(infer(&Type::generic("T").pointer_to(), &int().pointer_to(), &mut out));
        assert_eq!(out.get("T"), Some(&int()));

        let sig = |p: Type, r: Type| {
            Type::func(FnSig {
                params: vec![Param {
                    name: String::new(),
                    ty: p,
                    mutable: false,
                    variadic: false,
                    has_default: false,
                }],
                ret: r,
                is_method: false,
                generic: false,
                is_unsafe: false,
            })
        };
        let mut out = Inferred::default();
        assert!(infer(
            &sig(Type::generic("A"), Type::generic("B")),
            &sig(str_(), int()),
            &mut out
        ));
        assert_eq!(out.ordered(&["A".into(), "B".into()]), Some(vec![str_(), int()]));
    }

    #[test]
    fn test_first_inference_wins() {
        let mut out = Inferred::default();
        infer(&Type::generic("T"), &int(), &mut out);
        infer(&Type::generic("T"), &str_(), &mut out);
        assert_eq!(out.get("T"), Some(&int()));
        assert_eq!(out.conflicts.len(), 1);
    }

    #[test]
    fn test_inferable_requires_every_generic() {
        let generics = vec!["T".to_string(), "U".to_string()];
        assert!(!is_inferable(&generics, &[Type::generic("T")]));
        assert!(is_inferable(
            &generics,
            &[Type::generic("T"), Type::slice(Type::generic("U"))]
        ));
    }

    #[test]
    fn test_combines_deduplicate() {
        let mut combines = Combines::default();
        assert!(combines.insert(vec![int()]));
        assert!(!combines.insert(vec![int()]));
        assert!(combines.insert(vec![str_()]));
        assert_eq!(combines.len(), 2);
    }
}
