//! Type Resolver
//!
//! Turns a syntactic `TypeExpr` into a canonical `Type`. Named types are
//! looked up in this order: generic bindings, generics of the template being
//! resolved, primitives, block aliases, builtins, package definitions.
//! Composite kinds are rebuilt from their resolved components, so resolving
//! the same reference twice yields equal types.

use crate::frontend::ast::{self, Expr, Ident, Receiver, RetType, TypeExpr};
use crate::sema::checker::{Checker, Request};
use crate::sema::defs::{self, AliasId, FuncId, Symbol};
use crate::sema::diagnostic::DiagKind;
use crate::sema::generics;
use crate::sema::value::Const;
use crate::types::{FnSig, Param, StructId, Type, TypeId};
use crate::utils::Span;

impl<'p> Checker<'p> {
    /// Resolves `texpr`. Failures are reported only when `require_ok`; a
    /// failed resolution yields the void sentinel and `false`.
    pub fn resolve(&mut self, texpr: &TypeExpr, require_ok: bool) -> (Type, bool) {
        let resolved = if require_ok {
            self.resolve_type(texpr)
        } else {
            self.quietly(|c| c.resolve_type(texpr))
        };
        match resolved {
            Some(ty) => (ty, true),
            None => (Type::void(), false),
        }
    }

    pub(crate) fn resolve_type(&mut self, texpr: &TypeExpr) -> Option<Type> {
        let ty = match texpr {
            TypeExpr::Named { name, generics, span } => self.resolve_named(name, generics, *span)?,
            TypeExpr::Pointer(inner, span) => {
                let elem = self.resolve_type(inner)?;
                if elem.is_ref() || elem.is_unsafe_ptr() {
                    self.push(DiagKind::InvalidType, *span);
                    return None;
                }
                elem.pointer_to()
            }
            TypeExpr::Ref(inner, span) => {
                let elem = self.resolve_type(inner)?;
                if !elem.valid_for_ref() {
                    self.push(DiagKind::InvalidType, *span);
                    return None;
                }
                elem.reference_to()
            }
            TypeExpr::UnsafePtr(_) => Type::unsafe_ptr(),
            TypeExpr::Slice(elem, _) => Type::slice(self.resolve_type(elem)?),
            TypeExpr::Array { size, elem, .. } => {
                let elem = self.resolve_type(elem)?;
                let size = match size {
                    Some(expr) => Some(self.array_size(expr)?),
                    None => None,
                };
                Type::array(elem, size)
            }
            TypeExpr::Map { key, value, .. } => {
                let key = self.resolve_type(key);
                let value = self.resolve_type(value);
                Type::map(key?, value?)
            }
            TypeExpr::Fn {
                params,
                variadic,
                ret,
                ..
            } => Type::func(self.resolve_fn_type(params, *variadic, ret.as_deref())?),
            TypeExpr::Tuple(types, _) => Type::tuple(self.resolve_all(types)?),
        };
        log::trace!("resolved type {}", ty);
        Some(ty.with_span(texpr.span()))
    }

    /// Resolves every type, reporting each failure
    fn resolve_all(&mut self, types: &[TypeExpr]) -> Option<Vec<Type>> {
        let mut resolved = Vec::with_capacity(types.len());
        let mut ok = true;
        for texpr in types {
            match self.resolve_type(texpr) {
                Some(ty) => resolved.push(ty),
                None => ok = false,
            }
        }
        ok.then_some(resolved)
    }

    /// Explicit generic arguments of a struct reference or a call
    pub(crate) fn resolve_generic_args(&mut self, types: &[TypeExpr]) -> Option<Vec<Type>> {
        let resolved = self.resolve_all(types)?;
        for (ty, texpr) in resolved.iter().zip(types) {
            if ty.is_enum() {
                self.push(DiagKind::EnumNotSupportsAsGeneric, texpr.span());
                return None;
            }
        }
        Some(resolved)
    }

    pub(crate) fn resolve_named(&mut self, name: &Ident, generics: &[TypeExpr], span: Span) -> Option<Type> {
        let n = name.name.as_str();

        if let Some(bound) = self.bindings.lookup(n).cloned() {
            return self.untagged(bound, generics, span);
        }
        if self.template_generics.iter().any(|g| g == n) {
            return self.untagged(Type::generic(n), generics, span);
        }
        if let Some(id) = TypeId::primitive_from_str(n) {
            return self.untagged(Type::primitive(id), generics, span);
        }
        if let Some(block) = self.current {
            if let Some(ty) = self.scopes.lookup_alias(block, n) {
                return self.untagged(ty, generics, span);
            }
        }
        if let Some(ty) = defs::builtin_alias(n) {
            return self.untagged(ty, generics, span);
        }

        let pkg = self.pkg;
        match pkg.lookup(n) {
            Some(Symbol::Alias(id)) => {
                let ty = self.alias_type(id)?;
                if !generics.is_empty() {
                    let kind = if ty.is_struct() {
                        DiagKind::GenericsNotSupports
                    } else {
                        DiagKind::InvalidTypeSource
                    };
                    self.push(kind, span);
                    return None;
                }
                Some(ty)
            }
            Some(Symbol::Enum(id)) => {
                if !generics.is_empty() {
                    self.push(DiagKind::InvalidTypeSource, span);
                    return None;
                }
                Some(Type::enumeration(id, &pkg.enum_info(id).name))
            }
            Some(Symbol::Trait(id)) => {
                self.untagged(Type::trait_object(id, &pkg.trait_info(id).name), generics, span)
            }
            Some(Symbol::Struct(id)) => self.resolve_struct(id, generics, span),
            Some(Symbol::Func(_)) | Some(Symbol::Global(_)) => {
                self.push(DiagKind::InvalidTypeSource, name.span);
                None
            }
            None => {
                self.push(DiagKind::IdNotExist(n.to_string()), name.span);
                None
            }
        }
    }

    /// Types that take no generic arguments
    fn untagged(&mut self, ty: Type, generics: &[TypeExpr], span: Span) -> Option<Type> {
        if !generics.is_empty() {
            self.push(DiagKind::GenericsNotSupports, span);
            return None;
        }
        Some(ty)
    }

    pub(crate) fn resolve_struct(&mut self, id: StructId, generics: &[TypeExpr], span: Span) -> Option<Type> {
        let pkg = self.pkg;
        let info = pkg.struct_info(id);
        if let Some(kind) = generics::check_quantity(info.generics.len(), generics.len()) {
            self.push(kind, span);
            return None;
        }
        let resolved = self.resolve_generic_args(generics)?;
        if !resolved.is_empty() && !resolved.iter().any(Type::has_generic) {
            self.request(Request::Struct {
                id,
                generics: resolved.clone(),
                span,
            });
        }
        Some(Type::structure(id, &info.name, resolved))
    }

    /// Target of a package alias. Cycles are reported once, at the alias
    /// that closes them.
    pub(crate) fn alias_type(&mut self, id: AliasId) -> Option<Type> {
        let pkg = self.pkg;
        let info = &pkg.aliases[id.0];
        if let Some(ty) = &info.ty {
            return Some(ty.clone());
        }
        if pkg.broken_aliases.contains(&id) || self.cyclic_aliases.contains(&id) {
            return None;
        }
        if let Some(cached) = self.alias_cache.get(&id) {
            return cached.clone();
        }
        if let Some(pos) = self.alias_stack.iter().position(|a| *a == id) {
            let members: Vec<AliasId> = self.alias_stack[pos..].to_vec();
            self.cyclic_aliases.extend(members);
            self.push(DiagKind::IllegalCycle(info.name.clone()), info.ast.name.span);
            return None;
        }

        // Package aliases see neither blocks nor generics
        let current = self.current.take();
        let templates = std::mem::take(&mut self.template_generics);
        let bindings = std::mem::take(&mut self.bindings);
        self.alias_stack.push(id);
        let resolved = self.resolve_type(&info.ast.ty);
        self.alias_stack.pop();
        self.bindings = bindings;
        self.template_generics = templates;
        self.current = current;

        let resolved = if self.cyclic_aliases.contains(&id) {
            None
        } else {
            resolved
        };
        self.alias_cache.insert(id, resolved.clone());
        resolved
    }

    /// Runs `f` quietly at package level with `names` bound to `types`
    fn in_template_scope<T>(&mut self, names: &[&[String]], types: &[&[Type]], f: impl FnOnce(&mut Self) -> T) -> T {
        let current = self.current.take();
        let templates = std::mem::take(&mut self.template_generics);
        self.bindings.push_scope();
        for (names, types) in names.iter().zip(types) {
            for (name, ty) in names.iter().zip(types.iter()) {
                self.bindings.bind(name, ty.clone());
            }
        }
        let result = self.quietly(f);
        self.bindings.pop_scope();
        self.template_generics = templates;
        self.current = current;
        result
    }

    /// Signature of a function with its owner's and its own generics bound.
    /// The template stays untouched; the signature is re-resolved.
    pub(crate) fn instantiate_sig(&mut self, id: FuncId, owner_generics: &[Type], generics: &[Type]) -> FnSig {
        let pkg = self.pkg;
        let info = pkg.func(id);
        if owner_generics.is_empty() && generics.is_empty() {
            return info.sig.clone();
        }
        let owner_names: &[String] = match info.owner {
            Some(owner) => &pkg.struct_info(owner).generics,
            None => &[],
        };
        self.in_template_scope(&[owner_names, info.generics.as_slice()], &[owner_generics, generics], |c| {
            c.resolve_signature(&info.ast.params, &info.ast.ret, info.ast.receiver, info.ast.is_unsafe)
        })
    }

    /// Field names and types of a struct under `generics`
    pub(crate) fn struct_fields(&mut self, def: StructId, generics: &[Type]) -> Vec<(String, Type)> {
        let pkg = self.pkg;
        let info = pkg.struct_info(def);
        if generics.is_empty() {
            return info.fields.iter().map(|f| (f.name.clone(), f.ty.clone())).collect();
        }
        self.in_template_scope(&[info.generics.as_slice()], &[generics], |c| {
            info.ast
                .fields
                .iter()
                .map(|f| (f.name.name.clone(), c.resolve(&f.ty, false).0))
                .collect()
        })
    }

    fn array_size(&mut self, expr: &Expr) -> Option<u64> {
        let value = self.eval(expr, None);
        match value.constant {
            Some(Const::Int(n)) if n >= 0 => Some(n as u64),
            Some(Const::Uint(n)) => Some(n),
            Some(_) => {
                self.push(DiagKind::InvalidType, expr.span());
                None
            }
            None => {
                if !value.ty.is_void() {
                    self.push(DiagKind::ExprNotConst, expr.span());
                }
                None
            }
        }
    }

    fn resolve_fn_type(&mut self, params: &[TypeExpr], variadic: bool, ret: Option<&TypeExpr>) -> Option<FnSig> {
        let types = self.resolve_all(params);
        let ret = match ret {
            Some(texpr) => self.resolve_type(texpr),
            None => Some(Type::void()),
        };
        let (types, ret) = (types?, ret?);
        let last = types.len().saturating_sub(1);
        let params: Vec<Param> = types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| {
                let variadic = variadic && i == last;
                Param {
                    name: String::new(),
                    ty: if variadic { Type::slice(ty) } else { ty },
                    mutable: false,
                    variadic,
                    has_default: false,
                }
            })
            .collect();
        let generic = params.iter().any(|p| p.ty.has_generic()) || ret.has_generic();
        Some(FnSig {
            params,
            ret,
            is_method: false,
            generic,
            is_unsafe: false,
        })
    }

    /// Signature of a declared function. Unresolvable parts become void.
    pub(crate) fn resolve_signature(
        &mut self,
        params: &[ast::Param],
        ret: &RetType,
        receiver: Option<Receiver>,
        is_unsafe: bool,
    ) -> FnSig {
        let params: Vec<Param> = params
            .iter()
            .map(|p| {
                let (ty, _) = self.resolve(&p.ty, true);
                Param {
                    name: p.name.name.clone(),
                    ty: if p.variadic { Type::slice(ty) } else { ty },
                    mutable: p.mutable,
                    variadic: p.variadic,
                    has_default: p.default.is_some(),
                }
            })
            .collect();
        let ret = match &ret.ty {
            Some(texpr) => self.resolve(texpr, true).0,
            None => Type::void(),
        };
        let generic = params.iter().any(|p| p.ty.has_generic()) || ret.has_generic();
        FnSig {
            params,
            ret,
            is_method: receiver.is_some(),
            generic,
            is_unsafe,
        }
    }

    /// Default-argument ordering, variadic position and default values
    pub(crate) fn check_params(&mut self, params: &[ast::Param], sig: &FnSig) {
        let mut seen_default = false;
        for (i, (param, resolved)) in params.iter().zip(&sig.params).enumerate() {
            if param.variadic && i + 1 != params.len() {
                self.push(DiagKind::VariadicParameterNotLast, param.span);
            }
            match &param.default {
                Some(expr) => {
                    seen_default = true;
                    if resolved.ty.has_generic() || resolved.ty.is_void() {
                        continue;
                    }
                    self.with_block(false, |c, _| {
                        let value = c.eval(expr, Some(&resolved.ty));
                        c.assign(&resolved.ty, &value, expr.span());
                    });
                }
                None if seen_default && !param.variadic => {
                    self.push(DiagKind::ParamMustHaveDefaultArg(param.name.name.clone()), param.span);
                }
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::defs::{AliasInfo, Package};
    use crate::sema::CheckOptions;
    use pretty_assertions::assert_eq;

    fn named(name: &str) -> TypeExpr {
        TypeExpr::named(name, Span::dummy())
    }

    fn boxed(t: TypeExpr) -> Box<TypeExpr> {
        Box::new(t)
    }

    fn alias(pkg: &mut Package, name: &str, target: TypeExpr) {
        let id = AliasId(pkg.aliases.len());
        pkg.aliases.push(AliasInfo {
            name: name.to_string(),
            file: 0,
            ast: ast::TypeAlias {
                name: Ident::new(name, Span::new(id.0, id.0 + 1, 0)),
                ty: target,
                span: Span::dummy(),
            },
            ty: None,
        });
        pkg.declare(name, Symbol::Alias(id));
    }

    fn keys(checker: &Checker) -> Vec<&'static str> {
        checker.diags.iter().map(|d| d.key()).collect()
    }

    #[test]
    fn test_composite_kinds() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        let map = TypeExpr::Map {
            key: boxed(named("str")),
            value: boxed(TypeExpr::Slice(boxed(named("byte")), Span::dummy())),
            span: Span::dummy(),
        };
        assert_eq!(c.resolve(&map, true).0.kind, "[str:[]u8]");

        let f = TypeExpr::Fn {
            params: vec![named("int"), named("rune")],
            variadic: true,
            ret: Some(boxed(named("bool"))),
            span: Span::dummy(),
        };
        assert_eq!(c.resolve(&f, true).0.kind, "fn(int, ...i32) -> bool");
        assert!(keys(&c).is_empty());
    }

    #[test]
    fn test_resolution_is_stable() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        let texpr = TypeExpr::Pointer(boxed(TypeExpr::Slice(boxed(named("i16")), Span::dummy())), Span::dummy());
        let (a, ok_a) = c.resolve(&texpr, true);
        let (b, ok_b) = c.resolve(&texpr, true);
        assert!(ok_a && ok_b);
        assert_eq!(a, b);
        assert_eq!(a.kind, "*[]i16");
    }

    #[test]
    fn test_invalid_modifier_shapes() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        let ptr_ref = TypeExpr::Pointer(boxed(TypeExpr::Ref(boxed(named("int")), Span::dummy())), Span::dummy());
        let ref_ref = TypeExpr::Ref(boxed(TypeExpr::Ref(boxed(named("int")), Span::dummy())), Span::dummy());
        let unsafe_ptr = TypeExpr::Pointer(boxed(TypeExpr::UnsafePtr(Span::dummy())), Span::dummy());
        assert!(!c.resolve(&ptr_ref, true).1);
        assert!(!c.resolve(&ref_ref, true).1);
        assert!(!c.resolve(&unsafe_ptr, true).1);
        assert_eq!(keys(&c), vec!["invalid_type"; 3]);
    }

    #[test]
    fn test_unknown_type_only_reported_when_required() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        let (ty, ok) = c.resolve(&named("Missing"), false);
        assert!(!ok);
        assert!(ty.is_void());
        assert!(keys(&c).is_empty());
        c.resolve(&named("Missing"), true);
        assert_eq!(keys(&c), vec!["id_not_exist"]);
    }

    #[test]
    fn test_primitives_take_no_generics() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        let texpr = TypeExpr::Named {
            name: Ident::new("int", Span::dummy()),
            generics: vec![named("str")],
            span: Span::dummy(),
        };
        assert!(!c.resolve(&texpr, true).1);
        assert_eq!(keys(&c), vec!["generics_not_supports"]);
    }

    #[test]
    fn test_alias_chain_and_cycle() {
        let mut pkg = Package::new();
        alias(&mut pkg, "Id", named("u64"));
        alias(&mut pkg, "Ids", TypeExpr::Slice(boxed(named("Id")), Span::dummy()));
        alias(&mut pkg, "A", named("B"));
        alias(&mut pkg, "B", named("A"));
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        assert_eq!(c.resolve(&named("Ids"), true).0.kind, "[]u64");
        assert!(!c.resolve(&named("A"), true).1);
        assert!(!c.resolve(&named("B"), true).1);
        assert_eq!(keys(&c), vec!["illegal_cycle_in_declaration"]);
    }

    #[test]
    fn test_bindings_shadow_template_generics() {
        let pkg = Package::new();
        let opts = CheckOptions::default();
        let mut c = Checker::new(&pkg, &opts);
        c.template_generics = vec!["T".to_string()];
        let slice = TypeExpr::Slice(boxed(named("T")), Span::dummy());
        let template = c.resolve(&slice, true).0;
        assert!(template.has_generic());

        c.bindings.push_all(&["T".to_string()], &[Type::primitive(TypeId::F32)]);
        assert_eq!(c.resolve(&slice, true).0.kind, "[]f32");
    }
}
