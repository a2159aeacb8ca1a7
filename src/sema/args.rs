//! Argument/parameter binding
//!
//! `pair` matches call or struct-literal arguments to parameter slots without
//! evaluating anything. The checker then evaluates each bound argument
//! against its parameter type.

use crate::frontend::ast::{Arg, Expr};
use crate::sema::checker::{Checker, Request};
use crate::sema::defs::FuncId;
use crate::sema::diagnostic::DiagKind;
use crate::sema::generics::{self, Inferred};
use crate::sema::value::Value;
use crate::types::{FnSig, Param, StructId, Type};
use crate::utils::Span;

/// Parameter or field an argument may bind to
#[derive(Debug, Clone, Copy)]
pub struct Slot<'s> {
    pub name: &'s str,
    pub variadic: bool,
}

/// Arguments bound to one slot (indices into the argument list)
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Empty,
    Single(usize),
    /// `xs...` spread into a variadic slot
    Spread(usize),
    /// Arguments collected by a variadic slot
    Many(Vec<usize>),
}

#[derive(Debug, Default)]
pub struct Pairing {
    pub bound: Vec<Bound>,
    pub errors: Vec<(DiagKind, Span)>,
}

fn is_spread(arg: &Arg) -> bool {
    matches!(arg.value, Expr::Variadic { .. })
}

/// Pairs arguments with slots. Positional arguments are accepted until the
/// first named one; a trailing variadic slot collects what remains.
pub fn pair(slots: &[Slot], args: &[Arg]) -> Pairing {
    let mut out = Pairing {
        bound: vec![Bound::Empty; slots.len()],
        errors: Vec::new(),
    };
    let mut position = 0;
    let mut named_seen = false;
    let mut mixed_reported = false;

    for (i, arg) in args.iter().enumerate() {
        let slot = match &arg.name {
            Some(name) => {
                named_seen = true;
                match slots.iter().position(|s| s.name == name.name) {
                    Some(slot) => slot,
                    None => {
                        out.errors.push((DiagKind::IdNotExist(name.name.clone()), name.span));
                        continue;
                    }
                }
            }
            None if named_seen => {
                out.errors.push((DiagKind::ArgumentMustTargetToParameter, arg.span));
                continue;
            }
            None => {
                if position >= slots.len() {
                    out.errors.push((DiagKind::ArgumentOverflow, arg.span));
                    break;
                }
                let slot = position;
                if !slots[slot].variadic {
                    position += 1;
                }
                slot
            }
        };

        let variadic = slots[slot].variadic;
        let current = std::mem::replace(&mut out.bound[slot], Bound::Empty);
        out.bound[slot] = match current {
            Bound::Empty if variadic && is_spread(arg) => Bound::Spread(i),
            Bound::Empty if variadic => Bound::Many(vec![i]),
            Bound::Empty => Bound::Single(i),
            Bound::Many(mut list) if arg.name.is_none() && !is_spread(arg) => {
                list.push(i);
                Bound::Many(list)
            }
            other if variadic && arg.name.is_none() => {
                if !mixed_reported {
                    out.errors.push((DiagKind::MoreArgsWithVariadiced, arg.span));
                    mixed_reported = true;
                }
                other
            }
            other => {
                out.errors.push((DiagKind::AlreadyHasExpr(slots[slot].name.to_string()), arg.span));
                other
            }
        };
    }
    out
}

fn slots(params: &[Param]) -> Vec<Slot<'_>> {
    params
        .iter()
        .map(|p| Slot {
            name: &p.name,
            variadic: p.variadic,
        })
        .collect()
}

/// Expression inside a spread argument
fn spread_inner(expr: &Expr) -> &Expr {
    match expr {
        Expr::Variadic { expr, .. } => expr,
        other => other,
    }
}

impl<'p> Checker<'p> {
    /// Binds the arguments of a call to a concrete signature
    pub(crate) fn call_args(&mut self, sig: &FnSig, args: &[Arg], span: Span) {
        let mut pre: Vec<Option<Value>> = vec![None; args.len()];

        // A single multi-valued argument spreads over the parameter list
        if args.len() == 1 && args[0].name.is_none() && sig.params.len() > 1 && !is_spread(&args[0]) {
            let Some(value) = self.eval_checked(&args[0].value, None) else {
                return;
            };
            if value.ty.is_tuple() {
                self.spread_tuple(sig, &value.ty, args[0].span, span);
                return;
            }
            pre[0] = Some(value);
        }

        let pairing = pair(&slots(&sig.params), args);
        self.bind_args(sig, args, &pairing, pre, span);
    }

    fn spread_tuple(&mut self, sig: &FnSig, tuple: &Type, arg_span: Span, span: Span) {
        let types = tuple.types();
        if types.len() > sig.params.len() {
            self.push(DiagKind::ArgumentOverflow, arg_span);
            return;
        }
        if let Some(missing) = sig.params.get(types.len()) {
            self.push(DiagKind::MissingExprFor(missing.name.clone()), span);
            return;
        }
        for (param, ty) in sig.params.iter().zip(types) {
            self.assign(&param.ty, &Value::new(ty.clone()), arg_span);
        }
    }

    /// Reports pairing errors, then checks every bound argument.
    /// `pre` holds values of arguments that were already evaluated.
    pub(crate) fn bind_args(&mut self, sig: &FnSig, args: &[Arg], pairing: &Pairing, mut pre: Vec<Option<Value>>, span: Span) {
        for (kind, at) in &pairing.errors {
            self.push(kind.clone(), *at);
        }
        for (param, bound) in sig.params.iter().zip(&pairing.bound) {
            match bound {
                Bound::Empty => {
                    if !param.variadic && !param.has_default {
                        self.push(DiagKind::MissingExprFor(param.name.clone()), span);
                    }
                }
                Bound::Single(i) => {
                    let value = pre[*i].take();
                    self.check_arg(param, &param.ty, &args[*i], value);
                }
                Bound::Spread(i) => {
                    let value = match pre[*i].take() {
                        Some(value) => Some(value),
                        None => self.eval_checked(spread_inner(&args[*i].value), Some(&param.ty)),
                    };
                    if let Some(value) = value {
                        if !param.ty.is_void() {
                            self.assign(&param.ty, &value, args[*i].span);
                        }
                    }
                }
                Bound::Many(list) => {
                    let elem = param.ty.component().cloned().unwrap_or_default();
                    for i in list {
                        let value = pre[*i].take();
                        self.check_arg(param, &elem, &args[*i], value);
                    }
                }
            }
        }
    }

    fn check_arg(&mut self, param: &Param, ty: &Type, arg: &Arg, value: Option<Value>) {
        let value = match value {
            Some(value) => value,
            None => match self.eval_checked(&arg.value, Some(ty)) {
                Some(value) => value,
                None => return,
            },
        };
        // Unresolved parameter types were already reported
        if ty.is_void() {
            return;
        }
        if self.assign(ty, &value, arg.value.span()) {
            self.check_mutability(param.mutable, ty, &value, arg.span);
        }
    }

    /// Call of a generic function whose generics come from the arguments
    pub(crate) fn infer_call(&mut self, id: FuncId, owner_generics: &[Type], args: &[Arg], span: Span) -> Value {
        let pkg = self.pkg;
        let info = pkg.func(id);
        let template = if owner_generics.is_empty() {
            info.sig.clone()
        } else {
            self.instantiate_sig(id, owner_generics, &[])
        };
        let param_types: Vec<Type> = template.params.iter().map(|p| p.ty.clone()).collect();
        if !generics::is_inferable(&info.generics, &param_types) {
            self.push(DiagKind::DynamicGenericAnnotationFailed, span);
            return Value::void();
        }

        let pairing = pair(&slots(&template.params), args);
        let mut pre: Vec<Option<Value>> = vec![None; args.len()];
        let mut inferred = Inferred::default();
        for (param, bound) in template.params.iter().zip(&pairing.bound) {
            let elem = param.ty.component().cloned().unwrap_or_default();
            let targets: Vec<(usize, &Type, &Expr)> = match bound {
                Bound::Empty => Vec::new(),
                Bound::Single(i) => vec![(*i, &param.ty, &args[*i].value)],
                Bound::Spread(i) => vec![(*i, &param.ty, spread_inner(&args[*i].value))],
                Bound::Many(list) => list.iter().map(|i| (*i, &elem, &args[*i].value)).collect(),
            };
            for (i, ty, expr) in targets {
                let value = self.eval(expr, None);
                generics::infer(ty, &value.ty, &mut inferred);
                pre[i] = Some(value);
            }
        }
        for (name, kept, ignored) in &inferred.conflicts {
            self.push(
                DiagKind::GenericInferenceConflict {
                    name: name.clone(),
                    first: kept.kind.clone(),
                    second: ignored.kind.clone(),
                },
                span,
            );
        }
        let Some(types) = inferred.ordered(&info.generics) else {
            self.push(DiagKind::DynamicGenericAnnotationFailed, span);
            return Value::void();
        };

        let sig = self.instantiate_sig(id, owner_generics, &types);
        if !types.iter().any(Type::has_generic) {
            self.request(Request::Func {
                id,
                generics: types,
                span,
            });
        }
        self.bind_args(&sig, args, &pairing, pre, span);
        Value::new(sig.ret)
    }

    /// Binds struct literal arguments to the fields of `def`
    pub(crate) fn struct_args(&mut self, def: StructId, fields: &[(String, Type)], args: &[Arg], span: Span) {
        let pkg = self.pkg;
        let info = pkg.struct_info(def);

        if args.is_empty() {
            for (name, ty) in fields {
                if ty.is_ref() {
                    self.push(DiagKind::ReferenceFieldNotInitialized(name.clone()), span);
                }
            }
            return;
        }

        let slots: Vec<Slot> = fields
            .iter()
            .map(|(name, _)| Slot {
                name,
                variadic: false,
            })
            .collect();
        let pairing = pair(&slots, args);
        for (kind, at) in &pairing.errors {
            self.push(kind.clone(), *at);
        }
        for (k, ((name, ty), bound)) in fields.iter().zip(&pairing.bound).enumerate() {
            match bound {
                Bound::Single(i) | Bound::Spread(i) => {
                    let Some(value) = self.eval_checked(&args[*i].value, Some(ty)) else {
                        continue;
                    };
                    if !ty.is_void() {
                        self.assign(ty, &value, args[*i].value.span());
                    }
                }
                Bound::Many(_) => {}
                Bound::Empty => {
                    if ty.is_ref() {
                        self.push(DiagKind::ReferenceFieldNotInitialized(name.clone()), span);
                    } else if !info.fields.get(k).map_or(false, |f| f.has_default) {
                        self.push(DiagKind::MissingExprFor(name.clone()), span);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{Ident, Literal};
    use pretty_assertions::assert_eq;

    fn positional(n: usize) -> Arg {
        Arg {
            name: None,
            value: Expr::Literal(Literal::Int(n as u64, Span::dummy())),
            span: Span::dummy(),
        }
    }

    fn named(name: &str) -> Arg {
        Arg {
            name: Some(Ident::new(name, Span::dummy())),
            ..positional(0)
        }
    }

    fn spread() -> Arg {
        Arg {
            name: None,
            value: Expr::Variadic {
                expr: Box::new(Expr::Ident(Ident::new("xs", Span::dummy()))),
                span: Span::dummy(),
            },
            span: Span::dummy(),
        }
    }

    fn slot(name: &str, variadic: bool) -> Slot<'_> {
        Slot { name, variadic }
    }

    fn keys(p: &Pairing) -> Vec<&'static str> {
        p.errors.iter().map(|(k, _)| k.key()).collect()
    }

    #[test]
    fn test_overflow_reported_once() {
        let slots = [slot("a", false), slot("b", false)];
        let p = pair(&slots, &[positional(1), positional(2), positional(3), positional(4)]);
        assert_eq!(p.bound, vec![Bound::Single(0), Bound::Single(1)]);
        assert_eq!(keys(&p), vec!["argument_overflow"]);
    }

    #[test]
    fn test_variadic_collects_remaining() {
        let slots = [slot("fmt", false), slot("rest", true)];
        let p = pair(&slots, &[positional(0), positional(1), positional(2)]);
        assert_eq!(p.bound, vec![Bound::Single(0), Bound::Many(vec![1, 2])]);
        assert!(p.errors.is_empty());

        let p = pair(&slots, &[positional(0), spread()]);
        assert_eq!(p.bound, vec![Bound::Single(0), Bound::Spread(1)]);

        let p = pair(&slots, &[positional(0), positional(1), spread(), spread()]);
        assert_eq!(keys(&p), vec!["more_args_with_variadiced"]);
    }

    #[test]
    fn test_targeted_arguments() {
        let slots = [slot("x", false), slot("y", false), slot("z", false)];
        let p = pair(&slots, &[positional(0), named("z"), named("x"), positional(3), named("w")]);
        assert_eq!(p.bound, vec![Bound::Single(0), Bound::Empty, Bound::Single(1)]);
        assert_eq!(
            keys(&p),
            vec!["already_has_expr", "argument_must_target_to_parameter", "id_not_exist"]
        );
    }
}
