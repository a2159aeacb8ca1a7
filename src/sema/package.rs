//! Package driver
//!
//! Checks every file of one package in phases. Files are parsed, collected,
//! resolved and body-checked in parallel; each worker owns a `Checker` and
//! only reads the merged `Package`. Results are joined in file order, so the
//! report does not depend on scheduling. Generic instantiations discovered
//! along the way are checked afterwards from a sequential worklist.

use std::collections::{BTreeMap, VecDeque};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::frontend::ast::{self, Item, Program};
use crate::frontend::{lexer::Lexer, parser::Parser};
use crate::sema::checker::{Annotation, Checker, Outcome, Request};
use crate::sema::defs::{
    AliasId, AliasInfo, EnumInfo, FieldInfo, FuncId, FuncInfo, GlobalId, GlobalInfo, Package, StructInfo, Symbol,
    TraitImpl, TraitInfo, TraitMethod,
};
use crate::sema::diagnostic::{DiagKind, Diagnostic, Diagnostics};
use crate::sema::expr::pin_const;
use crate::sema::generics::Combines;
use crate::sema::value::{Const, Value};
use crate::sema::CheckOptions;
use crate::types::{bits, EnumId, FnSig, StructId, TraitId, Type, TypeId};
use crate::utils::{self, LineIndex};

// ==================== Report ====================

/// Result of one source file
#[derive(Debug)]
pub struct FileReport {
    pub path: String,
    pub lines: LineIndex,
    /// Sorted by position
    pub diagnostics: Vec<Diagnostic>,
    pub annotations: Vec<Annotation>,
    /// Lexer or parser error; the file took no further part in the check
    pub fatal: Option<utils::Error>,
}

impl FileReport {
    pub fn has_errors(&self) -> bool {
        self.fatal.is_some() || self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Concrete layout of a generic struct
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructInstance {
    pub name: String,
    pub generics: Vec<Type>,
    pub fields: Vec<(String, Type)>,
}

#[derive(Debug)]
pub struct PackageReport {
    pub files: Vec<FileReport>,
    /// Instantiated generic combinations per definition, in discovery order
    pub combines: BTreeMap<String, Vec<Vec<Type>>>,
    /// Non-generic structs, dependencies first
    pub struct_order: Vec<String>,
    pub instances: Vec<StructInstance>,
}

impl PackageReport {
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(FileReport::has_errors)
    }

    /// `path:row:column message` lines of every file
    pub fn render(&self) -> Vec<String> {
        let mut out = Vec::new();
        for file in &self.files {
            if let Some(err) = &file.fatal {
                let (row, col) = file.lines.position(err.span().start);
                out.push(format!("{}:{}:{} {}", file.path, row, col, err));
            }
            out.extend(file.diagnostics.iter().map(|d| d.render(&file.path, &file.lines)));
        }
        out
    }
}

// ==================== Driver ====================

/// Declarations of one file, before ids are assigned
#[derive(Default)]
struct Collected {
    structs: Vec<ast::StructDef>,
    traits: Vec<ast::TraitDef>,
    enums: Vec<ast::EnumDef>,
    funcs: Vec<ast::Function>,
    impls: Vec<ast::ImplBlock>,
    aliases: Vec<ast::TypeAlias>,
    globals: Vec<ast::GlobalDef>,
}

impl Collected {
    fn from_program(program: &Program) -> Self {
        let mut c = Self::default();
        for item in &program.items {
            match item {
                Item::Function(f) => c.funcs.push(f.clone()),
                Item::Struct(s) => c.structs.push(s.clone()),
                Item::Enum(e) => c.enums.push(e.clone()),
                Item::Trait(t) => c.traits.push(t.clone()),
                Item::Impl(i) => c.impls.push(i.clone()),
                Item::TypeAlias(a) => c.aliases.push(a.clone()),
                Item::Global(g) => c.globals.push(g.clone()),
            }
        }
        c
    }
}

/// Everything the phases produce besides the package table
#[derive(Default)]
struct Sink {
    diags: Diagnostics,
    annotations: Vec<Annotation>,
    requests: Vec<Request>,
}

impl Sink {
    fn absorb(&mut self, outcome: Outcome) {
        self.diags.extend(outcome.diags);
        self.annotations.extend(outcome.annotations);
        self.requests.extend(outcome.requests);
    }
}

/// Checks a package made of `(path, source)` pairs
pub fn check_package(sources: &[(String, String)], opts: &CheckOptions) -> PackageReport {
    info!("checking package of {} file(s)", sources.len());

    let parsed: Vec<Result<Program, utils::Error>> = sources
        .par_iter()
        .enumerate()
        .map(|(file, (_, src))| Parser::new(Lexer::new(src, file)).parse_program())
        .collect();
    debug!("parsed {} file(s)", parsed.len());

    let collected: Vec<Option<Collected>> = parsed
        .par_iter()
        .map(|p| p.as_ref().ok().map(Collected::from_program))
        .collect();

    let mut sink = Sink::default();
    let mut pkg = Package::new();
    merge(&mut pkg, collected, &mut sink.diags);
    debug!(
        "collected {} struct(s), {} function(s), {} global(s)",
        pkg.structs.len(),
        pkg.funcs.len(),
        pkg.globals.len()
    );

    resolve_aliases(&mut pkg, opts, &mut sink);
    resolve_enums(&mut pkg, opts, &mut sink);
    resolve_signatures(&mut pkg, opts, sources.len(), &mut sink);
    evaluate_globals(&mut pkg, opts, &mut sink);
    check_trait_impls(&pkg, &mut sink.diags);
    pkg.struct_order = order_structs(&pkg, &mut sink.diags);
    check_bodies(&pkg, opts, sources.len(), &mut sink);

    let requests = std::mem::take(&mut sink.requests);
    let instances = instantiate(&mut pkg, opts, requests, &mut sink);

    build_report(sources, parsed, &pkg, sink, instances)
}

fn merge(pkg: &mut Package, collected: Vec<Option<Collected>>, diags: &mut Diagnostics) {
    let mut impls = Vec::new();
    for (file, c) in collected.into_iter().enumerate() {
        let Some(c) = c else { continue };
        for def in c.structs {
            let id = StructId(pkg.structs.len());
            if !pkg.declare(&def.name.name, Symbol::Struct(id)) {
                diags.push(DiagKind::ExistId(def.name.name.clone()), def.name.span);
                continue;
            }
            pkg.structs.push(StructInfo {
                name: def.name.name.clone(),
                file,
                generics: def.generics.iter().map(|g| g.name.clone()).collect(),
                fields: Vec::new(),
                methods: Default::default(),
                traits: Vec::new(),
                combines: Combines::default(),
                ast: def,
            });
        }
        for def in c.traits {
            let id = TraitId(pkg.traits.len());
            if !pkg.declare(&def.name.name, Symbol::Trait(id)) {
                diags.push(DiagKind::ExistId(def.name.name.clone()), def.name.span);
                continue;
            }
            pkg.traits.push(TraitInfo {
                name: def.name.name.clone(),
                file,
                methods: Vec::new(),
                ast: def,
            });
        }
        for def in c.enums {
            let id = EnumId(pkg.enums.len());
            if !pkg.declare(&def.name.name, Symbol::Enum(id)) {
                diags.push(DiagKind::ExistId(def.name.name.clone()), def.name.span);
                continue;
            }
            pkg.enums.push(EnumInfo {
                name: def.name.name.clone(),
                file,
                base: Type::primitive(TypeId::U32),
                items: Vec::new(),
                ast: def,
            });
        }
        for def in c.funcs {
            let id = FuncId(pkg.funcs.len());
            if !pkg.declare(&def.name.name, Symbol::Func(id)) {
                diags.push(DiagKind::ExistId(def.name.name.clone()), def.name.span);
                continue;
            }
            pkg.funcs.push(func_info(def, file, None));
        }
        for def in c.aliases {
            let id = AliasId(pkg.aliases.len());
            if !pkg.declare(&def.name.name, Symbol::Alias(id)) {
                diags.push(DiagKind::ExistId(def.name.name.clone()), def.name.span);
                continue;
            }
            pkg.aliases.push(AliasInfo {
                name: def.name.name.clone(),
                file,
                ty: None,
                ast: def,
            });
        }
        for def in c.globals {
            let id = GlobalId(pkg.globals.len());
            if !pkg.declare(&def.name.name, Symbol::Global(id)) {
                diags.push(DiagKind::ExistId(def.name.name.clone()), def.name.span);
                continue;
            }
            pkg.globals.push(GlobalInfo {
                name: def.name.name.clone(),
                file,
                value: None,
                ast: def,
            });
        }
        impls.extend(c.impls.into_iter().map(|i| (file, i)));
    }

    // Impl blocks may target structs of any file
    for (file, block) in impls {
        let Some(Symbol::Struct(owner)) = pkg.lookup(&block.target.name) else {
            diags.push(DiagKind::IdNotExist(block.target.name.clone()), block.target.span);
            continue;
        };
        let trait_id = match &block.trait_name {
            Some(name) => match pkg.lookup(&name.name) {
                Some(Symbol::Trait(id)) => Some(id),
                _ => {
                    diags.push(DiagKind::IdNotExist(name.name.clone()), name.span);
                    continue;
                }
            },
            None => None,
        };

        let mut methods = Vec::new();
        for def in block.methods.iter().cloned() {
            let info = &pkg.structs[owner.0];
            let taken = info.methods.contains_key(&def.name.name)
                || info.ast.fields.iter().any(|f| f.name.name == def.name.name);
            if taken {
                diags.push(DiagKind::ExistId(def.name.name.clone()), def.name.span);
                continue;
            }
            let id = FuncId(pkg.funcs.len());
            pkg.structs[owner.0].methods.insert(def.name.name.clone(), id);
            pkg.funcs.push(func_info(def, file, Some(owner)));
            methods.push(id);
        }

        if let Some(trait_id) = trait_id {
            let traits = &mut pkg.structs[owner.0].traits;
            if !traits.contains(&trait_id) {
                traits.push(trait_id);
            }
            pkg.impls.push(TraitImpl {
                trait_id,
                owner,
                methods,
                span: block.span,
            });
        }
    }
}

fn func_info(def: ast::Function, file: usize, owner: Option<StructId>) -> FuncInfo {
    FuncInfo {
        name: def.name.name.clone(),
        file,
        owner,
        generics: def.generics.iter().map(|g| g.name.clone()).collect(),
        sig: FnSig {
            params: Vec::new(),
            ret: Type::void(),
            is_method: def.receiver.is_some(),
            generic: !def.generics.is_empty(),
            is_unsafe: def.is_unsafe,
        },
        combines: Combines::default(),
        ast: def,
    }
}

// ==================== Phases ====================

fn resolve_aliases(pkg: &mut Package, opts: &CheckOptions, sink: &mut Sink) {
    let resolved: Vec<Option<Type>> = {
        let mut c = Checker::new(pkg, opts);
        let resolved = (0..pkg.aliases.len()).map(|i| c.alias_type(AliasId(i))).collect();
        sink.absorb(c.finish());
        resolved
    };
    for (i, ty) in resolved.into_iter().enumerate() {
        match ty {
            Some(ty) => pkg.aliases[i].ty = Some(ty),
            None => {
                pkg.broken_aliases.insert(AliasId(i));
            }
        }
    }
    debug!("resolved {} alias(es)", pkg.aliases.len());
}

fn resolve_enums(pkg: &mut Package, opts: &CheckOptions, sink: &mut Sink) {
    let resolved: Vec<(Type, Vec<(String, Const)>)> = {
        let mut c = Checker::new(pkg, opts);
        let resolved = pkg.enums.iter().map(|e| c.enum_items(&e.ast)).collect();
        sink.absorb(c.finish());
        resolved
    };
    for (info, (base, items)) in pkg.enums.iter_mut().zip(resolved) {
        info.base = base;
        info.items = items;
    }
}

impl<'p> Checker<'p> {
    /// Base type and item values of an enum
    fn enum_items(&mut self, def: &ast::EnumDef) -> (Type, Vec<(String, Const)>) {
        let base = match &def.base {
            Some(texpr) => match self.resolve(texpr, true) {
                (ty, true) => ty,
                _ => return (Type::primitive(TypeId::U32), Vec::new()),
            },
            None => Type::primitive(TypeId::U32),
        };
        let is_str = base.is_pure() && base.id == TypeId::Str;
        if !is_str && !(base.is_pure() && bits::is_integer(base.id)) {
            self.push(DiagKind::InvalidTypeSource, def.name.span);
            return (base, Vec::new());
        }

        let ws = self.word_size();
        let mut items: Vec<(String, Const)> = Vec::with_capacity(def.items.len());
        let mut next = if bits::is_signed_integer(base.id) {
            Const::Int(0)
        } else {
            Const::Uint(0)
        };
        for item in &def.items {
            if items.iter().any(|(name, _)| *name == item.name.name) {
                self.push(DiagKind::ExistId(item.name.name.clone()), item.name.span);
                continue;
            }
            let value = match &item.value {
                Some(expr) => self.enum_value(&base, expr),
                None if is_str => Some(Const::Str(item.name.name.clone())),
                None => {
                    let fits = match &next {
                        Const::Int(_) | Const::Uint(_) => {
                            let v = Value::constant(base.clone(), next.clone());
                            self.quietly(|c| c.assign(&base, &v, item.name.span))
                        }
                        _ => false,
                    };
                    if !fits {
                        self.push(DiagKind::OverflowLimits, item.name.span);
                    }
                    Some(next.clone())
                }
            };
            let Some(value) = value else { continue };
            let value = pin_const(value, &base, ws);
            if !is_str {
                next = successor(&value);
            }
            items.push((item.name.name.clone(), value));
        }
        (base, items)
    }

    fn enum_value(&mut self, base: &Type, expr: &ast::Expr) -> Option<Const> {
        let value = self.with_block(false, |c, _| c.eval_checked(expr, Some(base)))?;
        if !value.is_const() {
            self.push(DiagKind::ExprNotConst, expr.span());
            return None;
        }
        if !self.assign(base, &value, expr.span()) {
            return None;
        }
        value.constant
    }
}

/// Implicit value following an integer enum item
fn successor(value: &Const) -> Const {
    match value {
        Const::Int(v) => v.checked_add(1).map_or(Const::Uint(*v as u64 + 1), Const::Int),
        Const::Uint(v) => Const::Uint(v.wrapping_add(1)),
        other => other.clone(),
    }
}

/// Signature, field and trait method types of one file
#[derive(Default)]
struct Resolved {
    funcs: Vec<(FuncId, FnSig)>,
    fields: Vec<(StructId, Vec<FieldInfo>)>,
    traits: Vec<(TraitId, Vec<TraitMethod>)>,
    outcome: Outcome,
}

fn resolve_signatures(pkg: &mut Package, opts: &CheckOptions, files: usize, sink: &mut Sink) {
    let resolved: Vec<Resolved> = {
        let pkg: &Package = pkg;
        (0..files).into_par_iter().map(|file| resolve_file(pkg, opts, file)).collect()
    };
    for r in resolved {
        for (id, sig) in r.funcs {
            pkg.funcs[id.0].sig = sig;
        }
        for (id, fields) in r.fields {
            pkg.structs[id.0].fields = fields;
        }
        for (id, methods) in r.traits {
            pkg.traits[id.0].methods = methods;
        }
        sink.absorb(r.outcome);
    }
    debug!("resolved signatures of {} function(s)", pkg.funcs.len());
}

fn resolve_file(pkg: &Package, opts: &CheckOptions, file: usize) -> Resolved {
    let mut c = Checker::new(pkg, opts);
    let mut out = Resolved::default();

    for (i, info) in pkg.structs.iter().enumerate().filter(|(_, s)| s.file == file) {
        c.template_generics = info.generics.clone();
        let mut fields: Vec<FieldInfo> = Vec::with_capacity(info.ast.fields.len());
        for field in &info.ast.fields {
            if fields.iter().any(|f| f.name == field.name.name) {
                c.push(DiagKind::ExistId(field.name.name.clone()), field.name.span);
                continue;
            }
            fields.push(FieldInfo {
                name: field.name.name.clone(),
                ty: c.resolve(&field.ty, true).0,
                has_default: field.default.is_some(),
                span: field.span,
            });
        }
        out.fields.push((StructId(i), fields));
    }

    c.template_generics.clear();
    for (i, info) in pkg.traits.iter().enumerate().filter(|(_, t)| t.file == file) {
        let mut methods: Vec<TraitMethod> = Vec::with_capacity(info.ast.methods.len());
        for m in &info.ast.methods {
            if methods.iter().any(|x| x.name == m.name.name) {
                c.push(DiagKind::ExistId(m.name.name.clone()), m.name.span);
                continue;
            }
            methods.push(TraitMethod {
                name: m.name.name.clone(),
                by_ref: m.receiver.map_or(false, |r| r.by_ref),
                sig: c.resolve_signature(&m.params, &m.ret, m.receiver, false),
                span: m.span,
            });
        }
        out.traits.push((TraitId(i), methods));
    }

    for (i, info) in pkg.funcs.iter().enumerate().filter(|(_, f)| f.file == file) {
        let owner_generics: &[String] = match info.owner {
            Some(owner) => &pkg.struct_info(owner).generics,
            None => &[],
        };
        if !owner_generics.is_empty() && !info.generics.is_empty() {
            c.push(DiagKind::GenericsNotSupports, info.ast.generics[0].span);
        }
        let mut templates = owner_generics.to_vec();
        for g in &info.generics {
            if templates.contains(g) {
                c.push(DiagKind::ExistId(g.clone()), info.ast.name.span);
            } else {
                templates.push(g.clone());
            }
        }
        c.template_generics = templates;
        let sig = c.resolve_signature(&info.ast.params, &info.ast.ret, info.ast.receiver, info.ast.is_unsafe);
        out.funcs.push((FuncId(i), sig));
    }

    c.template_generics.clear();
    out.outcome = c.finish();
    out
}

fn evaluate_globals(pkg: &mut Package, opts: &CheckOptions, sink: &mut Sink) {
    let values: Vec<Value> = {
        let mut c = Checker::new(pkg, opts);
        c.report_globals = true;
        let values = (0..pkg.globals.len()).map(|i| c.global_value(GlobalId(i))).collect();
        sink.absorb(c.finish());
        values
    };
    for (info, value) in pkg.globals.iter_mut().zip(values) {
        info.value = Some(value);
    }
    debug!("evaluated {} global(s)", pkg.globals.len());
}

/// Every trait method implemented with the same type and receiver kind
fn check_trait_impls(pkg: &Package, diags: &mut Diagnostics) {
    for block in &pkg.impls {
        let tr = pkg.trait_info(block.trait_id);
        for method in &tr.methods {
            let implemented = block.methods.iter().map(|id| pkg.func(*id)).find(|f| f.name == method.name);
            let matches = implemented.map_or(false, |f| {
                f.receiver() == Some(method.by_ref) && Type::func(f.sig.clone()) == Type::func(method.sig.clone())
            });
            if !matches {
                diags.push(DiagKind::NotImplTraitDef(tr.name.clone(), method.name.clone()), block.span);
            }
        }
        for id in &block.methods {
            let f = pkg.func(*id);
            if !tr.methods.iter().any(|m| m.name == f.name) {
                diags.push(DiagKind::TraitHasntId(tr.name.clone(), f.name.clone()), f.ast.name.span);
            }
        }
    }
}

/// Structs a type stores inline
fn value_deps(ty: &Type, out: &mut Vec<StructId>) {
    if ty.is_ptr() || ty.is_ref() || ty.is_slice() || ty.is_map() || ty.is_fn() {
        return;
    }
    if ty.is_array() {
        if let Some(elem) = ty.component() {
            value_deps(elem, out);
        }
        return;
    }
    if let Some((id, _)) = ty.struct_def() {
        out.push(id);
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Non-generic structs after the structs they contain by value. A struct
/// that contains itself is reported at the struct closing the cycle.
fn order_structs(pkg: &Package, diags: &mut Diagnostics) -> Vec<StructId> {
    fn visit(pkg: &Package, id: StructId, marks: &mut [Mark], order: &mut Vec<StructId>, diags: &mut Diagnostics) {
        match marks[id.0] {
            Mark::Done => return,
            Mark::Active => {
                let info = pkg.struct_info(id);
                diags.push(DiagKind::IllegalCycle(info.name.clone()), info.ast.name.span);
                return;
            }
            Mark::New => {}
        }
        marks[id.0] = Mark::Active;
        let mut deps = Vec::new();
        for field in &pkg.struct_info(id).fields {
            value_deps(&field.ty, &mut deps);
        }
        for dep in deps {
            visit(pkg, dep, marks, order, diags);
        }
        marks[id.0] = Mark::Done;
        if !pkg.struct_info(id).is_generic() {
            order.push(id);
        }
    }

    let mut marks = vec![Mark::New; pkg.structs.len()];
    let mut order = Vec::new();
    for i in 0..pkg.structs.len() {
        visit(pkg, StructId(i), &mut marks, &mut order, diags);
    }
    order
}

fn check_bodies(pkg: &Package, opts: &CheckOptions, files: usize, sink: &mut Sink) {
    let outcomes: Vec<Outcome> = (0..files)
        .into_par_iter()
        .map(|file| {
            let mut c = Checker::new(pkg, opts);
            for (i, info) in pkg.structs.iter().enumerate() {
                if info.file == file && !info.is_generic() {
                    c.check_struct(StructId(i), &[]);
                }
            }
            for (i, info) in pkg.funcs.iter().enumerate().filter(|(_, f)| f.file == file) {
                let id = FuncId(i);
                c.check_params(&info.ast.params, &info.sig);
                let owner_generic = info.owner.map_or(false, |o| pkg.struct_info(o).is_generic());
                if !info.is_generic() && !owner_generic {
                    c.check_body(id, &[], &[]);
                }
            }
            c.finish()
        })
        .collect();
    for outcome in outcomes {
        sink.absorb(outcome);
    }
    debug!("checked bodies, {} instantiation request(s) pending", sink.requests.len());
}

// ==================== Instantiation ====================

/// Checks every requested generic combination once. Requests found while
/// checking an instance are queued one level deeper.
fn instantiate(
    pkg: &mut Package,
    opts: &CheckOptions,
    requests: Vec<Request>,
    sink: &mut Sink,
) -> Vec<StructInstance> {
    let mut queue: VecDeque<(Request, usize)> = requests.into_iter().map(|r| (r, 0)).collect();
    let mut instances = Vec::new();

    while let Some((request, depth)) = queue.pop_front() {
        let (name, combines) = match &request {
            Request::Func { id, .. } => (pkg.func(*id).qualified_name(pkg), &pkg.funcs[id.0].combines),
            Request::Struct { id, .. } => (pkg.struct_info(*id).name.clone(), &pkg.structs[id.0].combines),
        };
        let generics = match &request {
            Request::Func { generics, .. } | Request::Struct { generics, .. } => generics.clone(),
        };
        if combines.contains(&generics) {
            debug!("{} already instantiated with {:?}", name, kinds(&generics));
            continue;
        }
        if depth >= opts.max_instantiation_depth {
            warn!("instantiation of {} stopped at depth {}", name, depth);
            sink.diags.push(DiagKind::InstantiationLimit(name), request.span());
            continue;
        }
        debug!("instantiating {} with {:?}", name, kinds(&generics));
        match &request {
            Request::Func { id, .. } => {
                pkg.funcs[id.0].combines.insert(generics.clone());
            }
            Request::Struct { id, .. } => {
                pkg.structs[id.0].combines.insert(generics.clone());
            }
        }

        let pkg_ref: &Package = pkg;
        let mut c = Checker::new(pkg_ref, opts);
        match &request {
            Request::Func { id, .. } => {
                let owner_generic = pkg_ref
                    .func(*id)
                    .owner
                    .map_or(false, |o| pkg_ref.struct_info(o).is_generic());
                if !owner_generic {
                    c.check_body(*id, &[], &generics);
                }
            }
            Request::Struct { id, .. } => {
                let info = pkg_ref.struct_info(*id);
                let fields = c.check_struct(*id, &generics);
                let mut methods: Vec<FuncId> = info.methods.values().copied().collect();
                methods.sort();
                for method in methods {
                    if !pkg_ref.func(method).is_generic() {
                        c.check_body(method, &generics, &[]);
                    }
                }
                instances.push(StructInstance {
                    name: info.name.clone(),
                    generics: generics.clone(),
                    fields,
                });
            }
        }
        let outcome = c.finish();
        queue.extend(outcome.requests.iter().cloned().map(|r| (r, depth + 1)));
        sink.diags.extend(outcome.diags);
        sink.annotations.extend(outcome.annotations);
    }
    instances
}

fn kinds(types: &[Type]) -> Vec<&str> {
    types.iter().map(|t| t.kind.as_str()).collect()
}

// ==================== Join ====================

fn build_report(
    sources: &[(String, String)],
    parsed: Vec<Result<Program, utils::Error>>,
    pkg: &Package,
    sink: Sink,
    instances: Vec<StructInstance>,
) -> PackageReport {
    let mut files: Vec<FileReport> = sources
        .iter()
        .zip(parsed)
        .map(|((path, src), program)| FileReport {
            path: path.clone(),
            lines: LineIndex::new(src),
            diagnostics: Vec::new(),
            annotations: Vec::new(),
            fatal: program.err(),
        })
        .collect();

    for diag in sink.diags.into_vec() {
        match files.get_mut(diag.span.file_id) {
            Some(file) => file.diagnostics.push(diag),
            None => warn!("diagnostic outside of the package: {}", diag.kind),
        }
    }
    for annotation in sink.annotations {
        if let Some(file) = files.get_mut(annotation.span.file_id) {
            file.annotations.push(annotation);
        }
    }
    for file in &mut files {
        file.diagnostics.sort_by(|a, b| (a.span, a.key()).cmp(&(b.span, b.key())));
        file.diagnostics.dedup();
        file.annotations.sort_by_key(|a| a.span);
        file.annotations.dedup();
    }

    let mut combines = BTreeMap::new();
    for f in pkg.funcs.iter().filter(|f| !f.combines.is_empty()) {
        combines.insert(f.qualified_name(pkg), f.combines.iter().cloned().collect());
    }
    for s in pkg.structs.iter().filter(|s| !s.combines.is_empty()) {
        combines.insert(s.name.clone(), s.combines.iter().cloned().collect());
    }

    let report = PackageReport {
        files,
        combines,
        struct_order: pkg.struct_order.iter().map(|id| pkg.struct_info(*id).name.clone()).collect(),
        instances,
    };
    info!(
        "package checked: {} diagnostic(s), {} instance(s)",
        report.files.iter().map(|f| f.diagnostics.len()).sum::<usize>(),
        report.instances.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn check_with(sources: &[&str], opts: CheckOptions) -> PackageReport {
        let sources: Vec<(String, String)> = sources
            .iter()
            .enumerate()
            .map(|(i, src)| (format!("f{}.jn", i), src.to_string()))
            .collect();
        check_package(&sources, &opts)
    }

    fn check(sources: &[&str]) -> PackageReport {
        let opts = CheckOptions {
            report_unused: false,
            ..CheckOptions::default()
        };
        check_with(sources, opts)
    }

    fn keys(report: &PackageReport) -> Vec<&'static str> {
        report
            .files
            .iter()
            .flat_map(|f| f.diagnostics.iter().map(|d| d.key()))
            .collect()
    }

    fn int() -> Type {
        Type::primitive(TypeId::Int)
    }

    #[test]
    fn test_struct_instantiated_once() {
        let report = check(&[r#"
struct Box[T] { v: T }
impl Box {
    fn new(v: T) -> Box[T] { return Box::[T]{v: v} }
}
fn main() {
    let a = Box::[int].new(5)
    let b = Box::[int].new(7)
    let sum: int = a.v + b.v
    println(sum)
}
"#]);
        assert_eq!(keys(&report), Vec::<&str>::new());
        assert_eq!(report.instances.len(), 1);
        assert_eq!(report.instances[0].fields, vec![("v".to_string(), int())]);
        assert_eq!(report.combines.get("Box"), Some(&vec![vec![int()]]));
    }

    #[test]
    fn test_generic_function_deduplicates() {
        let report = check(&[r#"
fn id[T](v: T) -> T { return v }
fn main() {
    let a: int = id(1)
    let b: int = id(2)
    let s: str = id("x")
    println(a + b)
    println(s)
}
"#]);
        assert_eq!(keys(&report), Vec::<&str>::new());
        let combines = report.combines.get("id").cloned().unwrap_or_default();
        assert_eq!(combines, vec![vec![int()], vec![Type::primitive(TypeId::Str)]]);
    }

    #[test]
    fn test_missing_return_reported_once() {
        let report = check(&["fn f(x: int) -> int { { { } } if x > 0 { return 1 } }"]);
        assert_eq!(keys(&report), vec!["missing_ret"]);
    }

    #[test]
    fn test_argument_overflow_still_checks_arguments() {
        let report = check(&[r#"
fn add(a: int, b: int) -> int { return a + b }
fn main() { add(1, "two", 3) }
"#]);
        let keys = keys(&report);
        assert_eq!(keys.iter().filter(|k| **k == "argument_overflow").count(), 1);
        assert!(keys.contains(&"incompatible_types"));
    }

    #[test]
    fn test_duplicates_across_files() {
        let report = check(&["fn f() { }", "fn f() { }"]);
        assert!(report.files[0].diagnostics.is_empty());
        let second: Vec<&str> = report.files[1].diagnostics.iter().map(|d| d.key()).collect();
        assert_eq!(second, vec!["exist_id"]);
    }

    #[test]
    fn test_parse_error_drops_only_its_file() {
        let report = check(&["fn (", "fn ok() -> int { return 1 }"]);
        assert!(report.files[0].fatal.is_some());
        assert!(report.files[1].diagnostics.is_empty());
        assert!(report.has_errors());
        assert_eq!(report.render().len(), 1);
    }

    #[test]
    fn test_struct_order_and_value_cycles() {
        let report = check(&[r#"
struct A { b: B, p: *A }
struct B { c: C }
struct C { x: int }
struct Node { next: Node }
"#]);
        assert_eq!(keys(&report), vec!["illegal_cycle_in_declaration"]);
        assert_eq!(report.struct_order, vec!["C", "B", "A", "Node"]);
    }

    #[test]
    fn test_enum_bases_and_values() {
        let report = check(&[r#"
enum Small: u8 { A = 255, B }
enum Real: f32 { X }
enum Ok { P, Q = 4, R }
fn main() { let r: Ok = Ok.R; let n = Ok.R as int; println(n) }
"#]);
        assert_eq!(keys(&report), vec!["overflow_limits", "invalid_type_source"]);
        let folded = report.files[0]
            .annotations
            .iter()
            .rev()
            .find(|a| a.ty.id == TypeId::Int && a.constant.is_some());
        assert_eq!(folded.and_then(|a| a.constant.clone()), Some(Const::Int(5)));
    }

    #[test]
    fn test_tuple_result_spreads_over_parameters() {
        let report = check(&[r#"
fn two() -> (int, int) { return 1, 2 }
fn pair() -> (int, str) { return 1, "s" }
fn add(a: int, b: int) -> int { return a + b }
fn add3(a: int, b: int, c: int) -> int { return a + b + c }
fn main() { let s: int = add(two()); println(s) }
"#]);
        assert_eq!(keys(&report), Vec::<&str>::new());

        let report = check(&[r#"
fn pair() -> (int, str) { return 1, "s" }
fn add(a: int, b: int) -> int { return a + b }
fn main() { println(add(pair())) }
"#]);
        assert_eq!(keys(&report), vec!["incompatible_types"]);

        let report = check(&[r#"
fn two() -> (int, int) { return 1, 2 }
fn add3(a: int, b: int, c: int) -> int { return a + b + c }
fn main() { println(add3(two())) }
"#]);
        assert_eq!(keys(&report), vec!["missing_expr_for"]);
    }

    #[test]
    fn test_enum_rejected_as_generic() {
        let report = check(&[r#"
enum E { A, B }
fn id[T](v: T) -> T { return v }
fn main() { let x = id::[E](E.A); println(x) }
"#]);
        assert_eq!(keys(&report), vec!["enum_not_supports_as_generic"]);
    }

    #[test]
    fn test_mixed_constant_comparison_folds_as_left_kind() {
        let report = check(&["fn main() { let b = 1 < 1.5; println(b) }"]);
        assert_eq!(keys(&report), Vec::<&str>::new());
        let folded = report.files[0]
            .annotations
            .iter()
            .find(|a| a.ty.id == TypeId::Bool && a.constant.is_some());
        assert_eq!(folded.and_then(|a| a.constant.clone()), Some(Const::Bool(false)));
    }

    #[test]
    fn test_trait_implementations() {
        let report = check(&[r#"
trait Shape { fn area(&self) -> int }
struct Sq { s: int }
impl Shape for Sq {
    fn area(&self) -> int { return self.s * self.s }
    fn extra(&self) { }
}
struct Bad { }
impl Shape for Bad {
    fn area(self) -> int { return 0 }
}
"#]);
        assert_eq!(keys(&report), vec!["trait_hasnt_id", "not_impl_trait_def"]);
    }

    #[test]
    fn test_global_cycle_reported_once() {
        let report = check(&["const A = B + 1\nconst B = A + 1"]);
        assert_eq!(keys(&report), vec!["illegal_cycle_in_declaration"]);
    }

    #[test]
    fn test_instantiation_depth_limit() {
        let opts = CheckOptions {
            report_unused: false,
            max_instantiation_depth: 4,
            ..CheckOptions::default()
        };
        let report = check_with(&["fn grow[T](v: T) { grow([v]) }\nfn main() { grow(1) }"], opts);
        assert_eq!(keys(&report), vec!["instantiation_limit"]);
        assert_eq!(report.combines.get("grow").map(Vec::len), Some(4));
    }
}
