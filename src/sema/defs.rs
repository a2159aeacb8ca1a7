//! Package definition table
//!
//! Declarations of every file in a package, merged into one table. The
//! table is filled between phases and shared read-only while workers run.

use std::collections::{HashMap, HashSet};

use crate::frontend::ast;
use crate::sema::generics::Combines;
use crate::sema::value::{Const, Value};
use crate::types::{Definitions, EnumId, FnSig, Param, StructId, TraitId, Type, TypeId};
use crate::utils::Span;

/// Index of a function or method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub usize);

/// Index of a package-level alias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AliasId(pub usize);

/// Index of a package-level `let`/`const`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub usize);

/// What a package-level name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Struct(StructId),
    Trait(TraitId),
    Enum(EnumId),
    Func(FuncId),
    Alias(AliasId),
    Global(GlobalId),
}

// ==================== Declarations ====================

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Type,
    pub has_default: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructInfo {
    pub name: String,
    pub file: usize,
    pub ast: ast::StructDef,
    pub generics: Vec<String>,
    /// Template field types; generic parameters stay unbound
    pub fields: Vec<FieldInfo>,
    pub methods: HashMap<String, FuncId>,
    pub traits: Vec<TraitId>,
    pub combines: Combines,
}

impl StructInfo {
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct TraitMethod {
    pub name: String,
    pub by_ref: bool,
    pub sig: FnSig,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TraitInfo {
    pub name: String,
    pub file: usize,
    pub ast: ast::TraitDef,
    pub methods: Vec<TraitMethod>,
}

#[derive(Debug, Clone)]
pub struct EnumInfo {
    pub name: String,
    pub file: usize,
    pub ast: ast::EnumDef,
    pub base: Type,
    pub items: Vec<(String, Const)>,
}

#[derive(Debug, Clone)]
pub struct FuncInfo {
    pub name: String,
    pub file: usize,
    pub ast: ast::Function,
    /// Struct the method is declared on
    pub owner: Option<StructId>,
    pub generics: Vec<String>,
    /// Template signature; generic parameters stay unbound
    pub sig: FnSig,
    pub combines: Combines,
}

impl FuncInfo {
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    /// `Some(true)` for `&self`, `Some(false)` for `self`
    pub fn receiver(&self) -> Option<bool> {
        self.ast.receiver.map(|r| r.by_ref)
    }

    /// Display name, `Struct.method` for methods
    pub fn qualified_name(&self, pkg: &Package) -> String {
        match self.owner {
            Some(owner) => format!("{}.{}", pkg.structs[owner.0].name, self.name),
            None => self.name.clone(),
        }
    }
}

/// `impl Trait for Struct` block
#[derive(Debug, Clone)]
pub struct TraitImpl {
    pub trait_id: TraitId,
    pub owner: StructId,
    pub methods: Vec<FuncId>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AliasInfo {
    pub name: String,
    pub file: usize,
    pub ast: ast::TypeAlias,
    /// Target type; `None` until resolved or when resolution failed
    pub ty: Option<Type>,
}

#[derive(Debug, Clone)]
pub struct GlobalInfo {
    pub name: String,
    pub file: usize,
    pub ast: ast::GlobalDef,
    /// Set once the initializer was evaluated
    pub value: Option<Value>,
}

// ==================== Builtins ====================

/// Builtin type aliases
pub fn builtin_alias(name: &str) -> Option<Type> {
    match name {
        "byte" => Some(Type::primitive(TypeId::U8)),
        "rune" => Some(Type::primitive(TypeId::I32)),
        _ => None,
    }
}

/// Builtin functions
pub fn builtin_func(name: &str) -> Option<FnSig> {
    match name {
        "print" | "println" => Some(FnSig {
            params: vec![Param {
                name: "v".to_string(),
                ty: Type::primitive(TypeId::Any),
                mutable: false,
                variadic: false,
                has_default: false,
            }],
            ret: Type::void(),
            is_method: false,
            generic: false,
            is_unsafe: false,
        }),
        _ => None,
    }
}

// ==================== Package ====================

/// Merged definitions of a package
#[derive(Debug, Default)]
pub struct Package {
    pub structs: Vec<StructInfo>,
    pub traits: Vec<TraitInfo>,
    pub enums: Vec<EnumInfo>,
    pub funcs: Vec<FuncInfo>,
    pub aliases: Vec<AliasInfo>,
    pub globals: Vec<GlobalInfo>,
    pub impls: Vec<TraitImpl>,
    names: HashMap<String, Symbol>,
    /// Aliases whose target failed to resolve, cycles included
    pub broken_aliases: HashSet<AliasId>,
    /// Non-generic structs in dependency order
    pub struct_order: Vec<StructId>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.names.get(name).copied()
    }

    /// Registers a package-level name; false if it already exists
    pub fn declare(&mut self, name: &str, symbol: Symbol) -> bool {
        if self.names.contains_key(name) {
            return false;
        }
        self.names.insert(name.to_string(), symbol);
        true
    }

    pub fn struct_info(&self, id: StructId) -> &StructInfo {
        &self.structs[id.0]
    }

    pub fn trait_info(&self, id: TraitId) -> &TraitInfo {
        &self.traits[id.0]
    }

    pub fn enum_info(&self, id: EnumId) -> &EnumInfo {
        &self.enums[id.0]
    }

    pub fn func(&self, id: FuncId) -> &FuncInfo {
        &self.funcs[id.0]
    }

    pub fn method(&self, owner: StructId, name: &str) -> Option<FuncId> {
        self.structs[owner.0].methods.get(name).copied()
    }

    /// Functions that are not methods
    pub fn free_funcs(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.funcs
            .iter()
            .enumerate()
            .filter(|(_, f)| f.owner.is_none())
            .map(|(i, _)| FuncId(i))
    }
}

impl Definitions for Package {
    fn implements(&self, def: StructId, tr: TraitId) -> bool {
        self.structs
            .get(def.0)
            .map_or(false, |s| s.traits.contains(&tr))
    }

    fn has_ref_receiver(&self, tr: TraitId) -> bool {
        self.traits
            .get(tr.0)
            .map_or(false, |t| t.methods.iter().any(|m| m.by_ref))
    }

    fn enum_base(&self, def: EnumId) -> Type {
        self.enums
            .get(def.0)
            .map_or_else(|| Type::primitive(TypeId::U32), |e| e.base.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declare_rejects_duplicates() {
        let mut pkg = Package::new();
        assert!(pkg.declare("Point", Symbol::Struct(StructId(0))));
        assert!(!pkg.declare("Point", Symbol::Func(FuncId(0))));
        assert_eq!(pkg.lookup("Point"), Some(Symbol::Struct(StructId(0))));
        assert_eq!(pkg.lookup("missing"), None);
    }

    #[test]
    fn test_builtins() {
        assert_eq!(builtin_alias("byte"), Some(Type::primitive(TypeId::U8)));
        assert_eq!(builtin_alias("rune"), Some(Type::primitive(TypeId::I32)));
        assert!(builtin_func("println").is_some());
        assert!(builtin_func("printf").is_none());
    }
}
