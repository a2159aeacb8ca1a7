//! Type Model
//!
//! A resolved type is identified by its category (`TypeId`) and its canonical
//! kind string. Pointer and reference modifiers are carried as `*`/`&`
//! prefixes of the kind; the category stays the one of the pointee.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::utils::Span;

/// Type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeId {
    Void,
    Nil,
    Any,
    Bool,
    Str,
    I8,
    I16,
    I32,
    I64,
    Int,
    U8,
    U16,
    U32,
    U64,
    Uint,
    Uintptr,
    F32,
    F64,
    /// *unsafe
    Unsafe,
    /// Generic parameter of a template that has not been bound
    Generic,
    Fn,
    Map,
    Enum,
    Struct,
    Trait,
    Slice,
    Array,
    /// Multi-valued type (multiple returns)
    Tuple,
}

impl TypeId {
    /// Primitive category named by a source identifier
    pub fn primitive_from_str(name: &str) -> Option<TypeId> {
        let id = match name {
            "i8" => TypeId::I8,
            "i16" => TypeId::I16,
            "i32" => TypeId::I32,
            "i64" => TypeId::I64,
            "int" => TypeId::Int,
            "u8" => TypeId::U8,
            "u16" => TypeId::U16,
            "u32" => TypeId::U32,
            "u64" => TypeId::U64,
            "uint" => TypeId::Uint,
            "uintptr" => TypeId::Uintptr,
            "f32" => TypeId::F32,
            "f64" => TypeId::F64,
            "bool" => TypeId::Bool,
            "str" => TypeId::Str,
            "any" => TypeId::Any,
            "void" => TypeId::Void,
            _ => return None,
        };
        Some(id)
    }

    /// Kind string of a primitive category
    pub fn name(&self) -> &'static str {
        match self {
            TypeId::Void => "void",
            TypeId::Nil => "nil",
            TypeId::Any => "any",
            TypeId::Bool => "bool",
            TypeId::Str => "str",
            TypeId::I8 => "i8",
            TypeId::I16 => "i16",
            TypeId::I32 => "i32",
            TypeId::I64 => "i64",
            TypeId::Int => "int",
            TypeId::U8 => "u8",
            TypeId::U16 => "u16",
            TypeId::U32 => "u32",
            TypeId::U64 => "u64",
            TypeId::Uint => "uint",
            TypeId::Uintptr => "uintptr",
            TypeId::F32 => "f32",
            TypeId::F64 => "f64",
            TypeId::Unsafe => "unsafe",
            TypeId::Generic => "generic",
            TypeId::Fn => "fn",
            TypeId::Map => "map",
            TypeId::Enum => "enum",
            TypeId::Struct => "struct",
            TypeId::Trait => "trait",
            TypeId::Slice => "slice",
            TypeId::Array => "array",
            TypeId::Tuple => "tuple",
        }
    }
}

/// Index of a struct definition in the package table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StructId(pub usize);

/// Index of a trait definition in the package table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TraitId(pub usize);

/// Index of an enum definition in the package table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EnumId(pub usize);

/// Resolved parameter of a function type
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
    pub variadic: bool,
    pub has_default: bool,
}

/// Resolved function signature
#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    pub params: Vec<Param>,
    pub ret: Type,
    /// Declared with a receiver
    pub is_method: bool,
    /// Template with unbound generic parameters
    pub generic: bool,
    pub is_unsafe: bool,
}

impl FnSig {
    /// Canonical kind string: `fn(int, ...str) -> bool`
    pub fn kind(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                if p.variadic {
                    // Variadic parameters are slices inside the body
                    let elem = p.ty.component.as_deref().map_or("?", |c| c.kind.as_str());
                    format!("...{}", elem)
                } else {
                    p.ty.kind.clone()
                }
            })
            .collect();
        let mut kind = String::new();
        if self.is_unsafe {
            kind.push_str("unsafe ");
        }
        kind.push_str("fn(");
        kind.push_str(&params.join(", "));
        kind.push(')');
        if !self.ret.is_void() {
            kind.push_str(" -> ");
            kind.push_str(&self.ret.kind);
        }
        kind
    }

    /// Index of the trailing variadic parameter
    pub fn variadic_index(&self) -> Option<usize> {
        self.params.iter().position(|p| p.variadic)
    }
}

/// Category-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTag {
    None,
    Struct { def: StructId, generics: Vec<Type> },
    Trait(TraitId),
    Enum(EnumId),
    Fn(Box<FnSig>),
    /// Map `[key, value]` or tuple components
    Types(Vec<Type>),
}

/// Canonical resolved type
#[derive(Debug, Clone)]
pub struct Type {
    pub id: TypeId,
    /// Identity key
    pub kind: String,
    pub tag: TypeTag,
    /// Element of slices and arrays
    pub component: Option<Box<Type>>,
    /// Array length; None on an auto-sized array
    pub size: Option<u64>,
    pub span: Span,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.kind == other.kind
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}

impl Serialize for Type {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.kind)
    }
}

impl Default for Type {
    fn default() -> Self {
        Self::void()
    }
}

// ==================== Construction ====================

impl Type {
    fn bare(id: TypeId, kind: String) -> Self {
        Self {
            id,
            kind,
            tag: TypeTag::None,
            component: None,
            size: None,
            span: Span::dummy(),
        }
    }

    pub fn primitive(id: TypeId) -> Self {
        Self::bare(id, id.name().to_string())
    }

    pub fn void() -> Self {
        Self::primitive(TypeId::Void)
    }

    pub fn nil() -> Self {
        Self::primitive(TypeId::Nil)
    }

    pub fn bool() -> Self {
        Self::primitive(TypeId::Bool)
    }

    pub fn unsafe_ptr() -> Self {
        Self::bare(TypeId::Unsafe, "*unsafe".to_string())
    }

    /// Unbound generic parameter
    pub fn generic(name: &str) -> Self {
        Self::bare(TypeId::Generic, name.to_string())
    }

    pub fn slice(elem: Type) -> Self {
        let mut t = Self::bare(TypeId::Slice, format!("[]{}", elem.kind));
        t.component = Some(Box::new(elem));
        t
    }

    pub fn array(elem: Type, size: Option<u64>) -> Self {
        let kind = match size {
            Some(n) => format!("[{}]{}", n, elem.kind),
            None => format!("[...]{}", elem.kind),
        };
        let mut t = Self::bare(TypeId::Array, kind);
        t.component = Some(Box::new(elem));
        t.size = size;
        t
    }

    pub fn map(key: Type, value: Type) -> Self {
        let mut t = Self::bare(TypeId::Map, format!("[{}:{}]", key.kind, value.kind));
        t.tag = TypeTag::Types(vec![key, value]);
        t
    }

    pub fn tuple(types: Vec<Type>) -> Self {
        let kinds: Vec<&str> = types.iter().map(|t| t.kind.as_str()).collect();
        let mut t = Self::bare(TypeId::Tuple, format!("({})", kinds.join(", ")));
        t.tag = TypeTag::Types(types);
        t
    }

    pub fn func(sig: FnSig) -> Self {
        let mut t = Self::bare(TypeId::Fn, sig.kind());
        t.tag = TypeTag::Fn(Box::new(sig));
        t
    }

    pub fn structure(def: StructId, name: &str, generics: Vec<Type>) -> Self {
        let kind = if generics.is_empty() {
            name.to_string()
        } else {
            let kinds: Vec<&str> = generics.iter().map(|g| g.kind.as_str()).collect();
            format!("{}[{}]", name, kinds.join(","))
        };
        let mut t = Self::bare(TypeId::Struct, kind);
        t.tag = TypeTag::Struct { def, generics };
        t
    }

    pub fn trait_object(def: TraitId, name: &str) -> Self {
        let mut t = Self::bare(TypeId::Trait, name.to_string());
        t.tag = TypeTag::Trait(def);
        t
    }

    pub fn enumeration(def: EnumId, name: &str) -> Self {
        let mut t = Self::bare(TypeId::Enum, name.to_string());
        t.tag = TypeTag::Enum(def);
        t
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// `*T`
    pub fn pointer_to(&self) -> Self {
        let mut t = self.clone();
        t.kind.insert(0, '*');
        t
    }

    /// `&T`
    pub fn reference_to(&self) -> Self {
        let mut t = self.clone();
        t.kind.insert(0, '&');
        t
    }

    /// Strips one pointer or reference modifier
    pub fn elem(&self) -> Self {
        let mut t = self.clone();
        if t.has_modifier() {
            t.kind.remove(0);
        }
        t
    }

    /// Element type of a slice or array
    pub fn component(&self) -> Option<&Type> {
        self.component.as_deref()
    }

    /// Components of a map (`[key, value]`) or tuple
    pub fn types(&self) -> &[Type] {
        match &self.tag {
            TypeTag::Types(types) => types,
            _ => &[],
        }
    }

    pub fn fn_sig(&self) -> Option<&FnSig> {
        match &self.tag {
            TypeTag::Fn(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn struct_def(&self) -> Option<(StructId, &[Type])> {
        match &self.tag {
            TypeTag::Struct { def, generics } => Some((*def, generics)),
            _ => None,
        }
    }

    pub fn trait_def(&self) -> Option<TraitId> {
        match self.tag {
            TypeTag::Trait(def) => Some(def),
            _ => None,
        }
    }

    pub fn enum_def(&self) -> Option<EnumId> {
        match self.tag {
            TypeTag::Enum(def) => Some(def),
            _ => None,
        }
    }
}

// ==================== Predicates ====================

impl Type {
    /// Leading pointer/reference modifiers of the kind
    pub fn modifiers(&self) -> &str {
        if self.is_unsafe_ptr() {
            return "";
        }
        let end = self
            .kind
            .find(|c: char| c != '*' && c != '&')
            .unwrap_or(self.kind.len());
        &self.kind[..end]
    }

    fn has_modifier(&self) -> bool {
        self.kind.starts_with('*') || self.kind.starts_with('&')
    }

    pub fn is_void(&self) -> bool {
        self.id == TypeId::Void
    }

    pub fn is_tuple(&self) -> bool {
        self.id == TypeId::Tuple
    }

    pub fn is_unsafe_ptr(&self) -> bool {
        self.id == TypeId::Unsafe && self.kind == "*unsafe"
    }

    pub fn is_explicit_ptr(&self) -> bool {
        self.kind.starts_with('*') && !self.is_unsafe_ptr()
    }

    pub fn is_ptr(&self) -> bool {
        self.is_explicit_ptr() || self.is_unsafe_ptr()
    }

    pub fn is_ref(&self) -> bool {
        self.kind.starts_with('&')
    }

    pub fn is_slice(&self) -> bool {
        self.id == TypeId::Slice && self.kind.starts_with("[]")
    }

    pub fn is_array(&self) -> bool {
        self.id == TypeId::Array && self.kind.starts_with('[')
    }

    pub fn is_map(&self) -> bool {
        self.id == TypeId::Map && self.kind.starts_with('[') && self.kind.ends_with(']')
    }

    pub fn is_fn(&self) -> bool {
        self.id == TypeId::Fn && (self.kind.starts_with("fn") || self.kind.starts_with("unsafe fn"))
    }

    pub fn is_struct(&self) -> bool {
        self.id == TypeId::Struct
    }

    pub fn is_trait(&self) -> bool {
        self.id == TypeId::Trait
    }

    pub fn is_enum(&self) -> bool {
        self.id == TypeId::Enum
    }

    pub fn is_nil(&self) -> bool {
        self.id == TypeId::Nil
    }

    pub fn is_any(&self) -> bool {
        self.id == TypeId::Any && !self.has_modifier()
    }

    /// No pointer, reference, slice, array, map or function shape
    pub fn is_pure(&self) -> bool {
        !self.is_ptr()
            && !self.is_ref()
            && !self.is_slice()
            && !self.is_array()
            && !self.is_map()
            && !self.is_fn()
    }

    /// Accepts `nil` as a value
    pub fn is_nil_compatible(&self) -> bool {
        self.is_nil()
            || self.is_fn()
            || self.is_ptr()
            || self.is_slice()
            || self.is_trait()
            || self.is_map()
    }

    /// Shares its storage when copied
    pub fn is_mut(&self) -> bool {
        self.is_slice() || self.is_ptr() || self.is_ref()
    }

    /// May sit behind a `&`
    pub fn valid_for_ref(&self) -> bool {
        !(self.is_enum() || self.is_ptr() || self.is_ref() || self.is_array())
    }

    /// Valid type for a constant
    pub fn allowed_for_const(&self) -> bool {
        if !self.is_pure() {
            return false;
        }
        match self.id {
            TypeId::Str | TypeId::Bool => true,
            id => crate::types::bits::is_numeric(id),
        }
    }

    /// Contains an unbound generic parameter anywhere in its structure
    pub fn has_generic(&self) -> bool {
        if self.id == TypeId::Generic {
            return true;
        }
        if self.component().map_or(false, Type::has_generic) {
            return true;
        }
        match &self.tag {
            TypeTag::Types(types) => types.iter().any(Type::has_generic),
            TypeTag::Struct { generics, .. } => generics.iter().any(Type::has_generic),
            TypeTag::Fn(sig) => {
                sig.params.iter().any(|p| p.ty.has_generic()) || sig.ret.has_generic()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_strings() {
        let int = Type::primitive(TypeId::Int);
        let str_ = Type::primitive(TypeId::Str);
        assert_eq!(Type::slice(int.clone()).kind, "[]int");
        assert_eq!(Type::array(int.clone(), Some(4)).kind, "[4]int");
        assert_eq!(Type::array(int.clone(), None).kind, "[...]int");
        assert_eq!(Type::map(str_.clone(), Type::slice(int.clone())).kind, "[str:[]int]");
        assert_eq!(Type::tuple(vec![int.clone(), str_.clone()]).kind, "(int, str)");
        assert_eq!(Type::structure(StructId(0), "Box", vec![int.clone()]).kind, "Box[int]");
        assert_eq!(int.pointer_to().reference_to().kind, "&*int");
    }

    #[test]
    fn test_fn_kind() {
        let sig = FnSig {
            params: vec![
                Param {
                    name: "a".into(),
                    ty: Type::primitive(TypeId::Int),
                    mutable: false,
                    variadic: false,
                    has_default: false,
                },
                Param {
                    name: "rest".into(),
                    ty: Type::slice(Type::primitive(TypeId::Str)),
                    mutable: false,
                    variadic: true,
                    has_default: false,
                },
            ],
            ret: Type::bool(),
            is_method: false,
            generic: false,
            is_unsafe: false,
        };
        assert_eq!(Type::func(sig).kind, "fn(int, ...str) -> bool");
    }

    #[test]
    fn test_identity_is_category_and_kind() {
        let a = Type::primitive(TypeId::Int).with_span(Span::new(1, 4, 0));
        let b = Type::primitive(TypeId::Int).with_span(Span::new(9, 12, 0));
        assert_eq!(a, b);
        assert_ne!(Type::primitive(TypeId::Int), Type::primitive(TypeId::I64));
        assert_ne!(a.pointer_to(), a);
        assert_eq!(a.pointer_to().elem(), a);
    }

    #[test]
    fn test_modifier_predicates() {
        let int = Type::primitive(TypeId::Int);
        let ptr_slice = Type::slice(int.clone()).pointer_to();
        assert!(ptr_slice.is_ptr());
        assert!(!ptr_slice.is_slice());
        assert!(!ptr_slice.is_pure());
        assert_eq!(ptr_slice.modifiers(), "*");
        assert!(Type::unsafe_ptr().is_ptr());
        assert!(Type::unsafe_ptr().is_unsafe_ptr());
        assert!(!int.reference_to().valid_for_ref());
        assert!(Type::slice(int).is_nil_compatible());
    }
}
