//! Evaluation results

use std::fmt;

use serde::Serialize;

use crate::types::{bits, Type, TypeId};

/// Folded compile-time literal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Const {
    Bool(bool),
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
}

impl Const {
    pub fn as_f64(&self) -> f64 {
        match self {
            Const::Int(v) => *v as f64,
            Const::Uint(v) => *v as f64,
            Const::Float(v) => *v,
            Const::Bool(_) | Const::Str(_) => 0.0,
        }
    }

    /// Wrapping conversion to a signed value
    pub fn as_i64(&self) -> i64 {
        match self {
            Const::Int(v) => *v,
            Const::Uint(v) => *v as i64,
            Const::Float(v) => *v as i64,
            Const::Bool(_) | Const::Str(_) => 0,
        }
    }

    /// Wrapping conversion to an unsigned value
    pub fn as_u64(&self) -> u64 {
        match self {
            Const::Int(v) => *v as u64,
            Const::Uint(v) => *v,
            Const::Float(v) => *v as u64,
            Const::Bool(_) | Const::Str(_) => 0,
        }
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, Const::Bool(true))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Const::Int(_) | Const::Uint(_) | Const::Float(_))
    }

    /// Zero of the same kind
    pub fn zero(&self) -> Const {
        match self {
            Const::Int(_) => Const::Int(0),
            Const::Uint(_) => Const::Uint(0),
            Const::Float(_) => Const::Float(0.0),
            Const::Bool(_) => Const::Bool(false),
            Const::Str(_) => Const::Str(String::new()),
        }
    }

    /// Whether the value is a signed value that fits `i64`
    pub fn fits_i64(&self) -> bool {
        match self {
            Const::Int(_) => true,
            Const::Uint(v) => *v <= i64::MAX as u64,
            Const::Float(v) => v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64,
            _ => false,
        }
    }

    pub fn fits_u64(&self) -> bool {
        match self {
            Const::Int(v) => *v >= 0,
            Const::Uint(_) => true,
            Const::Float(v) => v.fract() == 0.0 && *v >= 0.0 && *v <= u64::MAX as f64,
            _ => false,
        }
    }

    /// Converts to the constant representation of a numeric category
    pub fn cast_to(&self, id: TypeId) -> Const {
        if bits::is_float(id) {
            Const::Float(self.as_f64())
        } else if bits::is_unsigned_integer(id) {
            Const::Uint(self.as_u64())
        } else if bits::is_signed_integer(id) {
            Const::Int(self.as_i64())
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Bool(v) => write!(f, "{}", v),
            Const::Str(v) => write!(f, "{:?}", v),
            Const::Int(v) => write!(f, "{}", v),
            Const::Uint(v) => write!(f, "{}", v),
            Const::Float(v) => write!(f, "{}", v),
        }
    }
}

/// What an expression evaluates to
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Value {
    pub ty: Type,
    /// Present iff the value is a compile-time constant
    pub constant: Option<Const>,
    pub lvalue: bool,
    pub mutable: bool,
    /// Written as a character literal
    pub is_rune: bool,
    /// Names a method (no receiver bound)
    pub is_method: bool,
    /// Names a generic function template
    pub is_generic_fn: bool,
    /// Names a type rather than a value
    pub is_type: bool,
}

impl Value {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            ..Self::default()
        }
    }

    pub fn constant(ty: Type, value: Const) -> Self {
        Self {
            ty,
            constant: Some(value),
            ..Self::default()
        }
    }

    /// Sentinel used after an error
    pub fn void() -> Self {
        Self::new(Type::void())
    }

    pub fn is_const(&self) -> bool {
        self.constant.is_some()
    }

    pub fn lvalue(mut self, mutable: bool) -> Self {
        self.lvalue = true;
        self.mutable = mutable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cast_and_fit() {
        assert_eq!(Const::Float(3.9).cast_to(TypeId::I32), Const::Int(3));
        assert_eq!(Const::Int(-1).cast_to(TypeId::U8), Const::Uint(u64::MAX));
        assert_eq!(Const::Uint(7).cast_to(TypeId::F64), Const::Float(7.0));
        assert!(Const::Uint(5).fits_i64());
        assert!(!Const::Uint(u64::MAX).fits_i64());
        assert!(!Const::Int(-3).fits_u64());
        assert!(!Const::Float(1.5).fits_i64());
    }

    #[test]
    fn test_zero_keeps_kind() {
        assert_eq!(Const::Int(10).zero(), Const::Int(0));
        assert_eq!(Const::Uint(10).zero(), Const::Uint(0));
        assert_eq!(Const::Float(2.5).zero(), Const::Float(0.0));
    }
}
