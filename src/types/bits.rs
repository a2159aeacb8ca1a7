//! Primitive numeric lattice: widths, limits, promotion and literal sizing

use crate::types::TypeId;

/// Target word size; decides what `int`, `uint` and `uintptr` mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordSize {
    #[default]
    Bits64,
    Bits32,
}

impl WordSize {
    pub fn bits(&self) -> u32 {
        match self {
            WordSize::Bits64 => 64,
            WordSize::Bits32 => 32,
        }
    }
}

/// Maps the platform-sized categories onto fixed-width ones
pub fn real_id(id: TypeId, ws: WordSize) -> TypeId {
    match (id, ws) {
        (TypeId::Int, WordSize::Bits64) => TypeId::I64,
        (TypeId::Int, WordSize::Bits32) => TypeId::I32,
        (TypeId::Uint | TypeId::Uintptr, WordSize::Bits64) => TypeId::U64,
        (TypeId::Uint | TypeId::Uintptr, WordSize::Bits32) => TypeId::U32,
        (id, _) => id,
    }
}

pub fn is_signed_integer(id: TypeId) -> bool {
    matches!(
        id,
        TypeId::I8 | TypeId::I16 | TypeId::I32 | TypeId::I64 | TypeId::Int
    )
}

pub fn is_unsigned_integer(id: TypeId) -> bool {
    matches!(
        id,
        TypeId::U8 | TypeId::U16 | TypeId::U32 | TypeId::U64 | TypeId::Uint | TypeId::Uintptr
    )
}

pub fn is_integer(id: TypeId) -> bool {
    is_signed_integer(id) || is_unsigned_integer(id)
}

pub fn is_float(id: TypeId) -> bool {
    matches!(id, TypeId::F32 | TypeId::F64)
}

pub fn is_numeric(id: TypeId) -> bool {
    is_integer(id) || is_float(id)
}

pub fn is_signed_numeric(id: TypeId) -> bool {
    is_signed_integer(id) || is_float(id)
}

/// Width in bits of a numeric category, 0 for everything else
pub fn bit_size(id: TypeId, ws: WordSize) -> u32 {
    match real_id(id, ws) {
        TypeId::I8 | TypeId::U8 => 8,
        TypeId::I16 | TypeId::U16 => 16,
        TypeId::I32 | TypeId::U32 | TypeId::F32 => 32,
        TypeId::I64 | TypeId::U64 | TypeId::F64 => 64,
        _ => 0,
    }
}

pub fn int_from_bits(bits: u32) -> TypeId {
    match bits {
        8 => TypeId::I8,
        16 => TypeId::I16,
        32 => TypeId::I32,
        _ => TypeId::I64,
    }
}

pub fn uint_from_bits(bits: u32) -> TypeId {
    match bits {
        8 => TypeId::U8,
        16 => TypeId::U16,
        32 => TypeId::U32,
        _ => TypeId::U64,
    }
}

pub fn float_from_bits(bits: u32) -> TypeId {
    match bits {
        32 => TypeId::F32,
        _ => TypeId::F64,
    }
}

/// Smallest signed width holding `x`
pub fn bitsize_int(x: i64) -> u32 {
    if i8::try_from(x).is_ok() {
        8
    } else if i16::try_from(x).is_ok() {
        16
    } else if i32::try_from(x).is_ok() {
        32
    } else {
        64
    }
}

/// Smallest unsigned width holding `x`
pub fn bitsize_uint(x: u64) -> u32 {
    if u8::try_from(x).is_ok() {
        8
    } else if u16::try_from(x).is_ok() {
        16
    } else if u32::try_from(x).is_ok() {
        32
    } else {
        64
    }
}

/// Smallest float width holding `x`
pub fn bitsize_float(x: f64) -> u32 {
    if x >= -(f32::MAX as f64) && x <= f32::MAX as f64 {
        32
    } else {
        64
    }
}

// ==================== Limits ====================

pub fn min_signed(id: TypeId, ws: WordSize) -> i64 {
    match real_id(id, ws) {
        TypeId::I8 => i8::MIN as i64,
        TypeId::I16 => i16::MIN as i64,
        TypeId::I32 => i32::MIN as i64,
        TypeId::I64 => i64::MIN,
        _ => 0,
    }
}

pub fn max_signed(id: TypeId, ws: WordSize) -> i64 {
    match real_id(id, ws) {
        TypeId::I8 => i8::MAX as i64,
        TypeId::I16 => i16::MAX as i64,
        TypeId::I32 => i32::MAX as i64,
        TypeId::I64 => i64::MAX,
        _ => 0,
    }
}

pub fn max_unsigned(id: TypeId, ws: WordSize) -> u64 {
    match real_id(id, ws) {
        TypeId::U8 => u8::MAX as u64,
        TypeId::U16 => u16::MAX as u64,
        TypeId::U32 => u32::MAX as u64,
        TypeId::U64 => u64::MAX,
        _ => 0,
    }
}

/// Largest finite value of a float category
pub fn max_float(id: TypeId) -> f64 {
    match id {
        TypeId::F32 => f32::MAX as f64,
        _ => f64::MAX,
    }
}

// ==================== Compatibility lattice ====================

/// Whether a value of `given` may be stored in `target` without a cast
pub fn types_are_compatible(target: TypeId, given: TypeId, ignore_any: bool, ws: WordSize) -> bool {
    let given = real_id(given, ws);
    match real_id(target, ws) {
        TypeId::Any => !ignore_any,
        TypeId::I8 => given == TypeId::I8,
        TypeId::I16 => matches!(given, TypeId::I8 | TypeId::I16 | TypeId::U8),
        TypeId::I32 => matches!(
            given,
            TypeId::I8 | TypeId::I16 | TypeId::I32 | TypeId::U8 | TypeId::U16
        ),
        TypeId::I64 => matches!(
            given,
            TypeId::I8
                | TypeId::I16
                | TypeId::I32
                | TypeId::I64
                | TypeId::U8
                | TypeId::U16
                | TypeId::U32
        ),
        TypeId::U8 => given == TypeId::U8,
        TypeId::U16 => matches!(given, TypeId::U8 | TypeId::U16),
        TypeId::U32 => matches!(given, TypeId::U8 | TypeId::U16 | TypeId::U32),
        TypeId::U64 => matches!(given, TypeId::U8 | TypeId::U16 | TypeId::U32 | TypeId::U64),
        TypeId::F32 => given == TypeId::F32 || is_integer(given),
        TypeId::F64 => matches!(given, TypeId::F64 | TypeId::F32) || is_integer(given),
        TypeId::Bool => given == TypeId::Bool,
        TypeId::Str => given == TypeId::Str,
        TypeId::Nil => given == TypeId::Nil,
        _ => false,
    }
}

/// Promotion rank: whether `t1` is the wider operand against `t2`
pub fn type_greater_than(t1: TypeId, t2: TypeId, ws: WordSize) -> bool {
    let t2 = real_id(t2, ws);
    match real_id(t1, ws) {
        TypeId::I16 => t2 == TypeId::U8,
        TypeId::I32 => matches!(t2, TypeId::I8 | TypeId::I16),
        TypeId::I64 => matches!(t2, TypeId::I8 | TypeId::I16 | TypeId::I32),
        TypeId::U16 => t2 == TypeId::U8,
        TypeId::U32 => matches!(t2, TypeId::U8 | TypeId::U16),
        TypeId::U64 => matches!(t2, TypeId::U8 | TypeId::U16 | TypeId::U32),
        TypeId::F32 => t2 != TypeId::Any && t2 != TypeId::F64,
        TypeId::F64 => t2 != TypeId::Any,
        TypeId::Enum | TypeId::Any => true,
        _ => false,
    }
}

/// Result category of a constant shift, derived from the shift amount
pub fn shift_result(amount: u64) -> TypeId {
    match amount {
        0..=6 => TypeId::I8,
        7 => TypeId::U8,
        8..=14 => TypeId::I16,
        15 => TypeId::U16,
        16..=30 => TypeId::I32,
        31 => TypeId::U32,
        32..=62 => TypeId::I64,
        63 => TypeId::U64,
        64..=127 => TypeId::F32,
        _ => TypeId::F64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WS: WordSize = WordSize::Bits64;

    #[test]
    fn test_lattice_widening() {
        assert!(types_are_compatible(TypeId::I16, TypeId::U8, false, WS));
        assert!(!types_are_compatible(TypeId::I16, TypeId::U16, false, WS));
        assert!(types_are_compatible(TypeId::I64, TypeId::U32, false, WS));
        assert!(!types_are_compatible(TypeId::I64, TypeId::U64, false, WS));
        assert!(types_are_compatible(TypeId::F32, TypeId::U64, false, WS));
        assert!(!types_are_compatible(TypeId::F32, TypeId::F64, false, WS));
        assert!(types_are_compatible(TypeId::Int, TypeId::I32, false, WS));
        assert!(types_are_compatible(TypeId::Any, TypeId::Str, false, WS));
        assert!(!types_are_compatible(TypeId::Any, TypeId::Str, true, WS));
    }

    #[test]
    fn test_word_size_changes_int() {
        assert!(types_are_compatible(TypeId::Int, TypeId::I64, false, WordSize::Bits64));
        assert!(!types_are_compatible(TypeId::Int, TypeId::I64, false, WordSize::Bits32));
        assert_eq!(bit_size(TypeId::Uint, WordSize::Bits32), 32);
    }

    #[test]
    fn test_promotion() {
        assert!(type_greater_than(TypeId::I64, TypeId::I8, WS));
        assert!(!type_greater_than(TypeId::I8, TypeId::I64, WS));
        assert!(type_greater_than(TypeId::F32, TypeId::I64, WS));
        assert!(!type_greater_than(TypeId::F32, TypeId::F64, WS));
        assert!(type_greater_than(TypeId::Enum, TypeId::F64, WS));
    }

    #[test]
    fn test_literal_sizing() {
        assert_eq!(int_from_bits(bitsize_int(127)), TypeId::I8);
        assert_eq!(int_from_bits(bitsize_int(-129)), TypeId::I16);
        assert_eq!(int_from_bits(bitsize_int(1 << 40)), TypeId::I64);
        assert_eq!(uint_from_bits(bitsize_uint(70_000)), TypeId::U32);
        assert_eq!(float_from_bits(bitsize_float(1.5)), TypeId::F32);
        assert_eq!(float_from_bits(bitsize_float(1e300)), TypeId::F64);
    }

    #[test]
    fn test_shift_result_thresholds() {
        assert_eq!(shift_result(6), TypeId::I8);
        assert_eq!(shift_result(7), TypeId::U8);
        assert_eq!(shift_result(31), TypeId::U32);
        assert_eq!(shift_result(63), TypeId::U64);
        assert_eq!(shift_result(100), TypeId::F32);
        assert_eq!(shift_result(200), TypeId::F64);
    }
}
