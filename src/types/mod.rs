//! Type system
//!
//! - `model`: canonical resolved types and their identity key
//! - `bits`: primitive numeric lattice, promotion and literal sizing
//! - `compat`: structural compatibility between two resolved types

pub mod bits;
pub mod compat;
pub mod model;

pub use bits::WordSize;
pub use compat::{CompatChecker, Compatibility};
pub use model::*;

/// Definition lookups the compatibility rules and the solver depend on
pub trait Definitions {
    /// Struct registered an implementation of the trait
    fn implements(&self, def: StructId, tr: TraitId) -> bool;

    /// Trait declares at least one `&self` method
    fn has_ref_receiver(&self, tr: TraitId) -> bool;

    /// Underlying type of an enum
    fn enum_base(&self, def: EnumId) -> Type;
}
