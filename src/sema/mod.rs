//! Semantic core
//!
//! Resolves type references, instantiates generics, folds constants and
//! type-checks function bodies of one package.
//!
//! - `defs`: merged package definitions
//! - `checker`: per-file worker context and function body driver
//! - `resolver`: syntactic type to canonical `Type`
//! - `generics`: binding stack, arity, inference, instantiation records
//! - `args`: argument/parameter pairing and binding
//! - `solver`: binary operations and constant folding
//! - `assign`: assignability of values into typed slots
//! - `expr`, `stmt`, `flow`: expression, statement and control-flow checks
//! - `package`: phased package driver

pub mod args;
pub mod assign;
pub mod checker;
pub mod defs;
pub mod diagnostic;
pub mod expr;
pub mod flow;
pub mod generics;
pub mod package;
pub mod resolver;
pub mod scope;
pub mod solver;
pub mod stmt;
pub mod value;

pub use checker::{Annotation, Checker};
pub use diagnostic::{DiagKind, Diagnostic, Diagnostics, Severity};
pub use package::{check_package, FileReport, PackageReport, StructInstance};
pub use value::{Const, Value};

use crate::types::WordSize;

/// Knobs of one package check
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Report unused variables, aliases and labels
    pub report_unused: bool,
    /// Nesting limit of the generic instantiation worklist
    pub max_instantiation_depth: usize,
    pub word_size: WordSize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            report_unused: true,
            max_instantiation_depth: 64,
            word_size: WordSize::Bits64,
        }
    }
}
