//! Semantic diagnostics
//!
//! Semantic problems never abort analysis. Each check records a `Diagnostic`
//! and continues with a sentinel value.

use serde::Serialize;
use thiserror::Error;

use crate::utils::{LineIndex, Span};

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Info,
}

/// Message catalogue. `Display` renders the human text, `key()` the stable key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagKind {
    // ==================== Resolution ====================

    #[error("identifier is not exist: {0}")]
    IdNotExist(String),

    #[error("identifier is already exist: {0}")]
    ExistId(String),

    #[error("invalid data-type")]
    InvalidType,

    #[error("invalid data-type source")]
    InvalidTypeSource,

    #[error("illegal cycle in declaration of {0}")]
    IllegalCycle(String),

    #[error("enums are not supports as generic types")]
    EnumNotSupportsAsGeneric,

    #[error("generics is not supports by define")]
    GenericsNotSupports,

    #[error("define requires generics")]
    HasGenerics,

    #[error("overflow generics")]
    GenericsOverflow,

    #[error("missing generics")]
    MissingGenerics,

    #[error("dynamic generic type annotation failed")]
    DynamicGenericAnnotationFailed,

    #[error("generic {name} inferred as {first}, ignoring {second}")]
    GenericInferenceConflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("instantiation of {0} exceeds the nesting limit")]
    InstantiationLimit(String),

    // ==================== Constants and operators ====================

    #[error("expressions is not constant expression")]
    ExprNotConst,

    #[error("overflow the limit of data-type")]
    OverflowLimits,

    #[error("divide by zero")]
    DivideByZero,

    #[error("{op} operator is not defined for {ty} type")]
    OperatorNotForType { op: String, ty: String },

    #[error("{0} operator is not defined for float type(s)")]
    OperatorNotForFloat(String),

    #[error("{0} operator is not defined for integer type(s)")]
    OperatorNotForInt(String),

    #[error("{0} operator is not defined for unsigned integer type(s)")]
    OperatorNotForUint(String),

    #[error("bit shifting value is must be unsigned")]
    BitshiftMustUnsigned,

    #[error("logical expression is have only boolean type values")]
    LogicalNotBool,

    #[error("invalid data-type for unary {0} operator")]
    InvalidTypeUnaryOperator(String),

    #[error("{0} data-type not supports casting to {1} data-type")]
    TypeNotSupportsCastingTo(String, String),

    // ==================== Compatibility ====================

    #[error("{0} and {1} data-types are not compatible")]
    IncompatibleTypes(String, String),

    #[error("trait {0} has reference receiver methods, value must be a reference")]
    TraitHasReferenceParameteredFunction(String),

    // ==================== Binding ====================

    #[error("argument overflow")]
    ArgumentOverflow,

    #[error("missing expression for {0}")]
    MissingExprFor(String),

    #[error("variadic argument can't use with more argument")]
    MoreArgsWithVariadiced,

    #[error("argument must target to parameter")]
    ArgumentMustTargetToParameter,

    #[error("{0} already has expression")]
    AlreadyHasExpr(String),

    #[error("reference field must be initialized: {0}")]
    ReferenceFieldNotInitialized(String),

    #[error("methods cannot be used as anonymous function")]
    MethodAsAnonymousFn,

    #[error("generic functions cannot be used as anonymous function")]
    GenericedFnAsAnonymousFn,

    #[error("parameter {0} must have a default argument")]
    ParamMustHaveDefaultArg(String),

    #[error("variadic parameter can only be last parameter")]
    VariadicParameterNotLast,

    #[error("variadic spread is only valid as a call argument")]
    VariadicWithNonVariadicable,

    // ==================== Assignment and declarations ====================

    #[error("non-mutable value cannot be assigned to a mutable slot")]
    AssignmentNonMutToMut,

    #[error("lvalue required assignment")]
    AssignRequireLvalue,

    #[error("constants is can't assign")]
    AssignConst,

    #[error("value is not mutable")]
    AssignmentToNonMut,

    #[error("type is not support assignment")]
    AssignTypeNotSupportValue,

    #[error("overflow multi assignment identifers")]
    OverflowMultiAssignIdentifiers,

    #[error("missing identifier(s) for multiple assignment")]
    MissingMultiAssignIdentifiers,

    #[error("nil is cannot use with auto-type definitions")]
    NilForAutotype,

    #[error("void data is cannot use for auto-type definitions")]
    VoidForAutotype,

    #[error("auto-type declarations should have a initializer")]
    MissingAutotypeValue,

    #[error("constants must have value specification")]
    MissingConstValue,

    #[error("{0} declared but not used")]
    DeclaredButNotUsed(String),

    // ==================== Expressions ====================

    #[error("{0} data type is not support indexing")]
    NotSupportsIndexing(String),

    #[error("object is not have sub field in this identifier: {0}")]
    ObjHaveNotId(String),

    #[error("value is not function")]
    NotFunctionCall,

    #[error("unsafe behavior at out of unsafe scope")]
    UnsafeBehaviorAtOutOfUnsafeScope,

    // ==================== Control flow ====================

    #[error("if conditions must be have boolean expression")]
    IfRequireBoolExpr,

    #[error("while iterations must be have boolean expression")]
    IterWhileRequireBoolExpr,

    #[error("foreach iterations must be have enumerable expression")]
    IterForeachRequireEnumerableExpr,

    #[error("foreach variables can be maximum two")]
    MuchForeachVars,

    #[error("return statements of non-void functions should have return value")]
    RequireReturnValue,

    #[error("void functions is cannot returns any value")]
    VoidFunctionReturnValue,

    #[error("overflow return expressions")]
    OverflowReturn,

    #[error("missing return values for multi return")]
    MissingMultiReturn,

    #[error("mutable typed return value must be mutable")]
    RetWithMutTypedNonMut,

    #[error("missing return at end of function")]
    MissingRet,

    #[error("label is already exist in this identifier: {0}")]
    LabelExist(String),

    #[error("not exist any label in this identifier: {0}")]
    LabelNotExist(String),

    #[error("goto {0} jumps over declaration(s)")]
    GotoJumpsDeclarations(String),

    #[error("break keyword is cannot used at out of valid scope")]
    BreakAtOutOfValidScope,

    #[error("continue keyword is cannot used at out of iter block")]
    ContinueAtOutOfValidScope,

    #[error("invalid label")]
    InvalidLabel,

    #[error("fallthrough keyword can only useable at end of the case scopes")]
    FallthroughWrongUse,

    #[error("fallthrough cannot useable at final case")]
    FallthroughIntoFinalCase,

    // ==================== Traits ====================

    #[error("not implemented {0} trait's {1} define")]
    NotImplTraitDef(String, String),

    #[error("{0} trait is not have this identifier: {1}")]
    TraitHasntId(String, String),
}

impl DiagKind {
    /// Stable snake_case message key
    pub fn key(&self) -> &'static str {
        match self {
            DiagKind::IdNotExist(_) => "id_not_exist",
            DiagKind::ExistId(_) => "exist_id",
            DiagKind::InvalidType => "invalid_type",
            DiagKind::InvalidTypeSource => "invalid_type_source",
            DiagKind::IllegalCycle(_) => "illegal_cycle_in_declaration",
            DiagKind::EnumNotSupportsAsGeneric => "enum_not_supports_as_generic",
            DiagKind::GenericsNotSupports => "generics_not_supports",
            DiagKind::HasGenerics => "has_generics",
            DiagKind::GenericsOverflow => "generics_overflow",
            DiagKind::MissingGenerics => "missing_generics",
            DiagKind::DynamicGenericAnnotationFailed => "dynamic_generic_annotation_failed",
            DiagKind::GenericInferenceConflict { .. } => "generic_inference_conflict",
            DiagKind::InstantiationLimit(_) => "instantiation_limit",
            DiagKind::ExprNotConst => "expr_not_const",
            DiagKind::OverflowLimits => "overflow_limits",
            DiagKind::DivideByZero => "divide_by_zero",
            DiagKind::OperatorNotForType { .. } => "operator_not_for_janetype",
            DiagKind::OperatorNotForFloat(_) => "operator_not_for_float",
            DiagKind::OperatorNotForInt(_) => "operator_not_for_int",
            DiagKind::OperatorNotForUint(_) => "operator_not_for_uint",
            DiagKind::BitshiftMustUnsigned => "bitshift_must_unsigned",
            DiagKind::LogicalNotBool => "logical_not_bool",
            DiagKind::InvalidTypeUnaryOperator(_) => "invalid_type_unary_operator",
            DiagKind::TypeNotSupportsCastingTo(..) => "type_not_supports_casting_to",
            DiagKind::IncompatibleTypes(..) => "incompatible_types",
            DiagKind::TraitHasReferenceParameteredFunction(_) => {
                "trait_has_reference_parametered_function"
            }
            DiagKind::ArgumentOverflow => "argument_overflow",
            DiagKind::MissingExprFor(_) => "missing_expr_for",
            DiagKind::MoreArgsWithVariadiced => "more_args_with_variadiced",
            DiagKind::ArgumentMustTargetToParameter => "argument_must_target_to_parameter",
            DiagKind::AlreadyHasExpr(_) => "already_has_expr",
            DiagKind::ReferenceFieldNotInitialized(_) => "reference_field_not_initialized",
            DiagKind::MethodAsAnonymousFn => "method_as_anonymous_fn",
            DiagKind::GenericedFnAsAnonymousFn => "genericed_fn_as_anonymous_fn",
            DiagKind::ParamMustHaveDefaultArg(_) => "param_must_have_default_arg",
            DiagKind::VariadicParameterNotLast => "variadic_parameter_not_last",
            DiagKind::VariadicWithNonVariadicable => "variadic_with_non_variadicable",
            DiagKind::AssignmentNonMutToMut => "assignment_non_mut_to_mut",
            DiagKind::AssignRequireLvalue => "assign_require_lvalue",
            DiagKind::AssignConst => "assign_const",
            DiagKind::AssignmentToNonMut => "assignment_to_non_mut",
            DiagKind::AssignTypeNotSupportValue => "assign_type_not_support_value",
            DiagKind::OverflowMultiAssignIdentifiers => "overflow_multi_assign_identifiers",
            DiagKind::MissingMultiAssignIdentifiers => "missing_multi_assign_identifiers",
            DiagKind::NilForAutotype => "nil_for_autotype",
            DiagKind::VoidForAutotype => "void_for_autotype",
            DiagKind::MissingAutotypeValue => "missing_autotype_value",
            DiagKind::MissingConstValue => "missing_const_value",
            DiagKind::DeclaredButNotUsed(_) => "declared_but_not_used",
            DiagKind::NotSupportsIndexing(_) => "not_supports_indexing",
            DiagKind::ObjHaveNotId(_) => "obj_have_not_id",
            DiagKind::NotFunctionCall => "not_function_call",
            DiagKind::UnsafeBehaviorAtOutOfUnsafeScope => "unsafe_behavior_at_out_of_unsafe_scope",
            DiagKind::IfRequireBoolExpr => "if_require_bool_expr",
            DiagKind::IterWhileRequireBoolExpr => "iter_while_require_bool_expr",
            DiagKind::IterForeachRequireEnumerableExpr => "iter_foreach_require_enumerable_expr",
            DiagKind::MuchForeachVars => "much_foreach_vars",
            DiagKind::RequireReturnValue => "require_return_value",
            DiagKind::VoidFunctionReturnValue => "void_function_return_value",
            DiagKind::OverflowReturn => "overflow_return",
            DiagKind::MissingMultiReturn => "missing_multi_return",
            DiagKind::RetWithMutTypedNonMut => "ret_with_mut_typed_non_mut",
            DiagKind::MissingRet => "missing_ret",
            DiagKind::LabelExist(_) => "label_exist",
            DiagKind::LabelNotExist(_) => "label_not_exist",
            DiagKind::GotoJumpsDeclarations(_) => "goto_jumps_declarations",
            DiagKind::BreakAtOutOfValidScope => "break_at_out_of_valid_scope",
            DiagKind::ContinueAtOutOfValidScope => "continue_at_out_of_valid_scope",
            DiagKind::InvalidLabel => "invalid_label",
            DiagKind::FallthroughWrongUse => "fallthrough_wrong_use",
            DiagKind::FallthroughIntoFinalCase => "fallthrough_into_final_case",
            DiagKind::NotImplTraitDef(..) => "not_impl_trait_def",
            DiagKind::TraitHasntId(..) => "trait_hasnt_id",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagKind::GenericInferenceConflict { .. } => Severity::Info,
            _ => Severity::Error,
        }
    }
}

/// A reported semantic problem
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(kind: DiagKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn key(&self) -> &'static str {
        self.kind.key()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn position(&self, path: &str, lines: &LineIndex) -> Position {
        let (row, column) = lines.position(self.span.start);
        Position {
            path: path.to_string(),
            row,
            column,
        }
    }

    /// `path:row:column message`
    pub fn render(&self, path: &str, lines: &LineIndex) -> String {
        let (row, column) = lines.position(self.span.start);
        format!("{}:{}:{} {}", path, row, column, self.kind)
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Diagnostic", 4)?;
        s.serialize_field("key", self.key())?;
        s.serialize_field("severity", &self.severity())?;
        s.serialize_field("message", &self.kind.to_string())?;
        s.serialize_field("span", &self.span)?;
        s.end()
    }
}

/// Resolved source position of a diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub path: String,
    pub row: usize,
    pub column: usize,
}

/// Per-worker diagnostic sink
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagKind, span: Span) {
        log::trace!("diagnostic {} at {:?}", kind.key(), span);
        self.items.push(Diagnostic::new(kind, span));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Drops everything pushed after `len`
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keys_and_messages() {
        let kind = DiagKind::IncompatibleTypes("int".into(), "str".into());
        assert_eq!(kind.key(), "incompatible_types");
        assert_eq!(kind.to_string(), "int and str data-types are not compatible");
        assert_eq!(DiagKind::DivideByZero.key(), "divide_by_zero");
        assert_eq!(DiagKind::MissingRet.severity(), Severity::Error);
        let info = DiagKind::GenericInferenceConflict {
            name: "T".into(),
            first: "int".into(),
            second: "str".into(),
        };
        assert_eq!(info.severity(), Severity::Info);
    }

    #[test]
    fn test_render_position() {
        let src = "fn main() {\n    x\n}";
        let lines = LineIndex::new(src);
        let diag = Diagnostic::new(DiagKind::IdNotExist("x".into()), Span::new(16, 17, 0));
        assert_eq!(diag.render("main.jn", &lines), "main.jn:2:5 identifier is not exist: x");
        assert_eq!(diag.position("main.jn", &lines).column, 5);
    }

    #[test]
    fn test_serialized_fields() {
        let diag = Diagnostic::new(DiagKind::MissingRet, Span::new(3, 4, 1));
        let value = serde_json::to_value(&diag).unwrap();
        assert_eq!(value["key"], "missing_ret");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["span"]["file_id"], 1);
    }

    #[test]
    fn test_sink_tracks_errors() {
        let mut sink = Diagnostics::new();
        sink.push(
            DiagKind::GenericInferenceConflict {
                name: "T".into(),
                first: "int".into(),
                second: "str".into(),
            },
            Span::dummy(),
        );
        assert!(!sink.has_errors());
        sink.push(DiagKind::MissingRet, Span::dummy());
        assert!(sink.has_errors());
        assert_eq!(sink.len(), 2);
    }
}
