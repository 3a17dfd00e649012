//! Checker diagnostics and the reporter they are delivered through

use std::fmt;

use thiserror::Error;

use crate::common::Span;
use crate::types::Type;

/// What an unresolved identifier was expected to name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookingFor {
    Variable,
    Function,
}

impl fmt::Display for LookingFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookingFor::Variable => write!(f, "variable"),
            LookingFor::Function => write!(f, "function"),
        }
    }
}

/// A semantic problem found by the checker
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("declaration of '{name}' conflicts with an earlier declaration in the same scope")]
    DeclConflict { name: String, previous: Span },

    #[error("no declaration found for {looking_for} '{name}'")]
    IdentifierNotDeclared { name: String, looking_for: LookingFor },

    #[error("incompatible operands: {left} {op} {right}")]
    IncompatibleOperands { op: String, left: Type, right: Type },

    #[error("incompatible operand: {op} {operand}")]
    IncompatibleOperand { op: String, operand: Type },

    #[error("invalid swizzle '{swizzle}': only x, y, z and w select lanes")]
    InvalidSwizzle { swizzle: String },

    #[error("swizzle '{swizzle}' is out of bound for {base}")]
    SwizzleOutOfBound { swizzle: String, base: Type },

    #[error("swizzle '{swizzle}' selects more than four lanes")]
    OversizedVector { swizzle: String },

    #[error("cannot swizzle '{swizzle}' on non-vector type {base}")]
    InaccessibleSwizzle { swizzle: String, base: Type },

    #[error("[] can only be applied to arrays, found {found}")]
    NotAnArray { found: Type },

    #[error("'{name}' is not a function")]
    NotAFunction { name: String },

    #[error("function '{name}' expects {expected} argument(s) but {given} given")]
    LessFormals { name: String, expected: usize, given: usize },

    #[error("function '{name}' expects {expected} argument(s) but {given} given")]
    ExtraFormals { name: String, expected: usize, given: usize },

    #[error("incompatible argument {}: {actual} given, {expected} expected for '{formal}'", .index + 1)]
    FormalsTypeMismatch { formal: String, index: usize, expected: Type, actual: Type },

    #[error("test expression must be bool, found {found}")]
    TestNotBoolean { found: Type },

    #[error("switch value must be int, found {found}")]
    SwitchNotInteger { found: Type },

    #[error("case label must be an integer constant")]
    NonConstantCaseLabel,

    #[error("duplicate case value {value}")]
    DuplicateCase { value: i64 },

    #[error("multiple default labels in one switch")]
    DuplicateDefault,

    #[error("incompatible return: {found} given, {expected} expected")]
    ReturnMismatch { expected: Type, found: Type },

    #[error("break is only allowed inside a loop or switch")]
    BreakOutsideLoop,

    #[error("continue is only allowed inside a loop")]
    ContinueOutsideLoop,

    #[error("cannot initialize '{name}' of type {declared} with {found}")]
    InvalidInitialization { name: String, declared: Type, found: Type },

    #[error("global '{name}' must be initialized with a constant")]
    NonConstantInitializer { name: String },

    #[error("variable '{name}' cannot have type void")]
    VoidVariable { name: String },

    #[error("left side of {op} is not assignable")]
    NotAnLvalue { op: String },

    #[error("cannot assign to const variable '{name}'")]
    AssignToConst { name: String },

    #[error("array subscript must be int, found {found}")]
    SubscriptNotInteger { found: Type },

    #[error("cannot construct {target} from ({args})")]
    InvalidConstructor { target: Type, args: String },
}

/// A semantic error located in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub error: SemanticError,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(error: SemanticError, span: Span) -> Self {
        Self { error, span }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}: {}", self.span.start, self.span.end, self.error)
    }
}

/// Receiver of checker diagnostics
///
/// Reporting never aborts checking; the checker keeps going so one pass
/// surfaces every problem.
pub trait Reporter {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl Reporter for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Reporter that keeps every diagnostic in order
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl Reporter for DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(span = ?diagnostic.span, error = %diagnostic.error, "diagnostic");
        self.diagnostics.push(diagnostic);
    }
}
