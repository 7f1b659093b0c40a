//! Error types for the module evaluator.
//!
//! Two categories only: [`ErrorKind::User`] for invalid HCL the caller supplied, and
//! [`ErrorKind::Internal`] for failures in this crate's own processing. The driver uses the
//! distinction to decide whether a file is excluded from further work (user errors) or merely
//! logged and otherwise tolerated (internal errors).

use thiserror::Error;

/// Which category a [`ModuleError`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input HCL itself was invalid.
    User,
    /// Something went wrong in this crate's own processing of otherwise-valid input.
    Internal,
}

/// An error encountered while processing a single file.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct ModuleError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ModuleError {
    pub fn user(message: impl Into<String>) -> Self {
        ModuleError {
            kind: ErrorKind::User,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ModuleError {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.kind, ErrorKind::User)
    }
}

/// Errors surfaced while evaluating a single expression.
///
/// Unlike [`ModuleError`], these never abort a file: the evaluator always has a fallback (wrap
/// the source text), so this type exists only so the two evaluation phases can communicate why
/// the native evaluator gave up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("reference to undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("wrong number of arguments to `{0}`")]
    Arity(String),
    #[error("invalid argument to `{0}`: {1}")]
    InvalidArgument(String, String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("no such attribute `{0}`")]
    NoSuchAttribute(String),
    #[error("index out of range")]
    IndexOutOfRange,
    #[error("not a collection")]
    NotIterable,
}
