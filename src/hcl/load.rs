//! Parses raw file contents into an HCL AST, keeping the original source around for the
//! evaluator's source-text fallback.

use hcl::edit::parser;
use hcl::edit::structure::Body;

use crate::error::ModuleError;

/// A single successfully-parsed input file.
pub struct File {
    pub name: String,
    pub source: String,
    pub body: Body,
    pub class: super::classify::FileClass,
}

/// Parses one file's contents. On a syntax error, returns a user-facing [`ModuleError`] plus the
/// underlying parser diagnostic to record in the debug log.
pub fn parse_file(name: &str, source: &str) -> Result<File, (ModuleError, String)> {
    match parser::parse_body(source) {
        Ok(body) => {
            tracing::debug!(file = name, "parsed HCL body");
            Ok(File {
                name: name.to_string(),
                source: source.to_string(),
                body,
                class: super::classify::classify(name),
            })
        }
        Err(err) => {
            tracing::warn!(file = name, error = %err, "invalid HCL");
            Err((ModuleError::user("Invalid HCL provided"), err.to_string()))
        }
    }
}
