//! Orchestrates the full pipeline: load, extract, merge, resolve, serialize.
//!
//! Grounded in the original implementation's `interpreter.go` (`ParseModule`), which walks these
//! same phases over an in-memory file map and accumulates `parsedFiles`/`failedFiles`/`debugLogs`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ModuleError;
use crate::hcl::classify::FileClass;
use crate::hcl::env::Environment;
use crate::hcl::load::{self, File};
use crate::hcl::locals::{self, LocalDef};
use crate::hcl::serialize::serialize_body;
use crate::hcl::variables;
use crate::value::Value;

/// The result of evaluating a whole module's worth of files.
#[derive(Debug, Default, Serialize)]
pub struct ModuleResult {
    pub parsed_files: BTreeMap<String, String>,
    pub failed_files: BTreeMap<String, String>,
    /// Filename -> multi-line diagnostic string. Present for `f` iff at least one error (user or
    /// internal) was observed while processing `f`; later diagnostics for the same file are
    /// appended as additional lines.
    pub debug_logs: BTreeMap<String, String>,
}

impl ModuleResult {
    fn log(&mut self, filename: &str, message: impl AsRef<str>) {
        self.debug_logs
            .entry(filename.to_string())
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(message.as_ref());
            })
            .or_insert_with(|| message.as_ref().to_string());
    }
}

/// Runs the full pipeline over `files` (filename -> raw HCL source).
pub fn parse_module(files: &BTreeMap<String, String>) -> ModuleResult {
    let mut result = ModuleResult::default();

    let mut loaded: Vec<File> = Vec::new();
    for (name, source) in files {
        match load::parse_file(name, source) {
            Ok(file) => loaded.push(file),
            Err((err, diagnostic)) => {
                result.log(name, format!("{err}: {diagnostic}"));
                result.failed_files.insert(name.clone(), err.to_string());
            }
        }
    }

    let mut per_file_vars: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for file in &loaded {
        per_file_vars.insert(file.name.clone(), variables::extract(file));
    }
    let inputs = variables::merge(&per_file_vars);

    let local_defs: BTreeMap<String, LocalDef> = locals::extract(&loaded);
    let locals = locals::resolve(&local_defs, inputs.clone());

    let env = Environment::new(inputs, locals);

    for file in &loaded {
        if file.class != FileClass::Tf {
            continue;
        }
        let json = serialize_body(&file.body, &file.source, &env);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        match serde::Serialize::serialize(&json, &mut serializer) {
            Ok(()) => {
                result
                    .parsed_files
                    .insert(file.name.clone(), String::from_utf8(buf).expect("JSON is valid UTF-8"));
            }
            Err(e) => {
                result.log(&file.name, format!("internal serialization error: {e}"));
            }
        }
    }

    result
}

/// Convenience wrapper matching the library's external error taxonomy, for callers that want a
/// single `Result` rather than inspecting `failed_files`.
pub fn parse_module_strict(files: &BTreeMap<String, String>) -> Result<ModuleResult, ModuleError> {
    let result = parse_module(files);
    if result.failed_files.is_empty() {
        Ok(result)
    } else {
        let names: Vec<&str> = result.failed_files.keys().map(String::as_str).collect();
        Err(ModuleError::user(format!(
            "module contains invalid files: {}",
            names.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_and_serializes_a_simple_module() {
        let mut files = BTreeMap::new();
        files.insert(
            "main.tf".to_string(),
            "locals {\n  greeting = \"hi ${var.name}\"\n}\n\nresource \"null_resource\" \"x\" {\n  triggers = {\n    g = local.greeting\n  }\n}\n"
                .to_string(),
        );
        files.insert("terraform.tfvars".to_string(), "name = \"world\"\n".to_string());

        let result = parse_module(&files);
        assert!(result.failed_files.is_empty());
        let parsed: serde_json::Value =
            serde_json::from_str(&result.parsed_files["main.tf"]).unwrap();
        assert_eq!(
            parsed["resource"]["null_resource"]["x"]["triggers"]["g"],
            "hi world"
        );
    }

    #[test]
    fn invalid_hcl_lands_in_failed_files() {
        let mut files = BTreeMap::new();
        files.insert("broken.tf".to_string(), "resource \"a\" {\n".to_string());
        let result = parse_module(&files);
        assert!(result.failed_files.contains_key("broken.tf"));
        assert!(!result.parsed_files.contains_key("broken.tf"));
    }
}
