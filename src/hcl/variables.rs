//! Input variable extraction and precedence-ordered merging.
//!
//! Grounded in the original implementation's `variables.go` (`extractInputsFromTfFile`,
//! `extractInputsFromTfvarsFile`, `mergeInputs`).

use std::collections::BTreeMap;

use crate::hcl::classify::{order_by_precedence, FileClass};
use crate::hcl::env::Environment;
use crate::hcl::eval;
use crate::hcl::load::File;
use crate::value::Value;

/// Extracts this file's contribution to the input-variable namespace.
///
/// For `.tf` files, only `variable "name" { default = ... }` blocks are read. For tfvars files,
/// every top-level attribute is a variable assignment.
pub fn extract(file: &File) -> BTreeMap<String, Value> {
    match file.class {
        FileClass::Tf => extract_from_config(file),
        FileClass::EnvVar | FileClass::DefaultTfvars | FileClass::AutoTfvars => {
            extract_from_tfvars(file)
        }
        FileClass::Irrelevant => BTreeMap::new(),
    }
}

fn extract_from_config(file: &File) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    let env = Environment::empty();
    for block in file.body.blocks() {
        if block.ident.as_str() != "variable" {
            continue;
        }
        let Some(name) = block.labels.first().map(|l| l.as_str().to_string()) else {
            continue;
        };
        let Some(default_attr) = block.body.get_attribute("default") else {
            continue;
        };
        match eval::simplify(&default_attr.value, &env) {
            Ok(value) if !value.is_null() => {
                out.insert(name, value);
            }
            _ => tracing::debug!(file = %file.name, variable = %name, "default unresolved, omitted"),
        }
    }
    out
}

fn extract_from_tfvars(file: &File) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    let env = Environment::empty();
    for attr in file.body.attributes() {
        let name = attr.key.as_str().to_string();
        match eval::simplify(&attr.value, &env) {
            Ok(value) => {
                out.insert(name, value);
            }
            Err(e) => tracing::debug!(file = %file.name, var = %name, error = %e, "tfvars entry unresolved, omitted"),
        }
    }
    out
}

/// Merges per-file variable maps into a single namespace, applying Terraform's documented
/// precedence order (§4.5).
pub fn merge(per_file: &BTreeMap<String, BTreeMap<String, Value>>) -> BTreeMap<String, Value> {
    let filenames: Vec<String> = per_file.keys().cloned().collect();
    let mut sorted = filenames.clone();
    sorted.sort();
    let ordered = order_by_precedence(&sorted);

    let mut result = BTreeMap::new();
    for filename in ordered {
        if let Some(values) = per_file.get(&filename) {
            for (k, v) in values {
                result.insert(k.clone(), v.clone());
            }
        }
    }
    result
}
