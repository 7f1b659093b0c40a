//! Local value extraction and bounded fixed-point resolution.
//!
//! Grounded in the original implementation's `locals.go` (block shape) and `hcl2json.go`'s
//! `dereferenceLocals` (iterative resolution against a growing environment).

use std::collections::BTreeMap;

use hcl::edit::expr::Expression;

use crate::hcl::env::Environment;
use crate::hcl::eval;
use crate::hcl::load::File;
use crate::value::Value;

/// A local's unevaluated expression together with the file it came from (for deterministic
/// duplicate-name resolution).
pub struct LocalDef {
    pub filename: String,
    pub expr: Expression,
}

/// Collects every `locals { ... }` attribute across `.tf` files. When the same name is defined
/// in more than one file, the lexicographically last filename wins.
pub fn extract(files: &[File]) -> BTreeMap<String, LocalDef> {
    let mut out: BTreeMap<String, LocalDef> = BTreeMap::new();
    let mut filenames: Vec<&File> = files.iter().collect();
    filenames.sort_by(|a, b| a.name.cmp(&b.name));

    for file in filenames {
        for block in file.body.blocks() {
            if block.ident.as_str() != "locals" {
                continue;
            }
            for attr in block.body.attributes() {
                out.insert(
                    attr.key.as_str().to_string(),
                    LocalDef {
                        filename: file.name.clone(),
                        expr: attr.value.clone(),
                    },
                );
            }
        }
    }
    out
}

/// Iteration bound for the fixed-point resolution below; see module docs.
const MAX_ITERATIONS: usize = 32;

/// Resolves locals to concrete values against `vars`, iterating until a fixed point or
/// [`MAX_ITERATIONS`] rounds. A local that never resolves is simply absent from the result —
/// any expression referencing it degrades to its wrapped source text at serialization time.
pub fn resolve(
    locals: &BTreeMap<String, LocalDef>,
    vars: BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut current: BTreeMap<String, Value> = BTreeMap::new();

    for _ in 0..MAX_ITERATIONS {
        let env = Environment::new(vars.clone(), current.clone());
        let mut next = current.clone();
        let mut changed = false;

        for (name, def) in locals {
            match eval::simplify(&def.expr, &env) {
                Ok(value) if !value.is_unknown() => {
                    if next.get(name) != Some(&value) {
                        changed = true;
                    }
                    next.insert(name.clone(), value);
                }
                _ => {}
            }
        }

        if !changed {
            return next;
        }
        current = next;
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcl::edit::parser;

    fn locals_from_source(name: &str, src: &str) -> BTreeMap<String, LocalDef> {
        let body = parser::parse_body(src).unwrap();
        let mut out = BTreeMap::new();
        for block in body.blocks() {
            if block.ident.as_str() != "locals" {
                continue;
            }
            for attr in block.body.attributes() {
                out.insert(
                    attr.key.as_str().to_string(),
                    LocalDef {
                        filename: name.to_string(),
                        expr: attr.value.clone(),
                    },
                );
            }
        }
        out
    }

    #[test]
    fn resolves_chain_within_bound() {
        let mut src = String::from("locals {\n  d1 = 1\n");
        for i in 2..=40 {
            src.push_str(&format!("  d{i} = local.d{prev} + 1\n", prev = i - 1));
        }
        src.push_str("}\n");
        let locals = locals_from_source("main.tf", &src);
        let resolved = resolve(&locals, BTreeMap::new());

        assert_eq!(resolved.get("d1").and_then(Value::as_f64), Some(1.0));
        assert_eq!(resolved.get("d32").and_then(Value::as_f64), Some(32.0));
        assert!(!resolved.contains_key("d33"));
    }

    #[test]
    fn cyclic_local_never_resolves() {
        let locals = locals_from_source("main.tf", "locals {\n  a = a + 1\n}\n");
        let resolved = resolve(&locals, BTreeMap::new());
        assert!(!resolved.contains_key("a"));
    }
}
