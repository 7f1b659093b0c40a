//! Body-to-JSON serialization: label folding and duplicate-block promotion.
//!
//! Grounded in the original implementation's `json.go` (`convertBody`, `insertBlock`), which
//! walks a parsed body and folds `resource "T" "N" { ... }` into `{"resource":{"T":{"N":{...}}}}`,
//! promoting a slot to a list the moment a second block claims the same label path.

use hcl::edit::structure::{Block, Body};
use serde_json::{Map, Value as JsonValue};

use crate::hcl::env::Environment;
use crate::hcl::eval;

/// Serializes `body` (parsed from `source`) into a JSON object under `env`.
pub fn serialize_body(body: &Body, source: &str, env: &Environment) -> JsonValue {
    let mut result = Map::new();

    for structure in body.iter() {
        if let Some(attr) = structure.as_attribute() {
            result.insert(
                attr.key.as_str().to_string(),
                eval::eval_to_json(&attr.value, source, env),
            );
        }
    }

    for structure in body.iter() {
        if let Some(block) = structure.as_block() {
            insert_block(&mut result, block, source, env);
        }
    }

    JsonValue::Object(result)
}

fn insert_block(result: &mut Map<String, JsonValue>, block: &Block, source: &str, env: &Environment) {
    let inner = serialize_body(&block.body, source, env);

    let mut path: Vec<String> = vec![block.ident.as_str().to_string()];
    path.extend(block.labels.iter().map(|l| l.as_str().to_string()));

    let (last, parents) = path.split_last().expect("path always has the block type");

    let mut cursor = result;
    for key in parents {
        let slot = cursor
            .entry(key.clone())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !slot.is_object() {
            *slot = JsonValue::Object(Map::new());
        }
        cursor = slot.as_object_mut().expect("just ensured object");
    }

    match cursor.get_mut(last) {
        None => {
            cursor.insert(last.clone(), inner);
        }
        Some(existing @ JsonValue::Object(_)) => {
            let promoted = JsonValue::Array(vec![existing.take(), inner]);
            cursor.insert(last.clone(), promoted);
        }
        Some(JsonValue::Array(list)) => {
            list.push(inner);
        }
        Some(existing) => {
            let promoted = JsonValue::Array(vec![existing.take(), inner]);
            cursor.insert(last.clone(), promoted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcl::edit::parser;
    use std::collections::BTreeMap;

    fn serialize_source(src: &str) -> JsonValue {
        let body = parser::parse_body(src).unwrap();
        let env = Environment::new(BTreeMap::new(), BTreeMap::new());
        serialize_body(&body, src, &env)
    }

    #[test]
    fn duplicate_blocks_promote_to_list() {
        let json = serialize_source("block \"a\" {}\nblock \"a\" {}\n");
        assert_eq!(
            json,
            serde_json::json!({"block": {"a": [{}, {}]}})
        );
    }

    #[test]
    fn labelled_block_nests() {
        let json = serialize_source("block \"x\" \"y\" {\n  nested {}\n}\n");
        assert_eq!(
            json,
            serde_json::json!({"block": {"x": {"y": {"nested": {}}}}})
        );
    }

    #[test]
    fn function_call_simplifies() {
        let json = serialize_source("locals {\n  x = 1 + 2\n  y = pow(2, 3)\n}\n");
        assert_eq!(json, serde_json::json!({"locals": {"x": 3, "y": 8}}));
    }
}
