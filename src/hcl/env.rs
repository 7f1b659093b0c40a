//! The evaluation environment: top-level identifiers an expression can reference directly.
//!
//! Normally this holds exactly two entries, `var` and `local`, but `for`-expressions and
//! `%{for}` template directives introduce additional scoped bindings (loop key/value variables)
//! for the duration of their body — [`Environment::set`] models that by mutating a cloned copy.

use std::collections::BTreeMap;

use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new(vars: BTreeMap<String, Value>, locals: BTreeMap<String, Value>) -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert("var".to_string(), Value::Object(vars.into_iter().collect()));
        bindings.insert(
            "local".to_string(),
            Value::Object(locals.into_iter().collect()),
        );
        Environment { bindings }
    }

    pub fn empty() -> Self {
        Environment::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }
}
