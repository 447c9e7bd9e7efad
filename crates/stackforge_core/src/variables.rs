//! External variables available to the front end while it builds a template.

use std::collections::HashMap;

use crate::value::Value;

/// A key/value source queried by name.
pub trait VariableSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl VariableSource for HashMap<String, serde_json::Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Value::from)
    }
}

impl VariableSource for HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}
