//! Stack outputs.

use crate::entity::{field_names, field_setters, resolve_alias, Attributes, Entity};
use crate::references::RefKind;
use crate::store::AttributeStore;
use crate::value::{Block, Value};

pub const OUTPUT_FIELDS: &[&str] = &["Value", "Description", "Condition", "Export"];

/// A stack output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output {
    store: AttributeStore,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an output from a value. A map carrying `Value` and/or `Export`
    /// keys is taken apart into those fields; anything else is the value.
    pub fn from_value(value: impl Into<Value>) -> Self {
        let mut output = Self::new();
        let value: Value = value.into();
        match value {
            Value::Object(block)
                if block.get("Value").is_some() || block.get("Export").is_some() =>
            {
                if let Some(value) = block.get("Value") {
                    output.value(value.clone());
                }
                if let Some(export) = block.get("Export") {
                    output.export(export.clone());
                }
            }
            Value::Null => {}
            value => {
                output.value(value);
            }
        }
        output
    }

    field_setters! {
        value => "Value",
        description => "Description",
        condition => "Condition",
    }

    /// Export the output under `name`, stored as `{ Name: name }`.
    pub fn export(&mut self, name: impl Into<Value>) -> &mut Value {
        let name: Value = name.into();
        let export: Block = [("Name", name)].into_iter().collect();
        self.store.put("Export", export.into())
    }

    pub fn field(&mut self, name: &str, value: impl Into<Value>) -> &mut Value {
        match resolve_alias(OUTPUT_FIELDS, name) {
            Some("Export") => self.export(value),
            Some(field) => self.store.set(field, value.into()),
            None => self.store.set(name, value.into()),
        }
    }
}

impl Attributes for Output {
    fn attributes(&self) -> &AttributeStore {
        &self.store
    }

    fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.store
    }
}

impl Entity for Output {
    fn extra_refs(&self, kind: RefKind) -> Vec<String> {
        match kind {
            RefKind::Condition => field_names(self.store.get("Condition")),
            RefKind::All => Vec::new(),
        }
    }

    fn ref_children(&self) -> Vec<&Value> {
        self.store.values().collect()
    }
}
