//! Input parameters.

use crate::entity::{field_setters, resolve_alias, Attributes, Entity};
use crate::store::AttributeStore;
use crate::value::Value;

/// Known parameter fields, in their canonical spelling.
pub const PARAMETER_FIELDS: &[&str] = &[
    "Type",
    "Default",
    "NoEcho",
    "AllowedValues",
    "AllowedPattern",
    "MaxLength",
    "MinLength",
    "MaxValue",
    "MinValue",
    "Description",
    "ConstraintDescription",
];

/// A template input parameter. New parameters are of type `String`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    store: AttributeStore,
}

impl Default for Parameter {
    fn default() -> Self {
        let mut store = AttributeStore::new();
        store.set("Type", Value::from("String"));
        Self { store }
    }
}

impl Parameter {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    field_setters! {
        /// Set the parameter type, replacing the `String` default.
        set_type => "Type",
        default => "Default",
        no_echo => "NoEcho",
        allowed_values => "AllowedValues",
        allowed_pattern => "AllowedPattern",
        max_length => "MaxLength",
        min_length => "MinLength",
        max_value => "MaxValue",
        min_value => "MinValue",
        description => "Description",
        constraint_description => "ConstraintDescription",
    }

    pub fn parameter_type(&self) -> Option<&str> {
        self.store.get("Type").and_then(Value::as_str)
    }

    pub fn string(&mut self) -> &mut Value {
        self.store.put("Type", Value::from("String"))
    }

    pub fn number(&mut self) -> &mut Value {
        self.store.put("Type", Value::from("Number"))
    }

    pub fn comma_delimited_list(&mut self) -> &mut Value {
        self.store.put("Type", Value::from("CommaDelimitedList"))
    }

    /// Set a field by name, accepting lower-case spellings of known fields.
    pub fn field(&mut self, name: &str, value: impl Into<Value>) -> &mut Value {
        let field = resolve_alias(PARAMETER_FIELDS, name).unwrap_or(name);
        self.store.set(field, value.into())
    }
}

impl Attributes for Parameter {
    fn attributes(&self) -> &AttributeStore {
        &self.store
    }

    fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.store
    }
}

impl Entity for Parameter {
    fn ref_children(&self) -> Vec<&Value> {
        self.store.values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_type_is_string() {
        let parameter = Parameter::new();
        assert_eq!(parameter.parameter_type(), Some("String"));
    }

    #[test]
    fn test_type_conveniences_do_not_warn() {
        let mut parameter = Parameter::new();
        parameter.number();
        assert_eq!(parameter.parameter_type(), Some("Number"));
        parameter.comma_delimited_list();
        assert_eq!(parameter.parameter_type(), Some("CommaDelimitedList"));
        assert!(parameter.attributes().replaced().is_empty());
    }

    #[test]
    fn test_set_type_replaces_default() {
        let mut parameter = Parameter::new();
        parameter.set_type("AWS::EC2::KeyPair::KeyName");
        assert_eq!(parameter.attributes().replaced(), ["Type"]);
    }

    #[test]
    fn test_field_order_follows_first_set() {
        let mut parameter = Parameter::new();
        parameter.description("Instance size");
        parameter.field("default", "t3.micro");
        parameter.allowed_values(vec!["t3.micro", "t3.large"]);
        let keys: Vec<_> = parameter.attributes().keys().collect();
        assert_eq!(keys, vec!["Type", "Description", "Default", "AllowedValues"]);
    }
}
