//! Ordered attribute storage shared by every entity.
//!
//! Setters double as getters: passing `None` reads the current value, passing
//! a value stores it. Replacing a non-null value is allowed but logged, and
//! the store keeps a record of every name that was replaced.

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{DslError, DslResult};
use crate::expr::Expr;
use crate::value::{Block, Value};

/// Insertion-ordered map of attribute name to value.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    entries: IndexMap<String, Value>,
    replaced: Vec<String>,
}

impl PartialEq for AttributeStore {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names whose non-null value was overwritten, in the order it happened.
    pub fn replaced(&self) -> &[String] {
        &self.replaced
    }

    /// Store a value, keeping the original position of an existing key.
    pub fn set(&mut self, name: &str, value: Value) -> &mut Value {
        if self.entries.get(name).is_some_and(|v| !v.is_null()) {
            warn!("Replacing previously defined value for {}", name);
            self.replaced.push(name.to_string());
        }
        self.put(name, value)
    }

    /// Store a value without the replacement check. Used by fields that merge
    /// their previous value into the new one.
    pub(crate) fn put(&mut self, name: &str, value: Value) -> &mut Value {
        let (index, _) = self.entries.insert_full(name.to_string(), value);
        &mut self.entries[index]
    }

    /// Get-or-set a plain attribute.
    pub fn attribute(&mut self, name: &str, value: Option<Value>) -> Option<&mut Value> {
        match value {
            Some(value) => Some(self.set(name, value)),
            None => self.entries.get_mut(name),
        }
    }

    /// Get-or-set an attribute that has a default instance.
    ///
    /// With no value and nothing stored yet, `default` is constructed and stored.
    pub fn attribute_or<F>(&mut self, name: &str, value: Option<Value>, default: F) -> &mut Value
    where
        F: FnOnce() -> Value,
    {
        match value {
            Some(value) => self.set(name, value),
            None => self.entries.entry(name.to_string()).or_insert_with(default),
        }
    }

    /// Get-or-set a list attribute. An unset list reads as empty.
    pub fn list_attribute(&mut self, name: &str, value: Option<Vec<Value>>) -> &mut Value {
        match value {
            Some(items) => self.set(name, Value::List(items)),
            None => self
                .entries
                .entry(name.to_string())
                .or_insert_with(|| Value::List(Vec::new())),
        }
    }

    /// Append to a list attribute, creating it when absent.
    ///
    /// A list item is appended element by element. With a condition name the
    /// item is wrapped in `Fn::If` so it only appears when the condition
    /// holds; a leading `!` inverts the branch.
    pub fn push_attribute(
        &mut self,
        name: &str,
        item: Value,
        condition: Option<&str>,
    ) -> DslResult<&mut Vec<Value>> {
        match self.list_attribute(name, None) {
            Value::List(list) => {
                push_flattened(list, item, condition);
                Ok(list)
            }
            _ => Err(DslError::NotAList(name.to_string())),
        }
    }

    /// The nested content map stored under `section`, created on first use.
    pub fn content(&mut self, section: &str) -> DslResult<&mut Block> {
        let slot = self
            .entries
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Block::new()));
        if slot.is_null() {
            *slot = Value::Object(Block::new());
        }
        slot.as_block_mut()
            .ok_or_else(|| DslError::NotAMap(section.to_string()))
    }

    /// Get-or-set an entry of a nested content map.
    pub fn content_attribute(
        &mut self,
        section: &str,
        entry: &str,
        value: Option<Value>,
    ) -> DslResult<Option<&mut Value>> {
        Ok(self.content(section)?.attributes_mut().attribute(entry, value))
    }

    /// Get-or-create `name` and populate it with a nested builder.
    pub fn declare<F>(
        &mut self,
        name: &str,
        value: Option<Value>,
        build: F,
    ) -> DslResult<&mut Value>
    where
        F: FnOnce(&mut Block) -> DslResult<()>,
    {
        let target = self.attribute_or(name, value, || Value::Object(Block::new()));
        match target.as_block_mut() {
            Some(block) => build(block)?,
            None => return Err(DslError::NotDeclarable(name.to_string())),
        }
        Ok(target)
    }
}

fn push_flattened(list: &mut Vec<Value>, item: Value, condition: Option<&str>) {
    match item {
        Value::List(items) => {
            for item in items {
                push_flattened(list, item, condition);
            }
        }
        item => list.push(conditional(item, condition)),
    }
}

/// Wrap `item` so it is only present when `condition` holds.
pub(crate) fn conditional(item: Value, condition: Option<&str>) -> Value {
    let Some(condition) = condition else {
        return item;
    };
    match condition.strip_prefix('!') {
        Some(negated) => Expr::if_(negated, Expr::no_value(), item).into(),
        None => Expr::if_(condition, item, Expr::no_value()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_get_or_set() {
        let mut store = AttributeStore::new();
        assert!(store.attribute("Description", None).is_none());

        store.attribute("Description", Some("first".into()));
        let value = store.attribute("Description", Some("second".into())).unwrap();
        assert_eq!(value, &Value::from("second"));
        assert_eq!(store.replaced(), ["Description"]);
    }

    #[test]
    fn test_replacing_null_is_silent() {
        let mut store = AttributeStore::new();
        store.set("Condition", Value::Null);
        store.set("Condition", "IsProd".into());
        assert!(store.replaced().is_empty());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = AttributeStore::new();
        store.set("A", 1.into());
        store.set("B", 2.into());
        store.set("A", 3.into());
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_attribute_or_builds_default_once() {
        let mut store = AttributeStore::new();
        store.attribute_or("Metadata", None, || Value::Object(Block::new()));
        store
            .get_mut("Metadata")
            .and_then(Value::as_block_mut)
            .unwrap()
            .set("Key", "v");
        let again = store.attribute_or("Metadata", None, || Value::Object(Block::new()));
        assert_eq!(again.as_block().unwrap().len(), 1);
    }

    #[test]
    fn test_list_attribute_defaults_empty() {
        let mut store = AttributeStore::new();
        assert_eq!(store.list_attribute("Transform", None), &Value::List(vec![]));
        store.list_attribute("Transform", Some(vec!["AWS::Serverless-2016-10-31".into()]));
        assert_eq!(store.list_attribute("Transform", None).as_list().unwrap().len(), 1);
        store.list_attribute("Transform", Some(vec![]));
        assert_eq!(store.list_attribute("Transform", None), &Value::List(vec![]));
    }

    #[test]
    fn test_push_flattens_lists() {
        let mut store = AttributeStore::new();
        store.push_attribute("Tags", "a".into(), None).unwrap();
        let nested = Value::from(vec![Value::from("b"), Value::from(vec!["c"])]);
        let list = store.push_attribute("Tags", nested, None).unwrap();
        assert_eq!(list, &vec![Value::from("a"), Value::from("b"), Value::from("c")]);
    }

    #[test]
    fn test_push_onto_scalar_fails() {
        let mut store = AttributeStore::new();
        store.set("Tags", "scalar".into());
        let err = store.push_attribute("Tags", "a".into(), None).unwrap_err();
        assert!(matches!(err, DslError::NotAList(name) if name == "Tags"));
    }

    #[test]
    fn test_push_with_condition() {
        let mut store = AttributeStore::new();
        store.push_attribute("Items", "x".into(), Some("IsProd")).unwrap();
        let list = store.push_attribute("Items", "y".into(), Some("!IsProd")).unwrap();

        assert_eq!(list[0], Value::from(Expr::if_("IsProd", "x", Expr::no_value())));
        assert_eq!(list[1], Value::from(Expr::if_("IsProd", Expr::no_value(), "y")));
    }

    #[test]
    fn test_content_attribute_vivifies_map() {
        let mut store = AttributeStore::new();
        assert!(store.content_attribute("Properties", "ImageId", None).unwrap().is_none());
        store
            .content_attribute("Properties", "ImageId", Some("ami-123".into()))
            .unwrap();
        let properties = store.get("Properties").and_then(Value::as_block).unwrap();
        assert_eq!(properties.get("ImageId"), Some(&Value::from("ami-123")));
    }

    #[test]
    fn test_content_attribute_on_scalar_fails() {
        let mut store = AttributeStore::new();
        store.set("Properties", "oops".into());
        assert!(store.content_attribute("Properties", "A", None).is_err());
    }

    #[test]
    fn test_declare_rejects_scalar() {
        let mut store = AttributeStore::new();
        store.set("Name", "x".into());
        let err = store.declare("Name", None, |_| Ok(())).unwrap_err();
        assert!(matches!(err, DslError::NotDeclarable(_)));
    }
}
