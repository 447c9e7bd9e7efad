//! Attribute values and nested property blocks.

use serde_json::Number;

use crate::error::{DslError, DslResult};
use crate::expr::Expr;
use crate::store::AttributeStore;

/// A value stored under an attribute name.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    /// Nested content map, e.g. `Properties` or `Metadata`.
    Object(Block),
    Expr(Box<Expr>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Value::Object(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_block_mut(&mut self) -> Option<&mut Block> {
        match self {
            Value::Object(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Value::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "map",
            Value::Expr(_) => "function",
        }
    }

    /// Populate a nested block in place. Only maps accept nested construction.
    pub fn declare<F>(&mut self, build: F) -> DslResult<&mut Self>
    where
        F: FnOnce(&mut Block) -> DslResult<()>,
    {
        match &mut *self {
            Value::Object(block) => build(block)?,
            other => return Err(DslError::NotDeclarable(format!("{} value", other.kind_name()))),
        }
        Ok(self)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::Number(Number::from(value))
            }
        })*
    };
}

from_integer!(i32, i64, u32, u64, usize);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

impl From<Expr> for Value {
    fn from(value: Expr) -> Self {
        Value::Expr(Box::new(value))
    }
}

impl From<Block> for Value {
    fn from(value: Block) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(map.into_iter().collect()),
        }
    }
}

/// A nested, unnamed entity: a property structure, a mapping, a metadata map.
///
/// A block may carry a property type label fixed at construction. The label
/// names the structure for the builder and is never part of the output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    property_type: Option<String>,
    store: AttributeStore,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a block for a fixed property structure type.
    pub fn typed(property_type: impl Into<String>) -> Self {
        Self {
            property_type: Some(property_type.into()),
            store: AttributeStore::new(),
        }
    }

    pub fn property_type(&self) -> Option<&str> {
        self.property_type.as_deref()
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.store
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.store
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.store.get(name)
    }

    /// Set a field, returning the stored value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Value {
        self.store.set(name, value.into())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Block {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut block = Block::new();
        for (name, value) in iter {
            let name: String = name.into();
            block.set(&name, value);
        }
        block
    }
}
