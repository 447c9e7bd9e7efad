//! Template entities.
//!
//! Every entity can produce its references ([`Entity`]) and its document
//! ([`ToDocument`]). Entities backed by an [`AttributeStore`] also get the
//! generic get/set/list/push/content operations from [`Attributes`].

pub mod condition;
pub mod output;
pub mod parameter;
pub mod resource;
pub mod rule;

pub use condition::Condition;
pub use output::Output;
pub use parameter::Parameter;
pub use resource::Resource;
pub use rule::Rule;

use crate::error::DslResult;
use crate::references::RefKind;
use crate::serializer::ToDocument;
use crate::store::AttributeStore;
use crate::value::{Block, Value};

/// Reference-bearing part of an entity.
pub trait Entity: ToDocument {
    /// References held in plain fields rather than in expressions, e.g. `DependsOn`.
    fn extra_refs(&self, _kind: RefKind) -> Vec<String> {
        Vec::new()
    }

    /// Values walked when collecting references.
    fn ref_children(&self) -> Vec<&Value>;
}

/// Generic attribute operations for store-backed entities.
///
/// When [`Attributes::default_scope`] names a content map, the plain
/// operations read and write inside that map instead of the top level.
pub trait Attributes {
    fn attributes(&self) -> &AttributeStore;

    fn attributes_mut(&mut self) -> &mut AttributeStore;

    fn default_scope(&self) -> Option<&'static str> {
        None
    }

    /// The store the plain operations target.
    fn scoped_mut(&mut self) -> DslResult<&mut AttributeStore> {
        match self.default_scope() {
            Some(scope) => Ok(self.attributes_mut().content(scope)?.attributes_mut()),
            None => Ok(self.attributes_mut()),
        }
    }

    fn get_attribute(&self, name: &str) -> Option<&Value> {
        match self.default_scope() {
            Some(scope) => self
                .attributes()
                .get(scope)
                .and_then(Value::as_block)
                .and_then(|block| block.get(name)),
            None => self.attributes().get(name),
        }
    }

    fn attribute(&mut self, name: &str, value: Option<Value>) -> DslResult<Option<&mut Value>> {
        Ok(self.scoped_mut()?.attribute(name, value))
    }

    fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> DslResult<&mut Value> {
        Ok(self.scoped_mut()?.set(name, value.into()))
    }

    fn list_attribute(&mut self, name: &str, value: Option<Vec<Value>>) -> DslResult<&mut Value> {
        Ok(self.scoped_mut()?.list_attribute(name, value))
    }

    fn push_attribute(
        &mut self,
        name: &str,
        item: impl Into<Value>,
        condition: Option<&str>,
    ) -> DslResult<&mut Vec<Value>> {
        self.scoped_mut()?.push_attribute(name, item.into(), condition)
    }

    fn content_attribute(
        &mut self,
        section: &str,
        entry: &str,
        value: Option<Value>,
    ) -> DslResult<Option<&mut Value>> {
        self.attributes_mut().content_attribute(section, entry, value)
    }

    fn declare_attribute<F>(&mut self, name: &str, build: F) -> DslResult<&mut Value>
    where
        F: FnOnce(&mut Block) -> DslResult<()>,
    {
        self.scoped_mut()?.declare(name, None, build)
    }
}

impl Attributes for Block {
    fn attributes(&self) -> &AttributeStore {
        Block::attributes(self)
    }

    fn attributes_mut(&mut self) -> &mut AttributeStore {
        Block::attributes_mut(self)
    }
}

impl Entity for Block {
    fn ref_children(&self) -> Vec<&Value> {
        Block::attributes(self).values().collect()
    }
}

/// Resolve a field name against a static table of known fields.
///
/// Besides the exact spelling, a lower-case first letter is accepted
/// (`dependsOn` for `DependsOn`).
pub fn resolve_alias(fields: &'static [&'static str], name: &str) -> Option<&'static str> {
    fields.iter().copied().find(|field| {
        *field == name || {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) if first.is_ascii_lowercase() => {
                    field.strip_prefix(first.to_ascii_uppercase()) == Some(chars.as_str())
                }
                _ => false,
            }
        }
    })
}

/// String names held in a scalar or list field, ignoring nulls.
pub(crate) fn field_names(value: Option<&Value>) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(value) = value {
        push_names(value, &mut names);
    }
    names
}

fn push_names(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(name) => names.push(name.clone()),
        Value::List(items) => items.iter().for_each(|item| push_names(item, names)),
        _ => {}
    }
}

/// Generates one setter per fixed field, each returning the stored value.
macro_rules! field_setters {
    ($($(#[$meta:meta])* $method:ident => $field:literal),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $method(
                &mut self,
                value: impl Into<$crate::value::Value>,
            ) -> &mut $crate::value::Value {
                self.store.set($field, value.into())
            }
        )*
    };
}

pub(crate) use field_setters;
