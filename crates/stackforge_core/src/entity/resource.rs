//! Resource entities.

use crate::entity::{field_names, resolve_alias, Attributes, Entity};
use crate::error::{DslError, DslResult};
use crate::references::RefKind;
use crate::store::AttributeStore;
use crate::value::{Block, Value};

const PROPERTIES: &str = "Properties";
const DEPENDS_ON: &str = "DependsOn";

/// Known top-level resource fields, in their canonical spelling.
pub const RESOURCE_FIELDS: &[&str] = &[
    "Type",
    "Properties",
    "DependsOn",
    "Condition",
    "Metadata",
    "DeletionPolicy",
    "UpdateReplacePolicy",
    "CreationPolicy",
    "UpdatePolicy",
];

/// A resource declaration.
///
/// A resource created with [`Resource::typed`] has a type that cannot change,
/// and its plain attribute operations ([`Attributes`]) write into `Properties`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    store: AttributeStore,
    fixed_type: bool,
}

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resource whose type is fixed at construction.
    pub fn typed(resource_type: impl Into<String>) -> Self {
        let mut store = AttributeStore::new();
        store.set("Type", Value::String(resource_type.into()));
        Self {
            store,
            fixed_type: true,
        }
    }

    pub fn is_typed(&self) -> bool {
        self.fixed_type
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.store.get("Type").and_then(Value::as_str)
    }

    pub fn set_type(&mut self, value: impl Into<Value>) -> DslResult<&mut Value> {
        if self.fixed_type {
            return Err(DslError::FixedType(
                self.resource_type().unwrap_or_default().to_string(),
            ));
        }
        Ok(self.store.set("Type", value.into()))
    }

    /// Set one entry of `Properties`.
    pub fn property(&mut self, name: &str, value: impl Into<Value>) -> DslResult<&mut Value> {
        Ok(self.store.content(PROPERTIES)?.set(name, value))
    }

    pub fn get_property(&self, name: &str) -> Option<&Value> {
        self.store
            .get(PROPERTIES)
            .and_then(Value::as_block)
            .and_then(|properties| properties.get(name))
    }

    /// Build a nested property structure under `Properties`.
    pub fn property_block<F>(&mut self, name: &str, build: F) -> DslResult<&mut Value>
    where
        F: FnOnce(&mut Block) -> DslResult<()>,
    {
        self.store
            .content(PROPERTIES)?
            .attributes_mut()
            .declare(name, None, build)
    }

    /// Build a nested property structure of a fixed property type.
    pub fn typed_property<F>(
        &mut self,
        name: &str,
        property_type: &str,
        build: F,
    ) -> DslResult<&mut Value>
    where
        F: FnOnce(&mut Block) -> DslResult<()>,
    {
        self.store
            .content(PROPERTIES)?
            .attributes_mut()
            .attribute_or(name, None, || Block::typed(property_type).into())
            .declare(build)
    }

    pub fn creation_policy(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> DslResult<&mut Value> {
        Ok(self.store.content("CreationPolicy")?.set(name, value))
    }

    pub fn update_policy(&mut self, name: &str, value: impl Into<Value>) -> DslResult<&mut Value> {
        Ok(self.store.content("UpdatePolicy")?.set(name, value))
    }

    /// Set one metadata entry.
    pub fn metadata(&mut self, name: &str, value: impl Into<Value>) -> DslResult<&mut Value> {
        Ok(self.store.content("Metadata")?.set(name, value))
    }

    /// Replace the whole metadata map.
    pub fn metadata_map(&mut self, value: impl Into<Value>) -> &mut Value {
        self.store.set("Metadata", value.into())
    }

    pub fn deletion_policy(&mut self, value: impl Into<Value>) -> &mut Value {
        self.store.set("DeletionPolicy", value.into())
    }

    pub fn update_replace_policy(&mut self, value: impl Into<Value>) -> &mut Value {
        self.store.set("UpdateReplacePolicy", value.into())
    }

    pub fn condition(&mut self, name: impl Into<Value>) -> &mut Value {
        self.store.set("Condition", name.into())
    }

    /// Add dependencies. A single dependency stays a scalar; more than one
    /// becomes a flat list without duplicates, in order of first appearance.
    pub fn depends_on(&mut self, value: impl Into<Value>) -> &mut Value {
        let value = value.into();
        let merged = match self.store.get(DEPENDS_ON) {
            None | Some(Value::Null) => value,
            Some(existing) => Value::List(vec![existing.clone(), value]),
        };
        let merged = match merged {
            Value::List(items) => {
                let mut unique: Vec<Value> = Vec::new();
                flatten_unique(items, &mut unique);
                Value::List(unique)
            }
            other => other,
        };
        self.store.put(DEPENDS_ON, merged)
    }

    /// Set a field by name. Known fields (including their lower-case
    /// spellings) go through their dedicated setter; anything else is a
    /// plain attribute.
    pub fn field(&mut self, name: &str, value: impl Into<Value>) -> DslResult<&mut Value> {
        let value = value.into();
        match resolve_alias(RESOURCE_FIELDS, name) {
            Some("Type") => self.set_type(value),
            Some(DEPENDS_ON) => Ok(self.depends_on(value)),
            Some(field) => Ok(self.store.set(field, value)),
            None => self.set_attribute(name, value),
        }
    }
}

fn flatten_unique(items: Vec<Value>, unique: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::List(nested) => flatten_unique(nested, unique),
            item if !unique.contains(&item) => unique.push(item),
            _ => {}
        }
    }
}

impl Attributes for Resource {
    fn attributes(&self) -> &AttributeStore {
        &self.store
    }

    fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.store
    }

    fn default_scope(&self) -> Option<&'static str> {
        self.fixed_type.then_some(PROPERTIES)
    }
}

impl Entity for Resource {
    fn extra_refs(&self, kind: RefKind) -> Vec<String> {
        match kind {
            RefKind::All => field_names(self.store.get(DEPENDS_ON)),
            RefKind::Condition => field_names(self.store.get("Condition")),
        }
    }

    fn ref_children(&self) -> Vec<&Value> {
        self.store.values().collect()
    }
}
