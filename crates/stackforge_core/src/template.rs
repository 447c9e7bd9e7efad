//! The template root.
//!
//! A [`Template`] is the build handle: sections and top-level fields are
//! populated through it, and [`Template::validate`] turns it into a
//! [`ValidatedTemplate`], the only handle that produces a document.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::config::{TemplateConfig, TemplateKind};
use crate::entity::{
    resolve_alias, Attributes, Condition, Entity, Output, Parameter, Resource, Rule,
};
use crate::error::{DslError, DslResult};
use crate::references::{collect_refs, RefKind};
use crate::serializer::{output_key, ToDocument};
use crate::store::AttributeStore;
use crate::validator::{Finding, TemplateValidator};
use crate::value::Value;
use crate::variables::VariableSource;

/// Top-level keys of a template, in their canonical spelling.
pub const TEMPLATE_FIELDS: &[&str] = &[
    "AWSTemplateFormatVersion",
    "Description",
    "Metadata",
    "Transform",
    "Conditions",
    "Mappings",
    "Parameters",
    "Resources",
    "Outputs",
    "Rules",
];

const FORMAT_VERSION: &str = "AWSTemplateFormatVersion";
const MAPPINGS: &str = "Mappings";

/// A named-entity section of the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Conditions,
    Parameters,
    Resources,
    Outputs,
    Rules,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Conditions,
        Section::Parameters,
        Section::Resources,
        Section::Outputs,
        Section::Rules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Conditions => "Conditions",
            Section::Parameters => "Parameters",
            Section::Resources => "Resources",
            Section::Outputs => "Outputs",
            Section::Rules => "Rules",
        }
    }

    /// Name of a single entry, as used in messages.
    pub fn singular(&self) -> &'static str {
        match self {
            Section::Conditions => "Condition",
            Section::Parameters => "Parameter",
            Section::Resources => "Resource",
            Section::Outputs => "Output",
            Section::Rules => "Rule",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.as_str() == name)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Field(String),
    Section(Section),
}

/// Build handle for a template.
#[derive(Clone)]
pub struct Template {
    kind: TemplateKind,
    fields: AttributeStore,
    conditions: IndexMap<String, Condition>,
    parameters: IndexMap<String, Parameter>,
    resources: IndexMap<String, Resource>,
    outputs: IndexMap<String, Output>,
    rules: IndexMap<String, Rule>,
    layout: Vec<Slot>,
    replaced_entries: Vec<String>,
    variables: Option<Arc<dyn VariableSource>>,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("kind", &self.kind)
            .field("fields", &self.fields)
            .field("conditions", &self.conditions)
            .field("parameters", &self.parameters)
            .field("resources", &self.resources)
            .field("outputs", &self.outputs)
            .field("rules", &self.rules)
            .field("variables", &self.variables.is_some())
            .finish()
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    pub fn new() -> Self {
        Self::from_config(&TemplateConfig::default())
    }

    pub fn with_description(description: impl Into<String>) -> Self {
        Self::from_config(&TemplateConfig::default().with_description(description))
    }

    /// A template that also accepts `Rules`.
    pub fn service_catalog() -> Self {
        Self::from_config(&TemplateConfig::service_catalog())
    }

    pub fn from_config(config: &TemplateConfig) -> Self {
        let mut template = Self {
            kind: config.kind,
            fields: AttributeStore::new(),
            conditions: IndexMap::new(),
            parameters: IndexMap::new(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
            rules: IndexMap::new(),
            layout: Vec::new(),
            replaced_entries: Vec::new(),
            variables: None,
        };
        template.format_version(config.format_version.as_str());
        if let Some(description) = &config.description {
            template.description(description.as_str());
        }
        template
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Attach the variables the front end may consult while building.
    pub fn with_variables(mut self, variables: Arc<dyn VariableSource>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn variable(&self, name: &str) -> Option<Value> {
        self.variables.as_ref().and_then(|source| source.lookup(name))
    }

    /// Run a builder over the template.
    pub fn declare<F>(mut self, build: F) -> DslResult<Self>
    where
        F: FnOnce(&mut Template) -> DslResult<()>,
    {
        build(&mut self)?;
        Ok(self)
    }

    /// Canonical spelling of a top-level key, accepting a lower-case first letter.
    pub fn entry_point(name: &str) -> Option<&'static str> {
        resolve_alias(TEMPLATE_FIELDS, name)
    }

    // Top-level fields

    pub fn format_version(&mut self, value: impl Into<Value>) -> &mut Value {
        self.field_store(FORMAT_VERSION).set(FORMAT_VERSION, value.into())
    }

    pub fn description(&mut self, value: impl Into<Value>) -> &mut Value {
        self.field_store("Description").set("Description", value.into())
    }

    pub fn metadata(&mut self, value: impl Into<Value>) -> &mut Value {
        self.field_store("Metadata").set("Metadata", value.into())
    }

    /// Get-or-set the `Transform` list.
    pub fn transform(&mut self, values: Option<Vec<Value>>) -> &mut Value {
        self.field_store("Transform").list_attribute("Transform", values)
    }

    /// Get-or-set an arbitrary top-level field.
    ///
    /// Section names are rejected; entries go through the section methods.
    pub fn attribute(&mut self, name: &str, value: Option<Value>) -> DslResult<Option<&mut Value>> {
        let name = Self::entry_point(name).unwrap_or(name);
        if let Some(section) = Section::from_name(name) {
            return Err(DslError::invalid_argument(
                "attribute",
                format!("{} entries must be declared individually", section),
            ));
        }
        match value {
            Some(value) => Ok(Some(self.field_store(name).set(name, value))),
            None => Ok(self.fields.get_mut(name)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    // Sections

    /// Define a named condition, replacing any earlier one.
    pub fn condition(&mut self, name: &str, expression: impl Into<Value>) -> &mut Condition {
        self.touch(Slot::Section(Section::Conditions));
        let condition = Condition::new(expression);
        if self.conditions.contains_key(name) {
            self.record_replaced(Section::Conditions, name);
        } else {
            debug!("Declared condition {}", name);
        }
        let (index, _) = self.conditions.insert_full(name.to_string(), condition);
        &mut self.conditions[index]
    }

    /// Set one entry of the freeform `Mappings` section.
    pub fn mapping(&mut self, name: &str, value: impl Into<Value>) -> DslResult<&mut Value> {
        Ok(self.field_store(MAPPINGS).content(MAPPINGS)?.set(name, value))
    }

    /// Get-or-create a parameter and run `build` over it.
    pub fn parameter<F>(&mut self, name: &str, build: F) -> DslResult<&mut Parameter>
    where
        F: FnOnce(&mut Parameter) -> DslResult<()>,
    {
        self.touch(Slot::Section(Section::Parameters));
        let parameter = entry(&mut self.parameters, Section::Parameters, name);
        build(parameter)?;
        Ok(parameter)
    }

    /// Get-or-create an output and run `build` over it.
    pub fn output<F>(&mut self, name: &str, build: F) -> DslResult<&mut Output>
    where
        F: FnOnce(&mut Output) -> DslResult<()>,
    {
        self.touch(Slot::Section(Section::Outputs));
        let output = entry(&mut self.outputs, Section::Outputs, name);
        build(output)?;
        Ok(output)
    }

    /// Define an output directly from a value, see [`Output::from_value`].
    pub fn output_value(&mut self, name: &str, value: impl Into<Value>) -> &mut Output {
        self.touch(Slot::Section(Section::Outputs));
        if self.outputs.contains_key(name) {
            self.record_replaced(Section::Outputs, name);
        }
        let (index, _) = self
            .outputs
            .insert_full(name.to_string(), Output::from_value(value));
        &mut self.outputs[index]
    }

    /// Get-or-create an untyped resource and run `build` over it.
    pub fn resource<F>(&mut self, name: &str, build: F) -> DslResult<&mut Resource>
    where
        F: FnOnce(&mut Resource) -> DslResult<()>,
    {
        self.touch(Slot::Section(Section::Resources));
        let resource = entry(&mut self.resources, Section::Resources, name);
        build(resource)?;
        Ok(resource)
    }

    /// Get-or-create a resource whose type is fixed to `resource_type`.
    ///
    /// An existing resource of a different type is replaced.
    pub fn typed_resource<F>(
        &mut self,
        name: &str,
        resource_type: &str,
        build: F,
    ) -> DslResult<&mut Resource>
    where
        F: FnOnce(&mut Resource) -> DslResult<()>,
    {
        self.touch(Slot::Section(Section::Resources));
        let reusable = self
            .resources
            .get(name)
            .is_some_and(|r| r.is_typed() && r.resource_type() == Some(resource_type));
        let index = match self.resources.get_index_of(name) {
            Some(index) if reusable => index,
            existing => {
                if existing.is_some() {
                    self.record_replaced(Section::Resources, name);
                } else {
                    debug!("Declared resource {} ({})", name, resource_type);
                }
                self.resources
                    .insert_full(name.to_string(), Resource::typed(resource_type))
                    .0
            }
        };
        let resource = &mut self.resources[index];
        build(resource)?;
        Ok(resource)
    }

    /// Get-or-create a rule. Only service catalog templates have rules.
    pub fn rule<F>(&mut self, name: &str, build: F) -> DslResult<&mut Rule>
    where
        F: FnOnce(&mut Rule) -> DslResult<()>,
    {
        if !self.kind.supports_rules() {
            return Err(DslError::UnsupportedSection {
                section: Section::Rules.to_string(),
                kind: self.kind.to_string(),
            });
        }
        self.touch(Slot::Section(Section::Rules));
        let rule = entry(&mut self.rules, Section::Rules, name);
        build(rule)?;
        Ok(rule)
    }

    pub fn conditions(&self) -> &IndexMap<String, Condition> {
        &self.conditions
    }

    pub fn parameters(&self) -> &IndexMap<String, Parameter> {
        &self.parameters
    }

    pub fn resources(&self) -> &IndexMap<String, Resource> {
        &self.resources
    }

    pub fn outputs(&self) -> &IndexMap<String, Output> {
        &self.outputs
    }

    pub fn rules(&self) -> &IndexMap<String, Rule> {
        &self.rules
    }

    /// Whether `section` has an entry called `name`.
    pub fn contains(&self, section: Section, name: &str) -> bool {
        match section {
            Section::Conditions => self.conditions.contains_key(name),
            Section::Parameters => self.parameters.contains_key(name),
            Section::Resources => self.resources.contains_key(name),
            Section::Outputs => self.outputs.contains_key(name),
            Section::Rules => self.rules.contains_key(name),
        }
    }

    /// The references of `kind` held by each entry of `section`.
    pub fn section_refs(&self, section: Section, kind: RefKind) -> Vec<(&str, Vec<String>)> {
        fn refs<E: Entity>(
            entries: &IndexMap<String, E>,
            kind: RefKind,
        ) -> Vec<(&str, Vec<String>)> {
            entries
                .iter()
                .map(|(name, entity)| (name.as_str(), collect_refs(entity, kind)))
                .collect()
        }

        match section {
            Section::Conditions => refs(&self.conditions, kind),
            Section::Parameters => refs(&self.parameters, kind),
            Section::Resources => refs(&self.resources, kind),
            Section::Outputs => refs(&self.outputs, kind),
            Section::Rules => refs(&self.rules, kind),
        }
    }

    /// Every value that was overwritten while building, as dotted paths.
    pub fn replacements(&self) -> Vec<String> {
        let mut replaced = Vec::new();
        store_replacements("", &self.fields, &mut replaced);
        replaced.extend(self.replaced_entries.iter().cloned());
        let entities = self
            .parameters
            .iter()
            .map(|(name, e)| (Section::Parameters, name, e.attributes()))
            .chain(
                self.resources
                    .iter()
                    .map(|(name, e)| (Section::Resources, name, e.attributes())),
            )
            .chain(
                self.outputs
                    .iter()
                    .map(|(name, e)| (Section::Outputs, name, e.attributes())),
            )
            .chain(
                self.rules
                    .iter()
                    .map(|(name, e)| (Section::Rules, name, e.attributes())),
            );
        for (section, name, store) in entities {
            store_replacements(&path(section.as_str(), name), store, &mut replaced);
        }
        replaced
    }

    /// Validation findings without consuming the template.
    pub fn findings(&self) -> Vec<Finding> {
        TemplateValidator::new(self).check()
    }

    /// Freeze the template, or fail with every finding at once.
    pub fn validate(self) -> DslResult<ValidatedTemplate> {
        TemplateValidator::new(&self).validate()?;
        info!(
            "Validated template: {} parameters, {} conditions, {} resources, {} outputs, {} rules",
            self.parameters.len(),
            self.conditions.len(),
            self.resources.len(),
            self.outputs.len(),
            self.rules.len()
        );
        Ok(ValidatedTemplate { template: self })
    }

    fn touch(&mut self, slot: Slot) {
        if !self.layout.contains(&slot) {
            self.layout.push(slot);
        }
    }

    fn field_store(&mut self, name: &str) -> &mut AttributeStore {
        self.touch(Slot::Field(name.to_string()));
        &mut self.fields
    }

    fn record_replaced(&mut self, section: Section, name: &str) {
        warn!("Replacing previously defined {} {}", section.singular(), name);
        self.replaced_entries.push(path(section.as_str(), name));
    }
}

fn entry<'a, E: Default>(
    entries: &'a mut IndexMap<String, E>,
    section: Section,
    name: &str,
) -> &'a mut E {
    entries.entry(name.to_string()).or_insert_with(|| {
        debug!("Declared {} {}", section.singular().to_lowercase(), name);
        E::default()
    })
}

fn path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn store_replacements(prefix: &str, store: &AttributeStore, replaced: &mut Vec<String>) {
    replaced.extend(store.replaced().iter().map(|name| path(prefix, name)));
    for (key, value) in store.iter() {
        if let Value::Object(block) = value {
            store_replacements(&path(prefix, key), block.attributes(), replaced);
        }
    }
}

/// A template that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedTemplate {
    template: Template,
}

impl ValidatedTemplate {
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Back to a build handle; it has to be validated again.
    pub fn into_template(self) -> Template {
        self.template
    }

    /// The ordered document. Top-level keys follow the order they were first
    /// touched; sections without entries are left out.
    pub fn to_document(&self) -> JsonValue {
        let template = &self.template;
        let mut document = Map::new();
        for slot in &template.layout {
            match slot {
                Slot::Field(name) => {
                    let field = template.fields.get(name);
                    if let (Some(key), Some(value)) = (output_key(name), field) {
                        document.insert(key.to_string(), value.to_document());
                    }
                }
                Slot::Section(section) => {
                    if let Some(entries) = template.section_document(*section) {
                        document.insert(section.to_string(), entries);
                    }
                }
            }
        }
        JsonValue::Object(document)
    }
}

impl Template {
    fn section_document(&self, section: Section) -> Option<JsonValue> {
        fn entries<E: ToDocument>(entries: &IndexMap<String, E>) -> Option<JsonValue> {
            if entries.is_empty() {
                return None;
            }
            let map = entries
                .iter()
                .map(|(name, entity)| (name.clone(), entity.to_document()))
                .collect::<Map<_, _>>();
            Some(JsonValue::Object(map))
        }

        match section {
            Section::Conditions => entries(&self.conditions),
            Section::Parameters => entries(&self.parameters),
            Section::Resources => entries(&self.resources),
            Section::Outputs => entries(&self.outputs),
            Section::Rules => entries(&self.rules),
        }
    }
}

impl Serialize for ValidatedTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}
