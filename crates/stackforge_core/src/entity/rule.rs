//! Template rules, available on service catalog templates.

use crate::entity::{field_names, Attributes, Entity};
use crate::error::DslResult;
use crate::references::RefKind;
use crate::store::AttributeStore;
use crate::value::{Block, Value};

const ASSERTIONS: &str = "Assertions";

/// A rule: an optional `RuleCondition` and a list of assertions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    store: AttributeStore,
}

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule_condition(&mut self, value: impl Into<Value>) -> &mut Value {
        self.store.set("RuleCondition", value.into())
    }

    /// Replace the assertion list.
    pub fn assertions(&mut self, values: Vec<Value>) -> &mut Value {
        self.store.list_attribute(ASSERTIONS, Some(values))
    }

    /// Append an assertion, optionally only when `condition` holds.
    pub fn assertion(
        &mut self,
        value: impl Into<Value>,
        condition: Option<&str>,
    ) -> DslResult<&mut Vec<Value>> {
        self.store.push_attribute(ASSERTIONS, value.into(), condition)
    }

    /// Shortcut for an assertion with a description.
    pub fn assert(
        &mut self,
        description: impl Into<Value>,
        structure: impl Into<Value>,
    ) -> DslResult<&mut Vec<Value>> {
        let mut assertion = Block::new();
        assertion.set("Assert", structure);
        assertion.set("AssertDescription", description);
        self.assertion(assertion, None)
    }

    pub fn condition(&mut self, name: impl Into<Value>) -> &mut Value {
        self.store.set("Condition", name.into())
    }
}

impl Attributes for Rule {
    fn attributes(&self) -> &AttributeStore {
        &self.store
    }

    fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.store
    }
}

impl Entity for Rule {
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
