//! Reference collection.
//!
//! References are gathered by walking an entity's values depth first:
//! lists, nested blocks and expression arguments are all descended into.

use crate::entity::Entity;
use crate::value::Value;

/// Which kind of name a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Parameters, resources and pseudo parameters (`Ref`, `Fn::GetAtt`, `Fn::Sub`, `DependsOn`).
    All,
    /// Named conditions (`Condition` fields, `Fn::If`, condition operands).
    Condition,
}

impl RefKind {
    /// Noun used in validation messages.
    pub fn target_noun(&self) -> &'static str {
        match self {
            RefKind::All => "Reference",
            RefKind::Condition => "Condition",
        }
    }
}

/// Every name of `kind` referenced by `entity`, in walk order.
///
/// Empty names are kept so the caller can report them.
pub fn collect_refs<E: Entity + ?Sized>(entity: &E, kind: RefKind) -> Vec<String> {
    let mut refs = entity.extra_refs(kind);
    for value in entity.ref_children() {
        value_refs(value, kind, &mut refs);
    }
    refs
}

/// Append the names of `kind` found anywhere inside `value`.
pub fn value_refs(value: &Value, kind: RefKind, refs: &mut Vec<String>) {
    match value {
        Value::List(items) => {
            for item in items {
                value_refs(item, kind, refs);
            }
        }
        Value::Object(block) => {
            for child in block.attributes().values() {
                value_refs(child, kind, refs);
            }
        }
        Value::Expr(expr) => {
            refs.extend(expr.refs(kind).into_iter().map(str::to_string));
            for child in expr.children() {
                value_refs(child, kind, refs);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}
