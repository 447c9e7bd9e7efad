//! Entity tree to ordered document tree.
//!
//! The document is a [`serde_json::Value`] built with `preserve_order`, so
//! keys come out in the order they were first set. Text encoding is left to
//! the caller.
//!
//! Key visibility:
//!
//! - `_name` is private and omitted;
//! - `__name` is emitted as `_name`;
//! - anything else is emitted as is.

use serde_json::{Map, Value as JsonValue};

use crate::entity::{Condition, Output, Parameter, Resource, Rule};
use crate::expr::Expr;
use crate::store::AttributeStore;
use crate::value::{Block, Value};

/// Something that can be written into the output document.
pub trait ToDocument {
    fn to_document(&self) -> JsonValue;
}

/// How a stored key appears in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// Leading single underscore: omitted.
    Private,
    /// Leading double underscore: emitted with one underscore removed.
    Escaped,
}

impl Visibility {
    pub fn of(key: &str) -> Self {
        if key.starts_with("__") {
            Visibility::Escaped
        } else if key.starts_with('_') {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

/// The key emitted for `key`, or `None` when it is private.
pub fn output_key(key: &str) -> Option<&str> {
    match Visibility::of(key) {
        Visibility::Public => Some(key),
        Visibility::Private => None,
        Visibility::Escaped => Some(&key[1..]),
    }
}

impl ToDocument for AttributeStore {
    fn to_document(&self) -> JsonValue {
        let mut map = Map::new();
        for (key, value) in self.iter() {
            if let Some(key) = output_key(key) {
                map.insert(key.to_string(), value.to_document());
            }
        }
        JsonValue::Object(map)
    }
}

impl ToDocument for Block {
    fn to_document(&self) -> JsonValue {
        self.attributes().to_document()
    }
}

impl ToDocument for Value {
    fn to_document(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => list(items.iter()),
            Value::Object(block) => block.to_document(),
            Value::Expr(expr) => expr.to_document(),
        }
    }
}

impl ToDocument for Expr {
    fn to_document(&self) -> JsonValue {
        let argument = match self {
            Expr::Ref(name) | Expr::Condition(name) => JsonValue::String(name.clone()),
            Expr::Base64(value)
            | Expr::GetAZs(value)
            | Expr::ImportValue(value)
            | Expr::RefAll(value) => value.to_document(),
            Expr::FindInMap {
                map,
                top_key,
                second_key,
            } => list([map, top_key, second_key]),
            Expr::GetAtt {
                resource,
                attribute,
            } => JsonValue::Array(vec![
                JsonValue::String(resource.clone()),
                attribute.to_document(),
            ]),
            Expr::Join { delimiter, values } => list([delimiter, values]),
            Expr::Split { delimiter, source } => list([delimiter, source]),
            Expr::And(items) | Expr::Or(items) | Expr::Not(items) => list(items.iter()),
            Expr::Equals(a, b)
            | Expr::Contains(a, b)
            | Expr::EachMemberEquals(a, b)
            | Expr::EachMemberIn(a, b) => list([a, b]),
            Expr::If {
                condition,
                then,
                otherwise,
            } => JsonValue::Array(vec![
                JsonValue::String(condition.clone()),
                then.to_document(),
                otherwise.to_document(),
            ]),
            Expr::Select { index, values } => list([index, values]),
            Expr::Sub {
                template,
                variables,
                ..
            } => match variables {
                Some(variables) => JsonValue::Array(vec![
                    JsonValue::String(template.clone()),
                    variables.to_document(),
                ]),
                None => JsonValue::String(template.clone()),
            },
            Expr::Cidr {
                ip_block,
                count,
                cidr_bits,
            } => list([ip_block, count, cidr_bits]),
            Expr::Transform { name, parameters } => {
                let mut map = Map::new();
                map.insert("Name".to_string(), name.to_document());
                if let Some(parameters) = parameters {
                    map.insert("Parameters".to_string(), parameters.to_document());
                }
                JsonValue::Object(map)
            }
            Expr::ValueOf {
                parameter,
                attribute,
            }
            | Expr::ValueOfAll {
                parameter,
                attribute,
            } => JsonValue::Array(vec![
                JsonValue::String(parameter.clone()),
                JsonValue::String(attribute.clone()),
            ]),
        };

        let mut map = Map::new();
        map.insert(self.tag().to_string(), argument);
        JsonValue::Object(map)
    }
}

impl ToDocument for Condition {
    fn to_document(&self) -> JsonValue {
        self.expression().to_document()
    }
}

macro_rules! store_document {
    ($($entity:ty),*) => {
        $(impl ToDocument for $entity {
            fn to_document(&self) -> JsonValue {
                crate::entity::Attributes::attributes(self).to_document()
            }
        })*
    };
}

store_document!(Parameter, Resource, Output, Rule);

fn list<'a>(items: impl IntoIterator<Item = &'a Value>) -> JsonValue {
    JsonValue::Array(items.into_iter().map(ToDocument::to_document).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_visibility() {
        assert_eq!(Visibility::of("Type"), Visibility::Public);
        assert_eq!(Visibility::of("_internal"), Visibility::Private);
        assert_eq!(Visibility::of("__escaped"), Visibility::Escaped);
        assert_eq!(output_key("__escaped"), Some("_escaped"));
        assert_eq!(output_key("_internal"), None);
    }

    #[test]
    fn test_private_keys_are_dropped() {
        let mut block = Block::new();
        block.set("Name", "web");
        block.set("_scratch", "hidden");
        block.set("__Literal", "kept");
        assert_eq!(block.to_document(), json!({ "Name": "web", "_Literal": "kept" }));
    }

    #[test]
    fn test_expression_shapes() {
        assert_eq!(Expr::reference("Vpc").to_document(), json!({ "Ref": "Vpc" }));
        assert_eq!(
            Expr::get_att("Bucket", "Arn").to_document(),
            json!({ "Fn::GetAtt": ["Bucket", "Arn"] })
        );
        assert_eq!(
            Expr::join(",", vec![Value::from(Expr::reference("A")), Value::from("b")])
                .to_document(),
            json!({ "Fn::Join": [",", [{ "Ref": "A" }, "b"]] })
        );
        assert_eq!(
            Expr::not(Expr::condition("IsProd")).to_document(),
            json!({ "Fn::Not": [{ "Condition": "IsProd" }] })
        );
        assert_eq!(
            Expr::sub("${Env}-app", None).unwrap().to_document(),
            json!({ "Fn::Sub": "${Env}-app" })
        );
        assert_eq!(
            Expr::transform("AWS::Include", None).to_document(),
            json!({ "Fn::Transform": { "Name": "AWS::Include" } })
        );
    }

    #[test]
    fn test_nested_order_is_preserved() {
        let mut resource = Resource::new();
        resource.set_type("AWS::EC2::Instance").unwrap();
        resource.property("Zeta", 1).unwrap();
        resource.property("Alpha", 2).unwrap();
        resource.depends_on("Role");

        let rendered = serde_json::to_string(&resource.to_document()).unwrap();
        assert_eq!(
            rendered,
            r#"{"Type":"AWS::EC2::Instance","Properties":{"Zeta":1,"Alpha":2},"DependsOn":"Role"}"#
        );
    }
}
