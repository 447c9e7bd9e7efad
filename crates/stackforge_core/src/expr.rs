//! Intrinsic function expressions.
//!
//! An [`Expr`] is evaluated by whatever consumes the serialized document, never
//! by this crate. What matters here is the wire shape and the names each node
//! references, which feed the validator.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DslError, DslResult};
use crate::references::RefKind;
use crate::value::{Block, Value};

/// Built-in reference targets that are always valid.
pub const PSEUDO_PARAMETERS: [&str; 8] = [
    "AWS::AccountId",
    "AWS::NotificationARNs",
    "AWS::NoValue",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

/// Pseudo parameter that removes a property when selected.
pub const NO_VALUE: &str = "AWS::NoValue";

/// Placeholders in an `Fn::Sub` template. `${!Literal}` is an escape and is skipped.
static SUB_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^!}]*)\}").unwrap());

const MIN_OPERANDS: usize = 2;
const MAX_OPERANDS: usize = 10;

/// Check whether a name is one of the fixed pseudo parameters.
pub fn is_pseudo_parameter(name: &str) -> bool {
    PSEUDO_PARAMETERS.contains(&name)
}

/// An intrinsic function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ref(String),
    /// Names another condition from inside `Fn::And`, `Fn::Or` or `Fn::Not`.
    Condition(String),
    Base64(Value),
    FindInMap {
        map: Value,
        top_key: Value,
        second_key: Value,
    },
    GetAtt {
        resource: String,
        attribute: Value,
    },
    GetAZs(Value),
    Join {
        delimiter: Value,
        values: Value,
    },
    Split {
        delimiter: Value,
        source: Value,
    },
    And(Vec<Value>),
    Or(Vec<Value>),
    Not(Vec<Value>),
    Equals(Value, Value),
    If {
        condition: String,
        then: Value,
        otherwise: Value,
    },
    Select {
        index: Value,
        values: Value,
    },
    Sub {
        template: String,
        variables: Option<Block>,
        refs: Vec<String>,
    },
    ImportValue(Value),
    Cidr {
        ip_block: Value,
        count: Value,
        cidr_bits: Value,
    },
    Transform {
        name: Value,
        parameters: Option<Block>,
    },
    Contains(Value, Value),
    EachMemberEquals(Value, Value),
    EachMemberIn(Value, Value),
    RefAll(Value),
    ValueOf {
        parameter: String,
        attribute: String,
    },
    ValueOfAll {
        parameter: String,
        attribute: String,
    },
}

impl Expr {
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    pub fn condition(name: impl Into<String>) -> Self {
        Self::Condition(name.into())
    }

    /// `Ref: AWS::NoValue`.
    pub fn no_value() -> Self {
        Self::Ref(NO_VALUE.to_string())
    }

    pub fn base64(value: impl Into<Value>) -> Self {
        Self::Base64(value.into())
    }

    pub fn find_in_map(
        map: impl Into<Value>,
        top_key: impl Into<Value>,
        second_key: impl Into<Value>,
    ) -> Self {
        Self::FindInMap {
            map: map.into(),
            top_key: top_key.into(),
            second_key: second_key.into(),
        }
    }

    pub fn get_att(resource: impl Into<String>, attribute: impl Into<Value>) -> Self {
        Self::GetAtt {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    pub fn get_azs(region: impl Into<Value>) -> Self {
        Self::GetAZs(region.into())
    }

    pub fn join(delimiter: impl Into<Value>, values: impl Into<Value>) -> Self {
        Self::Join {
            delimiter: delimiter.into(),
            values: values.into(),
        }
    }

    pub fn split(delimiter: impl Into<Value>, source: impl Into<Value>) -> Self {
        Self::Split {
            delimiter: delimiter.into(),
            source: source.into(),
        }
    }

    /// `Fn::And`, which takes between 2 and 10 conditions.
    pub fn and(conditions: Vec<Value>) -> DslResult<Self> {
        check_operands("Fn::And", &conditions)?;
        Ok(Self::And(conditions))
    }

    /// `Fn::Or`, which takes between 2 and 10 conditions.
    pub fn or(conditions: Vec<Value>) -> DslResult<Self> {
        check_operands("Fn::Or", &conditions)?;
        Ok(Self::Or(conditions))
    }

    /// `Fn::Not`. A single operand is wrapped into the one-element list the wire format expects.
    pub fn not(condition: impl Into<Value>) -> Self {
        match condition.into() {
            Value::List(items) => Self::Not(items),
            other => Self::Not(vec![other]),
        }
    }

    pub fn equals(left: impl Into<Value>, right: impl Into<Value>) -> Self {
        Self::Equals(left.into(), right.into())
    }

    pub fn if_(
        condition: impl Into<String>,
        then: impl Into<Value>,
        otherwise: impl Into<Value>,
    ) -> Self {
        Self::If {
            condition: condition.into(),
            then: then.into(),
            otherwise: otherwise.into(),
        }
    }

    pub fn select(index: impl Into<Value>, values: impl Into<Value>) -> Self {
        Self::Select {
            index: index.into(),
            values: values.into(),
        }
    }

    /// `Fn::Sub`. Placeholders are scanned up front so the template string
    /// contributes its names to reference checking; names bound by
    /// `variables` are local and are dropped.
    pub fn sub(template: impl Into<String>, variables: Option<Value>) -> DslResult<Self> {
        let template = template.into();
        let variables = match variables {
            None => None,
            Some(Value::Object(block)) => Some(block),
            Some(other) => {
                return Err(DslError::invalid_argument(
                    "Fn::Sub",
                    format!("the second argument must be a map, got {}", other.kind_name()),
                ))
            }
        };

        let refs = SUB_PLACEHOLDER
            .captures_iter(&template)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().split('.').next().unwrap_or_default().to_string())
            .filter(|name| {
                variables
                    .as_ref()
                    .map_or(true, |vars| !vars.attributes().contains(name))
            })
            .collect();

        Ok(Self::Sub {
            template,
            variables,
            refs,
        })
    }

    pub fn import_value(value: impl Into<Value>) -> Self {
        Self::ImportValue(value.into())
    }

    pub fn cidr(
        ip_block: impl Into<Value>,
        count: impl Into<Value>,
        cidr_bits: impl Into<Value>,
    ) -> Self {
        Self::Cidr {
            ip_block: ip_block.into(),
            count: count.into(),
            cidr_bits: cidr_bits.into(),
        }
    }

    /// `Fn::Transform`. Empty parameters are left out of the output.
    pub fn transform(name: impl Into<Value>, parameters: Option<Block>) -> Self {
        Self::Transform {
            name: name.into(),
            parameters: parameters.filter(|p| !p.is_empty()),
        }
    }

    pub fn contains(list: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self::Contains(list.into(), value.into())
    }

    pub fn each_member_equals(list: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self::EachMemberEquals(list.into(), value.into())
    }

    pub fn each_member_in(to_check: impl Into<Value>, to_match: impl Into<Value>) -> Self {
        Self::EachMemberIn(to_check.into(), to_match.into())
    }

    pub fn ref_all(parameter_type: impl Into<Value>) -> Self {
        Self::RefAll(parameter_type.into())
    }

    /// `Fn::ValueOf`. Both arguments must be literal strings.
    pub fn value_of(parameter: impl Into<Value>, attribute: impl Into<Value>) -> DslResult<Self> {
        let (parameter, attribute) =
            literal_pair("Fn::ValueOf", parameter.into(), attribute.into())?;
        Ok(Self::ValueOf {
            parameter,
            attribute,
        })
    }

    /// `Fn::ValueOfAll`. Both arguments must be literal strings.
    pub fn value_of_all(
        parameter: impl Into<Value>,
        attribute: impl Into<Value>,
    ) -> DslResult<Self> {
        let (parameter, attribute) =
            literal_pair("Fn::ValueOfAll", parameter.into(), attribute.into())?;
        Ok(Self::ValueOfAll {
            parameter,
            attribute,
        })
    }

    /// The key this node serializes under.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ref(_) => "Ref",
            Self::Condition(_) => "Condition",
            Self::Base64(_) => "Fn::Base64",
            Self::FindInMap { .. } => "Fn::FindInMap",
            Self::GetAtt { .. } => "Fn::GetAtt",
            Self::GetAZs(_) => "Fn::GetAZs",
            Self::Join { .. } => "Fn::Join",
            Self::Split { .. } => "Fn::Split",
            Self::And(_) => "Fn::And",
            Self::Or(_) => "Fn::Or",
            Self::Not(_) => "Fn::Not",
            Self::Equals(..) => "Fn::Equals",
            Self::If { .. } => "Fn::If",
            Self::Select { .. } => "Fn::Select",
            Self::Sub { .. } => "Fn::Sub",
            Self::ImportValue(_) => "Fn::ImportValue",
            Self::Cidr { .. } => "Fn::Cidr",
            Self::Transform { .. } => "Fn::Transform",
            Self::Contains(..) => "Fn::Contains",
            Self::EachMemberEquals(..) => "Fn::EachMemberEquals",
            Self::EachMemberIn(..) => "Fn::EachMemberIn",
            Self::RefAll(_) => "Fn::RefAll",
            Self::ValueOf { .. } => "Fn::ValueOf",
            Self::ValueOfAll { .. } => "Fn::ValueOfAll",
        }
    }

    /// Names this node references directly, not counting its arguments.
    pub fn refs(&self, kind: RefKind) -> Vec<&str> {
        match (kind, self) {
            (RefKind::All, Self::Ref(name)) => vec![name.as_str()],
            (RefKind::All, Self::GetAtt { resource, .. }) => vec![resource.as_str()],
            (RefKind::All, Self::Sub { refs, .. }) => refs.iter().map(String::as_str).collect(),
            (RefKind::Condition, Self::Condition(name)) => vec![name.as_str()],
            (RefKind::Condition, Self::If { condition, .. }) => vec![condition.as_str()],
            _ => Vec::new(),
        }
    }

    /// Argument values that may hold further expressions.
    pub fn children(&self) -> Vec<&Value> {
        match self {
            Self::Ref(_)
            | Self::Condition(_)
            | Self::ValueOf { .. }
            | Self::ValueOfAll { .. } => Vec::new(),
            Self::Base64(v) | Self::GetAZs(v) | Self::ImportValue(v) | Self::RefAll(v) => vec![v],
            Self::FindInMap {
                map,
                top_key,
                second_key,
            } => vec![map, top_key, second_key],
            Self::GetAtt { attribute, .. } => vec![attribute],
            Self::Join { delimiter, values } => vec![delimiter, values],
            Self::Split { delimiter, source } => vec![delimiter, source],
            Self::And(items) | Self::Or(items) | Self::Not(items) => items.iter().collect(),
            Self::Equals(a, b)
            | Self::Contains(a, b)
            | Self::EachMemberEquals(a, b)
            | Self::EachMemberIn(a, b) => vec![a, b],
            Self::If {
                then, otherwise, ..
            } => vec![then, otherwise],
            Self::Select { index, values } => vec![index, values],
            Self::Sub { variables, .. } => variables
                .iter()
                .flat_map(|vars| vars.attributes().values())
                .collect(),
            Self::Cidr {
                ip_block,
                count,
                cidr_bits,
            } => vec![ip_block, count, cidr_bits],
            Self::Transform { name, parameters } => {
                let mut children = vec![name];
                children.extend(parameters.iter().flat_map(|p| p.attributes().values()));
                children
            }
        }
    }
}

fn check_operands(function: &'static str, operands: &[Value]) -> DslResult<()> {
    if operands.len() < MIN_OPERANDS || operands.len() > MAX_OPERANDS {
        return Err(DslError::invalid_argument(
            function,
            format!(
                "the array must have at least {} elements and no more than {}, got {}",
                MIN_OPERANDS,
                MAX_OPERANDS,
                operands.len()
            ),
        ));
    }
    Ok(())
}

fn literal_pair(
    function: &'static str,
    first: Value,
    second: Value,
) -> DslResult<(String, String)> {
    match (first, second) {
        (Value::String(first), Value::String(second)) => Ok((first, second)),
        _ => Err(DslError::invalid_argument(
            function,
            "cannot use functions within, both arguments must be literal strings",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_requires_two_to_ten_operands() {
        assert!(Expr::and(vec![Expr::condition("A").into()]).is_err());
        assert!(Expr::and(vec![Expr::condition("A").into(), Expr::condition("B").into()]).is_ok());

        let eleven: Vec<Value> = (0..11)
            .map(|i| Expr::condition(format!("C{}", i)).into())
            .collect();
        let err = Expr::or(eleven).unwrap_err();
        assert!(err.to_string().contains("Fn::Or"));
    }

    #[test]
    fn test_not_wraps_single_operand() {
        assert_eq!(
            Expr::not(Expr::condition("A")),
            Expr::Not(vec![Expr::condition("A").into()])
        );
    }

    #[test]
    fn test_sub_scans_placeholders() {
        let expr = Expr::sub(
            "arn:${AWS::Partition}:s3:::${Bucket}/${Key.Arn}/${!Literal}",
            None,
        )
        .unwrap();
        assert_eq!(expr.refs(RefKind::All), vec!["AWS::Partition", "Bucket", "Key"]);
        assert!(expr.refs(RefKind::Condition).is_empty());
    }

    #[test]
    fn test_sub_drops_local_variables() {
        let vars = Value::from(serde_json::json!({ "Key": "value" }));
        let expr = Expr::sub("${Bucket}-${Key}", Some(vars)).unwrap();
        assert_eq!(expr.refs(RefKind::All), vec!["Bucket"]);
    }

    #[test]
    fn test_sub_rejects_non_map_variables() {
        assert!(Expr::sub("${A}", Some(Value::from("nope"))).is_err());
    }

    #[test]
    fn test_if_contributes_condition_only() {
        let expr = Expr::if_("IsProd", Expr::reference("Big"), Expr::no_value());
        assert_eq!(expr.refs(RefKind::Condition), vec!["IsProd"]);
        assert!(expr.refs(RefKind::All).is_empty());
        assert_eq!(expr.children().len(), 2);
    }

    #[test]
    fn test_value_of_requires_literals() {
        assert!(Expr::value_of("Param", "Tags").is_ok());
        assert!(Expr::value_of(Expr::reference("Param"), "Tags").is_err());
        assert!(Expr::value_of_all("Param", 3).is_err());
    }

    #[test]
    fn test_pseudo_parameters() {
        assert!(is_pseudo_parameter("AWS::Region"));
        assert!(is_pseudo_parameter(NO_VALUE));
        assert!(!is_pseudo_parameter("AWS::Nope"));
    }
}
