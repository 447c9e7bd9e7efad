//! Named conditions.

use crate::entity::Entity;
use crate::references::RefKind;
use crate::value::Value;

/// A named condition wrapping a single expression.
///
/// A condition whose expression is a bare string refers to another condition
/// by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    expression: Value,
}

impl Condition {
    pub fn new(expression: impl Into<Value>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    pub fn expression(&self) -> &Value {
        &self.expression
    }
}

impl Entity for Condition {
    fn extra_refs(&self, kind: RefKind) -> Vec<String> {
        match (kind, &self.expression) {
            (RefKind::Condition, Value::String(name)) => vec![name.clone()],
            _ => Vec::new(),
        }
    }

    fn ref_children(&self) -> Vec<&Value> {
        vec![&self.expression]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::references::collect_refs;

    #[test]
    fn test_condition_refs() {
        let condition = Condition::new(
            Expr::and(vec![
                Expr::condition("IsProd").into(),
                Expr::equals(Expr::reference("Region"), "eu-west-1").into(),
            ])
            .unwrap(),
        );
        assert_eq!(collect_refs(&condition, RefKind::Condition), vec!["IsProd"]);
        assert_eq!(collect_refs(&condition, RefKind::All), vec!["Region"]);
    }

    #[test]
    fn test_bare_name_is_condition_ref() {
        let condition = Condition::new("Other");
        assert_eq!(collect_refs(&condition, RefKind::Condition), vec!["Other"]);
    }
}
