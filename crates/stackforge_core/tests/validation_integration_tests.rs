//! Integration tests for reference validation.

use stackforge_core::{DslError, Expr, Finding, RefKind, Section, Template, Value};

fn condition_cycle() -> Template {
    let mut template = Template::new();
    template.condition("A", Expr::not(Expr::condition("B")));
    template.condition("B", Expr::not(Expr::condition("A")));
    template
}

/// Two conditions negating each other form one cycle.
#[test]
fn test_mutual_conditions_are_cyclic() {
    let findings = condition_cycle().findings();
    assert_eq!(
        findings,
        vec![Finding::CyclicReference {
            section: Section::Conditions,
            group: vec!["A".to_string(), "B".to_string()],
        }]
    );
    assert_eq!(
        findings[0].to_string(),
        "Cyclic references found in Conditions: A, B"
    );
}

/// Redefining one condition breaks the cycle.
#[test]
fn test_breaking_the_cycle_validates() {
    let mut template = condition_cycle();
    template.parameter("Env", |_| Ok(())).unwrap();
    template.condition("B", Expr::equals(Expr::reference("Env"), "prod"));
    assert!(template.findings().is_empty());
    assert!(template.validate().is_ok());
}

/// A resource depending on itself is a self reference, not a cycle.
#[test]
fn test_depends_on_self() {
    let mut template = Template::new();
    template
        .resource("R1", |r| {
            r.set_type("AWS::SNS::Topic")?;
            r.depends_on("R1");
            Ok(())
        })
        .unwrap();

    let findings = template.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].to_string(), "Resource R1 references itself");
}

fn depends_on(template: &mut Template, name: &str, dependency: &str) {
    template
        .resource(name, |r| {
            r.set_type("AWS::SNS::Topic")?;
            r.depends_on(dependency);
            Ok(())
        })
        .unwrap();
}

/// Two resources depending on each other form one cycle; removing an edge fixes it.
#[test]
fn test_depends_on_cycle() {
    let mut template = Template::new();
    depends_on(&mut template, "X", "Y");
    depends_on(&mut template, "Y", "X");

    let findings = template.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].to_string(),
        "Cyclic references found in Resources: X, Y"
    );

    template
        .typed_resource("Y", "AWS::SNS::Topic", |_| Ok(()))
        .unwrap();
    assert!(template.findings().is_empty());
    assert!(template.validate().is_ok());
}

/// A self reference does not hide a cycle elsewhere in the section.
#[test]
fn test_self_reference_and_cycle_reported_together() {
    let mut template = Template::new();
    depends_on(&mut template, "R1", "R1");
    depends_on(&mut template, "X", "Y");
    depends_on(&mut template, "Y", "X");

    assert_eq!(
        template.findings(),
        vec![
            Finding::SelfReference {
                section: Section::Resources,
                name: "R1".to_string(),
            },
            Finding::CyclicReference {
                section: Section::Resources,
                group: vec!["X".to_string(), "Y".to_string()],
            },
        ]
    );
}

/// Same for conditions: a condition negating itself and a separate loop.
#[test]
fn test_condition_self_reference_and_cycle() {
    let mut template = condition_cycle();
    template.condition("S", Expr::not(Expr::condition("S")));

    let findings: Vec<String> = template.findings().iter().map(ToString::to_string).collect();
    assert_eq!(
        findings,
        vec![
            "Condition S references itself",
            "Cyclic references found in Conditions: A, B",
        ]
    );
}

/// An unresolved reference still suppresses the cycle check.
#[test]
fn test_unknown_reference_skips_cycle_check() {
    let mut template = Template::new();
    depends_on(&mut template, "X", "Y");
    depends_on(&mut template, "Y", "X");
    depends_on(&mut template, "Z", "Missing");

    let findings = template.findings();
    assert_eq!(findings.len(), 1);
    assert!(matches!(&findings[0], Finding::InvalidReference { name, .. } if name == "Missing"));
}

/// Outputs may only refer to conditions that exist.
#[test]
fn test_output_with_unknown_condition() {
    let mut template = Template::new();
    template
        .output("O1", |o| {
            o.value("constant");
            o.condition("NoSuchCondition");
            Ok(())
        })
        .unwrap();

    let findings = template.findings();
    assert_eq!(
        findings,
        vec![Finding::InvalidReference {
            section: Section::Outputs,
            referrers: vec!["O1".to_string()],
            kind: RefKind::Condition,
            name: "NoSuchCondition".to_string(),
        }]
    );
    assert_eq!(
        findings[0].to_string(),
        "Invalid Reference: Outputs [O1] refer to unknown Condition NoSuchCondition"
    );
}

/// Pseudo parameters resolve without being declared.
#[test]
fn test_pseudo_parameters_resolve() {
    let mut template = Template::new();
    template
        .output("Where", |o| {
            o.value(Expr::join(
                ":",
                vec![
                    Value::from(Expr::reference("AWS::Region")),
                    Value::from(Expr::reference("AWS::AccountId")),
                ],
            ));
            Ok(())
        })
        .unwrap();
    assert!(template.findings().is_empty());
}

/// Conditions cannot refer to resources.
#[test]
fn test_condition_referencing_resource() {
    let mut template = Template::new();
    template
        .resource("Bucket", |r| {
            r.set_type("AWS::S3::Bucket")?;
            Ok(())
        })
        .unwrap();
    template.condition("HasBucket", Expr::equals(Expr::reference("Bucket"), "x"));

    let findings = template.findings();
    assert_eq!(findings.len(), 1);
    assert!(matches!(
        &findings[0],
        Finding::InvalidReference { section: Section::Conditions, kind: RefKind::All, name, .. }
            if name == "Bucket"
    ));
}

/// `Fn::If` contributes its condition name to condition checking only.
#[test]
fn test_if_is_a_condition_reference() {
    let mut template = Template::new();
    template
        .typed_resource("Web", "AWS::EC2::Instance", |r| {
            r.property(
                "InstanceType",
                Expr::if_("IsProd", "m5.large", Expr::no_value()),
            )?;
            Ok(())
        })
        .unwrap();

    let findings = template.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].to_string(),
        "Invalid Reference: Resources [Web] refer to unknown Condition IsProd"
    );

    template.condition("IsProd", Expr::equals(Expr::reference("AWS::Region"), "us-east-1"));
    assert!(template.findings().is_empty());
}

/// Resource names must be plain alphanumeric logical ids.
#[test]
fn test_malformed_resource_name() {
    let mut template = Template::new();
    template
        .resource("my-bucket", |r| {
            r.set_type("AWS::S3::Bucket")?;
            Ok(())
        })
        .unwrap();

    let findings = template.findings();
    assert_eq!(
        findings,
        vec![Finding::MalformedName {
            section: Section::Resources,
            name: "my-bucket".to_string(),
        }]
    );
}

/// Every referrer of an unknown name is reported in one finding.
#[test]
fn test_referrers_are_grouped() {
    let mut template = Template::new();
    for name in ["First", "Second"] {
        template
            .resource(name, |r| {
                r.set_type("AWS::SQS::Queue")?;
                r.property("RedrivePolicy", Expr::get_att("DeadLetter", "Arn"))?;
                Ok(())
            })
            .unwrap();
    }

    let findings = template.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].to_string(),
        "Invalid Reference: Resources [First, Second] refer to unknown Reference DeadLetter"
    );
}

/// `Fn::Sub` placeholders count as references unless bound locally.
#[test]
fn test_sub_placeholders() {
    let mut template = Template::new();
    let vars: stackforge_core::Block = [("Local", "value")].into_iter().collect();
    template
        .output("Url", |o| {
            o.value(Expr::sub(
                "https://${Api}.execute-api.${AWS::Region}/${Local}/${!Literal}",
                Some(vars.into()),
            )?);
            Ok(())
        })
        .unwrap();

    let findings = template.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].to_string(),
        "Invalid Reference: Outputs [Url] refer to unknown Reference Api"
    );
}

/// An empty name is reported as a null reference.
#[test]
fn test_null_reference() {
    let mut template = Template::new();
    template
        .resource("Topic", |r| {
            r.set_type("AWS::SNS::Topic")?;
            r.property("DisplayName", Expr::reference(""))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(
        template.findings()[0].to_string(),
        "Resource Topic contains null value reference"
    );
}

/// Validation reports every finding together.
#[test]
fn test_validate_aggregates_findings() {
    let mut template = Template::new();
    template
        .resource("bad_name", |r| {
            r.set_type("AWS::S3::Bucket")?;
            r.condition("Missing");
            Ok(())
        })
        .unwrap();

    match template.validate() {
        Err(DslError::Validation(failure)) => {
            assert_eq!(failure.len(), 2);
            let message = failure.to_string();
            assert!(message.starts_with("2 errors in template\n"));
            assert!(message.contains("refer to unknown Condition Missing"));
            assert!(message.contains("Resource name: bad_name is invalid logical id"));
        }
        other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
    }
}

/// Rules are checked against resources, parameters and conditions.
#[test]
fn test_rule_references() {
    let mut template = Template::service_catalog();
    template
        .parameter("Environment", |p| {
            p.allowed_values(vec!["dev", "prod"]);
            Ok(())
        })
        .unwrap();
    template
        .rule("ProdSize", |rule| {
            rule.rule_condition(Expr::equals(Expr::reference("Environment"), "prod"));
            rule.assert(
                "Size must be large",
                Expr::contains(vec!["m5.large"], Expr::reference("InstanceType")),
            )?;
            Ok(())
        })
        .unwrap();

    let findings = template.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].to_string(),
        "Invalid Reference: Rules [ProdSize] refer to unknown Reference InstanceType"
    );
}
