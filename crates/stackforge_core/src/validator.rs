//! Reference validation.
//!
//! Each pass checks one section for one kind of reference against a fixed
//! list of target tables:
//!
//! | Section    | Kind      | Targets                                   |
//! |------------|-----------|-------------------------------------------|
//! | Conditions | condition | Conditions                                |
//! | Conditions | all       | pseudo parameters, Parameters             |
//! | Resources  | all       | Resources, pseudo parameters, Parameters  |
//! | Resources  | condition | Conditions                                |
//! | Outputs    | all       | Resources, pseudo parameters, Parameters  |
//! | Outputs    | condition | Conditions                                |
//! | Rules      | all       | Resources, pseudo parameters, Parameters  |
//! | Rules      | condition | Conditions                                |
//!
//! A pass whose first table is the section itself is self-referential: a
//! reference to the entity's own name is reported on its own, and once every
//! reference resolves the remaining graph must be acyclic.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::expr::is_pseudo_parameter;
use crate::references::RefKind;
use crate::template::{Section, Template};

static LOGICAL_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

/// A table of names a reference may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Section(Section),
    PseudoParameters,
}

/// One section checked for one kind of reference.
#[derive(Debug, Clone, Copy)]
pub struct Pass {
    pub section: Section,
    pub kind: RefKind,
    pub targets: &'static [Target],
}

impl Pass {
    pub fn is_self_referential(&self) -> bool {
        self.targets.first() == Some(&Target::Section(self.section))
    }
}

const VALUE_TARGETS: &[Target] = &[
    Target::Section(Section::Resources),
    Target::PseudoParameters,
    Target::Section(Section::Parameters),
];

const CONDITION_TARGETS: &[Target] = &[Target::Section(Section::Conditions)];

/// Every pass, in the order it runs.
pub const PASSES: [Pass; 8] = [
    Pass {
        section: Section::Conditions,
        kind: RefKind::Condition,
        targets: CONDITION_TARGETS,
    },
    Pass {
        section: Section::Conditions,
        kind: RefKind::All,
        targets: &[Target::PseudoParameters, Target::Section(Section::Parameters)],
    },
    Pass {
        section: Section::Resources,
        kind: RefKind::All,
        targets: VALUE_TARGETS,
    },
    Pass {
        section: Section::Resources,
        kind: RefKind::Condition,
        targets: CONDITION_TARGETS,
    },
    Pass {
        section: Section::Outputs,
        kind: RefKind::All,
        targets: VALUE_TARGETS,
    },
    Pass {
        section: Section::Outputs,
        kind: RefKind::Condition,
        targets: CONDITION_TARGETS,
    },
    Pass {
        section: Section::Rules,
        kind: RefKind::All,
        targets: VALUE_TARGETS,
    },
    Pass {
        section: Section::Rules,
        kind: RefKind::Condition,
        targets: CONDITION_TARGETS,
    },
];

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    MalformedName {
        section: Section,
        name: String,
    },
    SelfReference {
        section: Section,
        name: String,
    },
    NullReference {
        section: Section,
        name: String,
    },
    InvalidReference {
        section: Section,
        referrers: Vec<String>,
        kind: RefKind,
        name: String,
    },
    CyclicReference {
        section: Section,
        group: Vec<String>,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::MalformedName { section, name } => {
                write!(f, "{} name: {} is invalid logical id", section.singular(), name)
            }
            Finding::SelfReference { section, name } => {
                write!(f, "{} {} references itself", section.singular(), name)
            }
            Finding::NullReference { section, name } => {
                write!(f, "{} {} contains null value reference", section.singular(), name)
            }
            Finding::InvalidReference {
                section,
                referrers,
                kind,
                name,
            } => write!(
                f,
                "Invalid Reference: {} [{}] refer to unknown {} {}",
                section,
                referrers.join(", "),
                kind.target_noun(),
                name
            ),
            Finding::CyclicReference { section, group } => {
                write!(f, "Cyclic references found in {}: {}", section, group.join(", "))
            }
        }
    }
}

/// Every finding from one validation run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} errors in template\n{}", .findings.len(), render(.findings))]
pub struct ValidationFailure {
    findings: Vec<Finding>,
}

impl ValidationFailure {
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

fn render(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(Finding::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Referenced name to the entities that reference it, in first-seen order.
#[derive(Debug, Default)]
pub struct RefGraph {
    referred_by: IndexMap<String, Vec<String>>,
}

impl RefGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: &str, referrer: &str) {
        let referrers = self.referred_by.entry(target.to_string()).or_default();
        if !referrers.iter().any(|r| r == referrer) {
            referrers.push(referrer.to_string());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.referred_by
            .iter()
            .map(|(target, referrers)| (target.as_str(), referrers.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.referred_by.is_empty()
    }

    /// Groups of names that reference each other in a loop.
    ///
    /// Strongly connected components with more than one member, or a single
    /// member that references itself. Members are listed in the order the
    /// graph first saw them.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (target, referrers) in &self.referred_by {
            graph.add_node(target.as_str());
            for referrer in referrers {
                graph.add_edge(target.as_str(), referrer.as_str(), ());
            }
        }

        let order: Vec<&str> = graph.nodes().collect();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap_or(usize::MAX);

        tarjan_scc(&graph)
            .into_iter()
            .filter(|group| group.len() > 1 || graph.contains_edge(group[0], group[0]))
            .map(|mut group| {
                group.sort_by_key(|member| position(*member));
                group.into_iter().map(str::to_string).collect()
            })
            .collect()
    }
}

/// Runs every pass over a template.
pub struct TemplateValidator<'a> {
    template: &'a Template,
}

impl<'a> TemplateValidator<'a> {
    pub fn new(template: &'a Template) -> Self {
        Self { template }
    }

    /// All findings, duplicates removed, in pass order.
    pub fn check(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        for pass in &PASSES {
            findings.extend(self.check_pass(pass));
        }
        findings.extend(self.check_names());

        let mut unique: Vec<Finding> = Vec::with_capacity(findings.len());
        for finding in findings {
            if !unique.contains(&finding) {
                unique.push(finding);
            }
        }
        unique
    }

    /// `Ok` when there are no findings, otherwise all of them at once.
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        let findings = self.check();
        if findings.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure { findings })
        }
    }

    /// Resource logical ids must be alphanumeric.
    pub fn check_names(&self) -> Vec<Finding> {
        self.template
            .resources()
            .keys()
            .filter(|name| !LOGICAL_ID.is_match(name))
            .map(|name| Finding::MalformedName {
                section: Section::Resources,
                name: name.clone(),
            })
            .collect()
    }

    pub fn check_pass(&self, pass: &Pass) -> Vec<Finding> {
        let self_check = pass.is_self_referential();
        let mut findings = Vec::new();
        let mut graph = RefGraph::new();
        let entries = self.template.section_refs(pass.section, pass.kind);
        let position = |name: &str| {
            entries
                .iter()
                .position(|(entry, _)| *entry == name)
                .unwrap_or(usize::MAX)
        };

        for (name, refs) in &entries {
            let name = *name;
            for reference in refs {
                if self_check && reference.as_str() == name {
                    findings.push(Finding::SelfReference {
                        section: pass.section,
                        name: name.to_string(),
                    });
                } else if reference.is_empty() {
                    findings.push(Finding::NullReference {
                        section: pass.section,
                        name: name.to_string(),
                    });
                } else {
                    graph.add(reference, name);
                }
            }
        }

        let mut unresolved = 0;
        for (target, referrers) in graph.iter() {
            if !self.resolves(target, pass.targets) {
                unresolved += 1;
                findings.push(Finding::InvalidReference {
                    section: pass.section,
                    referrers: referrers.to_vec(),
                    kind: pass.kind,
                    name: target.to_string(),
                });
            }
        }

        // Self and null references are already out of the graph.
        if self_check && unresolved == 0 {
            for mut group in graph.cycles() {
                group.sort_by_key(|member| position(member));
                findings.push(Finding::CyclicReference {
                    section: pass.section,
                    group,
                });
            }
        }

        debug!(
            "Checked {} {:?} references: {} findings",
            pass.section,
            pass.kind,
            findings.len()
        );
        findings
    }

    fn resolves(&self, name: &str, targets: &[Target]) -> bool {
        targets.iter().any(|target| match target {
            Target::PseudoParameters => is_pseudo_parameter(name),
            Target::Section(section) => self.template.contains(*section, name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_without_cycle() {
        let mut graph = RefGraph::new();
        graph.add("B", "A");
        graph.add("C", "B");
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_graph_two_node_cycle() {
        let mut graph = RefGraph::new();
        graph.add("B", "A");
        graph.add("A", "B");
        graph.add("A", "C");
        assert_eq!(graph.cycles(), vec![vec!["B".to_string(), "A".to_string()]]);
    }

    #[test]
    fn test_graph_separate_cycles() {
        let mut graph = RefGraph::new();
        graph.add("B", "A");
        graph.add("A", "B");
        graph.add("D", "C");
        graph.add("E", "D");
        graph.add("C", "E");
        let cycles = graph.cycles();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().any(|c| c.len() == 3 && c.contains(&"E".to_string())));
    }

    #[test]
    fn test_graph_self_loop_is_a_cycle() {
        let mut graph = RefGraph::new();
        graph.add("A", "A");
        graph.add("C", "B");
        assert_eq!(graph.cycles(), vec![vec!["A".to_string()]]);
    }

    #[test]
    fn test_referrers_are_unique() {
        let mut graph = RefGraph::new();
        graph.add("Vpc", "Subnet");
        graph.add("Vpc", "Subnet");
        let (_, referrers) = graph.iter().next().unwrap();
        assert_eq!(referrers, ["Subnet".to_string()]);
    }

    #[test]
    fn test_self_referential_passes() {
        let self_referential: Vec<_> = PASSES
            .iter()
            .filter(|p| p.is_self_referential())
            .map(|p| (p.section, p.kind))
            .collect();
        assert_eq!(
            self_referential,
            vec![
                (Section::Conditions, RefKind::Condition),
                (Section::Resources, RefKind::All)
            ]
        );
    }

    #[test]
    fn test_failure_message() {
        let failure = ValidationFailure {
            findings: vec![Finding::MalformedName {
                section: Section::Resources,
                name: "my_instance".to_string(),
            }],
        };
        assert_eq!(
            failure.to_string(),
            "1 errors in template\nResource name: my_instance is invalid logical id"
        );
    }
}
