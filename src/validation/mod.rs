//! # Blueprint Validation
//!
//! Advisory checks over a [`Graph`]. Validation never blocks compilation; it
//! produces a list of [`ValidationIssue`]s the editor shows next to the nodes.
//!
//! ## Rules
//!
//! | Rule | Issues |
//! |------|--------|
//! | [`CycleRule`] | `cycle-detected` (error, or warning through a Wait) |
//! | [`ReachabilityRule`] | `unreachable-code`, `no-entry-point` |
//! | [`RequiredInputRule`] | `missing-input`, `custom-validation` |
//! | [`ConnectionRule`] | `self-loop`, `mixed-connection` |
//!
//! Rules run in registration order and each one is isolated: a rule that
//! fails turns into a single `validator-internal-error` issue and the rest
//! still report.

mod connections;
mod cycles;
mod reachability;
mod required_inputs;

pub use connections::ConnectionRule;
pub use cycles::CycleRule;
pub use reachability::ReachabilityRule;
pub use required_inputs::RequiredInputRule;

use crate::error::RuleError;
use crate::graph::{Graph, Node};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

pub const CYCLE_DETECTED: &str = "cycle-detected";
pub const UNREACHABLE_CODE: &str = "unreachable-code";
pub const NO_ENTRY_POINT: &str = "no-entry-point";
pub const MISSING_INPUT: &str = "missing-input";
pub const CUSTOM_VALIDATION: &str = "custom-validation";
pub const SELF_LOOP: &str = "self-loop";
pub const MIXED_CONNECTION: &str = "mixed-connection";
pub const INTERNAL_ERROR: &str = "validator-internal-error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One advisory annotation on the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Stable within a pass: `<ruleId>:<nodeId or "graph">:<n>`.
    pub id: String,
    pub node_id: Option<String>,
    pub node_label: Option<String>,
    pub severity: Severity,
    pub message: String,
    pub rule_id: String,
}

impl ValidationIssue {
    pub fn for_node(
        rule_id: &str,
        node: &Node,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            node_id: Some(node.id.clone()),
            node_label: Some(node.label.clone()),
            severity,
            message: message.into(),
            rule_id: rule_id.to_string(),
        }
    }

    pub fn global(rule_id: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            node_id: None,
            node_label: None,
            severity,
            message: message.into(),
            rule_id: rule_id.to_string(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.node_label, &self.node_id) {
            (Some(label), Some(id)) => write!(
                f,
                "[{}] {} ({}): {} ({})",
                self.severity, label, id, self.message, self.rule_id
            ),
            _ => write!(f, "[{}] {} ({})", self.severity, self.message, self.rule_id),
        }
    }
}

/// Issue counts per severity, for the editor's status bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl IssueSummary {
    pub fn of(issues: &[ValidationIssue]) -> Self {
        let mut summary = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
        }
        summary
    }
}

/// Which built-in rules run. Every check is on unless switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationOptions {
    pub check_cycles: bool,
    pub check_reachability: bool,
    pub check_required_inputs: bool,
    pub check_connections: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_cycles: true,
            check_reachability: true,
            check_required_inputs: true,
            check_connections: true,
        }
    }
}

/// A single, independent check over the whole graph.
pub trait Rule {
    fn id(&self) -> &str;
    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationIssue>, RuleError>;
}

/// Runs an ordered list of rules and merges their issues.
pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
}

impl Validator {
    /// The built-in rules selected by `options`, in their fixed order.
    pub fn new(options: &ValidationOptions) -> Self {
        let mut rules: Vec<Box<dyn Rule>> = Vec::new();
        if options.check_cycles {
            rules.push(Box::new(CycleRule));
        }
        if options.check_reachability {
            rules.push(Box::new(ReachabilityRule));
        }
        if options.check_required_inputs {
            rules.push(Box::new(RequiredInputRule));
        }
        if options.check_connections {
            rules.push(Box::new(ConnectionRule));
        }
        Self { rules }
    }

    /// Appends a rule after the built-ins.
    pub fn with_rule(mut self, rule: Box<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    pub fn run(&self, graph: &Graph) -> Vec<ValidationIssue> {
        tracing::info!(
            "[BBGC] Validating graph ({} nodes, {} connections, {} rules)",
            graph.nodes().len(),
            graph.connections().len(),
            self.rules.len()
        );

        let mut issues = Vec::new();
        for rule in &self.rules {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.validate(graph)))
                .unwrap_or_else(|payload| {
                    Err(RuleError::new(rule.id(), panic_message(payload.as_ref())))
                });

            match outcome {
                Ok(found) => {
                    tracing::debug!("[BBGC] Rule '{}' reported {} issues", rule.id(), found.len());
                    issues.extend(found);
                }
                Err(err) => {
                    tracing::error!("[BBGC] {}", err);
                    issues.push(ValidationIssue::global(
                        INTERNAL_ERROR,
                        Severity::Error,
                        format!("Validation rule '{}' failed: {}", err.rule_id, err.message),
                    ));
                }
            }
        }

        assign_ids(&mut issues);
        issues
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&ValidationOptions::default())
    }
}

/// Runs the built-in rules selected by `options`.
pub fn validate_graph(graph: &Graph, options: &ValidationOptions) -> Vec<ValidationIssue> {
    Validator::new(options).run(graph)
}

/// Whether an input is fed by a connection or holds a non-blank literal.
pub(crate) fn is_input_satisfied(graph: &Graph, node: &Node, key: &str) -> bool {
    graph.is_input_connected(&node.id, key) || node.has_literal(key)
}

pub(crate) fn describe(node: &Node) -> String {
    format!("'{}' ({})", node.label, node.id)
}

fn assign_ids(issues: &mut [ValidationIssue]) {
    let mut counters: BTreeMap<(String, String), usize> = BTreeMap::new();
    for issue in issues.iter_mut() {
        let scope = issue.node_id.clone().unwrap_or_else(|| "graph".to_string());
        let counter = counters
            .entry((issue.rule_id.clone(), scope.clone()))
            .or_insert(0);
        issue.id = format!("{}:{}:{}", issue.rule_id, scope, counter);
        *counter += 1;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "rule panicked".to_string()
    }
}
