//! # Errors
//!
//! Hard failures of the compiler. Semantic problems with a graph (cycles,
//! unreachable nodes, missing inputs) are never errors; they are reported as
//! [`ValidationIssue`](crate::validation::ValidationIssue)s instead.

use thiserror::Error;

/// Errors raised while turning a serialized graph into a [`Graph`](crate::graph::Graph).
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Failed to parse graph JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Node id '{0}' is used by more than one node")]
    DuplicateNodeId(String),

    #[error(
        "Pin '{pin}' on node '{node_id}' is declared as {declared}, but its name marks it as {expected}"
    )]
    PinKindMismatch {
        node_id: String,
        pin: String,
        declared: &'static str,
        expected: &'static str,
    },
}

/// Errors that abort a compilation pass.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Node '{node_id}' has an unknown node type '{label}'")]
    UnknownNodeType { node_id: String, label: String },

    #[error("Node '{node_id}' ({label}) cannot be used as {role}")]
    NoEmissionRule {
        node_id: String,
        label: String,
        role: &'static str,
    },
}

impl CompileError {
    /// The id of the node that caused the failure, if there is one.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            CompileError::Graph(_) => None,
            CompileError::UnknownNodeType { node_id, .. }
            | CompileError::NoEmissionRule { node_id, .. } => Some(node_id),
        }
    }
}

/// Failure inside a single validation rule.
///
/// The validator never propagates this; it becomes one
/// `validator-internal-error` issue so the other rules still report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Rule '{rule_id}' failed: {message}")]
pub struct RuleError {
    pub rule_id: String,
    pub message: String,
}

impl RuleError {
    pub fn new(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }
}
