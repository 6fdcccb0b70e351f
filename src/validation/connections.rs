//! Connection integrity: self-loops and exec/data pin mix-ups.
//!
//! The editor normally refuses both while dragging, but intermediate states
//! and hand-edited files can still contain them.

use super::{Rule, ValidationIssue, MIXED_CONNECTION, SELF_LOOP};
use crate::error::RuleError;
use crate::graph::{pins, Graph};
use crate::validation::Severity;

pub struct ConnectionRule;

impl Rule for ConnectionRule {
    fn id(&self) -> &str {
        SELF_LOOP
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationIssue>, RuleError> {
        let mut issues = Vec::new();

        for connection in graph.connections() {
            let Some(source) = graph.node(&connection.source) else {
                continue;
            };

            if connection.source == connection.target {
                issues.push(ValidationIssue::for_node(
                    SELF_LOOP,
                    source,
                    Severity::Error,
                    format!(
                        "'{}' is connected to itself ({} -> {}).",
                        source.label, connection.source_output, connection.target_input
                    ),
                ));
                continue;
            }

            if pins::is_exec_pin(&connection.source_output)
                != pins::is_exec_pin(&connection.target_input)
            {
                issues.push(ValidationIssue::for_node(
                    MIXED_CONNECTION,
                    source,
                    Severity::Error,
                    format!(
                        "Connection {}.{} -> {}.{} joins an execution pin to a data pin.",
                        connection.source,
                        connection.source_output,
                        connection.target,
                        connection.target_input
                    ),
                ));
            }
        }

        Ok(issues)
    }
}
