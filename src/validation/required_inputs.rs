//! Required input checks plus each node type's own validation hook.

use super::{is_input_satisfied, Rule, ValidationIssue, CUSTOM_VALIDATION, MISSING_INPUT};
use crate::error::RuleError;
use crate::graph::Graph;
use crate::metadata::NodeKind;
use crate::validation::Severity;

pub struct RequiredInputRule;

impl Rule for RequiredInputRule {
    fn id(&self) -> &str {
        MISSING_INPUT
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationIssue>, RuleError> {
        let mut issues = Vec::new();

        for node in graph.nodes() {
            for key in &node.required_inputs {
                if is_input_satisfied(graph, node, key) {
                    continue;
                }
                let message = node
                    .required_messages
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| format!("Input '{}' is required.", key));
                issues.push(ValidationIssue::for_node(
                    MISSING_INPUT,
                    node,
                    Severity::Warning,
                    message,
                ));
            }

            if let Some(kind) = NodeKind::of(node) {
                for finding in kind.validate(node, graph) {
                    issues.push(ValidationIssue::for_node(
                        CUSTOM_VALIDATION,
                        node,
                        finding.severity,
                        finding.message,
                    ));
                }
            }
        }

        Ok(issues)
    }
}
