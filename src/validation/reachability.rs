//! Unreachable statement detection.
//!
//! 1. Forward: everything reachable from an entry over execution edges.
//! 2. Backward: everything feeding a reachable node a value, transitively.
//! 3. Every node with an execution input left outside that set is dead.
//!
//! Pure value nodes are never flagged; an unused constant is not dead code.

use super::{describe, Rule, ValidationIssue, NO_ENTRY_POINT, UNREACHABLE_CODE};
use crate::error::RuleError;
use crate::graph::Graph;
use crate::validation::Severity;
use ahash::AHashSet;
use std::collections::VecDeque;

pub struct ReachabilityRule;

impl Rule for ReachabilityRule {
    fn id(&self) -> &str {
        UNREACHABLE_CODE
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationIssue>, RuleError> {
        let entries: Vec<&str> = graph.entry_nodes().map(|n| n.id.as_str()).collect();
        if entries.is_empty() {
            return Ok(vec![ValidationIssue::global(
                NO_ENTRY_POINT,
                Severity::Warning,
                "This blueprint has no entry points (event, command or function), so it produces no behavior.",
            )]);
        }

        let mut reachable: AHashSet<&str> = AHashSet::new();

        let mut frontier: VecDeque<&str> = entries.iter().copied().collect();
        while let Some(id) = frontier.pop_front() {
            if !reachable.insert(id) {
                continue;
            }
            for connection in graph.outgoing(id).filter(|c| c.is_exec()) {
                if !reachable.contains(connection.target.as_str()) {
                    frontier.push_back(&connection.target);
                }
            }
        }

        let mut frontier: VecDeque<&str> = reachable.iter().copied().collect();
        while let Some(id) = frontier.pop_front() {
            for connection in graph.incoming(id).filter(|c| !c.is_exec()) {
                if reachable.insert(&connection.source) {
                    frontier.push_back(&connection.source);
                }
            }
        }

        let issues = graph
            .nodes()
            .iter()
            .filter(|node| node.has_exec_input() && !reachable.contains(node.id.as_str()))
            .map(|node| {
                ValidationIssue::for_node(
                    UNREACHABLE_CODE,
                    node,
                    Severity::Warning,
                    format!(
                        "{} is never executed: it is not connected to any event, command or function.",
                        describe(node)
                    ),
                )
            })
            .collect();

        Ok(issues)
    }
}
