//! Execution cycle detection.
//!
//! Walks execution edges depth-first from every entry node with an explicit
//! stack, so very long chains cannot overflow the native stack. A back edge
//! into a node still on the path is a cycle, except when that node was left
//! through one of its loop-body pins: that edge is the loop re-entering its
//! own header.

use super::{describe, Rule, ValidationIssue, CYCLE_DETECTED};
use crate::error::RuleError;
use crate::graph::{pins, Graph};
use crate::metadata::NodeKind;
use crate::validation::Severity;
use ahash::{AHashMap, AHashSet};

pub struct CycleRule;

struct Frame<'g> {
    node: &'g str,
    edges: Vec<(&'g str, &'g str)>,
    next: usize,
    /// Pin of the edge most recently followed out of this node.
    via: Option<&'g str>,
}

impl<'g> Frame<'g> {
    fn new(graph: &'g Graph, node: &'g str) -> Self {
        let edges = graph
            .outgoing(node)
            .filter(|c| c.is_exec())
            .map(|c| (c.source_output.as_str(), c.target.as_str()))
            .collect();
        Self {
            node,
            edges,
            next: 0,
            via: None,
        }
    }
}

impl Rule for CycleRule {
    fn id(&self) -> &str {
        CYCLE_DETECTED
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationIssue>, RuleError> {
        let mut issues = Vec::new();
        let mut visited: AHashSet<&str> = AHashSet::new();

        for entry in graph.entry_nodes() {
            if !visited.insert(entry.id.as_str()) {
                continue;
            }

            let mut stack = vec![Frame::new(graph, &entry.id)];
            let mut on_stack: AHashMap<&str, usize> = AHashMap::new();
            on_stack.insert(entry.id.as_str(), 0);

            while let Some(top) = stack.len().checked_sub(1) {
                if stack[top].next >= stack[top].edges.len() {
                    let frame = stack.pop().ok_or_else(|| {
                        RuleError::new(CYCLE_DETECTED, "traversal stack underflow")
                    })?;
                    on_stack.remove(frame.node);
                    continue;
                }

                let (pin, child) = stack[top].edges[stack[top].next];
                stack[top].next += 1;
                stack[top].via = Some(pin);

                if let Some(&start) = on_stack.get(child) {
                    let re_entered_through = stack[start].via;
                    if re_entered_through.is_some_and(pins::is_loop_body_pin) {
                        continue;
                    }
                    let members: Vec<&str> = stack[start..].iter().map(|f| f.node).collect();
                    issues.push(report_cycle(graph, stack[top].node, &members)?);
                    continue;
                }

                if graph.node(child).is_some() && visited.insert(child) {
                    on_stack.insert(child, stack.len());
                    stack.push(Frame::new(graph, child));
                }
            }
        }

        Ok(issues)
    }
}

fn report_cycle(graph: &Graph, at: &str, members: &[&str]) -> Result<ValidationIssue, RuleError> {
    let node = graph
        .node(at)
        .ok_or_else(|| RuleError::new(CYCLE_DETECTED, format!("node '{}' vanished", at)))?;

    let path = members
        .iter()
        .filter_map(|id| graph.node(id))
        .map(describe)
        .collect::<Vec<_>>()
        .join(" -> ");

    let suspends = members
        .iter()
        .filter_map(|id| graph.node(id))
        .any(|member| NodeKind::of(member).is_some_and(|kind| kind.is_suspending()));

    let issue = if suspends {
        ValidationIssue::for_node(
            CYCLE_DETECTED,
            node,
            Severity::Warning,
            format!(
                "Execution loops back through {}. It waits on each pass, so it may be an intentional polling loop; verify its exit condition.",
                path
            ),
        )
    } else {
        ValidationIssue::for_node(
            CYCLE_DETECTED,
            node,
            Severity::Error,
            format!(
                "Synchronous infinite loop through {}. This will hang or crash the bot runtime.",
                path
            ),
        )
    };
    Ok(issue)
}
