mod common;

use bbgc::validation::{
    CUSTOM_VALIDATION, CYCLE_DETECTED, INTERNAL_ERROR, MISSING_INPUT, MIXED_CONNECTION,
    NO_ENTRY_POINT, SELF_LOOP, UNREACHABLE_CODE,
};
use bbgc::{
    validate_graph, validate_json, Graph, IssueSummary, Rule, RuleError, Severity,
    ValidationIssue, ValidationOptions, Validator,
};
use common::*;
use serde_json::json;

fn issues_for<'a>(issues: &'a [ValidationIssue], rule_id: &str) -> Vec<&'a ValidationIssue> {
    issues.iter().filter(|issue| issue.rule_id == rule_id).collect()
}

fn validate(graph: &Graph) -> Vec<ValidationIssue> {
    validate_graph(graph, &ValidationOptions::default())
}

#[test]
fn test_synchronous_cycle_is_an_error() {
    init_tracing();
    let graph = graph(
        vec![on_ready("start"), log("a", "ping"), log("b", "pong")],
        vec![
            exec("start", "exec", "a"),
            exec("a", "exec_out", "b"),
            exec("b", "exec_out", "a"),
        ],
    );

    let issues = validate(&graph);
    let cycles = issues_for(&issues, CYCLE_DETECTED);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].severity, Severity::Error);
    assert_eq!(cycles[0].node_id.as_deref(), Some("b"));
    assert!(cycles[0].message.contains("Synchronous infinite loop"));
    assert!(cycles[0].message.contains("'Console Log' (a)"));
}

#[test]
fn test_cycle_through_wait_is_a_warning() {
    let graph = graph(
        vec![on_ready("start"), log("poll", "checking"), wait("pause", 5000.0)],
        vec![
            exec("start", "exec", "poll"),
            exec("poll", "exec_out", "pause"),
            exec("pause", "exec_out", "poll"),
        ],
    );

    let issues = validate(&graph);
    let cycles = issues_for(&issues, CYCLE_DETECTED);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].severity, Severity::Warning);
    assert!(cycles[0].message.contains("polling loop"));
}

#[test]
fn test_loop_back_edge_is_not_a_cycle() {
    let graph = graph(
        vec![
            on_ready("start"),
            while_loop("loop").with_data("condition", json!(true)),
            log("tick", "tick"),
            log("done", "done"),
        ],
        vec![
            exec("start", "exec", "loop"),
            exec("loop", "loopBody", "tick"),
            exec("tick", "exec_out", "loop"),
            exec("loop", "complete", "done"),
        ],
    );

    let issues = validate(&graph);
    assert!(issues_for(&issues, CYCLE_DETECTED).is_empty());
    assert!(issues_for(&issues, UNREACHABLE_CODE).is_empty());
}

#[test]
fn test_for_loop_body_returning_to_header_is_not_a_cycle() {
    let graph = graph(
        vec![on_ready("start"), for_loop("for", 0.0, 3.0), log("step", "step")],
        vec![
            exec("start", "exec", "for"),
            exec("for", "body", "step"),
            exec("step", "exec_out", "for"),
        ],
    );

    assert!(issues_for(&validate(&graph), CYCLE_DETECTED).is_empty());
}

#[test]
fn test_unreachable_statement_is_flagged() {
    let graph = graph(
        vec![on_ready("start"), log("a", "hi"), log("orphan", "never")],
        vec![exec("start", "exec", "a")],
    );

    let issues = validate(&graph);
    let dead = issues_for(&issues, UNREACHABLE_CODE);
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].node_id.as_deref(), Some("orphan"));
    assert_eq!(dead[0].node_label.as_deref(), Some("Console Log"));
    assert_eq!(dead[0].severity, Severity::Warning);
}

#[test]
fn test_data_only_nodes_are_never_unreachable() {
    let graph = graph(
        vec![
            on_ready("start"),
            log_input("a"),
            string("greeting", "hello"),
            number("unused", 42.0),
        ],
        vec![
            exec("start", "exec", "a"),
            wire("greeting", "value", "a", "message"),
        ],
    );

    let issues = validate(&graph);
    assert!(issues_for(&issues, UNREACHABLE_CODE).is_empty());
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn test_graph_without_entry_reports_once() {
    let empty = graph(vec![], vec![]);
    let issues = validate(&empty);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule_id, NO_ENTRY_POINT);
    assert_eq!(issues[0].severity, Severity::Warning);
    assert!(issues[0].node_id.is_none());
    assert_eq!(issues[0].id, "no-entry-point:graph:0");

    let values_only = graph(vec![number("n", 1.0), string("s", "x")], vec![]);
    let issues = validate(&values_only);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule_id, NO_ENTRY_POINT);
}

#[test]
fn test_missing_required_input() {
    let graph = graph(
        vec![
            on_ready("start"),
            log_input("a").with_required("message"),
            log_input("b")
                .with_required("message")
                .with_required_message("message", "Say something."),
        ],
        vec![exec("start", "exec", "a"), exec("a", "exec_out", "b")],
    );

    let issues = validate(&graph);
    let missing = issues_for(&issues, MISSING_INPUT);
    assert_eq!(missing.len(), 2);
    assert_eq!(missing[0].node_id.as_deref(), Some("a"));
    assert_eq!(missing[0].message, "Input 'message' is required.");
    assert_eq!(missing[1].node_id.as_deref(), Some("b"));
    assert_eq!(missing[1].message, "Say something.");
}

#[test]
fn test_required_input_satisfied_by_connection_or_literal() {
    let graph = graph(
        vec![
            on_ready("start"),
            log_input("wired").with_required("message"),
            log("typed", "hi").with_required("message"),
            log("blank", "   ").with_required("message"),
            string("text", "hello"),
        ],
        vec![
            exec("start", "exec", "wired"),
            exec("wired", "exec_out", "typed"),
            exec("typed", "exec_out", "blank"),
            wire("text", "value", "wired", "message"),
        ],
    );

    let issues = validate(&graph);
    let missing = issues_for(&issues, MISSING_INPUT);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].node_id.as_deref(), Some("blank"));
}

#[test]
fn test_node_type_hooks() {
    let graph = graph(
        vec![
            on_message("start"),
            send_message("empty"),
            wait("pause", 0.0),
            call_function("call", "missing", &[]),
            set_variable("set", "not valid").with_data("value", json!(1)),
        ],
        vec![
            exec("start", "exec", "empty"),
            exec("empty", "exec_out", "pause"),
            exec("pause", "exec_out", "call"),
            exec("call", "exec_out", "set"),
        ],
    );

    let issues = validate(&graph);
    let custom = issues_for(&issues, CUSTOM_VALIDATION);
    let by_node = |id: &str| {
        custom
            .iter()
            .find(|issue| issue.node_id.as_deref() == Some(id))
            .copied()
    };

    let empty = by_node("empty").expect("send message without content");
    assert_eq!(empty.severity, Severity::Warning);
    assert!(empty.message.contains("content or an embed"));

    assert_eq!(by_node("pause").map(|i| i.severity), Some(Severity::Warning));
    assert_eq!(by_node("call").map(|i| i.severity), Some(Severity::Error));
    assert_eq!(by_node("set").map(|i| i.severity), Some(Severity::Error));
}

#[test]
fn test_reserved_words_are_rejected_as_names() {
    let graph = graph(
        vec![
            on_ready("start"),
            set_variable("set", "class").with_data("value", json!(1)),
            function_definition("def", "let", &[]),
        ],
        vec![exec("start", "exec", "set")],
    );

    let issues = validate(&graph);
    let custom = issues_for(&issues, CUSTOM_VALIDATION);
    assert_eq!(custom.len(), 2);
    assert!(custom
        .iter()
        .all(|issue| issue.severity == Severity::Error && issue.message.contains("reserved word")));
}

#[test]
fn test_defined_function_satisfies_call_hook() {
    let graph = graph(
        vec![
            on_ready("start"),
            call_function("call", "greet", &[]),
            function_definition("def", "greet", &[]),
        ],
        vec![exec("start", "exec", "call")],
    );

    assert!(issues_for(&validate(&graph), CUSTOM_VALIDATION).is_empty());
}

#[test]
fn test_self_loop_and_mixed_connection() {
    let graph = graph(
        vec![on_ready("start"), log("a", "hi"), log_input("b"), string("s", "x")],
        vec![
            exec("start", "exec", "a"),
            exec("a", "exec_out", "b"),
            wire("s", "value", "s", "value"),
            wire("a", "exec_out", "b", "message"),
        ],
    );

    let issues = validate(&graph);
    let loops = issues_for(&issues, SELF_LOOP);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].node_id.as_deref(), Some("s"));
    assert_eq!(loops[0].severity, Severity::Error);

    let mixed = issues_for(&issues, MIXED_CONNECTION);
    assert_eq!(mixed.len(), 1);
    assert_eq!(mixed[0].node_id.as_deref(), Some("a"));
    assert!(mixed[0].message.contains("a.exec_out -> b.message"));
}

#[test]
fn test_options_switch_rules_off() {
    let graph = graph(
        vec![on_ready("start"), log("a", "ping"), log("b", "pong")],
        vec![
            exec("start", "exec", "a"),
            exec("a", "exec_out", "b"),
            exec("b", "exec_out", "a"),
        ],
    );

    let options = ValidationOptions {
        check_cycles: false,
        ..ValidationOptions::default()
    };
    assert!(issues_for(&validate_graph(&graph, &options), CYCLE_DETECTED).is_empty());

    let none = ValidationOptions {
        check_cycles: false,
        check_reachability: false,
        check_required_inputs: false,
        check_connections: false,
    };
    assert!(Validator::new(&none).rule_ids().is_empty());
    assert!(validate_graph(&graph, &none).is_empty());
}

#[test]
fn test_rule_order() {
    let validator = Validator::default();
    assert_eq!(
        validator.rule_ids(),
        vec![CYCLE_DETECTED, UNREACHABLE_CODE, MISSING_INPUT, SELF_LOOP]
    );
}

struct FailingRule;

impl Rule for FailingRule {
    fn id(&self) -> &str {
        "always-fails"
    }

    fn validate(&self, _graph: &Graph) -> Result<Vec<ValidationIssue>, RuleError> {
        Err(RuleError::new("always-fails", "lookup table missing"))
    }
}

struct PanickingRule;

impl Rule for PanickingRule {
    fn id(&self) -> &str {
        "panics"
    }

    fn validate(&self, _graph: &Graph) -> Result<Vec<ValidationIssue>, RuleError> {
        panic!("index out of bounds");
    }
}

struct CountingRule;

impl Rule for CountingRule {
    fn id(&self) -> &str {
        "node-count"
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationIssue>, RuleError> {
        Ok(vec![ValidationIssue::global(
            "node-count",
            Severity::Info,
            format!("{} nodes", graph.nodes().len()),
        )])
    }
}

#[test]
fn test_failing_rules_are_isolated() {
    let graph = graph(
        vec![on_ready("start"), log("a", "hi"), log("orphan", "never")],
        vec![exec("start", "exec", "a")],
    );

    let issues = Validator::default()
        .with_rule(Box::new(FailingRule))
        .with_rule(Box::new(PanickingRule))
        .with_rule(Box::new(CountingRule))
        .run(&graph);

    let internal = issues_for(&issues, INTERNAL_ERROR);
    assert_eq!(internal.len(), 2);
    assert!(internal.iter().all(|issue| issue.severity == Severity::Error));
    assert!(internal[0].message.contains("always-fails"));
    assert!(internal[0].message.contains("lookup table missing"));
    assert!(internal[1].message.contains("panics"));
    assert!(internal[1].message.contains("index out of bounds"));
    assert_eq!(internal[0].id, "validator-internal-error:graph:0");
    assert_eq!(internal[1].id, "validator-internal-error:graph:1");

    // Rules before and after the failures still report.
    assert_eq!(issues_for(&issues, UNREACHABLE_CODE).len(), 1);
    let counted = issues_for(&issues, "node-count");
    assert_eq!(counted.len(), 1);
    assert_eq!(counted[0].message, "3 nodes");
    assert_eq!(issues.last().map(|i| i.rule_id.as_str()), Some("node-count"));
}

#[test]
fn test_issue_ids_are_stable() {
    let build = || {
        graph(
            vec![
                on_ready("start"),
                log_input("a").with_required("message"),
                log_input("o1"),
                log_input("o2"),
            ],
            vec![exec("start", "exec", "a")],
        )
    };

    let first = validate(&build());
    let second = validate(&build());
    assert_eq!(first, second);

    let ids: Vec<&str> = first.iter().map(|issue| issue.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "unreachable-code:o1:0",
            "unreachable-code:o2:0",
            "missing-input:a:0",
        ]
    );
}

#[test]
fn test_summary_counts_severities() {
    let graph = graph(
        vec![on_ready("start"), log("a", "ping"), log("b", "pong"), log("c", "lost")],
        vec![
            exec("start", "exec", "a"),
            exec("a", "exec_out", "b"),
            exec("b", "exec_out", "a"),
        ],
    );

    let summary = IssueSummary::of(&validate(&graph));
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.warnings, 1);
    assert_eq!(summary.infos, 0);
}

#[test]
fn test_validate_json_request() {
    let issues = validate_json(
        r#"{
            "nodes": [
                {
                    "id": "start",
                    "label": "On Ready",
                    "category": "Event",
                    "outputs": { "exec": { "name": "exec", "kind": "exec" } }
                },
                {
                    "id": "log",
                    "label": "Console Log",
                    "category": "Action",
                    "inputs": {
                        "exec": { "name": "exec", "kind": "exec" },
                        "message": { "name": "message", "kind": "string" }
                    },
                    "requiredInputs": ["message"]
                }
            ],
            "connections": [],
            "options": { "checkReachability": false }
        }"#,
    )
    .expect("valid request");

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule_id, MISSING_INPUT);
    assert_eq!(issues[0].node_id.as_deref(), Some("log"));

    let json = serde_json::to_value(&issues[0]).expect("issue serializes");
    assert_eq!(json["ruleId"], "missing-input");
    assert_eq!(json["severity"], "warning");
    assert_eq!(json["nodeLabel"], "Console Log");
}
