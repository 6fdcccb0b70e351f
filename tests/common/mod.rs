//! Common test utilities for building blueprint graphs.
#![allow(dead_code)]

use bbgc::{Connection, DataType, Graph, Node, NodeCategory, SocketKind};
use serde_json::{json, Value};

/// Routes `tracing` output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn data(ty: DataType) -> SocketKind {
    SocketKind::Data(ty)
}

// --- Entry points ---

pub fn on_ready(id: &str) -> Node {
    Node::new(id, "On Ready", NodeCategory::Event).with_output("exec", SocketKind::Exec)
}

pub fn on_message(id: &str) -> Node {
    Node::new(id, "On Message Create", NodeCategory::Event)
        .with_output("exec", SocketKind::Exec)
        .with_output("message", data(DataType::Object))
}

pub fn command(id: &str, name: &str) -> Node {
    Node::new(id, "Command", NodeCategory::Event)
        .with_output("exec", SocketKind::Exec)
        .with_output("message", data(DataType::Object))
        .with_output("args", data(DataType::Array))
        .with_data("name", json!(name))
}

pub fn slash_command(id: &str, name: &str) -> Node {
    Node::new(id, "Slash Command", NodeCategory::Event)
        .with_output("exec", SocketKind::Exec)
        .with_output("interaction", data(DataType::Object))
        .with_data("name", json!(name))
}

pub fn function_definition(id: &str, name: &str, params: &[&str]) -> Node {
    let mut node = Node::new(id, "Function Definition", NodeCategory::Function)
        .with_output("exec", SocketKind::Exec)
        .with_data("name", json!(name));
    for param in params {
        node = node.with_output(param, data(DataType::Any));
    }
    node
}

// --- Statements ---

fn statement(id: &str, label: &str, category: NodeCategory) -> Node {
    Node::new(id, label, category)
        .with_input("exec", SocketKind::Exec)
        .with_output("exec_out", SocketKind::Exec)
}

/// Console Log with a literal message.
pub fn log(id: &str, text: &str) -> Node {
    log_input(id).with_data("message", json!(text))
}

/// Console Log whose message is expected to be wired or defaulted.
pub fn log_input(id: &str) -> Node {
    statement(id, "Console Log", NodeCategory::Action)
        .with_input("message", data(DataType::String))
}

pub fn wait(id: &str, ms: f64) -> Node {
    statement(id, "Wait", NodeCategory::Action)
        .with_input("duration", data(DataType::Number))
        .with_data("duration", json!(ms))
}

pub fn send_message(id: &str) -> Node {
    statement(id, "Send Message", NodeCategory::Discord)
        .with_input("channel", data(DataType::Object))
        .with_input("content", data(DataType::String))
        .with_input("embed", data(DataType::Embed))
        .with_output("message", data(DataType::Object))
}

pub fn reply(id: &str) -> Node {
    statement(id, "Reply", NodeCategory::Discord)
        .with_input("message", data(DataType::Object))
        .with_input("content", data(DataType::String))
        .with_input("embed", data(DataType::Embed))
}

pub fn reply_to_interaction(id: &str) -> Node {
    statement(id, "Reply to Interaction", NodeCategory::Discord)
        .with_input("interaction", data(DataType::Object))
        .with_input("content", data(DataType::String))
        .with_input("embed", data(DataType::Embed))
}

pub fn set_variable(id: &str, name: &str) -> Node {
    statement(id, "Set Variable", NodeCategory::Variable)
        .with_input("value", data(DataType::Any))
        .with_data("name", json!(name))
}

pub fn call_function(id: &str, function: &str, args: &[(&str, Value)]) -> Node {
    let mut node = statement(id, "Call Function", NodeCategory::Function)
        .with_output("result", data(DataType::Any))
        .with_data("function", json!(function));
    for (name, value) in args {
        node = node
            .with_input(name, data(DataType::Any))
            .with_data(name, value.clone());
    }
    node
}

// --- Control flow ---

pub fn branch(id: &str) -> Node {
    Node::new(id, "Branch", NodeCategory::Logic)
        .with_input("exec", SocketKind::Exec)
        .with_input("condition", data(DataType::Boolean))
        .with_output("true", SocketKind::Exec)
        .with_output("false", SocketKind::Exec)
}

pub fn while_loop(id: &str) -> Node {
    Node::new(id, "While", NodeCategory::Logic)
        .with_input("exec", SocketKind::Exec)
        .with_input("condition", data(DataType::Boolean))
        .with_output("loopBody", SocketKind::Exec)
        .with_output("complete", SocketKind::Exec)
}

pub fn do_while(id: &str) -> Node {
    Node::new(id, "Do While", NodeCategory::Logic)
        .with_input("exec", SocketKind::Exec)
        .with_input("condition", data(DataType::Boolean))
        .with_output("loopBody", SocketKind::Exec)
        .with_output("complete", SocketKind::Exec)
}

pub fn for_loop(id: &str, start: f64, end: f64) -> Node {
    Node::new(id, "For Loop", NodeCategory::Logic)
        .with_input("exec", SocketKind::Exec)
        .with_input("start", data(DataType::Number))
        .with_input("end", data(DataType::Number))
        .with_input("step", data(DataType::Number))
        .with_output("body", SocketKind::Exec)
        .with_output("done", SocketKind::Exec)
        .with_output("index", data(DataType::Number))
        .with_data("start", json!(start))
        .with_data("end", json!(end))
}

pub fn for_each(id: &str, items: Value) -> Node {
    Node::new(id, "For Each", NodeCategory::Logic)
        .with_input("exec", SocketKind::Exec)
        .with_input("array", data(DataType::Array))
        .with_output("body", SocketKind::Exec)
        .with_output("done", SocketKind::Exec)
        .with_output("item", data(DataType::Any))
        .with_output("index", data(DataType::Number))
        .with_data("array", items)
}

// --- Values ---

pub fn number(id: &str, value: f64) -> Node {
    Node::new(id, "Number", NodeCategory::Math)
        .with_output("value", data(DataType::Number))
        .with_data("value", json!(value))
}

pub fn string(id: &str, value: &str) -> Node {
    Node::new(id, "String", NodeCategory::Data)
        .with_output("value", data(DataType::String))
        .with_data("value", json!(value))
}

pub fn random(id: &str, min: f64, max: f64) -> Node {
    Node::new(id, "Random Number", NodeCategory::Math)
        .with_input("min", data(DataType::Number))
        .with_input("max", data(DataType::Number))
        .with_output("value", data(DataType::Number))
        .with_data("min", json!(min))
        .with_data("max", json!(max))
}

fn math(id: &str, label: &str, output: DataType) -> Node {
    Node::new(id, label, NodeCategory::Math)
        .with_input("a", data(DataType::Number))
        .with_input("b", data(DataType::Number))
        .with_output("result", data(output))
}

pub fn add(id: &str) -> Node {
    math(id, "Add", DataType::Number)
}

pub fn multiply(id: &str) -> Node {
    math(id, "Multiply", DataType::Number)
}

pub fn less_than(id: &str) -> Node {
    math(id, "Less Than", DataType::Boolean)
}

pub fn get_variable(id: &str, name: &str) -> Node {
    Node::new(id, "Get Variable", NodeCategory::Variable)
        .with_output("value", data(DataType::Any))
        .with_data("name", json!(name))
}

pub fn create_embed(id: &str, title: &str) -> Node {
    Node::new(id, "Create Embed", NodeCategory::Discord)
        .with_input("title", data(DataType::String))
        .with_input("description", data(DataType::String))
        .with_output("embed", data(DataType::Embed))
        .with_data("title", json!(title))
}

pub fn return_value(id: &str) -> Node {
    Node::new(id, "Return", NodeCategory::Function)
        .with_input("exec", SocketKind::Exec)
        .with_input("value", data(DataType::Any))
}

// --- Connections ---

/// Execution edge from `pin` into the target's `exec` input.
pub fn exec(source: &str, pin: &str, target: &str) -> Connection {
    Connection::new(source, pin, target, "exec")
}

/// Data edge.
pub fn wire(source: &str, output: &str, target: &str, input: &str) -> Connection {
    Connection::new(source, output, target, input)
}

pub fn graph(nodes: Vec<Node>, connections: Vec<Connection>) -> Graph {
    Graph::new(nodes, connections).expect("test graph should be well formed")
}
