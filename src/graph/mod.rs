//! # Graph Model
//!
//! Strictly typed view of a blueprint: nodes, their sockets, and the
//! connections between them. The editor serializes a loosely shaped JSON
//! document; [`Graph::from_document`] is the validated step that turns it into
//! the model the validator and compiler read.
//!
//! The model is read-only during a pass. Nothing in this crate mutates a
//! [`Graph`] after construction.

pub mod pins;

use crate::error::GraphError;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value type carried by a data socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Embed,
    Component,
    ActionRow,
    Function,
    Any,
}

/// What a socket carries: control flow or a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SocketKindRepr", into = "SocketKindRepr")]
pub enum SocketKind {
    Exec,
    Data(DataType),
}

impl SocketKind {
    pub fn is_exec(&self) -> bool {
        matches!(self, SocketKind::Exec)
    }

    pub fn data_type(&self) -> Option<DataType> {
        match self {
            SocketKind::Exec => None,
            SocketKind::Data(ty) => Some(*ty),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            SocketKind::Exec => "an execution pin",
            SocketKind::Data(_) => "a data pin",
        }
    }
}

/// Flat wire form of [`SocketKind`], e.g. `"exec"` or `"string"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum SocketKindRepr {
    Exec,
    String,
    Number,
    Boolean,
    Object,
    Array,
    Embed,
    Component,
    ActionRow,
    Function,
    Any,
}

impl From<SocketKindRepr> for SocketKind {
    fn from(repr: SocketKindRepr) -> Self {
        let ty = match repr {
            SocketKindRepr::Exec => return SocketKind::Exec,
            SocketKindRepr::String => DataType::String,
            SocketKindRepr::Number => DataType::Number,
            SocketKindRepr::Boolean => DataType::Boolean,
            SocketKindRepr::Object => DataType::Object,
            SocketKindRepr::Array => DataType::Array,
            SocketKindRepr::Embed => DataType::Embed,
            SocketKindRepr::Component => DataType::Component,
            SocketKindRepr::ActionRow => DataType::ActionRow,
            SocketKindRepr::Function => DataType::Function,
            SocketKindRepr::Any => DataType::Any,
        };
        SocketKind::Data(ty)
    }
}

impl From<SocketKind> for SocketKindRepr {
    fn from(kind: SocketKind) -> Self {
        match kind {
            SocketKind::Exec => SocketKindRepr::Exec,
            SocketKind::Data(DataType::String) => SocketKindRepr::String,
            SocketKind::Data(DataType::Number) => SocketKindRepr::Number,
            SocketKind::Data(DataType::Boolean) => SocketKindRepr::Boolean,
            SocketKind::Data(DataType::Object) => SocketKindRepr::Object,
            SocketKind::Data(DataType::Array) => SocketKindRepr::Array,
            SocketKind::Data(DataType::Embed) => SocketKindRepr::Embed,
            SocketKind::Data(DataType::Component) => SocketKindRepr::Component,
            SocketKind::Data(DataType::ActionRow) => SocketKindRepr::ActionRow,
            SocketKind::Data(DataType::Function) => SocketKindRepr::Function,
            SocketKind::Data(DataType::Any) => SocketKindRepr::Any,
        }
    }
}

/// A typed port on one side of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Socket {
    #[serde(default)]
    pub name: String,
    pub kind: SocketKind,
}

impl Socket {
    pub fn new(name: impl Into<String>, kind: SocketKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Palette grouping of a node. Purely descriptive apart from `Event`, which
/// marks the node as an event entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    Event,
    Action,
    Logic,
    Variable,
    Function,
    Math,
    Discord,
    Data,
}

/// A graph vertex as placed by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub label: String,
    pub category: NodeCategory,
    #[serde(default)]
    pub inputs: BTreeMap<String, Socket>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Socket>,
    /// Literal control values typed into the node, keyed like its inputs.
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub required_inputs: Vec<String>,
    /// Optional replacement text for the generic "input is required" warning.
    #[serde(default)]
    pub required_messages: BTreeMap<String, String>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            data: BTreeMap::new(),
            required_inputs: Vec::new(),
            required_messages: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, key: &str, kind: SocketKind) -> Self {
        self.inputs.insert(key.to_string(), Socket::new(key, kind));
        self
    }

    pub fn with_output(mut self, key: &str, kind: SocketKind) -> Self {
        self.outputs.insert(key.to_string(), Socket::new(key, kind));
        self
    }

    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    pub fn with_required(mut self, key: &str) -> Self {
        self.required_inputs.push(key.to_string());
        self
    }

    pub fn with_required_message(mut self, key: &str, message: &str) -> Self {
        self.required_messages
            .insert(key.to_string(), message.to_string());
        self
    }

    pub fn exec_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .filter(|(_, socket)| socket.kind.is_exec())
            .map(|(key, _)| key.as_str())
    }

    pub fn exec_outputs(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .filter(|(_, socket)| socket.kind.is_exec())
            .map(|(key, _)| key.as_str())
    }

    pub fn data_outputs(&self) -> impl Iterator<Item = (&str, DataType)> {
        self.outputs
            .iter()
            .filter_map(|(key, socket)| socket.kind.data_type().map(|ty| (key.as_str(), ty)))
    }

    pub fn has_exec_input(&self) -> bool {
        self.exec_inputs().next().is_some()
    }

    pub fn has_exec_output(&self) -> bool {
        self.exec_outputs().next().is_some()
    }

    /// Events, commands and function definitions: control leaves them but
    /// never enters.
    pub fn is_entry(&self) -> bool {
        self.has_exec_output() && !self.has_exec_input()
    }

    pub fn input_type(&self, key: &str) -> Option<DataType> {
        self.inputs.get(key).and_then(|socket| socket.kind.data_type())
    }

    /// A literal control value, treating JSON `null` as absent.
    pub fn literal(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key).filter(|value| !value.is_null())
    }

    /// Whether a literal is present and its text form is not blank.
    pub fn has_literal(&self, key: &str) -> bool {
        match self.literal(key) {
            Some(serde_json::Value::String(text)) => !text.trim().is_empty(),
            Some(other) => !other.to_string().trim().is_empty(),
            None => false,
        }
    }

    /// A literal control value as trimmed text, if it is a non-blank string.
    pub fn literal_str(&self, key: &str) -> Option<&str> {
        self.literal(key)
            .and_then(|value| value.as_str())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// A directed edge from an output socket to an input socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub source_output: String,
    pub target: String,
    pub target_input: String,
}

impl Connection {
    pub fn new(
        source: impl Into<String>,
        source_output: impl Into<String>,
        target: impl Into<String>,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_output: source_output.into(),
            target: target.into(),
            target_input: target_input.into(),
        }
    }

    /// Execution edges are recognised by the name of the output they leave.
    pub fn is_exec(&self) -> bool {
        pins::is_exec_pin(&self.source_output)
    }
}

/// The serialized form of a graph as the editor produces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// A validated graph with adjacency lookups.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    node_index: AHashMap<String, usize>,
    outgoing: AHashMap<String, Vec<usize>>,
    incoming: AHashMap<String, Vec<usize>>,
}

impl Graph {
    /// Builds a graph, rejecting duplicate ids and sockets whose declared
    /// kind disagrees with the execution-pin naming convention.
    ///
    /// Connections are not checked against the node set; a dangling
    /// connection simply never resolves.
    pub fn new(nodes: Vec<Node>, connections: Vec<Connection>) -> Result<Self, GraphError> {
        let mut node_index = AHashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), index).is_some() {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
            check_pin_kinds(node)?;
        }

        let mut outgoing: AHashMap<String, Vec<usize>> = AHashMap::new();
        let mut incoming: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (index, connection) in connections.iter().enumerate() {
            outgoing
                .entry(connection.source.clone())
                .or_default()
                .push(index);
            incoming
                .entry(connection.target.clone())
                .or_default()
                .push(index);
        }

        Ok(Self {
            nodes,
            connections,
            node_index,
            outgoing,
            incoming,
        })
    }

    pub fn from_document(document: GraphDocument) -> Result<Self, GraphError> {
        Self::new(document.nodes, document.connections)
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let document: GraphDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&index| &self.nodes[index])
    }

    /// Position of a node in declaration order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    /// All connections leaving a node, in declaration order.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &Connection> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(|&index| &self.connections[index])
    }

    /// All connections entering a node, in declaration order.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &Connection> {
        self.incoming
            .get(id)
            .into_iter()
            .flatten()
            .map(|&index| &self.connections[index])
    }

    /// Execution successors leaving through one specific pin.
    pub fn exec_targets<'a>(
        &'a self,
        id: &str,
        pin: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.outgoing(id)
            .filter(move |c| c.is_exec() && c.source_output == pin)
            .map(|c| c.target.as_str())
    }

    /// Every node wired to the first of `pins` that has a connection, in
    /// connection order and without repeats. Pins are checked in the given
    /// order.
    pub fn pin_targets(&self, id: &str, pins: &[&str]) -> Vec<&str> {
        for pin in pins {
            let mut targets: Vec<&str> = Vec::new();
            let wired = self
                .outgoing(id)
                .filter(|c| c.is_exec() && c.source_output == *pin)
                .map(|c| c.target.as_str());
            for target in wired {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
            if !targets.is_empty() {
                return targets;
            }
        }
        Vec::new()
    }

    /// The connection feeding a data input, if any. The first one wins when
    /// the editor allowed several.
    pub fn data_source(&self, id: &str, input: &str) -> Option<&Connection> {
        self.incoming(id)
            .find(|c| !c.is_exec() && c.target_input == input)
    }

    pub fn is_input_connected(&self, id: &str, input: &str) -> bool {
        self.incoming(id).any(|c| c.target_input == input)
    }

    /// Whether any data connection reads the given output.
    pub fn is_output_consumed(&self, id: &str, output: &str) -> bool {
        self.outgoing(id)
            .any(|c| !c.is_exec() && c.source_output == output)
    }

    pub fn entry_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_entry())
    }

    /// Ids of every node reachable from `start` over execution edges,
    /// `start` included.
    pub fn exec_reachable(&self, start: &str) -> AHashSet<String> {
        let mut seen = AHashSet::new();
        let mut stack = vec![start.to_string()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            for connection in self.outgoing(&id).filter(|c| c.is_exec()) {
                stack.push(connection.target.clone());
            }
        }
        seen
    }
}

fn check_pin_kinds(node: &Node) -> Result<(), GraphError> {
    for (key, socket) in node.inputs.iter().chain(node.outputs.iter()) {
        let named_exec = pins::is_exec_pin(key);
        if named_exec != socket.kind.is_exec() {
            let expected = if named_exec {
                SocketKind::Exec
            } else {
                SocketKind::Data(DataType::Any)
            };
            return Err(GraphError::PinKindMismatch {
                node_id: node.id.clone(),
                pin: key.clone(),
                declared: socket.kind.describe(),
                expected: expected.describe(),
            });
        }
    }
    Ok(())
}
