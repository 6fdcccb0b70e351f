//! # Node Metadata
//!
//! The closed catalogue of node types the compiler understands. A node's
//! label selects its [`NodeKind`]; the kind decides which emission rule the
//! code generator uses and which extra checks the validator runs.
//!
//! Adding a node type means adding a variant here, a label in
//! [`NodeKind::from_label`], and an arm in `codegen::node_handlers`. The
//! compiler refuses to build if an arm is missing.

use crate::graph::{Graph, Node, NodeCategory};
use crate::validation::Severity;

/// What part a node plays in generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Starts a compiled function (event, command, function definition).
    Entry,
    /// Emits statements and continues the sequence.
    Statement,
    /// Emits structured control flow (if, loops).
    Control,
    /// Produces a value consumed by other nodes.
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Entry points
    Event,
    Command,
    SlashCommand,
    FunctionDefinition,

    // Statements
    ConsoleLog,
    SendMessage,
    Reply,
    ReplyToInteraction,
    DeleteMessage,
    AddReaction,
    Wait,
    WaitForInteraction,
    SetVariable,
    CallFunction,
    Return,

    // Control flow
    Branch,
    While,
    DoWhile,
    ForLoop,
    ForEach,

    // Constants
    StringValue,
    NumberValue,
    BooleanValue,

    // Math
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    RandomNumber,

    // Logic
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    And,
    Or,
    Not,

    // Data access
    JoinText,
    GetProperty,
    GetVariable,
    MessageContent,
    MessageAuthor,
    MessageChannel,
    InteractionUser,
    GetOption,
    FetchUser,

    // Builders
    CreateEmbed,
    CreateButton,
    CreateActionRow,
}

/// An extra problem reported by a node type's own check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFinding {
    pub severity: Severity,
    pub message: String,
}

impl NodeFinding {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl NodeKind {
    /// Resolves the kind of a node from its label. Any unrecognised label in
    /// the `Event` category is a generic event entry.
    pub fn of(node: &Node) -> Option<NodeKind> {
        Self::from_label(&node.label).or(match node.category {
            NodeCategory::Event => Some(NodeKind::Event),
            _ => None,
        })
    }

    pub fn from_label(label: &str) -> Option<NodeKind> {
        let kind = match label {
            "On Ready" | "On Message Create" | "On Interaction Create" | "On Member Join" => {
                NodeKind::Event
            }
            "Command" | "Prefix Command" => NodeKind::Command,
            "Slash Command" => NodeKind::SlashCommand,
            "Function Definition" | "Define Function" => NodeKind::FunctionDefinition,

            "Console Log" | "Log" => NodeKind::ConsoleLog,
            "Send Message" => NodeKind::SendMessage,
            "Reply" | "Reply to Message" => NodeKind::Reply,
            "Reply to Interaction" => NodeKind::ReplyToInteraction,
            "Delete Message" => NodeKind::DeleteMessage,
            "Add Reaction" => NodeKind::AddReaction,
            "Wait" => NodeKind::Wait,
            "Wait for Interaction" => NodeKind::WaitForInteraction,
            "Set Variable" => NodeKind::SetVariable,
            "Call Function" => NodeKind::CallFunction,
            "Return" => NodeKind::Return,

            "Branch" | "If" => NodeKind::Branch,
            "While" | "While Loop" => NodeKind::While,
            "Do While" => NodeKind::DoWhile,
            "For Loop" => NodeKind::ForLoop,
            "For Each" => NodeKind::ForEach,

            "String" => NodeKind::StringValue,
            "Number" => NodeKind::NumberValue,
            "Boolean" => NodeKind::BooleanValue,

            "Add" => NodeKind::Add,
            "Subtract" => NodeKind::Subtract,
            "Multiply" => NodeKind::Multiply,
            "Divide" => NodeKind::Divide,
            "Modulo" => NodeKind::Modulo,
            "Random Number" => NodeKind::RandomNumber,

            "Equals" => NodeKind::Equals,
            "Not Equals" => NodeKind::NotEquals,
            "Greater Than" => NodeKind::GreaterThan,
            "Less Than" => NodeKind::LessThan,
            "And" => NodeKind::And,
            "Or" => NodeKind::Or,
            "Not" => NodeKind::Not,

            "Join Text" => NodeKind::JoinText,
            "Get Property" => NodeKind::GetProperty,
            "Get Variable" => NodeKind::GetVariable,
            "Message Content" => NodeKind::MessageContent,
            "Message Author" => NodeKind::MessageAuthor,
            "Message Channel" => NodeKind::MessageChannel,
            "Interaction User" => NodeKind::InteractionUser,
            "Get Option" => NodeKind::GetOption,
            "Fetch User" => NodeKind::FetchUser,

            "Create Embed" => NodeKind::CreateEmbed,
            "Create Button" => NodeKind::CreateButton,
            "Create Action Row" => NodeKind::CreateActionRow,
            _ => return None,
        };
        Some(kind)
    }

    pub fn role(&self) -> NodeRole {
        use NodeKind::*;
        match self {
            Event | Command | SlashCommand | FunctionDefinition => NodeRole::Entry,
            ConsoleLog | SendMessage | Reply | ReplyToInteraction | DeleteMessage | AddReaction
            | Wait | WaitForInteraction | SetVariable | CallFunction | Return => {
                NodeRole::Statement
            }
            Branch | While | DoWhile | ForLoop | ForEach => NodeRole::Control,
            _ => NodeRole::Value,
        }
    }

    /// Node types that yield to the runtime. A cycle through one of these
    /// can be a polling loop rather than a hang.
    pub fn is_suspending(&self) -> bool {
        matches!(self, NodeKind::Wait | NodeKind::WaitForInteraction)
    }

    /// Value nodes whose evaluation has side effects or is not repeatable.
    /// They are evaluated once into a binding instead of being inlined.
    pub fn is_effectful_value(&self) -> bool {
        matches!(self, NodeKind::RandomNumber | NodeKind::FetchUser)
    }

    /// Checks a node type enforces beyond its required-input flags.
    pub fn validate(&self, node: &Node, graph: &Graph) -> Vec<NodeFinding> {
        let satisfied = |key: &str| graph.is_input_connected(&node.id, key) || node.has_literal(key);
        let mut findings = Vec::new();

        match self {
            NodeKind::SendMessage | NodeKind::Reply | NodeKind::ReplyToInteraction => {
                if !satisfied("content") && !satisfied("embed") {
                    findings.push(NodeFinding::warning(
                        "Either message content or an embed must be set.",
                    ));
                }
            }
            NodeKind::Wait => {
                let duration = node.literal("duration").and_then(|v| v.as_f64());
                if !graph.is_input_connected(&node.id, "duration")
                    && duration.is_some_and(|ms| ms <= 0.0)
                {
                    findings.push(NodeFinding::warning(
                        "Wait duration must be greater than zero.",
                    ));
                }
            }
            NodeKind::SetVariable | NodeKind::GetVariable => {
                if let Some(name) = node.literal_str("name") {
                    if let Some(problem) = binding_name_problem(name) {
                        findings.push(NodeFinding::error(format!(
                            "Variable name '{}' {}.",
                            name, problem
                        )));
                    }
                }
            }
            NodeKind::FunctionDefinition => {
                if let Some(name) = node.literal_str("name") {
                    if let Some(problem) = binding_name_problem(name) {
                        findings.push(NodeFinding::error(format!(
                            "Function name '{}' {}.",
                            name, problem
                        )));
                    }
                }
            }
            NodeKind::CallFunction => {
                if let Some(name) = node.literal_str("function") {
                    let defined = graph.nodes().iter().any(|other| {
                        NodeKind::of(other) == Some(NodeKind::FunctionDefinition)
                            && other.literal_str("name") == Some(name)
                    });
                    if !defined {
                        findings.push(NodeFinding::error(format!(
                            "No function named '{}' is defined in this blueprint.",
                            name
                        )));
                    }
                }
            }
            NodeKind::GetProperty => {
                if let Some(path) = node.literal_str("path") {
                    if path.split('.').any(|segment| !is_identifier(segment)) {
                        findings.push(NodeFinding::warning(format!(
                            "Property path '{}' contains an invalid segment.",
                            path
                        )));
                    }
                }
            }
            _ => {}
        }

        findings
    }
}

/// Words JavaScript does not accept as a binding name.
pub const RESERVED_WORDS: [&str; 41] = [
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
    "function", "if", "import", "in", "instanceof", "let", "new", "null", "return", "static",
    "super", "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void",
    "while", "yield",
];

/// Whether `name` can be declared as a variable or function.
pub fn is_binding_name(name: &str) -> bool {
    binding_name_problem(name).is_none()
}

fn binding_name_problem(name: &str) -> Option<&'static str> {
    if !is_identifier(name) {
        Some("is not a valid identifier")
    } else if RESERVED_WORDS.contains(&name) {
        Some("is a reserved word")
    } else {
        None
    }
}

/// A JavaScript identifier made of ASCII letters, digits, `_` and `$`.
///
/// Reserved words pass; they are valid property names.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Connection, DataType, SocketKind};
    use serde_json::json;

    #[test]
    fn test_unknown_event_label_is_an_event() {
        let node = Node::new("e", "On Voice State Update", NodeCategory::Event);
        assert_eq!(NodeKind::of(&node), Some(NodeKind::Event));

        let node = Node::new("x", "Teleport", NodeCategory::Action);
        assert_eq!(NodeKind::of(&node), None);
    }

    #[test]
    fn test_suspending_kinds() {
        assert!(NodeKind::Wait.is_suspending());
        assert!(NodeKind::WaitForInteraction.is_suspending());
        assert!(!NodeKind::ConsoleLog.is_suspending());
    }

    #[test]
    fn test_send_message_needs_content_or_embed() {
        let node = Node::new("s", "Send Message", NodeCategory::Discord)
            .with_input("exec", SocketKind::Exec)
            .with_input("content", SocketKind::Data(DataType::String))
            .with_input("embed", SocketKind::Data(DataType::Embed));
        let graph = Graph::new(vec![node.clone()], vec![]).unwrap();
        assert_eq!(NodeKind::SendMessage.validate(&node, &graph).len(), 1);

        let with_content = node.clone().with_data("content", json!("hello"));
        let graph = Graph::new(vec![with_content.clone()], vec![]).unwrap();
        assert!(NodeKind::SendMessage.validate(&with_content, &graph).is_empty());

        let embed = Node::new("e", "Create Embed", NodeCategory::Discord)
            .with_output("embed", SocketKind::Data(DataType::Embed));
        let graph = Graph::new(
            vec![node.clone(), embed],
            vec![Connection::new("e", "embed", "s", "embed")],
        )
        .unwrap();
        assert!(NodeKind::SendMessage.validate(&node, &graph).is_empty());
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("counter"));
        assert!(is_identifier("_private$1"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("two words"));
        assert!(!is_identifier(""));
        assert!(is_identifier("class"));
    }

    #[test]
    fn test_reserved_words_are_not_binding_names() {
        assert!(is_binding_name("counter"));
        assert!(!is_binding_name("class"));
        assert!(!is_binding_name("let"));
        assert!(!is_binding_name("two words"));

        let node = Node::new("v", "Set Variable", NodeCategory::Variable)
            .with_data("name", json!("let"));
        let graph = Graph::new(vec![node.clone()], vec![]).unwrap();
        let findings = NodeKind::SetVariable.validate(&node, &graph);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].message, "Variable name 'let' is a reserved word.");

        let node = Node::new("f", "Function Definition", NodeCategory::Function)
            .with_output("exec", SocketKind::Exec)
            .with_data("name", json!("class"));
        let graph = Graph::new(vec![node.clone()], vec![]).unwrap();
        assert_eq!(
            NodeKind::FunctionDefinition.validate(&node, &graph)[0].message,
            "Function name 'class' is a reserved word."
        );
    }
}
