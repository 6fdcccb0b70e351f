//! # Node-Specific Handlers
//!
//! The emission rule of every node kind. [`value_expr`] covers value nodes,
//! [`statement`] covers plain statements; control-flow kinds are lowered by
//! [`super::lowering`] and only borrow input resolution from here.
//!
//! Both tables match every [`NodeKind`] explicitly, so a new kind does not
//! compile until it has been given a rule (or an explicit refusal).

use super::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use super::resolver::{sanitize_identifier, Resolver};
use crate::error::CompileError;
use crate::graph::{DataType, Node};
use crate::metadata::NodeKind;
use tracing::warn;

const EMBED_SETTERS: [(&str, &str); 6] = [
    ("title", "setTitle"),
    ("description", "setDescription"),
    ("color", "setColor"),
    ("url", "setURL"),
    ("thumbnail", "setThumbnail"),
    ("image", "setImage"),
];

const BUTTON_STYLES: [&str; 5] = ["Primary", "Secondary", "Success", "Danger", "Link"];

const DEFAULT_INTERACTION_TIMEOUT_MS: f64 = 60_000.0;

fn no_rule(node: &Node, role: &'static str) -> CompileError {
    CompileError::NoEmissionRule {
        node_id: node.id.clone(),
        label: node.label.clone(),
        role,
    }
}

/// Parameter names of a function definition: its `parameters` list when
/// present, otherwise its data outputs in key order.
pub fn function_params(definition: &Node) -> Vec<String> {
    let listed: Option<Vec<String>> = definition
        .literal("parameters")
        .and_then(|value| value.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(sanitize_identifier)
                .collect()
        });

    listed.unwrap_or_else(|| {
        definition
            .data_outputs()
            .map(|(key, _)| sanitize_identifier(key))
            .collect()
    })
}

/// Name stem for the binding an effectful value node is hoisted into.
pub fn binding_hint(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::RandomNumber => "random",
        NodeKind::FetchUser => "user",
        _ => "value",
    }
}

fn binary(node: &Node, resolver: &mut Resolver<'_>, op: BinaryOp) -> Result<Expr, CompileError> {
    let left = resolver.resolve_input(node, "a")?;
    let right = resolver.resolve_input(node, "b")?;
    Ok(Expr::binary(op, left, right))
}

/// Expression for a value node.
pub fn value_expr(
    kind: NodeKind,
    node: &Node,
    resolver: &mut Resolver<'_>,
) -> Result<Expr, CompileError> {
    use NodeKind::*;

    let expr = match kind {
        StringValue => resolver.literal_or_default(node, "value", Some(DataType::String)),
        NumberValue => resolver.literal_or_default(node, "value", Some(DataType::Number)),
        BooleanValue => resolver.literal_or_default(node, "value", Some(DataType::Boolean)),

        Add => binary(node, resolver, BinaryOp::Add)?,
        Subtract => binary(node, resolver, BinaryOp::Sub)?,
        Multiply => binary(node, resolver, BinaryOp::Mul)?,
        Divide => binary(node, resolver, BinaryOp::Div)?,
        Modulo => binary(node, resolver, BinaryOp::Mod)?,
        RandomNumber => {
            let min = resolver.resolve_input(node, "min")?;
            let max = resolver.resolve_input(node, "max")?;
            let span = Expr::binary(
                BinaryOp::Add,
                Expr::binary(BinaryOp::Sub, max, min.clone()),
                Expr::number(1.0),
            );
            let scaled = Expr::binary(
                BinaryOp::Mul,
                Expr::method(Expr::ident("Math"), "random", vec![]),
                span,
            );
            Expr::binary(
                BinaryOp::Add,
                Expr::method(Expr::ident("Math"), "floor", vec![scaled]),
                min,
            )
        }

        Equals => binary(node, resolver, BinaryOp::StrictEq)?,
        NotEquals => binary(node, resolver, BinaryOp::StrictNotEq)?,
        GreaterThan => binary(node, resolver, BinaryOp::Gt)?,
        LessThan => binary(node, resolver, BinaryOp::Lt)?,
        And => binary(node, resolver, BinaryOp::And)?,
        Or => binary(node, resolver, BinaryOp::Or)?,
        Not => Expr::unary(UnaryOp::Not, resolver.resolve_input(node, "value")?),

        JoinText => {
            let first = resolver.resolve_input(node, "a")?;
            let second = resolver.resolve_input(node, "b")?;
            let separator = resolver.literal_or_default(node, "separator", Some(DataType::String));
            Expr::method(Expr::Array(vec![first, second]), "join", vec![separator])
        }
        GetProperty => {
            let mut expr = resolver.resolve_input(node, "object")?;
            if let Some(path) = node.literal_str("path") {
                for segment in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
                    expr = Expr::member(expr, segment);
                }
            }
            expr
        }
        GetVariable => {
            let name = node.literal_str("name").unwrap_or("variable");
            Expr::ident(resolver.use_variable(name))
        }
        MessageContent => Expr::member(resolver.resolve_context(node, "message")?, "content"),
        MessageAuthor => Expr::member(resolver.resolve_context(node, "message")?, "author"),
        MessageChannel => Expr::member(resolver.resolve_context(node, "message")?, "channel"),
        InteractionUser => Expr::member(resolver.resolve_context(node, "interaction")?, "user"),
        GetOption => {
            let interaction = resolver.resolve_context(node, "interaction")?;
            let name = node.literal_str("name").unwrap_or("option");
            Expr::method(
                Expr::member(interaction, "options"),
                option_getter(node.literal_str("type")),
                vec![Expr::string(name)],
            )
        }
        FetchUser => {
            let client = resolver.resolve_context(node, "client")?;
            let user_id = resolver.resolve_input(node, "userId")?;
            Expr::awaited(Expr::method(
                Expr::member(client, "users"),
                "fetch",
                vec![user_id],
            ))
        }

        CreateEmbed => {
            resolver.require("EmbedBuilder");
            let mut expr = Expr::new_instance("EmbedBuilder", vec![]);
            for (key, setter) in EMBED_SETTERS {
                if resolver.is_satisfied(node, key) {
                    let value = resolver.resolve_input(node, key)?;
                    expr = Expr::method(expr, setter, vec![value]);
                }
            }
            if resolver.is_satisfied(node, "footer") {
                let text = resolver.resolve_input(node, "footer")?;
                expr = Expr::method(
                    expr,
                    "setFooter",
                    vec![Expr::Object(vec![("text".to_string(), text)])],
                );
            }
            expr
        }
        CreateButton => {
            resolver.require("ButtonBuilder");
            resolver.require("ButtonStyle");
            let style = node
                .literal_str("style")
                .filter(|style| BUTTON_STYLES.contains(style))
                .unwrap_or("Primary");

            let mut expr = Expr::new_instance("ButtonBuilder", vec![]);
            if style == "Link" {
                let url = resolver.resolve_input(node, "url")?;
                expr = Expr::method(expr, "setURL", vec![url]);
            } else {
                let custom_id = resolver.resolve_input(node, "customId")?;
                expr = Expr::method(expr, "setCustomId", vec![custom_id]);
            }
            let label = resolver.resolve_input(node, "label")?;
            expr = Expr::method(expr, "setLabel", vec![label]);
            Expr::method(
                expr,
                "setStyle",
                vec![Expr::member(Expr::ident("ButtonStyle"), style)],
            )
        }
        CreateActionRow => {
            resolver.require("ActionRowBuilder");
            let keys: Vec<&str> = node
                .inputs
                .iter()
                .filter(|(_, socket)| socket.kind.data_type() == Some(DataType::Component))
                .map(|(key, _)| key.as_str())
                .collect();
            let mut components = Vec::new();
            for key in keys {
                if resolver.is_satisfied(node, key) {
                    components.push(resolver.resolve_input(node, key)?);
                }
            }
            Expr::method(
                Expr::new_instance("ActionRowBuilder", vec![]),
                "addComponents",
                components,
            )
        }

        Event | Command | SlashCommand | FunctionDefinition | ConsoleLog | SendMessage | Reply
        | ReplyToInteraction | DeleteMessage | AddReaction | Wait | WaitForInteraction
        | SetVariable | CallFunction | Return | Branch | While | DoWhile | ForLoop | ForEach => {
            return Err(no_rule(node, "a value"))
        }
    };

    Ok(expr)
}

/// The statement a plain statement node lowers to.
pub fn statement(
    kind: NodeKind,
    node: &Node,
    resolver: &mut Resolver<'_>,
) -> Result<Stmt, CompileError> {
    use NodeKind::*;

    let stmt = match kind {
        ConsoleLog => {
            let message = resolver.resolve_input(node, "message")?;
            Stmt::expr(Expr::method(Expr::ident("console"), "log", vec![message]))
        }
        SendMessage => {
            let channel = resolver.resolve_input_or(
                node,
                "channel",
                Expr::member(Expr::ident("message"), "channel"),
            )?;
            let payload = message_payload(node, resolver)?;
            let call = Expr::awaited(Expr::method(channel, "send", vec![payload]));
            bind_result(resolver, node, "message", "sentMessage", call)
        }
        Reply => {
            let message = resolver.resolve_context(node, "message")?;
            let payload = message_payload(node, resolver)?;
            let call = Expr::awaited(Expr::method(message, "reply", vec![payload]));
            bind_result(resolver, node, "message", "reply", call)
        }
        ReplyToInteraction => {
            let interaction = resolver.resolve_context(node, "interaction")?;
            let payload = message_payload(node, resolver)?;
            Stmt::expr(Expr::awaited(Expr::method(interaction, "reply", vec![payload])))
        }
        DeleteMessage => {
            let message = resolver.resolve_context(node, "message")?;
            Stmt::expr(Expr::awaited(Expr::method(message, "delete", vec![])))
        }
        AddReaction => {
            let message = resolver.resolve_context(node, "message")?;
            let emoji = resolver.resolve_input(node, "emoji")?;
            Stmt::expr(Expr::awaited(Expr::method(message, "react", vec![emoji])))
        }
        Wait => {
            let duration = resolver.resolve_input(node, "duration")?;
            let timer = Expr::Arrow {
                params: vec!["resolve".to_string()],
                body: Box::new(Expr::call(
                    Expr::ident("setTimeout"),
                    vec![Expr::ident("resolve"), duration],
                )),
            };
            Stmt::expr(Expr::awaited(Expr::new_instance("Promise", vec![timer])))
        }
        WaitForInteraction => {
            let message = resolver.resolve_context(node, "message")?;
            let timeout = resolver.resolve_input_or(
                node,
                "timeout",
                Expr::number(DEFAULT_INTERACTION_TIMEOUT_MS),
            )?;
            let call = Expr::awaited(Expr::method(
                message,
                "awaitMessageComponent",
                vec![Expr::Object(vec![("time".to_string(), timeout)])],
            ));
            bind_result(resolver, node, "interaction", "componentInteraction", call)
        }
        SetVariable => {
            let name = resolver.use_variable(node.literal_str("name").unwrap_or("variable"));
            let value = resolver.resolve_input(node, "value")?;
            Stmt::expr(Expr::assign(None, Expr::ident(name), value))
        }
        CallFunction => {
            let declared = node.literal_str("function").unwrap_or("");
            let (callee, params) = match resolver.function(declared) {
                Some(signature) => (signature.name.clone(), signature.params.clone()),
                None => {
                    warn!(
                        "[BBGC] '{}' ({}) calls unknown function '{}'",
                        node.label, node.id, declared
                    );
                    let params = node
                        .inputs
                        .iter()
                        .filter(|(_, socket)| !socket.kind.is_exec())
                        .map(|(key, _)| key.clone())
                        .collect();
                    (sanitize_identifier(declared), params)
                }
            };
            let args = params
                .iter()
                .map(|param| resolver.resolve_input(node, param))
                .collect::<Result<Vec<_>, _>>()?;
            let call = Expr::awaited(Expr::call(Expr::ident(callee), args));
            bind_result(resolver, node, "result", "result", call)
        }
        Return => {
            if resolver.is_satisfied(node, "value") {
                Stmt::Return(Some(resolver.resolve_input(node, "value")?))
            } else {
                Stmt::Return(None)
            }
        }

        Event | Command | SlashCommand | FunctionDefinition | Branch | While | DoWhile
        | ForLoop | ForEach | StringValue | NumberValue | BooleanValue | Add | Subtract
        | Multiply | Divide | Modulo | RandomNumber | Equals | NotEquals | GreaterThan
        | LessThan | And | Or | Not | JoinText | GetProperty | GetVariable | MessageContent
        | MessageAuthor | MessageChannel | InteractionUser | GetOption | FetchUser
        | CreateEmbed | CreateButton | CreateActionRow => return Err(no_rule(node, "a statement")),
    };

    Ok(stmt)
}

/// `{ content, embeds, components, ephemeral }` with only the satisfied fields.
fn message_payload(node: &Node, resolver: &mut Resolver<'_>) -> Result<Expr, CompileError> {
    let mut fields = Vec::new();

    if resolver.is_satisfied(node, "content") {
        fields.push(("content".to_string(), resolver.resolve_input(node, "content")?));
    }
    if resolver.is_satisfied(node, "embed") {
        let embed = resolver.resolve_input(node, "embed")?;
        fields.push(("embeds".to_string(), Expr::Array(vec![embed])));
    }
    if resolver.is_satisfied(node, "components") {
        let row = resolver.resolve_input(node, "components")?;
        fields.push(("components".to_string(), Expr::Array(vec![row])));
    }
    if resolver.is_satisfied(node, "ephemeral") {
        fields.push((
            "ephemeral".to_string(),
            resolver.resolve_input(node, "ephemeral")?,
        ));
    }

    if fields.is_empty() {
        fields.push(("content".to_string(), Expr::string("")));
    }
    Ok(Expr::Object(fields))
}

/// Binds a statement's result to a fresh `const` when another node reads it.
fn bind_result(
    resolver: &mut Resolver<'_>,
    node: &Node,
    output: &str,
    hint: &str,
    value: Expr,
) -> Stmt {
    if resolver.graph().is_output_consumed(&node.id, output) {
        let name = resolver.fresh_name(hint);
        resolver.bind(&node.id, output, Expr::ident(name.clone()));
        Stmt::constant(name, value)
    } else {
        Stmt::expr(value)
    }
}

fn option_getter(kind: Option<&str>) -> &'static str {
    match kind.map(str::to_ascii_lowercase).as_deref() {
        Some("integer") => "getInteger",
        Some("number") => "getNumber",
        Some("boolean") => "getBoolean",
        Some("user") => "getUser",
        Some("channel") => "getChannel",
        Some("role") => "getRole",
        Some("mentionable") => "getMentionable",
        Some("attachment") => "getAttachment",
        _ => "getString",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::printer::{print_block, print_expr};
    use crate::graph::{Connection, Graph, NodeCategory, SocketKind};
    use serde_json::json;

    fn data(ty: DataType) -> SocketKind {
        SocketKind::Data(ty)
    }

    #[test]
    fn test_embed_only_sets_filled_fields() {
        let embed = Node::new("e", "Create Embed", NodeCategory::Discord)
            .with_input("title", data(DataType::String))
            .with_input("description", data(DataType::String))
            .with_input("color", data(DataType::String))
            .with_output("embed", data(DataType::Embed))
            .with_data("title", json!("Stats"))
            .with_data("color", json!("#5865F2"));
        let graph = Graph::new(vec![embed.clone()], vec![]).unwrap();
        let mut resolver = Resolver::new(&graph);

        let expr = value_expr(NodeKind::CreateEmbed, &embed, &mut resolver).unwrap();
        assert_eq!(
            print_expr(&expr),
            r##"new EmbedBuilder().setTitle("Stats").setColor("#5865F2")"##
        );
        assert_eq!(resolver.imports(), vec!["EmbedBuilder"]);
    }

    #[test]
    fn test_send_message_binds_consumed_result() {
        let send = Node::new("s", "Send Message", NodeCategory::Discord)
            .with_input("exec", SocketKind::Exec)
            .with_input("content", data(DataType::String))
            .with_output("message", data(DataType::Object))
            .with_data("content", json!("pong"));
        let react = Node::new("r", "Add Reaction", NodeCategory::Discord)
            .with_input("message", data(DataType::Object));
        let graph = Graph::new(
            vec![send.clone(), react],
            vec![Connection::new("s", "message", "r", "message")],
        )
        .unwrap();
        let mut resolver = Resolver::new(&graph);
        resolver.enter_scope();

        let stmt = statement(NodeKind::SendMessage, &send, &mut resolver).unwrap();
        assert_eq!(
            print_block(&[stmt]),
            "const sentMessage = await message.channel.send({ content: \"pong\" });"
        );
        assert_eq!(
            resolver.resolve_output("s", "message").unwrap(),
            Expr::ident("sentMessage")
        );
    }

    #[test]
    fn test_wait_statement() {
        let wait = Node::new("w", "Wait", NodeCategory::Action)
            .with_input("duration", data(DataType::Number))
            .with_data("duration", json!(1500));
        let graph = Graph::new(vec![wait.clone()], vec![]).unwrap();
        let mut resolver = Resolver::new(&graph);

        let stmt = statement(NodeKind::Wait, &wait, &mut resolver).unwrap();
        assert_eq!(
            print_block(&[stmt]),
            "await new Promise((resolve) => setTimeout(resolve, 1500));"
        );
    }

    #[test]
    fn test_value_kinds_refuse_statement_role() {
        let node = Node::new("n", "Number", NodeCategory::Math);
        let graph = Graph::new(vec![node.clone()], vec![]).unwrap();
        let mut resolver = Resolver::new(&graph);
        let err = statement(NodeKind::NumberValue, &node, &mut resolver).unwrap_err();
        assert!(matches!(err, CompileError::NoEmissionRule { role: "a statement", .. }));
    }

    #[test]
    fn test_function_params_prefer_declared_list() {
        let def = Node::new("f", "Function Definition", NodeCategory::Function)
            .with_output("exec", SocketKind::Exec)
            .with_output("b", data(DataType::Number))
            .with_output("a", data(DataType::Number))
            .with_data("parameters", json!(["b", "a"]));
        assert_eq!(function_params(&def), vec!["b", "a"]);

        let bare = def.clone().with_data("parameters", json!(null));
        assert_eq!(function_params(&bare), vec!["a", "b"]);
    }
}
