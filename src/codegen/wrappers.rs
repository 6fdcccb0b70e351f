//! # Module Wrappers
//!
//! Each output file kind wraps the generated body in the module shape the
//! bot runtime loads. A [`Wrapper`] is a pure string transformation; the
//! body is re-indented with [`indent_code`] so callers can pass it at any
//! indentation.

use super::printer::{indent_code, quote};
use serde::{Deserialize, Serialize};

/// Indentation of handler bodies inside `module.exports`.
const BODY_INDENT: usize = 8;

/// The kind of module being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// A prefix (message) command.
    Command,
    SlashCommand,
    Event,
}

impl FileType {
    pub fn wrapper(&self) -> &'static dyn Wrapper {
        match self {
            FileType::Command => &LegacyCommandWrapper,
            FileType::SlashCommand => &SlashCommandWrapper,
            FileType::Event => &EventWrapper,
        }
    }
}

/// Value type of a slash command option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Attachment,
}

impl OptionKind {
    fn builder_method(&self) -> &'static str {
        match self {
            OptionKind::String => "addStringOption",
            OptionKind::Integer => "addIntegerOption",
            OptionKind::Number => "addNumberOption",
            OptionKind::Boolean => "addBooleanOption",
            OptionKind::User => "addUserOption",
            OptionKind::Channel => "addChannelOption",
            OptionKind::Role => "addRoleOption",
            OptionKind::Mentionable => "addMentionableOption",
            OptionKind::Attachment => "addAttachmentOption",
        }
    }
}

/// A declared slash command option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_option_kind")]
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
}

fn default_option_kind() -> OptionKind {
    OptionKind::String
}

/// Everything a wrapper needs besides the body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrapMetadata {
    pub name: String,
    pub description: String,
    pub params: Vec<String>,
    pub once: bool,
    pub is_async: bool,
    pub options: Vec<CommandOption>,
    /// Module-level code placed above `module.exports` (function declarations).
    pub helpers: String,
    /// `discord.js` exports to import, sorted and unique.
    pub imports: Vec<String>,
}

/// Wraps a generated body into a complete module.
pub trait Wrapper: Sync {
    fn wrap(&self, body: &str, meta: &WrapMetadata) -> String;
}

pub struct EventWrapper;

pub struct LegacyCommandWrapper;

pub struct SlashCommandWrapper;

impl Wrapper for EventWrapper {
    fn wrap(&self, body: &str, meta: &WrapMetadata) -> String {
        let mut out = preamble(&meta.imports, &meta.helpers);
        out.push_str("module.exports = {\n");
        out.push_str(&format!("    name: {},\n", quote(&meta.name)));
        out.push_str(&format!("    once: {},\n", meta.once));
        push_execute(&mut out, meta, &[], body);
        out.push_str("};\n");
        out
    }
}

impl Wrapper for LegacyCommandWrapper {
    fn wrap(&self, body: &str, meta: &WrapMetadata) -> String {
        let alias: Vec<String> = match meta.params.first().map(String::as_str) {
            Some("message") => vec!["const { client } = message;".to_string()],
            _ => Vec::new(),
        };

        let mut out = preamble(&meta.imports, &meta.helpers);
        out.push_str("module.exports = {\n");
        out.push_str(&format!("    name: {},\n", quote(&meta.name)));
        out.push_str(&format!("    description: {},\n", quote(&meta.description)));
        push_execute(&mut out, meta, &alias, body);
        out.push_str("};\n");
        out
    }
}

impl Wrapper for SlashCommandWrapper {
    fn wrap(&self, body: &str, meta: &WrapMetadata) -> String {
        let mut imports = meta.imports.clone();
        imports.push("SlashCommandBuilder".to_string());
        imports.sort();
        imports.dedup();

        let interaction = meta
            .params
            .first()
            .map(String::as_str)
            .unwrap_or("interaction");
        let alias = vec![format!("const client = {}.client;", interaction)];

        let mut builder = vec![
            "    data: new SlashCommandBuilder()".to_string(),
            format!("        .setName({})", quote(&meta.name)),
            format!("        .setDescription({})", quote(&meta.description)),
        ];
        for option in &meta.options {
            builder.push(format!(
                "        .{}((option) => option.setName({}).setDescription({}).setRequired({}))",
                option.kind.builder_method(),
                quote(&option.name),
                quote(&option.description),
                option.required
            ));
        }

        let mut out = preamble(&imports, &meta.helpers);
        out.push_str("module.exports = {\n");
        out.push_str(&builder.join("\n"));
        out.push_str(",\n");
        push_execute(&mut out, meta, &alias, body);
        out.push_str("};\n");
        out
    }
}

/// Import line and helper declarations, each followed by a blank line.
fn preamble(imports: &[String], helpers: &str) -> String {
    let mut out = String::new();
    if !imports.is_empty() {
        out.push_str(&format!(
            "const {{ {} }} = require(\"discord.js\");\n\n",
            imports.join(", ")
        ));
    }
    let helpers = indent_code(helpers, 0);
    if !helpers.is_empty() {
        out.push_str(&helpers);
        out.push_str("\n\n");
    }
    out
}

/// `execute: async (params) => { ... }` with optional prologue lines.
fn push_execute(out: &mut String, meta: &WrapMetadata, prologue: &[String], body: &str) {
    let keyword = if meta.is_async { "async " } else { "" };
    out.push_str(&format!(
        "    execute: {}({}) => {{\n",
        keyword,
        meta.params.join(", ")
    ));

    let body = indent_code(body, BODY_INDENT);
    let pad = " ".repeat(BODY_INDENT);
    for line in prologue {
        out.push_str(&pad);
        out.push_str(line);
        out.push('\n');
    }
    if !prologue.is_empty() && !body.is_empty() {
        out.push('\n');
    }
    if !body.is_empty() {
        out.push_str(&body);
        out.push('\n');
    }
    out.push_str("    }\n");
}
