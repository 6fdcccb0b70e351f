//! # Blueprint Compiler
//!
//! Main entry points for turning blueprint graphs into `discord.js` modules.

use crate::codegen::lowering::{LoweredModule, Lowering};
use crate::codegen::printer::print_block;
use crate::codegen::wrappers::{CommandOption, FileType, WrapMetadata};
use crate::error::{CompileError, GraphError};
use crate::graph::{Graph, GraphDocument, Node};
use crate::metadata::NodeKind;
use crate::validation::{validate_graph, ValidationIssue, ValidationOptions};
use serde::{Deserialize, Serialize};

const DEFAULT_DESCRIPTION: &str = "No description provided.";

fn default_true() -> bool {
    true
}

/// How the compiled module is wrapped.
///
/// Everything except the file type is optional; missing values are taken
/// from the entry node or from the file type's conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    pub file_type: FileType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Handler parameter names.
    #[serde(default)]
    pub params: Option<Vec<String>>,
    /// Event modules only: register with `once` instead of `on`.
    #[serde(default)]
    pub once: Option<bool>,
    #[serde(default = "default_true")]
    pub is_async: bool,
    /// Slash command options.
    #[serde(default)]
    pub command_options: Vec<CommandOption>,
}

impl CompileOptions {
    pub fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            name: None,
            description: None,
            params: None,
            once: None,
            is_async: true,
            command_options: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = Some(params.iter().map(|p| p.to_string()).collect());
        self
    }
}

/// A graph plus its compile options, as sent by the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileRequest {
    #[serde(flatten)]
    pub graph: GraphDocument,
    #[serde(flatten)]
    pub options: CompileOptions,
}

/// A graph plus the rules to run over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    #[serde(flatten)]
    pub graph: GraphDocument,
    #[serde(default)]
    pub options: ValidationOptions,
}

/// Compile a blueprint graph to a JavaScript module
///
/// Validation is not run here; call [`validate_graph`] first if the
/// caller wants to refuse graphs with errors. Compilation is
/// deterministic: the same graph and options always give identical text.
///
/// # Arguments
///
/// * `graph` - The blueprint graph to compile
/// * `options` - File type and wrapper metadata
///
/// # Returns
///
/// * `Ok(String)` - The generated module source, ending in a newline
/// * `Err(CompileError)` - A node with no emission rule was reached
///
/// # Examples
///
/// ```rust,no_run
/// use bbgc::{compile_graph, CompileOptions, FileType, Graph};
///
/// let graph = Graph::from_json(r#"{ "nodes": [], "connections": [] }"#)?;
/// let code = compile_graph(&graph, &CompileOptions::new(FileType::Event).with_name("ready"))?;
/// println!("{}", code);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn compile_graph(graph: &Graph, options: &CompileOptions) -> Result<String, CompileError> {
    tracing::info!("[BBGC] Starting blueprint compilation");
    tracing::info!(
        "[BBGC] Graph: {} nodes, {} connections, target {:?}",
        graph.nodes().len(),
        graph.connections().len(),
        options.file_type
    );

    // Phase 1: Entry point
    tracing::info!("[BBGC] Phase 1: Selecting entry point...");
    let entry = select_entry(graph, options.file_type);

    // Phase 2: Lowering
    tracing::info!("[BBGC] Phase 2: Lowering control flow...");
    let module = Lowering::new(graph).lower_module(entry)?;
    tracing::info!(
        "[BBGC]   - {} functions, {} top-level statements",
        module.functions.len(),
        module.body.body.len()
    );

    // Phase 3: Printing
    tracing::info!("[BBGC] Phase 3: Printing JavaScript...");
    let body = print_block(&module.body.body);
    let helpers = print_block(&module.functions);

    // Phase 4: Wrapping
    tracing::info!("[BBGC] Phase 4: Wrapping as {:?} module...", options.file_type);
    let meta = wrap_metadata(entry, options, helpers, &module);
    let code = options.file_type.wrapper().wrap(&body, &meta);

    tracing::info!("[BBGC] Code generation complete ({} bytes)", code.len());
    Ok(code)
}

/// Lower a graph without printing it. The result is the statement tree the
/// printer would render, which is what tests and tools inspect.
pub fn lower_graph(graph: &Graph, options: &CompileOptions) -> Result<LoweredModule, CompileError> {
    let entry = select_entry(graph, options.file_type);
    Lowering::new(graph).lower_module(entry)
}

/// Build the graph from a request and compile it.
pub fn compile_request(request: CompileRequest) -> Result<String, CompileError> {
    let graph = Graph::from_document(request.graph)?;
    compile_graph(&graph, &request.options)
}

/// Parse a JSON compile request and compile it.
pub fn compile_json(json: &str) -> Result<String, CompileError> {
    let request: CompileRequest = serde_json::from_str(json).map_err(GraphError::from)?;
    compile_request(request)
}

/// Build the graph from a request and validate it.
pub fn validate_request(request: ValidationRequest) -> Result<Vec<ValidationIssue>, GraphError> {
    let graph = Graph::from_document(request.graph)?;
    Ok(validate_graph(&graph, &request.options))
}

/// Parse a JSON validation request and validate it.
pub fn validate_json(json: &str) -> Result<Vec<ValidationIssue>, GraphError> {
    let request: ValidationRequest = serde_json::from_str(json)?;
    validate_request(request)
}

/// The entry the handler body starts from: the first entry matching the
/// file type, else the first non-function entry in node order.
fn select_entry(graph: &Graph, file_type: FileType) -> Option<&Node> {
    let preferred = match file_type {
        FileType::Command => NodeKind::Command,
        FileType::SlashCommand => NodeKind::SlashCommand,
        FileType::Event => NodeKind::Event,
    };

    let candidates: Vec<&Node> = graph
        .entry_nodes()
        .filter(|node| NodeKind::of(node) != Some(NodeKind::FunctionDefinition))
        .collect();

    let chosen = candidates
        .iter()
        .copied()
        .find(|node| NodeKind::of(node) == Some(preferred))
        .or_else(|| candidates.first().copied());

    match chosen {
        Some(entry) => {
            if candidates.len() > 1 {
                tracing::warn!(
                    "[BBGC] {} entry points found; only '{}' ({}) is compiled",
                    candidates.len(),
                    entry.label,
                    entry.id
                );
            }
            tracing::info!("[BBGC] Entry point: '{}' ({})", entry.label, entry.id);
        }
        None => tracing::warn!("[BBGC] No entry point found; the handler body will be empty"),
    }
    chosen
}

fn wrap_metadata(
    entry: Option<&Node>,
    options: &CompileOptions,
    helpers: String,
    module: &LoweredModule,
) -> WrapMetadata {
    let name = options
        .name
        .clone()
        .unwrap_or_else(|| default_name(entry, options.file_type));

    let description = options
        .description
        .clone()
        .or_else(|| entry.and_then(|e| e.literal_str("description")).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let params = options
        .params
        .clone()
        .unwrap_or_else(|| default_params(entry, options.file_type));

    let once = options
        .once
        .unwrap_or(options.file_type == FileType::Event && name == "ready");

    let command_options = if options.command_options.is_empty() {
        entry.map(declared_options).unwrap_or_default()
    } else {
        options.command_options.clone()
    };

    WrapMetadata {
        name,
        description,
        params,
        once,
        is_async: options.is_async,
        options: command_options,
        helpers,
        imports: module.imports.iter().map(|s| s.to_string()).collect(),
    }
}

fn default_name(entry: Option<&Node>, file_type: FileType) -> String {
    let Some(entry) = entry else {
        return "unnamed".to_string();
    };
    match file_type {
        FileType::Event => entry
            .literal_str("event")
            .map(str::to_string)
            .unwrap_or_else(|| event_name(&entry.label)),
        FileType::Command | FileType::SlashCommand => entry
            .literal_str("name")
            .unwrap_or("command")
            .to_string(),
    }
}

fn default_params(entry: Option<&Node>, file_type: FileType) -> Vec<String> {
    match file_type {
        FileType::Command => vec!["message".to_string(), "args".to_string()],
        FileType::SlashCommand => vec!["interaction".to_string()],
        FileType::Event => entry
            .map(|e| e.data_outputs().map(|(key, _)| key.to_string()).collect())
            .unwrap_or_default(),
    }
}

/// Options stored on a slash command entry node's `options` control.
fn declared_options(entry: &Node) -> Vec<CommandOption> {
    let Some(value) = entry.literal("options") else {
        return Vec::new();
    };
    match serde_json::from_value(value.clone()) {
        Ok(options) => options,
        Err(err) => {
            tracing::warn!(
                "[BBGC] Ignoring malformed command options on '{}': {}",
                entry.id,
                err
            );
            Vec::new()
        }
    }
}

/// The `discord.js` event name for an event node label.
///
/// Well-known labels map to their client event; anything else drops a
/// leading "On " and is camel-cased ("On Voice State Update" becomes
/// `voiceStateUpdate`).
pub fn event_name(label: &str) -> String {
    match label {
        "On Ready" => return "ready".to_string(),
        "On Message Create" => return "messageCreate".to_string(),
        "On Interaction Create" => return "interactionCreate".to_string(),
        "On Member Join" => return "guildMemberAdd".to_string(),
        _ => {}
    }

    let words = label
        .trim()
        .strip_prefix("On ")
        .unwrap_or(label.trim())
        .split_whitespace();

    let mut name = String::new();
    for (index, word) in words.enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                name.extend(first.to_lowercase());
            } else {
                name.extend(first.to_uppercase());
            }
            name.push_str(chars.as_str());
        }
    }
    if name.is_empty() {
        name.push_str("event");
    }
    name
}
