//! # Expression Resolver
//!
//! Turns data connections into expressions. Every `(node, output)` pair is
//! resolved at most once per scope; later reads reuse the cached expression.
//!
//! Inputs resolve in this order:
//!
//! 1. the connected upstream output,
//! 2. the literal typed into the node,
//! 3. the default for the input's data type.
//!
//! Value nodes with side effects (random numbers, API fetches) are not
//! inlined. Their first read emits a `const` binding into the pending queue,
//! and the lowering pass places it in front of the statement being built.
//! Bindings live in the innermost open scope and disappear with it; a
//! binding that shadows an outer one restores it on the way out.
//!
//! Loop tests are evaluated on every iteration, so they are resolved with
//! [`Resolver::resolve_repeated`], which ignores value bindings made outside
//! the test and hands effectful values back for re-assignment.

use super::ast::{Expr, Stmt};
use super::node_handlers;
use crate::error::CompileError;
use crate::graph::{DataType, Graph, Node};
use crate::metadata::{is_identifier, NodeKind, NodeRole, RESERVED_WORDS};
use ahash::{AHashMap, AHashSet};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Names the generated module reads without declaring them.
const AMBIENT_NAMES: [&str; 12] = [
    "args",
    "client",
    "console",
    "interaction",
    "Math",
    "message",
    "module",
    "Promise",
    "require",
    "resolve",
    "setTimeout",
    "String",
];

/// Makes `name` usable as a JavaScript binding.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        out.push_str("value");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) || RESERVED_WORDS.contains(&out.as_str()) {
        out.insert(0, '_');
    }
    debug_assert!(is_identifier(&out));
    out
}

/// Zero value used when an input is neither connected nor filled in.
pub fn default_for(ty: Option<DataType>) -> Expr {
    match ty {
        Some(DataType::String) => Expr::string(""),
        Some(DataType::Number) => Expr::number(0.0),
        Some(DataType::Boolean) => Expr::boolean(false),
        _ => Expr::undefined(),
    }
}

/// Converts a literal control value, coercing text typed into number and
/// boolean controls.
pub fn literal_expr(value: &Value, ty: Option<DataType>) -> Expr {
    match value {
        Value::String(text) => match ty {
            Some(DataType::Number) => match text.trim().parse::<f64>() {
                Ok(number) => Expr::number(number),
                Err(_) => Expr::string(text.as_str()),
            },
            Some(DataType::Boolean) if matches!(text.trim(), "true" | "false") => {
                Expr::boolean(text.trim() == "true")
            }
            _ if text.contains("${") => Expr::Template(text.clone()),
            _ => Expr::string(text.as_str()),
        },
        Value::Number(number) => Expr::number(number.as_f64().unwrap_or(0.0)),
        Value::Bool(flag) => Expr::boolean(*flag),
        Value::Null => Expr::undefined(),
        other => Expr::Json(other.clone()),
    }
}

/// A user-defined function as seen from call sites.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// The definition node that owns the name.
    pub node_id: String,
    pub name: String,
    pub params: Vec<String>,
}

type OutputKey = (String, String);

/// Per-compilation expression state. Created fresh by each lowering pass.
pub struct Resolver<'g> {
    graph: &'g Graph,
    cache: AHashMap<OutputKey, Expr>,
    scopes: Vec<Vec<(OutputKey, Option<Expr>)>>,
    /// Scope depth from which value bindings count while a loop test is resolved.
    fresh_from: Option<usize>,
    in_progress: AHashSet<String>,
    pending: Vec<Stmt>,
    names: AHashSet<String>,
    imports: BTreeSet<&'static str>,
    variables: Vec<String>,
    functions: AHashMap<String, FunctionSignature>,
}

impl<'g> Resolver<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        let mut resolver = Self {
            graph,
            cache: AHashMap::new(),
            scopes: Vec::new(),
            fresh_from: None,
            in_progress: AHashSet::new(),
            pending: Vec::new(),
            names: AHashSet::new(),
            imports: BTreeSet::new(),
            variables: Vec::new(),
            functions: AHashMap::new(),
        };

        for name in AMBIENT_NAMES {
            resolver.reserve(name);
        }
        for node in graph.nodes() {
            if node.is_entry() {
                for (output, _) in node.data_outputs() {
                    resolver.reserve(output);
                }
            }
            if matches!(
                NodeKind::of(node),
                Some(NodeKind::SetVariable | NodeKind::GetVariable)
            ) {
                if let Some(name) = node.literal_str("name") {
                    resolver.reserve(&sanitize_identifier(name));
                }
            }
        }

        for node in graph.nodes() {
            if NodeKind::of(node) != Some(NodeKind::FunctionDefinition) {
                continue;
            }
            let declared = node.literal_str("name").unwrap_or("function");
            if resolver.functions.contains_key(declared) {
                warn!(
                    "[BBGC] Function '{}' is defined more than once; node '{}' is ignored by calls",
                    declared, node.id
                );
                continue;
            }
            let name = resolver.fresh_name(&sanitize_identifier(declared));
            let params = node_handlers::function_params(node);
            resolver
                .functions
                .insert(
                    declared.to_string(),
                    FunctionSignature {
                        node_id: node.id.clone(),
                        name,
                        params,
                    },
                );
        }

        resolver
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Drops every binding made since the matching [`enter_scope`](Self::enter_scope).
    pub fn exit_scope(&mut self) {
        if let Some(bindings) = self.scopes.pop() {
            for (key, shadowed) in bindings.into_iter().rev() {
                match shadowed {
                    Some(expr) => self.cache.insert(key, expr),
                    None => self.cache.remove(&key),
                };
            }
        }
    }

    /// Closes the innermost scope but keeps its bindings alive in the parent.
    fn merge_scope(&mut self) {
        if let Some(bindings) = self.scopes.pop() {
            if let Some(parent) = self.scopes.last_mut() {
                parent.extend(bindings);
            }
        }
    }

    /// Records the expression that stands for `node_id.output` in the current scope.
    pub fn bind(&mut self, node_id: &str, output: &str, expr: Expr) {
        let key = (node_id.to_string(), output.to_string());
        let shadowed = self.cache.insert(key.clone(), expr);
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((key, shadowed));
        }
    }

    /// A cached value binding made before the loop test being resolved.
    fn is_stale(&self, key: &OutputKey) -> bool {
        let Some(depth) = self.fresh_from else {
            return false;
        };
        let is_value = self
            .graph
            .node(&key.0)
            .and_then(NodeKind::of)
            .is_some_and(|kind| kind.role() == NodeRole::Value);
        is_value
            && !self.scopes[depth.min(self.scopes.len())..]
                .iter()
                .flatten()
                .any(|(bound, _)| bound == key)
    }

    /// Hoisted declarations waiting to be placed before the current statement.
    pub fn take_pending(&mut self) -> Vec<Stmt> {
        std::mem::take(&mut self.pending)
    }

    pub fn reserve(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    /// An unused binding name derived from `hint`: `hint`, `hint2`, `hint3`, ...
    pub fn fresh_name(&mut self, hint: &str) -> String {
        if self.names.insert(hint.to_string()) {
            return hint.to_string();
        }
        let mut suffix = 2u32;
        loop {
            let candidate = format!("{}{}", hint, suffix);
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Marks a `discord.js` export as used by the generated code.
    pub fn require(&mut self, export: &'static str) {
        self.imports.insert(export);
    }

    pub fn imports(&self) -> Vec<&'static str> {
        self.imports.iter().copied().collect()
    }

    /// Registers a blueprint variable with the body being lowered and
    /// returns its binding name.
    pub fn use_variable(&mut self, name: &str) -> String {
        let name = sanitize_identifier(name);
        if !self.variables.contains(&name) {
            self.variables.push(name.clone());
        }
        name
    }

    /// Swaps the variable list of the body being lowered.
    pub fn replace_variables(&mut self, variables: Vec<String>) -> Vec<String> {
        std::mem::replace(&mut self.variables, variables)
    }

    pub fn function(&self, declared: &str) -> Option<&FunctionSignature> {
        self.functions.get(declared)
    }

    /// Whether an input has an upstream node or a non-blank literal.
    pub fn is_satisfied(&self, node: &Node, key: &str) -> bool {
        let graph = self.graph;
        graph
            .data_source(&node.id, key)
            .is_some_and(|c| graph.node(&c.source).is_some())
            || node.has_literal(key)
    }

    /// The literal typed into `key`, or the type default. Ignores connections.
    pub fn literal_or_default(&self, node: &Node, key: &str, ty: Option<DataType>) -> Expr {
        match node.literal(key) {
            Some(value) => literal_expr(value, ty),
            None => default_for(ty),
        }
    }

    pub fn resolve_input(&mut self, node: &Node, key: &str) -> Result<Expr, CompileError> {
        let graph = self.graph;
        if let Some(connection) = graph.data_source(&node.id, key) {
            if graph.node(&connection.source).is_some() {
                return self.resolve_output(&connection.source, &connection.source_output);
            }
            debug!(
                "[BBGC] Input '{}' of '{}' points at missing node '{}'",
                key, node.id, connection.source
            );
        }
        let ty = node.input_type(key);
        Ok(self.literal_or_default(node, key, ty))
    }

    /// Resolves an input when it is satisfied, otherwise uses `fallback`.
    pub fn resolve_input_or(
        &mut self,
        node: &Node,
        key: &str,
        fallback: Expr,
    ) -> Result<Expr, CompileError> {
        if self.is_satisfied(node, key) {
            self.resolve_input(node, key)
        } else {
            Ok(fallback)
        }
    }

    /// Resolves an input that is evaluated again on every loop iteration.
    ///
    /// Value nodes are resolved afresh even when an earlier statement already
    /// bound them. Effectful values come back as `(name, value)` pairs instead
    /// of pending `const` declarations: the caller declares each name with
    /// `let` and assigns it again before the next evaluation of the test.
    /// The bindings stay visible to the rest of the current scope.
    pub fn resolve_repeated(
        &mut self,
        node: &Node,
        key: &str,
    ) -> Result<(Expr, Vec<(String, Expr)>), CompileError> {
        let outer_pending = std::mem::take(&mut self.pending);
        let outer_fresh = self.fresh_from.replace(self.scopes.len());
        self.enter_scope();
        let test = self.resolve_input(node, key);
        self.merge_scope();
        self.fresh_from = outer_fresh;
        let pending = std::mem::replace(&mut self.pending, outer_pending);

        let refreshed = pending
            .into_iter()
            .filter_map(|stmt| match stmt {
                Stmt::VarDecl {
                    name,
                    init: Some(value),
                    ..
                } => Some((name, value)),
                _ => None,
            })
            .collect();
        Ok((test?, refreshed))
    }

    /// Resolves an input that names a handler argument (`message`,
    /// `interaction`, `client`), falling back to the argument of that name.
    pub fn resolve_context(&mut self, node: &Node, key: &str) -> Result<Expr, CompileError> {
        self.resolve_input_or(node, key, Expr::ident(key))
    }

    pub fn resolve_output(&mut self, node_id: &str, output: &str) -> Result<Expr, CompileError> {
        let key = (node_id.to_string(), output.to_string());
        if let Some(expr) = self.cache.get(&key) {
            if !self.is_stale(&key) {
                return Ok(expr.clone());
            }
        }

        let graph = self.graph;
        let Some(node) = graph.node(node_id) else {
            warn!("[BBGC] Node '{}' does not exist; reading undefined", node_id);
            return Ok(Expr::undefined());
        };

        if node.is_entry() {
            let expr = Expr::ident(output);
            self.bind(node_id, output, expr.clone());
            return Ok(expr);
        }

        let kind = NodeKind::of(node).ok_or_else(|| CompileError::UnknownNodeType {
            node_id: node.id.clone(),
            label: node.label.clone(),
        })?;

        match kind.role() {
            NodeRole::Value => {}
            NodeRole::Entry => {
                let expr = Expr::ident(output);
                self.bind(node_id, output, expr.clone());
                return Ok(expr);
            }
            NodeRole::Statement | NodeRole::Control => {
                warn!(
                    "[BBGC] Output '{}' of '{}' ({}) is read where that node has not run; reading undefined",
                    output, node.label, node.id
                );
                return Ok(Expr::undefined());
            }
        }

        if !self.in_progress.insert(node.id.clone()) {
            warn!(
                "[BBGC] Data cycle through '{}' ({}); reading undefined",
                node.label, node.id
            );
            return Ok(Expr::undefined());
        }
        let value = node_handlers::value_expr(kind, node, self);
        self.in_progress.remove(&node.id);
        let value = value?;

        let expr = if kind.is_effectful_value() {
            let name = self.fresh_name(node_handlers::binding_hint(kind));
            self.pending.push(Stmt::constant(name.clone(), value));
            Expr::ident(name)
        } else {
            value
        };

        self.bind(node_id, output, expr.clone());
        Ok(expr)
    }
}
