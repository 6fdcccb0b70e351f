//! # Control-Flow Lowering
//!
//! Walks execution edges from an entry node and builds the statement tree.
//!
//! - A plain statement continues through its sequence pin. When a pin fans
//!   out to several nodes, each target is lowered in connection order up to
//!   the first node they all reach, and the walk continues from there.
//! - A branch lowers both arms up to their merge point, the first node
//!   (breadth-first from the true arm) that both arms reach. The merge point
//!   and everything after it is lowered once, after the `if`. Effectful
//!   values read both inside an arm and after the merge point are bound
//!   before the `if`.
//! - A loop lowers its body until control re-enters the loop node, then
//!   continues through the exit pin. The loop test is re-evaluated on every
//!   iteration, so effectful values it reads are re-assigned in the body.
//! - Every function definition is lowered separately into a function
//!   declaration.
//!
//! A walk stops at a node that is already being lowered further up the
//! current path, so cyclic graphs still terminate.

use super::ast::{BinaryOp, Block, Expr, Program, Stmt, VarKind};
use super::node_handlers;
use super::resolver::{sanitize_identifier, Resolver};
use crate::error::CompileError;
use crate::graph::pins::{
    BRANCH_FALSE_PINS, BRANCH_TRUE_PINS, ENTRY_PINS, LOOP_BODY_PINS, LOOP_EXIT_PINS,
    SEQUENCE_PINS,
};
use crate::graph::{Graph, Node};
use crate::metadata::{NodeKind, NodeRole};
use ahash::AHashSet;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Everything lowering produced for one module.
#[derive(Debug, Clone, Default)]
pub struct LoweredModule {
    /// Function declarations, in node order.
    pub functions: Vec<Stmt>,
    /// Body of the module's handler.
    pub body: Program,
    /// `discord.js` exports the generated code uses, sorted.
    pub imports: Vec<&'static str>,
}

pub struct Lowering<'g> {
    graph: &'g Graph,
    resolver: Resolver<'g>,
    on_path: AHashSet<&'g str>,
}

impl<'g> Lowering<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            resolver: Resolver::new(graph),
            on_path: AHashSet::new(),
        }
    }

    /// Lowers every function definition and, if given, the handler body
    /// rooted at `entry`.
    pub fn lower_module(mut self, entry: Option<&'g Node>) -> Result<LoweredModule, CompileError> {
        let graph = self.graph;

        let mut functions = Vec::new();
        for node in graph.nodes() {
            if NodeKind::of(node) == Some(NodeKind::FunctionDefinition) {
                functions.push(self.lower_function(node)?);
            }
        }

        let body = match entry {
            Some(entry) => self.lower_body(entry)?,
            None => Vec::new(),
        };

        Ok(LoweredModule {
            functions,
            body: Program { body },
            imports: self.resolver.imports(),
        })
    }

    fn lower_function(&mut self, definition: &'g Node) -> Result<Stmt, CompileError> {
        let declared = definition.literal_str("name").unwrap_or("function");
        let signature = self
            .resolver
            .function(declared)
            .filter(|signature| signature.node_id == definition.id)
            .cloned();
        let (name, params) = match signature {
            Some(signature) => (signature.name, signature.params),
            None => (
                self.resolver.fresh_name(&sanitize_identifier(declared)),
                node_handlers::function_params(definition),
            ),
        };
        debug!("[BBGC] Lowering function '{}' ({})", name, definition.id);

        self.resolver.enter_scope();
        for param in &params {
            self.resolver
                .bind(&definition.id, param, Expr::ident(param.clone()));
        }
        let body = self.lower_body(definition);
        self.resolver.exit_scope();

        Ok(Stmt::Function {
            name,
            params,
            is_async: true,
            body: body?,
        })
    }

    /// Lowers the chain leaving an entry node, with its blueprint variables
    /// declared up front.
    fn lower_body(&mut self, root: &'g Node) -> Result<Block, CompileError> {
        let outer_variables = self.resolver.replace_variables(Vec::new());
        let start = self.graph.pin_targets(&root.id, &ENTRY_PINS);

        self.on_path.insert(root.id.as_str());
        let chain = self.lower_scoped(start, &[]);
        self.on_path.remove(root.id.as_str());

        let variables = self.resolver.replace_variables(outer_variables);
        let mut block: Block = variables
            .into_iter()
            .map(|name| Stmt::VarDecl {
                kind: VarKind::Let,
                name,
                init: None,
            })
            .collect();
        block.extend(chain?);
        Ok(block)
    }

    fn lower_scoped(
        &mut self,
        targets: Vec<&'g str>,
        stops: &[&'g str],
    ) -> Result<Block, CompileError> {
        self.resolver.enter_scope();
        let block = self.lower_from(targets, stops);
        self.resolver.exit_scope();
        block
    }

    /// Lowers everything wired to one pin into the current scope.
    fn lower_from(
        &mut self,
        targets: Vec<&'g str>,
        stops: &[&'g str],
    ) -> Result<Block, CompileError> {
        let mut block = Vec::new();
        let next = self.lower_fan_out(targets, stops, &mut block)?;
        block.extend(self.lower_chain(next, stops)?);
        Ok(block)
    }

    /// Reduces the targets of one pin to a single continuation.
    ///
    /// Several targets are lowered one after another in connection order,
    /// each up to the first node all of them reach, and that node is where
    /// the walk goes on.
    fn lower_fan_out(
        &mut self,
        targets: Vec<&'g str>,
        stops: &[&'g str],
        block: &mut Block,
    ) -> Result<Option<&'g str>, CompileError> {
        if targets.len() < 2 {
            return Ok(targets.first().copied());
        }

        let arms: Vec<Vec<&'g str>> = targets.iter().map(|target| vec![*target]).collect();
        let merge = self.merge_point(&arms, stops);
        debug!(
            "[BBGC] Execution fans out to {} nodes, continuing at {:?}",
            targets.len(),
            merge
        );

        let arm_stops = with_stops(stops, merge);
        for target in targets {
            block.extend(self.lower_chain(Some(target), &arm_stops)?);
        }
        Ok(merge)
    }

    fn lower_chain(
        &mut self,
        start: Option<&'g str>,
        stops: &[&'g str],
    ) -> Result<Block, CompileError> {
        let graph = self.graph;
        let mut block = Vec::new();
        let mut entered = Vec::new();
        let mut current = start;

        let result = loop {
            let Some(id) = current else {
                break Ok(());
            };
            if stops.contains(&id) || self.on_path.contains(id) {
                break Ok(());
            }
            let Some(node) = graph.node(id) else {
                warn!("[BBGC] Execution continues into missing node '{}'", id);
                break Ok(());
            };

            self.on_path.insert(id);
            entered.push(id);
            match self.lower_node(node, stops, &mut block) {
                Ok(next) => current = next,
                Err(err) => break Err(err),
            }
        };

        for id in entered {
            self.on_path.remove(id);
        }
        result.map(|_| block)
    }

    /// Appends the statements for one node and returns where control goes next.
    fn lower_node(
        &mut self,
        node: &'g Node,
        stops: &[&'g str],
        block: &mut Block,
    ) -> Result<Option<&'g str>, CompileError> {
        let graph = self.graph;
        let kind = NodeKind::of(node).ok_or_else(|| CompileError::UnknownNodeType {
            node_id: node.id.clone(),
            label: node.label.clone(),
        })?;

        match kind {
            NodeKind::Branch => self.lower_branch(node, stops, block),
            NodeKind::While | NodeKind::DoWhile => self.lower_while(node, kind, stops, block),
            NodeKind::ForLoop => self.lower_for(node, stops, block),
            NodeKind::ForEach => self.lower_for_each(node, stops, block),
            _ => {
                let stmt = node_handlers::statement(kind, node, &mut self.resolver)?;
                block.extend(self.resolver.take_pending());
                block.push(stmt);
                if kind == NodeKind::Return {
                    return Ok(None);
                }
                let next = graph.pin_targets(&node.id, &SEQUENCE_PINS);
                self.lower_fan_out(next, stops, block)
            }
        }
    }

    fn lower_branch(
        &mut self,
        node: &'g Node,
        stops: &[&'g str],
        block: &mut Block,
    ) -> Result<Option<&'g str>, CompileError> {
        let graph = self.graph;
        let test = self.resolver.resolve_input(node, "condition")?;
        block.extend(self.resolver.take_pending());

        let when_true = graph.pin_targets(&node.id, &BRANCH_TRUE_PINS);
        let when_false = graph.pin_targets(&node.id, &BRANCH_FALSE_PINS);
        let arms = [when_true, when_false];
        let merge = self.merge_point(&arms, stops);
        if let Some(merge) = merge {
            debug!("[BBGC] Branch '{}' converges at '{}'", node.id, merge);
            self.bind_shared_values(&arms, merge, stops, block)?;
        }

        let [when_true, when_false] = arms;
        let arm_stops = with_stops(stops, merge);
        let consequent = self.lower_scoped(when_true, &arm_stops)?;
        let alternate = self.lower_scoped(when_false, &arm_stops)?;

        block.push(Stmt::If {
            test,
            consequent,
            alternate,
        });
        Ok(merge)
    }

    /// Resolves, in the current scope, every effectful value that statements
    /// inside the arms and statements from `merge` onward both read.
    fn bind_shared_values(
        &mut self,
        arms: &[Vec<&'g str>],
        merge: &'g str,
        stops: &[&'g str],
        block: &mut Block,
    ) -> Result<(), CompileError> {
        let graph = self.graph;
        let arm_stops = with_stops(stops, Some(merge));
        let inside = self.effectful_sources(
            arms.iter()
                .flat_map(|arm| self.reach_order(arm, &arm_stops))
                .filter(|id| !arm_stops.contains(id)),
        );
        if inside.is_empty() {
            return Ok(());
        }
        let after = self.effectful_sources(
            self.reach_order(&[merge], stops)
                .into_iter()
                .filter(|id| !stops.contains(id)),
        );

        for node in graph.nodes() {
            let id = node.id.as_str();
            if !inside.contains(id) || !after.contains(id) {
                continue;
            }
            debug!(
                "[BBGC] '{}' ({}) is read on both sides of a merge; binding it before the branch",
                node.label, node.id
            );
            for (output, _) in node.data_outputs() {
                if graph.is_output_consumed(id, output) {
                    self.resolver.resolve_output(id, output)?;
                }
            }
        }
        block.extend(self.resolver.take_pending());
        Ok(())
    }

    /// Effectful value nodes the given statements read, directly or through
    /// other value nodes.
    fn effectful_sources(&self, statements: impl IntoIterator<Item = &'g str>) -> AHashSet<&'g str> {
        let graph = self.graph;
        let mut found = AHashSet::new();
        let mut seen = AHashSet::new();
        let mut stack: Vec<&'g str> = Vec::new();

        let feeding = |id: &str| -> Vec<&'g str> {
            graph
                .incoming(id)
                .filter(|c| !c.is_exec())
                .map(|c| c.source.as_str())
                .collect()
        };
        for id in statements {
            if !self.on_path.contains(id) {
                stack.extend(feeding(id));
            }
        }

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(kind) = graph.node(id).and_then(NodeKind::of) else {
                continue;
            };
            if kind.role() != NodeRole::Value {
                continue;
            }
            if kind.is_effectful_value() {
                found.insert(id);
            }
            stack.extend(feeding(id));
        }
        found
    }

    fn lower_while(
        &mut self,
        node: &'g Node,
        kind: NodeKind,
        stops: &[&'g str],
        block: &mut Block,
    ) -> Result<Option<&'g str>, CompileError> {
        let graph = self.graph;
        let exits = graph.pin_targets(&node.id, &LOOP_EXIT_PINS);
        let body_stops = with_all_stops(stops, &exits);
        let body_start = graph.pin_targets(&node.id, &LOOP_BODY_PINS);

        if kind == NodeKind::DoWhile {
            // The test runs after the body, so it is resolved in the body's scope.
            self.resolver.enter_scope();
            let lowered = self.lower_from(body_start, &body_stops).and_then(|body| {
                let (test, refreshed) = self.resolver.resolve_repeated(node, "condition")?;
                Ok((body, test, refreshed))
            });
            self.resolver.exit_scope();
            let (mut body, test, refreshed) = lowered?;

            for (name, _) in &refreshed {
                block.push(Stmt::VarDecl {
                    kind: VarKind::Let,
                    name: name.clone(),
                    init: None,
                });
            }
            body.extend(reassignments(refreshed));
            block.push(Stmt::DoWhile { body, test });
        } else {
            let (test, refreshed) = self.resolver.resolve_repeated(node, "condition")?;
            for (name, value) in &refreshed {
                block.push(Stmt::VarDecl {
                    kind: VarKind::Let,
                    name: name.clone(),
                    init: Some(value.clone()),
                });
            }
            let mut body = self.lower_scoped(body_start, &body_stops)?;
            body.extend(reassignments(refreshed));
            block.push(Stmt::While { test, body });
        }

        self.lower_fan_out(exits, stops, block)
    }

    fn lower_for(
        &mut self,
        node: &'g Node,
        stops: &[&'g str],
        block: &mut Block,
    ) -> Result<Option<&'g str>, CompileError> {
        let graph = self.graph;
        let start = self.resolver.resolve_input(node, "start")?;
        let end = self.resolver.resolve_input(node, "end")?;
        let step = self
            .resolver
            .resolve_input_or(node, "step", Expr::number(1.0))?;
        block.extend(self.resolver.take_pending());

        let index = self.resolver.fresh_name("i");
        let exits = graph.pin_targets(&node.id, &LOOP_EXIT_PINS);
        let body_stops = with_all_stops(stops, &exits);

        self.resolver.enter_scope();
        self.resolver
            .bind(&node.id, "index", Expr::ident(index.clone()));
        let body = self.lower_from(graph.pin_targets(&node.id, &LOOP_BODY_PINS), &body_stops);
        self.resolver.exit_scope();

        block.push(Stmt::For {
            init: Box::new(Stmt::VarDecl {
                kind: VarKind::Let,
                name: index.clone(),
                init: Some(start),
            }),
            test: Expr::binary(BinaryOp::Lt, Expr::ident(index.clone()), end),
            update: Expr::assign(Some(BinaryOp::Add), Expr::ident(index), step),
            body: body?,
        });
        self.lower_fan_out(exits, stops, block)
    }

    fn lower_for_each(
        &mut self,
        node: &'g Node,
        stops: &[&'g str],
        block: &mut Block,
    ) -> Result<Option<&'g str>, CompileError> {
        let graph = self.graph;
        let array = self.resolver.resolve_input(node, "array")?;
        block.extend(self.resolver.take_pending());

        let item = self.resolver.fresh_name("item");
        let (binding, iterable, index) = if graph.is_output_consumed(&node.id, "index") {
            let index = self.resolver.fresh_name("index");
            (
                format!("[{}, {}]", index, item),
                Expr::method(array, "entries", vec![]),
                Some(index),
            )
        } else {
            (item.clone(), array, None)
        };

        let exits = graph.pin_targets(&node.id, &LOOP_EXIT_PINS);
        let body_stops = with_all_stops(stops, &exits);

        self.resolver.enter_scope();
        self.resolver.bind(&node.id, "item", Expr::ident(item));
        if let Some(index) = index {
            self.resolver.bind(&node.id, "index", Expr::ident(index));
        }
        let body = self.lower_from(graph.pin_targets(&node.id, &LOOP_BODY_PINS), &body_stops);
        self.resolver.exit_scope();

        block.push(Stmt::ForOf {
            binding,
            iterable,
            body: body?,
        });
        self.lower_fan_out(exits, stops, block)
    }

    /// First node reachable from every arm, in breadth-first order from the
    /// first arm. Search does not continue past `stops` or the current path.
    fn merge_point(&self, arms: &[Vec<&'g str>], stops: &[&'g str]) -> Option<&'g str> {
        let (first, rest) = arms.split_first()?;
        if first.is_empty() || rest.iter().any(|arm| arm.is_empty()) {
            return None;
        }
        let others: Vec<AHashSet<&str>> = rest
            .iter()
            .map(|arm| self.reach_order(arm, stops).into_iter().collect())
            .collect();
        self.reach_order(first, stops)
            .into_iter()
            .find(|id| others.iter().all(|reached| reached.contains(id)))
    }

    fn reach_order(&self, starts: &[&'g str], stops: &[&'g str]) -> Vec<&'g str> {
        let graph = self.graph;
        let mut order = Vec::new();
        let mut seen: AHashSet<&str> = AHashSet::new();
        let mut queue: VecDeque<&'g str> = starts.iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) || graph.node(id).is_none() {
                continue;
            }
            order.push(id);
            if stops.contains(&id) || self.on_path.contains(id) {
                continue;
            }
            for connection in graph.outgoing(id).filter(|c| c.is_exec()) {
                queue.push_back(connection.target.as_str());
            }
        }
        order
    }
}

fn with_stops<'g>(stops: &[&'g str], extra: Option<&'g str>) -> Vec<&'g str> {
    let mut stops = stops.to_vec();
    stops.extend(extra);
    stops
}

fn with_all_stops<'g>(stops: &[&'g str], extra: &[&'g str]) -> Vec<&'g str> {
    let mut stops = stops.to_vec();
    stops.extend_from_slice(extra);
    stops
}

/// `name = value;` for each binding a loop test reads afresh.
fn reassignments(refreshed: Vec<(String, Expr)>) -> impl Iterator<Item = Stmt> {
    refreshed
        .into_iter()
        .map(|(name, value)| Stmt::expr(Expr::assign(None, Expr::ident(name), value)))
}
