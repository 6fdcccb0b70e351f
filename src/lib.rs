//! # Bot Blueprint Graph Compiler (BBGC)
//!
//! Compiler and static validator for visual bot blueprints. A blueprint is a
//! graph of nodes joined by execution edges (what runs next) and data edges
//! (where a value comes from). BBGC checks the graph for problems and turns
//! it into a `discord.js` CommonJS module.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bbgc::{compile_graph, validate_graph, CompileOptions, FileType, Graph, ValidationOptions};
//!
//! let graph = Graph::from_json(&std::fs::read_to_string("blueprint.json")?)?;
//!
//! for issue in validate_graph(&graph, &ValidationOptions::default()) {
//!     eprintln!("{}", issue);
//! }
//!
//! let code = compile_graph(&graph, &CompileOptions::new(FileType::Event))?;
//! std::fs::write("ready.js", code)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **Graph Model** - Typed nodes, sockets and connections ([`graph`])
//! 2. **Validation** - Independent rules producing advisory issues ([`validation`])
//! 3. **Expression Resolution** - Data edges to memoized expressions
//! 4. **Control-Flow Lowering** - Execution edges to a statement tree
//! 5. **Printing and Wrapping** - Text output in the module shape of the file type

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod validation;

// Re-export the main compilation API
pub use compiler::{
    compile_graph, compile_json, compile_request, lower_graph, validate_json, validate_request,
    CompileOptions, CompileRequest, ValidationRequest,
};

pub use codegen::{indent_code, CommandOption, FileType, OptionKind};
pub use error::{CompileError, GraphError, RuleError};
pub use graph::{Connection, DataType, Graph, GraphDocument, Node, NodeCategory, Socket, SocketKind};
pub use metadata::NodeKind;
pub use validation::{
    validate_graph, IssueSummary, Rule, Severity, ValidationIssue, ValidationOptions, Validator,
};
