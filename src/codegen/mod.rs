//! # Blueprint Code Generation
//!
//! JavaScript generation for blueprint graphs, in four stages:
//!
//! 1. [`resolver`] turns data connections into expressions
//! 2. [`lowering`] turns execution edges into an [`ast`] statement tree
//! 3. [`printer`] renders the tree as text
//! 4. [`wrappers`] places the text inside a module for its file type

pub mod ast;
pub mod lowering;
mod node_handlers;
pub mod printer;
pub mod resolver;
pub mod wrappers;

pub use lowering::{LoweredModule, Lowering};
pub use printer::{indent_code, print_block, print_expr};
pub use wrappers::{CommandOption, FileType, OptionKind, WrapMetadata, Wrapper};
