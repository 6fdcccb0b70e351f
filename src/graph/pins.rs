//! # Execution Pins
//!
//! The one place that decides which pins carry control flow. Validation and
//! lowering both read from here so they always agree on what an execution
//! edge is.

/// Every pin name that carries control flow. Any other pin is a data pin.
pub const EXEC_PINS: [&str; 12] = [
    "exec", "act", "true", "false", "loopBody", "then", "else", "default", "done", "body",
    "complete", "exec_out",
];

/// Output pins that continue a plain statement sequence, in lookup order.
pub const SEQUENCE_PINS: [&str; 4] = ["exec_out", "exec", "then", "act"];

/// Output pins an entry node (event, command, function) starts its body from.
pub const ENTRY_PINS: [&str; 5] = ["exec", "exec_out", "body", "then", "act"];

/// Output pins taken when a branch condition holds.
pub const BRANCH_TRUE_PINS: [&str; 2] = ["true", "then"];

/// Output pins taken when a branch condition fails.
pub const BRANCH_FALSE_PINS: [&str; 2] = ["false", "else"];

/// Output pins that start a loop body.
pub const LOOP_BODY_PINS: [&str; 2] = ["loopBody", "body"];

/// Output pins that continue after a loop finishes.
pub const LOOP_EXIT_PINS: [&str; 2] = ["complete", "done"];

pub fn is_exec_pin(name: &str) -> bool {
    EXEC_PINS.contains(&name)
}

pub fn is_loop_body_pin(name: &str) -> bool {
    LOOP_BODY_PINS.contains(&name)
}
