//! CLI support for the `docpack` binary.

pub mod args;
pub mod commands;
pub mod context;

pub use context::CommandContext;
