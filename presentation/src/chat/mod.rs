//! Interactive chat module
//!
//! Provides a line-based console for a live session.

pub mod command;
mod repl;

pub use command::{ChatCommand, CommandError};
pub use repl::ChatRepl;
