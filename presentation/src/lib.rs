//! Presentation layer for horo
//!
//! This crate contains CLI definitions, output formatters,
//! session listeners, and the interactive chat console.

pub mod chat;
pub mod cli;
pub mod listener;
pub mod output;

// Re-export commonly used types
pub use chat::{ChatCommand, ChatRepl, CommandError};
pub use cli::commands::{Cli, RoleArg};
pub use listener::ConsoleListener;
pub use output::console::ConsoleFormatter;
