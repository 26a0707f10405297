//! Session listeners for terminal output

pub mod console;

pub use console::ConsoleListener;
