//! mudweave client library
//!
//! This library contains the line front-end: input parsing, command
//! execution and output formatting. The actual client binary is in main.rs.

pub mod frontend;

// Re-export commonly used types
pub use frontend::{execute, format_channel, format_event, load_config, resolve, Command};
