//! # mudweave-session
//!
//! Connection handling for the mudweave client.
//!
//! This crate provides:
//! - Accumulate-and-drain text queues between threads
//! - Line hooks and ordered hook chains
//! - Telnet command filtering
//! - The session itself: connect, input and output pumps, events
//! - Noun harvesting for tab completion
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on mudweave-core and
//! mudweave-map, and feeds every outbound line to the automapper.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod completer;
pub mod hook;
pub mod queue;
pub mod session;
pub mod telnet;

// Re-export commonly used types
pub use completer::Completer;
pub use hook::{
    ChainOutcome, Condition, FunctionHook, HighlightHook, HighlightLineHook, Hook, HookChain,
    StreamHook, SuppressHook, Trigger, TriggerList,
};
pub use queue::LineQueue;
pub use session::{EventCallback, Session, SessionBuilder};
pub use telnet::{Filtered, TelnetFilter, Utf8Decoder};
