//! # mudweave-core
//!
//! Core types for the mudweave client.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other mudweave crates. It provides:
//!
//! - Identifier types (RoomId, EdgeId, SessionId)
//! - Session state and event types
//! - The direction table used by the automapper
//! - The game definition (configuration) loaded from YAML
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other mudweave crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod direction;
pub mod error;
pub mod event;
pub mod ids;
pub mod session;

// Re-export commonly used types
pub use config::{GameConfig, GameStrings, HookConfig};
pub use direction::{is_storable_name, DirectionSpec, DirectionTable};
pub use error::{Error, Result};
pub use event::{ChannelId, SessionEvent, MAIN_CHANNEL};
pub use ids::{EdgeId, RoomId};
pub use session::{SessionId, SessionState};
