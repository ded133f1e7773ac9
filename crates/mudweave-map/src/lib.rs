//! # mudweave-map
//!
//! The room graph and the automapper.
//!
//! This crate provides:
//! - An arena of rooms connected by named, possibly asymmetric edges
//! - Coordinate layout by depth-first propagation over compass exits
//! - ASCII rendering of each connected component
//! - The line-oriented map file format
//! - Shortest paths over real and virtual exits
//! - The movement-driven [`Mapper`] with undo history and its command surface
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on mudweave-core only.
//! Callers that share a mapper between threads wrap it in a single mutex;
//! every operation here takes `&mut self`, so a render can never observe a
//! half-applied mutation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod layout;
pub mod map;
pub mod mapper;
pub mod path;
pub mod persist;
pub mod render;
pub mod room;

// Re-export commonly used types
pub use command::{CommandRegistry, CommandResult};
pub use map::Map;
pub use mapper::{MapNotification, Mapper, MapperMode, Move, MoveKind, PendingCycle};
pub use persist::MAP_MAGIC;
pub use render::Canvas;
pub use room::{Edge, Room};
