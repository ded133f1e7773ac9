//! Rooms and edges of the map graph.

use std::collections::{BTreeMap, BTreeSet};

use mudweave_core::{EdgeId, RoomId};

/// A location in the game.
///
/// Rooms never point at each other directly: exits name an [`EdgeId`] that is
/// resolved through the owning [`Map`](crate::Map).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub(crate) id: RoomId,
    pub(crate) tag: String,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) mark: u64,
    pub(crate) comp: u32,
    pub(crate) exits: BTreeMap<String, EdgeId>,
    pub(crate) virtual_exits: BTreeSet<RoomId>,
}

impl Room {
    pub(crate) fn new(id: RoomId, tag: &str) -> Self {
        Self {
            id,
            tag: tag.to_string(),
            x: 0,
            y: 0,
            mark: 0,
            comp: 0,
            exits: BTreeMap::new(),
            virtual_exits: BTreeSet::new(),
        }
    }

    /// Room id.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Free text label.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Layout coordinates. Only meaningful while [`Room::mark`] equals the
    /// map's current layout mark.
    pub fn coords(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Layout pass that last placed this room.
    pub fn mark(&self) -> u64 {
        self.mark
    }

    /// Connected component number from the last layout pass.
    pub fn comp(&self) -> u32 {
        self.comp
    }

    /// Exit names and the edges behind them.
    pub fn exits(&self) -> impl Iterator<Item = (&str, EdgeId)> {
        self.exits.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Whether the room has an exit with that exact name.
    pub fn has_exit(&self, name: &str) -> bool {
        self.exits.contains_key(name)
    }

    /// Edge behind an exit.
    pub fn exit(&self, name: &str) -> Option<EdgeId> {
        self.exits.get(name).copied()
    }

    /// Targets of pathfinding-only shortcuts.
    pub fn virtual_exits(&self) -> impl Iterator<Item = RoomId> + '_ {
        self.virtual_exits.iter().copied()
    }
}

/// A connection between two rooms, named independently at each end.
///
/// An empty name means the edge cannot be walked from that end (one-way exit).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub(crate) a: RoomId,
    pub(crate) a_name: String,
    pub(crate) b: RoomId,
    pub(crate) b_name: String,
    pub(crate) split: bool,
}

impl Edge {
    /// First endpoint.
    pub fn a(&self) -> RoomId {
        self.a
    }

    /// Exit name at the first endpoint.
    pub fn a_name(&self) -> &str {
        &self.a_name
    }

    /// Second endpoint.
    pub fn b(&self) -> RoomId {
        self.b
    }

    /// Exit name at the second endpoint.
    pub fn b_name(&self) -> &str {
        &self.b_name
    }

    /// Whether the edge is excluded from coordinate propagation.
    pub fn is_split(&self) -> bool {
        self.split
    }

    /// Both ends as `(room, exit name)` pairs.
    pub fn ends(&self) -> [(RoomId, &str); 2] {
        [(self.a, &self.a_name), (self.b, &self.b_name)]
    }

    /// Room reached by leaving `room` through the exit `name`.
    pub fn target_from(&self, room: RoomId, name: &str) -> Option<RoomId> {
        if self.a == room && self.a_name == name {
            Some(self.b)
        } else if self.b == room && self.b_name == name {
            Some(self.a)
        } else {
            None
        }
    }

    /// Whether `room` is one of the endpoints.
    pub fn touches(&self, room: RoomId) -> bool {
        self.a == room || self.b == room
    }
}
