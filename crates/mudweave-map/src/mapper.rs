//! The movement-driven automapper.
//!
//! Every outgoing line is offered to [`Mapper::handle_input`]. Lines naming
//! an exit move the player marker; in `auto` and `catchall` mode unknown
//! exits create rooms, or close a cycle when the target coordinate is
//! already taken in the current component.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};

use mudweave_core::{is_storable_name, DirectionTable, EdgeId, Error, Result, RoomId};

use crate::command::{CommandRegistry, CommandResult};
use crate::map::Map;

/// How movement lines mutate the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MapperMode {
    /// Follow known exits only.
    #[default]
    Fixed,
    /// Create rooms for unknown compass names and synonyms.
    Auto,
    /// Create rooms for any line at all.
    Catchall,
    /// Ignore movement.
    Off,
}

impl MapperMode {
    /// Lower-case mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Auto => "auto",
            Self::Catchall => "catchall",
            Self::Off => "off",
        }
    }

    /// Whether unknown exits create topology.
    pub fn creates_rooms(&self) -> bool {
        matches!(self, Self::Auto | Self::Catchall)
    }
}

impl fmt::Display for MapperMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapperMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "auto" => Ok(Self::Auto),
            "catchall" => Ok(Self::Catchall),
            "off" => Ok(Self::Off),
            other => Err(Error::InvalidInput(format!(
                "unknown mapper mode '{other}' (valid: fixed, auto, catchall, off)"
            ))),
        }
    }
}

/// What a history entry did to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveKind {
    /// Followed an existing exit.
    Plain = 0,
    /// Added an edge to a room already on the map.
    CycleConnect = 1,
    /// Added a room and the edge leading to it.
    RoomCreated = 2,
}

/// One entry of the move history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// Room the player ended up in
    pub room: RoomId,
    /// Exit taken; empty for the root entry and jumps
    pub direction: String,
    /// What the move did
    pub kind: MoveKind,
    /// Edge added by the move, if any
    pub edge: Option<EdgeId>,
}

impl Move {
    fn plain(room: RoomId, direction: &str) -> Self {
        Self {
            room,
            direction: direction.to_string(),
            kind: MoveKind::Plain,
            edge: None,
        }
    }
}

/// A cycle the mapper closed and that may still be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCycle {
    /// Room the move started in
    pub from: RoomId,
    /// Exit taken
    pub direction: String,
    /// Room the exit was connected to
    pub found: RoomId,
    /// The new edge
    pub edge: EdgeId,
}

/// What a move did, for the session to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapNotification {
    /// The marker moved along a known exit.
    Moved,
    /// Rooms or edges were added.
    Modified,
    /// A cycle was closed onto an existing room.
    NewCycle,
}

/// Automapper state: the map, the mode, the move history and the last
/// closed cycle.
///
/// The history always holds at least the root entry.
#[derive(Debug)]
pub struct Mapper {
    map: Map,
    directions: Arc<DirectionTable>,
    map_dir: PathBuf,
    mode: MapperMode,
    move_stack: Vec<Move>,
    last_cycle: Option<PendingCycle>,
    commands: CommandRegistry,
}

impl Mapper {
    /// Create a mapper over an empty map called `default`.
    pub fn new(directions: Arc<DirectionTable>, map_dir: impl Into<PathBuf>) -> Self {
        let map = Map::new("default", Arc::clone(&directions));
        let root = Move::plain(map.current(), "");
        Self {
            map,
            directions,
            map_dir: map_dir.into(),
            mode: MapperMode::default(),
            move_stack: vec![root],
            last_cycle: None,
            commands: CommandRegistry::with_builtins(),
        }
    }

    /// The map.
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// The map, for manual editing.
    pub fn map_mut(&mut self) -> &mut Map {
        &mut self.map
    }

    /// Direction vocabulary.
    pub fn directions(&self) -> &Arc<DirectionTable> {
        &self.directions
    }

    /// Directory maps are saved in.
    pub fn map_dir(&self) -> &Path {
        &self.map_dir
    }

    /// Current mode.
    pub fn mode(&self) -> MapperMode {
        self.mode
    }

    /// Change the mode.
    pub fn set_mode(&mut self, mode: MapperMode) {
        info!("Mapper mode: {}", mode);
        self.mode = mode;
    }

    /// Move history, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.move_stack
    }

    /// The last closed cycle, if it can still be rejected.
    pub fn pending_cycle(&self) -> Option<&PendingCycle> {
        self.last_cycle.as_ref()
    }

    /// Built-in map commands.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Lay the map out and draw it.
    pub fn render(&mut self, only_current: bool) -> Vec<String> {
        self.map.render(only_current)
    }

    /// Replace the map and restart the history at its current room.
    pub fn replace_map(&mut self, map: Map) {
        self.map = map;
        self.reset_history();
    }

    fn reset_history(&mut self) {
        self.move_stack = vec![Move::plain(self.map.current(), "")];
        self.last_cycle = None;
    }

    /// Offer an outgoing line to the mapper.
    ///
    /// The line is taken as an exit name if the current room has that exit
    /// or the mode is `catchall`; otherwise it must be a known direction or
    /// synonym. Anything else is ignored.
    pub fn handle_input(&mut self, line: &str) -> Result<Option<MapNotification>> {
        let line = line.trim();
        if self.mode == MapperMode::Off || line.is_empty() {
            return Ok(None);
        }
        let direction = if self.map.current_room().has_exit(line) || self.mode == MapperMode::Catchall
        {
            line.to_string()
        } else {
            match self.directions.canonical(line) {
                Some(canonical) => canonical.to_string(),
                None => return Ok(None),
            }
        };
        self.go_to(&direction)
    }

    /// Walk `direction` from the current room.
    pub fn go_to(&mut self, direction: &str) -> Result<Option<MapNotification>> {
        self.last_cycle = None;
        if self.mode == MapperMode::Off {
            return Ok(None);
        }

        let current = self.map.current();
        if let Some(target) = self.map.exit_target(current, direction) {
            self.map.set_current(target)?;
            self.move_stack.push(Move::plain(target, direction));
            debug!("Moved {} to room {}", direction, target);
            return Ok(Some(MapNotification::Moved));
        }

        if !self.mode.creates_rooms() {
            return Ok(None);
        }
        if !is_storable_name(direction) {
            return Err(Error::InvalidName(direction.to_string()));
        }
        let back = self.directions.mirror(direction).to_string();

        self.map.update_coords();
        let here = self.map.current_room();
        let (x, y) = here.coords();
        let comp = here.comp();
        let found = self
            .directions
            .calc(direction, x, y)
            .and_then(|(nx, ny)| self.map.room_at(comp, nx, ny, current));

        if let Some(found) = found {
            match self.map.connect(current, direction, found, &back) {
                Ok(edge) => {
                    self.map.set_current(found)?;
                    self.move_stack.push(Move {
                        room: found,
                        direction: direction.to_string(),
                        kind: MoveKind::CycleConnect,
                        edge: Some(edge),
                    });
                    self.last_cycle = Some(PendingCycle {
                        from: current,
                        direction: direction.to_string(),
                        found,
                        edge,
                    });
                    info!("Closed cycle {} from room {} to room {}", direction, current, found);
                    return Ok(Some(MapNotification::NewCycle));
                }
                Err(Error::TopologyConflict { room, exit }) => {
                    debug!(
                        "Cycle to room {} blocked by exit '{}' in room {}, creating a room",
                        found, exit, room
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let (room, edge) = self.create_room(current, direction, &back)?;
        self.move_stack.push(Move {
            room,
            direction: direction.to_string(),
            kind: MoveKind::RoomCreated,
            edge: Some(edge),
        });
        self.map.update_coords();
        Ok(Some(MapNotification::Modified))
    }

    fn create_room(&mut self, from: RoomId, direction: &str, back: &str) -> Result<(RoomId, EdgeId)> {
        let room = self.map.add_room("")?;
        match self.map.connect(from, direction, room, back) {
            Ok(edge) => {
                self.map.set_current(room)?;
                info!("Created room {} {} of room {}", room, direction, from);
                Ok((room, edge))
            }
            Err(e) => {
                self.map.remove_room(room)?;
                Err(e)
            }
        }
    }

    /// Revert the last history entry. Returns `None` when only the root
    /// entry is left.
    pub fn undo(&mut self) -> Option<Move> {
        if self.move_stack.len() <= 1 {
            return None;
        }
        let last = self.move_stack.pop()?;
        let back_to = self.move_stack.last()?.room;
        self.last_cycle = None;

        if self.map.set_current(back_to).is_err() {
            debug!("Undo target room {} no longer exists", back_to);
        }
        if let Some(edge) = last.edge {
            self.map.remove_edge(edge);
        }
        if last.kind == MoveKind::RoomCreated && last.room != self.map.current() {
            if let Err(e) = self.map.remove_room(last.room) {
                debug!("Undo could not remove room {}: {}", last.room, e);
            }
        }
        debug!("Undid {:?} move {} to room {}", last.kind, last.direction, last.room);
        Some(last)
    }

    /// Reject the last closed cycle: the new edge is dropped and a fresh
    /// room is created behind the exit instead. Returns the new room.
    pub fn nocycle(&mut self) -> Result<RoomId> {
        let pending = self
            .last_cycle
            .take()
            .ok_or_else(|| Error::InvalidInput("there was no cycle".to_string()))?;

        self.map.remove_edge(pending.edge);
        let back = self.directions.mirror(&pending.direction).to_string();
        let (room, edge) = self.create_room(pending.from, &pending.direction, &back)?;

        if let Some(top) = self.move_stack.last_mut() {
            top.room = room;
            top.kind = MoveKind::RoomCreated;
            top.edge = Some(edge);
        }
        self.map.update_coords();
        Ok(room)
    }

    /// The edge walked by the last history entry, with the room it was
    /// walked from.
    fn last_edge(&self) -> Result<(RoomId, EdgeId)> {
        let n = self.move_stack.len();
        if n < 2 {
            return Err(Error::InvalidInput("no move to work on".to_string()));
        }
        let (prev, last) = (&self.move_stack[n - 2], &self.move_stack[n - 1]);
        let edge = self
            .map
            .room(prev.room)
            .and_then(|room| room.exit(&last.direction))
            .filter(|edge| {
                self.map
                    .edge(*edge)
                    .is_some_and(|e| e.target_from(prev.room, &last.direction) == Some(last.room))
            })
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "no exit '{}' from room {} to room {}",
                    last.direction, prev.room, last.room
                ))
            })?;
        Ok((prev.room, edge))
    }

    /// Toggle the split flag on the edge walked last. Returns the new flag.
    pub fn split(&mut self) -> Result<bool> {
        let (_, edge) = self.last_edge()?;
        let split = !self.map.edge(edge).is_some_and(|e| e.is_split());
        self.map.set_split(edge, split)?;
        self.map.update_coords();
        Ok(split)
    }

    /// Rename the way back of the edge walked last.
    pub fn opposite(&mut self, name: &str) -> Result<()> {
        let (prev, edge_id) = self.last_edge()?;
        let here = self.map.current();
        let direction = self
            .move_stack
            .last()
            .map(|entry| entry.direction.clone())
            .unwrap_or_default();
        let edge = self
            .map
            .edge(edge_id)
            .cloned()
            .ok_or_else(|| Error::InvalidInput("no such edge".to_string()))?;
        let old = if edge.a() == prev && edge.a_name() == direction {
            edge.b_name()
        } else {
            edge.a_name()
        };
        if !old.is_empty() {
            return self.map.rename_exit(here, old, name);
        }

        // one-way edge: rebuild it with a name on this side
        self.map.remove_edge(edge_id);
        let (rebuilt, result) = match self.map.connect(prev, &direction, here, name) {
            Ok(id) => (id, Ok(())),
            Err(e) => (self.map.connect(prev, &direction, here, "")?, Err(e)),
        };
        self.map.set_split(rebuilt, edge.is_split())?;
        for entry in &mut self.move_stack {
            if entry.edge == Some(edge_id) {
                entry.edge = Some(rebuilt);
            }
        }
        result
    }

    /// Fold the current room into `other`.
    ///
    /// History entries naming the current room are redirected to `other`
    /// and can no longer delete it.
    pub fn join(&mut self, other: RoomId) -> Result<()> {
        let from = self.map.current();
        self.map.merge_room(from, other)?;
        for entry in &mut self.move_stack {
            if entry.room == from {
                entry.room = other;
                entry.kind = MoveKind::Plain;
                entry.edge = None;
            }
        }
        self.last_cycle = None;
        info!("Joined room {} into room {}", from, other);
        Ok(())
    }

    /// Import the saved map `name` and join the current room into the
    /// imported map's current room.
    pub fn merge(&mut self, name: &str) -> Result<RoomId> {
        let other = Map::load_from_dir(&self.map_dir, name, Arc::clone(&self.directions))?;
        let mut merged = self.map.clone();
        let ids = merged.import(&other)?;
        let target = ids
            .get(&other.current())
            .copied()
            .ok_or(Error::RoomNotFound(other.current()))?;
        merged.merge_room(merged.current(), target)?;

        let from = self.map.current();
        self.map = merged;
        for entry in &mut self.move_stack {
            if entry.room == from {
                entry.room = target;
                entry.kind = MoveKind::Plain;
                entry.edge = None;
            }
        }
        self.last_cycle = None;
        info!("Merged map '{}' into '{}'", name, self.map.name());
        Ok(target)
    }

    /// Rooms that would be deleted by pruning the exit `direction` of the
    /// current room: everything cut off from the current room without it.
    pub fn prune_preview(&self, direction: &str) -> Result<Vec<RoomId>> {
        let current = self.map.current();
        let edge = self
            .map
            .current_room()
            .exit(direction)
            .ok_or_else(|| Error::InvalidInput(format!("no exit '{direction}' here")))?;
        let target = self
            .map
            .exit_target(current, direction)
            .ok_or_else(|| Error::InvalidInput(format!("no exit '{direction}' here")))?;
        let kept = self.map.reachable_from(current, Some(edge));
        if kept.contains(&target) {
            return Ok(Vec::new());
        }
        Ok(self
            .map
            .reachable_from(target, Some(edge))
            .into_iter()
            .filter(|id| !kept.contains(id))
            .collect())
    }

    /// Remove the exit `direction` and everything cut off behind it.
    /// Returns the deleted rooms.
    pub fn prune(&mut self, direction: &str) -> Result<Vec<RoomId>> {
        let doomed = self.prune_preview(direction)?;
        let current = self.map.current();
        self.map.disconnect(current, direction);
        for id in &doomed {
            self.map.remove_room(*id)?;
        }
        self.reset_history();
        info!("Pruned {} rooms behind exit {}", doomed.len(), direction);
        Ok(doomed)
    }

    /// Move along an existing exit without creating anything.
    pub fn move_to(&mut self, direction: &str) -> Result<RoomId> {
        let target = self
            .map
            .exit_target(self.map.current(), direction)
            .ok_or_else(|| Error::InvalidInput(format!("there is no way to go {direction}")))?;
        self.jump(target, direction)?;
        Ok(target)
    }

    /// Put the marker on `room`.
    pub fn goto(&mut self, room: RoomId) -> Result<()> {
        self.jump(room, "")
    }

    fn jump(&mut self, room: RoomId, direction: &str) -> Result<()> {
        self.map.set_current(room)?;
        self.move_stack.push(Move::plain(room, direction));
        self.last_cycle = None;
        Ok(())
    }

    /// Start over with an empty map, keeping the name.
    pub fn clear(&mut self) {
        let name = self.map.name().to_string();
        self.replace_map(Map::new(&name, Arc::clone(&self.directions)));
    }

    /// Start a new empty map called `name`.
    pub fn new_map(&mut self, name: &str) -> Result<()> {
        let mut map = Map::new("default", Arc::clone(&self.directions));
        map.set_name(name)?;
        self.replace_map(map);
        Ok(())
    }

    /// Save the map into the map directory, optionally under a new name.
    pub fn save(&mut self, name: Option<&str>) -> Result<PathBuf> {
        if let Some(name) = name {
            self.map.set_name(name)?;
        }
        self.map.save_to_dir(&self.map_dir)
    }

    /// Load the map `name` from the map directory. The active map is kept
    /// if loading fails.
    pub fn load(&mut self, name: &str) -> Result<()> {
        let map = Map::load_from_dir(&self.map_dir, name, Arc::clone(&self.directions))?;
        self.replace_map(map);
        Ok(())
    }

    /// Run a map command such as `["tag", "Temple"]`.
    pub fn run_command(&mut self, args: &[&str]) -> CommandResult {
        let Some((name, rest)) = args.split_first() else {
            return Err(format!(
                "Map commands: {}",
                self.commands.names().collect::<Vec<_>>().join(", ")
            ));
        };
        let handler = self
            .commands
            .handler(name)
            .ok_or_else(|| format!("Unknown map command '{name}'"))?;
        handler(self, rest)
    }
}
