//! The room arena.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use mudweave_core::{is_storable_name, DirectionTable, EdgeId, Error, Result, RoomId};

use crate::room::{Edge, Room};

/// A map: rooms keyed by id, the edges between them, and the room the
/// player is standing in.
///
/// Invariants kept by every method:
/// - `current` names a room of the arena;
/// - every edge is registered in the exits of both endpoints under their
///   non-empty names, and nowhere else;
/// - ids are never reused.
#[derive(Debug, Clone)]
pub struct Map {
    pub(crate) name: String,
    pub(crate) directions: Arc<DirectionTable>,
    pub(crate) rooms: BTreeMap<RoomId, Room>,
    pub(crate) edges: BTreeMap<EdgeId, Edge>,
    pub(crate) next_id: u32,
    pub(crate) next_edge: u64,
    pub(crate) current: RoomId,
    pub(crate) layout_mark: u64,
}

impl Map {
    /// Create a map holding only the origin room (id 0).
    pub fn new(name: &str, directions: Arc<DirectionTable>) -> Self {
        let origin = RoomId::new(0);
        let mut rooms = BTreeMap::new();
        rooms.insert(origin, Room::new(origin, ""));
        Self {
            name: name.to_string(),
            directions,
            rooms,
            edges: BTreeMap::new(),
            next_id: 1,
            next_edge: 0,
            current: origin,
            layout_mark: 0,
        }
    }

    /// Map name, used as file name when saving.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the map.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        validate_map_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    /// Direction vocabulary used for mirroring and layout.
    pub fn directions(&self) -> &Arc<DirectionTable> {
        &self.directions
    }

    /// Next room id to be handed out.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Current layout mark.
    pub fn layout_mark(&self) -> u64 {
        self.layout_mark
    }

    /// The room the player is in.
    pub fn current(&self) -> RoomId {
        self.current
    }

    /// The room the player is in.
    pub fn current_room(&self) -> &Room {
        &self.rooms[&self.current]
    }

    /// Move the player marker.
    pub fn set_current(&mut self, id: RoomId) -> Result<()> {
        self.ensure_room(id)?;
        self.current = id;
        Ok(())
    }

    /// Look up a room.
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// All rooms in id order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Number of rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Look up an edge.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// All edges.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().map(|(id, edge)| (*id, edge))
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn ensure_room(&self, id: RoomId) -> Result<()> {
        if self.rooms.contains_key(&id) {
            Ok(())
        } else {
            Err(Error::RoomNotFound(id))
        }
    }

    /// Find a room by tag, falling back to a numeric id.
    pub fn find_room(&self, query: &str) -> Option<RoomId> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        self.rooms
            .values()
            .find(|room| room.tag == query)
            .map(|room| room.id)
            .or_else(|| {
                query
                    .parse::<RoomId>()
                    .ok()
                    .filter(|id| self.rooms.contains_key(id))
            })
    }

    /// Add an unconnected room. Fails once the id counter is exhausted.
    pub fn add_room(&mut self, tag: &str) -> Result<RoomId> {
        let id = RoomId::new(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or_else(|| {
            Error::InvalidInput(format!("map '{}' has no room ids left", self.name))
        })?;
        self.rooms.insert(id, Room::new(id, tag));
        debug!("Added room {} to map '{}'", id, self.name);
        Ok(id)
    }

    pub(crate) fn insert_room(&mut self, room: Room) {
        self.rooms.insert(room.id, room);
    }

    /// Delete a room together with its edges and every shortcut into it.
    ///
    /// The current room cannot be deleted.
    pub fn remove_room(&mut self, id: RoomId) -> Result<Room> {
        self.ensure_room(id)?;
        if id == self.current {
            return Err(Error::InvalidInput(format!(
                "room {id} is the current room"
            )));
        }
        for edge_id in self.incident_edges(id) {
            self.remove_edge(edge_id);
        }
        for room in self.rooms.values_mut() {
            room.virtual_exits.remove(&id);
        }
        debug!("Removed room {} from map '{}'", id, self.name);
        self.rooms.remove(&id).ok_or(Error::RoomNotFound(id))
    }

    /// Set the tag of a room.
    pub fn set_tag(&mut self, id: RoomId, tag: &str) -> Result<()> {
        if tag.contains('\n') || tag.contains('\r') {
            return Err(Error::InvalidName(tag.to_string()));
        }
        let room = self.rooms.get_mut(&id).ok_or(Error::RoomNotFound(id))?;
        room.tag = tag.trim().to_string();
        Ok(())
    }

    /// Connect two rooms.
    ///
    /// Either name may be empty (one-way exit) but not both. Fails with
    /// [`Error::TopologyConflict`] if a non-empty name is already taken in
    /// its room; nothing is changed in that case.
    pub fn connect(
        &mut self,
        a: RoomId,
        a_name: &str,
        b: RoomId,
        b_name: &str,
    ) -> Result<EdgeId> {
        self.ensure_room(a)?;
        self.ensure_room(b)?;
        if a_name.is_empty() && b_name.is_empty() {
            return Err(Error::InvalidInput(
                "an edge needs a name on at least one side".to_string(),
            ));
        }
        for name in [a_name, b_name] {
            if !name.is_empty() && !is_storable_name(name) {
                return Err(Error::InvalidName(name.to_string()));
            }
        }
        if !a_name.is_empty() && self.rooms[&a].has_exit(a_name) {
            return Err(Error::TopologyConflict {
                room: a,
                exit: a_name.to_string(),
            });
        }
        if !b_name.is_empty() && (self.rooms[&b].has_exit(b_name) || (a == b && a_name == b_name))
        {
            return Err(Error::TopologyConflict {
                room: b,
                exit: b_name.to_string(),
            });
        }

        let id = EdgeId::new(self.next_edge);
        self.next_edge += 1;
        self.register(
            id,
            Edge {
                a,
                a_name: a_name.to_string(),
                b,
                b_name: b_name.to_string(),
                split: false,
            },
        );
        Ok(id)
    }

    /// Connect `a` to `b` through `name`, naming the way back after the
    /// direction's opposite (or `name` itself when it has none).
    pub fn connect_mirrored(&mut self, a: RoomId, name: &str, b: RoomId) -> Result<EdgeId> {
        let back = self.directions.mirror(name).to_string();
        self.connect(a, name, b, &back)
    }

    fn register(&mut self, id: EdgeId, edge: Edge) {
        for (room, name) in edge.ends() {
            if name.is_empty() {
                continue;
            }
            if let Some(room) = self.rooms.get_mut(&room) {
                room.exits.insert(name.to_string(), id);
            }
        }
        self.edges.insert(id, edge);
    }

    /// Remove an edge from both of its endpoints.
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        for (room, name) in edge.ends() {
            if let Some(room) = self.rooms.get_mut(&room) {
                if room.exits.get(name) == Some(&id) {
                    room.exits.remove(name);
                }
            }
        }
        Some(edge)
    }

    /// Remove the edge behind an exit.
    pub fn disconnect(&mut self, room: RoomId, name: &str) -> Option<Edge> {
        let id = self.rooms.get(&room)?.exit(name)?;
        self.remove_edge(id)
    }

    /// Room reached by walking `name` from `room`.
    pub fn exit_target(&self, room: RoomId, name: &str) -> Option<RoomId> {
        let id = self.rooms.get(&room)?.exit(name)?;
        self.edges.get(&id)?.target_from(room, name)
    }

    /// Walkable exits of a room as `(name, target)`.
    pub fn neighbors(&self, room: RoomId) -> Vec<(String, RoomId)> {
        let Some(r) = self.rooms.get(&room) else {
            return Vec::new();
        };
        r.exits
            .iter()
            .filter_map(|(name, id)| {
                self.edges
                    .get(id)
                    .and_then(|edge| edge.target_from(room, name))
                    .map(|target| (name.clone(), target))
            })
            .collect()
    }

    /// Edges touching a room.
    pub fn incident_edges(&self, room: RoomId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|(_, edge)| edge.touches(room))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Rename the end of an exit that sits in `room`.
    pub fn rename_exit(&mut self, room: RoomId, old: &str, new: &str) -> Result<()> {
        let id = self
            .rooms
            .get(&room)
            .ok_or(Error::RoomNotFound(room))?
            .exit(old)
            .ok_or_else(|| Error::InvalidInput(format!("no exit '{old}' in room {room}")))?;
        if old == new {
            return Ok(());
        }
        if !new.is_empty() && !is_storable_name(new) {
            return Err(Error::InvalidName(new.to_string()));
        }
        if !new.is_empty() && self.rooms[&room].has_exit(new) {
            return Err(Error::TopologyConflict {
                room,
                exit: new.to_string(),
            });
        }
        let mut edge = self.edges[&id].clone();
        if edge.a == room && edge.a_name == old {
            edge.a_name = new.to_string();
        } else {
            edge.b_name = new.to_string();
        }
        if edge.a_name.is_empty() && edge.b_name.is_empty() {
            return Err(Error::InvalidInput(
                "an edge needs a name on at least one side".to_string(),
            ));
        }
        self.remove_edge(id);
        self.register(id, edge);
        Ok(())
    }

    /// Flag or unflag an edge as split.
    pub fn set_split(&mut self, id: EdgeId, split: bool) -> Result<()> {
        let edge = self
            .edges
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidInput("no such edge".to_string()))?;
        edge.split = split;
        Ok(())
    }

    /// Add a pathfinding shortcut. Returns false if it already existed.
    pub fn add_virtual(&mut self, from: RoomId, to: RoomId) -> Result<bool> {
        self.ensure_room(to)?;
        if from == to {
            return Err(Error::InvalidInput(
                "a shortcut must lead to another room".to_string(),
            ));
        }
        let room = self.rooms.get_mut(&from).ok_or(Error::RoomNotFound(from))?;
        Ok(room.virtual_exits.insert(to))
    }

    /// Remove a pathfinding shortcut. Returns false if there was none.
    pub fn remove_virtual(&mut self, from: RoomId, to: RoomId) -> bool {
        self.rooms
            .get_mut(&from)
            .map(|room| room.virtual_exits.remove(&to))
            .unwrap_or(false)
    }

    /// Rooms connected to `start` through edges (in either direction),
    /// optionally pretending one edge does not exist.
    pub fn reachable_from(&self, start: RoomId, skip: Option<EdgeId>) -> BTreeSet<RoomId> {
        let mut seen = BTreeSet::new();
        if !self.rooms.contains_key(&start) {
            return seen;
        }
        let mut adjacency: BTreeMap<RoomId, Vec<RoomId>> = BTreeMap::new();
        for (edge_id, edge) in &self.edges {
            if Some(*edge_id) == skip {
                continue;
            }
            adjacency.entry(edge.a).or_default().push(edge.b);
            adjacency.entry(edge.b).or_default().push(edge.a);
        }
        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(id) = queue.pop_front() {
            for next in adjacency.get(&id).into_iter().flatten() {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        seen
    }

    /// Fold `from` into `into`: every edge and shortcut of `from` is moved
    /// over, edges between the two are dropped, then `from` is deleted.
    ///
    /// Moving an exit onto a name `into` already uses for a different target
    /// is a [`Error::TopologyConflict`] and leaves the map unchanged; an exit
    /// duplicating one `into` already has is dropped.
    pub fn merge_room(&mut self, from: RoomId, into: RoomId) -> Result<()> {
        self.ensure_room(from)?;
        self.ensure_room(into)?;
        if from == into {
            return Err(Error::InvalidInput(
                "cannot join a room with itself".to_string(),
            ));
        }

        let mut claimed: BTreeMap<String, RoomId> = self
            .neighbors(into)
            .into_iter()
            .collect();
        let mut moves = Vec::new();
        let mut drops = Vec::new();

        'edges: for edge_id in self.incident_edges(from) {
            let mut edge = self.edges[&edge_id].clone();
            if edge.touches(into) {
                drops.push(edge_id);
                continue;
            }
            let (a_moved, b_moved) = (edge.a == from, edge.b == from);
            if a_moved {
                edge.a = into;
            }
            if b_moved {
                edge.b = into;
            }

            let mut names = Vec::new();
            for (moved, name) in [(a_moved, &edge.a_name), (b_moved, &edge.b_name)] {
                if !moved || name.is_empty() {
                    continue;
                }
                let target = edge.target_from(into, name).unwrap_or(into);
                match claimed.get(name) {
                    Some(existing) if *existing == target => {
                        drops.push(edge_id);
                        continue 'edges;
                    }
                    Some(_) => {
                        return Err(Error::TopologyConflict {
                            room: into,
                            exit: name.clone(),
                        })
                    }
                    None => names.push((name.clone(), target)),
                }
            }
            claimed.extend(names);
            moves.push((edge_id, edge));
        }

        for edge_id in drops {
            self.remove_edge(edge_id);
        }
        for (edge_id, edge) in moves {
            self.remove_edge(edge_id);
            self.register(edge_id, edge);
        }

        let outgoing = self.rooms[&from].virtual_exits.clone();
        for room in self.rooms.values_mut() {
            if room.virtual_exits.remove(&from) && room.id != into {
                room.virtual_exits.insert(into);
            }
        }
        if let Some(room) = self.rooms.get_mut(&into) {
            room.virtual_exits
                .extend(outgoing.into_iter().filter(|t| *t != into && *t != from));
        }

        self.rooms.remove(&from);
        if self.current == from {
            self.current = into;
        }
        debug!("Merged room {} into {} on map '{}'", from, into, self.name);
        Ok(())
    }

    /// Copy every room, edge and shortcut of `other` into this map under
    /// fresh ids. Returns the id translation.
    ///
    /// Nothing is imported when the rooms do not fit under the id counter.
    pub fn import(&mut self, other: &Map) -> Result<BTreeMap<RoomId, RoomId>> {
        let room_count = u32::try_from(other.rooms.len()).unwrap_or(u32::MAX);
        if self.next_id.checked_add(room_count).is_none() {
            return Err(Error::InvalidInput(format!(
                "map '{}' has no room ids left for '{}'",
                self.name, other.name
            )));
        }
        let ids: BTreeMap<RoomId, RoomId> = other
            .rooms
            .values()
            .map(|room| Ok((room.id, self.add_room(&room.tag)?)))
            .collect::<Result<_>>()?;
        for edge in other.edges.values() {
            let id = EdgeId::new(self.next_edge);
            self.next_edge += 1;
            self.register(
                id,
                Edge {
                    a: ids[&edge.a],
                    a_name: edge.a_name.clone(),
                    b: ids[&edge.b],
                    b_name: edge.b_name.clone(),
                    split: edge.split,
                },
            );
        }
        for room in other.rooms.values() {
            let targets: Vec<RoomId> = room.virtual_exits.iter().map(|t| ids[t]).collect();
            if let Some(copy) = self.rooms.get_mut(&ids[&room.id]) {
                copy.virtual_exits.extend(targets);
            }
        }
        Ok(ids)
    }
}

/// Check that a map name can be used as a file name.
pub fn validate_map_name(name: &str) -> Result<()> {
    let bad = name.trim().is_empty()
        || name.contains(['/', '\\', '\n', '\r'])
        || name == "."
        || name == "..";
    if bad {
        Err(Error::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
