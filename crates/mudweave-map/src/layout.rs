//! Coordinate layout.
//!
//! Rooms get coordinates by depth-first propagation over compass exits,
//! starting at (0, 0) from every room not yet reached in the current pass.
//! Each such start opens a new connected component. Split edges and exits
//! without a coordinate delta are not followed, so the rooms behind them
//! end up in a component of their own and may overlap others.

use mudweave_core::RoomId;

use crate::map::Map;

impl Map {
    /// Assign `(mark, comp, x, y)` to every room.
    ///
    /// Returns the number of components. Coordinates of a room are current
    /// exactly when its mark equals [`Map::layout_mark`].
    pub fn update_coords(&mut self) -> u32 {
        self.layout_mark += 1;
        let mark = self.layout_mark;
        let ids: Vec<RoomId> = self.rooms.keys().copied().collect();

        let mut comp = 0;
        for id in ids {
            if self.rooms[&id].mark != mark {
                self.propagate(id, mark, comp);
                comp += 1;
            }
        }
        comp
    }

    fn propagate(&mut self, seed: RoomId, mark: u64, comp: u32) {
        let mut stack = vec![(seed, 0, 0)];
        while let Some((id, x, y)) = stack.pop() {
            let Some(room) = self.rooms.get_mut(&id) else {
                continue;
            };
            if room.mark == mark {
                continue;
            }
            room.x = x;
            room.y = y;
            room.mark = mark;
            room.comp = comp;

            let mut steps: Vec<(RoomId, i32, i32)> = room
                .exits
                .iter()
                .filter_map(|(name, edge_id)| {
                    let edge = self.edges.get(edge_id)?;
                    if edge.split {
                        return None;
                    }
                    let target = edge.target_from(id, name)?;
                    let (nx, ny) = self.directions.calc(name, x, y)?;
                    Some((target, nx, ny))
                })
                .collect();
            // first exit is explored first
            steps.reverse();
            stack.extend(steps);
        }
    }

    /// Rooms of one component in id order.
    pub fn component_rooms(&self, comp: u32) -> Vec<RoomId> {
        self.rooms
            .values()
            .filter(|room| room.mark == self.layout_mark && room.comp == comp)
            .map(|room| room.id)
            .collect()
    }

    /// A room of component `comp` placed at `(x, y)`, other than `except`.
    pub fn room_at(&self, comp: u32, x: i32, y: i32, except: RoomId) -> Option<RoomId> {
        self.rooms
            .values()
            .find(|room| {
                room.id != except
                    && room.mark == self.layout_mark
                    && room.comp == comp
                    && (room.x, room.y) == (x, y)
            })
            .map(|room| room.id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mudweave_core::DirectionTable;

    use super::*;

    fn new_map() -> Map {
        Map::new("layout", Arc::new(DirectionTable::default()))
    }

    #[test]
    fn test_chain_layout() {
        let mut map = new_map();
        let origin = RoomId::new(0);
        let r1 = map.add_room("").unwrap();
        let r2 = map.add_room("").unwrap();
        map.connect_mirrored(origin, "n", r1).unwrap();
        map.connect_mirrored(r1, "e", r2).unwrap();

        assert_eq!(map.update_coords(), 1);
        assert_eq!(map.room(origin).unwrap().coords(), (0, 0));
        assert_eq!(map.room(r1).unwrap().coords(), (0, -1));
        assert_eq!(map.room(r2).unwrap().coords(), (1, -1));
    }

    #[test]
    fn test_mark_is_monotonic() {
        let mut map = new_map();
        map.update_coords();
        let first = map.layout_mark();
        map.update_coords();
        assert!(map.layout_mark() > first);
        assert_eq!(map.current_room().mark(), map.layout_mark());
    }

    #[test]
    fn test_custom_exit_opens_component() {
        let mut map = new_map();
        let origin = RoomId::new(0);
        let up = map.add_room("").unwrap();
        map.connect_mirrored(origin, "u", up).unwrap();

        assert_eq!(map.update_coords(), 2);
        assert_ne!(map.room(origin).unwrap().comp(), map.room(up).unwrap().comp());
        assert_eq!(map.room(up).unwrap().coords(), (0, 0));
    }

    #[test]
    fn test_split_edge_not_followed() {
        let mut map = new_map();
        let a = RoomId::new(0);
        let b = map.add_room("").unwrap();
        let c = map.add_room("").unwrap();
        let ab = map.connect_mirrored(a, "e", b).unwrap();
        map.connect_mirrored(b, "e", c).unwrap();

        map.update_coords();
        assert_eq!(map.room(c).unwrap().coords(), (2, 0));

        map.set_split(ab, true).unwrap();
        assert_eq!(map.update_coords(), 2);
        assert_ne!(map.room(a).unwrap().comp(), map.room(c).unwrap().comp());
        assert_eq!(map.room(b).unwrap().comp(), map.room(c).unwrap().comp());
        let (bx, _) = map.room(b).unwrap().coords();
        let (cx, _) = map.room(c).unwrap().coords();
        assert_eq!(cx - bx, 1);
        assert_eq!(map.room(b).unwrap().coords(), (0, 0));
    }

    #[test]
    fn test_room_at() {
        let mut map = new_map();
        let origin = RoomId::new(0);
        let r = map.add_room("").unwrap();
        map.connect_mirrored(origin, "s", r).unwrap();
        map.update_coords();

        assert_eq!(map.room_at(0, 0, 1, origin), Some(r));
        assert_eq!(map.room_at(0, 0, 1, r), None);
        assert_eq!(map.room_at(0, 5, 5, origin), None);
        assert_eq!(map.component_rooms(0), vec![origin, r]);
    }
}
