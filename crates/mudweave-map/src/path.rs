//! Shortest paths over exits and virtual exits.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use mudweave_core::RoomId;

use crate::map::Map;

impl Map {
    /// Exit names leading from the current room to `target`, fewest steps
    /// first. Every exit and virtual exit costs one step; a virtual exit is
    /// named after the target's tag, or its id when the tag is empty.
    ///
    /// Returns `None` if `target` does not exist or cannot be reached.
    pub fn find_shortest_path(&self, target: RoomId) -> Option<Vec<String>> {
        self.shortest_path_between(self.current, target)
    }

    /// Like [`Map::find_shortest_path`] with an explicit start room.
    pub fn shortest_path_between(&self, start: RoomId, target: RoomId) -> Option<Vec<String>> {
        if !self.rooms.contains_key(&start) || !self.rooms.contains_key(&target) {
            return None;
        }

        let mut dist: BTreeMap<RoomId, u32> = BTreeMap::from([(start, 0)]);
        let mut prev: BTreeMap<RoomId, (RoomId, String)> = BTreeMap::new();
        let mut heap = BinaryHeap::from([Reverse((0u32, start))]);

        while let Some(Reverse((d, id))) = heap.pop() {
            if id == target {
                break;
            }
            if dist.get(&id).is_some_and(|best| d > *best) {
                continue;
            }
            for (name, next) in self.steps_from(id) {
                let nd = d + 1;
                if dist.get(&next).map_or(true, |best| nd < *best) {
                    dist.insert(next, nd);
                    prev.insert(next, (id, name));
                    heap.push(Reverse((nd, next)));
                }
            }
        }

        if !dist.contains_key(&target) {
            return None;
        }
        let mut path = Vec::new();
        let mut at = target;
        while at != start {
            let (from, name) = prev.get(&at)?;
            path.push(name.clone());
            at = *from;
        }
        path.reverse();
        Some(path)
    }

    fn steps_from(&self, id: RoomId) -> Vec<(String, RoomId)> {
        let mut steps = self.neighbors(id);
        if let Some(room) = self.rooms.get(&id) {
            for target in &room.virtual_exits {
                let name = match self.rooms.get(target) {
                    Some(t) if !t.tag.is_empty() => t.tag.clone(),
                    _ => target.to_string(),
                };
                steps.push((name, *target));
            }
        }
        steps
    }
}
