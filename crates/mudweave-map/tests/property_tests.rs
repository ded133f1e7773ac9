//! Property-based tests for the automapper.
//!
//! Uses proptest to drive the mapper with random walks and verify map
//! invariants.

use proptest::prelude::*;
use std::sync::Arc;

use mudweave_core::{DirectionTable, RoomId};
use mudweave_map::{Map, Mapper, MapperMode};

/// Generate a random walk over compass and custom directions.
fn walk() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(
        prop::sample::select(vec!["n", "ne", "e", "se", "s", "sw", "w", "nw", "u", "d"]),
        0..40,
    )
}

fn auto_mapper() -> Mapper {
    let mut mapper = Mapper::new(Arc::new(DirectionTable::default()), "maps");
    mapper.set_mode(MapperMode::Auto);
    mapper
}

/// Room ids and current room of a map.
fn shape(map: &Map) -> (Vec<RoomId>, RoomId, usize) {
    (
        map.rooms().map(|r| r.id()).collect(),
        map.current(),
        map.edge_count(),
    )
}

fn assert_bidirectional(map: &Map) {
    for (id, edge) in map.edges() {
        for (room, name) in edge.ends() {
            if !name.is_empty() {
                assert_eq!(map.room(room).unwrap().exit(name), Some(id));
            }
        }
    }
    for room in map.rooms() {
        for (_, id) in room.exits() {
            assert!(map.edge(id).unwrap().touches(room.id()));
        }
    }
}

proptest! {
    /// Undoing every move of a walk restores the map.
    #[test]
    fn undo_restores_map(prefix in walk(), steps in walk()) {
        let mut mapper = auto_mapper();
        for d in &prefix {
            mapper.go_to(d).unwrap();
        }
        let before = shape(mapper.map());

        let mut moves = 0;
        for d in &steps {
            if mapper.go_to(d).unwrap().is_some() {
                moves += 1;
            }
        }
        for _ in 0..moves {
            prop_assert!(mapper.undo().is_some());
        }

        prop_assert_eq!(shape(mapper.map()), before);
    }

    /// Edges stay registered on both sides through walks and undos.
    #[test]
    fn edges_stay_bidirectional(steps in walk(), undos in 0usize..10) {
        let mut mapper = auto_mapper();
        for d in &steps {
            mapper.go_to(d).unwrap();
        }
        assert_bidirectional(mapper.map());
        for _ in 0..undos {
            mapper.undo();
        }
        assert_bidirectional(mapper.map());
    }

    /// The history never loses its root entry.
    #[test]
    fn history_keeps_root(steps in walk(), undos in 0usize..60) {
        let mut mapper = auto_mapper();
        for d in &steps {
            mapper.go_to(d).unwrap();
        }
        for _ in 0..undos {
            mapper.undo();
        }
        prop_assert!(!mapper.history().is_empty());
        prop_assert!(mapper.map().room(mapper.map().current()).is_some());
    }

    /// Saving and parsing a map gives the same map.
    #[test]
    fn save_parse_round_trip(steps in walk(), tag in "[A-Za-z ]{0,12}") {
        let mut mapper = auto_mapper();
        for d in &steps {
            mapper.go_to(d).unwrap();
        }
        let current = mapper.map().current();
        mapper.map_mut().set_tag(current, &tag).unwrap();
        mapper.map_mut().add_virtual(current, RoomId::new(0)).ok();

        let map = mapper.map();
        let loaded = Map::parse(&map.save(), Arc::new(DirectionTable::default())).unwrap();

        prop_assert_eq!(loaded.current(), map.current());
        let rooms: Vec<_> = loaded.rooms().map(|r| (r.id(), r.tag().to_string())).collect();
        let expected: Vec<_> = map.rooms().map(|r| (r.id(), r.tag().to_string())).collect();
        prop_assert_eq!(rooms, expected);
        let edges: Vec<_> = loaded.edges().map(|(_, e)| e.clone()).collect();
        let expected: Vec<_> = map.edges().map(|(_, e)| e.clone()).collect();
        prop_assert_eq!(edges, expected);
        for room in map.rooms() {
            let virtuals: Vec<_> = loaded.room(room.id()).unwrap().virtual_exits().collect();
            prop_assert_eq!(virtuals, room.virtual_exits().collect::<Vec<_>>());
        }
    }

    /// Rendering never panics and produces blocks of equal width.
    #[test]
    fn render_rows_are_rectangular(steps in walk()) {
        let mut mapper = auto_mapper();
        for d in &steps {
            mapper.go_to(d).unwrap();
        }
        let rows = mapper.render(true);
        prop_assert!(!rows.is_empty());
        let width = rows[0].chars().count();
        prop_assert!(rows.iter().all(|r| r.chars().count() == width));
    }
}
