//! ASCII rendering of the map.
//!
//! Each room occupies a 3x3 block with its glyph in the centre:
//! `X` for the current room, a letter for rooms with bridge exits (custom
//! or split exits leaving the grid; both ends share the letter) and `#`
//! otherwise. Connectors are drawn in the cells between room centres.

use std::collections::{BTreeMap, BTreeSet};

use mudweave_core::RoomId;

use crate::map::Map;

/// Character grid a component is drawn on.
#[derive(Debug, Clone)]
pub struct Canvas {
    /// Cell storage (row-major order)
    cells: Vec<char>,
    /// Cells holding a room glyph
    rooms: Vec<bool>,
    width: usize,
    height: usize,
}

impl Canvas {
    /// Create a blank canvas.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![' '; width * height],
            rooms: vec![false; width * height],
            width,
            height,
        }
    }

    /// Width in columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, row: i64, col: i64) -> Option<usize> {
        let (row, col) = (usize::try_from(row).ok()?, usize::try_from(col).ok()?);
        (row < self.height && col < self.width).then(|| row * self.width + col)
    }

    /// Character at a position.
    ///
    /// Returns None if position is out of bounds.
    pub fn cell(&self, row: i64, col: i64) -> Option<char> {
        self.index(row, col).map(|i| self.cells[i])
    }

    /// Whether a room glyph sits at a position.
    pub fn is_room(&self, row: i64, col: i64) -> bool {
        self.index(row, col).map(|i| self.rooms[i]).unwrap_or(false)
    }

    /// Place a room glyph.
    pub fn put_room(&mut self, row: i64, col: i64, glyph: char) {
        if let Some(i) = self.index(row, col) {
            self.cells[i] = glyph;
            self.rooms[i] = true;
        }
    }

    /// Draw a connector glyph, blending it with what is already there.
    /// Room glyphs are never overwritten.
    pub fn stroke(&mut self, row: i64, col: i64, glyph: char) {
        if let Some(i) = self.index(row, col) {
            if !self.rooms[i] {
                self.cells[i] = blend(self.cells[i], glyph);
            }
        }
    }

    /// Axis-aligned run between two cells, endpoints excluded.
    fn run(&mut self, from: (i64, i64), to: (i64, i64)) {
        if from.0 == to.0 {
            let (lo, hi) = (from.1.min(to.1), from.1.max(to.1));
            for col in lo + 1..hi {
                self.stroke(from.0, col, '-');
            }
        } else if from.1 == to.1 {
            let (lo, hi) = (from.0.min(to.0), from.0.max(to.0));
            for row in lo + 1..hi {
                self.stroke(row, from.1, '|');
            }
        }
    }

    /// L-shaped connector through a single corner.
    pub fn elbow(&mut self, from: (i64, i64), to: (i64, i64), vertical_first: bool) {
        let corner = if vertical_first {
            (to.0, from.1)
        } else {
            (from.0, to.1)
        };
        self.run(from, corner);
        self.run(corner, to);
        if corner != from && corner != to {
            self.stroke(corner.0, corner.1, '+');
        }
    }

    /// The canvas as text rows of equal width.
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().collect())
            .collect()
    }
}

/// Combine an existing connector glyph with a new one. Crossing straight
/// lines make `+`, crossing diagonals make `X`, straight wins over diagonal.
fn blend(existing: char, new: char) -> char {
    match (existing, new) {
        (' ', n) => n,
        (e, n) if e == n => e,
        ('|', '-') | ('-', '|') | ('+', _) | (_, '+') => '+',
        ('\\', '/') | ('/', '\\') => 'X',
        ('\\' | '/', n) => n,
        (e, _) => e,
    }
}

fn straight_glyph(dx: i32, dy: i32) -> char {
    match (dx, dy) {
        (0, _) => '|',
        (_, 0) => '-',
        _ if dx == dy => '\\',
        _ => '/',
    }
}

impl Map {
    /// Lay the map out and draw it.
    ///
    /// Every component becomes a block of equal-width rows; blocks are
    /// separated by one empty row. With `only_current` only the block of
    /// the current room is drawn.
    pub fn render(&mut self, only_current: bool) -> Vec<String> {
        let comps = self.update_coords();
        let bridges = self.bridge_labels();

        let wanted: Vec<u32> = if only_current {
            vec![self.current_room().comp]
        } else {
            (0..comps).collect()
        };

        let mut out = Vec::new();
        for comp in wanted {
            if !out.is_empty() {
                out.push(String::new());
            }
            out.extend(self.render_component(comp, &bridges).rows());
        }
        out
    }

    /// Letter index of every room that owns a bridge exit.
    fn bridge_labels(&self) -> BTreeMap<RoomId, usize> {
        let mut groups: Vec<BTreeSet<RoomId>> = Vec::new();
        let mut labels = BTreeMap::new();

        for room in self.rooms.values() {
            let mut label = None;
            for (name, edge_id) in &room.exits {
                let Some(edge) = self.edges.get(edge_id) else {
                    continue;
                };
                if !edge.split && self.directions.is_geometric(name) {
                    continue;
                }
                let target = edge.target_from(room.id, name).unwrap_or(room.id);
                for (i, group) in groups.iter_mut().enumerate() {
                    if group.contains(&target) {
                        group.insert(room.id);
                        label = Some(i);
                    }
                }
                if label.is_none() {
                    groups.push(BTreeSet::from([room.id]));
                    label = Some(groups.len() - 1);
                }
            }
            if let Some(i) = label {
                labels.insert(room.id, i);
            }
        }
        labels
    }

    fn render_component(&self, comp: u32, bridges: &BTreeMap<RoomId, usize>) -> Canvas {
        let members = self.component_rooms(comp);
        let in_comp: BTreeSet<RoomId> = members.iter().copied().collect();

        let coords: Vec<(i32, i32)> = members
            .iter()
            .filter_map(|id| self.rooms.get(id).map(|room| (room.x, room.y)))
            .collect();
        let min_x = coords.iter().map(|c| c.0).min().unwrap_or(0);
        let max_x = coords.iter().map(|c| c.0).max().unwrap_or(0);
        let min_y = coords.iter().map(|c| c.1).min().unwrap_or(0);
        let max_y = coords.iter().map(|c| c.1).max().unwrap_or(0);

        let mut canvas = Canvas::new(
            ((max_x - min_x + 1) * 3) as usize,
            ((max_y - min_y + 1) * 3) as usize,
        );
        let centre = |id: RoomId| -> (i64, i64) {
            let room = &self.rooms[&id];
            (
                i64::from(room.y - min_y) * 3 + 1,
                i64::from(room.x - min_x) * 3 + 1,
            )
        };

        for &id in &members {
            let glyph = if id == self.current {
                'X'
            } else if let Some(i) = bridges.get(&id) {
                (b'A' + (*i % 26) as u8) as char
            } else {
                '#'
            };
            let (row, col) = centre(id);
            canvas.put_room(row, col, glyph);
        }

        for edge in self.edges.values() {
            if edge.split || edge.a == edge.b {
                continue;
            }
            if !in_comp.contains(&edge.a) || !in_comp.contains(&edge.b) {
                continue;
            }
            let Some((from, to, (dx, dy))) = edge
                .ends()
                .into_iter()
                .zip([edge.b, edge.a])
                .find_map(|((room, name), other)| {
                    self.directions.delta(name).map(|delta| (room, other, delta))
                })
            else {
                continue;
            };

            let (fr, fc) = centre(from);
            let (tr, tc) = centre(to);
            let (ox, oy) = ((tc - fc) / 3, (tr - fr) / 3);
            if (ox, oy) == (0, 0) {
                continue;
            }

            let steps = if dx != 0 { ox / i64::from(dx) } else { oy / i64::from(dy) };
            if steps >= 1 && (ox, oy) == (steps * i64::from(dx), steps * i64::from(dy)) {
                let glyph = straight_glyph(dx, dy);
                for i in 1..steps * 3 {
                    canvas.stroke(fr + i * i64::from(dy), fc + i * i64::from(dx), glyph);
                }
            } else {
                canvas.elbow((fr, fc), (tr, tc), dy != 0);
            }
        }

        canvas
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mudweave_core::DirectionTable;

    use super::*;

    fn new_map() -> Map {
        Map::new("render", Arc::new(DirectionTable::default()))
    }

    #[test]
    fn test_single_room() {
        let mut map = new_map();
        assert_eq!(map.render(false), vec!["   ", " X ", "   "]);
    }

    #[test]
    fn test_vertical_connector() {
        let mut map = new_map();
        let r = map.add_room("").unwrap();
        map.connect_mirrored(RoomId::new(0), "n", r).unwrap();
        assert_eq!(
            map.render(false),
            vec!["   ", " # ", " | ", " | ", " X ", "   "]
        );
    }

    #[test]
    fn test_horizontal_connector() {
        let mut map = new_map();
        let r = map.add_room("").unwrap();
        map.connect_mirrored(RoomId::new(0), "e", r).unwrap();
        assert_eq!(map.render(false), vec!["      ", " X--# ", "      "]);
    }

    #[test]
    fn test_diagonal_connector() {
        let mut map = new_map();
        let r = map.add_room("").unwrap();
        map.connect_mirrored(RoomId::new(0), "se", r).unwrap();
        let rows = map.render(false);
        assert_eq!(rows[1], " X    ");
        assert_eq!(rows[2], "  \\   ");
        assert_eq!(rows[3], "   \\  ");
        assert_eq!(rows[4], "    # ");
    }

    #[test]
    fn test_elbow_for_disagreeing_exit() {
        let mut map = new_map();
        let a = RoomId::new(0);
        let b = map.add_room("").unwrap();
        let c = map.add_room("").unwrap();
        map.connect_mirrored(a, "e", b).unwrap();
        map.connect_mirrored(a, "n", c).unwrap();
        map.connect(c, "e", b, "").unwrap();

        assert_eq!(
            map.render(false),
            vec!["      ", " #--+ ", " |  | ", " |  | ", " X--# ", "      "]
        );
    }

    #[test]
    fn test_components_are_separate_blocks() {
        let mut map = new_map();
        let up = map.add_room("").unwrap();
        map.connect_mirrored(RoomId::new(0), "u", up).unwrap();

        let rows = map.render(false);
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[1], " X ");
        assert_eq!(rows[3], "");
        assert_eq!(rows[5], " A ");
    }

    #[test]
    fn test_bridge_ends_share_letter() {
        let mut map = new_map();
        let a = map.add_room("").unwrap();
        let b = map.add_room("").unwrap();
        map.connect_mirrored(a, "u", b).unwrap();

        let rows = map.render(false);
        let letters: Vec<char> = rows
            .iter()
            .flat_map(|row| row.chars())
            .filter(|c| c.is_ascii_uppercase() && *c != 'X')
            .collect();
        assert_eq!(letters, vec!['A', 'A']);
    }

    #[test]
    fn test_only_current_component() {
        let mut map = new_map();
        let up = map.add_room("").unwrap();
        map.connect_mirrored(RoomId::new(0), "u", up).unwrap();
        map.set_current(up).unwrap();

        let rows = map.render(true);
        assert_eq!(rows, vec!["   ", " X ", "   "]);
    }

    #[test]
    fn test_rows_have_equal_width() {
        let mut map = new_map();
        let r1 = map.add_room("").unwrap();
        let r2 = map.add_room("").unwrap();
        map.connect_mirrored(RoomId::new(0), "ne", r1).unwrap();
        map.connect_mirrored(r1, "n", r2).unwrap();
        let rows = map.render(false);
        let width = rows[0].len();
        assert!(rows.iter().all(|row| row.len() == width));
    }

    #[test]
    fn test_blend() {
        assert_eq!(blend(' ', '|'), '|');
        assert_eq!(blend('|', '-'), '+');
        assert_eq!(blend('\\', '/'), 'X');
        assert_eq!(blend('\\', '|'), '|');
        assert_eq!(blend('|', '/'), '|');
    }
}
