//! Line-oriented map file format.
//!
//! ```text
//! mudweave map v1          magic
//! castle                   map name
//! 4                        next room id
//! 2                        current room id
//! 0 Gate                   "<id> <tag>" per room
//! 1
//! 2 Hall
//!                          blank line
//! 0|n|1|s|0                "<a>|<a name>|<b>|<b name>|<split>" per edge
//! 1|n|2|s|1
//!                          blank line
//! 2 0                      "<from> <to>" per virtual exit
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use mudweave_core::{DirectionTable, Error, Result, RoomId};

use crate::map::{validate_map_name, Map};
use crate::room::Room;

/// First line of every map file.
pub const MAP_MAGIC: &str = "mudweave map v1";

/// File extension of saved maps.
pub const MAP_EXTENSION: &str = "map";

fn malformed(line: usize, reason: impl Into<String>) -> Error {
    Error::MalformedMap {
        line,
        reason: reason.into(),
    }
}

impl Map {
    /// Serialize the map.
    pub fn save(&self) -> String {
        let mut out = String::new();
        // writing to a String cannot fail
        let _ = writeln!(out, "{MAP_MAGIC}");
        let _ = writeln!(out, "{}", self.name);
        let _ = writeln!(out, "{}", self.next_id);
        let _ = writeln!(out, "{}", self.current);
        for room in self.rooms.values() {
            let _ = writeln!(out, "{} {}", room.id, room.tag);
        }
        out.push('\n');
        for edge in self.edges.values() {
            let _ = writeln!(
                out,
                "{}|{}|{}|{}|{}",
                edge.a,
                edge.a_name,
                edge.b,
                edge.b_name,
                u8::from(edge.split)
            );
        }
        out.push('\n');
        for room in self.rooms.values() {
            for target in &room.virtual_exits {
                let _ = writeln!(out, "{} {}", room.id, target);
            }
        }
        out
    }

    /// Parse a map file.
    ///
    /// Rooms are built first, then edges, then virtual exits. Any problem is
    /// reported as [`Error::MalformedMap`] with the 1-based line number.
    pub fn parse(text: &str, directions: Arc<DirectionTable>) -> Result<Map> {
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));
        let mut wanted = 0;
        let mut header = |what: &str| {
            wanted += 1;
            lines
                .next()
                .ok_or_else(|| malformed(wanted, format!("missing {what}")))
        };

        let (n, magic) = header("magic")?;
        if magic.trim_end() != MAP_MAGIC {
            return Err(malformed(n, "not a map file"));
        }
        let (n, name) = header("map name")?;
        validate_map_name(name).map_err(|e| malformed(n, e.to_string()))?;
        let (n, next_id) = header("next room id")?;
        let next_id: u32 = next_id
            .trim()
            .parse()
            .map_err(|_| malformed(n, format!("bad room counter {next_id:?}")))?;
        let (current_line, current) = header("current room")?;
        let current: RoomId = current
            .trim()
            .parse()
            .map_err(|_| malformed(current_line, format!("bad room id {current:?}")))?;

        let mut map = Map {
            name: name.to_string(),
            directions,
            rooms: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_id,
            next_edge: 0,
            current,
            layout_mark: 0,
        };

        for (n, line) in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            let (id, tag) = line.split_once(' ').unwrap_or((line, ""));
            let id: RoomId = id
                .parse()
                .map_err(|_| malformed(n, format!("bad room id {id:?}")))?;
            if map.rooms.contains_key(&id) {
                return Err(malformed(n, format!("duplicate room {id}")));
            }
            if id.get() >= next_id {
                return Err(malformed(n, format!("room {id} not below counter {next_id}")));
            }
            map.insert_room(Room::new(id, tag));
        }
        if !map.rooms.contains_key(&current) {
            return Err(malformed(current_line, format!("unknown current room {current}")));
        }

        for (n, line) in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            let fields: Vec<&str> = line.split('|').collect();
            let [a, a_name, b, b_name, split] = fields[..] else {
                return Err(malformed(n, "edge needs five fields"));
            };
            let parse_id = |s: &str| {
                s.parse::<RoomId>()
                    .map_err(|_| malformed(n, format!("bad room id {s:?}")))
            };
            let (a, b) = (parse_id(a)?, parse_id(b)?);
            let split = match split {
                "0" => false,
                "1" => true,
                other => return Err(malformed(n, format!("bad split flag {other:?}"))),
            };
            let edge = map
                .connect(a, a_name, b, b_name)
                .map_err(|e| malformed(n, e.to_string()))?;
            map.set_split(edge, split)
                .map_err(|e| malformed(n, e.to_string()))?;
        }

        for (n, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let (from, to) = line
                .split_once(' ')
                .ok_or_else(|| malformed(n, "virtual exit needs two room ids"))?;
            let from: RoomId = from
                .parse()
                .map_err(|_| malformed(n, format!("bad room id {from:?}")))?;
            let to: RoomId = to
                .trim()
                .parse()
                .map_err(|_| malformed(n, format!("bad room id {to:?}")))?;
            map.add_virtual(from, to)
                .map_err(|e| malformed(n, e.to_string()))?;
        }

        Ok(map)
    }

    /// Path the map is stored under inside `dir`.
    pub fn file_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.{MAP_EXTENSION}", self.name))
    }

    /// Write the map to `<dir>/<name>.map`, creating `dir` if needed.
    pub fn save_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = self.file_path(dir);
        std::fs::write(&path, self.save())?;
        info!("Saved map '{}' ({} rooms) to {}", self.name, self.rooms.len(), path.display());
        Ok(path)
    }

    /// Read the map called `name` from `dir`.
    pub fn load_from_dir(dir: &Path, name: &str, directions: Arc<DirectionTable>) -> Result<Map> {
        validate_map_name(name)?;
        let path = dir.join(format!("{name}.{MAP_EXTENSION}"));
        let bytes = std::fs::read(&path)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
            malformed(line, "invalid UTF-8")
        })?;
        let map = Map::parse(&text, directions)?;
        info!("Loaded map '{}' ({} rooms) from {}", map.name, map.rooms.len(), path.display());
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directions() -> Arc<DirectionTable> {
        Arc::new(DirectionTable::default())
    }

    fn sample() -> Map {
        let mut map = Map::new("castle", directions());
        let origin = RoomId::new(0);
        let hall = map.add_room("Hall").unwrap();
        let tower = map.add_room("").unwrap();
        map.set_tag(origin, "Gate").unwrap();
        map.connect_mirrored(origin, "n", hall).unwrap();
        let stairs = map.connect_mirrored(hall, "u", tower).unwrap();
        map.set_split(stairs, true).unwrap();
        map.connect(tower, "jump", origin, "").unwrap();
        map.add_virtual(tower, origin).unwrap();
        map.set_current(hall).unwrap();
        map
    }

    #[test]
    fn test_save_format() {
        let text = sample().save();
        assert_eq!(
            text,
            "mudweave map v1\ncastle\n3\n1\n0 Gate\n1 Hall\n2 \n\n\
             0|n|1|s|0\n1|u|2|d|1\n2|jump|0||0\n\n2 0\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let map = sample();
        let loaded = Map::parse(&map.save(), directions()).unwrap();
        assert_eq!(loaded.name(), "castle");
        assert_eq!(loaded.current(), map.current());
        assert_eq!(loaded.next_id(), map.next_id());
        let tags: Vec<_> = loaded.rooms().map(|r| (r.id(), r.tag().to_string())).collect();
        let expected: Vec<_> = map.rooms().map(|r| (r.id(), r.tag().to_string())).collect();
        assert_eq!(tags, expected);
        let edges: Vec<_> = loaded.edges().map(|(_, e)| e.clone()).collect();
        let expected: Vec<_> = map.edges().map(|(_, e)| e.clone()).collect();
        assert_eq!(edges, expected);
        assert_eq!(loaded.save(), map.save());
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let err = Map::parse("hello\nx\n1\n0\n0 \n\n\n", directions()).unwrap_err();
        assert!(matches!(err, Error::MalformedMap { line: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_unknown_room_in_edge() {
        let text = "mudweave map v1\nm\n2\n0\n0 \n1 \n\n0|n|5|s|0\n\n";
        let err = Map::parse(text, directions()).unwrap_err();
        assert!(matches!(err, Error::MalformedMap { line: 8, .. }));
    }

    #[test]
    fn test_parse_rejects_duplicate_exit() {
        let text = "mudweave map v1\nm\n3\n0\n0 \n1 \n2 \n\n0|n|1|s|0\n0|n|2|s|0\n\n";
        let err = Map::parse(text, directions()).unwrap_err();
        assert!(matches!(err, Error::MalformedMap { line: 10, .. }));
    }

    #[test]
    fn test_parse_rejects_missing_current() {
        let text = "mudweave map v1\nm\n2\n7\n0 \n1 \n\n\n";
        assert!(Map::parse(text, directions()).is_err());
    }

    #[test]
    fn test_parse_rejects_stale_counter() {
        let text = "mudweave map v1\nm\n1\n0\n0 \n1 \n\n\n";
        assert!(Map::parse(text, directions()).is_err());
    }

    #[test]
    fn test_parse_reports_line_of_missing_header() {
        let err = Map::parse("mudweave map v1\nm\n", directions()).unwrap_err();
        assert!(matches!(err, Error::MalformedMap { line: 3, .. }));
        let err = Map::parse("", directions()).unwrap_err();
        assert!(matches!(err, Error::MalformedMap { line: 1, .. }));
    }

    #[test]
    fn test_exhausted_counter_creates_no_room() {
        let text = format!("mudweave map v1\nm\n{}\n0\n0 Start\n\n\n", u32::MAX);
        let mut map = Map::parse(&text, directions()).unwrap();
        assert!(matches!(map.add_room(""), Err(Error::InvalidInput(_))));
        assert_eq!(map.room_count(), 1);
        assert_eq!(map.next_id(), u32::MAX);
        assert_eq!(map.current_room().tag(), "Start");
    }

    #[test]
    fn test_parse_tolerates_missing_sections() {
        let map = Map::parse("mudweave map v1\nm\n1\n0\n0 Start\n", directions()).unwrap();
        assert_eq!(map.room_count(), 1);
        assert_eq!(map.current_room().tag(), "Start");
    }

    #[test]
    fn test_save_and_load_dir() {
        let dir = std::env::temp_dir().join(format!("mudweave-persist-{}", std::process::id()));
        let map = sample();
        let path = map.save_to_dir(&dir).unwrap();
        assert!(path.ends_with("castle.map"));
        let loaded = Map::load_from_dir(&dir, "castle", directions()).unwrap();
        assert_eq!(loaded.save(), map.save());
        assert!(Map::load_from_dir(&dir, "missing", directions()).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_rejects_invalid_utf8() {
        let dir = std::env::temp_dir().join(format!("mudweave-utf8-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("bad.map"), b"mudweave map v1\nbad\n2\n0\n0 \xff\xfe\n").unwrap();
        let err = Map::load_from_dir(&dir, "bad", directions()).unwrap_err();
        assert!(matches!(err, Error::MalformedMap { line: 5, .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
