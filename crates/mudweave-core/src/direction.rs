//! Direction vocabulary of a game.
//!
//! Every direction has a canonical name (the first entry of `names`), any
//! number of synonyms, an optional opposite and an optional coordinate delta.
//! Directions without a delta (`up`, `enter`, ...) are "custom" exits: the
//! automapper connects rooms through them but never places rooms with them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One direction of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionSpec {
    /// Canonical name followed by synonyms
    pub names: Vec<String>,
    /// Canonical name of the way back
    #[serde(default)]
    pub opposite: Option<String>,
    /// Step in map coordinates, `y` grows southwards
    #[serde(default)]
    pub delta: Option<(i32, i32)>,
}

impl DirectionSpec {
    /// Build a compass direction.
    pub fn compass(names: &[&str], opposite: &str, dx: i32, dy: i32) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            opposite: Some(opposite.to_string()),
            delta: Some((dx, dy)),
        }
    }

    /// Build a custom direction without geometry.
    pub fn custom(names: &[&str], opposite: Option<&str>) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            opposite: opposite.map(str::to_string),
            delta: None,
        }
    }

    /// Canonical name.
    pub fn canonical(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("")
    }
}

/// Lookup table over all known directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DirectionSpec>", into = "Vec<DirectionSpec>")]
pub struct DirectionTable {
    specs: Vec<DirectionSpec>,
    /// name or synonym -> index into `specs`
    index: HashMap<String, usize>,
}

impl DirectionTable {
    /// Build a table, rejecting empty, duplicate or unstorable names and
    /// deltas longer than one grid step.
    pub fn new(specs: Vec<DirectionSpec>) -> Result<Self> {
        let mut index = HashMap::new();
        for (i, spec) in specs.iter().enumerate() {
            if spec.names.is_empty() {
                return Err(Error::Config(format!("direction #{i} has no names")));
            }
            for name in &spec.names {
                if !is_storable_name(name) {
                    return Err(Error::Config(format!("invalid direction name {name:?}")));
                }
                if index.insert(name.clone(), i).is_some() {
                    return Err(Error::Config(format!("direction {name:?} defined twice")));
                }
            }
            if let Some(opposite) = &spec.opposite {
                if !is_storable_name(opposite) {
                    return Err(Error::Config(format!(
                        "invalid opposite {opposite:?} for direction {:?}",
                        spec.canonical()
                    )));
                }
            }
            if let Some(delta) = spec.delta {
                if !is_unit_step(delta) {
                    return Err(Error::Config(format!(
                        "direction {:?} has delta {delta:?}, expected one grid step",
                        spec.canonical()
                    )));
                }
            }
        }
        Ok(Self { specs, index })
    }

    /// All entries in definition order.
    pub fn specs(&self) -> &[DirectionSpec] {
        &self.specs
    }

    fn lookup(&self, name: &str) -> Option<&DirectionSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// Canonical name for a name or synonym.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(DirectionSpec::canonical)
    }

    /// Canonical opposite of a direction, if the table defines one.
    pub fn opposite(&self, name: &str) -> Option<&str> {
        self.lookup(name).and_then(|spec| spec.opposite.as_deref())
    }

    /// Name used for the way back: the opposite, or the name itself for
    /// exits without a defined opposite.
    pub fn mirror<'a>(&'a self, name: &'a str) -> &'a str {
        self.opposite(name).unwrap_or(name)
    }

    /// Coordinate step of a direction.
    pub fn delta(&self, name: &str) -> Option<(i32, i32)> {
        self.lookup(name).and_then(|spec| spec.delta)
    }

    /// Whether the direction places rooms on the grid.
    pub fn is_geometric(&self, name: &str) -> bool {
        self.delta(name).is_some()
    }

    /// Coordinates reached from `(x, y)` by walking `name`.
    pub fn calc(&self, name: &str, x: i32, y: i32) -> Option<(i32, i32)> {
        self.delta(name).map(|(dx, dy)| (x + dx, y + dy))
    }
}

impl Default for DirectionTable {
    fn default() -> Self {
        let specs = vec![
            DirectionSpec::compass(&["n", "north"], "s", 0, -1),
            DirectionSpec::compass(&["ne", "northeast"], "sw", 1, -1),
            DirectionSpec::compass(&["e", "east"], "w", 1, 0),
            DirectionSpec::compass(&["se", "southeast"], "nw", 1, 1),
            DirectionSpec::compass(&["s", "south"], "n", 0, 1),
            DirectionSpec::compass(&["sw", "southwest"], "ne", -1, 1),
            DirectionSpec::compass(&["w", "west"], "e", -1, 0),
            DirectionSpec::compass(&["nw", "northwest"], "se", -1, -1),
            DirectionSpec::custom(&["u", "up"], Some("d")),
            DirectionSpec::custom(&["d", "down"], Some("u")),
        ];
        let mut index = HashMap::new();
        for (i, spec) in specs.iter().enumerate() {
            for name in &spec.names {
                index.insert(name.clone(), i);
            }
        }
        Self { specs, index }
    }
}

impl TryFrom<Vec<DirectionSpec>> for DirectionTable {
    type Error = Error;

    fn try_from(specs: Vec<DirectionSpec>) -> Result<Self> {
        Self::new(specs)
    }
}

impl From<DirectionTable> for Vec<DirectionSpec> {
    fn from(table: DirectionTable) -> Self {
        table.specs
    }
}

/// Whether a name can be written to a map file: non-empty, no whitespace,
/// no field separator.
pub fn is_storable_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('|') && !name.chars().any(char::is_whitespace)
}

/// One of the eight compass steps: each axis moves at most one cell.
fn is_unit_step((dx, dy): (i32, i32)) -> bool {
    (dx, dy) != (0, 0) && (-1..=1).contains(&dx) && (-1..=1).contains(&dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_and_synonyms() {
        let table = DirectionTable::default();
        assert_eq!(table.canonical("north"), Some("n"));
        assert_eq!(table.canonical("n"), Some("n"));
        assert_eq!(table.canonical("xyzzy"), None);
    }

    #[test]
    fn test_opposite_and_mirror() {
        let table = DirectionTable::default();
        assert_eq!(table.opposite("n"), Some("s"));
        assert_eq!(table.opposite("up"), Some("d"));
        assert_eq!(table.opposite("portal"), None);
        assert_eq!(table.mirror("portal"), "portal");
        assert_eq!(table.mirror("e"), "w");
    }

    #[test]
    fn test_calc() {
        let table = DirectionTable::default();
        assert_eq!(table.calc("n", 0, 0), Some((0, -1)));
        assert_eq!(table.calc("se", 2, 2), Some((3, 3)));
        assert_eq!(table.calc("u", 0, 0), None);
        assert!(!table.is_geometric("d"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let specs = vec![
            DirectionSpec::custom(&["in"], Some("out")),
            DirectionSpec::custom(&["out", "in"], Some("in")),
        ];
        assert!(DirectionTable::new(specs).is_err());
    }

    #[test]
    fn test_unstorable_names_rejected() {
        assert!(DirectionTable::new(vec![DirectionSpec::custom(&["a|b"], None)]).is_err());
        assert!(DirectionTable::new(vec![DirectionSpec::custom(&["two words"], None)]).is_err());
        assert!(DirectionTable::new(vec![DirectionSpec::custom(&[], None)]).is_err());
    }

    #[test]
    fn test_non_unit_delta_rejected() {
        let zero = vec![DirectionSpec::compass(&["here"], "here", 0, 0)];
        assert!(matches!(DirectionTable::new(zero), Err(Error::Config(_))));
        let long = vec![DirectionSpec::compass(&["leap"], "back", 2, 0)];
        assert!(DirectionTable::new(long).is_err());
        let huge = vec![DirectionSpec::compass(&["far"], "near", i32::MAX, 0)];
        assert!(DirectionTable::new(huge).is_err());
        let diagonal = vec![DirectionSpec::compass(&["ne"], "sw", 1, -1)];
        assert!(DirectionTable::new(diagonal).is_ok());
    }

    #[test]
    fn test_storable_name() {
        assert!(is_storable_name("nw"));
        assert!(!is_storable_name(""));
        assert!(!is_storable_name("x|y"));
        assert!(!is_storable_name("x\ny"));
    }
}
