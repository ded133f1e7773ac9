//! Identifier types for map entities.

/// Identifier of a room.
///
/// Ids are handed out by the map in increasing order and never reused, even
/// after the room is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(u32);

impl RoomId {
    /// Wrap a raw id.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RoomId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Identifier of an edge inside one map arena.
///
/// Not persisted: edges are identified structurally in map files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(u64);

impl EdgeId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_parse_and_display() {
        let id: RoomId = "42".parse().unwrap();
        assert_eq!(id, RoomId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("x".parse::<RoomId>().is_err());
    }

    #[test]
    fn test_room_id_ordering() {
        assert!(RoomId::new(1) < RoomId::new(2));
    }
}
