//! Events a session reports to its front-end.

/// Identifier of an output channel. Channel 0 carries the main game text.
pub type ChannelId = u32;

/// The main output channel.
pub const MAIN_CHANNEL: ChannelId = 0;

/// Event delivered through the session callback.
///
/// Events from the two pumps are not ordered relative to each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake finished, pumps started
    Connected,
    /// Session closed (emitted once)
    Closed,
    /// New text is available on the given channel
    Stdio(ChannelId),
    /// Informational message for the user
    Info(String),
    /// Error report (connection problems, failing hooks)
    Error(String),
    /// The map changed and should be redrawn
    Map,
}

impl SessionEvent {
    /// Short upper-case name, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Connected => "CONNECTED",
            SessionEvent::Closed => "CLOSED",
            SessionEvent::Stdio(_) => "STDIO",
            SessionEvent::Info(_) => "INFO",
            SessionEvent::Error(_) => "ERROR",
            SessionEvent::Map => "MAP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        assert_eq!(SessionEvent::Stdio(MAIN_CHANNEL).kind(), "STDIO");
        assert_eq!(SessionEvent::Info("x".into()).kind(), "INFO");
        assert_eq!(SessionEvent::Map.kind(), "MAP");
    }
}
