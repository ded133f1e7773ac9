//! Game definition loaded from YAML.
//!
//! A game definition describes one remote game: where it lives, its direction
//! vocabulary, a few well-known strings and the hook pipelines applied to
//! inbound and outbound lines.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ChannelId, DirectionTable};

/// Game definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Human-readable game name
    pub name: String,
    /// Remote host
    pub host: String,
    /// Remote port
    pub port: u16,
    /// Handshake timeout in milliseconds (0 = OS default)
    pub connect_timeout_ms: u64,
    /// Well-known strings of the game
    pub strings: GameStrings,
    /// Directory holding saved maps
    pub map_dir: PathBuf,
    /// Key name -> command line, consumed by front-ends
    pub keys: BTreeMap<String, String>,
    /// Direction vocabulary
    pub directions: DirectionTable,
    /// Hooks applied to lines coming from the game, in order
    pub input_hooks: Vec<HookConfig>,
    /// Hooks applied to lines sent to the game, in order
    pub output_hooks: Vec<HookConfig>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: "localhost".to_string(),
            host: "localhost".to_string(),
            port: 9999,
            connect_timeout_ms: 10_000,
            strings: GameStrings::default(),
            map_dir: PathBuf::from("maps"),
            keys: BTreeMap::new(),
            directions: DirectionTable::default(),
            input_hooks: vec![],
            output_hooks: vec![],
            log_level: "info".to_string(),
        }
    }
}

impl GameConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: GameConfig =
            serde_yaml::from_str(yaml).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(crate::Error::Config("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(crate::Error::Config("port must be > 0".to_string()));
        }

        for hook in self.input_hooks.iter().chain(&self.output_hooks) {
            hook.validate()?;
        }

        Ok(())
    }
}

/// Well-known strings of a game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameStrings {
    /// Text the game prints as its prompt
    pub prompt: String,
    /// Reply of the game to an unknown command
    pub command_not_found: String,
}

impl Default for GameStrings {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            command_not_found: "Huh?".to_string(),
        }
    }
}

/// Declarative hook definition.
///
/// Closure-based hooks (function hooks) cannot be expressed here and are
/// added programmatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookConfig {
    /// Drop lines matching `pattern`
    Suppress {
        /// Regular expression
        pattern: String,
    },
    /// Colour the first match of `pattern`
    Highlight {
        /// Regular expression
        pattern: String,
        /// ANSI colour number 0-7
        color: u8,
    },
    /// Colour whole lines matching `pattern`
    HighlightLine {
        /// Regular expression
        pattern: String,
        /// ANSI colour number 0-7
        color: u8,
    },
    /// Move lines matching `pattern` to another output channel
    Stream {
        /// Regular expression
        pattern: String,
        /// Target channel
        channel: ChannelId,
    },
    /// Send `response` when `pattern` matches; `$1`.. expand capture groups
    Trigger {
        /// Regular expression
        pattern: String,
        /// Line to send
        response: String,
    },
}

impl HookConfig {
    /// The regular expression of the hook.
    pub fn pattern(&self) -> &str {
        match self {
            HookConfig::Suppress { pattern }
            | HookConfig::Highlight { pattern, .. }
            | HookConfig::HighlightLine { pattern, .. }
            | HookConfig::Stream { pattern, .. }
            | HookConfig::Trigger { pattern, .. } => pattern,
        }
    }

    /// Validate the hook definition.
    pub fn validate(&self) -> crate::Result<()> {
        regex::Regex::new(self.pattern()).map_err(|e| {
            crate::Error::Config(format!("Invalid regex pattern '{}': {}", self.pattern(), e))
        })?;

        match self {
            HookConfig::Highlight { color, .. } | HookConfig::HighlightLine { color, .. }
                if *color > 7 =>
            {
                Err(crate::Error::Config(format!("color {color} out of range 0-7")))
            }
            HookConfig::Stream { channel: 0, .. } => Err(crate::Error::Config(
                "stream hook cannot target the main channel".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
