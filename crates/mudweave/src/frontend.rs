//! Plain line front-end.
//!
//! Every line typed on stdin is either a slash command for the client or
//! text for the game. `//look` sends `/look` to the game.

use std::path::Path;

use anyhow::Context;

use mudweave_core::{ChannelId, GameConfig, SessionEvent, MAIN_CHANNEL};
use mudweave_session::Session;

/// Default game definition file.
pub const DEFAULT_CONFIG: &str = "mudweave.yaml";

/// What a typed line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a line to the game
    Send(String),
    /// Run a mapper command (`/map tag Hall`)
    Map(Vec<String>),
    /// Print the map, optionally only the current component
    Render {
        /// Only the component holding the current room
        only_current: bool,
    },
    /// Walk to a room by tag or id
    Walk(String),
    /// List completions for the last word
    Complete(String),
    /// Run the line bound to a key name
    Key(String),
    /// Toggle printing the map after every change
    AutoRender(bool),
    /// Show the command list
    Help,
    /// Close the session and exit
    Quit,
    /// Unknown or malformed slash command
    Invalid(String),
}

impl Command {
    /// Parse one line of user input.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(escaped) = line.strip_prefix("//") {
            return Command::Send(format!("/{escaped}"));
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Send(line.to_string());
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<String> = words.map(str::to_string).collect();
        let joined = args.join(" ");

        match name {
            "map" => Command::Map(args),
            "render" => match args.first().map(String::as_str) {
                None => Command::Render {
                    only_current: false,
                },
                Some("here") => Command::Render { only_current: true },
                Some(other) => Command::Invalid(format!("Unknown render target '{other}'")),
            },
            "walk" if !joined.is_empty() => Command::Walk(joined),
            "walk" => Command::Invalid("Walk where?".to_string()),
            "complete" => Command::Complete(joined),
            "key" if args.len() == 1 => Command::Key(joined),
            "key" => Command::Invalid("Usage: /key <name>".to_string()),
            "automap" => match joined.as_str() {
                "on" => Command::AutoRender(true),
                "off" => Command::AutoRender(false),
                _ => Command::Invalid("Usage: /automap on|off".to_string()),
            },
            "help" => Command::Help,
            "quit" => Command::Quit,
            _ => Command::Invalid(format!("Unknown command '/{name}', try /help")),
        }
    }
}

/// Command summary printed by `/help`.
pub const HELP: &str = "\
/map <command> [args]   run a mapper command (/map alone lists them)
/render [here]          print the map
/walk <room>            walk to a room by tag or id
/complete <text>        list completions
/key <name>             run the line bound to a key
/automap on|off         print the map after every change
/quit                   leave
//text                  send /text to the game";

/// Load the game definition from `path`, or [`DEFAULT_CONFIG`] if that
/// file exists, or fall back to the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<GameConfig> {
    match path {
        Some(path) => GameConfig::from_file(path)
            .with_context(|| format!("Failed to load game definition {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => GameConfig::from_file(DEFAULT_CONFIG)
            .with_context(|| format!("Failed to load game definition {DEFAULT_CONFIG}")),
        None => Ok(GameConfig::default()),
    }
}

/// Prefix text of a side channel so it stands out from game text.
pub fn format_channel(channel: ChannelId, text: &str) -> String {
    if channel == MAIN_CHANNEL {
        return text.to_string();
    }
    text.lines()
        .map(|line| format!("[{channel}] {line}\n"))
        .collect()
}

/// Status line for an informational event, if it has one.
pub fn format_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Connected => Some("% Connected.".to_string()),
        SessionEvent::Closed => Some("% Connection closed.".to_string()),
        SessionEvent::Info(msg) => Some(format!("% {msg}")),
        SessionEvent::Error(msg) => Some(format!("%! {msg}")),
        SessionEvent::Stdio(_) | SessionEvent::Map => None,
    }
}

/// Replace a key command by the command bound to the key. Keys bound to
/// other keys are rejected.
pub fn resolve(session: &Session, command: Command) -> Command {
    let Command::Key(name) = command else {
        return command;
    };
    match session.config().keys.get(&name) {
        Some(line) => match Command::parse(line) {
            Command::Key(_) => Command::Invalid(format!("Key '{name}' is bound to another key.")),
            bound => bound,
        },
        None => Command::Invalid(format!("Key '{name}' is not bound.")),
    }
}

/// Run a parsed command against the session. Returns the text to print
/// and whether the client should exit.
pub fn execute(session: &Session, command: Command) -> (Option<String>, bool) {
    let text = match command {
        Command::Send(line) => {
            session.send(&line);
            None
        }
        Command::Map(args) => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            Some(match session.map_command(&args) {
                Ok(msg) | Err(msg) => msg,
            })
        }
        Command::Render { only_current } => Some(session.render_map(only_current).join("\n")),
        Command::Walk(target) => session.walk(&target).err(),
        Command::Complete(text) => {
            let candidates: Vec<String> = (0..)
                .map_while(|state| session.complete(&text, state))
                .map(|c| c.trim_end().to_string())
                .collect();
            Some(if candidates.is_empty() {
                "No completions.".to_string()
            } else {
                candidates.join(" ")
            })
        }
        key @ Command::Key(_) => return execute(session, resolve(session, key)),
        Command::AutoRender(_) => None,
        Command::Help => Some(HELP.to_string()),
        Command::Invalid(msg) => Some(msg),
        Command::Quit => {
            session.close();
            return (None, true);
        }
    };
    (text, false)
}
