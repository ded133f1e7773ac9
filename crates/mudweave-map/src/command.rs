//! Map command surface.
//!
//! Commands are looked up by name in a registry built once per mapper. A
//! handler returns `Ok(message)` or `Err(message)`; internal errors are
//! flattened into the message and never reach the dispatcher as panics or
//! [`mudweave_core::Error`]s.

use std::collections::BTreeMap;

use mudweave_core::RoomId;

use crate::mapper::{Mapper, MapperMode};

/// Outcome of a map command: a confirmation or a failure message.
pub type CommandResult = std::result::Result<String, String>;

/// A command handler. Receives the arguments after the command name.
pub type CommandHandler = fn(&mut Mapper, &[&str]) -> CommandResult;

struct Command {
    handler: CommandHandler,
    usage: &'static str,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.usage)
    }
}

/// Command name to handler table.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Command>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in map command.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("undo", "undo", cmd_undo);
        registry.register("clear", "clear", cmd_clear);
        registry.register("new", "new <name>", cmd_new);
        registry.register("nocycle", "nocycle", cmd_nocycle);
        registry.register("opposite", "opposite <exit>", cmd_opposite);
        registry.register("rmexit", "rmexit <exit>", cmd_rmexit);
        registry.register("mode", "mode [fixed|auto|catchall|off]", cmd_mode);
        registry.register("move", "move <exit>", cmd_move);
        registry.register("tag", "tag [text]", cmd_tag);
        registry.register("goto", "goto <room>", cmd_goto);
        registry.register("save", "save [name]", cmd_save);
        registry.register("load", "load <name>", cmd_load);
        registry.register("join", "join <room>", cmd_join);
        registry.register("merge", "merge <map>", cmd_merge);
        registry.register("split", "split", cmd_split);
        registry.register("prune", "prune <exit>", cmd_prune);
        registry.register("prunetest", "prunetest <exit>", cmd_prunetest);
        registry.register("addvirtual", "addvirtual <room>", cmd_addvirtual);
        registry.register("rmvirtual", "rmvirtual <room>", cmd_rmvirtual);
        registry.register("addroom", "addroom [tag]", cmd_addroom);
        registry.register("addexit", "addexit <exit> <room> [back|-]", cmd_addexit);
        registry.register("path", "path <room>", cmd_path);
        registry.register("name", "name", cmd_name);
        registry
    }

    /// Register a command, replacing any previous one of that name.
    pub fn register(&mut self, name: &'static str, usage: &'static str, handler: CommandHandler) {
        self.commands.insert(name, Command { handler, usage });
    }

    /// Handler of a command.
    pub fn handler(&self, name: &str) -> Option<CommandHandler> {
        self.commands.get(name).map(|c| c.handler)
    }

    /// Usage line of a command.
    pub fn usage(&self, name: &str) -> Option<&'static str> {
        self.commands.get(name).map(|c| c.usage)
    }

    /// Command names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn usage(mapper: &Mapper, name: &str) -> String {
    format!("Usage: map {}", mapper.commands().usage(name).unwrap_or(name))
}

fn room_arg(mapper: &Mapper, args: &[&str], name: &str) -> std::result::Result<RoomId, String> {
    if args.is_empty() {
        return Err(usage(mapper, name));
    }
    let query = args.join(" ");
    mapper
        .map()
        .find_room(&query)
        .ok_or_else(|| format!("No room '{query}'"))
}

fn cmd_undo(mapper: &mut Mapper, _args: &[&str]) -> CommandResult {
    let undone = mapper.undo().ok_or("Nothing to undo.")?;
    Ok(format!(
        "Undid move {} to room {}.",
        if undone.direction.is_empty() { "-" } else { undone.direction.as_str() },
        undone.room
    ))
}

fn cmd_clear(mapper: &mut Mapper, _args: &[&str]) -> CommandResult {
    mapper.clear();
    Ok("Map cleared.".to_string())
}

fn cmd_new(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(usage(mapper, "new"));
    };
    mapper.new_map(name).map_err(|e| e.to_string())?;
    Ok(format!("New map '{name}'."))
}

fn cmd_nocycle(mapper: &mut Mapper, _args: &[&str]) -> CommandResult {
    let room = mapper.nocycle().map_err(|_| "There was no cycle.")?;
    Ok(format!("Ok. Created room {room} instead."))
}

fn cmd_opposite(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(usage(mapper, "opposite"));
    };
    mapper.opposite(name).map_err(|e| e.to_string())?;
    Ok(format!("Changed way back to: {name}"))
}

fn cmd_rmexit(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(usage(mapper, "rmexit"));
    };
    let current = mapper.map().current();
    mapper
        .map_mut()
        .disconnect(current, name)
        .ok_or_else(|| format!("There is no exit '{name}' here."))?;
    Ok(format!("Removed exit {name}."))
}

fn cmd_mode(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    match args {
        [] => Ok(format!("Mapper mode: {}", mapper.mode())),
        [mode] => {
            let mode: MapperMode = mode
                .parse()
                .map_err(|_| "Valid modes are: fixed, auto, catchall, off".to_string())?;
            mapper.set_mode(mode);
            Ok(format!("Mapper mode: {mode}"))
        }
        _ => Err(usage(mapper, "mode")),
    }
}

fn cmd_move(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let [direction] = args else {
        return Err("Move where?".to_string());
    };
    let room = mapper.move_to(direction).map_err(|e| e.to_string())?;
    Ok(format!("Moved to room {room}."))
}

fn cmd_tag(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let current = mapper.map().current();
    if args.is_empty() {
        let tag = mapper.map().current_room().tag();
        return Ok(if tag.is_empty() {
            format!("Room {current} has no tag.")
        } else {
            format!("Room {current}: {tag}")
        });
    }
    let tag = args.join(" ");
    mapper
        .map_mut()
        .set_tag(current, &tag)
        .map_err(|e| e.to_string())?;
    Ok(format!("Tagged room {current} as '{tag}'."))
}

fn cmd_goto(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let room = room_arg(mapper, args, "goto")?;
    mapper.goto(room).map_err(|e| e.to_string())?;
    Ok(format!("Now in room {room}."))
}

fn cmd_save(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let name = match args {
        [] => None,
        [name] => Some(*name),
        _ => return Err(usage(mapper, "save")),
    };
    let path = mapper.save(name).map_err(|e| e.to_string())?;
    Ok(format!("Saved map to {}.", path.display()))
}

fn cmd_load(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(usage(mapper, "load"));
    };
    mapper.load(name).map_err(|e| e.to_string())?;
    Ok(format!(
        "Loaded map '{}' ({} rooms).",
        mapper.map().name(),
        mapper.map().room_count()
    ))
}

fn cmd_join(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let room = room_arg(mapper, args, "join")?;
    mapper.join(room).map_err(|e| e.to_string())?;
    Ok(format!("Joined with room {room}."))
}

fn cmd_merge(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let [name] = args else {
        return Err(usage(mapper, "merge"));
    };
    let room = mapper.merge(name).map_err(|e| e.to_string())?;
    Ok(format!("Merged map '{name}', now in room {room}."))
}

fn cmd_split(mapper: &mut Mapper, _args: &[&str]) -> CommandResult {
    let split = mapper.split().map_err(|e| e.to_string())?;
    Ok(if split {
        "Edge split.".to_string()
    } else {
        "Edge joined.".to_string()
    })
}

fn format_rooms(rooms: &[RoomId]) -> String {
    rooms
        .iter()
        .map(RoomId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn cmd_prune(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let [direction] = args else {
        return Err(usage(mapper, "prune"));
    };
    let removed = mapper.prune(direction).map_err(|e| e.to_string())?;
    Ok(format!(
        "Removed exit {direction} and {} rooms.",
        removed.len()
    ))
}

fn cmd_prunetest(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let [direction] = args else {
        return Err(usage(mapper, "prunetest"));
    };
    let doomed = mapper.prune_preview(direction).map_err(|e| e.to_string())?;
    if doomed.is_empty() {
        Ok(format!("Pruning {direction} would only remove the exit."))
    } else {
        Ok(format!(
            "Pruning {direction} would remove rooms: {}",
            format_rooms(&doomed)
        ))
    }
}

fn cmd_addvirtual(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let room = room_arg(mapper, args, "addvirtual")?;
    let current = mapper.map().current();
    let added = mapper
        .map_mut()
        .add_virtual(current, room)
        .map_err(|e| e.to_string())?;
    if added {
        Ok(format!("Added virtual exit to room {room}."))
    } else {
        Err(format!("Virtual exit to room {room} already exists."))
    }
}

fn cmd_rmvirtual(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let room = room_arg(mapper, args, "rmvirtual")?;
    let current = mapper.map().current();
    if mapper.map_mut().remove_virtual(current, room) {
        Ok(format!("Removed virtual exit to room {room}."))
    } else {
        Err(format!("There is no virtual exit to room {room}."))
    }
}

fn cmd_addroom(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let tag = args.join(" ");
    if tag.contains(['\n', '\r']) {
        return Err("Tags are single lines.".to_string());
    }
    let room = mapper
        .map_mut()
        .add_room(tag.trim())
        .map_err(|e| e.to_string())?;
    Ok(format!("Added room {room}."))
}

fn cmd_addexit(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let (name, target, back) = match args {
        [name, target] => (*name, *target, None),
        [name, target, back] => (*name, *target, Some(*back)),
        _ => return Err(usage(mapper, "addexit")),
    };
    let room = mapper
        .map()
        .find_room(target)
        .ok_or_else(|| format!("No room '{target}'"))?;
    let back = match back {
        Some("-") => String::new(),
        Some(back) => back.to_string(),
        None => mapper.directions().mirror(name).to_string(),
    };
    let current = mapper.map().current();
    mapper
        .map_mut()
        .connect(current, name, room, &back)
        .map_err(|e| e.to_string())?;
    Ok(format!("Added exit {name} to room {room}."))
}

fn cmd_path(mapper: &mut Mapper, args: &[&str]) -> CommandResult {
    let room = room_arg(mapper, args, "path")?;
    let path = mapper
        .map()
        .find_shortest_path(room)
        .ok_or_else(|| format!("No path to room {room}."))?;
    if path.is_empty() {
        Ok("You are already there.".to_string())
    } else {
        Ok(format!("Path: {}", path.join(" ")))
    }
}

fn cmd_name(mapper: &mut Mapper, _args: &[&str]) -> CommandResult {
    Ok(format!("Map name: {}", mapper.map().name()))
}
