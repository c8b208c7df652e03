//! Line-oriented front end for an [`EditorSession`].
//!
//! Each input line is parsed into a [`ShellCommand`], turned into a
//! [`Command`] against the current workspace and run. Node ids may be
//! abbreviated to any unique prefix.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{anyhow, bail};

use crate::command::Command;
use crate::map_utils::composition::ROOT_ID;
use crate::map_utils::manager::MapManager;
use crate::map_utils::record::{NodeId, Offset};
use crate::session::{EditorSession, Outcome};

pub const HELP: &str = "\
Maps:
  new [name]          Create a map
  open <name>         Open a map from local storage
  import <path>       Open a map from a JSON file
  close               Close the map and drop its history
  rename [name]       Rename the map
  save                Save to local storage
  save-as [name]      Save to local storage under a new name
  export [path]       Save to disk (.json or .csv)
  maps                List maps in local storage
Nodes:
  root [x y]          Root node at x,y (default: under the pointer)
  child               Child of the selected node
  select [id]         Select by id prefix; no id clears
  move <x y>          Move the selected node
  edit [text]         Change the caption of the selected node
  delete              Delete the selected subtree
  copy | cut | paste  Clipboard on the selected subtree
View:
  pan <x y>           Set the view pan
  pointer <x y>       Set the pointer position
  show                Print the map
History:
  undo [n] | redo [n] Step through the history
  history             List recorded commands
  help | quit";

#[derive(Clone, Debug, PartialEq)]
pub enum ShellCommand {
    New(Option<String>),
    Open(String),
    Import(PathBuf),
    Close,
    Root(Option<Offset>),
    Child,
    Select(Option<String>),
    Move(Offset),
    Edit(Option<String>),
    Delete,
    Copy,
    Cut,
    Paste,
    Pan(Offset),
    Pointer(Offset),
    Undo(Option<usize>),
    Redo(Option<usize>),
    Rename(Option<String>),
    Save,
    SaveAs(Option<String>),
    Export(Option<PathBuf>),
    Maps,
    Show,
    History,
    Help,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellReply {
    Continue(String),
    Quit,
}

fn rest(arg: &str) -> Option<String> {
    let arg = arg.trim();
    if arg.is_empty() { None } else { Some(arg.to_string()) }
}

fn parse_offset(arg: &str) -> anyhow::Result<Offset> {
    let parts: Vec<&str> = arg.split_whitespace().collect();
    let [x, y] = parts.as_slice() else {
        bail!("expected two coordinates, got {:?}", arg.trim());
    };
    let x: f64 = x.parse().map_err(|_| anyhow!("not a number: {}", x))?;
    let y: f64 = y.parse().map_err(|_| anyhow!("not a number: {}", y))?;
    Ok(Offset::new(x, y))
}

fn parse_level(arg: &str) -> anyhow::Result<Option<usize>> {
    match rest(arg) {
        None => Ok(None),
        Some(n) => Ok(Some(n.parse().map_err(|_| anyhow!("not a step count: {}", n))?)),
    }
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let cmd = match word.to_ascii_lowercase().as_str() {
        "new" => ShellCommand::New(rest(arg)),
        "open" => ShellCommand::Open(rest(arg).ok_or_else(|| anyhow!("usage: open <name>"))?),
        "import" => ShellCommand::Import(rest(arg).map(PathBuf::from).ok_or_else(|| anyhow!("usage: import <path>"))?),
        "close" => ShellCommand::Close,
        "root" => match rest(arg) {
            None => ShellCommand::Root(None),
            Some(a) => ShellCommand::Root(Some(parse_offset(&a)?)),
        },
        "child" => ShellCommand::Child,
        "select" => ShellCommand::Select(rest(arg)),
        "move" => ShellCommand::Move(parse_offset(arg)?),
        "edit" => ShellCommand::Edit(rest(arg)),
        "delete" | "del" => ShellCommand::Delete,
        "copy" => ShellCommand::Copy,
        "cut" => ShellCommand::Cut,
        "paste" => ShellCommand::Paste,
        "pan" => ShellCommand::Pan(parse_offset(arg)?),
        "pointer" => ShellCommand::Pointer(parse_offset(arg)?),
        "undo" => ShellCommand::Undo(parse_level(arg)?),
        "redo" => ShellCommand::Redo(parse_level(arg)?),
        "rename" => ShellCommand::Rename(rest(arg)),
        "save" => ShellCommand::Save,
        "save-as" => ShellCommand::SaveAs(rest(arg)),
        "export" => ShellCommand::Export(rest(arg).map(PathBuf::from)),
        "maps" => ShellCommand::Maps,
        "show" | "ls" => ShellCommand::Show,
        "history" => ShellCommand::History,
        "help" | ":help" | "?" => ShellCommand::Help,
        "quit" | "exit" | ":quit" => ShellCommand::Quit,
        other => bail!("unknown command: {} (try help)", other),
    };
    Ok(Some(cmd))
}

/// Full id of the node whose id starts with `prefix`. `map` names the root.
pub fn resolve_id(manager: &MapManager, prefix: &str) -> anyhow::Result<NodeId> {
    if prefix == ROOT_ID {
        return Ok(ROOT_ID.to_string());
    }
    let mut matches = manager.records().filter(|r| r.id.starts_with(prefix)).map(|r| r.id.clone());
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => bail!("no node matches {}", prefix),
        (Some(_), Some(_)) => bail!("{} matches more than one node", prefix),
    }
}

fn short(id: &str) -> &str { id.get(..8).unwrap_or(id) }

fn render_node(manager: &MapManager, id: &str, depth: usize, current: Option<&NodeId>, out: &mut String) {
    let Some(record) = manager.get_node(id) else { return };
    let marker = if current.is_some_and(|c| c == id) { '>' } else { ' ' };
    let _ = writeln!(
        out,
        "{}{}{} {:?} ({}, {})",
        marker,
        "  ".repeat(depth),
        short(id),
        record.content,
        record.offset.x,
        record.offset.y
    );
    for child in &record.children {
        render_node(manager, child, depth + 1, current, out);
    }
}

/// The open map as an indented outline, the selected node marked with `>`.
pub fn render_map(session: &EditorSession) -> String {
    let Some(map) = session.map() else {
        return "no map is open".to_string();
    };
    let manager = map.manager();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} nodes, pan {}, {}, pointer {}, {})",
        session.title().unwrap_or_default(),
        manager.node_count(),
        map.pan().x,
        map.pan().y,
        map.pointer().x,
        map.pointer().y
    );
    for id in manager.root_ids() {
        render_node(manager, &id, 0, map.current(), &mut out);
    }
    out.trim_end().to_string()
}

fn render_history(session: &EditorSession) -> String {
    let history = session.history();
    if history.is_empty() {
        return "history is empty".to_string();
    }
    let mut out = String::new();
    for (i, name) in history.names().iter().enumerate() {
        let marker = if i + 1 == history.index() { '>' } else { ' ' };
        let _ = writeln!(out, "{}{:3} {}", marker, i + 1, name);
    }
    out.trim_end().to_string()
}

fn describe(outcome: Outcome, name: &str) -> String {
    match outcome {
        Outcome::Skipped => format!("{} is not available now", name),
        Outcome::Cancelled => "cancelled".to_string(),
        Outcome::Executed | Outcome::Recorded => "ok".to_string(),
    }
}

fn run(session: &mut EditorSession, command: Command) -> anyhow::Result<String> {
    let name = command.name();
    let outcome = session.run(command)?;
    Ok(describe(outcome, name))
}

/// Run a node-creating command and select the node it produced.
fn run_and_select(session: &mut EditorSession, command: Command) -> anyhow::Result<String> {
    let name = command.name();
    let outcome = session.run(command)?;
    if outcome != Outcome::Recorded {
        return Ok(describe(outcome, name));
    }
    match session.last_node().cloned() {
        Some(id) => {
            session.select(Some(id.as_str()))?;
            Ok(format!("created {}", short(&id)))
        }
        None => Ok("ok".to_string()),
    }
}

fn set_view(session: &mut EditorSession, pan: Option<Offset>, pointer: Option<Offset>) -> anyhow::Result<String> {
    let map = session.map_mut().ok_or_else(|| anyhow!("no map is open"))?;
    if let Some(pan) = pan {
        map.set_pan(pan);
    }
    if let Some(pointer) = pointer {
        map.set_pointer(pointer);
    }
    Ok("ok".to_string())
}

pub fn execute(session: &mut EditorSession, cmd: ShellCommand) -> anyhow::Result<ShellReply> {
    let msg = match cmd {
        ShellCommand::Quit => return Ok(ShellReply::Quit),
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::New(name) => run(session, Command::create_new_map(name))?,
        ShellCommand::Open(name) => run(session, Command::open_map_in_storage(name))?,
        ShellCommand::Import(path) => run(session, Command::open_map_in_disk(path))?,
        ShellCommand::Close => match session.close_map() {
            Some(manager) if manager.is_modified() => {
                format!("closed {} (unsaved changes discarded)", manager.get_map_name())
            }
            Some(manager) => format!("closed {}", manager.get_map_name()),
            None => "no map is open".to_string(),
        },
        ShellCommand::Root(Some(offset)) => run_and_select(session, Command::create_new_root_node(offset))?,
        ShellCommand::Root(None) => {
            let command = Command::create_root_node_at_pointer(session.workspace());
            run_and_select(session, command)?
        }
        ShellCommand::Child => {
            let command = Command::append_child_node(session.workspace());
            run_and_select(session, command)?
        }
        ShellCommand::Select(None) => {
            session.select(None)?;
            "selection cleared".to_string()
        }
        ShellCommand::Select(Some(prefix)) => {
            let manager = session.manager().ok_or_else(|| anyhow!("no map is open"))?;
            let id = resolve_id(manager, &prefix)?;
            session.select(Some(id.as_str()))?;
            format!("selected {}", short(&id))
        }
        ShellCommand::Move(offset) => {
            let command = Command::save_node_position(session.workspace(), offset);
            run(session, command)?
        }
        ShellCommand::Edit(text) => {
            let command = Command::save_node_content(session.workspace(), text);
            run(session, command)?
        }
        ShellCommand::Delete => {
            let command = Command::delete_node(session.workspace());
            run(session, command)?
        }
        ShellCommand::Copy => {
            let command = Command::copy(session.workspace());
            run(session, command)?
        }
        ShellCommand::Cut => {
            let command = Command::cut(session.workspace());
            run(session, command)?
        }
        ShellCommand::Paste => {
            let command = Command::paste(session.workspace());
            run_and_select(session, command)?
        }
        ShellCommand::Pan(offset) => set_view(session, Some(offset), None)?,
        ShellCommand::Pointer(offset) => set_view(session, None, Some(offset))?,
        ShellCommand::Undo(level) => {
            let level = level.unwrap_or(session.settings().undo_level);
            run(session, Command::undo(level))?
        }
        ShellCommand::Redo(level) => {
            let level = level.unwrap_or(session.settings().undo_level);
            run(session, Command::redo(level))?
        }
        ShellCommand::Rename(name) => run(session, Command::rename_map(name))?,
        ShellCommand::Save => run(session, Command::save_map())?,
        ShellCommand::SaveAs(name) => run(session, Command::save_map_in_storage(name))?,
        ShellCommand::Export(path) => run(session, Command::save_map_in_disk(path))?,
        ShellCommand::Maps => {
            let names = session.workspace().store.get_map_list()?;
            if names.is_empty() { "no saved maps".to_string() } else { names.join("\n") }
        }
        ShellCommand::Show => render_map(session),
        ShellCommand::History => render_history(session),
    };
    Ok(ShellReply::Continue(msg))
}

/// Parse and run one line. Blank lines reply with an empty message.
pub fn execute_line(session: &mut EditorSession, line: &str) -> anyhow::Result<ShellReply> {
    match parse_line(line)? {
        Some(cmd) => execute(session, cmd),
        None => Ok(ShellReply::Continue(String::new())),
    }
}
