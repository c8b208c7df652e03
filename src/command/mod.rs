//! Every user-visible mutation as a command value.
//!
//! A command is built from the current workspace (which node is selected,
//! where the pointer is), checked with `is_available`, and executed. Commands
//! that change nodes are then recorded in the [`CommandStack`] and can be
//! reverted and re-applied from the state they captured on their first run.

pub mod clipboard;
pub mod edits;
pub mod lifecycle;
pub mod stack;
pub mod structural;

use std::path::PathBuf;

use crate::error::CommandError;
use crate::map_utils::map::MindMap;
use crate::map_utils::record::{NodeId, Offset};
use crate::session::Workspace;

pub use clipboard::Clipboard;
pub use edits::{SaveNodeContent, SaveNodePosition};
pub use lifecycle::{CreateNewMap, OpenMapInDisk, OpenMapInStorage, RenameMap, SaveMapInDisk, SaveMapInStorage};
pub use stack::CommandStack;
pub use structural::{CopyNode, CreateNode, Cut, Paste, RemoveSubtree};

pub(crate) fn open_map(ws: &mut Workspace) -> Result<&mut MindMap, CommandError> {
    ws.map.as_mut().ok_or(CommandError::NoMap)
}

#[derive(Clone, Debug)]
pub enum Command {
    CreateNewMap(CreateNewMap),
    SaveMapInStorage(SaveMapInStorage),
    SaveMapInDisk(SaveMapInDisk),
    OpenMapInStorage(OpenMapInStorage),
    OpenMapInDisk(OpenMapInDisk),
    CreateNewRootNode(CreateNode),
    AppendChildNode(CreateNode),
    DeleteNode(RemoveSubtree),
    SaveNodePosition(SaveNodePosition),
    SaveNodeContent(SaveNodeContent),
    SaveMap,
    Undo { level: usize },
    Redo { level: usize },
    RenameMap(RenameMap),
    Copy(CopyNode),
    Cut(Cut),
    Paste(Paste),
}

impl Command {
    pub fn create_new_map(name: Option<String>) -> Self { Command::CreateNewMap(CreateNewMap { name }) }

    pub fn open_map_in_storage(name: impl Into<String>) -> Self {
        Command::OpenMapInStorage(OpenMapInStorage { name: name.into() })
    }

    pub fn open_map_in_disk(path: impl Into<PathBuf>) -> Self { Command::OpenMapInDisk(OpenMapInDisk { path: path.into() }) }

    pub fn save_map() -> Self { Command::SaveMap }
    pub fn save_map_in_storage(name: Option<String>) -> Self { Command::SaveMapInStorage(SaveMapInStorage { name }) }
    pub fn save_map_in_disk(path: Option<PathBuf>) -> Self { Command::SaveMapInDisk(SaveMapInDisk { path }) }
    pub fn rename_map(name: Option<String>) -> Self { Command::RenameMap(RenameMap { name }) }

    /// Root-level node at an absolute map position.
    pub fn create_new_root_node(offset: Offset) -> Self { Command::CreateNewRootNode(CreateNode::root(offset)) }

    /// Root-level node under the pointer, taking the current pan into account.
    pub fn create_root_node_at_pointer(ws: &Workspace) -> Self {
        let offset = ws
            .map
            .as_ref()
            .map(|map| map.pointer() + map.pan().abs())
            .unwrap_or_default();
        Command::create_new_root_node(offset)
    }

    pub fn append_child_node(ws: &Workspace) -> Self { Command::AppendChildNode(CreateNode::under_selection(ws)) }

    pub fn append_child_to(parent: impl Into<NodeId>, offset: Offset) -> Self {
        Command::AppendChildNode(CreateNode::child_of(Some(parent.into()), offset))
    }

    pub fn delete_node(ws: &Workspace) -> Self { Command::DeleteNode(RemoveSubtree::from_selection(ws)) }

    pub fn save_node_position(ws: &Workspace, offset: Offset) -> Self {
        Command::SaveNodePosition(SaveNodePosition::from_selection(ws, offset))
    }

    pub fn save_node_content(ws: &Workspace, content: Option<String>) -> Self {
        Command::SaveNodeContent(SaveNodeContent::from_selection(ws, content))
    }

    pub fn copy(ws: &Workspace) -> Self { Command::Copy(CopyNode::from_selection(ws)) }
    pub fn cut(ws: &Workspace) -> Self { Command::Cut(Cut::from_selection(ws)) }
    pub fn paste(ws: &Workspace) -> Self { Command::Paste(Paste::from_selection(ws)) }
    pub fn undo(level: usize) -> Self { Command::Undo { level } }
    pub fn redo(level: usize) -> Self { Command::Redo { level } }

    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateNewMap(_) => "CreateNewMap",
            Command::SaveMapInStorage(_) => "SaveMapInStorage",
            Command::SaveMapInDisk(_) => "SaveMapInDisk",
            Command::OpenMapInStorage(_) => "OpenMapInStorage",
            Command::OpenMapInDisk(_) => "OpenMapInDisk",
            Command::CreateNewRootNode(_) => "CreateNewRootNode",
            Command::AppendChildNode(_) => "AppendChildNode",
            Command::DeleteNode(_) => "DeleteNode",
            Command::SaveNodePosition(_) => "SaveNodePosition",
            Command::SaveNodeContent(_) => "SaveNodeContent",
            Command::SaveMap => "SaveMap",
            Command::Undo { .. } => "Undo",
            Command::Redo { .. } => "Redo",
            Command::RenameMap(_) => "RenameMap",
            Command::Copy(_) => "Copy",
            Command::Cut(_) => "Cut",
            Command::Paste(_) => "Paste",
        }
    }

    /// Recorded in the history after a successful execute.
    pub fn need_push(&self) -> bool {
        matches!(
            self,
            Command::CreateNewRootNode(_)
                | Command::AppendChildNode(_)
                | Command::DeleteNode(_)
                | Command::SaveNodePosition(_)
                | Command::SaveNodeContent(_)
                | Command::Cut(_)
                | Command::Paste(_)
        )
    }

    /// Node a structural command created, pasted or removed, once known.
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Command::CreateNewRootNode(c) | Command::AppendChildNode(c) => c.node_id(),
            Command::DeleteNode(r) => r.node_id(),
            Command::Cut(c) => c.node_id(),
            Command::Paste(p) => p.node_id(),
            _ => None,
        }
    }

    pub fn is_available(&self, ws: &Workspace, history: &CommandStack) -> bool {
        match self {
            Command::Undo { .. } => history.can_undo(),
            Command::Redo { .. } => history.can_redo(),
            other => other.is_applicable(ws),
        }
    }

    /// Availability against the workspace alone; history commands never qualify.
    pub(crate) fn is_applicable(&self, ws: &Workspace) -> bool {
        let has_map = ws.map.is_some();
        let unsaved = ws.map.as_ref().is_some_and(|m| m.manager().is_modified());
        match self {
            Command::CreateNewMap(_) | Command::OpenMapInStorage(_) | Command::OpenMapInDisk(_) => !has_map,
            Command::SaveMap | Command::SaveMapInStorage(_) | Command::SaveMapInDisk(_) => unsaved,
            Command::RenameMap(_) => has_map,
            Command::CreateNewRootNode(c) => c.is_available(ws, false),
            Command::AppendChildNode(c) => c.is_available(ws, true),
            Command::DeleteNode(r) => r.is_available(ws),
            Command::SaveNodePosition(c) => c.is_available(ws),
            Command::SaveNodeContent(c) => c.is_available(ws),
            Command::Copy(c) => c.is_available(ws),
            Command::Cut(c) => c.is_available(ws),
            Command::Paste(c) => c.is_available(ws),
            Command::Undo { .. } | Command::Redo { .. } => false,
        }
    }

    /// Run the command. Unavailable commands are skipped with `Ok(false)`, as
    /// are edits the surface cancelled.
    pub fn execute(&mut self, ws: &mut Workspace, history: &mut CommandStack) -> Result<bool, CommandError> {
        if !self.is_available(ws, history) {
            return Ok(false);
        }
        match self {
            Command::Undo { level } => Ok(history.undo(*level, ws)? > 0),
            Command::Redo { level } => Ok(history.redo(*level, ws)? > 0),
            other => other.apply(ws),
        }
    }

    /// Revert a recorded command. Unavailable commands are skipped.
    pub fn un_execute(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        if !self.is_applicable(ws) {
            return Ok(());
        }
        self.revert(ws)
    }

    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<bool, CommandError> {
        match self {
            Command::CreateNewMap(c) => c.apply(ws),
            Command::RenameMap(c) => c.apply(ws),
            Command::SaveNodeContent(c) => c.apply(ws),
            Command::SaveMap => lifecycle::save_map(ws).map(|_| true),
            Command::SaveMapInStorage(c) => c.apply(ws).map(|_| true),
            Command::SaveMapInDisk(c) => c.apply(ws).map(|_| true),
            Command::OpenMapInStorage(c) => c.apply(ws).map(|_| true),
            Command::OpenMapInDisk(c) => c.apply(ws).map(|_| true),
            Command::CreateNewRootNode(c) | Command::AppendChildNode(c) => c.apply(ws).map(|_| true),
            Command::DeleteNode(r) => r.apply(open_map(ws)?).map(|_| true),
            Command::SaveNodePosition(c) => c.apply(ws).map(|_| true),
            Command::Copy(c) => c.apply(ws).map(|_| true),
            Command::Cut(c) => c.apply(ws).map(|_| true),
            Command::Paste(c) => c.apply(ws).map(|_| true),
            Command::Undo { .. } | Command::Redo { .. } => Ok(false),
        }
    }

    pub(crate) fn revert(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        match self {
            Command::CreateNewRootNode(c) | Command::AppendChildNode(c) => c.revert(ws),
            Command::DeleteNode(r) => r.revert(open_map(ws)?),
            Command::SaveNodePosition(c) => c.revert(ws),
            Command::SaveNodeContent(c) => c.revert(ws),
            Command::Cut(c) => c.revert(ws),
            Command::Paste(c) => c.revert(ws),
            // not reversible
            _ => Ok(()),
        }
    }
}
