use std::collections::VecDeque;

use log::{debug, info};

use crate::command::{Clipboard, Command, CommandStack};
use crate::error::CommandError;
use crate::map_utils::manager::MapManager;
use crate::map_utils::map::MindMap;
use crate::map_utils::record::NodeId;
use crate::persistence::settings::EditorSettings;
use crate::persistence::store::{MapStore, MemoryStore};

/// Caption input and prompts. Every request blocks until answered; `None`
/// means the user cancelled.
pub trait EditingSurface {
    fn insert_text(&mut self, current: &str) -> Option<String>;

    /// Ask for a line of text; `default` is offered as the initial answer.
    fn prompt(&mut self, message: &str, default: &str) -> Option<String>;

    /// Display hook called whenever a caption changes.
    fn set_content(&mut self, _node: &str, _text: &str) {}
}

/// Surface answering from a queue. An empty queue cancels.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSurface {
    answers: VecDeque<String>,
}

impl ScriptedSurface {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: answers.into_iter().map(Into::into).collect() }
    }
}

impl EditingSurface for ScriptedSurface {
    fn insert_text(&mut self, _current: &str) -> Option<String> { self.answers.pop_front() }
    fn prompt(&mut self, _message: &str, _default: &str) -> Option<String> { self.answers.pop_front() }
}

/// Everything a command may touch, except the history itself.
pub struct Workspace {
    pub map: Option<MindMap>,
    pub clipboard: Clipboard,
    pub store: Box<dyn MapStore>,
    pub surface: Box<dyn EditingSurface>,
    pub settings: EditorSettings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Not available right now; nothing happened.
    Skipped,
    /// The user backed out of a prompt; nothing happened.
    Cancelled,
    Executed,
    /// Executed and appended to the history.
    Recorded,
}

/// One editing session: the open map, its clipboard and its history.
pub struct EditorSession {
    workspace: Workspace,
    history: CommandStack,
}

impl EditorSession {
    pub fn new(store: Box<dyn MapStore>, surface: Box<dyn EditingSurface>, settings: EditorSettings) -> Self {
        EditorSession {
            workspace: Workspace {
                map: None,
                clipboard: Clipboard::default(),
                store,
                surface,
                settings,
            },
            history: CommandStack::new(),
        }
    }

    /// Session backed by an in-memory store and a surface that cancels every prompt.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::default()), Box::new(ScriptedSurface::default()), EditorSettings::default())
    }

    pub fn workspace(&self) -> &Workspace { &self.workspace }
    pub fn workspace_mut(&mut self) -> &mut Workspace { &mut self.workspace }
    pub fn history(&self) -> &CommandStack { &self.history }
    pub fn map(&self) -> Option<&MindMap> { self.workspace.map.as_ref() }
    pub fn map_mut(&mut self) -> Option<&mut MindMap> { self.workspace.map.as_mut() }
    pub fn manager(&self) -> Option<&MapManager> { self.map().map(MindMap::manager) }
    pub fn clipboard(&self) -> &Clipboard { &self.workspace.clipboard }
    pub fn settings(&self) -> &EditorSettings { &self.workspace.settings }

    pub fn set_surface(&mut self, surface: Box<dyn EditingSurface>) { self.workspace.surface = surface; }

    pub fn is_available(&self, command: &Command) -> bool { command.is_available(&self.workspace, &self.history) }

    /// Execute `command` and record it when it belongs in the history.
    pub fn run(&mut self, mut command: Command) -> Result<Outcome, CommandError> {
        if !self.is_available(&command) {
            debug!("{} unavailable, skipped", command.name());
            return Ok(Outcome::Skipped);
        }
        if !command.execute(&mut self.workspace, &mut self.history)? {
            debug!("{} cancelled", command.name());
            return Ok(Outcome::Cancelled);
        }
        debug!("executed {}", command.name());
        if command.need_push() {
            self.history.commit(command);
            Ok(Outcome::Recorded)
        } else {
            Ok(Outcome::Executed)
        }
    }

    /// Build a command from the current workspace and run it.
    pub fn run_with<F>(&mut self, build: F) -> Result<Outcome, CommandError>
    where
        F: FnOnce(&Workspace) -> Command,
    {
        let command = build(&self.workspace);
        self.run(command)
    }

    pub fn select(&mut self, id: Option<&str>) -> Result<(), CommandError> {
        let map = self.workspace.map.as_mut().ok_or(CommandError::NoMap)?;
        map.select(id)?;
        Ok(())
    }

    /// Id of the node created or pasted by the last recorded command.
    pub fn last_node(&self) -> Option<&NodeId> {
        let index = self.history.index().checked_sub(1)?;
        self.history.get(index)?.node_id()
    }

    /// Drop the open map together with its history. The clipboard survives.
    pub fn close_map(&mut self) -> Option<MapManager> {
        let map = self.workspace.map.take()?;
        self.history.clear();
        let manager = map.manager().clone();
        info!("closed map {}", manager.get_map_name());
        Some(manager)
    }

    /// Window title: the map name, starred while there are unsaved changes.
    pub fn title(&self) -> Option<String> {
        let manager = self.manager()?;
        if manager.is_modified() {
            Some(format!("*{}", manager.get_map_name()))
        } else {
            Some(manager.get_map_name().to_string())
        }
    }

    /// Tree, table and the link between them all hold their invariants.
    pub fn is_consistent(&self) -> bool {
        self.map()
            .is_none_or(|map| map.tree().is_consistent() && map.manager().is_consistent() && map.is_synchronized())
    }
}
