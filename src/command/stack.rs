use log::debug;

use super::Command;
use crate::error::CommandError;
use crate::session::Workspace;

/// Linear undo/redo history. Commands below `index` are applied, the rest are
/// redo candidates until the next commit throws them away.
#[derive(Debug, Default)]
pub struct CommandStack {
    commands: Vec<Command>,
    index: usize,
}

impl CommandStack {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.commands.len() }
    pub fn is_empty(&self) -> bool { self.commands.is_empty() }
    pub fn index(&self) -> usize { self.index }
    pub fn can_undo(&self) -> bool { self.index > 0 }
    pub fn can_redo(&self) -> bool { self.index < self.commands.len() }

    pub fn get(&self, index: usize) -> Option<&Command> { self.commands.get(index) }

    /// Names of the recorded commands, oldest first.
    pub fn names(&self) -> Vec<&'static str> { self.commands.iter().map(Command::name).collect() }

    pub fn commit(&mut self, command: Command) {
        if self.index < self.commands.len() {
            debug!("discarding {} redo step(s)", self.commands.len() - self.index);
        }
        self.commands.truncate(self.index);
        self.commands.push(command);
        self.index = self.commands.len();
    }

    /// Step back up to `level` commands. Returns how many were undone.
    pub fn undo(&mut self, level: usize, ws: &mut Workspace) -> Result<usize, CommandError> {
        let mut steps = 0;
        while steps < level && self.index > 0 {
            self.index -= 1;
            let command = &mut self.commands[self.index];
            if command.is_applicable(ws) {
                debug!("undo {}", command.name());
                if let Err(e) = command.revert(ws) {
                    self.index += 1;
                    return Err(e);
                }
            }
            steps += 1;
        }
        Ok(steps)
    }

    /// Re-apply up to `level` commands. Returns how many were redone.
    pub fn redo(&mut self, level: usize, ws: &mut Workspace) -> Result<usize, CommandError> {
        let mut steps = 0;
        while steps < level && self.index < self.commands.len() {
            let command = &mut self.commands[self.index];
            if command.is_applicable(ws) {
                debug!("redo {}", command.name());
                command.apply(ws)?;
            }
            self.index += 1;
            steps += 1;
        }
        Ok(steps)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.index = 0;
    }
}
