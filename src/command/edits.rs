use crate::error::CommandError;
use crate::map_utils::composition::ROOT_ID;
use crate::map_utils::record::{NodeId, Offset};
use crate::session::Workspace;

use super::open_map;

fn selected_record(ws: &Workspace) -> Option<NodeId> {
    let map = ws.map.as_ref()?;
    map.current()
        .filter(|id| id.as_str() != ROOT_ID && map.manager().contains(id))
        .cloned()
}

#[derive(Clone, Debug)]
pub struct SaveNodePosition {
    node: Option<NodeId>,
    position: Offset,
    original: Option<Offset>,
}

impl SaveNodePosition {
    /// Move the selected node to `position`; its current offset is kept for undo.
    pub fn from_selection(ws: &Workspace, position: Offset) -> Self {
        let node = selected_record(ws);
        let original = node
            .as_deref()
            .and_then(|id| ws.map.as_ref()?.manager().get_node_position(id));
        Self { node, position, original }
    }

    pub(crate) fn is_available(&self, ws: &Workspace) -> bool {
        ws.map.is_some() && self.node.is_some() && self.original.is_some()
    }

    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let Some(node) = &self.node else { return Ok(()) };
        open_map(ws)?.manager_mut().set_node_position(node, self.position)?;
        Ok(())
    }

    pub(crate) fn revert(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let (Some(node), Some(original)) = (&self.node, self.original) else { return Ok(()) };
        open_map(ws)?.manager_mut().set_node_position(node, original)?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SaveNodeContent {
    node: Option<NodeId>,
    original: Option<String>,
    content: Option<String>,
}

impl SaveNodeContent {
    /// Edit the selected node's caption. Without `content` the editing
    /// surface is asked for it on the first execute.
    pub fn from_selection(ws: &Workspace, content: Option<String>) -> Self {
        let node = selected_record(ws);
        let original = node
            .as_deref()
            .and_then(|id| ws.map.as_ref()?.manager().get_node_content(id))
            .map(str::to_string);
        Self { node, original, content }
    }

    pub(crate) fn is_available(&self, ws: &Workspace) -> bool {
        ws.map.is_some() && self.node.is_some() && self.original.is_some()
    }

    /// `Ok(false)` when the surface cancelled the edit.
    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<bool, CommandError> {
        let (Some(node), Some(original)) = (&self.node, &self.original) else { return Ok(false) };
        if self.content.is_none() {
            match ws.surface.insert_text(original) {
                Some(text) => self.content = Some(text),
                None => return Ok(false),
            }
        }
        let Some(content) = &self.content else { return Ok(false) };
        ws.surface.set_content(node, content);
        open_map(ws)?.manager_mut().set_node_content(node, content.as_str())?;
        Ok(true)
    }

    pub(crate) fn revert(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let (Some(node), Some(original)) = (&self.node, &self.original) else { return Ok(()) };
        ws.surface.set_content(node, original);
        open_map(ws)?.manager_mut().set_node_content(node, original.as_str())?;
        Ok(())
    }
}
