//! Commands that change the shape of the tree: node creation, removal and
//! the clipboard trio.

use crate::error::{CommandError, MapError};
use crate::map_utils::composition::ROOT_ID;
use crate::map_utils::manager::MapManager;
use crate::map_utils::map::MindMap;
use crate::map_utils::record::{NodeId, NodeRecord, NodeSnapshot, Offset};
use crate::session::Workspace;

use super::open_map;

/// Selected node unless nothing (or the map root) is selected.
fn selected_node(map: Option<&MindMap>) -> Option<NodeId> {
    map?.current().filter(|id| id.as_str() != ROOT_ID).cloned()
}

/// Backs both `CreateNewRootNode` (no parent) and `AppendChildNode`.
#[derive(Clone, Debug)]
pub struct CreateNode {
    parent: Option<NodeId>,
    offset: Offset,
    node: Option<NodeSnapshot>,
}

impl CreateNode {
    pub fn root(offset: Offset) -> Self { Self { parent: None, offset, node: None } }

    /// The map root holds no record, so it never counts as a parent here.
    pub fn child_of(parent: Option<NodeId>, offset: Offset) -> Self {
        Self { parent: parent.filter(|p| p != ROOT_ID), offset, node: None }
    }

    /// Child of whatever is selected in the open map.
    pub fn under_selection(ws: &Workspace) -> Self { Self::child_of(selected_node(ws.map.as_ref()), Offset::default()) }

    pub fn parent(&self) -> Option<&NodeId> { self.parent.as_ref() }

    /// Id of the created node, known after the first execute.
    pub fn node_id(&self) -> Option<&NodeId> { self.node.as_ref()?.id.as_ref() }

    pub(crate) fn is_available(&self, ws: &Workspace, needs_parent: bool) -> bool {
        let Some(map) = &ws.map else { return false };
        match &self.parent {
            Some(parent) => map.tree().contains(parent),
            None => !needs_parent,
        }
    }

    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let map = open_map(ws)?;
        let node = self.node.get_or_insert_with(|| {
            MapManager::create_node(Some(NodeSnapshot {
                parent: self.parent.clone(),
                ..NodeSnapshot::with_offset(self.offset)
            }))
        });
        let id = map.manager_mut().insert_snapshot(node)?;
        let parent = MindMap::tree_parent_of(node.parent.as_ref());
        map.attach_records(&parent, &id)?;
        Ok(())
    }

    pub(crate) fn revert(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let Some(id) = self.node_id().cloned() else { return Ok(()) };
        let map = open_map(ws)?;
        map.detach(&id)?;
        map.manager_mut().delete_node(&id);
        Ok(())
    }
}

/// Removes a node with its subtree and can put it back with the same ids.
/// The tree parent is taken when the command is built, because once the node
/// is detached that link no longer exists.
#[derive(Clone, Debug)]
pub struct RemoveSubtree {
    target: Option<(NodeId, NodeId)>,
    records: Option<Vec<NodeRecord>>,
}

impl RemoveSubtree {
    pub fn from_selection(ws: &Workspace) -> Self {
        let target = ws.map.as_ref().and_then(|map| {
            let node = selected_node(Some(map))?;
            let parent = map.tree().parent(&node)?.clone();
            Some((parent, node))
        });
        Self { target, records: None }
    }

    pub fn node_id(&self) -> Option<&NodeId> { self.target.as_ref().map(|(_, node)| node) }

    pub(crate) fn is_available(&self, ws: &Workspace) -> bool { ws.map.is_some() && self.target.is_some() }

    pub(crate) fn apply(&mut self, map: &mut MindMap) -> Result<(), CommandError> {
        let Some((_, node)) = &self.target else { return Ok(()) };
        if self.records.is_none() {
            let captured = map
                .manager()
                .get_subtree(node)
                .ok_or_else(|| MapError::NodeNotFound(node.clone()))?;
            self.records = Some(captured);
        }
        map.detach(node)?;
        if let Some(records) = &self.records {
            // Table deletion does not cascade, so every captured row goes explicitly.
            for record in records.iter().rev() {
                map.manager_mut().delete_node(&record.id);
            }
        }
        Ok(())
    }

    pub(crate) fn revert(&mut self, map: &mut MindMap) -> Result<(), CommandError> {
        let (Some((parent, _)), Some(records)) = (&self.target, &self.records) else {
            return Ok(());
        };
        let Some(root) = records.first() else { return Ok(()) };
        for record in records {
            map.manager_mut().add_node(record.clone())?;
        }
        // attaching the subtree root rebuilds the rest
        map.attach_records(parent, &root.id)?;
        Ok(())
    }
}

/// Copy the selected subtree into the clipboard. Not recorded.
#[derive(Clone, Debug)]
pub struct CopyNode {
    target: Option<NodeId>,
}

impl CopyNode {
    pub fn from_selection(ws: &Workspace) -> Self { Self { target: selected_node(ws.map.as_ref()) } }

    pub(crate) fn is_available(&self, ws: &Workspace) -> bool {
        match (&ws.map, &self.target) {
            (Some(map), Some(target)) => map.manager().contains(target),
            _ => false,
        }
    }

    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let Some(target) = &self.target else { return Ok(()) };
        let Workspace { map, clipboard, .. } = ws;
        let map = map.as_ref().ok_or(CommandError::NoMap)?;
        let snapshot = map
            .manager()
            .snapshot(target)
            .ok_or_else(|| MapError::NodeNotFound(target.clone()))?;
        clipboard.set_clipboard(snapshot);
        Ok(())
    }
}

/// Delete plus a clipboard write that happens once, on the first execute.
#[derive(Clone, Debug)]
pub struct Cut {
    removal: RemoveSubtree,
    copied: bool,
}

impl Cut {
    pub fn from_selection(ws: &Workspace) -> Self {
        Self { removal: RemoveSubtree::from_selection(ws), copied: false }
    }

    pub fn node_id(&self) -> Option<&NodeId> { self.removal.node_id() }

    pub(crate) fn is_available(&self, ws: &Workspace) -> bool { self.removal.is_available(ws) }

    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let Workspace { map, clipboard, .. } = ws;
        let map = map.as_mut().ok_or(CommandError::NoMap)?;
        if !self.copied
            && let Some(node) = self.removal.node_id()
        {
            let snapshot = map
                .manager()
                .snapshot(node)
                .ok_or_else(|| MapError::NodeNotFound(node.clone()))?;
            clipboard.set_clipboard(snapshot);
            self.copied = true;
        }
        self.removal.apply(map)
    }

    pub(crate) fn revert(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        self.removal.revert(open_map(ws)?)
    }
}

/// Insert the clipboard content under the selected node (or the map root).
#[derive(Clone, Debug)]
pub struct Paste {
    target: Option<NodeId>,
    node: Option<NodeSnapshot>,
}

impl Paste {
    pub fn from_selection(ws: &Workspace) -> Self {
        let target = ws
            .map
            .as_ref()
            .map(|map| map.current().cloned().unwrap_or_else(|| ROOT_ID.to_string()));
        Self { target, node: None }
    }

    pub fn into_target(target: impl Into<NodeId>) -> Self { Self { target: Some(target.into()), node: None } }

    /// Root id of the pasted subtree, known after the first execute.
    pub fn node_id(&self) -> Option<&NodeId> { self.node.as_ref()?.id.as_ref() }

    pub(crate) fn is_available(&self, ws: &Workspace) -> bool {
        let (Some(map), Some(target)) = (&ws.map, &self.target) else { return false };
        map.tree().contains(target) && (self.node.is_some() || !ws.clipboard.is_empty())
    }

    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let Some(target) = self.target.clone() else { return Ok(()) };
        let Workspace { map, clipboard, settings, .. } = ws;
        let map = map.as_mut().ok_or(CommandError::NoMap)?;

        if self.node.is_none() {
            let Some(mut seed) = clipboard.get_clipboard().cloned() else { return Ok(()) };
            if target == ROOT_ID {
                seed.parent = None;
                seed.offset = map.pan().abs() + map.pointer();
            } else {
                seed.parent = Some(target.clone());
                seed.offset = settings.paste_offset;
            }
            self.node = Some(MapManager::create_node(Some(seed)));
        }

        if let Some(node) = &self.node {
            let id = map.manager_mut().insert_snapshot(node)?;
            map.attach_records(&target, &id)?;
        }
        Ok(())
    }

    pub(crate) fn revert(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let Some(node) = &self.node else { return Ok(()) };
        let map = open_map(ws)?;
        if let Some(id) = &node.id {
            map.detach(id)?;
        }
        for id in node.ids().iter().rev() {
            map.manager_mut().delete_node(id);
        }
        Ok(())
    }
}
