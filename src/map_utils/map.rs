use std::ops::ControlFlow;

use log::trace;

use crate::error::MapError;
use crate::map_utils::composition::{Composition, ListenerId, ROOT_ID, TreeEvent};
use crate::map_utils::manager::MapManager;
use crate::map_utils::record::{NodeId, Offset};

/// An open map: the live ownership tree, the record table it mirrors, and
/// the bits of view state commands read (selection, pan, pointer).
#[derive(Debug)]
pub struct MindMap {
    tree: Composition,
    manager: MapManager,
    current: Option<NodeId>,
    pan: Offset,
    pointer: Offset,
}

impl MindMap {
    /// Build the tree for every record in `manager`.
    pub fn new(manager: MapManager) -> Result<Self, MapError> {
        let mut map = MindMap {
            tree: Composition::new(ROOT_ID),
            manager,
            current: None,
            pan: Offset::default(),
            pointer: Offset::default(),
        };
        map.tree.subscribe(ROOT_ID, |event: &TreeEvent| {
            trace!("tree {:?}: {} under {}", event.kind, event.child, event.parent);
            ControlFlow::Continue(())
        })?;
        for id in map.manager.root_ids() {
            map.attach_records(ROOT_ID, &id)?;
        }
        Ok(map)
    }

    pub fn tree(&self) -> &Composition { &self.tree }
    pub fn manager(&self) -> &MapManager { &self.manager }
    pub(crate) fn manager_mut(&mut self) -> &mut MapManager { &mut self.manager }

    pub fn subscribe<F>(&mut self, node: &str, listener: F) -> Result<ListenerId, MapError>
    where
        F: FnMut(&TreeEvent) -> ControlFlow<()> + 'static,
    {
        Ok(self.tree.subscribe(node, listener)?)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool { self.tree.unsubscribe(id) }

    pub fn current(&self) -> Option<&NodeId> { self.current.as_ref() }

    /// Select a node (or the map root). `None` clears the selection.
    pub fn select(&mut self, id: Option<&str>) -> Result<(), MapError> {
        match id {
            Some(id) if !self.tree.contains(id) => Err(MapError::NodeNotFound(id.to_string())),
            Some(id) => {
                self.current = Some(id.to_string());
                Ok(())
            }
            None => {
                self.current = None;
                Ok(())
            }
        }
    }

    pub fn pan(&self) -> Offset { self.pan }
    pub fn set_pan(&mut self, pan: Offset) { self.pan = pan; }
    pub fn pointer(&self) -> Offset { self.pointer }
    pub fn set_pointer(&mut self, pointer: Offset) { self.pointer = pointer; }

    /// Tree node a record hangs under: its parent record, or the map root.
    pub fn tree_parent_of(record_parent: Option<&NodeId>) -> NodeId {
        record_parent.cloned().unwrap_or_else(|| ROOT_ID.to_string())
    }

    /// Create tree nodes for the record `id` and, following its `children`
    /// links, for its whole subtree, then attach the result under `parent`.
    pub(crate) fn attach_records(&mut self, parent: &str, id: &str) -> Result<(), MapError> {
        let children: Vec<NodeId> = self
            .manager
            .get_node(id)
            .ok_or_else(|| MapError::NodeNotFound(id.to_string()))?
            .children
            .iter()
            .cloned()
            .collect();
        let node = self.tree.create_node(Some(id.to_string()))?;
        if let Err(e) = self.tree.add_child(parent, &node) {
            self.tree.dispose(&node)?;
            return Err(e.into());
        }
        for child in children {
            self.attach_records(id, &child)?;
        }
        Ok(())
    }

    /// Drop the tree node `id` and everything under it. The selection is
    /// cleared when it pointed into the removed subtree.
    pub(crate) fn detach(&mut self, id: &str) -> Result<Vec<NodeId>, MapError> {
        if !self.tree.contains(id) {
            return Err(MapError::NodeNotFound(id.to_string()));
        }
        let removed = self.tree.dispose(id)?;
        if let Some(current) = &self.current
            && removed.contains(current)
        {
            self.current = None;
        }
        Ok(removed)
    }

    /// The tree holds exactly one node per record, under the record's parent.
    pub fn is_synchronized(&self) -> bool {
        self.tree.node_count() == self.manager.node_count() + 1
            && self.manager.records().all(|record| {
                let expected = MindMap::tree_parent_of(record.parent.as_ref());
                self.tree.parent(&record.id) == Some(&expected)
            })
    }
}
