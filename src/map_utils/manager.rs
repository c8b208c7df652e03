use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::map_utils::composition::generate_unique_id;
use crate::map_utils::record::{NodeId, NodeRecord, NodeSnapshot, Offset};
use crate::persistence::persist::MapFile;
use crate::persistence::store::MapStore;

/// Authoritative node table and map metadata, independent of the live tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapManager {
    name: String,
    modified: bool,
    nodes: HashMap<NodeId, NodeRecord>,
}

impl MapManager {
    /// An empty, unmodified map.
    pub fn new(name: impl Into<String>) -> Self {
        MapManager {
            name: name.into(),
            modified: false,
            nodes: HashMap::new(),
        }
    }

    /// Rebuild the table from a persisted record tree. The result starts unmodified.
    pub fn from_map_file(file: MapFile) -> Result<Self, MapError> {
        let mut manager = MapManager::new(file.name);
        for mut root in file.nodes {
            root.parent = None;
            let root = MapManager::create_node(Some(root));
            manager.insert_snapshot(&root)?;
        }
        manager.modified = false;
        Ok(manager)
    }

    /// Fill in missing ids throughout `seed` and point every child's parent
    /// at its holder. Nothing is inserted.
    pub fn create_node(seed: Option<NodeSnapshot>) -> NodeSnapshot {
        fn assign(node: &mut NodeSnapshot) {
            let id = node.id.get_or_insert_with(generate_unique_id).clone();
            for child in &mut node.children {
                child.parent = Some(id.clone());
                assign(child);
            }
        }
        let mut node = seed.unwrap_or_default();
        assign(&mut node);
        node
    }

    /// Insert one flat record and link it into its parent's child set.
    pub fn add_node(&mut self, record: NodeRecord) -> Result<(), MapError> {
        if self.nodes.contains_key(&record.id) {
            return Err(MapError::DuplicateId(record.id));
        }
        if let Some(parent) = &record.parent {
            let holder = self
                .nodes
                .get_mut(parent)
                .ok_or_else(|| MapError::ParentNotFound(parent.clone()))?;
            holder.children.insert(record.id.clone());
        }
        self.nodes.insert(record.id.clone(), record);
        self.modified = true;
        Ok(())
    }

    /// Flatten and insert a whole snapshot. Either every record goes in or none does.
    pub fn insert_snapshot(&mut self, snapshot: &NodeSnapshot) -> Result<NodeId, MapError> {
        let records = flatten(snapshot)?;
        let mut seen = HashSet::new();
        for record in &records {
            if self.nodes.contains_key(&record.id) || !seen.insert(record.id.as_str()) {
                return Err(MapError::DuplicateId(record.id.clone()));
            }
        }
        if let Some(parent) = &records[0].parent
            && !self.nodes.contains_key(parent)
        {
            return Err(MapError::ParentNotFound(parent.clone()));
        }

        let root = records[0].id.clone();
        for record in records {
            self.add_node(record)?;
        }
        Ok(root)
    }

    /// Remove a single record. Descendant records stay in the table; callers
    /// delete or re-attach them explicitly.
    pub fn delete_node(&mut self, id: &str) -> Option<NodeRecord> {
        let record = self.nodes.remove(id)?;
        if let Some(parent) = &record.parent
            && let Some(holder) = self.nodes.get_mut(parent)
        {
            holder.children.remove(id);
        }
        self.modified = true;
        Some(record)
    }

    pub fn get_node(&self, id: &str) -> Option<&NodeRecord> { self.nodes.get(id) }
    pub fn contains(&self, id: &str) -> bool { self.nodes.contains_key(id) }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn records(&self) -> impl Iterator<Item = &NodeRecord> { self.nodes.values() }

    /// The record and all of its descendants in pre-order, root first. This is
    /// the form subtree removals capture so they can be put back later.
    pub fn get_subtree(&self, id: &str) -> Option<Vec<NodeRecord>> {
        let root = self.nodes.get(id)?;
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(record) = stack.pop() {
            out.push(record.clone());
            stack.extend(record.children.iter().rev().filter_map(|c| self.nodes.get(c)));
        }
        Some(out)
    }

    /// Deep copy of a record as a nested snapshot.
    pub fn snapshot(&self, id: &str) -> Option<NodeSnapshot> {
        let record = self.nodes.get(id)?;
        Some(NodeSnapshot {
            id: Some(record.id.clone()),
            parent: record.parent.clone(),
            offset: record.offset,
            content: record.content.clone(),
            children: record.children.iter().filter_map(|c| self.snapshot(c)).collect(),
        })
    }

    pub fn get_node_position(&self, id: &str) -> Option<Offset> { self.nodes.get(id).map(|n| n.offset) }

    pub fn set_node_position(&mut self, id: &str, offset: Offset) -> Result<(), MapError> {
        let record = self.nodes.get_mut(id).ok_or_else(|| MapError::NodeNotFound(id.to_string()))?;
        record.offset = offset;
        self.modified = true;
        Ok(())
    }

    pub fn get_node_content(&self, id: &str) -> Option<&str> { self.nodes.get(id).map(|n| n.content.as_str()) }

    pub fn set_node_content(&mut self, id: &str, content: impl Into<String>) -> Result<(), MapError> {
        let record = self.nodes.get_mut(id).ok_or_else(|| MapError::NodeNotFound(id.to_string()))?;
        record.content = content.into();
        self.modified = true;
        Ok(())
    }

    /// Depth-first visit of a detached snapshot, parents before children.
    pub fn traverse_node<F>(node: &mut NodeSnapshot, f: &mut F)
    where
        F: FnMut(&mut NodeSnapshot),
    {
        f(node);
        for child in &mut node.children {
            MapManager::traverse_node(child, f);
        }
    }

    /// Clear every id (and the parent links that refer to them) so the
    /// snapshot gets fresh ids when it is inserted again.
    pub fn strip_ids(node: &mut NodeSnapshot) {
        MapManager::traverse_node(node, &mut |n| {
            n.id = None;
            n.parent = None;
        });
    }

    /// Ids of the nodes hanging directly off the map root.
    pub fn root_ids(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id.clone())
            .collect();
        roots.sort();
        roots
    }

    pub fn get_map_data(&self) -> Vec<NodeSnapshot> {
        self.root_ids().iter().filter_map(|id| self.snapshot(id)).collect()
    }

    /// Hand the map to the store; the modified flag is cleared only when the
    /// store reports success.
    pub fn save_map(&mut self, store: &mut dyn MapStore) -> anyhow::Result<()> {
        store.save_map(&MapFile::from_manager(self))?;
        self.mark_saved();
        Ok(())
    }

    pub fn mark_saved(&mut self) { self.modified = false; }
    pub fn get_map_name(&self) -> &str { &self.name }
    pub fn is_modified(&self) -> bool { self.modified }

    pub fn set_map_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.modified = true;
    }

    /// Every parent link points at an existing record that lists the child back.
    pub fn is_consistent(&self) -> bool {
        self.nodes.values().all(|record| {
            let up = match &record.parent {
                Some(p) => self.nodes.get(p).is_some_and(|h| h.children.contains(&record.id)),
                None => true,
            };
            let down = record
                .children
                .iter()
                .all(|c| self.nodes.get(c).is_some_and(|child| child.parent.as_ref() == Some(&record.id)));
            up && down
        })
    }
}

fn flatten(snapshot: &NodeSnapshot) -> Result<Vec<NodeRecord>, MapError> {
    fn walk(node: &NodeSnapshot, parent: Option<NodeId>, out: &mut Vec<NodeRecord>) -> Result<(), MapError> {
        let id = node.id.clone().ok_or(MapError::MissingId)?;
        let children: BTreeSet<NodeId> = node
            .children
            .iter()
            .map(|c| c.id.clone().ok_or(MapError::MissingId))
            .collect::<Result<_, _>>()?;
        out.push(NodeRecord {
            id: id.clone(),
            parent,
            offset: node.offset,
            content: node.content.clone(),
            children,
        });
        for child in &node.children {
            walk(child, Some(id.clone()), out)?;
        }
        Ok(())
    }
    let mut out = Vec::with_capacity(snapshot.node_count());
    walk(snapshot, snapshot.parent.clone(), &mut out)?;
    Ok(out)
}
