//! Ownership tree every map element hangs off.
//!
//! Nodes live in an arena keyed by id and point at each other only through
//! ids: a node owns the set of its children's ids and keeps its parent's id
//! as a back-reference. Both sides of an edge are written together, so
//! `parent.children` contains `n` exactly when `n.parent == parent`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::ControlFlow;

use uuid::Uuid;

use crate::error::CompositionError;
use crate::map_utils::record::NodeId;

/// Id of the implicit node every root-level map node is attached to.
pub const ROOT_ID: &str = "map";

/// 32 hex digits grouped 8-4-4-4-12. v7 uuids carry a millisecond timestamp
/// plus random bits; the arena additionally refuses ids it already holds.
pub fn generate_unique_id() -> NodeId {
    Uuid::now_v7().hyphenated().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: BTreeSet<NodeId>,
}

impl TreeNode {
    fn new(id: NodeId) -> Self { Self { id, parent: None, children: BTreeSet::new() } }

    pub fn id(&self) -> &NodeId { &self.id }
    pub fn parent(&self) -> Option<&NodeId> { self.parent.as_ref() }
    pub fn children(&self) -> impl Iterator<Item = &NodeId> { self.children.iter() }
    pub fn child_count(&self) -> usize { self.children.len() }
    pub fn has_child(&self, id: &str) -> bool { self.children.contains(id) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEventKind {
    ChildAdded,
    ChildRemoved,
}

/// Structural change, published from `parent` up through its ancestors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEvent {
    pub kind: TreeEventKind,
    pub parent: NodeId,
    pub child: NodeId,
}

pub type ListenerId = u64;

type Listener = Box<dyn FnMut(&TreeEvent) -> ControlFlow<()>>;

struct Subscription {
    id: ListenerId,
    node: NodeId,
    listener: Listener,
}

pub struct Composition {
    root: NodeId,
    nodes: HashMap<NodeId, TreeNode>,
    subscriptions: Vec<Subscription>,
    next_listener: ListenerId,
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("listeners", &self.subscriptions.len())
            .finish()
    }
}

impl Default for Composition {
    fn default() -> Self { Self::new(ROOT_ID) }
}

impl Composition {
    pub fn new(root: impl Into<NodeId>) -> Self {
        let root = root.into();
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), TreeNode::new(root.clone()));
        Self { root, nodes, subscriptions: Vec::new(), next_listener: 1 }
    }

    pub fn root(&self) -> &NodeId { &self.root }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn contains(&self, id: &str) -> bool { self.nodes.contains_key(id) }
    pub fn node(&self, id: &str) -> Option<&TreeNode> { self.nodes.get(id) }
    pub fn parent(&self, id: &str) -> Option<&NodeId> { self.nodes.get(id)?.parent.as_ref() }

    /// Register a detached node. A missing id is generated.
    pub fn create_node(&mut self, id: Option<NodeId>) -> Result<NodeId, CompositionError> {
        let id = id.unwrap_or_else(generate_unique_id);
        if self.nodes.contains_key(&id) {
            return Err(CompositionError::DuplicateId { parent: self.root.clone(), id });
        }
        self.nodes.insert(id.clone(), TreeNode::new(id.clone()));
        Ok(id)
    }

    /// `Some(p)` attaches `id` under `p`, `None` detaches it from whatever
    /// holds it. Re-attaching to a different parent requires a detach first.
    pub fn set_parent(&mut self, id: &str, parent: Option<&str>) -> Result<(), CompositionError> {
        let current = match self.nodes.get(id) {
            Some(node) => node.parent.clone(),
            None => return Err(CompositionError::InvalidArgument(id.to_string())),
        };

        let Some(parent) = parent else {
            if let Some(old) = current {
                self.unlink(&old, id);
            }
            return Ok(());
        };

        if !self.nodes.contains_key(parent) {
            return Err(CompositionError::InvalidArgument(parent.to_string()));
        }
        if parent == id {
            return Err(CompositionError::SelfParenting(id.to_string()));
        }
        match current {
            Some(existing) if existing == parent => return Ok(()),
            Some(existing) => {
                return Err(CompositionError::ParentConflict {
                    node: id.to_string(),
                    existing,
                    requested: parent.to_string(),
                });
            }
            None => {}
        }
        if self.is_ancestor(id, parent) {
            return Err(CompositionError::AncestorCycle {
                node: id.to_string(),
                parent: parent.to_string(),
            });
        }

        self.link(parent, id);
        Ok(())
    }

    pub fn add_child(&mut self, parent: &str, child: &str) -> Result<(), CompositionError> {
        let Some(holder) = self.nodes.get(parent) else {
            return Err(CompositionError::InvalidArgument(parent.to_string()));
        };
        if !self.nodes.contains_key(child) {
            return Err(CompositionError::InvalidArgument(child.to_string()));
        }
        if holder.children.contains(child) {
            return Err(CompositionError::DuplicateId {
                parent: parent.to_string(),
                id: child.to_string(),
            });
        }
        self.set_parent(child, Some(parent))
    }

    /// Detach `child` from `parent`. Returns `None` when `parent` does not hold it.
    pub fn remove_child(&mut self, parent: &str, child: &str) -> Option<NodeId> {
        if !self.nodes.get(parent)?.children.contains(child) {
            return None;
        }
        self.unlink(parent, child);
        Some(child.to_string())
    }

    pub fn get_child(&self, parent: &str, id: &str) -> Option<&TreeNode> {
        if self.nodes.get(parent)?.children.contains(id) { self.nodes.get(id) } else { None }
    }

    /// Visit the direct children of `parent` until `f` breaks.
    pub fn each_child<F>(&self, parent: &str, mut f: F)
    where
        F: FnMut(&TreeNode) -> ControlFlow<()>,
    {
        let Some(holder) = self.nodes.get(parent) else { return };
        for id in &holder.children {
            if let Some(child) = self.nodes.get(id)
                && f(child).is_break()
            {
                return;
            }
        }
    }

    /// `id` and all of its descendants, parents before children.
    pub fn descendants(&self, id: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(start) = self.nodes.get(id) else { return out };
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            out.push(node.id.clone());
            stack.extend(node.children.iter().rev().filter_map(|c| self.nodes.get(c)));
        }
        out
    }

    /// Is `ancestor` on the parent chain of `id` (or `id` itself)?
    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|n| n.parent.as_deref());
        }
        false
    }

    /// Detach `id` and drop it together with its whole subtree. Listeners
    /// registered on dropped nodes go with them. The root cannot be disposed.
    pub fn dispose(&mut self, id: &str) -> Result<Vec<NodeId>, CompositionError> {
        if id == self.root || !self.nodes.contains_key(id) {
            return Err(CompositionError::InvalidArgument(id.to_string()));
        }
        self.set_parent(id, None)?;
        let removed = self.descendants(id);
        for gone in &removed {
            self.nodes.remove(gone);
        }
        self.subscriptions.retain(|s| !removed.contains(&s.node));
        Ok(removed)
    }

    pub fn subscribe<F>(&mut self, node: &str, listener: F) -> Result<ListenerId, CompositionError>
    where
        F: FnMut(&TreeEvent) -> ControlFlow<()> + 'static,
    {
        if !self.nodes.contains_key(node) {
            return Err(CompositionError::InvalidArgument(node.to_string()));
        }
        let id = self.next_listener;
        self.next_listener += 1;
        self.subscriptions.push(Subscription { id, node: node.to_string(), listener: Box::new(listener) });
        Ok(id)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        before != self.subscriptions.len()
    }

    /// Parent link of every node, for comparing tree shapes.
    pub fn structure(&self) -> BTreeMap<NodeId, Option<NodeId>> {
        self.nodes.values().map(|n| (n.id.clone(), n.parent.clone())).collect()
    }

    /// Both ends of every edge agree and no node reaches itself.
    pub fn is_consistent(&self) -> bool {
        self.nodes.values().all(|node| {
            let up = match &node.parent {
                Some(p) => self.nodes.get(p).is_some_and(|parent| parent.children.contains(&node.id)),
                None => true,
            };
            let down = node
                .children
                .iter()
                .all(|c| self.nodes.get(c).is_some_and(|child| child.parent.as_ref() == Some(&node.id)));
            let acyclic = match &node.parent {
                Some(p) => !self.is_ancestor(&node.id, p),
                None => true,
            };
            up && down && acyclic
        })
    }

    fn link(&mut self, parent: &str, child: &str) {
        if let Some(holder) = self.nodes.get_mut(parent) {
            holder.children.insert(child.to_string());
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent.to_string());
        }
        self.emit(TreeEvent {
            kind: TreeEventKind::ChildAdded,
            parent: parent.to_string(),
            child: child.to_string(),
        });
    }

    fn unlink(&mut self, parent: &str, child: &str) {
        if let Some(holder) = self.nodes.get_mut(parent) {
            holder.children.remove(child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
        self.emit(TreeEvent {
            kind: TreeEventKind::ChildRemoved,
            parent: parent.to_string(),
            child: child.to_string(),
        });
    }

    // Bubble from the mutated parent to the root; a listener can stop it.
    fn emit(&mut self, event: TreeEvent) {
        if self.subscriptions.is_empty() {
            return;
        }
        let mut path = Vec::new();
        let mut cursor = Some(event.parent.clone());
        while let Some(id) = cursor {
            cursor = self.nodes.get(&id).and_then(|n| n.parent.clone());
            path.push(id);
        }

        let mut subscriptions = std::mem::take(&mut self.subscriptions);
        'bubble: for id in &path {
            for sub in subscriptions.iter_mut().filter(|s| &s.node == id) {
                if (sub.listener)(&event).is_break() {
                    break 'bubble;
                }
            }
        }
        self.subscriptions = subscriptions;
    }
}
