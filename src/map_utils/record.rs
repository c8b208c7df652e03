use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// Basic type aliases for clarity
pub type NodeId = String;

pub const DEFAULT_NODE_CONTENT: &str = "new node";

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }

    pub fn abs(self) -> Self { Self { x: self.x.abs(), y: self.y.abs() } }
}

impl std::ops::Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset { Offset::new(self.x + rhs.x, self.y + rhs.y) }
}

/// One row of the map's node table. Children are kept as ids so the table
/// stays flat and independent of the live tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub offset: Offset,
    pub content: String,
    #[serde(default)]
    pub children: BTreeSet<NodeId>,
}

/// Nested form of a record and its descendants, as written to disk and held
/// by the clipboard. `id` is `None` for snapshots waiting for fresh ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(default)]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub offset: Offset,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

impl Default for NodeSnapshot {
    fn default() -> Self {
        Self {
            id: None,
            parent: None,
            offset: Offset::default(),
            content: DEFAULT_NODE_CONTENT.to_string(),
            children: Vec::new(),
        }
    }
}

impl NodeSnapshot {
    pub fn with_offset(offset: Offset) -> Self { Self { offset, ..Self::default() } }

    /// Number of nodes in this snapshot, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::node_count).sum::<usize>()
    }

    /// Ids in pre-order; unassigned ids are skipped.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let Some(id) = &node.id { out.push(id.clone()); }
            stack.extend(node.children.iter().rev());
        }
        out
    }
}
