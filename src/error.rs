use thiserror::Error;

use crate::map_utils::record::NodeId;

/// Contract violations on the ownership tree. These abort the operation and
/// leave the tree untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("not a node of this tree: {0}")]
    InvalidArgument(NodeId),

    #[error("node {0} cannot be its own parent")]
    SelfParenting(NodeId),

    #[error("node {node} already has parent {existing}, refusing {requested}")]
    ParentConflict {
        node: NodeId,
        existing: NodeId,
        requested: NodeId,
    },

    #[error("id {id} already exists under {parent}")]
    DuplicateId { parent: NodeId, id: NodeId },

    #[error("attaching {node} under {parent} would make it its own ancestor")]
    AncestorCycle { node: NodeId, parent: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("parent record not found: {0}")]
    ParentNotFound(NodeId),

    #[error("record has no id")]
    MissingId,

    #[error("record id already in table: {0}")]
    DuplicateId(NodeId),

    #[error(transparent)]
    Composition(#[from] CompositionError),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no map is open")]
    NoMap,

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    // Store and disk failures; the map keeps its modified flag.
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}
