use crate::map_utils::manager::MapManager;
use crate::map_utils::record::NodeSnapshot;

/// Single slot holding a detached subtree. Everything stored here has its ids
/// cleared so pasting it always produces fresh nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Clipboard {
    slot: Option<NodeSnapshot>,
}

impl Clipboard {
    pub fn set_clipboard(&mut self, mut snapshot: NodeSnapshot) {
        MapManager::strip_ids(&mut snapshot);
        self.slot = Some(snapshot);
    }

    pub fn get_clipboard(&self) -> Option<&NodeSnapshot> { self.slot.as_ref() }
    pub fn is_empty(&self) -> bool { self.slot.is_none() }
    pub fn clear(&mut self) { self.slot = None; }
}
