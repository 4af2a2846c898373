//! Mutation records
//!
//! Queued by the tree when connected nodes gain or lose children, drained
//! by the host's mutation observers.

use crate::NodeId;

/// Child-list mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub fn added(target: NodeId, node: NodeId) -> Self {
        Self {
            target,
            added_nodes: vec![node],
            removed_nodes: Vec::new(),
        }
    }

    pub fn removed(target: NodeId, node: NodeId) -> Self {
        Self {
            target,
            added_nodes: Vec::new(),
            removed_nodes: vec![node],
        }
    }
}
