//! Mutation Observer
//!
//! Observe child-list changes on a node or its whole subtree.

use crate::MutationObserverId;
use kw_dom::{DomTree, MutationRecord, NodeId};

/// Mutation observer options
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub subtree: bool,
}

/// Mutation observer
#[derive(Debug)]
pub struct MutationObserver {
    id: MutationObserverId,
    observations: Vec<(NodeId, MutationObserverInit)>,
}

impl MutationObserver {
    pub(crate) fn new(id: MutationObserverId) -> Self {
        Self {
            id,
            observations: Vec::new(),
        }
    }

    pub fn id(&self) -> MutationObserverId {
        self.id
    }

    /// Observe a target, replacing options if already observed
    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) {
        match self.observations.iter_mut().find(|(t, _)| *t == target) {
            Some((_, existing)) => *existing = options,
            None => self.observations.push((target, options)),
        }
    }

    pub fn disconnect(&mut self) {
        self.observations.clear();
    }

    pub fn is_observing(&self, node: NodeId) -> bool {
        self.observations.iter().any(|(t, _)| *t == node)
    }

    /// Whether `record` falls within one of this observer's observations
    pub(crate) fn matches(&self, tree: &DomTree, record: &MutationRecord) -> bool {
        self.observations.iter().any(|(target, options)| {
            options.child_list
                && (*target == record.target
                    || (options.subtree && tree.is_inclusive_ancestor(*target, record.target)))
        })
    }
}
