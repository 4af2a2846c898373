//! DOM Tree (arena-based allocation)

use crate::{DomError, DomResult, ElementData, MutationRecord, Node, NodeData, NodeId};

/// Arena-based DOM tree
///
/// Slot 0 is always the document node. Nodes are never freed; detached
/// nodes stay addressable so handles held elsewhere remain valid.
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    mutations: Vec<MutationRecord>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            mutations: Vec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Element data, `None` for missing or non-element nodes
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Number of nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag_name)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    /// True if `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Attached (transitively) to the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.is_inclusive_ancestor(NodeId::ROOT, id)
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        let parent_node = self.node(parent)?;
        self.node(child)?;

        if matches!(parent_node.data, NodeData::Text(_) | NodeData::Comment(_)) {
            return Err(DomError::InvalidParent(parent));
        }
        if child == NodeId::ROOT || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        if let Some(old_parent) = self.parent(child) {
            self.detach(old_parent, child);
        }

        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);

        if self.is_connected(parent) {
            self.mutations.push(MutationRecord::added(parent, child));
        }
        tracing::trace!("appended {} to {}", child, parent);
        Ok(child)
    }

    /// Remove `child` from `parent`; the node stays in the arena
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(parent, child);
        Ok(child)
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        let connected = self.is_connected(parent);
        self.nodes[parent.index()].children.retain(|&c| c != child);
        self.nodes[child.index()].parent = None;
        if connected {
            self.mutations.push(MutationRecord::removed(parent, child));
        }
    }

    /// Pre-order traversal of the subtree below `id` (excluding `id`)
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = self.children(id).iter().rev().copied().collect();
        Descendants { tree: self, stack }
    }

    /// Elements below `root` carrying `attribute`, in document order
    pub fn elements_with_attribute(&self, root: NodeId, attribute: &str) -> Vec<NodeId> {
        self.descendants(root)
            .filter(|&id| self.element(id).is_some_and(|e| e.has_attribute(attribute)))
            .collect()
    }

    /// `id` itself or any descendant carries `attribute`
    pub fn subtree_has_attribute(&self, id: NodeId, attribute: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_attribute(attribute))
            || self
                .descendants(id)
                .any(|d| self.element(d).is_some_and(|e| e.has_attribute(attribute)))
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    /// Drain queued child-list records
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }
}

/// Pre-order subtree iterator
pub struct Descendants<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}
