//! Document - High-level document API

use crate::{DomTree, NodeId};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    tree: DomTree,
    url: String,
    html_element: Option<NodeId>,
    head_element: Option<NodeId>,
    body_element: Option<NodeId>,
}

impl Document {
    /// Create a document with `<html><head></head><body></body></html>`
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Freshly created nodes under the root cannot violate the hierarchy.
        let _ = tree.append_child(NodeId::ROOT, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);
        tree.take_mutations();

        Self {
            tree,
            url: url.to_string(),
            html_element: Some(html),
            head_element: Some(head),
            body_element: Some(body),
        }
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
            html_element: None,
            head_element: None,
            body_element: None,
        }
    }

    /// Locate `html`/`head`/`body` after a parser built the tree, and drop
    /// the mutation records produced while building it.
    pub fn finalize(&mut self) {
        let find = |tree: &DomTree, parent: NodeId, tag: &str| {
            tree.children(parent)
                .iter()
                .copied()
                .find(|&id| tree.element(id).is_some_and(|e| e.tag_name() == tag))
        };
        self.html_element = find(&self.tree, NodeId::ROOT, "html");
        if let Some(html) = self.html_element {
            self.head_element = find(&self.tree, html, "head");
            self.body_element = find(&self.tree, html, "body");
        }
        self.tree.take_mutations();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `<html>` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.html_element
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head_element
    }

    pub fn body(&self) -> Option<NodeId> {
        self.body_element
    }

    /// First element whose `id` attribute equals `id`
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(NodeId::ROOT)
            .find(|&n| self.tree.element(n).and_then(|e| e.attribute("id")) == Some(id))
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
