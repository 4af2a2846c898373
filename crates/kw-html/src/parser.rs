//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it to our DOM format.

use crate::HtmlError;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use kw_dom::{Document, DomTree, NodeId};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

/// HTML5 parser
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, HtmlError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a document URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, HtmlError> {
        tracing::debug!("parsing HTML document: {}", url);

        let dom = Self::parse_rcdom(html)?;
        let mut document = Document::empty(url);
        self.convert_node(&dom.document, document.tree_mut(), Some(NodeId::ROOT))?;
        document.finalize();

        tracing::debug!("parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Parse `html` as body content and append the resulting top-level
    /// nodes to `parent`, returning them in order.
    ///
    /// Each subtree is built detached and appended whole, so an observer on
    /// a connected parent sees one added node per top-level element.
    pub fn parse_fragment(
        &self,
        html: &str,
        tree: &mut DomTree,
        parent: NodeId,
    ) -> Result<Vec<NodeId>, HtmlError> {
        let dom = Self::parse_rcdom(html)?;
        let Some(body) = find_body(&dom.document) else {
            return Ok(Vec::new());
        };

        let mut appended = Vec::new();
        for child in body.children.borrow().iter() {
            if let Some(id) = self.convert_node(child, tree, None)? {
                tree.append_child(parent, id)?;
                appended.push(id);
            }
        }
        Ok(appended)
    }

    fn parse_rcdom(html: &str) -> Result<RcDom, HtmlError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;
        Ok(dom)
    }

    /// Convert an RcDom node, attaching it to `parent` when given.
    /// Returns the created node, if any.
    fn convert_node(
        &self,
        handle: &Handle,
        tree: &mut DomTree,
        parent: Option<NodeId>,
    ) -> Result<Option<NodeId>, HtmlError> {
        let id = match &handle.data {
            RcNodeData::Document => {
                let root = parent.unwrap_or(NodeId::ROOT);
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, Some(root))?;
                }
                return Ok(None);
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if text.trim().is_empty() {
                    return Ok(None);
                }
                tree.create_text(&text)
            }
            RcNodeData::Comment { contents } => tree.create_comment(contents),
            RcNodeData::Element { name, attrs, .. } => {
                let id = tree.create_element(&name.local);
                if let Some(element) = tree.element_mut(id) {
                    for attr in attrs.borrow().iter() {
                        element.set_attribute(&attr.name.local, &attr.value);
                    }
                }
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, Some(id))?;
                }
                id
            }
            RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => {
                return Ok(None);
            }
        };

        if let Some(parent) = parent {
            tree.append_child(parent, id)?;
        }
        Ok(Some(id))
    }
}

fn find_body(handle: &Handle) -> Option<Handle> {
    if let RcNodeData::Element { name, .. } = &handle.data {
        if &*name.local == "body" {
            return Some(handle.clone());
        }
    }
    handle.children.borrow().iter().find_map(find_body)
}
