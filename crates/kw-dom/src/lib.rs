//! kw DOM - Document tree
//!
//! Arena-backed element tree with ordered attributes, class lists,
//! inline styles and layout rects. Child-list changes on connected nodes
//! are queued as mutation records for the host to deliver.

mod attributes;
mod classlist;
mod document;
mod error;
mod geometry;
mod mutation;
mod node;
mod style;
mod tree;

pub use attributes::{Attr, NamedNodeMap};
pub use classlist::DOMTokenList;
pub use document::Document;
pub use error::{DomError, DomResult};
pub use geometry::DOMRect;
pub use mutation::MutationRecord;
pub use node::{ElementData, Node, NodeData};
pub use style::InlineStyle;
pub use tree::{Descendants, DomTree};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Build an ID from a raw arena index
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
