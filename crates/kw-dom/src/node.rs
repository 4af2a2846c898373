//! DOM Node
//!
//! Nodes link to their parent and children by `NodeId` rather than by
//! pointer; the tree owns every node.

use crate::{DOMRect, DOMTokenList, InlineStyle, NamedNodeMap, NodeId};

/// DOM Node - Core structure
#[derive(Debug)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    /// Parent node, `None` for the document and detached nodes
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Element-specific data
///
/// `class` and `style` are mirrored into structured forms; writes through
/// either path keep the attribute string and the structured value in sync.
#[derive(Debug)]
pub struct ElementData {
    tag_name: String,
    attrs: NamedNodeMap,
    class_list: DOMTokenList,
    style: InlineStyle,
    /// Layout box in page coordinates, `None` until laid out
    rect: Option<DOMRect>,
}

impl ElementData {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs: NamedNodeMap::new(),
            class_list: DOMTokenList::new(),
            style: InlineStyle::new(),
            rect: None,
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn attributes(&self) -> &NamedNodeMap {
        &self.attrs
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attrs.contains(name)
    }

    /// Set an attribute, returning the previous value
    pub fn set_attribute(&mut self, name: &str, value: &str) -> Option<String> {
        match name {
            "class" => self.class_list = DOMTokenList::from_string(value),
            "style" => self.style = InlineStyle::parse(value),
            _ => {}
        }
        self.attrs.set(name, value)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        match name {
            "class" => self.class_list = DOMTokenList::new(),
            "style" => self.style = InlineStyle::new(),
            _ => {}
        }
        self.attrs.remove(name).map(|a| a.value)
    }

    pub fn class_list(&self) -> &DOMTokenList {
        &self.class_list
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_list.contains(class)
    }

    /// Add a class; returns false when it was already present
    pub fn add_class(&mut self, class: &str) -> bool {
        let added = self.class_list.add(class);
        if added {
            let value = self.class_list.value();
            self.attrs.set("class", &value);
        }
        added
    }

    /// Remove a class; returns false when it was absent
    pub fn remove_class(&mut self, class: &str) -> bool {
        let removed = self.class_list.remove(class);
        if removed {
            let value = self.class_list.value();
            self.attrs.set("class", &value);
        }
        removed
    }

    pub fn style(&self) -> &InlineStyle {
        &self.style
    }

    pub fn style_property(&self, property: &str) -> Option<&str> {
        self.style.get(property)
    }

    pub fn set_style_property(&mut self, property: &str, value: &str) {
        self.style.set(property, value);
        let text = self.style.css_text();
        self.attrs.set("style", &text);
    }

    pub fn remove_style_property(&mut self, property: &str) -> Option<String> {
        let old = self.style.remove(property)?;
        if self.style.is_empty() {
            self.attrs.remove("style");
        } else {
            let text = self.style.css_text();
            self.attrs.set("style", &text);
        }
        Some(old)
    }

    pub fn rect(&self) -> Option<DOMRect> {
        self.rect
    }

    pub fn set_rect(&mut self, rect: DOMRect) {
        self.rect = Some(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_attribute_sync() {
        let mut el = ElementData::new("DIV");
        assert_eq!(el.tag_name(), "div");

        el.set_attribute("class", "card hero");
        assert!(el.has_class("hero"));

        el.add_class("kw-animated");
        assert_eq!(el.attribute("class"), Some("card hero kw-animated"));

        el.remove_class("card");
        assert_eq!(el.attribute("class"), Some("hero kw-animated"));
    }

    #[test]
    fn test_style_attribute_sync() {
        let mut el = ElementData::new("div");
        el.set_style_property("opacity", "0");
        assert_eq!(el.attribute("style"), Some("opacity: 0;"));

        el.remove_style_property("opacity");
        assert!(!el.has_attribute("style"));

        el.set_attribute("style", "transform: none");
        assert_eq!(el.style_property("transform"), Some("none"));
    }
}
