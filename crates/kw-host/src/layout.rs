//! Block stacking layout
//!
//! Assigns page-space rects so intersection tests have geometry to work
//! with. Every element is a full-width block stacked below its previous
//! sibling. An element's height is its inline `height: Npx` if present,
//! otherwise the sum of its element children, otherwise `default_height`.

use kw_dom::{DOMRect, Document, DomTree, NodeId};

/// Lay out the body of `doc` at `width`, returning the total page height
pub fn stack_layout(doc: &mut Document, width: f64, default_height: f64) -> f64 {
    let Some(body) = doc.body() else {
        return 0.0;
    };
    let height = layout_block(doc.tree_mut(), body, 0.0, width, default_height);
    tracing::debug!("stack layout: page height {}px", height);
    height
}

fn explicit_height(tree: &DomTree, id: NodeId) -> Option<f64> {
    let value = tree.element(id)?.style_property("height")?;
    value.strip_suffix("px")?.trim().parse().ok()
}

fn layout_block(tree: &mut DomTree, id: NodeId, y: f64, width: f64, default_height: f64) -> f64 {
    let children: Vec<NodeId> = tree
        .children(id)
        .iter()
        .copied()
        .filter(|&c| tree.element(c).is_some())
        .collect();

    let mut cursor = y;
    for child in &children {
        cursor += layout_block(tree, *child, cursor, width, default_height);
    }

    let height = match explicit_height(tree, id) {
        Some(h) => h,
        None if children.is_empty() => default_height,
        None => cursor - y,
    };

    if let Some(element) = tree.element_mut(id) {
        element.set_rect(DOMRect::from_xywh(0.0, y, width, height));
    }
    height
}
