//! kw HTML
//!
//! Markup ingestion built on html5ever. Turns an HTML string into a
//! `kw_dom::Document`, or appends a parsed fragment under an existing node
//! so dynamically inserted content flows through the tree's mutation queue.

mod parser;

pub use parser::HtmlParser;

/// Parse an HTML string into a Document
pub fn parse(html: &str) -> Result<kw_dom::Document, HtmlError> {
    HtmlParser::new().parse(html)
}

/// Markup ingestion errors
#[derive(Debug, thiserror::Error)]
pub enum HtmlError {
    #[error("failed to read markup: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Dom(#[from] kw_dom::DomError),
}
