//! Viewport
//!
//! Scroll position and visible size of the window.

use kw_dom::DOMRect;

/// Window viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width,
            height,
        }
    }

    /// Viewport-space root rect (origin at the top-left of the window)
    #[inline]
    pub fn client_rect(&self) -> DOMRect {
        DOMRect::from_xywh(0.0, 0.0, self.width, self.height)
    }

    /// Convert a page-space rect to viewport space
    #[inline]
    pub fn to_client(&self, page_rect: DOMRect) -> DOMRect {
        page_rect.translate(-self.scroll_x, -self.scroll_y)
    }
}
