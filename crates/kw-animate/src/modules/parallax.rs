//! Scroll-linked parallax
//!
//! The observer only decides which elements are near the viewport; the
//! offset itself is driven by scrolling. Scroll events collapse into at
//! most one recompute per animation frame.

use super::{AnimationModule, ModuleCore, handle_intersections, merge_settings};
use crate::context::SharedContext;
use crate::options::ElementOptions;
use kw_dom::NodeId;
use kw_host::{FrameId, Host, HostEvent, IntersectionEntry, ListenerId};
use serde::{Deserialize, Serialize};

pub const PARALLAX: &str = "parallax";

const ROOT_MARGIN: &str = "200px 0px 200px 0px";
const THRESHOLDS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Travel direction as the page scrolls down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    /// `(x, y)` translation for a travel distance
    pub fn offset(self, distance: f64) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -distance),
            Direction::Down => (0.0, distance),
            Direction::Left => (-distance, 0.0),
            Direction::Right => (distance, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParallaxSettings {
    /// Fraction of the viewport height travelled over the full range
    pub speed: f64,
    pub direction: Direction,
}

impl Default for ParallaxSettings {
    fn default() -> Self {
        Self {
            speed: 0.5,
            direction: Direction::Up,
        }
    }
}

/// How far an element has travelled through the viewport: 0 when its top
/// edge meets the viewport bottom, 1 when its bottom edge leaves the top.
pub fn scroll_progress(top: f64, height: f64, viewport_height: f64) -> f64 {
    let span = viewport_height + height;
    if span <= 0.0 {
        return 0.0;
    }
    ((viewport_height - top) / span).clamp(0.0, 1.0)
}

/// Translation for `progress`, remapped into the `start..=end` window
pub fn parallax_offset(
    progress: f64,
    speed: f64,
    direction: Direction,
    start: f64,
    end: f64,
    range: f64,
) -> (f64, f64) {
    let window = end - start;
    let local = if window > 0.0 {
        ((progress - start) / window).clamp(0.0, 1.0)
    } else if progress >= end {
        1.0
    } else {
        0.0
    };
    let (x, y) = direction.offset(local * speed * range);
    // avoid "-0px"
    (x + 0.0, y + 0.0)
}

#[derive(Debug)]
pub struct ParallaxModule {
    core: ModuleCore,
    settings: ParallaxSettings,
    scroll_listener: Option<ListenerId>,
    pending_frame: Option<FrameId>,
    recomputes: u64,
}

impl ParallaxModule {
    pub fn settings(&self) -> &ParallaxSettings {
        &self.settings
    }

    /// Completed recompute passes
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    fn in_range(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.core
            .roster()
            .iter()
            .copied()
            .filter(|&el| self.core.is_active(el))
    }

    fn schedule_update(&mut self, host: &mut Host) {
        if let Some(frame) = self.pending_frame.take() {
            host.cancel_animation_frame(frame);
        }
        self.pending_frame = Some(host.request_animation_frame());
    }

    fn update_all(&mut self, host: &mut Host) {
        self.recomputes += 1;
        let elements: Vec<NodeId> = self.in_range().collect();
        for element in elements {
            if let Some(options) = self.core.options(element) {
                self.update_element(host, element, &options);
            }
        }
    }

    fn update_element(&self, host: &mut Host, element: NodeId, options: &ElementOptions) {
        let Some(rect) = host.bounding_client_rect(element) else {
            return;
        };
        let viewport_height = self.core.context().viewport().height;
        let speed = options.number("speed").unwrap_or(self.settings.speed);
        let direction = options
            .str("direction")
            .and_then(Direction::parse)
            .unwrap_or(self.settings.direction);
        let start = options.number("start").unwrap_or(0.0);
        let end = options.number("end").unwrap_or(1.0);

        let progress = scroll_progress(rect.top(), rect.height, viewport_height);
        let (x, y) = parallax_offset(progress, speed, direction, start, end, viewport_height);

        if let Some(el) = host.document_mut().tree_mut().element_mut(element) {
            el.set_style_property("transform", &format!("translate3d({x:.2}px, {y:.2}px, 0px)"));
        }
    }
}

impl AnimationModule for ParallaxModule {
    fn new(context: SharedContext) -> Self {
        Self {
            core: ModuleCore::new(context, THRESHOLDS.to_vec()).with_root_margin(ROOT_MARGIN),
            settings: ParallaxSettings::default(),
            scroll_listener: None,
            pending_frame: None,
            recomputes: 0,
        }
    }

    fn default_name(&self) -> &str {
        PARALLAX
    }

    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn configure(&mut self, config: &serde_json::Value) {
        match merge_settings(&self.settings, config) {
            Ok(settings) => self.settings = settings,
            Err(err) => tracing::warn!("parallax: ignoring configuration: {}", err),
        }
    }

    fn prepare(&mut self, host: &mut Host, _element: NodeId, _options: &ElementOptions) {
        if self.scroll_listener.is_none() {
            self.scroll_listener = Some(host.add_scroll_listener());
        }
    }

    /// Bring the element into the scroll-driven set. Being "active" here
    /// means in range, so re-entering resumes updates.
    fn animate(
        &mut self,
        host: &mut Host,
        element: NodeId,
        _entry: &IntersectionEntry,
        options: &ElementOptions,
    ) {
        if self.core.is_active(element) {
            return;
        }
        self.core.set_active(element, true);
        if let Some(el) = host.document_mut().tree_mut().element_mut(element) {
            el.add_class(self.core.marker_class());
        }
        self.update_element(host, element, options);
    }

    /// Leaving range stops updates; with `repeat` the transform is cleared
    fn reset(&mut self, host: &mut Host, element: NodeId, options: &ElementOptions) {
        if !self.core.is_active(element) {
            return;
        }
        self.core.set_active(element, false);
        if options.repeat() {
            if let Some(el) = host.document_mut().tree_mut().element_mut(element) {
                el.remove_style_property("transform");
            }
        }
    }

    fn is_initialized(&self, host: &Host, element: NodeId) -> bool {
        self.core.is_observed(element) || self.core.has_marker(host, element)
    }

    fn handle_event(&mut self, host: &mut Host, event: &HostEvent) -> bool {
        match event {
            HostEvent::Scroll { listener, .. } if self.scroll_listener == Some(*listener) => {
                self.schedule_update(host);
                true
            }
            HostEvent::AnimationFrame { id, .. } if self.pending_frame == Some(*id) => {
                self.pending_frame = None;
                self.update_all(host);
                true
            }
            _ => handle_intersections(self, host, event),
        }
    }

    fn destroy(&mut self, host: &mut Host) {
        if let Some(listener) = self.scroll_listener.take() {
            host.remove_scroll_listener(listener);
        }
        if let Some(frame) = self.pending_frame.take() {
            host.cancel_animation_frame(frame);
        }
        self.core.destroy(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::AnimationContext;
    use kw_dom::{DOMRect, Document};
    use kw_host::Viewport;

    #[test]
    fn test_scroll_progress() {
        assert_eq!(scroll_progress(600.0, 200.0, 600.0), 0.0);
        assert_eq!(scroll_progress(-200.0, 200.0, 600.0), 1.0);
        assert_eq!(scroll_progress(200.0, 200.0, 600.0), 0.5);
        assert_eq!(scroll_progress(5000.0, 200.0, 600.0), 0.0);
    }

    #[test]
    fn test_parallax_offset_directions() {
        assert_eq!(parallax_offset(1.0, 0.5, Direction::Up, 0.0, 1.0, 600.0), (0.0, -300.0));
        assert_eq!(parallax_offset(1.0, 0.5, Direction::Down, 0.0, 1.0, 600.0), (0.0, 300.0));
        assert_eq!(parallax_offset(0.5, 1.0, Direction::Left, 0.0, 1.0, 100.0), (-50.0, 0.0));
        assert_eq!(parallax_offset(0.5, 1.0, Direction::Right, 0.0, 1.0, 100.0), (50.0, 0.0));
        assert_eq!(parallax_offset(0.0, 0.5, Direction::Up, 0.0, 1.0, 600.0), (0.0, 0.0));
    }

    #[test]
    fn test_parallax_offset_window() {
        assert_eq!(parallax_offset(0.2, 1.0, Direction::Down, 0.25, 0.75, 100.0), (0.0, 0.0));
        assert_eq!(parallax_offset(0.5, 1.0, Direction::Down, 0.25, 0.75, 100.0), (0.0, 50.0));
        assert_eq!(parallax_offset(0.9, 1.0, Direction::Down, 0.25, 0.75, 100.0), (0.0, 100.0));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("Left"), Some(Direction::Left));
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn test_configure_merges() {
        let mut module = ParallaxModule::new(AnimationContext::new(Config::default()));
        module.configure(&serde_json::json!({"direction": "left"}));
        module.configure(&serde_json::json!({"speed": 0.2}));
        assert_eq!(
            module.settings(),
            &ParallaxSettings {
                speed: 0.2,
                direction: Direction::Left,
            }
        );

        module.configure(&serde_json::json!({"direction": "sideways"}));
        assert_eq!(module.settings().direction, Direction::Left);
    }

    fn setup() -> (Host, ParallaxModule, NodeId) {
        let mut doc = Document::default();
        let body = doc.body().unwrap();
        let tree = doc.tree_mut();
        let el = tree.create_element("div");
        {
            let data = tree.element_mut(el).unwrap();
            data.set_attribute("kw", "parallax");
            data.set_rect(DOMRect::from_xywh(0.0, 700.0, 800.0, 200.0));
        }
        tree.append_child(body, el).unwrap();

        let host = Host::new(doc, Viewport::new(800.0, 600.0));
        let module = ParallaxModule::new(AnimationContext::new(Config::default()));
        (host, module, el)
    }

    fn pump(host: &mut Host, module: &mut ParallaxModule, ms: f64) {
        let deadline = host.now() + ms;
        while let Some(event) = host.poll_event(deadline) {
            module.handle_event(host, &event);
        }
    }

    fn transform(host: &Host, el: NodeId) -> Option<String> {
        host.document()
            .tree()
            .element(el)
            .and_then(|e| e.style_property("transform"))
            .map(str::to_string)
    }

    #[test]
    fn test_scroll_events_coalesce() {
        let (mut host, mut module, el) = setup();
        module.register(&mut host, &[el]);
        assert_eq!(host.scroll_listener_count(), 1);
        pump(&mut host, &mut module, 20.0);

        for y in 1..=10 {
            host.scroll_to(0.0, f64::from(y) * 10.0);
        }
        pump(&mut host, &mut module, 20.0);
        assert_eq!(module.recompute_count(), 1);
    }

    #[test]
    fn test_up_moves_negative_and_grows() {
        let (mut host, mut module, el) = setup();
        module.register(&mut host, &[el]);
        pump(&mut host, &mut module, 20.0);
        assert_eq!(
            transform(&host, el).as_deref(),
            Some("translate3d(0.00px, 0.00px, 0px)")
        );

        let mut last = 0.0;
        for step in 2..=6 {
            host.scroll_to(0.0, f64::from(step) * 100.0);
            pump(&mut host, &mut module, 20.0);
            let el_ref = host.document().tree().element(el).unwrap();
            let value = el_ref.style_property("transform").unwrap();
            let y: f64 = value
                .trim_start_matches("translate3d(0.00px, ")
                .trim_end_matches("px, 0px)")
                .parse()
                .unwrap();
            assert!(y < last, "step {step}: {y} should be below {last}");
            last = y;
        }
    }

    #[test]
    fn test_leaving_range_with_repeat_clears_transform() {
        let (mut host, mut module, el) = setup();
        host.document_mut()
            .tree_mut()
            .element_mut(el)
            .unwrap()
            .set_attribute("kw-repeat", "");
        module.register(&mut host, &[el]);

        host.scroll_to(0.0, 300.0);
        pump(&mut host, &mut module, 40.0);
        assert!(transform(&host, el).is_some());

        host.scroll_to(0.0, 2000.0);
        pump(&mut host, &mut module, 40.0);
        assert!(transform(&host, el).is_none());
        assert!(!module.core().is_active(el));
    }

    #[test]
    fn test_destroy_removes_listener() {
        let (mut host, mut module, el) = setup();
        module.register(&mut host, &[el]);
        module.destroy(&mut host);
        assert_eq!(host.scroll_listener_count(), 0);
        assert!(module.core().roster().is_empty());
    }
}
