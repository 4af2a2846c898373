//! State shared by every module: the observer, the element roster, cached
//! options and activation state.

use crate::config::Config;
use crate::context::SharedContext;
use crate::options::{ElementOptions, parse_inview};
use kw_dom::NodeId;
use kw_host::{Host, IntersectionEntry, IntersectionObserverId, IntersectionObserverOptions};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

const OFFSET_SIDES: [&str; 4] = ["offsetTop", "offsetRight", "offsetBottom", "offsetLeft"];

#[derive(Debug)]
pub struct ModuleCore {
    context: SharedContext,
    observer: Option<IntersectionObserverId>,
    /// Smallest threshold of the live observer
    trigger_threshold: f64,
    default_thresholds: Vec<f64>,
    default_root_margin: String,
    roster: Vec<NodeId>,
    options: HashMap<NodeId, Rc<ElementOptions>>,
    active: HashSet<NodeId>,
    progress: HashMap<NodeId, f64>,
    marker_class: String,
    progress_property: String,
}

impl ModuleCore {
    pub fn new(context: SharedContext, default_thresholds: Vec<f64>) -> Self {
        let base = context.attribute_name();
        Self {
            context,
            observer: None,
            trigger_threshold: 0.0,
            default_thresholds,
            default_root_margin: "0px".to_string(),
            roster: Vec::new(),
            options: HashMap::new(),
            active: HashSet::new(),
            progress: HashMap::new(),
            marker_class: format!("{base}-animated"),
            progress_property: format!("--{base}-progress"),
        }
    }

    /// Margin used when an element sets no offsets
    pub fn with_root_margin(mut self, root_margin: &str) -> Self {
        self.default_root_margin = root_margin.to_string();
        self
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Move onto another context and follow its configuration
    pub(crate) fn adopt_context(&mut self, context: SharedContext) {
        let config = context.parser().config().clone();
        self.config_changed(&config);
        self.context = context;
    }

    pub fn observer(&self) -> Option<IntersectionObserverId> {
        self.observer
    }

    pub fn trigger_threshold(&self) -> f64 {
        self.trigger_threshold
    }

    pub fn default_thresholds(&self) -> &[f64] {
        &self.default_thresholds
    }

    /// Applies to observers created after the call
    pub fn set_default_thresholds(&mut self, thresholds: Vec<f64>) {
        self.default_thresholds = thresholds;
    }

    /// Elements under observation, in registration order
    pub fn roster(&self) -> &[NodeId] {
        &self.roster
    }

    pub fn is_observed(&self, element: NodeId) -> bool {
        self.roster.contains(&element)
    }

    pub fn options(&self, element: NodeId) -> Option<Rc<ElementOptions>> {
        self.options.get(&element).cloned()
    }

    pub fn is_active(&self, element: NodeId) -> bool {
        self.active.contains(&element)
    }

    pub fn set_active(&mut self, element: NodeId, active: bool) {
        if active {
            self.active.insert(element);
        } else {
            self.active.remove(&element);
        }
    }

    /// Last reported visibility ratio
    pub fn progress(&self, element: NodeId) -> Option<f64> {
        self.progress.get(&element).copied()
    }

    /// Class marking an element whose effect has been applied
    pub fn marker_class(&self) -> &str {
        &self.marker_class
    }

    pub fn has_marker(&self, host: &Host, element: NodeId) -> bool {
        host.document()
            .tree()
            .element(element)
            .is_some_and(|e| e.has_class(&self.marker_class))
    }

    pub fn config_changed(&mut self, config: &Config) {
        let base = config.attribute_name();
        self.marker_class = format!("{base}-animated");
        self.progress_property = format!("--{base}-progress");
    }

    /// Observer geometry derived from one element's options
    pub fn observer_options(&self, options: &ElementOptions) -> IntersectionObserverOptions {
        let root_margin = if OFFSET_SIDES.iter().any(|side| options.contains(side)) {
            OFFSET_SIDES
                .iter()
                .map(|side| options.get(side).map_or_else(|| "0px".to_string(), |v| v.to_css_length()))
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            self.default_root_margin.clone()
        };

        let threshold = match options.get("inview").and_then(parse_inview) {
            Some(t) => vec![t],
            None => self.default_thresholds.clone(),
        };

        IntersectionObserverOptions {
            root_margin,
            threshold,
        }
    }

    pub(crate) fn cache_options(&mut self, element: NodeId, options: ElementOptions) -> Rc<ElementOptions> {
        let options = Rc::new(options);
        self.options.insert(element, Rc::clone(&options));
        options
    }

    /// Start observing `element`. The first element observed fixes the
    /// observer geometry for the module's lifetime.
    pub(crate) fn observe(&mut self, host: &mut Host, element: NodeId, options: &ElementOptions) {
        let observer = match self.observer {
            Some(id) => id,
            None => match self.create_observer(host, options) {
                Some(id) => id,
                None => return,
            },
        };

        match host.observe_intersection(observer, element) {
            Ok(()) => {
                if !self.roster.contains(&element) {
                    self.roster.push(element);
                }
            }
            Err(err) => tracing::warn!("cannot observe {}: {}", element, err),
        }
    }

    fn create_observer(&mut self, host: &mut Host, options: &ElementOptions) -> Option<IntersectionObserverId> {
        let requested = self.observer_options(options);
        let id = match host.create_intersection_observer(&requested) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!("{}; using default observer geometry", err);
                let fallback = IntersectionObserverOptions {
                    root_margin: self.default_root_margin.clone(),
                    threshold: self.default_thresholds.clone(),
                };
                match host.create_intersection_observer(&fallback) {
                    Ok(id) => id,
                    Err(err) => {
                        tracing::warn!("cannot create intersection observer: {}", err);
                        return None;
                    }
                }
            }
        };

        self.trigger_threshold = host
            .intersection_observer(id)
            .and_then(|o| o.thresholds().first().copied())
            .unwrap_or(0.0);
        self.observer = Some(id);
        tracing::debug!(
            "created intersection observer {:?} (margin {:?}, trigger {})",
            id,
            requested.root_margin,
            self.trigger_threshold
        );
        Some(id)
    }

    /// Record an entry's ratio and mirror it as a custom property
    pub(crate) fn record_progress(&mut self, host: &mut Host, entry: &IntersectionEntry) {
        let ratio = entry.intersection_ratio;
        self.progress.insert(entry.target, ratio);
        if let Some(element) = host.document_mut().tree_mut().element_mut(entry.target) {
            element.set_style_property(&self.progress_property, &format!("{ratio:.3}"));
        }
    }

    /// Disconnect the observer and forget every element
    pub fn destroy(&mut self, host: &mut Host) {
        if let Some(observer) = self.observer.take() {
            host.disconnect_intersection_observer(observer);
        }
        self.roster.clear();
        self.options.clear();
        self.active.clear();
        self.progress.clear();
    }
}
