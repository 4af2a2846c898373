//! Animation modules
//!
//! A module owns one intersection observer and the elements registered
//! with it. Shared behaviour (option caching, observer setup, entry
//! dispatch) lives in [`ModuleCore`] and the free functions below; a
//! concrete module supplies its name plus `animate` and `reset`.

mod fade;
mod parallax;
mod shared;

pub use fade::{FADE_IN, FadeModule, FadeSettings};
pub use parallax::{
    Direction, PARALLAX, ParallaxModule, ParallaxSettings, parallax_offset, scroll_progress,
};
pub use shared::ModuleCore;

use crate::config::Config;
use crate::context::SharedContext;
use crate::options::ElementOptions;
use kw_dom::NodeId;
use kw_host::{Host, HostEvent, IntersectionEntry};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Animation module capability
pub trait AnimationModule {
    fn new(context: SharedContext) -> Self
    where
        Self: Sized;

    /// Name the manager registers the module under
    fn default_name(&self) -> &str;

    fn core(&self) -> &ModuleCore;
    fn core_mut(&mut self) -> &mut ModuleCore;

    /// Apply a module configuration object
    fn configure(&mut self, config: &serde_json::Value) {
        tracing::debug!("{} takes no configuration; ignoring {}", self.default_name(), config);
    }

    /// Initial visual state, applied before observation starts
    fn prepare(&mut self, host: &mut Host, element: NodeId, options: &ElementOptions) {
        let _ = (host, element, options);
    }

    /// Parse, cache and observe each element
    fn register(&mut self, host: &mut Host, elements: &[NodeId]) {
        register_elements(self, host, elements);
    }

    /// Apply the effect; must be a no-op while already active
    fn animate(
        &mut self,
        host: &mut Host,
        element: NodeId,
        entry: &IntersectionEntry,
        options: &ElementOptions,
    );

    /// Reverse the effect when the element repeats
    fn reset(&mut self, host: &mut Host, element: NodeId, options: &ElementOptions);

    fn is_initialized(&self, host: &Host, element: NodeId) -> bool {
        self.core().has_marker(host, element)
    }

    /// Claim an event this module owns
    fn handle_event(&mut self, host: &mut Host, event: &HostEvent) -> bool {
        handle_intersections(self, host, event)
    }

    /// Last reported visibility ratio for `element`
    fn progress(&self, element: NodeId) -> Option<f64> {
        self.core().progress(element)
    }

    fn config_changed(&mut self, config: &Config) {
        self.core_mut().config_changed(config);
    }

    fn destroy(&mut self, host: &mut Host) {
        self.core_mut().destroy(host);
    }
}

/// Default registration: skip elements without the primary attribute,
/// cache their options, prepare them and start observing.
pub fn register_elements<M: AnimationModule + ?Sized>(
    module: &mut M,
    host: &mut Host,
    elements: &[NodeId],
) {
    if elements.is_empty() {
        tracing::warn!("{}: register called without elements", module.default_name());
        return;
    }
    module.core().context().attach(host);

    for &element in elements {
        let parsed = {
            let parser = module.core().context().parser();
            let tree = host.document().tree();
            if parser.has_animation_attributes(tree, element) {
                parser.parse_element_options(tree, element)
            } else {
                None
            }
        };
        let Some(parsed) = parsed else {
            tracing::debug!("{}: skipping {} without animation attributes", module.default_name(), element);
            continue;
        };

        let options = module.core_mut().cache_options(element, parsed.options);
        module.prepare(host, element, &options);
        module.core_mut().observe(host, element, &options);
        tracing::debug!("{}: registered {}", module.default_name(), element);
    }
}

/// Route intersection entries to `animate` or `reset`
pub fn dispatch_intersections<M: AnimationModule + ?Sized>(
    module: &mut M,
    host: &mut Host,
    entries: &[IntersectionEntry],
) {
    for entry in entries {
        let element = entry.target;
        let Some(options) = module.core().options(element) else {
            continue;
        };
        module.core_mut().record_progress(host, entry);

        if entry.is_intersecting {
            if entry.intersection_ratio >= module.core().trigger_threshold() {
                module.animate(host, element, entry, &options);
            }
        } else {
            module.reset(host, element, &options);
        }
    }
}

/// Claim intersection events from the module's own observer
pub fn handle_intersections<M: AnimationModule + ?Sized>(
    module: &mut M,
    host: &mut Host,
    event: &HostEvent,
) -> bool {
    match event {
        HostEvent::Intersection { observer, entries }
            if module.core().observer() == Some(*observer) =>
        {
            dispatch_intersections(module, host, entries);
            true
        }
        _ => false,
    }
}

/// Overlay the keys of a configuration object on `current`. Keys the
/// object leaves out keep their current value.
pub(crate) fn merge_settings<T>(current: &T, patch: &serde_json::Value) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = serde_json::to_value(current)?;
    match (&mut merged, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                base.insert(key.clone(), value.clone());
            }
            serde_json::from_value(merged)
        }
        _ => serde_json::from_value(patch.clone()),
    }
}
