//! Fade-in module
//!
//! Elements start at the `from` opacity. On entering view the transition
//! is installed and the target opacity is committed over two animation
//! frames, so the start value is in place before the transition runs.
//! With `repeat`, leaving view fades back and a cleanup timer clears the
//! marker classes once the reverse transition has finished.

use super::{AnimationModule, ModuleCore, handle_intersections, merge_settings};
use crate::context::SharedContext;
use crate::options::ElementOptions;
use kw_dom::NodeId;
use kw_host::{FrameId, Host, HostEvent, IntersectionEntry, TimerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const FADE_IN: &str = "fade-in";

/// Module-wide defaults; element options override them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct FadeSettings {
    /// Milliseconds
    pub duration: f64,
    pub delay: f64,
    pub easing: String,
    pub from: f64,
    pub to: f64,
    pub threshold: Vec<f64>,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            duration: 600.0,
            delay: 0.0,
            easing: "ease".to_string(),
            from: 0.0,
            to: 1.0,
            threshold: vec![0.1],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    CommitStart,
    CommitEnd,
}

/// Effective fade for one element
#[derive(Debug)]
struct Fade {
    from: f64,
    to: f64,
    duration: f64,
    delay: f64,
    easing: String,
    class: Option<String>,
}

impl Fade {
    fn transition(&self) -> String {
        format!("opacity {}ms {} {}ms", self.duration, self.easing, self.delay)
    }
}

#[derive(Debug)]
pub struct FadeModule {
    core: ModuleCore,
    settings: FadeSettings,
    frames: HashMap<FrameId, (NodeId, Stage)>,
    pending_frames: HashMap<NodeId, FrameId>,
    cleanups: HashMap<TimerId, NodeId>,
    pending_cleanups: HashMap<NodeId, TimerId>,
}

impl FadeModule {
    pub fn settings(&self) -> &FadeSettings {
        &self.settings
    }

    fn fade(&self, options: &ElementOptions) -> Fade {
        Fade {
            from: options.number("from").unwrap_or(self.settings.from),
            to: options.number("to").unwrap_or(self.settings.to),
            duration: options.number("duration").unwrap_or(self.settings.duration).max(0.0),
            delay: options.number("delay").unwrap_or(self.settings.delay).max(0.0),
            easing: options
                .str("easing")
                .unwrap_or(&self.settings.easing)
                .to_string(),
            class: options
                .str("class")
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        }
    }

    fn schedule_frame(&mut self, host: &mut Host, element: NodeId, stage: Stage) {
        let id = host.request_animation_frame();
        self.frames.insert(id, (element, stage));
        self.pending_frames.insert(element, id);
    }

    fn cancel_frame(&mut self, host: &mut Host, element: NodeId) {
        if let Some(id) = self.pending_frames.remove(&element) {
            self.frames.remove(&id);
            host.cancel_animation_frame(id);
        }
    }

    fn cancel_cleanup(&mut self, host: &mut Host, element: NodeId) {
        if let Some(timer) = self.pending_cleanups.remove(&element) {
            self.cleanups.remove(&timer);
            host.clear_timeout(timer);
        }
    }

    fn on_frame(&mut self, host: &mut Host, id: FrameId) -> bool {
        let Some((element, stage)) = self.frames.remove(&id) else {
            return false;
        };
        self.pending_frames.remove(&element);
        let Some(options) = self.core.options(element) else {
            return true;
        };
        let fade = self.fade(&options);

        match stage {
            Stage::CommitStart => {
                set_opacity(host, element, fade.from);
                self.schedule_frame(host, element, Stage::CommitEnd);
            }
            Stage::CommitEnd => {
                set_opacity(host, element, fade.to);
                if let (Some(class), Some(el)) =
                    (&fade.class, host.document_mut().tree_mut().element_mut(element))
                {
                    el.add_class(class);
                }
                tracing::trace!("fade-in: {} reached opacity {}", element, fade.to);
            }
        }
        true
    }

    fn on_cleanup(&mut self, host: &mut Host, timer: TimerId) -> bool {
        let Some(element) = self.cleanups.remove(&timer) else {
            return false;
        };
        self.pending_cleanups.remove(&element);

        let class = self
            .core
            .options(element)
            .and_then(|o| o.str("class").map(str::to_string));
        if let Some(el) = host.document_mut().tree_mut().element_mut(element) {
            el.remove_class(self.core.marker_class());
            if let Some(class) = class {
                el.remove_class(&class);
            }
        }
        true
    }
}

fn set_opacity(host: &mut Host, element: NodeId, opacity: f64) {
    if let Some(el) = host.document_mut().tree_mut().element_mut(element) {
        el.set_style_property("opacity", &opacity.to_string());
    }
}

impl AnimationModule for FadeModule {
    fn new(context: SharedContext) -> Self {
        let settings = FadeSettings::default();
        Self {
            core: ModuleCore::new(context, settings.threshold.clone()),
            settings,
            frames: HashMap::new(),
            pending_frames: HashMap::new(),
            cleanups: HashMap::new(),
            pending_cleanups: HashMap::new(),
        }
    }

    fn default_name(&self) -> &str {
        FADE_IN
    }

    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn configure(&mut self, config: &serde_json::Value) {
        match merge_settings(&self.settings, config) {
            Ok(settings) => {
                self.core.set_default_thresholds(settings.threshold.clone());
                self.settings = settings;
            }
            Err(err) => tracing::warn!("fade-in: ignoring configuration: {}", err),
        }
    }

    fn prepare(&mut self, host: &mut Host, element: NodeId, options: &ElementOptions) {
        let from = self.fade(options).from;
        set_opacity(host, element, from);
    }

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
        self.cancel_frame(host, element);
        self.cancel_cleanup(host, element);

        let fade = self.fade(options);
        if let Some(el) = host.document_mut().tree_mut().element_mut(element) {
            el.set_style_property("transition", &fade.transition());
            el.add_class(self.core.marker_class());
        }
        self.core.set_active(element, true);
        self.schedule_frame(host, element, Stage::CommitStart);
    }

    fn reset(&mut self, host: &mut Host, element: NodeId, options: &ElementOptions) {
        if !options.repeat() || !self.core.is_active(element) {
            return;
        }
        self.cancel_frame(host, element);

        let fade = self.fade(options);
        set_opacity(host, element, fade.from);
        self.core.set_active(element, false);

        let timer = host.set_timeout(fade.duration + fade.delay);
        self.cleanups.insert(timer, element);
        self.pending_cleanups.insert(element, timer);
    }

    fn is_initialized(&self, host: &Host, element: NodeId) -> bool {
        self.core.is_observed(element) || self.core.has_marker(host, element)
    }

    fn handle_event(&mut self, host: &mut Host, event: &HostEvent) -> bool {
        match event {
            HostEvent::AnimationFrame { id, .. } => self.on_frame(host, *id),
            HostEvent::Timer(id) => self.on_cleanup(host, *id),
            _ => handle_intersections(self, host, event),
        }
    }

    fn destroy(&mut self, host: &mut Host) {
        for (id, _) in self.frames.drain() {
            host.cancel_animation_frame(id);
        }
        for (timer, _) in self.cleanups.drain() {
            host.clear_timeout(timer);
        }
        self.pending_frames.clear();
        self.pending_cleanups.clear();
        self.core.destroy(host);
    }
}
