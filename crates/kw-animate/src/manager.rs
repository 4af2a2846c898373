//! Animation manager
//!
//! Owns the module registry, scans the document for annotated elements
//! and routes host events to whoever owns them. Content added after
//! startup is picked up by a debounced re-scan driven by a subtree
//! mutation observer.

use crate::config::{Config, ConfigError, ConfigUpdate};
use crate::context::{AnimationContext, SharedContext};
use crate::modules::{AnimationModule, FadeModule, ParallaxModule};
use kw_dom::{MutationRecord, NodeId};
use kw_host::{Host, HostEvent, MutationObserverId, MutationObserverInit, TimerId};
use std::collections::HashMap;
use std::rc::Rc;

/// Delay of the one-shot re-scan after `init`
pub const POST_INIT_RESCAN_MS: f64 = 100.0;

/// Quiet period before mutations trigger a re-scan
pub const RESCAN_DEBOUNCE_MS: f64 = 50.0;

pub struct AnimationManager {
    context: SharedContext,
    /// Mirror of the parser's configuration
    config: Config,
    modules: HashMap<String, Box<dyn AnimationModule>>,
    mutation_observer: Option<MutationObserverId>,
    post_init_timer: Option<TimerId>,
    rescan_timer: Option<TimerId>,
    running: bool,
    scans: u64,
}

impl Default for AnimationManager {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for AnimationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationManager")
            .field("modules", &self.module_names())
            .field("running", &self.running)
            .field("scans", &self.scans)
            .finish_non_exhaustive()
    }
}

impl AnimationManager {
    pub fn new(config: Config) -> Self {
        Self {
            context: AnimationContext::new(config.clone()),
            config,
            modules: HashMap::new(),
            mutation_observer: None,
            post_init_timer: None,
            rescan_timer: None,
            running: false,
            scans: 0,
        }
    }

    /// Manager with the fade-in and parallax modules registered
    pub fn with_builtin_modules(config: Config) -> Self {
        let mut manager = Self::new(config);
        manager.use_module::<FadeModule>(None);
        manager.use_module::<ParallaxModule>(None);
        manager
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Document scans performed so far
    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    /// Instantiate `M` against the shared context and register it under
    /// its default name. Returns the module it displaced, if any.
    pub fn use_module<M: AnimationModule + 'static>(
        &mut self,
        module_config: Option<&serde_json::Value>,
    ) -> Option<Box<dyn AnimationModule>> {
        let mut module = M::new(self.context.clone());
        if let Some(config) = module_config {
            module.configure(config);
        }
        let name = module.default_name().to_string();
        self.register_module(name, Box::new(module))
    }

    /// Register `module` under `name`. A module built against another
    /// context is moved onto this manager's, so it parses with the
    /// manager's configuration.
    pub fn register_module(
        &mut self,
        name: impl Into<String>,
        mut module: Box<dyn AnimationModule>,
    ) -> Option<Box<dyn AnimationModule>> {
        let name = name.into();
        if !Rc::ptr_eq(module.core().context(), &self.context) {
            tracing::warn!("module {:?} was built against another context; adopting the manager's", name);
            module.core_mut().adopt_context(self.context.clone());
        }
        let previous = self.modules.insert(name.clone(), module);
        if previous.is_some() {
            tracing::warn!("replacing animation module {:?}", name);
        } else {
            tracing::debug!("registered animation module {:?}", name);
        }
        previous
    }

    pub fn module(&self, name: &str) -> Option<&dyn AnimationModule> {
        self.modules.get(name).map(|m| m.as_ref())
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut (dyn AnimationModule + 'static)> {
        self.modules.get_mut(name).map(|m| m.as_mut())
    }

    /// Registered names, sorted
    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Scan the document, watch for new content and schedule a follow-up
    /// scan. Calling it again while running is ignored.
    pub fn init(&mut self, host: &mut Host) {
        if self.running {
            tracing::warn!("animation manager already initialized");
            return;
        }
        self.running = true;
        self.context.attach(host);

        if host.prefers_reduced_motion() {
            tracing::info!("reduced motion preferred; animations disabled");
        }
        self.scan(host);

        let observer = host.create_mutation_observer();
        let init = MutationObserverInit {
            child_list: true,
            subtree: true,
        };
        match host.observe_mutations(observer, NodeId::ROOT, init) {
            Ok(()) => self.mutation_observer = Some(observer),
            Err(err) => {
                tracing::warn!("cannot watch document mutations: {}", err);
                host.disconnect_mutation_observer(observer);
            }
        }

        self.post_init_timer = Some(host.set_timeout(POST_INIT_RESCAN_MS));
        tracing::info!("animation manager started with {} modules", self.modules.len());
    }

    /// Re-scan the document for elements not yet registered
    pub fn update(&mut self, host: &mut Host) {
        self.scan(host);
    }

    fn scan(&mut self, host: &mut Host) {
        if host.prefers_reduced_motion() {
            tracing::debug!("reduced motion preferred; skipping scan");
            return;
        }
        self.scans += 1;

        let attribute = self.config.attribute_name().to_string();
        let candidates = host
            .document()
            .tree()
            .elements_with_attribute(NodeId::ROOT, &attribute);

        let mut registered = 0;
        for element in candidates {
            let parsed = self
                .context
                .parser()
                .parse_element_options(host.document().tree(), element);
            let Some(parsed) = parsed else {
                tracing::debug!("{} has no resolvable module", element);
                continue;
            };
            let Some(module) = self.modules.get_mut(&parsed.module) else {
                tracing::debug!("no module named {:?} for {}", parsed.module, element);
                continue;
            };
            if module.is_initialized(host, element) {
                continue;
            }
            module.register(host, &[element]);
            registered += 1;
        }
        tracing::debug!("scan #{} registered {} elements", self.scans, registered);
    }

    fn on_mutations(&mut self, host: &mut Host, records: &[MutationRecord]) {
        let attribute = self.config.attribute_name();
        let tree = host.document().tree();
        let relevant = records
            .iter()
            .flat_map(|r| r.added_nodes.iter())
            .any(|&node| tree.is_connected(node) && tree.subtree_has_attribute(node, attribute));

        if relevant {
            if let Some(timer) = self.rescan_timer.take() {
                host.clear_timeout(timer);
            }
            self.rescan_timer = Some(host.set_timeout(RESCAN_DEBOUNCE_MS));
        }
    }

    /// Apply a partial configuration and tell every module about it
    pub fn update_config(&mut self, update: &ConfigUpdate) -> Result<(), ConfigError> {
        self.context.parser_mut().update_config(update)?;
        self.config = self.context.parser().config().clone();
        for module in self.modules.values_mut() {
            module.config_changed(&self.config);
        }
        Ok(())
    }

    pub fn add_common_attribute(&mut self, suffix: &str, option_name: &str) {
        self.context
            .parser_mut()
            .add_common_attribute(suffix, option_name);
    }

    pub fn add_module_value_mapping(&mut self, module: &str, option_name: &str) {
        self.context
            .parser_mut()
            .add_module_value_mapping(module, option_name);
    }

    /// Tear everything down: timers, observers, listeners and modules
    pub fn destroy(&mut self, host: &mut Host) {
        for timer in [self.post_init_timer.take(), self.rescan_timer.take()]
            .into_iter()
            .flatten()
        {
            host.clear_timeout(timer);
        }
        if let Some(observer) = self.mutation_observer.take() {
            host.disconnect_mutation_observer(observer);
        }
        for module in self.modules.values_mut() {
            module.destroy(host);
        }
        self.modules.clear();
        self.context.teardown(host);
        self.running = false;
        tracing::info!("animation manager destroyed");
    }

    /// Route one host event; returns whether anyone claimed it
    pub fn dispatch(&mut self, host: &mut Host, event: &HostEvent) -> bool {
        match event {
            HostEvent::Timer(id) if self.post_init_timer == Some(*id) => {
                self.post_init_timer = None;
                self.scan(host);
                return true;
            }
            HostEvent::Timer(id) if self.rescan_timer == Some(*id) => {
                self.rescan_timer = None;
                self.scan(host);
                return true;
            }
            HostEvent::Mutation { observer, records } if self.mutation_observer == Some(*observer) => {
                self.on_mutations(host, records);
                return true;
            }
            _ => {}
        }

        if self.context.handle_event(event) {
            return true;
        }
        for module in self.modules.values_mut() {
            if module.handle_event(host, event) {
                return true;
            }
        }
        tracing::trace!("unclaimed event {:?}", event);
        false
    }

    /// Run the host for `ms` milliseconds, dispatching everything that
    /// comes due. Returns the number of events dispatched.
    pub fn advance(&mut self, host: &mut Host, ms: f64) -> usize {
        let deadline = host.now() + ms.max(0.0);
        let mut dispatched = 0;
        while let Some(event) = host.poll_event(deadline) {
            self.dispatch(host, &event);
            dispatched += 1;
        }
        dispatched
    }
}
