//! End-to-end manager tests
//!
//! Pages are parsed from markup, laid out as stacked blocks in an
//! 800x600 viewport and driven through the host's virtual clock.

use kw_animate::modules::ModuleCore;
use kw_animate::{
    AnimationContext, AnimationManager, AnimationModule, Config, ConfigError, ConfigUpdate,
    ElementOptions, FadeModule, ParallaxModule, SharedContext,
};
use kw_dom::NodeId;
use kw_host::layout::stack_layout;
use kw_host::{Host, IntersectionEntry, Viewport};
use kw_html::HtmlParser;
use serde_json::json;
use std::rc::Rc;

fn page(body: &str) -> Host {
    let html = format!("<!DOCTYPE html><html><body>{body}</body></html>");
    let mut doc = kw_html::parse(&html).unwrap();
    stack_layout(&mut doc, 800.0, 100.0);
    Host::new(doc, Viewport::new(800.0, 600.0))
}

fn by_id(host: &Host, id: &str) -> NodeId {
    host.document().get_element_by_id(id).unwrap()
}

fn style(host: &Host, el: NodeId, property: &str) -> Option<String> {
    host.document()
        .tree()
        .element(el)
        .and_then(|e| e.style_property(property))
        .map(str::to_string)
}

fn has_class(host: &Host, el: NodeId, class: &str) -> bool {
    host.document().tree().element(el).unwrap().has_class(class)
}

fn roster_len(manager: &AnimationManager, module: &str) -> usize {
    manager.module(module).unwrap().core().roster().len()
}

const LONG_PAGE: &str = r#"
    <section style="height: 700px"></section>
    <div id="fade" kw="fade-in" kw-duration="1000" kw-from="0" kw-to="1" kw-class="shown" style="height: 200px"></div>
    <div id="plx" kw="parallax" kw-speed="0.5" kw-direction="up" style="height: 200px"></div>
    <section style="height: 2000px"></section>
"#;

#[test]
fn test_fade_in_end_to_end() {
    let mut host = page(LONG_PAGE);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    manager.advance(&mut host, 50.0);

    let fade = by_id(&host, "fade");
    assert_eq!(style(&host, fade, "opacity").as_deref(), Some("0"));
    assert!(!has_class(&host, fade, "kw-animated"));

    host.scroll_to(0.0, 400.0);
    manager.advance(&mut host, 100.0);

    assert_eq!(style(&host, fade, "opacity").as_deref(), Some("1"));
    assert_eq!(
        style(&host, fade, "transition").as_deref(),
        Some("opacity 1000ms ease 0ms")
    );
    assert!(has_class(&host, fade, "kw-animated"));

    host.scroll_to(0.0, 420.0);
    manager.advance(&mut host, 100.0);
    let classes = host.document().tree().element(fade).unwrap().class_list().value();
    assert_eq!(classes.split_whitespace().filter(|c| *c == "shown").count(), 1);
}

#[test]
fn test_module_scoped_option_wins() {
    let mut host = page(
        r#"<div id="a" kw="fade-in" kw-duration="500" kw-fade-in-duration="900" style="height: 200px"></div>"#,
    );
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    manager.advance(&mut host, 20.0);

    let a = by_id(&host, "a");
    assert_eq!(
        style(&host, a, "transition").as_deref(),
        Some("opacity 900ms ease 0ms")
    );
}

#[test]
fn test_rescan_does_not_reregister() {
    let mut host = page(LONG_PAGE);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    manager.update(&mut host);
    manager.advance(&mut host, 200.0);
    manager.update(&mut host);

    assert_eq!(manager.scan_count(), 4);
    assert_eq!(roster_len(&manager, "fade-in"), 1);
    assert_eq!(roster_len(&manager, "parallax"), 1);
}

#[test]
fn test_repeat_through_manager() {
    let mut host = page(
        r#"
        <section style="height: 700px"></section>
        <div id="once" kw="fade-in" style="height: 100px"></div>
        <div id="again" kw="fade-in" kw-repeat style="height: 100px"></div>
        <section style="height: 2000px"></section>
    "#,
    );
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);

    host.scroll_to(0.0, 500.0);
    manager.advance(&mut host, 100.0);
    host.scroll_to(0.0, 0.0);
    manager.advance(&mut host, 1000.0);

    let once = by_id(&host, "once");
    let again = by_id(&host, "again");
    assert_eq!(style(&host, once, "opacity").as_deref(), Some("1"));
    assert!(has_class(&host, once, "kw-animated"));
    assert_eq!(style(&host, again, "opacity").as_deref(), Some("0"));
    assert!(!has_class(&host, again, "kw-animated"));
}

#[test]
fn test_parallax_end_to_end() {
    let mut host = page(LONG_PAGE);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    manager.advance(&mut host, 20.0);

    let plx = by_id(&host, "plx");
    assert_eq!(style(&host, plx, "transform"), None);

    host.scroll_to(0.0, 300.0);
    manager.advance(&mut host, 20.0);
    assert_eq!(
        style(&host, plx, "transform").as_deref(),
        Some("translate3d(0.00px, 0.00px, 0px)")
    );

    let mut last = 0.0;
    for scroll in [400.0, 500.0, 600.0, 700.0] {
        host.scroll_to(0.0, scroll);
        manager.advance(&mut host, 20.0);
        let transform = style(&host, plx, "transform").unwrap();
        let y: f64 = transform
            .trim_start_matches("translate3d(0.00px, ")
            .trim_end_matches("px, 0px)")
            .parse()
            .unwrap();
        assert!(y < last, "at {scroll}: {y} not below {last}");
        last = y;
    }
}

#[test]
fn test_mutations_coalesce_into_one_rescan() {
    let mut host = page(r#"<div id="a" kw="fade-in"></div>"#);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    manager.advance(&mut host, 200.0);
    assert_eq!(manager.scan_count(), 2);

    let body = host.document().body().unwrap();
    let parser = HtmlParser::new();
    for _ in 0..3 {
        parser
            .parse_fragment(
                r#"<section><div kw="fade-in"></div></section>"#,
                host.document_mut().tree_mut(),
                body,
            )
            .unwrap();
        manager.advance(&mut host, 10.0);
    }
    manager.advance(&mut host, 100.0);

    assert_eq!(manager.scan_count(), 3);
    assert_eq!(roster_len(&manager, "fade-in"), 4);
}

#[test]
fn test_inserted_element_animates_after_layout_and_scroll() {
    let mut host = page(r#"<section style="height: 700px"></section>"#);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    manager.advance(&mut host, 200.0);

    let body = host.document().body().unwrap();
    HtmlParser::new()
        .parse_fragment(
            r#"<div id="late" kw="fade-in" kw-class="shown" style="height: 200px"></div>"#,
            host.document_mut().tree_mut(),
            body,
        )
        .unwrap();
    stack_layout(host.document_mut(), 800.0, 100.0);
    manager.advance(&mut host, 100.0);

    let late = by_id(&host, "late");
    assert_eq!(roster_len(&manager, "fade-in"), 1);
    assert_eq!(style(&host, late, "opacity").as_deref(), Some("0"));
    assert!(!has_class(&host, late, "shown"));

    host.scroll_to(0.0, 400.0);
    manager.advance(&mut host, 100.0);

    assert_eq!(style(&host, late, "opacity").as_deref(), Some("1"));
    assert!(has_class(&host, late, "shown"));
    assert!(has_class(&host, late, "kw-animated"));
}

#[test]
fn test_unannotated_insertions_are_ignored() {
    let mut host = page(r#"<div id="a" kw="fade-in"></div>"#);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    manager.advance(&mut host, 200.0);

    let body = host.document().body().unwrap();
    HtmlParser::new()
        .parse_fragment("<p>plain</p>", host.document_mut().tree_mut(), body)
        .unwrap();
    manager.advance(&mut host, 200.0);

    assert_eq!(manager.scan_count(), 2);
}

#[test]
fn test_reduced_motion_skips_scan() {
    let mut host = page(r#"<div id="a" kw="fade-in"></div>"#);
    host.set_prefers_reduced_motion(true);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    manager.advance(&mut host, 200.0);

    assert!(manager.is_running());
    assert_eq!(manager.scan_count(), 0);
    assert_eq!(roster_len(&manager, "fade-in"), 0);
    assert_eq!(host.mutation_observer_count(), 1);

    host.set_prefers_reduced_motion(false);
    manager.update(&mut host);
    assert_eq!(roster_len(&manager, "fade-in"), 1);
}

#[test]
fn test_unknown_module_and_default_animation() {
    let mut host = page(r#"<div id="spin" kw="spin"></div><div id="bare" kw></div>"#);
    let config = Config::try_from(ConfigUpdate::new().default_animation("fade-in")).unwrap();
    let mut manager = AnimationManager::with_builtin_modules(config);
    manager.init(&mut host);

    let fade = manager.module("fade-in").unwrap();
    assert_eq!(fade.core().roster(), &[by_id(&host, "bare")]);
    assert!(!fade.is_initialized(&host, by_id(&host, "spin")));
}

#[test]
fn test_second_init_is_ignored() {
    let mut host = page(r#"<div kw="fade-in"></div>"#);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    manager.init(&mut host);

    assert_eq!(manager.scan_count(), 1);
    assert_eq!(host.mutation_observer_count(), 1);
    assert_eq!(host.resize_listener_count(), 1);
}

#[test]
fn test_destroy_releases_host_resources() {
    let mut host = page(LONG_PAGE);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    host.scroll_to(0.0, 400.0);
    manager.advance(&mut host, 50.0);

    manager.destroy(&mut host);
    assert!(!manager.is_running());
    assert!(manager.module_names().is_empty());
    assert_eq!(host.mutation_observer_count(), 0);
    assert_eq!(host.scroll_listener_count(), 0);
    assert_eq!(host.resize_listener_count(), 0);
    assert_eq!(host.event_loop().pending_timers(), 0);

    manager.advance(&mut host, 500.0);
}

#[test]
fn test_resize_refreshes_viewport_cache() {
    let mut host = page(LONG_PAGE);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    manager.init(&mut host);
    assert_eq!(manager.context().viewport().height, 600.0);

    host.resize(1024.0, 900.0);
    manager.advance(&mut host, 1.0);
    assert_eq!(manager.context().viewport().height, 900.0);
    assert_eq!(manager.context().viewport().width, 1024.0);
}

#[test]
fn test_update_config() {
    let mut host = page(r#"<div id="a" anim="fade-in" style="height: 100px"></div>"#);
    let mut manager = AnimationManager::with_builtin_modules(Config::default());

    let err = manager
        .update_config(&ConfigUpdate::new().attribute_name("not valid"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidAttributeName(_)));
    assert_eq!(manager.config().attribute_name(), "kw");

    manager
        .update_config(&ConfigUpdate::new().attribute_name("anim"))
        .unwrap();
    manager.init(&mut host);
    manager.advance(&mut host, 50.0);

    let a = by_id(&host, "a");
    assert_eq!(roster_len(&manager, "fade-in"), 1);
    assert!(has_class(&host, a, "anim-animated"));
    assert!(style(&host, a, "--anim-progress").is_some());
}

#[test]
fn test_use_module_returns_displaced_instance() {
    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    assert_eq!(manager.module_names(), ["fade-in", "parallax"]);

    let displaced = manager.use_module::<FadeModule>(Some(&json!({"duration": 300})));
    assert!(displaced.is_some());
    assert!(manager.use_module::<ParallaxModule>(None).is_some());
    assert_eq!(manager.module_names().len(), 2);
}

#[test]
fn test_registered_module_follows_manager_config() {
    let mut host = page(r#"<div id="a" anim="fade-in" style="height: 100px"></div>"#);
    let mut manager = AnimationManager::new(Config::default());
    let detached = FadeModule::new(AnimationContext::new(Config::default()));
    manager.register_module("fade-in", Box::new(detached));

    let module = manager.module("fade-in").unwrap();
    assert!(Rc::ptr_eq(module.core().context(), manager.context()));

    manager
        .update_config(&ConfigUpdate::new().attribute_name("anim"))
        .unwrap();
    manager.init(&mut host);
    manager.advance(&mut host, 100.0);

    let a = by_id(&host, "a");
    assert_eq!(roster_len(&manager, "fade-in"), 1);
    assert!(has_class(&host, a, "anim-animated"));
}

/// Minimal third-party module relying on the trait defaults
struct PulseModule {
    core: ModuleCore,
}

impl AnimationModule for PulseModule {
    fn new(context: SharedContext) -> Self {
        Self {
            core: ModuleCore::new(context, vec![0.0]),
        }
    }

    fn default_name(&self) -> &str {
        "pulse"
    }

    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn animate(&mut self, host: &mut Host, element: NodeId, _: &IntersectionEntry, options: &ElementOptions) {
        if self.core.is_active(element) {
            return;
        }
        self.core.set_active(element, true);
        let rate = options.number("rate").unwrap_or(1.0);
        if let Some(el) = host.document_mut().tree_mut().element_mut(element) {
            el.add_class(self.core.marker_class());
            el.set_attribute("data-rate", &rate.to_string());
        }
    }

    fn reset(&mut self, host: &mut Host, element: NodeId, options: &ElementOptions) {
        if options.repeat() && self.core.is_active(element) {
            self.core.set_active(element, false);
            if let Some(el) = host.document_mut().tree_mut().element_mut(element) {
                el.remove_class(self.core.marker_class());
            }
        }
    }
}

#[test]
fn test_custom_module_with_value_mapping() {
    let mut host = page(r#"<div id="p" kw="pulse" kw-pulse-value="3" style="height: 100px"></div>"#);
    let mut manager = AnimationManager::new(Config::default());
    manager.use_module::<PulseModule>(None);
    manager.add_module_value_mapping("pulse", "rate");
    manager.add_common_attribute("tempo", "rate");

    manager.init(&mut host);
    manager.advance(&mut host, 50.0);

    let p = by_id(&host, "p");
    assert!(has_class(&host, p, "kw-animated"));
    assert_eq!(
        host.document().tree().element(p).unwrap().attribute("data-rate"),
        Some("3")
    );
    assert!(manager.module("pulse").unwrap().is_initialized(&host, p));
}
