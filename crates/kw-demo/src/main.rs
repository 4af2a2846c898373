//! kw Demo - scroll a page through the animation engine headlessly
//!
//! Usage: `kw-demo [page.html] [config.json]`

use anyhow::Context;
use kw_animate::{AnimationManager, Config, ConfigUpdate};
use kw_dom::NodeId;
use kw_host::layout::stack_layout;
use kw_host::{Host, Viewport};
use tracing_subscriber::EnvFilter;

const SAMPLE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
    <header style="height: 800px"></header>
    <section id="intro" kw="fade-in" kw-duration="900" kw-class="is-visible"></section>
    <section id="hero" kw="parallax" kw-speed="0.3" style="height: 400px"></section>
    <section id="cards" kw="fade-in" kw-delay="150" kw-repeat kw-inview="50%"></section>
    <footer style="height: 1200px"></footer>
</body>
</html>"#;

const SCROLL_STEP: f64 = 120.0;
const STEP_MS: f64 = 50.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let markup = match args.next() {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?,
        None => SAMPLE_PAGE.to_string(),
    };

    let mut manager = AnimationManager::with_builtin_modules(Config::default());
    if let Some(path) = args.next() {
        let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        manager.update_config(&ConfigUpdate::from_json(&json)?)?;
    }

    let mut doc = kw_html::parse(&markup).context("parsing page")?;
    let viewport = Viewport::default();
    let page_height = stack_layout(&mut doc, viewport.width, 120.0);
    let mut host = Host::new(doc, viewport);

    tracing::info!("page height {}px, viewport {}x{}", page_height, viewport.width, viewport.height);
    manager.init(&mut host);
    manager.advance(&mut host, STEP_MS);

    let mut y = 0.0;
    while y < page_height - viewport.height {
        y += SCROLL_STEP;
        host.scroll_to(0.0, y);
        let events = manager.advance(&mut host, STEP_MS);
        tracing::debug!("scrolled to {}: {} events", y, events);
    }
    manager.advance(&mut host, 1000.0);

    report(&host, &manager);
    manager.destroy(&mut host);
    Ok(())
}

fn report(host: &Host, manager: &AnimationManager) {
    let attribute = manager.config().attribute_name();
    let tree = host.document().tree();
    for id in tree.elements_with_attribute(NodeId::ROOT, attribute) {
        let Some(element) = tree.element(id) else {
            continue;
        };
        let label = element
            .attribute("id")
            .map_or_else(|| id.to_string(), |name| format!("#{name}"));
        println!(
            "{:<10} {:<10} class=\"{}\" style=\"{}\"",
            label,
            element.attribute(attribute).unwrap_or_default(),
            element.class_list().value(),
            element.style().css_text(),
        );
    }
    println!("{} scans, modules: {}", manager.scan_count(), manager.module_names().join(", "));
}
