//! kw Animate
//!
//! Attribute-driven scroll animations. Markup opts in with a single
//! attribute and configures the effect through suffixed attributes:
//!
//! ```html
//! <section kw="fade-in" kw-duration="900" kw-repeat>...</section>
//! <img kw="parallax" kw-speed="0.3" kw-direction="down">
//! ```
//!
//! # Example
//! ```rust,ignore
//! use kw_animate::{AnimationManager, Config};
//!
//! let mut manager = AnimationManager::with_builtin_modules(Config::default());
//! manager.init(&mut host);
//! host.scroll_to(0.0, 400.0);
//! manager.advance(&mut host, 100.0);
//! ```

mod config;
mod context;
mod manager;
pub mod modules;
mod options;
mod parser;

pub use config::{Config, ConfigError, ConfigUpdate, DEFAULT_ATTRIBUTE_NAME, is_valid_attribute_name};
pub use context::{AnimationContext, SharedContext, ViewportSize};
pub use manager::{AnimationManager, POST_INIT_RESCAN_MS, RESCAN_DEBOUNCE_MS};
pub use modules::{AnimationModule, FadeModule, ModuleCore, ParallaxModule};
pub use options::{ElementOptions, OptionValue, coerce_value, kebab_to_camel, parse_inview};
pub use parser::{AttributeParser, DEFAULT_COMMON_ATTRIBUTES, ParsedElement};

// Re-export sub-crates for embedders
pub use kw_dom as dom;
pub use kw_host as host;
