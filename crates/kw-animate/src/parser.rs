//! Attribute parser
//!
//! Turns an element's attributes into a module name plus a resolved
//! option set. With the default base `kw`:
//!
//! ```text
//! <div kw="fade-in"                   module
//!      kw-fade-in-duration="900"      module-scoped option
//!      kw-offset-top="100px"          observer margin side
//!      kw-inview="50%"                visibility threshold
//!      kw-duration="500"              common option
//!      kw-repeat>                     common flag
//! ```
//!
//! Forms are resolved in that order and the first form to set a name
//! wins, so `duration` above resolves to 900.

use crate::config::{Config, ConfigError, ConfigUpdate};
use crate::options::{ElementOptions, coerce_value, kebab_to_camel};
use kw_dom::{DomTree, NamedNodeMap, NodeId};
use std::collections::HashMap;

/// Common option attributes as `(suffix, option name)`
pub const DEFAULT_COMMON_ATTRIBUTES: &[(&str, &str)] = &[
    ("duration", "duration"),
    ("delay", "delay"),
    ("repeat", "repeat"),
    ("speed", "speed"),
    ("direction", "direction"),
    ("easing", "easing"),
    ("class", "class"),
    ("from", "from"),
    ("to", "to"),
    ("start", "start"),
    ("end", "end"),
    ("inview", "inview"),
];

/// Module name plus resolved options
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedElement {
    pub module: String,
    pub options: ElementOptions,
}

/// Attribute parser
#[derive(Debug, Clone)]
pub struct AttributeParser {
    config: Config,
    common_attributes: Vec<(String, String)>,
    /// Module name -> option that receives a shorthand `value`
    module_values: HashMap<String, String>,
}

impl Default for AttributeParser {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl AttributeParser {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            common_attributes: DEFAULT_COMMON_ATTRIBUTES
                .iter()
                .map(|(suffix, name)| (suffix.to_string(), name.to_string()))
                .collect(),
            module_values: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn attribute_name(&self) -> &str {
        self.config.attribute_name()
    }

    pub fn update_config(&mut self, update: &ConfigUpdate) -> Result<(), ConfigError> {
        self.config.apply(update)
    }

    /// Register `{base}-{suffix}` as a common attribute for `option_name`.
    /// Entries already in the table keep precedence.
    pub fn add_common_attribute(&mut self, suffix: &str, option_name: &str) {
        self.common_attributes
            .push((suffix.to_string(), option_name.to_string()));
    }

    /// Route a shorthand `value` option to `option_name` for `module`
    pub fn add_module_value_mapping(&mut self, module: &str, option_name: &str) {
        self.module_values
            .insert(module.to_string(), option_name.to_string());
    }

    pub fn has_animation_attributes(&self, tree: &DomTree, element: NodeId) -> bool {
        tree.element(element)
            .is_some_and(|e| e.has_attribute(self.attribute_name()))
    }

    /// Module name for a primary attribute value
    pub fn resolve_module_name(&self, value: &str) -> Option<String> {
        if value.is_empty() {
            self.config.default_animation().map(str::to_string)
        } else {
            Some(value.to_string())
        }
    }

    pub fn parse_element_options(&self, tree: &DomTree, element: NodeId) -> Option<ParsedElement> {
        self.parse_attributes(tree.element(element)?.attributes())
    }

    /// Resolve module and options from an attribute map
    pub fn parse_attributes(&self, attrs: &NamedNodeMap) -> Option<ParsedElement> {
        let base = self.attribute_name();
        let module = self.resolve_module_name(attrs.get(base)?)?;
        let mut options = ElementOptions::new();

        let module_prefix = format!("{base}-{module}-");
        for attr in attrs.iter() {
            if let Some(suffix) = attr.name.strip_prefix(&module_prefix) {
                if !suffix.is_empty() {
                    options.insert_if_absent(kebab_to_camel(suffix), coerce_value(&attr.value));
                }
            }
        }

        let offset_prefix = format!("{base}-offset-");
        for attr in attrs.iter() {
            if let Some(side) = attr.name.strip_prefix(&offset_prefix) {
                if !side.is_empty() {
                    let name = kebab_to_camel(&format!("offset-{side}"));
                    options.insert_if_absent(name, coerce_value(&attr.value));
                }
            }
        }

        if let Some(value) = attrs.get(&format!("{base}-inview")) {
            options.insert_if_absent("inview", coerce_value(value));
        }

        for (suffix, name) in &self.common_attributes {
            if let Some(value) = attrs.get(&format!("{base}-{suffix}")) {
                options.insert_if_absent(name.as_str(), coerce_value(value));
            }
        }

        if let Some(target) = self.module_values.get(&module) {
            if target != "value" && !options.contains(target) {
                if let Some(value) = options.remove("value") {
                    options.insert(target.as_str(), value);
                }
            }
        }

        tracing::trace!("parsed {} options for module {:?}", options.len(), module);
        Some(ParsedElement { module, options })
    }
}
