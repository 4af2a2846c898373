//! Engine configuration

use serde::{Deserialize, Serialize};

/// Default primary attribute token
pub const DEFAULT_ATTRIBUTE_NAME: &str = "kw";

/// Global configuration
///
/// The attribute name is checked whenever a configuration is built,
/// deserialized or updated, so a `Config` always names a usable token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ConfigUpdate")]
pub struct Config {
    /// Primary attribute; also the prefix of every option attribute
    attribute_name: String,
    /// Module used when the primary attribute is present but empty
    default_animation: Option<String>,
    /// Deprecated, accepted and ignored
    use_data_attribute_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            attribute_name: DEFAULT_ATTRIBUTE_NAME.to_string(),
            default_animation: None,
            use_data_attribute_fallback: false,
        }
    }
}

impl Config {
    /// Default configuration under another attribute name
    pub fn new(attribute_name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::try_from(ConfigUpdate::new().attribute_name(attribute_name))
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn default_animation(&self) -> Option<&str> {
        self.default_animation.as_deref()
    }

    pub fn use_data_attribute_fallback(&self) -> bool {
        self.use_data_attribute_fallback
    }

    /// Apply a partial update. Validation happens first, so a rejected
    /// update leaves the configuration untouched.
    pub fn apply(&mut self, update: &ConfigUpdate) -> Result<(), ConfigError> {
        if let Some(name) = &update.attribute_name {
            if !is_valid_attribute_name(name) {
                return Err(ConfigError::InvalidAttributeName(name.clone()));
            }
        }

        if let Some(name) = &update.attribute_name {
            self.attribute_name = name.clone();
        }
        if let Some(default) = &update.default_animation {
            self.default_animation = (!default.is_empty()).then(|| default.clone());
        }
        if let Some(fallback) = update.use_data_attribute_fallback {
            if fallback {
                tracing::warn!("useDataAttributeFallback is deprecated and has no effect");
            }
            self.use_data_attribute_fallback = fallback;
        }
        Ok(())
    }
}

/// Defaults with the update applied
impl TryFrom<ConfigUpdate> for Config {
    type Error = ConfigError;

    fn try_from(update: ConfigUpdate) -> Result<Self, Self::Error> {
        let mut config = Config::default();
        config.apply(&update)?;
        Ok(config)
    }
}

/// Partial configuration update
///
/// `default_animation: Some("")` clears the default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigUpdate {
    pub attribute_name: Option<String>,
    pub default_animation: Option<String>,
    pub use_data_attribute_fallback: Option<bool>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an update from a JSON object such as `{"attributeName": "anim"}`
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn attribute_name(mut self, name: impl Into<String>) -> Self {
        self.attribute_name = Some(name.into());
        self
    }

    pub fn default_animation(mut self, module: impl Into<String>) -> Self {
        self.default_animation = Some(module.into());
        self
    }

    pub fn use_data_attribute_fallback(mut self, enabled: bool) -> Self {
        self.use_data_attribute_fallback = Some(enabled);
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid attribute name {0:?}")]
    InvalidAttributeName(String),

    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// `[A-Za-z_][A-Za-z0-9_.-]*`
pub fn is_valid_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_name_validation() {
        assert!(is_valid_attribute_name("kw"));
        assert!(is_valid_attribute_name("data-anim"));
        assert!(!is_valid_attribute_name(""));
        assert!(!is_valid_attribute_name("1kw"));
        assert!(!is_valid_attribute_name("k w"));
        assert!(!is_valid_attribute_name("kw="));
    }

    #[test]
    fn test_rejected_update_is_atomic() {
        let mut config = Config::default();
        let update = ConfigUpdate::new()
            .attribute_name("bad name")
            .default_animation("fade-in");

        assert!(matches!(config.apply(&update), Err(ConfigError::InvalidAttributeName(_))));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_animation_set_and_clear() {
        let mut config = Config::default();
        config.apply(&ConfigUpdate::new().default_animation("fade-in")).unwrap();
        assert_eq!(config.default_animation(), Some("fade-in"));

        config.apply(&ConfigUpdate::new().default_animation("")).unwrap();
        assert_eq!(config.default_animation(), None);
    }

    #[test]
    fn test_update_from_json() {
        let update = ConfigUpdate::from_json(r#"{"attributeName": "anim", "useDataAttributeFallback": true}"#)
            .unwrap();
        assert_eq!(update.attribute_name.as_deref(), Some("anim"));
        assert_eq!(update.use_data_attribute_fallback, Some(true));

        assert!(ConfigUpdate::from_json(r#"{"attribute": "anim"}"#).is_err());
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: Config = serde_json::from_str(r#"{"defaultAnimation": "fade-in"}"#).unwrap();
        assert_eq!(config.attribute_name(), "kw");
        assert_eq!(config.default_animation(), Some("fade-in"));
    }

    #[test]
    fn test_construction_rejects_invalid_attribute_name() {
        assert!(matches!(Config::new(""), Err(ConfigError::InvalidAttributeName(_))));
        assert!(matches!(Config::new("not valid"), Err(ConfigError::InvalidAttributeName(_))));
        assert_eq!(Config::new("anim").unwrap().attribute_name(), "anim");

        assert!(serde_json::from_str::<Config>(r#"{"attributeName": ""}"#).is_err());
        assert!(serde_json::from_str::<Config>(r#"{"attributeName": "not valid"}"#).is_err());
        assert!(serde_json::from_str::<Config>(r#"{"attributes": "kw"}"#).is_err());
    }

    #[test]
    fn test_serialize_round_trips_through_validation() {
        let config = Config::try_from(ConfigUpdate::new().attribute_name("anim").default_animation("fade-in"))
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""attributeName":"anim""#));
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }
}
