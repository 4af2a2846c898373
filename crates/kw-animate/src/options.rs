//! Element options
//!
//! Attribute values are strings; options are typed. Coercion follows the
//! usual markup conventions: a bare attribute means `true`, numeric text
//! becomes a number and brace or bracket text is tried as JSON.

use std::collections::BTreeMap;
use std::fmt;

/// Typed option value
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Str(String),
    Json(serde_json::Value),
}

impl OptionValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Number(n) => *n != 0.0 && !n.is_nan(),
            OptionValue::Str(s) => !s.is_empty(),
            OptionValue::Json(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Number(n) => Some(*n),
            OptionValue::Json(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// CSS length: bare numbers are pixels
    pub fn to_css_length(&self) -> String {
        match self {
            OptionValue::Number(n) => format!("{n}px"),
            OptionValue::Str(s) => s.clone(),
            _ => "0px".to_string(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Number(n) => write!(f, "{n}"),
            OptionValue::Str(s) => write!(f, "{s:?}"),
            OptionValue::Json(v) => write!(f, "{v}"),
        }
    }
}

/// Resolved options for one element, keyed by camelCase name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementOptions {
    values: BTreeMap<String, OptionValue>,
}

impl ElementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) -> Option<OptionValue> {
        self.values.insert(name.into(), value)
    }

    /// Insert unless the name is already resolved; returns whether it was inserted
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: OptionValue) -> bool {
        let name = name.into();
        if self.values.contains_key(&name) {
            return false;
        }
        self.values.insert(name, value);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Truthiness of an option; missing is `false`
    pub fn bool(&self, name: &str) -> bool {
        self.get(name).is_some_and(OptionValue::is_truthy)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(OptionValue::as_f64)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OptionValue::as_str)
    }

    /// Whether leaving the viewport should reverse the effect
    pub fn repeat(&self) -> bool {
        self.bool("repeat")
    }
}

/// Coerce a raw attribute value
pub fn coerce_value(raw: &str) -> OptionValue {
    match raw {
        "" | "true" => return OptionValue::Bool(true),
        "false" => return OptionValue::Bool(false),
        _ => {}
    }

    if is_decimal(raw) {
        if let Ok(n) = raw.parse::<f64>() {
            return OptionValue::Number(n);
        }
    }

    if raw.starts_with('{') || raw.starts_with('[') {
        match serde_json::from_str(raw) {
            Ok(value) => return OptionValue::Json(value),
            Err(err) => tracing::debug!("keeping {:?} as a string: {}", raw, err),
        }
    }

    OptionValue::Str(raw.to_string())
}

/// `-?\d*\.?\d+`
fn is_decimal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => ("", digits),
    };
    !frac.is_empty()
        && frac.bytes().all(|b| b.is_ascii_digit())
        && int.bytes().all(|b| b.is_ascii_digit())
}

/// `offset-top` -> `offsetTop`
pub fn kebab_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for c in s.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Visibility fraction from an `inview` value between `0%` and `100%`.
/// The percent sign is optional. Anything else is logged and ignored.
pub fn parse_inview(value: &OptionValue) -> Option<f64> {
    let percent = match value {
        OptionValue::Number(n) => Some(*n),
        OptionValue::Str(s) => {
            let s = s.trim();
            s.strip_suffix('%').unwrap_or(s).trim().parse::<f64>().ok()
        }
        _ => None,
    };

    match percent {
        Some(p) if (0.0..=100.0).contains(&p) => Some(p / 100.0),
        _ => {
            tracing::warn!("ignoring inview value {}: expected 0% to 100%", value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value(""), OptionValue::Bool(true));
        assert_eq!(coerce_value("true"), OptionValue::Bool(true));
        assert_eq!(coerce_value("false"), OptionValue::Bool(false));
        assert_eq!(coerce_value("42"), OptionValue::Number(42.0));
        assert_eq!(coerce_value("-0.5"), OptionValue::Number(-0.5));
        assert_eq!(coerce_value(".25"), OptionValue::Number(0.25));
        assert_eq!(coerce_value("1e3"), OptionValue::Str("1e3".into()));
        assert_eq!(coerce_value("10px"), OptionValue::Str("10px".into()));
        assert_eq!(coerce_value("1."), OptionValue::Str("1.".into()));
        assert_eq!(coerce_value(r#"{"a": 1}"#), OptionValue::Json(json!({"a": 1})));
        assert_eq!(coerce_value("[1, 2]"), OptionValue::Json(json!([1, 2])));
        assert_eq!(coerce_value("{oops"), OptionValue::Str("{oops".into()));
    }

    #[test]
    fn test_kebab_to_camel() {
        assert_eq!(kebab_to_camel("offset-top"), "offsetTop");
        assert_eq!(kebab_to_camel("stagger-delay-ms"), "staggerDelayMs");
        assert_eq!(kebab_to_camel("speed"), "speed");
    }

    #[test]
    fn test_parse_inview() {
        assert_eq!(parse_inview(&OptionValue::Str("50%".into())), Some(0.5));
        assert_eq!(parse_inview(&OptionValue::Str("0%".into())), Some(0.0));
        assert_eq!(parse_inview(&OptionValue::Str("100%".into())), Some(1.0));
        assert_eq!(parse_inview(&OptionValue::Number(25.0)), Some(0.25));
        assert_eq!(parse_inview(&OptionValue::Str("150%".into())), None);
        assert_eq!(parse_inview(&OptionValue::Str("half".into())), None);
        assert_eq!(parse_inview(&OptionValue::Bool(true)), None);
    }

    #[test]
    fn test_truthiness() {
        let mut options = ElementOptions::new();
        options.insert("repeat", OptionValue::Bool(true));
        options.insert("zero", OptionValue::Number(0.0));
        options.insert("empty", OptionValue::Str(String::new()));

        assert!(options.repeat());
        assert!(!options.bool("zero"));
        assert!(!options.bool("empty"));
        assert!(!options.bool("missing"));
    }

    #[test]
    fn test_insert_if_absent() {
        let mut options = ElementOptions::new();
        assert!(options.insert_if_absent("duration", OptionValue::Number(900.0)));
        assert!(!options.insert_if_absent("duration", OptionValue::Number(500.0)));
        assert_eq!(options.number("duration"), Some(900.0));
    }
}
