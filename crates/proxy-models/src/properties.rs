//! Key/value property bag attached to media graph services.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String properties of a producer, filter or transition.
///
/// Numeric accessors follow the media framework convention: a missing or
/// unparsable value reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    /// Create an empty property bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Get a property as an integer, `0` when missing.
    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key).map(parse_int).unwrap_or(0)
    }

    /// Get a property as a float, `0.0` when missing.
    pub fn get_double(&self, key: &str) -> f64 {
        self.get(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// True when the property holds a non-zero integer.
    pub fn flag(&self, key: &str) -> bool {
        self.get_int(key) != 0
    }

    /// Set a property value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set an integer property value.
    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, value.to_string());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn parse_int(value: &str) -> i64 {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|f| f as i64))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_accessors() {
        let props: Properties = [("a", "42"), ("b", "2.5"), ("c", "abc")].into_iter().collect();
        assert_eq!(props.get_int("a"), 42);
        assert_eq!(props.get_int("b"), 2);
        assert_eq!(props.get_int("c"), 0);
        assert_eq!(props.get_int("missing"), 0);
        assert!((props.get_double("b") - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_flag() {
        let mut props = Properties::new();
        assert!(!props.flag("x"));
        props.set_int("x", 1);
        assert!(props.flag("x"));
        props.set("x", "0");
        assert!(!props.flag("x"));
    }
}
