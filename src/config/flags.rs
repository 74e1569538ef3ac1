// src/config/flags.rs
// DOCUMENTATION: Feature flag parsing
// PURPOSE: Read-only process-wide flags injected into the sync pipeline

use std::collections::HashMap;

/// Flag key that enables the road-network distance method
pub const ENABLE_DISTANCE_MATRIX: &str = "enableDistanceMatrix";

/// Flag key overriding the place category tag
pub const PLACE_CATEGORY: &str = "placeCategory";

/// A single flag value
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Bool(bool),
    Text(String),
}

/// Feature flags parsed once at startup
/// DOCUMENTATION: Mapping of string keys to boolean/string values.
/// Input format is `key=value,key2=value2`; a bare `key` means `true`.
#[derive(Debug, Clone, Default)]
pub struct FeatureFlags {
    values: HashMap<String, FlagValue>,
    ignored: Vec<String>,
}

impl FeatureFlags {
    pub fn parse(raw: &str) -> Self {
        let mut values = HashMap::new();
        let mut ignored = Vec::new();

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = match entry.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (entry, "true"),
            };

            if key.is_empty() {
                ignored.push(entry.to_string());
                continue;
            }

            let value = match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => FlagValue::Bool(true),
                "false" | "0" | "off" | "no" => FlagValue::Bool(false),
                _ => FlagValue::Text(value.to_string()),
            };

            values.insert(key.to_string(), value);
        }

        Self { values, ignored }
    }

    /// Override one key (used for dedicated env vars)
    pub fn with(mut self, key: &str, value: FlagValue) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Entries dropped by `parse` because they had no key
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.values.get(key)
    }

    /// True only for an explicit boolean `true`
    pub fn is_enabled(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(FlagValue::Bool(true)))
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FlagValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_flags() {
        let flags = FeatureFlags::parse("enableDistanceMatrix=true, theme=dark ,beta, legacy=off");

        assert!(flags.is_enabled(ENABLE_DISTANCE_MATRIX));
        assert!(flags.is_enabled("beta"));
        assert!(!flags.is_enabled("legacy"));
        assert_eq!(flags.text("theme"), Some("dark"));
        assert!(!flags.is_enabled("theme"));
    }

    #[test]
    fn test_missing_flag_is_disabled() {
        let flags = FeatureFlags::parse("");
        assert!(!flags.is_enabled(ENABLE_DISTANCE_MATRIX));
        assert!(flags.get(ENABLE_DISTANCE_MATRIX).is_none());
    }

    #[test]
    fn test_entries_without_key_are_ignored() {
        let flags = FeatureFlags::parse("=on,beta");
        assert_eq!(flags.ignored(), ["=on".to_string()]);
        assert!(flags.is_enabled("beta"));
    }

    #[test]
    fn test_override() {
        let flags = FeatureFlags::parse("enableDistanceMatrix=false")
            .with(ENABLE_DISTANCE_MATRIX, FlagValue::Bool(true));
        assert!(flags.is_enabled(ENABLE_DISTANCE_MATRIX));
    }
}
