//! Environment variable and configuration property lookup
//!
//! Two sources are consulted: the process environment (`value*`), which is
//! fixed for the lifetime of the process, and a property store (`property*`)
//! that can be changed at runtime. Code that needs configuration receives an
//! `EnvironmentVariables` implementation instead of reading globals, so tests
//! can hand it a [`MockEnvironmentVariables`].

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};

/// Read access to environment values and configuration properties.
///
/// Only [`value`](Self::value) and [`property`](Self::property) are required;
/// the defaulting and typed accessors are shared so every implementation
/// converts values the same way.
pub trait EnvironmentVariables: Send + Sync {
    fn value(&self, name: &str) -> Option<String>;

    fn property(&self, name: &str) -> Option<String>;

    fn value_or(&self, name: &str, default: &str) -> String {
        self.value(name).unwrap_or_else(|| default.to_string())
    }

    fn property_or(&self, name: &str, default: &str) -> String {
        self.property(name).unwrap_or_else(|| default.to_string())
    }

    /// Missing or unparsable values yield `default`.
    fn property_as_integer(&self, name: &str, default: i32) -> i32 {
        self.property(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Accepts `true`/`false` in any case; anything else yields `default`.
    fn property_as_boolean(&self, name: &str, default: bool) -> bool {
        match self.property(name) {
            Some(v) if v.trim().eq_ignore_ascii_case("true") => true,
            Some(v) if v.trim().eq_ignore_ascii_case("false") => false,
            _ => default,
        }
    }
}

/// Environment backed by the real process environment
#[derive(Debug, Default)]
pub struct SystemEnvironmentVariables {
    properties: RwLock<HashMap<String, String>>,
}

impl SystemEnvironmentVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(properties: HashMap<String, String>) -> Self {
        Self {
            properties: RwLock::new(properties),
        }
    }

    pub fn set_property(&self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(name.into(), value.into());
    }

    pub fn clear_property(&self, name: &str) -> Option<String> {
        self.properties.write().remove(name)
    }

    /// Merge properties from a flat TOML table. A missing file is ignored.
    pub fn load_properties(&self, path: &Path) -> Result<usize> {
        if !path.exists() {
            debug!("No properties file at {}", path.display());
            return Ok(0);
        }

        let content = std::fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&content)?;

        let mut properties = self.properties.write();
        let mut loaded = 0;
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(Error::Configuration(format!(
                        "Property '{}' must be a scalar, found {}",
                        key,
                        other.type_str()
                    )))
                }
            };
            properties.insert(key, value);
            loaded += 1;
        }

        debug!("Loaded {} properties from {}", loaded, path.display());
        Ok(loaded)
    }
}

impl EnvironmentVariables for SystemEnvironmentVariables {
    fn value(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.read().get(name).cloned()
    }
}

/// In-memory environment for tests
#[derive(Debug, Default)]
pub struct MockEnvironmentVariables {
    values: RwLock<HashMap<String, String>>,
    properties: RwLock<HashMap<String, String>>,
}

impl MockEnvironmentVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&self, name: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(name.into(), value.into());
    }

    pub fn set_property(&self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(name.into(), value.into());
    }
}

impl EnvironmentVariables for MockEnvironmentVariables {
    fn value(&self, name: &str) -> Option<String> {
        self.values.read().get(name).cloned()
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_reads_environment_variable_from_system() {
        let env = SystemEnvironmentVariables::new();
        assert!(env.value("PATH").is_some());
    }

    #[test]
    fn test_missing_environment_variable_is_none() {
        let env = SystemEnvironmentVariables::new();
        assert_eq!(env.value("ANNALIST_DOES_NOT_EXIST"), None);
        assert_eq!(env.value_or("ANNALIST_DOES_NOT_EXIST", "DEFAULT"), "DEFAULT");
    }

    #[test]
    fn test_system_properties_can_be_set_and_cleared() {
        let env = SystemEnvironmentVariables::new();
        env.set_property("webdriver.base.url", "some.value");
        assert_eq!(env.property("webdriver.base.url").as_deref(), Some("some.value"));
        assert_eq!(env.property_or("webdriver.base.url", "DEFAULT"), "some.value");

        env.clear_property("webdriver.base.url");
        assert_eq!(env.property_or("webdriver.base.url", "DEFAULT"), "DEFAULT");
    }

    #[test]
    fn test_mock_values_and_properties() {
        let env = MockEnvironmentVariables::new();
        env.set_property("property", "value");
        env.set_value("env", "value");

        assert_eq!(env.property("property").as_deref(), Some("value"));
        assert_eq!(env.value("env").as_deref(), Some("value"));
        assert_eq!(env.property_or("other", "default"), "default");
        assert_eq!(env.value_or("other", "default"), "default");
    }

    #[test_case(Some("30"), 0, 30 ; "parsed")]
    #[test_case(Some(" 42 "), 0, 42 ; "trimmed")]
    #[test_case(None, 10, 10 ; "missing uses default")]
    #[test_case(Some("thirty"), 7, 7 ; "invalid uses default")]
    #[test_case(Some("99999999999"), 5, 5 ; "overflow uses default")]
    fn test_integer_properties(raw: Option<&str>, default: i32, expected: i32) {
        let env = MockEnvironmentVariables::new();
        if let Some(raw) = raw {
            env.set_property("property", raw);
        }
        assert_eq!(env.property_as_integer("property", default), expected);
    }

    #[test_case(Some("true"), false, true ; "true")]
    #[test_case(Some("FALSE"), true, false ; "false any case")]
    #[test_case(None, true, true ; "missing uses default")]
    #[test_case(Some("yes"), false, false ; "invalid uses default")]
    fn test_boolean_properties(raw: Option<&str>, default: bool, expected: bool) {
        let env = MockEnvironmentVariables::new();
        if let Some(raw) = raw {
            env.set_property("property", raw);
        }
        assert_eq!(env.property_as_boolean("property", default), expected);
    }

    #[test]
    fn test_load_properties_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annalist.toml");
        std::fs::write(
            &path,
            "\"webdriver.driver\" = \"chrome\"\n\"webdriver.timeout\" = 30\n\"annalist.verbose\" = true\n",
        )
        .unwrap();

        let env = SystemEnvironmentVariables::new();
        assert_eq!(env.load_properties(&path).unwrap(), 3);
        assert_eq!(env.property("webdriver.driver").as_deref(), Some("chrome"));
        assert_eq!(env.property_as_integer("webdriver.timeout", 0), 30);
        assert!(env.property_as_boolean("annalist.verbose", false));
    }

    #[test]
    fn test_missing_properties_file_is_ignored() {
        let env = SystemEnvironmentVariables::new();
        let loaded = env
            .load_properties(Path::new("/nonexistent/annalist.toml"))
            .unwrap();
        assert_eq!(loaded, 0);
    }

    #[test]
    fn test_nested_property_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annalist.toml");
        std::fs::write(&path, "[webdriver]\ndriver = \"chrome\"\n").unwrap();

        let err = SystemEnvironmentVariables::new()
            .load_properties(&path)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
