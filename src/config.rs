//! Runtime configuration
//!
//! The recursion thresholds are configurable defaults, not hard constants:
//! hosts embedding the runtime may tune them, and nothing in the engine
//! raises or lowers them silently. `properties` seeds the process-wide
//! `PROPS` map injected into every run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Depth at which a recursive call logs a diagnostic warning
    pub recursion_warn_depth: usize,
    /// Depth at which a recursive call fails with "stack too deep"
    pub recursion_abort_depth: usize,
    /// Upper bound on a single suspend wait, in seconds
    pub max_poll_seconds: f64,
    /// Host system properties, exposed to programs as the PROPS map
    pub properties: HashMap<String, String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            recursion_warn_depth: 30,
            recursion_abort_depth: 100,
            max_poll_seconds: 3600.0,
            properties: HashMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config: RuntimeConfig = toml::from_str(&text)?;
        config.apply_env();
        Ok(config)
    }

    /// Environment overrides (a .env file is honored when present):
    /// RILL_RECURSION_WARN_DEPTH, RILL_RECURSION_ABORT_DEPTH,
    /// RILL_MAX_POLL_SECONDS.
    pub fn apply_env(&mut self) {
        dotenvy::dotenv().ok();

        if let Ok(v) = std::env::var("RILL_RECURSION_WARN_DEPTH") {
            if let Ok(n) = v.parse() {
                self.recursion_warn_depth = n;
            }
        }
        if let Ok(v) = std::env::var("RILL_RECURSION_ABORT_DEPTH") {
            if let Ok(n) = v.parse() {
                self.recursion_abort_depth = n;
            }
        }
        if let Ok(v) = std::env::var("RILL_MAX_POLL_SECONDS") {
            if let Ok(n) = v.parse() {
                self.max_poll_seconds = n;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.recursion_warn_depth, 30);
        assert_eq!(config.recursion_abort_depth, 100);
        assert!(config.properties.is_empty());
    }

    #[test]
    fn test_toml_partial_override() {
        let config: RuntimeConfig =
            toml::from_str("recursion_abort_depth = 50\n[properties]\nregion = \"eu\"\n").unwrap();
        assert_eq!(config.recursion_abort_depth, 50);
        // Unspecified fields keep their defaults
        assert_eq!(config.recursion_warn_depth, 30);
        assert_eq!(config.properties.get("region").map(String::as_str), Some("eu"));
    }
}
