//! Shared configuration for PBR Forge
//!
//! Single source of truth for backend location, timeouts, polling cadence and
//! output defaults. Values can be overridden from the environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Default request timeout in seconds (generation of four maps is slow)
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default poll tick in milliseconds
pub const DEFAULT_POLL_MS: u64 = 100;

/// Default strength of the host's normal-map node
pub const DEFAULT_NORMAL_STRENGTH: f32 = 1.5;

/// Default strength used when deriving normals from a height map
pub const DEFAULT_HEIGHT_TO_NORMAL_STRENGTH: f32 = 3.0;

/// Default output directory for generated materials
pub const DEFAULT_OUTPUT_DIR: &str = "pbrforge-out";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Base URL of the inference backend
    pub backend_url: String,
    /// Timeout for one `/generate` request, in seconds
    pub timeout_secs: u64,
    /// Poll tick of the host loop, in milliseconds
    pub poll_ms: u64,
    /// Normal-map node strength written to the material
    pub normal_strength: f32,
    /// Strength for client-side height-to-normal conversion
    pub height_to_normal_strength: f32,
    /// Where materials are written
    pub output_dir: PathBuf,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_ms: DEFAULT_POLL_MS,
            normal_strength: DEFAULT_NORMAL_STRENGTH,
            height_to_normal_strength: DEFAULT_HEIGHT_TO_NORMAL_STRENGTH,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ForgeConfig {
    /// Defaults overridden by `PBRFORGE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values are ignored
    /// with a warning and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("PBRFORGE_BACKEND_URL") {
            config.backend_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var(&lookup, "PBRFORGE_TIMEOUT_SECS") {
            config.timeout_secs = secs;
        }
        if let Some(ms) = parse_var(&lookup, "PBRFORGE_POLL_MS") {
            config.poll_ms = ms;
        }
        if let Some(strength) = parse_var::<f32>(&lookup, "PBRFORGE_NORMAL_STRENGTH") {
            config.normal_strength = strength;
        }
        if let Some(strength) = parse_var::<f32>(&lookup, "PBRFORGE_HEIGHT_TO_NORMAL_STRENGTH") {
            config.height_to_normal_strength = strength;
        }
        if let Some(dir) = lookup("PBRFORGE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        config
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Poll tick as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ForgeConfig::default();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.timeout(), Duration::from_secs(600));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PBRFORGE_BACKEND_URL", "http://gpu-box:5000/"),
            ("PBRFORGE_TIMEOUT_SECS", "30"),
            ("PBRFORGE_NORMAL_STRENGTH", "2.5"),
        ]
        .into_iter()
        .collect();

        let config = ForgeConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.backend_url, "http://gpu-box:5000");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.normal_strength, 2.5);
        assert_eq!(config.poll_ms, DEFAULT_POLL_MS);
    }

    #[test]
    fn test_invalid_value_keeps_default() {
        let config = ForgeConfig::from_lookup(|key| {
            (key == "PBRFORGE_POLL_MS").then(|| "soon".to_string())
        });
        assert_eq!(config.poll_ms, DEFAULT_POLL_MS);
    }
}
