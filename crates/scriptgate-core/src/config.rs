//! scriptgate.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub debug: DebugConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site directory. `controller` and `public` are relative to it.
    pub root: PathBuf,
    pub controller: String,
    /// Static file directory served at the site root. `None` disables it.
    pub public: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            controller: "controller.rhai".to_string(),
            public: Some("public".to_string()),
        }
    }
}

/// Which environment variable turns on diagnostics in responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub env_var: String,
    /// The exact value that enables debug output.
    pub expected: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            env_var: "DEBUG".to_string(),
            expected: "TRUE".to_string(),
        }
    }
}

impl DebugConfig {
    /// Read the process environment now. Not cached.
    pub fn enabled(&self) -> bool {
        self.enabled_with(|name| std::env::var(name).ok())
    }

    pub fn enabled_with(&self, lookup: impl Fn(&str) -> Option<String>) -> bool {
        lookup(&self.env_var).is_some_and(|value| value == self.expected)
    }
}

/// Script resource limits. Zero means unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_operations: u64,
    pub max_call_levels: usize,
    /// Also caps `read_string()` on the request body. Unlimited by default.
    pub max_string_size: usize,
    /// Also caps blobs, so `read_all()` and `_BINARYRESPONSE`. Unlimited by
    /// default.
    pub max_array_size: usize,
    pub max_map_size: usize,
    /// Wall-clock budget per request, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_operations: 10_000_000,
            max_call_levels: 64,
            max_string_size: 0,
            max_array_size: 0,
            max_map_size: 100_000,
            timeout_ms: Some(30_000),
        }
    }
}

/// How the bridge decides, per request, whether diagnostics are rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugMode {
    Env(DebugConfig),
    Fixed(bool),
}

impl Default for DebugMode {
    fn default() -> Self {
        DebugMode::Env(DebugConfig::default())
    }
}

impl DebugMode {
    pub fn is_enabled(&self) -> bool {
        match self {
            DebugMode::Env(config) => config.enabled(),
            DebugMode::Fixed(enabled) => *enabled,
        }
    }
}

impl GateConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A starter configuration for a site rooted at `root`.
    pub fn scaffold(root: impl Into<PathBuf>) -> Self {
        GateConfig {
            site: SiteConfig {
                root: root.into(),
                ..SiteConfig::default()
            },
            ..GateConfig::default()
        }
    }

    pub fn controller_path(&self) -> PathBuf {
        self.site.root.join(&self.site.controller)
    }

    pub fn public_dir(&self) -> Option<PathBuf> {
        self.site.public.as_ref().map(|dir| self.site.root.join(dir))
    }

    pub fn debug_mode(&self) -> DebugMode {
        DebugMode::Env(self.debug.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = GateConfig::from_toml_str("").unwrap();
        assert_eq!(config, GateConfig::default());
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.controller_path(), PathBuf::from("./controller.rhai"));
        assert_eq!(config.public_dir(), Some(PathBuf::from("./public")));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = GateConfig::from_toml_str(
            r#"
[site]
root = "/srv/site"

[limits]
max_operations = 500
"#,
        )
        .unwrap();
        assert_eq!(config.site.root, PathBuf::from("/srv/site"));
        assert_eq!(config.site.controller, "controller.rhai");
        assert_eq!(config.limits.max_operations, 500);
        assert_eq!(config.limits.max_call_levels, 64);
    }

    #[test]
    fn default_limits_leave_body_sized_values_uncapped() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.max_string_size, 0);
        assert_eq!(limits.max_array_size, 0);
    }

    #[test]
    fn scaffold_roundtrips_through_toml() {
        let config = GateConfig::scaffold("mysite");
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("mysite"));
        assert_eq!(GateConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn from_file_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = GateConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn debug_requires_the_exact_value() {
        let debug = DebugConfig::default();
        assert!(debug.enabled_with(|_| Some("TRUE".into())));
        assert!(!debug.enabled_with(|_| Some("true".into())));
        assert!(!debug.enabled_with(|_| Some("1".into())));
        assert!(!debug.enabled_with(|_| None));
    }

    #[test]
    fn debug_lookup_uses_the_configured_variable() {
        let debug = DebugConfig {
            env_var: "SITE_DEBUG".into(),
            expected: "yes".into(),
        };
        assert!(debug.enabled_with(|name| (name == "SITE_DEBUG").then(|| "yes".into())));
        assert!(!debug.enabled_with(|name| (name == "DEBUG").then(|| "yes".into())));
    }

    #[test]
    fn fixed_debug_mode() {
        assert!(DebugMode::Fixed(true).is_enabled());
        assert!(!DebugMode::Fixed(false).is_enabled());
    }
}
