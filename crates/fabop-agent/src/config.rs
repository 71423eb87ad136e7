//! Agent configuration
//!
//! Loaded from a TOML file (default `fabop.toml`); a missing file yields the
//! defaults. `FABOP_NAMESPACE` (comma separated) and `FABOP_LOG_LEVEL`
//! override the file.

use anyhow::{bail, Context, Result};
use fabop_core::RestartConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Namespaces to watch; empty watches all
    pub namespaces: Vec<String>,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Requeue delay while a restart is still waiting for its new pod
    pub requeue_secs: u64,
    /// Requeue delay after a failed reconcile
    pub error_requeue_secs: u64,
    pub restart: RestartConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            namespaces: Vec::new(),
            log_level: "info".to_string(),
            requeue_secs: 10,
            error_requeue_secs: 30,
            restart: RestartConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply `FABOP_*` overrides from the process environment
    pub fn merge_with_env(self) -> Self {
        self.merge_with(|key| std::env::var(key).ok())
    }

    fn merge_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(namespaces) = lookup("FABOP_NAMESPACE") {
            self.namespaces = namespaces
                .split(',')
                .map(str::trim)
                .filter(|ns| !ns.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(level) = lookup("FABOP_LOG_LEVEL").filter(|level| !level.is_empty()) {
            self.log_level = level;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.requeue_secs == 0 {
            bail!("requeue_secs must be positive");
        }
        if self.error_requeue_secs == 0 {
            bail!("error_requeue_secs must be positive");
        }
        self.restart.validate()?;
        Ok(())
    }

    pub fn requeue(&self) -> Duration {
        Duration::from_secs(self.requeue_secs)
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::load(&dir.path().join("fabop.toml")).unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
namespaces = ["fabric-a"]
requeue_secs = 5

[restart]
wait_time_secs = 120
"#
        )
        .unwrap();

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.namespaces, vec!["fabric-a".to_string()]);
        assert_eq!(config.requeue_secs, 5);
        assert_eq!(config.error_requeue_secs, 30);
        assert_eq!(config.restart.wait_time_secs, 120);
        assert_eq!(config.restart.timeout_secs, 600);
    }

    #[test]
    fn malformed_file_is_reported_with_its_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "requeue_secs = \"soon\"").unwrap();

        let err = AgentConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn environment_overrides_namespaces_and_level() {
        let env = HashMap::from([
            ("FABOP_NAMESPACE", "fabric-a, fabric-b,"),
            ("FABOP_LOG_LEVEL", "debug"),
        ]);
        let config = AgentConfig::default().merge_with(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.namespaces, vec!["fabric-a", "fabric-b"]);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn zero_requeue_is_rejected() {
        let config = AgentConfig {
            requeue_secs: 0,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(AgentConfig::default().validate().is_ok());
    }
}
