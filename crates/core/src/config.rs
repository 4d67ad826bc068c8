//! Compiler configuration.
//!
//! Hosts may construct a [`CompilerConfig`] in code or load one from a TOML
//! document. Per-repository settings can be layered over organization
//! defaults with [`CompilerConfig::merged_with`].

use crate::Result;
use serde::Deserialize;

/// Runner used when the frontmatter does not name one.
pub const DEFAULT_RUNS_ON: &str = "ubuntu-latest";
/// Runner used by the lightweight activation and safe-output jobs.
pub const DEFAULT_SLIM_RUNNER: &str = "ubuntu-slim";
/// Agent job timeout when the frontmatter does not set one.
pub const DEFAULT_TIMEOUT_MINUTES: u32 = 20;
/// Engine used when the frontmatter does not name one.
pub const DEFAULT_ENGINE: &str = "copilot";

/// Settings that apply to every workflow a compiler instance builds.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompilerConfig {
    /// Engine used when the frontmatter omits `engine`
    #[serde(default)]
    pub default_engine: Option<String>,

    /// Runner for the agent job when the frontmatter omits `runs-on`
    #[serde(default)]
    pub runs_on: Option<String>,

    /// Runner for activation and safe-output jobs
    #[serde(default)]
    pub slim_runner: Option<String>,

    /// Agent job timeout when the frontmatter omits `timeout-minutes`
    #[serde(default)]
    pub timeout_minutes: Option<u32>,

    /// Recompute relative stop times instead of keeping the ones already
    /// present in an existing lock file
    #[serde(default)]
    pub refresh_stop_time: Option<bool>,

    /// Repository hosting the runtime setup action
    #[serde(default)]
    pub action_repository: Option<String>,
}

impl CompilerConfig {
    /// Parse a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TomlParse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Layer `self` over `defaults`; fields set on `self` win.
    #[must_use]
    pub fn merged_with(&self, defaults: &Self) -> Self {
        Self {
            default_engine: self
                .default_engine
                .clone()
                .or_else(|| defaults.default_engine.clone()),
            runs_on: self.runs_on.clone().or_else(|| defaults.runs_on.clone()),
            slim_runner: self
                .slim_runner
                .clone()
                .or_else(|| defaults.slim_runner.clone()),
            timeout_minutes: self.timeout_minutes.or(defaults.timeout_minutes),
            refresh_stop_time: self.refresh_stop_time.or(defaults.refresh_stop_time),
            action_repository: self
                .action_repository
                .clone()
                .or_else(|| defaults.action_repository.clone()),
        }
    }

    /// Effective default engine name.
    #[must_use]
    pub fn engine(&self) -> &str {
        self.default_engine.as_deref().unwrap_or(DEFAULT_ENGINE)
    }

    /// Effective agent runner.
    #[must_use]
    pub fn runner(&self) -> &str {
        self.runs_on.as_deref().unwrap_or(DEFAULT_RUNS_ON)
    }

    /// Effective runner for auxiliary jobs.
    #[must_use]
    pub fn slim_runner(&self) -> &str {
        self.slim_runner.as_deref().unwrap_or(DEFAULT_SLIM_RUNNER)
    }

    /// Effective agent timeout.
    #[must_use]
    pub fn timeout(&self) -> u32 {
        self.timeout_minutes.unwrap_or(DEFAULT_TIMEOUT_MINUTES)
    }

    /// Whether stop times should be recomputed on every compile.
    #[must_use]
    pub fn refresh_stop_time(&self) -> bool {
        self.refresh_stop_time.unwrap_or(false)
    }

    /// Repository that hosts the runtime setup action.
    #[must_use]
    pub fn action_repository(&self) -> &str {
        self.action_repository
            .as_deref()
            .unwrap_or("githubnext/gh-aw")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.engine(), "copilot");
        assert_eq!(config.runner(), "ubuntu-latest");
        assert_eq!(config.slim_runner(), "ubuntu-slim");
        assert_eq!(config.timeout(), 20);
        assert!(!config.refresh_stop_time());
        assert_eq!(config.action_repository(), "githubnext/gh-aw");
    }

    #[test]
    fn test_from_toml() {
        let config = CompilerConfig::from_toml_str(
            r#"
default-engine = "claude"
runs-on = "ubuntu-24.04"
timeout-minutes = 45
refresh-stop-time = true
"#,
        )
        .unwrap();
        assert_eq!(config.engine(), "claude");
        assert_eq!(config.runner(), "ubuntu-24.04");
        assert_eq!(config.timeout(), 45);
        assert!(config.refresh_stop_time());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = CompilerConfig::from_toml_str("engine = \"claude\"").unwrap_err();
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_merge_prefers_self() {
        let org = CompilerConfig {
            default_engine: Some("codex".to_string()),
            runs_on: Some("self-hosted".to_string()),
            ..Default::default()
        };
        let repo = CompilerConfig {
            default_engine: Some("claude".to_string()),
            ..Default::default()
        };
        let merged = repo.merged_with(&org);
        assert_eq!(merged.engine(), "claude");
        assert_eq!(merged.runner(), "self-hosted");
    }
}
