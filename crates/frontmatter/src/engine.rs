//! The `engine:` frontmatter field.

use crate::de::scalar_string;
use indexmap::IndexMap;
use serde::Deserialize;

/// Engine selection as written in frontmatter: a bare name or a mapping.
///
/// ```yaml
/// engine: claude
/// ```
///
/// ```yaml
/// engine:
///   id: copilot
///   version: 0.0.354
///   model: gpt-5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EngineSetting {
    /// `engine: <id>`
    Name(String),
    /// `engine: { id: ..., ... }`
    Config(EngineConfig),
}

impl EngineSetting {
    /// The engine identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Config(config) => &config.id,
        }
    }

    /// Normalize to a full [`EngineConfig`].
    #[must_use]
    pub fn to_config(&self) -> EngineConfig {
        match self {
            Self::Name(name) => EngineConfig {
                id: name.clone(),
                ..Default::default()
            },
            Self::Config(config) => config.clone(),
        }
    }
}

/// Detailed engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Engine identifier (`copilot`, `claude`, `codex`)
    pub id: String,

    /// CLI version to install; numbers are kept in their textual form
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: Option<String>,

    /// Model override passed to the CLI
    #[serde(default)]
    pub model: Option<String>,

    /// Custom executable replacing the installed CLI
    #[serde(default)]
    pub command: Option<String>,

    /// Extra environment for the execution step
    #[serde(default)]
    pub env: IndexMap<String, String>,

    /// Maximum chat turns, for engines that support it
    #[serde(default, deserialize_with = "scalar_string")]
    pub max_turns: Option<String>,

    /// Extra CLI arguments appended to the engine command
    #[serde(default)]
    pub args: Vec<String>,
}
