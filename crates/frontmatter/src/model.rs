//! The typed frontmatter record.

use crate::de::describe;
use crate::engine::EngineSetting;
use crate::permissions::PermissionsSpec;
use crate::safe_outputs::SafeOutputsConfig;
use crate::tools::Tools;
use aw_core::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

/// Reactions GitHub accepts, plus `none` to disable the reaction step.
pub const VALID_REACTIONS: &[&str] = &[
    "+1", "-1", "laugh", "confused", "heart", "hooray", "rocket", "eyes", "none",
];

/// Validated workflow header.
///
/// Keys the compiler does not recognize are kept in [`extra`](Self::extra)
/// in their original order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParsedFrontmatter {
    /// Workflow display name
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Trigger configuration, passed through to the `on:` key
    #[serde(default)]
    pub on: Option<Value>,

    /// Permissions for the agent job
    #[serde(default)]
    pub permissions: Option<PermissionsSpec>,

    /// Labels used to categorize the workflow
    #[serde(default)]
    pub labels: Vec<String>,

    /// AI engine selection
    #[serde(default)]
    pub engine: Option<EngineSetting>,

    /// Tools available to the agent
    #[serde(default)]
    pub tools: Tools,

    /// Safe-output policy
    #[serde(default)]
    pub safe_outputs: Option<SafeOutputsConfig>,

    /// Deadline after which the workflow stops running
    #[serde(default)]
    pub stop_after: Option<String>,

    /// Runner for the agent job: a label, a list of labels or a mapping
    #[serde(default)]
    pub runs_on: Option<Value>,

    /// Agent job timeout
    #[serde(default)]
    pub timeout_minutes: Option<u32>,

    /// Workflow-level environment
    #[serde(default)]
    pub env: IndexMap<String, Value>,

    /// Custom steps run before the agent
    #[serde(default)]
    pub steps: Vec<Value>,

    /// Network access policy for the agent
    #[serde(default)]
    pub network: Option<NetworkSetting>,

    /// Token override for every GitHub interaction
    #[serde(default)]
    pub github_token: Option<String>,

    /// Extra steps run after secret redaction
    #[serde(default)]
    pub secret_masking: Option<SecretMasking>,

    /// Run-level concurrency override
    #[serde(default)]
    pub concurrency: Option<Value>,

    /// Condition gating the agent job
    #[serde(default, rename = "if")]
    pub if_condition: Option<String>,

    /// Unknown keys
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ParsedFrontmatter {
    /// The `stop-after` value, from the top level or nested under `on:`.
    #[must_use]
    pub fn stop_after(&self) -> Option<String> {
        if let Some(value) = self.stop_after.as_deref() {
            return Some(value.to_string());
        }
        match self.on.as_ref()?.get("stop-after")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The `on.reaction` value, normalized to one of [`VALID_REACTIONS`].
    ///
    /// YAML reads an unquoted `+1` or `-1` as a number, so `1` and `-1` map
    /// back to `+1` and `-1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for any other value.
    pub fn reaction(&self) -> Result<Option<String>> {
        let Some(value) = self.on.as_ref().and_then(|on| on.get("reaction")) else {
            return Ok(None);
        };
        let reaction = match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(v) if (v - 1.0).abs() < f64::EPSILON => Some("+1".to_string()),
                Some(v) if (v + 1.0).abs() < f64::EPSILON => Some("-1".to_string()),
                _ => None,
            },
            _ => None,
        };
        match reaction {
            Some(r) if VALID_REACTIONS.contains(&r.as_str()) => Ok(Some(r)),
            _ => Err(Error::config(
                "on.reaction",
                format!(
                    "invalid reaction: {}",
                    value
                        .as_str()
                        .map_or_else(|| describe(value).to_string(), |s| format!("'{s}'"))
                ),
                format!("Use one of: {}", VALID_REACTIONS.join(", ")),
            )),
        }
    }

    /// The engine identifier, if one is named.
    #[must_use]
    pub fn engine_id(&self) -> Option<&str> {
        self.engine.as_ref().map(EngineSetting::id)
    }

    /// Network policy, defaulting to the standard allow-list.
    #[must_use]
    pub fn network(&self) -> NetworkSetting {
        self.network.clone().unwrap_or_default()
    }
}

/// `network:` as written in frontmatter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NetworkSetting {
    /// `network: defaults`
    Preset(String),
    /// `network: { allowed: [...], firewall: true }`
    Custom(NetworkConfig),
}

impl Default for NetworkSetting {
    fn default() -> Self {
        Self::Preset("defaults".to_string())
    }
}

impl NetworkSetting {
    /// Whether the agent command runs behind the egress firewall.
    #[must_use]
    pub fn firewall_enabled(&self) -> bool {
        match self {
            Self::Preset(_) => false,
            Self::Custom(config) => config.firewall.unwrap_or(false),
        }
    }

    /// Domains the agent may reach, sorted and deduplicated.
    ///
    /// The `defaults` preset (whether named directly or listed inside
    /// `allowed`) expands to [`DEFAULT_ALLOWED_DOMAINS`].
    #[must_use]
    pub fn allowed_domains(&self) -> Vec<String> {
        let entries: Vec<&str> = match self {
            Self::Preset(name) => vec![name.as_str()],
            Self::Custom(config) => config.allowed.iter().map(String::as_str).collect(),
        };
        let mut domains: Vec<String> = Vec::new();
        for entry in entries {
            if entry == "defaults" {
                domains.extend(DEFAULT_ALLOWED_DOMAINS.iter().map(|d| (*d).to_string()));
            } else {
                domains.push(entry.to_string());
            }
        }
        domains.sort();
        domains.dedup();
        domains
    }
}

/// Detailed network policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Allowed domains or presets
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Route agent traffic through the egress firewall
    #[serde(default)]
    pub firewall: Option<bool>,
}

/// Domains included by the `defaults` network preset.
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "api.github.com",
    "github.com",
    "raw.githubusercontent.com",
    "registry.npmjs.org",
];

/// `secret-masking:` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SecretMasking {
    /// Steps appended after the built-in secret redaction step
    #[serde(default)]
    pub steps: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fm(yaml: &str) -> ParsedFrontmatter {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_stop_after_top_level_wins() {
        let parsed = fm("stop-after: '+1d'\non:\n  stop-after: '+2d'\n");
        assert_eq!(parsed.stop_after().as_deref(), Some("+1d"));
    }

    #[test]
    fn test_stop_after_under_on() {
        let parsed = fm("on:\n  workflow_dispatch:\n  stop-after: '+48h'\n");
        assert_eq!(parsed.stop_after().as_deref(), Some("+48h"));
        assert_eq!(fm("on: push").stop_after(), None);
    }

    #[test]
    fn test_reaction_values() {
        assert_eq!(fm("on:\n  issues:\n  reaction: eyes\n").reaction().unwrap().as_deref(), Some("eyes"));
        assert_eq!(fm("on:\n  reaction: +1\n").reaction().unwrap().as_deref(), Some("+1"));
        assert_eq!(fm("on:\n  reaction: -1\n").reaction().unwrap().as_deref(), Some("-1"));
        assert_eq!(fm("on:\n  reaction: '+1'\n").reaction().unwrap().as_deref(), Some("+1"));
        assert_eq!(fm("on:\n  reaction: 1.0\n").reaction().unwrap().as_deref(), Some("+1"));
        assert_eq!(fm("on:\n  reaction: none\n").reaction().unwrap().as_deref(), Some("none"));
        assert_eq!(fm("on: push").reaction().unwrap(), None);
    }

    #[test]
    fn test_invalid_reactions() {
        for yaml in [
            "on:\n  reaction: thumbsup\n",
            "on:\n  reaction: HEART\n",
            "on:\n  reaction: ''\n",
            "on:\n  reaction: 2\n",
            "on:\n  reaction: 0\n",
            "on:\n  reaction: true\n",
            "on:\n  reaction:\n",
        ] {
            let err = fm(yaml).reaction().unwrap_err();
            assert!(matches!(err, Error::InvalidConfig { .. }), "{yaml}");
        }
    }

    #[test]
    fn test_if_condition_field() {
        let parsed = fm("if: github.actor != 'bot'\n");
        assert_eq!(parsed.if_condition.as_deref(), Some("github.actor != 'bot'"));
        assert!(parsed.extra.is_empty());
    }

    #[test]
    fn test_unknown_keys_preserved_in_order() {
        let parsed = fm("name: x\nzeta: 1\nalpha: 2\n");
        let keys: Vec<&str> = parsed.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_network_defaults() {
        let parsed = fm("name: x");
        let network = parsed.network();
        assert!(!network.firewall_enabled());
        assert!(network.allowed_domains().contains(&"github.com".to_string()));
    }

    #[test]
    fn test_network_custom_sorted() {
        let parsed = fm("network:\n  allowed: [zeta.example.com, defaults, alpha.example.com]\n  firewall: true\n");
        let network = parsed.network();
        assert!(network.firewall_enabled());
        let domains = network.allowed_domains();
        assert_eq!(domains.first().map(String::as_str), Some("alpha.example.com"));
        assert_eq!(domains.last().map(String::as_str), Some("zeta.example.com"));
        let mut sorted = domains.clone();
        sorted.sort();
        assert_eq!(domains, sorted);
    }

    #[test]
    fn test_secret_masking_steps() {
        let parsed = fm("secret-masking:\n  steps:\n    - name: Extra\n      run: echo hi\n");
        assert_eq!(parsed.secret_masking.unwrap().steps.len(), 1);
    }
}
