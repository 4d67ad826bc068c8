//! The `tools:` frontmatter field.

use crate::de::describe;
use aw_core::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

/// Commands allowed when `bash:` is given without a list.
pub const DEFAULT_BASH_COMMANDS: &[&str] = &[
    "echo", "ls", "pwd", "cat", "head", "tail", "grep", "wc", "sort", "uniq", "date",
];

/// Toolsets enabled when `github:` does not list any, and what `default`
/// and `action-friendly` expand to.
pub const DEFAULT_GITHUB_TOOLSETS: &[&str] = &["context", "repos", "issues", "pull_requests"];

/// Every toolset the GitHub MCP server knows.
pub const GITHUB_TOOLSETS: &[&str] = &[
    "context",
    "repos",
    "issues",
    "pull_requests",
    "actions",
    "code_security",
    "dependabot",
    "discussions",
    "experiments",
    "gists",
    "labels",
    "notifications",
    "orgs",
    "projects",
    "secret_protection",
    "security_advisories",
    "stargazers",
    "users",
    "search",
];

const TOOLSET_KEYWORDS: &[&str] = &["default", "action-friendly", "all"];

/// Expand toolset keywords.
///
/// `default` and `action-friendly` become [`DEFAULT_GITHUB_TOOLSETS`] in
/// place; `all` is kept on its own since the server expands it. Entries are
/// trimmed and deduplicated in first-seen order.
#[must_use]
pub fn expand_github_toolsets(toolsets: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !expanded.iter().any(|t| t == name) {
            expanded.push(name.to_string());
        }
    };
    for name in toolsets.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        match name {
            "all" => return vec!["all".to_string()],
            "default" | "action-friendly" => DEFAULT_GITHUB_TOOLSETS.iter().for_each(|t| push(t)),
            other => push(other),
        }
    }
    if expanded.is_empty() {
        return DEFAULT_GITHUB_TOOLSETS.iter().map(|s| (*s).to_string()).collect();
    }
    expanded
}

/// Shell access granted to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BashTool {
    /// Any command (`bash: true`, `bash: ["*"]`)
    All,
    /// Only the listed command prefixes
    Commands(Vec<String>),
}

/// GitHub MCP server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubTool {
    /// Toolsets to enable
    #[serde(default)]
    pub toolsets: Vec<String>,
    /// Individual tools to allow
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Start the server in read-only mode
    #[serde(default)]
    pub read_only: bool,
    /// Token override for the MCP server
    #[serde(default)]
    pub github_token: Option<String>,
}

impl GitHubTool {
    /// Toolsets to enable, with keywords expanded.
    #[must_use]
    pub fn effective_toolsets(&self) -> Vec<String> {
        expand_github_toolsets(&self.toolsets)
    }

    /// Reject toolset names the server does not know.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first unknown toolset.
    pub fn validate_toolsets(&self) -> Result<()> {
        let unknown = self.toolsets.iter().map(|t| t.trim()).find(|t| {
            !t.is_empty() && !GITHUB_TOOLSETS.contains(t) && !TOOLSET_KEYWORDS.contains(t)
        });
        match unknown {
            Some(name) => Err(Error::config(
                "tools.github.toolsets",
                format!("unknown GitHub toolset '{name}'"),
                format!(
                    "Valid toolsets: {}, {}",
                    TOOLSET_KEYWORDS.join(", "),
                    GITHUB_TOOLSETS.join(", ")
                ),
            )),
            None => Ok(()),
        }
    }
}

/// Tool configuration keyed by tool name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Tools(IndexMap<String, Value>);

impl Tools {
    /// Wrap an existing mapping.
    #[must_use]
    pub fn new(map: IndexMap<String, Value>) -> Self {
        Self(map)
    }

    /// Whether `name` is configured and not explicitly disabled.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0
            .get(name)
            .is_some_and(|v| !matches!(v, Value::Bool(false)))
    }

    /// Raw configuration for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Configured tool names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether no tools are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shell access, if any.
    #[must_use]
    pub fn bash(&self) -> Option<BashTool> {
        match self.0.get("bash")? {
            Value::Bool(false) => None,
            Value::Bool(true) => Some(BashTool::All),
            Value::Sequence(items) => {
                let commands: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                if commands.iter().any(|c| c == "*" || c == ":*") {
                    Some(BashTool::All)
                } else {
                    Some(BashTool::Commands(commands))
                }
            }
            _ => Some(BashTool::Commands(
                DEFAULT_BASH_COMMANDS.iter().map(|s| (*s).to_string()).collect(),
            )),
        }
    }

    /// GitHub MCP server settings, if enabled.
    #[must_use]
    pub fn github(&self) -> Option<GitHubTool> {
        match self.0.get("github")? {
            Value::Bool(false) => None,
            Value::Mapping(_) => {
                serde_yaml::from_value(self.0.get("github")?.clone()).ok()
            }
            _ => Some(GitHubTool::default()),
        }
    }

    /// Whether file editing tools are enabled.
    #[must_use]
    pub fn has_edit(&self) -> bool {
        self.contains("edit")
    }

    /// Whether the web-fetch tool is enabled.
    #[must_use]
    pub fn has_web_fetch(&self) -> bool {
        self.contains("web-fetch")
    }

    /// Whether the web-search tool is enabled.
    #[must_use]
    pub fn has_web_search(&self) -> bool {
        self.contains("web-search")
    }

    /// Languages declared for the Serena language service, sorted and
    /// deduplicated.
    #[must_use]
    pub fn serena_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = match self.0.get("serena") {
            Some(Value::Sequence(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::Mapping(map)) => match map.get("languages") {
                Some(Value::Sequence(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                Some(Value::Mapping(langs)) => langs
                    .keys()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        languages.sort();
        languages.dedup();
        languages
    }
}

/// Check the shape of every known tool entry.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] naming the first malformed tool.
pub fn validate_tools(tools: &Tools) -> Result<()> {
    for (name, value) in &tools.0 {
        let ok = match name.as_str() {
            "bash" => match value {
                Value::Null | Value::Bool(_) => true,
                Value::Sequence(items) => items.iter().all(Value::is_string),
                _ => false,
            },
            "github" => match value {
                Value::Null | Value::Bool(_) => true,
                Value::Mapping(_) => match serde_yaml::from_value::<GitHubTool>(value.clone()) {
                    Ok(github) => {
                        github.validate_toolsets()?;
                        true
                    }
                    Err(_) => false,
                },
                _ => false,
            },
            "serena" => matches!(
                value,
                Value::Null | Value::Sequence(_) | Value::Mapping(_)
            ),
            "edit" | "web-fetch" | "web-search" => {
                matches!(value, Value::Null | Value::Bool(_) | Value::Mapping(_))
            }
            _ => true,
        };
        if !ok {
            return Err(Error::config(
                format!("tools.{name}"),
                format!("invalid configuration for tool '{name}': unexpected {}", describe(value)),
                "See the tools reference for the accepted shapes",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(yaml: &str) -> Tools {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_bash_variants() {
        assert_eq!(tools("bash: true").bash(), Some(BashTool::All));
        assert_eq!(tools("bash: ['*']").bash(), Some(BashTool::All));
        assert_eq!(tools("bash: false").bash(), None);
        assert_eq!(
            tools("bash: [git status, ls]").bash(),
            Some(BashTool::Commands(vec!["git status".into(), "ls".into()]))
        );
        match tools("bash:").bash() {
            Some(BashTool::Commands(cmds)) => assert!(cmds.contains(&"echo".to_string())),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(tools("edit:").bash(), None);
    }

    #[test]
    fn test_github_tool() {
        let gh = tools("github:").github().unwrap();
        assert_eq!(gh.effective_toolsets(), DEFAULT_GITHUB_TOOLSETS);

        let gh = tools("github:\n  toolsets: [repos, issues]\n  read-only: true\n")
            .github()
            .unwrap();
        assert_eq!(gh.toolsets, vec!["repos".to_string(), "issues".to_string()]);
        assert!(gh.read_only);
        assert!(tools("edit:").github().is_none());
    }

    fn expand(names: &[&str]) -> Vec<String> {
        let names: Vec<String> = names.iter().map(|s| (*s).to_string()).collect();
        expand_github_toolsets(&names)
    }

    #[test]
    fn test_toolset_expansion() {
        assert_eq!(expand(&[]), DEFAULT_GITHUB_TOOLSETS);
        assert_eq!(expand(&["default"]), DEFAULT_GITHUB_TOOLSETS);
        assert_eq!(expand(&["action-friendly"]), DEFAULT_GITHUB_TOOLSETS);
        assert_eq!(expand(&["repos", "issues"]), vec!["repos", "issues"]);
        assert_eq!(
            expand(&["actions", "default", "discussions"]),
            vec!["actions", "context", "repos", "issues", "pull_requests", "discussions"]
        );
        assert_eq!(
            expand(&["default", "repos", "default"]),
            DEFAULT_GITHUB_TOOLSETS
        );
        assert_eq!(
            expand(&[" default ", " users "]),
            vec!["context", "repos", "issues", "pull_requests", "users"]
        );
        assert_eq!(expand(&["all", "repos"]), vec!["all"]);
    }

    #[test]
    fn test_unknown_toolset_rejected() {
        let err = validate_tools(&tools("github:\n  toolsets: [repos, isues]\n")).unwrap_err();
        assert!(err.to_string().contains("unknown GitHub toolset 'isues'"));
        assert!(validate_tools(&tools("github:\n  toolsets: [default, all, users]\n")).is_ok());
        assert_eq!(GITHUB_TOOLSETS.len(), 19);
    }

    #[test]
    fn test_serena_languages_sorted() {
        assert_eq!(
            tools("serena: [typescript, go, python, go]").serena_languages(),
            vec!["go", "python", "typescript"]
        );
        assert_eq!(
            tools("serena:\n  languages:\n    rust: {}\n    go: {}\n").serena_languages(),
            vec!["go", "rust"]
        );
        assert!(tools("edit:").serena_languages().is_empty());
    }

    #[test]
    fn test_contains_respects_false() {
        let t = tools("edit:\nweb-fetch: false\n");
        assert!(t.has_edit());
        assert!(!t.has_web_fetch());
        assert!(!t.has_web_search());
    }

    #[test]
    fn test_validate_tools() {
        assert!(validate_tools(&tools("bash: [ls]\ngithub:\n  toolsets: [repos]\n")).is_ok());
        let err = validate_tools(&tools("bash: 42")).unwrap_err();
        assert!(err.to_string().contains("tool 'bash'"));
        assert!(validate_tools(&tools("github: nope")).is_err());
        assert!(validate_tools(&tools("github:\n  toolsets: repos\n")).is_err());
    }
}
