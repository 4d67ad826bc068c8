//! The `permissions:` frontmatter field.

use aw_core::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Scopes GitHub accepts in a `permissions:` block.
pub const PERMISSION_SCOPES: &[&str] = &[
    "actions",
    "checks",
    "contents",
    "deployments",
    "discussions",
    "id-token",
    "issues",
    "packages",
    "pages",
    "pull-requests",
    "repository-projects",
    "security-events",
    "statuses",
];

/// Permissions exactly as written in frontmatter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PermissionsSpec {
    /// `permissions: read-all`
    Shorthand(String),
    /// `permissions: { contents: read, ... }`
    Scopes(IndexMap<String, String>),
}

/// Access level for a permission scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PermissionLevel {
    /// No access
    None,
    /// Read-only access
    Read,
    /// Read and write access
    Write,
}

impl PermissionLevel {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Lowercase YAML form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated `GITHUB_TOKEN` permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    /// `read-all`
    ReadAll,
    /// `write-all`
    WriteAll,
    /// `none`
    NoAccess,
    /// Explicit scope levels, in declaration order
    Scopes(IndexMap<String, PermissionLevel>),
}

impl Default for Permissions {
    fn default() -> Self {
        Self::Scopes(IndexMap::from([(
            "contents".to_string(),
            PermissionLevel::Read,
        )]))
    }
}

impl Permissions {
    /// Build explicit scope permissions from `(scope, level)` pairs.
    #[must_use]
    pub fn scopes<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, PermissionLevel)>,
        S: Into<String>,
    {
        Self::Scopes(pairs.into_iter().map(|(s, l)| (s.into(), l)).collect())
    }

    /// Effective level for `scope`.
    #[must_use]
    pub fn level(&self, scope: &str) -> PermissionLevel {
        match self {
            Self::ReadAll => PermissionLevel::Read,
            Self::WriteAll => PermissionLevel::Write,
            Self::NoAccess => PermissionLevel::None,
            Self::Scopes(map) => map.get(scope).copied().unwrap_or(PermissionLevel::None),
        }
    }

    /// Whether any scope grants write access.
    #[must_use]
    pub fn has_write(&self) -> bool {
        match self {
            Self::WriteAll => true,
            Self::ReadAll | Self::NoAccess => false,
            Self::Scopes(map) => map.values().any(|l| *l == PermissionLevel::Write),
        }
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::ReadAll => serializer.serialize_str("read-all"),
            Self::WriteAll => serializer.serialize_str("write-all"),
            Self::NoAccess => serializer.serialize_str("none"),
            Self::Scopes(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (scope, level) in map {
                    out.serialize_entry(scope, level.as_str())?;
                }
                out.end()
            }
        }
    }
}

/// Validate a permissions block and convert it into [`Permissions`].
///
/// Shorthands are case-sensitive. `all: read` expands to read on every scope
/// and may be combined with other `read`/`write` entries but not with `none`.
/// `all: write` is rejected.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for unknown shorthands, scopes or levels.
pub fn resolve_permissions(spec: &PermissionsSpec) -> Result<Permissions> {
    match spec {
        PermissionsSpec::Shorthand(value) => match value.as_str() {
            "read-all" => Ok(Permissions::ReadAll),
            "write-all" => Ok(Permissions::WriteAll),
            "none" => Ok(Permissions::NoAccess),
            other => Err(Error::config(
                "permissions",
                format!("invalid permissions shorthand: {other:?}"),
                "Use read-all, write-all, none, or a mapping of scopes to read/write/none",
            )),
        },
        PermissionsSpec::Scopes(map) => resolve_scopes(map),
    }
}

fn resolve_scopes(map: &IndexMap<String, String>) -> Result<Permissions> {
    let mut all: Option<PermissionLevel> = None;
    let mut scopes = IndexMap::new();

    for (scope, raw_level) in map {
        let level = PermissionLevel::parse(raw_level).ok_or_else(|| {
            Error::config(
                format!("permissions.{scope}"),
                format!("invalid permission level {raw_level:?} for scope {scope:?}"),
                "Permission levels are read, write or none",
            )
        })?;

        if scope == "all" {
            if level != PermissionLevel::Read {
                return Err(Error::config(
                    "permissions.all",
                    format!("'all: {level}' is not allowed"),
                    "Only 'all: read' is supported; grant write access per scope",
                ));
            }
            all = Some(level);
            continue;
        }

        if !PERMISSION_SCOPES.contains(&scope.as_str()) {
            return Err(Error::config(
                format!("permissions.{scope}"),
                format!("unknown permission scope {scope:?}"),
                format!("Valid scopes: {}", PERMISSION_SCOPES.join(", ")),
            ));
        }
        scopes.insert(scope.clone(), level);
    }

    if let Some(all_level) = all {
        if let Some((scope, _)) = scopes.iter().find(|(_, l)| **l == PermissionLevel::None) {
            return Err(Error::config(
                format!("permissions.{scope}"),
                format!("'all: read' cannot be combined with '{scope}: none'"),
                "Drop 'all: read' and list the scopes explicitly",
            ));
        }
        let mut expanded: IndexMap<String, PermissionLevel> = PERMISSION_SCOPES
            .iter()
            .map(|s| ((*s).to_string(), all_level))
            .collect();
        for (scope, level) in scopes {
            expanded.insert(scope, level);
        }
        return Ok(Permissions::Scopes(expanded));
    }

    Ok(Permissions::Scopes(scopes))
}
