//! Compiler version information.

use crate::git::current_git_tag;

/// Version string used by development builds.
pub const DEV_VERSION: &str = "dev";

/// Version of the compiler embedded in generated workflows.
///
/// Release builds pin runtime actions to their tag; development builds track
/// the default branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    version: String,
    release: bool,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self::dev()
    }
}

impl VersionInfo {
    /// A development build.
    #[must_use]
    pub fn dev() -> Self {
        Self {
            version: DEV_VERSION.to_string(),
            release: false,
        }
    }

    /// A release build at `version`.
    #[must_use]
    pub fn release(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release: true,
        }
    }

    /// Detect the version from the environment using [`current_git_tag`].
    #[must_use]
    pub fn detect() -> Self {
        let tag = current_git_tag();
        if tag.is_empty() {
            Self::dev()
        } else {
            Self::release(tag)
        }
    }

    /// The version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether this build was produced from a release.
    #[must_use]
    pub const fn is_release(&self) -> bool {
        self.release
    }

    /// Whether the version refers to a published release that actions can be
    /// pinned to.
    #[must_use]
    pub fn is_released_version(&self) -> bool {
        self.release && !self.version.is_empty() && self.version != DEV_VERSION
    }

    /// Git ref used when referencing the runtime setup action.
    #[must_use]
    pub fn action_ref(&self) -> &str {
        if self.is_released_version() {
            &self.version
        } else {
            "main"
        }
    }
}
