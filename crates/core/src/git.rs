//! Git and GitHub environment helpers.

use std::process::Command;
use tracing::debug;

const TAG_REF_PREFIX: &str = "refs/tags/";

/// Return the release tag the compiler is running from.
///
/// `GITHUB_REF` wins when it is set: a tag ref yields the tag name and any
/// other ref yields an empty string. Without `GITHUB_REF` the local checkout
/// is asked via `git describe`; failures yield an empty string.
#[must_use]
pub fn current_git_tag() -> String {
    if let Ok(github_ref) = std::env::var("GITHUB_REF") {
        return github_ref
            .strip_prefix(TAG_REF_PREFIX)
            .map(str::to_string)
            .unwrap_or_default();
    }
    describe_exact_tag().unwrap_or_default()
}

fn describe_exact_tag() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--exact-match"])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!(
            "git describe failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether an error message looks like a GitHub authentication failure.
#[must_use]
pub fn is_auth_error(message: &str) -> bool {
    const MARKERS: &[&str] = &[
        "gh_token",
        "github_token",
        "authentication",
        "not logged into",
        "unauthorized",
        "forbidden",
        "permission denied",
    ];
    let lower = message.to_lowercase();
    MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Whether `s` is a non-empty string of hexadecimal digits (e.g. a commit SHA).
#[must_use]
pub fn is_hex_string(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}
