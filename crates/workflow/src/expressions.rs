//! GitHub expressions allowed in the prompt body.
//!
//! The prompt is written to disk through a heredoc whose values GitHub
//! substitutes before the shell runs, so only context values that cannot
//! carry attacker-controlled text are permitted.

use aw_core::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\{\{(.*?)\}\}").expect("expression regex is valid"));

/// Context paths the prompt may reference.
pub const ALLOWED_EXPRESSIONS: &[&str] = &[
    "github.actor",
    "github.event.after",
    "github.event.before",
    "github.event.comment.id",
    "github.event.discussion.number",
    "github.event.issue.number",
    "github.event.pull_request.number",
    "github.event.release.tag_name",
    "github.event.workflow_run.id",
    "github.job",
    "github.owner",
    "github.repository",
    "github.run_id",
    "github.run_number",
    "github.server_url",
    "github.workflow",
    "github.workspace",
    "needs.activation.outputs.text",
];

const ALLOWED_PREFIXES: &[&str] = &["github.event.inputs.", "inputs."];

/// Whether `expression` (the text between `${{` and `}}`) may appear in a
/// prompt.
#[must_use]
pub fn is_allowed_expression(expression: &str) -> bool {
    let expression = expression.trim();
    if ALLOWED_EXPRESSIONS.contains(&expression) {
        return true;
    }
    ALLOWED_PREFIXES.iter().any(|prefix| {
        expression.strip_prefix(prefix).is_some_and(|rest| {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
    })
}

/// Reject any `${{ }}` expression in `markdown` outside the allowlist.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] naming the first disallowed expression.
pub fn validate_expression_safety(markdown: &str) -> Result<()> {
    for capture in EXPRESSION.captures_iter(markdown) {
        let inner = capture.get(1).map_or("", |m| m.as_str());
        if !is_allowed_expression(inner) {
            return Err(Error::config(
                "markdown",
                format!("unauthorized expression in prompt: ${{{{{inner}}}}}"),
                "Only simple github context values such as github.repository or github.event.issue.number may be used in the prompt",
            ));
        }
    }
    Ok(())
}

/// Conditions longer than this are broken across lines.
pub const MAX_CONDITION_LINE: usize = 120;

/// Normalize a user-written job condition.
///
/// A leading `if:` copied along with the condition is dropped; blank
/// conditions become `None`.
#[must_use]
pub fn clean_if_expression(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let expression = trimmed.strip_prefix("if:").map_or(trimmed, str::trim);
    (!expression.is_empty()).then(|| expression.to_string())
}

/// Break a long condition after each top-level `||` or `&&`.
///
/// Operators inside quotes or parentheses stay put. Short or already
/// multi-line conditions are returned unchanged.
#[must_use]
pub fn break_long_condition(condition: &str) -> String {
    if condition.len() <= MAX_CONDITION_LINE || condition.contains('\n') {
        return condition.to_string();
    }
    let bytes = condition.as_bytes();
    let mut lines = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth = depth.saturating_sub(1),
            b'|' | b'&' if !in_quote && depth == 0 && bytes.get(i + 1) == Some(&bytes[i]) => {
                lines.push(condition[start..i + 2].trim());
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    let rest = condition[start..].trim();
    if lines.is_empty() || rest.is_empty() {
        return condition.to_string();
    }
    lines.push(rest);
    lines.join("\n")
}
