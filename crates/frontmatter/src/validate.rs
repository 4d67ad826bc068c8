//! Semantic validation of parsed frontmatter.
//!
//! Every validator is pure and returns the first problem it finds.
//! [`validate`] runs them in a fixed order so a failed compile always
//! reports the same error for the same input.

use crate::model::ParsedFrontmatter;
use crate::permissions::resolve_permissions;
use crate::safe_outputs::SafeOutputsConfig;
use crate::tools::validate_tools;
use aw_core::time_delta::parse_stop_after_delta;
use aw_core::stop_time::{is_relative_stop_time, parse_absolute_date_time};
use aw_core::{Error, Result};
use tracing::{debug, warn};

/// Accepted values for `create-pull-request.if-no-changes`.
pub const IF_NO_CHANGES_VALUES: &[&str] = &["warn", "error", "ignore"];

/// Check that every label is non-empty and trimmed.
///
/// Absent frontmatter or an empty label list is valid.
///
/// # Errors
///
/// Returns [`Error::EmptyLabel`] or [`Error::WhitespaceInLabel`] for the
/// first offending label.
pub fn validate_labels(frontmatter: Option<&ParsedFrontmatter>) -> Result<()> {
    let Some(frontmatter) = frontmatter else {
        return Ok(());
    };
    for (index, label) in frontmatter.labels.iter().enumerate() {
        if label.is_empty() {
            return Err(Error::EmptyLabel { index });
        }
        if label.trim() != label {
            return Err(Error::WhitespaceInLabel {
                index,
                value: label.clone(),
            });
        }
    }
    Ok(())
}

/// Check the `stop-after` value.
///
/// Relative deadlines must be well-formed deltas within the ceilings and may
/// not use minutes; absolute deadlines must be a recognized date format.
///
/// # Errors
///
/// Returns the delta or date error.
pub fn validate_stop_after(frontmatter: &ParsedFrontmatter) -> Result<()> {
    let Some(value) = frontmatter.stop_after() else {
        return Ok(());
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    if is_relative_stop_time(value) {
        parse_stop_after_delta(value)?;
    } else {
        parse_absolute_date_time(value)?;
    }
    Ok(())
}

/// Whether `s` is a single `${{ ... }}` expression with a non-empty body.
#[must_use]
pub fn is_github_expression(s: &str) -> bool {
    let Some(open) = s.find("${{") else {
        return false;
    };
    let Some(close) = s.rfind("}}") else {
        return false;
    };
    let inner_start = open + 3;
    close > inner_start && !s[inner_start..close].trim().is_empty()
}

fn is_positive_integer(s: &str) -> bool {
    !s.is_empty() && !s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit())
}

/// Check a safe-output `target` value.
///
/// Accepted: empty (the triggering item), `triggering`, `*`, a positive
/// integer without leading zeros, or a `${{ ... }}` expression.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] with `invalid target value for <kind>`.
pub fn validate_safe_output_target(kind: &str, target: &str) -> Result<()> {
    if target.is_empty()
        || target == "triggering"
        || target == "*"
        || is_positive_integer(target)
        || is_github_expression(target)
    {
        return Ok(());
    }
    Err(Error::config(
        format!("safe-outputs.{kind}.target"),
        format!("invalid target value for {kind}: {target:?}"),
        "Use 'triggering', '*', a positive issue number, or a ${{ ... }} expression",
    ))
}

fn check_max(kind: &str, max: Option<u32>) -> Result<()> {
    if max == Some(0) {
        return Err(Error::config(
            format!("safe-outputs.{kind}.max"),
            format!("max for {kind} must be at least 1"),
            "Remove 'max' to use the default or set a positive value",
        ));
    }
    Ok(())
}

/// Check targets, limits and enumerated options of every safe output.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for the first invalid option.
pub fn validate_safe_outputs(config: Option<&SafeOutputsConfig>) -> Result<()> {
    let Some(config) = config else {
        return Ok(());
    };

    if let Some(issue) = &config.create_issue {
        check_max("create-issue", issue.max)?;
    }
    if let Some(comment) = &config.add_comment {
        check_max("add-comment", comment.max)?;
        validate_safe_output_target("add-comment", comment.target.as_deref().unwrap_or(""))?;
    }
    if let Some(labels) = &config.add_labels {
        check_max("add-labels", labels.max)?;
        validate_safe_output_target("add-labels", labels.target.as_deref().unwrap_or(""))?;
        for (index, label) in labels.allowed.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(Error::config(
                    "safe-outputs.add-labels.allowed",
                    format!("allowed label at index {index} cannot be empty"),
                    "Remove the empty entry from 'allowed'",
                ));
            }
        }
    }
    if let Some(update) = &config.update_issue {
        check_max("update-issue", update.max)?;
        validate_safe_output_target("update-issue", update.target.as_deref().unwrap_or(""))?;
        if !(update.status || update.title || update.body) {
            warn!("update-issue allows no fields; enable status, title or body");
        }
    }
    if let Some(pr) = &config.create_pull_request {
        if let Some(value) = pr.if_no_changes.as_deref() {
            if !IF_NO_CHANGES_VALUES.contains(&value) {
                return Err(Error::config(
                    "safe-outputs.create-pull-request.if-no-changes",
                    format!("invalid if-no-changes value: {value:?}"),
                    format!("Use one of: {}", IF_NO_CHANGES_VALUES.join(", ")),
                ));
            }
        }
    }
    if config.max_patch_size == Some(0) {
        return Err(Error::config(
            "safe-outputs.max-patch-size",
            "max-patch-size must be at least 1 KiB",
            "Remove 'max-patch-size' to use the default of 1024 KiB",
        ));
    }
    for key in config.other.keys() {
        debug!(output = %key, "ignoring unsupported safe output");
    }
    Ok(())
}

/// Run every validator in order and return the first error.
///
/// # Errors
///
/// See the individual validators.
pub fn validate(frontmatter: &ParsedFrontmatter) -> Result<()> {
    validate_labels(Some(frontmatter))?;
    validate_stop_after(frontmatter)?;
    frontmatter.reaction()?;
    if let Some(permissions) = &frontmatter.permissions {
        resolve_permissions(permissions)?;
    }
    validate_tools(&frontmatter.tools)?;
    validate_safe_outputs(frontmatter.safe_outputs.as_ref())?;
    if frontmatter.timeout_minutes == Some(0) {
        return Err(Error::config(
            "timeout-minutes",
            "timeout-minutes must be at least 1",
            "Remove 'timeout-minutes' to use the default",
        ));
    }
    Ok(())
}
