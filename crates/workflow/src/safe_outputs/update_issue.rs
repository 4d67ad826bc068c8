//! `update-issue` job.

use super::{SafeOutputJob, not_enabled, require_safe_outputs};
use crate::model::WorkflowData;
use crate::schema::Job;
use aw_core::Result;
use aw_frontmatter::{PermissionLevel, Permissions};

fn flag(enabled: bool) -> &'static str {
    if enabled { "true" } else { "false" }
}

/// Build the job that updates an issue's status, title or body.
///
/// # Errors
///
/// Returns [`aw_core::Error::MissingSafeOutputs`] without a safe-outputs
/// section and [`aw_core::Error::InvalidConfig`] when `update-issue` is not
/// enabled.
pub fn build_update_issue_job(data: &WorkflowData, main_job: &str) -> Result<Job> {
    let config = require_safe_outputs(data, "update_issue")?;
    let update = config
        .update_issue
        .as_ref()
        .ok_or_else(|| not_enabled("update-issue"))?;

    let mut job = SafeOutputJob::new(
        "update_issue",
        "Update Issue",
        Permissions::scopes([
            ("contents", PermissionLevel::Read),
            ("issues", PermissionLevel::Write),
        ]),
    )
    .env("GH_AW_UPDATE_STATUS", flag(update.status))
    .env("GH_AW_UPDATE_TITLE", flag(update.title))
    .env("GH_AW_UPDATE_BODY", flag(update.body));
    if let Some(target) = &update.target {
        job = job.env("GH_AW_UPDATE_TARGET", target.clone());
    }
    job.token = update.github_token.as_deref();
    job.outputs = &["issue_number", "issue_url"];
    Ok(job.build(data, config, main_job))
}
