//! `create-pull-request` job.

use super::{SafeOutputJob, job_token, not_enabled, require_safe_outputs};
use crate::model::WorkflowData;
use crate::schema::Job;
use crate::steps::common::{PATCH_ARTIFACT, TMP_DIR, checkout_step, download_artifact_step};
use crate::steps::git::configure_git_credentials_steps;
use aw_core::Result;
use aw_frontmatter::{PermissionLevel, Permissions};

/// Patch size limit in KiB when `max-patch-size` is not set.
pub const DEFAULT_MAX_PATCH_SIZE: u32 = 1024;

/// Build the job that applies the agent's patch and opens a pull request.
///
/// # Errors
///
/// Returns [`aw_core::Error::MissingSafeOutputs`] without a safe-outputs
/// section and [`aw_core::Error::InvalidConfig`] when `create-pull-request`
/// is not enabled.
pub fn build_create_pull_request_job(data: &WorkflowData, main_job: &str) -> Result<Job> {
    let config = require_safe_outputs(data, "create_pull_request")?;
    let pr = config
        .create_pull_request
        .as_ref()
        .ok_or_else(|| not_enabled("create-pull-request"))?;
    let token = job_token(data, config, pr.github_token.as_deref());

    let mut job = SafeOutputJob::new(
        "create_pull_request",
        "Create Pull Request",
        Permissions::scopes([
            ("contents", PermissionLevel::Write),
            ("issues", PermissionLevel::Write),
            ("pull-requests", PermissionLevel::Write),
        ]),
    )
    .env("GH_AW_WORKFLOW_ID", data.workflow_id())
    .env("GH_AW_BASE_BRANCH", "${{ github.ref_name }}");
    if let Some(prefix) = &pr.title_prefix {
        job = job.env("GH_AW_PR_TITLE_PREFIX", prefix.clone());
    }
    if !pr.labels.is_empty() {
        job = job.env("GH_AW_PR_LABELS", pr.labels.join(","));
    }
    if !pr.reviewers.is_empty() {
        job = job.env("GH_AW_PR_REVIEWERS", pr.reviewers.join(","));
    }
    job = job
        .env("GH_AW_PR_DRAFT", pr.draft.unwrap_or(true).to_string())
        .env(
            "GH_AW_PR_IF_NO_CHANGES",
            pr.if_no_changes.clone().unwrap_or_else(|| "warn".to_string()),
        )
        .env(
            "GH_AW_MAX_PATCH_SIZE",
            config
                .max_patch_size
                .unwrap_or(DEFAULT_MAX_PATCH_SIZE)
                .to_string(),
        );
    if pr.allow_empty {
        job = job.env("GH_AW_PR_ALLOW_EMPTY", "true");
    }

    job.pre_steps.push(download_artifact_step(
        "Download patch artifact",
        PATCH_ARTIFACT,
        &format!("{TMP_DIR}/"),
    ));
    job.pre_steps
        .push(checkout_step().with_input("fetch-depth", 0));
    job.pre_steps
        .extend(configure_git_credentials_steps(Some(token)));
    job.token = pr.github_token.as_deref();
    job.outputs = &["pull_request_number", "pull_request_url", "branch_name"];
    Ok(job.build(data, config, main_job))
}
