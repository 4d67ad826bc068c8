//! `create-issue` job.

use super::{SafeOutputJob, not_enabled, require_safe_outputs};
use crate::model::WorkflowData;
use crate::schema::Job;
use aw_core::Result;
use aw_core::stop_time::parse_expires;
use aw_frontmatter::{PermissionLevel, Permissions};

/// Build the job that opens issues requested by the agent.
///
/// # Errors
///
/// Returns [`aw_core::Error::MissingSafeOutputs`] without a safe-outputs
/// section and [`aw_core::Error::InvalidConfig`] when `create-issue` is not
/// enabled.
pub fn build_create_issue_job(data: &WorkflowData, main_job: &str) -> Result<Job> {
    let config = require_safe_outputs(data, "create_issue")?;
    let issue = config
        .create_issue
        .as_ref()
        .ok_or_else(|| not_enabled("create-issue"))?;

    let mut job = SafeOutputJob::new(
        "create_issue",
        "Create Issue",
        Permissions::scopes([
            ("contents", PermissionLevel::Read),
            ("issues", PermissionLevel::Write),
        ]),
    );
    if let Some(prefix) = &issue.title_prefix {
        job = job.env("GH_AW_ISSUE_TITLE_PREFIX", prefix.clone());
    }
    if !issue.labels.is_empty() {
        job = job.env("GH_AW_ISSUE_LABELS", issue.labels.join(","));
    }
    if !issue.assignees.is_empty() {
        job = job.env("GH_AW_ISSUE_ASSIGNEES", issue.assignees.join(","));
    }
    let expires = issue.expires.as_ref().map_or(0, parse_expires);
    if expires > 0 {
        job = job.env("GH_AW_ISSUE_EXPIRES", expires.to_string());
    }
    job.token = issue.github_token.as_deref();
    job.outputs = &["issue_number", "issue_url"];
    Ok(job.build(data, config, main_job))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(yaml: &str) -> Job {
        let mut data = WorkflowData::new("w");
        data.safe_outputs = Some(serde_yaml::from_str(yaml).unwrap());
        build_create_issue_job(&data, "agent").unwrap()
    }

    #[test]
    fn test_env() {
        let job = job("create-issue:\n  title-prefix: '[ai] '\n  labels: [automation, ai]\n  expires: 7\n");
        let step = job.steps.last().unwrap();
        assert_eq!(step.env_value("GH_AW_ISSUE_TITLE_PREFIX"), Some("[ai] "));
        assert_eq!(step.env_value("GH_AW_ISSUE_LABELS"), Some("automation,ai"));
        assert_eq!(step.env_value("GH_AW_ISSUE_EXPIRES"), Some("168"));
        assert!(job.outputs.contains_key("issue_url"));
    }

    #[test]
    fn test_expires_disabled() {
        let job = job("create-issue:\n  expires: false\n");
        assert!(job.steps.last().unwrap().env_value("GH_AW_ISSUE_EXPIRES").is_none());
    }
}
