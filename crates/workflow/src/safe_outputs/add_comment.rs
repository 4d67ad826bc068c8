//! `add-comment` job.

use super::{SafeOutputJob, not_enabled, require_safe_outputs};
use crate::model::WorkflowData;
use crate::schema::Job;
use aw_core::Result;
use aw_frontmatter::{PermissionLevel, Permissions};

/// Build the job that posts comments requested by the agent.
///
/// When `create-issue` is also enabled the job waits for it so comments can
/// link the new issue.
///
/// # Errors
///
/// Returns [`aw_core::Error::MissingSafeOutputs`] without a safe-outputs
/// section and [`aw_core::Error::InvalidConfig`] when `add-comment` is not
/// enabled.
pub fn build_add_comment_job(data: &WorkflowData, main_job: &str) -> Result<Job> {
    let config = require_safe_outputs(data, "add_comment")?;
    let comment = config
        .add_comment
        .as_ref()
        .ok_or_else(|| not_enabled("add-comment"))?;
    let discussion = comment.discussion.unwrap_or(false);

    let mut scopes = vec![
        ("contents", PermissionLevel::Read),
        ("issues", PermissionLevel::Write),
        ("pull-requests", PermissionLevel::Write),
    ];
    if discussion {
        scopes.push(("discussions", PermissionLevel::Write));
    }

    let mut job = SafeOutputJob::new("add_comment", "Add Comment", Permissions::scopes(scopes));
    if config.create_issue.is_some() {
        job.needs.push("create_issue".to_string());
        job = job
            .env(
                "GH_AW_CREATED_ISSUE_URL",
                "${{ needs.create_issue.outputs.issue_url }}",
            )
            .env(
                "GH_AW_CREATED_ISSUE_NUMBER",
                "${{ needs.create_issue.outputs.issue_number }}",
            );
    }
    if let Some(target) = &comment.target {
        job = job.env("GH_AW_COMMENT_TARGET", target.clone());
    }
    if discussion {
        job = job.env("GH_AW_COMMENT_DISCUSSION", "true");
    }
    job.token = comment.github_token.as_deref();
    job.outputs = &["comment_id", "comment_url"];
    Ok(job.build(data, config, main_job))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(yaml: &str) -> WorkflowData {
        let mut data = WorkflowData::new("w");
        data.safe_outputs = Some(serde_yaml::from_str(yaml).unwrap());
        data
    }

    #[test]
    fn test_waits_for_created_issue() {
        let job = build_add_comment_job(&data("create-issue:\nadd-comment:\n"), "agent").unwrap();
        assert_eq!(job.needs, vec!["agent".to_string(), "create_issue".to_string()]);
        assert!(
            job.steps
                .last()
                .unwrap()
                .env_value("GH_AW_CREATED_ISSUE_URL")
                .is_some()
        );
    }

    #[test]
    fn test_discussion_permission() {
        let job =
            build_add_comment_job(&data("add-comment:\n  discussion: true\n  target: '*'\n"), "agent")
                .unwrap();
        assert_eq!(job.needs, vec!["agent".to_string()]);
        assert_eq!(
            job.permissions.unwrap().level("discussions"),
            PermissionLevel::Write
        );
    }
}
