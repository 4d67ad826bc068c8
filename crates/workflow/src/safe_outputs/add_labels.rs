//! `add-labels` job.

use super::{SafeOutputJob, not_enabled, require_safe_outputs};
use crate::model::WorkflowData;
use crate::schema::Job;
use aw_core::Result;
use aw_frontmatter::{PermissionLevel, Permissions};

/// Labels per run when `max` is not set.
pub const DEFAULT_MAX_LABELS: u32 = 3;

/// Build the job that adds labels requested by the agent.
///
/// # Errors
///
/// Returns [`aw_core::Error::MissingSafeOutputs`] without a safe-outputs
/// section and [`aw_core::Error::InvalidConfig`] when `add-labels` is not
/// enabled.
pub fn build_add_labels_job(data: &WorkflowData, main_job: &str) -> Result<Job> {
    let config = require_safe_outputs(data, "add_labels")?;
    let labels = config
        .add_labels
        .as_ref()
        .ok_or_else(|| not_enabled("add-labels"))?;

    let mut job = SafeOutputJob::new(
        "add_labels",
        "Add Labels",
        Permissions::scopes([
            ("contents", PermissionLevel::Read),
            ("issues", PermissionLevel::Write),
            ("pull-requests", PermissionLevel::Write),
        ]),
    )
    .env("GH_AW_LABELS_ALLOWED", labels.allowed.join(","))
    .env(
        "GH_AW_LABELS_MAX_COUNT",
        labels.max.unwrap_or(DEFAULT_MAX_LABELS).to_string(),
    );
    if let Some(target) = &labels.target {
        job = job.env("GH_AW_LABELS_TARGET", target.clone());
    }
    job.token = labels.github_token.as_deref();
    job.outputs = &["labels_added"];
    Ok(job.build(data, config, main_job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aw_core::Error;

    const STAGED_LINE: &str = "          GH_AW_SAFE_OUTPUTS_STAGED: \"true\"";

    fn data(staged: bool) -> WorkflowData {
        let mut data = WorkflowData::new("test-workflow");
        data.safe_outputs = Some(
            serde_yaml::from_str(&format!("add-labels:\nstaged: {staged}\n")).unwrap(),
        );
        data
    }

    #[test]
    fn test_staged_sets_flag_at_env_key_position() {
        let yaml = build_add_labels_job(&data(true), "agent")
            .unwrap()
            .to_fragment()
            .unwrap();
        assert!(
            yaml.lines().any(|line| line == STAGED_LINE),
            "expected staged flag in\n{yaml}"
        );
    }

    #[test]
    fn test_unstaged_omits_flag() {
        let yaml = build_add_labels_job(&data(false), "agent")
            .unwrap()
            .to_fragment()
            .unwrap();
        assert!(
            !yaml
                .lines()
                .any(|line| line.starts_with("          GH_AW_SAFE_OUTPUTS_STAGED:"))
        );
        assert!(!yaml.contains("GH_AW_SAFE_OUTPUTS_STAGED"));
    }

    #[test]
    fn test_missing_safe_outputs() {
        let err = build_add_labels_job(&WorkflowData::new("test-workflow"), "agent").unwrap_err();
        assert!(matches!(err, Error::MissingSafeOutputs { .. }));
        assert!(
            err.to_string()
                .contains("safe-outputs configuration is required")
        );
    }

    #[test]
    fn test_not_enabled() {
        let mut data = WorkflowData::new("test-workflow");
        data.safe_outputs = Some(serde_yaml::from_str("update-issue:\n").unwrap());
        let err = build_add_labels_job(&data, "agent").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_env_and_outputs() {
        let mut data = WorkflowData::new("test-workflow");
        data.safe_outputs = Some(
            serde_yaml::from_str("add-labels:\n  allowed: [bug, triage]\n  max: 2\n  target: '*'\n")
                .unwrap(),
        );
        let job = build_add_labels_job(&data, "agent").unwrap();
        let step = job.steps.last().unwrap();
        assert_eq!(step.env_value("GH_AW_LABELS_ALLOWED"), Some("bug,triage"));
        assert_eq!(step.env_value("GH_AW_LABELS_MAX_COUNT"), Some("2"));
        assert_eq!(step.env_value("GH_AW_LABELS_TARGET"), Some("*"));
        assert_eq!(
            job.outputs.get("labels_added").map(String::as_str),
            Some("${{ steps.add_labels.outputs.labels_added }}")
        );
        assert_eq!(job.permissions.unwrap().level("issues"), PermissionLevel::Write);
    }

    #[test]
    fn test_default_max() {
        let job = build_add_labels_job(&data(false), "agent").unwrap();
        assert_eq!(
            job.steps.last().unwrap().env_value("GH_AW_LABELS_MAX_COUNT"),
            Some("3")
        );
    }
}
