//! Safe-output jobs.
//!
//! The agent job runs with read-only permissions and records the GitHub
//! writes it wants as JSON lines. Each enabled output kind gets its own job
//! that downloads the sanitized output and applies it with a narrowly scoped
//! token. All of them share the shape built by [`SafeOutputJob::build`].

mod add_comment;
mod add_labels;
mod create_issue;
mod create_pull_request;
pub mod tools;
mod update_issue;

pub use add_comment::build_add_comment_job;
pub use add_labels::build_add_labels_job;
pub use create_issue::build_create_issue_job;
pub use create_pull_request::build_create_pull_request_job;
pub use tools::{safe_output_tools, safe_output_tools_json};
pub use update_issue::build_update_issue_job;

use crate::model::WorkflowData;
use crate::schema::{Job, Step};
use crate::steps::common::{
    SAFE_OUTPUTS_DIR, agent_output_steps, github_script_step, setup_scripts_step,
};
use crate::tokens::safe_outputs_token;
use aw_core::{Error, Result};
use aw_frontmatter::{Permissions, SafeOutputsConfig};
use indexmap::IndexMap;
use serde_json::json;
use tracing::debug;

/// Timeout for every safe-output job.
pub const SAFE_OUTPUT_TIMEOUT_MINUTES: u32 = 10;

/// Environment key set on safe-output steps in preview mode.
pub const STAGED_ENV: &str = "GH_AW_SAFE_OUTPUTS_STAGED";

/// The safe-output policy, or [`Error::MissingSafeOutputs`].
pub(crate) fn require_safe_outputs<'a>(
    data: &'a WorkflowData,
    job: &str,
) -> Result<&'a SafeOutputsConfig> {
    data.safe_outputs
        .as_ref()
        .ok_or_else(|| Error::missing_safe_outputs(job))
}

/// Error for an emitter invoked without its output kind enabled.
pub(crate) fn not_enabled(key: &str) -> Error {
    Error::config(
        format!("safe-outputs.{key}"),
        format!("{key} is not enabled in safe-outputs"),
        format!("Add '{key}:' under 'safe-outputs'"),
    )
}

/// Token for a safe-output job: the per-kind override, then the
/// `safe-outputs.github-token`, then the workflow `github-token`.
pub(crate) fn job_token<'a>(
    data: &'a WorkflowData,
    config: &'a SafeOutputsConfig,
    custom: Option<&'a str>,
) -> &'a str {
    safe_outputs_token(
        custom.or(config.github_token.as_deref()),
        data.github_token.as_deref(),
    )
}

/// Shape of one safe-output job.
pub(crate) struct SafeOutputJob<'a> {
    /// Job id, output type and runtime script name (`add_labels`)
    pub kind: &'static str,
    /// Display name of the github-script step
    pub step_name: &'static str,
    /// Job permissions
    pub permissions: Permissions,
    /// Token override for this output kind
    pub token: Option<&'a str>,
    /// Kind-specific step environment, in emission order
    pub env: IndexMap<String, String>,
    /// Step outputs re-exported by the job
    pub outputs: &'static [&'static str],
    /// Steps run between the agent-output download and the script
    pub pre_steps: Vec<Step>,
    /// Extra job dependencies beyond the agent job
    pub needs: Vec<String>,
}

impl<'a> SafeOutputJob<'a> {
    pub fn new(kind: &'static str, step_name: &'static str, permissions: Permissions) -> Self {
        Self {
            kind,
            step_name,
            permissions,
            token: None,
            env: IndexMap::new(),
            outputs: &[],
            pre_steps: Vec::new(),
            needs: Vec::new(),
        }
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self, data: &WorkflowData, config: &SafeOutputsConfig, main_job: &str) -> Job {
        let token = job_token(data, config, self.token);

        let mut step = github_script_step(self.step_name, self.kind, Some(token))
            .with_id(self.kind)
            .with_env("GH_AW_AGENT_OUTPUT", "${{ env.GH_AW_AGENT_OUTPUT }}")
            .with_env("GH_AW_WORKFLOW_NAME", data.name.clone());
        for (key, value) in self.env {
            step = step.with_env(key, value);
        }
        if config.staged {
            step = step.with_env(STAGED_ENV, "true");
        }

        let mut job = Job::new(self.kind, data.slim_runner.as_str())
            .with_need(main_job)
            .with_if(format!(
                "(!cancelled()) && (contains(needs.{main_job}.outputs.output_types, '{}'))",
                self.kind
            ))
            .with_permissions(self.permissions)
            .with_timeout(SAFE_OUTPUT_TIMEOUT_MINUTES)
            .with_step(setup_scripts_step(&data.setup_action))
            .with_steps(agent_output_steps())
            .with_steps(self.pre_steps)
            .with_step(step);
        for need in self.needs {
            job = job.with_need(need);
        }
        for output in self.outputs {
            job = job.with_output(*output, format!("${{{{ steps.{}.outputs.{output} }}}}", self.kind));
        }
        debug!(job = self.kind, staged = config.staged, "built safe-output job");
        job
    }
}

/// Every enabled safe-output job, in emission order.
///
/// # Errors
///
/// Propagates emitter errors.
pub fn build_safe_output_jobs(data: &WorkflowData, main_job: &str) -> Result<Vec<Job>> {
    let Some(config) = data.safe_outputs.as_ref() else {
        return Ok(Vec::new());
    };
    let mut jobs = Vec::new();
    if config.create_issue.is_some() {
        jobs.push(build_create_issue_job(data, main_job)?);
    }
    if config.add_comment.is_some() {
        jobs.push(build_add_comment_job(data, main_job)?);
    }
    if config.add_labels.is_some() {
        jobs.push(build_add_labels_job(data, main_job)?);
    }
    if config.update_issue.is_some() {
        jobs.push(build_update_issue_job(data, main_job)?);
    }
    if config.create_pull_request.is_some() {
        jobs.push(build_create_pull_request_job(data, main_job)?);
    }
    Ok(jobs)
}

/// Runtime configuration read by the safe-outputs MCP server and scripts.
#[must_use]
pub fn safe_outputs_runtime_config(config: &SafeOutputsConfig) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    if let Some(issue) = &config.create_issue {
        out.insert("create_issue".into(), json!({ "max": issue.max.unwrap_or(1) }));
    }
    if let Some(comment) = &config.add_comment {
        out.insert("add_comment".into(), json!({ "max": comment.max.unwrap_or(1) }));
    }
    if let Some(labels) = &config.add_labels {
        out.insert(
            "add_labels".into(),
            json!({ "allowed": labels.allowed, "max": labels.max.unwrap_or(add_labels::DEFAULT_MAX_LABELS) }),
        );
    }
    if let Some(update) = &config.update_issue {
        out.insert("update_issue".into(), json!({ "max": update.max.unwrap_or(1) }));
    }
    if config.create_pull_request.is_some() {
        out.insert("create_pull_request".into(), json!({}));
    }
    out.insert("missing_tool".into(), json!({}));
    out.insert("noop".into(), json!({ "max": 1 }));
    serde_json::Value::Object(out)
}

/// Write the safe-outputs runtime config and tool catalogue for the MCP
/// server. `None` when no output kind is enabled.
///
/// # Errors
///
/// Returns [`Error::Emit`] when either document cannot be serialized.
pub fn safe_outputs_setup_step(data: &WorkflowData) -> Result<Option<Step>> {
    let Some(config) = data.safe_outputs.as_ref().filter(|c| c.has_any()) else {
        return Ok(None);
    };
    let runtime = serde_json::to_string(&safe_outputs_runtime_config(config))
        .map_err(|e| Error::emit(format!("failed to serialize safe-outputs config: {e}")))?;
    let tools = serde_json::to_string(&safe_output_tools(config))
        .map_err(|e| Error::emit(format!("failed to serialize safe-outputs tools: {e}")))?;
    let script = format!(
        "mkdir -p {SAFE_OUTPUTS_DIR}\n\
         cat > {SAFE_OUTPUTS_DIR}/config.json << 'GH_AW_SAFE_OUTPUTS_CONFIG_EOF'\n\
         {runtime}\n\
         GH_AW_SAFE_OUTPUTS_CONFIG_EOF\n\
         cat > {SAFE_OUTPUTS_DIR}/tools.json << 'GH_AW_SAFE_OUTPUTS_TOOLS_EOF'\n\
         {tools}\n\
         GH_AW_SAFE_OUTPUTS_TOOLS_EOF\n"
    );
    Ok(Some(Step::run(script).with_name("Setup Safe Outputs")))
}
