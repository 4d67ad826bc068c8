//! Workflow compiler.
//!
//! Turns an agentic workflow document into the text of its `.lock.yml`:
//!
//! 1. split and parse the frontmatter, then validate it
//! 2. resolve it into a [`WorkflowData`]
//! 3. emit the job graph (`pre_activation`, `activation`, `agent` and the
//!    safe-output jobs)
//! 4. assemble the YAML document
//!
//! The compiler never writes files. It reports the lock path to the
//! configured [`FileTracker`] and returns the text.

use crate::engine::Engine;
use crate::engine::mcp::mcp_setup_step;
use crate::expressions::validate_expression_safety;
use crate::jobs::JobManager;
use crate::model::{WorkflowBuilder, WorkflowData};
use crate::safe_outputs::{build_safe_output_jobs, safe_outputs_setup_step};
use crate::schema::{Concurrency, Job, Step};
use crate::step_order::StepOrderTracker;
use crate::steps::common::{
    AGENT_LOGS_DIR, AGENT_OUTPUT_ARTIFACT, AGENT_STDIO_LOG, FIREWALL_LOGS_DIR, MCP_LOGS_DIR,
    PATCH_ARTIFACT, PATCH_PATH, PROMPT_PATH, SAFE_OUTPUTS_JSONL, TMP_DIR, checkout_step,
    github_script_step, setup_scripts_step, upload_artifact_step,
};
use crate::steps::{
    clean_git_credentials_step, configure_git_credentials_steps, serena_setup_steps,
};
use crate::yaml;
use aw_core::stop_time::{STOP_TIME_ENV, extract_stop_time_from_lock};
use aw_core::{CompilerConfig, Error, FileTracker, Result, VersionInfo};
use aw_frontmatter::{PermissionLevel, Permissions, parse_document, split_document, validate};
use chrono::{DateTime, Utc};
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Id of the job that runs the engine.
pub const AGENT_JOB: &str = "agent";
/// Id of the job that gates the run.
pub const ACTIVATION_JOB: &str = "activation";
/// Id of the job that enforces the stop time.
pub const PRE_ACTIVATION_JOB: &str = "pre_activation";

const PROMPT_HEREDOC: &str = "PROMPT_EOF";

/// Result of compiling one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledWorkflow {
    /// Where the lock file belongs (`foo.md` becomes `foo.lock.yml`)
    pub lock_path: PathBuf,
    /// Lock file contents
    pub yaml: String,
}

/// Compiles workflow documents into GitHub Actions lock files.
///
/// # Example
///
/// ```ignore
/// let compiler = Compiler::new().with_config(config);
/// let compiled = compiler.compile(Path::new(".github/workflows/triage.md"), &content)?;
/// std::fs::write(&compiled.lock_path, compiled.yaml)?;
/// ```
#[derive(Clone)]
pub struct Compiler {
    config: CompilerConfig,
    version: VersionInfo,
    file_tracker: Option<Arc<dyn FileTracker>>,
    compile_time: DateTime<Utc>,
}

impl Default for Compiler {
    /// Relative stop times resolve against the moment the compiler is built,
    /// so every compile through one instance sees the same clock.
    fn default() -> Self {
        Self {
            config: CompilerConfig::default(),
            version: VersionInfo::default(),
            file_tracker: None,
            compile_time: Utc::now(),
        }
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("version", &self.version)
            .field("file_tracker", &self.file_tracker.is_some())
            .field("compile_time", &self.compile_time)
            .finish()
    }
}

impl Compiler {
    /// A compiler with default configuration and a development version.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use host configuration.
    #[must_use]
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the compiler version used to pin the setup action.
    #[must_use]
    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = version;
        self
    }

    /// Fix the time relative stop times are resolved against.
    #[must_use]
    pub const fn with_compile_time(mut self, compile_time: DateTime<Utc>) -> Self {
        self.compile_time = compile_time;
        self
    }

    /// The time relative stop times are resolved against.
    #[must_use]
    pub const fn compile_time(&self) -> DateTime<Utc> {
        self.compile_time
    }

    /// Install or clear the file tracker.
    pub fn set_file_tracker(&mut self, tracker: Option<Arc<dyn FileTracker>>) {
        self.file_tracker = tracker;
    }

    /// Whether a file tracker is installed.
    #[must_use]
    pub const fn has_file_tracker(&self) -> bool {
        self.file_tracker.is_some()
    }

    /// The compiler configuration.
    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Lock file path for a source document.
    #[must_use]
    pub fn lock_path_for(source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map_or_else(|| "workflow".into(), |s| s.to_string_lossy());
        source.with_file_name(format!("{stem}.lock.yml"))
    }

    /// Compile a document.
    ///
    /// # Errors
    ///
    /// Returns parse, validation, configuration, job-graph and emission
    /// errors.
    pub fn compile(&self, source: &Path, content: &str) -> Result<CompiledWorkflow> {
        self.compile_with_existing_lock(source, content, None)
    }

    /// Compile a document, keeping the stop time of a previous lock file
    /// unless the configuration asks for a refresh.
    ///
    /// # Errors
    ///
    /// See [`Compiler::compile`].
    pub fn compile_with_existing_lock(
        &self,
        source: &Path,
        content: &str,
        existing_lock: Option<&str>,
    ) -> Result<CompiledWorkflow> {
        let document = parse_document(content)?;
        validate(&document.frontmatter)?;

        let lock_path = Self::lock_path_for(source);
        let lock_name = lock_path
            .file_name()
            .map_or_else(|| "workflow.lock.yml".into(), |n| n.to_string_lossy().into_owned());

        let data = WorkflowBuilder::new(document.frontmatter, document.body)
            .with_config(self.config.clone())
            .with_lock_name(lock_name)
            .with_compile_time(self.compile_time)
            .with_existing_stop_time(existing_lock.and_then(extract_stop_time_from_lock))
            .with_setup_action(format!(
                "{}/actions/setup@{}",
                self.config.action_repository(),
                self.version.action_ref()
            ))
            .build()?;
        validate_expression_safety(&data.markdown)?;

        let header = split_document(content)?.frontmatter;
        let yaml = self.assemble(&data, source, header)?;

        if let Some(tracker) = &self.file_tracker {
            tracker.track_created(&lock_path);
        }
        info!(
            source = %source.display(),
            lock = %lock_path.display(),
            engine = %data.engine,
            "compiled workflow"
        );
        Ok(CompiledWorkflow { lock_path, yaml })
    }

    fn assemble(&self, data: &WorkflowData, source: &Path, header: &str) -> Result<String> {
        let mut manager = JobManager::new();
        if let Some(job) = build_pre_activation_job(data) {
            manager.add_job(job)?;
        }
        manager.add_job(build_activation_job(data))?;
        manager.add_job(build_main_job(data)?)?;
        for job in build_safe_output_jobs(data, AGENT_JOB)? {
            manager.add_job(job)?;
        }
        manager.validate_dependencies()?;
        debug!(jobs = manager.len(), "job graph validated");

        let mut sections = vec![
            self.header_comment(data, source, header),
            section("name", Value::String(data.name.clone())),
            section("on", triggers(data)),
            section("permissions", Value::Mapping(Mapping::new())),
            section("concurrency", concurrency(data)?),
            section("run-name", Value::String(data.name.clone())),
        ];
        if !data.frontmatter.env.is_empty() {
            let env = serde_yaml::to_value(&data.frontmatter.env)
                .map_err(|e| Error::emit(format!("failed to serialize env: {e}")))?;
            sections.push(section("env", env));
        }
        sections.push(manager.render_jobs()?);
        Ok(sections.join("\n"))
    }

    fn header_comment(&self, data: &WorkflowData, source: &Path, header: &str) -> String {
        let digest = hex::encode(Sha256::digest(header.as_bytes()));
        let mut out = String::from(
            "# This file was automatically generated by gh-aw. DO NOT EDIT.\n\
             #\n\
             # To update this file, edit the source document and recompile.\n\
             #\n",
        );
        out.push_str(&format!("# Source: {}\n", source.display()));
        out.push_str(&format!("# Frontmatter hash: {}\n", &digest[..16]));
        out.push_str(&format!("# Compiler version: {}\n", self.version.version()));
        if let Some(stop_time) = &data.stop_time {
            out.push_str(&format!("# Effective stop-time: {stop_time}\n"));
        }
        out
    }
}

fn section(key: &str, value: Value) -> String {
    let mut map = Mapping::new();
    map.insert(Value::String(key.to_string()), value);
    yaml::render(&Value::Mapping(map), 0)
}

fn triggers(data: &WorkflowData) -> Value {
    let dispatch = || {
        let mut map = Mapping::new();
        map.insert(Value::from("workflow_dispatch"), Value::Null);
        Value::Mapping(map)
    };
    match data.frontmatter.on.clone() {
        Some(Value::Mapping(mut map)) => {
            map.remove("stop-after");
            map.remove("reaction");
            if map.is_empty() {
                dispatch()
            } else {
                Value::Mapping(map)
            }
        }
        None | Some(Value::Null) => dispatch(),
        Some(other) => other,
    }
}

fn concurrency(data: &WorkflowData) -> Result<Value> {
    if let Some(custom) = &data.frontmatter.concurrency {
        return Ok(custom.clone());
    }
    serde_yaml::to_value(Concurrency {
        group: "gh-aw-${{ github.workflow }}".to_string(),
        cancel_in_progress: None,
    })
    .map_err(|e| Error::emit(format!("failed to serialize concurrency: {e}")))
}

fn read_contents() -> Permissions {
    Permissions::scopes([("contents", PermissionLevel::Read)])
}

fn build_pre_activation_job(data: &WorkflowData) -> Option<Job> {
    let stop_time = data.stop_time.as_ref()?;
    let check = github_script_step("Check stop-time limit", "check_stop_time", None)
        .with_id("check_stop_time")
        .with_env(STOP_TIME_ENV, stop_time.clone())
        .with_env("GH_AW_WORKFLOW_NAME", data.name.clone());
    Some(
        Job::new(PRE_ACTIVATION_JOB, data.slim_runner.as_str())
            .with_permissions(read_contents())
            .with_output(
                "activated",
                "${{ steps.check_stop_time.outputs.stop_time_ok == 'true' }}",
            )
            .with_step(setup_scripts_step(&data.setup_action))
            .with_step(check),
    )
}

/// Events whose triggering item can carry a reaction. Pull requests from
/// forks are skipped since the token cannot write to them.
const REACTION_CONDITION: &str = "github.event_name == 'issues' || github.event_name == 'issue_comment' || \
     github.event_name == 'pull_request_review_comment' || github.event_name == 'discussion' || \
     github.event_name == 'discussion_comment' || (github.event_name == 'pull_request' && \
     github.event.pull_request.head.repo.id == github.repository_id)";

fn reaction_step(data: &WorkflowData, reaction: &str) -> Step {
    github_script_step(
        &format!("Add {reaction} reaction to the triggering item"),
        "add_reaction_and_edit_comment",
        None,
    )
    .with_id("react")
    .with_if(REACTION_CONDITION)
    .with_env("GH_AW_REACTION", reaction)
    .with_env("GH_AW_WORKFLOW_NAME", data.name.clone())
}

fn build_activation_job(data: &WorkflowData) -> Job {
    let mut job = Job::new(ACTIVATION_JOB, data.slim_runner.as_str());
    if data.stop_time.is_some() {
        job = job
            .with_need(PRE_ACTIVATION_JOB)
            .with_if(format!(
                "needs.{PRE_ACTIVATION_JOB}.outputs.activated == 'true'"
            ));
    }
    let permissions = if data.reaction.is_some() {
        Permissions::scopes([
            ("contents", PermissionLevel::Read),
            ("discussions", PermissionLevel::Write),
            ("issues", PermissionLevel::Write),
            ("pull-requests", PermissionLevel::Write),
        ])
    } else {
        read_contents()
    };
    job = job
        .with_permissions(permissions)
        .with_output("text", "${{ steps.compute_text.outputs.text }}")
        .with_step(setup_scripts_step(&data.setup_action));
    if let Some(reaction) = &data.reaction {
        job = job
            .with_output("reaction_id", "${{ steps.react.outputs.reaction-id }}")
            .with_output("comment_id", "${{ steps.react.outputs.comment-id }}")
            .with_output("comment_url", "${{ steps.react.outputs.comment-url }}")
            .with_step(reaction_step(data, reaction));
    }
    job.with_step(
        github_script_step(
            "Check workflow file timestamps",
            "check_workflow_timestamp_api",
            None,
        )
        .with_env("GH_AW_WORKFLOW_FILE", data.lock_name.clone()),
    )
    .with_step(
        github_script_step("Compute current body text", "compute_text", None)
            .with_id("compute_text"),
    )
}

fn build_main_job(data: &WorkflowData) -> Result<Job> {
    let engine = data.engine_impl();
    let mut tracker = StepOrderTracker::new();
    let safe_outputs = data.safe_outputs.as_ref().filter(|s| s.has_any());
    let creates_pull_request = safe_outputs.is_some_and(|s| s.create_pull_request.is_some());

    let mut steps = vec![
        checkout_step(),
        setup_scripts_step(&data.setup_action),
        Step::run(format!(
            "mkdir -p {TMP_DIR}/agent\n\
             mkdir -p {AGENT_LOGS_DIR}\n\
             echo \"Created {TMP_DIR}/agent directory for agentic workflow temporary files\"\n"
        ))
        .with_name("Create gh-aw temp directory"),
    ];
    steps.extend(configure_git_credentials_steps(data.github_token.as_deref()));
    steps.extend(serena_setup_steps(data.tools()));
    steps.extend(data.custom_steps.iter().cloned());
    steps.push(clean_git_credentials_step());
    if let Some(step) = safe_outputs_setup_step(data)? {
        steps.push(step);
    }
    steps.push(mcp_setup_step(data)?);
    steps.push(prompt_step(data)?);
    steps.extend(engine.generate_steps(data));

    tracker.mark_agent_execution_complete();
    steps.extend(engine.firewall_logs_collection_steps(data));

    steps.push(redact_secrets_step(data, engine));
    tracker.record_secret_redaction();
    steps.extend(data.secret_masking_steps.iter().cloned());

    if safe_outputs.is_some() {
        let paths = ["${{ env.GH_AW_SAFE_OUTPUTS }}"];
        steps.push(upload_artifact_step("Upload Safe Outputs", "safe_output.jsonl", &paths));
        tracker.record_artifact_upload("safe_output.jsonl", &paths);

        steps.push(
            github_script_step("Ingest agent output", "collect_ndjson_output", None)
                .with_id("collect_output")
                .with_env("GH_AW_SAFE_OUTPUTS", "${{ env.GH_AW_SAFE_OUTPUTS }}"),
        );
        let paths = ["${{ env.GH_AW_AGENT_OUTPUT }}"];
        steps.push(upload_artifact_step(
            "Upload sanitized agent output",
            AGENT_OUTPUT_ARTIFACT,
            &paths,
        ));
        tracker.record_artifact_upload(AGENT_OUTPUT_ARTIFACT, &paths);
    }

    let logs = format!("{AGENT_LOGS_DIR}/");
    steps.push(upload_artifact_step("Upload engine output files", "agent_outputs", &[logs.as_str()]));
    tracker.record_artifact_upload("agent_outputs", &[logs.as_str()]);

    steps.push(
        github_script_step("Parse agent logs for step summary", engine.log_parser_script(), None)
            .with_if("always()")
            .with_env("GH_AW_AGENT_OUTPUT", logs.clone()),
    );

    let mcp_logs = format!("{MCP_LOGS_DIR}/");
    steps.push(upload_artifact_step("Upload MCP logs", "mcp-logs", &[mcp_logs.as_str()]));
    tracker.record_artifact_upload("mcp-logs", &[mcp_logs.as_str()]);

    if crate::engine::firewall_enabled(data) {
        let firewall = format!("{FIREWALL_LOGS_DIR}/");
        steps.push(upload_artifact_step("Upload firewall logs", "firewall-logs", &[firewall.as_str()]));
        tracker.record_artifact_upload("firewall-logs", &[firewall.as_str()]);
    }

    let artifacts = [PROMPT_PATH, AGENT_STDIO_LOG];
    steps.push(upload_artifact_step("Upload agent artifacts", "agent-artifacts", &artifacts));
    tracker.record_artifact_upload("agent-artifacts", &artifacts);

    // The patch must reach the pull-request job byte for byte, so it is not
    // routed through redaction.
    if creates_pull_request {
        steps.push(
            Step::run("bash /opt/gh-aw/actions/generate_git_patch.sh\n")
                .with_name("Generate git patch")
                .with_if("always()")
                .with_env("GH_AW_SAFE_OUTPUTS", "${{ env.GH_AW_SAFE_OUTPUTS }}")
                .with_env("GITHUB_SHA", "${{ github.sha }}"),
        );
        steps.push(upload_artifact_step("Upload git patch", PATCH_ARTIFACT, &[PATCH_PATH]));
    }

    tracker.validate_step_ordering()?;

    let mut job = Job::new(AGENT_JOB, data.runs_on.clone())
        .with_need(ACTIVATION_JOB)
        .with_permissions(data.permissions.clone())
        .with_steps(steps);
    if let Some(condition) = &data.if_condition {
        job = job.with_if(condition.clone());
    }
    job.concurrency = Some(Concurrency {
        group: format!("gh-aw-{}-${{{{ github.workflow }}}}", data.engine),
        cancel_in_progress: None,
    });
    if safe_outputs.is_some() {
        job.env.insert(
            "GH_AW_SAFE_OUTPUTS".to_string(),
            Value::String(SAFE_OUTPUTS_JSONL.to_string()),
        );
        job = job
            .with_output("output", "${{ steps.collect_output.outputs.output }}")
            .with_output("output_types", "${{ steps.collect_output.outputs.output_types }}");
    }
    debug!(steps = job.steps.len(), engine = %data.engine, "built agent job");
    Ok(job)
}

fn prompt_step(data: &WorkflowData) -> Result<Step> {
    let mut script = format!(
        "PROMPT_DIR=\"$(dirname \"$GH_AW_PROMPT\")\"\n\
         mkdir -p \"$PROMPT_DIR\"\n\
         cat << '{PROMPT_HEREDOC}' > \"$GH_AW_PROMPT\"\n"
    );
    for line in data.markdown.trim_end().lines() {
        if line == PROMPT_HEREDOC {
            return Err(Error::emit(format!(
                "prompt contains a line equal to the heredoc delimiter {PROMPT_HEREDOC}"
            )));
        }
        script.push_str(line);
        script.push('\n');
    }
    script.push_str(PROMPT_HEREDOC);
    script.push('\n');

    if let Some(config) = data.safe_outputs.as_ref().filter(|s| s.has_any()) {
        script.push_str(&format!(
            "cat << '{PROMPT_HEREDOC}' >> \"$GH_AW_PROMPT\"\n\
             \n\
             ---\n\
             \n\
             ## Reporting results\n\
             \n\
             You cannot write to GitHub directly. Use the safeoutputs tools to request these actions: {}. \
             Call missing_tool when a capability you need is unavailable and noop when nothing needs to be done.\n\
             {PROMPT_HEREDOC}\n",
            config.enabled_kinds().join(", ")
        ));
    }
    Ok(Step::run(script)
        .with_name("Create prompt")
        .with_env("GH_AW_PROMPT", PROMPT_PATH))
}

fn redact_secrets_step(data: &WorkflowData, engine: &dyn Engine) -> Step {
    let mut names: BTreeSet<String> = engine.required_secrets(data).into_iter().collect();
    names.insert("GH_AW_GITHUB_TOKEN".to_string());
    names.insert("GITHUB_TOKEN".to_string());

    let mut step = github_script_step("Redact secrets in logs", "redact_secrets", None)
        .with_if("always()")
        .with_env(
            "GH_AW_SECRET_NAMES",
            names.iter().map(String::as_str).collect::<Vec<_>>().join(","),
        );
    for name in &names {
        step = step.with_env(format!("SECRET_{name}"), format!("${{{{ secrets.{name} }}}}"));
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn compiler() -> Compiler {
        Compiler::new().with_compile_time(Utc.with_ymd_and_hms(2025, 8, 15, 12, 0, 0).unwrap())
    }

    fn compile(content: &str) -> Result<CompiledWorkflow> {
        compiler().compile(Path::new(".github/workflows/triage.md"), content)
    }

    #[test]
    fn test_lock_path_for() {
        assert_eq!(
            Compiler::lock_path_for(Path::new(".github/workflows/triage.md")),
            PathBuf::from(".github/workflows/triage.lock.yml")
        );
        assert_eq!(
            Compiler::lock_path_for(Path::new("report")),
            PathBuf::from("report.lock.yml")
        );
    }

    #[test]
    fn test_minimal_document() {
        let compiled = compile("---\non: issues\n---\n# Triage\nLook at the issue.\n").unwrap();
        let yaml = &compiled.yaml;
        assert!(yaml.starts_with("# This file was automatically generated by gh-aw. DO NOT EDIT.\n"));
        assert!(yaml.contains("\nname: Triage\n"));
        assert!(yaml.contains("\non: issues\n"));
        assert!(yaml.contains("\npermissions: {}\n"));
        assert!(yaml.contains("  group: gh-aw-${{ github.workflow }}\n"));
        assert!(yaml.contains("\n  activation:\n"));
        assert!(yaml.contains("\n  agent:\n    needs: activation\n"));
        assert!(!yaml.contains("pre_activation"));
        assert!(yaml.contains("Look at the issue.\n"));
    }

    #[test]
    fn test_default_trigger_and_stop_after_stripped() {
        let compiled =
            compile("---\non:\n  stop-after: +25h\n---\nBody\n").unwrap();
        assert!(compiled.yaml.contains("\non:\n  workflow_dispatch:\n"));
        assert!(!compiled.yaml.contains("stop-after"));
        assert!(compiled.yaml.contains("GH_AW_STOP_TIME: \"2025-08-16 13:00:00\"\n"));
        assert!(compiled.yaml.contains("\n  pre_activation:\n"));
        assert!(compiled.yaml.contains("needs.pre_activation.outputs.activated == 'true'"));
    }

    #[test]
    fn test_existing_stop_time_kept() {
        let existing = "          GH_AW_STOP_TIME: \"2025-01-01 00:00:00\"\n";
        let compiled = compiler()
            .compile_with_existing_lock(
                Path::new("a.md"),
                "---\nstop-after: +1d\n---\nBody\n",
                Some(existing),
            )
            .unwrap();
        assert!(compiled.yaml.contains("GH_AW_STOP_TIME: \"2025-01-01 00:00:00\""));
    }

    #[test]
    fn test_safe_output_jobs_follow_agent() {
        let compiled = compile(
            "---\nsafe-outputs:\n  add-labels:\n  create-issue:\n---\nBody\n",
        )
        .unwrap();
        let yaml = &compiled.yaml;
        let agent = yaml.find("\n  agent:\n").unwrap();
        let issue = yaml.find("\n  create_issue:\n").unwrap();
        let labels = yaml.find("\n  add_labels:\n").unwrap();
        assert!(agent < issue && issue < labels);
        assert!(yaml.contains("      output_types: ${{ steps.collect_output.outputs.output_types }}\n"));
    }

    #[test]
    fn test_multiline_secret_expression_rejected() {
        let err = compile("---\non: push\n---\n# T\nLeak ${{\n secrets.GITHUB_TOKEN }}\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert!(err.to_string().contains("secrets.GITHUB_TOKEN"));
    }

    #[test]
    fn test_reaction_step_on_activation() {
        let yaml = compile("---\non:\n  issues:\n    types: [opened]\n  reaction: eyes\n---\nBody\n")
            .unwrap()
            .yaml;
        assert!(yaml.contains("\non:\n  issues:\n    types:\n      - opened\n"));
        assert!(!yaml.contains("reaction: eyes"));

        let activation = &yaml[yaml.find("\n  activation:\n").unwrap()..yaml.find("\n  agent:\n").unwrap()];
        assert!(activation.contains("      - name: Add eyes reaction to the triggering item\n"));
        assert!(activation.contains("        id: react\n"));
        assert!(activation.contains("          GH_AW_REACTION: eyes\n"));
        assert!(activation.contains("      issues: write\n"));
        assert!(activation.contains("      pull-requests: write\n"));
        assert!(activation.contains("      reaction_id: ${{ steps.react.outputs.reaction-id }}\n"));
        let setup = activation.find("name: Setup Scripts").unwrap();
        let react = activation.find("name: Add eyes reaction").unwrap();
        let text = activation.find("name: Compute current body text").unwrap();
        assert!(setup < react && react < text);
    }

    #[test]
    fn test_no_reaction_keeps_read_only_activation() {
        for header in ["on: issues\n", "on:\n  issues:\n  reaction: none\n"] {
            let yaml = compile(&format!("---\n{header}---\nBody\n")).unwrap().yaml;
            assert!(!yaml.contains("id: react\n"), "{header}");
            let activation = &yaml[yaml.find("\n  activation:\n").unwrap()..yaml.find("\n  agent:\n").unwrap()];
            assert!(!activation.contains("write"), "{header}");
        }
    }

    #[test]
    fn test_invalid_reaction_rejected() {
        let err = compile("---\non:\n  issues:\n  reaction: thumbsup\n---\nBody\n").unwrap_err();
        assert!(err.to_string().contains("invalid reaction"));
    }

    #[test]
    fn test_agent_condition_cleaned() {
        let yaml = compile("---\non: issues\nif: \"if: github.actor != 'bot'\"\n---\nBody\n")
            .unwrap()
            .yaml;
        assert!(yaml.contains("\n    if: github.actor != 'bot'\n"));
        assert!(!yaml.contains("if: if:"));
    }

    #[test]
    fn test_long_agent_condition_broken() {
        let condition = "github.event_name == 'issues' || github.event_name == 'pull_request' || github.event_name == 'issue_comment' || github.event_name == 'discussion'";
        let yaml = compile(&format!("---\non: issues\nif: \"{condition}\"\n---\nBody\n"))
            .unwrap()
            .yaml;
        assert!(yaml.contains(
            "\n    if: |-\n      github.event_name == 'issues' ||\n      github.event_name == 'pull_request' ||\n"
        ));
    }

    #[test]
    fn test_unsafe_prompt_expression() {
        let err = compile("---\non: issues\n---\n${{ github.event.issue.title }}\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_prompt_delimiter_rejected() {
        let err = compile("Body\nPROMPT_EOF\n").unwrap_err();
        assert!(matches!(err, Error::Emit { .. }));
    }

    #[test]
    fn test_redaction_precedes_uploads() {
        let yaml = compile("---\nsafe-outputs:\n  create-pull-request:\n---\nBody\n")
            .unwrap()
            .yaml;
        let redact = yaml.find("name: Redact secrets in logs").unwrap();
        let upload = yaml.find("name: Upload Safe Outputs").unwrap();
        let patch = yaml.find("name: Upload git patch").unwrap();
        assert!(redact < upload && upload < patch);
    }

    #[test]
    fn test_release_version_pins_setup_action() {
        let yaml = compiler()
            .with_version(VersionInfo::release("v1.2.3"))
            .compile(Path::new("a.md"), "Body\n")
            .unwrap()
            .yaml;
        assert!(yaml.contains("uses: githubnext/gh-aw/actions/setup@v1.2.3\n"));
    }
}
