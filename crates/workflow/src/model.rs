//! The compiler's intermediate representation.
//!
//! [`WorkflowBuilder`] resolves a parsed frontmatter record against the
//! compiler configuration into a [`WorkflowData`]: engine selected, stop time
//! resolved, custom steps typed. Job emitters only read from it.

use crate::engine::{Engine, EngineKind};
use crate::expressions::{break_long_condition, clean_if_expression};
use crate::schema::{RunsOn, Step};
use aw_core::config::DEFAULT_SLIM_RUNNER;
use aw_core::stop_time::resolve_stop_time;
use aw_core::{CompilerConfig, Error, Result};
use aw_frontmatter::{
    EngineConfig, NetworkSetting, ParsedFrontmatter, Permissions, SafeOutputsConfig, Tools,
    resolve_permissions,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Setup action used when none is configured.
pub const DEFAULT_SETUP_ACTION: &str = "githubnext/gh-aw/actions/setup@main";

/// Everything the job emitters need to know about one workflow.
///
/// The record owns its safe-output policy; emitted jobs copy what they need
/// and never hold references back into it.
#[derive(Debug, Clone)]
pub struct WorkflowData {
    /// Display name
    pub name: String,
    /// Description from frontmatter
    pub description: Option<String>,
    /// The parsed header
    pub frontmatter: ParsedFrontmatter,
    /// Prompt body
    pub markdown: String,
    /// Selected engine
    pub engine: EngineKind,
    /// Engine options
    pub engine_config: EngineConfig,
    /// Safe-output policy
    pub safe_outputs: Option<SafeOutputsConfig>,
    /// Resolved stop time (`YYYY-MM-DD HH:MM:SS`)
    pub stop_time: Option<String>,
    /// Reaction added to the triggering item; `none` is dropped
    pub reaction: Option<String>,
    /// Condition gating the agent job, cleaned and line-broken
    pub if_condition: Option<String>,
    /// Lock file name (`triage.lock.yml`)
    pub lock_name: String,
    /// Agent job permissions
    pub permissions: Permissions,
    /// Agent job runner
    pub runs_on: RunsOn,
    /// Agent job timeout
    pub timeout_minutes: u32,
    /// Network policy
    pub network: NetworkSetting,
    /// Workflow-level token override
    pub github_token: Option<String>,
    /// Custom steps run before the agent
    pub custom_steps: Vec<Step>,
    /// Steps run after secret redaction
    pub secret_masking_steps: Vec<Step>,
    /// `uses:` reference of the runtime setup action
    pub setup_action: String,
    /// Runner for activation and safe-output jobs
    pub slim_runner: String,
}

impl WorkflowData {
    /// A workflow with defaults everywhere and no safe outputs.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let config = CompilerConfig::default();
        Self {
            lock_name: format!("{name}.lock.yml"),
            name,
            description: None,
            frontmatter: ParsedFrontmatter::default(),
            markdown: String::new(),
            engine: EngineKind::default(),
            engine_config: EngineConfig {
                id: EngineKind::default().to_string(),
                ..EngineConfig::default()
            },
            safe_outputs: None,
            stop_time: None,
            reaction: None,
            if_condition: None,
            permissions: Permissions::default(),
            runs_on: RunsOn::from(config.runner()),
            timeout_minutes: config.timeout(),
            network: NetworkSetting::default(),
            github_token: None,
            custom_steps: Vec::new(),
            secret_masking_steps: Vec::new(),
            setup_action: DEFAULT_SETUP_ACTION.to_string(),
            slim_runner: DEFAULT_SLIM_RUNNER.to_string(),
        }
    }

    /// Tools declared in frontmatter.
    #[must_use]
    pub const fn tools(&self) -> &Tools {
        &self.frontmatter.tools
    }

    /// The selected engine implementation.
    #[must_use]
    pub fn engine_impl(&self) -> &'static dyn Engine {
        self.engine.engine()
    }

    /// Whether safe-output jobs run in preview mode.
    #[must_use]
    pub fn is_staged(&self) -> bool {
        self.safe_outputs.as_ref().is_some_and(|s| s.staged)
    }

    /// Lock file name without `.lock.yml`.
    #[must_use]
    pub fn workflow_id(&self) -> &str {
        self.lock_name
            .strip_suffix(".lock.yml")
            .unwrap_or(&self.lock_name)
    }
}

/// Builds a [`WorkflowData`] from a parsed document.
///
/// # Example
///
/// ```ignore
/// let data = WorkflowBuilder::new(frontmatter, body)
///     .with_lock_name("triage.lock.yml")
///     .with_compile_time(now)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    frontmatter: ParsedFrontmatter,
    body: String,
    config: CompilerConfig,
    lock_name: Option<String>,
    compile_time: Option<DateTime<Utc>>,
    existing_stop_time: Option<String>,
    setup_action: Option<String>,
}

impl WorkflowBuilder {
    /// Start from a parsed header and prompt body.
    pub fn new(frontmatter: ParsedFrontmatter, body: impl Into<String>) -> Self {
        Self {
            frontmatter,
            body: body.into(),
            config: CompilerConfig::default(),
            lock_name: None,
            compile_time: None,
            existing_stop_time: None,
            setup_action: None,
        }
    }

    /// Use host configuration for defaults.
    #[must_use]
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the lock file name.
    #[must_use]
    pub fn with_lock_name(mut self, lock_name: impl Into<String>) -> Self {
        self.lock_name = Some(lock_name.into());
        self
    }

    /// Base time for relative stop times. Defaults to now.
    #[must_use]
    pub const fn with_compile_time(mut self, compile_time: DateTime<Utc>) -> Self {
        self.compile_time = Some(compile_time);
        self
    }

    /// Stop time found in an existing lock file.
    #[must_use]
    pub fn with_existing_stop_time(mut self, stop_time: Option<String>) -> Self {
        self.existing_stop_time = stop_time;
        self
    }

    /// Override the runtime setup action reference.
    #[must_use]
    pub fn with_setup_action(mut self, setup_action: impl Into<String>) -> Self {
        self.setup_action = Some(setup_action.into());
        self
    }

    /// Resolve everything into a [`WorkflowData`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an unknown engine, for options the
    /// engine does not support, or for malformed custom steps, and propagates
    /// permission and stop-time errors.
    pub fn build(self) -> Result<WorkflowData> {
        let fm = &self.frontmatter;
        let engine: EngineKind = fm.engine_id().unwrap_or(self.config.engine()).parse()?;
        let engine_config = fm.engine.as_ref().map_or_else(
            || EngineConfig {
                id: engine.to_string(),
                ..EngineConfig::default()
            },
            |setting| setting.to_config(),
        );

        let implementation = engine.engine();
        if engine_config.max_turns.is_some() && !implementation.supports_max_turns() {
            return Err(Error::config(
                "engine.max-turns",
                format!("max-turns is not supported by the {engine} engine"),
                "Remove 'max-turns' or switch to the claude engine",
            ));
        }
        if fm.tools.has_web_search() && !implementation.supports_web_search() {
            return Err(Error::config(
                "tools.web-search",
                format!("web-search is not supported by the {engine} engine"),
                "Remove 'web-search' or use an engine that supports it",
            ));
        }

        let safe_outputs = fm.safe_outputs.clone();
        if safe_outputs
            .as_ref()
            .is_some_and(|s| s.create_pull_request.is_some())
            && !fm.tools.has_edit()
        {
            warn!(
                engine = %engine,
                "create-pull-request is enabled but the edit tool is not; the agent may not be able to change files"
            );
        }

        let stop_time = match fm.stop_after() {
            Some(_) if self.existing_stop_time.is_some() && !self.config.refresh_stop_time() => {
                debug!("keeping stop time from existing lock file");
                self.existing_stop_time.clone()
            }
            Some(value) => {
                let compile_time = self.compile_time.unwrap_or_else(Utc::now);
                Some(resolve_stop_time(&value, compile_time)?).filter(|s| !s.is_empty())
            }
            None => None,
        };

        let reaction = fm.reaction()?.filter(|r| r != "none");
        let if_condition = fm
            .if_condition
            .as_deref()
            .and_then(clean_if_expression)
            .map(|c| break_long_condition(&c));

        let permissions = fm
            .permissions
            .as_ref()
            .map(resolve_permissions)
            .transpose()?
            .unwrap_or_default();

        let runs_on = fm
            .runs_on
            .as_ref()
            .map_or_else(|| RunsOn::from(self.config.runner()), RunsOn::from_value);

        let custom_steps = fm
            .steps
            .iter()
            .map(Step::from_value)
            .collect::<Result<Vec<_>>>()?;
        let secret_masking_steps = fm
            .secret_masking
            .as_ref()
            .map(|m| m.steps.iter().map(Step::from_value).collect::<Result<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        let lock_name = self
            .lock_name
            .clone()
            .unwrap_or_else(|| "workflow.lock.yml".to_string());
        let name = fm
            .name
            .clone()
            .or_else(|| first_heading(&self.body))
            .unwrap_or_else(|| {
                lock_name
                    .strip_suffix(".lock.yml")
                    .unwrap_or(&lock_name)
                    .to_string()
            });
        let setup_action = self.setup_action.clone().unwrap_or_else(|| {
            format!("{}/actions/setup@main", self.config.action_repository())
        });

        debug!(name = %name, engine = %engine, stop_time = ?stop_time, "built workflow data");

        Ok(WorkflowData {
            name,
            description: fm.description.clone(),
            engine,
            engine_config,
            safe_outputs,
            stop_time,
            reaction,
            if_condition,
            lock_name,
            permissions,
            runs_on,
            timeout_minutes: fm.timeout_minutes.unwrap_or(self.config.timeout()),
            network: fm.network(),
            github_token: fm.github_token.clone(),
            custom_steps,
            secret_masking_steps,
            setup_action,
            slim_runner: self.config.slim_runner().to_string(),
            markdown: self.body,
            frontmatter: self.frontmatter,
        })
    }
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|heading| heading.trim().to_string())
        .filter(|heading| !heading.is_empty())
}
