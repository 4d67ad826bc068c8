//! AI engine adapters.
//!
//! An engine turns a [`WorkflowData`] into the steps that install and run its
//! CLI, renders its MCP configuration and parses the log the CLI leaves
//! behind. Engines are stateless singletons selected through [`EngineKind`].

mod claude;
mod codex;
mod copilot;
pub mod mcp;
pub mod metrics;

pub use claude::ClaudeEngine;
pub use codex::CodexEngine;
pub use copilot::CopilotEngine;
pub use metrics::{LogMetrics, ToolCallInfo};

use crate::model::WorkflowData;
use crate::schema::Step;
use crate::steps::common::{AGENT_STDIO_LOG, FIREWALL_LOGS_DIR, TMP_DIR, shell_quote};
use aw_core::{Error, Result};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Version of the egress firewall installed when `network.firewall` is on.
pub const AWF_VERSION: &str = "v0.1.1";

/// Supported engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineKind {
    /// GitHub Copilot CLI
    #[default]
    Copilot,
    /// Anthropic Claude Code
    Claude,
    /// OpenAI Codex CLI
    Codex,
}

impl EngineKind {
    /// Every engine, in registry order.
    pub const ALL: [Self; 3] = [Self::Copilot, Self::Claude, Self::Codex];

    /// Engine identifier used in frontmatter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Copilot => "copilot",
            Self::Claude => "claude",
            Self::Codex => "codex",
        }
    }

    /// The engine implementation.
    #[must_use]
    pub fn engine(self) -> &'static dyn Engine {
        match self {
            Self::Copilot => &CopilotEngine,
            Self::Claude => &ClaudeEngine,
            Self::Codex => &CodexEngine,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                Error::config(
                    "engine",
                    format!("unknown engine: {s:?}"),
                    "Supported engines: copilot, claude, codex",
                )
            })
    }
}

/// Adapter for one AI engine CLI.
///
/// Implementations hold no state; [`EngineKind::engine`] hands out shared
/// references to them.
pub trait Engine: Send + Sync {
    /// Identifier (`copilot`, `claude`, `codex`)
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &'static str;

    /// Registry entry for this engine
    fn kind(&self) -> EngineKind;

    /// Whether `engine.max-turns` is honored
    fn supports_max_turns(&self) -> bool;

    /// Whether the `web-search` tool is available
    fn supports_web_search(&self) -> bool;

    /// Secrets the execution step reads.
    fn required_secrets(&self, data: &WorkflowData) -> Vec<String>;

    /// Steps that install the CLI (and the firewall, when enabled).
    fn installation_steps(&self, data: &WorkflowData) -> Vec<Step>;

    /// Steps that run the agent.
    fn execution_steps(&self, data: &WorkflowData) -> Vec<Step>;

    /// Installation followed by execution.
    fn generate_steps(&self, data: &WorkflowData) -> Vec<Step> {
        let mut steps = self.installation_steps(data);
        steps.extend(self.execution_steps(data));
        steps
    }

    /// Steps that gather engine and firewall logs after the run.
    fn firewall_logs_collection_steps(&self, data: &WorkflowData) -> Vec<Step> {
        firewall_collection_steps(data)
    }

    /// Runtime script that renders this engine's log as a step summary.
    fn log_parser_script(&self) -> &'static str;

    /// Where the MCP configuration is written.
    fn mcp_config_path(&self) -> &'static str;

    /// Render the MCP configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emit`] when the configuration cannot be serialized.
    fn render_mcp_config(&self, data: &WorkflowData) -> Result<String>;

    /// Extract metrics from a log produced by this engine.
    fn parse_log_metrics(&self, log: &str, verbose: bool) -> LogMetrics;
}

/// Whether the agent command runs behind the egress firewall.
#[must_use]
pub fn firewall_enabled(data: &WorkflowData) -> bool {
    data.network.firewall_enabled()
}

/// Install the `awf` firewall binary.
#[must_use]
pub fn firewall_install_step() -> Step {
    Step::run(format!(
        "echo \"Installing awf from release: {AWF_VERSION}\"\n\
         curl -L https://github.com/githubnext/gh-aw-firewall/releases/download/{AWF_VERSION}/awf-linux-x64 -o awf\n\
         chmod +x awf\n\
         sudo mv awf /usr/local/bin/\n\
         which awf\n\
         awf --version\n"
    ))
    .with_name("Install awf binary")
}

/// Wrap `command` in the firewall when it is enabled.
#[must_use]
pub fn wrap_command(data: &WorkflowData, command: &str) -> String {
    if !firewall_enabled(data) {
        return command.to_string();
    }
    let domains = data.network.allowed_domains().join(",");
    format!(
        "sudo -E awf --env-all --container-workdir \"${{GITHUB_WORKSPACE}}\" --mount /tmp:/tmp:rw \
         --allow-domains {} --log-level info --proxy-logs-dir {FIREWALL_LOGS_DIR} \
         -- {command}",
        shell_quote(&domains)
    )
}

/// Collect the firewall proxy logs when the firewall is enabled.
#[must_use]
pub fn firewall_collection_steps(data: &WorkflowData) -> Vec<Step> {
    if !firewall_enabled(data) {
        return Vec::new();
    }
    vec![
        Step::run(format!(
            "if [ -d \"{FIREWALL_LOGS_DIR}\" ]; then\n\
             \x20 echo \"Firewall logs collected:\"\n\
             \x20 find \"{FIREWALL_LOGS_DIR}\" -type f -print\n\
             else\n\
             \x20 echo \"No firewall logs found\"\n\
             fi\n"
        ))
        .with_name("Collect firewall logs")
        .with_if("always()")
        .continue_on_error(),
    ]
}

/// Build the execution step shared by every engine: the command piped
/// through `tee` into the agent stdio log.
#[must_use]
pub(crate) fn execution_step(
    name: &str,
    data: &WorkflowData,
    command: &str,
    env: IndexMap<String, String>,
) -> Step {
    let script = format!(
        "set -o pipefail\n\
         mkdir -p {TMP_DIR}/ {TMP_DIR}/agent/\n\
         {} 2>&1 | tee {AGENT_STDIO_LOG}\n",
        wrap_command(data, command)
    );
    let mut step = Step::run(script)
        .with_name(name)
        .with_id("agentic_execution");
    step.timeout_minutes = Some(data.timeout_minutes);
    for (key, value) in env {
        step = step.with_env(key, value);
    }
    for (key, value) in &data.engine_config.env {
        step = step.with_env(key.clone(), value.clone());
    }
    step
}

/// `npm install -g <package>@<version>` preceded by Node setup.
#[must_use]
pub(crate) fn npm_install_steps(display: &str, package: &str, version: &str) -> Vec<Step> {
    vec![
        crate::steps::common::setup_node_step(),
        Step::run(format!("npm install -g {package}@{version}\n"))
            .with_name(format!("Install {display}")),
    ]
}
