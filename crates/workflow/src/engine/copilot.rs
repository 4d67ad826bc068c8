//! GitHub Copilot CLI.

use super::{
    Engine, EngineKind, LogMetrics, execution_step, firewall_collection_steps, firewall_enabled,
    firewall_install_step, mcp, metrics, npm_install_steps,
};
use crate::model::WorkflowData;
use crate::schema::Step;
use crate::steps::common::{AGENT_LOGS_DIR, PROMPT_PATH, SAFE_OUTPUTS_JSONL, TMP_DIR, shell_quote};
use crate::tokens::copilot_token;
use aw_core::Result;
use aw_frontmatter::BashTool;
use indexmap::IndexMap;

/// Default `@github/copilot` version.
pub const DEFAULT_COPILOT_VERSION: &str = "0.0.354";

const MCP_CONFIG_PATH: &str = "/home/runner/.copilot/mcp-config.json";

/// Copilot CLI adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopilotEngine;

impl CopilotEngine {
    /// `--allow-tool` values, sorted.
    fn allowed_tools(data: &WorkflowData) -> Vec<String> {
        let tools = data.tools();
        let mut allowed = Vec::new();
        match tools.bash() {
            Some(BashTool::All) => allowed.push("shell".to_string()),
            Some(BashTool::Commands(commands)) => {
                allowed.extend(commands.iter().map(|c| format!("shell({c})")));
            }
            None => {}
        }
        if tools.has_edit() {
            allowed.push("write".to_string());
        }
        if let Some(github) = tools.github() {
            if github.allowed.is_empty() {
                allowed.push("github".to_string());
            } else {
                allowed.extend(github.allowed.iter().map(|t| format!("github({t})")));
            }
        }
        if data.safe_outputs.as_ref().is_some_and(|s| s.has_any()) {
            allowed.push("safeoutputs".to_string());
        }
        if tools.contains("serena") {
            allowed.push("serena".to_string());
        }
        allowed.sort();
        allowed.dedup();
        allowed
    }

    fn command(data: &WorkflowData) -> String {
        let config = &data.engine_config;
        let mut args = vec![
            config.command.clone().unwrap_or_else(|| "copilot".to_string()),
            "--add-dir".to_string(),
            format!("{TMP_DIR}/"),
            "--log-level".to_string(),
            "all".to_string(),
            "--log-dir".to_string(),
            format!("{AGENT_LOGS_DIR}/"),
            "--disable-builtin-mcps".to_string(),
        ];
        if let Some(model) = &config.model {
            args.push("--model".to_string());
            args.push(shell_quote(model));
        }
        for tool in Self::allowed_tools(data) {
            args.push("--allow-tool".to_string());
            args.push(shell_quote(&tool));
        }
        args.extend(config.args.iter().map(|a| shell_quote(a)));
        args.push("--prompt".to_string());
        args.push("\"$(cat $GH_AW_PROMPT)\"".to_string());
        args.join(" ")
    }

    /// Copy the CLI session transcripts next to the other agent logs.
    #[must_use]
    pub fn session_copy_step() -> Step {
        Step::run(format!(
            "# Copy Copilot session state files to logs folder for artifact collection\n\
             SESSION_STATE_DIR=\"$HOME/.copilot/session-state\"\n\
             LOGS_DIR=\"{AGENT_LOGS_DIR}\"\n\
             \n\
             if [ -d \"$SESSION_STATE_DIR\" ]; then\n\
             \x20 echo \"Copying Copilot session state files from $SESSION_STATE_DIR to $LOGS_DIR\"\n\
             \x20 mkdir -p \"$LOGS_DIR\"\n\
             \x20 cp -v \"$SESSION_STATE_DIR\"/*.jsonl \"$LOGS_DIR/\" 2>/dev/null || true\n\
             \x20 echo \"Session state files copied successfully\"\n\
             else\n\
             \x20 echo \"No session-state directory found at $SESSION_STATE_DIR\"\n\
             fi\n"
        ))
        .with_name("Copy Copilot session state files to logs")
        .with_if("always()")
        .continue_on_error()
    }
}

impl Engine for CopilotEngine {
    fn id(&self) -> &'static str {
        "copilot"
    }

    fn display_name(&self) -> &'static str {
        "GitHub Copilot CLI"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Copilot
    }

    fn supports_max_turns(&self) -> bool {
        false
    }

    fn supports_web_search(&self) -> bool {
        false
    }

    fn required_secrets(&self, data: &WorkflowData) -> Vec<String> {
        let mut secrets = vec!["COPILOT_GITHUB_TOKEN".to_string()];
        if data.tools().github().is_some() {
            secrets.push("GH_AW_GITHUB_MCP_SERVER_TOKEN".to_string());
        }
        secrets
    }

    fn installation_steps(&self, data: &WorkflowData) -> Vec<Step> {
        if data.engine_config.command.is_some() {
            return Vec::new();
        }
        let version = data
            .engine_config
            .version
            .as_deref()
            .unwrap_or(DEFAULT_COPILOT_VERSION);
        let mut steps = npm_install_steps(self.display_name(), "@github/copilot", version);
        if firewall_enabled(data) {
            steps.push(firewall_install_step());
        }
        steps
    }

    fn execution_steps(&self, data: &WorkflowData) -> Vec<Step> {
        let mut env = IndexMap::new();
        env.insert("COPILOT_GITHUB_TOKEN".to_string(), copilot_token(None).to_string());
        env.insert("GH_AW_PROMPT".to_string(), PROMPT_PATH.to_string());
        env.insert("GH_AW_MCP_CONFIG".to_string(), MCP_CONFIG_PATH.to_string());
        env.insert("XDG_CONFIG_HOME".to_string(), "/home/runner".to_string());
        if data.safe_outputs.is_some() {
            env.insert("GH_AW_SAFE_OUTPUTS".to_string(), SAFE_OUTPUTS_JSONL.to_string());
        }
        vec![execution_step(
            "Execute GitHub Copilot CLI",
            data,
            &Self::command(data),
            env,
        )]
    }

    fn firewall_logs_collection_steps(&self, data: &WorkflowData) -> Vec<Step> {
        let mut steps = vec![Self::session_copy_step()];
        steps.extend(firewall_collection_steps(data));
        steps
    }

    fn log_parser_script(&self) -> &'static str {
        "parse_copilot_log"
    }

    fn mcp_config_path(&self) -> &'static str {
        MCP_CONFIG_PATH
    }

    fn render_mcp_config(&self, data: &WorkflowData) -> Result<String> {
        mcp::render_json(data, true)
    }

    fn parse_log_metrics(&self, log: &str, verbose: bool) -> LogMetrics {
        metrics::parse_copilot_log(log, verbose)
    }
}
