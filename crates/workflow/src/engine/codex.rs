//! OpenAI Codex CLI.

use super::{
    Engine, EngineKind, LogMetrics, execution_step, firewall_enabled, firewall_install_step, mcp,
    metrics, npm_install_steps,
};
use crate::model::WorkflowData;
use crate::schema::Step;
use crate::steps::common::{PROMPT_PATH, SAFE_OUTPUTS_JSONL, shell_quote};
use aw_core::Result;
use indexmap::IndexMap;

/// Default `@openai/codex` version.
pub const DEFAULT_CODEX_VERSION: &str = "0.58.0";

const CODEX_HOME: &str = "/tmp/gh-aw/mcp-config";
const MCP_CONFIG_PATH: &str = "/tmp/gh-aw/mcp-config/config.toml";

/// Codex CLI adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodexEngine;

impl CodexEngine {
    fn command(data: &WorkflowData) -> String {
        let config = &data.engine_config;
        let mut args = vec![config.command.clone().unwrap_or_else(|| "codex".to_string())];
        if let Some(model) = &config.model {
            args.push("-c".to_string());
            args.push(shell_quote(&format!("model={model}")));
        }
        if data.tools().has_web_search() {
            args.push("--search".to_string());
        }
        args.extend(["exec", "--full-auto", "--skip-git-repo-check"].map(String::from));
        args.extend(config.args.iter().map(|a| shell_quote(a)));
        args.push("\"$(cat $GH_AW_PROMPT)\"".to_string());
        args.join(" ")
    }
}

impl Engine for CodexEngine {
    fn id(&self) -> &'static str {
        "codex"
    }

    fn display_name(&self) -> &'static str {
        "Codex"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Codex
    }

    fn supports_max_turns(&self) -> bool {
        false
    }

    fn supports_web_search(&self) -> bool {
        true
    }

    fn required_secrets(&self, data: &WorkflowData) -> Vec<String> {
        let mut secrets = vec!["CODEX_API_KEY".to_string(), "OPENAI_API_KEY".to_string()];
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
            .unwrap_or(DEFAULT_CODEX_VERSION);
        let mut steps = npm_install_steps("Codex", "@openai/codex", version);
        if firewall_enabled(data) {
            steps.push(firewall_install_step());
        }
        steps
    }

    fn execution_steps(&self, data: &WorkflowData) -> Vec<Step> {
        let mut env = IndexMap::new();
        env.insert(
            "CODEX_API_KEY".to_string(),
            "${{ secrets.CODEX_API_KEY || secrets.OPENAI_API_KEY }}".to_string(),
        );
        env.insert("CODEX_HOME".to_string(), CODEX_HOME.to_string());
        env.insert("GH_AW_PROMPT".to_string(), PROMPT_PATH.to_string());
        env.insert("GH_AW_MCP_CONFIG".to_string(), MCP_CONFIG_PATH.to_string());
        env.insert("RUST_LOG".to_string(), "codex_core=debug,codex_exec=debug".to_string());
        if data.safe_outputs.is_some() {
            env.insert("GH_AW_SAFE_OUTPUTS".to_string(), SAFE_OUTPUTS_JSONL.to_string());
        }
        vec![execution_step("Run Codex", data, &Self::command(data), env)]
    }

    fn log_parser_script(&self) -> &'static str {
        "parse_codex_log"
    }

    fn mcp_config_path(&self) -> &'static str {
        MCP_CONFIG_PATH
    }

    fn render_mcp_config(&self, data: &WorkflowData) -> Result<String> {
        mcp::render_toml(data)
    }

    fn parse_log_metrics(&self, log: &str, verbose: bool) -> LogMetrics {
        metrics::parse_codex_log(log, verbose)
    }
}
