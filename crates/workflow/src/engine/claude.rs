//! Anthropic Claude Code.

use super::{
    Engine, EngineKind, LogMetrics, execution_step, firewall_enabled, firewall_install_step, mcp,
    metrics, npm_install_steps,
};
use crate::model::WorkflowData;
use crate::schema::Step;
use crate::steps::common::{PROMPT_PATH, SAFE_OUTPUTS_JSONL, shell_quote};
use aw_core::Result;
use aw_frontmatter::BashTool;
use indexmap::IndexMap;

/// Default `@anthropic-ai/claude-code` version.
pub const DEFAULT_CLAUDE_VERSION: &str = "2.0.44";

const MCP_CONFIG_PATH: &str = "/tmp/gh-aw/mcp-config/mcp-servers.json";

/// Tools every Claude run may use.
const ALWAYS_ALLOWED: &[&str] = &["Glob", "Grep", "LS", "Read", "Task", "TodoWrite"];

/// Claude Code adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeEngine;

impl ClaudeEngine {
    /// Value of `--allowed-tools`, sorted and comma-separated.
    #[must_use]
    pub fn allowed_tools(data: &WorkflowData) -> String {
        let tools = data.tools();
        let mut allowed: Vec<String> = ALWAYS_ALLOWED.iter().map(|t| (*t).to_string()).collect();
        match tools.bash() {
            Some(BashTool::All) => allowed.push("Bash".to_string()),
            Some(BashTool::Commands(commands)) => {
                allowed.extend(commands.iter().map(|c| format!("Bash({c})")));
            }
            None => {}
        }
        if tools.has_edit() {
            allowed.extend(["Edit", "MultiEdit", "NotebookEdit", "Write"].map(String::from));
        }
        if tools.has_web_fetch() {
            allowed.push("WebFetch".to_string());
        }
        if tools.has_web_search() {
            allowed.push("WebSearch".to_string());
        }
        if let Some(github) = tools.github() {
            if github.allowed.is_empty() {
                allowed.push("mcp__github".to_string());
            } else {
                allowed.extend(github.allowed.iter().map(|t| format!("mcp__github__{t}")));
            }
        }
        if data.safe_outputs.as_ref().is_some_and(|s| s.has_any()) {
            allowed.push("mcp__safeoutputs".to_string());
        }
        if tools.contains("serena") {
            allowed.push("mcp__serena".to_string());
        }
        allowed.sort();
        allowed.dedup();
        allowed.join(",")
    }

    fn command(data: &WorkflowData) -> String {
        let config = &data.engine_config;
        let mut args = vec![
            config.command.clone().unwrap_or_else(|| "claude".to_string()),
            "--print".to_string(),
            "--mcp-config".to_string(),
            MCP_CONFIG_PATH.to_string(),
        ];
        if let Some(model) = &config.model {
            args.push("--model".to_string());
            args.push(shell_quote(model));
        }
        if let Some(turns) = &config.max_turns {
            args.push("--max-turns".to_string());
            args.push(shell_quote(turns));
        }
        args.push("--allowed-tools".to_string());
        args.push(format!("'{}'", Self::allowed_tools(data).replace('\'', "'\\''")));
        args.extend(
            [
                "--debug",
                "--verbose",
                "--permission-mode",
                "bypassPermissions",
                "--output-format",
                "stream-json",
            ]
            .map(String::from),
        );
        args.extend(config.args.iter().map(|a| shell_quote(a)));
        args.push("\"$(cat $GH_AW_PROMPT)\"".to_string());
        args.join(" ")
    }
}

impl Engine for ClaudeEngine {
    fn id(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude Code"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Claude
    }

    fn supports_max_turns(&self) -> bool {
        true
    }

    fn supports_web_search(&self) -> bool {
        true
    }

    fn required_secrets(&self, data: &WorkflowData) -> Vec<String> {
        let mut secrets = vec!["ANTHROPIC_API_KEY".to_string()];
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
            .unwrap_or(DEFAULT_CLAUDE_VERSION);
        let mut steps =
            npm_install_steps(self.display_name(), "@anthropic-ai/claude-code", version);
        if firewall_enabled(data) {
            steps.push(firewall_install_step());
        }
        steps
    }

    fn execution_steps(&self, data: &WorkflowData) -> Vec<Step> {
        let mut env = IndexMap::new();
        env.insert(
            "ANTHROPIC_API_KEY".to_string(),
            "${{ secrets.ANTHROPIC_API_KEY }}".to_string(),
        );
        env.insert("DISABLE_TELEMETRY".to_string(), "1".to_string());
        env.insert("DISABLE_ERROR_REPORTING".to_string(), "1".to_string());
        env.insert("GH_AW_PROMPT".to_string(), PROMPT_PATH.to_string());
        env.insert("GH_AW_MCP_CONFIG".to_string(), MCP_CONFIG_PATH.to_string());
        env.insert("MCP_TIMEOUT".to_string(), "120000".to_string());
        if let Some(turns) = &data.engine_config.max_turns {
            env.insert("GH_AW_MAX_TURNS".to_string(), turns.clone());
        }
        if data.safe_outputs.is_some() {
            env.insert("GH_AW_SAFE_OUTPUTS".to_string(), SAFE_OUTPUTS_JSONL.to_string());
        }
        vec![execution_step(
            "Execute Claude Code CLI",
            data,
            &Self::command(data),
            env,
        )]
    }

    fn log_parser_script(&self) -> &'static str {
        "parse_claude_log"
    }

    fn mcp_config_path(&self) -> &'static str {
        MCP_CONFIG_PATH
    }

    fn render_mcp_config(&self, data: &WorkflowData) -> Result<String> {
        mcp::render_json(data, false)
    }

    fn parse_log_metrics(&self, log: &str, verbose: bool) -> LogMetrics {
        metrics::parse_claude_log(log, verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aw_frontmatter::Tools;

    fn data(tools: &str) -> WorkflowData {
        let mut data = WorkflowData::new("t");
        data.engine = EngineKind::Claude;
        data.frontmatter.tools = serde_yaml::from_str::<Tools>(tools).unwrap();
        data
    }

    #[test]
    fn test_allowed_tools_baseline() {
        assert_eq!(
            ClaudeEngine::allowed_tools(&data("{}")),
            "Glob,Grep,LS,Read,Task,TodoWrite"
        );
    }

    #[test]
    fn test_allowed_tools_full() {
        let allowed =
            ClaudeEngine::allowed_tools(&data("bash: [\"git diff\"]\nedit:\nweb-fetch:\nweb-search:\ngithub:\n  allowed: [get_issue]\n"));
        for tool in [
            "Bash(git diff)",
            "Edit",
            "MultiEdit",
            "NotebookEdit",
            "Write",
            "WebFetch",
            "WebSearch",
            "mcp__github__get_issue",
        ] {
            assert!(allowed.split(',').any(|t| t == tool), "missing {tool} in {allowed}");
        }
    }

    #[test]
    fn test_bash_wildcard() {
        let allowed = ClaudeEngine::allowed_tools(&data("bash: true\n"));
        assert!(allowed.split(',').any(|t| t == "Bash"));
    }

    #[test]
    fn test_execution_command() {
        let mut data = data("{}");
        data.engine_config.max_turns = Some("5".into());
        let step = &ClaudeEngine.execution_steps(&data)[0];
        let run = step.run.as_deref().unwrap();
        assert!(run.contains("claude --print --mcp-config /tmp/gh-aw/mcp-config/mcp-servers.json --max-turns 5"));
        assert!(run.contains("--output-format stream-json"));
        assert!(run.contains("| tee /tmp/gh-aw/agent-stdio.log"));
        assert_eq!(step.env_value("GH_AW_MAX_TURNS"), Some("5"));
        assert_eq!(step.env_value("MCP_TIMEOUT"), Some("120000"));
    }
}
