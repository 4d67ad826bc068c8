//! MCP server configuration.
//!
//! The agent talks to GitHub, the safe-outputs server and Serena through MCP.
//! Copilot and Claude read a JSON `mcpServers` document; Codex reads a TOML
//! `config.toml` from `CODEX_HOME`.

use crate::model::WorkflowData;
use crate::schema::Step;
use crate::steps::common::SAFE_OUTPUTS_DIR;
use crate::steps::serena::{SERENA_IMAGE, serena_languages};
use crate::tokens::mcp_server_token;
use aw_core::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// GitHub MCP server image.
pub const GITHUB_MCP_IMAGE: &str = "ghcr.io/github/github-mcp-server";
/// GitHub MCP server version.
pub const GITHUB_MCP_VERSION: &str = "v0.20.2";

const HEREDOC: &str = "GH_AW_MCP_CONFIG_EOF";

/// One MCP server launched over stdio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServer {
    /// Executable
    pub command: String,
    /// Arguments
    pub args: Vec<String>,
    /// Environment passed to the server, resolved by the engine at launch
    pub env: BTreeMap<String, String>,
    /// Tools the agent may call; empty means all
    pub tools: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Servers enabled for this workflow, in emission order.
#[must_use]
pub fn mcp_servers(data: &WorkflowData) -> IndexMap<String, McpServer> {
    let tools = data.tools();
    let mut servers = IndexMap::new();

    if let Some(github) = tools.github() {
        let mut args = strings(&["run", "-i", "--rm", "-e", "GITHUB_PERSONAL_ACCESS_TOKEN"]);
        if github.read_only {
            args.extend(strings(&["-e", "GITHUB_READ_ONLY=1"]));
        }
        args.push("-e".to_string());
        args.push(format!("GITHUB_TOOLSETS={}", github.effective_toolsets().join(",")));
        args.push(format!("{GITHUB_MCP_IMAGE}:{GITHUB_MCP_VERSION}"));
        servers.insert(
            "github".to_string(),
            McpServer {
                command: "docker".to_string(),
                args,
                env: BTreeMap::from([(
                    "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
                    "${GITHUB_MCP_SERVER_TOKEN}".to_string(),
                )]),
                tools: github.allowed,
            },
        );
    }

    if data.safe_outputs.as_ref().is_some_and(|s| s.has_any()) {
        servers.insert(
            "safeoutputs".to_string(),
            McpServer {
                command: "node".to_string(),
                args: vec![format!("{SAFE_OUTPUTS_DIR}/mcp-server.cjs")],
                env: BTreeMap::from([
                    ("GH_AW_SAFE_OUTPUTS".to_string(), "${GH_AW_SAFE_OUTPUTS}".to_string()),
                    (
                        "GH_AW_SAFE_OUTPUTS_CONFIG_PATH".to_string(),
                        format!("{SAFE_OUTPUTS_DIR}/config.json"),
                    ),
                    (
                        "GH_AW_SAFE_OUTPUTS_TOOLS_PATH".to_string(),
                        format!("{SAFE_OUTPUTS_DIR}/tools.json"),
                    ),
                ]),
                tools: Vec::new(),
            },
        );
    }

    if tools.contains("serena") {
        servers.insert(
            "serena".to_string(),
            McpServer {
                command: "docker".to_string(),
                args: vec![
                    "run".to_string(),
                    "--rm".to_string(),
                    "-i".to_string(),
                    "-v".to_string(),
                    "${GITHUB_WORKSPACE}:/workspace:rw".to_string(),
                    "-e".to_string(),
                    "SERENA_LANGUAGES".to_string(),
                    SERENA_IMAGE.to_string(),
                    "start-mcp-server".to_string(),
                    "--context".to_string(),
                    "codex".to_string(),
                    "--project".to_string(),
                    "/workspace".to_string(),
                ],
                env: BTreeMap::from([(
                    "SERENA_LANGUAGES".to_string(),
                    serena_languages(tools).join(","),
                )]),
                tools: Vec::new(),
            },
        );
    }

    servers
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonConfig {
    mcp_servers: IndexMap<String, JsonServer>,
}

#[derive(Serialize)]
struct JsonServer {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    command: String,
    args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
}

/// Render the JSON configuration read by Copilot and Claude.
///
/// Copilot entries also carry `"type": "stdio"` and an explicit tool list.
///
/// # Errors
///
/// Returns [`Error::Emit`] when serialization fails.
pub fn render_json(data: &WorkflowData, copilot: bool) -> Result<String> {
    let mcp_servers = mcp_servers(data)
        .into_iter()
        .map(|(name, server)| {
            let tools = copilot.then(|| {
                if server.tools.is_empty() {
                    vec!["*".to_string()]
                } else {
                    server.tools
                }
            });
            let entry = JsonServer {
                kind: copilot.then_some("stdio"),
                command: server.command,
                args: server.args,
                tools,
                env: server.env,
            };
            (name, entry)
        })
        .collect();
    serde_json::to_string_pretty(&JsonConfig { mcp_servers })
        .map_err(|e| Error::emit(format!("failed to serialize MCP config: {e}")))
}

#[derive(Serialize)]
struct CodexConfig {
    history: CodexHistory,
    mcp_servers: IndexMap<String, TomlServer>,
}

#[derive(Serialize)]
struct CodexHistory {
    persistence: &'static str,
}

#[derive(Serialize)]
struct TomlServer {
    command: String,
    args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
}

/// Render the Codex `config.toml`.
///
/// # Errors
///
/// Returns [`Error::Emit`] when serialization fails.
pub fn render_toml(data: &WorkflowData) -> Result<String> {
    let config = CodexConfig {
        history: CodexHistory { persistence: "none" },
        mcp_servers: mcp_servers(data)
            .into_iter()
            .map(|(name, server)| {
                (
                    name,
                    TomlServer {
                        command: server.command,
                        args: server.args,
                        env: server.env,
                    },
                )
            })
            .collect(),
    };
    toml::to_string(&config).map_err(|e| Error::emit(format!("failed to serialize Codex config: {e}")))
}

/// Write the engine's MCP configuration to disk before the agent starts.
///
/// # Errors
///
/// Returns [`Error::Emit`] when the configuration cannot be rendered.
pub fn mcp_setup_step(data: &WorkflowData) -> Result<Step> {
    let engine = data.engine.engine();
    let path = engine.mcp_config_path();
    let dir = path.rsplit_once('/').map_or(path, |(dir, _)| dir);
    let config = engine.render_mcp_config(data)?;
    let mut script = format!("mkdir -p {dir}\ncat > {path} << '{HEREDOC}'\n");
    for line in config.lines() {
        if line == HEREDOC {
            return Err(Error::emit("MCP configuration contains the heredoc delimiter"));
        }
        script.push_str(line);
        script.push('\n');
    }
    script.push_str(HEREDOC);
    script.push('\n');

    let mut step = Step::run(script).with_name("Setup MCPs");
    if let Some(github) = data.tools().github() {
        step = step.with_env(
            "GITHUB_MCP_SERVER_TOKEN",
            mcp_server_token(github.github_token.as_deref(), data.github_token.as_deref()),
        );
    }
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineKind;
    use aw_frontmatter::{SafeOutputsConfig, Tools};

    fn data(tools: &str) -> WorkflowData {
        let mut data = WorkflowData::new("mcp");
        data.frontmatter.tools = serde_yaml::from_str::<Tools>(tools).unwrap();
        data
    }

    #[test]
    fn test_github_server() {
        let servers = mcp_servers(&data("github:\n  toolsets: [issues, repos]\n  read-only: true\n"));
        let github = &servers["github"];
        assert_eq!(github.command, "docker");
        assert!(github.args.contains(&"GITHUB_TOOLSETS=issues,repos".to_string()));
        assert!(github.args.contains(&"GITHUB_READ_ONLY=1".to_string()));
        assert!(github.args.last().unwrap().starts_with(GITHUB_MCP_IMAGE));
    }

    #[test]
    fn test_serena_languages_sorted() {
        let servers = mcp_servers(&data("serena: [typescript, go]\n"));
        assert_eq!(servers["serena"].env["SERENA_LANGUAGES"], "go,typescript");
    }

    #[test]
    fn test_safe_outputs_server_only_when_enabled() {
        let mut data = data("{}");
        assert!(mcp_servers(&data).is_empty());
        data.safe_outputs = Some(serde_yaml::from_str::<SafeOutputsConfig>("add-labels:\n").unwrap());
        let servers = mcp_servers(&data);
        assert_eq!(servers["safeoutputs"].args, vec!["/opt/gh-aw/safeoutputs/mcp-server.cjs"]);
    }

    #[test]
    fn test_copilot_json_has_type_and_tools() {
        let json = render_json(&data("github:\n"), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mcpServers"]["github"]["type"], "stdio");
        assert_eq!(value["mcpServers"]["github"]["tools"][0], "*");

        let json = render_json(&data("github:\n"), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["mcpServers"]["github"].get("type").is_none());
    }

    #[test]
    fn test_codex_toml() {
        let toml = render_toml(&data("github:\n")).unwrap();
        assert!(toml.contains("[history]"));
        assert!(toml.contains("persistence = \"none\""));
        assert!(toml.contains("[mcp_servers.github]"));
    }

    #[test]
    fn test_setup_step_writes_engine_path() {
        let mut data = data("github:\n");
        data.engine = EngineKind::Claude;
        let step = mcp_setup_step(&data).unwrap();
        let run = step.run.unwrap();
        assert!(run.starts_with("mkdir -p /tmp/gh-aw/mcp-config\n"));
        assert!(run.contains("cat > /tmp/gh-aw/mcp-config/mcp-servers.json << 'GH_AW_MCP_CONFIG_EOF'"));
        assert!(run.ends_with("GH_AW_MCP_CONFIG_EOF\n"));
        assert!(step.env.contains_key("GITHUB_MCP_SERVER_TOKEN"));
    }
}
