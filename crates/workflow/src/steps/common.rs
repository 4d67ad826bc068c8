//! Step builders and paths shared by every job.

use crate::schema::Step;

/// Root of the per-run scratch directory.
pub const TMP_DIR: &str = "/tmp/gh-aw";
/// Where the prompt is written before the engine runs.
pub const PROMPT_PATH: &str = "/tmp/gh-aw/aw-prompts/prompt.txt";
/// Combined stdout/stderr of the engine.
pub const AGENT_STDIO_LOG: &str = "/tmp/gh-aw/agent-stdio.log";
/// Engine log directory.
pub const AGENT_LOGS_DIR: &str = "/tmp/gh-aw/sandbox/agent/logs";
/// MCP server log directory.
pub const MCP_LOGS_DIR: &str = "/tmp/gh-aw/mcp-logs";
/// Egress firewall log directory.
pub const FIREWALL_LOGS_DIR: &str = "/tmp/gh-aw/sandbox/firewall/logs";
/// Runtime scripts installed by the setup action.
pub const ACTIONS_DIR: &str = "/opt/gh-aw/actions";
/// Safe-outputs MCP server files.
pub const SAFE_OUTPUTS_DIR: &str = "/opt/gh-aw/safeoutputs";
/// Raw safe-output requests written by the agent.
pub const SAFE_OUTPUTS_JSONL: &str = "/opt/gh-aw/safeoutputs/outputs.jsonl";
/// Directory holding the sanitized agent output in downstream jobs.
pub const AGENT_OUTPUT_DIR: &str = "/tmp/gh-aw/safeoutputs";
/// Sanitized agent output consumed by safe-output jobs.
pub const AGENT_OUTPUT_FILE: &str = "/tmp/gh-aw/safeoutputs/agent_output.json";
/// Artifact name of the sanitized agent output.
pub const AGENT_OUTPUT_ARTIFACT: &str = "agent_output.json";
/// Patch produced for pull-request creation.
pub const PATCH_PATH: &str = "/tmp/gh-aw/aw.patch";
/// Artifact name of the patch.
pub const PATCH_ARTIFACT: &str = "aw.patch";

/// `actions/checkout` pin.
pub const CHECKOUT_ACTION: &str = "actions/checkout@v5";
/// `actions/github-script` pin.
pub const GITHUB_SCRIPT_ACTION: &str = "actions/github-script@v8";
/// `actions/upload-artifact` pin.
pub const UPLOAD_ARTIFACT_ACTION: &str = "actions/upload-artifact@v5";
/// `actions/download-artifact` pin.
pub const DOWNLOAD_ARTIFACT_ACTION: &str = "actions/download-artifact@v6";
/// `actions/setup-node` pin.
pub const SETUP_NODE_ACTION: &str = "actions/setup-node@v6";
/// Node.js version installed for the engine CLIs.
pub const NODE_VERSION: &str = "24";

/// Check out the repository without leaving the token in `.git/config`.
#[must_use]
pub fn checkout_step() -> Step {
    Step::uses(CHECKOUT_ACTION)
        .with_name("Checkout repository")
        .with_input("persist-credentials", false)
}

/// Install the runtime scripts from the setup action into [`ACTIONS_DIR`].
#[must_use]
pub fn setup_scripts_step(setup_action: &str) -> Step {
    Step::uses(setup_action)
        .with_name("Setup Scripts")
        .with_input("destination", ACTIONS_DIR)
}

/// Install Node.js for the engine CLIs.
#[must_use]
pub fn setup_node_step() -> Step {
    Step::uses(SETUP_NODE_ACTION)
        .with_name("Setup Node.js")
        .with_input("node-version", NODE_VERSION)
        .with_input("package-manager-cache", false)
}

/// JavaScript that loads a runtime script and runs its `main`.
///
/// The compiler never inlines script bodies; each github-script step only
/// carries this loader.
#[must_use]
pub fn script_loader(script: &str) -> String {
    format!(
        "const {{ setupGlobals }} = require('{ACTIONS_DIR}/setup_globals.cjs');\n\
         setupGlobals(core, github, context, exec, io);\n\
         const {{ main }} = require('{ACTIONS_DIR}/{script}.cjs');\n\
         await main();\n"
    )
}

/// A github-script step that runs `/opt/gh-aw/actions/<script>.cjs`.
#[must_use]
pub fn github_script_step(name: &str, script: &str, token: Option<&str>) -> Step {
    let mut step = Step::uses(GITHUB_SCRIPT_ACTION).with_name(name);
    if let Some(token) = token {
        step = step.with_input("github-token", token);
    }
    step.with_input("script", script_loader(script))
}

/// Upload files as an artifact; missing files are ignored.
#[must_use]
pub fn upload_artifact_step(name: &str, artifact: &str, paths: &[&str]) -> Step {
    Step::uses(UPLOAD_ARTIFACT_ACTION)
        .with_name(name)
        .with_if("always()")
        .with_input("name", artifact)
        .with_input("path", paths.join("\n"))
        .with_input("if-no-files-found", "ignore")
}

/// Download an artifact into `path`.
#[must_use]
pub fn download_artifact_step(name: &str, artifact: &str, path: &str) -> Step {
    Step::uses(DOWNLOAD_ARTIFACT_ACTION)
        .with_name(name)
        .continue_on_error()
        .with_input("name", artifact)
        .with_input("path", path)
}

/// Download the sanitized agent output and export `GH_AW_AGENT_OUTPUT`.
#[must_use]
pub fn agent_output_steps() -> Vec<Step> {
    vec![
        download_artifact_step(
            "Download agent output artifact",
            AGENT_OUTPUT_ARTIFACT,
            &format!("{AGENT_OUTPUT_DIR}/"),
        ),
        Step::run(format!(
            "mkdir -p {AGENT_OUTPUT_DIR}/\n\
             find \"{AGENT_OUTPUT_DIR}/\" -type f -print\n\
             echo \"GH_AW_AGENT_OUTPUT={AGENT_OUTPUT_FILE}\" >> \"$GITHUB_ENV\"\n"
        ))
        .with_name("Setup agent output environment variable"),
    ]
}

/// Quote a shell word with single quotes when it contains anything beyond
/// a conservative safe set.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@,+%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}
