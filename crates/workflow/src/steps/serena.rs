//! Serena language service.
//!
//! Serena runs as a container started by the MCP configuration, so the agent
//! job needs no host-side setup for it.

use crate::schema::Step;
use aw_frontmatter::Tools;

/// Container image for the Serena MCP server.
pub const SERENA_IMAGE: &str = "ghcr.io/oraios/serena:latest";

/// Host-side setup steps for Serena. Always empty.
#[must_use]
pub fn serena_setup_steps(_tools: &Tools) -> Vec<Step> {
    Vec::new()
}

/// Declared languages in lexical order.
#[must_use]
pub fn serena_languages(tools: &Tools) -> Vec<String> {
    tools.serena_languages()
}
