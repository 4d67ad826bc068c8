//! GitHub token selection.
//!
//! Every place that needs a token resolves it the same way: an explicit
//! per-feature token wins, then the workflow-level `github-token`, then a
//! fallback chain of repository secrets.

/// Fallback for the GitHub MCP server.
pub const DEFAULT_MCP_SERVER_TOKEN: &str = "${{ secrets.GH_AW_GITHUB_MCP_SERVER_TOKEN || secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}";

/// Fallback for safe-output jobs.
pub const DEFAULT_SAFE_OUTPUTS_TOKEN: &str =
    "${{ secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}";

/// Fallback for the Copilot CLI.
pub const DEFAULT_COPILOT_TOKEN: &str =
    "${{ secrets.COPILOT_GITHUB_TOKEN || secrets.GH_AW_GITHUB_TOKEN }}";

fn pick<'a>(custom: Option<&'a str>, top_level: Option<&'a str>, default: &'a str) -> &'a str {
    custom
        .filter(|t| !t.is_empty())
        .or_else(|| top_level.filter(|t| !t.is_empty()))
        .unwrap_or(default)
}

/// Token for the GitHub MCP server.
#[must_use]
pub fn mcp_server_token<'a>(custom: Option<&'a str>, top_level: Option<&'a str>) -> &'a str {
    pick(custom, top_level, DEFAULT_MCP_SERVER_TOKEN)
}

/// Token for a safe-output job.
#[must_use]
pub fn safe_outputs_token<'a>(custom: Option<&'a str>, top_level: Option<&'a str>) -> &'a str {
    pick(custom, top_level, DEFAULT_SAFE_OUTPUTS_TOKEN)
}

/// Token for the Copilot CLI.
#[must_use]
pub fn copilot_token<'a>(custom: Option<&'a str>) -> &'a str {
    pick(custom, None, DEFAULT_COPILOT_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(
            safe_outputs_token(Some("${{ secrets.A }}"), Some("${{ secrets.B }}")),
            "${{ secrets.A }}"
        );
        assert_eq!(
            safe_outputs_token(None, Some("${{ secrets.B }}")),
            "${{ secrets.B }}"
        );
        assert_eq!(safe_outputs_token(None, None), DEFAULT_SAFE_OUTPUTS_TOKEN);
    }

    #[test]
    fn test_empty_custom_falls_through() {
        assert_eq!(mcp_server_token(Some(""), None), DEFAULT_MCP_SERVER_TOKEN);
    }

    #[test]
    fn test_default_chains() {
        assert!(DEFAULT_MCP_SERVER_TOKEN.starts_with("${{ secrets.GH_AW_GITHUB_MCP_SERVER_TOKEN"));
        assert!(copilot_token(None).contains("COPILOT_GITHUB_TOKEN"));
    }
}
