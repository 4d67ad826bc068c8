//! Tool catalogue served by the safe-outputs MCP server.
//!
//! Every enabled output kind becomes one MCP tool the agent can call;
//! `missing_tool` and `noop` are always present.

use aw_core::{Error, Result};
use aw_frontmatter::SafeOutputsConfig;
use serde::Serialize;
use serde_json::{Value, json};

/// One MCP tool definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    /// Tool name (`update_issue`)
    pub name: String,
    /// Description shown to the agent
    pub description: String,
    /// JSON Schema for the arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

/// Object schema for a tool's arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSchema {
    #[serde(rename = "type")]
    kind: &'static str,
    /// Required argument names
    pub required: Vec<&'static str>,
    /// Argument schemas keyed by name
    pub properties: Value,
    additional_properties: bool,
}

fn tool(name: &str, description: &str, required: Vec<&'static str>, properties: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: InputSchema {
            kind: "object",
            required,
            properties,
            additional_properties: false,
        },
    }
}

fn issue_number() -> Value {
    json!({
        "type": ["number", "string"],
        "description": "Issue or pull request number; defaults to the triggering one",
    })
}

fn create_issue_tool() -> ToolDefinition {
    tool(
        "create_issue",
        "Create a new GitHub issue",
        vec!["title", "body"],
        json!({
            "title": { "type": "string", "description": "Issue title" },
            "body": { "type": "string", "description": "Issue body in Markdown" },
            "labels": { "type": "array", "items": { "type": "string" }, "description": "Labels to add" },
            "parent": { "type": ["number", "string"], "description": "Parent issue number" },
        }),
    )
}

fn add_comment_tool() -> ToolDefinition {
    tool(
        "add_comment",
        "Add a comment to a GitHub issue, pull request or discussion",
        vec!["body"],
        json!({
            "body": { "type": "string", "description": "Comment body in Markdown" },
            "item_number": issue_number(),
        }),
    )
}

fn add_labels_tool(allowed: &[String]) -> ToolDefinition {
    let description = if allowed.is_empty() {
        "Add labels to a GitHub issue or pull request".to_string()
    } else {
        format!(
            "Add labels to a GitHub issue or pull request. Allowed labels: {}",
            allowed.join(", ")
        )
    };
    tool(
        "add_labels",
        &description,
        vec!["labels"],
        json!({
            "labels": { "type": "array", "items": { "type": "string" }, "description": "Labels to add" },
            "item_number": issue_number(),
        }),
    )
}

fn update_issue_tool() -> ToolDefinition {
    tool(
        "update_issue",
        "Update a GitHub issue. Only the fields enabled in the workflow can be changed.",
        vec![],
        json!({
            "status": {
                "type": "string",
                "enum": ["open", "closed"],
                "description": "New issue state",
            },
            "title": { "type": "string", "description": "New issue title" },
            "body": {
                "type": "string",
                "description": "New body content. How it is combined with the existing body depends on 'operation': append adds it at the end, prepend adds it at the start, replace overwrites the body, and replace-island rewrites only the section this workflow previously added.",
            },
            "operation": {
                "type": "string",
                "enum": ["append", "prepend", "replace", "replace-island"],
                "description": "How to apply 'body' (default: append)",
            },
            "labels": { "type": "array", "items": { "type": "string" }, "description": "Replace the issue's labels" },
            "assignees": { "type": "array", "items": { "type": "string" }, "description": "Replace the issue's assignees" },
            "milestone": { "type": ["number", "string"], "description": "Milestone number" },
            "issue_number": issue_number(),
        }),
    )
}

fn create_pull_request_tool() -> ToolDefinition {
    tool(
        "create_pull_request",
        "Create a pull request from the changes in the workspace",
        vec!["title", "body"],
        json!({
            "title": { "type": "string", "description": "Pull request title" },
            "body": { "type": "string", "description": "Pull request description in Markdown" },
            "branch": { "type": "string", "description": "Branch name; generated when omitted" },
            "labels": { "type": "array", "items": { "type": "string" }, "description": "Labels to add" },
        }),
    )
}

fn missing_tool_tool() -> ToolDefinition {
    tool(
        "missing_tool",
        "Report a tool or capability needed to finish the task that is not available",
        vec!["tool", "reason"],
        json!({
            "tool": { "type": "string", "description": "Name of the missing tool" },
            "reason": { "type": "string", "description": "Why it is needed" },
            "alternatives": { "type": "string", "description": "Possible alternatives" },
        }),
    )
}

fn noop_tool() -> ToolDefinition {
    tool(
        "noop",
        "Record that no action was needed, with a short explanation",
        vec!["message"],
        json!({
            "message": { "type": "string", "description": "Explanation" },
        }),
    )
}

/// Tools for the enabled output kinds, in emission order, followed by
/// `missing_tool` and `noop`.
#[must_use]
pub fn safe_output_tools(config: &SafeOutputsConfig) -> Vec<ToolDefinition> {
    let mut tools = Vec::new();
    if config.create_issue.is_some() {
        tools.push(create_issue_tool());
    }
    if config.add_comment.is_some() {
        tools.push(add_comment_tool());
    }
    if let Some(labels) = &config.add_labels {
        tools.push(add_labels_tool(&labels.allowed));
    }
    if config.update_issue.is_some() {
        tools.push(update_issue_tool());
    }
    if config.create_pull_request.is_some() {
        tools.push(create_pull_request_tool());
    }
    tools.push(missing_tool_tool());
    tools.push(noop_tool());
    tools
}

/// The catalogue as a JSON array.
///
/// # Errors
///
/// Returns [`Error::Emit`] when serialization fails.
pub fn safe_output_tools_json(config: &SafeOutputsConfig) -> Result<String> {
    serde_json::to_string_pretty(&safe_output_tools(config))
        .map_err(|e| Error::emit(format!("failed to serialize safe-output tools: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> SafeOutputsConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_update_issue_schema() {
        let json = safe_output_tools_json(&config("update-issue:\n")).unwrap();
        let tools: Value = serde_json::from_str(&json).unwrap();
        let update = tools
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "update_issue")
            .unwrap();
        let properties = update["inputSchema"]["properties"].as_object().unwrap();
        for key in ["operation", "labels", "assignees", "milestone"] {
            assert!(properties.contains_key(key), "missing {key}");
        }
        let body = properties["body"]["description"].as_str().unwrap();
        for op in ["append", "prepend", "replace-island"] {
            assert!(body.contains(op), "body description missing {op}");
        }
        assert_eq!(update["inputSchema"]["additionalProperties"], false);
    }

    #[test]
    fn test_always_includes_missing_tool_and_noop() {
        let names: Vec<_> = safe_output_tools(&config("add-labels:\n"))
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["add_labels", "missing_tool", "noop"]);
    }

    #[test]
    fn test_allowed_labels_in_description() {
        let tools = safe_output_tools(&config("add-labels:\n  allowed: [bug, docs]\n"));
        assert!(tools[0].description.ends_with("Allowed labels: bug, docs"));
    }
}
