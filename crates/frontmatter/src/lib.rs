//! Frontmatter parsing and validation for agentic workflow documents.
//!
//! A workflow document is markdown with a YAML header:
//!
//! ```text
//! ---
//! on: issues
//! engine: copilot
//! safe-outputs:
//!   add-labels:
//! ---
//! # Triage
//! Label the new issue.
//! ```
//!
//! [`parse_document`] splits the document and deserializes the header into
//! [`ParsedFrontmatter`]; [`validate`] applies the semantic checks.

mod de;
pub mod document;
pub mod engine;
pub mod model;
pub mod parse;
pub mod permissions;
pub mod safe_outputs;
pub mod tools;
pub mod validate;

pub use aw_core::validate_time_delta;
pub use document::{Document, split_document};
pub use engine::{EngineConfig, EngineSetting};
pub use model::{NetworkConfig, NetworkSetting, ParsedFrontmatter, SecretMasking, VALID_REACTIONS};
pub use parse::{WorkflowDocument, parse, parse_document, parse_str};
pub use permissions::{
    PERMISSION_SCOPES, PermissionLevel, Permissions, PermissionsSpec, resolve_permissions,
};
pub use safe_outputs::{
    AddCommentConfig, AddLabelsConfig, CreateIssueConfig, CreatePullRequestConfig,
    SafeOutputsConfig, UpdateIssueConfig,
};
pub use tools::{
    BashTool, DEFAULT_GITHUB_TOOLSETS, GITHUB_TOOLSETS, GitHubTool, Tools, expand_github_toolsets,
    validate_tools,
};
pub use validate::{
    is_github_expression, validate, validate_labels, validate_safe_output_target,
    validate_safe_outputs, validate_stop_after,
};

/// Alias matching the name used throughout the validators.
pub use permissions::resolve_permissions as validate_permissions;
