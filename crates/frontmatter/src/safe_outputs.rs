//! The `safe-outputs:` frontmatter section.
//!
//! Each key enables one auxiliary job that applies the agent's requested
//! GitHub writes with its own narrowly scoped token. The agent itself never
//! gets write access.

use crate::de::{enabled, presence, string_or_list};
use indexmap::IndexMap;
use serde::Deserialize;

/// Safe-output policy for a workflow.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SafeOutputsConfig {
    /// `create-issue`
    #[serde(default, deserialize_with = "enabled")]
    pub create_issue: Option<CreateIssueConfig>,

    /// `add-comment`
    #[serde(default, deserialize_with = "enabled")]
    pub add_comment: Option<AddCommentConfig>,

    /// `add-labels`
    #[serde(default, deserialize_with = "enabled")]
    pub add_labels: Option<AddLabelsConfig>,

    /// `update-issue`
    #[serde(default, deserialize_with = "enabled")]
    pub update_issue: Option<UpdateIssueConfig>,

    /// `create-pull-request`
    #[serde(default, deserialize_with = "enabled")]
    pub create_pull_request: Option<CreatePullRequestConfig>,

    /// Preview mode: jobs report what they would do instead of doing it
    #[serde(default)]
    pub staged: bool,

    /// Token override for every safe-output job
    #[serde(default)]
    pub github_token: Option<String>,

    /// Maximum patch size in KiB for pull-request creation
    #[serde(default)]
    pub max_patch_size: Option<u32>,

    /// Output kinds this compiler does not know about
    #[serde(flatten)]
    pub other: IndexMap<String, serde_yaml::Value>,
}

impl SafeOutputsConfig {
    /// Whether any output kind is enabled.
    #[must_use]
    pub fn has_any(&self) -> bool {
        !self.enabled_kinds().is_empty()
    }

    /// Enabled output kinds in their emission order, as tool names
    /// (`create_issue`, `add_labels`, ...).
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        if self.create_issue.is_some() {
            kinds.push("create_issue");
        }
        if self.add_comment.is_some() {
            kinds.push("add_comment");
        }
        if self.add_labels.is_some() {
            kinds.push("add_labels");
        }
        if self.update_issue.is_some() {
            kinds.push("update_issue");
        }
        if self.create_pull_request.is_some() {
            kinds.push("create_pull_request");
        }
        kinds
    }
}

/// `create-issue` options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateIssueConfig {
    /// Prefix prepended to every issue title
    #[serde(default)]
    pub title_prefix: Option<String>,
    /// Labels added to every issue
    #[serde(default, deserialize_with = "string_or_list")]
    pub labels: Vec<String>,
    /// Users assigned to every issue
    #[serde(default, deserialize_with = "string_or_list")]
    pub assignees: Vec<String>,
    /// Maximum issues per run
    #[serde(default)]
    pub max: Option<u32>,
    /// Auto-close after this long (`7`, `"2w"`, `false`)
    #[serde(default)]
    pub expires: Option<serde_yaml::Value>,
    /// Token override for this job
    #[serde(default)]
    pub github_token: Option<String>,
}

/// `add-comment` options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddCommentConfig {
    /// Maximum comments per run
    #[serde(default)]
    pub max: Option<u32>,
    /// Which issue or pull request to comment on
    #[serde(default)]
    pub target: Option<String>,
    /// Comment on discussions instead of issues
    #[serde(default)]
    pub discussion: Option<bool>,
    /// Token override for this job
    #[serde(default)]
    pub github_token: Option<String>,
}

/// `add-labels` options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddLabelsConfig {
    /// Labels the agent may add; empty means any label
    #[serde(default, deserialize_with = "string_or_list")]
    pub allowed: Vec<String>,
    /// Maximum labels per run
    #[serde(default)]
    pub max: Option<u32>,
    /// Which issue or pull request to label
    #[serde(default)]
    pub target: Option<String>,
    /// Token override for this job
    #[serde(default)]
    pub github_token: Option<String>,
}

/// `update-issue` options.
///
/// `status`, `title` and `body` are permission flags: listing the key allows
/// the agent to change that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdateIssueConfig {
    /// Allow open/closed changes
    #[serde(default, deserialize_with = "presence")]
    pub status: bool,
    /// Allow title changes
    #[serde(default, deserialize_with = "presence")]
    pub title: bool,
    /// Allow body changes
    #[serde(default, deserialize_with = "presence")]
    pub body: bool,
    /// Which issue to update
    #[serde(default)]
    pub target: Option<String>,
    /// Maximum updates per run
    #[serde(default)]
    pub max: Option<u32>,
    /// Token override for this job
    #[serde(default)]
    pub github_token: Option<String>,
}

/// `create-pull-request` options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreatePullRequestConfig {
    /// Prefix prepended to the pull-request title
    #[serde(default)]
    pub title_prefix: Option<String>,
    /// Labels added to the pull request
    #[serde(default, deserialize_with = "string_or_list")]
    pub labels: Vec<String>,
    /// Reviewers requested on the pull request
    #[serde(default, deserialize_with = "string_or_list")]
    pub reviewers: Vec<String>,
    /// Open as draft (defaults to true)
    #[serde(default)]
    pub draft: Option<bool>,
    /// Allow creating a pull request from an empty patch
    #[serde(default)]
    pub allow_empty: bool,
    /// Behaviour when the agent produced no changes: `warn`, `error`, `ignore`
    #[serde(default)]
    pub if_no_changes: Option<String>,
    /// Token override for this job
    #[serde(default)]
    pub github_token: Option<String>,
}
