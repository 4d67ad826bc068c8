//! GitHub Actions workflow schema types.
//!
//! Jobs and steps of the lock file, rendered by [`crate::yaml`]. Field
//! order in each struct is the key order in the emitted YAML.
//! See: <https://docs.github.com/en/actions/using-workflows/workflow-syntax-for-github-actions>

use aw_core::Result;
use aw_frontmatter::Permissions;
use indexmap::IndexMap;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Concurrency configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Concurrency {
    /// Concurrency group name
    pub group: String,

    /// Cancel in-progress runs of the same group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_in_progress: Option<bool>,
}

/// Runner specification for a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunsOn {
    /// A single runner label
    Label(String),
    /// Runner labels that must all match
    Labels(Vec<String>),
    /// A group/labels mapping passed through from frontmatter
    Custom(Value),
}

impl RunsOn {
    /// Interpret a frontmatter `runs-on` value.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(label) => Self::Label(label.clone()),
            Value::Sequence(items) if items.iter().all(Value::is_string) => Self::Labels(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            other => Self::Custom(other.clone()),
        }
    }
}

impl From<&str> for RunsOn {
    fn from(label: &str) -> Self {
        Self::Label(label.to_string())
    }
}

/// A job in the lock file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    /// Key under `jobs:`
    #[serde(skip)]
    pub id: String,

    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Jobs that must finish first, in declaration order
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "serialize_needs")]
    pub needs: Vec<String>,

    /// Conditional execution expression
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_condition: Option<String>,

    /// Runner
    pub runs_on: RunsOn,

    /// Job-level `GITHUB_TOKEN` permissions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,

    /// Job concurrency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Concurrency>,

    /// Timeout in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,

    /// Job-level environment
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, Value>,

    /// Outputs exposed to dependent jobs
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, String>,

    /// Steps, executed in order
    pub steps: Vec<Step>,
}

fn serialize_needs<S: Serializer>(needs: &[String], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match needs {
        [single] => serializer.serialize_str(single),
        many => many.serialize(serializer),
    }
}

impl Job {
    /// Create an empty job with the given id and runner.
    pub fn new(id: impl Into<String>, runs_on: impl Into<RunsOn>) -> Self {
        Self {
            id: id.into(),
            name: None,
            needs: Vec::new(),
            if_condition: None,
            runs_on: runs_on.into(),
            permissions: None,
            concurrency: None,
            timeout_minutes: None,
            env: IndexMap::new(),
            outputs: IndexMap::new(),
            steps: Vec::new(),
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a dependency; duplicates are ignored
    #[must_use]
    pub fn with_need(mut self, job: impl Into<String>) -> Self {
        let job = job.into();
        if !self.needs.contains(&job) {
            self.needs.push(job);
        }
        self
    }

    /// Set a condition
    #[must_use]
    pub fn with_if(mut self, condition: impl Into<String>) -> Self {
        self.if_condition = Some(condition.into());
        self
    }

    /// Set permissions
    #[must_use]
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, minutes: u32) -> Self {
        self.timeout_minutes = Some(minutes);
        self
    }

    /// Add an output
    #[must_use]
    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    /// Append a step
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append steps
    #[must_use]
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }
}

/// A step in a job.
///
/// Steps either `uses` an action or `run` a shell script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Step {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Identifier for referencing step outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Conditional execution expression
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_condition: Option<String>,

    /// Keep going when the step fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_error: Option<bool>,

    /// Action reference (`owner/repo@ref`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,

    /// Shell script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,

    /// Shell for `run`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Working directory for `run`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Step environment
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, Value>,

    /// Action inputs
    #[serde(default, rename = "with", skip_serializing_if = "IndexMap::is_empty")]
    pub with_inputs: IndexMap<String, Value>,

    /// Step timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,

    /// Keys passed through from custom steps
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Step {
    /// Create a step that uses an action
    pub fn uses(action: impl Into<String>) -> Self {
        Self {
            uses: Some(action.into()),
            ..Default::default()
        }
    }

    /// Create a step that runs a shell script
    pub fn run(command: impl Into<String>) -> Self {
        Self {
            run: Some(command.into()),
            ..Default::default()
        }
    }

    /// Interpret a custom step written in frontmatter.
    ///
    /// # Errors
    ///
    /// Returns [`aw_core::Error::InvalidConfig`] when the value is not a step
    /// mapping.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_yaml::from_value(value.clone()).map_err(|e| {
            aw_core::Error::config(
                "steps",
                format!("invalid custom step: {e}"),
                "Each step needs a mapping with 'uses' or 'run'",
            )
        })
    }

    /// Set the step name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the step ID
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a `with` input
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_inputs.insert(key.into(), value.into());
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), Value::String(value.into()));
        self
    }

    /// Set a condition
    #[must_use]
    pub fn with_if(mut self, condition: impl Into<String>) -> Self {
        self.if_condition = Some(condition.into());
        self
    }

    /// Set working directory
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Keep the job going when this step fails
    #[must_use]
    pub const fn continue_on_error(mut self) -> Self {
        self.continue_on_error = Some(true);
        self
    }

    /// Environment value for `key`, if it is a string.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.get(key).and_then(Value::as_str)
    }
}
