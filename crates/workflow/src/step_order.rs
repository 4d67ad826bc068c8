//! Ordering checks for the agent job.
//!
//! Anything the agent job uploads after the engine has run may contain
//! secrets echoed by the agent. The tracker records redaction and upload
//! steps as they are appended and verifies that every upload follows the
//! redaction step and only covers paths the redaction step scans.

use aw_core::{Error, Result};
use tracing::debug;

/// A recorded step after agent execution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StepKind {
    SecretRedaction,
    ArtifactUpload { name: String, paths: Vec<String> },
}

/// Records post-agent steps and validates their order.
#[derive(Debug, Default)]
pub struct StepOrderTracker {
    steps: Vec<StepKind>,
    agent_complete: bool,
}

impl StepOrderTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the engine execution as finished. Records made before this are
    /// ignored.
    pub fn mark_agent_execution_complete(&mut self) {
        self.agent_complete = true;
    }

    /// Record the secret redaction step.
    pub fn record_secret_redaction(&mut self) {
        if self.agent_complete {
            self.steps.push(StepKind::SecretRedaction);
        }
    }

    /// Record an artifact upload of `paths`.
    pub fn record_artifact_upload(&mut self, name: &str, paths: &[&str]) {
        if self.agent_complete {
            self.steps.push(StepKind::ArtifactUpload {
                name: name.to_string(),
                paths: paths.iter().map(|p| (*p).to_string()).collect(),
            });
        }
    }

    /// Check that redaction precedes every upload and that every uploaded
    /// path is scanned by it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emit`] describing the first violation.
    pub fn validate_step_ordering(&self) -> Result<()> {
        let redaction = self
            .steps
            .iter()
            .position(|s| *s == StepKind::SecretRedaction);
        let uploads: Vec<(usize, &str, &[String])> = self
            .steps
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                StepKind::ArtifactUpload { name, paths } => Some((i, name.as_str(), paths.as_slice())),
                StepKind::SecretRedaction => None,
            })
            .collect();

        if uploads.is_empty() {
            return Ok(());
        }
        let Some(redaction) = redaction else {
            return Err(Error::emit(
                "artifact uploads found but no secret redaction step was added",
            ));
        };

        for (index, name, paths) in uploads {
            if index < redaction {
                return Err(Error::emit(format!(
                    "secret redaction must happen before artifact uploads (upload '{name}' comes first)"
                )));
            }
            if let Some(path) = paths.iter().find(|p| !is_path_scanned_by_secret_redaction(p)) {
                return Err(Error::emit(format!(
                    "artifact upload '{name}' includes path {path:?} not covered by secret redaction"
                )));
            }
        }
        debug!(steps = self.steps.len(), "step ordering validated");
        Ok(())
    }
}

const SCANNED_EXTENSIONS: &[&str] = &[".json", ".txt", ".log", ".jsonl"];

/// Whether the secret redaction step scans `path`.
///
/// Redaction walks `/tmp/gh-aw/` and `/opt/gh-aw/` and rewrites text files
/// with the listed extensions. Environment references are resolved at run
/// time to one of those locations.
#[must_use]
pub fn is_path_scanned_by_secret_redaction(path: &str) -> bool {
    let path = path.trim();
    if path.starts_with("${{ env.") {
        return true;
    }
    if !(path.starts_with("/tmp/gh-aw/") || path.starts_with("/opt/gh-aw/")) {
        return false;
    }
    path.ends_with('/') || SCANNED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
