//! Error types for workflow compilation.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, validating or emitting a workflow.
///
/// A failed compile surfaces exactly one of these, describing the first
/// blocking problem with enough context to locate the offending frontmatter
/// entry.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The document or its frontmatter header is malformed.
    #[error("Failed to parse frontmatter: {message}")]
    #[diagnostic(
        code(aw::frontmatter::parse),
        help("The document must start with a '---' line followed by YAML and a closing '---' line")
    )]
    Parse {
        /// The error message
        message: String,
        /// One-based line in the source document, when known
        line: Option<usize>,
    },

    /// A label is the empty string.
    #[error("Label at index {index} cannot be empty")]
    #[diagnostic(code(aw::label::empty), help("Remove the empty entry from 'labels'"))]
    EmptyLabel {
        /// Position of the label in the `labels` list
        index: usize,
    },

    /// A label has leading or trailing whitespace.
    #[error("Label at index {index} has leading or trailing whitespace: {value:?}")]
    #[diagnostic(
        code(aw::label::whitespace),
        help("Trim the whitespace around the label")
    )]
    WhitespaceInLabel {
        /// Position of the label in the `labels` list
        index: usize,
        /// The offending label
        value: String,
    },

    /// A time-delta component exceeds its ceiling.
    #[error("time delta too large: {value} {unit} exceeds maximum of {max}")]
    #[diagnostic(
        code(aw::time_delta::overflow),
        help("Time deltas are limited to roughly one year")
    )]
    TimeDeltaOverflow {
        /// Plural unit name (e.g. "days")
        unit: String,
        /// The value that was supplied
        value: u64,
        /// The ceiling for that unit
        max: u64,
    },

    /// A time-delta expression could not be parsed.
    #[error("{message}")]
    #[diagnostic(
        code(aw::time_delta::invalid),
        help("Expected format like +25h, +3d, +1w, +1mo, +1d12h")
    )]
    InvalidTimeDelta {
        /// The error message
        message: String,
    },

    /// A date-time string could not be parsed.
    #[error("unable to parse date-time: {value:?}")]
    #[diagnostic(
        code(aw::time::invalid_date),
        help("Use YYYY-MM-DD HH:MM:SS, an ISO 8601 timestamp, or a relative delta like +7d")
    )]
    InvalidDate {
        /// The rejected input
        value: String,
    },

    /// A safe-output emitter was invoked without a safe-outputs configuration.
    #[error("safe-outputs configuration is required to build the {job} job")]
    #[diagnostic(
        code(aw::safe_outputs::missing),
        help("Add a 'safe-outputs:' section to the workflow frontmatter")
    )]
    MissingSafeOutputs {
        /// The job that was being built
        job: String,
    },

    /// The frontmatter is well-formed but semantically inconsistent.
    #[error("{message}")]
    #[diagnostic(code(aw::config), help("{help}"))]
    InvalidConfig {
        /// Frontmatter field the problem was found in
        field: String,
        /// The error message
        message: String,
        /// Help text for the user
        help: String,
    },

    /// Job dependencies are inconsistent.
    #[error("{message}")]
    #[diagnostic(code(aw::jobs::graph))]
    JobGraph {
        /// The error message
        message: String,
    },

    /// A downstream failure while assembling the workflow YAML.
    #[error("Failed to emit workflow: {message}")]
    #[diagnostic(
        code(aw::emit),
        help("This is a compiler bug; please report it with the workflow that triggered it")
    )]
    Emit {
        /// The error message
        message: String,
    },

    /// Wrapped TOML parsing error.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(aw::toml_parse))]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Create a new parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            line: None,
        }
    }

    /// Create a new parse error anchored at a source line.
    #[must_use]
    pub fn parse_at(message: impl Into<String>, line: usize) -> Self {
        Self::Parse {
            message: message.into(),
            line: Some(line),
        }
    }

    /// Create a new time-delta parse error.
    #[must_use]
    pub fn invalid_time_delta(message: impl Into<String>) -> Self {
        Self::InvalidTimeDelta {
            message: message.into(),
        }
    }

    /// Create a new invalid date error.
    #[must_use]
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }

    /// Create a new missing safe-outputs error for the named job.
    #[must_use]
    pub fn missing_safe_outputs(job: impl Into<String>) -> Self {
        Self::MissingSafeOutputs { job: job.into() }
    }

    /// Create a new configuration error.
    #[must_use]
    pub fn config(
        field: impl Into<String>,
        message: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a new job graph error.
    #[must_use]
    pub fn job_graph(message: impl Into<String>) -> Self {
        Self::JobGraph {
            message: message.into(),
        }
    }

    /// Create a new emit error.
    #[must_use]
    pub fn emit(message: impl Into<String>) -> Self {
        Self::Emit {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_safe_outputs_message() {
        let err = Error::missing_safe_outputs("add_labels");
        assert!(
            err.to_string()
                .contains("safe-outputs configuration is required")
        );
        assert!(err.to_string().contains("add_labels"));
    }

    #[test]
    fn test_label_errors_carry_context() {
        let err = Error::EmptyLabel { index: 2 };
        assert!(err.to_string().contains("index 2"));

        let err = Error::WhitespaceInLabel {
            index: 0,
            value: " bug".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("index 0"));
        assert!(msg.contains("\" bug\""));
    }

    #[test]
    fn test_overflow_names_unit_and_value() {
        let err = Error::TimeDeltaOverflow {
            unit: "days".to_string(),
            value: 400,
            max: 365,
        };
        assert_eq!(
            err.to_string(),
            "time delta too large: 400 days exceeds maximum of 365"
        );
    }

    #[test]
    fn test_config_error_displays_message_only() {
        let err = Error::config(
            "safe-outputs.update-issue.target",
            "invalid target value for update-issue: \"event\"",
            "Use 'triggering', '*', or an issue number",
        );
        assert_eq!(
            err.to_string(),
            "invalid target value for update-issue: \"event\""
        );
    }

    #[test]
    fn test_invalid_date_message() {
        let err = Error::invalid_date("Foo 1, 2025");
        assert!(err.to_string().contains("unable to parse date-time"));
    }

    #[test]
    fn test_diagnostic_codes() {
        use miette::Diagnostic;
        let err = Error::parse("bad yaml");
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("aw::frontmatter::parse".to_string())
        );
    }
}
