//! Frontmatter deserialization.

use crate::document::split_document;
use crate::model::ParsedFrontmatter;
use aw_core::{Error, Result};
use serde_yaml::Value;
use tracing::debug;

/// A parsed workflow document.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDocument {
    /// The typed header
    pub frontmatter: ParsedFrontmatter,
    /// Markdown prompt after the header
    pub body: String,
}

/// Parse raw frontmatter bytes.
///
/// # Errors
///
/// Returns [`Error::Parse`] for invalid UTF-8, malformed YAML or a header that
/// is not a mapping.
pub fn parse(bytes: &[u8]) -> Result<ParsedFrontmatter> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::parse(format!("frontmatter is not valid UTF-8: {e}")))?;
    parse_header(text, 1)
}

/// Parse frontmatter text.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_str(header: &str) -> Result<ParsedFrontmatter> {
    parse_header(header, 1)
}

/// Split a full document and parse its header.
///
/// Line numbers in parse errors refer to the whole document.
///
/// # Errors
///
/// Returns [`Error::Parse`] for an unterminated or malformed header.
pub fn parse_document(content: &str) -> Result<WorkflowDocument> {
    let doc = split_document(content)?;
    let frontmatter = if doc.has_frontmatter() {
        parse_header(doc.frontmatter, doc.frontmatter_line)?
    } else {
        ParsedFrontmatter::default()
    };
    Ok(WorkflowDocument {
        frontmatter,
        body: doc.body.to_string(),
    })
}

fn parse_header(header: &str, first_line: usize) -> Result<ParsedFrontmatter> {
    let raw: Value = serde_yaml::from_str(header).map_err(|e| yaml_error(&e, first_line))?;
    match raw {
        Value::Null => return Ok(ParsedFrontmatter::default()),
        Value::Mapping(_) => {}
        other => {
            return Err(Error::parse_at(
                format!(
                    "frontmatter must be a mapping, found {}",
                    crate::de::describe(&other)
                ),
                first_line,
            ));
        }
    }

    let parsed: ParsedFrontmatter =
        serde_yaml::from_str(header).map_err(|e| yaml_error(&e, first_line))?;
    if !parsed.extra.is_empty() {
        debug!(
            keys = ?parsed.extra.keys().collect::<Vec<_>>(),
            "frontmatter contains unrecognized keys"
        );
    }
    Ok(parsed)
}

fn yaml_error(err: &serde_yaml::Error, first_line: usize) -> Error {
    match err.location() {
        Some(location) => Error::parse_at(err.to_string(), first_line + location.line() - 1),
        None => Error::parse(err.to_string()),
    }
}
