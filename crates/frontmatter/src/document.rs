//! Splitting a workflow document into its frontmatter header and body.

use aw_core::{Error, Result};

const DELIMITER: &str = "---";

/// A workflow document split at its frontmatter delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document<'a> {
    /// Raw YAML between the `---` lines (empty when there is no header)
    pub frontmatter: &'a str,
    /// Markdown after the closing `---` line
    pub body: &'a str,
    /// One-based line number of the first frontmatter line
    pub frontmatter_line: usize,
}

impl Document<'_> {
    /// Whether the document carried a frontmatter header.
    #[must_use]
    pub fn has_frontmatter(&self) -> bool {
        self.frontmatter_line > 0
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Split `content` into frontmatter and body.
///
/// The header must start on the first line with `---` and end at the next
/// `---` line. Content that does not start with a delimiter has no header and
/// is returned whole as the body.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the opening delimiter is never closed.
pub fn split_document(content: &str) -> Result<Document<'_>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok(Document {
            frontmatter: "",
            body: content,
            frontmatter_line: 0,
        });
    };
    if !is_delimiter(first) {
        return Ok(Document {
            frontmatter: "",
            body: content,
            frontmatter_line: 0,
        });
    }

    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if is_delimiter(line) {
            return Ok(Document {
                frontmatter: &content[header_start..offset],
                body: &content[offset + line.len()..],
                frontmatter_line: 2,
            });
        }
        offset += line.len();
    }

    Err(Error::parse_at(
        "Missing closing '---' frontmatter delimiter",
        1,
    ))
}
