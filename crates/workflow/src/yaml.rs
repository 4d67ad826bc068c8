//! Deterministic YAML rendering for lock files.
//!
//! `serde_yaml` puts block sequences at the same column as their key, while
//! lock files indent them (`steps:` at 4, `- ` at 6, step keys at 8, env keys
//! at 10). This writer renders a [`serde_yaml::Value`] with that layout:
//!
//! - two-space indentation, sequences indented under their key
//! - multi-line strings as `|` block scalars
//! - strings that would read back as another type are double-quoted
//! - `null` mapping values render as a bare `key:`
//!
//! Output depends only on the input value, so identical inputs always render
//! to identical bytes.

use crate::schema::{Job, Step};
use aw_core::{Error, Result};
use regex::Regex;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fmt::Write as _;
use std::sync::LazyLock;

/// Column of `- ` for step entries inside a job.
pub const STEP_INDENT: usize = 6;

#[allow(clippy::expect_used)]
static PLAIN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-/]*$").expect("plain key regex is valid")
});

#[allow(clippy::expect_used)]
static DATE_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("date regex is valid"));

#[allow(clippy::expect_used)]
static NUMBER_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(\.\d+|\d[\d_]*(\.\d*)?)([eE][-+]?\d+)?$|^0[xXoObB][0-9a-fA-F_]+$|^[-+]?\d+(:\d+)+$")
        .expect("number regex is valid")
});

const RESERVED: &[&str] = &[
    "true", "false", "yes", "no", "on", "off", "y", "n", "null", "~", ".inf", "-.inf", "+.inf",
    ".nan",
];

/// Serialize `value` and render it as a YAML document.
///
/// # Errors
///
/// Returns [`Error::Emit`] when the value cannot be represented as YAML.
pub fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_yaml::to_value(value)
        .map_err(|e| Error::emit(format!("failed to serialize workflow: {e}")))?;
    Ok(render(&value, 0))
}

/// Render a value whose top-level block starts at `indent`.
#[must_use]
pub fn render(value: &Value, indent: usize) -> String {
    let mut out = String::new();
    match value {
        Value::Mapping(map) if !map.is_empty() => write_mapping(&mut out, map, indent),
        Value::Sequence(seq) if !seq.is_empty() => write_sequence(&mut out, seq, indent),
        Value::Tagged(tagged) => return render(&tagged.value, indent),
        other => {
            pad(&mut out, indent);
            out.push_str(&inline(other));
            out.push('\n');
        }
    }
    out
}

impl Step {
    /// Render as a job-level sequence entry (`- ` at column six).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emit`] when serialization fails.
    pub fn to_fragment(&self) -> Result<String> {
        let value = serde_yaml::to_value(std::slice::from_ref(self))
            .map_err(|e| Error::emit(format!("failed to serialize step: {e}")))?;
        Ok(render(&value, STEP_INDENT))
    }
}

impl Job {
    /// Render as an entry under `jobs:` (job id at column two).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emit`] when serialization fails.
    pub fn to_fragment(&self) -> Result<String> {
        let body = serde_yaml::to_value(self)
            .map_err(|e| Error::emit(format!("failed to serialize job {}: {e}", self.id)))?;
        let mut map = Mapping::new();
        map.insert(Value::String(self.id.clone()), body);
        Ok(render(&Value::Mapping(map), 2))
    }

    /// Render only the `steps:` block (key at column four).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emit`] when serialization fails.
    pub fn steps_yaml(&self) -> Result<String> {
        let steps = serde_yaml::to_value(&self.steps)
            .map_err(|e| Error::emit(format!("failed to serialize steps of {}: {e}", self.id)))?;
        let mut map = Mapping::new();
        map.insert(Value::String("steps".to_string()), steps);
        Ok(render(&Value::Mapping(map), 4))
    }
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat_n(' ', indent));
}

fn write_mapping(out: &mut String, map: &Mapping, indent: usize) {
    for (key, value) in map {
        pad(out, indent);
        out.push_str(&render_key(key));
        out.push(':');
        write_mapping_value(out, value, indent);
    }
}

fn write_mapping_value(out: &mut String, value: &Value, indent: usize) {
    match value {
        Value::Null => out.push('\n'),
        Value::Tagged(tagged) => write_mapping_value(out, &tagged.value, indent),
        Value::Mapping(map) if !map.is_empty() => {
            out.push('\n');
            write_mapping(out, map, indent + 2);
        }
        Value::Sequence(seq) if !seq.is_empty() => {
            out.push('\n');
            write_sequence(out, seq, indent + 2);
        }
        Value::String(s) if use_block_scalar(s) => write_block(out, s, indent),
        other => {
            out.push(' ');
            out.push_str(&inline(other));
            out.push('\n');
        }
    }
}

fn write_sequence(out: &mut String, seq: &[Value], indent: usize) {
    for item in seq {
        write_sequence_item(out, item, indent);
    }
}

fn write_sequence_item(out: &mut String, item: &Value, indent: usize) {
    match item {
        Value::Tagged(tagged) => write_sequence_item(out, &tagged.value, indent),
        Value::Mapping(map) if !map.is_empty() => {
            let mut nested = String::new();
            write_mapping(&mut nested, map, indent + 2);
            push_as_item(out, &nested, indent);
        }
        Value::Sequence(seq) if !seq.is_empty() => {
            let mut nested = String::new();
            write_sequence(&mut nested, seq, indent + 2);
            push_as_item(out, &nested, indent);
        }
        Value::String(s) if use_block_scalar(s) => {
            pad(out, indent);
            out.push('-');
            write_block(out, s, indent);
        }
        Value::Null => {
            pad(out, indent);
            out.push_str("-\n");
        }
        other => {
            pad(out, indent);
            out.push_str("- ");
            out.push_str(&inline(other));
            out.push('\n');
        }
    }
}

/// Replace the leading `indent + 2` spaces of a nested block with `- `.
fn push_as_item(out: &mut String, nested: &str, indent: usize) {
    pad(out, indent);
    out.push_str("- ");
    out.push_str(&nested[indent + 2..]);
}

/// Blank-only text such as `"\n"` has no block form that reads back exactly.
fn use_block_scalar(s: &str) -> bool {
    s.contains('\n')
        && s.lines().any(|line| !line.trim().is_empty())
        && !s.chars().any(|c| c.is_control() && c != '\n' && c != '\t')
}

/// Write ` |` plus the lines of `s` at `indent + 2`.
fn write_block(out: &mut String, s: &str, indent: usize) {
    let (body, chomp) = match s.strip_suffix('\n') {
        Some(rest) if rest.ends_with('\n') => (rest, "+"),
        Some(rest) => (rest, ""),
        None => (s, "-"),
    };
    let needs_indicator = body
        .split('\n')
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with(' '));

    out.push_str(" |");
    if needs_indicator {
        out.push('2');
    }
    out.push_str(chomp);
    out.push('\n');
    for line in body.split('\n') {
        if !line.is_empty() {
            pad(out, indent + 2);
            out.push_str(line);
        }
        out.push('\n');
    }
}

fn render_key(key: &Value) -> String {
    match key {
        Value::String(s) if PLAIN_KEY.is_match(s) && !is_reserved_key(s) => s.clone(),
        Value::String(s) => double_quoted(s),
        other => inline(other),
    }
}

/// `on` stays plain since GitHub reads it as the trigger key.
fn is_reserved_key(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower != "on" && RESERVED.contains(&lower.as_str())
}

fn inline(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => scalar(s),
        Value::Sequence(_) => "[]".to_string(),
        Value::Mapping(_) => "{}".to_string(),
        Value::Tagged(tagged) => inline(&tagged.value),
    }
}

/// Render a string scalar, quoting it when a plain scalar would change
/// its meaning.
#[must_use]
pub fn scalar(s: &str) -> String {
    if needs_quotes(s) {
        double_quoted(s)
    } else {
        s.to_string()
    }
}

fn needs_quotes(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return true;
    };
    s.trim() != s
        || "-?:,[]{}#&*!|>'\"%@`".contains(first)
        || s.contains(": ")
        || s.contains(" #")
        || s.ends_with(':')
        || s.chars().any(char::is_control)
        || RESERVED.contains(&s.to_ascii_lowercase().as_str())
        || NUMBER_LIKE.is_match(s)
        || DATE_LIKE.is_match(s)
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn test_sequences_are_indented_under_keys() {
        let value = yaml("jobs:\n  agent:\n    steps:\n      - name: A\n        env:\n          K: v\n");
        let out = render(&value, 0);
        assert_eq!(
            out,
            "jobs:\n  agent:\n    steps:\n      - name: A\n        env:\n          K: v\n"
        );
    }

    #[test]
    fn test_ambiguous_strings_are_quoted() {
        assert_eq!(scalar("true"), "\"true\"");
        assert_eq!(scalar("False"), "\"False\"");
        assert_eq!(scalar("10"), "\"10\"");
        assert_eq!(scalar("1.5"), "\"1.5\"");
        assert_eq!(scalar(""), "\"\"");
        assert_eq!(scalar("2025-01-01 00:00:00"), "\"2025-01-01 00:00:00\"");
        assert_eq!(scalar("a: b"), "\"a: b\"");
        assert_eq!(scalar("!cancelled()"), "\"!cancelled()\"");
        assert_eq!(scalar("*"), "\"*\"");
        assert_eq!(scalar("12:30"), "\"12:30\"");
    }

    #[test]
    fn test_plain_strings_stay_plain() {
        assert_eq!(scalar("ubuntu-latest"), "ubuntu-latest");
        assert_eq!(scalar("${{ secrets.GITHUB_TOKEN }}"), "${{ secrets.GITHUB_TOKEN }}");
        assert_eq!(scalar("actions/checkout@v5"), "actions/checkout@v5");
        assert_eq!(
            scalar("(!cancelled()) && (needs.agent.result != 'skipped')"),
            "(!cancelled()) && (needs.agent.result != 'skipped')"
        );
        assert_eq!(scalar("v1.2.3"), "v1.2.3");
    }

    #[test]
    fn test_block_scalars() {
        let value = yaml("run: \"echo a\\necho b\\n\"");
        assert_eq!(render(&value, 0), "run: |\n  echo a\n  echo b\n");

        let value = yaml("run: \"no newline\\nend\"");
        assert_eq!(render(&value, 0), "run: |-\n  no newline\n  end\n");

        let value = yaml("run: \"  indented\\nnext\\n\"");
        assert_eq!(render(&value, 0), "run: |2\n    indented\n  next\n");
    }

    #[test]
    fn test_block_scalar_blank_lines_have_no_padding() {
        let value = yaml("run: \"a\\n\\nb\\n\"");
        assert_eq!(render(&value, 4), "    run: |\n      a\n\n      b\n");
    }

    #[test]
    fn test_block_scalar_round_trips() {
        let original = "set -e\n  nested\n\nlast line\n";
        let mut map = Mapping::new();
        map.insert(Value::String("run".into()), Value::String(original.into()));
        let out = render(&Value::Mapping(map), 0);
        let back: Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(back.get("run").and_then(Value::as_str), Some(original));
    }

    #[test]
    fn test_blank_multiline_strings_are_quoted() {
        for original in ["\n", "\n\n", " \n", "\n  \n"] {
            let mut map = Mapping::new();
            map.insert(Value::String("run".into()), Value::String(original.into()));
            let out = render(&Value::Mapping(map), 0);
            assert!(!out.contains('|'), "{out:?}");
            let back: Value = serde_yaml::from_str(&out).unwrap();
            assert_eq!(back.get("run").and_then(Value::as_str), Some(original));
        }
        assert_eq!(scalar("\n"), "\"\\n\"");
    }

    #[test]
    fn test_null_and_empty_values() {
        let value = yaml("on:\n  workflow_dispatch:\npermissions: {}\nlist: []\n");
        assert_eq!(
            render(&value, 0),
            "on:\n  workflow_dispatch:\npermissions: {}\nlist: []\n"
        );
    }

    #[test]
    fn test_reserved_keys_quoted_except_on() {
        let value = yaml("\"yes\": 1\non: push\n");
        assert_eq!(render(&value, 0), "\"yes\": 1\non: push\n");
    }

    #[test]
    fn test_nested_sequences() {
        let value = yaml("matrix:\n  - [a, b]\n  - c\n");
        assert_eq!(render(&value, 0), "matrix:\n  - - a\n    - b\n  - c\n");
    }

    #[test]
    fn test_step_fragment_layout() {
        let step = Step::uses("actions/github-script@v8")
            .with_name("Add Labels")
            .with_env("GH_AW_SAFE_OUTPUTS_STAGED", "true");
        let fragment = step.to_fragment().unwrap();
        assert!(fragment.starts_with("      - name: Add Labels\n"));
        assert!(fragment.contains("\n        uses: actions/github-script@v8\n"));
        assert!(fragment.contains("\n          GH_AW_SAFE_OUTPUTS_STAGED: \"true\"\n"));
        assert!(fragment.ends_with('\n'));
    }

    #[test]
    fn test_job_fragment_layout() {
        let job = Job::new("add_labels", "ubuntu-slim")
            .with_need("agent")
            .with_step(Step::run("echo hi").with_name("Say hi"));
        let fragment = job.to_fragment().unwrap();
        assert!(fragment.starts_with("  add_labels:\n    needs: agent\n    runs-on: ubuntu-slim\n"));
        assert!(fragment.contains("    steps:\n      - name: Say hi\n        run: echo hi\n"));

        let steps = job.steps_yaml().unwrap();
        assert!(steps.starts_with("    steps:\n      - name: Say hi\n"));
    }

    #[test]
    fn test_escapes() {
        assert_eq!(scalar("say \"hi\"\r"), "\"say \\\"hi\\\"\\r\"");
    }
}
