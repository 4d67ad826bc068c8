//! Log metrics extraction.
//!
//! Each engine writes a different log format. The parsers here are tolerant:
//! lines that do not match the expected shape are skipped, so a truncated or
//! interleaved log still yields partial metrics.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use tracing::debug;

/// Metrics extracted from an engine log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogMetrics {
    /// Total tokens consumed
    pub token_usage: u64,
    /// Estimated cost in USD, when the engine reports one
    pub estimated_cost: f64,
    /// Conversation turns
    pub turns: u32,
    /// Tool usage, sorted by tool name
    pub tool_calls: Vec<ToolCallInfo>,
    /// Lines reporting an error
    pub error_count: u32,
    /// Lines reporting a warning
    pub warning_count: u32,
}

impl LogMetrics {
    /// Tool usage entry for `name`.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolCallInfo> {
        self.tool_calls.iter().find(|t| t.name == name)
    }
}

/// Usage of a single tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolCallInfo {
    /// Tool name
    pub name: String,
    /// Number of invocations
    pub call_count: u32,
    /// Largest serialized input, in bytes
    pub max_input_size: usize,
    /// Largest serialized output, in bytes
    pub max_output_size: usize,
}

/// Accumulates tool calls by name.
#[derive(Debug, Default)]
struct ToolCallTracker {
    calls: BTreeMap<String, ToolCallInfo>,
}

impl ToolCallTracker {
    fn record_call(&mut self, name: &str, input_size: usize) {
        let entry = self
            .calls
            .entry(name.to_string())
            .or_insert_with(|| ToolCallInfo {
                name: name.to_string(),
                ..ToolCallInfo::default()
            });
        entry.call_count = entry.call_count.saturating_add(1);
        entry.max_input_size = entry.max_input_size.max(input_size);
    }

    fn record_output(&mut self, name: &str, output_size: usize) {
        if let Some(entry) = self.calls.get_mut(name) {
            entry.max_output_size = entry.max_output_size.max(output_size);
        }
    }

    fn finish(self) -> Vec<ToolCallInfo> {
        self.calls.into_values().collect()
    }
}

/// Count error and warning lines.
pub fn count_errors_and_warnings(log: &str, metrics: &mut LogMetrics) {
    for line in log.lines() {
        if line.contains("[ERROR]") || line.contains("ERROR:") {
            metrics.error_count = metrics.error_count.saturating_add(1);
        } else if line.contains("[WARN") || line.contains("WARNING:") {
            metrics.warning_count = metrics.warning_count.saturating_add(1);
        }
    }
}

fn json_size(value: &Value) -> usize {
    match value {
        Value::String(s) => s.len(),
        other => other.to_string().len(),
    }
}

fn to_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

// Session records (Claude stream-json and Copilot session JSONL)

#[derive(Default)]
struct SessionParser {
    metrics: LogMetrics,
    tools: ToolCallTracker,
    tool_names: HashMap<String, String>,
    assistant_messages: u32,
    saw_turns: bool,
    records: usize,
}

impl SessionParser {
    fn accept(&mut self, record: &Value) -> bool {
        let Some(kind) = record.get("type").and_then(Value::as_str) else {
            return false;
        };
        match kind {
            "result" => self.result(record),
            "assistant" => self.assistant(record),
            "user" => self.user(record),
            "system" => {}
            _ => return false,
        }
        self.records = self.records.saturating_add(1);
        true
    }

    fn result(&mut self, record: &Value) {
        if let Some(usage) = record.get("usage") {
            let input = usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0);
            let output = usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0);
            self.metrics.token_usage = self
                .metrics
                .token_usage
                .saturating_add(input.saturating_add(output));
        }
        if let Some(turns) = record.get("num_turns").and_then(Value::as_u64) {
            self.metrics.turns = to_u32(turns);
            self.saw_turns = true;
        }
        if let Some(cost) = record.get("total_cost_usd").and_then(Value::as_f64) {
            self.metrics.estimated_cost += cost;
        }
    }

    fn content(record: &Value) -> impl Iterator<Item = &Value> {
        record
            .pointer("/message/content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
    }

    fn assistant(&mut self, record: &Value) {
        self.assistant_messages = self.assistant_messages.saturating_add(1);
        for item in Self::content(record) {
            if item.get("type").and_then(Value::as_str) != Some("tool_use") {
                continue;
            }
            let Some(name) = item.get("name").and_then(Value::as_str) else {
                continue;
            };
            let size = item.get("input").map_or(0, json_size);
            self.tools.record_call(name, size);
            if let Some(id) = item.get("id").and_then(Value::as_str) {
                self.tool_names.insert(id.to_string(), name.to_string());
            }
        }
    }

    fn user(&mut self, record: &Value) {
        for item in Self::content(record) {
            if item.get("type").and_then(Value::as_str) != Some("tool_result") {
                continue;
            }
            let name = item
                .get("tool_use_id")
                .and_then(Value::as_str)
                .and_then(|id| self.tool_names.get(id))
                .cloned();
            if let Some(name) = name {
                let size = item.get("content").map_or(0, json_size);
                self.tools.record_output(&name, size);
            }
        }
    }

    fn finish(mut self) -> LogMetrics {
        if !self.saw_turns {
            self.metrics.turns = self.assistant_messages;
        }
        self.metrics.tool_calls = self.tools.finish();
        self.metrics
    }
}

fn json_lines(log: &str) -> impl Iterator<Item = Value> + '_ {
    log.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .filter_map(|line| serde_json::from_str(line).ok())
}

fn parse_session_records(log: &str) -> Option<LogMetrics> {
    let mut parser = SessionParser::default();
    let trimmed = log.trim_start();
    if trimmed.starts_with('[')
        && let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(trimmed.trim_end())
    {
        for entry in &entries {
            parser.accept(entry);
        }
    } else {
        for record in json_lines(log) {
            parser.accept(&record);
        }
    }
    (parser.records > 0).then(|| parser.finish())
}

// Copilot

/// Parse a Copilot CLI log.
///
/// Session JSONL records are preferred. Otherwise the debug log is scanned
/// for API responses: each `[DEBUG] data:` line opens a JSON document made of
/// the following `[DEBUG]` lines.
#[must_use]
pub fn parse_copilot_log(log: &str, verbose: bool) -> LogMetrics {
    let mut metrics = parse_session_records(log).unwrap_or_else(|| parse_copilot_debug_log(log, verbose));
    count_errors_and_warnings(log, &mut metrics);
    metrics
}

const DEBUG_MARKER: &str = "[DEBUG] ";

/// Tracks `{}` nesting while ignoring braces inside JSON strings.
#[derive(Debug, Default)]
struct BraceDepth {
    depth: i64,
    in_string: bool,
    escaped: bool,
    opened: bool,
}

impl BraceDepth {
    fn feed(&mut self, text: &str) {
        for c in text.chars() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '{' => {
                    self.depth = self.depth.saturating_add(1);
                    self.opened = true;
                }
                '}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
        }
    }

    const fn closed(&self) -> bool {
        self.opened && self.depth <= 0
    }
}

fn parse_copilot_debug_log(log: &str, verbose: bool) -> LogMetrics {
    let mut metrics = LogMetrics::default();
    let mut tools = ToolCallTracker::default();
    let mut buffer: Option<(String, BraceDepth)> = None;

    for line in log.lines() {
        if line.contains("[DEBUG] data:") {
            let mut block = (String::new(), BraceDepth::default());
            if let Some((_, rest)) = line.split_once("[DEBUG] data:") {
                let rest = rest.trim();
                if rest.starts_with('{') {
                    block.0.push_str(rest);
                    block.0.push('\n');
                    block.1.feed(rest);
                }
            }
            buffer = Some(block);
        } else if let Some((text, depth)) = buffer.as_mut() {
            let Some((_, content)) = line.split_once(DEBUG_MARKER) else {
                buffer = None;
                continue;
            };
            if !depth.opened && !content.trim_start().starts_with('{') {
                if !content.trim().is_empty() {
                    buffer = None;
                }
                continue;
            }
            text.push_str(content);
            text.push('\n');
            depth.feed(content);
        } else {
            continue;
        }

        if let Some((text, depth)) = buffer.as_ref()
            && depth.closed()
        {
            match serde_json::from_str::<Value>(text) {
                Ok(response) => record_copilot_response(&response, &mut metrics, &mut tools),
                Err(e) if verbose => debug!(error = %e, "Skipping malformed Copilot API response"),
                Err(_) => {}
            }
            buffer = None;
        }
    }

    metrics.tool_calls = tools.finish();
    if verbose {
        debug!(
            tokens = metrics.token_usage,
            turns = metrics.turns,
            "Parsed Copilot debug log"
        );
    }
    metrics
}

fn record_copilot_response(response: &Value, metrics: &mut LogMetrics, tools: &mut ToolCallTracker) {
    if let Some(usage) = response.get("usage") {
        let tokens = usage.get("total_tokens").and_then(Value::as_u64).unwrap_or_else(|| {
            let prompt = usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
            let completion = usage.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0);
            prompt.saturating_add(completion)
        });
        metrics.token_usage = metrics.token_usage.saturating_add(tokens);
    }
    metrics.turns = metrics.turns.saturating_add(1);

    let calls = response
        .get("choices")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|choice| choice.pointer("/message/tool_calls").and_then(Value::as_array))
        .flatten();
    for call in calls {
        if let Some(name) = call.pointer("/function/name").and_then(Value::as_str) {
            let size = call.pointer("/function/arguments").map_or(0, json_size);
            tools.record_call(name, size);
        }
    }
}

// Claude

/// Parse Claude `stream-json` output, either a JSON array or JSON lines.
#[must_use]
pub fn parse_claude_log(log: &str, verbose: bool) -> LogMetrics {
    let mut metrics = parse_session_records(log).unwrap_or_default();
    count_errors_and_warnings(log, &mut metrics);
    if verbose {
        debug!(
            tokens = metrics.token_usage,
            turns = metrics.turns,
            cost = metrics.estimated_cost,
            "Parsed Claude log"
        );
    }
    metrics
}

// Codex

#[allow(clippy::expect_used)]
static TOTAL_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"total_tokens:\s*(\d+)").expect("total_tokens regex is valid"));

#[allow(clippy::expect_used)]
static TOOL_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\] tool ([\w-]+)\.([\w-]+)\(").expect("tool call regex is valid")
});

#[allow(clippy::expect_used)]
static LEADING_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:?\s*([\d,]+)").expect("token count regex is valid"));

fn leading_count(text: &str) -> Option<u64> {
    let digits = LEADING_COUNT.captures(text)?.get(1)?.as_str().replace(',', "");
    digits.parse().ok()
}

/// Parse Codex CLI output.
#[must_use]
pub fn parse_codex_log(log: &str, verbose: bool) -> LogMetrics {
    let mut metrics = LogMetrics::default();
    let mut tools = ToolCallTracker::default();
    let lines: Vec<&str> = log.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        if let Some((_, rest)) = line.split_once("tokens used") {
            let count = leading_count(rest)
                .or_else(|| lines.get(i + 1).and_then(|next| leading_count(next)));
            if let Some(count) = count {
                metrics.token_usage = metrics.token_usage.max(count);
            }
        }
        if let Some(count) = TOTAL_TOKENS
            .captures(line)
            .and_then(|c| c.get(1)?.as_str().parse::<u64>().ok())
        {
            metrics.token_usage = metrics.token_usage.max(count);
        }
        if let Some(caps) = TOOL_CALL.captures(line) {
            let name = format!("{}_{}", &caps[1], &caps[2]);
            tools.record_call(&name, 0);
        } else if line.contains("] exec ") {
            tools.record_call("bash", 0);
        }
        if line.contains("] thinking") {
            metrics.turns = metrics.turns.saturating_add(1);
        }
    }

    metrics.tool_calls = tools.finish();
    count_errors_and_warnings(log, &mut metrics);
    if verbose {
        debug!(
            tokens = metrics.token_usage,
            turns = metrics.turns,
            "Parsed Codex log"
        );
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copilot_session_jsonl() {
        let log = r#"{"type":"system","subtype":"init","session_id":"abc"}
{"type":"assistant","message":{"content":[{"type":"text","text":"Looking"}]}}
{"type":"result","usage":{"input_tokens":150,"output_tokens":50},"num_turns":2}
"#;
        let metrics = parse_copilot_log(log, false);
        assert_eq!(metrics.token_usage, 200);
        assert_eq!(metrics.turns, 2);
        assert!(metrics.tool_calls.is_empty());
    }

    #[test]
    fn test_copilot_session_single_turn() {
        let log = concat!(
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"done"}]}}"#,
            "\n",
            r#"{"type":"result","usage":{"input_tokens":100,"output_tokens":25},"num_turns":1}"#,
            "\n",
        );
        let metrics = parse_copilot_log(log, false);
        assert_eq!(metrics.token_usage, 125);
        assert_eq!(metrics.turns, 1);
    }

    #[test]
    fn test_copilot_session_tool_use() {
        let log = concat!(
            r#"{"type":"system","subtype":"init"}"#,
            "\n",
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Bash","input":{"command":"ls"}}]}}"#,
            "\n",
            r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":"a.txt\nb.txt"}]}}"#,
            "\n",
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t2","name":"Bash","input":{"command":"cat a.txt"}}]}}"#,
            "\n",
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t3","name":"Read","input":{"path":"b.txt"}}]}}"#,
            "\n",
            r#"{"type":"result","usage":{"input_tokens":300,"output_tokens":120},"num_turns":3}"#,
            "\n",
        );
        let metrics = parse_copilot_log(log, false);
        assert_eq!(metrics.token_usage, 420);
        assert_eq!(metrics.turns, 3);
        let bash = metrics.tool("Bash").unwrap();
        assert_eq!(bash.call_count, 2);
        assert_eq!(bash.max_input_size, r#"{"command":"cat a.txt"}"#.len());
        assert_eq!(bash.max_output_size, "a.txt\nb.txt".len());
        let names: Vec<_> = metrics.tool_calls.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Bash", "Read"]);
    }

    #[test]
    fn test_copilot_debug_response() {
        let log = r#"2025-09-26T11:13:11.000Z [INFO] Starting
2025-09-26T11:13:11.798Z [DEBUG] data:
2025-09-26T11:13:11.798Z [DEBUG] {
2025-09-26T11:13:11.798Z [DEBUG]   "choices": [
2025-09-26T11:13:11.798Z [DEBUG]     {
2025-09-26T11:13:11.798Z [DEBUG]       "message": {
2025-09-26T11:13:11.798Z [DEBUG]         "content": "text with } brace",
2025-09-26T11:13:11.798Z [DEBUG]         "tool_calls": [
2025-09-26T11:13:11.798Z [DEBUG]           {"function": {"name": "bash", "arguments": "{\"command\":\"ls\"}"}}
2025-09-26T11:13:11.798Z [DEBUG]         ]
2025-09-26T11:13:11.798Z [DEBUG]       }
2025-09-26T11:13:11.798Z [DEBUG]     }
2025-09-26T11:13:11.798Z [DEBUG]   ],
2025-09-26T11:13:11.798Z [DEBUG]   "usage": {"prompt_tokens": 900, "completion_tokens": 100}
2025-09-26T11:13:11.798Z [DEBUG] }
2025-09-26T11:13:12.000Z [DEBUG] data:
2025-09-26T11:13:12.000Z [DEBUG] {
2025-09-26T11:13:12.000Z [DEBUG]   "usage": {"total_tokens": 1500, "prompt_tokens": 1}
2025-09-26T11:13:12.000Z [DEBUG] }
"#;
        let metrics = parse_copilot_log(log, true);
        assert_eq!(metrics.token_usage, 2500);
        assert_eq!(metrics.turns, 2);
        assert_eq!(metrics.tool("bash").unwrap().call_count, 1);
    }

    #[test]
    fn test_copilot_debug_skips_truncated_block() {
        let log = "x [DEBUG] data:\nx [DEBUG] {\nplain line breaks the block\nx [DEBUG] data:\nx [DEBUG] {\"usage\": {\"total_tokens\": 7}}\n";
        let metrics = parse_copilot_log(log, false);
        assert_eq!(metrics.token_usage, 7);
        assert_eq!(metrics.turns, 1);
    }

    #[test]
    fn test_claude_array() {
        let log = r#"[
  {"type": "system", "subtype": "init"},
  {"type": "assistant", "message": {"content": [{"type": "tool_use", "id": "1", "name": "mcp__github__get_issue", "input": {"issue_number": 1}}]}},
  {"type": "result", "usage": {"input_tokens": 1000, "output_tokens": 250}, "num_turns": 4, "total_cost_usd": 0.0123}
]"#;
        let metrics = parse_claude_log(log, false);
        assert_eq!(metrics.token_usage, 1250);
        assert_eq!(metrics.turns, 4);
        assert!((metrics.estimated_cost - 0.0123).abs() < f64::EPSILON);
        assert_eq!(metrics.tool("mcp__github__get_issue").unwrap().call_count, 1);
    }

    #[test]
    fn test_claude_jsonl_with_noise() {
        let log = "not json\n{\"type\":\"result\",\"usage\":{\"input_tokens\":5,\"output_tokens\":5},\"num_turns\":1}\n{broken\n";
        let metrics = parse_claude_log(log, false);
        assert_eq!(metrics.token_usage, 10);
        assert_eq!(metrics.turns, 1);
    }

    #[test]
    fn test_codex_tokens_and_tools() {
        let log = "[2025-08-31T12:37:08] thinking\n\
                   [2025-08-31T12:37:09] tool github.search_issues({\"q\":\"x\"})\n\
                   [2025-08-31T12:37:10] exec bash -lc 'ls' in /tmp\n\
                   [2025-08-31T12:37:11] thinking\n\
                   [2025-08-31T12:37:12] tokens used: 1,234\n\
                   total_tokens: 900\n";
        let metrics = parse_codex_log(log, false);
        assert_eq!(metrics.token_usage, 1234);
        assert_eq!(metrics.turns, 2);
        assert_eq!(metrics.tool("github_search_issues").unwrap().call_count, 1);
        assert_eq!(metrics.tool("bash").unwrap().call_count, 1);
    }

    #[test]
    fn test_codex_tokens_on_next_line() {
        let metrics = parse_codex_log("tokens used\n48,210\n", false);
        assert_eq!(metrics.token_usage, 48_210);
    }

    #[test]
    fn test_errors_and_warnings() {
        let log = "[ERROR] boom\nERROR: again\n[WARN] careful\nWARNING: twice\nfine\n";
        let mut metrics = LogMetrics::default();
        count_errors_and_warnings(log, &mut metrics);
        assert_eq!(metrics.error_count, 2);
        assert_eq!(metrics.warning_count, 2);
    }

    #[test]
    fn test_token_totals_saturate() {
        let log = format!(
            "{{\"type\":\"result\",\"usage\":{{\"input_tokens\":{max},\"output_tokens\":{max}}}}}\n\
             {{\"type\":\"result\",\"usage\":{{\"input_tokens\":1,\"output_tokens\":1}}}}\n",
            max = u64::MAX
        );
        assert_eq!(parse_claude_log(&log, false).token_usage, u64::MAX);

        let debug = format!(
            "x [DEBUG] data:\nx [DEBUG] {{\"usage\": {{\"prompt_tokens\": {max}, \"completion_tokens\": 5}}}}\n\
             x [DEBUG] data:\nx [DEBUG] {{\"usage\": {{\"total_tokens\": 9}}}}\n",
            max = u64::MAX
        );
        let metrics = parse_copilot_log(&debug, false);
        assert_eq!(metrics.token_usage, u64::MAX);
        assert_eq!(metrics.turns, 2);
    }

    #[test]
    fn test_counters_saturate() {
        let mut metrics = LogMetrics {
            error_count: u32::MAX,
            warning_count: u32::MAX,
            ..LogMetrics::default()
        };
        count_errors_and_warnings("[ERROR] a\n[WARN] b\n", &mut metrics);
        assert_eq!(metrics.error_count, u32::MAX);
        assert_eq!(metrics.warning_count, u32::MAX);

        let mut tools = ToolCallTracker::default();
        tools.record_call("bash", 1);
        if let Some(entry) = tools.calls.get_mut("bash") {
            entry.call_count = u32::MAX;
        }
        tools.record_call("bash", 1);
        assert_eq!(tools.finish()[0].call_count, u32::MAX);
    }
}
