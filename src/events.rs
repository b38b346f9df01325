//! Decoding of the agent's `stream-json` output.
//!
//! Each output line is either one JSON record or plain diagnostic text. Records
//! are decoded into [`StreamEvent`]s; anything that is not a recognised record
//! becomes [`StreamEvent::Raw`] so that no line is ever lost.

use serde::Deserialize;
use serde_json::Value;

/// Longest shell command shown for a `Bash` tool call, in characters.
pub const COMMAND_PREVIEW_CHARS: usize = 80;

/// One renderable unit of agent output.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    SessionStart { model: String },
    AssistantText { text: String },
    ToolInvocation { name: String, summary: Option<String> },
    ToolResult { is_error: bool },
    RunSummary { duration_ms: f64, total_cost_usd: f64 },
    Raw { line: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireRecord {
    System {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Assistant {
        #[serde(default)]
        message: WireMessage,
    },
    User {
        #[serde(default)]
        message: WireMessage,
    },
    Result {
        #[serde(default)]
        duration_ms: Option<f64>,
        #[serde(default)]
        total_cost_usd: Option<f64>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Vec<WireContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    Text {
        #[serde(default)]
        text: Option<String>,
    },
    ToolUse {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        is_error: Option<bool>,
    },
    #[serde(other)]
    Other,
}

/// Decode one output line. Never fails: a line that is not a single
/// recognised record yields exactly one [`StreamEvent::Raw`].
///
/// Records carrying several content blocks yield one event per block, in
/// order. Blocks of kinds the trace does not show are skipped, and a record
/// left with no events at all comes back as [`StreamEvent::Raw`].
pub fn decode_line(line: &str) -> Vec<StreamEvent> {
    let Ok(record) = serde_json::from_str::<WireRecord>(line) else {
        return vec![raw(line)];
    };

    let events = decode_record(record, line);
    if events.is_empty() {
        vec![raw(line)]
    } else {
        events
    }
}

fn decode_record(record: WireRecord, line: &str) -> Vec<StreamEvent> {
    match record {
        WireRecord::System { subtype, model } => {
            if subtype.as_deref() == Some("init") {
                vec![StreamEvent::SessionStart {
                    model: model.unwrap_or_else(|| "unknown".to_string()),
                }]
            } else {
                vec![raw(line)]
            }
        }
        WireRecord::Assistant { message } => message
            .content
            .into_iter()
            .filter_map(|block| match block {
                WireContent::Text { text } => Some(StreamEvent::AssistantText {
                    text: text.unwrap_or_default(),
                }),
                WireContent::ToolUse { name, input } => {
                    let name = name.unwrap_or_else(|| "unknown".to_string());
                    let summary = summarize_tool_input(&name, &input);
                    Some(StreamEvent::ToolInvocation { name, summary })
                }
                WireContent::ToolResult { .. } | WireContent::Other => None,
            })
            .collect(),
        WireRecord::User { message } => message
            .content
            .into_iter()
            .filter_map(|block| match block {
                WireContent::ToolResult { is_error } => Some(StreamEvent::ToolResult {
                    is_error: is_error.unwrap_or(false),
                }),
                _ => None,
            })
            .collect(),
        WireRecord::Result {
            duration_ms,
            total_cost_usd,
        } => vec![StreamEvent::RunSummary {
            duration_ms: duration_ms.unwrap_or(0.0),
            total_cost_usd: total_cost_usd.unwrap_or(0.0),
        }],
    }
}

fn raw(line: &str) -> StreamEvent {
    StreamEvent::Raw {
        line: line.to_string(),
    }
}

/// Short description of a tool call's input, or `None` for tools shown by
/// name only.
fn summarize_tool_input(name: &str, input: &Value) -> Option<String> {
    let field = |key: &str| input.get(key).and_then(Value::as_str).unwrap_or("");
    match name {
        "Bash" => Some(field("command").chars().take(COMMAND_PREVIEW_CHARS).collect()),
        "Read" | "Edit" | "MultiEdit" | "Write" => Some(file_name(field("file_path")).to_string()),
        "NotebookEdit" => Some(file_name(field("notebook_path")).to_string()),
        "Glob" | "Grep" => Some(field("pattern").to_string()),
        "WebFetch" => Some(field("url").to_string()),
        "WebSearch" => Some(field("query").to_string()),
        _ => None,
    }
}

/// Last `/`-separated component of `path`.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
