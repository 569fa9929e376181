//! Streaming tool-call assembler.
//!
//! Deltas for a tool call arrive interleaved across chunks, indexed by a
//! provider-issued position, and must be accumulated by index until a
//! terminal delta closes the turn. The text buffer and index-keyed
//! partial-call map follow the same accumulation rules as `utils.rs`'s
//! `ToolCallAggregator`; the delta shape is generalized from the OpenAI wire
//! format to the provider-agnostic [`StreamDelta`].

use crate::content::ToolCall;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// A single incremental update from a [`crate::stream::ChatStream`]'s delta channel.
#[derive(Debug, Clone, Default)]
pub struct StreamDelta {
    pub text: Option<String>,
    pub tool_call_deltas: Vec<ToolCallDelta>,
    pub finished: bool,
}

/// One fragment of one tool call, identified by its provider-issued index.
#[derive(Debug, Clone, Default)]
pub struct ToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments_fragment: Option<String>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Accumulates [`StreamDelta`]s into complete text and [`ToolCall`]s.
///
/// A text buffer plus an index-keyed map of partial tool calls, both flushed
/// and cleared when a delta with `finished == true` arrives. `BTreeMap`
/// (rather than `HashMap`) keeps the flush order deterministic by index,
/// matching the order the model declared the calls in.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    text_buffer: String,
    tool_calls: BTreeMap<u32, PartialToolCall>,
    empty_arguments_json: Option<String>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JSON substituted for a tool call whose arguments never
    /// accumulated any fragments. Without one, an empty-arguments call fails
    /// assembly with `invalid-tool-args` instead of silently defaulting.
    pub fn with_empty_arguments_json(mut self, json: impl Into<String>) -> Self {
        self.empty_arguments_json = Some(json.into());
        self
    }

    /// Accumulates `delta` into internal state. Returns the assembled text and
    /// tool calls only when `delta.finished` is set; otherwise returns `None`.
    pub fn process_delta(&mut self, delta: StreamDelta) -> Result<Option<(String, Vec<ToolCall>)>> {
        if let Some(text) = delta.text {
            self.text_buffer.push_str(&text);
        }

        for fragment in delta.tool_call_deltas {
            let entry = self.tool_calls.entry(fragment.index).or_default();
            if let Some(id) = fragment.id {
                entry.id = Some(id);
            }
            if let Some(name) = fragment.name {
                entry.name = Some(name);
            }
            if let Some(args) = fragment.arguments_fragment {
                entry.arguments.push_str(&args);
            }
        }

        if !delta.finished {
            return Ok(None);
        }

        let text = std::mem::take(&mut self.text_buffer);
        let mut calls = Vec::new();
        for (_, partial) in std::mem::take(&mut self.tool_calls) {
            let (Some(id), Some(name)) = (partial.id, partial.name) else {
                continue;
            };
            if !partial.arguments.is_empty() {
                serde_json::from_str::<serde_json::Value>(&partial.arguments)
                    .map_err(|e| Error::invalid_tool_args(format!("tool call {id} ({name}): {e}")))?;
            }
            let arguments = if partial.arguments.is_empty() {
                match &self.empty_arguments_json {
                    Some(json) => json.clone(),
                    None => {
                        return Err(Error::invalid_tool_args(format!(
                            "tool call {id} ({name}): no arguments were streamed and no empty_arguments_json default is set"
                        )))
                    }
                }
            } else {
                partial.arguments
            };
            calls.push(ToolCall::new(id, name, arguments));
        }

        Ok(Some((text, calls)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_only_stream() {
        let mut assembler = ToolCallAssembler::new();
        assert!(assembler
            .process_delta(StreamDelta {
                text: Some("Hello".into()),
                ..Default::default()
            })
            .unwrap()
            .is_none());

        let (text, calls) = assembler
            .process_delta(StreamDelta {
                text: Some(" world".into()),
                finished: true,
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(text, "Hello world");
        assert!(calls.is_empty());
    }

    #[test]
    fn test_interleaved_tool_call_fragments() {
        let mut assembler = ToolCallAssembler::new();
        assembler
            .process_delta(StreamDelta {
                tool_call_deltas: vec![
                    ToolCallDelta { index: 0, id: Some("call_1".into()), name: Some("search".into()), arguments_fragment: None },
                    ToolCallDelta { index: 1, id: Some("call_2".into()), name: Some("calc".into()), arguments_fragment: None },
                ],
                ..Default::default()
            })
            .unwrap();
        assembler
            .process_delta(StreamDelta {
                tool_call_deltas: vec![
                    ToolCallDelta { index: 0, arguments_fragment: Some("{\"q\"".into()), ..Default::default() },
                    ToolCallDelta { index: 1, arguments_fragment: Some("{\"expr\"".into()), ..Default::default() },
                ],
                ..Default::default()
            })
            .unwrap();
        let (_, calls) = assembler
            .process_delta(StreamDelta {
                tool_call_deltas: vec![
                    ToolCallDelta { index: 0, arguments_fragment: Some(":\"rust\"}".into()), ..Default::default() },
                    ToolCallDelta { index: 1, arguments_fragment: Some(":\"2+2\"}".into()), ..Default::default() },
                ],
                finished: true,
                ..Default::default()
            })
            .unwrap()
            .unwrap();

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].arguments, "{\"q\":\"rust\"}");
        assert_eq!(calls[1].name, "calc");
        assert_eq!(calls[1].arguments, "{\"expr\":\"2+2\"}");
    }

    #[test]
    fn test_empty_arguments_use_configured_default() {
        let mut assembler = ToolCallAssembler::new().with_empty_arguments_json("{}");
        let (_, calls) = assembler
            .process_delta(StreamDelta {
                tool_call_deltas: vec![ToolCallDelta {
                    index: 0,
                    id: Some("call_1".into()),
                    name: Some("ping".into()),
                    arguments_fragment: None,
                }],
                finished: true,
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(calls[0].arguments, "{}");
    }

    #[test]
    fn test_empty_arguments_without_default_fails() {
        let mut assembler = ToolCallAssembler::new();
        let result = assembler.process_delta(StreamDelta {
            tool_call_deltas: vec![ToolCallDelta {
                index: 0,
                id: Some("call_1".into()),
                name: Some("ping".into()),
                arguments_fragment: None,
            }],
            finished: true,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_incomplete_tool_call_dropped() {
        let mut assembler = ToolCallAssembler::new();
        let (_, calls) = assembler
            .process_delta(StreamDelta {
                tool_call_deltas: vec![ToolCallDelta {
                    index: 0,
                    id: None,
                    name: Some("orphan".into()),
                    arguments_fragment: None,
                }],
                finished: true,
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn test_invalid_json_arguments_error() {
        let mut assembler = ToolCallAssembler::new();
        let result = assembler.process_delta(StreamDelta {
            tool_call_deltas: vec![ToolCallDelta {
                index: 0,
                id: Some("call_1".into()),
                name: Some("search".into()),
                arguments_fragment: Some("{not valid".into()),
            }],
            finished: true,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_buffers_clear_after_finish() {
        let mut assembler = ToolCallAssembler::new();
        assembler
            .process_delta(StreamDelta {
                text: Some("first turn".into()),
                finished: true,
                ..Default::default()
            })
            .unwrap();
        let (text, calls) = assembler
            .process_delta(StreamDelta {
                text: Some("second turn".into()),
                finished: true,
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(text, "second turn");
        assert!(calls.is_empty());
    }
}
