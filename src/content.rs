//! Message and content-part data model.
//!
//! Tool calls and tool results are dedicated optional fields on [`Message`]
//! rather than content-part variants, and multimodal content uses the
//! `InputText`/`InputImage`/`InputFile` tags.

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Detail level requested for an image content part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Auto,
    Low,
    High,
}

impl Default for ImageDetail {
    fn default() -> Self {
        ImageDetail::Auto
    }
}

/// Where an image or file's bytes come from.
///
/// Every variant is struct-shaped (not a newtype around a bare string) so
/// that flattening it onto [`ContentPart::InputImage`]/[`ContentPart::InputFile`]
/// always produces a JSON object; a newtype variant would serialize as a
/// bare string, which cannot be flattened into a map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSource {
    Url { url: String },
    FileId { file_id: String },
    Base64 { data: String, filename: String },
}

/// A single multimodal content part of a user (or assistant) message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText {
        text: String,
    },
    InputImage {
        #[serde(flatten)]
        source: FileSource,
        #[serde(default)]
        detail: ImageDetail,
    },
    InputFile {
        #[serde(flatten)]
        source: FileSource,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::InputText { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>, detail: ImageDetail) -> Self {
        ContentPart::InputImage {
            source: FileSource::Url { url: url.into() },
            detail,
        }
    }

    pub fn file_base64(data: impl Into<String>, filename: impl Into<String>) -> Self {
        ContentPart::InputFile {
            source: FileSource::Base64 {
                data: data.into(),
                filename: filename.into(),
            },
        }
    }

    /// Character cost used by the token estimator: text parts
    /// contribute their text length; image parts contribute the URL/file-id
    /// length plus a flat 500-token image estimate (pre-multiplied by 4 here
    /// so the caller can divide the aggregate by 4 uniformly); file parts
    /// contribute base64 length / 4 plus the URL length.
    pub(crate) fn estimate_char_cost(&self) -> usize {
        match self {
            ContentPart::InputText { text } => text.len(),
            ContentPart::InputImage { source, .. } => source_len(source) + 2000,
            ContentPart::InputFile { source } => match source {
                FileSource::Base64 { data, .. } => data.len() / 4,
                other => source_len(other),
            },
        }
    }
}

fn source_len(source: &FileSource) -> usize {
    match source {
        FileSource::Url { url } => url.len(),
        FileSource::FileId { file_id } => file_id.len(),
        FileSource::Base64 { data, filename } => data.len() + filename.len(),
    }
}

/// A model-issued intent to invoke a named function.
///
/// `arguments` is preserved byte-for-byte as received from the provider: the
/// assembler never reformats whitespace or key order, so canonical equality
/// is byte equality on this field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parses `arguments` as JSON. Fails with [`crate::Error::invalid_tool_args`]
    /// if the stored text is not valid JSON (should not happen for calls that
    /// passed through the assembler, but callers constructing calls by hand
    /// may hit this).
    pub fn parsed_arguments(&self) -> crate::Result<serde_json::Value> {
        serde_json::from_str(&self.arguments).map_err(|e| crate::Error::invalid_tool_args(e.to_string()))
    }
}

/// The outcome of executing a [`ToolCall`], fed back to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub content: serde_json::Value,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            call_id: call_id.into(),
            content,
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: serde_json::Value::String(message.into()),
            is_error: true,
        }
    }

    /// Convenience over the untyped result: serializes a typed value as the
    /// tool's content. The core contract remains the untyped `content` field.
    pub fn typed<T: Serialize>(call_id: impl Into<String>, value: &T) -> crate::Result<Self> {
        Ok(Self::ok(call_id, serde_json::to_value(value)?))
    }

    /// Renders the content as a string for transcript/summarization purposes,
    /// stringifying non-string values.
    pub fn content_as_text(&self) -> String {
        match &self.content {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A single turn in a conversation.
///
/// Exactly one of `text` or a non-empty `content_parts` must be present; a
/// message with neither is invalid (enforced by [`Message::is_valid`], which
/// the request builder checks before any network call).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_parts: Vec<ContentPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolResult>>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_text(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text(MessageRole::Assistant, text)
    }

    fn with_text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: Some(text.into()),
            content_parts: Vec::new(),
            tool_calls: None,
            tool_results: None,
        }
    }

    pub fn user_with_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: MessageRole::User,
            text: None,
            content_parts: parts,
            tool_calls: None,
            tool_results: None,
        }
    }

    /// The assistant message the runner appends when the model requests tools.
    pub fn assistant_tool_calls(text: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: Some(text.into()),
            content_parts: Vec::new(),
            tool_calls: Some(calls),
            tool_results: None,
        }
    }

    /// A tool-role message carrying one result, fed back to the model.
    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            role: MessageRole::Tool,
            text: Some(String::new()),
            content_parts: Vec::new(),
            tool_calls: None,
            tool_results: Some(vec![result]),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.text.is_some() || !self.content_parts.is_empty()
    }

    /// Plain text, concatenating any `InputText` parts when `text` is unset.
    pub fn effective_text(&self) -> String {
        if let Some(t) = &self.text {
            return t.clone();
        }
        self.content_parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::InputText { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Character cost used by the token estimator.
    pub(crate) fn estimate_char_cost(&self) -> usize {
        let mut total = self.text.as_ref().map(|t| t.len()).unwrap_or(0);
        for part in &self.content_parts {
            total += part.estimate_char_cost();
        }
        if let Some(calls) = &self.tool_calls {
            for call in calls {
                total += call.name.len() + call.arguments.len() + 50;
            }
        }
        if let Some(results) = &self.tool_results {
            for result in results {
                total += result.content_as_text().len();
            }
        }
        total
    }
}
