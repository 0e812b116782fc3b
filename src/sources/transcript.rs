//! Shapes shared by the assistant's JSONL transcripts.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
pub struct TranscriptEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "isMeta", default)]
    pub is_meta: bool,
    #[serde(default)]
    pub message: Option<TranscriptMessage>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TranscriptMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: MessageContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Parts(vec![])
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl MessageContent {
    /// The plain string, or the first text part.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text.as_str()),
            MessageContent::Parts(parts) => parts.iter().find_map(|v| match v {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            }),
        }
    }

    /// The plain string, or every text part joined by spaces.
    pub fn joined_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|v| match v {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &Value)> {
        let parts = match self {
            MessageContent::Parts(parts) => parts.as_slice(),
            MessageContent::Text(_) => &[],
        };
        parts.iter().filter_map(|v| match v {
            ContentPart::ToolUse { name, input } => Some((name.as_str(), input)),
            _ => None,
        })
    }
}
