use serde::{Deserialize, Serialize};

use crate::operations::{OperationCall, OperationResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "user")]
    User { content: String },
    #[serde(rename = "assistant")]
    Assistant { content: String },
    #[serde(rename = "action_request")]
    ActionRequest {
        calls: Vec<OperationCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    #[serde(rename = "operation_result")]
    OperationResult(OperationResult),
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    pub fn action_request(calls: Vec<OperationCall>) -> Self {
        Self::ActionRequest { calls, text: None }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::ActionRequest { .. } => "action_request",
            Self::OperationResult(_) => "operation_result",
        }
    }

    /// Plain text of user/assistant turns.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::User { content } | Self::Assistant { content } => Some(content),
            Self::ActionRequest { text, .. } => text.as_deref(),
            Self::OperationResult(_) => None,
        }
    }

    pub fn as_result(&self) -> Option<&OperationResult> {
        match self {
            Self::OperationResult(r) => Some(r),
            _ => None,
        }
    }
}

/// Render user-visible turns as a `User:` / `Assistant:` transcript.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for msg in messages {
        let label = match msg {
            Message::User { .. } => "User",
            Message::Assistant { .. } => "Assistant",
            _ => continue,
        };
        if let Some(text) = msg.text() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(label);
            out.push_str(": ");
            out.push_str(text);
        }
    }
    out
}
