//! Final synthesis of retrieval findings into one answer.

use std::sync::Arc;

use tracing::{debug, instrument};

use scout_core::messages::Message;
use scout_core::provider::{InvokeOptions, ModelProvider, ModelRequest, ModelResponse};

use crate::error::EngineError;
use crate::prompts;

pub struct CompressionStage {
    provider: Arc<dyn ModelProvider>,
    options: InvokeOptions,
}

impl CompressionStage {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            options: InvokeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = options;
        self
    }

    #[instrument(skip_all)]
    pub async fn compress(&self, objective: &str, history: &[Message]) -> Result<String, EngineError> {
        let digest = findings_digest(history);
        debug!(digest_bytes = digest.len(), "compressing findings");

        let mut content = String::new();
        if !digest.is_empty() {
            content.push_str("<Findings>\n");
            content.push_str(&digest);
            content.push_str("</Findings>\n\n");
        }
        content.push_str(&prompts::compress_instruction(objective));

        let request = ModelRequest::new(prompts::compress_prompt(&prompts::today()), vec![Message::user(content)])
            .with_options(self.options.clone());
        match self.provider.invoke(&request).await? {
            ModelResponse::Text(answer) if !answer.trim().is_empty() => Ok(answer.trim().to_string()),
            ModelResponse::Text(_) => Err(EngineError::malformed("compression", "empty answer")),
            other => Err(EngineError::malformed(
                "compression",
                format!("expected text, got {}", other.kind()),
            )),
        }
    }
}

/// Retrieval history in order: assistant notes plus substantive results.
/// Reflections and failures never reach the answer.
pub fn findings_digest(history: &[Message]) -> String {
    let mut out = String::new();
    for msg in history {
        let (heading, body) = match msg {
            Message::Assistant { content } => ("assistant", content.as_str()),
            Message::ActionRequest { text: Some(text), .. } => ("assistant", text.as_str()),
            Message::OperationResult(r) if r.is_substantive() => (r.name.as_str(), r.payload.as_str()),
            _ => continue,
        };
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        out.push_str("## ");
        out.push_str(heading);
        out.push_str("\n\n");
        out.push_str(body);
        out.push_str("\n\n");
    }
    out
}
