//! Clarify and brief: the two non-looping model calls before retrieval.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use scout_core::messages::{render_transcript, Message};
use scout_core::provider::{InvokeOptions, ModelProvider, ModelRequest, ModelResponse};

use crate::error::EngineError;
use crate::prompts;

/// Clarify stage verdict.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarifyDecision {
    pub need_clarification: bool,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub verification: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefResponse {
    #[serde(alias = "research_brief")]
    pub objective: String,
}

pub struct PreStage {
    provider: Arc<dyn ModelProvider>,
    products: Vec<String>,
    options: InvokeOptions,
}

impl PreStage {
    pub fn new(provider: Arc<dyn ModelProvider>, products: Vec<String>) -> Self {
        Self {
            provider,
            products,
            options: InvokeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = options;
        self
    }

    #[instrument(skip_all, fields(messages = conversation.len()))]
    pub async fn clarify(&self, conversation: &[Message]) -> Result<ClarifyDecision, EngineError> {
        let prompt = prompts::clarify_prompt(
            &render_transcript(conversation),
            &self.products,
            &prompts::today(),
        );
        let request = prompt_request(prompt)
            .structured("clarify_with_user", clarify_schema())
            .with_options(self.options.clone());
        let response = self.provider.invoke(&request).await?;
        let decision: ClarifyDecision = decode("clarify", response)?;
        if decision.need_clarification && decision.question.trim().is_empty() {
            return Err(EngineError::malformed("clarify", "clarification requested without a question"));
        }
        debug!(need_clarification = decision.need_clarification, "clarify decided");
        Ok(decision)
    }

    #[instrument(skip_all, fields(messages = conversation.len()))]
    pub async fn brief(&self, conversation: &[Message]) -> Result<String, EngineError> {
        let prompt = prompts::brief_prompt(&render_transcript(conversation), &prompts::today());
        let request = prompt_request(prompt)
            .structured("research_question", brief_schema())
            .with_options(self.options.clone());
        let response = self.provider.invoke(&request).await?;
        let brief: BriefResponse = decode("brief", response)?;
        let objective = brief.objective.trim();
        if objective.is_empty() {
            return Err(EngineError::malformed("brief", "empty objective"));
        }
        Ok(objective.to_string())
    }
}

/// The rendered prompt already embeds the transcript; it is sent as the sole user turn.
fn prompt_request(prompt: String) -> ModelRequest {
    ModelRequest {
        messages: vec![Message::user(prompt)],
        ..Default::default()
    }
}

/// Accept a structured reply, or a text reply holding the same JSON.
fn decode<T: DeserializeOwned>(stage: &'static str, response: ModelResponse) -> Result<T, EngineError> {
    let value = match response {
        ModelResponse::Structured(v) => v,
        ModelResponse::Text(text) => serde_json::from_str::<Value>(text.trim())
            .map_err(|e| EngineError::malformed(stage, format!("reply is not JSON: {e}")))?,
        other => {
            return Err(EngineError::malformed(
                stage,
                format!("expected structured reply, got {}", other.kind()),
            ))
        }
    };
    serde_json::from_value(value).map_err(|e| EngineError::malformed(stage, e.to_string()))
}

fn clarify_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "need_clarification": {"type": "boolean"},
            "question": {"type": "string"},
            "verification": {"type": "string"}
        },
        "required": ["need_clarification", "question", "verification"],
        "additionalProperties": false
    })
}

fn brief_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "objective": {"type": "string"}
        },
        "required": ["objective"],
        "additionalProperties": false
    })
}
