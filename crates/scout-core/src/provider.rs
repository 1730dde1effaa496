use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::messages::Message;
use crate::operations::{OperationCall, OperationDefinition};

/// Options controlling generation behavior.
#[derive(Clone, Debug, Default)]
pub struct InvokeOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Shape the caller expects back.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    /// A fixed-shape JSON object matching `schema`.
    Structured {
        name: String,
        schema: serde_json::Value,
    },
}

/// Everything one model call sees.
#[derive(Clone, Debug, Default)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub operations: Vec<OperationDefinition>,
    pub response_format: ResponseFormat,
    pub options: InvokeOptions,
}

impl ModelRequest {
    pub fn new(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: Some(system.into()),
            messages,
            ..Default::default()
        }
    }

    pub fn with_operations(mut self, operations: Vec<OperationDefinition>) -> Self {
        self.operations = operations;
        self
    }

    pub fn structured(mut self, name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.response_format = ResponseFormat::Structured {
            name: name.into(),
            schema,
        };
        self
    }

    pub fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = options;
        self
    }
}

/// What the model returned for one call.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelResponse {
    Text(String),
    /// One or more operation calls, optionally with accompanying text.
    Actions {
        calls: Vec<OperationCall>,
        text: Option<String>,
    },
    Structured(serde_json::Value),
}

impl ModelResponse {
    /// Requested calls; empty when the model is done.
    pub fn operation_calls(&self) -> &[OperationCall] {
        match self {
            Self::Actions { calls, .. } => calls,
            _ => &[],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Actions { .. } => "actions",
            Self::Structured(_) => "structured",
        }
    }
}

/// The model boundary. Implementations must be safe to share across sessions.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, GatewayError>;
}
