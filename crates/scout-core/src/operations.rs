use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ids::CallId;

/// One operation the model asked for. Consumed exactly once by the executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationCall {
    pub id: CallId,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl OperationCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: CallId::new(),
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of exactly one [`OperationCall`]. Failures are data: `ok == false`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub call_id: CallId,
    pub name: String,
    pub payload: String,
    pub ok: bool,
    /// Reflection output, kept in history but never shown to the user.
    #[serde(default)]
    pub internal: bool,
    #[serde(with = "duration_ms", default)]
    pub duration: Duration,
}

impl OperationResult {
    pub fn success(call: &OperationCall, payload: String, internal: bool, duration: Duration) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            payload,
            ok: true,
            internal,
            duration,
        }
    }

    pub fn not_found(call: &OperationCall) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            payload: format!("{} not found", call.name),
            ok: false,
            internal: false,
            duration: Duration::ZERO,
        }
    }

    pub fn failure(call: &OperationCall, message: impl std::fmt::Display, duration: Duration) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            payload: format!("error executing {}: {message}", call.name),
            ok: false,
            internal: false,
            duration,
        }
    }

    /// Whether this result may feed the final answer.
    pub fn is_substantive(&self) -> bool {
        self.ok && !self.internal
    }
}

/// Operation definition offered to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// A read-only lookup capability the model may invoke by name.
#[async_trait]
pub trait Operation: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> serde_json::Value;

    /// Internal operations (reflection) are excluded from the final answer.
    fn is_internal(&self) -> bool {
        false
    }

    async fn invoke(&self, args: serde_json::Value) -> Result<String, OperationError>;

    fn to_definition(&self) -> OperationDefinition {
        OperationDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters_schema: self.parameters_schema(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

/// Serde helper for Duration as milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}
