//! Operations used by unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::operations::{Operation, OperationError};

use crate::registry::OperationRegistry;

pub fn registry_with(ops: Vec<Arc<dyn Operation>>) -> Arc<OperationRegistry> {
    Arc::new(OperationRegistry::builder().register_all(ops).build())
}

pub struct Echo;

#[async_trait]
impl Operation for Echo {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Return `text` unchanged"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
    }
    async fn invoke(&self, args: Value) -> Result<String, OperationError> {
        args["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| OperationError::InvalidArguments("text is required".into()))
    }
}

pub struct Fail;

#[async_trait]
impl Operation for Fail {
    fn name(&self) -> &str {
        "fail"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }
    async fn invoke(&self, _args: Value) -> Result<String, OperationError> {
        Err(OperationError::ExecutionFailed("boom".into()))
    }
}

pub struct Panics;

#[async_trait]
impl Operation for Panics {
    fn name(&self) -> &str {
        "panics"
    }
    fn description(&self) -> &str {
        "Always panics"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }
    async fn invoke(&self, _args: Value) -> Result<String, OperationError> {
        panic!("kaboom")
    }
}

pub struct Sleep;

#[async_trait]
impl Operation for Sleep {
    fn name(&self) -> &str {
        "sleep"
    }
    fn description(&self) -> &str {
        "Sleep for `ms` milliseconds"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"ms": {"type": "integer"}}})
    }
    async fn invoke(&self, args: Value) -> Result<String, OperationError> {
        let ms = args["ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(format!("slept {ms}ms"))
    }
}

/// Sleeps for `ms` then raises its flag.
pub struct Marker {
    finished: Arc<AtomicBool>,
}

impl Marker {
    pub fn new(finished: Arc<AtomicBool>) -> Self {
        Self { finished }
    }
}

#[async_trait]
impl Operation for Marker {
    fn name(&self) -> &str {
        "mark"
    }
    fn description(&self) -> &str {
        "Raise a flag after `ms` milliseconds"
    }
    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"ms": {"type": "integer"}}})
    }
    async fn invoke(&self, args: Value) -> Result<String, OperationError> {
        let ms = args["ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok("marked".into())
    }
}
