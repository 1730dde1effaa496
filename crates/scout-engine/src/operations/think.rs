use async_trait::async_trait;
use serde_json::{json, Value};

use scout_core::operations::{Operation, OperationError};

use super::required_str;

/// Reflection scratchpad. Results stay in retrieval history but never reach the answer.
pub struct ThinkTool;

#[async_trait]
impl Operation for ThinkTool {
    fn name(&self) -> &str {
        "think_tool"
    }

    fn description(&self) -> &str {
        "Record a reflection on research progress: what was found, what is missing, \
         and whether to search more or stop."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["reflection"],
            "properties": {
                "reflection": {
                    "type": "string",
                    "description": "Your reflection on progress and next steps"
                }
            }
        })
    }

    fn is_internal(&self) -> bool {
        true
    }

    async fn invoke(&self, args: Value) -> Result<String, OperationError> {
        let reflection = required_str(&args, "reflection")?;
        Ok(format!("Reflection recorded: {reflection}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_reflection() {
        let out = ThinkTool
            .invoke(json!({"reflection": "Have the catalog, done."}))
            .await
            .unwrap();
        assert_eq!(out, "Reflection recorded: Have the catalog, done.");
        assert!(ThinkTool.is_internal());
    }

    #[tokio::test]
    async fn reflection_required() {
        let err = ThinkTool.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, OperationError::InvalidArguments(_)));
    }
}
