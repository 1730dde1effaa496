//! Chat-completions wire format.

use serde::Deserialize;
use serde_json::{json, Value};

use scout_core::errors::GatewayError;
use scout_core::ids::CallId;
use scout_core::messages::Message;
use scout_core::operations::{OperationCall, OperationDefinition};
use scout_core::provider::{ModelRequest, ModelResponse, ResponseFormat};

pub fn build_request_body(request: &ModelRequest, model: &str) -> Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.extend(request.messages.iter().map(message_to_wire));

    let mut body = json!({
        "model": model,
        "messages": messages,
    });

    if !request.operations.is_empty() {
        body["tools"] = Value::Array(request.operations.iter().map(operation_to_wire).collect());
    }

    if let ResponseFormat::Structured { name, schema } = &request.response_format {
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {"name": name, "schema": schema, "strict": true},
        });
    }

    if let Some(max_tokens) = request.options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = request.options.temperature {
        body["temperature"] = json!(temperature);
    }

    body
}

fn message_to_wire(message: &Message) -> Value {
    match message {
        Message::User { content } => json!({"role": "user", "content": content}),
        Message::Assistant { content } => json!({"role": "assistant", "content": content}),
        Message::ActionRequest { calls, text } => {
            let tool_calls: Vec<Value> = calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {"name": call.name, "arguments": arguments_to_wire(&call.arguments)},
                    })
                })
                .collect();
            json!({"role": "assistant", "content": text, "tool_calls": tool_calls})
        }
        Message::OperationResult(result) => json!({
            "role": "tool",
            "tool_call_id": result.call_id,
            "content": result.payload,
        }),
    }
}

/// Arguments go out as a JSON string. Unparseable model output was kept raw.
fn arguments_to_wire(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

fn operation_to_wire(def: &OperationDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.parameters_schema,
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub refusal: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseToolCall {
    pub id: String,
    pub function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
pub struct ResponseFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Map a decoded response to a [`ModelResponse`].
///
/// Tool calls win over content. Argument strings that are not JSON are kept as
/// `Value::String` so the operation reports the failure instead of the session.
pub fn parse_response(
    response: ChatResponse,
    format: &ResponseFormat,
) -> Result<ModelResponse, GatewayError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .ok_or_else(|| GatewayError::MalformedResponse("response has no message".into()))?;

    let calls: Vec<OperationCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| OperationCall {
            id: CallId::from_raw(tc.id),
            name: tc.function.name,
            arguments: parse_arguments(&tc.function.arguments),
        })
        .collect();

    if !calls.is_empty() {
        return Ok(ModelResponse::Actions {
            calls,
            text: message.content.filter(|t| !t.is_empty()),
        });
    }

    if let Some(refusal) = message.refusal {
        return Err(GatewayError::MalformedResponse(format!("model refused: {refusal}")));
    }

    let content = message.content.unwrap_or_default();
    match format {
        ResponseFormat::Text => Ok(ModelResponse::Text(content)),
        ResponseFormat::Structured { name, .. } => serde_json::from_str(&content)
            .map(ModelResponse::Structured)
            .map_err(|e| GatewayError::MalformedResponse(format!("{name}: {e}"))),
    }
}

fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
