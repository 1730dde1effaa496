//! One cycle of the retrieve loop.
//!
//! `TurnController::step` reads the session and returns a [`TurnPatch`]; it
//! never mutates state. The orchestrator applies the patch.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, instrument};

use scout_core::events::SessionEvent;
use scout_core::messages::Message;
use scout_core::provider::{InvokeOptions, ModelProvider, ModelRequest, ModelResponse};
use scout_core::session::{LoopState, SessionError, SessionState, TurnPatch};
use scout_telemetry::MetricsRecorder;

use crate::error::EngineError;
use crate::executor::OperationExecutor;

pub struct TurnController {
    provider: Arc<dyn ModelProvider>,
    executor: OperationExecutor,
    system_prompt: String,
    options: InvokeOptions,
    event_tx: Option<broadcast::Sender<SessionEvent>>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl TurnController {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        executor: OperationExecutor,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            executor,
            system_prompt: system_prompt.into(),
            options: InvokeOptions::default(),
            event_tx: None,
            metrics: None,
        }
    }

    pub fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_events(mut self, tx: broadcast::Sender<SessionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn send_event(&self, event: SessionEvent) {
        if let Some(tx) = &self.event_tx {
            if tx.send(event).is_err() {
                debug!("no event receivers, event dropped");
            }
        }
    }

    #[instrument(skip_all, fields(session_id = %state.id(), turn = state.turn()))]
    pub async fn step(&self, state: &SessionState) -> Result<TurnPatch, EngineError> {
        match state.loop_state() {
            LoopState::AwaitModel => self.await_model(state).await,
            LoopState::ExecuteOperations { calls } => {
                let results = self.executor.execute_batch(calls, state.id()).await;
                Ok(TurnPatch {
                    turn: state.turn(),
                    appended: results.into_iter().map(Message::OperationResult).collect(),
                    next: LoopState::AwaitModel,
                })
            }
            LoopState::Done => Err(SessionError::LoopFinished.into()),
        }
    }

    async fn await_model(&self, state: &SessionState) -> Result<TurnPatch, EngineError> {
        let turn = state.turn() + 1;
        self.send_event(SessionEvent::TurnStart {
            session_id: state.id().clone(),
            turn,
        });

        let request = ModelRequest::new(self.system_prompt.clone(), state.retrieval().to_vec())
            .with_operations(self.executor.registry().definitions())
            .with_options(self.options.clone());
        let response = self.provider.invoke(&request).await?;
        if let Some(m) = &self.metrics {
            m.counter_inc("scout.model.calls", &[("stage", "retrieve")], 1);
        }

        let patch = match response {
            ModelResponse::Actions { calls, text } if !calls.is_empty() => {
                debug!(count = calls.len(), "model requested operations");
                TurnPatch {
                    turn,
                    appended: vec![Message::ActionRequest {
                        calls: calls.clone(),
                        text,
                    }],
                    next: LoopState::ExecuteOperations { calls },
                }
            }
            ModelResponse::Actions { text, .. } => final_patch(turn, text.unwrap_or_default()),
            ModelResponse::Text(text) => final_patch(turn, text),
            ModelResponse::Structured(value) => final_patch(turn, value.to_string()),
        };

        self.send_event(SessionEvent::TurnComplete {
            session_id: state.id().clone(),
            turn,
            operations_requested: match &patch.next {
                LoopState::ExecuteOperations { calls } => calls.len(),
                _ => 0,
            },
        });
        Ok(patch)
    }
}

fn final_patch(turn: u32, text: String) -> TurnPatch {
    let appended = if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![Message::assistant(text)]
    };
    TurnPatch {
        turn,
        appended,
        next: LoopState::Done,
    }
}
