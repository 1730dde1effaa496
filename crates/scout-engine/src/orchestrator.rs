//! End-to-end session: clarify, brief, retrieve loop, compression.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info, instrument, warn};

use scout_core::events::{LoopEndReason, SessionEvent};
use scout_core::ids::SessionId;
use scout_core::messages::Message;
use scout_core::provider::{InvokeOptions, ModelProvider};
use scout_core::session::{LoopState, SessionState};
use scout_telemetry::MetricsRecorder;

use crate::compression::CompressionStage;
use crate::controller::TurnController;
use crate::error::EngineError;
use crate::executor::{OperationExecutor, DEFAULT_OPERATION_TIMEOUT};
use crate::prestage::PreStage;
use crate::prompts;
use crate::registry::OperationRegistry;
use crate::truncate;

const EVENT_CAPACITY: usize = 256;

/// Ceiling on the retrieve loop. Exhaustion moves on to compression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetrievalBudget {
    pub max_turns: u32,
    pub max_duration: Duration,
}

impl Default for RetrievalBudget {
    fn default() -> Self {
        Self {
            max_turns: 8,
            max_duration: Duration::from_secs(300),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub budget: RetrievalBudget,
    /// Options for clarify, brief and retrieval calls.
    pub options: InvokeOptions,
    pub compression_options: InvokeOptions,
    /// Names offered to the clarify stage as the available products.
    pub products: Vec<String>,
    pub operation_timeout: Duration,
    pub max_result_bytes: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            budget: RetrievalBudget::default(),
            options: InvokeOptions::default(),
            compression_options: InvokeOptions::default(),
            products: Vec::new(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            max_result_bytes: truncate::DEFAULT_MAX_OUTPUT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionOutcome {
    Clarification { question: String },
    Answer { answer: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub outcome: SessionOutcome,
    pub objective: Option<String>,
    pub turns: u32,
    pub loop_end: Option<LoopEndReason>,
    /// Visible conversation including this session's assistant turns.
    pub conversation: Vec<Message>,
}

pub struct Orchestrator {
    provider: Arc<dyn ModelProvider>,
    compression_provider: Arc<dyn ModelProvider>,
    registry: Arc<OperationRegistry>,
    config: OrchestratorConfig,
    event_tx: broadcast::Sender<SessionEvent>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        registry: Arc<OperationRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            compression_provider: provider.clone(),
            provider,
            registry,
            config,
            event_tx,
            metrics: None,
        }
    }

    /// Use a different model for the final synthesis.
    pub fn with_compression_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.compression_provider = provider;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    fn send_event(&self, event: SessionEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("no event receivers, event dropped");
        }
    }

    fn count_model_call(&self, stage: &str) {
        if let Some(m) = &self.metrics {
            m.counter_inc("scout.model.calls", &[("stage", stage)], 1);
        }
    }

    fn executor(&self) -> OperationExecutor {
        let executor = OperationExecutor::new(self.registry.clone())
            .with_timeout(self.config.operation_timeout)
            .with_max_output(self.config.max_result_bytes)
            .with_events(self.event_tx.clone());
        match &self.metrics {
            Some(m) => executor.with_metrics(m.clone()),
            None => executor,
        }
    }

    /// Run one session over the visible conversation so far.
    ///
    /// Returns a clarification question or a final answer. Model failures and
    /// malformed structured replies end the session with an error.
    #[instrument(skip_all, fields(session_id = field::Empty))]
    pub async fn run_session(
        &self,
        conversation: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<SessionReport, EngineError> {
        let mut state = SessionState::new(SessionId::new(), conversation);
        let session_id = state.id().clone();
        tracing::Span::current().record("session_id", field::display(&session_id));

        let prestage = PreStage::new(self.provider.clone(), self.config.products.clone())
            .with_options(self.config.options.clone());

        let decision = cancellable(cancel, prestage.clarify(state.conversation())).await?;
        self.count_model_call("clarify");
        if decision.need_clarification {
            info!("clarification requested");
            state.push_conversation(Message::assistant(decision.question.clone()));
            self.send_event(SessionEvent::ClarificationRequested {
                session_id: session_id.clone(),
                question: decision.question.clone(),
            });
            return Ok(SessionReport {
                session_id,
                outcome: SessionOutcome::Clarification {
                    question: decision.question,
                },
                objective: None,
                turns: 0,
                loop_end: None,
                conversation: state.conversation().to_vec(),
            });
        }
        if !decision.verification.trim().is_empty() {
            state.push_conversation(Message::assistant(decision.verification));
        }

        let objective = cancellable(cancel, prestage.brief(state.conversation())).await?;
        self.count_model_call("brief");
        state.set_objective(objective.clone())?;
        self.send_event(SessionEvent::ObjectiveSet {
            session_id: session_id.clone(),
            objective: objective.clone(),
        });

        let reason = self.retrieve(&mut state, cancel).await?;
        self.send_event(SessionEvent::LoopFinished {
            session_id: session_id.clone(),
            turns: state.turn(),
            reason,
        });
        if let Some(m) = &self.metrics {
            m.histogram_observe("scout.session.turns", &[], f64::from(state.turn()));
        }

        let compression = CompressionStage::new(self.compression_provider.clone())
            .with_options(self.config.compression_options.clone());
        let answer = cancellable(cancel, compression.compress(&objective, state.retrieval())).await?;
        self.count_model_call("compress");
        state.set_answer(answer.clone())?;
        state.push_conversation(Message::assistant(answer.clone()));
        self.send_event(SessionEvent::AnswerReady {
            session_id: session_id.clone(),
            answer: answer.clone(),
        });
        info!(turns = state.turn(), "session complete");

        Ok(SessionReport {
            session_id,
            outcome: SessionOutcome::Answer { answer },
            objective: Some(objective),
            turns: state.turn(),
            loop_end: Some(reason),
            conversation: state.conversation().to_vec(),
        })
    }

    async fn retrieve(
        &self,
        state: &mut SessionState,
        cancel: &CancellationToken,
    ) -> Result<LoopEndReason, EngineError> {
        let controller = TurnController::new(
            self.provider.clone(),
            self.executor(),
            prompts::retrieval_prompt(&prompts::today()),
        )
        .with_options(self.config.options.clone())
        .with_events(self.event_tx.clone());
        let controller = match &self.metrics {
            Some(m) => controller.with_metrics(m.clone()),
            None => controller,
        };

        let budget = self.config.budget;
        let start = Instant::now();
        while !state.loop_state().is_done() {
            if cancel.is_cancelled() {
                return Err(EngineError::Aborted);
            }
            let awaiting_model = matches!(state.loop_state(), LoopState::AwaitModel);
            if awaiting_model && state.turn() >= budget.max_turns {
                warn!(max_turns = budget.max_turns, "retrieval turn budget exhausted");
                state.finish_loop();
                return Ok(LoopEndReason::BudgetExhausted);
            }
            let elapsed = start.elapsed();
            if awaiting_model && elapsed >= budget.max_duration {
                warn!(
                    elapsed_secs = elapsed.as_secs(),
                    max_secs = budget.max_duration.as_secs(),
                    "retrieval time budget exhausted"
                );
                state.finish_loop();
                return Ok(LoopEndReason::BudgetExhausted);
            }

            let patch = cancellable(cancel, controller.step(state)).await?;
            state.apply(patch)?;
        }
        Ok(LoopEndReason::Completed)
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Aborted),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registry_with, Echo, Sleep};
    use scout_core::errors::GatewayError;
    use scout_llm::{MockProvider, MockResponse};
    use serde_json::json;

    fn proceed() -> MockResponse {
        MockResponse::structured(json!({
            "need_clarification": false,
            "question": "",
            "verification": "Starting research."
        }))
    }

    fn brief() -> MockResponse {
        MockResponse::structured(json!({"objective": "List every chair"}))
    }

    fn orchestrator(script: Vec<MockResponse>, config: OrchestratorConfig) -> (Orchestrator, Arc<MockProvider>) {
        let provider = Arc::new(MockProvider::new(script));
        let registry = registry_with(vec![Arc::new(Echo), Arc::new(Sleep)]);
        (Orchestrator::new(provider.clone(), registry, config), provider)
    }

    #[tokio::test]
    async fn answers_after_one_batch() {
        let (orch, provider) = orchestrator(
            vec![
                proceed(),
                brief(),
                MockResponse::actions(vec![("echo", json!({"text": "Aeron Chair"}))]),
                MockResponse::text("that's everything"),
                MockResponse::text("We carry the Aeron Chair."),
            ],
            OrchestratorConfig::default(),
        );
        let mut rx = orch.subscribe();
        let report = orch
            .run_session(vec![Message::user("show me chairs")], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            SessionOutcome::Answer {
                answer: "We carry the Aeron Chair.".into()
            }
        );
        assert_eq!(report.turns, 2);
        assert_eq!(report.loop_end, Some(LoopEndReason::Completed));
        assert_eq!(report.objective.as_deref(), Some("List every chair"));
        assert_eq!(provider.call_count(), 5);
        let texts: Vec<_> = report.conversation.iter().filter_map(Message::text).collect();
        assert_eq!(texts, ["show me chairs", "Starting research.", "We carry the Aeron Chair."]);

        let mut kinds = Vec::new();
        while let Ok(evt) = rx.try_recv() {
            kinds.push(evt.event_type());
        }
        assert_eq!(kinds.first(), Some(&"objective_set"));
        assert_eq!(kinds.last(), Some(&"answer_ready"));
        assert!(kinds.contains(&"loop_finished"));
    }

    #[tokio::test]
    async fn clarification_ends_session_early() {
        let (orch, provider) = orchestrator(
            vec![MockResponse::structured(json!({
                "need_clarification": true,
                "question": "Did you mean the Embody?",
                "verification": ""
            }))],
            OrchestratorConfig::default(),
        );
        let report = orch
            .run_session(vec![Message::user("tell me about the Embodee")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            report.outcome,
            SessionOutcome::Clarification {
                question: "Did you mean the Embody?".into()
            }
        );
        assert_eq!(report.loop_end, None);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(report.conversation.len(), 2);
    }

    #[tokio::test]
    async fn turn_budget_forces_compression() {
        let looping = || MockResponse::actions(vec![("echo", json!({"text": "again"}))]);
        let config = OrchestratorConfig {
            budget: RetrievalBudget {
                max_turns: 2,
                max_duration: Duration::from_secs(60),
            },
            ..Default::default()
        };
        let (orch, provider) = orchestrator(
            vec![proceed(), brief(), looping(), looping(), MockResponse::text("summary")],
            config,
        );
        let report = orch
            .run_session(vec![Message::user("show me chairs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.loop_end, Some(LoopEndReason::BudgetExhausted));
        assert_eq!(report.turns, 2);
        assert_eq!(provider.call_count(), 5);

        let compress = provider.requests().pop().unwrap();
        let body = compress.messages[0].text().unwrap().to_string();
        assert_eq!(body.matches("## echo").count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn time_budget_forces_compression() {
        let config = OrchestratorConfig {
            budget: RetrievalBudget {
                max_turns: 50,
                max_duration: Duration::from_secs(1),
            },
            ..Default::default()
        };
        let (orch, _) = orchestrator(
            vec![
                proceed(),
                brief(),
                MockResponse::actions(vec![("sleep", json!({"ms": 2000}))]),
                MockResponse::text("summary"),
            ],
            config,
        );
        let report = orch
            .run_session(vec![Message::user("show me chairs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.loop_end, Some(LoopEndReason::BudgetExhausted));
        assert_eq!(report.turns, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_reply_still_runs_its_batch() {
        let config = OrchestratorConfig {
            budget: RetrievalBudget {
                max_turns: 50,
                max_duration: Duration::from_secs(1),
            },
            ..Default::default()
        };
        let (orch, provider) = orchestrator(
            vec![
                proceed(),
                brief(),
                MockResponse::delayed(
                    Duration::from_secs(2),
                    MockResponse::actions(vec![("echo", json!({"text": "a"})), ("echo", json!({"text": "b"}))]),
                ),
                MockResponse::text("summary"),
            ],
            config,
        );
        let report = orch
            .run_session(vec![Message::user("show me chairs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.loop_end, Some(LoopEndReason::BudgetExhausted));
        assert_eq!(report.turns, 1);

        let body = provider.requests().pop().unwrap().messages[0].text().unwrap().to_string();
        assert_eq!(body.matches("## echo").count(), 2);
    }

    #[tokio::test]
    async fn model_failure_is_session_failure() {
        let (orch, _) = orchestrator(
            vec![proceed(), brief(), MockResponse::Error(GatewayError::ProviderOverloaded)],
            OrchestratorConfig::default(),
        );
        let err = orch
            .run_session(vec![Message::user("show me chairs")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Gateway(GatewayError::ProviderOverloaded)));
    }

    #[tokio::test]
    async fn cancelled_session_aborts() {
        let (orch, provider) = orchestrator(vec![proceed()], OrchestratorConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = orch
            .run_session(vec![Message::user("show me chairs")], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Aborted));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn separate_compression_model() {
        let (orch, main) = orchestrator(
            vec![proceed(), brief(), MockResponse::text("done")],
            OrchestratorConfig::default(),
        );
        let compressor = Arc::new(MockProvider::new(vec![MockResponse::text("final")]));
        let orch = orch.with_compression_provider(compressor.clone());
        let report = orch
            .run_session(vec![Message::user("show me chairs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, SessionOutcome::Answer { answer: "final".into() });
        assert_eq!(main.call_count(), 3);
        assert_eq!(compressor.call_count(), 1);
    }
}
