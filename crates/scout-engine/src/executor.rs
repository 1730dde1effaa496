//! Single-operation execution and parallel fan-out.
//!
//! Every call yields exactly one [`OperationResult`]. Unknown names, argument
//! errors, timeouts and panics all become `ok == false` results; nothing here
//! returns an error to the caller.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::broadcast;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, instrument, warn};

use scout_core::events::SessionEvent;
use scout_core::ids::SessionId;
use scout_core::operations::{OperationCall, OperationError, OperationResult};
use scout_telemetry::MetricsRecorder;

use crate::registry::OperationRegistry;
use crate::truncate;

pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60);
const PREVIEW_CHARS: usize = 200;

#[derive(Clone)]
pub struct OperationExecutor {
    registry: Arc<OperationRegistry>,
    timeout: Duration,
    max_output: usize,
    event_tx: Option<broadcast::Sender<SessionEvent>>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl OperationExecutor {
    pub fn new(registry: Arc<OperationRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_OPERATION_TIMEOUT,
            max_output: truncate::DEFAULT_MAX_OUTPUT,
            event_tx: None,
            metrics: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output(mut self, max_bytes: usize) -> Self {
        self.max_output = max_bytes;
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

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    fn send_event(&self, event: SessionEvent) {
        if let Some(tx) = &self.event_tx {
            if tx.send(event).is_err() {
                debug!("no event receivers, event dropped");
            }
        }
    }

    fn record(&self, name: &str, outcome: &str, duration: Duration) {
        if let Some(m) = &self.metrics {
            m.counter_inc("scout.operations.total", &[("operation", name), ("outcome", outcome)], 1);
            m.histogram_observe(
                "scout.operation.duration_ms",
                &[("operation", name)],
                duration.as_millis() as f64,
            );
        }
    }

    /// Run one call to completion. Never fails.
    #[instrument(skip(self, call), fields(operation = %call.name, call_id = %call.id))]
    pub async fn execute(&self, call: &OperationCall, session_id: &SessionId) -> OperationResult {
        let Some(operation) = self.registry.lookup(&call.name) else {
            warn!("unknown operation requested");
            self.record(&call.name, "not_found", Duration::ZERO);
            let result = OperationResult::not_found(call);
            self.emit_end(session_id, &result);
            return result;
        };

        self.send_event(SessionEvent::OperationStart {
            session_id: session_id.clone(),
            call_id: call.id.clone(),
            operation: call.name.clone(),
        });

        let start = Instant::now();
        let outcome = tokio::time::timeout(
            self.timeout,
            AssertUnwindSafe(operation.invoke(call.arguments.clone())).catch_unwind(),
        )
        .await;
        let duration = start.elapsed();

        let (result, label) = match outcome {
            Ok(Ok(Ok(payload))) => {
                let payload = truncate::truncate_output(&payload, self.max_output);
                let internal = operation.is_internal();
                (OperationResult::success(call, payload, internal, duration), "ok")
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "operation failed");
                (OperationResult::failure(call, e, duration), "error")
            }
            Ok(Err(panic)) => {
                let msg = panic_message(&panic);
                error!(panic = %msg, "operation panicked");
                let e = OperationError::ExecutionFailed(format!("operation panicked: {msg}"));
                (OperationResult::failure(call, e, duration), "panic")
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "operation timed out");
                let e = OperationError::Timeout(self.timeout);
                (OperationResult::failure(call, e, duration), "timeout")
            }
        };

        self.record(&call.name, label, duration);
        self.emit_end(session_id, &result);
        result
    }

    fn emit_end(&self, session_id: &SessionId, result: &OperationResult) {
        self.send_event(SessionEvent::OperationEnd {
            session_id: session_id.clone(),
            call_id: result.call_id.clone(),
            operation: result.name.clone(),
            ok: result.ok,
            duration_ms: result.duration.as_millis() as u64,
            result_preview: truncate::preview(&result.payload, PREVIEW_CHARS),
        });
    }

    /// Run every call concurrently and return results in submission order.
    ///
    /// Wall time is bounded by the slowest call. The batch never short-circuits.
    /// Dropping the returned future aborts every call still in flight.
    #[instrument(skip(self, calls), fields(session_id = %session_id, size = calls.len()))]
    pub async fn execute_batch(
        &self,
        calls: &[OperationCall],
        session_id: &SessionId,
    ) -> Vec<OperationResult> {
        let start = Instant::now();

        let handles: Vec<_> = calls
            .iter()
            .cloned()
            .map(|call| {
                let this = self.clone();
                let sid = session_id.clone();
                AbortOnDropHandle::new(tokio::spawn(async move { this.execute(&call, &sid).await }))
            })
            .collect();

        let mut results = Vec::with_capacity(calls.len());
        for (call, handle) in calls.iter().zip(handles) {
            let result = match handle.await {
                Ok(r) => r,
                Err(join_err) => {
                    error!(operation = %call.name, error = %join_err, "operation task failed");
                    let e = OperationError::ExecutionFailed(format!("task failed: {join_err}"));
                    OperationResult::failure(call, e, start.elapsed())
                }
            };
            debug_assert_eq!(result.call_id, call.id);
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.ok).count();
        let elapsed = start.elapsed();
        if let Some(m) = &self.metrics {
            m.histogram_observe("scout.batch.size", &[], calls.len() as f64);
        }
        self.send_event(SessionEvent::BatchComplete {
            session_id: session_id.clone(),
            size: results.len(),
            failed,
            duration_ms: elapsed.as_millis() as u64,
        });
        debug!(failed, elapsed_ms = elapsed.as_millis() as u64, "batch complete");
        results
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}
