use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use tracing::{info, warn};

use scout_core::errors::GatewayError;
use scout_core::provider::{ModelProvider, ModelRequest, ModelResponse};

#[derive(Clone, Debug)]
pub struct ReliableConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown: Duration,
}

impl Default for ReliableConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.2,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open { since: Instant },
    HalfOpen,
}

/// Retry and circuit-breaker wrapper around any [`ModelProvider`].
///
/// - Retryable errors back off exponentially with jitter
/// - `retry_after` hints from rate limits are honoured
/// - N consecutive failed calls open the circuit; after the cooldown one probe
///   is let through (half-open) and a success closes it again
pub struct ReliableProvider<P: ModelProvider> {
    inner: P,
    config: ReliableConfig,
    circuit_state: RwLock<CircuitState>,
    consecutive_failures: AtomicU32,
    total_retries: AtomicU64,
}

impl<P: ModelProvider> ReliableProvider<P> {
    pub fn new(inner: P, config: ReliableConfig) -> Self {
        Self {
            inner,
            config,
            circuit_state: RwLock::new(CircuitState::Closed),
            consecutive_failures: AtomicU32::new(0),
            total_retries: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    fn inner(&self) -> &P {
        &self.inner
    }

    fn check_circuit(&self) -> Result<(), GatewayError> {
        let state = *self.circuit_state.read();
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open { since } => {
                let elapsed = since.elapsed();
                if elapsed >= self.config.circuit_breaker_cooldown {
                    *self.circuit_state.write() = CircuitState::HalfOpen;
                    Ok(())
                } else {
                    Err(GatewayError::CircuitOpen(
                        self.config.circuit_breaker_cooldown - elapsed,
                    ))
                }
            }
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut state = self.circuit_state.write();
        if *state != CircuitState::Closed {
            info!(provider = self.inner.name(), "circuit breaker closed");
            *state = CircuitState::Closed;
        }
    }

    fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.circuit_state.write();
        let trip = match *state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => failures >= self.config.circuit_breaker_threshold,
            CircuitState::Open { .. } => false,
        };
        if trip {
            warn!(
                failures,
                cooldown_secs = self.config.circuit_breaker_cooldown.as_secs(),
                "circuit breaker opened"
            );
            *state = CircuitState::Open {
                since: Instant::now(),
            };
        }
    }

    /// Exponential backoff (`base * 2^attempt`, capped) with ± jitter.
    fn retry_delay(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        if let Some(delay) = suggested {
            return delay;
        }
        let exp = self.config.base_delay.as_millis() as f64 * 2f64.powi(attempt as i32);
        let capped = exp.min(self.config.max_delay.as_millis() as f64);
        let spread = capped * self.config.jitter_factor;
        let jitter = if spread > 0.0 {
            rand::thread_rng().gen_range(-spread..=spread)
        } else {
            0.0
        };
        Duration::from_millis((capped + jitter).max(1.0) as u64)
    }

    pub fn total_retries(&self) -> u64 {
        self.total_retries.load(Ordering::Relaxed)
    }

    pub fn circuit_state_name(&self) -> &'static str {
        match *self.circuit_state.read() {
            CircuitState::Closed => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[async_trait]
impl<P: ModelProvider> ModelProvider for ReliableProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, GatewayError> {
        self.check_circuit()?;

        let mut attempt = 0;
        loop {
            match self.inner.invoke(request).await {
                Ok(response) => {
                    self.record_success();
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() || attempt >= self.config.max_retries => {
                    // Malformed output is the model's doing, not the endpoint's.
                    if !matches!(e, GatewayError::MalformedResponse(_)) {
                        self.record_failure();
                    }
                    warn!(
                        error = %e,
                        kind = e.error_kind(),
                        attempts = attempt + 1,
                        total_retries = self.total_retries(),
                        circuit = self.circuit_state_name(),
                        "model call failed"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.retry_delay(attempt, e.suggested_delay());
                    self.total_retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        kind = e.error_kind(),
                        "retrying model call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProvider, MockResponse};

    fn server_error() -> MockResponse {
        MockResponse::Error(GatewayError::ServerError {
            status: 500,
            body: "internal".into(),
        })
    }

    fn fast(max_retries: u32) -> ReliableConfig {
        ReliableConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn success_on_first_try() {
        let reliable = ReliableProvider::new(MockProvider::new(vec![MockResponse::text("hello")]), ReliableConfig::default());
        let resp = reliable.invoke(&ModelRequest::default()).await.unwrap();
        assert_eq!(resp, ModelResponse::Text("hello".into()));
        assert_eq!(reliable.total_retries(), 0);
    }

    #[tokio::test]
    async fn retries_on_retryable_error() {
        let mock = MockProvider::new(vec![server_error(), server_error(), MockResponse::text("recovered")]);
        let reliable = ReliableProvider::new(mock, fast(3));
        assert!(reliable.invoke(&ModelRequest::default()).await.is_ok());
        assert_eq!(reliable.total_retries(), 2);
        assert_eq!(reliable.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn fatal_error_not_retried() {
        let mock = MockProvider::new(vec![
            MockResponse::Error(GatewayError::AuthenticationFailed("bad key".into())),
            MockResponse::text("unreachable"),
        ]);
        let reliable = ReliableProvider::new(mock, fast(3));
        let err = reliable.invoke(&ModelRequest::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthenticationFailed(_)));
        assert_eq!(reliable.total_retries(), 0);
    }

    #[tokio::test]
    async fn max_retries_exhausted() {
        let mock = MockProvider::new((0..4).map(|_| server_error()).collect());
        let reliable = ReliableProvider::new(mock, fast(3));
        assert!(reliable.invoke(&ModelRequest::default()).await.is_err());
        assert_eq!(reliable.total_retries(), 3);
    }

    #[tokio::test]
    async fn circuit_breaker_trips_after_threshold() {
        let mock = MockProvider::new(vec![server_error(), server_error(), server_error(), MockResponse::text("unreachable")]);
        let config = ReliableConfig {
            circuit_breaker_threshold: 3,
            circuit_breaker_cooldown: Duration::from_secs(60),
            ..fast(0)
        };
        let reliable = ReliableProvider::new(mock, config);
        for _ in 0..3 {
            let _ = reliable.invoke(&ModelRequest::default()).await;
        }
        assert_eq!(reliable.circuit_state_name(), "open");

        let err = reliable.invoke(&ModelRequest::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::CircuitOpen(_)));
        assert_eq!(reliable.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn circuit_breaker_recovers_after_cooldown() {
        let mock = MockProvider::new(vec![server_error(), server_error(), MockResponse::text("recovered")]);
        let config = ReliableConfig {
            circuit_breaker_threshold: 2,
            circuit_breaker_cooldown: Duration::from_millis(30),
            ..fast(0)
        };
        let reliable = ReliableProvider::new(mock, config);
        for _ in 0..2 {
            let _ = reliable.invoke(&ModelRequest::default()).await;
        }
        assert_eq!(reliable.circuit_state_name(), "open");

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(reliable.invoke(&ModelRequest::default()).await.is_ok());
        assert_eq!(reliable.circuit_state_name(), "closed");
    }

    #[tokio::test]
    async fn malformed_response_does_not_trip_breaker() {
        let mock = MockProvider::new(vec![
            MockResponse::Error(GatewayError::MalformedResponse("x".into())),
            MockResponse::Error(GatewayError::MalformedResponse("x".into())),
        ]);
        let config = ReliableConfig {
            circuit_breaker_threshold: 1,
            ..fast(0)
        };
        let reliable = ReliableProvider::new(mock, config);
        let _ = reliable.invoke(&ModelRequest::default()).await;
        assert_eq!(reliable.circuit_state_name(), "closed");
    }

    #[test]
    fn retry_delay_respects_suggested() {
        let reliable = ReliableProvider::new(MockProvider::new(vec![]), ReliableConfig::default());
        let d = reliable.retry_delay(0, Some(Duration::from_secs(7)));
        assert_eq!(d, Duration::from_secs(7));
    }

    #[test]
    fn retry_delay_is_capped() {
        let reliable = ReliableProvider::new(
            MockProvider::new(vec![]),
            ReliableConfig {
                base_delay: Duration::from_millis(100),
                max_delay: Duration::from_millis(400),
                jitter_factor: 0.0,
                ..Default::default()
            },
        );
        assert_eq!(reliable.retry_delay(0, None), Duration::from_millis(100));
        assert_eq!(reliable.retry_delay(1, None), Duration::from_millis(200));
        assert_eq!(reliable.retry_delay(10, None), Duration::from_millis(400));
    }
}
