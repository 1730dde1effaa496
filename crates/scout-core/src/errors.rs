use std::time::Duration;

/// How the retry layer should treat a [`GatewayError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The same request will fail again.
    Fatal,
    /// Transient; worth another attempt after a delay.
    Retryable,
    /// Neither: the call was stopped on our side.
    Operational,
}

/// Failures at the model boundary. These end a session; per-operation
/// failures never take this path.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("context window exceeded: {0}")]
    ContextWindowExceeded(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The model answered, but not in a shape we can use.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("provider overloaded")]
    ProviderOverloaded,
    #[error("network error: {0}")]
    NetworkError(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("circuit open for another {0:?}")]
    CircuitOpen(Duration),
    #[error("cancelled")]
    Cancelled,
}

impl GatewayError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::AuthenticationFailed(_)
            | Self::ContextWindowExceeded(_)
            | Self::InvalidRequest(_)
            | Self::MalformedResponse(_) => ErrorClass::Fatal,
            Self::RateLimited { .. }
            | Self::ServerError { .. }
            | Self::ProviderOverloaded
            | Self::NetworkError(_) => ErrorClass::Retryable,
            Self::Timeout(_) | Self::CircuitOpen(_) | Self::Cancelled => ErrorClass::Operational,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    /// Server-provided backoff hint, if any.
    pub fn suggested_delay(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Snake-case label used in logs and metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::ContextWindowExceeded(_) => "context_window_exceeded",
            Self::InvalidRequest(_) => "invalid_request",
            Self::MalformedResponse(_) => "malformed_response",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::ProviderOverloaded => "provider_overloaded",
            Self::NetworkError(_) => "network_error",
            Self::Timeout(_) => "timeout",
            Self::CircuitOpen(_) => "circuit_open",
            Self::Cancelled => "cancelled",
        }
    }

    /// Map a non-success chat-completions status to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 if body.contains("context_length_exceeded") => Self::ContextWindowExceeded(body),
            400 | 404 | 422 => Self::InvalidRequest(body),
            429 => Self::RateLimited { retry_after: None },
            503 | 529 => Self::ProviderOverloaded,
            500..=599 => Self::ServerError { status, body },
            other => Self::InvalidRequest(format!("unexpected status {other}: {body}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(GatewayError::ProviderOverloaded.class(), ErrorClass::Retryable);
        assert_eq!(GatewayError::NetworkError("reset".into()).class(), ErrorClass::Retryable);
        assert_eq!(GatewayError::MalformedResponse("no choices".into()).class(), ErrorClass::Fatal);
        assert_eq!(GatewayError::Cancelled.class(), ErrorClass::Operational);
        assert_eq!(GatewayError::CircuitOpen(Duration::from_secs(5)).class(), ErrorClass::Operational);
    }

    #[test]
    fn operational_is_not_retryable() {
        let err = GatewayError::Timeout(Duration::from_secs(120));
        assert_eq!(err.class(), ErrorClass::Operational);
        assert!(!err.is_retryable());
    }

    #[test]
    fn rate_limit_carries_delay() {
        let err = GatewayError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.suggested_delay(), Some(Duration::from_secs(7)));
        assert_eq!(GatewayError::ProviderOverloaded.suggested_delay(), None);
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (401, "authentication_failed"),
            (403, "authentication_failed"),
            (400, "invalid_request"),
            (404, "invalid_request"),
            (429, "rate_limited"),
            (500, "server_error"),
            (502, "server_error"),
            (503, "provider_overloaded"),
            (418, "invalid_request"),
        ];
        for (status, kind) in cases {
            assert_eq!(GatewayError::from_status(status, String::new()).error_kind(), kind, "{status}");
        }
        let err = GatewayError::from_status(400, r#"{"error":{"code":"context_length_exceeded"}}"#.into());
        assert!(matches!(err, GatewayError::ContextWindowExceeded(_)));
    }
}
