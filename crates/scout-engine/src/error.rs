use scout_core::errors::GatewayError;
use scout_core::session::SessionError;

/// Session-level failures. Per-operation failures never appear here; they are
/// carried as `ok == false` results.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("malformed {stage} response: {detail}")]
    MalformedResponse { stage: &'static str, detail: String },

    #[error("session state error: {0}")]
    Session(#[from] SessionError),

    #[error("session aborted")]
    Aborted,
}

impl EngineError {
    pub fn malformed(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            stage,
            detail: detail.into(),
        }
    }

    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Gateway(e) => e.error_kind(),
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Session(_) => "session_state",
            Self::Aborted => "aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_converts() {
        let err: EngineError = GatewayError::ProviderOverloaded.into();
        assert_eq!(err.error_kind(), "provider_overloaded");
        assert_eq!(err.to_string(), "gateway error: provider overloaded");
    }

    #[test]
    fn malformed_display() {
        let err = EngineError::malformed("clarify", "missing field `need_clarification`");
        assert_eq!(
            err.to_string(),
            "malformed clarify response: missing field `need_clarification`"
        );
    }
}
