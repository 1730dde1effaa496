//! Settings type definitions.
//!
//! Field names are camelCase on disk. Every section is `#[serde(default)]`
//! so a partial file only overrides what it names.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoutSettings {
    pub model: ModelSettings,
    pub retry: RetrySettings,
    pub retrieval: RetrievalSettings,
    pub catalog: CatalogSettings,
    pub logging: LoggingSettings,
}

impl ScoutSettings {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.max_turns == 0 {
            return Err(SettingsError::InvalidValue(
                "retrieval.maxTurns must be at least 1".into(),
            ));
        }
        if self.retrieval.operation_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "retrieval.operationTimeoutSecs must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(SettingsError::InvalidValue(format!(
                "model.temperature {} outside 0.0..=2.0",
                self.model.temperature
            )));
        }
        Ok(())
    }
}

/// Model endpoint and per-stage model choice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// OpenAI-compatible base URL.
    pub base_url: String,
    /// Model for clarify, brief and the retrieve loop.
    pub model: String,
    /// Model for the final answer.
    pub compression_model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            compression_model: "gpt-4.1".to_string(),
            temperature: 0.0,
            max_tokens: 32_000,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown_secs: 30,
        }
    }
}

/// Budget and limits for the retrieve loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalSettings {
    pub max_turns: u32,
    pub max_duration_secs: u64,
    pub operation_timeout_secs: u64,
    pub max_result_bytes: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_turns: 8,
            max_duration_secs: 300,
            operation_timeout_secs: 60,
            max_result_bytes: 64 * 1024,
        }
    }
}

impl RetrievalSettings {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogSettings {
    /// Catalog JSON file. Unset means the bundled fixture path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    /// Per-module level names, e.g. `{"scout_llm": "debug"}`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            modules: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = ScoutSettings::default();
        assert_eq!(s.model.model, "gpt-4.1-mini");
        assert_eq!(s.model.compression_model, "gpt-4.1");
        assert_eq!(s.retrieval.max_turns, 8);
        assert_eq!(s.retrieval.operation_timeout(), Duration::from_secs(60));
        assert!(s.catalog.path.is_none());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn camel_case_on_disk() {
        let v = serde_json::to_value(ScoutSettings::default()).unwrap();
        assert_eq!(v["retrieval"]["maxTurns"], 8);
        assert_eq!(v["model"]["compressionModel"], "gpt-4.1");
        assert!(v["catalog"].get("path").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: ScoutSettings =
            serde_json::from_str(r#"{"retrieval": {"maxTurns": 3}}"#).unwrap();
        assert_eq!(s.retrieval.max_turns, 3);
        assert_eq!(s.retrieval.max_duration_secs, 300);
        assert_eq!(s.model, ModelSettings::default());
    }

    #[test]
    fn validate_rejects_zero_turns() {
        let mut s = ScoutSettings::default();
        s.retrieval.max_turns = 0;
        assert!(matches!(s.validate(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn validate_rejects_temperature_out_of_range() {
        let mut s = ScoutSettings::default();
        s.model.temperature = 3.5;
        assert!(s.validate().is_err());
    }
}
