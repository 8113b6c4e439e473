//! Configuration types, built from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;

use crate::error::ConfigError;

/// Default model used when `COACH_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on a single model call (extraction, classification, reply).
    pub llm_timeout: Duration,
    /// Token cap for the extraction call.
    pub extraction_max_tokens: u32,
    /// Token cap for the classification call.
    pub classifier_max_tokens: u32,
    /// Token cap for free-form conversational replies.
    pub reply_max_tokens: u32,
    /// How many recent conversation turns are sent to the model.
    pub history_turns: usize,
    /// Per-turn character cap applied to history before prompting.
    pub history_turn_chars: usize,
    /// Model classifications under this confidence are discarded.
    pub min_intent_confidence: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(8),
            extraction_max_tokens: 512,
            classifier_max_tokens: 256,
            reply_max_tokens: 400,
            history_turns: 6,
            history_turn_chars: 300,
            min_intent_confidence: 0.7,
        }
    }
}

impl PipelineConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let llm_timeout = std::env::var("COACH_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.llm_timeout);

        let extraction_max_tokens = std::env::var("COACH_EXTRACTION_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.extraction_max_tokens);

        let history_turns = std::env::var("COACH_HISTORY_TURNS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.history_turns);

        let min_intent_confidence = match std::env::var("COACH_MIN_INTENT_CONFIDENCE") {
            Ok(raw) => parse_confidence(&raw)?,
            Err(_) => defaults.min_intent_confidence,
        };

        Ok(Self {
            llm_timeout,
            extraction_max_tokens,
            history_turns,
            min_intent_confidence,
            ..defaults
        })
    }
}

fn parse_confidence(raw: &str) -> Result<f32, ConfigError> {
    let value: f32 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: "COACH_MIN_INTENT_CONFIDENCE".to_string(),
        message: format!("'{raw}' is not a number"),
    })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: "COACH_MIN_INTENT_CONFIDENCE".to_string(),
            message: format!("{value} is outside [0, 1]"),
        });
    }
    Ok(value)
}

/// Unset or unreadable prices count as zero.
fn price_from_env(key: &str) -> Decimal {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<Decimal>().ok())
        .filter(|price| !price.is_sign_negative())
        .unwrap_or(Decimal::ZERO)
}

/// Model provider settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    /// Price per million input tokens, for cost logging.
    pub input_cost_per_mtok: Decimal,
    /// Price per million output tokens.
    pub output_cost_per_mtok: Decimal,
}

impl LlmSettings {
    /// Build settings from environment variables.
    /// Returns `None` if `COACH_LLM_API_KEY` is not set (pattern-only mode).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("COACH_LLM_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }

        let base_url =
            std::env::var("COACH_LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("COACH_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Some(Self {
            base_url,
            api_key: SecretString::from(api_key),
            model,
            input_cost_per_mtok: price_from_env("COACH_LLM_INPUT_COST"),
            output_cost_per_mtok: price_from_env("COACH_LLM_OUTPUT_COST"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.llm_timeout, Duration::from_secs(8));
        assert_eq!(config.history_turns, 6);
        assert!((config.min_intent_confidence - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn confidence_parsing_rejects_out_of_range() {
        assert!(parse_confidence("0.65").is_ok());
        assert!(parse_confidence("1.5").is_err());
        assert!(parse_confidence("-0.1").is_err());
        assert!(parse_confidence("high").is_err());
    }
}
