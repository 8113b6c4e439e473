//! LLM integration.
//!
//! The pipeline only sees the `LlmProvider` trait. `OpenAiProvider` speaks
//! the OpenAI chat-completions wire format over reqwest, which covers most
//! hosted and local endpoints.

pub mod json;
pub mod openai;
pub mod provider;

#[cfg(test)]
pub(crate) mod scripted;

pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::LlmSettings;

/// Create an LLM provider from settings.
pub fn create_provider(settings: &LlmSettings) -> Arc<dyn LlmProvider> {
    tracing::info!(model = %settings.model, base_url = %settings.base_url, "Using OpenAI-compatible provider");
    let per_token = Decimal::from(1_000_000);
    Arc::new(
        OpenAiProvider::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            settings.model.clone(),
        )
        .with_pricing(
            settings.input_cost_per_mtok / per_token,
            settings.output_cost_per_mtok / per_token,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_uses_configured_model() {
        let settings = LlmSettings {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: secrecy::SecretString::from("test-key"),
            model: "llama3.1".to_string(),
            input_cost_per_mtok: Decimal::ZERO,
            output_cost_per_mtok: Decimal::ZERO,
        };
        let provider = create_provider(&settings);
        assert_eq!(provider.model_name(), "llama3.1");
    }

    #[test]
    fn create_provider_converts_pricing_to_per_token() {
        let settings = LlmSettings {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: secrecy::SecretString::from("test-key"),
            model: "gpt-4o-mini".to_string(),
            input_cost_per_mtok: rust_decimal_macros::dec!(0.15),
            output_cost_per_mtok: rust_decimal_macros::dec!(0.60),
        };
        let provider = create_provider(&settings);
        assert_eq!(
            provider.cost_per_token(),
            (rust_decimal_macros::dec!(0.00000015), rust_decimal_macros::dec!(0.0000006))
        );
    }
}
