//! Two-tier intent classifier.
//!
//! Rules first. On a miss, a constrained model call: the answer must name an
//! action from the registry (or `conversation`) with a confidence in [0, 1],
//! and anything under the configured floor is discarded. Every failure ends
//! in the generic low-confidence conversation intent.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{Intent, IntentContext, IntentMatcher};
use crate::actions::{ActionRegistry, FieldValues};
use crate::config::PipelineConfig;
use crate::error::LlmError;
use crate::llm::json::parse_json_object;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider, recent_turns, response_cost};

const CONVERSATION: &str = "conversation";

/// Raw classifier answer, before validation.
#[derive(Debug, Deserialize)]
struct ModelClassification {
    action: String,
    confidence: f32,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    fields: Map<String, Value>,
}

pub struct IntentClassifier {
    matcher: IntentMatcher,
    registry: Arc<ActionRegistry>,
    llm: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
    max_tokens: u32,
    min_confidence: f32,
    history_turns: usize,
    history_turn_chars: usize,
}

impl IntentClassifier {
    pub fn new(
        matcher: IntentMatcher,
        registry: Arc<ActionRegistry>,
        llm: Option<Arc<dyn LlmProvider>>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            matcher,
            registry,
            llm,
            timeout: config.llm_timeout,
            max_tokens: config.classifier_max_tokens,
            min_confidence: config.min_intent_confidence,
            history_turns: config.history_turns,
            history_turn_chars: config.history_turn_chars,
        }
    }

    /// Classify a conversational message. Never fails.
    pub async fn classify(&self, message: &str, ctx: &IntentContext, history: &[ChatMessage]) -> Intent {
        if let Some(intent) = self.matcher.evaluate(message, ctx) {
            return intent;
        }

        let Some(llm) = &self.llm else {
            debug!("No rule matched and no model configured, using fallback intent");
            return Intent::fallback();
        };

        match self.classify_with_model(llm.as_ref(), message, ctx, history).await {
            Some(intent) => intent,
            None => Intent::fallback(),
        }
    }

    async fn classify_with_model(
        &self,
        llm: &dyn LlmProvider,
        message: &str,
        ctx: &IntentContext,
        history: &[ChatMessage],
    ) -> Option<Intent> {
        let mut messages = vec![ChatMessage::system(self.build_prompt(ctx))];
        messages.extend(recent_turns(history, self.history_turns, self.history_turn_chars));
        messages.push(ChatMessage::user(message));

        let request = CompletionRequest::new(messages)
            .with_temperature(0.0)
            .with_max_tokens(self.max_tokens)
            .with_json_mode(true);

        let response = match tokio::time::timeout(self.timeout, llm.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "Intent classification failed");
                return None;
            }
            Err(_) => {
                let e = LlmError::Timeout {
                    provider: llm.model_name().to_string(),
                    timeout: self.timeout,
                };
                warn!(error = %e, "Intent classification timed out");
                return None;
            }
        };

        info!(
            model = llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost = %response_cost(llm, &response),
            "Intent classification complete"
        );

        let raw = parse_json_object(&response.content)?;
        let parsed: ModelClassification = match serde_json::from_value(Value::Object(raw)) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Classifier answer has the wrong shape");
                return None;
            }
        };
        self.validate(parsed)
    }

    /// Apply the vocabulary and confidence checks.
    fn validate(&self, parsed: ModelClassification) -> Option<Intent> {
        if !parsed.confidence.is_finite() || !(0.0..=1.0).contains(&parsed.confidence) {
            warn!(confidence = parsed.confidence, "Classifier confidence out of range");
            return None;
        }
        if parsed.confidence < self.min_confidence {
            debug!(
                action = %parsed.action,
                confidence = parsed.confidence,
                floor = self.min_confidence,
                "Classification below confidence floor, discarded"
            );
            return None;
        }
        if let Some(reasoning) = &parsed.reasoning {
            debug!(action = %parsed.action, reasoning = %reasoning, "Classifier reasoning");
        }

        let action = parsed.action.trim();
        if action == CONVERSATION {
            return Some(Intent::conversation(parsed.confidence, "model"));
        }

        let definition = match self.registry.lookup(action) {
            Ok(definition) => definition,
            Err(e) => {
                warn!(error = %e, "Classifier named an action outside the vocabulary");
                return None;
            }
        };

        let fields: FieldValues = parsed
            .fields
            .into_iter()
            .filter(|(name, value)| !value.is_null() && definition.fields.iter().any(|f| &f.name == name))
            .collect();

        Some(Intent::action(definition.id, fields, parsed.confidence, "model"))
    }

    fn build_prompt(&self, ctx: &IntentContext) -> String {
        let actions: Vec<String> = self
            .registry
            .definitions()
            .iter()
            .map(|d| {
                let fields: Vec<&str> = d.fields.iter().map(|f| f.name.as_str()).collect();
                format!("- {}: {} (fields: {})", d.id, d.description, fields.join(", "))
            })
            .collect();

        format!(
            r#"You classify messages sent to a student budgeting coach.

Choose exactly one action from this list, or "{CONVERSATION}" when the user is just talking:
{actions}

Valid answers: {valid}

Context:
- mode: {mode}
- onboarding step: {step}
- has_goal: {has_goal}
- has_budget: {has_budget}
- has_energy: {has_energy}
- today: {today}

Words like "continue" or "next" refer to the onboarding flow when it is unfinished.

Respond with a JSON object only:
{{"action": "<action id or {CONVERSATION}>", "confidence": <0.0-1.0>, "reasoning": "<short>", "fields": {{<field name>: <value>}}}}
Only include fields stated in the message."#,
            actions = actions.join("\n"),
            valid = vocabulary(&self.registry).join(", "),
            mode = ctx.mode,
            step = ctx.step,
            has_goal = ctx.has_goal,
            has_budget = ctx.has_budget,
            has_energy = ctx.has_energy,
            today = ctx.today,
        )
    }
}

/// Action ids the classifier may answer with, plus `conversation`.
pub fn vocabulary(registry: &ActionRegistry) -> Vec<String> {
    registry
        .definitions()
        .iter()
        .map(|d| d.id.to_string())
        .chain(std::iter::once(CONVERSATION.to_string()))
        .collect()
}
