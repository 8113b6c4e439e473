//! The turn pipeline.
//!
//! Onboarding turns: pattern + model extraction, merge, step advance, reply.
//! Conversation turns: classify, then dispatch (never execute), apply a
//! profile edit, resume onboarding, or answer free-form. Execution only
//! happens through [`ChatPipeline::confirm`] after the human said yes.
//!
//! The pipeline holds no per-user state. Everything it needs comes in with
//! the request and nothing is committed on its own.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::types::{ResponseSource, TurnRequest, TurnResponse};
use crate::actions::{
    ActionExecutor, ActionRegistry, DispatchContext, DispatchResult, ExecutionOutcome, FieldValues,
};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::extraction::{ExtractionResult, ExtractionSource, ModelExtractor, extract_for_step};
use crate::intent::{Intent, IntentClassifier, IntentContext, IntentMatcher, Mode};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, recent_turns, response_cost};
use crate::onboarding::{
    Language, ProfileDraft, Step, advance, advance_message, clarification_prompt, question_for,
};
use crate::store::Store;

/// Sampling temperature for free-form replies.
const REPLY_TEMPERATURE: f32 = 0.7;

pub struct ChatPipeline {
    llm: Option<Arc<dyn LlmProvider>>,
    extractor: Option<ModelExtractor>,
    classifier: IntentClassifier,
    registry: Arc<ActionRegistry>,
    executor: ActionExecutor,
    timeout: Duration,
    reply_max_tokens: u32,
    history_turns: usize,
    history_turn_chars: usize,
}

impl ChatPipeline {
    /// Build a pipeline. Without a model every stage runs on its
    /// deterministic path.
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, store: Arc<dyn Store>, config: &PipelineConfig) -> Self {
        let registry = Arc::new(ActionRegistry::new());
        Self {
            extractor: llm.as_ref().map(|llm| ModelExtractor::new(llm.clone(), config)),
            classifier: IntentClassifier::new(IntentMatcher::default_rules(), registry.clone(), llm.clone(), config),
            registry,
            executor: ActionExecutor::new(store),
            llm,
            timeout: config.llm_timeout,
            reply_max_tokens: config.reply_max_tokens,
            history_turns: config.history_turns,
            history_turn_chars: config.history_turn_chars,
        }
    }

    /// Handle one user turn.
    ///
    /// Collaborator failures never surface here; an `Err` means a caller or
    /// registry bug.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse> {
        let mode = request.effective_mode();
        let today = request
            .time_context
            .map(|t| t.today)
            .unwrap_or_else(|| Local::now().date_naive());
        let span = info_span!("turn", step = %request.step, mode = %mode);

        async move {
            let response = if mode == Mode::Onboarding && !request.step.is_terminal() {
                self.onboarding_turn(&request, today).await
            } else {
                self.conversation_turn(&request, mode, today).await?
            };
            info!(
                next_step = %response.next_step,
                source = ?response.source,
                has_ui = response.ui_resource.is_some(),
                "Turn handled"
            );
            Ok(response)
        }
        .instrument(span)
        .await
    }

    /// Dispatch an action directly, e.g. when the caller submits a filled-in
    /// form. Unknown ids are an error.
    pub fn dispatch(
        &self,
        action_id: &str,
        candidate: &FieldValues,
        context_id: &str,
        profile: &ProfileDraft,
        today: NaiveDate,
    ) -> Result<DispatchResult> {
        let _span = info_span!("dispatch", action = action_id, context_id).entered();
        let ctx = DispatchContext { profile, today };
        Ok(self.registry.dispatch(action_id, candidate, context_id, &ctx)?)
    }

    /// Execute an action the human has confirmed.
    pub async fn confirm(&self, action_id: &str, data: &FieldValues, owner_id: &str) -> Result<ExecutionOutcome> {
        Ok(self.executor.execute(action_id, data, owner_id).await?)
    }

    // ── Onboarding ──────────────────────────────────────────────────

    async fn onboarding_turn(&self, request: &TurnRequest, today: NaiveDate) -> TurnResponse {
        let step = request.step;
        let draft = &request.context;

        let pattern = {
            let _span = info_span!("extract.pattern", step = %step).entered();
            extract_for_step(step, &request.message, draft, today)
        };

        let model = match &self.extractor {
            Some(extractor) if !request.message.trim().is_empty() => {
                extractor
                    .extract(step, &request.message, draft, &request.conversation_history, today)
                    .instrument(info_span!("extract.model", step = %step))
                    .await
            }
            _ => None,
        };

        let extraction = ExtractionResult::combine(model, pattern);
        let next_step = advance(step, extraction.has_data());
        let updated = draft.merged(&extraction.fields);

        let response = if next_step == step {
            debug!(step = %step, missing = ?extraction.missing_info, "Nothing complete for step, asking again");
            clarification_prompt(step, &updated)
        } else {
            advance_message(next_step, &updated)
        };

        TurnResponse {
            response,
            extracted_data: extraction.fields,
            next_step,
            intent: None,
            source: match extraction.source {
                ExtractionSource::Model => ResponseSource::Model,
                ExtractionSource::Fallback | ExtractionSource::None => ResponseSource::Fallback,
            },
            ui_resource: None,
        }
    }

    // ── Conversation ────────────────────────────────────────────────

    async fn conversation_turn(&self, request: &TurnRequest, mode: Mode, today: NaiveDate) -> Result<TurnResponse> {
        let step = request.step;
        let draft = &request.context;
        let ctx = IntentContext::new(mode, step, draft, today);

        let intent = self
            .classifier
            .classify(&request.message, &ctx, &request.conversation_history)
            .instrument(info_span!("classify", step = %step))
            .await;
        info!(
            mode = %intent.mode,
            action = ?intent.action,
            confidence = ?intent.confidence,
            matched_pattern = %intent.matched_pattern,
            "Classified turn"
        );

        let classified_by_model = intent.matched_pattern == "model";
        let mut response = TurnResponse {
            response: String::new(),
            extracted_data: ProfileDraft::default(),
            next_step: step,
            intent: None,
            source: if classified_by_model {
                ResponseSource::Model
            } else {
                ResponseSource::Fallback
            },
            ui_resource: None,
        };

        match (intent.mode, intent.action) {
            (Mode::Onboarding, _) => {
                response.response = question_for(step, draft);
            }
            (Mode::ProfileEdit, _) => {
                let (text, edited) = profile_edit(&intent, draft);
                response.response = text;
                response.extracted_data = edited;
            }
            (_, Some(action)) => {
                let context_id = request
                    .context_id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let result = self.dispatch(action.as_str(), &intent.fields, &context_id, draft, today)?;
                response.response = dispatch_message(&result, draft);
                response.ui_resource = Some(result.confirmation_resource);
            }
            (_, None) => {
                match self.reply(request, draft).await {
                    Some(text) => {
                        response.response = text;
                        response.source = ResponseSource::Model;
                    }
                    None => response.response = static_reply(draft),
                }
            }
        }

        response.intent = Some(intent);
        Ok(response)
    }

    /// Free-form answer from the model, `None` on any failure.
    async fn reply(&self, request: &TurnRequest, draft: &ProfileDraft) -> Option<String> {
        let llm = self.llm.as_ref()?;

        let mut messages = vec![ChatMessage::system(reply_prompt(draft))];
        messages.extend(recent_turns(
            &request.conversation_history,
            self.history_turns,
            self.history_turn_chars,
        ));
        messages.push(ChatMessage::user(request.message.as_str()));
        let completion = CompletionRequest::new(messages)
            .with_temperature(REPLY_TEMPERATURE)
            .with_max_tokens(self.reply_max_tokens);

        let result = tokio::time::timeout(self.timeout, llm.complete(completion))
            .instrument(info_span!("reply"))
            .await;
        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "Reply generation failed, using static reply");
                return None;
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Reply generation timed out, using static reply");
                return None;
            }
        };

        info!(
            model = llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost = %response_cost(llm.as_ref(), &response),
            "Reply generated"
        );

        let text = response.content.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

fn is_french(draft: &ProfileDraft) -> bool {
    draft.language == Some(Language::Fr)
}

/// Build the edited field as a partial draft plus an acknowledgement.
fn profile_edit(intent: &Intent, draft: &ProfileDraft) -> (String, ProfileDraft) {
    let mut edited = ProfileDraft::default();
    let applied = match (&intent.field, &intent.extracted_value) {
        (Some(field), Some(value)) => edited.set_field(field, value.clone()).then_some((field, value)),
        _ => None,
    };

    let Some((field, value)) = applied else {
        let text = if is_french(draft) {
            "Je n'ai pas compris quoi modifier. Tu peux dire par exemple « change ma ville en Lyon »."
        } else {
            "I couldn't tell what to change. Try something like \"change my city to Lyon\"."
        };
        return (text.to_string(), ProfileDraft::default());
    };

    let shown = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let label = field_label(field);
    let text = if is_french(draft) {
        format!("C'est noté, {label} : {shown}.")
    } else {
        format!("Done, your {label} is now {shown}.")
    };
    (text, edited)
}

fn field_label(field: &str) -> &str {
    match field {
        "maxWorkHoursWeekly" => "weekly hours",
        "minHourlyRate" => "minimum hourly rate",
        "field" => "field of study",
        other => other,
    }
}

fn dispatch_message(result: &DispatchResult, draft: &ProfileDraft) -> String {
    let fr = is_french(draft);
    if result.is_ready() {
        let summary = result.confirmation_resource.summary().unwrap_or_default();
        return if fr {
            format!("{summary} Je confirme ?")
        } else {
            format!("{summary} Shall I go ahead?")
        };
    }

    let labels: Vec<&str> = result
        .confirmation_resource
        .fields()
        .iter()
        .map(|f| f.spec.label.as_str())
        .collect();
    if fr {
        format!("D'accord. Il me manque : {}.", labels.join(", "))
    } else {
        format!("Sure. I just need: {}.", labels.join(", "))
    }
}

fn static_reply(draft: &ProfileDraft) -> String {
    let text = if is_french(draft) {
        "Je suis là pour ton budget. Tu peux me demander de mettre un abonnement en pause, de mettre à jour tes revenus ou de créer un objectif."
    } else {
        "I'm here to help with your budget. You can ask me to pause a subscription, update your income, or create a savings goal."
    };
    text.to_string()
}

fn reply_prompt(draft: &ProfileDraft) -> String {
    let language = if is_french(draft) { "French" } else { "English" };
    format!(
        r#"You are a friendly budgeting coach for students. Answer in {language}, in at most three short sentences.
Never claim to have changed anything: changes always go through a confirmation step.

What you know about the user (JSON):
{profile}"#,
        profile = draft.to_json(),
    )
}
