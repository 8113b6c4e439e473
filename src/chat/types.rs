//! Turn request/response shapes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::actions::UiResource;
use crate::intent::{Intent, Mode};
use crate::llm::ChatMessage;
use crate::onboarding::{ProfileDraft, Step};

/// Caller-supplied clock for the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeContext {
    pub today: NaiveDate,
}

/// One incoming user turn. The draft and history are owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub message: String,
    /// Stage this message answers. Unknown values read as `complete`.
    pub step: Step,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub context: ProfileDraft,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_context: Option<TimeContext>,
    /// Correlates a dispatched form with the caller's UI. Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>, step: Step) -> Self {
        Self {
            message: message.into(),
            step,
            mode: None,
            context: ProfileDraft::default(),
            conversation_history: Vec::new(),
            time_context: None,
            context_id: None,
        }
    }

    pub fn with_context(mut self, context: ProfileDraft) -> Self {
        self.context = context;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.time_context = Some(TimeContext { today });
        self
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    /// Explicit mode, or onboarding until the flow is complete.
    pub fn effective_mode(&self) -> Mode {
        self.mode.unwrap_or(if self.step.is_terminal() {
            Mode::Conversation
        } else {
            Mode::Onboarding
        })
    }
}

/// Whether a model answer shaped the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Model,
    Fallback,
}

/// Result of one turn. Always carries a usable `response`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub response: String,
    /// Fields read from this turn only. Merging into the draft is up to the caller.
    pub extracted_data: ProfileDraft,
    pub next_step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub source: ResponseSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_resource: Option<UiResource>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_reads_camel_case_and_lenient_step() {
        let request: TurnRequest = serde_json::from_value(json!({
            "message": "none",
            "step": "academic_events",
            "context": { "name": "Alice" },
            "conversationHistory": [{ "role": "assistant", "content": "Any exams?" }],
            "timeContext": { "today": "2026-10-19" }
        }))
        .unwrap();
        assert_eq!(request.step, Step::AcademicEvents);
        assert_eq!(request.context.name.as_deref(), Some("Alice"));
        assert_eq!(request.conversation_history.len(), 1);
        assert_eq!(request.effective_mode(), Mode::Onboarding);

        let request: TurnRequest = serde_json::from_value(json!({ "message": "hi", "step": "dashboard" })).unwrap();
        assert_eq!(request.step, Step::Complete);
        assert_eq!(request.effective_mode(), Mode::Conversation);
    }

    #[test]
    fn response_serializes_camel_case() {
        let response = TurnResponse {
            response: "ok".into(),
            extracted_data: ProfileDraft::default(),
            next_step: Step::Budget,
            intent: None,
            source: ResponseSource::Fallback,
            ui_resource: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["nextStep"], "budget");
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["extractedData"], json!({}));
        assert!(json.get("uiResource").is_none());
    }
}
