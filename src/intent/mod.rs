//! Intent classification for conversational turns.
//!
//! Deterministic rules run first ([`IntentMatcher`]); the model classifier is
//! only consulted on a miss and is gated by a confidence floor.

pub mod classifier;
pub mod patterns;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{ActionId, FieldValues};
use crate::onboarding::{ProfileDraft, Step};

pub use classifier::IntentClassifier;
pub use patterns::IntentMatcher;

/// Confidence attached to the generic fallback intent.
pub const FALLBACK_CONFIDENCE: f32 = 0.3;

/// Dialogue mode of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Onboarding,
    Conversation,
    ProfileEdit,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onboarding => write!(f, "onboarding"),
            Self::Conversation => write!(f, "conversation"),
            Self::ProfileEdit => write!(f, "profile-edit"),
        }
    }
}

/// What the user wants from a conversational turn. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionId>,
    /// Profile field targeted by a profile edit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_value: Option<Value>,
    /// Candidate action fields read from the message.
    #[serde(skip_serializing_if = "FieldValues::is_empty")]
    pub fields: FieldValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub matched_pattern: String,
}

impl Intent {
    /// Generic conversation at low confidence, used whenever nothing better
    /// is known.
    pub fn fallback() -> Self {
        Self::conversation(FALLBACK_CONFIDENCE, "fallback")
    }

    pub fn conversation(confidence: f32, matched_pattern: impl Into<String>) -> Self {
        Self {
            mode: Mode::Conversation,
            action: None,
            field: None,
            extracted_value: None,
            fields: FieldValues::new(),
            confidence: Some(confidence),
            matched_pattern: matched_pattern.into(),
        }
    }

    pub fn action(
        action: ActionId,
        fields: FieldValues,
        confidence: f32,
        matched_pattern: impl Into<String>,
    ) -> Self {
        Self {
            action: Some(action),
            fields,
            ..Self::conversation(confidence, matched_pattern)
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.mode == Mode::Conversation && self.action.is_none() && self.matched_pattern == "fallback"
    }
}

/// What the classifier knows about the conversation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentContext {
    pub mode: Mode,
    pub step: Step,
    pub has_goal: bool,
    pub has_budget: bool,
    pub has_energy: bool,
    pub today: NaiveDate,
}

impl IntentContext {
    pub fn new(mode: Mode, step: Step, draft: &ProfileDraft, today: NaiveDate) -> Self {
        Self {
            mode,
            step,
            has_goal: draft.has_goal(),
            has_budget: draft.has_budget(),
            has_energy: draft.has_energy(),
            today,
        }
    }

    /// Whether onboarding is still in progress.
    pub fn in_onboarding(&self) -> bool {
        self.mode == Mode::Onboarding || !self.step.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_serializes_kebab_case() {
        assert_eq!(serde_json::to_value(Mode::ProfileEdit).unwrap(), "profile-edit");
        let mode: Mode = serde_json::from_str("\"conversation\"").unwrap();
        assert_eq!(mode, Mode::Conversation);
    }

    #[test]
    fn fallback_is_low_confidence_conversation() {
        let intent = Intent::fallback();
        assert!(intent.is_fallback());
        assert_eq!(intent.confidence, Some(FALLBACK_CONFIDENCE));
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["matchedPattern"], "fallback");
        assert!(json.get("action").is_none());
    }
}
