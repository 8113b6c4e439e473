//! End-to-end tests for the turn pipeline with stubbed collaborators.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use coach_pipeline::actions::{DispatchStatus, FieldValues};
use coach_pipeline::error::LlmError;
use coach_pipeline::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use coach_pipeline::onboarding::{ProfileDraft, Step};
use coach_pipeline::store::{MemoryStore, Store, Subscription};
use coach_pipeline::{ChatPipeline, PipelineConfig, ResponseSource, TurnRequest};

/// Stub LLM provider: replays queued answers, repeating the last one, or
/// fails every call when the queue is empty.
struct StubLlm {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl StubLlm {
    fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Self::replying(&[])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        let content = match replies.len() {
            0 => {
                return Err(LlmError::RequestFailed {
                    provider: "stub".to_string(),
                    reason: "unreachable".to_string(),
                });
            }
            1 => replies[0].clone(),
            _ => replies.pop_front().unwrap(),
        };
        Ok(CompletionResponse {
            content,
            input_tokens: 10,
            output_tokens: 5,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn pipeline_with(llm: Option<Arc<StubLlm>>, store: Arc<MemoryStore>) -> ChatPipeline {
    ChatPipeline::new(
        llm.map(|l| l as Arc<dyn LlmProvider>),
        store,
        &PipelineConfig::default(),
    )
}

fn pipeline(llm: Option<Arc<StubLlm>>) -> ChatPipeline {
    pipeline_with(llm, Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn budget_sentence_at_location_advances() {
    for llm in [None, Some(StubLlm::failing())] {
        let response = pipeline(llm)
            .handle_turn(TurnRequest::new("I earn 800 and spend 600", Step::Location).with_today(today()))
            .await
            .unwrap();
        assert_eq!(response.extracted_data.income, Some(dec!(800)));
        assert_eq!(response.extracted_data.expenses, Some(dec!(600)));
        assert_eq!(response.next_step, Step::Budget);
        assert_eq!(response.source, ResponseSource::Fallback);
    }
}

#[tokio::test]
async fn space_separated_budget_keeps_both_figures() {
    let response = pipeline(None)
        .handle_turn(TurnRequest::new("800 600", Step::Budget).with_today(today()))
        .await
        .unwrap();
    assert_eq!(response.extracted_data.income, Some(dec!(800)));
    assert_eq!(response.extracted_data.expenses, Some(dec!(600)));
    assert_eq!(response.next_step, Step::WorkPreferences);
}

#[tokio::test]
async fn pause_without_duration_is_missing_info() {
    let fields: FieldValues = [("resourceName".to_string(), json!("Netflix"))].into();
    let result = pipeline(None)
        .dispatch("pause_subscription", &fields, "ctx-1", &ProfileDraft::default(), today())
        .unwrap();
    assert_eq!(result.status, DispatchStatus::MissingInfo);
    assert_eq!(result.missing_fields, vec!["durationMonths".to_string()]);
    assert!(!result.confirmation_resource.is_confirmation());
}

#[tokio::test]
async fn confirmed_pause_reports_savings() {
    let store = Arc::new(MemoryStore::new());
    store
        .save_subscription(&Subscription::new("alice", "Netflix", dec!(12.5)))
        .await
        .unwrap();
    let pipeline = pipeline_with(None, store.clone());

    let fields: FieldValues = [
        ("resourceName".to_string(), json!("Netflix")),
        ("durationMonths".to_string(), json!(2)),
    ]
    .into();
    let result = pipeline
        .dispatch("pause_subscription", &fields, "ctx-2", &ProfileDraft::default(), today())
        .unwrap();
    assert!(result.is_ready());

    let outcome = pipeline
        .confirm("pause_subscription", &result.confirmation_resource.values(), "alice")
        .await
        .unwrap();
    assert!(outcome.success);
    assert!(outcome.message.contains("Netflix"));
    assert!(outcome.message.contains("25"));
}

#[tokio::test]
async fn none_answer_is_an_empty_list() {
    let response = pipeline(Some(StubLlm::failing()))
        .handle_turn(TurnRequest::new("none", Step::AcademicEvents).with_today(today()))
        .await
        .unwrap();
    assert_eq!(response.extracted_data.academic_events, Some(vec![]));
    assert_eq!(response.next_step, Step::Inventory);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["extractedData"]["academicEvents"], json!([]));
}

#[tokio::test]
async fn unknown_action_is_an_error() {
    let result = pipeline(None).dispatch(
        "book_flight",
        &FieldValues::new(),
        "ctx-3",
        &ProfileDraft::default(),
        today(),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn unintelligible_messages_never_advance() {
    let pipeline = pipeline(Some(StubLlm::replying(&["{}"])));
    for step in Step::ALL.into_iter().filter(|s| !s.is_terminal()) {
        for message in ["", "?!", "..."] {
            let response = pipeline
                .handle_turn(TurnRequest::new(message, step).with_today(today()))
                .await
                .unwrap();
            assert!(response.extracted_data.is_empty(), "{step} {message:?}");
            assert_eq!(response.next_step, step, "{step} {message:?}");
            assert!(!response.response.is_empty());
        }
    }
}

#[tokio::test]
async fn advancing_never_skips_a_step() {
    let pipeline = pipeline(None);
    for step in Step::ALL.into_iter().filter(|s| !s.is_terminal()) {
        for message in ["hello", "none", "I'm Alice", "Lyon", "I earn 800 and spend 600", "laptop 1200€ by june"] {
            let response = pipeline
                .handle_turn(TurnRequest::new(message, step).with_today(today()))
                .await
                .unwrap();
            assert!(
                response.next_step == step || response.next_step == step.next(),
                "{step} {message:?} -> {}",
                response.next_step
            );
        }
    }
}

#[tokio::test]
async fn low_confidence_model_intent_is_plain_conversation() {
    let llm = StubLlm::replying(&[
        r#"{"action":"cancel_subscription","confidence":0.5}"#,
        "Streaming adds up quickly, it's worth reviewing.",
    ]);
    let response = pipeline(Some(llm.clone()))
        .handle_turn(TurnRequest::new("streaming is so pricey lately", Step::Complete).with_today(today()))
        .await
        .unwrap();
    let intent = response.intent.unwrap();
    assert!(intent.action.is_none());
    assert!(intent.is_fallback());
    assert!(response.ui_resource.is_none());
    assert_eq!(response.response, "Streaming adds up quickly, it's worth reviewing.");
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn confident_model_intent_is_dispatched() {
    let llm = StubLlm::replying(&[r#"{"action":"sell_item","confidence":0.92,"fields":{"itemName":"guitar"}}"#]);
    let response = pipeline(Some(llm))
        .handle_turn(
            TurnRequest::new("my guitar is just gathering dust", Step::Complete)
                .with_today(today())
                .with_context_id("ctx-4"),
        )
        .await
        .unwrap();
    assert_eq!(response.source, ResponseSource::Model);
    let resource = response.ui_resource.unwrap();
    assert_eq!(resource.action_id().as_str(), "sell_item");
    assert!(!resource.is_confirmation());
}

#[tokio::test]
async fn dispatch_is_deterministic() {
    let pipeline = pipeline(None);
    let draft = ProfileDraft {
        subscriptions: Some(vec!["Spotify".into()]),
        ..Default::default()
    };
    let fields: FieldValues = [("name".to_string(), json!("Deezer"))].into();
    let first = pipeline
        .dispatch("add_subscription", &fields, "ctx-5", &draft, today())
        .unwrap();
    let second = pipeline
        .dispatch("add_subscription", &fields, "ctx-5", &draft, today())
        .unwrap();
    assert_eq!(first.status, second.status);
    assert_eq!(first.missing_fields, second.missing_fields);
    assert_eq!(first.missing_fields, vec!["monthlyCost".to_string()]);
}

#[tokio::test]
async fn total_collaborator_failure_still_answers() {
    let llm = StubLlm::failing();
    let pipeline = pipeline(Some(llm.clone()));

    let response = pipeline
        .handle_turn(TurnRequest::new("hmm, not sure", Step::Complete).with_today(today()))
        .await
        .unwrap();
    assert!(!response.response.is_empty());
    assert_eq!(response.source, ResponseSource::Fallback);
    assert!(response.intent.unwrap().is_fallback());

    let response = pipeline
        .handle_turn(TurnRequest::new("blorp", Step::Skills).with_today(today()))
        .await
        .unwrap();
    assert!(!response.response.is_empty());
    assert!(llm.calls() >= 3);
}
