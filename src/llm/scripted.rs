//! Canned `LlmProvider` for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

pub(crate) enum Script {
    Reply(String),
    Fail,
    Hang,
}

/// Replays the same scripted outcome for every call and records requests.
pub(crate) struct ScriptedLlm {
    script: Script,
    calls: AtomicUsize,
    pub(crate) requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub(crate) fn replying(content: impl Into<String>) -> Self {
        Self::new(Script::Reply(content.into()))
    }

    pub(crate) fn failing() -> Self {
        Self::new(Script::Fail)
    }

    pub(crate) fn hanging() -> Self {
        Self::new(Script::Hang)
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// System prompt of the most recent request.
    pub(crate) fn last_system_prompt(&self) -> Option<String> {
        let requests = self.requests.lock().ok()?;
        requests.last().and_then(|r| r.messages.first()).map(|m| m.content.clone())
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        match &self.script {
            Script::Reply(content) => Ok(CompletionResponse {
                content: content.clone(),
                input_tokens: 120,
                output_tokens: 30,
                finish_reason: FinishReason::Stop,
                response_id: None,
            }),
            Script::Fail => Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "connection refused".to_string(),
            }),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::Timeout {
                    provider: "scripted".to_string(),
                    timeout: Duration::from_secs(3600),
                })
            }
        }
    }
}
