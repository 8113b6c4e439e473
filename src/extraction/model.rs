//! Model-based extraction: a step-aware JSON prompt to the LLM, then a
//! sanitizer that keeps only values that fit the draft.
//!
//! Every failure (transport, timeout, non-JSON, wrong shape) is "no result".
//! The caller falls back to pattern extraction; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::LlmError;
use crate::extraction::deadline::normalize_deadline;
use crate::extraction::lists::clean_value;
use crate::extraction::numbers::parse_amount;
use crate::llm::json::parse_json_object;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider, recent_turns, response_cost};
use crate::onboarding::{ProfileDraft, Step};

/// Sampling temperature for extraction (deterministic).
const EXTRACTION_TEMPERATURE: f32 = 0.0;

/// Fields trimmed and stripped of trailing punctuation.
const NAME_LIKE_FIELDS: &[&str] = &["name", "city", "goalName", "diploma", "field", "region"];

/// Fields that hold money or counts.
const NUMERIC_FIELDS: &[&str] = &[
    "income",
    "expenses",
    "minHourlyRate",
    "goalAmount",
    "maxWorkHoursWeekly",
    "energyLevel",
];

/// Integer-valued fields.
const INTEGER_FIELDS: &[&str] = &["maxWorkHoursWeekly", "energyLevel"];

/// Keys that carry a deadline and are normalized to `goalDeadline`.
const DEADLINE_FIELDS: &[&str] = &["goalDeadline", "deadline"];

/// LLM-backed extractor.
pub struct ModelExtractor {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
    max_tokens: u32,
    history_turns: usize,
    history_turn_chars: usize,
}

impl ModelExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self {
            llm,
            timeout: config.llm_timeout,
            max_tokens: config.extraction_max_tokens,
            history_turns: config.history_turns,
            history_turn_chars: config.history_turn_chars,
        }
    }

    /// Ask the model for this step's fields.
    ///
    /// `None` on any failure. `Some` may still be an empty draft when the
    /// model answered with nothing usable.
    pub async fn extract(
        &self,
        step: Step,
        message: &str,
        draft: &ProfileDraft,
        history: &[ChatMessage],
        today: NaiveDate,
    ) -> Option<ProfileDraft> {
        let mut messages = vec![ChatMessage::system(build_extraction_prompt(step, draft, today))];
        messages.extend(recent_turns(history, self.history_turns, self.history_turn_chars));
        messages.push(ChatMessage::user(message));

        let request = CompletionRequest::new(messages)
            .with_temperature(EXTRACTION_TEMPERATURE)
            .with_max_tokens(self.max_tokens)
            .with_json_mode(true);

        let response = match tokio::time::timeout(self.timeout, self.llm.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(step = %step, error = %e, "Model extraction failed, using patterns");
                return None;
            }
            Err(_) => {
                let e = LlmError::Timeout {
                    provider: self.llm.model_name().to_string(),
                    timeout: self.timeout,
                };
                warn!(step = %step, error = %e, "Model extraction timed out, using patterns");
                return None;
            }
        };

        info!(
            step = %step,
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost = %response_cost(self.llm.as_ref(), &response),
            "Model extraction complete"
        );

        let Some(raw) = parse_json_object(&response.content) else {
            warn!(
                step = %step,
                raw_response = %response.content.chars().take(200).collect::<String>(),
                "Model extraction returned no JSON object"
            );
            return None;
        };

        Some(sanitize(raw, today))
    }
}

/// Keep only usable values from the model's JSON object.
///
/// Drops nulls and empty strings, keeps empty arrays, cleans name-like
/// strings, coerces numeric strings, and normalizes deadlines to ISO dates
/// (dropping any that can't be read). Each key is validated on its own.
pub fn sanitize(raw: Map<String, Value>, today: NaiveDate) -> ProfileDraft {
    let mut cleaned = Map::new();

    for (key, value) in raw {
        let Some(value) = sanitize_value(&key, value) else {
            continue;
        };

        if DEADLINE_FIELDS.contains(&key.as_str()) {
            let text = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            match normalize_deadline(&text, today) {
                Some(date) => {
                    cleaned.insert("goalDeadline".to_string(), Value::String(date.to_string()));
                }
                None => warn!(key = %key, value = %text, "Could not normalize deadline, dropping"),
            }
            continue;
        }

        let value = if NUMERIC_FIELDS.contains(&key.as_str()) {
            match coerce_number(&key, value) {
                Some(v) => v,
                None => {
                    debug!(key = %key, "Dropping non-numeric value");
                    continue;
                }
            }
        } else {
            match key.as_str() {
                "currency" => normalize_currency(value),
                "language" => normalize_language(value),
                _ => value,
            }
        };

        cleaned.insert(key, value);
    }

    let (mut draft, rejected) = ProfileDraft::from_json_fields(&cleaned);
    if !rejected.is_empty() {
        debug!(rejected = ?rejected, "Model returned values of the wrong type");
    }
    draft.bound_extra();
    draft
}

fn sanitize_value(key: &str, value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = if NAME_LIKE_FIELDS.contains(&key) {
                clean_value(&s)
            } else {
                s.trim().to_string()
            };
            (!s.is_empty()).then_some(Value::String(s))
        }
        Value::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => {
                        let s = clean_value(&s);
                        (!s.is_empty()).then_some(Value::String(s))
                    }
                    Value::Null => None,
                    other => Some(other),
                })
                .collect(),
        )),
        other => Some(other),
    }
}

fn coerce_number(key: &str, value: Value) -> Option<Value> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let amount = parse_amount(&s)?;
            amount.to_string().parse::<f64>().ok()?
        }
        _ => return None,
    };
    if number < 0.0 || !number.is_finite() {
        return None;
    }
    if INTEGER_FIELDS.contains(&key) {
        return Some(Value::from(number.round() as u64));
    }
    if number.fract() == 0.0 {
        Some(Value::from(number as u64))
    } else {
        serde_json::Number::from_f64(number).map(Value::Number)
    }
}

fn normalize_currency(value: Value) -> Value {
    match value.as_str() {
        Some(raw) => {
            let code = match raw.trim() {
                "€" => "EUR".to_string(),
                "£" => "GBP".to_string(),
                "$" => "USD".to_string(),
                other => other.to_uppercase(),
            };
            Value::String(code)
        }
        None => value,
    }
}

fn normalize_language(value: Value) -> Value {
    match value.as_str().map(|s| s.trim().to_lowercase()) {
        Some(lang) => {
            let code = match lang.as_str() {
                "english" | "anglais" => "en",
                "french" | "français" | "francais" => "fr",
                other => return Value::String(other.to_string()),
            };
            Value::String(code.to_string())
        }
        None => value,
    }
}

fn field_hint(key: &str) -> &'static str {
    match key {
        "language" => "\"en\" or \"fr\"",
        "region" => "\"france\", \"uk\", \"us\" or \"europe\"",
        "currency" => "\"EUR\", \"GBP\" or \"USD\"",
        "name" => "first name (string)",
        "diploma" => "degree level, e.g. \"Master\" (string)",
        "field" => "field of study (string)",
        "skills" | "certifications" => "list of strings, [] if none",
        "city" => "city name (string)",
        "income" | "expenses" => "monthly amount (number)",
        "maxWorkHoursWeekly" => "hours per week (integer)",
        "minHourlyRate" => "hourly rate (number)",
        "goalName" => "what they save for (string)",
        "goalAmount" => "target amount (number)",
        "goalDeadline" => "date as YYYY-MM-DD, or the user's phrase",
        _ => "list of strings, [] if none",
    }
}

/// System prompt for one extraction call.
fn build_extraction_prompt(step: Step, draft: &ProfileDraft, today: NaiveDate) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(
        "You extract profile data from a student's answer during budget-coach onboarding.\n\
         Respond with ONLY a JSON object. Include only fields the user actually stated.\n\
         Use [] for an explicit \"none\" answer to a list question. Never invent values.\n\n",
    );
    prompt.push_str(&format!("Today: {today}\nCurrent step: {step}\n\nFields to collect:\n"));
    for key in step.fields() {
        prompt.push_str(&format!("- {key}: {}\n", field_hint(key)));
    }
    prompt.push_str(
        "\nIf the user volunteers data for other fields (income, expenses, city...), \
         include it under its field name.\n",
    );

    let collected = draft.to_json();
    if collected.as_object().is_some_and(|m| !m.is_empty()) {
        prompt.push_str(&format!("\nAlready collected:\n{collected}\n"));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedLlm;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn extractor(llm: Arc<ScriptedLlm>, timeout: Duration) -> ModelExtractor {
        let config = PipelineConfig {
            llm_timeout: timeout,
            ..PipelineConfig::default()
        };
        ModelExtractor::new(llm, &config)
    }

    #[test]
    fn sanitize_drops_empty_and_keeps_empty_arrays() {
        let raw = json!({
            "name": "  Alice. ",
            "city": "",
            "diploma": null,
            "academicEvents": [],
            "skills": [" Python ", ""]
        });
        let draft = sanitize(raw.as_object().unwrap().clone(), today());
        assert_eq!(draft.name.as_deref(), Some("Alice"));
        assert!(draft.city.is_none());
        assert!(draft.diploma.is_none());
        assert_eq!(draft.academic_events, Some(vec![]));
        assert_eq!(draft.skills, Some(vec!["Python".to_string()]));
    }

    #[test]
    fn sanitize_coerces_numbers_and_currency() {
        let raw = json!({
            "income": "800€",
            "expenses": 612.5,
            "maxWorkHoursWeekly": 15.0,
            "goalAmount": "lots",
            "currency": "eur"
        });
        let draft = sanitize(raw.as_object().unwrap().clone(), today());
        assert_eq!(draft.income, Some(dec!(800)));
        assert_eq!(draft.expenses, Some(dec!(612.5)));
        assert_eq!(draft.max_work_hours_weekly, Some(15));
        assert!(draft.goal_amount.is_none());
        assert_eq!(draft.currency, Some(crate::onboarding::Currency::Eur));
    }

    #[test]
    fn sanitize_normalizes_or_drops_deadlines() {
        let raw = json!({"goalDeadline": "in 6 months"});
        let draft = sanitize(raw.as_object().unwrap().clone(), today());
        assert_eq!(draft.goal_deadline, NaiveDate::from_ymd_opt(2027, 4, 19));

        let raw = json!({"deadline": "juin"});
        let draft = sanitize(raw.as_object().unwrap().clone(), today());
        assert_eq!(draft.goal_deadline, NaiveDate::from_ymd_opt(2027, 6, 30));

        let raw = json!({"goalDeadline": "whenever"});
        let draft = sanitize(raw.as_object().unwrap().clone(), today());
        assert!(draft.goal_deadline.is_none());
        assert!(draft.is_empty());
    }

    #[test]
    fn sanitize_rejects_wrong_types_without_losing_the_rest() {
        let raw = json!({"city": "Lyon", "skills": "python", "language": "French"});
        let draft = sanitize(raw.as_object().unwrap().clone(), today());
        assert_eq!(draft.city.as_deref(), Some("Lyon"));
        assert!(draft.skills.is_none());
        assert_eq!(draft.language, Some(crate::onboarding::Language::Fr));
    }

    #[tokio::test]
    async fn extract_parses_model_json() {
        let llm = Arc::new(ScriptedLlm::replying(r#"```json
{"city": "Lyon", "income": 800}
```"#));
        let result = extractor(llm.clone(), Duration::from_secs(5))
            .extract(Step::Location, "Lyon, and I earn 800", &ProfileDraft::default(), &[], today())
            .await
            .unwrap();
        assert_eq!(result.city.as_deref(), Some("Lyon"));
        assert_eq!(result.income, Some(dec!(800)));

        let prompt = llm.last_system_prompt().unwrap();
        assert!(prompt.contains("Current step: location"));
        assert!(prompt.contains("- city:"));
        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].json_mode);
        assert_eq!(requests[0].temperature, Some(0.0));
    }

    #[tokio::test]
    async fn extract_includes_bounded_history() {
        let llm = Arc::new(ScriptedLlm::replying("{}"));
        let history: Vec<ChatMessage> = (0..10).map(|i| ChatMessage::user(format!("turn {i}"))).collect();
        extractor(llm.clone(), Duration::from_secs(5))
            .extract(Step::Name, "Alice", &ProfileDraft::default(), &history, today())
            .await;
        let requests = llm.requests.lock().unwrap();
        // system + 6 history turns + the message
        assert_eq!(requests[0].messages.len(), 8);
    }

    #[tokio::test]
    async fn extract_failures_are_no_result() {
        let failing = Arc::new(ScriptedLlm::failing());
        assert!(
            extractor(failing, Duration::from_secs(5))
                .extract(Step::Name, "Alice", &ProfileDraft::default(), &[], today())
                .await
                .is_none()
        );

        let prose = Arc::new(ScriptedLlm::replying("Sure, the name is Alice."));
        assert!(
            extractor(prose, Duration::from_secs(5))
                .extract(Step::Name, "Alice", &ProfileDraft::default(), &[], today())
                .await
                .is_none()
        );

        let hanging = Arc::new(ScriptedLlm::hanging());
        assert!(
            extractor(hanging, Duration::from_millis(20))
                .extract(Step::Name, "Alice", &ProfileDraft::default(), &[], today())
                .await
                .is_none()
        );
    }
}
