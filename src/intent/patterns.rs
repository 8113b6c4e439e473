//! Deterministic intent rules, evaluated before any model call.
//!
//! Each rule is a compiled regex with a target:
//! - "continue"/"next" while onboarding is unfinished → resume onboarding
//! - "change my city to Lyon" style edits → profile edit
//! - action phrasings ("pause Netflix for 3 months") → action intent, with
//!   candidate fields read from named capture groups
//!
//! If a rule matches, the model classifier is skipped entirely.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use tracing::debug;

use super::{Intent, IntentContext, Mode};
use crate::actions::{ActionId, FieldValues, registry::number_value};
use crate::extraction::deadline::{NUMBER_WORDS, number_word};
use crate::extraction::lists::clean_value;
use crate::extraction::numbers::{find_numbers, parse_amount};
use crate::extraction::patterns::{canonical_service, title_case};
use crate::extraction::extract_for_step;
use crate::onboarding::{ProfileDraft, Step};

/// Confidence reported for rule matches.
pub const PATTERN_CONFIDENCE: f32 = 1.0;

/// Words that name no particular target ("pause my subscription").
const GENERIC_TARGETS: &[&str] = &[
    "subscription", "subscriptions", "membership", "it", "that", "this", "something", "one",
    "them", "abonnement", "ça", "ca", "stuff", "things", "everything",
];

static LEADING_DETERMINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:my|the|a|an|mon|ma|mes|le|la|les|un|une)\s+|l['’]\s*)").expect("determiner regex")
});

/// What a rule produces when it matches.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleTarget {
    /// Go back to the onboarding question.
    Resume,
    /// Profile edit. `None` reads the field from a `field` capture group.
    ProfileEdit { field: Option<&'static str> },
    Action(ActionId),
}

/// How an action rule reads candidate fields.
#[derive(Debug, Clone)]
pub enum FieldReader {
    /// Every named capture group becomes a field of the same name.
    Captures(Regex),
    /// Goal name, amount and deadline through the onboarding goal strategy.
    Goal,
}

/// A single intent rule with a compiled regex.
#[derive(Debug, Clone)]
pub struct IntentRule {
    /// Rule name, reported as the intent's `matched_pattern`.
    pub name: String,
    pub regex: Regex,
    pub target: RuleTarget,
    pub readers: Vec<FieldReader>,
}

/// Pre-model intent matcher.
pub struct IntentMatcher {
    rules: Vec<IntentRule>,
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::default_rules()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("intent rule regex")
}

fn rule(name: &str, pattern: &str, target: RuleTarget, readers: Vec<FieldReader>) -> IntentRule {
    IntentRule {
        name: name.to_string(),
        regex: compile(pattern),
        target,
        readers,
    }
}

fn captures(pattern: &str) -> FieldReader {
    FieldReader::Captures(compile(pattern))
}

impl IntentMatcher {
    /// Matcher with the built-in rule table. Earlier rules win.
    pub fn default_rules() -> Self {
        let duration = format!(
            r"(?i)\b(?:for|during|pendant|pour)\s+(?:the\s+next\s+)?(?P<durationMonths>{NUMBER_WORDS})\s*(?:months?|mois)\b"
        );
        let money = r"(?i)(?:[€$£]\s*(?P<amount>\d+(?:[.,]\d{1,2})?)|(?P<amount2>\d+(?:[ ,.]\d{3})*(?:[.,]\d{1,2})?\s?k?)\s*(?:€|\$|£|eur\b|euros?\b|dollars?\b|pounds?\b|a month|per month|/\s*month|par mois)?)";

        let rules = vec![
            // Resume onboarding
            rule(
                "continue",
                r"(?i)^\s*(?:continue|next|go on|keep going|let'?s (?:go|continue)|resume|onward|suivant|continuer|on continue|la suite)\s*[.!]*\s*$",
                RuleTarget::Resume,
                vec![],
            ),
            // Profile edits
            rule(
                "profile_edit",
                r"(?i)\b(?:change|update|set|switch|correct|modify|changer|modifier)\s+(?:my|mon|ma)\s+(?P<field>city|town|ville|name|first name|nom|pr[ée]nom|currency|devise|region|country|pays|r[ée]gion|language|langue|diploma|degree|dipl[ôo]me|field of study|field|major|fili[èe]re|max(?:imum)? hours|weekly hours|working hours|hours|hourly rate|minimum rate|rate|taux horaire)\s*(?:to|=|:|en|à|a|pour)\s+(?P<value>.+?)\s*[.!]*$",
                RuleTarget::ProfileEdit { field: None },
                vec![],
            ),
            rule(
                "moved_to",
                r"(?i)\b(?:i(?:'ve| have)?\s+(?:just\s+)?moved\s+to|i\s+(?:now\s+)?live\s+in(?:\s+now)?|j'ai\s+d[ée]m[ée]nag[ée]\s+[àa])\s+(?P<value>.+?)\s*[.!]*$",
                RuleTarget::ProfileEdit { field: Some("city") },
                vec![],
            ),
            rule(
                "call_me",
                r"(?i)^\s*(?:please\s+)?call\s+me\s+(?P<value>[\p{L}][\p{L}'\-]*)\s*[.!]*$",
                RuleTarget::ProfileEdit { field: Some("name") },
                vec![],
            ),
            // Actions
            rule(
                "pause_subscription",
                r"(?i)\b(?:pause|suspend|freeze|suspendre|mettre\s+en\s+pause)\b|\bon\s+hold\b",
                RuleTarget::Action(ActionId::PauseSubscription),
                vec![
                    captures(
                        r"(?i)\b(?:pause|suspend|freeze|suspendre|mettre\s+en\s+pause)\s+(?:my\s+|the\s+|mon\s+|ma\s+|l['’]\s*)?(?:abonnement\s+)?(?P<resourceName>[\p{L}\d+&'][\p{L}\d+&' .-]*?)(?:\s+(?:subscription|membership|abonnement))?(?:\s+(?:for|during|pendant|pour|until|jusqu)\b.*)?\s*[.!?]*$",
                    ),
                    captures(&duration),
                ],
            ),
            rule(
                "cancel_subscription",
                r"(?i)\b(?:cancel|unsubscribe|stop\s+paying\s+for|r[ée]silier|annuler)\b",
                RuleTarget::Action(ActionId::CancelSubscription),
                vec![captures(
                    r"(?i)\b(?:cancel|unsubscribe\s+from|stop\s+paying\s+for|r[ée]silier|annuler)\s+(?:my\s+|the\s+|mon\s+|ma\s+|l['’]\s*)?(?:abonnement\s+)?(?P<resourceName>[\p{L}\d+&'][\p{L}\d+&' .-]*?)(?:\s+(?:subscription|membership|abonnement))?\s*[.!?]*$",
                )],
            ),
            rule(
                "add_subscription",
                r"(?i)\b(?:(?:add|track)\s+(?:a\s+)?(?:new\s+)?subscription|(?:just\s+)?subscribed\s+to|signed\s+up\s+(?:for|to)|new\s+subscription|nouvel\s+abonnement|abonn[ée]e?\s+[àa])\b",
                RuleTarget::Action(ActionId::AddSubscription),
                vec![
                    captures(
                        r"(?i)(?:subscription(?:\s+(?:to|for))?|subscribed\s+to|signed\s+up\s+(?:for|to)|abonnement|abonn[ée]e?\s+[àa])\s*:?\s+(?P<name>[\p{L}][\p{L}\d+&' .-]*?)(?:\s+(?:for|at|à|pour|costing|which|that|qui)\b.*|\s*[,(].*)?\s*[.!?]*$",
                    ),
                    captures(
                        r"(?i)(?:[€$£]\s*(?P<monthlyCost>\d+(?:[.,]\d{1,2})?)|(?P<monthlyCost2>\d+(?:[.,]\d{1,2})?)\s*(?:€|\$|£|eur\b|euros?\b|dollars?\b|pounds?\b|a month|per month|/\s*month|par mois))",
                    ),
                ],
            ),
            rule(
                "update_income",
                r"(?i)\b(?:(?:update|change|set)\s+my\s+(?:income|salary|pay)|my\s+(?:income|salary|pay)\s+(?:is|went|changed|dropped|increased|rose|fell|has)|i\s+(?:now\s+)?(?:earn|make)\s+(?:now\s+)?\d|mon\s+(?:revenu|salaire)|je\s+gagne)",
                RuleTarget::Action(ActionId::UpdateIncome),
                vec![captures(money)],
            ),
            rule(
                "update_expenses",
                r"(?i)\b(?:(?:update|change|set)\s+my\s+(?:expenses|spending|costs|rent)|my\s+(?:expenses|spending|rent|costs)\s+(?:are|is|went|changed|dropped|increased|rose|fell|have|has)|i\s+(?:now\s+)?spend\s+(?:now\s+)?\d|mes\s+d[ée]penses|je\s+d[ée]pense)",
                RuleTarget::Action(ActionId::UpdateExpenses),
                vec![captures(money)],
            ),
            rule(
                "create_goal",
                r"(?i)\b(?:(?:create|set|add|new|start)\s+(?:a\s+)?(?:new\s+)?(?:savings\s+)?goal|i\s+want\s+to\s+save|save\s+(?:up\s+)?for|nouvel?\s+objectif|je\s+veux\s+[ée]conomiser)\b",
                RuleTarget::Action(ActionId::CreateGoal),
                vec![FieldReader::Goal],
            ),
            rule(
                "sell_item",
                r"(?i)\b(?:sell|selling|vendre|revendre)\b",
                RuleTarget::Action(ActionId::SellItem),
                vec![
                    captures(
                        r"(?i)\b(?:sell|selling|vendre|revendre)\s+(?:my\s+|the\s+|mon\s+|ma\s+|mes\s+|le\s+|la\s+|les\s+)?(?P<itemName>[\p{L}][\p{L}\d' -]*?)(?:\s+(?:for|at|pour|à)\b.*)?\s*[.!?]*$",
                    ),
                    captures(
                        r"(?i)\b(?:for|at|pour|à)\s+(?:about\s+|around\s+|environ\s+)?[€$£]?\s*(?P<price>\d+(?:[.,]\d{1,2})?)",
                    ),
                ],
            ),
            rule(
                "log_energy",
                r"(?i)\b(?:log\s+(?:my\s+)?energy|energy\s+(?:level\s+)?(?:is\s+)?(?:at\s+)?\d|(?:mon\s+)?[ée]nergie\s+(?:est\s+)?(?:[àa]\s+)?\d)",
                RuleTarget::Action(ActionId::LogEnergy),
                vec![captures(r"(?i)(?P<level>\d{1,3})\s*(?:%|/\s*100|percent|pour\s*cent)?")],
            ),
        ];

        Self { rules }
    }

    /// Matcher with no rules (for testing).
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a custom action rule. Named capture groups become fields.
    pub fn add_action_rule(&mut self, name: &str, pattern: &str, action: ActionId) -> Result<(), regex::Error> {
        let regex = Regex::new(pattern)?;
        self.rules.push(IntentRule {
            name: name.to_string(),
            readers: vec![FieldReader::Captures(regex.clone())],
            regex,
            target: RuleTarget::Action(action),
        });
        Ok(())
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Evaluate a message against the rules.
    ///
    /// Returns `None` when nothing matches (fall through to the model).
    pub fn evaluate(&self, message: &str, ctx: &IntentContext) -> Option<Intent> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }

        for rule in &self.rules {
            let Some(caps) = rule.regex.captures(message) else {
                continue;
            };

            match &rule.target {
                RuleTarget::Resume => {
                    if !ctx.in_onboarding() {
                        continue;
                    }
                    debug!(rule = %rule.name, step = %ctx.step, "Message matched resume rule");
                    return Some(Intent {
                        mode: Mode::Onboarding,
                        ..Intent::conversation(PATTERN_CONFIDENCE, rule.name.clone())
                    });
                }
                RuleTarget::ProfileEdit { field } => {
                    let key = field.or_else(|| caps.name("field").and_then(|m| profile_field_key(m.as_str())));
                    let (Some(key), Some(raw)) = (key, caps.name("value")) else {
                        continue;
                    };
                    let Some(value) = profile_value(key, raw.as_str(), ctx) else {
                        debug!(rule = %rule.name, field = key, "Profile edit value rejected");
                        continue;
                    };
                    debug!(rule = %rule.name, field = key, "Message matched profile edit rule");
                    return Some(Intent {
                        mode: Mode::ProfileEdit,
                        field: Some(key.to_string()),
                        extracted_value: Some(value),
                        ..Intent::conversation(PATTERN_CONFIDENCE, rule.name.clone())
                    });
                }
                RuleTarget::Action(action) => {
                    let fields = read_fields(&rule.readers, message, ctx);
                    debug!(
                        rule = %rule.name,
                        action = %action,
                        fields = ?fields.keys().collect::<Vec<_>>(),
                        "Message matched action rule"
                    );
                    return Some(Intent::action(*action, fields, PATTERN_CONFIDENCE, rule.name.clone()));
                }
            }
        }

        None
    }
}

fn read_fields(readers: &[FieldReader], message: &str, ctx: &IntentContext) -> FieldValues {
    let mut fields = FieldValues::new();
    for reader in readers {
        match reader {
            FieldReader::Captures(regex) => {
                let Some(caps) = regex.captures(message) else {
                    continue;
                };
                for name in regex.capture_names().flatten() {
                    let Some(m) = caps.name(name) else {
                        continue;
                    };
                    // `amount2` and friends are alternates of `amount`.
                    let field = name.trim_end_matches(|c: char| c.is_ascii_digit());
                    if fields.contains_key(field) {
                        continue;
                    }
                    if let Some(value) = field_value(field, m.as_str()) {
                        fields.insert(field.to_string(), value);
                    }
                }
            }
            FieldReader::Goal => {
                let goal = extract_for_step(Step::Goal, message, &ProfileDraft::default(), ctx.today).fields;
                if let Some(name) = goal.goal_name {
                    fields.entry("name".into()).or_insert(Value::String(name));
                }
                if let Some(amount) = goal.goal_amount.and_then(number_value) {
                    fields.entry("amount".into()).or_insert(amount);
                }
                if let Some(deadline) = goal.goal_deadline {
                    fields.entry("deadline".into()).or_insert(Value::String(deadline.to_string()));
                }
            }
        }
    }
    fields
}

/// Typed candidate value for a captured action field.
fn field_value(field: &str, raw: &str) -> Option<Value> {
    match field {
        "durationMonths" => number_word(raw.trim()).filter(|n| *n > 0).map(Value::from),
        "amount" | "monthlyCost" | "price" => parse_amount(raw).and_then(number_value),
        "level" => raw.trim().parse::<u32>().ok().filter(|n| *n <= 100).map(Value::from),
        "resourceName" | "name" => target_name(raw).map(|s| Value::String(canonical_service(s))),
        _ => target_name(raw).map(Value::String),
    }
}

/// Clean a captured target name; generic words name nothing.
fn target_name(raw: &str) -> Option<String> {
    let cleaned = clean_value(raw);
    let stripped = LEADING_DETERMINER.replace(&cleaned, "").trim().to_string();
    let lower = stripped.to_lowercase();
    if stripped.is_empty() || GENERIC_TARGETS.contains(&lower.as_str()) {
        return None;
    }
    Some(stripped)
}

fn profile_field_key(label: &str) -> Option<&'static str> {
    let label = label.to_lowercase();
    let key = match label.as_str() {
        "city" | "town" | "ville" => "city",
        "name" | "first name" | "nom" | "prénom" | "prenom" => "name",
        "currency" | "devise" => "currency",
        "region" | "country" | "pays" | "région" => "region",
        "language" | "langue" => "language",
        "diploma" | "degree" | "diplôme" | "diplome" => "diploma",
        "field of study" | "field" | "major" | "filière" | "filiere" => "field",
        "max hours" | "maximum hours" | "weekly hours" | "working hours" | "hours" => "maxWorkHoursWeekly",
        "hourly rate" | "minimum rate" | "rate" | "taux horaire" => "minHourlyRate",
        _ => return None,
    };
    Some(key)
}

/// Normalize an edited value for a profile field, reusing the onboarding
/// strategy where one exists. `None` when the value doesn't fit the field.
fn profile_value(key: &str, raw: &str, ctx: &IntentContext) -> Option<Value> {
    let cleaned = clean_value(raw);
    if cleaned.is_empty() {
        return None;
    }
    let via_step = |step: Step| extract_for_step(step, &cleaned, &ProfileDraft::default(), ctx.today).fields;

    let value = match key {
        "name" => Value::String(via_step(Step::Name).name?),
        "city" => Value::String(via_step(Step::Location).city.unwrap_or_else(|| title_case(&cleaned))),
        "region" => Value::String(via_step(Step::Region).region?),
        "currency" => {
            let lower = cleaned.to_lowercase();
            let code = if lower.contains('€') || lower.starts_with("eur") {
                "EUR"
            } else if lower.contains('£') || lower.contains("pound") || lower == "gbp" || lower.contains("sterling") {
                "GBP"
            } else if lower.contains('$') || lower.contains("dollar") || lower == "usd" {
                "USD"
            } else {
                return None;
            };
            Value::String(code.to_string())
        }
        "language" => {
            let lower = cleaned.to_lowercase();
            let code = if lower.starts_with("en") || lower.starts_with("anglais") {
                "en"
            } else if lower.starts_with("fr") {
                "fr"
            } else {
                return None;
            };
            Value::String(code.to_string())
        }
        "maxWorkHoursWeekly" => {
            let hours = find_numbers(&cleaned).first()?.value.round().to_u32()?;
            Value::from(hours)
        }
        "minHourlyRate" => number_value(parse_amount(&cleaned)?)?,
        _ => Value::String(cleaned.clone()),
    };

    // Must deserialize into the draft field.
    ProfileDraft::default().set_field(key, value.clone()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ctx(step: Step) -> IntentContext {
        IntentContext {
            mode: Mode::Conversation,
            step,
            has_goal: false,
            has_budget: false,
            has_energy: false,
            today: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        }
    }

    fn done() -> IntentContext {
        ctx(Step::Complete)
    }

    #[test]
    fn pause_with_duration() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher.evaluate("Can you pause my Netflix subscription for 3 months?", &done()).unwrap();
        assert_eq!(intent.action, Some(ActionId::PauseSubscription));
        assert_eq!(intent.fields["resourceName"], json!("Netflix"));
        assert_eq!(intent.fields["durationMonths"], json!(3));
        assert_eq!(intent.matched_pattern, "pause_subscription");
    }

    #[test]
    fn pause_without_duration_and_generic_target() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher.evaluate("pause spotify", &done()).unwrap();
        assert_eq!(intent.fields["resourceName"], json!("Spotify"));
        assert!(!intent.fields.contains_key("durationMonths"));

        let intent = matcher.evaluate("I want to pause my subscription", &done()).unwrap();
        assert_eq!(intent.action, Some(ActionId::PauseSubscription));
        assert!(intent.fields.is_empty());

        let intent = matcher.evaluate("pause deezer for two months", &done()).unwrap();
        assert_eq!(intent.fields["durationMonths"], json!(2));
    }

    #[test]
    fn cancel_reads_resource() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher.evaluate("cancel my gym membership", &done()).unwrap();
        assert_eq!(intent.action, Some(ActionId::CancelSubscription));
        assert_eq!(intent.fields["resourceName"], json!("Gym"));
    }

    #[test]
    fn add_subscription_reads_name_and_cost() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher
            .evaluate("I just subscribed to Apple Music for 10.99€ a month", &done())
            .unwrap();
        assert_eq!(intent.action, Some(ActionId::AddSubscription));
        assert_eq!(intent.fields["name"], json!("Apple Music"));
        assert_eq!(intent.fields["monthlyCost"], json!(10.99));
    }

    #[test]
    fn budget_updates() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher.evaluate("my income went up to 950€", &done()).unwrap();
        assert_eq!(intent.action, Some(ActionId::UpdateIncome));
        assert_eq!(intent.fields["amount"], json!(950));

        let intent = matcher.evaluate("update my expenses", &done()).unwrap();
        assert_eq!(intent.action, Some(ActionId::UpdateExpenses));
        assert!(intent.fields.is_empty());
    }

    #[test]
    fn goal_uses_goal_strategy() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher
            .evaluate("I want to save 1500 for a trip to Japan by June", &done())
            .unwrap();
        assert_eq!(intent.action, Some(ActionId::CreateGoal));
        assert_eq!(intent.fields["amount"], json!(1500));
        assert_eq!(intent.fields["name"], json!("trip to Japan"));
        assert_eq!(intent.fields["deadline"], json!("2027-06-30"));
    }

    #[test]
    fn sell_reads_item_and_price() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher.evaluate("I could sell my old bike for 80", &done()).unwrap();
        assert_eq!(intent.action, Some(ActionId::SellItem));
        assert_eq!(intent.fields["itemName"], json!("old bike"));
        assert_eq!(intent.fields["price"], json!(80));
    }

    #[test]
    fn energy_level() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher.evaluate("energy is at 40%", &done()).unwrap();
        assert_eq!(intent.action, Some(ActionId::LogEnergy));
        assert_eq!(intent.fields["level"], json!(40));
    }

    #[test]
    fn continue_only_during_onboarding() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher.evaluate("continue", &ctx(Step::Budget)).unwrap();
        assert_eq!(intent.mode, Mode::Onboarding);
        assert_eq!(intent.matched_pattern, "continue");
        assert_eq!(intent.confidence, Some(PATTERN_CONFIDENCE));
        assert!(intent.action.is_none());
        assert!(matcher.evaluate("continue", &done()).is_none());
    }

    #[test]
    fn profile_edits() {
        let matcher = IntentMatcher::default_rules();
        let intent = matcher.evaluate("change my city to Lyon", &done()).unwrap();
        assert_eq!(intent.mode, Mode::ProfileEdit);
        assert_eq!(intent.field.as_deref(), Some("city"));
        assert_eq!(intent.extracted_value, Some(json!("Lyon")));

        let intent = matcher.evaluate("I moved to Bordeaux", &done()).unwrap();
        assert_eq!(intent.field.as_deref(), Some("city"));
        assert_eq!(intent.extracted_value, Some(json!("Bordeaux")));

        let intent = matcher.evaluate("set my hourly rate to 15€", &done()).unwrap();
        assert_eq!(intent.field.as_deref(), Some("minHourlyRate"));
        assert_eq!(intent.extracted_value, Some(json!(15)));

        let intent = matcher.evaluate("switch my currency to pounds", &done()).unwrap();
        assert_eq!(intent.extracted_value, Some(json!("GBP")));
    }

    #[test]
    fn invalid_edit_value_falls_through() {
        let matcher = IntentMatcher::default_rules();
        assert!(matcher.evaluate("change my currency to bitcoin", &done()).is_none());
    }

    #[test]
    fn small_talk_is_a_miss() {
        let matcher = IntentMatcher::default_rules();
        assert!(matcher.evaluate("how are you today?", &done()).is_none());
        assert!(matcher.evaluate("   ", &done()).is_none());
    }

    #[test]
    fn custom_rules() {
        let mut matcher = IntentMatcher::empty();
        matcher
            .add_action_rule("custom_pause", r"(?i)^hold (?P<resourceName>\w+)$", ActionId::PauseSubscription)
            .unwrap();
        let intent = matcher.evaluate("hold netflix", &done()).unwrap();
        assert_eq!(intent.fields["resourceName"], json!("Netflix"));
        assert!(matcher.add_action_rule("bad", "(", ActionId::LogEnergy).is_err());
    }
}
