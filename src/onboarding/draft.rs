//! Profile draft: the partial profile accumulated across onboarding turns.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Upper bound on unknown keys carried in `ProfileDraft::extra`.
pub const MAX_EXTRA_FIELDS: usize = 16;

/// Conversation language picked up at the greeting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Fr,
}

/// Currency the user budgets in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Gbp,
    Usd,
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eur => "€",
            Self::Gbp => "£",
            Self::Usd => "$",
        }
    }
}

/// A partial profile. Every known field is optional; `None` means "never
/// collected", which is distinct from an explicit empty list.
///
/// The same type doubles as the "partial field set" produced by each
/// extractor for a single turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diploma: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expenses: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_work_hours_weekly: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_hourly_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_events: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_opportunities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Vec<String>>,
    /// Latest self-reported energy level (0–100), set outside onboarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<u32>,
    /// Keys the model returned that have no typed home. Bounded by
    /// `MAX_EXTRA_FIELDS`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

macro_rules! for_each_field {
    ($mac:ident!($($args:tt)*)) => {
        $mac!($($args)*;
            language, region, currency, name, diploma, field, skills,
            certifications, city, income, expenses, max_work_hours_weekly,
            min_hourly_rate, goal_name, goal_amount, goal_deadline,
            academic_events, inventory_items, trade_opportunities,
            subscriptions, energy_level)
    };
}

macro_rules! overlay_fields {
    ($dst:ident, $src:ident; $($f:ident),*) => {
        $( if $src.$f.is_some() { $dst.$f = $src.$f.clone(); } )*
    };
}

macro_rules! all_none {
    ($src:ident; $($f:ident),*) => {
        true $( && $src.$f.is_none() )*
    };
}

impl ProfileDraft {
    /// True when nothing at all is set.
    pub fn is_empty(&self) -> bool {
        let this = self;
        for_each_field!(all_none!(this)) && self.extra.is_empty()
    }

    /// Copy every field that is set in `other` onto `self`.
    ///
    /// Fields absent from `other` are left untouched, so a draft is only
    /// ever written with values that were explicitly extracted or defaulted.
    pub fn overlay(&mut self, other: &ProfileDraft) {
        let dst = self;
        let src = other;
        for_each_field!(overlay_fields!(dst, src));
        for (key, value) in &other.extra {
            dst.extra.insert(key.clone(), value.clone());
        }
    }

    /// Return a copy of `self` with `other` laid on top.
    pub fn merged(&self, other: &ProfileDraft) -> ProfileDraft {
        let mut out = self.clone();
        out.overlay(other);
        out
    }

    /// Drop extra keys beyond `MAX_EXTRA_FIELDS` (keeps the first in key order).
    pub fn bound_extra(&mut self) {
        if self.extra.len() > MAX_EXTRA_FIELDS {
            let dropped: Vec<String> = self.extra.keys().skip(MAX_EXTRA_FIELDS).cloned().collect();
            tracing::debug!(count = dropped.len(), "Dropping overflow extra profile fields");
            for key in dropped {
                self.extra.remove(&key);
            }
        }
    }

    /// Build a draft from a JSON object, validating each key on its own.
    ///
    /// A value that doesn't fit its field's type is dropped instead of
    /// failing the whole object. Returns the draft and the rejected keys.
    pub fn from_json_fields(
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> (ProfileDraft, Vec<String>) {
        let mut draft = ProfileDraft::default();
        let mut rejected = Vec::new();
        for (key, value) in fields {
            if draft.set_field(key, value.clone()) {
                continue;
            }
            rejected.push(key.clone());
        }
        (draft, rejected)
    }

    /// Set a single field by its wire name. Returns false if the value
    /// doesn't deserialize into that field.
    pub fn set_field(&mut self, key: &str, value: serde_json::Value) -> bool {
        let mut single = serde_json::Map::new();
        single.insert(key.to_string(), value);
        match serde_json::from_value::<ProfileDraft>(serde_json::Value::Object(single)) {
            Ok(parsed) => {
                self.overlay(&parsed);
                true
            }
            Err(e) => {
                tracing::debug!(key, error = %e, "Rejected profile field value");
                false
            }
        }
    }

    /// Whether the draft carries a savings goal.
    pub fn has_goal(&self) -> bool {
        self.goal_name.is_some() || self.goal_amount.is_some()
    }

    /// Whether the draft carries budget figures.
    pub fn has_budget(&self) -> bool {
        self.income.is_some() || self.expenses.is_some()
    }

    pub fn has_energy(&self) -> bool {
        self.energy_level.is_some()
    }

    /// Currency symbol for user-facing amounts (euro when unknown).
    pub fn currency_symbol(&self) -> &'static str {
        self.currency.unwrap_or(Currency::Eur).symbol()
    }

    /// JSON view with unset fields omitted.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_is_empty() {
        assert!(ProfileDraft::default().is_empty());
        let draft = ProfileDraft {
            skills: Some(vec![]),
            ..Default::default()
        };
        assert!(!draft.is_empty(), "explicit empty list counts as data");
    }

    #[test]
    fn overlay_only_writes_set_fields() {
        let mut base = ProfileDraft {
            name: Some("Alice".into()),
            income: Some(dec!(900)),
            ..Default::default()
        };
        let patch = ProfileDraft {
            income: Some(dec!(800)),
            city: Some("Lyon".into()),
            ..Default::default()
        };
        base.overlay(&patch);
        assert_eq!(base.name.as_deref(), Some("Alice"));
        assert_eq!(base.income, Some(dec!(800)));
        assert_eq!(base.city.as_deref(), Some("Lyon"));
        assert!(base.expenses.is_none());
    }

    #[test]
    fn serializes_camel_case_and_skips_unset() {
        let draft = ProfileDraft {
            academic_events: Some(vec![]),
            max_work_hours_weekly: Some(15),
            currency: Some(Currency::Eur),
            ..Default::default()
        };
        let json = draft.to_json();
        assert_eq!(json["academicEvents"], serde_json::json!([]));
        assert_eq!(json["maxWorkHoursWeekly"], 15);
        assert_eq!(json["currency"], "EUR");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn from_json_fields_drops_only_bad_values() {
        let raw = serde_json::json!({
            "name": "Bob",
            "income": 1200,
            "currency": "yen",
            "goalDeadline": "2027-06-30",
            "favouriteColour": "green"
        });
        let (draft, rejected) = ProfileDraft::from_json_fields(raw.as_object().unwrap());
        assert_eq!(draft.name.as_deref(), Some("Bob"));
        assert_eq!(draft.income, Some(dec!(1200)));
        assert_eq!(draft.goal_deadline, NaiveDate::from_ymd_opt(2027, 6, 30));
        assert!(draft.currency.is_none());
        assert_eq!(rejected, vec!["currency".to_string()]);
        assert_eq!(draft.extra["favouriteColour"], "green");
    }

    #[test]
    fn bound_extra_caps_unknown_keys() {
        let mut draft = ProfileDraft::default();
        for i in 0..(MAX_EXTRA_FIELDS + 5) {
            draft.extra.insert(format!("k{i:02}"), serde_json::json!(i));
        }
        draft.bound_extra();
        assert_eq!(draft.extra.len(), MAX_EXTRA_FIELDS);
    }

    #[test]
    fn context_flags() {
        let draft = ProfileDraft {
            goal_amount: Some(dec!(500)),
            ..Default::default()
        };
        assert!(draft.has_goal());
        assert!(!draft.has_budget());
        assert!(!draft.has_energy());
        assert_eq!(draft.currency_symbol(), "€");
    }
}
