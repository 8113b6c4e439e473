//! Action registry: the closed action vocabulary, each action's field
//! schema, and the typed `Action` built from a ready dispatch.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;
use crate::extraction::numbers::parse_amount;

/// Candidate or resolved field values for an action, keyed by field name.
pub type FieldValues = BTreeMap<String, Value>;

/// Identifiers of every action the assistant can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    PauseSubscription,
    CancelSubscription,
    AddSubscription,
    UpdateIncome,
    UpdateExpenses,
    CreateGoal,
    SellItem,
    LogEnergy,
}

impl ActionId {
    pub const ALL: [ActionId; 8] = [
        ActionId::PauseSubscription,
        ActionId::CancelSubscription,
        ActionId::AddSubscription,
        ActionId::UpdateIncome,
        ActionId::UpdateExpenses,
        ActionId::CreateGoal,
        ActionId::SellItem,
        ActionId::LogEnergy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PauseSubscription => "pause_subscription",
            Self::CancelSubscription => "cancel_subscription",
            Self::AddSubscription => "add_subscription",
            Self::UpdateIncome => "update_income",
            Self::UpdateExpenses => "update_expenses",
            Self::CreateGoal => "create_goal",
            Self::SellItem => "sell_item",
            Self::LogEnergy => "log_energy",
        }
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionId {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| DispatchError::UnknownAction(s.to_string()))
    }
}

/// Input widget kind for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Select,
    Duration,
}

/// One field of an action's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl FieldSpec {
    fn new(name: &str, label: &str, field_type: FieldType, required: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            required,
            options: None,
            max: None,
        }
    }

    fn with_max(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }

    /// Normalize a candidate value to this field's type, or `None` if it
    /// is absent or unusable.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            _ => match self.field_type {
                FieldType::Text | FieldType::Select => match value {
                    Value::String(s) => Some(Value::String(s.trim().to_string())),
                    Value::Number(n) => Some(Value::String(n.to_string())),
                    _ => None,
                },
                FieldType::Number => {
                    let amount = decimal_of(value)?;
                    if amount < Decimal::ZERO {
                        return None;
                    }
                    number_value(amount)
                }
                FieldType::Duration => {
                    let months = decimal_of(value)?.round().to_u32()?;
                    (months > 0).then(|| Value::from(months))
                }
                FieldType::Date => {
                    let raw = value.as_str()?;
                    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                        .ok()
                        .map(|d| Value::String(d.to_string()))
                }
            },
        }
    }
}

fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok().or_else(|| parse_amount(s)),
        _ => None,
    }
}

/// JSON number for a decimal amount (integer when it has no fraction).
pub fn number_value(amount: Decimal) -> Option<Value> {
    if amount.fract().is_zero() {
        return amount.to_i64().map(Value::from);
    }
    serde_json::Number::from_f64(amount.to_f64()?).map(Value::Number)
}

/// Static description of one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    pub id: ActionId,
    pub description: String,
    pub fields: Vec<FieldSpec>,
    pub ui_component: String,
}

/// The action table. Built once at startup, never mutated.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    definitions: Vec<ActionDefinition>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        use FieldType::*;

        let definitions = vec![
            ActionDefinition {
                id: ActionId::PauseSubscription,
                description: "Pause a subscription for a few months".into(),
                fields: vec![
                    FieldSpec::new("resourceName", "Subscription", Select, true),
                    FieldSpec::new("durationMonths", "Pause for (months)", Duration, true),
                ],
                ui_component: "pause-subscription-form".into(),
            },
            ActionDefinition {
                id: ActionId::CancelSubscription,
                description: "Cancel a subscription".into(),
                fields: vec![FieldSpec::new("resourceName", "Subscription", Select, true)],
                ui_component: "cancel-subscription-form".into(),
            },
            ActionDefinition {
                id: ActionId::AddSubscription,
                description: "Track a new subscription".into(),
                fields: vec![
                    FieldSpec::new("name", "Service", Text, true),
                    FieldSpec::new("monthlyCost", "Monthly cost", Number, true),
                ],
                ui_component: "add-subscription-form".into(),
            },
            ActionDefinition {
                id: ActionId::UpdateIncome,
                description: "Update monthly income".into(),
                fields: vec![FieldSpec::new("amount", "Monthly income", Number, true)],
                ui_component: "budget-form".into(),
            },
            ActionDefinition {
                id: ActionId::UpdateExpenses,
                description: "Update monthly expenses".into(),
                fields: vec![FieldSpec::new("amount", "Monthly expenses", Number, true)],
                ui_component: "budget-form".into(),
            },
            ActionDefinition {
                id: ActionId::CreateGoal,
                description: "Create a savings goal".into(),
                fields: vec![
                    FieldSpec::new("name", "Goal", Text, true),
                    FieldSpec::new("amount", "Target amount", Number, true),
                    FieldSpec::new("deadline", "Deadline", Date, false),
                ],
                ui_component: "goal-form".into(),
            },
            ActionDefinition {
                id: ActionId::SellItem,
                description: "Sell something you own".into(),
                fields: vec![
                    FieldSpec::new("itemName", "Item", Select, true),
                    FieldSpec::new("price", "Asking price", Number, false),
                ],
                ui_component: "sell-item-form".into(),
            },
            ActionDefinition {
                id: ActionId::LogEnergy,
                description: "Log how energetic you feel".into(),
                fields: vec![FieldSpec::new("level", "Energy (0-100)", Number, true).with_max(100)],
                ui_component: "energy-form".into(),
            },
        ];

        Self { definitions }
    }

    pub fn definitions(&self) -> &[ActionDefinition] {
        &self.definitions
    }

    pub fn get(&self, id: ActionId) -> Option<&ActionDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Look up by wire id. Unknown ids are an error.
    pub fn lookup(&self, action_id: &str) -> Result<&ActionDefinition, DispatchError> {
        let id: ActionId = action_id.parse()?;
        self.get(id)
            .ok_or_else(|| DispatchError::UnknownAction(action_id.to_string()))
    }
}

/// A fully specified action, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    PauseSubscription {
        resource_name: String,
        duration_months: u32,
    },
    CancelSubscription {
        resource_name: String,
    },
    AddSubscription {
        name: String,
        monthly_cost: Decimal,
    },
    UpdateIncome {
        amount: Decimal,
    },
    UpdateExpenses {
        amount: Decimal,
    },
    CreateGoal {
        name: String,
        amount: Decimal,
        deadline: Option<NaiveDate>,
    },
    SellItem {
        item_name: String,
        price: Option<Decimal>,
    },
    LogEnergy {
        level: u32,
    },
}

impl Action {
    pub fn id(&self) -> ActionId {
        match self {
            Self::PauseSubscription { .. } => ActionId::PauseSubscription,
            Self::CancelSubscription { .. } => ActionId::CancelSubscription,
            Self::AddSubscription { .. } => ActionId::AddSubscription,
            Self::UpdateIncome { .. } => ActionId::UpdateIncome,
            Self::UpdateExpenses { .. } => ActionId::UpdateExpenses,
            Self::CreateGoal { .. } => ActionId::CreateGoal,
            Self::SellItem { .. } => ActionId::SellItem,
            Self::LogEnergy { .. } => ActionId::LogEnergy,
        }
    }

    /// Build the typed action from resolved field values.
    pub fn from_fields(id: ActionId, data: &FieldValues) -> Result<Action, DispatchError> {
        let reader = FieldReader { id, data };
        let action = match id {
            ActionId::PauseSubscription => Action::PauseSubscription {
                resource_name: reader.text("resourceName")?,
                duration_months: reader.count("durationMonths")?,
            },
            ActionId::CancelSubscription => Action::CancelSubscription {
                resource_name: reader.text("resourceName")?,
            },
            ActionId::AddSubscription => Action::AddSubscription {
                name: reader.text("name")?,
                monthly_cost: reader.amount("monthlyCost")?,
            },
            ActionId::UpdateIncome => Action::UpdateIncome {
                amount: reader.amount("amount")?,
            },
            ActionId::UpdateExpenses => Action::UpdateExpenses {
                amount: reader.amount("amount")?,
            },
            ActionId::CreateGoal => Action::CreateGoal {
                name: reader.text("name")?,
                amount: reader.amount("amount")?,
                deadline: reader.optional(|r| r.date("deadline")),
            },
            ActionId::SellItem => Action::SellItem {
                item_name: reader.text("itemName")?,
                price: reader.optional(|r| r.amount("price")),
            },
            ActionId::LogEnergy => Action::LogEnergy {
                level: reader.count("level")?.min(100),
            },
        };
        Ok(action)
    }
}

struct FieldReader<'a> {
    id: ActionId,
    data: &'a FieldValues,
}

impl FieldReader<'_> {
    fn invalid(&self, field: &str) -> DispatchError {
        DispatchError::InvalidField {
            action: self.id.to_string(),
            field: field.to_string(),
        }
    }

    fn text(&self, field: &str) -> Result<String, DispatchError> {
        self.data
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| self.invalid(field))
    }

    fn amount(&self, field: &str) -> Result<Decimal, DispatchError> {
        self.data
            .get(field)
            .and_then(decimal_of)
            .filter(|d| *d >= Decimal::ZERO)
            .ok_or_else(|| self.invalid(field))
    }

    fn count(&self, field: &str) -> Result<u32, DispatchError> {
        self.data
            .get(field)
            .and_then(decimal_of)
            .and_then(|d| d.round().to_u32())
            .ok_or_else(|| self.invalid(field))
    }

    fn date(&self, field: &str) -> Result<NaiveDate, DispatchError> {
        self.data
            .get(field)
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .ok_or_else(|| self.invalid(field))
    }

    fn optional<T>(&self, read: impl Fn(&Self) -> Result<T, DispatchError>) -> Option<T> {
        read(self).ok()
    }
}
