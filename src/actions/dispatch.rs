//! Action dispatch: hydrate options, fill defaults from context, decide
//! ready vs. missing info, and always build a resource for the human.
//!
//! Dispatch never mutates anything. Execution is a separate, explicit step.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::form::{FormField, UiResource};
use super::registry::{
    Action, ActionDefinition, ActionId, ActionRegistry, FieldSpec, FieldType, FieldValues, number_value,
};
use crate::error::DispatchError;
use crate::onboarding::ProfileDraft;

/// Subscription choices offered when the profile lists none.
pub const FALLBACK_SUBSCRIPTIONS: &[&str] = &["Netflix", "Spotify", "Disney+", "Amazon Prime", "Gym"];

/// Conversational context used for hydration and defaults.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    pub profile: &'a ProfileDraft,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Ready,
    MissingInfo,
}

/// Outcome of one dispatch call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub status: DispatchStatus,
    pub action_id: ActionId,
    pub data: FieldValues,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    pub confirmation_resource: UiResource,
    /// Typed action, present only when `status` is `Ready`.
    #[serde(skip)]
    pub action: Option<Action>,
}

impl DispatchResult {
    pub fn is_ready(&self) -> bool {
        self.status == DispatchStatus::Ready
    }
}

/// Whole months from `today` until `deadline`, at least 1. `None` once the
/// deadline has passed.
pub fn months_until(deadline: NaiveDate, today: NaiveDate) -> Option<u32> {
    if deadline <= today {
        return None;
    }
    let mut months = (deadline.year() - today.year()) * 12 + deadline.month() as i32 - today.month() as i32;
    if deadline.day() < today.day() {
        months -= 1;
    }
    u32::try_from(months.max(1)).ok()
}

impl ActionRegistry {
    /// Validate and prepare an action.
    ///
    /// Unknown `action_id` is an error. Everything else yields a result:
    /// `MissingInfo` with a form for the missing required fields, or `Ready`
    /// with a pre-filled confirmation. Deterministic for the same inputs.
    pub fn dispatch(
        &self,
        action_id: &str,
        candidate: &FieldValues,
        context_id: &str,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchResult, DispatchError> {
        let definition = self.lookup(action_id)?;

        let mut data = FieldValues::new();
        let mut hydrated_fields = Vec::with_capacity(definition.fields.len());
        let mut missing_fields = Vec::new();

        for spec in &definition.fields {
            let spec = hydrate(definition.id, spec, ctx);
            let value = candidate
                .get(&spec.name)
                .and_then(|raw| {
                    let coerced = spec.coerce(raw).map(|v| match_option(&spec, v));
                    if coerced.is_none() {
                        debug!(action = %definition.id, field = %spec.name, "Discarding unusable candidate value");
                    }
                    coerced
                })
                .or_else(|| default_value(definition.id, &spec, ctx));

            match &value {
                Some(v) => {
                    data.insert(spec.name.clone(), v.clone());
                }
                None if spec.required => missing_fields.push(spec.name.clone()),
                None => {}
            }
            hydrated_fields.push(FormField { spec, value });
        }

        let ignored: Vec<&String> = candidate
            .keys()
            .filter(|k| !definition.fields.iter().any(|f| &f.name == *k))
            .collect();
        if !ignored.is_empty() {
            debug!(action = %definition.id, ignored = ?ignored, "Ignoring undeclared candidate fields");
        }

        let result = if missing_fields.is_empty() {
            build_ready(definition, context_id, data, hydrated_fields)
        } else {
            let form_fields = hydrated_fields
                .into_iter()
                .filter(|f| missing_fields.contains(&f.spec.name))
                .collect();
            DispatchResult {
                status: DispatchStatus::MissingInfo,
                action_id: definition.id,
                data,
                missing_fields,
                confirmation_resource: UiResource::form(definition, context_id, form_fields),
                action: None,
            }
        };

        info!(
            action = %result.action_id,
            context_id,
            status = ?result.status,
            missing = ?result.missing_fields,
            "Dispatched action"
        );
        Ok(result)
    }
}

fn build_ready(
    definition: &ActionDefinition,
    context_id: &str,
    data: FieldValues,
    fields: Vec<FormField>,
) -> DispatchResult {
    let action = Action::from_fields(definition.id, &data).ok();
    DispatchResult {
        status: DispatchStatus::Ready,
        action_id: definition.id,
        data,
        missing_fields: Vec::new(),
        confirmation_resource: UiResource::confirmation(definition, context_id, fields),
        action,
    }
}

/// Fill dynamic options and bounds from context.
fn hydrate(action: ActionId, spec: &FieldSpec, ctx: &DispatchContext<'_>) -> FieldSpec {
    let mut spec = spec.clone();
    match (action, spec.name.as_str(), spec.field_type) {
        (ActionId::PauseSubscription | ActionId::CancelSubscription, "resourceName", FieldType::Select) => {
            let known = ctx.profile.subscriptions.as_deref().unwrap_or_default();
            spec.options = Some(if known.is_empty() {
                FALLBACK_SUBSCRIPTIONS.iter().map(|s| s.to_string()).collect()
            } else {
                known.to_vec()
            });
        }
        (ActionId::SellItem, "itemName", FieldType::Select) => {
            spec.options = ctx.profile.inventory_items.clone().filter(|items| !items.is_empty());
        }
        (_, _, FieldType::Duration) => {
            if let Some(max) = goal_months(ctx) {
                spec.max = Some(max);
            }
        }
        _ => {}
    }
    spec
}

fn goal_months(ctx: &DispatchContext<'_>) -> Option<u32> {
    ctx.profile
        .goal_deadline
        .and_then(|deadline| months_until(deadline, ctx.today))
}

/// Spell a select value the way its matching option does ("netflix" ->
/// "Netflix"). Values outside the option list pass through unchanged.
fn match_option(spec: &FieldSpec, value: Value) -> Value {
    let (Some(options), Some(text)) = (&spec.options, value.as_str()) else {
        return value;
    };
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(text))
        .map_or(value.clone(), |o| Value::String(o.clone()))
}

/// Default for a missing value. Income and expense amounts come only from
/// their own last known values, never from the goal amount.
fn default_value(action: ActionId, spec: &FieldSpec, ctx: &DispatchContext<'_>) -> Option<Value> {
    match (action, spec.name.as_str(), spec.field_type) {
        (_, _, FieldType::Duration) => goal_months(ctx).map(Value::from),
        (ActionId::UpdateIncome, "amount", _) => ctx.profile.income.and_then(number_value),
        (ActionId::UpdateExpenses, "amount", _) => ctx.profile.expenses.and_then(number_value),
        _ => None,
    }
}
