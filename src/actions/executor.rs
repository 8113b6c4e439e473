//! Action executor: the only component that mutates state.
//!
//! Runs a human-confirmed action against the store. Every failure turns into
//! a user-facing message; store error text is logged, never shown.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{Instrument, error, info, info_span, warn};

use super::registry::{Action, ActionId, FieldValues};
use crate::error::{DispatchError, StoreError};
use crate::onboarding::ProfileDraft;
use crate::store::{Goal, ItemStatus, Store, Subscription, SubscriptionStatus};

const GENERIC_FAILURE: &str = "Something went wrong on my side, nothing was changed. Please try again in a moment.";

/// Result of running an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ExecutionOutcome {
    fn done(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Value::Null,
        }
    }
}

/// Executes confirmed actions for an owner.
pub struct ActionExecutor {
    store: Arc<dyn Store>,
}

impl ActionExecutor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Run a confirmed action.
    ///
    /// An unknown id is the only `Err`: it is a caller bug. Every other
    /// failure (incomplete data, missing record, store error) comes back as
    /// `Ok` with `success: false` and a message safe to show the user.
    pub async fn execute(
        &self,
        action_id: &str,
        data: &FieldValues,
        owner_id: &str,
    ) -> Result<ExecutionOutcome, DispatchError> {
        let id: ActionId = action_id.parse()?;
        let action = match Action::from_fields(id, data) {
            Ok(action) => action,
            Err(e) => {
                warn!(action = %id, error = %e, "Refusing to execute incomplete action");
                return Ok(ExecutionOutcome::failed(format!(
                    "I still need a few details before I can {}.",
                    verb(id)
                )));
            }
        };

        let span = info_span!("execute", action = %id, owner_id);
        let outcome = match self.run(&action, owner_id).instrument(span).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(action = %id, owner_id, error = %e, "Action execution failed");
                ExecutionOutcome::failed(GENERIC_FAILURE)
            }
        };
        info!(action = %id, owner_id, success = outcome.success, "Executed action");
        Ok(outcome)
    }

    async fn run(&self, action: &Action, owner_id: &str) -> Result<ExecutionOutcome, StoreError> {
        let profile = self.store.get_profile(owner_id).await?.unwrap_or_default();
        let symbol = profile.currency_symbol();

        match action {
            Action::PauseSubscription {
                resource_name,
                duration_months,
            } => {
                let Some(mut sub) = self.find_subscription(owner_id, resource_name).await? else {
                    return Ok(not_found_subscription(resource_name));
                };
                sub.status = SubscriptionStatus::Paused;
                sub.paused_months = Some(*duration_months);
                sub.updated_at = Utc::now();
                self.store.save_subscription(&sub).await?;

                let paused = format!(
                    "Paused {} for {} {}.",
                    sub.name,
                    duration_months,
                    months_word(*duration_months)
                );
                // Subscriptions imported from onboarding start without a cost.
                if sub.monthly_cost.is_zero() {
                    return Ok(ExecutionOutcome::done(
                        format!("{paused} I don't know its monthly cost yet, so I can't tell what that saves."),
                        json!({ "subscriptionId": sub.id, "savings": null }),
                    ));
                }
                let savings = sub.monthly_cost * Decimal::from(*duration_months);
                Ok(ExecutionOutcome::done(
                    format!("{paused} That saves you {}.", money(symbol, savings)),
                    json!({ "subscriptionId": sub.id, "savings": savings }),
                ))
            }
            Action::CancelSubscription { resource_name } => {
                let Some(mut sub) = self.find_subscription(owner_id, resource_name).await? else {
                    return Ok(not_found_subscription(resource_name));
                };
                sub.status = SubscriptionStatus::Cancelled;
                sub.paused_months = None;
                sub.updated_at = Utc::now();
                self.store.save_subscription(&sub).await?;
                if sub.monthly_cost.is_zero() {
                    return Ok(ExecutionOutcome::done(
                        format!("Cancelled {}.", sub.name),
                        json!({ "subscriptionId": sub.id, "monthlySavings": null }),
                    ));
                }
                Ok(ExecutionOutcome::done(
                    format!(
                        "Cancelled {}. That's {} a month back in your pocket.",
                        sub.name,
                        money(symbol, sub.monthly_cost)
                    ),
                    json!({ "subscriptionId": sub.id, "monthlySavings": sub.monthly_cost }),
                ))
            }
            Action::AddSubscription { name, monthly_cost } => {
                let sub = match self.find_subscription(owner_id, name).await? {
                    Some(mut existing) => {
                        existing.monthly_cost = *monthly_cost;
                        existing.status = SubscriptionStatus::Active;
                        existing.paused_months = None;
                        existing.updated_at = Utc::now();
                        existing
                    }
                    None => Subscription::new(owner_id, name, *monthly_cost),
                };
                self.store.save_subscription(&sub).await?;
                Ok(ExecutionOutcome::done(
                    format!("Now tracking {} at {} a month.", sub.name, money(symbol, *monthly_cost)),
                    json!({ "subscriptionId": sub.id }),
                ))
            }
            Action::UpdateIncome { amount } => {
                let mut profile = profile;
                profile.income = Some(*amount);
                self.store.save_profile(owner_id, &profile).await?;
                Ok(budget_outcome("income", *amount, &profile))
            }
            Action::UpdateExpenses { amount } => {
                let mut profile = profile;
                profile.expenses = Some(*amount);
                self.store.save_profile(owner_id, &profile).await?;
                Ok(budget_outcome("expenses", *amount, &profile))
            }
            Action::CreateGoal { name, amount, deadline } => {
                let goal = Goal::new(owner_id, name, *amount, *deadline);
                self.store.save_goal(&goal).await?;

                let mut profile = profile;
                profile.goal_name = Some(name.clone());
                profile.goal_amount = Some(*amount);
                profile.goal_deadline = *deadline;
                self.store.save_profile(owner_id, &profile).await?;

                Ok(ExecutionOutcome::done(
                    format!("Goal created: {} ({}{}).", name, money(symbol, *amount), deadline_suffix(*deadline)),
                    json!({ "goalId": goal.id }),
                ))
            }
            Action::SellItem { item_name, price } => {
                let items = self.store.list_inventory(owner_id).await?;
                let Some(mut item) = items
                    .into_iter()
                    .find(|i| i.is_named(item_name) && i.status != ItemStatus::Sold)
                else {
                    return Ok(ExecutionOutcome::failed(format!(
                        "I couldn't find an item named {item_name} in your inventory."
                    )));
                };
                item.status = ItemStatus::Listed;
                item.asking_price = *price;
                item.updated_at = Utc::now();
                self.store.save_inventory_item(&item).await?;

                let message = match price {
                    Some(p) => format!("Listed {} for sale at {}.", item.name, money(symbol, *p)),
                    None => format!("Marked {} as for sale.", item.name),
                };
                Ok(ExecutionOutcome::done(message, json!({ "itemId": item.id })))
            }
            Action::LogEnergy { .. } => Ok(ExecutionOutcome::failed(
                "Energy logging is not implemented yet, so nothing was recorded.",
            )),
        }
    }

    /// Owner's live subscription with this name, ignoring case.
    async fn find_subscription(&self, owner_id: &str, name: &str) -> Result<Option<Subscription>, StoreError> {
        let subs = self.store.list_subscriptions(owner_id).await?;
        Ok(subs
            .into_iter()
            .find(|s| s.is_named(name) && s.status != SubscriptionStatus::Cancelled))
    }
}

fn not_found_subscription(name: &str) -> ExecutionOutcome {
    ExecutionOutcome::failed(format!("I couldn't find a subscription named {name}."))
}

fn budget_outcome(kind: &str, amount: Decimal, profile: &ProfileDraft) -> ExecutionOutcome {
    let symbol = profile.currency_symbol();
    let mut message = format!("Monthly {kind} updated to {}.", money(symbol, amount));
    if let (Some(income), Some(expenses)) = (profile.income, profile.expenses) {
        message.push_str(&format!(" That leaves {} a month.", money(symbol, income - expenses)));
    }
    ExecutionOutcome::done(message, json!({ "field": kind, "amount": amount }))
}

fn verb(id: ActionId) -> &'static str {
    match id {
        ActionId::PauseSubscription => "pause that subscription",
        ActionId::CancelSubscription => "cancel that subscription",
        ActionId::AddSubscription => "add that subscription",
        ActionId::UpdateIncome => "update your income",
        ActionId::UpdateExpenses => "update your expenses",
        ActionId::CreateGoal => "create that goal",
        ActionId::SellItem => "list that item",
        ActionId::LogEnergy => "log your energy",
    }
}

fn months_word(n: u32) -> &'static str {
    if n == 1 { "month" } else { "months" }
}

fn deadline_suffix(deadline: Option<NaiveDate>) -> String {
    deadline
        .map(|d| format!(" by {}", d.format("%B %-d, %Y")))
        .unwrap_or_default()
}

/// `€12` for whole amounts, `€40.47` otherwise, `-€50` when negative.
fn money(symbol: &str, amount: Decimal) -> String {
    let amount = amount.round_dp(2);
    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    let amount = amount.abs();
    if amount.fract().is_zero() {
        format!("{sign}{symbol}{}", amount.trunc())
    } else {
        format!("{sign}{symbol}{amount:.2}")
    }
}
