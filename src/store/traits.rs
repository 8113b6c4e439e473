//! `Store` trait: the narrow persistence interface used by the action
//! executor. Profiles and domain records live behind it; the pipeline itself
//! never writes.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::onboarding::ProfileDraft;
use crate::store::model::{Goal, InventoryItem, Subscription};

/// Backend-agnostic store for one owner's profile and records.
#[async_trait]
pub trait Store: Send + Sync {
    // ── Profile ─────────────────────────────────────────────────────

    /// Get the stored profile for an owner.
    async fn get_profile(&self, owner_id: &str) -> Result<Option<ProfileDraft>, StoreError>;

    /// Replace the stored profile for an owner.
    async fn save_profile(&self, owner_id: &str, profile: &ProfileDraft) -> Result<(), StoreError>;

    // ── Subscriptions ───────────────────────────────────────────────

    /// All subscriptions belonging to an owner, oldest first.
    async fn list_subscriptions(&self, owner_id: &str) -> Result<Vec<Subscription>, StoreError>;

    /// Insert a subscription, or replace the one with the same id.
    async fn save_subscription(&self, subscription: &Subscription) -> Result<(), StoreError>;

    // ── Goals ───────────────────────────────────────────────────────

    async fn list_goals(&self, owner_id: &str) -> Result<Vec<Goal>, StoreError>;

    async fn save_goal(&self, goal: &Goal) -> Result<(), StoreError>;

    // ── Inventory ───────────────────────────────────────────────────

    async fn list_inventory(&self, owner_id: &str) -> Result<Vec<InventoryItem>, StoreError>;

    /// Insert an item, or replace the one with the same id.
    async fn save_inventory_item(&self, item: &InventoryItem) -> Result<(), StoreError>;
}
