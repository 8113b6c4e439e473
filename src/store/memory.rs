//! In-process `Store` used by the CLI and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::onboarding::ProfileDraft;
use crate::store::model::{Goal, InventoryItem, Subscription};
use crate::store::traits::Store;

/// Map-backed store. Records are kept in insertion order per kind.
#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<String, ProfileDraft>>,
    subscriptions: RwLock<Vec<Subscription>>,
    goals: RwLock<Vec<Goal>>,
    inventory: RwLock<Vec<InventoryItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_profile(&self, owner_id: &str) -> Result<Option<ProfileDraft>, StoreError> {
        Ok(self.profiles.read().await.get(owner_id).cloned())
    }

    async fn save_profile(&self, owner_id: &str, profile: &ProfileDraft) -> Result<(), StoreError> {
        self.profiles
            .write()
            .await
            .insert(owner_id.to_string(), profile.clone());
        Ok(())
    }

    async fn list_subscriptions(&self, owner_id: &str) -> Result<Vec<Subscription>, StoreError> {
        let subs = self.subscriptions.read().await;
        Ok(subs.iter().filter(|s| s.owner_id == owner_id).cloned().collect())
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<(), StoreError> {
        let mut subs = self.subscriptions.write().await;
        match subs.iter_mut().find(|s| s.id == subscription.id) {
            Some(existing) => *existing = subscription.clone(),
            None => subs.push(subscription.clone()),
        }
        Ok(())
    }

    async fn list_goals(&self, owner_id: &str) -> Result<Vec<Goal>, StoreError> {
        let goals = self.goals.read().await;
        Ok(goals.iter().filter(|g| g.owner_id == owner_id).cloned().collect())
    }

    async fn save_goal(&self, goal: &Goal) -> Result<(), StoreError> {
        let mut goals = self.goals.write().await;
        if goals.iter().any(|g| g.id == goal.id) {
            return Err(StoreError::Constraint(format!("goal {} already exists", goal.id)));
        }
        goals.push(goal.clone());
        Ok(())
    }

    async fn list_inventory(&self, owner_id: &str) -> Result<Vec<InventoryItem>, StoreError> {
        let items = self.inventory.read().await;
        Ok(items.iter().filter(|i| i.owner_id == owner_id).cloned().collect())
    }

    async fn save_inventory_item(&self, item: &InventoryItem) -> Result<(), StoreError> {
        let mut items = self.inventory.write().await;
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::model::SubscriptionStatus;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn subscriptions_are_scoped_to_owner() {
        let store = MemoryStore::new();
        store
            .save_subscription(&Subscription::new("alice", "Netflix", dec!(13.49)))
            .await
            .unwrap();
        store
            .save_subscription(&Subscription::new("bob", "Spotify", dec!(10.99)))
            .await
            .unwrap();

        let alice = store.list_subscriptions("alice").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].name, "Netflix");
        assert!(store.list_subscriptions("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_replaces_by_id() {
        let store = MemoryStore::new();
        let mut sub = Subscription::new("alice", "Gym", dec!(30));
        store.save_subscription(&sub).await.unwrap();
        sub.status = SubscriptionStatus::Paused;
        sub.paused_months = Some(2);
        store.save_subscription(&sub).await.unwrap();

        let subs = store.list_subscriptions("alice").await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, SubscriptionStatus::Paused);
    }

    #[tokio::test]
    async fn duplicate_goal_is_a_constraint_error() {
        let store = MemoryStore::new();
        let goal = Goal::new("alice", "Laptop", dec!(1200), None);
        store.save_goal(&goal).await.unwrap();
        assert!(matches!(store.save_goal(&goal).await, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn profile_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get_profile("alice").await.unwrap().is_none());
        let profile = ProfileDraft {
            city: Some("Lyon".into()),
            ..Default::default()
        };
        store.save_profile("alice", &profile).await.unwrap();
        assert_eq!(store.get_profile("alice").await.unwrap(), Some(profile));
    }
}
