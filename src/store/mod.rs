//! Persistence collaborator: the `Store` trait, its records, and an
//! in-memory backend.

pub mod memory;
pub mod model;
pub mod traits;

pub use memory::MemoryStore;
pub use model::{Goal, InventoryItem, ItemStatus, Subscription, SubscriptionStatus};
pub use traits::Store;

use rust_decimal::Decimal;
use tracing::info;

use crate::error::StoreError;
use crate::onboarding::ProfileDraft;

/// Persist a finished onboarding draft and create the records it names.
///
/// Subscriptions and inventory items already stored under the same name are
/// left alone. Subscription costs are unknown at this point and start at
/// zero.
pub async fn import_profile(store: &dyn Store, owner_id: &str, draft: &ProfileDraft) -> Result<(), StoreError> {
    store.save_profile(owner_id, draft).await?;

    let existing = store.list_subscriptions(owner_id).await?;
    let mut added_subscriptions = 0usize;
    for name in draft.subscriptions.iter().flatten() {
        if existing.iter().any(|s| s.is_named(name)) {
            continue;
        }
        store
            .save_subscription(&Subscription::new(owner_id, name, Decimal::ZERO))
            .await?;
        added_subscriptions += 1;
    }

    let existing = store.list_inventory(owner_id).await?;
    let mut added_items = 0usize;
    for name in draft.inventory_items.iter().flatten() {
        if existing.iter().any(|i| i.is_named(name)) {
            continue;
        }
        store.save_inventory_item(&InventoryItem::new(owner_id, name)).await?;
        added_items += 1;
    }

    info!(owner_id, added_subscriptions, added_items, "Imported onboarding profile");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn import_creates_named_records_once() {
        let store = MemoryStore::new();
        let draft = ProfileDraft {
            subscriptions: Some(vec!["Netflix".into(), "Gym".into()]),
            inventory_items: Some(vec!["old bike".into()]),
            ..Default::default()
        };
        import_profile(&store, "alice", &draft).await.unwrap();
        import_profile(&store, "alice", &draft).await.unwrap();

        assert_eq!(store.list_subscriptions("alice").await.unwrap().len(), 2);
        assert_eq!(store.list_inventory("alice").await.unwrap().len(), 1);
        assert_eq!(store.get_profile("alice").await.unwrap(), Some(draft));
    }
}
