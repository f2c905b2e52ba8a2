//! Daily system-stats snapshots.

use std::sync::Arc;

use chrono::Utc;
use sage_store::{Store, SystemStats};

use crate::error::Result;

/// Aggregate counters, snapshotted once per calendar day.
pub struct StatsService<S> {
    store: Arc<S>,
}

impl<S: Store> StatsService<S> {
    /// Create a stats service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Recompute today's snapshot and upsert it.
    ///
    /// Running this any number of times per day leaves exactly one row
    /// for the date.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn update_system_stats(&self) -> Result<SystemStats> {
        let stats = SystemStats {
            date: Utc::now().date_naive(),
            total_users: self.store.count_active_users()?,
            total_ais: self.store.count_active_ais()?,
            total_messages: self.store.count_all_messages()?,
        };
        self.store.put_system_stats(&stats)?;

        tracing::info!(
            date = %stats.date,
            total_users = stats.total_users,
            total_ais = stats.total_ais,
            total_messages = stats.total_messages,
            "Updated system stats"
        );

        Ok(stats)
    }

    /// Get the most recent snapshot, if any exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_system_stats(&self) -> Result<Option<SystemStats>> {
        Ok(self.store.latest_system_stats()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sage_core::UserId;
    use sage_store::{RocksStore, SubscriptionType, User};
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Arc<RocksStore>, StatsService<RocksStore>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let service = StatsService::new(Arc::clone(&store));
        (dir, store, service)
    }

    fn user(active: bool) -> User {
        let now = Utc::now();
        let user_id = UserId::generate();
        User {
            user_id,
            email: format!("{user_id}@example.com"),
            name: "Ann".to_string(),
            email_hash: "abcdefabcdef".to_string(),
            subscription: SubscriptionType::Free,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn counts_only_active_rows() {
        let (_dir, store, service) = fixture();

        store.insert_user(&user(true)).unwrap();
        store.insert_user(&user(true)).unwrap();
        store.insert_user(&user(false)).unwrap();

        let stats = service.update_system_stats().await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_ais, 0);
        assert_eq!(stats.total_messages, 0);
    }

    #[tokio::test]
    async fn same_day_updates_collapse_to_one_row() {
        let (_dir, store, service) = fixture();

        store.insert_user(&user(true)).unwrap();
        service.update_system_stats().await.unwrap();

        store.insert_user(&user(true)).unwrap();
        let second = service.update_system_stats().await.unwrap();
        assert_eq!(second.total_users, 2);

        // The latest row reflects the second run, not a duplicate
        let latest = service.get_system_stats().await.unwrap().unwrap();
        assert_eq!(latest.total_users, 2);
        assert_eq!(latest.date, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn latest_snapshot_wins_over_older_dates() {
        let (_dir, store, service) = fixture();

        let yesterday = SystemStats {
            date: (Utc::now() - Duration::days(1)).date_naive(),
            total_users: 99,
            total_ais: 9,
            total_messages: 999,
        };
        store.put_system_stats(&yesterday).unwrap();

        let today = service.update_system_stats().await.unwrap();
        let latest = service.get_system_stats().await.unwrap().unwrap();
        assert_eq!(latest.date, today.date);
        assert_eq!(latest.total_users, 0);
    }

    #[tokio::test]
    async fn empty_store_has_no_stats() {
        let (_dir, _store, service) = fixture();
        assert!(service.get_system_stats().await.unwrap().is_none());
    }
}
