//! Per-game import leases
//!
//! Two imports into the same (name, date) game must not interleave their
//! check and commit steps, or both could see "no game yet" or compute
//! duplicates against a stale shot set. A lease is an owned async mutex
//! guard keyed by the normalized game name and date.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::GameTarget;

type LeaseKey = (String, String);

/// Registry of per-game locks, cloneable and shared between coordinators
#[derive(Clone, Default)]
pub struct GameLeases {
    slots: Arc<Mutex<HashMap<LeaseKey, Arc<AsyncMutex<()>>>>>,
}

/// Exclusive right to check and commit into one game; released on drop
#[derive(Debug)]
pub struct GameLease {
    key: LeaseKey,
    _guard: OwnedMutexGuard<()>,
}

impl GameLease {
    pub fn key(&self) -> (&str, &str) {
        (&self.key.0, &self.key.1)
    }
}

impl GameLeases {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &LeaseKey) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());

        // Drop slots nobody holds or waits on
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);

        slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for the lease on `target`'s game
    pub async fn acquire(&self, target: &GameTarget) -> GameLease {
        let key = target.lease_key();
        let slot = self.slot(&key);

        if slot.try_lock().is_err() {
            tracing::debug!(game = %key.0, date = %key.1, "Waiting for concurrent import of the same game");
        }

        let guard = slot.lock_owned().await;
        GameLease { key, _guard: guard }
    }

    /// Take the lease only if nobody else holds it
    pub fn try_acquire(&self, target: &GameTarget) -> Option<GameLease> {
        let key = target.lease_key();
        let guard = self.slot(&key).try_lock_owned().ok()?;
        Some(GameLease { key, _guard: guard })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_game_is_exclusive() {
        let leases = GameLeases::new();
        let target = GameTarget::new("Team A vs Team B", "2024-01-01");

        let lease = leases.acquire(&target).await;
        let same_game = GameTarget::new("  team a vs team b", "2024-01-01");
        assert!(leases.try_acquire(&same_game).is_none());

        drop(lease);
        assert!(leases.try_acquire(&same_game).is_some());
    }

    #[tokio::test]
    async fn test_different_games_do_not_block() {
        let leases = GameLeases::new();
        let _a = leases.acquire(&GameTarget::new("A vs B", "2024-01-01")).await;

        assert!(leases.try_acquire(&GameTarget::new("A vs B", "2024-01-02")).is_some());
        assert!(leases.try_acquire(&GameTarget::new("C vs D", "2024-01-01")).is_some());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let leases = GameLeases::new();
        let target = GameTarget::new("A vs B", "2024-01-01");
        let first = leases.acquire(&target).await;

        let waiter = {
            let leases = leases.clone();
            let target = target.clone();
            tokio::spawn(async move {
                let lease = leases.acquire(&target).await;
                lease.key().0.to_string()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        let key = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(key, "a vs b");
    }
}
