//! Pool Ledger
//!
//! Per-user, per-local-day record of consumed XP and the award frozen onto each
//! completed quest.
//!
//! ## Lifecycle
//!
//! - Uninitialized -> Active: first `open` for the key; the cap is fixed then
//! - Active -> Active: `consume`/`commit` add at most `cap - consumed`
//! - Active -> Frozen: day rolled over (`freeze_stale`) or `archive`; irreversible
//!
//! ## Locking
//!
//! Each `(user, local date)` key owns an async mutex. Award computation, the
//! caller's commit hook and the write of `consumed` all happen under that lock,
//! so two concurrent completions can never read the same remainder. The registry
//! of keys is a plain mutex that is only held long enough to fetch a handle.

use crate::types::{QuestId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Ledger key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolKey {
    pub user_id: UserId,
    pub local_date: NaiveDate,
}

impl PoolKey {
    pub fn new(user_id: UserId, local_date: NaiveDate) -> Self {
        Self {
            user_id,
            local_date,
        }
    }
}

impl std::fmt::Display for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.user_id, self.local_date)
    }
}

/// Pool lifecycle state (Uninitialized is the absence of a pool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    Active,
    Frozen,
}

/// One user's XP budget for one local day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPool {
    pub user_id: UserId,
    pub local_date: NaiveDate,
    pub cap: u64,
    pub consumed: u64,
    pub state: PoolState,
    /// Award frozen onto each completed quest
    #[serde(default)]
    pub awards: BTreeMap<QuestId, u64>,
    pub opened_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_at: Option<DateTime<Utc>>,
}

impl DailyPool {
    pub fn new(key: PoolKey, cap: u64) -> Self {
        Self {
            user_id: key.user_id,
            local_date: key.local_date,
            cap,
            consumed: 0,
            state: PoolState::Active,
            awards: BTreeMap::new(),
            opened_at: Utc::now(),
            frozen_at: None,
        }
    }

    pub fn key(&self) -> PoolKey {
        PoolKey::new(self.user_id.clone(), self.local_date)
    }

    pub fn remaining(&self) -> u64 {
        self.cap.saturating_sub(self.consumed)
    }

    /// Share of the cap already consumed (0-100)
    pub fn percentage_used(&self) -> f64 {
        if self.cap == 0 {
            return 100.0;
        }
        (self.consumed as f64 / self.cap as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn is_frozen(&self) -> bool {
        self.state == PoolState::Frozen
    }

    pub fn awarded(&self, quest_id: &QuestId) -> Option<u64> {
        self.awards.get(quest_id).copied()
    }

    /// `consumed` equals the sum of awards and never exceeds the cap
    pub fn is_consistent(&self) -> bool {
        let awarded: u128 = self.awards.values().map(|v| *v as u128).sum();
        awarded == self.consumed as u128 && self.consumed <= self.cap
    }

    fn freeze(&mut self) -> bool {
        if self.is_frozen() {
            return false;
        }
        self.state = PoolState::Frozen;
        self.frozen_at = Some(Utc::now());
        true
    }
}

/// What the ledger did with a consume request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsumeOutcome {
    /// Award recorded; `amount < requested` when clamped to the cap
    Granted { amount: u64, requested: u64 },
    /// Nothing left in the pool; a zero award was recorded
    Exhausted { requested: u64 },
    /// Quest already holds an award; nothing changed
    AlreadyAwarded { amount: u64 },
    /// Pool is frozen; nothing changed
    Frozen,
}

impl ConsumeOutcome {
    /// XP this call actually granted
    pub fn amount(&self) -> u64 {
        match self {
            ConsumeOutcome::Granted { amount, .. } => *amount,
            _ => 0,
        }
    }

    pub fn was_clamped(&self) -> bool {
        matches!(self, ConsumeOutcome::Granted { amount, requested } if amount < requested)
    }

    /// Whether an award was written by this call
    pub fn recorded(&self) -> bool {
        matches!(self, ConsumeOutcome::Granted { .. } | ConsumeOutcome::Exhausted { .. })
    }
}

/// Result of a committed consume
#[derive(Debug, Clone)]
pub struct LedgerCommit<T> {
    pub outcome: ConsumeOutcome,
    /// Pool after the operation
    pub pool: DailyPool,
    /// Value returned by the commit hook, when it ran
    pub committed: Option<T>,
}

/// Lock handle for one day's pool
#[derive(Debug, Clone)]
pub struct PoolHandle {
    inner: Arc<tokio::sync::Mutex<DailyPool>>,
}

impl PoolHandle {
    fn new(pool: DailyPool) -> Self {
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(pool)),
        }
    }

    pub async fn snapshot(&self) -> DailyPool {
        self.inner.lock().await.clone()
    }

    /// Consume `amount` for `quest_id`, clamped to what is left
    pub async fn consume(&self, quest_id: &QuestId, amount: u64) -> ConsumeOutcome {
        let result: Result<LedgerCommit<()>, std::convert::Infallible> = self
            .commit(quest_id, |_| amount, |_| Ok(()))
            .await;
        match result {
            Ok(commit) => commit.outcome,
            Err(never) => match never {},
        }
    }

    /// Compute, persist and record an award as one critical section
    ///
    /// `compute` sees the pool exactly as it is before this completion. `persist`
    /// receives the clamped award; if it fails the pool is left untouched and the
    /// error is returned. Frozen pools and already-awarded quests skip both closures.
    pub async fn commit<T, E>(
        &self,
        quest_id: &QuestId,
        compute: impl FnOnce(&DailyPool) -> u64,
        persist: impl FnOnce(u64) -> Result<T, E>,
    ) -> Result<LedgerCommit<T>, E> {
        let mut pool = self.inner.lock().await;

        if let Some(amount) = pool.awarded(quest_id) {
            debug!("Quest {} already awarded {} XP on {}", quest_id, amount, pool.key());
            return Ok(LedgerCommit {
                outcome: ConsumeOutcome::AlreadyAwarded { amount },
                pool: pool.clone(),
                committed: None,
            });
        }

        if pool.is_frozen() {
            warn!(
                "Completion of {} against frozen pool {} ignored",
                quest_id,
                pool.key()
            );
            return Ok(LedgerCommit {
                outcome: ConsumeOutcome::Frozen,
                pool: pool.clone(),
                committed: None,
            });
        }

        let requested = compute(&pool);
        let remaining = pool.remaining();
        let amount = requested.min(remaining);

        let committed = persist(amount)?;

        pool.consumed += amount;
        pool.awards.insert(quest_id.clone(), amount);
        debug_assert!(pool.is_consistent());

        let outcome = if remaining == 0 {
            ConsumeOutcome::Exhausted { requested }
        } else {
            ConsumeOutcome::Granted { amount, requested }
        };
        debug!(
            "Pool {}: {} XP to {} (requested {}, {}/{} consumed)",
            pool.key(),
            amount,
            quest_id,
            requested,
            pool.consumed,
            pool.cap
        );

        Ok(LedgerCommit {
            outcome,
            pool: pool.clone(),
            committed: Some(committed),
        })
    }

    /// Raise the cap of an active pool; lower values are ignored
    pub async fn raise_cap(&self, new_cap: u64) -> bool {
        let mut pool = self.inner.lock().await;
        if pool.is_frozen() || new_cap <= pool.cap {
            return false;
        }
        debug!("Pool {} cap raised {} -> {}", pool.key(), pool.cap, new_cap);
        pool.cap = new_cap;
        true
    }

    /// Freeze the pool; returns false if it already was
    pub async fn freeze(&self) -> bool {
        self.inner.lock().await.freeze()
    }
}

/// Keyed store of daily pools
#[derive(Debug, Default)]
pub struct PoolLedger {
    pools: Mutex<HashMap<PoolKey, PoolHandle>>,
}

impl PoolLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<PoolKey, PoolHandle>> {
        self.pools.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get the pool for `key`, creating it with `cap` if it does not exist yet
    ///
    /// `cap` is ignored for an existing pool.
    pub fn open(&self, key: &PoolKey, cap: u64) -> PoolHandle {
        self.registry()
            .entry(key.clone())
            .or_insert_with(|| {
                debug!("Opening pool {} with cap {}", key, cap);
                PoolHandle::new(DailyPool::new(key.clone(), cap))
            })
            .clone()
    }

    /// Existing pool for `key`, without creating one
    pub fn get(&self, key: &PoolKey) -> Option<PoolHandle> {
        self.registry().get(key).cloned()
    }

    pub async fn snapshot(&self, key: &PoolKey) -> Option<DailyPool> {
        match self.get(key) {
            Some(handle) => Some(handle.snapshot().await),
            None => None,
        }
    }

    /// Freeze every pool of `user_id` dated before `today`
    ///
    /// Returns the number of pools that changed state.
    pub async fn freeze_stale(&self, user_id: &UserId, today: NaiveDate) -> usize {
        let stale: Vec<PoolHandle> = self
            .registry()
            .iter()
            .filter(|(key, _)| &key.user_id == user_id && key.local_date < today)
            .map(|(_, handle)| handle.clone())
            .collect();

        let mut frozen = 0;
        for handle in stale {
            if handle.freeze().await {
                frozen += 1;
            }
        }
        if frozen > 0 {
            debug!("Froze {} stale pool(s) for {}", frozen, user_id);
        }
        frozen
    }

    /// Explicitly archive a pool; returns false if missing or already frozen
    pub async fn archive(&self, key: &PoolKey) -> bool {
        match self.get(key) {
            Some(handle) => handle.freeze().await,
            None => false,
        }
    }

    /// Drop `user`'s frozen pools dated before `before`
    pub async fn prune_frozen(&self, user: &UserId, before: NaiveDate) -> usize {
        let candidates: Vec<(PoolKey, PoolHandle)> = self
            .registry()
            .iter()
            .filter(|(key, _)| &key.user_id == user && key.local_date < before)
            .map(|(key, handle)| (key.clone(), handle.clone()))
            .collect();

        let mut removable = Vec::new();
        for (key, handle) in candidates {
            if handle.snapshot().await.is_frozen() {
                removable.push(key);
            }
        }

        let mut registry = self.registry();
        for key in &removable {
            registry.remove(key);
        }
        removable.len()
    }

    /// Copy of every pool, sorted by user then date
    pub async fn snapshot_all(&self) -> Vec<DailyPool> {
        let handles: Vec<PoolHandle> = self.registry().values().cloned().collect();
        let mut pools = Vec::with_capacity(handles.len());
        for handle in handles {
            pools.push(handle.snapshot().await);
        }
        pools.sort_by(|a, b| a.key().cmp(&b.key()));
        pools
    }

    /// Load previously persisted pools, replacing any with the same key
    pub fn restore(&self, pools: impl IntoIterator<Item = DailyPool>) -> usize {
        let mut registry = self.registry();
        let mut count = 0;
        for pool in pools {
            if !pool.is_consistent() {
                warn!("Restoring inconsistent pool {} as-is", pool.key());
            }
            registry.insert(pool.key(), PoolHandle::new(pool));
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(user: &str, day: u32) -> PoolKey {
        PoolKey::new(
            UserId::from(user),
            NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_open_is_lazy_and_fixes_cap() {
        let ledger = PoolLedger::new();
        assert!(ledger.is_empty());

        let handle = ledger.open(&key("ada", 1), 500);
        assert_eq!(ledger.len(), 1);

        // Second open keeps the original cap
        ledger.open(&key("ada", 1), 9_999);
        let pool = handle.snapshot().await;
        assert_eq!(pool.cap, 500);
        assert_eq!(pool.state, PoolState::Active);
    }

    #[tokio::test]
    async fn test_consume_clamps_to_cap() {
        let ledger = PoolLedger::new();
        let handle = ledger.open(&key("ada", 1), 100);

        let outcome = handle.consume(&QuestId::from("a"), 80).await;
        assert_eq!(outcome, ConsumeOutcome::Granted { amount: 80, requested: 80 });

        let outcome = handle.consume(&QuestId::from("b"), 50).await;
        assert_eq!(outcome, ConsumeOutcome::Granted { amount: 20, requested: 50 });
        assert!(outcome.was_clamped());

        let pool = handle.snapshot().await;
        assert_eq!(pool.consumed, 100);
        assert!(pool.is_consistent());
    }

    #[tokio::test]
    async fn test_exhausted_records_zero_award() {
        let ledger = PoolLedger::new();
        let handle = ledger.open(&key("ada", 1), 10);
        handle.consume(&QuestId::from("a"), 10).await;

        let outcome = handle.consume(&QuestId::from("b"), 5).await;
        assert_eq!(outcome, ConsumeOutcome::Exhausted { requested: 5 });
        assert_eq!(outcome.amount(), 0);

        let pool = handle.snapshot().await;
        assert_eq!(pool.awarded(&QuestId::from("b")), Some(0));
    }

    #[tokio::test]
    async fn test_award_never_revoked() {
        let ledger = PoolLedger::new();
        let handle = ledger.open(&key("ada", 1), 100);
        handle.consume(&QuestId::from("a"), 40).await;

        let outcome = handle.consume(&QuestId::from("a"), 60).await;
        assert_eq!(outcome, ConsumeOutcome::AlreadyAwarded { amount: 40 });

        let pool = handle.snapshot().await;
        assert_eq!(pool.awarded(&QuestId::from("a")), Some(40));
        assert_eq!(pool.consumed, 40);
    }

    #[tokio::test]
    async fn test_frozen_pool_rejects_consume() {
        let ledger = PoolLedger::new();
        let handle = ledger.open(&key("ada", 1), 100);
        assert!(ledger.archive(&key("ada", 1)).await);
        assert!(!ledger.archive(&key("ada", 1)).await);

        let outcome = handle.consume(&QuestId::from("a"), 10).await;
        assert_eq!(outcome, ConsumeOutcome::Frozen);
        assert_eq!(handle.snapshot().await.consumed, 0);
        assert!(!handle.raise_cap(1_000).await);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_pool_untouched() {
        let ledger = PoolLedger::new();
        let handle = ledger.open(&key("ada", 1), 100);

        let result: Result<LedgerCommit<()>, String> = handle
            .commit(&QuestId::from("a"), |_| 30, |_| Err("disk full".to_string()))
            .await;
        assert!(result.is_err());

        let pool = handle.snapshot().await;
        assert_eq!(pool.consumed, 0);
        assert!(pool.awards.is_empty());
    }

    #[tokio::test]
    async fn test_compute_sees_prior_state() {
        let ledger = PoolLedger::new();
        let handle = ledger.open(&key("ada", 1), 100);
        handle.consume(&QuestId::from("a"), 60).await;

        let commit: Result<LedgerCommit<u64>, String> = handle
            .commit(&QuestId::from("b"), |pool| pool.remaining() / 2, Ok)
            .await;
        let commit = commit.unwrap();
        assert_eq!(commit.outcome.amount(), 20);
        assert_eq!(commit.committed, Some(20));
        assert_eq!(commit.pool.consumed, 80);
    }

    #[tokio::test]
    async fn test_freeze_stale_only_past_days_of_user() {
        let ledger = PoolLedger::new();
        ledger.open(&key("ada", 1), 100);
        ledger.open(&key("ada", 2), 100);
        ledger.open(&key("bob", 1), 100);

        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(ledger.freeze_stale(&UserId::from("ada"), today).await, 1);
        assert_eq!(ledger.freeze_stale(&UserId::from("ada"), today).await, 0);

        assert!(ledger.snapshot(&key("ada", 1)).await.unwrap().is_frozen());
        assert!(!ledger.snapshot(&key("ada", 2)).await.unwrap().is_frozen());
        assert!(!ledger.snapshot(&key("bob", 1)).await.unwrap().is_frozen());
    }

    #[tokio::test]
    async fn test_raise_cap_only_up() {
        let ledger = PoolLedger::new();
        let handle = ledger.open(&key("ada", 1), 100);
        assert!(!handle.raise_cap(50).await);
        assert!(handle.raise_cap(230).await);
        assert_eq!(handle.snapshot().await.cap, 230);
    }

    #[tokio::test]
    async fn test_prune_frozen() {
        let ledger = PoolLedger::new();
        ledger.open(&key("ada", 1), 100);
        ledger.open(&key("ada", 2), 100);
        ledger.open(&key("ada", 3), 100);
        ledger.open(&key("bob", 1), 100);
        ledger.archive(&key("ada", 1)).await;
        ledger.archive(&key("bob", 1)).await;

        // Day 2 is still active and survives; bob's pools are not ada's to prune
        let cutoff = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        assert_eq!(ledger.prune_frozen(&UserId::from("ada"), cutoff).await, 1);
        assert_eq!(ledger.len(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_restore() {
        let ledger = PoolLedger::new();
        let handle = ledger.open(&key("ada", 1), 100);
        handle.consume(&QuestId::from("a"), 25).await;

        let pools = ledger.snapshot_all().await;
        let json = serde_json::to_string(&pools).unwrap();
        let restored: Vec<DailyPool> = serde_json::from_str(&json).unwrap();

        let other = PoolLedger::new();
        assert_eq!(other.restore(restored), 1);
        let pool = other.snapshot(&key("ada", 1)).await.unwrap();
        assert_eq!(pool.consumed, 25);
        assert_eq!(pool.awarded(&QuestId::from("a")), Some(25));
    }

    #[test]
    fn test_percentage_used() {
        let mut pool = DailyPool::new(key("ada", 1), 200);
        assert_eq!(pool.percentage_used(), 0.0);
        pool.consumed = 50;
        assert_eq!(pool.percentage_used(), 25.0);

        let empty = DailyPool::new(key("ada", 1), 0);
        assert_eq!(empty.percentage_used(), 100.0);
    }
}
