//! External collaborators
//!
//! The engine does not own quests, users or time. These traits describe what it
//! needs from each; in-memory implementations back the CLI and the tests.

use crate::error::{EngineError, Result};
use crate::types::{QuestId, QuestInstance, UserId, UserProfile};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

/// Source of quest instances
pub trait QuestStore: Send + Sync {
    /// Quests scheduled for `user` on the local `date`
    fn quests_for_day(&self, user: &UserId, date: NaiveDate) -> Result<Vec<QuestInstance>>;

    /// Look a quest up by id, whatever day it belongs to
    fn find_quest(&self, user: &UserId, quest: &QuestId) -> Result<Option<QuestInstance>>;
}

/// Source of user totals and timezones
pub trait UserStore: Send + Sync {
    fn profile(&self, user: &UserId) -> Result<Option<UserProfile>>;

    /// Add `amount` to the user's total XP and return the new total
    ///
    /// Called inside the pool's critical section; an error aborts the completion.
    fn credit_xp(&self, user: &UserId, amount: u64) -> Result<u64>;
}

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Local calendar date for a UTC instant and a UTC offset in minutes
///
/// Returns `None` when the offset is out of range.
pub fn local_date(now: DateTime<Utc>, utc_offset_minutes: i32) -> Option<NaiveDate> {
    let offset = FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;
    Some(now.with_timezone(&offset).date_naive())
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulations
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Quest store held in memory
#[derive(Debug, Default)]
pub struct InMemoryQuestStore {
    quests: RwLock<BTreeMap<UserId, Vec<QuestInstance>>>,
}

impl InMemoryQuestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_quests(quests: BTreeMap<UserId, Vec<QuestInstance>>) -> Self {
        Self {
            quests: RwLock::new(quests),
        }
    }

    /// Add a quest, replacing any quest with the same id for that user
    pub fn add_quest(&self, user: &UserId, quest: QuestInstance) {
        let mut quests = self.quests.write().unwrap_or_else(|p| p.into_inner());
        let list = quests.entry(user.clone()).or_default();
        list.retain(|q| q.id != quest.id);
        list.push(quest);
    }

    /// Flag a quest as completed; returns false if unknown
    pub fn mark_completed(&self, user: &UserId, quest: &QuestId) -> bool {
        let mut quests = self.quests.write().unwrap_or_else(|p| p.into_inner());
        match quests
            .get_mut(user)
            .and_then(|list| list.iter_mut().find(|q| &q.id == quest))
        {
            Some(q) => {
                q.completed = true;
                true
            }
            None => false,
        }
    }

    pub fn export(&self) -> BTreeMap<UserId, Vec<QuestInstance>> {
        self.quests.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl QuestStore for InMemoryQuestStore {
    fn quests_for_day(&self, user: &UserId, date: NaiveDate) -> Result<Vec<QuestInstance>> {
        let quests = self.quests.read().unwrap_or_else(|p| p.into_inner());
        Ok(quests
            .get(user)
            .map(|list| {
                list.iter()
                    .filter(|q| q.scheduled_for == date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn find_quest(&self, user: &UserId, quest: &QuestId) -> Result<Option<QuestInstance>> {
        let quests = self.quests.read().unwrap_or_else(|p| p.into_inner());
        Ok(quests
            .get(user)
            .and_then(|list| list.iter().find(|q| &q.id == quest).cloned()))
    }
}

/// User store held in memory
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<BTreeMap<UserId, UserProfile>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles(users: BTreeMap<UserId, UserProfile>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    pub fn insert(&self, user: UserId, profile: UserProfile) {
        self.users
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(user, profile);
    }

    pub fn export(&self) -> BTreeMap<UserId, UserProfile> {
        self.users.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl UserStore for InMemoryUserStore {
    fn profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(user)
            .copied())
    }

    fn credit_xp(&self, user: &UserId, amount: u64) -> Result<u64> {
        let mut users = self.users.write().unwrap_or_else(|p| p.into_inner());
        let profile = users
            .get_mut(user)
            .ok_or_else(|| EngineError::UnknownUser(user.clone()))?;
        profile.total_xp = profile.total_xp.saturating_add(amount);
        Ok(profile.total_xp)
    }
}
