//! XP Engine
//!
//! Ties the level curve, the daily pool ledger and the allocator to the quest,
//! user and clock collaborators.
//!
//! ## Operations
//!
//! - `get_daily_pool_status`: today's cap, consumption and remainder
//! - `preview_rewards`: advisory XP for each incomplete quest, recomputed per call
//! - `complete_quest`: award, credit and freeze XP for one quest
//!
//! ## Outcomes
//!
//! Business rules never produce errors. An empty pool, a rolled-over day, an
//! invalid weight or a repeated completion each come back as a
//! `CompletionOutcome` with a deterministic award. `EngineError` is reserved for
//! unknown ids and collaborator failures.

use crate::award_log::{AwardLog, AwardRecord};
use crate::collaborators::{local_date, Clock, QuestStore, UserStore};
use crate::engine_config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pool::{
    award_for, daily_cap_for_total_xp, preview, ConsumeOutcome, DailyPool, PoolHandle, PoolKey,
    PoolLedger, PoolState, PotentialReward, QuestSlot,
};
use crate::progression::{check_level_up, LevelUpCheck, Rank};
use crate::types::{QuestId, QuestInstance, UserId, UserProfile};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Snapshot of one day's pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStatus {
    pub user_id: UserId,
    pub local_date: NaiveDate,
    pub cap: u64,
    pub consumed: u64,
    pub remaining: u64,
    pub percentage_used: f64,
    pub state: PoolState,
    pub limit_reached: bool,
    /// Advisory text when nothing is left
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PoolStatus {
    fn from_pool(pool: &DailyPool, limit_message: &str) -> Self {
        let remaining = pool.remaining();
        Self {
            user_id: pool.user_id.clone(),
            local_date: pool.local_date,
            cap: pool.cap,
            consumed: pool.consumed,
            remaining,
            percentage_used: pool.percentage_used(),
            state: pool.state,
            limit_reached: pool.is_exhausted(),
            message: pool.is_exhausted().then(|| limit_message.to_string()),
        }
    }
}

/// Advisory rewards for a user's incomplete quests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardPreviewSet {
    pub local_date: NaiveDate,
    pub remaining: u64,
    pub rewards: Vec<PotentialReward>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RewardPreviewSet {
    pub fn total_potential(&self) -> u64 {
        self.rewards.iter().map(|r| r.potential_xp).sum()
    }

    pub fn potential_for(&self, quest_id: &QuestId) -> Option<u64> {
        self.rewards
            .iter()
            .find(|r| &r.quest_id == quest_id)
            .map(|r| r.potential_xp)
    }
}

/// How a completion was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// Share of the remaining pool granted
    Awarded,
    /// Pool had nothing left; a zero award was frozen onto the quest
    PoolExhausted,
    /// Quest belongs to a day that has rolled over; nothing changed
    StaleLedger,
    /// Quest already holds an award; nothing changed
    AlreadyCompleted,
    /// Quest is scheduled for a later local day; nothing changed
    NotDueYet,
    /// Quest has a non-positive weight; a zero award was frozen onto it
    InvalidWeight,
}

impl CompletionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionOutcome::Awarded => "awarded",
            CompletionOutcome::PoolExhausted => "pool_exhausted",
            CompletionOutcome::StaleLedger => "stale_ledger",
            CompletionOutcome::AlreadyCompleted => "already_completed",
            CompletionOutcome::NotDueYet => "not_due_yet",
            CompletionOutcome::InvalidWeight => "invalid_weight",
        }
    }
}

impl std::fmt::Display for CompletionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of `complete_quest`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionResult {
    pub quest_id: QuestId,
    pub local_date: NaiveDate,
    pub outcome: CompletionOutcome,
    /// XP frozen onto the quest (for `AlreadyCompleted`, the earlier award)
    pub awarded_xp: u64,
    pub new_total_xp: u64,
    /// Present only when the award crossed a level threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_up: Option<LevelUpCheck>,
    /// Present only when the level-up crossed a rank boundary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_rank: Option<&'static Rank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CompletionResult {
    fn unchanged(
        quest_id: QuestId,
        local_date: NaiveDate,
        outcome: CompletionOutcome,
        awarded_xp: u64,
        total_xp: u64,
    ) -> Self {
        Self {
            quest_id,
            local_date,
            outcome,
            awarded_xp,
            new_total_xp: total_xp,
            level_up: None,
            new_rank: None,
            message: None,
        }
    }

    /// Whether this call changed the user's XP
    pub fn granted_xp(&self) -> bool {
        self.outcome == CompletionOutcome::Awarded && self.awarded_xp > 0
    }
}

/// Leveling and daily XP distribution engine
pub struct XpEngine {
    config: EngineConfig,
    quests: Arc<dyn QuestStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    ledger: Arc<PoolLedger>,
    award_log: Option<AwardLog>,
}

impl XpEngine {
    pub fn new(
        config: EngineConfig,
        quests: Arc<dyn QuestStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let award_log = config.audit.award_log.clone().map(AwardLog::with_path);
        Self {
            config,
            quests,
            users,
            clock,
            ledger: Arc::new(PoolLedger::new()),
            award_log,
        }
    }

    /// Share an existing ledger, e.g. one restored from disk
    pub fn with_ledger(mut self, ledger: Arc<PoolLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_award_log(mut self, log: AwardLog) -> Self {
        self.award_log = Some(log);
        self
    }

    pub fn ledger(&self) -> &Arc<PoolLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn award_log(&self) -> Option<&AwardLog> {
        self.award_log.as_ref()
    }

    fn profile(&self, user: &UserId) -> Result<UserProfile> {
        self.users
            .profile(user)?
            .ok_or_else(|| EngineError::UnknownUser(user.clone()))
    }

    /// The user's current local date
    fn today_for(&self, user: &UserId, profile: &UserProfile) -> NaiveDate {
        let now = self.clock.now();
        match local_date(now, profile.utc_offset_minutes) {
            Some(date) => date,
            None => {
                warn!(
                    "User {} has invalid UTC offset {} min, using default {}",
                    user, profile.utc_offset_minutes, self.config.users.default_utc_offset_minutes
                );
                local_date(now, self.config.users.default_utc_offset_minutes)
                    .unwrap_or_else(|| now.date_naive())
            }
        }
    }

    /// Current local date for `user`, freezing any pools from earlier days
    pub async fn today(&self, user: &UserId) -> Result<NaiveDate> {
        let profile = self.profile(user)?;
        let today = self.today_for(user, &profile);
        self.ledger.freeze_stale(user, today).await;
        Ok(today)
    }

    /// Today's pool, opened with the cap for the user's current level if new
    fn open_today(&self, user: &UserId, today: NaiveDate, profile: &UserProfile) -> PoolHandle {
        let key = PoolKey::new(user.clone(), today);
        self.ledger.open(&key, daily_cap_for_total_xp(profile.total_xp))
    }

    /// Cap, consumption and remainder of today's pool
    pub async fn get_daily_pool_status(&self, user: &UserId) -> Result<PoolStatus> {
        let profile = self.profile(user)?;
        let today = self.today_for(user, &profile);
        self.ledger.freeze_stale(user, today).await;

        let pool = self.open_today(user, today, &profile).snapshot().await;
        Ok(PoolStatus::from_pool(&pool, &self.config.pool.limit_message))
    }

    /// Status of the pool for a given day, if one was ever opened
    pub async fn pool_status_on(&self, user: &UserId, date: NaiveDate) -> Option<PoolStatus> {
        let key = PoolKey::new(user.clone(), date);
        self.ledger
            .snapshot(&key)
            .await
            .map(|pool| PoolStatus::from_pool(&pool, &self.config.pool.limit_message))
    }

    /// Potential XP for each incomplete quest in `quests`, against today's pool
    ///
    /// A quest counts as resolved once the ledger holds an award for it. Nothing is
    /// written apart from opening the day's pool.
    pub async fn preview_rewards(
        &self,
        user: &UserId,
        quests: &[QuestInstance],
    ) -> Result<RewardPreviewSet> {
        let profile = self.profile(user)?;
        let today = self.today_for(user, &profile);
        self.ledger.freeze_stale(user, today).await;

        let pool = self.open_today(user, today, &profile).snapshot().await;
        let remaining = pool.remaining();
        let rewards = preview(remaining, &slots_for(&pool, quests));

        debug!(
            "Preview for {}: {} quest(s) sharing {} XP",
            pool.key(),
            rewards.len(),
            remaining
        );

        Ok(RewardPreviewSet {
            local_date: today,
            remaining,
            rewards,
            message: (remaining == 0).then(|| self.config.pool.limit_message.clone()),
        })
    }

    /// Preview today's quests from the quest store
    pub async fn preview_today(&self, user: &UserId) -> Result<RewardPreviewSet> {
        let today = self.today(user).await?;
        let quests = self.quests.quests_for_day(user, today)?;
        self.preview_rewards(user, &quests).await
    }

    /// Complete a quest: compute its share, credit the user and freeze the award
    ///
    /// The share computation, the user store credit and the ledger write run under
    /// the day's pool lock. If the credit fails the pool is unchanged and the error
    /// is returned.
    pub async fn complete_quest(
        &self,
        user: &UserId,
        quest_id: &QuestId,
    ) -> Result<CompletionResult> {
        let profile = self.profile(user)?;
        let today = self.today_for(user, &profile);
        self.ledger.freeze_stale(user, today).await;

        let quest = self
            .quests
            .find_quest(user, quest_id)?
            .ok_or_else(|| EngineError::UnknownQuest {
                user: user.clone(),
                quest: quest_id.clone(),
            })?;
        let date = quest.scheduled_for;

        if date > today {
            debug!("Quest {} for {} is not due until {}", quest_id, user, date);
            return Ok(CompletionResult::unchanged(
                quest_id.clone(),
                date,
                CompletionOutcome::NotDueYet,
                0,
                profile.total_xp,
            ));
        }

        let handle = if date < today {
            match self.ledger.get(&PoolKey::new(user.clone(), date)) {
                Some(handle) => handle,
                None => {
                    warn!(
                        "Stale completion of {} for {} on {} (no pool for that day)",
                        quest_id, user, date
                    );
                    return Ok(CompletionResult::unchanged(
                        quest_id.clone(),
                        date,
                        CompletionOutcome::StaleLedger,
                        0,
                        profile.total_xp,
                    ));
                }
            }
        } else {
            self.open_today(user, today, &profile)
        };

        let mut day_quests = self.quests.quests_for_day(user, date)?;
        if !day_quests.iter().any(|q| &q.id == quest_id) {
            day_quests.push(quest.clone());
        }

        let commit = handle
            .commit(
                quest_id,
                |pool| award_for(pool.remaining(), &slots_for(pool, &day_quests), quest_id),
                |amount| self.users.credit_xp(user, amount),
            )
            .await?;

        let (outcome, awarded_xp) = match commit.outcome {
            ConsumeOutcome::AlreadyAwarded { amount } => {
                debug!("Quest {} for {} already awarded {} XP", quest_id, user, amount);
                (CompletionOutcome::AlreadyCompleted, amount)
            }
            ConsumeOutcome::Frozen => {
                warn!(
                    "Stale completion of {} for {} on {} (pool frozen)",
                    quest_id, user, date
                );
                (CompletionOutcome::StaleLedger, 0)
            }
            ConsumeOutcome::Exhausted { .. } => (CompletionOutcome::PoolExhausted, 0),
            ConsumeOutcome::Granted { .. } if !quest.has_valid_weight() => {
                warn!(
                    "Quest {} for {} has non-positive weight {}",
                    quest_id, user, quest.base_points
                );
                (CompletionOutcome::InvalidWeight, 0)
            }
            ConsumeOutcome::Granted { amount, .. } => (CompletionOutcome::Awarded, amount),
        };

        let new_total_xp = match commit.committed {
            Some(total) => total,
            None => self
                .users
                .profile(user)?
                .map(|p| p.total_xp)
                .unwrap_or(profile.total_xp),
        };

        let mut result = CompletionResult::unchanged(
            quest_id.clone(),
            date,
            outcome,
            awarded_xp,
            new_total_xp,
        );

        if !commit.outcome.recorded() {
            return Ok(result);
        }

        if outcome == CompletionOutcome::PoolExhausted {
            result.message = Some(self.config.pool.limit_message.clone());
        }

        if outcome == CompletionOutcome::Awarded && awarded_xp > 0 {
            let check = check_level_up(new_total_xp.saturating_sub(awarded_xp), awarded_xp);
            if check.will_level_up {
                info!(
                    "{} reached level {} (+{} level(s))",
                    user, check.new_level, check.levels_gained
                );
                result.new_rank = check.new_rank();
                if let Some(rank) = result.new_rank {
                    info!("{} ranked up to {}", user, rank.name);
                }
                result.level_up = Some(check);
                self.apply_level_policy(&handle, &commit.pool, check.new_level).await;
            }
        }

        info!(
            "{} completed {} on {}: {} XP ({}), {}/{} consumed",
            user, quest_id, date, awarded_xp, outcome, commit.pool.consumed, commit.pool.cap
        );
        self.record_award(user, date, &result);

        Ok(result)
    }

    async fn apply_level_policy(&self, handle: &PoolHandle, pool: &DailyPool, new_level: u32) {
        let policy = self.config.pool.mid_day_level_policy;
        if let Some(new_cap) = policy.adjusted_cap(pool.cap, new_level) {
            if handle.raise_cap(new_cap).await {
                info!(
                    "Pool {} cap raised to {} after level-up ({})",
                    pool.key(),
                    new_cap,
                    policy.as_str()
                );
            }
        }
    }

    fn record_award(&self, user: &UserId, date: NaiveDate, result: &CompletionResult) {
        let Some(log) = &self.award_log else {
            return;
        };
        let record = AwardRecord::new(
            user.clone(),
            date,
            result.quest_id.clone(),
            result.awarded_xp,
            result.outcome.as_str(),
            result.new_total_xp,
        );
        if let Err(e) = log.append(&record) {
            warn!("Failed to write award log {}: {}", log.path().display(), e);
        }
    }

    /// Freeze a day's pool ahead of rollover
    pub async fn archive_day(&self, user: &UserId, date: NaiveDate) -> bool {
        self.ledger.archive(&PoolKey::new(user.clone(), date)).await
    }

    /// Drop the user's frozen pools older than the configured retention,
    /// counted back from the user's local date
    pub async fn prune_history(&self, user: &UserId) -> Result<usize> {
        let today = self.today(user).await?;
        let retain = chrono::Days::new(u64::from(self.config.audit.retain_days));
        Ok(match today.checked_sub_days(retain) {
            Some(cutoff) => self.ledger.prune_frozen(user, cutoff).await,
            None => 0,
        })
    }
}

/// Allocator view of `quests` against `pool`
fn slots_for(pool: &DailyPool, quests: &[QuestInstance]) -> Vec<QuestSlot> {
    quests
        .iter()
        .map(|q| QuestSlot {
            quest_id: q.id.clone(),
            weight: q.base_points,
            resolved: pool.awarded(&q.id).is_some(),
        })
        .collect()
}
