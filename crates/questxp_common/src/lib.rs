//! Questxp Common - leveling and adaptive daily XP distribution
//!
//! Each user earns from a daily pool sized by their level. Completed quests draw
//! a share of what is left in proportion to their weight; earlier completions
//! draw from a larger remainder. Awards are frozen once granted.

pub mod award_log;
pub mod collaborators;
pub mod display;
pub mod engine;
pub mod engine_config;
pub mod error;
pub mod pool;
pub mod progression;
pub mod types;

pub use award_log::{AwardLog, AwardRecord, DaySummary};
pub use collaborators::{
    local_date, Clock, FixedClock, InMemoryQuestStore, InMemoryUserStore, QuestStore,
    SystemClock, UserStore,
};
pub use engine::{CompletionOutcome, CompletionResult, PoolStatus, RewardPreviewSet, XpEngine};
pub use engine_config::EngineConfig;
pub use error::{EngineError, Result};
pub use pool::{DailyPool, MidDayLevelPolicy, PoolKey, PoolLedger, PoolState, PotentialReward};
pub use progression::{
    check_level_up, level_from_total_xp, rank_for_level, LevelProgress, LevelUpCheck,
    QuestPriority, Rank,
};
pub use types::{QuestId, QuestInstance, UserId, UserProfile};
