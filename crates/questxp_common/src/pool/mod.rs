//! Daily XP pool: cap, proportional allocation and the per-day ledger

pub mod allocator;
pub mod cap;
pub mod ledger;

pub use allocator::{
    award_for, open_weight, preview, proportional_share, remaining_pool, PotentialReward,
    QuestSlot,
};
pub use cap::{daily_cap_for_level, daily_cap_for_total_xp, MidDayLevelPolicy};
pub use ledger::{
    ConsumeOutcome, DailyPool, LedgerCommit, PoolHandle, PoolKey, PoolLedger, PoolState,
};
