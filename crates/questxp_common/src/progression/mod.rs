//! Progression Module
//!
//! Level curve, level-up detection, rank tiers and quest priorities.
//!
//! ## Level System
//!
//! - Levels start at 1 and are always derived from total XP
//! - Cumulative thresholds grow super-linearly (see `levels`)
//! - Ranks are cosmetic tiers over level ranges

pub mod level_up;
pub mod levels;
pub mod priority;
pub mod ranks;

pub use level_up::{check_level_up, LevelUpCheck};
pub use levels::{
    level_for_xp, level_from_total_xp, sanitize_xp, xp_cap_for_level, xp_required_for_level,
    LevelProgress,
};
pub use priority::{ParsePriorityError, QuestPriority};
pub use ranks::{rank_changed, rank_for_level, Rank, RANK_TIERS};
