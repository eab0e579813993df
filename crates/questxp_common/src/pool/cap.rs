//! Daily pool cap
//!
//! The cap is derived once per user per local day from the level at the start of
//! that day. Whether a level-up later in the day may raise it is a policy choice.

use crate::progression::{level_for_xp, xp_cap_for_level};
use serde::{Deserialize, Serialize};

/// Daily XP budget for a level
pub fn daily_cap_for_level(level: u32) -> u64 {
    xp_cap_for_level(level)
}

/// Daily XP budget for a user holding `total_xp` at the start of the day
pub fn daily_cap_for_total_xp(total_xp: u64) -> u64 {
    daily_cap_for_level(level_for_xp(total_xp))
}

/// How a level-up during the day affects that day's cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidDayLevelPolicy {
    /// Cap stays at the value computed when the day's pool opened
    FreezeAtStartOfDay,
    /// Cap rises to the new level's cap; it never falls
    RaiseOnLevelUp,
}

impl Default for MidDayLevelPolicy {
    fn default() -> Self {
        Self::FreezeAtStartOfDay
    }
}

impl MidDayLevelPolicy {
    /// New cap after reaching `new_level`, if the policy changes it
    pub fn adjusted_cap(&self, current_cap: u64, new_level: u32) -> Option<u64> {
        match self {
            MidDayLevelPolicy::FreezeAtStartOfDay => None,
            MidDayLevelPolicy::RaiseOnLevelUp => {
                let raised = daily_cap_for_level(new_level);
                (raised > current_cap).then_some(raised)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MidDayLevelPolicy::FreezeAtStartOfDay => "freeze_at_start_of_day",
            MidDayLevelPolicy::RaiseOnLevelUp => "raise_on_level_up",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "freeze_at_start_of_day" | "freeze" => Some(MidDayLevelPolicy::FreezeAtStartOfDay),
            "raise_on_level_up" | "raise" => Some(MidDayLevelPolicy::RaiseOnLevelUp),
            _ => None,
        }
    }
}
