//! Level-up detection
//!
//! Pure before/after comparison. Callers decide what a level-up means
//! (rank announcement, achievement checks, ...).

use super::levels::level_from_total_xp;
use super::ranks::{rank_changed, Rank};
use serde::Serialize;

/// Result of comparing levels before and after an XP gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelUpCheck {
    pub will_level_up: bool,
    pub current_level: u32,
    pub new_level: u32,
    pub levels_gained: u32,
}

impl LevelUpCheck {
    /// Rank reached by this level-up, if it crosses a tier boundary
    pub fn new_rank(&self) -> Option<&'static Rank> {
        rank_changed(self.current_level, self.new_level)
    }
}

/// Check whether adding `xp_to_add` to `current_total_xp` crosses a level threshold
pub fn check_level_up(current_total_xp: u64, xp_to_add: u64) -> LevelUpCheck {
    let current_level = level_from_total_xp(current_total_xp).level;
    let new_level = level_from_total_xp(current_total_xp.saturating_add(xp_to_add)).level;
    let levels_gained = new_level.saturating_sub(current_level);

    LevelUpCheck {
        will_level_up: levels_gained > 0,
        current_level,
        new_level,
        levels_gained,
    }
}
