//! Level Curve
//!
//! Maps cumulative XP to a level and back. Levels start at 1 and are never stored:
//! they are always recomputed from the user's total XP.
//!
//! ## Curves
//!
//! Two independently parameterised per-level costs are used:
//! - Daily cap for level L: `100 * (1 + 0.15 * (L - 1)) * L`
//! - Cost of clearing level i: `100 * (1 + 0.35 * (i - 1)) * i`
//!
//! Both reduce to integer polynomials (`100L + 15L(L-1)` and `100i + 35i(i-1)`),
//! so they are evaluated exactly without floating point rounding.
//!
//! Thresholds:
//! - Level 2: 100 XP total
//! - Level 3: 370 XP total
//! - Level 4: 880 XP total
//! - Level 5: 1,700 XP total

use serde::{Deserialize, Serialize};

/// Base XP of both curves
const BASE_XP: u128 = 100;
/// Growth coefficient of the daily cap curve, in hundredths (0.15)
const CAP_GROWTH_PCT: u128 = 15;
/// Growth coefficient of the cumulative level cost curve, in hundredths (0.35)
const LEVEL_COST_GROWTH_PCT: u128 = 35;

/// Per-level XP requirement that paces daily earning potential
///
/// Levels below 1 are treated as level 1.
pub fn xp_cap_for_level(level: u32) -> u64 {
    let l = level.max(1) as u128;
    clamp_u64(BASE_XP * l + CAP_GROWTH_PCT * l * (l - 1))
}

/// Cost of clearing a single level `i` (moving from `i` to `i + 1`)
fn level_cost(i: u128) -> u128 {
    BASE_XP * i + LEVEL_COST_GROWTH_PCT * i * (i - 1)
}

/// Total XP needed to reach `level` starting from level 1
///
/// Returns 0 for `level <= 1`.
pub fn xp_required_for_level(level: u32) -> u64 {
    clamp_u64(required_wide(level))
}

fn required_wide(level: u32) -> u128 {
    if level <= 1 {
        return 0;
    }
    (1..level as u128).map(level_cost).sum()
}

fn clamp_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Clamp an externally supplied XP figure to a valid total
///
/// Negative, NaN and infinite inputs become 0; fractions round to nearest.
pub fn sanitize_xp(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    let rounded = raw.round();
    if rounded >= u64::MAX as f64 {
        u64::MAX
    } else {
        rounded as u64
    }
}

/// Where a total XP figure sits on the level curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level (>= 1)
    pub level: u32,
    /// XP earned since reaching the current level
    pub current_level_xp: u64,
    /// XP still needed for the next level
    pub xp_to_next_level: u64,
    /// Progress through the current level, clamped to [0, 100]
    pub progress_percent: f64,
    /// Cumulative XP threshold of the current level
    pub total_xp_for_current_level: u64,
    /// Cumulative XP threshold of the next level
    pub total_xp_for_next_level: u64,
    /// Width of the current level in XP
    pub xp_for_this_level: u64,
}

/// Find the level for a total XP figure
///
/// Forward search from level 1: the greatest level whose cumulative threshold is
/// `<= total_xp`. The curve is strictly increasing so the search always ends.
pub fn level_from_total_xp(total_xp: u64) -> LevelProgress {
    let total = total_xp as u128;

    let mut level: u32 = 1;
    let mut current_threshold: u128 = 0;
    let mut next_threshold: u128 = level_cost(1);

    while next_threshold <= total {
        level += 1;
        current_threshold = next_threshold;
        next_threshold += level_cost(level as u128);
    }

    let span = next_threshold - current_threshold;
    let into_level = total - current_threshold;
    let progress_percent = if span == 0 {
        100.0
    } else {
        (into_level as f64 / span as f64 * 100.0).clamp(0.0, 100.0)
    };

    LevelProgress {
        level,
        current_level_xp: clamp_u64(into_level),
        xp_to_next_level: clamp_u64(next_threshold - total),
        progress_percent,
        total_xp_for_current_level: clamp_u64(current_threshold),
        total_xp_for_next_level: clamp_u64(next_threshold),
        xp_for_this_level: clamp_u64(span),
    }
}

/// Shorthand for just the level number
pub fn level_for_xp(total_xp: u64) -> u32 {
    level_from_total_xp(total_xp).level
}
