//! Display helpers for pool, level and rank lines

use crate::engine::PoolStatus;
use crate::progression::{rank_for_level, LevelProgress};

/// Generate a progress bar: `[=====-----]`
pub fn progress_bar(percent: f64, width: usize) -> String {
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((percent / 100.0) * width as f64).floor() as usize;
    let filled = filled.min(width);
    let empty = width - filled;
    format!("[{}{}]", "=".repeat(filled), "-".repeat(empty))
}

/// `2026-03-01  [=====-----]  400/800 XP (50%)`
pub fn format_pool_line(status: &PoolStatus, width: usize) -> String {
    let mut line = format!(
        "{}  {}  {}/{} XP ({:.0}%)",
        status.local_date,
        progress_bar(status.percentage_used, width),
        status.consumed,
        status.cap,
        status.percentage_used
    );
    if let Some(message) = &status.message {
        line.push_str(" - ");
        line.push_str(message);
    }
    line
}

/// `Lv 5 Apprentice  [==--------]  120/1000 XP`
pub fn format_level_line(progress: &LevelProgress, width: usize) -> String {
    let rank = rank_for_level(progress.level);
    format!(
        "Lv {} {}  {}  {}/{} XP",
        progress.level,
        rank,
        progress_bar(progress.progress_percent, width),
        progress.current_level_xp,
        progress.xp_for_this_level
    )
}
