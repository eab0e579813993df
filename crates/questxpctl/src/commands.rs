//! Command handlers for questxpctl.

use crate::state::Session;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use owo_colors::OwoColorize;
use questxp_common::display::{format_level_line, format_pool_line, progress_bar};
use questxp_common::pool::daily_cap_for_level;
use questxp_common::progression::{sanitize_xp, xp_required_for_level};
use questxp_common::{
    level_from_total_xp, rank_for_level, CompletionOutcome, CompletionResult, EngineConfig,
    QuestId, QuestInstance, QuestPriority, Rank, UserId, UserProfile, UserStore,
};
use std::path::{Path, PathBuf};

const BAR_WIDTH: usize = 30;

/// One row of the level curve table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveRow {
    pub level: u32,
    pub daily_cap: u64,
    pub total_xp_required: u64,
    pub rank: &'static str,
}

/// Curve rows for `from..=to`; levels below 1 start at 1
pub fn curve_rows(from: u32, to: u32) -> Vec<CurveRow> {
    (from.max(1)..=to)
        .map(|level| CurveRow {
            level,
            daily_cap: daily_cap_for_level(level),
            total_xp_required: xp_required_for_level(level),
            rank: rank_for_level(level).name,
        })
        .collect()
}

/// Split `key=value`
pub fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => bail!("Expected key=value, got '{}'", raw),
    }
}

/// Rank name in the tier's colour
fn colored_rank(rank: &Rank) -> String {
    match hex_rgb(rank.color) {
        Some((r, g, b)) => format!("{} {}", rank.icon, rank.name.truecolor(r, g, b).bold()),
        None => rank.to_string(),
    }
}

fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

fn print_kv(key: &str, value: &str) {
    println!("{:12} {}", key.dimmed(), value);
}

/// Handle curve command
pub fn curve(from: u32, to: u32) -> Result<()> {
    if to < from.max(1) {
        bail!("--to ({}) must be at least --from ({})", to, from.max(1));
    }
    println!(
        "{:>6}  {:>10}  {:>14}  {}",
        "level".bold(),
        "daily cap".bold(),
        "total xp".bold(),
        "rank".bold()
    );
    for row in curve_rows(from, to) {
        println!(
            "{:>6}  {:>10}  {:>14}  {}",
            row.level, row.daily_cap, row.total_xp_required, row.rank
        );
    }
    Ok(())
}

/// Handle level command
pub fn level(raw_xp: f64) -> Result<()> {
    let xp = sanitize_xp(raw_xp);
    let progress = level_from_total_xp(xp);
    println!("{}", format_level_line(&progress, BAR_WIDTH));
    print_kv("total xp", &xp.to_string());
    print_kv("next level", &format!("{} XP to go", progress.xp_to_next_level));
    print_kv("daily cap", &daily_cap_for_level(progress.level).to_string());
    print_kv("rank", &colored_rank(rank_for_level(progress.level)));
    Ok(())
}

/// Handle rank command
pub fn rank(level: u32) -> Result<()> {
    let rank = rank_for_level(level);
    println!("{}", colored_rank(rank));
    print_kv("levels", &format!("{}-{}", rank.min_level, rank.max_level));
    print_kv("about", rank.description);
    Ok(())
}

/// Handle user add
pub fn user_add(session: &Session, id: &str, xp: u64, utc_offset: i32) -> Result<()> {
    let user = UserId::from(id);
    if session.users.profile(&user)?.is_some() {
        bail!("User '{}' already exists", id);
    }
    session.users.insert(user, UserProfile::new(xp, utc_offset));
    println!("{} user {}", "added".green(), id.bold());
    Ok(())
}

/// Handle user show
pub async fn user_show(session: &Session, id: &str) -> Result<()> {
    let user = UserId::from(id);
    let profile = session
        .users
        .profile(&user)?
        .with_context(|| format!("Unknown user '{}'", id))?;

    let progress = level_from_total_xp(profile.total_xp);
    println!("{}", id.bold());
    println!("{}", format_level_line(&progress, BAR_WIDTH));
    print_kv("rank", &colored_rank(rank_for_level(progress.level)));
    print_kv("utc offset", &format!("{} min", profile.utc_offset_minutes));

    let status = session.engine.get_daily_pool_status(&user).await?;
    print_kv("today", &format_pool_line(&status, BAR_WIDTH));
    Ok(())
}

/// Handle quest add
pub async fn quest_add(
    session: &Session,
    user: &str,
    id: &str,
    priority: Option<QuestPriority>,
    points: Option<i64>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let user_id = UserId::from(user);
    if session.users.profile(&user_id)?.is_none() {
        bail!("Unknown user '{}'", user);
    }
    let date = match date {
        Some(date) => date,
        None => session.engine.today(&user_id).await?,
    };

    let quest = match (priority, points) {
        (Some(priority), _) => QuestInstance::with_priority(id, priority, date),
        (None, Some(points)) => QuestInstance::new(id, points, date),
        (None, None) => bail!("Either --priority or --points is required"),
    };
    if !quest.has_valid_weight() {
        println!(
            "{} weight {} earns no XP",
            "warning:".yellow(),
            quest.base_points
        );
    }

    println!(
        "{} quest {} for {} on {} (weight {})",
        "added".green(),
        id.bold(),
        user,
        date,
        quest.base_points
    );
    session.quests.add_quest(&user_id, quest);
    Ok(())
}

/// Handle status command
pub async fn status(session: &Session, user: &str) -> Result<()> {
    let status = session
        .engine
        .get_daily_pool_status(&UserId::from(user))
        .await?;

    println!("{} {}", user.bold(), status.local_date.dimmed());
    print_kv("cap", &status.cap.to_string());
    print_kv("consumed", &status.consumed.to_string());
    print_kv("remaining", &status.remaining.to_string());
    print_kv(
        "used",
        &format!(
            "{} {:.0}%",
            progress_bar(status.percentage_used, BAR_WIDTH),
            status.percentage_used
        ),
    );
    if let Some(message) = &status.message {
        println!("{}", message.yellow());
    }
    Ok(())
}

/// Handle preview command
pub async fn preview(session: &Session, user: &str) -> Result<()> {
    let preview = session.engine.preview_today(&UserId::from(user)).await?;

    println!(
        "{} {}  {} XP left",
        user.bold(),
        preview.local_date.dimmed(),
        preview.remaining
    );
    if preview.rewards.is_empty() {
        println!("{}", "no open quests".dimmed());
    }
    for reward in &preview.rewards {
        println!("  {:<24} {:>8} XP", reward.quest_id.as_str(), reward.potential_xp);
    }
    if let Some(message) = &preview.message {
        println!("{}", message.yellow());
    }
    Ok(())
}

/// Handle complete command
pub async fn complete(session: &Session, user: &str, quest: &str) -> Result<()> {
    let user_id = UserId::from(user);
    let quest_id = QuestId::from(quest);
    let result = session.engine.complete_quest(&user_id, &quest_id).await?;

    if settled(&result) {
        session.quests.mark_completed(&user_id, &quest_id);
    }
    print_completion(&result);
    Ok(())
}

/// Whether the quest now carries a frozen award
fn settled(result: &CompletionResult) -> bool {
    !matches!(
        result.outcome,
        CompletionOutcome::NotDueYet | CompletionOutcome::StaleLedger
    )
}

fn print_completion(result: &CompletionResult) {
    let headline = match result.outcome {
        CompletionOutcome::Awarded => format!("+{} XP", result.awarded_xp).green().to_string(),
        CompletionOutcome::AlreadyCompleted => format!(
            "already completed ({} XP)",
            result.awarded_xp
        )
        .dimmed()
        .to_string(),
        CompletionOutcome::PoolExhausted => "0 XP".yellow().to_string(),
        CompletionOutcome::StaleLedger => "0 XP (day already closed)".yellow().to_string(),
        CompletionOutcome::NotDueYet => {
            format!("not due until {}", result.local_date).yellow().to_string()
        }
        CompletionOutcome::InvalidWeight => "0 XP (quest has no weight)".yellow().to_string(),
    };
    println!("{}  {}", result.quest_id.as_str().bold(), headline);
    print_kv("total xp", &result.new_total_xp.to_string());

    if let Some(level_up) = &result.level_up {
        println!(
            "{} level {} -> {}",
            "LEVEL UP".bright_green().bold(),
            level_up.current_level,
            level_up.new_level
        );
    }
    if let Some(rank) = result.new_rank {
        println!("{} {}", "NEW RANK".bright_magenta().bold(), colored_rank(rank));
    }
    if let Some(message) = &result.message {
        println!("{}", message.yellow());
    }
}

/// Handle history command
pub fn history(session: &Session, limit: usize) -> Result<()> {
    let Some(log) = session.engine.award_log() else {
        println!("{}", "award log disabled".dimmed());
        return Ok(());
    };

    let records = log.read_recent(limit);
    if records.is_empty() {
        println!("{}", "no awards yet".dimmed());
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {:<12} {:<20} {:>6} XP  {:<16} total {}",
            record.local_date,
            record.user_id.as_str(),
            record.quest_id.as_str(),
            record.awarded_xp,
            record.outcome,
            record.total_xp_after
        );
    }
    Ok(())
}

/// Target file for config writes
fn config_target(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => EngineConfig::user_config_path(),
    }
}

/// Handle config command
pub fn config(explicit: Option<&Path>, set: Option<String>) -> Result<()> {
    let mut config = match explicit {
        Some(path) if !path.exists() => EngineConfig::default(),
        _ => EngineConfig::load(explicit)?,
    };

    if let Some(assignment) = set {
        let (key, value) = parse_assignment(&assignment)?;
        config.set(key, value)?;
        let target = config_target(explicit)?;
        config.save_to(&target)?;
        println!("{} {} = {} ({})", "set".green(), key, value, target.display());
        return Ok(());
    }

    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
