//! Award Log
//!
//! Append-only JSONL record of every settled completion, including zero awards.
//! Purely an audit trail: a failed write never fails the completion.

use crate::types::{QuestId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Award log file name
pub const AWARD_LOG_FILE: &str = "awards.jsonl";

/// One settled completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardRecord {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub local_date: NaiveDate,
    pub quest_id: QuestId,
    pub awarded_xp: u64,
    /// Outcome label, e.g. "awarded" or "pool_exhausted"
    pub outcome: String,
    pub total_xp_after: u64,
}

impl AwardRecord {
    pub fn new(
        user_id: UserId,
        local_date: NaiveDate,
        quest_id: QuestId,
        awarded_xp: u64,
        outcome: impl Into<String>,
        total_xp_after: u64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id,
            local_date,
            quest_id,
            awarded_xp,
            outcome: outcome.into(),
            total_xp_after,
        }
    }
}

/// Totals for one user's day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub completions: u32,
    pub xp_awarded: u64,
    pub zero_awards: u32,
}

/// Award log manager
#[derive(Debug, Clone)]
pub struct AwardLog {
    path: PathBuf,
}

impl AwardLog {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::with_path(dir.join(AWARD_LOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &AwardRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(line.as_bytes())
    }

    /// Every readable record, oldest first; malformed lines are skipped
    pub fn read_all(&self) -> Vec<AwardRecord> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        BufReader::new(file)
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }

    /// Last `limit` records, oldest first
    pub fn read_recent(&self, limit: usize) -> Vec<AwardRecord> {
        let mut records = self.read_all();
        if records.len() > limit {
            records = records.split_off(records.len() - limit);
        }
        records
    }

    pub fn day_summary(&self, user: &UserId, date: NaiveDate) -> DaySummary {
        self.read_all()
            .iter()
            .filter(|r| &r.user_id == user && r.local_date == date)
            .fold(DaySummary::default(), |mut summary, record| {
                summary.completions += 1;
                summary.xp_awarded += record.awarded_xp;
                if record.awarded_xp == 0 {
                    summary.zero_awards += 1;
                }
                summary
            })
    }
}
