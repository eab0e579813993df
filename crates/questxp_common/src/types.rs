//! Shared identifiers and records exchanged with the quest and user stores

use crate::progression::QuestPriority;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// User identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quest instance identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestId(pub String);

impl QuestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for QuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quest scheduled for one local day, as supplied by the quest store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestInstance {
    pub id: QuestId,
    /// Weight of the quest's share of the daily pool; non-positive values earn nothing
    pub base_points: i64,
    /// Completion flag as recorded by the quest store
    #[serde(default)]
    pub completed: bool,
    /// Local calendar date the quest belongs to
    pub scheduled_for: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<QuestPriority>,
}

impl QuestInstance {
    pub fn new(id: impl Into<String>, base_points: i64, scheduled_for: NaiveDate) -> Self {
        Self {
            id: QuestId::new(id),
            base_points,
            completed: false,
            scheduled_for,
            priority: None,
        }
    }

    /// Quest weighted by its priority tag
    pub fn with_priority(
        id: impl Into<String>,
        priority: QuestPriority,
        scheduled_for: NaiveDate,
    ) -> Self {
        Self {
            id: QuestId::new(id),
            base_points: priority.base_points(),
            completed: false,
            scheduled_for,
            priority: Some(priority),
        }
    }

    /// Whether the weight can earn a share of the pool
    pub fn has_valid_weight(&self) -> bool {
        self.base_points > 0
    }
}

/// What the engine needs to know about a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub total_xp: u64,
    /// Offset of the user's timezone from UTC, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl UserProfile {
    pub fn new(total_xp: u64, utc_offset_minutes: i32) -> Self {
        Self {
            total_xp,
            utc_offset_minutes,
        }
    }
}
