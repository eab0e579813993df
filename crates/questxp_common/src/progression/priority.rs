//! Quest priority tags
//!
//! Closed set of priorities with a total mapping to base points. Tags arrive as
//! names ("critical") or numeric strings ("5"); anything else is rejected rather
//! than guessed.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Importance of a quest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestPriority {
    Optional,
    Minor,
    Standard,
    Important,
    Critical,
}

impl Default for QuestPriority {
    fn default() -> Self {
        Self::Standard
    }
}

impl QuestPriority {
    pub const ALL: [QuestPriority; 5] = [
        QuestPriority::Optional,
        QuestPriority::Minor,
        QuestPriority::Standard,
        QuestPriority::Important,
        QuestPriority::Critical,
    ];

    /// Weight of a quest with this priority
    pub fn base_points(&self) -> i64 {
        match self {
            QuestPriority::Optional => 1,
            QuestPriority::Minor => 2,
            QuestPriority::Standard => 3,
            QuestPriority::Important => 5,
            QuestPriority::Critical => 8,
        }
    }

    /// Numeric tag (1 = optional .. 5 = critical)
    pub fn tag(&self) -> u8 {
        match self {
            QuestPriority::Optional => 1,
            QuestPriority::Minor => 2,
            QuestPriority::Standard => 3,
            QuestPriority::Important => 4,
            QuestPriority::Critical => 5,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.tag() == tag)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestPriority::Optional => "optional",
            QuestPriority::Minor => "minor",
            QuestPriority::Standard => "standard",
            QuestPriority::Important => "important",
            QuestPriority::Critical => "critical",
        }
    }
}

/// Unrecognised priority tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid quest priority: '{0}'. Valid values: optional, minor, standard, important, critical or 1-5")]
pub struct ParsePriorityError(pub String);

impl FromStr for QuestPriority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(tag) = trimmed.parse::<u8>() {
            return Self::from_tag(tag).ok_or_else(|| ParsePriorityError(s.to_string()));
        }
        match trimmed.to_lowercase().as_str() {
            "optional" => Ok(QuestPriority::Optional),
            "minor" => Ok(QuestPriority::Minor),
            "standard" => Ok(QuestPriority::Standard),
            "important" => Ok(QuestPriority::Important),
            "critical" => Ok(QuestPriority::Critical),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}

impl std::fmt::Display for QuestPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_strictly_increase() {
        for pair in QuestPriority::ALL.windows(2) {
            assert!(pair[0].base_points() < pair[1].base_points());
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("critical".parse::<QuestPriority>().unwrap(), QuestPriority::Critical);
        assert_eq!(" Minor ".parse::<QuestPriority>().unwrap(), QuestPriority::Minor);
        assert_eq!("OPTIONAL".parse::<QuestPriority>().unwrap(), QuestPriority::Optional);
    }

    #[test]
    fn test_parse_numeric_tags() {
        assert_eq!("1".parse::<QuestPriority>().unwrap(), QuestPriority::Optional);
        assert_eq!("3".parse::<QuestPriority>().unwrap(), QuestPriority::Standard);
        assert_eq!("5".parse::<QuestPriority>().unwrap(), QuestPriority::Critical);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("0".parse::<QuestPriority>().is_err());
        assert!("6".parse::<QuestPriority>().is_err());
        assert!("urgent".parse::<QuestPriority>().is_err());
        assert!("".parse::<QuestPriority>().is_err());
    }

    #[test]
    fn test_tag_round_trip() {
        for priority in QuestPriority::ALL {
            assert_eq!(QuestPriority::from_tag(priority.tag()), Some(priority));
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&QuestPriority::Important).unwrap();
        assert_eq!(json, "\"important\"");
    }
}
