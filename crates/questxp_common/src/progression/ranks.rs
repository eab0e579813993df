//! Rank Tiers
//!
//! Cosmetic status tiers derived from level. The table is ordered by `min_level`
//! and covers every level from 1 upward; the last tier is open-ended.
//!
//! Level 1-4: Novice
//! Level 5-9: Apprentice
//! Level 10-19: Adventurer
//! Level 20-34: Veteran
//! Level 35-49: Champion
//! Level 50-69: Master
//! Level 70-99: Grandmaster
//! Level 100+: Legend

use serde::Serialize;

/// A named rank tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rank {
    pub name: &'static str,
    pub min_level: u32,
    /// Inclusive upper bound; the top tier reports 999 but also covers anything above
    pub max_level: u32,
    pub icon: &'static str,
    /// Hex color for display
    pub color: &'static str,
    pub description: &'static str,
}

/// Upper bound reported by the open-ended top tier
pub const TOP_TIER_MAX_LEVEL: u32 = 999;

/// Rank tiers sorted by `min_level`
pub const RANK_TIERS: &[Rank] = &[
    Rank {
        name: "Novice",
        min_level: 1,
        max_level: 4,
        icon: "🌱",
        color: "#9CA3AF",
        description: "Just getting started",
    },
    Rank {
        name: "Apprentice",
        min_level: 5,
        max_level: 9,
        icon: "🛠",
        color: "#60A5FA",
        description: "Building steady habits",
    },
    Rank {
        name: "Adventurer",
        min_level: 10,
        max_level: 19,
        icon: "🧭",
        color: "#34D399",
        description: "Consistently clearing quests",
    },
    Rank {
        name: "Veteran",
        min_level: 20,
        max_level: 34,
        icon: "🛡",
        color: "#10B981",
        description: "Seasoned and reliable",
    },
    Rank {
        name: "Champion",
        min_level: 35,
        max_level: 49,
        icon: "⚔",
        color: "#FBBF24",
        description: "Takes on the hardest quests",
    },
    Rank {
        name: "Master",
        min_level: 50,
        max_level: 69,
        icon: "🔥",
        color: "#F97316",
        description: "Mastery through repetition",
    },
    Rank {
        name: "Grandmaster",
        min_level: 70,
        max_level: 99,
        icon: "👑",
        color: "#A855F7",
        description: "Few have come this far",
    },
    Rank {
        name: "Legend",
        min_level: 100,
        max_level: TOP_TIER_MAX_LEVEL,
        icon: "🌟",
        color: "#EF4444",
        description: "A living legend",
    },
];

/// Get the rank for a level
///
/// Picks the tier with the greatest `min_level <= level`. Levels below 1 map to the
/// first tier, so every input has exactly one answer.
pub fn rank_for_level(level: u32) -> &'static Rank {
    let idx = RANK_TIERS.partition_point(|tier| tier.min_level <= level);
    &RANK_TIERS[idx.saturating_sub(1)]
}

/// Whether moving between two levels crosses into a new tier
pub fn rank_changed(from_level: u32, to_level: u32) -> Option<&'static Rank> {
    let before = rank_for_level(from_level);
    let after = rank_for_level(to_level);
    if before.name != after.name {
        Some(after)
    } else {
        None
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.icon, self.name)
    }
}
