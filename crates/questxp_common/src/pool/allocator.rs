//! XP Allocator
//!
//! Splits what is left of a day's pool across the quests that have not been
//! awarded yet, in proportion to their weights.
//!
//! ## Allocation
//!
//! - `remaining = max(0, cap - consumed)`
//! - `open_weight = sum(weight)` over unresolved quests with a positive weight
//! - `potential = round(remaining * weight / open_weight)`
//!
//! Completions are sequential: each award is computed against the pool as it
//! stood right before that completion, so earlier completions draw from a larger
//! remainder. Resolved quests drop out of `open_weight`, which means quests added
//! mid-day simply join the split of whatever remains.

use crate::types::QuestId;
use serde::Serialize;

/// One quest as seen by the allocator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestSlot {
    pub quest_id: QuestId,
    pub weight: i64,
    /// Already awarded (or otherwise settled) for the day
    pub resolved: bool,
}

impl QuestSlot {
    pub fn open(quest_id: impl Into<String>, weight: i64) -> Self {
        Self {
            quest_id: QuestId::new(quest_id),
            weight,
            resolved: false,
        }
    }

    pub fn resolved(quest_id: impl Into<String>, weight: i64) -> Self {
        Self {
            quest_id: QuestId::new(quest_id),
            weight,
            resolved: true,
        }
    }
}

/// Advisory reward for an incomplete quest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PotentialReward {
    pub quest_id: QuestId,
    pub potential_xp: u64,
}

/// XP left in the pool; never negative
pub fn remaining_pool(cap: u64, consumed: u64) -> u64 {
    cap.saturating_sub(consumed)
}

/// Non-positive weights count as zero
fn effective_weight(weight: i64) -> u128 {
    if weight > 0 {
        weight as u128
    } else {
        0
    }
}

/// Sum of valid weights over unresolved quests
pub fn open_weight(slots: &[QuestSlot]) -> u64 {
    let total: u128 = slots
        .iter()
        .filter(|s| !s.resolved)
        .map(|s| effective_weight(s.weight))
        .sum();
    u64::try_from(total).unwrap_or(u64::MAX)
}

/// `round(remaining * weight / total_weight)`, half rounding up
///
/// Returns 0 for a non-positive weight or an empty total, and never more than `remaining`.
pub fn proportional_share(remaining: u64, weight: i64, total_weight: u64) -> u64 {
    share_parts(remaining, effective_weight(weight), total_weight as u128).0
}

/// Rounded share plus whether rounding went up
fn share_parts(remaining: u64, weight: u128, total: u128) -> (u64, bool) {
    if weight == 0 || total == 0 || remaining == 0 {
        return (0, false);
    }
    let scaled = remaining as u128 * weight;
    let floor = scaled / total;
    let rounded = (2 * scaled + total) / (2 * total);
    let share = u64::try_from(rounded).unwrap_or(u64::MAX).min(remaining);
    (share, rounded > floor)
}

/// Potential XP for every unresolved quest
///
/// Shares that rounded up are trimmed from the back of the list until the
/// total fits in `remaining`, so the displayed sum never exceeds the pool.
pub fn preview(remaining: u64, slots: &[QuestSlot]) -> Vec<PotentialReward> {
    let total = open_weight(slots) as u128;

    let mut rewards = Vec::new();
    let mut rounded_up = Vec::new();
    for slot in slots.iter().filter(|s| !s.resolved) {
        let (share, up) = share_parts(remaining, effective_weight(slot.weight), total);
        if up {
            rounded_up.push(rewards.len());
        }
        rewards.push(PotentialReward {
            quest_id: slot.quest_id.clone(),
            potential_xp: share,
        });
    }

    let sum: u64 = rewards.iter().map(|r| r.potential_xp).sum();
    let mut excess = sum.saturating_sub(remaining);
    for idx in rounded_up.into_iter().rev() {
        if excess == 0 {
            break;
        }
        rewards[idx].potential_xp -= 1;
        excess -= 1;
    }

    rewards
}

/// Award for completing `quest_id` right now
///
/// Exactly what `preview` shows for the quest against the same remainder, so a
/// completion pays the displayed figure. Resolved or unknown quests get 0.
pub fn award_for(remaining: u64, slots: &[QuestSlot], quest_id: &QuestId) -> u64 {
    preview(remaining, slots)
        .into_iter()
        .find(|r| &r.quest_id == quest_id)
        .map(|r| r.potential_xp)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_slots(weights: &[i64]) -> Vec<QuestSlot> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| QuestSlot::open(format!("q{}", i + 1), *w))
            .collect()
    }

    #[test]
    fn test_remaining_never_negative() {
        assert_eq!(remaining_pool(500, 125), 375);
        assert_eq!(remaining_pool(100, 250), 0);
    }

    #[test]
    fn test_sequential_equal_weights() {
        let mut slots = open_slots(&[3, 3, 3, 3]);
        let mut consumed = 0;

        let first = award_for(remaining_pool(500, consumed), &slots, &QuestId::from("q1"));
        assert_eq!(first, 125);
        consumed += first;
        slots[0].resolved = true;

        let second = award_for(remaining_pool(500, consumed), &slots, &QuestId::from("q2"));
        assert_eq!(second, 125);
        consumed += second;
        slots[1].resolved = true;

        let rewards = preview(remaining_pool(500, consumed), &slots);
        assert_eq!(rewards.len(), 2);
        assert!(rewards.iter().all(|r| r.potential_xp == 125));
    }

    #[test]
    fn test_small_remainder_split() {
        // 280 of 300 consumed by three resolved quests, two new weight-3 quests
        let mut slots = vec![
            QuestSlot::resolved("done1", 5),
            QuestSlot::resolved("done2", 5),
            QuestSlot::resolved("done3", 2),
        ];
        slots.extend(open_slots(&[3, 3]));

        let rewards = preview(remaining_pool(300, 280), &slots);
        assert_eq!(rewards.len(), 2);
        assert!(rewards.iter().all(|r| r.potential_xp == 10));
    }

    #[test]
    fn test_exhausted_pool_previews_zero() {
        let slots = open_slots(&[1, 5, 8]);
        let rewards = preview(0, &slots);
        assert!(rewards.iter().all(|r| r.potential_xp == 0));
    }

    #[test]
    fn test_invalid_weight_gets_nothing() {
        let slots = open_slots(&[0, -4, 2]);
        assert_eq!(open_weight(&slots), 2);

        let rewards = preview(100, &slots);
        assert_eq!(rewards[0].potential_xp, 0);
        assert_eq!(rewards[1].potential_xp, 0);
        assert_eq!(rewards[2].potential_xp, 100);
        assert_eq!(award_for(100, &slots, &QuestId::from("q1")), 0);
    }

    #[test]
    fn test_all_invalid_weights_no_division() {
        let slots = open_slots(&[0, 0]);
        assert_eq!(open_weight(&slots), 0);
        assert!(preview(100, &slots).iter().all(|r| r.potential_xp == 0));
    }

    #[test]
    fn test_rounding_trimmed_to_remaining() {
        // 5 / 3 rounds to 2 each; display must not promise 6
        let rewards = preview(5, &open_slots(&[1, 1, 1]));
        let total: u64 = rewards.iter().map(|r| r.potential_xp).sum();
        assert_eq!(total, 5);
        assert_eq!(rewards[2].potential_xp, 1);

        let rewards = preview(1, &open_slots(&[1, 1]));
        let total: u64 = rewards.iter().map(|r| r.potential_xp).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_half_rounds_up() {
        assert_eq!(proportional_share(5, 1, 2), 3);
        assert_eq!(proportional_share(7, 1, 3), 2);
    }

    #[test]
    fn test_share_never_exceeds_remaining() {
        assert_eq!(proportional_share(10, 50, 10), 10);
    }

    #[test]
    fn test_resolved_quest_not_awarded_again() {
        let slots = vec![QuestSlot::resolved("q1", 3), QuestSlot::open("q2", 3)];
        assert_eq!(award_for(300, &slots, &QuestId::from("q1")), 0);
        assert_eq!(award_for(300, &slots, &QuestId::from("q2")), 300);
    }

    #[test]
    fn test_award_matches_trimmed_preview() {
        // 5 / 3 rounds to 2 each; the last quest is shown 1 and must be paid 1
        let slots = open_slots(&[1, 1, 1]);
        let rewards = preview(5, &slots);
        for reward in &rewards {
            assert_eq!(award_for(5, &slots, &reward.quest_id), reward.potential_xp);
        }
        assert_eq!(award_for(5, &slots, &QuestId::from("q3")), 1);
        assert_eq!(award_for(5, &slots, &QuestId::from("missing")), 0);
    }

    #[test]
    fn test_preview_is_idempotent() {
        let slots = open_slots(&[1, 2, 3, 5, 8]);
        let first = preview(777, &slots);
        let second = preview(777, &slots);
        assert_eq!(first, second);
    }
}
