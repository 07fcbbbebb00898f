//! Per-skill mastery tracking.
//!
//! Each skill key owns a [`SkillMasteryEntry`] that is created on the first
//! answer and mutated on every answer after that. The entry's `level` doubles
//! as the default difficulty stage for that skill's next problem.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::skill::{MAX_STAGE, MIN_STAGE};

/// Consecutive correct answers needed before a promotion is considered.
pub const PROMOTE_STREAK: u32 = 5;
/// Accuracy needed (together with the streak) to promote.
pub const PROMOTE_ACCURACY: f64 = 0.8;
/// Accuracy under which a wrong answer demotes.
pub const DEMOTE_ACCURACY: f64 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillMasteryEntry {
    pub answered: u32,
    pub correct: u32,
    pub streak: u32,
    pub accuracy: f64,
    pub level: u8,
}

impl Default for SkillMasteryEntry {
    fn default() -> Self {
        Self { answered: 0, correct: 0, streak: 0, accuracy: 0.0, level: MIN_STAGE }
    }
}

impl SkillMasteryEntry {
    /// Apply one answer. Promotion and demotion are mutually exclusive and
    /// move the level by exactly one step.
    pub fn record_result(&mut self, is_correct: bool) -> &Self {
        self.answered += 1;
        if is_correct {
            self.correct += 1;
            self.streak += 1;
        } else {
            self.streak = 0;
        }
        self.accuracy = self.correct as f64 / self.answered.max(1) as f64;

        let level = self.level.clamp(MIN_STAGE, MAX_STAGE);
        self.level = if is_correct && self.streak >= PROMOTE_STREAK && self.accuracy >= PROMOTE_ACCURACY {
            (level + 1).min(MAX_STAGE)
        } else if !is_correct && self.accuracy < DEMOTE_ACCURACY {
            level.saturating_sub(1).max(MIN_STAGE)
        } else {
            level
        };
        self
    }
}

/// All mastery entries, keyed by skill key. Serialized as a plain JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasteryBook {
    entries: BTreeMap<String, SkillMasteryEntry>,
}

impl MasteryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer for `skill`, creating its entry lazily.
    pub fn record(&mut self, skill: &str, is_correct: bool) -> SkillMasteryEntry {
        let entry = self.entries.entry(skill.to_string()).or_default();
        let before = entry.level;
        entry.record_result(is_correct);
        if entry.level != before {
            tracing::debug!(skill, from = before, to = entry.level, "mastery level changed");
        }
        entry.clone()
    }

    pub fn get(&self, skill: &str) -> Option<&SkillMasteryEntry> {
        self.entries.get(skill)
    }

    /// Stage the generator should use for this skill's next problem.
    pub fn stage_for(&self, skill: &str) -> u8 {
        self.entries.get(skill).map_or(MIN_STAGE, |e| e.level.clamp(MIN_STAGE, MAX_STAGE))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SkillMasteryEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_correct_in_a_row_promotes_once() {
        let mut book = MasteryBook::new();
        for _ in 0..4 {
            assert_eq!(book.record("addition_carry", true).level, 1);
        }
        let entry = book.record("addition_carry", true);
        assert_eq!(entry.streak, 5);
        assert_eq!(entry.level, 2);
        assert_eq!(book.stage_for("addition_carry"), 2);
    }

    #[test]
    fn streak_resets_and_low_accuracy_demotes() {
        let mut entry = SkillMasteryEntry { level: 3, ..Default::default() };
        entry.record_result(true);
        assert_eq!(entry.streak, 1);
        entry.record_result(false);
        // 1/2 correct is not below 0.5, so the level sticks.
        assert_eq!(entry.level, 3);
        assert_eq!(entry.streak, 0);
        entry.record_result(false);
        assert_eq!(entry.level, 2);
        assert!((entry.accuracy - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn level_never_leaves_bounds() {
        let mut entry = SkillMasteryEntry::default();
        for _ in 0..40 {
            entry.record_result(true);
        }
        assert_eq!(entry.level, MAX_STAGE);
        for _ in 0..200 {
            entry.record_result(false);
        }
        assert_eq!(entry.level, MIN_STAGE);
    }

    #[test]
    fn unknown_skill_defaults_to_stage_one() {
        assert_eq!(MasteryBook::new().stage_for("division_basic"), 1);
    }
}
