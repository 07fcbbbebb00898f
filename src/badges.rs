//! Badge evaluation and awarding.
//!
//! Badges are only ever added. [`BadgeCatalog::evaluate`] reports badges the
//! player qualifies for but does not hold yet; [`BadgeCatalog::award`] applies
//! their rewards exactly once.

use std::collections::BTreeSet;

use crate::blueprint::{BadgeDef, Blueprint, FINALE_BEAT, Requirement};
use crate::stats::PlayerStats;

/// Accuracy a streak badge also requires on its skill.
pub const STREAK_ACCURACY: f64 = 0.75;

/// Achievement flag raised alongside a badge, if any.
pub fn achievement_flag(badge_id: &str) -> Option<&'static str> {
    match badge_id {
        "carry_master" => Some("carryMaster"),
        "coin_artist" => Some("coinArtist"),
        "clock_guardian" => Some("clockGuardian"),
        "times_table_hero" => Some("timesTableHero"),
        "unit_wizard" => Some("unitWizard"),
        "story_scholar" => Some("storyScholar"),
        _ => None,
    }
}

#[derive(Clone, Debug)]
pub struct BadgeCatalog {
    badges: Vec<BadgeDef>,
}

impl BadgeCatalog {
    pub fn new(badges: Vec<BadgeDef>) -> Self {
        Self { badges }
    }

    pub fn from_blueprint(blueprint: &Blueprint) -> Self {
        Self::new(blueprint.badges.clone())
    }

    pub fn standard() -> Self {
        Self::from_blueprint(Blueprint::standard())
    }

    pub fn get(&self, id: &str) -> Option<&BadgeDef> {
        self.badges.iter().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BadgeDef> {
        self.badges.iter()
    }

    fn qualifies(requirement: &Requirement, stats: &PlayerStats) -> bool {
        match requirement {
            Requirement::Streak { skill, count } => stats
                .skill_mastery
                .get(skill)
                .is_some_and(|m| m.streak >= *count && m.accuracy >= STREAK_ACCURACY),
            Requirement::MiniGame { mini_game, wins } => stats.mini_game_record(mini_game).wins >= *wins,
            Requirement::StoryClear { episodes } => {
                stats.story_beats_unlocked.len() >= *episodes || stats.story_beats_unlocked.contains(FINALE_BEAT)
            }
        }
    }

    /// Ids of badges newly qualified for, in catalog order.
    pub fn evaluate(&self, stats: &PlayerStats) -> Vec<String> {
        self.badges
            .iter()
            .filter(|b| !stats.badges.contains(&b.id))
            .filter(|b| Self::qualifies(&b.requirement, stats))
            .map(|b| b.id.clone())
            .collect()
    }

    /// Grant `new_badges`, skipping held or unknown ids. Returns the bonus
    /// points paid.
    pub fn award(&self, stats: &mut PlayerStats, new_badges: &[String]) -> u32 {
        let mut bonus: u32 = 0;
        let unique: BTreeSet<&String> = new_badges.iter().collect();
        for id in unique {
            let Some(def) = self.get(id) else {
                tracing::warn!(badge = %id, "ignoring unknown badge");
                continue;
            };
            if !stats.badges.insert(def.id.clone()) {
                continue;
            }
            bonus = bonus.saturating_add(def.reward.points);
            if let Some(unlock) = &def.reward.shop_unlock {
                stats.shop_unlocks.insert(unlock.clone());
            }
            if let Some(flag) = achievement_flag(&def.id) {
                stats.achievements.insert(flag.to_string(), true);
            }
            tracing::info!(badge = %def.id, points = def.reward.points, "badge earned");
        }
        stats.points = stats.points.saturating_add(bonus);
        bonus
    }

    /// Evaluate, award, and return what was newly earned.
    pub fn evaluate_and_award(&self, stats: &mut PlayerStats) -> Vec<String> {
        let earned = self.evaluate(stats);
        if !earned.is_empty() {
            self.award(stats, &earned);
        }
        earned
    }
}

impl Default for BadgeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
