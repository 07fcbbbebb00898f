//! Skill-drill mini-games.
//!
//! Each mini-game drills the single skill its blueprint config names. A session
//! starts at stage 1 and climbs or drops one stage per answer.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::badges::BadgeCatalog;
use crate::blueprint::{Blueprint, MiniGameConfig};
use crate::error::GameError;
use crate::i18n::{Catalog, Locale};
use crate::problem::{Answer, Problem, ProblemGenerator};
use crate::skill::{Grade, MAX_STAGE, MIN_STAGE};
use crate::stats::{AnswerEvent, PlayerStats};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniGameFeedback {
    pub correct: bool,
    pub expected: Answer,
    pub new_badges: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct MiniGameSession {
    config: MiniGameConfig,
    grade: Grade,
    locale: Locale,
    stage: u8,
    problem: Problem,
    success_count: u32,
    progress: u32,
}

impl MiniGameSession {
    pub fn start<R: Rng + ?Sized>(
        id: &str,
        blueprint: &Blueprint,
        catalog: &Catalog,
        grade: Grade,
        locale: Locale,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let config = blueprint.mini_game(id).cloned().ok_or_else(|| GameError::UnknownMiniGame(id.to_string()))?;
        let problem = ProblemGenerator::new(catalog, locale).generate(&config.skill, grade, MIN_STAGE, rng);
        tracing::debug!(mini_game = id, skill = %config.skill, "mini-game started");
        Ok(Self { config, grade, locale, stage: MIN_STAGE, problem, success_count: 0, progress: 0 })
    }

    pub fn config(&self) -> &MiniGameConfig {
        &self.config
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn stage(&self) -> u8 {
        self.stage
    }

    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    /// Answers given so far.
    pub fn progress(&self) -> u32 {
        self.progress
    }

    /// Grade the current problem, update the mini-game record and the player's
    /// stats, then move to a new problem one stage up or down.
    pub fn submit<R: Rng + ?Sized>(
        &mut self,
        selected: &str,
        stats: &mut PlayerStats,
        badges: &BadgeCatalog,
        catalog: &Catalog,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> MiniGameFeedback {
        let correct = self.problem.is_correct(selected);
        let expected = self.problem.answer.clone();

        let mut new_badges = stats.record_mini_game(&self.config.id, correct, badges);
        let outcome = stats.record_answer(&AnswerEvent::math(self.locale, &self.config.skill, correct), badges, now);
        new_badges.extend(outcome.new_badges);

        self.progress += 1;
        if correct {
            self.success_count += 1;
            self.stage = (self.stage + 1).min(MAX_STAGE);
        } else {
            self.stage = self.stage.saturating_sub(1).max(MIN_STAGE);
        }
        self.problem = ProblemGenerator::new(catalog, self.locale).generate(&self.config.skill, self.grade, self.stage, rng);

        MiniGameFeedback { correct, expected, new_badges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_710_000_000, 0).unwrap()
    }

    #[test]
    fn unknown_game_is_an_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = MiniGameSession::start("bug_hunt", Blueprint::standard(), &Catalog::builtin(), Grade::Second, Locale::Ja, &mut rng)
            .unwrap_err();
        assert_eq!(err, GameError::UnknownMiniGame("bug_hunt".into()));
    }

    #[test]
    fn five_coin_wins_earn_coin_artist() {
        let catalog = Catalog::builtin();
        let badges = BadgeCatalog::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut stats = PlayerStats::default();
        let mut session =
            MiniGameSession::start("coin_count", Blueprint::standard(), &catalog, Grade::Second, Locale::Ja, &mut rng).unwrap();
        assert_eq!(session.problem().skill, "money_counting");

        let mut earned = Vec::new();
        for _ in 0..5 {
            let answer = session.problem().answer.to_string();
            let fb = session.submit(&answer, &mut stats, &badges, &catalog, now(), &mut rng);
            assert!(fb.correct);
            earned.extend(fb.new_badges);
        }
        assert_eq!(earned, vec!["coin_artist".to_string()]);
        assert_eq!(session.stage(), MAX_STAGE);
        let record = stats.mini_game_record("coin_count");
        assert_eq!((record.wins, record.attempts, record.streak), (5, 5, 5));
        assert!(stats.shop_unlocks.contains("coin_pouch"));
    }

    #[test]
    fn miss_drops_stage_and_resets_streak() {
        let catalog = Catalog::builtin();
        let badges = BadgeCatalog::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut stats = PlayerStats::default();
        let mut session =
            MiniGameSession::start("array_painter", Blueprint::standard(), &catalog, Grade::Third, Locale::En, &mut rng).unwrap();
        let answer = session.problem().answer.to_string();
        session.submit(&answer, &mut stats, &badges, &catalog, now(), &mut rng);
        assert_eq!(session.stage(), 2);
        let fb = session.submit("-1", &mut stats, &badges, &catalog, now(), &mut rng);
        assert!(!fb.correct);
        assert_eq!(session.stage(), 1);
        assert_eq!(stats.mini_game_record("array_painter").streak, 0);
        assert_eq!(session.progress(), 2);
    }
}
