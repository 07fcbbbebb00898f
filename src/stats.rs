//! Persistent player statistics.
//!
//! [`PlayerStats`] is the single aggregate saved to local storage. Every
//! mutation goes through one of the `record_*` methods, which also run badge
//! evaluation so rewards are granted as soon as they are earned. Loading old or
//! hand-edited saves goes through [`PlayerStats::normalize`], which accepts
//! each field independently and falls back to the default for anything it
//! cannot read.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, Datelike, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::badges::BadgeCatalog;
use crate::blueprint::FINALE_BEAT;
use crate::i18n::Locale;
use crate::mastery::{MasteryBook, SkillMasteryEntry};
use crate::skill::Subject;

/// Entries kept in [`ModeHistory`].
pub const HISTORY_LIMIT: usize = 120;
/// Weeks kept in `weekly_progress`.
pub const WEEKS_KEPT: usize = 12;
pub const FIRST_LEVEL_EXP: u32 = 100;
pub const LEVEL_EXP_GROWTH: f64 = 1.35;
pub const STORY_POINTS: u32 = 150;
pub const FINALE_POINTS: u32 = 400;

/// Achievement flags every save starts with.
pub const BASE_ACHIEVEMENTS: [&str; 3] = ["langNovice", "readingChamp", "bugCatcher"];

// --- Per-language counters ---------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageRecord {
    pub answered: u32,
    pub correct: u32,
    pub comprehension_answered: u32,
    pub comprehension_correct: u32,
    pub streak: u32,
}

impl LanguageRecord {
    fn record(&mut self, correct: bool, comprehension: bool) {
        self.answered = self.answered.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
            self.streak = self.streak.saturating_add(1);
        } else {
            self.streak = 0;
        }
        if comprehension {
            self.comprehension_answered = self.comprehension_answered.saturating_add(1);
            if correct {
                self.comprehension_correct = self.comprehension_correct.saturating_add(1);
            }
        }
    }
}

fn empty_table() -> BTreeMap<Locale, LanguageRecord> {
    Locale::ALL.iter().map(|l| (*l, LanguageRecord::default())).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub kokugo: BTreeMap<Locale, LanguageRecord>,
    pub math: BTreeMap<Locale, LanguageRecord>,
}

impl Default for LanguageStats {
    fn default() -> Self {
        Self { kokugo: empty_table(), math: empty_table() }
    }
}

impl LanguageStats {
    pub fn get(&self, subject: Subject, locale: Locale) -> LanguageRecord {
        self.table(subject).get(&locale).cloned().unwrap_or_default()
    }

    fn table(&self, subject: Subject) -> &BTreeMap<Locale, LanguageRecord> {
        match subject {
            Subject::Kokugo => &self.kokugo,
            Subject::Math => &self.math,
        }
    }

    fn entry(&mut self, subject: Subject, locale: Locale) -> &mut LanguageRecord {
        let table = match subject {
            Subject::Kokugo => &mut self.kokugo,
            Subject::Math => &mut self.math,
        };
        table.entry(locale).or_default()
    }

    /// Lenient reader: every `subject × locale` cell is parsed on its own.
    fn from_value(raw: Option<&Value>) -> Self {
        let mut stats = LanguageStats::default();
        let Some(raw) = raw else { return stats };
        for (subject, key) in [(Subject::Kokugo, "kokugo"), (Subject::Math, "math")] {
            for locale in Locale::ALL {
                if let Some(cell) = raw.get(key).and_then(|s| s.get(locale.code())) {
                    if let Ok(record) = LanguageRecord::deserialize(cell) {
                        *stats.entry(subject, locale) = record;
                    }
                }
            }
        }
        stats
    }
}

// --- History and weekly progress ---------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HistoryEntry {
    Question {
        timestamp: i64,
        subject: Subject,
        skill: String,
        correct: bool,
        #[serde(rename = "responseTime", default)]
        response_time: Option<f64>,
    },
    LevelUp {
        timestamp: i64,
        levels: Vec<u32>,
    },
    Story {
        timestamp: i64,
        id: String,
    },
}

/// Ring buffer of the most recent [`HISTORY_LIMIT`] events, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeHistory(VecDeque<HistoryEntry>);

impl ModeHistory {
    pub fn push(&mut self, entry: HistoryEntry) {
        self.0.push_back(entry);
        while self.0.len() > HISTORY_LIMIT {
            self.0.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.0.back()
    }

    /// Keeps readable entries and the newest [`HISTORY_LIMIT`] of them.
    fn from_value(raw: Option<&Value>) -> Self {
        let mut history = ModeHistory::default();
        if let Some(Value::Array(items)) = raw {
            for item in items {
                if let Ok(entry) = HistoryEntry::deserialize(item) {
                    history.push(entry);
                }
            }
        }
        history
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyEntry {
    pub week: String,
    pub answered: u32,
    pub correct: u32,
    pub points: u32,
}

/// `YYYY-W{n}` where `n = ceil((day_of_month + weekday_from_sunday) / 7)`.
pub fn week_key(now: DateTime<Utc>) -> String {
    let offset = now.day() + now.weekday().num_days_from_sunday();
    format!("{}-W{}", now.year(), offset.div_ceil(7))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiniGameRecord {
    pub wins: u32,
    pub attempts: u32,
    pub streak: u32,
}

// --- Aggregate -----------------------------------------------------------------

/// One answered question, from any mode.
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerEvent {
    pub subject: Subject,
    pub lang: Locale,
    /// Mastery key; for kokugo this is the question type.
    pub skill: String,
    /// Kokugo question type (`comprehension` feeds the reading counters).
    pub question_type: Option<String>,
    pub correct: bool,
    pub response_time: Option<f64>,
}

impl AnswerEvent {
    pub fn math(lang: Locale, skill: &str, correct: bool) -> Self {
        Self {
            subject: Subject::Math,
            lang,
            skill: skill.to_string(),
            question_type: Some(skill.to_string()),
            correct,
            response_time: None,
        }
    }
}

/// What a single [`PlayerStats::record_answer`] call changed.
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerOutcome {
    pub mastery: SkillMasteryEntry,
    pub points_gained: u32,
    pub experience_gained: u32,
    /// Player levels reached during this answer, in order.
    pub level_ups: Vec<u32>,
    pub new_badges: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStats {
    pub total_questions_answered: u32,
    pub correct_answers: u32,
    pub total_monsters_defeated: u32,
    pub unlocked_monsters: BTreeSet<String>,
    pub badges: BTreeSet<String>,
    pub shop_unlocks: BTreeSet<String>,
    pub language_stats: LanguageStats,
    pub skill_mastery: MasteryBook,
    pub achievements: BTreeMap<String, bool>,
    pub points: u32,
    pub experience: u32,
    pub level: u32,
    pub next_level_exp: u32,
    pub weekly_progress: Vec<WeeklyEntry>,
    pub mode_history: ModeHistory,
    pub mini_game_records: BTreeMap<String, MiniGameRecord>,
    pub story_beats_unlocked: BTreeSet<String>,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            total_questions_answered: 0,
            correct_answers: 0,
            total_monsters_defeated: 0,
            unlocked_monsters: BTreeSet::new(),
            badges: BTreeSet::new(),
            shop_unlocks: BTreeSet::new(),
            language_stats: LanguageStats::default(),
            skill_mastery: MasteryBook::new(),
            achievements: BASE_ACHIEVEMENTS.iter().map(|a| (a.to_string(), false)).collect(),
            points: 0,
            experience: 0,
            level: 1,
            next_level_exp: FIRST_LEVEL_EXP,
            weekly_progress: Vec::new(),
            mode_history: ModeHistory::default(),
            mini_game_records: BTreeMap::new(),
            story_beats_unlocked: BTreeSet::new(),
        }
    }
}

/// Overwrite `slot` with `raw[key]` when present and well-formed.
fn take_field<T: DeserializeOwned>(raw: &Map<String, Value>, key: &str, slot: &mut T) {
    let Some(value) = raw.get(key) else { return };
    match T::deserialize(value) {
        Ok(parsed) => *slot = parsed,
        Err(err) => tracing::warn!(field = key, %err, "discarding malformed stats field"),
    }
}

impl PlayerStats {
    /// Rebuild stats from an arbitrary JSON value, field by field.
    ///
    /// Non-objects yield the defaults. Set fields are deduplicated, history is
    /// truncated to its newest entries and the level curve is kept sane.
    pub fn normalize(raw: &Value) -> PlayerStats {
        let mut stats = PlayerStats::default();
        let Some(obj) = raw.as_object() else {
            return stats;
        };

        take_field(obj, "totalQuestionsAnswered", &mut stats.total_questions_answered);
        take_field(obj, "correctAnswers", &mut stats.correct_answers);
        take_field(obj, "totalMonstersDefeated", &mut stats.total_monsters_defeated);
        take_field(obj, "unlockedMonsters", &mut stats.unlocked_monsters);
        take_field(obj, "badges", &mut stats.badges);
        take_field(obj, "shopUnlocks", &mut stats.shop_unlocks);
        take_field(obj, "skillMastery", &mut stats.skill_mastery);
        take_field(obj, "points", &mut stats.points);
        take_field(obj, "experience", &mut stats.experience);
        take_field(obj, "level", &mut stats.level);
        take_field(obj, "nextLevelExp", &mut stats.next_level_exp);
        take_field(obj, "weeklyProgress", &mut stats.weekly_progress);
        take_field(obj, "miniGameRecords", &mut stats.mini_game_records);
        take_field(obj, "storyBeatsUnlocked", &mut stats.story_beats_unlocked);

        stats.language_stats = LanguageStats::from_value(obj.get("languageStats"));
        stats.mode_history = ModeHistory::from_value(obj.get("modeHistory"));

        let mut saved = BTreeMap::<String, bool>::new();
        take_field(obj, "achievements", &mut saved);
        stats.achievements.extend(saved);

        stats.level = stats.level.max(1);
        stats.next_level_exp = stats.next_level_exp.max(1);
        if stats.weekly_progress.len() > WEEKS_KEPT {
            let excess = stats.weekly_progress.len() - WEEKS_KEPT;
            stats.weekly_progress.drain(..excess);
        }
        stats
    }

    pub fn achievement(&self, flag: &str) -> bool {
        self.achievements.get(flag).copied().unwrap_or(false)
    }

    pub fn mini_game_record(&self, id: &str) -> MiniGameRecord {
        self.mini_game_records.get(id).cloned().unwrap_or_default()
    }

    /// Apply one answered question: language counters, mastery, points,
    /// experience, history, weekly progress, badges and kokugo achievements.
    pub fn record_answer(&mut self, event: &AnswerEvent, badges: &BadgeCatalog, now: DateTime<Utc>) -> AnswerOutcome {
        let comprehension =
            event.subject == Subject::Kokugo && event.question_type.as_deref() == Some("comprehension");
        let lang_record = {
            let record = self.language_stats.entry(event.subject, event.lang);
            record.record(event.correct, comprehension);
            record.clone()
        };

        let mastery = self.skill_mastery.record(&event.skill, event.correct);
        let mastery_level = u32::from(mastery.level.max(1));
        let points_gained = if event.correct { 20 + 2 * mastery_level } else { (mastery_level / 2).max(1) };
        let experience_gained = if event.correct { 15 + mastery_level } else { 5 };

        self.points = self.points.saturating_add(points_gained);
        let level_ups = self.gain_experience(experience_gained);
        self.total_questions_answered = self.total_questions_answered.saturating_add(1);
        if event.correct {
            self.correct_answers = self.correct_answers.saturating_add(1);
        }

        let timestamp = now.timestamp_millis();
        self.mode_history.push(HistoryEntry::Question {
            timestamp,
            subject: event.subject,
            skill: event.skill.clone(),
            correct: event.correct,
            response_time: event.response_time,
        });
        if !level_ups.is_empty() {
            tracing::info!(level = self.level, "player level up");
            self.mode_history.push(HistoryEntry::LevelUp { timestamp, levels: level_ups.clone() });
        }

        self.track_week(now, event.correct, points_gained);
        let new_badges = badges.evaluate_and_award(self);

        if event.subject == Subject::Kokugo {
            if lang_record.correct >= 5 {
                self.achievements.insert("langNovice".into(), true);
            }
            let comp_answered = lang_record.comprehension_answered.max(1);
            let percent = (f64::from(lang_record.comprehension_correct) / f64::from(comp_answered) * 100.0).round();
            if lang_record.comprehension_correct >= 3 && percent >= 70.0 {
                self.achievements.insert("readingChamp".into(), true);
            }
        }

        AnswerOutcome { mastery, points_gained, experience_gained, level_ups, new_badges }
    }

    fn gain_experience(&mut self, amount: u32) -> Vec<u32> {
        let mut level_ups = Vec::new();
        self.experience = self.experience.saturating_add(amount);
        while self.experience >= self.next_level_exp.max(1) {
            self.experience -= self.next_level_exp.max(1);
            self.level = self.level.saturating_add(1);
            level_ups.push(self.level);
            self.next_level_exp = (f64::from(self.next_level_exp) * LEVEL_EXP_GROWTH).round() as u32;
        }
        level_ups
    }

    fn track_week(&mut self, now: DateTime<Utc>, correct: bool, points: u32) {
        let key = week_key(now);
        let idx = match self.weekly_progress.iter().position(|w| w.week == key) {
            Some(idx) => idx,
            None => {
                self.weekly_progress.push(WeeklyEntry { week: key, ..Default::default() });
                self.weekly_progress.len() - 1
            }
        };
        let week = &mut self.weekly_progress[idx];
        week.answered = week.answered.saturating_add(1);
        if correct {
            week.correct = week.correct.saturating_add(1);
        }
        week.points = week.points.saturating_add(points);
        if self.weekly_progress.len() > WEEKS_KEPT {
            let excess = self.weekly_progress.len() - WEEKS_KEPT;
            self.weekly_progress.drain(..excess);
        }
    }

    /// Count a defeated monster and pay its bonus. Returns newly earned badges.
    pub fn record_monster_defeat(&mut self, monster_type: &str, bonus_points: u32, badges: &BadgeCatalog) -> Vec<String> {
        self.total_monsters_defeated = self.total_monsters_defeated.saturating_add(1);
        self.unlocked_monsters.insert(monster_type.to_string());
        self.points = self.points.saturating_add(bonus_points);
        badges.evaluate_and_award(self)
    }

    /// Update a mini-game's win/attempt/streak record. Returns newly earned badges.
    pub fn record_mini_game(&mut self, id: &str, correct: bool, badges: &BadgeCatalog) -> Vec<String> {
        let record = self.mini_game_records.entry(id.to_string()).or_default();
        record.attempts = record.attempts.saturating_add(1);
        if correct {
            record.wins = record.wins.saturating_add(1);
            record.streak = record.streak.saturating_add(1);
        } else {
            record.streak = 0;
        }
        badges.evaluate_and_award(self)
    }

    /// Unlock a story beat. Points are paid only the first time a beat is
    /// completed. Returns newly earned badges.
    pub fn complete_story_beat(&mut self, beat_id: &str, badges: &BadgeCatalog, now: DateTime<Utc>) -> Vec<String> {
        if self.story_beats_unlocked.insert(beat_id.to_string()) {
            self.points = self.points.saturating_add(if beat_id == FINALE_BEAT { FINALE_POINTS } else { STORY_POINTS });
        }
        self.mode_history.push(HistoryEntry::Story { timestamp: now.timestamp_millis(), id: beat_id.to_string() });
        badges.evaluate_and_award(self)
    }

    /// Fraction of all answers that were correct, 0 when nothing was answered.
    pub fn accuracy(&self) -> f64 {
        if self.total_questions_answered == 0 {
            return 0.0;
        }
        f64::from(self.correct_answers) / f64::from(self.total_questions_answered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn defaults_match_a_fresh_save() {
        let stats = PlayerStats::default();
        assert_eq!(stats.level, 1);
        assert_eq!(stats.next_level_exp, 100);
        assert!(!stats.achievement("langNovice"));
        assert_eq!(stats.language_stats.math.len(), 4);
    }

    #[test]
    fn week_key_uses_day_plus_weekday() {
        // 2024-03-01 was a Friday: (1 + 5) / 7 rounds up to 1.
        assert_eq!(week_key(at(2024, 3, 1)), "2024-W1");
        // Sunday the 3rd: (3 + 0) / 7 is still the first bucket.
        assert_eq!(week_key(at(2024, 3, 3)), "2024-W1");
        // Monday the 4th: (4 + 1) / 7 as well, Saturday the 9th: (9 + 6) / 7 -> 3.
        assert_eq!(week_key(at(2024, 3, 9)), "2024-W3");
        assert_eq!(week_key(at(2024, 3, 31)), "2024-W5");
    }

    #[test]
    fn counters_saturate_instead_of_overflowing() {
        let badges = BadgeCatalog::standard();
        let mut stats = PlayerStats { points: u32::MAX - 5, total_questions_answered: u32::MAX, ..PlayerStats::default() };
        stats.record_answer(&AnswerEvent::math(Locale::Ja, "addition", true), &badges, at(2024, 5, 6));
        assert_eq!(stats.points, u32::MAX);
        assert_eq!(stats.total_questions_answered, u32::MAX);

        stats.record_monster_defeat("slime", 500, &badges);
        stats.complete_story_beat("finale", &badges, at(2024, 5, 6));
        assert_eq!(stats.points, u32::MAX);
    }

    #[test]
    fn correct_answer_pays_points_and_experience() {
        let badges = BadgeCatalog::standard();
        let mut stats = PlayerStats::default();
        let out = stats.record_answer(&AnswerEvent::math(Locale::Ja, "addition", true), &badges, at(2024, 5, 6));
        assert_eq!(out.points_gained, 22);
        assert_eq!(out.experience_gained, 16);
        assert_eq!(stats.points, 22);
        assert_eq!(stats.total_questions_answered, 1);
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(stats.language_stats.get(Subject::Math, Locale::Ja).streak, 1);

        let out = stats.record_answer(&AnswerEvent::math(Locale::Ja, "addition", false), &badges, at(2024, 5, 6));
        assert_eq!(out.points_gained, 1);
        assert_eq!(out.experience_gained, 5);
        assert_eq!(stats.weekly_progress.len(), 1);
        assert_eq!(stats.weekly_progress[0].answered, 2);
        assert_eq!(stats.weekly_progress[0].points, 23);
    }

    #[test]
    fn experience_overflow_levels_up_repeatedly() {
        let mut stats = PlayerStats { experience: 99, ..Default::default() };
        let ups = stats.gain_experience(240);
        // 339 - 100 = 239 (next 135), 239 - 135 = 104 (next 182).
        assert_eq!(ups, vec![2, 3]);
        assert_eq!(stats.experience, 104);
        assert_eq!(stats.next_level_exp, 182);
    }

    #[test]
    fn level_up_is_logged_after_question() {
        let badges = BadgeCatalog::standard();
        let mut stats = PlayerStats { experience: 90, ..Default::default() };
        stats.record_answer(&AnswerEvent::math(Locale::En, "comparison", true), &badges, at(2024, 1, 1));
        let kinds: Vec<_> = stats.mode_history.iter().map(|e| matches!(e, HistoryEntry::LevelUp { .. })).collect();
        assert_eq!(kinds, vec![false, true]);
    }

    #[test]
    fn history_is_capped() {
        let mut history = ModeHistory::default();
        for i in 0..(HISTORY_LIMIT as i64 + 30) {
            history.push(HistoryEntry::Story { timestamp: i, id: "intro".into() });
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.iter().next(), Some(&HistoryEntry::Story { timestamp: 30, id: "intro".into() }));
    }

    #[test]
    fn kokugo_achievements_unlock() {
        let badges = BadgeCatalog::standard();
        let mut stats = PlayerStats::default();
        let event = |qt: &str, correct| AnswerEvent {
            subject: Subject::Kokugo,
            lang: Locale::Ja,
            skill: qt.to_string(),
            question_type: Some(qt.to_string()),
            correct,
            response_time: None,
        };
        for _ in 0..3 {
            stats.record_answer(&event("comprehension", true), &badges, at(2024, 2, 2));
        }
        assert!(stats.achievement("readingChamp"));
        assert!(!stats.achievement("langNovice"));
        stats.record_answer(&event("kanji", true), &badges, at(2024, 2, 2));
        stats.record_answer(&event("vocab", true), &badges, at(2024, 2, 2));
        assert!(stats.achievement("langNovice"));
    }

    #[test]
    fn story_points_paid_once() {
        let badges = BadgeCatalog::standard();
        let mut stats = PlayerStats::default();
        stats.complete_story_beat("intro", &badges, at(2024, 2, 2));
        stats.complete_story_beat("intro", &badges, at(2024, 2, 3));
        assert_eq!(stats.points, STORY_POINTS);
        assert_eq!(stats.mode_history.len(), 2);
    }

    #[test]
    fn normalize_keeps_good_fields_and_repairs_bad_ones() {
        let raw = json!({
            "points": 150,
            "badges": ["carry_master", "carry_master"],
            "level": "eleven",
            "nextLevelExp": 0,
            "achievements": { "carryMaster": true },
            "languageStats": { "math": { "en": { "answered": 4, "correct": 3 }, "es": { "answered": 9 } } },
            "modeHistory": [
                { "event": "story", "timestamp": 1, "id": "intro" },
                { "event": "teleport", "timestamp": 2 }
            ],
            "heroLoadout": { "outfit": "astro_cape" }
        });
        let stats = PlayerStats::normalize(&raw);
        assert_eq!(stats.points, 150);
        assert_eq!(stats.badges.len(), 1);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.next_level_exp, 1);
        assert!(stats.achievement("carryMaster"));
        assert!(stats.achievements.contains_key("bugCatcher"));
        assert_eq!(stats.language_stats.get(Subject::Math, Locale::En).correct, 3);
        assert_eq!(stats.language_stats.kokugo.len(), 4);
        assert_eq!(stats.mode_history.len(), 1);
        assert_eq!(PlayerStats::normalize(&json!(null)), PlayerStats::default());
    }
}
