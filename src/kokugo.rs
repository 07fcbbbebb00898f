//! Japanese-language (kokugo) practice.
//!
//! Questions come from a JSON bank of entries with one translation per
//! locale. [`QuestionBank`] flattens the bank per `grade-subject-lang` on first
//! use and caches the result. [`KokugoSession`] runs a short quiz over it.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::badges::BadgeCatalog;
use crate::error::GameError;
use crate::i18n::Locale;
use crate::skill::{Grade, Subject};
use crate::speech::{Speaker, speech_locale};
use crate::stats::{AnswerEvent, PlayerStats};

const BUILTIN_BANK: &str = include_str!("../data/kokugo_questions.json");
const DEFAULT_SUFFIX: &str = "0000";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub const ORDER: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn parse(s: &str) -> Option<Difficulty> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tts {
    pub text: String,
    pub lang: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Localized {
    prompt: String,
    #[serde(default)]
    choices: Vec<String>,
    answer: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    hints: Vec<String>,
    #[serde(default)]
    tts: Option<Tts>,
}

#[derive(Clone, Debug, Deserialize)]
struct BankEntry {
    grade: Grade,
    subject: Subject,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    difficulty: Difficulty,
    translations: BTreeMap<Locale, Localized>,
}

impl BankEntry {
    fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX)
    }

    fn localize(&self, lang: Locale) -> Option<KokugoQuestion> {
        let loc = self.translations.get(&lang)?;
        let subject = match self.subject {
            Subject::Kokugo => "kokugo",
            Subject::Math => "math",
        };
        Some(KokugoQuestion {
            id: format!("{subject}-{lang}-{}-{}", self.grade.number(), self.suffix()),
            grade: self.grade,
            subject: self.subject,
            kind: self.kind.clone(),
            difficulty: self.difficulty,
            lang,
            prompt: loc.prompt.clone(),
            choices: loc.choices.clone(),
            answer: loc.answer.clone(),
            explanation: loc.explanation.clone(),
            hints: loc.hints.clone(),
            tts: loc.tts.clone(),
            suffix: self.suffix().to_string(),
        })
    }
}

/// One question in one language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KokugoQuestion {
    /// `{subject}-{lang}-{grade}-{suffix}`.
    pub id: String,
    pub grade: Grade,
    pub subject: Subject,
    #[serde(rename = "type")]
    pub kind: String,
    pub difficulty: Difficulty,
    pub lang: Locale,
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer: String,
    pub explanation: String,
    pub hints: Vec<String>,
    pub tts: Option<Tts>,
    pub suffix: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionFilter {
    pub grade: Grade,
    pub lang: Locale,
    /// Preferred difficulty; others are used when it has no candidates.
    pub difficulty: Option<Difficulty>,
    /// Allowed question types; empty allows all.
    pub types: Vec<String>,
    pub exclude: Vec<String>,
}

impl QuestionFilter {
    pub fn new(grade: Grade, lang: Locale) -> Self {
        Self { grade, lang, difficulty: None, types: Vec::new(), exclude: Vec::new() }
    }

    fn allows_type(&self, kind: &str) -> bool {
        self.types.is_empty() || self.types.iter().any(|t| t == kind)
    }

    /// Difficulty is only a preference, so it does not take part here.
    fn matches(&self, q: &KokugoQuestion) -> bool {
        !self.exclude.contains(&q.id) && self.allows_type(&q.kind)
    }
}

pub struct QuestionBank {
    entries: Vec<BankEntry>,
    cache: HashMap<String, Vec<KokugoQuestion>>,
}

impl QuestionBank {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<BankEntry> = serde_json::from_str(json)?;
        Ok(Self { entries, cache: HashMap::new() })
    }

    /// Bank compiled into the crate.
    pub fn builtin() -> Result<Self, serde_json::Error> {
        Self::from_json(BUILTIN_BANK)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Every question for `grade`/`subject` translated into `lang`.
    pub fn load(&mut self, grade: Grade, subject: Subject, lang: Locale) -> &[KokugoQuestion] {
        let subject_key = match subject {
            Subject::Kokugo => "kokugo",
            Subject::Math => "math",
        };
        let key = format!("{}-{subject_key}-{lang}", grade.number());
        let entries = &self.entries;
        self.cache.entry(key).or_insert_with(|| {
            entries
                .iter()
                .filter(|e| e.grade == grade && e.subject == subject)
                .filter_map(|e| e.localize(lang))
                .collect()
        })
    }

    /// Random kokugo question honoring `filter`. The preferred difficulty is
    /// tried first, then the rest in easy, normal, hard order.
    pub fn random_question<R: Rng + ?Sized>(&mut self, filter: &QuestionFilter, rng: &mut R) -> Option<KokugoQuestion> {
        let pool: Vec<&KokugoQuestion> = self
            .load(filter.grade, Subject::Kokugo, filter.lang)
            .iter()
            .filter(|q| filter.matches(q))
            .collect();
        if pool.is_empty() {
            return None;
        }

        let mut order: Vec<Difficulty> = filter.difficulty.into_iter().collect();
        order.extend(Difficulty::ORDER.iter().filter(|d| Some(**d) != filter.difficulty));
        for level in order {
            let candidates: Vec<&KokugoQuestion> = pool.iter().copied().filter(|q| q.difficulty == level).collect();
            if let Some(q) = candidates.choose(rng) {
                return Some((*q).clone());
            }
        }
        pool.choose(rng).map(|q| (*q).clone())
    }

    /// How many questions [`Self::random_question`] can choose from.
    pub fn count_matching(&mut self, filter: &QuestionFilter) -> usize {
        self.load(filter.grade, Subject::Kokugo, filter.lang).iter().filter(|q| filter.matches(q)).count()
    }

    /// The same entry (matched by suffix) in another language.
    pub fn question_for_language(&self, grade: Grade, subject: Subject, suffix: &str, lang: Locale) -> Option<KokugoQuestion> {
        self.entries
            .iter()
            .find(|e| e.grade == grade && e.subject == subject && e.suffix() == suffix)
            .and_then(|e| e.localize(lang))
    }
}

// --- Session -------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentQuestion {
    pub question: KokugoQuestion,
    /// Mirror of the question in the support language.
    pub support: Option<KokugoQuestion>,
    pub revealed_hints: usize,
    pub answered: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KokugoAttempt {
    pub id: String,
    pub prompt: String,
    pub answer: String,
    pub selected: String,
    pub correct: bool,
    pub explanation: String,
    pub hints_used: usize,
    #[serde(rename = "type")]
    pub kind: String,
}

pub struct KokugoSession {
    filter: QuestionFilter,
    support_lang: Option<Locale>,
    index: usize,
    total: usize,
    current: Option<CurrentQuestion>,
    history: Vec<KokugoAttempt>,
}

impl KokugoSession {
    /// Start a quiz of at most `max_questions`. Fails when nothing matches.
    pub fn start<R: Rng + ?Sized>(
        bank: &mut QuestionBank,
        filter: QuestionFilter,
        support_lang: Option<Locale>,
        max_questions: usize,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let available = bank.count_matching(&filter);
        let total = max_questions.min(available);
        if total == 0 {
            return Err(GameError::NoQuestions);
        }
        let mut session = Self { filter, support_lang, index: 0, total, current: None, history: Vec::new() };
        session.current = Some(session.build(bank, rng).ok_or(GameError::NoQuestions)?);
        Ok(session)
    }

    fn build<R: Rng + ?Sized>(&mut self, bank: &mut QuestionBank, rng: &mut R) -> Option<CurrentQuestion> {
        let question = bank.random_question(&self.filter, rng)?;
        self.filter.exclude.push(question.id.clone());
        let support = self
            .support_lang
            .filter(|l| *l != self.filter.lang)
            .and_then(|l| bank.question_for_language(question.grade, question.subject, &question.suffix, l));
        Some(CurrentQuestion { question, support, revealed_hints: 0, answered: None })
    }

    pub fn current(&self) -> Option<&CurrentQuestion> {
        self.current.as_ref()
    }

    /// Zero-based position of the current question.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    pub fn history(&self) -> &[KokugoAttempt] {
        &self.history
    }

    pub fn correct_count(&self) -> usize {
        self.history.iter().filter(|a| a.correct).count()
    }

    /// Answer the current question once. Records the result in `stats`.
    pub fn answer(
        &mut self,
        choice: &str,
        stats: &mut PlayerStats,
        badges: &BadgeCatalog,
        now: DateTime<Utc>,
    ) -> Result<bool, GameError> {
        let current = self.current.as_mut().ok_or(GameError::SessionFinished)?;
        if current.answered.is_some() {
            return Err(GameError::AlreadyAnswered);
        }
        let q = &current.question;
        let correct = choice == q.answer;
        current.answered = Some(correct);
        self.history.push(KokugoAttempt {
            id: q.id.clone(),
            prompt: q.prompt.clone(),
            answer: q.answer.clone(),
            selected: choice.to_string(),
            correct,
            explanation: q.explanation.clone(),
            hints_used: current.revealed_hints,
            kind: q.kind.clone(),
        });
        let event = AnswerEvent {
            subject: Subject::Kokugo,
            lang: self.filter.lang,
            skill: q.kind.clone(),
            question_type: Some(q.kind.clone()),
            correct,
            response_time: None,
        };
        stats.record_answer(&event, badges, now);
        Ok(correct)
    }

    /// Move on. Returns `false` once the session is over.
    pub fn next<R: Rng + ?Sized>(&mut self, bank: &mut QuestionBank, rng: &mut R) -> bool {
        self.index += 1;
        self.current = if self.index < self.total { self.build(bank, rng) } else { None };
        self.current.is_some()
    }

    /// Reveal one more hint; returns it, or `None` when all are shown.
    pub fn reveal_hint(&mut self) -> Option<&str> {
        let current = self.current.as_mut()?;
        if current.revealed_hints >= current.question.hints.len() {
            return None;
        }
        current.revealed_hints += 1;
        current.question.hints.get(current.revealed_hints - 1).map(String::as_str)
    }

    pub fn visible_hints(&self) -> &[String] {
        match &self.current {
            Some(c) => &c.question.hints[..c.revealed_hints.min(c.question.hints.len())],
            None => &[],
        }
    }

    /// Read the current prompt aloud.
    pub fn speak_prompt(&self, speaker: &mut dyn Speaker) -> Result<(), GameError> {
        let current = self.current.as_ref().ok_or(GameError::SessionFinished)?;
        let q = &current.question;
        match &q.tts {
            Some(tts) => speaker.speak(&tts.text, &tts.lang),
            None => speaker.speak(&q.prompt, speech_locale(q.lang)),
        }
    }
}
