//! Browser bindings.
//!
//! The host page owns one [`DungeonApp`] (maze, battles, mini-games, kokugo
//! drills) and optionally one [`OrbPuzzle`]. Every call returns a JSON string
//! the page renders from; errors surface as thrown JS strings.

use std::fmt::Display;

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde_json::json;
use wasm_bindgen::prelude::*;

use crate::battle::Dungeon;
use crate::blueprint::Blueprint;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::i18n::{Catalog, Locale};
use crate::kokugo::{Difficulty, KokugoSession, QuestionBank, QuestionFilter};
use crate::match3::{Cell, Match3Game};
use crate::maze::Direction;
use crate::minigame::MiniGameSession;
use crate::skill::Grade;
use crate::speech::{Speaker, WebSpeaker};
use crate::stats::PlayerStats;
use crate::storage::{KeyValueStore, LocalStorage, MemoryStore, ProgressStore};

fn js_err(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(js_err)
}

fn parse_locale(code: &str) -> Result<Locale, JsValue> {
    Locale::parse(code).ok_or_else(|| js_err(format!("unsupported language '{code}'")))
}

fn open_store() -> Box<dyn KeyValueStore> {
    match LocalStorage::open() {
        Some(store) => Box::new(store),
        None => {
            tracing::warn!("localStorage unavailable; progress will not persist");
            Box::new(MemoryStore::new())
        }
    }
}

fn parse_config(json: Option<String>) -> Result<GameConfig, JsValue> {
    match json {
        Some(raw) if !raw.trim().is_empty() => GameConfig::from_json(&raw).map_err(js_err),
        _ => Ok(GameConfig::default()),
    }
}

#[wasm_bindgen]
pub struct DungeonApp {
    dungeon: Dungeon,
    stats: PlayerStats,
    progress: ProgressStore<Box<dyn KeyValueStore>>,
    catalog: Catalog,
    config: GameConfig,
    bank: QuestionBank,
    mini_game: Option<MiniGameSession>,
    kokugo: Option<KokugoSession>,
    speaker: Option<WebSpeaker>,
    rng: ChaCha8Rng,
}

impl DungeonApp {
    fn save(&self) {
        self.progress.save_stats(&self.stats);
    }

    fn locale(&self) -> Locale {
        self.dungeon.locale()
    }
}

#[wasm_bindgen]
impl DungeonApp {
    /// `config_json` may override any [`GameConfig`] field.
    #[wasm_bindgen(constructor)]
    pub fn new(grade: u8, config_json: Option<String>) -> Result<DungeonApp, JsValue> {
        let grade = Grade::try_from(grade).map_err(js_err)?;
        let config = parse_config(config_json)?;
        let progress = ProgressStore::new(open_store());
        let locale = progress.language();
        let stats = progress.load_stats();
        let bank = QuestionBank::builtin().map_err(js_err)?;
        let seed = rand::random::<u64>();
        tracing::info!(grade = grade.number(), %locale, level = stats.level, "dungeon app ready");
        Ok(DungeonApp {
            dungeon: Dungeon::new(grade, locale, config.clone(), seed),
            stats,
            progress,
            catalog: Catalog::builtin(),
            config,
            bank,
            mini_game: None,
            kokugo: None,
            speaker: WebSpeaker::new(),
            rng: ChaCha8Rng::seed_from_u64(seed.rotate_left(17)),
        })
    }

    // --- Language --------------------------------------------------------------

    pub fn language(&self) -> String {
        self.locale().code().to_string()
    }

    #[wasm_bindgen(js_name = setLanguage)]
    pub fn set_language(&mut self, code: &str) -> Result<(), JsValue> {
        let locale = parse_locale(code)?;
        self.dungeon.set_locale(locale);
        self.progress.set_language(locale);
        Ok(())
    }

    #[wasm_bindgen(js_name = learningLanguage)]
    pub fn learning_language(&self) -> String {
        self.progress.learning_language().code().to_string()
    }

    #[wasm_bindgen(js_name = setLearningLanguage)]
    pub fn set_learning_language(&mut self, code: &str) -> Result<(), JsValue> {
        self.progress.set_learning_language(parse_locale(code)?);
        Ok(())
    }

    /// Localized UI string for a dotted key.
    pub fn text(&self, key: &str) -> String {
        self.catalog.text(self.locale(), key)
    }

    // --- Maze and battle ---------------------------------------------------------

    pub fn view(&self) -> Result<String, JsValue> {
        to_json(&self.dungeon.view())
    }

    pub fn stats(&self) -> Result<String, JsValue> {
        to_json(&self.stats)
    }

    #[wasm_bindgen(js_name = movePlayer)]
    pub fn move_player(&mut self, direction: &str) -> Result<String, JsValue> {
        let direction = Direction::parse(direction).map_err(js_err)?;
        let outcome = self.dungeon.move_player(direction, &mut self.stats).map_err(js_err)?;
        self.save();
        to_json(&outcome)
    }

    pub fn answer(&mut self, selected: &str) -> Result<String, JsValue> {
        let result = self.dungeon.check_answer(selected, &mut self.stats, Utc::now()).map_err(js_err)?;
        self.save();
        to_json(&result)
    }

    /// Call once per second while a battle is on screen.
    pub fn tick(&mut self) -> Result<String, JsValue> {
        to_json(&self.dungeon.tick())
    }

    pub fn disengage(&mut self) {
        self.dungeon.disengage();
    }

    #[wasm_bindgen(js_name = nextLevel)]
    pub fn next_level(&mut self) -> Result<u32, JsValue> {
        self.dungeon.next_level().map_err(js_err)
    }

    #[wasm_bindgen(js_name = completeStoryBeat)]
    pub fn complete_story_beat(&mut self, id: &str) -> Result<String, JsValue> {
        if Blueprint::standard().story_beat(id).is_none() {
            return Err(js_err(format!("unknown story beat '{id}'")));
        }
        let badges = self.stats.complete_story_beat(id, self.dungeon.badges(), Utc::now());
        self.save();
        to_json(&badges)
    }

    #[wasm_bindgen(js_name = resetProgress)]
    pub fn reset_progress(&mut self) {
        self.stats = PlayerStats::default();
        self.progress.clear_stats();
    }

    // --- Mini-games ----------------------------------------------------------------

    #[wasm_bindgen(js_name = startMiniGame)]
    pub fn start_mini_game(&mut self, id: &str) -> Result<String, JsValue> {
        let session = MiniGameSession::start(
            id,
            Blueprint::standard(),
            &self.catalog,
            self.dungeon.grade(),
            self.locale(),
            &mut self.rng,
        )
        .map_err(js_err)?;
        self.mini_game = Some(session);
        self.mini_game_view()
    }

    #[wasm_bindgen(js_name = miniGameView)]
    pub fn mini_game_view(&self) -> Result<String, JsValue> {
        let Some(session) = self.mini_game.as_ref() else {
            return Ok("null".to_string());
        };
        let problem = session.problem();
        to_json(&json!({
            "id": session.config().id,
            "title": session.config().title,
            "stage": session.stage(),
            "successCount": session.success_count(),
            "progress": session.progress(),
            "question": problem.question,
            "options": problem.options.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "hint": problem.hint,
            "meta": problem.meta,
        }))
    }

    #[wasm_bindgen(js_name = miniGameAnswer)]
    pub fn mini_game_answer(&mut self, selected: &str) -> Result<String, JsValue> {
        let session = self.mini_game.as_mut().ok_or_else(|| js_err(GameError::WrongState("idle")))?;
        let feedback = session.submit(selected, &mut self.stats, self.dungeon.badges(), &self.catalog, Utc::now(), &mut self.rng);
        self.save();
        to_json(&feedback)
    }

    #[wasm_bindgen(js_name = endMiniGame)]
    pub fn end_mini_game(&mut self) {
        self.mini_game = None;
    }

    // --- Kokugo ----------------------------------------------------------------------

    /// `difficulty` is `easy`, `normal`, `hard` or empty for any; `types` is a
    /// comma-separated list of question types, empty for all.
    #[wasm_bindgen(js_name = startKokugo)]
    pub fn start_kokugo(&mut self, difficulty: &str, types: &str) -> Result<String, JsValue> {
        let mut filter = QuestionFilter::new(self.dungeon.grade(), self.locale());
        filter.difficulty = Difficulty::parse(difficulty.trim());
        filter.types = types.split(',').map(str::trim).filter(|t| !t.is_empty()).map(String::from).collect();
        let support = Some(self.progress.learning_language());
        let session = KokugoSession::start(&mut self.bank, filter, support, self.config.kokugo_session_len, &mut self.rng)
            .map_err(js_err)?;
        self.kokugo = Some(session);
        self.kokugo_view()
    }

    #[wasm_bindgen(js_name = kokugoView)]
    pub fn kokugo_view(&self) -> Result<String, JsValue> {
        let Some(session) = self.kokugo.as_ref() else {
            return Ok("null".to_string());
        };
        to_json(&json!({
            "index": session.index(),
            "total": session.total(),
            "finished": session.is_finished(),
            "current": session.current(),
            "visibleHints": session.visible_hints(),
            "history": session.history(),
            "correct": session.correct_count(),
        }))
    }

    #[wasm_bindgen(js_name = kokugoAnswer)]
    pub fn kokugo_answer(&mut self, choice: &str) -> Result<bool, JsValue> {
        let session = self.kokugo.as_mut().ok_or_else(|| js_err(GameError::SessionFinished))?;
        let correct = session.answer(choice, &mut self.stats, self.dungeon.badges(), Utc::now()).map_err(js_err)?;
        self.save();
        Ok(correct)
    }

    #[wasm_bindgen(js_name = kokugoNext)]
    pub fn kokugo_next(&mut self) -> bool {
        match self.kokugo.as_mut() {
            Some(session) => session.next(&mut self.bank, &mut self.rng),
            None => false,
        }
    }

    #[wasm_bindgen(js_name = kokugoHint)]
    pub fn kokugo_hint(&mut self) -> Option<String> {
        self.kokugo.as_mut()?.reveal_hint().map(String::from)
    }

    #[wasm_bindgen(js_name = speakPrompt)]
    pub fn speak_prompt(&mut self) -> Result<(), JsValue> {
        let session = self.kokugo.as_ref().ok_or_else(|| js_err(GameError::SessionFinished))?;
        let speaker = self.speaker.as_mut().ok_or_else(|| js_err(GameError::SpeechUnavailable))?;
        session.speak_prompt(speaker).map_err(js_err)
    }

    #[wasm_bindgen(js_name = stopSpeaking)]
    pub fn stop_speaking(&mut self) {
        if let Some(speaker) = self.speaker.as_mut() {
            speaker.stop();
        }
    }

    #[wasm_bindgen(js_name = isSpeaking)]
    pub fn is_speaking(&self) -> bool {
        self.speaker.as_ref().is_some_and(|s| s.is_speaking())
    }
}

/// Stand-alone orb puzzle.
#[wasm_bindgen]
pub struct OrbPuzzle {
    game: Match3Game,
}

#[wasm_bindgen]
impl OrbPuzzle {
    /// Practice mode has no turn limit.
    #[wasm_bindgen(constructor)]
    pub fn new(language: &str, practice: bool, config_json: Option<String>) -> Result<OrbPuzzle, JsValue> {
        let config = parse_config(config_json)?;
        let locale = parse_locale(language)?;
        Ok(OrbPuzzle { game: Match3Game::new(&config, locale, practice, rand::random::<u64>()) })
    }

    pub fn view(&self) -> Result<String, JsValue> {
        to_json(&self.game.view())
    }

    #[wasm_bindgen(js_name = setLanguage)]
    pub fn set_language(&mut self, code: &str) -> Result<(), JsValue> {
        self.game.set_locale(parse_locale(code)?);
        Ok(())
    }

    pub fn swap(&mut self, row_a: usize, col_a: usize, row_b: usize, col_b: usize) -> Result<String, JsValue> {
        let outcome = self.game.swap(Cell::new(row_a, col_a), Cell::new(row_b, col_b)).map_err(js_err)?;
        to_json(&outcome)
    }

    #[wasm_bindgen(js_name = beginDrag)]
    pub fn begin_drag(&mut self, row: usize, col: usize) -> Result<bool, JsValue> {
        self.game.begin_drag(Cell::new(row, col)).map_err(js_err)
    }

    #[wasm_bindgen(js_name = dragTo)]
    pub fn drag_to(&mut self, row: usize, col: usize) -> Result<bool, JsValue> {
        self.game.drag_to(Cell::new(row, col)).map_err(js_err)
    }

    #[wasm_bindgen(js_name = endDrag)]
    pub fn end_drag(&mut self) -> Result<String, JsValue> {
        to_json(&self.game.end_drag())
    }

    #[wasm_bindgen(js_name = cancelDrag)]
    pub fn cancel_drag(&mut self) {
        self.game.cancel_drag();
    }

    pub fn reset(&mut self) {
        self.game.reset();
    }
}
