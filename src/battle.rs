//! Dungeon run: maze exploration, monster battles and level clears.
//!
//! [`Dungeon`] is a small state machine:
//!
//! ```text
//! Maze --(step onto monster)--> Battle --(monster health 0)--> Maze
//!  |                              \--(disengage)-------------> Maze
//!  \--(reach goal)--> Victory --(next_level)--> Maze
//! ```
//!
//! Time is driven by the host calling [`Dungeon::tick`] once per second while a
//! battle is running. Display delays between states are the host's concern.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::badges::BadgeCatalog;
use crate::blueprint::{Blueprint, MonsterType};
use crate::config::GameConfig;
use crate::error::GameError;
use crate::i18n::{Catalog, Locale};
use crate::maze::{Direction, Maze, MoveOutcome, Pos, Tile};
use crate::problem::{Answer, Problem, ProblemGenerator};
use crate::skill::{Grade, MAX_STAGE, MIN_STAGE, Subject};
use crate::stats::{AnswerEvent, PlayerStats};

/// Badges handed out when a maze is cleared. They carry no reward.
pub const FIRST_CLEAR: &str = "first_clear";
pub const PERFECT_CLEAR: &str = "perfect_clear";
pub const MULTIPLICATION_MASTER: &str = "multiplication_master";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Maze,
    Battle,
    Victory,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Maze => "maze",
            Phase::Battle => "battle",
            Phase::Victory => "victory",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleState {
    pub monster_id: String,
    pub monster_type: String,
    pub boss: bool,
    pub monster_health: i32,
    pub max_health: i32,
    pub current_problem: Problem,
    pub stage: u8,
    pub time_left: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AnswerResult {
    /// Hit landed; the monster is still standing.
    Hit { remaining: i32 },
    /// Monster defeated; the dungeon is back in [`Phase::Maze`].
    Defeated { monster_id: String, boss: bool, new_badges: Vec<String> },
    Miss { expected: Answer },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "timer", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TickResult {
    /// No battle running.
    Idle,
    Running { time_left: u32 },
    /// Timer expired; a new, easier problem replaced the old one.
    TimeUp,
}

pub struct Dungeon {
    config: GameConfig,
    blueprint: Blueprint,
    badges: BadgeCatalog,
    catalog: Catalog,
    locale: Locale,
    grade: Grade,
    level: u32,
    maze: Maze,
    player: Pos,
    defeated: BTreeSet<String>,
    phase: Phase,
    battle: Option<BattleState>,
    message: Option<String>,
    rng: ChaCha8Rng,
}

impl Dungeon {
    /// New run at level 1 using the standard content.
    pub fn new(grade: Grade, locale: Locale, config: GameConfig, seed: u64) -> Self {
        Self::with_content(grade, locale, config, Blueprint::standard().clone(), Catalog::builtin(), seed)
    }

    pub fn with_content(
        grade: Grade,
        locale: Locale,
        config: GameConfig,
        blueprint: Blueprint,
        catalog: Catalog,
        seed: u64,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let maze = Maze::generate(config.maze_size_for_level(1), 1, grade, &blueprint, &mut rng);
        Self {
            badges: BadgeCatalog::from_blueprint(&blueprint),
            config,
            blueprint,
            catalog,
            locale,
            grade,
            level: 1,
            maze,
            player: Pos::default(),
            defeated: BTreeSet::new(),
            phase: Phase::Maze,
            battle: None,
            message: None,
            rng,
        }
    }

    /// Swap in a hand-built maze (tests, scripted levels).
    pub fn load_maze(&mut self, maze: Maze) {
        self.maze = maze;
        self.player = Pos::default();
        self.defeated.clear();
        self.battle = None;
        self.phase = Phase::Maze;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn player(&self) -> Pos {
        self.player
    }

    pub fn defeated(&self) -> &BTreeSet<String> {
        &self.defeated
    }

    pub fn battle(&self) -> Option<&BattleState> {
        self.battle.as_ref()
    }

    pub fn badges(&self) -> &BadgeCatalog {
        &self.badges
    }

    /// Latest localized status line (wall bump, hit, time-up ...).
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    fn say(&mut self, key: &str, args: &[(&str, String)]) {
        self.message = Some(self.catalog.format(self.locale, key, args));
    }

    fn monster_name(&self, type_id: &str) -> String {
        self.catalog.text(self.locale, &format!("monsters.{type_id}"))
    }

    fn new_problem(&mut self, skill: &str, stage: u8) -> Problem {
        let generator = ProblemGenerator::new(&self.catalog, self.locale);
        generator.generate(skill, self.grade, stage, &mut self.rng)
    }

    fn timer_for(&self, boss: bool) -> u32 {
        if boss { self.config.boss_battle_seconds } else { self.config.battle_seconds }
    }

    // --- Maze ------------------------------------------------------------------

    /// Move the player one tile. Only valid while exploring.
    pub fn move_player(&mut self, direction: Direction, stats: &mut PlayerStats) -> Result<MoveOutcome, GameError> {
        if self.phase != Phase::Maze {
            return Err(GameError::WrongState(self.phase.name()));
        }
        let (to, outcome) = self.maze.try_move(self.player, direction, &self.defeated);
        self.player = to;
        self.message = None;
        match &outcome {
            MoveOutcome::Wall => self.say("battle.wall", &[]),
            MoveOutcome::GateBlocked => self.say("battle.gateBlocked", &[]),
            MoveOutcome::GateOpened => self.say("battle.gateOpened", &[]),
            MoveOutcome::Goal => self.clear_level(stats),
            MoveOutcome::Encounter(id) => self.start_battle(id.clone()),
            MoveOutcome::Moved => {}
        }
        Ok(outcome)
    }

    fn start_battle(&mut self, monster_id: String) {
        let Some(spawn) = self.maze.monster(&monster_id).cloned() else {
            return;
        };
        let kind: MonsterType = match self.blueprint.monster(&spawn.type_id) {
            Some(kind) => kind.clone(),
            None => {
                tracing::warn!(monster = %spawn.type_id, "monster type missing from blueprint");
                return;
            }
        };
        let health = if kind.health > 0 { kind.health } else if spawn.boss { 5 } else { 3 };
        let current_problem = self.new_problem(&kind.problem_type, MIN_STAGE);
        self.battle = Some(BattleState {
            monster_id,
            monster_type: kind.id,
            boss: spawn.boss,
            monster_health: health,
            max_health: health,
            current_problem,
            stage: MIN_STAGE,
            time_left: self.timer_for(spawn.boss),
        });
        self.phase = Phase::Battle;
        tracing::debug!(monster = %spawn.id, health, "battle started");
    }

    fn clear_level(&mut self, stats: &mut PlayerStats) {
        self.phase = Phase::Victory;
        let mut earned = Vec::new();
        if self.level == 1 {
            earned.push(FIRST_CLEAR);
        }
        if self.maze.monsters().iter().all(|m| self.defeated.contains(&m.id)) {
            earned.push(PERFECT_CLEAR);
        }
        if self.grade == Grade::Third {
            earned.push(MULTIPLICATION_MASTER);
        }
        for badge in earned {
            if stats.badges.insert(badge.to_string()) {
                tracing::info!(badge, "clear badge earned");
            }
        }
        self.say("battle.levelClear", &[("level", self.level.to_string())]);
    }

    // --- Battle ----------------------------------------------------------------

    /// Answer the current battle problem. Every call counts as one attempt in
    /// the player's stats and mastery.
    pub fn check_answer(&mut self, selected: &str, stats: &mut PlayerStats, now: DateTime<Utc>) -> Result<AnswerResult, GameError> {
        let Some(battle) = self.battle.as_mut() else {
            return Err(GameError::WrongState(self.phase.name()));
        };
        let correct = battle.current_problem.is_correct(selected);
        let base = if battle.boss { self.config.boss_battle_seconds } else { self.config.battle_seconds };
        let event = AnswerEvent {
            subject: Subject::Math,
            lang: self.locale,
            skill: battle.current_problem.skill.clone(),
            question_type: Some(battle.current_problem.skill.clone()),
            correct,
            response_time: Some(f64::from(base.saturating_sub(battle.time_left))),
        };
        stats.record_answer(&event, &self.badges, now);

        if !correct {
            let expected = battle.current_problem.answer.clone();
            self.step_down();
            self.say("battle.incorrect", &[]);
            return Ok(AnswerResult::Miss { expected });
        }

        battle.monster_health -= 1;
        if battle.monster_health > 0 {
            let remaining = battle.monster_health;
            let stage = (battle.stage + 1).min(MAX_STAGE);
            let (skill, boss) = (battle.current_problem.skill.clone(), battle.boss);
            let problem = self.new_problem(&skill, stage);
            let time_left = self.timer_for(boss);
            if let Some(battle) = self.battle.as_mut() {
                battle.stage = stage;
                battle.current_problem = problem;
                battle.time_left = time_left;
            }
            self.say("battle.correct", &[]);
            return Ok(AnswerResult::Hit { remaining });
        }

        let (monster_id, monster_type, boss) = (battle.monster_id.clone(), battle.monster_type.clone(), battle.boss);
        self.battle = None;
        self.phase = Phase::Maze;
        self.defeated.insert(monster_id.clone());
        let bonus = if boss { self.config.boss_defeat_bonus } else { self.config.defeat_bonus };
        let new_badges = stats.record_monster_defeat(&monster_type, bonus, &self.badges);
        let name = self.monster_name(&monster_type);
        let key = if boss { "battle.bossDefeated" } else { "battle.monsterDefeated" };
        self.say(key, &[("name", name)]);
        tracing::debug!(monster = %monster_id, boss, "monster defeated");
        Ok(AnswerResult::Defeated { monster_id, boss, new_badges })
    }

    /// Easier problem after a miss or a timeout; resets the timer.
    fn step_down(&mut self) {
        let Some((skill, stage, boss)) =
            self.battle.as_ref().map(|b| (b.current_problem.skill.clone(), b.stage.saturating_sub(1).max(MIN_STAGE), b.boss))
        else {
            return;
        };
        let problem = self.new_problem(&skill, stage);
        let time_left = self.timer_for(boss);
        if let Some(battle) = self.battle.as_mut() {
            battle.stage = stage;
            battle.current_problem = problem;
            battle.time_left = time_left;
        }
    }

    /// Advance the battle timer by one second. A timeout swaps in an easier
    /// problem but is not recorded as an answer.
    pub fn tick(&mut self) -> TickResult {
        let Some(battle) = self.battle.as_mut() else {
            return TickResult::Idle;
        };
        battle.time_left = battle.time_left.saturating_sub(1);
        if battle.time_left > 0 {
            return TickResult::Running { time_left: battle.time_left };
        }
        self.step_down();
        self.say("battle.timeUp", &[]);
        TickResult::TimeUp
    }

    /// Walk away from the current battle without resolving it.
    pub fn disengage(&mut self) {
        if self.phase == Phase::Battle {
            self.battle = None;
            self.phase = Phase::Maze;
            self.message = None;
        }
    }

    /// Start the next, possibly larger, maze after a clear.
    pub fn next_level(&mut self) -> Result<u32, GameError> {
        if self.phase != Phase::Victory {
            return Err(GameError::WrongState(self.phase.name()));
        }
        self.level += 1;
        let size = self.config.maze_size_for_level(self.level);
        self.maze = Maze::generate(size, self.level, self.grade, &self.blueprint, &mut self.rng);
        self.player = Pos::default();
        self.defeated.clear();
        self.phase = Phase::Maze;
        self.message = None;
        tracing::info!(level = self.level, size, "next level");
        Ok(self.level)
    }

    /// Serializable snapshot for rendering.
    pub fn view(&self) -> DungeonView {
        DungeonView {
            phase: self.phase,
            level: self.level,
            grade: self.grade.number(),
            size: self.maze.size(),
            tiles: self.maze.rows().map(|r| r.to_vec()).collect(),
            player: self.player,
            monsters: self
                .maze
                .monsters()
                .iter()
                .map(|m| MonsterView {
                    id: m.id.clone(),
                    name: self.monster_name(&m.type_id),
                    pos: m.pos,
                    boss: m.boss,
                    defeated: self.defeated.contains(&m.id),
                })
                .collect(),
            battle: self.battle.as_ref().map(|b| BattleView {
                monster_name: self.monster_name(&b.monster_type),
                boss: b.boss,
                monster_health: b.monster_health,
                max_health: b.max_health,
                stage: b.stage,
                time_left: b.time_left,
                question: b.current_problem.question.clone(),
                options: b.current_problem.options.iter().map(|o| o.to_string()).collect(),
                hint: b.current_problem.hint.clone(),
            }),
            message: self.message.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterView {
    pub id: String,
    pub name: String,
    pub pos: Pos,
    pub boss: bool,
    pub defeated: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleView {
    pub monster_name: String,
    pub boss: bool,
    pub monster_health: i32,
    pub max_health: i32,
    pub stage: u8,
    pub time_left: u32,
    pub question: String,
    pub options: Vec<String>,
    pub hint: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonView {
    pub phase: Phase,
    pub level: u32,
    pub grade: u8,
    pub size: usize,
    pub tiles: Vec<Vec<Tile>>,
    pub player: Pos,
    pub monsters: Vec<MonsterView>,
    pub battle: Option<BattleView>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::MonsterSpawn;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    /// 3x3 room with one normal monster right of the start.
    fn scripted(grade: Grade) -> Dungeon {
        let mut d = Dungeon::new(grade, Locale::En, GameConfig::default(), 7);
        let mut maze = Maze::from_layout(&["...", "...", "..G"]);
        maze.place_monster(MonsterSpawn { id: "monster-0".into(), type_id: "denkiryu".into(), pos: Pos::new(1, 0), boss: false });
        d.load_maze(maze);
        d
    }

    fn answer_of(d: &Dungeon) -> String {
        d.battle().unwrap().current_problem.answer.to_string()
    }

    fn wrong_of(d: &Dungeon) -> String {
        let p = &d.battle().unwrap().current_problem;
        p.options.iter().find(|o| **o != p.answer).unwrap().to_string()
    }

    #[test]
    fn moving_outside_maze_phase_is_rejected() {
        let mut d = scripted(Grade::Second);
        let mut stats = PlayerStats::default();
        assert_eq!(d.move_player(Direction::Right, &mut stats), Ok(MoveOutcome::Encounter("monster-0".into())));
        assert_eq!(d.phase(), Phase::Battle);
        assert_eq!(d.move_player(Direction::Down, &mut stats), Err(GameError::WrongState("battle")));
        let b = d.battle().unwrap();
        assert_eq!((b.monster_health, b.stage, b.time_left), (3, 1, 30));
    }

    #[test]
    fn three_hits_defeat_a_normal_monster() {
        let mut d = scripted(Grade::Second);
        let mut stats = PlayerStats::default();
        d.move_player(Direction::Right, &mut stats).unwrap();

        let a = answer_of(&d);
        assert_eq!(d.check_answer(&a, &mut stats, now()), Ok(AnswerResult::Hit { remaining: 2 }));
        assert_eq!(d.battle().unwrap().stage, 2);
        let a = answer_of(&d);
        assert_eq!(d.check_answer(&a, &mut stats, now()), Ok(AnswerResult::Hit { remaining: 1 }));
        let a = answer_of(&d);
        let result = d.check_answer(&a, &mut stats, now()).unwrap();
        assert!(matches!(result, AnswerResult::Defeated { ref monster_id, boss: false, .. } if monster_id == "monster-0"));

        assert_eq!(d.phase(), Phase::Maze);
        assert!(d.defeated().contains("monster-0"));
        assert!(stats.unlocked_monsters.contains("denkiryu"));
        assert_eq!(stats.total_monsters_defeated, 1);
        assert_eq!(stats.total_questions_answered, 3);
        // 3 correct answers at mastery level 1 plus the defeat bonus.
        assert_eq!(stats.points, 3 * 22 + 60);
        assert_eq!(d.message(), Some("Electrox defeated!"));
    }

    #[test]
    fn miss_lowers_stage_and_keeps_health() {
        let mut d = scripted(Grade::Second);
        let mut stats = PlayerStats::default();
        d.move_player(Direction::Right, &mut stats).unwrap();
        let a = answer_of(&d);
        d.check_answer(&a, &mut stats, now()).unwrap();
        let w = wrong_of(&d);
        let result = d.check_answer(&w, &mut stats, now()).unwrap();
        assert!(matches!(result, AnswerResult::Miss { .. }));
        let b = d.battle().unwrap();
        assert_eq!((b.monster_health, b.stage), (2, 1));
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(stats.total_questions_answered, 2);
    }

    #[test]
    fn timeout_steps_down_without_recording() {
        let mut d = scripted(Grade::Second);
        let mut stats = PlayerStats::default();
        d.move_player(Direction::Right, &mut stats).unwrap();
        for left in (1..30).rev() {
            assert_eq!(d.tick(), TickResult::Running { time_left: left });
        }
        assert_eq!(d.tick(), TickResult::TimeUp);
        assert_eq!(d.battle().unwrap().time_left, 30);
        assert_eq!(stats.total_questions_answered, 0);
        assert_eq!(d.message(), Some("Time's up! Try again!"));
    }

    #[test]
    fn disengage_returns_to_maze() {
        let mut d = scripted(Grade::Second);
        let mut stats = PlayerStats::default();
        d.move_player(Direction::Right, &mut stats).unwrap();
        d.disengage();
        assert_eq!(d.phase(), Phase::Maze);
        assert_eq!(d.tick(), TickResult::Idle);
        assert!(d.check_answer("1", &mut stats, now()).is_err());
    }

    #[test]
    fn clearing_awards_victory_badges_once() {
        let mut d = Dungeon::new(Grade::Third, Locale::En, GameConfig::default(), 3);
        d.load_maze(Maze::from_layout(&["..", ".G"]));
        let mut stats = PlayerStats::default();
        d.move_player(Direction::Right, &mut stats).unwrap();
        assert_eq!(d.move_player(Direction::Down, &mut stats), Ok(MoveOutcome::Goal));
        assert_eq!(d.phase(), Phase::Victory);
        for badge in [FIRST_CLEAR, PERFECT_CLEAR, MULTIPLICATION_MASTER] {
            assert!(stats.badges.contains(badge));
        }
        assert_eq!(d.next_level(), Ok(2));
        assert_eq!(d.maze().size(), 6);
        assert_eq!(d.phase(), Phase::Maze);
        assert!(d.next_level().is_err());
    }
}
