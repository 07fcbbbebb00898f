// Integration tests (native) for the `math-dungeon` crate.
// These tests avoid wasm-specific functionality (web.rs, LocalStorage,
// WebSpeaker) and exercise the pure Rust game core so they run under
// `cargo test` on the host.

use chrono::{DateTime, Utc};
use math_dungeon::badges::BadgeCatalog;
use math_dungeon::battle::{AnswerResult, Dungeon, Phase, TickResult};
use math_dungeon::kokugo::{KokugoSession, QuestionBank, QuestionFilter};
use math_dungeon::match3::{Board, ComboDetail, Element, resolve};
use math_dungeon::maze::{Direction, Maze, MonsterSpawn, MoveOutcome, Pos};
use math_dungeon::speech::RecordingSpeaker;
use math_dungeon::stats::{AnswerEvent, PlayerStats};
use math_dungeon::storage::{MemoryStore, ProgressStore};
use math_dungeon::{GameConfig, Grade, Locale, Subject};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_717_000_000, 0).unwrap()
}

// Ten correct carry answers in a row: level 2 after five, carry_master after ten.
#[test]
fn carry_streak_earns_carry_master() {
    let badges = BadgeCatalog::standard();
    let mut stats = PlayerStats::default();
    let mut answer_points = 0;
    let mut earned = Vec::new();

    for n in 1..=10 {
        let outcome = stats.record_answer(&AnswerEvent::math(Locale::Ja, "addition_carry", true), &badges, now());
        answer_points += outcome.points_gained;
        if n == 5 {
            assert_eq!(outcome.mastery.level, 2);
        }
        if n < 10 {
            assert!(outcome.new_badges.is_empty(), "badge earned early at answer {n}");
        }
        earned.extend(outcome.new_badges);
    }

    assert_eq!(earned, vec!["carry_master".to_string()]);
    assert_eq!(stats.points, answer_points + 200);
    assert!(stats.shop_unlocks.contains("sparkle_robes"));
    assert!(stats.achievement("carryMaster"));
}

#[test]
fn badge_evaluation_is_idempotent() {
    let badges = BadgeCatalog::standard();
    let mut stats = PlayerStats::default();
    for _ in 0..5 {
        stats.record_mini_game("coin_count", true, &badges);
    }
    assert!(stats.badges.contains("coin_artist"));
    let points = stats.points;
    let held = stats.badges.clone();

    assert!(badges.evaluate_and_award(&mut stats).is_empty());
    assert!(badges.evaluate_and_award(&mut stats).is_empty());
    assert_eq!(badges.award(&mut stats, &["coin_artist".to_string()]), 0);
    assert_eq!(stats.points, points);
    assert_eq!(stats.badges, held);
}

#[test]
fn saved_progress_is_repaired_on_load() {
    let raw = json!({
        "points": 420,
        "level": 0,
        "nextLevelExp": 0,
        "badges": ["coin_artist", "coin_artist"],
        "unlockedMonsters": "slime",
        "achievements": { "carryMaster": true },
        "modeHistory": (0..200).map(|i| json!({
            "event": "question",
            "timestamp": i,
            "subject": "math",
            "skill": "addition",
            "correct": true,
            "responseTime": null
        })).collect::<Vec<_>>(),
        "languageStats": { "kokugo": { "en": { "answered": 3, "correct": 2 } }, "math": "broken" }
    });
    let stats = PlayerStats::normalize(&raw);

    assert_eq!(stats.points, 420);
    assert_eq!(stats.level, 1);
    assert_eq!(stats.next_level_exp, 1);
    assert_eq!(stats.badges.len(), 1);
    assert!(stats.unlocked_monsters.is_empty());
    assert!(stats.achievement("carryMaster"));
    assert!(!stats.achievement("langNovice"));
    assert_eq!(stats.mode_history.len(), 120);
    assert_eq!(stats.language_stats.get(Subject::Kokugo, Locale::En).correct, 2);
    assert_eq!(stats.language_stats.get(Subject::Math, Locale::Ja).answered, 0);

    let store = ProgressStore::new(MemoryStore::new());
    store.save_stats(&stats);
    assert_eq!(store.load_stats(), stats);
}

// A lone wood run clears in one pass for 110 points and leaves a stable board.
#[test]
fn wood_run_resolves_for_110() {
    let board = Board::from_rows(&["FFW", "GGG", "WLD"]).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let res = resolve(&board, &mut rng);
    assert_eq!(res.combos[0], ComboDetail { element: Element::Wood, size: 3, points: 110, cascade: 1 });
    assert_eq!(res.combos.iter().filter(|c| c.cascade == 1).count(), 1);
    assert!(res.board.find_groups().is_empty());
}

#[test]
fn dungeon_run_from_start_to_next_level() {
    let badges_before = PlayerStats::default().badges.len();
    let mut dungeon = Dungeon::new(Grade::Second, Locale::En, GameConfig::default(), 42);
    let mut maze = Maze::from_layout(&["..#", "#.#", "#.G"]);
    maze.place_monster(MonsterSpawn { id: "monster-0".into(), type_id: "denkiryu".into(), pos: Pos::new(1, 1), boss: false });
    dungeon.load_maze(maze);
    let mut stats = PlayerStats::default();

    assert_eq!(dungeon.move_player(Direction::Down, &mut stats), Ok(MoveOutcome::Wall));
    assert_eq!(dungeon.move_player(Direction::Right, &mut stats), Ok(MoveOutcome::Moved));
    assert_eq!(dungeon.move_player(Direction::Down, &mut stats), Ok(MoveOutcome::Encounter("monster-0".into())));
    assert_eq!(dungeon.phase(), Phase::Battle);

    loop {
        let answer = dungeon.battle().unwrap().current_problem.answer.to_string();
        match dungeon.check_answer(&answer, &mut stats, now()).unwrap() {
            AnswerResult::Hit { .. } => continue,
            AnswerResult::Defeated { monster_id, .. } => {
                assert_eq!(monster_id, "monster-0");
                break;
            }
            AnswerResult::Miss { .. } => panic!("correct answer graded as a miss"),
        }
    }

    assert_eq!(dungeon.move_player(Direction::Down, &mut stats), Ok(MoveOutcome::Moved));
    assert_eq!(dungeon.move_player(Direction::Right, &mut stats), Ok(MoveOutcome::Goal));
    assert_eq!(dungeon.phase(), Phase::Victory);
    assert!(stats.badges.len() > badges_before);
    assert_eq!(dungeon.next_level(), Ok(2));
    assert_eq!(dungeon.view().level, 2);
}

// Letting the battle clock run out swaps in a new problem, leaves the monster
// at full health and keeps the player in the fight.
#[test]
fn battle_timeout_keeps_the_fight_going() {
    let config = GameConfig { battle_seconds: 3, ..GameConfig::default() };
    let mut dungeon = Dungeon::new(Grade::Second, Locale::En, config, 7);
    let mut maze = Maze::from_layout(&["..", ".G"]);
    maze.place_monster(MonsterSpawn { id: "monster-0".into(), type_id: "denkiryu".into(), pos: Pos::new(1, 0), boss: false });
    dungeon.load_maze(maze);
    let mut stats = PlayerStats::default();
    assert_eq!(dungeon.tick(), TickResult::Idle);

    assert_eq!(dungeon.move_player(Direction::Right, &mut stats), Ok(MoveOutcome::Encounter("monster-0".into())));
    assert_eq!(dungeon.tick(), TickResult::Running { time_left: 2 });
    assert_eq!(dungeon.tick(), TickResult::Running { time_left: 1 });
    assert_eq!(dungeon.tick(), TickResult::TimeUp);

    assert_eq!(dungeon.phase(), Phase::Battle);
    let battle = dungeon.battle().unwrap();
    assert_eq!(battle.monster_health, battle.max_health);
    assert_eq!(battle.time_left, 3);
    assert_eq!(battle.stage, 1);
    assert_eq!(stats.total_questions_answered, 0);
    assert_eq!(dungeon.tick(), TickResult::Running { time_left: 2 });
}

#[test]
fn kokugo_session_feeds_player_stats() {
    let mut bank = QuestionBank::builtin().unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let badges = BadgeCatalog::standard();
    let mut stats = PlayerStats::default();
    let mut speaker = RecordingSpeaker::default();

    let filter = QuestionFilter::new(Grade::Third, Locale::En);
    let mut session = KokugoSession::start(&mut bank, filter, Some(Locale::Ja), 3, &mut rng).unwrap();
    session.speak_prompt(&mut speaker).unwrap();
    assert_eq!(speaker.spoken.len(), 1);

    let mut answered = 0;
    loop {
        session.answer("definitely not a choice", &mut stats, &badges, now()).unwrap();
        answered += 1;
        if !session.next(&mut bank, &mut rng) {
            break;
        }
    }
    assert_eq!(answered, 3);
    assert_eq!(session.correct_count(), 0);
    let record = stats.language_stats.get(Subject::Kokugo, Locale::En);
    assert_eq!((record.answered, record.correct), (3, 0));
    assert_eq!(stats.total_questions_answered, 3);
}
