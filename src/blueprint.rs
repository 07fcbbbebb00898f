//! Static game content: monsters, badges, mini-games, story beats and the
//! per-grade curriculum.
//!
//! [`Blueprint::standard`] is the compiled-in content. Hosts may load a
//! replacement from JSON of the same shape with [`Blueprint::from_json`].

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::skill::Grade;

// --- Monsters ----------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterType {
    pub id: String,
    /// Skill key of the problems this monster asks.
    pub problem_type: String,
    pub grade: Grade,
    pub health: i32,
    #[serde(default)]
    pub boss: bool,
}

// --- Badges ------------------------------------------------------------------

/// What a player must achieve to earn a badge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Requirement {
    /// Mastery streak on `skill` (accuracy must also be at least 0.75).
    Streak { skill: String, count: u32 },
    MiniGame {
        #[serde(rename = "miniGame")]
        mini_game: String,
        /// Absent or zero means [`DEFAULT_MINI_GAME_WINS`].
        #[serde(default = "default_wins", deserialize_with = "wins_or_default")]
        wins: u32,
    },
    StoryClear { episodes: usize },
}

pub const DEFAULT_MINI_GAME_WINS: u32 = 3;

fn default_wins() -> u32 {
    DEFAULT_MINI_GAME_WINS
}

fn wins_or_default<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let wins = u32::deserialize(deserializer)?;
    Ok(if wins == 0 { DEFAULT_MINI_GAME_WINS } else { wins })
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub shop_unlock: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDef {
    pub id: String,
    pub label: String,
    pub grade: Grade,
    pub requirement: Requirement,
    #[serde(default)]
    pub reward: Reward,
}

// --- Mini-games, story, curriculum -------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniGameConfig {
    pub id: String,
    pub title: String,
    pub grade: Grade,
    /// Skill key every problem of this mini-game is drawn from.
    pub skill: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryBeat {
    pub id: String,
    pub grade_range: Vec<Grade>,
    pub title: String,
    #[serde(default)]
    pub unlocks: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCurriculum {
    pub grade: Grade,
    pub display_name: String,
    pub battle_types: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub monsters: Vec<MonsterType>,
    pub badges: Vec<BadgeDef>,
    pub mini_games: Vec<MiniGameConfig>,
    pub story_beats: Vec<StoryBeat>,
    pub curriculum: Vec<GradeCurriculum>,
}

/// Story beat whose completion counts as clearing every episode.
pub const FINALE_BEAT: &str = "finale";

impl Blueprint {
    /// Shared compiled-in content.
    pub fn standard() -> &'static Blueprint {
        static STANDARD: OnceLock<Blueprint> = OnceLock::new();
        STANDARD.get_or_init(build_standard)
    }

    pub fn from_json(json: &str) -> Result<Blueprint, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn monster(&self, id: &str) -> Option<&MonsterType> {
        self.monsters.iter().find(|m| m.id == id)
    }

    /// Non-boss monsters for a grade, in declaration order.
    pub fn normal_monsters(&self, grade: Grade) -> Vec<&MonsterType> {
        self.monsters.iter().filter(|m| m.grade == grade && !m.boss).collect()
    }

    pub fn boss_for(&self, grade: Grade) -> Option<&MonsterType> {
        self.monsters.iter().find(|m| m.grade == grade && m.boss)
    }

    pub fn badge(&self, id: &str) -> Option<&BadgeDef> {
        self.badges.iter().find(|b| b.id == id)
    }

    pub fn mini_game(&self, id: &str) -> Option<&MiniGameConfig> {
        self.mini_games.iter().find(|g| g.id == id)
    }

    pub fn story_beat(&self, id: &str) -> Option<&StoryBeat> {
        self.story_beats.iter().find(|b| b.id == id)
    }

    pub fn curriculum(&self, grade: Grade) -> Option<&GradeCurriculum> {
        self.curriculum.iter().find(|c| c.grade == grade)
    }
}

fn monster(id: &str, problem_type: &str, grade: Grade, health: i32, boss: bool) -> MonsterType {
    MonsterType { id: id.into(), problem_type: problem_type.into(), grade, health, boss }
}

fn badge(id: &str, label: &str, grade: Grade, requirement: Requirement, points: u32, unlock: &str) -> BadgeDef {
    BadgeDef {
        id: id.into(),
        label: label.into(),
        grade,
        requirement,
        reward: Reward { points, shop_unlock: Some(unlock.into()) },
    }
}

fn mini_game(id: &str, title: &str, grade: Grade, skill: &str) -> MiniGameConfig {
    MiniGameConfig { id: id.into(), title: title.into(), grade, skill: skill.into() }
}

fn beat(id: &str, grades: &[Grade], title: &str, unlocks: &[&str]) -> StoryBeat {
    StoryBeat {
        id: id.into(),
        grade_range: grades.to_vec(),
        title: title.into(),
        unlocks: unlocks.iter().map(|u| u.to_string()).collect(),
    }
}

fn streak(skill: &str, count: u32) -> Requirement {
    Requirement::Streak { skill: skill.into(), count }
}

fn wins(mini_game: &str, wins: u32) -> Requirement {
    Requirement::MiniGame { mini_game: mini_game.into(), wins }
}

fn build_standard() -> Blueprint {
    use Grade::{Second, Third};

    Blueprint {
        monsters: vec![
            monster("denkiryu", "addition", Second, 3, false),
            monster("mizugame", "subtraction", Second, 3, false),
            monster("happamon", "comparison", Second, 3, false),
            monster("honoodon", "addition", Second, 3, false),
            monster("starion", "multiplication", Third, 3, false),
            monster("crystalos", "division", Third, 3, false),
            monster("raidenking", "addition", Second, 5, true),
            monster("mathemperor", "multiplication", Third, 7, true),
        ],
        badges: vec![
            badge("carry_master", "Carry Master", Second, streak("addition_carry", 10), 200, "sparkle_robes"),
            badge("coin_artist", "Coin Artist", Second, wins("coin_count", 5), 150, "coin_pouch"),
            badge("clock_guardian", "Clock Guardian", Second, wins("clock_match", 5), 150, "time_staff"),
            badge("times_table_hero", "Times Table Hero", Third, streak("multiplication_array", 12), 250, "galaxy_cloak"),
            badge("unit_wizard", "Unit Wizard", Third, wins("unit_conversion_lab", 5), 200, "metric_toolkit"),
            badge("story_scholar", "Story Scholar", Third, Requirement::StoryClear { episodes: 6 }, 300, "legendary_quill"),
        ],
        mini_games: vec![
            mini_game("clock_match", "時計合わせゲーム", Second, "clock_reading"),
            mini_game("coin_count", "硬貨計算ゲーム", Second, "money_counting"),
            mini_game("even_odd_sort", "偶数・奇数の仕分け", Second, "even_odd"),
            mini_game("array_painter", "九九ロール＆アレイ", Third, "multiplication_array"),
            mini_game("unit_conversion_lab", "単位換算ラボ", Third, "unit_conversion"),
            mini_game("story_solver", "文章題チャレンジ", Third, "word_problem"),
        ],
        story_beats: vec![
            beat("intro", &[Second, Third], "迷路バトルのはじまり", &["forest"]),
            beat("forest-harmony", &[Second], "森を照らす光", &["clock_match"]),
            beat("market-festival", &[Second], "コインフェスティバル", &["coin_pouch", "coin_count"]),
            beat("volcano-trial", &[Third], "火山の試練", &["array_painter"]),
            beat("ocean-research", &[Third], "海底研究隊", &["unit_conversion_lab"]),
            beat(FINALE_BEAT, &[Second, Third], "スタースカイの決戦", &["legendary_quill", "space"]),
        ],
        curriculum: vec![
            GradeCurriculum {
                grade: Second,
                display_name: "2年生".into(),
                battle_types: ["addition_carry", "subtraction_borrow", "clock_reading", "money_counting", "even_odd"]
                    .map(String::from)
                    .to_vec(),
            },
            GradeCurriculum {
                grade: Third,
                display_name: "3年生".into(),
                battle_types: ["multiplication_array", "division_basic", "word_problem", "unit_conversion", "data_reading"]
                    .map(String::from)
                    .to_vec(),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::SkillType;

    #[test]
    fn every_referenced_skill_exists() {
        let bp = Blueprint::standard();
        for m in &bp.monsters {
            assert!(SkillType::parse(&m.problem_type).is_some(), "{}", m.problem_type);
        }
        for g in &bp.mini_games {
            assert!(SkillType::parse(&g.skill).is_some(), "{}", g.skill);
        }
        for c in &bp.curriculum {
            for t in &c.battle_types {
                assert!(SkillType::parse(t).is_some(), "{t}");
            }
        }
    }

    #[test]
    fn each_grade_has_monsters_and_one_boss() {
        let bp = Blueprint::standard();
        for grade in [Grade::Second, Grade::Third] {
            assert!(!bp.normal_monsters(grade).is_empty());
            assert!(bp.boss_for(grade).is_some_and(|b| b.health > 3));
        }
    }

    #[test]
    fn mini_game_badges_point_at_known_games() {
        let bp = Blueprint::standard();
        for b in &bp.badges {
            if let Requirement::MiniGame { mini_game, .. } = &b.requirement {
                assert!(bp.mini_game(mini_game).is_some(), "{mini_game}");
            }
        }
    }

    #[test]
    fn requirement_json_uses_tagged_shape() {
        let json = r#"{"type":"miniGame","miniGame":"coin_count","wins":5}"#;
        let req: Requirement = serde_json::from_str(json).unwrap();
        assert_eq!(req, Requirement::MiniGame { mini_game: "coin_count".into(), wins: 5 });

        for json in [r#"{"type":"miniGame","miniGame":"coin_count"}"#, r#"{"type":"miniGame","miniGame":"coin_count","wins":0}"#] {
            let req: Requirement = serde_json::from_str(json).unwrap();
            assert_eq!(req, Requirement::MiniGame { mini_game: "coin_count".into(), wins: DEFAULT_MINI_GAME_WINS });
        }

        let round = serde_json::to_string(Blueprint::standard()).unwrap();
        assert_eq!(&Blueprint::from_json(&round).unwrap(), Blueprint::standard());
    }
}
