//! Tunable game constants.

use serde::{Deserialize, Serialize};

/// Knobs the host page may override. Missing JSON fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    /// Seconds per question against a normal monster.
    pub battle_seconds: u32,
    /// Seconds per question against a boss.
    pub boss_battle_seconds: u32,
    /// Bonus points for defeating a normal monster.
    pub defeat_bonus: u32,
    pub boss_defeat_bonus: u32,
    pub start_maze_size: usize,
    pub max_maze_size: usize,
    pub board_rows: usize,
    pub board_cols: usize,
    /// Turn budget of a finite match-3 game.
    pub max_turns: u32,
    /// Questions per kokugo session.
    pub kokugo_session_len: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            battle_seconds: 30,
            boss_battle_seconds: 45,
            defeat_bonus: 60,
            boss_defeat_bonus: 120,
            start_maze_size: 5,
            max_maze_size: 9,
            board_rows: 5,
            board_cols: 6,
            max_turns: 20,
            kokugo_session_len: 5,
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<GameConfig, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Maze side length for `level` (1-based).
    pub fn maze_size_for_level(&self, level: u32) -> usize {
        (self.start_maze_size + level as usize / 2).min(self.max_maze_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = GameConfig::from_json(r#"{"maxTurns": 10}"#).unwrap();
        assert_eq!(cfg.max_turns, 10);
        assert_eq!(cfg.battle_seconds, 30);
    }

    #[test]
    fn maze_grows_every_other_level_and_caps() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.maze_size_for_level(1), 5);
        assert_eq!(cfg.maze_size_for_level(2), 6);
        assert_eq!(cfg.maze_size_for_level(4), 7);
        assert_eq!(cfg.maze_size_for_level(20), 9);
    }
}
