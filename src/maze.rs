//! Dungeon maze: tile grid, monster placement and player movement.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::blueprint::Blueprint;
use crate::error::GameError;
use crate::skill::Grade;

/// Probability that a tile starts as a wall.
pub const WALL_CHANCE: f64 = 0.2;
/// Attempts allowed per monster placement.
pub const PLACEMENT_ATTEMPTS: usize = 50;
/// First level that may contain a boss gate.
pub const GATE_MIN_LEVEL: u32 = 4;
pub const GATE_MIN_SIZE: usize = 7;
pub const MAX_NORMAL_MONSTERS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tile {
    Floor,
    Wall,
    Goal,
    Gate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse(s: &str) -> Result<Direction, GameError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "arrowup" => Ok(Direction::Up),
            "down" | "arrowdown" => Ok(Direction::Down),
            "left" | "arrowleft" => Ok(Direction::Left),
            "right" | "arrowright" => Ok(Direction::Right),
            _ => Err(GameError::UnknownDirection(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterSpawn {
    /// Instance id, unique within one maze (`monster-0`, `boss-gate-1`).
    pub id: String,
    /// Blueprint monster type id.
    pub type_id: String,
    pub pos: Pos,
    pub boss: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub id: String,
    pub pos: Pos,
}

/// Result of one movement request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "monster", rename_all = "camelCase")]
pub enum MoveOutcome {
    Moved,
    /// Target is a wall; the player stays put.
    Wall,
    /// Target is a gate whose bosses are still alive; the player stays put.
    GateBlocked,
    /// The gate turned into floor and the player stepped onto it.
    GateOpened,
    Goal,
    /// Stepped onto the named undefeated monster.
    Encounter(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maze {
    size: usize,
    tiles: Vec<Tile>,
    monsters: Vec<MonsterSpawn>,
    gates: Vec<Gate>,
    required_bosses: Vec<String>,
}

impl Maze {
    /// Random maze for `level`.
    ///
    /// Start `(0,0)` is always floor and the goal sits in the far corner. A
    /// diagonal staircase is carved between them. From [`GATE_MIN_LEVEL`] on,
    /// large mazes get a gate beside the goal guarded by a boss of `grade`.
    pub fn generate<R: Rng + ?Sized>(size: usize, level: u32, grade: Grade, blueprint: &Blueprint, rng: &mut R) -> Maze {
        let size = size.max(2);
        let mut maze = Maze {
            size,
            tiles: vec![Tile::Floor; size * size],
            monsters: Vec::new(),
            gates: Vec::new(),
            required_bosses: Vec::new(),
        };
        let start = Pos::new(0, 0);
        let goal = maze.goal();

        for y in 0..size {
            for x in 0..size {
                let p = Pos::new(x, y);
                if p != start && p != goal && rng.gen_bool(WALL_CHANCE) {
                    maze.set(p, Tile::Wall);
                }
            }
        }
        maze.set(goal, Tile::Goal);

        for i in 0..size - 1 {
            maze.set(Pos::new(i, i), Tile::Floor);
            if rng.gen_bool(0.5) {
                maze.set(Pos::new(i + 1, i), Tile::Floor);
            } else {
                maze.set(Pos::new(i, i + 1), Tile::Floor);
            }
        }

        if level >= GATE_MIN_LEVEL && size >= GATE_MIN_SIZE {
            let gate_pos = Pos::new(size - 1, size - 2);
            if maze.tile(gate_pos) == Tile::Floor {
                maze.set(gate_pos, Tile::Gate);
                maze.gates.push(Gate { id: "gate-1".into(), pos: gate_pos });
            }
        }

        if let (Some(gate), Some(boss)) = (maze.gates.first().cloned(), blueprint.boss_for(grade)) {
            for _ in 0..PLACEMENT_ATTEMPTS {
                let p = Pos::new(rng.gen_range(1..size - 1), rng.gen_range(1..size - 1));
                if maze.is_free(p) {
                    let id = format!("boss-{}", gate.id);
                    maze.monsters.push(MonsterSpawn { id: id.clone(), type_id: boss.id.clone(), pos: p, boss: true });
                    maze.required_bosses.push(id);
                    break;
                }
            }
        }

        let normals = blueprint.normal_monsters(grade);
        let count = (size / 2).min(MAX_NORMAL_MONSTERS);
        for i in 0..count {
            for _ in 0..PLACEMENT_ATTEMPTS {
                let p = Pos::new(rng.gen_range(0..size), rng.gen_range(0..size));
                if !maze.is_free(p) {
                    continue;
                }
                if let Some(kind) = normals.choose(rng) {
                    maze.monsters.push(MonsterSpawn {
                        id: format!("monster-{i}"),
                        type_id: kind.id.clone(),
                        pos: p,
                        boss: false,
                    });
                }
                break;
            }
        }

        tracing::debug!(size, level, monsters = maze.monsters.len(), gates = maze.gates.len(), "maze generated");
        maze
    }

    /// Build a maze from text rows: `.` floor, `#` wall, `G` goal, `=` gate.
    /// Missing cells are walls.
    pub fn from_layout(rows: &[&str]) -> Maze {
        let size = rows.len();
        let mut tiles = vec![Tile::Wall; size * size];
        let mut gates = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().take(size).enumerate() {
                tiles[y * size + x] = match ch {
                    '.' => Tile::Floor,
                    'G' => Tile::Goal,
                    '=' => {
                        gates.push(Gate { id: format!("gate-{}", gates.len() + 1), pos: Pos::new(x, y) });
                        Tile::Gate
                    }
                    _ => Tile::Wall,
                };
            }
        }
        Maze { size, tiles, monsters: Vec::new(), gates, required_bosses: Vec::new() }
    }

    /// Add a monster; bosses are also registered as gate guards.
    pub fn place_monster(&mut self, spawn: MonsterSpawn) {
        if spawn.boss {
            self.required_bosses.push(spawn.id.clone());
        }
        self.monsters.push(spawn);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn goal(&self) -> Pos {
        Pos::new(self.size - 1, self.size - 1)
    }

    pub fn tile(&self, p: Pos) -> Tile {
        if p.x >= self.size || p.y >= self.size {
            return Tile::Wall;
        }
        self.tiles[p.y * self.size + p.x]
    }

    fn set(&mut self, p: Pos, tile: Tile) {
        if p.x < self.size && p.y < self.size {
            self.tiles[p.y * self.size + p.x] = tile;
        }
    }

    /// Row-major tiles.
    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.chunks(self.size)
    }

    pub fn monsters(&self) -> &[MonsterSpawn] {
        &self.monsters
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn required_bosses(&self) -> &[String] {
        &self.required_bosses
    }

    pub fn monster(&self, id: &str) -> Option<&MonsterSpawn> {
        self.monsters.iter().find(|m| m.id == id)
    }

    fn is_free(&self, p: Pos) -> bool {
        self.tile(p) == Tile::Floor
            && p != Pos::new(0, 0)
            && p != self.goal()
            && !self.monsters.iter().any(|m| m.pos == p)
    }

    /// Neighbor in `dir`, clamped to the board.
    pub fn step(&self, from: Pos, dir: Direction) -> Pos {
        let last = self.size - 1;
        match dir {
            Direction::Up => Pos::new(from.x, from.y.saturating_sub(1)),
            Direction::Down => Pos::new(from.x, (from.y + 1).min(last)),
            Direction::Left => Pos::new(from.x.saturating_sub(1), from.y),
            Direction::Right => Pos::new((from.x + 1).min(last), from.y),
        }
    }

    /// Resolve a move from `from`. Returns the new position (unchanged when
    /// blocked) and what happened. Opening a gate mutates the grid.
    pub fn try_move(&mut self, from: Pos, dir: Direction, defeated: &BTreeSet<String>) -> (Pos, MoveOutcome) {
        let to = self.step(from, dir);
        let mut outcome = MoveOutcome::Moved;
        match self.tile(to) {
            Tile::Wall => return (from, MoveOutcome::Wall),
            Tile::Gate => {
                if !self.required_bosses.iter().all(|b| defeated.contains(b)) {
                    return (from, MoveOutcome::GateBlocked);
                }
                self.set(to, Tile::Floor);
                outcome = MoveOutcome::GateOpened;
            }
            Tile::Floor | Tile::Goal => {}
        }

        if to == self.goal() {
            return (to, MoveOutcome::Goal);
        }
        if let Some(m) = self.monsters.iter().find(|m| m.pos == to && !defeated.contains(&m.id)) {
            return (to, MoveOutcome::Encounter(m.id.clone()));
        }
        (to, outcome)
    }
}
