//! Orb-matching puzzle.
//!
//! [`board`] holds the pure resolution engine (matching, cascades, refill);
//! [`game`] layers turns, scoring and drag sessions on top of it.

pub mod board;
pub mod game;

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use board::{Board, ComboDetail, Resolution, resolve};
pub use game::{Match3Game, SwapOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Water,
    Wood,
    Light,
    Dark,
    Heart,
}

impl Element {
    pub const ALL: [Element; 6] = [
        Element::Fire,
        Element::Water,
        Element::Wood,
        Element::Light,
        Element::Dark,
        Element::Heart,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Element {
        Element::ALL[rng.gen_range(0..Element::ALL.len())]
    }

    pub fn name(self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Wood => "wood",
            Element::Light => "light",
            Element::Dark => "dark",
            Element::Heart => "heart",
        }
    }

    /// One-letter code used by [`Board::from_rows`].
    pub fn from_code(c: char) -> Option<Element> {
        match c {
            'F' => Some(Element::Fire),
            'W' => Some(Element::Water),
            'G' => Some(Element::Wood),
            'L' => Some(Element::Light),
            'D' => Some(Element::Dark),
            'H' => Some(Element::Heart),
            _ => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn is_adjacent(self, other: Cell) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }
}
