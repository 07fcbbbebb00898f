//! Math Dungeon core crate.
//!
//! Adaptive arithmetic battles inside a procedurally generated maze for grades
//! 2 and 3, kokugo (Japanese-language) drills, skill mini-games and a
//! stand-alone orb-matching puzzle. Everything under the game modules is plain
//! Rust driven by an injected RNG; [`web`] wraps it for the browser.

use wasm_bindgen::prelude::*;

pub mod badges;
pub mod battle;
pub mod blueprint;
pub mod config;
pub mod error;
pub mod i18n;
pub mod kokugo;
pub mod mastery;
pub mod match3;
pub mod maze;
pub mod minigame;
pub mod problem;
pub mod skill;
pub mod speech;
pub mod stats;
pub mod storage;
pub mod web;

pub use badges::BadgeCatalog;
pub use battle::{AnswerResult, Dungeon, Phase, TickResult};
pub use blueprint::Blueprint;
pub use config::GameConfig;
pub use error::{GameError, StorageError};
pub use i18n::{Catalog, Locale};
pub use mastery::{MasteryBook, SkillMasteryEntry};
pub use match3::{Board, Element, Match3Game};
pub use problem::{Answer, Problem, ProblemGenerator};
pub use skill::{Grade, SkillType, Subject};
pub use stats::{AnswerEvent, PlayerStats};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}
