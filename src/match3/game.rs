//! Turn-limited orb puzzle built on [`super::board`].

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::board::{Board, ComboDetail, resolve};
use super::{Cell, Element};
use crate::config::GameConfig;
use crate::error::GameError;
use crate::i18n::{Catalog, Locale};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SwapOutcome {
    /// At least one combo; the turn is spent.
    Resolved { combos: usize, score_gain: u32 },
    /// No combo; the board is back to where it was.
    Reverted,
    /// A drag ended on the cell it started from.
    Unmoved,
    NotAdjacent,
    OutOfTurns,
    /// No drag in progress.
    Idle,
}

struct DragSession {
    origin: Cell,
    last: Cell,
    snapshot: Board,
    moved: bool,
}

pub struct Match3Game {
    catalog: Catalog,
    locale: Locale,
    rows: usize,
    cols: usize,
    board: Board,
    /// `None` in practice mode.
    turn_limit: Option<u32>,
    turns: u32,
    score: u32,
    total_combos: usize,
    last_combos: Vec<ComboDetail>,
    selected: Option<Cell>,
    message: String,
    drag: Option<DragSession>,
    rng: ChaCha8Rng,
}

impl Match3Game {
    pub fn new(config: &GameConfig, locale: Locale, practice: bool, seed: u64) -> Self {
        Self::with_catalog(config, Catalog::builtin(), locale, practice, seed)
    }

    pub fn with_catalog(config: &GameConfig, catalog: Catalog, locale: Locale, practice: bool, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let board = Board::random(config.board_rows, config.board_cols, &mut rng);
        let turn_limit = (!practice).then_some(config.max_turns);
        let message = catalog.text(locale, "puzzle.ready");
        Self {
            catalog,
            locale,
            rows: config.board_rows,
            cols: config.board_cols,
            board,
            turn_limit,
            turns: config.max_turns,
            score: 0,
            total_combos: 0,
            last_combos: Vec::new(),
            selected: None,
            message,
            drag: None,
            rng,
        }
    }

    /// Start from a known board. Used for replays and tests.
    pub fn with_board(mut self, board: Board) -> Self {
        self.rows = board.rows();
        self.cols = board.cols();
        self.board = board;
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn is_practice(&self) -> bool {
        self.turn_limit.is_none()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total_combos(&self) -> usize {
        self.total_combos
    }

    pub fn last_combos(&self) -> &[ComboDetail] {
        &self.last_combos
    }

    pub fn selected(&self) -> Option<Cell> {
        self.selected
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    fn out_of_turns(&self) -> bool {
        self.turn_limit.is_some() && self.turns == 0
    }

    fn say(&mut self, key: &str) {
        self.message = self.catalog.text(self.locale, key);
    }

    fn check_cell(&self, cell: Cell) -> Result<(), GameError> {
        if self.board.contains(cell) {
            Ok(())
        } else {
            Err(GameError::OutOfBounds { row: cell.row, col: cell.col })
        }
    }

    /// Resolve `candidate`; keep it if it scored, otherwise restore `snapshot`.
    fn settle(&mut self, candidate: Board, snapshot: Board, origin: Cell) -> SwapOutcome {
        let res = resolve(&candidate, &mut self.rng);
        if res.combos.is_empty() {
            self.board = snapshot;
            self.selected = Some(origin);
            self.say("puzzle.invalidSwap");
            return SwapOutcome::Reverted;
        }
        let combos = res.combos.len();
        self.board = res.board;
        self.selected = None;
        self.score += res.score_gain;
        self.total_combos += combos;
        self.last_combos = res.combos;
        self.message = self.catalog.combo_message(self.locale, combos);
        if self.turn_limit.is_some() {
            self.turns = self.turns.saturating_sub(1);
        }
        tracing::debug!(combos, score_gain = res.score_gain, turns = self.turns, "puzzle move resolved");
        SwapOutcome::Resolved { combos, score_gain: res.score_gain }
    }

    /// Swap two adjacent orbs and resolve the result.
    pub fn swap(&mut self, a: Cell, b: Cell) -> Result<SwapOutcome, GameError> {
        self.check_cell(a)?;
        self.check_cell(b)?;
        if self.out_of_turns() {
            self.say("puzzle.outOfTurns");
            return Ok(SwapOutcome::OutOfTurns);
        }
        if !a.is_adjacent(b) {
            return Ok(SwapOutcome::NotAdjacent);
        }
        let snapshot = self.board.clone();
        let mut candidate = self.board.clone();
        candidate.swap(a, b)?;
        Ok(self.settle(candidate, snapshot, a))
    }

    // --- Drag sessions ---------------------------------------------------------

    /// Grab the orb at `cell`. Returns `false` when no turns are left or an
    /// orb is already held; the held drag keeps its original snapshot.
    pub fn begin_drag(&mut self, cell: Cell) -> Result<bool, GameError> {
        self.check_cell(cell)?;
        if self.drag.is_some() {
            return Ok(false);
        }
        if self.out_of_turns() {
            self.say("puzzle.outOfTurns");
            return Ok(false);
        }
        self.drag = Some(DragSession { origin: cell, last: cell, snapshot: self.board.clone(), moved: false });
        self.selected = Some(cell);
        Ok(true)
    }

    /// Carry the held orb into a neighboring cell. Returns whether it moved.
    pub fn drag_to(&mut self, cell: Cell) -> Result<bool, GameError> {
        self.check_cell(cell)?;
        let Some(drag) = self.drag.as_mut() else {
            return Ok(false);
        };
        if !drag.last.is_adjacent(cell) {
            return Ok(false);
        }
        self.board.swap(drag.last, cell)?;
        drag.last = cell;
        drag.moved = true;
        self.selected = Some(cell);
        Ok(true)
    }

    /// Release the held orb and resolve the path it took.
    pub fn end_drag(&mut self) -> SwapOutcome {
        let Some(drag) = self.drag.take() else {
            return SwapOutcome::Idle;
        };
        if !drag.moved {
            self.selected = Some(drag.origin);
            return SwapOutcome::Unmoved;
        }
        let candidate = std::mem::replace(&mut self.board, drag.snapshot.clone());
        self.settle(candidate, drag.snapshot, drag.origin)
    }

    /// Abandon the drag and put the board back.
    pub fn cancel_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            self.board = drag.snapshot;
        }
        self.selected = None;
    }

    /// New board, full turns, zero score.
    pub fn reset(&mut self) {
        self.drag = None;
        self.board = Board::random(self.rows, self.cols, &mut self.rng);
        self.turns = self.turn_limit.unwrap_or(self.turns);
        self.score = 0;
        self.total_combos = 0;
        self.last_combos.clear();
        self.selected = None;
        self.say("puzzle.ready");
    }

    pub fn view(&self) -> Match3View {
        Match3View {
            board: self.board.grid(),
            selected: self.selected,
            score: self.score,
            turns: self.turn_limit.map(|_| self.turns),
            total_combos: self.total_combos,
            last_combos: self.last_combos.clone(),
            message: self.message.clone(),
            dragging: self.drag.is_some(),
        }
    }
}

/// Render snapshot for the host page.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match3View {
    pub board: Vec<Vec<Element>>,
    pub selected: Option<Cell>,
    pub score: u32,
    /// `None` in practice mode.
    pub turns: Option<u32>,
    pub total_combos: usize,
    pub last_combos: Vec<ComboDetail>,
    pub message: String,
    pub dragging: bool,
}
