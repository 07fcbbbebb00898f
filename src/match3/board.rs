//! Match detection, cascades and refill.

use rand::Rng;
use serde::Serialize;

use super::{Cell, Element};
use crate::error::GameError;

/// Redraws allowed when a refilled orb would complete a run.
pub const REFILL_RETRIES: usize = 25;
/// Upper bound on cascades per resolution.
pub const MAX_CASCADES: u32 = 64;
pub const MIN_RUN: usize = 3;

const BASE_POINTS: f64 = 50.0;
const POINTS_PER_ORB: f64 = 20.0;
const CASCADE_BONUS: f64 = 0.25;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Element>,
}

/// One flood-filled group cleared during a resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComboDetail {
    #[serde(rename = "type")]
    pub element: Element,
    pub size: usize,
    pub points: u32,
    pub cascade: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub board: Board,
    pub combos: Vec<ComboDetail>,
    pub score_gain: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub element: Element,
    pub cells: Vec<Cell>,
}

/// Score for a group of `size` orbs cleared in the given cascade (1-based).
pub fn combo_points(size: usize, cascade: u32) -> u32 {
    let base = BASE_POINTS + POINTS_PER_ORB * size as f64;
    let multiplier = 1.0 + CASCADE_BONUS * f64::from(cascade.saturating_sub(1));
    (base * multiplier).round() as u32
}

impl Board {
    /// Fresh board with no three-in-a-row anywhere (best effort after retries).
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let mut grid = Grid::empty(rows, cols);
        for row in 0..rows {
            for col in 0..cols {
                let orb = grid.generate_orb(row, col, rng);
                grid.set(row, col, Some(orb));
            }
        }
        grid.into_board(rng)
    }

    /// Board from rows of one-letter element codes (`F W G L D H`).
    pub fn from_rows(rows: &[&str]) -> Option<Self> {
        let cols = rows.first()?.chars().count();
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for line in rows {
            if line.chars().count() != cols {
                return None;
            }
            for c in line.chars() {
                cells.push(Element::from_code(c)?);
            }
        }
        Some(Self { rows: rows.len(), cols, cells })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    pub fn get(&self, cell: Cell) -> Option<Element> {
        self.contains(cell).then(|| self.cells[cell.row * self.cols + cell.col])
    }

    /// Rows of elements, top first.
    pub fn grid(&self) -> Vec<Vec<Element>> {
        self.cells.chunks(self.cols.max(1)).map(<[Element]>::to_vec).collect()
    }

    pub fn swap(&mut self, a: Cell, b: Cell) -> Result<(), GameError> {
        for cell in [a, b] {
            if !self.contains(cell) {
                return Err(GameError::OutOfBounds { row: cell.row, col: cell.col });
            }
        }
        self.cells.swap(a.row * self.cols + a.col, b.row * self.cols + b.col);
        Ok(())
    }

    pub fn has_matches(&self) -> bool {
        Grid::from_board(self).match_mask().iter().any(|m| *m)
    }

    /// Matched groups on the current board without changing it.
    pub fn find_groups(&self) -> Vec<Group> {
        let grid = Grid::from_board(self);
        let mask = grid.match_mask();
        grid.groups(&mask)
    }
}

/// Clear every run, let orbs fall, refill, and repeat until the board is
/// stable. The input board is left untouched.
pub fn resolve<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Resolution {
    let mut grid = Grid::from_board(board);
    let mut combos = Vec::new();
    let mut score_gain = 0;
    let mut cascade = 0;

    while cascade < MAX_CASCADES {
        let mask = grid.match_mask();
        let groups = grid.groups(&mask);
        if groups.is_empty() {
            break;
        }
        cascade += 1;
        for group in groups {
            let points = combo_points(group.cells.len(), cascade);
            score_gain += points;
            combos.push(ComboDetail { element: group.element, size: group.cells.len(), points, cascade });
        }
        grid.clear(&mask);
        grid.collapse(rng);
    }
    if cascade == MAX_CASCADES {
        tracing::warn!(cascade, "cascade limit reached; board may still contain runs");
    }

    Resolution { board: grid.into_board(rng), combos, score_gain }
}

// --- Working grid with holes -------------------------------------------------

struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Element>>,
}

impl Grid {
    fn empty(rows: usize, cols: usize) -> Self {
        Self { rows, cols, cells: vec![None; rows * cols] }
    }

    fn from_board(board: &Board) -> Self {
        Self { rows: board.rows, cols: board.cols, cells: board.cells.iter().copied().map(Some).collect() }
    }

    fn get(&self, row: isize, col: isize) -> Option<Element> {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            return None;
        }
        self.cells[row as usize * self.cols + col as usize]
    }

    fn set(&mut self, row: usize, col: usize, value: Option<Element>) {
        self.cells[row * self.cols + col] = value;
    }

    fn same(&self, row: isize, col: isize, orb: Element) -> bool {
        self.get(row, col) == Some(orb)
    }

    /// Would placing `orb` at (row, col) complete a run of three?
    fn would_create_match(&self, row: usize, col: usize, orb: Element) -> bool {
        let (r, c) = (row as isize, col as isize);
        let horizontal = (self.same(r, c - 1, orb) && self.same(r, c - 2, orb))
            || (self.same(r, c + 1, orb) && self.same(r, c + 2, orb))
            || (self.same(r, c - 1, orb) && self.same(r, c + 1, orb));
        let vertical = (self.same(r - 1, c, orb) && self.same(r - 2, c, orb))
            || (self.same(r + 1, c, orb) && self.same(r + 2, c, orb))
            || (self.same(r - 1, c, orb) && self.same(r + 1, c, orb));
        horizontal || vertical
    }

    fn generate_orb<R: Rng + ?Sized>(&self, row: usize, col: usize, rng: &mut R) -> Element {
        let mut orb = Element::random(rng);
        let mut retries = 0;
        while self.would_create_match(row, col, orb) && retries < REFILL_RETRIES {
            orb = Element::random(rng);
            retries += 1;
        }
        orb
    }

    /// Cells that are part of a horizontal or vertical run of at least three.
    fn match_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.cells.len()];
        for row in 0..self.rows {
            let line: Vec<usize> = (0..self.cols).map(|col| row * self.cols + col).collect();
            self.mark_runs(&line, &mut mask);
        }
        for col in 0..self.cols {
            let line: Vec<usize> = (0..self.rows).map(|row| row * self.cols + col).collect();
            self.mark_runs(&line, &mut mask);
        }
        mask
    }

    fn mark_runs(&self, line: &[usize], mask: &mut [bool]) {
        let mut start = 0;
        while start < line.len() {
            let orb = self.cells[line[start]];
            let mut len = 1;
            while start + len < line.len() && self.cells[line[start + len]] == orb {
                len += 1;
            }
            if orb.is_some() && len >= MIN_RUN {
                for idx in &line[start..start + len] {
                    mask[*idx] = true;
                }
            }
            start += len;
        }
    }

    /// 4-connected components of masked cells sharing an element.
    fn groups(&self, mask: &[bool]) -> Vec<Group> {
        let mut visited = vec![false; self.cells.len()];
        let mut groups = Vec::new();
        for start in 0..self.cells.len() {
            if !mask[start] || visited[start] {
                continue;
            }
            let Some(element) = self.cells[start] else { continue };
            visited[start] = true;
            let mut queue = vec![start];
            let mut head = 0;
            while head < queue.len() {
                let idx = queue[head];
                head += 1;
                let (row, col) = (idx / self.cols, idx % self.cols);
                let mut neighbors = Vec::with_capacity(4);
                if row > 0 {
                    neighbors.push(idx - self.cols);
                }
                if row + 1 < self.rows {
                    neighbors.push(idx + self.cols);
                }
                if col > 0 {
                    neighbors.push(idx - 1);
                }
                if col + 1 < self.cols {
                    neighbors.push(idx + 1);
                }
                for next in neighbors {
                    if mask[next] && !visited[next] && self.cells[next] == Some(element) {
                        visited[next] = true;
                        queue.push(next);
                    }
                }
            }
            let cells = queue.into_iter().map(|i| Cell::new(i / self.cols, i % self.cols)).collect();
            groups.push(Group { element, cells });
        }
        groups
    }

    fn clear(&mut self, mask: &[bool]) {
        for (cell, hit) in self.cells.iter_mut().zip(mask) {
            if *hit {
                *cell = None;
            }
        }
    }

    /// Drop orbs to the bottom of each column and refill the holes from the top.
    fn collapse<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for col in 0..self.cols {
            let mut write = self.rows;
            for row in (0..self.rows).rev() {
                if let Some(orb) = self.cells[row * self.cols + col] {
                    write -= 1;
                    self.set(row, col, None);
                    self.set(write, col, Some(orb));
                }
            }
            for row in (0..write).rev() {
                let orb = self.generate_orb(row, col, rng);
                self.set(row, col, Some(orb));
            }
        }
    }

    fn into_board<R: Rng + ?Sized>(self, rng: &mut R) -> Board {
        let cells = self.cells.into_iter().map(|c| c.unwrap_or_else(|| Element::random(rng))).collect();
        Board { rows: self.rows, cols: self.cols, cells }
    }
}
