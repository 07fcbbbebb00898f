// Property tests (native) for the `math-dungeon` core.
// Randomness is always a seeded ChaCha8Rng so failures replay exactly.

use std::collections::BTreeSet;

use math_dungeon::match3::{Board, Cell, Element, Match3Game, SwapOutcome, resolve};
use math_dungeon::problem::options::{OPTION_COUNT, numeric_options};
use math_dungeon::problem::{forces_carry, needs_borrow};
use math_dungeon::{Catalog, GameConfig, Grade, Locale, MasteryBook, ProblemGenerator};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const CODES: [char; 6] = ['F', 'W', 'G', 'L', 'D', 'H'];

fn board_from(codes: &[usize], cols: usize) -> Board {
    let rows: Vec<String> = codes.chunks(cols).map(|r| r.iter().map(|i| CODES[*i]).collect()).collect();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    Board::from_rows(&refs).unwrap()
}

fn operands(question: &str, op: &str) -> (i64, i64) {
    let lhs = question.trim_end_matches(" = ?");
    let mut parts = lhs.split(op).map(|p| p.trim().parse::<i64>().unwrap());
    (parts.next().unwrap(), parts.next().unwrap())
}

/// Adjacent pairs on a rows x cols board, right and down neighbors only.
fn adjacent_pairs(rows: usize, cols: usize) -> Vec<(Cell, Cell)> {
    let mut pairs = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if col + 1 < cols {
                pairs.push((Cell::new(row, col), Cell::new(row, col + 1)));
            }
            if row + 1 < rows {
                pairs.push((Cell::new(row, col), Cell::new(row + 1, col)));
            }
        }
    }
    pairs
}

proptest! {
    #[test]
    fn mastery_level_stays_within_bounds(answers in prop::collection::vec(any::<bool>(), 0..300)) {
        let mut book = MasteryBook::new();
        for correct in answers {
            let entry = book.record("addition_carry", correct);
            prop_assert!((1..=5).contains(&entry.level));
        }
    }

    #[test]
    fn mastery_saturates_at_the_ends(n in 5usize..120) {
        let mut book = MasteryBook::new();
        for _ in 0..n {
            book.record("multiplication", true);
        }
        prop_assert!(book.stage_for("multiplication") <= 5);
        for _ in 0..n * 3 {
            book.record("multiplication", false);
        }
        prop_assert!(book.stage_for("multiplication") >= 1);
    }

    #[test]
    fn distractors_are_unique_and_bounded(
        min_val in 0i64..50,
        offset in 0i64..500,
        spread in -3i64..40,
        seed in any::<u64>(),
    ) {
        let correct = min_val + offset;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let opts = numeric_options(&mut rng, correct, spread, min_val);
        prop_assert_eq!(opts.len(), OPTION_COUNT);
        prop_assert!(opts.contains(&correct));
        prop_assert_eq!(opts.iter().collect::<BTreeSet<_>>().len(), OPTION_COUNT);
        prop_assert!(opts.iter().all(|o| *o >= min_val));
    }

    #[test]
    fn carry_and_borrow_are_guaranteed(seed in any::<u64>(), stage in 1u8..=5, third in any::<bool>()) {
        let catalog = Catalog::builtin();
        let generator = ProblemGenerator::new(&catalog, Locale::En);
        let grade = if third { Grade::Third } else { Grade::Second };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let add = generator.generate("addition_carry", grade, stage, &mut rng);
        let (a, b) = operands(&add.question, "+");
        prop_assert!(a % 10 + b % 10 >= 10);
        prop_assert!(forces_carry(a, b));

        let sub = generator.generate("subtraction_borrow", grade, stage, &mut rng);
        let (m, s) = operands(&sub.question, "-");
        prop_assert!(m % 10 < s % 10);
        prop_assert!(needs_borrow(m, s));
    }

    #[test]
    fn resolved_boards_are_stable(codes in prop::collection::vec(0usize..6, 30), seed in any::<u64>()) {
        let board = board_from(&codes, 6);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let res = resolve(&board, &mut rng);
        prop_assert!(res.board.find_groups().is_empty());
        prop_assert_eq!(res.score_gain, res.combos.iter().map(|c| c.points).sum::<u32>());
        prop_assert!(res.combos.iter().all(|c| c.size >= 3 && c.cascade >= 1));
    }

    #[test]
    fn swaps_without_matches_are_reversible(seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let board = Board::random(5, 6, &mut rng);
        prop_assume!(!board.has_matches());
        let config = GameConfig::default();

        for (a, b) in adjacent_pairs(board.rows(), board.cols()) {
            let mut swapped = board.clone();
            swapped.swap(a, b).unwrap();
            if swapped.has_matches() {
                continue;
            }
            let res = resolve(&swapped, &mut rng);
            prop_assert!(res.combos.is_empty());
            prop_assert_eq!(&res.board, &swapped);

            let mut game = Match3Game::new(&config, Locale::En, false, seed).with_board(board.clone());
            prop_assert_eq!(game.swap(a, b).unwrap(), SwapOutcome::Reverted);
            prop_assert_eq!(game.board(), &board);
            prop_assert_eq!(game.turns(), config.max_turns);
        }
    }

    #[test]
    fn regrabbing_mid_drag_keeps_the_original_snapshot(seed in any::<u64>(), path in prop::collection::vec(0usize..4, 1..8)) {
        let config = GameConfig::default();
        let mut game = Match3Game::new(&config, Locale::En, false, seed);
        let original = game.board().clone();
        let (rows, cols) = (original.rows(), original.cols());
        let mut at = Cell::new(rows / 2, cols / 2);
        prop_assert!(game.begin_drag(at).unwrap());
        for step in path {
            let next = match step {
                0 if at.row > 0 => Cell::new(at.row - 1, at.col),
                1 if at.row + 1 < rows => Cell::new(at.row + 1, at.col),
                2 if at.col > 0 => Cell::new(at.row, at.col - 1),
                3 if at.col + 1 < cols => Cell::new(at.row, at.col + 1),
                _ => continue,
            };
            game.drag_to(next).unwrap();
            at = next;
            prop_assert!(!game.begin_drag(at).unwrap());
        }
        game.cancel_drag();
        prop_assert_eq!(game.board(), &original);
        prop_assert!(!game.is_dragging());
    }
}

#[test]
fn every_element_has_a_code() {
    for (code, element) in CODES.iter().zip(Element::ALL) {
        assert_eq!(Element::from_code(*code), Some(element));
    }
}
