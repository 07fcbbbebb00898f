//! Answer choices: numeric distractors and small shuffling helpers.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;

/// Random draws allowed before [`numeric_options`] switches to adjacent values.
pub const MAX_DRAWS: usize = 100;
/// Number of choices shown for a multiple-choice problem.
pub const OPTION_COUNT: usize = 4;

/// Inclusive random integer in `[min, max]`; returns `min` for empty ranges.
pub fn rand_between<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Four unique numbers containing `correct`, none below `min_val`, shuffled.
///
/// Distractors are `correct ± [1, spread]` clamped to `min_val`. Random draws
/// are capped at [`MAX_DRAWS`]; after that the set is completed with
/// `correct + 1, correct + 2, …` which always terminates.
pub fn numeric_options<R: Rng + ?Sized>(rng: &mut R, correct: i64, spread: i64, min_val: i64) -> Vec<i64> {
    let spread = spread.max(1);
    let mut seen = BTreeSet::new();
    let mut options = Vec::with_capacity(OPTION_COUNT);
    seen.insert(correct);
    options.push(correct);

    let mut draws = 0;
    while options.len() < OPTION_COUNT && draws < MAX_DRAWS {
        draws += 1;
        let delta = rand_between(rng, 1, spread);
        let signed = if rng.gen_bool(0.5) { delta } else { -delta };
        let candidate = (correct + signed).max(min_val);
        if seen.insert(candidate) {
            options.push(candidate);
        }
    }

    let mut step = 1;
    while options.len() < OPTION_COUNT {
        let candidate = (correct + step).max(min_val);
        if seen.insert(candidate) {
            options.push(candidate);
        }
        step += 1;
    }

    options.shuffle(rng);
    options
}

/// Push `candidate` unless it is already present; returns whether it was added.
pub(crate) fn push_unique<T: PartialEq>(items: &mut Vec<T>, candidate: T) -> bool {
    if items.contains(&candidate) {
        return false;
    }
    items.push(candidate);
    true
}
