use crate::core::interest::{interest_factor, upper_bound};
use crate::core::optimizer::{Budget, OptimizeError};
use crate::core::slide::SlideUnit;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GreedyStart {
    /// Start from candidate 0.
    #[default]
    First,
    /// Start from the highest scoring pair of candidates. Quadratic in the candidate count.
    BestPair,
}

/// Nearest-neighbor path construction.
///
/// Repeatedly appends the unused slide scoring highest against the current
/// tail. Candidates are examined in index order and only a strictly better
/// score replaces the incumbent, so ties always go to the lowest index.
/// `window` caps how many unused candidates are examined per step.
///
/// If the deadline passes mid-construction, the unplaced slides are appended
/// in index order so the result still covers every candidate.
pub fn nearest_neighbor(
    slides: &[SlideUnit],
    start: GreedyStart,
    window: Option<usize>,
    budget: &Budget,
) -> Result<Vec<usize>, OptimizeError> {
    if slides.is_empty() {
        return Ok(Vec::new());
    }

    let mut remaining: Vec<usize> = (0..slides.len()).collect();
    let mut order = Vec::with_capacity(slides.len());

    match start {
        GreedyStart::First => order.push(remaining.remove(0)),
        GreedyStart::BestPair => {
            let (first, second) = best_pair(slides, budget)?;
            // `remaining` still equals 0..n, so positions are ids
            remaining.remove(second.max(first));
            remaining.remove(second.min(first));
            order.push(first);
            if first != second {
                order.push(second);
            }
        }
    }

    let limit = window.unwrap_or(usize::MAX).max(1);
    while !remaining.is_empty() {
        if budget.is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }
        if budget.is_expired() {
            warn!(
                "Time budget exhausted with {} slides unplaced; appending them in input order",
                remaining.len()
            );
            order.append(&mut remaining);
            break;
        }

        let tail = slides[order[order.len() - 1]].tags();
        let bound = upper_bound(tail);
        let mut best_pos = 0;
        let mut best_score: Option<u32> = None;

        for (pos, &candidate) in remaining.iter().enumerate().take(limit) {
            let score = interest_factor(tail, slides[candidate].tags());
            if best_score.is_none_or(|best| score > best) {
                best_pos = pos;
                best_score = Some(score);
                if score >= bound {
                    break;
                }
            }
        }

        order.push(remaining.remove(best_pos));
    }

    debug!("Greedy path built over {} slides", order.len());
    Ok(order)
}

/// Highest scoring pair `(i, j)` with `i < j`, ties resolved lexicographically.
/// A single slide yields `(0, 0)`.
fn best_pair(slides: &[SlideUnit], budget: &Budget) -> Result<(usize, usize), OptimizeError> {
    if slides.len() < 2 {
        return Ok((0, 0));
    }

    let mut best = (0, 1);
    let mut best_score = interest_factor(slides[0].tags(), slides[1].tags());
    'outer: for i in 0..slides.len() {
        if budget.is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }
        if budget.is_expired() {
            break;
        }
        let bound = upper_bound(slides[i].tags());
        if bound <= best_score {
            continue;
        }
        for j in (i + 1)..slides.len() {
            let score = interest_factor(slides[i].tags(), slides[j].tags());
            if score > best_score {
                best = (i, j);
                best_score = score;
                if score >= bound {
                    continue 'outer;
                }
            }
        }
    }
    Ok(best)
}
