use crate::core::interest::interest_factor;
use crate::core::optimizer::Budget;
use crate::core::slide::SlideUnit;
use log::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TwoOptStats {
    pub passes: usize,
    pub improvements: usize,
    pub gain: u64,
    /// False when the pass limit or the budget stopped the search early.
    pub converged: bool,
}

/// 2-opt refinement of a path: reverse `order[i..=j]` whenever that strictly
/// raises the total score.
///
/// Scores are symmetric, so a reversal only changes the two boundary
/// transitions. `window` caps the reversed segment length; `max_passes`
/// caps full sweeps. The budget is checked once per segment start.
pub fn two_opt(
    slides: &[SlideUnit],
    order: &mut [usize],
    max_passes: Option<usize>,
    window: Option<usize>,
    budget: &Budget,
) -> TwoOptStats {
    let n = order.len();
    let mut stats = TwoOptStats::default();
    if n < 3 {
        stats.converged = true;
        return stats;
    }

    let score = |a: usize, b: usize| i64::from(interest_factor(slides[a].tags(), slides[b].tags()));
    let span = window.unwrap_or(n).max(1);

    loop {
        if max_passes.is_some_and(|limit| stats.passes >= limit) {
            break;
        }
        stats.passes += 1;
        let mut improved = false;

        for i in 0..n - 1 {
            if budget.is_exhausted() {
                debug!("2-opt stopped by budget after {} passes", stats.passes);
                return stats;
            }
            let last = (i + span).min(n - 1);
            for j in (i + 1)..=last {
                if i == 0 && j == n - 1 {
                    continue;
                }
                let mut delta = 0;
                if i > 0 {
                    delta += score(order[i - 1], order[j]) - score(order[i - 1], order[i]);
                }
                if j + 1 < n {
                    delta += score(order[i], order[j + 1]) - score(order[j], order[j + 1]);
                }
                if delta > 0 {
                    order[i..=j].reverse();
                    stats.improvements += 1;
                    stats.gain += delta as u64;
                    improved = true;
                }
            }
        }

        if !improved {
            stats.converged = true;
            break;
        }
    }

    debug!(
        "2-opt finished: {} passes, {} improvements, +{}",
        stats.passes, stats.improvements, stats.gain
    );
    stats
}
