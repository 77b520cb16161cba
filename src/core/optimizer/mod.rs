//! Selects and orders slides to maximize the sum of consecutive transition scores.
//!
//! Two strategies are available: an exact path solver for small candidate
//! sets and a greedy nearest-neighbor construction refined by 2-opt for
//! everything else. `Strategy::Auto` picks by candidate count.

mod budget;
pub mod exact;
pub mod greedy;
pub mod local_search;

pub use budget::Budget;
pub use exact::{
    EXACT_HARD_LIMIT, HeldKarpSolver, PathProblem, PathSolution, PathSolver, SolverError,
};
pub use greedy::GreedyStart;
pub use local_search::TwoOptStats;

use crate::core::photo::{PhotoId, PhotoSet};
use crate::core::report::{ScoreReporter, Slideshow};
use crate::core::slide::{DEFAULT_PAIRING_WINDOW, PairingPolicy, SlideUnit};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptimizeError {
    #[error("Input inconsistency: slide {slide} references photo {photo}, which is not in the dataset")]
    UnknownPhoto { slide: usize, photo: PhotoId },

    #[error("Input inconsistency: photo {photo} appears in slides {first} and {second}")]
    PhotoReused {
        photo: PhotoId,
        first: usize,
        second: usize,
    },

    #[error("Optimization cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Exact when the candidate count is within `exact_limit`, heuristic otherwise.
    #[default]
    Auto,
    Exact,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolvedBy {
    Exact,
    Heuristic,
}

impl fmt::Display for SolvedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolvedBy::Exact => write!(f, "exact"),
            SolvedBy::Heuristic => write!(f, "heuristic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OptimizerConfig {
    pub strategy: Strategy,
    /// Candidate count up to which `Auto` runs the exact solver.
    pub exact_limit: usize,
    pub pairing: PairingPolicy,
    /// Unpaired verticals examined per photo by score-aware pairing. `None` examines all.
    pub pairing_window: Option<usize>,
    pub greedy_start: GreedyStart,
    /// Max unused candidates examined per greedy step. `None` examines all.
    pub search_window: Option<usize>,
    pub local_search: bool,
    /// Max full 2-opt sweeps. `None` runs until no move improves.
    pub max_passes: Option<usize>,
    /// Max reversed segment length in 2-opt. `None` allows any length.
    pub two_opt_window: Option<usize>,
    /// Wall-clock budget per dataset.
    pub time_limit_ms: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            exact_limit: 12,
            pairing: PairingPolicy::Sequential,
            pairing_window: Some(DEFAULT_PAIRING_WINDOW),
            greedy_start: GreedyStart::First,
            search_window: None,
            local_search: true,
            max_passes: Some(8),
            two_opt_window: Some(128),
            time_limit_ms: None,
        }
    }
}

impl OptimizerConfig {
    /// Fresh budget for one run, starting the clock now.
    pub fn budget(&self) -> Budget {
        match self.time_limit_ms {
            Some(ms) => Budget::with_time_limit(Duration::from_millis(ms)),
            None => Budget::unlimited(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    pub slideshow: Slideshow,
    pub score: u64,
    pub solved_by: SolvedBy,
    /// True only when an exact solver proved the order optimal.
    pub optimal: bool,
    /// Why the exact strategy was abandoned, if it was attempted and failed.
    pub fallback: Option<SolverError>,
    pub local_search: Option<TwoOptStats>,
}

pub struct Optimizer {
    config: OptimizerConfig,
    exact_solver: Box<dyn PathSolver>,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        let exact_solver = Box::new(HeldKarpSolver::new(config.exact_limit));
        Self {
            config,
            exact_solver,
        }
    }

    /// Replace the built-in exact backend.
    pub fn with_solver(mut self, solver: Box<dyn PathSolver>) -> Self {
        self.exact_solver = solver;
        self
    }

    pub fn optimize(
        &self,
        photos: &PhotoSet,
        slides: Vec<SlideUnit>,
        budget: &Budget,
    ) -> Result<OptimizeOutcome, OptimizeError> {
        validate(photos, &slides)?;

        let use_exact = match self.config.strategy {
            Strategy::Exact => true,
            Strategy::Heuristic => false,
            Strategy::Auto => slides.len() <= self.config.exact_limit.min(EXACT_HARD_LIMIT),
        };

        let mut fallback = None;
        let mut optimal = false;
        let mut solved_by = SolvedBy::Heuristic;
        let mut order = None;

        if use_exact {
            let problem = PathProblem::from_slides(&slides);
            match self.exact_solver.solve(&problem, budget) {
                Ok(solution) if is_valid_order(&solution.order, slides.len()) => {
                    optimal = solution.optimal;
                    solved_by = SolvedBy::Exact;
                    order = Some(solution.order);
                }
                Ok(_) => {
                    warn!(
                        "{} returned an invalid ordering; using the heuristic",
                        self.exact_solver.name()
                    );
                    fallback = Some(SolverError::Infeasible);
                }
                Err(SolverError::Cancelled) => return Err(OptimizeError::Cancelled),
                Err(SolverError::Timeout {
                    incumbent: Some(incumbent),
                }) if is_valid_order(&incumbent, slides.len()) => {
                    warn!("Exact solver timed out; keeping its incumbent");
                    solved_by = SolvedBy::Exact;
                    order = Some(incumbent.clone());
                    fallback = Some(SolverError::Timeout {
                        incumbent: Some(incumbent),
                    });
                }
                Err(err) => {
                    warn!("Exact strategy unavailable ({}); using the heuristic", err);
                    fallback = Some(err);
                }
            }
        }

        let mut order = match order {
            Some(order) => order,
            None => greedy::nearest_neighbor(
                &slides,
                self.config.greedy_start,
                self.config.search_window,
                budget,
            )?,
        };

        let local_search = if self.config.local_search && !optimal {
            Some(local_search::two_opt(
                &slides,
                &mut order,
                self.config.max_passes,
                self.config.two_opt_window,
                budget,
            ))
        } else {
            None
        };

        let slideshow = arrange(slides, &order);
        let score = ScoreReporter::total(&slideshow);
        info!(
            "Optimized {} slides with {} strategy: score {}",
            slideshow.len(),
            solved_by,
            score
        );

        Ok(OptimizeOutcome {
            slideshow,
            score,
            solved_by,
            optimal,
            fallback,
            local_search,
        })
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

/// Every slide must reference known photos, and no photo may appear twice.
fn validate(photos: &PhotoSet, slides: &[SlideUnit]) -> Result<(), OptimizeError> {
    let mut owner: HashMap<PhotoId, usize> = HashMap::new();
    for (slide, unit) in slides.iter().enumerate() {
        for &photo in unit.photo_ids() {
            if photos.get(photo).is_none() {
                return Err(OptimizeError::UnknownPhoto { slide, photo });
            }
            if let Some(first) = owner.insert(photo, slide) {
                return Err(OptimizeError::PhotoReused {
                    photo,
                    first,
                    second: slide,
                });
            }
        }
    }
    Ok(())
}

fn is_valid_order(order: &[usize], len: usize) -> bool {
    let mut seen = vec![false; len];
    order.iter().all(|&i| i < len && !std::mem::replace(&mut seen[i], true))
}

fn arrange(slides: Vec<SlideUnit>, order: &[usize]) -> Slideshow {
    let mut slots: Vec<Option<SlideUnit>> = slides.into_iter().map(Some).collect();
    Slideshow::new(order.iter().filter_map(|&i| slots[i].take()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::photo::Orientation::{Horizontal, Vertical};
    use crate::core::slide::SlideBuilder;
    use proptest::prelude::{any, prop, prop_assert, prop_assert_eq, proptest};
    use proptest::strategy::Strategy as PropStrategy;
    use std::collections::HashSet;

    fn photos_for(tags: &[&[&str]]) -> PhotoSet {
        let mut builder = PhotoSet::builder();
        for t in tags {
            builder.push(Horizontal, t.iter());
        }
        builder.build()
    }

    fn chain() -> PhotoSet {
        photos_for(&[
            &["c", "d", "r"],
            &["a", "b", "p"],
            &["d", "e", "s"],
            &["b", "c", "q"],
        ])
    }

    fn heuristic() -> OptimizerConfig {
        OptimizerConfig {
            strategy: Strategy::Heuristic,
            ..OptimizerConfig::default()
        }
    }

    struct FixedSolver(Result<PathSolution, SolverError>);

    impl PathSolver for FixedSolver {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn solve(&self, _: &PathProblem, _: &Budget) -> Result<PathSolution, SolverError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_empty_and_single_candidate_sets() {
        let optimizer = Optimizer::default();
        let empty = PhotoSet::builder().build();
        let outcome = optimizer
            .optimize(&empty, Vec::new(), &Budget::unlimited())
            .unwrap();
        assert!(outcome.slideshow.is_empty());
        assert_eq!(outcome.score, 0);

        let one = photos_for(&[&["a", "b"]]);
        let slides = SlideBuilder::default().build(&one);
        for config in [OptimizerConfig::default(), heuristic()] {
            let outcome = Optimizer::new(config)
                .optimize(&one, slides.clone(), &Budget::unlimited())
                .unwrap();
            assert_eq!(outcome.slideshow.len(), 1);
            assert_eq!(outcome.score, 0);
        }
    }

    #[test]
    fn test_auto_uses_exact_for_small_inputs() {
        let photos = chain();
        let slides = SlideBuilder::default().build(&photos);
        let outcome = Optimizer::default()
            .optimize(&photos, slides, &Budget::unlimited())
            .unwrap();

        assert_eq!(outcome.solved_by, SolvedBy::Exact);
        assert!(outcome.optimal);
        assert!(outcome.fallback.is_none());
        assert_eq!(outcome.score, 3);
        assert_eq!(outcome.score, ScoreReporter::total(&outcome.slideshow));
    }

    #[test]
    fn test_auto_uses_heuristic_above_limit() {
        let photos = chain();
        let slides = SlideBuilder::default().build(&photos);
        let config = OptimizerConfig {
            exact_limit: 3,
            ..OptimizerConfig::default()
        };
        let outcome = Optimizer::new(config)
            .optimize(&photos, slides, &Budget::unlimited())
            .unwrap();

        assert_eq!(outcome.solved_by, SolvedBy::Heuristic);
        assert!(!outcome.optimal);
        assert!(outcome.fallback.is_none());
        assert!(outcome.local_search.is_some());
        assert_eq!(outcome.slideshow.len(), 4);
    }

    #[test]
    fn test_exact_failure_falls_back_to_heuristic() {
        let photos = chain();
        let slides = SlideBuilder::default().build(&photos);
        let config = OptimizerConfig {
            strategy: Strategy::Exact,
            exact_limit: 2,
            ..OptimizerConfig::default()
        };
        let outcome = Optimizer::new(config)
            .optimize(&photos, slides, &Budget::unlimited())
            .unwrap();

        assert_eq!(outcome.solved_by, SolvedBy::Heuristic);
        assert_eq!(
            outcome.fallback,
            Some(SolverError::TooLarge { nodes: 4, limit: 2 })
        );
        assert_eq!(outcome.slideshow.len(), 4);
    }

    #[test]
    fn test_infeasible_backend_falls_back() {
        let photos = chain();
        let slides = SlideBuilder::default().build(&photos);
        let optimizer = Optimizer::default().with_solver(Box::new(FixedSolver(Err(
            SolverError::Infeasible,
        ))));
        let outcome = optimizer
            .optimize(&photos, slides, &Budget::unlimited())
            .unwrap();

        assert_eq!(outcome.fallback, Some(SolverError::Infeasible));
        assert_eq!(outcome.solved_by, SolvedBy::Heuristic);
    }

    #[test]
    fn test_timeout_incumbent_is_kept_and_refined() {
        let photos = chain();
        let slides = SlideBuilder::default().build(&photos);
        let optimizer = Optimizer::default().with_solver(Box::new(FixedSolver(Err(
            SolverError::Timeout {
                incumbent: Some(vec![0, 1, 2, 3]),
            },
        ))));
        let outcome = optimizer
            .optimize(&photos, slides, &Budget::unlimited())
            .unwrap();

        assert_eq!(outcome.solved_by, SolvedBy::Exact);
        assert!(!outcome.optimal);
        assert!(matches!(outcome.fallback, Some(SolverError::Timeout { .. })));
        assert!(outcome.local_search.is_some());
        assert_eq!(outcome.slideshow.len(), 4);
    }

    #[test]
    fn test_bogus_backend_ordering_is_rejected() {
        let photos = chain();
        let slides = SlideBuilder::default().build(&photos);
        let optimizer = Optimizer::default().with_solver(Box::new(FixedSolver(Ok(
            PathSolution {
                order: vec![0, 0, 7],
                weight: 99,
                optimal: true,
            },
        ))));
        let outcome = optimizer
            .optimize(&photos, slides, &Budget::unlimited())
            .unwrap();

        assert_eq!(outcome.fallback, Some(SolverError::Infeasible));
        assert_eq!(outcome.slideshow.len(), 4);
    }

    #[test]
    fn test_unknown_photo_is_input_inconsistency() {
        let full = chain();
        let slides = SlideBuilder::default().build(&full);
        let partial = photos_for(&[&["c", "d", "r"], &["a", "b", "p"]]);

        let result = Optimizer::default().optimize(&partial, slides, &Budget::unlimited());
        assert_eq!(
            result.unwrap_err(),
            OptimizeError::UnknownPhoto { slide: 2, photo: 2 }
        );
    }

    #[test]
    fn test_reused_photo_is_input_inconsistency() {
        let photos = chain();
        let mut slides = SlideBuilder::default().build(&photos);
        slides.push(slides[0].clone());

        let result = Optimizer::default().optimize(&photos, slides, &Budget::unlimited());
        assert_eq!(
            result.unwrap_err(),
            OptimizeError::PhotoReused {
                photo: 0,
                first: 0,
                second: 4
            }
        );
    }

    #[test]
    fn test_cancelled_run_reports_cancellation() {
        let photos = chain();
        let slides = SlideBuilder::default().build(&photos);
        let budget = Budget::unlimited();
        budget.cancel();

        let result = Optimizer::new(heuristic()).optimize(&photos, slides, &budget);
        assert_eq!(result.unwrap_err(), OptimizeError::Cancelled);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let json = r#"{ "strategy": "heuristic", "pairing": "score-aware", "time-limit-ms": 500 }"#;
        let config: OptimizerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.strategy, Strategy::Heuristic);
        assert_eq!(config.pairing, PairingPolicy::ScoreAware);
        assert_eq!(config.time_limit_ms, Some(500));
        assert_eq!(config.exact_limit, OptimizerConfig::default().exact_limit);
    }

    type PhotoRecord = (bool, Vec<u8>);

    fn arb_record() -> impl PropStrategy<Value = PhotoRecord> {
        (any::<bool>(), prop::collection::vec(0u8..12, 0..6))
    }

    fn photos_from_records(records: &[PhotoRecord]) -> PhotoSet {
        let mut builder = PhotoSet::builder();
        for (vertical, tags) in records {
            let orientation = if *vertical { Vertical } else { Horizontal };
            builder.push(orientation, tags.iter().map(|t| format!("t{}", t)));
        }
        builder.build()
    }

    fn arb_photos() -> impl PropStrategy<Value = PhotoSet> {
        prop::collection::vec(arb_record(), 0..24).prop_map(|records| photos_from_records(&records))
    }

    fn exact_score(photos: &PhotoSet) -> u64 {
        let config = OptimizerConfig {
            strategy: Strategy::Exact,
            exact_limit: 12,
            ..OptimizerConfig::default()
        };
        let slides = SlideBuilder::default().build(photos);
        let outcome = Optimizer::new(config)
            .optimize(photos, slides, &Budget::unlimited())
            .unwrap();
        assert!(outcome.fallback.is_none());
        outcome.score
    }

    proptest! {
        #[test]
        fn prop_each_photo_used_at_most_once(photos in arb_photos(), exact in any::<bool>()) {
            let config = if exact { OptimizerConfig::default() } else { heuristic() };
            let slides = SlideBuilder::default().build(&photos);
            let outcome = Optimizer::new(config)
                .optimize(&photos, slides, &Budget::unlimited())
                .unwrap();

            let mut seen = HashSet::new();
            for id in outcome.slideshow.photo_ids() {
                prop_assert!(seen.insert(id));
            }
            prop_assert_eq!(outcome.score, ScoreReporter::total(&outcome.slideshow));
        }

        #[test]
        fn prop_heuristic_is_deterministic(photos in arb_photos()) {
            let run = || {
                let slides = SlideBuilder::default().build(&photos);
                Optimizer::new(heuristic())
                    .optimize(&photos, slides, &Budget::unlimited())
                    .unwrap()
            };
            let (first, second) = (run(), run());
            prop_assert_eq!(first.slideshow, second.slideshow);
            prop_assert_eq!(first.score, second.score);
        }

        #[test]
        fn prop_exact_score_never_drops_when_a_photo_is_added(
            records in prop::collection::vec(arb_record(), 0..=10),
            extra in arb_record(),
        ) {
            let smaller = photos_from_records(&records);
            let mut grown = records.clone();
            grown.push(extra);
            let bigger = photos_from_records(&grown);

            prop_assert!(exact_score(&bigger) >= exact_score(&smaller));
        }
    }
}
