//! Exact maximum-weight path over a small candidate set.
//!
//! `PathSolver` is the seam for exact backends: it takes a dense score
//! matrix and returns an ordering or a failure signal. The built-in
//! `HeldKarpSolver` uses subset dynamic programming, which costs
//! O(2^n · n²) time and O(2^n · n) memory and is capped at
//! `EXACT_HARD_LIMIT` candidates. Larger inputs go to the heuristic.

use crate::core::interest::interest_factor;
use crate::core::optimizer::Budget;
use crate::core::slide::SlideUnit;
use log::debug;
use thiserror::Error;

/// Largest candidate count the built-in exact solver will accept.
pub const EXACT_HARD_LIMIT: usize = 18;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SolverError {
    #[error("{nodes} candidates exceed the exact solver limit of {limit}")]
    TooLarge { nodes: usize, limit: usize },

    #[error("Exact solver ran out of time")]
    Timeout { incumbent: Option<Vec<usize>> },

    #[error("Solver reported no feasible path")]
    Infeasible,

    #[error("Solver cancelled")]
    Cancelled,
}

/// Dense, symmetric pairwise score matrix over the candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathProblem {
    nodes: usize,
    weights: Vec<u32>,
}

impl PathProblem {
    pub fn from_slides(slides: &[SlideUnit]) -> Self {
        let nodes = slides.len();
        let mut weights = vec![0; nodes * nodes];
        for i in 0..nodes {
            for j in (i + 1)..nodes {
                let w = interest_factor(slides[i].tags(), slides[j].tags());
                weights[i * nodes + j] = w;
                weights[j * nodes + i] = w;
            }
        }
        Self { nodes, weights }
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn weight(&self, from: usize, to: usize) -> u32 {
        self.weights[from * self.nodes + to]
    }

    pub fn path_weight(&self, order: &[usize]) -> u64 {
        order
            .windows(2)
            .map(|pair| u64::from(self.weight(pair[0], pair[1])))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSolution {
    pub order: Vec<usize>,
    pub weight: u64,
    pub optimal: bool,
}

/// An exact (or exact-capable) backend for the path problem.
pub trait PathSolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &PathProblem, budget: &Budget) -> Result<PathSolution, SolverError>;
}

/// Held-Karp style dynamic program for the maximum-weight Hamiltonian path.
///
/// With non-negative weights and photo-disjoint candidates, visiting every
/// node is always at least as good as visiting a subset.
#[derive(Debug, Clone)]
pub struct HeldKarpSolver {
    limit: usize,
}

impl HeldKarpSolver {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.min(EXACT_HARD_LIMIT),
        }
    }
}

impl Default for HeldKarpSolver {
    fn default() -> Self {
        Self::new(EXACT_HARD_LIMIT)
    }
}

const UNREACHED: i32 = -1;
const NO_PARENT: u8 = u8::MAX;

impl PathSolver for HeldKarpSolver {
    fn name(&self) -> &'static str {
        "held-karp"
    }

    fn solve(&self, problem: &PathProblem, budget: &Budget) -> Result<PathSolution, SolverError> {
        let n = problem.nodes();
        if n > self.limit {
            return Err(SolverError::TooLarge {
                nodes: n,
                limit: self.limit,
            });
        }
        if n <= 1 {
            return Ok(PathSolution {
                order: (0..n).collect(),
                weight: 0,
                optimal: true,
            });
        }

        let states = 1usize << n;
        // best[mask * n + v]: heaviest path visiting exactly `mask`, ending at v
        let mut best = vec![UNREACHED; states * n];
        let mut parent = vec![NO_PARENT; states * n];
        for v in 0..n {
            best[(1 << v) * n + v] = 0;
        }

        for mask in 1..states {
            if mask % 1024 == 0 {
                if budget.is_cancelled() {
                    return Err(SolverError::Cancelled);
                }
                if budget.is_expired() {
                    return Err(SolverError::Timeout { incumbent: None });
                }
            }
            for v in 0..n {
                let current = best[mask * n + v];
                if current == UNREACHED {
                    continue;
                }
                for u in 0..n {
                    if mask & (1 << u) != 0 {
                        continue;
                    }
                    let next = mask | (1 << u);
                    let candidate = current + problem.weight(v, u) as i32;
                    if candidate > best[next * n + u] {
                        best[next * n + u] = candidate;
                        parent[next * n + u] = v as u8;
                    }
                }
            }
        }

        let full = states - 1;
        let mut end = 0;
        for v in 1..n {
            if best[full * n + v] > best[full * n + end] {
                end = v;
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut mask = full;
        let mut v = end;
        loop {
            order.push(v);
            let p = parent[mask * n + v];
            if p == NO_PARENT {
                break;
            }
            mask &= !(1 << v);
            v = p as usize;
        }
        order.reverse();

        if order.len() != n {
            return Err(SolverError::Infeasible);
        }

        let weight = problem.path_weight(&order);
        debug!("Exact path over {} slides, weight {}", n, weight);
        Ok(PathSolution {
            order,
            weight,
            optimal: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::photo::Orientation::Horizontal;
    use crate::core::photo::PhotoSet;
    use crate::core::slide::SlideBuilder;
    use std::time::Duration;

    fn problem_for(tags: &[&[&str]]) -> PathProblem {
        let mut builder = PhotoSet::builder();
        for t in tags {
            builder.push(Horizontal, t.iter());
        }
        PathProblem::from_slides(&SlideBuilder::default().build(&builder.build()))
    }

    fn brute_force(problem: &PathProblem) -> u64 {
        fn permute(problem: &PathProblem, order: &mut Vec<usize>, used: &mut [bool]) -> u64 {
            if order.len() == used.len() {
                return problem.path_weight(order);
            }
            let mut best = 0;
            for v in 0..used.len() {
                if used[v] {
                    continue;
                }
                used[v] = true;
                order.push(v);
                best = best.max(permute(problem, order, used));
                order.pop();
                used[v] = false;
            }
            best
        }
        permute(problem, &mut Vec::new(), &mut vec![false; problem.nodes()])
    }

    #[test]
    fn test_matches_brute_force() {
        let problem = problem_for(&[
            &["a", "b", "c"],
            &["c", "d"],
            &["a", "d", "e", "f"],
            &["f", "g", "b"],
            &["b", "g", "h", "c"],
            &["h", "a", "c", "z"],
        ]);
        let solution = HeldKarpSolver::default()
            .solve(&problem, &Budget::unlimited())
            .unwrap();

        assert!(solution.optimal);
        assert_eq!(solution.order.len(), problem.nodes());
        assert_eq!(solution.weight, problem.path_weight(&solution.order));
        assert_eq!(solution.weight, brute_force(&problem));
    }

    #[test]
    fn test_finds_chain_order() {
        let problem = problem_for(&[
            &["c", "d", "r"],
            &["a", "b", "p"],
            &["d", "e", "s"],
            &["b", "c", "q"],
        ]);
        let solution = HeldKarpSolver::default()
            .solve(&problem, &Budget::unlimited())
            .unwrap();
        assert_eq!(solution.weight, 3);
    }

    #[test]
    fn test_trivial_sizes() {
        let solver = HeldKarpSolver::default();
        let empty = problem_for(&[]);
        assert_eq!(
            solver.solve(&empty, &Budget::unlimited()).unwrap().order,
            Vec::<usize>::new()
        );
        let single = problem_for(&[&["a"]]);
        let solution = solver.solve(&single, &Budget::unlimited()).unwrap();
        assert_eq!(solution.order, vec![0]);
        assert_eq!(solution.weight, 0);
    }

    #[test]
    fn test_rejects_oversized_problems() {
        let problem = problem_for(&[&["a"], &["b"], &["c"]]);
        assert_eq!(
            HeldKarpSolver::new(2).solve(&problem, &Budget::unlimited()),
            Err(SolverError::TooLarge { nodes: 3, limit: 2 })
        );
        assert_eq!(HeldKarpSolver::new(100).limit, EXACT_HARD_LIMIT);
    }

    #[test]
    fn test_times_out_on_expired_budget() {
        let tags: Vec<Vec<String>> = (0..12).map(|i| vec![format!("t{}", i)]).collect();
        let mut builder = PhotoSet::builder();
        for t in &tags {
            builder.push(Horizontal, t.iter());
        }
        let problem = PathProblem::from_slides(&SlideBuilder::default().build(&builder.build()));

        let result =
            HeldKarpSolver::default().solve(&problem, &Budget::with_time_limit(Duration::ZERO));
        assert_eq!(result, Err(SolverError::Timeout { incumbent: None }));
    }
}
