use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use crate::error::PuzzleError;
use crate::path::reconstruct;
use crate::puzzle::{Move, Puzzle};
use crate::search::{search, Policy};
use crate::strategic;

/// Total cells above which the exhaustive strategies are unlikely to finish.
const EXHAUSTIVE_CELL_WARNING: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    BreadthFirst,
    AStar,
    GreedyBestFirst,
    Strategic,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::BreadthFirst,
        Strategy::AStar,
        Strategy::GreedyBestFirst,
        Strategy::Strategic,
    ];

    /// Whether the strategy always returns a minimum-length move list.
    pub fn is_optimal(&self) -> bool {
        matches!(self, Strategy::BreadthFirst | Strategy::AStar)
    }

    fn policy(&self) -> Option<Policy> {
        match self {
            Strategy::BreadthFirst => Some(Policy::BreadthFirst),
            Strategy::AStar => Some(Policy::AStar),
            Strategy::GreedyBestFirst => Some(Policy::GreedyBestFirst),
            Strategy::Strategic => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Strategy::BreadthFirst => "BFS",
            Strategy::AStar => "A*",
            Strategy::GreedyBestFirst => "GBFS",
            Strategy::Strategic => "Strategic",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy `{0}`, expected one of bfs, astar, gbfs, strategic")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bfs" | "breadth-first" => Ok(Strategy::BreadthFirst),
            "a*" | "astar" | "a-star" => Ok(Strategy::AStar),
            "gbfs" | "greedy" | "greedy-best-first" => Ok(Strategy::GreedyBestFirst),
            "strategic" | "constructive" => Ok(Strategy::Strategic),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

/// Uniform result of every strategy.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub strategy: Strategy,
    /// Goal layout as reached, `None` when the search exhausted its frontier.
    pub final_state: Option<Puzzle>,
    pub moves: Vec<Move>,
    pub runtime_ms: f64,
    pub peak_states_in_memory: usize,
}

impl SearchResult {
    pub fn is_solved(&self) -> bool {
        self.final_state.is_some()
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let optimality = if self.strategy.is_optimal() {
            "(optimal)"
        } else {
            "(non-optimal)"
        };
        writeln!(f, "Algorithm: {}", self.strategy)?;
        writeln!(f, "Runtime: {:.3}ms", self.runtime_ms)?;
        if self.is_solved() {
            writeln!(f, "Moves: {} {}", self.moves.len(), optimality)?;
        } else {
            writeln!(f, "Moves: no solution found")?;
        }
        write!(f, "Max states: {}", self.peak_states_in_memory)
    }
}

/// Solves `start` into `goal` with `strategy`.
///
/// Layouts of different sizes or parity classes are rejected before any
/// search runs.
pub fn solve(strategy: Strategy, start: &Puzzle, goal: &Puzzle) -> Result<SearchResult, PuzzleError> {
    if !start.same_dimensions(goal) {
        return Err(PuzzleError::DimensionMismatch {
            start: (start.rows(), start.cols()),
            goal: (goal.rows(), goal.cols()),
        });
    }
    if start.is_solvable() != goal.is_solvable() {
        return Err(PuzzleError::SolvabilityMismatch);
    }

    info!(
        %strategy,
        rows = start.rows(),
        cols = start.cols(),
        "solving puzzle"
    );

    if start == goal {
        return Ok(SearchResult {
            strategy,
            final_state: Some(start.as_origin()),
            moves: Vec::new(),
            runtime_ms: 0.0,
            peak_states_in_memory: 1,
        });
    }

    let result = match strategy.policy() {
        Some(policy) => {
            let cells = start.rows() * start.cols();
            if cells > EXHAUSTIVE_CELL_WARNING && strategy.is_optimal() {
                warn!(%strategy, cells, "exhaustive search on a large grid may not finish");
            }

            let outcome = search(start, goal, policy)?;
            let moves = outcome
                .terminal
                .map(|id| reconstruct(&outcome.arena, id))
                .unwrap_or_default();
            SearchResult {
                strategy,
                final_state: outcome.terminal.map(|id| outcome.arena[id].as_origin()),
                moves,
                runtime_ms: outcome.runtime_ms,
                peak_states_in_memory: outcome.peak_states_in_memory,
            }
        }
        None => {
            let started = Instant::now();
            let construction = strategic::solve(start, goal)?;
            SearchResult {
                strategy,
                final_state: Some(construction.final_state),
                moves: construction.moves,
                runtime_ms: started.elapsed().as_secs_f64() * 1000.0,
                peak_states_in_memory: 1,
            }
        }
    };

    info!(
        %strategy,
        solved = result.is_solved(),
        moves = result.moves.len(),
        runtime_ms = result.runtime_ms,
        peak_states = result.peak_states_in_memory,
        "solve finished"
    );
    Ok(result)
}
