//! Solver for the generalised sliding-tile puzzle: an R×C grid with one blank
//! and an arbitrary goal layout.
//!
//! Four strategies are available through [`solve`]: breadth-first search,
//! A* and greedy best-first search over the state space, and a constructive
//! solver that places tiles row by row and column by column without
//! searching.
//!
//! ```
//! use slider_solver::{solve, Puzzle, Strategy};
//!
//! let start = Puzzle::from_matrix(&[[1, 2, 3], [4, 0, 6], [7, 5, 8]]).unwrap();
//! let goal = Puzzle::new(3, 3).unwrap();
//! let result = solve(Strategy::AStar, &start, &goal).unwrap();
//! assert_eq!(result.moves.len(), 2);
//! ```

pub mod arena;
pub mod error;
pub mod heuristic;
pub mod path;
pub mod puzzle;
pub mod search;
pub mod solver;
pub mod strategic;

pub use error::PuzzleError;
pub use puzzle::{Move, Puzzle, Tile, BLANK};
pub use solver::{solve, SearchResult, Strategy};
