use thiserror::Error;

use crate::puzzle::{Move, Tile};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuzzleError {
    #[error("puzzle must be at least 2x2 and at most {max} cells, got {rows}x{cols}", max = Tile::MAX as usize + 1)]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("expected {expected} cells, got {found}")]
    CellCount { expected: usize, found: usize },

    #[error("puzzle has no blank cell")]
    MissingBlank,

    #[error("puzzle has {0} blank cells")]
    DuplicateBlank(usize),

    #[error("tile {0} appears more than once")]
    DuplicateTile(Tile),

    #[error("tile {value} is out of range for a puzzle of {cells} cells")]
    TileOutOfRange { value: Tile, cells: usize },

    #[error("cell ({row}, {col}) is outside the grid")]
    CellOutOfRange { row: usize, col: usize },

    #[error("start is {start:?} but goal is {goal:?}")]
    DimensionMismatch {
        start: (usize, usize),
        goal: (usize, usize),
    },

    #[error("start and goal have different solvability, no sequence of slides connects them")]
    SolvabilityMismatch,

    #[error("cannot slide {direction} with the blank at ({row}, {col})")]
    IllegalMove {
        direction: Move,
        row: usize,
        col: usize,
    },

    #[error("constructive solver stalled while placing tile {0}")]
    SolverStalled(Tile),

    #[error("final 2x2 block did not reach the goal within {0} blank rotations")]
    TerminalBlockUnsolved(usize),
}
