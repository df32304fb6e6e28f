//! Search-free solver that builds a solution by reducing the grid one
//! boundary row or column at a time until a 2×2 block remains.
//!
//! The working copy is reoriented before solving: it is mirrored so the goal
//! blank lies in the bottom-right quadrant, which fixes the reduction
//! directions for the whole run, and it is transposed while a column is being
//! reduced so that a single row routine serves both axes. Every slide is
//! mapped back to the caller's orientation as it is recorded.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::error::PuzzleError;
use crate::puzzle::{Move, Puzzle, Tile};

/// Blank steps after which a solvable 2×2 block has cycled through every
/// arrangement (4 blank positions × 3 rotations of the tiles).
const TERMINAL_ROTATION_LIMIT: usize = 12;

type Cell = (usize, usize);

/// Still-unsolved sub-rectangle, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    top: usize,
    bottom: usize,
    left: usize,
    right: usize,
}

impl Bounds {
    fn height(&self) -> usize {
        self.bottom + 1 - self.top
    }

    fn width(&self) -> usize {
        self.right + 1 - self.left
    }

    fn contains(&self, (row, col): Cell) -> bool {
        (self.top..=self.bottom).contains(&row) && (self.left..=self.right).contains(&col)
    }

    fn transposed(self) -> Self {
        Self {
            top: self.left,
            bottom: self.right,
            left: self.top,
            right: self.bottom,
        }
    }

    /// Neighbour of `cell` in `direction`, if it stays inside.
    fn step(&self, (row, col): Cell, direction: Move) -> Option<Cell> {
        let (dr, dc) = direction.as_offset();
        let next = (row.checked_add_signed(dr)?, col.checked_add_signed(dc)?);
        self.contains(next).then_some(next)
    }
}

/// How the working copy is oriented relative to the caller's grid.
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    flip_rows: bool,
    flip_cols: bool,
    transposed: bool,
}

impl Frame {
    fn to_original(self, direction: Move) -> Move {
        let direction = if self.transposed {
            direction.transposed()
        } else {
            direction
        };
        let flipped = if direction.is_vertical() {
            self.flip_rows
        } else {
            self.flip_cols
        };
        if flipped {
            direction.opposite()
        } else {
            direction
        }
    }
}

/// Output of the constructive solver.
#[derive(Debug, Clone)]
pub struct Construction {
    pub final_state: Puzzle,
    pub moves: Vec<Move>,
}

struct SolverContext {
    board: Puzzle,
    target: Puzzle,
    bounds: Bounds,
    frame: Frame,
    // cells of the row in progress that already hold their goal tile
    pinned: Vec<Cell>,
    moves: Vec<Move>,
}

/// Solves `start` into `goal` without searching the state space.
///
/// The result is generally far from shortest, but runs in polynomial time
/// for any size. Fails with [`PuzzleError::TerminalBlockUnsolved`] when the
/// two layouts are in different parity classes.
pub fn solve(start: &Puzzle, goal: &Puzzle) -> Result<Construction, PuzzleError> {
    if !start.same_dimensions(goal) {
        return Err(PuzzleError::DimensionMismatch {
            start: (start.rows(), start.cols()),
            goal: (goal.rows(), goal.cols()),
        });
    }

    let (goal_row, goal_col) = goal.blank();
    let frame = Frame {
        flip_rows: goal_row * 2 < goal.rows() - 1,
        flip_cols: goal_col * 2 < goal.cols() - 1,
        transposed: false,
    };

    let mut target = goal.mirrored(frame.flip_rows, frame.flip_cols);
    let parking = park_blank(&mut target)?;

    let mut ctx = SolverContext {
        board: start.mirrored(frame.flip_rows, frame.flip_cols),
        bounds: Bounds {
            top: 0,
            bottom: target.rows() - 1,
            left: 0,
            right: target.cols() - 1,
        },
        target,
        frame,
        pinned: Vec::new(),
        moves: Vec::new(),
    };

    ctx.reduce()?;

    // Walk the blank back from the corner to where the goal wants it
    for direction in parking.iter().rev() {
        ctx.apply(direction.opposite())?;
    }

    let mut final_state = start.as_origin();
    final_state.apply_moves(&ctx.moves)?;
    debug!(moves = ctx.moves.len(), "constructive solve finished");

    Ok(Construction {
        final_state,
        moves: ctx.moves,
    })
}

/// Slides the blank of `target` to its bottom-right corner and returns the slides used.
fn park_blank(target: &mut Puzzle) -> Result<Vec<Move>, PuzzleError> {
    let mut parking = Vec::new();
    while target.blank().1 + 1 < target.cols() {
        target.slide(Move::Right)?;
        parking.push(Move::Right);
    }
    while target.blank().0 + 1 < target.rows() {
        target.slide(Move::Down)?;
        parking.push(Move::Down);
    }
    Ok(parking)
}

fn direction_between(from: Cell, to: Cell) -> Move {
    if to.0 < from.0 {
        Move::Up
    } else if to.0 > from.0 {
        Move::Down
    } else if to.1 < from.1 {
        Move::Left
    } else {
        Move::Right
    }
}

fn toward(from: usize, to: usize) -> usize {
    if from < to {
        from + 1
    } else {
        from - 1
    }
}

impl SolverContext {
    fn apply(&mut self, direction: Move) -> Result<(), PuzzleError> {
        self.board.slide(direction)?;
        self.moves.push(self.frame.to_original(direction));
        Ok(())
    }

    fn transpose(&mut self) {
        self.board = self.board.transposed();
        self.target = self.target.transposed();
        self.bounds = self.bounds.transposed();
        self.frame.transposed = !self.frame.transposed;
    }

    fn locate(&self, value: Tile) -> Result<Cell, PuzzleError> {
        self.board
            .position_of(value)
            .ok_or(PuzzleError::SolverStalled(value))
    }

    fn is_free(&self, cell: Cell) -> bool {
        self.bounds.contains(cell) && !self.pinned.contains(&cell)
    }

    fn reduce(&mut self) -> Result<(), PuzzleError> {
        while self.bounds.height() > 2 || self.bounds.width() > 2 {
            if self.bounds.height() > 2 && self.bounds.height() >= self.bounds.width() {
                debug!(bounds = ?self.bounds, "reducing boundary row");
                self.solve_top_row()?;
            } else {
                debug!(bounds = ?self.bounds, "reducing boundary column");
                self.transpose();
                self.solve_top_row()?;
                self.transpose();
            }
        }
        self.rotate_terminal_block()
    }

    /// Places the goal tiles of the top unsolved row and shrinks the bounds.
    /// Needs at least three unsolved rows.
    fn solve_top_row(&mut self) -> Result<(), PuzzleError> {
        let Bounds {
            top, left, right, ..
        } = self.bounds;

        for col in left..right - 1 {
            let value = self.target.tile(top, col);
            self.move_tile(value, (top, col))?;
            self.pinned.push((top, col));
        }

        // The last two tiles cannot be placed one after the other
        let first = self.target.tile(top, right - 1);
        let last = self.target.tile(top, right);
        if self.board.tile(top, right - 1) != first || self.board.tile(top, right) != last {
            let window = Bounds {
                top,
                bottom: top + 2,
                left: right - 1,
                right,
            };

            self.move_tile(first, (top, right))?;
            self.pinned.push((top, right));
            if !window.contains(self.locate(last)?) {
                self.move_tile(last, (top + 2, right - 1))?;
            }
            self.pinned.pop();

            self.finish_row_end(first, last, window)?;
        }

        self.pinned.clear();
        self.bounds.top += 1;
        Ok(())
    }

    /// Brings `value` to `target`, correcting its column before its row. The
    /// blank is routed around the tile and the pinned cells for every step.
    fn move_tile(&mut self, value: Tile, target: Cell) -> Result<(), PuzzleError> {
        let mut tile = self.locate(value)?;

        while tile != target {
            let next = if tile.1 != target.1 {
                (tile.0, toward(tile.1, target.1))
            } else {
                (toward(tile.0, target.0), tile.1)
            };

            // The route never crosses the tile, so a blank lying in the
            // tile's line of travel is walked around it without a separate nudge
            let route = self
                .blank_route(&[tile], |cell| cell == next)
                .ok_or(PuzzleError::SolverStalled(value))?;
            for direction in route {
                self.apply(direction)?;
            }

            // Blank now sits on `next`; pulling it back moves the tile forward
            self.apply(direction_between(next, tile))?;
            tile = next;
        }

        Ok(())
    }

    /// Shortest blank route through free cells, avoiding `avoid`, to the
    /// first cell accepted by `arrived`.
    fn blank_route(&self, avoid: &[Cell], arrived: impl Fn(Cell) -> bool) -> Option<Vec<Move>> {
        let start = self.board.blank();
        if arrived(start) {
            return Some(Vec::new());
        }

        let mut came_from: HashMap<Cell, (Cell, Move)> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(cell) = queue.pop_front() {
            for direction in Move::ALL {
                let Some(next) = self.bounds.step(cell, direction) else {
                    continue;
                };
                if next == start
                    || came_from.contains_key(&next)
                    || !self.is_free(next)
                    || avoid.contains(&next)
                {
                    continue;
                }
                came_from.insert(next, (cell, direction));

                if arrived(next) {
                    let mut route = Vec::new();
                    let mut at = next;
                    while let Some(&(prev, step)) = came_from.get(&at) {
                        route.push(step);
                        at = prev;
                    }
                    route.reverse();
                    return Some(route);
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Finishes the top row's last two cells inside the 3×2 `window` at its
    /// right end, where both tiles already lie.
    fn finish_row_end(&mut self, first: Tile, last: Tile, window: Bounds) -> Result<(), PuzzleError> {
        let (a, b) = (self.locate(first)?, self.locate(last)?);
        let route = self
            .blank_route(&[a, b], |cell| window.contains(cell))
            .ok_or(PuzzleError::SolverStalled(last))?;
        for direction in route {
            self.apply(direction)?;
        }

        let goal = ((window.top, window.left), (window.top, window.right));
        let plan = plan_pair(window, (a, b, self.board.blank()), goal)
            .ok_or(PuzzleError::SolverStalled(last))?;
        for direction in plan {
            self.apply(direction)?;
        }
        Ok(())
    }

    /// Cycles the blank round the final 2×2 block, vertical slide first.
    fn rotate_terminal_block(&mut self) -> Result<(), PuzzleError> {
        let Bounds { top, left, .. } = self.bounds;
        let mut vertical = true;

        for _ in 0..TERMINAL_ROTATION_LIMIT {
            if self.board == self.target {
                return Ok(());
            }

            let (row, col) = self.board.blank();
            let direction = match (vertical, row > top, col > left) {
                (true, true, _) => Move::Up,
                (true, false, _) => Move::Down,
                (false, _, true) => Move::Left,
                (false, _, false) => Move::Right,
            };
            self.apply(direction)?;
            vertical = !vertical;
        }

        if self.board == self.target {
            Ok(())
        } else {
            Err(PuzzleError::TerminalBlockUnsolved(TERMINAL_ROTATION_LIMIT))
        }
    }
}

/// Breadth-first search over the positions of two tracked tiles and the
/// blank, confined to `window`. Other tiles in the window are free to move.
fn plan_pair(window: Bounds, start: (Cell, Cell, Cell), goal: (Cell, Cell)) -> Option<Vec<Move>> {
    type Placement = (Cell, Cell, Cell);

    let mut came_from: HashMap<Placement, (Placement, Move)> = HashMap::new();
    let mut seen: HashSet<Placement> = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(state) = queue.pop_front() {
        let (a, b, blank) = state;
        if (a, b) == goal {
            let mut plan = Vec::new();
            let mut at = state;
            while let Some(&(prev, step)) = came_from.get(&at) {
                plan.push(step);
                at = prev;
            }
            plan.reverse();
            return Some(plan);
        }

        for direction in Move::ALL {
            let Some(next) = window.step(blank, direction) else {
                continue;
            };
            let moved = (
                if a == next { blank } else { a },
                if b == next { blank } else { b },
                next,
            );
            if seen.insert(moved) {
                came_from.insert(moved, (state, direction));
                queue.push_back(moved);
            }
        }
    }

    None
}
