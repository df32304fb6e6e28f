use rand::{seq::SliceRandom, Rng};
use std::fmt;

use crate::arena::StateId;
use crate::error::PuzzleError;
use crate::heuristic::{manhattan_sum, GoalMapping};

/// Value of a single cell. `BLANK` marks the empty cell.
pub type Tile = u16;

pub const BLANK: Tile = 0;

/// Direction the blank travels during one slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// Expansion order used by every search policy.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    pub fn as_offset(&self) -> (isize, isize) {
        match self {
            Move::Up => (-1, 0),
            Move::Down => (1, 0),
            Move::Left => (0, -1),
            Move::Right => (0, 1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Move::Up => Move::Down,
            Move::Down => Move::Up,
            Move::Left => Move::Right,
            Move::Right => Move::Left,
        }
    }

    /// The same move seen on a grid reflected across its main diagonal.
    pub fn transposed(&self) -> Self {
        match self {
            Move::Up => Move::Left,
            Move::Left => Move::Up,
            Move::Down => Move::Right,
            Move::Right => Move::Down,
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Move::Up | Move::Down)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Move::Up => "UP",
            Move::Down => "DOWN",
            Move::Left => "LEFT",
            Move::Right => "RIGHT",
        };
        write!(f, "{}", s)
    }
}

/// Deduplication key for a configuration. Equal puzzles always produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey(Box<[Tile]>);

/// One configuration of an R×C sliding-tile grid.
///
/// Besides the cells, a puzzle produced during search remembers how it was
/// reached: the slide that produced it, its distance from the origin, its
/// cached heuristic value and the arena slot of its predecessor. Equality only
/// looks at the cells.
#[derive(Debug, Clone)]
pub struct Puzzle {
    rows: usize,
    cols: usize,
    cells: Vec<Tile>,
    blank_row: usize,
    blank_col: usize,
    last_move: Option<Move>,
    path_cost: u32,
    heuristic: u32,
    parent: Option<StateId>,
}

impl Puzzle {
    /// Ordered goal layout: tiles `1..rows*cols` row-major, blank last.
    pub fn new(rows: usize, cols: usize) -> Result<Self, PuzzleError> {
        Self::check_dimensions(rows, cols)?;
        let total = rows * cols;
        let mut cells: Vec<Tile> = (1..total).map(|value| value as Tile).collect();
        cells.push(BLANK); // The empty space is represented by 0

        Ok(Self::with_cells(rows, cols, cells, rows - 1, cols - 1))
    }

    /// Builds a puzzle from a matrix of rows, validating that it holds every
    /// tile exactly once.
    pub fn from_matrix<R: AsRef<[Tile]>>(matrix: &[R]) -> Result<Self, PuzzleError> {
        let rows = matrix.len();
        let cols = matrix.first().map_or(0, |row| row.as_ref().len());
        Self::check_dimensions(rows, cols)?;

        let mut cells = Vec::with_capacity(rows * cols);
        for (row, values) in matrix.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != cols {
                return Err(PuzzleError::RaggedRow {
                    row,
                    found: values.len(),
                    expected: cols,
                });
            }
            cells.extend_from_slice(values);
        }

        Self::from_cells(rows, cols, cells)
    }

    /// Builds a puzzle from row-major cells.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<Tile>) -> Result<Self, PuzzleError> {
        Self::check_dimensions(rows, cols)?;
        let blank = Self::validate_cells(rows * cols, &cells)?;
        Ok(Self::with_cells(rows, cols, cells, blank / cols, blank % cols))
    }

    /// Random layout whose parity label (see [`Puzzle::is_solvable`]) equals `solvable`.
    pub fn random<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        solvable: bool,
        rng: &mut R,
    ) -> Result<Self, PuzzleError> {
        let mut puzzle = Self::new(rows, cols)?;
        puzzle.shuffle_into_class(solvable, rng);
        Ok(puzzle)
    }

    /// Shuffles the tiles in place. The result stays reachable from the
    /// layout before the shuffle.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let class = self.is_solvable();
        self.shuffle_into_class(class, rng);
    }

    fn shuffle_into_class<R: Rng + ?Sized>(&mut self, solvable: bool, rng: &mut R) {
        self.cells.shuffle(rng);

        if Self::is_solvable_flat(&self.cells, self.cols) != solvable {
            // Swapping two tiles flips inversion parity and leaves the blank where it is.
            let mut tiles = self
                .cells
                .iter()
                .enumerate()
                .filter(|&(_, &value)| value != BLANK)
                .map(|(idx, _)| idx);
            if let (Some(first), Some(second)) = (tiles.next(), tiles.next()) {
                self.cells.swap(first, second);
            }
        }

        self.relocate_blank();
        self.reset_history();
    }

    fn with_cells(
        rows: usize,
        cols: usize,
        cells: Vec<Tile>,
        blank_row: usize,
        blank_col: usize,
    ) -> Self {
        Self {
            rows,
            cols,
            cells,
            blank_row,
            blank_col,
            last_move: None,
            path_cost: 0,
            heuristic: 0,
            parent: None,
        }
    }

    fn check_dimensions(rows: usize, cols: usize) -> Result<(), PuzzleError> {
        let fits = rows
            .checked_mul(cols)
            .is_some_and(|total| total <= Tile::MAX as usize + 1);
        if rows < 2 || cols < 2 || !fits {
            return Err(PuzzleError::InvalidDimensions { rows, cols });
        }
        Ok(())
    }

    /// Returns the index of the blank once `cells` is known to be a permutation of `0..total`.
    fn validate_cells(total: usize, cells: &[Tile]) -> Result<usize, PuzzleError> {
        if cells.len() != total {
            return Err(PuzzleError::CellCount {
                expected: total,
                found: cells.len(),
            });
        }

        let blanks = cells.iter().filter(|&&value| value == BLANK).count();
        match blanks {
            0 => return Err(PuzzleError::MissingBlank),
            1 => {}
            n => return Err(PuzzleError::DuplicateBlank(n)),
        }

        let mut seen = vec![false; total];
        for &value in cells {
            let slot = seen
                .get_mut(value as usize)
                .ok_or(PuzzleError::TileOutOfRange { value, cells: total })?;
            if *slot {
                return Err(PuzzleError::DuplicateTile(value));
            }
            *slot = true;
        }

        cells
            .iter()
            .position(|&value| value == BLANK)
            .ok_or(PuzzleError::MissingBlank)
    }

    fn relocate_blank(&mut self) {
        if let Some(idx) = self.cells.iter().position(|&value| value == BLANK) {
            self.blank_row = idx / self.cols;
            self.blank_col = idx % self.cols;
        }
    }

    fn reset_history(&mut self) {
        self.last_move = None;
        self.path_cost = 0;
        self.heuristic = 0;
        self.parent = None;
    }

    /// Copy of the cells with search history dropped, ready to seed a search.
    pub fn as_origin(&self) -> Self {
        let mut origin = self.clone();
        origin.reset_history();
        origin
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[Tile] {
        &self.cells
    }

    pub fn tile(&self, row: usize, col: usize) -> Tile {
        self.cells[row * self.cols + col]
    }

    /// `(row, col)` of the blank.
    pub fn blank(&self) -> (usize, usize) {
        (self.blank_row, self.blank_col)
    }

    pub fn position_of(&self, value: Tile) -> Option<(usize, usize)> {
        self.cells
            .iter()
            .position(|&cell| cell == value)
            .map(|idx| (idx / self.cols, idx % self.cols))
    }

    /// Slide that produced this state, `None` for an origin.
    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    pub fn path_cost(&self) -> u32 {
        self.path_cost
    }

    /// Cached Manhattan sum, valid after [`Puzzle::update_heuristic`] or
    /// when produced by [`Puzzle::neighbors`] with a goal mapping.
    pub fn heuristic(&self) -> u32 {
        self.heuristic
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    pub fn update_heuristic(&mut self, goal: &GoalMapping) {
        self.heuristic = manhattan_sum(self, goal);
    }

    pub fn same_dimensions(&self, other: &Puzzle) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    fn target_of(&self, direction: Move) -> Option<(usize, usize)> {
        let (dr, dc) = direction.as_offset();
        let row = self.blank_row.checked_add_signed(dr)?;
        let col = self.blank_col.checked_add_signed(dc)?;
        (row < self.rows && col < self.cols).then_some((row, col))
    }

    /// True iff the blank is not on the grid edge in `direction`.
    pub fn can_slide(&self, direction: Move) -> bool {
        self.target_of(direction).is_some()
    }

    /// Moves the tile next to the blank (in `direction`) into the blank's cell.
    pub fn slide(&mut self, direction: Move) -> Result<(), PuzzleError> {
        let (row, col) = self.target_of(direction).ok_or(PuzzleError::IllegalMove {
            direction,
            row: self.blank_row,
            col: self.blank_col,
        })?;

        let from = row * self.cols + col;
        let to = self.blank_row * self.cols + self.blank_col;
        self.cells[to] = self.cells[from];
        self.cells[from] = BLANK;
        self.blank_row = row;
        self.blank_col = col;
        Ok(())
    }

    /// Replays `moves` in order, stopping at the first illegal one.
    pub fn apply_moves(&mut self, moves: &[Move]) -> Result<(), PuzzleError> {
        moves.iter().try_for_each(|&direction| self.slide(direction))
    }

    /// Children reachable by one slide, skipping the slide that would undo
    /// the move that produced `self`.
    pub fn neighbors<'a>(
        &'a self,
        id: StateId,
        goal: Option<&'a GoalMapping>,
    ) -> impl Iterator<Item = Puzzle> + 'a {
        let forbidden = self.last_move.map(|last| last.opposite());
        Move::ALL
            .into_iter()
            .filter(move |&direction| Some(direction) != forbidden && self.can_slide(direction))
            .filter_map(move |direction| {
                let mut child = self.clone();
                child.slide(direction).ok()?;
                child.last_move = Some(direction);
                child.parent = Some(id);
                child.path_cost = self.path_cost + 1;
                if let Some(goal) = goal {
                    child.update_heuristic(goal);
                }
                Some(child)
            })
    }

    pub fn canonical_key(&self) -> StateKey {
        StateKey(self.cells.clone().into_boxed_slice())
    }

    /// Edit-mode swap of any two cells. The blank may be one of them.
    pub fn swap_cells(
        &mut self,
        (row_a, col_a): (usize, usize),
        (row_b, col_b): (usize, usize),
    ) -> Result<(), PuzzleError> {
        for (row, col) in [(row_a, col_a), (row_b, col_b)] {
            if row >= self.rows || col >= self.cols {
                return Err(PuzzleError::CellOutOfRange { row, col });
            }
        }

        self.cells
            .swap(row_a * self.cols + col_a, row_b * self.cols + col_b);
        self.relocate_blank();
        self.reset_history();
        Ok(())
    }

    /// Play-mode click: slides the tile at `(row, col)` into the blank if the
    /// two are orthogonally adjacent, returning the blank's move.
    pub fn slide_tile_at(&mut self, row: usize, col: usize) -> Option<Move> {
        let direction = Move::ALL
            .into_iter()
            .find(|&direction| self.target_of(direction) == Some((row, col)))?;
        self.slide(direction).ok()?;
        Some(direction)
    }

    /// Parity class of this layout. Two layouts of the same size can reach
    /// each other iff they report the same class.
    pub fn is_solvable(&self) -> bool {
        Self::is_solvable_flat(&self.cells, self.cols)
    }

    /// Validates `matrix` and reports its parity class.
    pub fn is_matrix_solvable<R: AsRef<[Tile]>>(matrix: &[R]) -> Result<bool, PuzzleError> {
        Self::from_matrix(matrix).map(|puzzle| puzzle.is_solvable())
    }

    fn is_solvable_flat(flattened: &[Tile], cols: usize) -> bool {
        let blank_row = flattened
            .iter()
            .position(|&value| value == BLANK)
            .map_or(0, |idx| idx / cols);
        let odd_inversions = Self::inversion_parity(flattened);

        if cols % 2 == 1 {
            // Odd width: solvable iff the inversion count is even
            !odd_inversions
        } else {
            // Even width: solvable iff inversions + blank row is odd
            odd_inversions != (blank_row % 2 == 1)
        }
    }

    /// Parity of the inversion count of the non-blank tiles, read row-major.
    ///
    /// The tiles are a permutation of `1..n`, so the parity equals the
    /// permutation's parity, `(len - cycles) mod 2`.
    fn inversion_parity(flattened: &[Tile]) -> bool {
        let sequence: Vec<usize> = flattened
            .iter()
            .filter(|&&value| value != BLANK)
            .map(|&value| value as usize - 1)
            .collect();

        let mut seen = vec![false; sequence.len()];
        let mut cycles = 0;
        for start in 0..sequence.len() {
            if seen[start] {
                continue;
            }
            cycles += 1;
            let mut idx = start;
            while !seen[idx] {
                seen[idx] = true;
                idx = sequence[idx];
            }
        }

        (sequence.len() - cycles) % 2 == 1
    }

    /// Reflected copy, rows reversed and/or columns reversed.
    pub(crate) fn mirrored(&self, flip_rows: bool, flip_cols: bool) -> Self {
        let mut cells = Vec::with_capacity(self.cells.len());
        for row in 0..self.rows {
            let src_row = if flip_rows { self.rows - 1 - row } else { row };
            for col in 0..self.cols {
                let src_col = if flip_cols { self.cols - 1 - col } else { col };
                cells.push(self.tile(src_row, src_col));
            }
        }

        let blank_row = if flip_rows { self.rows - 1 - self.blank_row } else { self.blank_row };
        let blank_col = if flip_cols { self.cols - 1 - self.blank_col } else { self.blank_col };
        Self::with_cells(self.rows, self.cols, cells, blank_row, blank_col)
    }

    /// Copy reflected across the main diagonal.
    pub(crate) fn transposed(&self) -> Self {
        let mut cells = Vec::with_capacity(self.cells.len());
        for col in 0..self.cols {
            for row in 0..self.rows {
                cells.push(self.tile(row, col));
            }
        }
        Self::with_cells(self.cols, self.rows, cells, self.blank_col, self.blank_row)
    }
}

impl PartialEq for Puzzle {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.cells == other.cells
    }
}

impl Eq for Puzzle {}

impl fmt::Display for Puzzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = (self.cells.len() - 1).to_string().len();
        for row in self.cells.chunks(self.cols) {
            for &val in row {
                if val == BLANK {
                    write!(f, "{:>width$} ", ".")?;
                } else {
                    write!(f, "{:>width$} ", val)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn scenario_start() -> Puzzle {
        Puzzle::from_matrix(&[[1, 2, 3], [4, 0, 6], [7, 5, 8]]).unwrap()
    }

    #[test]
    fn new_builds_ordered_goal() {
        let puzzle = Puzzle::new(3, 4).unwrap();
        assert_eq!(puzzle.cells(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 0]);
        assert_eq!(puzzle.blank(), (2, 3));
        assert_eq!(puzzle.last_move(), None);
        assert_eq!(puzzle.path_cost(), 0);
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert_eq!(
            Puzzle::new(1, 5),
            Err(PuzzleError::InvalidDimensions { rows: 1, cols: 5 })
        );
        assert!(Puzzle::new(300, 300).is_err());
    }

    #[test]
    fn rejects_malformed_matrices() {
        assert_eq!(
            Puzzle::from_matrix(&[vec![1, 2, 3], vec![0, 4]]),
            Err(PuzzleError::RaggedRow {
                row: 1,
                found: 2,
                expected: 3
            })
        );
        assert_eq!(
            Puzzle::from_matrix(&[[1, 2], [3, 3]]),
            Err(PuzzleError::MissingBlank)
        );
        assert_eq!(
            Puzzle::from_matrix(&[[1, 0], [0, 3]]),
            Err(PuzzleError::DuplicateBlank(2))
        );
        assert_eq!(
            Puzzle::from_matrix(&[[1, 1], [0, 3]]),
            Err(PuzzleError::DuplicateTile(1))
        );
        assert_eq!(
            Puzzle::from_matrix(&[[1, 2], [0, 7]]),
            Err(PuzzleError::TileOutOfRange { value: 7, cells: 4 })
        );
        assert_eq!(
            Puzzle::from_cells(2, 2, vec![1, 2, 0]),
            Err(PuzzleError::CellCount {
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn slide_moves_blank_and_tile() {
        let mut puzzle = scenario_start();
        puzzle.slide(Move::Down).unwrap();
        assert_eq!(puzzle.blank(), (2, 1));
        assert_eq!(puzzle.tile(1, 1), 5);
        assert_eq!(puzzle.tile(2, 1), BLANK);
    }

    #[test]
    fn slide_off_the_edge_is_illegal() {
        let mut puzzle = Puzzle::new(2, 2).unwrap();
        assert!(!puzzle.can_slide(Move::Down));
        assert!(!puzzle.can_slide(Move::Right));
        assert!(puzzle.can_slide(Move::Up));
        assert_eq!(
            puzzle.slide(Move::Right),
            Err(PuzzleError::IllegalMove {
                direction: Move::Right,
                row: 1,
                col: 1
            })
        );
        assert_eq!(puzzle, Puzzle::new(2, 2).unwrap());
    }

    #[test]
    fn neighbors_track_history_and_skip_reversal() {
        let origin = scenario_start();
        let goal = GoalMapping::new(&Puzzle::new(3, 3).unwrap());
        let children: Vec<Puzzle> = origin.neighbors(StateId::new(0), Some(&goal)).collect();
        assert_eq!(children.len(), 4);

        for child in &children {
            assert_eq!(child.path_cost(), origin.path_cost() + 1);
            assert_eq!(child.parent(), Some(StateId::new(0)));
            assert_eq!(child.heuristic(), manhattan_sum(child, &goal));

            // exactly the slid tile and the blank change places
            let differing = origin
                .cells()
                .iter()
                .zip(child.cells())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(differing, 2);
        }

        let down = children
            .iter()
            .find(|child| child.last_move() == Some(Move::Down))
            .unwrap();
        let grandchildren: Vec<Move> = down
            .neighbors(StateId::new(1), None)
            .filter_map(|child| child.last_move())
            .collect();
        assert_eq!(grandchildren, vec![Move::Left, Move::Right]);
    }

    #[test]
    fn equal_layouts_share_a_key() {
        let mut a = scenario_start();
        let b = scenario_start();
        assert_eq!(a.canonical_key(), b.canonical_key());

        a.slide(Move::Up).unwrap();
        assert_ne!(a, b);
        assert_ne!(a.canonical_key(), b.canonical_key());
        a.slide(Move::Down).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn parity_classes() {
        assert!(Puzzle::new(3, 3).unwrap().is_solvable());
        assert!(scenario_start().is_solvable());
        assert!(Puzzle::new(4, 4).unwrap().is_solvable());
        assert_eq!(
            Puzzle::is_matrix_solvable(&[[2, 1, 3], [4, 5, 6], [7, 8, 0]]),
            Ok(false)
        );
        assert!(Puzzle::is_matrix_solvable(&[[2, 1], [0, 0]]).is_err());
    }

    #[test]
    fn random_walks_stay_in_class() {
        let mut rng = StdRng::seed_from_u64(7);
        for (rows, cols) in [(2, 2), (3, 3), (3, 4), (4, 4), (5, 2)] {
            let goal = Puzzle::new(rows, cols).unwrap();
            let mut walker = goal.clone();
            for _ in 0..200 {
                let direction = Move::ALL[rng.gen_range(0..4)];
                if walker.can_slide(direction) {
                    walker.slide(direction).unwrap();
                }
                assert_eq!(walker.is_solvable(), goal.is_solvable());
            }
        }
    }

    #[test]
    fn random_respects_requested_class() {
        let mut rng = StdRng::seed_from_u64(11);
        for solvable in [true, false] {
            for _ in 0..20 {
                let puzzle = Puzzle::random(3, 4, solvable, &mut rng).unwrap();
                assert_eq!(puzzle.is_solvable(), solvable);
                assert_eq!(puzzle.tile(puzzle.blank().0, puzzle.blank().1), BLANK);
            }
        }
    }

    #[test]
    fn shuffle_keeps_reachability() {
        let mut rng = StdRng::seed_from_u64(3);
        let goal = Puzzle::from_matrix(&[[0, 1, 2, 3], [4, 5, 6, 7]]).unwrap();
        for _ in 0..20 {
            let mut puzzle = goal.clone();
            puzzle.shuffle(&mut rng);
            assert_eq!(puzzle.is_solvable(), goal.is_solvable());
        }
    }

    #[test]
    fn swap_cells_moves_blank_cache() {
        let mut puzzle = Puzzle::new(3, 3).unwrap();
        puzzle.swap_cells((2, 2), (0, 0)).unwrap();
        assert_eq!(puzzle.blank(), (0, 0));
        assert_eq!(puzzle.tile(2, 2), 1);
        assert_eq!(
            puzzle.swap_cells((3, 0), (0, 0)),
            Err(PuzzleError::CellOutOfRange { row: 3, col: 0 })
        );
    }

    #[test]
    fn slide_tile_at_only_accepts_adjacent_tiles() {
        let mut puzzle = scenario_start();
        assert_eq!(puzzle.slide_tile_at(0, 0), None);
        assert_eq!(puzzle.slide_tile_at(1, 1), None);
        assert_eq!(puzzle.slide_tile_at(2, 1), Some(Move::Down));
        assert_eq!(puzzle.blank(), (2, 1));
    }

    #[test]
    fn mirror_and_transpose_keep_blank_cache() {
        let puzzle = Puzzle::from_matrix(&[[1, 2, 3], [4, 5, 0]]).unwrap();

        let flipped = puzzle.mirrored(true, true);
        assert_eq!(flipped.cells(), &[0, 5, 4, 3, 2, 1]);
        assert_eq!(flipped.blank(), (0, 0));

        let transposed = puzzle.transposed();
        assert_eq!((transposed.rows(), transposed.cols()), (3, 2));
        assert_eq!(transposed.cells(), &[1, 4, 2, 5, 3, 0]);
        assert_eq!(transposed.blank(), (2, 1));
        assert_eq!(transposed.transposed(), puzzle);
    }

    #[test]
    fn display_marks_the_blank() {
        let puzzle = Puzzle::new(2, 2).unwrap();
        assert_eq!(puzzle.to_string(), "1 2 \n3 . \n");
    }
}
