use crate::puzzle::{Puzzle, Tile, BLANK};

/// Location of every tile in one specific goal layout, indexed by tile value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalMapping {
    positions: Vec<(usize, usize)>,
}

impl GoalMapping {
    pub fn new(goal: &Puzzle) -> Self {
        let mut positions = vec![(0, 0); goal.cells().len()];
        for (idx, &value) in goal.cells().iter().enumerate() {
            positions[value as usize] = (idx / goal.cols(), idx % goal.cols());
        }
        Self { positions }
    }

    /// `(row, col)` of `tile` in the goal.
    pub fn position(&self, tile: Tile) -> (usize, usize) {
        self.positions[tile as usize]
    }
}

/// Sum of row and column distances of every non-blank tile from its goal cell.
///
/// Never overestimates the remaining slides, so A* stays optimal with it.
pub fn manhattan_sum(state: &Puzzle, goal: &GoalMapping) -> u32 {
    state
        .cells()
        .iter()
        .enumerate()
        .filter(|&(_, &value)| value != BLANK)
        .map(|(idx, &value)| {
            let (row, col) = (idx / state.cols(), idx % state.cols());
            let (goal_row, goal_col) = goal.position(value);
            (row.abs_diff(goal_row) + col.abs_diff(goal_col)) as u32
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_scores_zero() {
        let goal = Puzzle::new(3, 4).unwrap();
        assert_eq!(manhattan_sum(&goal, &GoalMapping::new(&goal)), 0);
    }

    #[test]
    fn ignores_the_blank() {
        let goal = Puzzle::new(3, 3).unwrap();
        let mapping = GoalMapping::new(&goal);
        let state = Puzzle::from_matrix(&[[1, 2, 3], [4, 0, 6], [7, 5, 8]]).unwrap();
        // 5 is one row low, 8 is one column right
        assert_eq!(manhattan_sum(&state, &mapping), 2);
    }

    #[test]
    fn follows_arbitrary_goals() {
        let goal = Puzzle::from_matrix(&[[0, 1], [2, 3]]).unwrap();
        let mapping = GoalMapping::new(&goal);
        assert_eq!(mapping.position(0), (0, 0));
        assert_eq!(mapping.position(3), (1, 1));

        let state = Puzzle::from_matrix(&[[3, 1], [2, 0]]).unwrap();
        assert_eq!(manhattan_sum(&state, &mapping), 2);
    }
}
