use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::time::Instant;

use tracing::{debug, trace};

use crate::arena::{StateArena, StateId};
use crate::error::PuzzleError;
use crate::heuristic::GoalMapping;
use crate::puzzle::{Puzzle, StateKey};

/// Frontier ordering used by [`search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Strict FIFO, no heuristic.
    BreadthFirst,
    /// Ascending `path_cost + heuristic`, with decrease-key on queued states.
    AStar,
    /// Ascending `heuristic`, first discovery of a state wins.
    GreedyBestFirst,
}

/// Raw result of one search. The arena keeps every generated state alive so
/// the caller can walk parent links from `terminal`.
#[derive(Debug)]
pub struct SearchOutcome {
    pub arena: StateArena,
    /// Goal state in the arena, `None` when the frontier ran dry.
    pub terminal: Option<StateId>,
    pub runtime_ms: f64,
    /// Visited set plus frontier size when the search stopped.
    pub peak_states_in_memory: usize,
}

trait Frontier {
    /// Admits a freshly generated state, or drops it according to the policy.
    fn offer(&mut self, arena: &mut StateArena, state: Puzzle, key: StateKey);

    fn pop(&mut self) -> Option<StateId>;

    /// Called once a state's key joins the visited set.
    fn expanded(&mut self, _key: &StateKey) {}

    fn len(&self) -> usize;
}

#[derive(Default)]
struct FifoFrontier {
    queue: VecDeque<StateId>,
}

impl Frontier for FifoFrontier {
    fn offer(&mut self, arena: &mut StateArena, state: Puzzle, _key: StateKey) {
        self.queue.push_back(arena.insert(state));
    }

    fn pop(&mut self) -> Option<StateId> {
        self.queue.pop_front()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Min-heap keyed by `(priority, insertion sequence)`, so equal priorities
/// come out in insertion order.
#[derive(Default)]
struct PriorityQueue {
    heap: BinaryHeap<Reverse<(u32, u64, StateId)>>,
    sequence: u64,
}

impl PriorityQueue {
    fn push(&mut self, priority: u32, id: StateId) {
        self.heap.push(Reverse((priority, self.sequence, id)));
        self.sequence += 1;
    }

    fn pop(&mut self) -> Option<StateId> {
        self.heap.pop().map(|Reverse((_, _, id))| id)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

#[derive(Default)]
struct AStarFrontier {
    queue: PriorityQueue,
    // best path cost among queued, not yet expanded entries
    open_costs: HashMap<StateKey, u32>,
}

impl Frontier for AStarFrontier {
    fn offer(&mut self, arena: &mut StateArena, state: Puzzle, key: StateKey) {
        if let Some(&queued) = self.open_costs.get(&key) {
            if queued <= state.path_cost() {
                return;
            }
        }

        // A cheaper route supersedes the queued entry, which is skipped at pop
        // time once this one has been expanded.
        let priority = state.path_cost() + state.heuristic();
        self.open_costs.insert(key, state.path_cost());
        self.queue.push(priority, arena.insert(state));
    }

    fn pop(&mut self) -> Option<StateId> {
        self.queue.pop()
    }

    fn expanded(&mut self, key: &StateKey) {
        self.open_costs.remove(key);
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

#[derive(Default)]
struct GreedyFrontier {
    queue: PriorityQueue,
    discovered: HashSet<StateKey>,
}

impl Frontier for GreedyFrontier {
    fn offer(&mut self, arena: &mut StateArena, state: Puzzle, key: StateKey) {
        if !self.discovered.insert(key) {
            return;
        }
        let priority = state.heuristic();
        self.queue.push(priority, arena.insert(state));
    }

    fn pop(&mut self) -> Option<StateId> {
        self.queue.pop()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Explores from `start` until `goal` is popped or the frontier is empty.
///
/// Callers are expected to have checked that both layouts share a parity
/// class; otherwise the whole reachable half of the state space is walked
/// before `terminal` comes back empty.
pub fn search(start: &Puzzle, goal: &Puzzle, policy: Policy) -> Result<SearchOutcome, PuzzleError> {
    if !start.same_dimensions(goal) {
        return Err(PuzzleError::DimensionMismatch {
            start: (start.rows(), start.cols()),
            goal: (goal.rows(), goal.cols()),
        });
    }

    debug!(?policy, rows = start.rows(), cols = start.cols(), "starting search");
    let outcome = match policy {
        Policy::BreadthFirst => explore(start, goal, None, FifoFrontier::default()),
        Policy::AStar => {
            let mapping = GoalMapping::new(goal);
            explore(start, goal, Some(&mapping), AStarFrontier::default())
        }
        Policy::GreedyBestFirst => {
            let mapping = GoalMapping::new(goal);
            explore(start, goal, Some(&mapping), GreedyFrontier::default())
        }
    };
    Ok(outcome)
}

fn explore<F: Frontier>(
    start: &Puzzle,
    goal: &Puzzle,
    mapping: Option<&GoalMapping>,
    mut frontier: F,
) -> SearchOutcome {
    let started = Instant::now();
    let mut arena = StateArena::new();
    let mut visited: HashSet<StateKey> = HashSet::new();

    let mut origin = start.as_origin();
    if let Some(mapping) = mapping {
        origin.update_heuristic(mapping);
    }
    let origin_key = origin.canonical_key();
    frontier.offer(&mut arena, origin, origin_key);

    let terminal = loop {
        let Some(id) = frontier.pop() else {
            debug!(visited = visited.len(), "frontier exhausted without reaching the goal");
            break None;
        };

        let current = &arena[id];
        if current == goal {
            break Some(id);
        }

        // Stale duplicates of already expanded states are dropped here
        let key = current.canonical_key();
        if visited.contains(&key) {
            continue;
        }
        frontier.expanded(&key);
        visited.insert(key);
        trace!(
            cost = current.path_cost(),
            heuristic = current.heuristic(),
            frontier = frontier.len(),
            "expanding"
        );

        let children: Vec<Puzzle> = current.neighbors(id, mapping).collect();
        for child in children {
            let child_key = child.canonical_key();
            if visited.contains(&child_key) {
                continue;
            }
            frontier.offer(&mut arena, child, child_key);
        }
    };

    SearchOutcome {
        peak_states_in_memory: visited.len() + frontier.len(),
        arena,
        terminal,
        runtime_ms: started.elapsed().as_secs_f64() * 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::reconstruct;
    use crate::puzzle::Move;

    fn scenario() -> (Puzzle, Puzzle) {
        let start = Puzzle::from_matrix(&[[1, 2, 3], [4, 0, 6], [7, 5, 8]]).unwrap();
        (start, Puzzle::new(3, 3).unwrap())
    }

    fn moves_of(outcome: &SearchOutcome) -> Vec<Move> {
        reconstruct(&outcome.arena, outcome.terminal.unwrap())
    }

    #[test]
    fn every_policy_solves_the_scenario_in_two() {
        let (start, goal) = scenario();
        for policy in [Policy::BreadthFirst, Policy::AStar, Policy::GreedyBestFirst] {
            let outcome = search(&start, &goal, policy).unwrap();
            assert_eq!(moves_of(&outcome), vec![Move::Down, Move::Right], "{policy:?}");
            assert_eq!(outcome.arena[outcome.terminal.unwrap()], goal);
            assert!(outcome.peak_states_in_memory >= 1);
        }
    }

    #[test]
    fn start_equal_to_goal_returns_origin() {
        let goal = Puzzle::new(3, 3).unwrap();
        let outcome = search(&goal, &goal, Policy::AStar).unwrap();
        let terminal = outcome.terminal.unwrap();
        assert!(reconstruct(&outcome.arena, terminal).is_empty());
        // origin is popped as the goal before it joins the visited set
        assert_eq!(outcome.peak_states_in_memory, 0);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let start = Puzzle::new(3, 3).unwrap();
        let goal = Puzzle::new(2, 2).unwrap();
        for policy in [Policy::BreadthFirst, Policy::AStar, Policy::GreedyBestFirst] {
            assert_eq!(
                search(&start, &goal, policy).unwrap_err(),
                PuzzleError::DimensionMismatch {
                    start: (3, 3),
                    goal: (2, 2)
                },
                "{policy:?}"
            );
        }
    }

    #[test]
    fn exhausts_on_mismatched_parity() {
        // 2x2 has only 12 reachable layouts per class
        let start = Puzzle::from_matrix(&[[2, 1], [3, 0]]).unwrap();
        let goal = Puzzle::new(2, 2).unwrap();
        assert_ne!(start.is_solvable(), goal.is_solvable());

        for policy in [Policy::BreadthFirst, Policy::AStar, Policy::GreedyBestFirst] {
            let outcome = search(&start, &goal, policy).unwrap();
            assert!(outcome.terminal.is_none(), "{policy:?}");
            assert_eq!(outcome.peak_states_in_memory, 12, "{policy:?}");
        }
    }

    #[test]
    fn astar_matches_bfs_length() {
        let goal = Puzzle::from_matrix(&[[1, 2, 3], [8, 0, 4], [7, 6, 5]]).unwrap();
        let start = Puzzle::from_matrix(&[[2, 8, 3], [1, 6, 4], [7, 0, 5]]).unwrap();

        let bfs = search(&start, &goal, Policy::BreadthFirst).unwrap();
        let astar = search(&start, &goal, Policy::AStar).unwrap();
        let greedy = search(&start, &goal, Policy::GreedyBestFirst).unwrap();

        assert_eq!(moves_of(&bfs).len(), 5);
        assert_eq!(moves_of(&astar).len(), 5);
        assert!(moves_of(&greedy).len() >= 5);
    }

    #[test]
    fn priority_queue_breaks_ties_by_insertion() {
        let mut queue = PriorityQueue::default();
        queue.push(3, StateId::new(0));
        queue.push(1, StateId::new(1));
        queue.push(3, StateId::new(2));
        queue.push(1, StateId::new(3));

        let order: Vec<usize> = std::iter::from_fn(|| queue.pop())
            .map(|id| id.index())
            .collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    /// `layout` as reached by undoing `detour`, so its path cost is `detour.len()`.
    fn reached_via(layout: &Puzzle, detour: &[Move]) -> Puzzle {
        let mut origin = layout.as_origin();
        origin.apply_moves(detour).unwrap();

        let mut arena = StateArena::new();
        let mut tip = arena.insert(origin);
        for step in detour.iter().rev() {
            let next = arena[tip]
                .neighbors(tip, None)
                .find(|child| child.last_move() == Some(step.opposite()))
                .unwrap();
            tip = arena.insert(next);
        }
        arena[tip].clone()
    }

    #[test]
    fn astar_replaces_costlier_queued_entry() {
        let (layout, _) = scenario();
        let costly = reached_via(&layout, &[Move::Down, Move::Left]);
        let cheap = reached_via(&layout, &[Move::Down]);
        assert_eq!(costly, layout);
        assert_eq!(cheap, layout);
        let key = layout.canonical_key();

        let mut arena = StateArena::new();
        let mut frontier = AStarFrontier::default();

        frontier.offer(&mut arena, costly.clone(), key.clone());
        assert_eq!(frontier.open_costs[&key], 2);

        frontier.offer(&mut arena, cheap, key.clone());
        assert_eq!(frontier.open_costs[&key], 1);
        assert_eq!(frontier.len(), 2);

        // no improvement, dropped
        frontier.offer(&mut arena, costly, key.clone());
        assert_eq!(frontier.len(), 2);
        assert_eq!(arena.len(), 2);

        let first = frontier.pop().unwrap();
        assert_eq!(arena[first].path_cost(), 1);
    }

    #[test]
    fn greedy_keeps_first_discovery() {
        let (layout, _) = scenario();
        let key = layout.canonical_key();
        let mut arena = StateArena::new();
        let mut frontier = GreedyFrontier::default();

        frontier.offer(&mut arena, reached_via(&layout, &[Move::Down, Move::Left]), key.clone());
        frontier.offer(&mut arena, reached_via(&layout, &[Move::Down]), key);
        assert_eq!(frontier.len(), 1);
        assert_eq!(arena[frontier.pop().unwrap()].path_cost(), 2);
    }
}
