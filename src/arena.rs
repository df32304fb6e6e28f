use std::ops::Index;

use crate::puzzle::Puzzle;

/// Slot of a state inside a [`StateArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    pub(crate) fn new(idx: usize) -> Self {
        Self(idx)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Owns every state generated by one search. Parents are stored as
/// [`StateId`]s, so dropping the arena releases the whole graph at once.
#[derive(Debug, Default)]
pub struct StateArena {
    states: Vec<Puzzle>,
}

impl StateArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: Puzzle) -> StateId {
        self.states.push(state);
        StateId(self.states.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Index<StateId> for StateArena {
    type Output = Puzzle;

    fn index(&self, id: StateId) -> &Puzzle {
        &self.states[id.0]
    }
}
