//! Arena-backed state storage.

use crate::state::{State, StateId};

pub struct Arena {
    states: Vec<State>,
}

impl Arena {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn push(&mut self, s: State) -> StateId {
        let id = self.states.len() as u32;
        self.states.push(s);
        id
    }

    pub fn get(&self, id: StateId) -> &State {
        &self.states[id as usize]
    }

    pub fn get_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[id as usize]
    }

    /// Allocate the full child list of `father`, one state per action in
    /// order, each extending the father's path key by its action byte.
    /// Returns the new ids; the father's `children` is set to them.
    pub fn alloc_children(&mut self, father: StateId, priors: &[f64]) -> Vec<StateId> {
        let base = self.get(father).position.clone();
        let mut children = Vec::with_capacity(priors.len());
        for (action, &p) in priors.iter().enumerate() {
            let mut position = base.clone();
            position.push(action as u8);
            children.push(self.push(State::new(Some(father), action, p, position)));
        }
        self.get_mut(father).children = children.clone();
        children
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PathKey;

    #[test]
    fn alloc_children_wires_fathers_and_path_keys() {
        let mut arena = Arena::new();
        let root = arena.push(State::new(None, 0, 0.0, PathKey::new()));

        let kids = arena.alloc_children(root, &[0.1, 0.2, 0.3]);
        assert_eq!(kids.len(), 3);
        assert_eq!(arena.get(root).children, kids);
        assert_eq!(arena.len(), 4);

        for (action, &id) in kids.iter().enumerate() {
            let st = arena.get(id);
            assert_eq!(st.father, Some(root));
            assert_eq!(st.action, action);
            assert_eq!(st.position, vec![action as u8]);
        }

        // Grandchildren extend the child's key, not the root's.
        let grand = arena.alloc_children(kids[1], &[0.5]);
        assert_eq!(arena.get(grand[0]).position, vec![1u8, 0u8]);
    }
}
