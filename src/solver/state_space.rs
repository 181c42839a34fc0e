//! Enumerated FSP state spaces shared read-only across evaluations.
//!
//! Purpose
//! -------
//! Represent the projection produced by an FSP solve: the list of enumerated
//! states (one count per species) and the index map from state to position
//! in the probability vector. A [`StateSpace`] is built once per fitting
//! session, wrapped in an `Arc`, and handed to every subsequent solve so the
//! projection bound stays frozen while parameters move.
//!
//! Key behaviors
//! -------------
//! - Build from an explicit state list ([`StateSpace::new`]) or from a
//!   hyper-rectangular bound ([`StateSpace::from_bounds`]).
//! - Report consistency ([`StateSpace::is_consistent`]): the state list and
//!   the index map must have the same number of entries and every state must
//!   have one count per species.
//! - Report per-species extents (`max + 1`) used to size dense tensors.
//!
//! Invariants & assumptions
//! ------------------------
//! - A state space is never repaired in place. Callers that detect a stale
//!   handle drop it and let the solver produce a fresh one.
//! - Species order is the model's species order; it must match the
//!   [`SpeciesLink`](crate::likelihood::core::species_link::SpeciesLink)
//!   used to marginalize distributions defined on this space.
use std::collections::HashMap;

use crate::likelihood::errors::{LikResult, LikelihoodError};

/// Enumerated state space of an FSP projection.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSpace {
    n_species: usize,
    states: Vec<Vec<usize>>,
    index: HashMap<Vec<usize>, usize>,
}

impl StateSpace {
    /// Build a state space from an explicit list of states.
    ///
    /// # Errors
    /// - [`LikelihoodError::EmptyStateSpace`] if `states` is empty.
    /// - [`LikelihoodError::StateDimMismatch`] if any state does not have
    ///   `n_species` entries.
    pub fn new(n_species: usize, states: Vec<Vec<usize>>) -> LikResult<Self> {
        if states.is_empty() {
            return Err(LikelihoodError::EmptyStateSpace);
        }
        for (index, state) in states.iter().enumerate() {
            if state.len() != n_species {
                return Err(LikelihoodError::StateDimMismatch {
                    index,
                    expected: n_species,
                    found: state.len(),
                });
            }
        }
        let index = states.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect();
        Ok(Self { n_species, states, index })
    }

    /// Enumerate every state with `0 <= x_s <= bounds[s]`, in row-major order.
    pub fn from_bounds(bounds: &[usize]) -> LikResult<Self> {
        let mut states: Vec<Vec<usize>> = vec![Vec::new()];
        for &bound in bounds {
            let mut next = Vec::with_capacity(states.len() * (bound + 1));
            for prefix in &states {
                for x in 0..=bound {
                    let mut state = prefix.clone();
                    state.push(x);
                    next.push(state);
                }
            }
            states = next;
        }
        Self::new(bounds.len(), states)
    }

    /// Assemble a state space from raw parts without validation.
    ///
    /// Used by solvers that deserialize or stream their projection; the
    /// result may be inconsistent and should be checked with
    /// [`StateSpace::is_consistent`] before reuse.
    pub fn from_parts(
        n_species: usize, states: Vec<Vec<usize>>, index: HashMap<Vec<usize>, usize>,
    ) -> Self {
        Self { n_species, states, index }
    }

    pub fn n_species(&self) -> usize {
        self.n_species
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[Vec<usize>] {
        &self.states
    }

    /// Position of `state` in the probability vector, if enumerated.
    pub fn position(&self, state: &[usize]) -> Option<usize> {
        self.index.get(state).copied()
    }

    /// `true` when the state list and index map agree in size and shape.
    pub fn is_consistent(&self) -> bool {
        self.states.len() == self.index.len()
            && self.states.iter().all(|s| s.len() == self.n_species)
    }

    /// Per-species extent `max(x_s) + 1` over all enumerated states.
    pub fn extents(&self) -> Vec<usize> {
        let mut ext = vec![0usize; self.n_species];
        for state in &self.states {
            for (e, &x) in ext.iter_mut().zip(state.iter()) {
                *e = (*e).max(x + 1);
            }
        }
        ext
    }
}
