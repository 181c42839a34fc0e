//! Cell-count allocations across candidate time points.
use serde::{Deserialize, Serialize};

use crate::design::errors::{DesignError, DesignResult};

/// Non-negative number of cells to measure at each time point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    counts: Vec<u64>,
}

impl Allocation {
    pub fn new(counts: Vec<u64>) -> Self {
        Self { counts }
    }

    /// Whole budget on time point `index`.
    pub fn concentrated(n_times: usize, budget: u64, index: usize) -> Self {
        let mut counts = vec![0; n_times];
        if let Some(slot) = counts.get_mut(index) {
            *slot = budget;
        }
        Self { counts }
    }

    /// Budget spread as evenly as possible; the remainder goes to the
    /// earliest time points.
    pub fn uniform(n_times: usize, budget: u64) -> Self {
        if n_times == 0 {
            return Self { counts: Vec::new() };
        }
        let base = budget / n_times as u64;
        let extra = (budget % n_times as u64) as usize;
        let counts = (0..n_times).map(|i| base + u64::from(i < extra)).collect();
        Self { counts }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn into_counts(self) -> Vec<u64> {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of cells.
    pub fn budget(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Check that this allocation fits `n_times` points and spends `budget`.
    ///
    /// # Errors
    /// [`DesignError::SeedLengthMismatch`], [`DesignError::SeedBudgetMismatch`].
    pub fn check(&self, n_times: usize, budget: u64) -> DesignResult<()> {
        if self.len() != n_times {
            return Err(DesignError::SeedLengthMismatch { expected: n_times, found: self.len() });
        }
        if self.budget() != budget {
            return Err(DesignError::SeedBudgetMismatch { expected: budget, found: self.budget() });
        }
        Ok(())
    }

    /// Move one cell from `from` to `to`. Caller guarantees `counts[from] > 0`.
    pub(crate) fn move_unit(&mut self, from: usize, to: usize) {
        self.counts[from] -= 1;
        self.counts[to] += 1;
    }
}
