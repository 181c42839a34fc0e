//! design — allocating a measurement budget across time points.
//!
//! Purpose
//! -------
//! Given a library of per-time single-cell FIMs and a total number of cells,
//! choose how many cells to measure at each time point so that a scalar
//! information criterion of the total FIM is locally optimal.
//!
//! Key behaviors
//! -------------
//! - [`Criterion`] casts D-, E-, A- and subspace-optimality as values to
//!   minimize; E (smallest eigenvalue) is the default.
//! - [`optimize_design`] runs the greedy single-unit exchange search as an
//!   explicit [`SweepState`] machine from a seed [`Allocation`] (default:
//!   whole budget on time point 0).
//! - [`check_local_optimality`] verifies a returned allocation.
//!
//! Invariants & assumptions
//! ------------------------
//! - Allocations always spend exactly the budget.
//! - The optimizer owns its allocation exclusively; there is no shared
//!   mutable state.
//! - Results are local optima under single-unit exchanges, not global ones.
//!
//! Downstream usage
//! ----------------
//! - Python callers reach this module through the `ExperimentDesign` class
//!   when the `python-bindings` feature is enabled.
//!
//! Testing notes
//! -------------
//! - Unit tests cover tie-breaking, balancing under E-optimality, seed
//!   validation and local-optimality reporting; `tests/` replays the
//!   three-time-point trace scenario end to end.

pub mod allocation;
pub mod criterion;
pub mod errors;
pub mod greedy;

pub use self::allocation::Allocation;
pub use self::criterion::Criterion;
pub use self::errors::{DesignError, DesignResult};
pub use self::greedy::{
    DesignOptions, DesignOutcome, ImprovingMove, SweepState, check_local_optimality,
    optimize_design,
};

pub mod prelude {
    pub use super::{
        Allocation, Criterion, DesignError, DesignOptions, DesignOutcome, DesignResult,
        check_local_optimality, optimize_design,
    };
}
