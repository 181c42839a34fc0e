//! Back-end implementations behind [`Backend`](crate::estimation::session::Backend).
//!
//! - [`lbfgs`]: L-BFGS (gradient back-end), builders and runner.
//! - [`simplex`]: Nelder–Mead.
//! - [`swarm`]: particle swarm on a log-space box.
//! - [`metropolis`]: parallel Metropolis–Hastings chains.

pub mod lbfgs;
pub mod metropolis;
pub mod simplex;
pub mod swarm;

pub use self::lbfgs::{
    build_optimizer_hager_zhang, build_optimizer_more_thuente, configure_lbfgs, maximize_lbfgs,
    run_lbfgs,
};
pub use self::metropolis::{run_chain, sample_chains};
pub use self::simplex::{initial_simplex, maximize_simplex};
pub use self::swarm::{maximize_swarm, swarm_bounds};
