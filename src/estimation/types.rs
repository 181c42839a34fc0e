//! Canonical numeric types and argmin solver aliases for estimation.
//!
//! All back-ends work on log-parameters `φ = ln θ` stored as [`Theta`]. The
//! cost seen by argmin is the negative log-likelihood.
use argmin::{
    core::IterState,
    solver::{
        linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
        neldermead::NelderMead,
        particleswarm::Particle,
        quasinewton::LBFGS,
    },
};
use ndarray::Array1;
use std::collections::HashMap;

/// Parameter vector, in log-space inside the back-ends.
pub type Theta = Array1<f64>;

/// Gradient vector, same shape as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar cost `c(φ) = -ℓ(exp φ)`.
pub type Cost = f64;

/// Function-evaluation counters as reported by argmin (e.g. `"cost_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;

/// Iteration state shared by the L-BFGS runs.
pub type GradientState = IterState<Theta, Grad, (), (), (), Cost>;

pub type Simplex = NelderMead<Theta, Cost>;

/// Iteration state of the Nelder–Mead runs.
pub type SimplexState = IterState<Theta, (), (), (), (), Cost>;

/// Best particle reported by the swarm runs.
pub type SwarmParticle = Particle<Theta, Cost>;
