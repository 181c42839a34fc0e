//! Fit options and per-back-end configurations.
//!
//! [`FitOptions`] is the single user-facing option set, with documented
//! defaults. Individual settings are changed through enumerated
//! [`FitOption`] values merged by [`FitOptions::with_overrides`]; each
//! back-end then derives its own validated configuration from the merged
//! set ([`LbfgsOptions`], [`SimplexConfig`], [`SwarmConfig`],
//! [`MetropolisConfig`]).
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::estimation::{
    errors::{EstimResult, EstimationError},
    types::DEFAULT_LBFGS_MEM,
    validation::{verify_nonzero, verify_positive, verify_tol_cost, verify_tol_grad},
};

/// Line search used inside L-BFGS. Parses case-insensitively from
/// `"MoreThuente"` or `"HagerZhang"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineSearcher {
    #[default]
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = EstimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(EstimationError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Stopping rules for argmin runs. At least one must be set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// # Errors
    /// - [`EstimationError::NoTolerancesProvided`] if all three are `None`.
    /// - [`EstimationError::InvalidTolGrad`] / [`EstimationError::InvalidTolCost`]
    ///   for non-finite or non-positive tolerances.
    /// - [`EstimationError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> EstimResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(EstimationError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if max_iter == Some(0) {
            return Err(EstimationError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Configuration of the gradient (L-BFGS) back-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbfgsOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl LbfgsOptions {
    /// # Errors
    /// [`EstimationError::InvalidLBFGSMem`] for a zero memory size.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, verbose: bool, lbfgs_mem: Option<usize>,
    ) -> EstimResult<Self> {
        if lbfgs_mem == Some(0) {
            return Err(EstimationError::InvalidLBFGSMem {
                mem: 0,
                reason: "L-BFGS memory must be greater than zero.",
            });
        }
        Ok(Self { tols, line_searcher, verbose, lbfgs_mem })
    }

    pub fn memory(&self) -> usize {
        self.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM)
    }

    /// # Errors
    /// As [`Tolerances::new`] and [`LbfgsOptions::new`].
    pub fn from_fit(opts: &FitOptions) -> EstimResult<Self> {
        let tols = Tolerances::new(opts.tol_grad, opts.tol_cost, Some(opts.max_iter))?;
        Self::new(tols, opts.line_searcher, opts.verbose, opts.lbfgs_mem)
    }
}

/// Configuration of the Nelder–Mead back-end.
///
/// The initial simplex is the starting point plus one vertex per axis,
/// offset by `initial_step` in log-space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplexConfig {
    pub max_iter: usize,
    pub sd_tolerance: f64,
    pub initial_step: f64,
    pub verbose: bool,
}

impl SimplexConfig {
    /// # Errors
    /// [`EstimationError::InvalidSetting`], [`EstimationError::InvalidMaxIter`].
    pub fn new(
        max_iter: usize, sd_tolerance: f64, initial_step: f64, verbose: bool,
    ) -> EstimResult<Self> {
        check_max_iter(max_iter)?;
        verify_positive("sd_tolerance", sd_tolerance)?;
        verify_positive("simplex_step", initial_step)?;
        Ok(Self { max_iter, sd_tolerance, initial_step, verbose })
    }

    /// # Errors
    /// As [`SimplexConfig::new`].
    pub fn from_fit(opts: &FitOptions) -> EstimResult<Self> {
        Self::new(opts.max_iter, opts.sd_tolerance, opts.simplex_step, opts.verbose)
    }
}

/// Configuration of the particle-swarm back-end.
///
/// The search box is `φ₀ ± decades · ln 10` per parameter. `seed` drives
/// the perturbations of `φ₀` that form the starting population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    pub n_particles: usize,
    pub max_iter: usize,
    pub decades: f64,
    pub seed: u64,
    pub verbose: bool,
}

impl SwarmConfig {
    /// # Errors
    /// [`EstimationError::InvalidSetting`], [`EstimationError::InvalidMaxIter`].
    pub fn new(
        n_particles: usize, max_iter: usize, decades: f64, seed: u64, verbose: bool,
    ) -> EstimResult<Self> {
        verify_nonzero("n_particles", n_particles)?;
        check_max_iter(max_iter)?;
        verify_positive("swarm_decades", decades)?;
        Ok(Self { n_particles, max_iter, decades, seed, verbose })
    }

    /// # Errors
    /// As [`SwarmConfig::new`].
    pub fn from_fit(opts: &FitOptions) -> EstimResult<Self> {
        Self::new(opts.n_particles, opts.max_iter, opts.swarm_decades, opts.seed, opts.verbose)
    }
}

/// Configuration of the multi-chain Metropolis–Hastings back-end.
///
/// Chain `c` draws from a stream seeded with `seed + c`. The first `burn_in`
/// iterations of every chain are not recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetropolisConfig {
    pub n_chains: usize,
    pub n_samples: usize,
    pub burn_in: usize,
    pub proposal_sd: f64,
    pub seed: u64,
}

impl MetropolisConfig {
    /// # Errors
    /// [`EstimationError::InvalidSetting`].
    pub fn new(
        n_chains: usize, n_samples: usize, burn_in: usize, proposal_sd: f64, seed: u64,
    ) -> EstimResult<Self> {
        verify_nonzero("n_chains", n_chains)?;
        verify_nonzero("n_samples", n_samples)?;
        verify_positive("proposal_sd", proposal_sd)?;
        Ok(Self { n_chains, n_samples, burn_in, proposal_sd, seed })
    }

    /// # Errors
    /// As [`MetropolisConfig::new`].
    pub fn from_fit(opts: &FitOptions) -> EstimResult<Self> {
        Self::new(opts.n_chains, opts.n_samples, opts.burn_in, opts.proposal_sd, opts.seed)
    }
}

/// User-facing fit options.
///
/// | Field | Default | Used by |
/// |---|---|---|
/// | `fit_times` | `None` (all time bins) | all |
/// | `max_iter` | 500 | simplex, gradient, swarm |
/// | `tol_grad` | `Some(1e-6)` | gradient |
/// | `tol_cost` | `None` | gradient |
/// | `line_searcher` | `MoreThuente` | gradient |
/// | `lbfgs_mem` | `None` (7) | gradient |
/// | `sd_tolerance` | 1e-6 | simplex |
/// | `simplex_step` | 0.1 | simplex |
/// | `n_particles` | 40 | swarm |
/// | `swarm_decades` | 5.0 | swarm |
/// | `n_chains` | 4 | Metropolis–Hastings |
/// | `n_samples` | 1000 | Metropolis–Hastings |
/// | `burn_in` | 100 | Metropolis–Hastings |
/// | `proposal_sd` | 0.1 | Metropolis–Hastings |
/// | `seed` | 0 | swarm, Metropolis–Hastings |
/// | `verbose` | `false` | argmin back-ends |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub fit_times: Option<Vec<usize>>,
    pub max_iter: usize,
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub line_searcher: LineSearcher,
    pub lbfgs_mem: Option<usize>,
    pub sd_tolerance: f64,
    pub simplex_step: f64,
    pub n_particles: usize,
    pub swarm_decades: f64,
    pub n_chains: usize,
    pub n_samples: usize,
    pub burn_in: usize,
    pub proposal_sd: f64,
    pub seed: u64,
    pub verbose: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            fit_times: None,
            max_iter: 500,
            tol_grad: Some(1e-6),
            tol_cost: None,
            line_searcher: LineSearcher::MoreThuente,
            lbfgs_mem: None,
            sd_tolerance: 1e-6,
            simplex_step: 0.1,
            n_particles: 40,
            swarm_decades: 5.0,
            n_chains: 4,
            n_samples: 1000,
            burn_in: 100,
            proposal_sd: 0.1,
            seed: 0,
            verbose: false,
        }
    }
}

/// One named override of a [`FitOptions`] field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitOption {
    FitTimes(Vec<usize>),
    MaxIter(usize),
    TolGrad(Option<f64>),
    TolCost(Option<f64>),
    LineSearch(LineSearcher),
    LbfgsMem(Option<usize>),
    SdTolerance(f64),
    SimplexStep(f64),
    Particles(usize),
    SwarmDecades(f64),
    Chains(usize),
    Samples(usize),
    BurnIn(usize),
    ProposalSd(f64),
    Seed(u64),
    Verbose(bool),
}

impl FitOption {
    /// Parse `name = value` using the [`FitOptions`] field names.
    ///
    /// `fit_times` takes a comma-separated index list; `tol_grad`,
    /// `tol_cost` and `lbfgs_mem` accept `none`.
    ///
    /// # Errors
    /// [`EstimationError::InvalidOption`] for an unknown name or an
    /// unparsable value; [`EstimationError::InvalidLineSearch`] for an
    /// unknown line searcher.
    pub fn parse(name: &str, value: &str) -> EstimResult<Self> {
        let key = name.trim().to_ascii_lowercase();
        let raw = value.trim();
        let bad = |reason: &'static str| EstimationError::InvalidOption {
            name: name.to_string(),
            value: value.to_string(),
            reason,
        };
        let option = match key.as_str() {
            "fit_times" => FitOption::FitTimes(
                raw.split(',')
                    .map(|tok| tok.trim().parse::<usize>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| bad("Expected a comma-separated list of indices."))?,
            ),
            "max_iter" => FitOption::MaxIter(parse_num(raw).ok_or_else(|| bad(EXPECT_INT))?),
            "tol_grad" => FitOption::TolGrad(parse_opt(raw).ok_or_else(|| bad(EXPECT_OPT_NUM))?),
            "tol_cost" => FitOption::TolCost(parse_opt(raw).ok_or_else(|| bad(EXPECT_OPT_NUM))?),
            "line_searcher" => FitOption::LineSearch(raw.parse()?),
            "lbfgs_mem" => FitOption::LbfgsMem(parse_opt(raw).ok_or_else(|| bad(EXPECT_OPT_INT))?),
            "sd_tolerance" => {
                FitOption::SdTolerance(parse_num(raw).ok_or_else(|| bad(EXPECT_NUM))?)
            }
            "simplex_step" => {
                FitOption::SimplexStep(parse_num(raw).ok_or_else(|| bad(EXPECT_NUM))?)
            }
            "n_particles" => FitOption::Particles(parse_num(raw).ok_or_else(|| bad(EXPECT_INT))?),
            "swarm_decades" => {
                FitOption::SwarmDecades(parse_num(raw).ok_or_else(|| bad(EXPECT_NUM))?)
            }
            "n_chains" => FitOption::Chains(parse_num(raw).ok_or_else(|| bad(EXPECT_INT))?),
            "n_samples" => FitOption::Samples(parse_num(raw).ok_or_else(|| bad(EXPECT_INT))?),
            "burn_in" => FitOption::BurnIn(parse_num(raw).ok_or_else(|| bad(EXPECT_INT))?),
            "proposal_sd" => FitOption::ProposalSd(parse_num(raw).ok_or_else(|| bad(EXPECT_NUM))?),
            "seed" => FitOption::Seed(parse_num(raw).ok_or_else(|| bad(EXPECT_INT))?),
            "verbose" => FitOption::Verbose(parse_num(raw).ok_or_else(|| bad(EXPECT_BOOL))?),
            _ => return Err(bad("Unknown option name.")),
        };
        Ok(option)
    }
}

impl FitOptions {
    /// Merge `overrides` into these options, in order; later overrides of
    /// the same field win. The merged set is validated.
    ///
    /// # Errors
    /// As [`FitOptions::validate`].
    pub fn with_overrides(
        mut self, overrides: impl IntoIterator<Item = FitOption>,
    ) -> EstimResult<Self> {
        for option in overrides {
            self.apply(option);
        }
        self.validate()?;
        Ok(self)
    }

    /// Check every back-end configuration derived from these options.
    ///
    /// # Errors
    /// The first configuration error found.
    pub fn validate(&self) -> EstimResult<()> {
        LbfgsOptions::from_fit(self)?;
        SimplexConfig::from_fit(self)?;
        SwarmConfig::from_fit(self)?;
        MetropolisConfig::from_fit(self)?;
        Ok(())
    }

    fn apply(&mut self, option: FitOption) {
        match option {
            FitOption::FitTimes(v) => self.fit_times = Some(v),
            FitOption::MaxIter(v) => self.max_iter = v,
            FitOption::TolGrad(v) => self.tol_grad = v,
            FitOption::TolCost(v) => self.tol_cost = v,
            FitOption::LineSearch(v) => self.line_searcher = v,
            FitOption::LbfgsMem(v) => self.lbfgs_mem = v,
            FitOption::SdTolerance(v) => self.sd_tolerance = v,
            FitOption::SimplexStep(v) => self.simplex_step = v,
            FitOption::Particles(v) => self.n_particles = v,
            FitOption::SwarmDecades(v) => self.swarm_decades = v,
            FitOption::Chains(v) => self.n_chains = v,
            FitOption::Samples(v) => self.n_samples = v,
            FitOption::BurnIn(v) => self.burn_in = v,
            FitOption::ProposalSd(v) => self.proposal_sd = v,
            FitOption::Seed(v) => self.seed = v,
            FitOption::Verbose(v) => self.verbose = v,
        }
    }
}

// ---- Helper methods ----

const EXPECT_INT: &str = "Expected an integer.";
const EXPECT_NUM: &str = "Expected a number.";
const EXPECT_OPT_INT: &str = "Expected an integer or 'none'.";
const EXPECT_OPT_NUM: &str = "Expected a number or 'none'.";
const EXPECT_BOOL: &str = "Expected true or false.";

fn check_max_iter(max_iter: usize) -> EstimResult<()> {
    if max_iter == 0 {
        return Err(EstimationError::InvalidMaxIter {
            max_iter,
            reason: "Maximum iterations must be greater than zero.",
        });
    }
    Ok(())
}

fn parse_num<T: FromStr>(raw: &str) -> Option<T> {
    raw.parse().ok()
}

fn parse_opt<T: FromStr>(raw: &str) -> Option<Option<T>> {
    if raw.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    raw.parse().ok().map(Some)
}
