//! Integration tests for likelihood scoring and parameter fitting on the
//! birth–death reference model.
//!
//! Purpose
//! -------
//! - Validate the path from a measurement table or pre-binned counts,
//!   through the likelihood engine, to fitted parameters.
//! - Use realistic data: deterministic "expected count" samples of 1000
//!   cells per time point drawn from the exact Poisson distributions of the
//!   reference model.
//!
//! Coverage
//! --------
//! - `likelihood::core::data`: table loading with a detected time column.
//! - `likelihood::engine::LikelihoodEngine`:
//!   - The likelihood profile in the birth rate around the truth.
//!   - Analytic gradients against central finite differences.
//!   - Additivity over disjoint fit-time subsets.
//!   - Scoring through a binomial detection operator.
//!   - Gradients under renormalized truncation of the model tail.
//! - `estimation::session::FitSession` with the gradient, simplex and
//!   Metropolis–Hastings back-ends.
//!
//! Exclusions
//! ----------
//! - Low-level alignment, flooring and projection rules; those are covered
//!   by unit tests next to the code.
//! - Particle swarm fits: argmin draws velocity updates from an unseeded
//!   generator, so the swarm is only exercised on closed-form objectives in
//!   unit tests.
use std::{collections::BTreeMap, sync::Arc};

use approx::assert_relative_eq;
use cme_inference::{
    estimation::{BackendKind, Diagnostics, FitOption, FitOptions, FitSession},
    likelihood::{
        DataTable, DataTensor, LikelihoodEngine, LikelihoodError, LikelihoodOptions, SpeciesLink,
        TimeSlice, TruncationPolicy,
    },
    solver::{
        birth_death::{BirthDeathSolver, pmf_table},
        distortion::BinomialDistortion,
    },
};
use ndarray::{Array1, array};

const TRUE_BIRTH: f64 = 10.0;
const TRUE_DEATH: f64 = 0.2;
const N_CELLS: f64 = 1000.0;

/// Purpose
/// -------
/// Build a data tensor whose counts are `round(N_CELLS · p_t(x))` for the
/// birth–death model at `params`.
///
/// Parameters
/// ----------
/// - `params`: `[k, γ]`, strictly positive.
/// - `times`: measurement times, strictly increasing.
///
/// Returns
/// -------
/// - A one-axis [`DataTensor`] whose extent is one past the largest state
///   with a non-zero count.
fn expected_count_tensor(params: &Array1<f64>, times: &[f64]) -> DataTensor {
    let table = pmf_table(params, times, 200).expect("valid birth-death parameters");
    let mut extent = 0;
    let slices = table
        .rows()
        .into_iter()
        .zip(times.iter())
        .map(|(row, &t)| {
            let mut counts = BTreeMap::new();
            for (x, &p) in row.iter().enumerate() {
                let n = (N_CELLS * p).round() as u64;
                if n > 0 {
                    counts.insert(vec![x], n);
                    extent = extent.max(x + 1);
                }
            }
            TimeSlice::new(t, counts)
        })
        .collect();
    DataTensor::from_slices(vec![extent], slices).expect("valid slices")
}

fn engine() -> LikelihoodEngine<BirthDeathSolver> {
    let link = SpeciesLink::all_observed(&["x"]).expect("one observed species");
    LikelihoodEngine::new(BirthDeathSolver::new(), link)
}

fn truth() -> Array1<f64> {
    array![TRUE_BIRTH, TRUE_DEATH]
}

// ---- Likelihood ----

#[test]
// Purpose
// -------
// The log-likelihood peaks at the true birth rate and worsens as the birth
// rate is scaled away from it in either direction.
//
// Given
// -----
// - Data from k = 10, γ = 0.2 at t = 10.
// - Birth-rate guesses k·r for r ∈ {0.5, 0.8, 1.0, 1.2, 1.5}, γ fixed.
//
// Expect
// ------
// - ℓ strictly increases up to r = 1 and strictly decreases after it.
// - Every value is finite.
fn likelihood_worsens_as_birth_rate_moves_away_from_truth() {
    // Arrange
    let data = expected_count_tensor(&truth(), &[10.0]);
    let engine = engine();
    let ratios = [0.5, 0.8, 1.0, 1.2, 1.5];

    // Act
    let values: Vec<f64> = ratios
        .iter()
        .map(|r| {
            let params = array![TRUE_BIRTH * r, TRUE_DEATH];
            let eval = engine.evaluate(&params, &data, &[0], None, false).expect("valid");
            eval.log_likelihood
        })
        .collect();

    // Assert
    assert!(values.iter().all(|v| v.is_finite()));
    assert!(values[0] < values[1] && values[1] < values[2], "rising branch: {values:?}");
    assert!(values[2] > values[3] && values[3] > values[4], "falling branch: {values:?}");
}

#[test]
// Purpose
// -------
// Analytic gradients agree with central differences of ℓ for several
// birth–death parameterizations.
//
// Given
// -----
// - Data from the truth at t ∈ {2, 5, 10}.
// - θ ∈ {(10, 0.2), (8, 0.25), (12, 0.15)}, each scored on the state space
//   returned by its own gradient evaluation.
//
// Expect
// ------
// - ∂ℓ/∂θ_j matches (ℓ(θ + h e_j) − ℓ(θ − h e_j)) / 2h to 1e-4 relative.
fn gradient_matches_central_differences() {
    // Arrange
    let data = expected_count_tensor(&truth(), &[2.0, 5.0, 10.0]);
    let engine = engine();
    let fit = [0, 1, 2];

    for theta in [array![10.0, 0.2], array![8.0, 0.25], array![12.0, 0.15]] {
        // Act
        let eval = engine.evaluate(&theta, &data, &fit, None, true).expect("valid evaluation");
        let grad = eval.gradient.expect("gradient requested");
        let space = eval.state_space.expect("solver returns its projection");

        // Assert
        for j in 0..theta.len() {
            let h = 1e-6 * theta[j];
            let mut up = theta.clone();
            let mut down = theta.clone();
            up[j] += h;
            down[j] -= h;
            let l_up = engine.evaluate(&up, &data, &fit, Some(&space), false).expect("valid");
            let l_down = engine.evaluate(&down, &data, &fit, Some(&space), false).expect("valid");
            let fd = (l_up.log_likelihood - l_down.log_likelihood) / (2.0 * h);
            assert_relative_eq!(grad[j], fd, max_relative = 1e-4, epsilon = 1e-3);
        }
    }
}

#[test]
// Purpose
// -------
// ℓ over a set of fit times is the sum of ℓ over a partition of that set.
//
// Given
// -----
// - Data at t ∈ {2, 5, 10}, θ = (9, 0.22), one frozen state space.
//
// Expect
// ------
// - ℓ({0, 1, 2}) = ℓ({0}) + ℓ({1, 2}), for values and gradients.
fn likelihood_is_additive_over_fit_times() {
    // Arrange
    let data = expected_count_tensor(&truth(), &[2.0, 5.0, 10.0]);
    let engine = engine();
    let theta = array![9.0, 0.22];
    let all = engine.evaluate(&theta, &data, &[0, 1, 2], None, true).expect("valid");
    let space = all.state_space.clone().expect("projection returned");

    // Act
    let first = engine.evaluate(&theta, &data, &[0], Some(&space), true).expect("valid");
    let rest = engine.evaluate(&theta, &data, &[1, 2], Some(&space), true).expect("valid");

    // Assert
    assert_relative_eq!(
        all.log_likelihood,
        first.log_likelihood + rest.log_likelihood,
        max_relative = 1e-12
    );
    let summed = first.gradient.expect("gradient") + rest.gradient.expect("gradient");
    for (a, b) in all.gradient.expect("gradient").iter().zip(summed.iter()) {
        assert_relative_eq!(*a, *b, max_relative = 1e-10);
    }
}

#[test]
// Purpose
// -------
// Scoring through a detection operator matches the closed form of binomial
// thinning and keeps the gradient consistent with finite differences.
//
// Given
// -----
// - Data from the truth at t = 10; binomial detection q = 0.5.
// - Distorted model at θ = (20, 0.2): thinning Poisson(λ) by q gives
//   Poisson(qλ), the undistorted model at (10, 0.2).
//
// Expect
// ------
// - Distorted ℓ(20, 0.2) ≈ undistorted ℓ(10, 0.2).
// - ∂ℓ/∂k of the distorted model matches a central difference.
fn distorted_likelihood_matches_thinned_model() {
    // Arrange
    let data = expected_count_tensor(&truth(), &[10.0]);
    let pdo = BinomialDistortion::new(0.5).expect("valid detection probability");
    let distorted = engine().with_distortion(Arc::new(pdo));
    let theta = array![2.0 * TRUE_BIRTH, TRUE_DEATH];

    // Act
    let plain = engine().evaluate(&truth(), &data, &[0], None, false).expect("valid");
    let eval = distorted.evaluate(&theta, &data, &[0], None, true).expect("valid");
    let space = eval.state_space.clone().expect("projection returned");
    let h = 1e-6 * theta[0];
    let l_up = distorted
        .evaluate(&array![theta[0] + h, theta[1]], &data, &[0], Some(&space), false)
        .expect("valid");
    let l_down = distorted
        .evaluate(&array![theta[0] - h, theta[1]], &data, &[0], Some(&space), false)
        .expect("valid");

    // Assert
    assert_relative_eq!(eval.log_likelihood, plain.log_likelihood, max_relative = 1e-3);
    let fd = (l_up.log_likelihood - l_down.log_likelihood) / (2.0 * h);
    let grad = eval.gradient.expect("gradient requested");
    assert_relative_eq!(grad[0], fd, max_relative = 1e-4, epsilon = 1e-3);
}

#[test]
// Purpose
// -------
// With renormalized truncation, the gradient of ℓ still matches finite
// differences when the data window cuts off the model's upper tail.
//
// Given
// -----
// - Data from the truth at t = 2 (mean ≈ 16.5) with every state above 15
//   dropped, so the data extent is 16 while the model's projection reaches
//   well beyond it.
// - θ = (11, 0.18); `Renormalize` and `Discard` engines on one frozen space.
//
// Expect
// ------
// - ∂ℓ/∂θ_j of the renormalized model matches a central difference.
// - Renormalizing raises ℓ above the discarding engine's value.
fn renormalized_gradient_matches_central_differences_on_truncated_data() {
    // Arrange
    let full = expected_count_tensor(&truth(), &[2.0]);
    let kept: BTreeMap<Vec<usize>, u64> = full.slices()[0]
        .counts()
        .iter()
        .filter(|(state, _)| state[0] <= 15)
        .map(|(state, &n)| (state.clone(), n))
        .collect();
    let data = DataTensor::from_slices(vec![16], vec![TimeSlice::new(2.0, kept)])
        .expect("valid slices");
    let options = LikelihoodOptions::new(1e-10, TruncationPolicy::Renormalize, None)
        .expect("valid options");
    let renormalizing = engine().with_options(options);
    let theta = array![11.0, 0.18];

    // Act
    let eval = renormalizing.evaluate(&theta, &data, &[0], None, true).expect("valid");
    let space = eval.state_space.clone().expect("projection returned");
    let discarding =
        engine().evaluate(&theta, &data, &[0], Some(&space), false).expect("valid");

    // Assert
    assert!(space.len() > 16, "projection must extend past the data window");
    assert!(eval.log_likelihood > discarding.log_likelihood);
    let grad = eval.gradient.expect("gradient requested");
    for j in 0..theta.len() {
        let h = 1e-6 * theta[j];
        let mut up = theta.clone();
        let mut down = theta.clone();
        up[j] += h;
        down[j] -= h;
        let l_up = renormalizing.evaluate(&up, &data, &[0], Some(&space), false).expect("valid");
        let l_down =
            renormalizing.evaluate(&down, &data, &[0], Some(&space), false).expect("valid");
        let fd = (l_up.log_likelihood - l_down.log_likelihood) / (2.0 * h);
        assert_relative_eq!(grad[j], fd, max_relative = 1e-4, epsilon = 1e-3);
    }
}

// ---- Data loading ----

#[test]
// Purpose
// -------
// A measurement table with one time column loads into a binned tensor, and
// a table without a unique time column is rejected at load time.
//
// Given
// -----
// - Columns ("Time_index", "x") with five cells at two times, rows out of
//   time order.
// - Columns ("time", "timepoint", "x") and ("hour", "x").
//
// Expect
// ------
// - Two time bins [0, 3] with 2 and 3 cells; extent [5].
// - `AmbiguousTimeColumn` and `MissingTimeColumn` respectively.
fn table_loading_detects_time_column() {
    // Arrange
    let link = SpeciesLink::all_observed(&["x"]).expect("one observed species");
    let table = DataTable::new(
        vec!["Time_index".into(), "x".into()],
        vec![vec![3.0, 4.0], vec![0.0, 0.0], vec![3.0, 2.0], vec![0.0, 1.0], vec![3.0, 2.0]],
    )
    .expect("rectangular table");
    let ambiguous = DataTable::new(
        vec!["time".into(), "timepoint".into(), "x".into()],
        vec![vec![0.0, 0.0, 1.0]],
    )
    .expect("rectangular table");
    let missing =
        DataTable::new(vec!["hour".into(), "x".into()], vec![vec![0.0, 1.0]]).expect("rectangular");

    // Act
    let tensor = DataTensor::from_table(&table, &link).expect("valid table");

    // Assert
    assert_eq!(tensor.times(), vec![0.0, 3.0]);
    assert_eq!(tensor.extent(), &[5]);
    assert_eq!(tensor.slices()[0].n_cells(), 2);
    assert_eq!(tensor.slices()[1].n_cells(), 3);
    assert_eq!(tensor.slices()[1].counts().get(&vec![2]), Some(&2));
    assert!(matches!(
        DataTensor::from_table(&ambiguous, &link),
        Err(LikelihoodError::AmbiguousTimeColumn { .. })
    ));
    assert!(matches!(
        DataTensor::from_table(&missing, &link),
        Err(LikelihoodError::MissingTimeColumn { .. })
    ));
}

// ---- Fitting ----

fn session_data() -> DataTensor {
    expected_count_tensor(&truth(), &[2.0, 5.0, 10.0])
}

#[test]
// Purpose
// -------
// Gradient and simplex fits recover the generating parameters.
//
// Given
// -----
// - Data from the truth at t ∈ {2, 5, 10}.
// - Initial guess (12, 0.25); gradient tolerance 1e-3, other options at
//   their defaults.
//
// Expect
// ------
// - Both estimates within 2% of (10, 0.2).
// - Both improve on ℓ at the guess; diagnostics match the back-end.
fn gradient_and_simplex_fits_recover_truth() {
    // Arrange
    let data = session_data();
    let options = FitOptions::default()
        .with_overrides([FitOption::TolGrad(Some(1e-3))])
        .expect("valid overrides");
    let session =
        FitSession::new(engine(), &data, array![12.0, 0.25], options).expect("valid session");

    for kind in [BackendKind::Gradient, BackendKind::Simplex] {
        // Act
        let out = session.fit(kind).expect("fit succeeds");

        // Assert
        assert_relative_eq!(out.point[0], TRUE_BIRTH, max_relative = 0.02);
        assert_relative_eq!(out.point[1], TRUE_DEATH, max_relative = 0.02);
        assert!(out.value > session.initial_log_likelihood());
        match (kind, &out.diagnostics) {
            (BackendKind::Gradient, Diagnostics::Gradient(report))
            | (BackendKind::Simplex, Diagnostics::Simplex(report)) => {
                assert!(report.iterations > 0);
            }
            other => panic!("unexpected diagnostics: {other:?}"),
        }
    }
}

#[test]
// Purpose
// -------
// Metropolis–Hastings fits are reproducible and never report a point worse
// than the starting guess.
//
// Given
// -----
// - Data from the truth, fit on time indices {0, 1} (t = 2, 5).
// - Two chains of 200 samples after 50 burn-in steps, proposal sd 0.02,
//   seed 7.
//
// Expect
// ------
// - Two identical outcomes from two runs.
// - Two chain histories of shape (200, 2); value ≥ ℓ at the guess.
fn metropolis_fit_is_reproducible() {
    // Arrange
    let data = session_data();
    let options = FitOptions::default()
        .with_overrides([
            FitOption::FitTimes(vec![0, 1]),
            FitOption::Chains(2),
            FitOption::Samples(200),
            FitOption::BurnIn(50),
            FitOption::ProposalSd(0.02),
            FitOption::Seed(7),
        ])
        .expect("valid overrides");
    let session =
        FitSession::new(engine(), &data, array![12.0, 0.25], options).expect("valid session");

    // Act
    let first = session.fit(BackendKind::MetropolisHastings).expect("sampling succeeds");
    let second = session.fit(BackendKind::MetropolisHastings).expect("sampling succeeds");

    // Assert
    assert_eq!(first, second);
    assert!(first.value >= session.initial_log_likelihood() - 1e-9);
    let Diagnostics::MetropolisHastings(report) = &first.diagnostics else {
        panic!("unexpected diagnostics: {:?}", first.diagnostics);
    };
    assert_eq!(report.chains.len(), 2);
    assert!(report.failures.is_empty());
    for chain in &report.chains {
        assert_eq!(chain.samples.dim(), (200, 2));
    }
}

#[test]
// Purpose
// -------
// A session rejects an unusable setup before any back-end runs.
//
// Given
// -----
// - A fit-time index past the data, a guess of the wrong length, and a
//   likelihood engine with a custom floor.
//
// Expect
// ------
// - Construction fails for the first two and succeeds for the third.
fn session_validates_setup() {
    // Arrange
    let data = session_data();
    let bad_times = FitOptions::default()
        .with_overrides([FitOption::FitTimes(vec![3])])
        .expect("fit times are checked against data later");
    let floor = LikelihoodOptions::new(1e-12, Default::default(), Some(1e-6)).expect("valid");

    // Act
    let r_times = FitSession::new(engine(), &data, array![12.0, 0.25], bad_times);
    let r_guess = FitSession::new(engine(), &data, array![12.0], FitOptions::default());
    let r_ok = FitSession::new(
        engine().with_options(floor),
        &data,
        array![12.0, 0.25],
        FitOptions::default(),
    );

    // Assert
    assert!(r_times.is_err());
    assert!(r_guess.is_err());
    assert!(r_ok.is_ok());
}
