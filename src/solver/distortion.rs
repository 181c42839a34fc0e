//! Binomial detection distortion.
//!
//! Every molecule is detected independently with probability `q`, so an
//! observed count `y` given a true count `x` is `Binomial(x, q)`. The
//! operator applies the `(N+1)×(N+1)` transition matrix
//! `M[y, x] = C(x, y) q^y (1−q)^{x−y}` along every species axis. It is
//! linear, so sensitivities go through the same map.
use anyhow::{Context, ensure};
use ndarray::{Array2, ArrayD, Axis, Zip};
use statrs::distribution::{Binomial, Discrete};

use crate::solver::DistortionOperator;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinomialDistortion {
    detection_probability: f64,
}

impl BinomialDistortion {
    /// # Errors
    /// Fails unless `0 ≤ detection_probability ≤ 1`.
    pub fn new(detection_probability: f64) -> anyhow::Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&detection_probability),
            "detection probability must lie in [0, 1], got {detection_probability}"
        );
        Ok(Self { detection_probability })
    }

    pub fn detection_probability(&self) -> f64 {
        self.detection_probability
    }

    fn transition(&self, n: usize) -> anyhow::Result<Array2<f64>> {
        let mut m = Array2::zeros((n, n));
        for x in 0..n {
            let binom = Binomial::new(self.detection_probability, x as u64)
                .context("invalid binomial parameters")?;
            for y in 0..=x {
                m[[y, x]] = binom.pmf(y as u64);
            }
        }
        Ok(m)
    }

    fn apply(&self, tensor: &ArrayD<f64>) -> anyhow::Result<ArrayD<f64>> {
        let mut current = tensor.clone();
        for axis in 0..tensor.ndim() {
            let m = self.transition(current.len_of(Axis(axis)))?;
            let mut next = ArrayD::zeros(current.raw_dim());
            Zip::from(next.lanes_mut(Axis(axis)))
                .and(current.lanes(Axis(axis)))
                .for_each(|mut out, input| out.assign(&m.dot(&input)));
            current = next;
        }
        Ok(current)
    }
}

impl DistortionOperator for BinomialDistortion {
    fn observation_dist(&self, distribution: &ArrayD<f64>) -> anyhow::Result<ArrayD<f64>> {
        self.apply(distribution)
    }

    fn observation_dist_diff(
        &self, _distribution: &ArrayD<f64>, sensitivity: &ArrayD<f64>, _param_index: usize,
    ) -> anyhow::Result<ArrayD<f64>> {
        self.apply(sensitivity)
    }
}
