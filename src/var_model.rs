//! VAR(p) estimation, stability certification, and iterated forecasting.
//!
//! The model is fit equation by equation with least squares on the lagged
//! design matrix. Stability is certified through the companion matrix: all
//! eigenvalues strictly inside the unit circle. An unstable model is still
//! returned — stability is advisory information for the caller.

use nalgebra::DMatrix;
use nalgebra::Normed;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{VarAnalysisError, VarResult};
use crate::linear_algebra::qr_least_squares;
use crate::series::MultivariateSeries;

/// A fitted VAR(p) model. Immutable once created.
///
/// Coefficient matrix `A_l` (from `coef_matrix(l)`) maps the values `l`
/// steps back onto the current step: row = responding equation, column =
/// source variable. The variable ordering fixes the row/column semantics of
/// every derived matrix (residual covariance, IRF, FEVD).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FittedVarModel {
    p: usize,
    variable_names: Vec<String>,
    intercept: Vec<f64>,
    coef_matrices: Vec<Vec<Vec<f64>>>,
    residuals: Vec<Vec<f64>>,
    sigma_u: Vec<Vec<f64>>,
    stable: bool,
}

impl FittedVarModel {
    /// Fit a VAR(p) on a stationary, standardized multivariate series.
    ///
    /// # Errors
    /// - `InvalidParameter` when `p` is 0 or not below the number of
    ///   observations.
    /// - `InsufficientData` when too few rows remain for the lagged design.
    pub fn fit(series: &MultivariateSeries, p: usize) -> VarResult<FittedVarModel> {
        let t_obs = series.len();
        let k = series.num_vars();
        if p == 0 {
            return Err(VarAnalysisError::InvalidParameter {
                parameter: "p".to_string(),
                value: 0.0,
                constraint: "lag order must be positive".to_string(),
            });
        }
        if p >= t_obs {
            return Err(VarAnalysisError::InvalidParameter {
                parameter: "p".to_string(),
                value: p as f64,
                constraint: format!("lag order must be below the {} observations", t_obs),
            });
        }
        let n_eff = t_obs - p;
        let n_params = k * p + 1;
        if n_eff <= n_params {
            return Err(VarAnalysisError::InsufficientData {
                required: p + n_params + 1,
                actual: t_obs,
            });
        }

        let rows = series.to_rows();

        // Shared lagged design: [1, y_{t-1}, ..., y_{t-p}].
        let mut design = Vec::with_capacity(n_eff);
        for t in p..t_obs {
            let mut row = Vec::with_capacity(n_params);
            row.push(1.0);
            for l in 1..=p {
                row.extend_from_slice(&rows[t - l]);
            }
            design.push(row);
        }

        let mut intercept = Vec::with_capacity(k);
        let mut flat_coefs: Vec<Vec<f64>> = Vec::with_capacity(k);
        for eq in 0..k {
            let y: Vec<f64> = (p..t_obs).map(|t| rows[t][eq]).collect();
            let coeffs = qr_least_squares(&design, &y)?;
            intercept.push(coeffs[0]);
            flat_coefs.push(coeffs[1..].to_vec());
        }

        // Reshape into per-lag k×k matrices.
        let coef_matrices: Vec<Vec<Vec<f64>>> = (0..p)
            .map(|l| {
                (0..k)
                    .map(|i| flat_coefs[i][l * k..(l + 1) * k].to_vec())
                    .collect()
            })
            .collect();

        // Residuals and df-adjusted covariance.
        let mut residuals = Vec::with_capacity(n_eff);
        for (offset, t) in (p..t_obs).enumerate() {
            let row: Vec<f64> = (0..k)
                .map(|i| {
                    let fitted: f64 = design[offset]
                        .iter()
                        .zip(std::iter::once(&intercept[i]).chain(flat_coefs[i].iter()))
                        .map(|(x, b)| x * b)
                        .sum();
                    rows[t][i] - fitted
                })
                .collect();
            residuals.push(row);
        }
        let df = (n_eff - n_params).max(1) as f64;
        let mut sigma_u = vec![vec![0.0; k]; k];
        for row in &residuals {
            for i in 0..k {
                for j in 0..k {
                    sigma_u[i][j] += row[i] * row[j];
                }
            }
        }
        for row in sigma_u.iter_mut() {
            for v in row.iter_mut() {
                *v /= df;
            }
        }

        let stable = companion_is_stable(&coef_matrices, k, p);
        log::info!("VAR(p={}) fitted, stable: {}", p, if stable { "yes" } else { "no" });
        if !stable {
            log::warn!("VAR(p={}) is dynamically unstable; results may be explosive", p);
        }

        Ok(FittedVarModel {
            p,
            variable_names: series.names().to_vec(),
            intercept,
            coef_matrices,
            residuals,
            sigma_u,
            stable,
        })
    }

    /// Lag order.
    pub fn p(&self) -> usize {
        self.p
    }

    /// Variable names defining all matrix axes.
    pub fn names(&self) -> &[String] {
        &self.variable_names
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.variable_names.len()
    }

    /// Intercept vector.
    pub fn intercept(&self) -> &[f64] {
        &self.intercept
    }

    /// Coefficient matrix for lag `l` (1-based), row = responding equation.
    pub fn coef_matrix(&self, l: usize) -> &[Vec<f64>] {
        &self.coef_matrices[l - 1]
    }

    /// Residual rows, one per effective observation.
    pub fn residuals(&self) -> &[Vec<f64>] {
        &self.residuals
    }

    /// Residuals of one variable as a column.
    pub fn residual_column(&self, pos: usize) -> Vec<f64> {
        self.residuals.iter().map(|row| row[pos]).collect()
    }

    /// Residual covariance matrix Σ.
    pub fn sigma_u(&self) -> &[Vec<f64>] {
        &self.sigma_u
    }

    /// Whether all companion eigenvalues lie strictly inside the unit
    /// circle.
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    /// Iterated multi-step forecast seeded with the last `p` rows of
    /// `seed` (rows in variable order).
    ///
    /// # Errors
    /// `InsufficientData` when fewer than `p` seed rows are supplied,
    /// `DimensionMismatch` when a seed row has the wrong width.
    pub fn forecast(&self, seed: &[Vec<f64>], steps: usize) -> VarResult<Vec<Vec<f64>>> {
        let k = self.num_vars();
        if seed.len() < self.p {
            return Err(VarAnalysisError::InsufficientData {
                required: self.p,
                actual: seed.len(),
            });
        }
        for row in seed {
            if row.len() != k {
                return Err(VarAnalysisError::DimensionMismatch {
                    expected: k,
                    actual: row.len(),
                });
            }
        }

        let mut history: Vec<Vec<f64>> = seed[seed.len() - self.p..].to_vec();
        let mut out = Vec::with_capacity(steps);
        for _ in 0..steps {
            let mut next = self.intercept.clone();
            for l in 1..=self.p {
                let past = &history[history.len() - l];
                let a = &self.coef_matrices[l - 1];
                for i in 0..k {
                    for j in 0..k {
                        next[i] += a[i][j] * past[j];
                    }
                }
            }
            history.push(next.clone());
            out.push(next);
        }
        Ok(out)
    }
}

#[cfg(test)]
impl FittedVarModel {
    /// Assemble a model from known components for unit tests.
    pub(crate) fn from_components(
        p: usize,
        variable_names: Vec<String>,
        intercept: Vec<f64>,
        coef_matrices: Vec<Vec<Vec<f64>>>,
        sigma_u: Vec<Vec<f64>>,
    ) -> FittedVarModel {
        let k = variable_names.len();
        let stable = companion_is_stable(&coef_matrices, k, p);
        FittedVarModel {
            p,
            variable_names,
            intercept,
            coef_matrices,
            residuals: Vec::new(),
            sigma_u,
            stable,
        }
    }
}

/// Spectral radius check on the kp×kp companion matrix.
fn companion_is_stable(coef_matrices: &[Vec<Vec<f64>>], k: usize, p: usize) -> bool {
    let dim = k * p;
    let companion = DMatrix::from_fn(dim, dim, |r, c| {
        if r < k {
            let l = c / k;
            coef_matrices[l][r][c % k]
        } else if c == r - k {
            1.0
        } else {
            0.0
        }
    });
    companion
        .complex_eigenvalues()
        .iter()
        .all(|ev| ev.norm() < 1.0)
}
