//! Linear algebra operations for VAR estimation and decomposition.
//!
//! This module provides the numerical routines behind the least-squares VAR
//! fit and the Cholesky orthogonalization: Householder QR, triangular
//! solves, matrix products, and a lower Cholesky factorization. Matrices are
//! row-major `Vec<Vec<f64>>`; dimensions are validated at entry.

use crate::errors::{VarAnalysisError, VarResult};

const SINGULAR_TOL: f64 = 1e-12;

/// Validates that a matrix is rectangular (not ragged) and non-empty,
/// returning its (rows, cols) shape.
pub(crate) fn ensure_rectangular_matrix(a: &[Vec<f64>]) -> VarResult<(usize, usize)> {
    if a.is_empty() {
        return Err(VarAnalysisError::NumericalError {
            reason: "Empty matrix provided".to_string(),
            operation: Some("matrix_validation".to_string()),
        });
    }
    let n = a[0].len();
    if n == 0 {
        return Err(VarAnalysisError::NumericalError {
            reason: "Zero-width matrix (no columns)".to_string(),
            operation: Some("matrix_validation".to_string()),
        });
    }
    if !a.iter().all(|row| row.len() == n) {
        return Err(VarAnalysisError::NumericalError {
            reason: "Ragged matrix (inconsistent row lengths)".to_string(),
            operation: Some("matrix_validation".to_string()),
        });
    }
    Ok((a.len(), n))
}

/// Validates that a matrix contains no NaN or Inf values.
pub(crate) fn ensure_finite_matrix(a: &[Vec<f64>], operation: &str) -> VarResult<()> {
    for (i, row) in a.iter().enumerate() {
        for (j, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(VarAnalysisError::NumericalError {
                    reason: format!("Non-finite value ({}) at position [{},{}]", val, i, j),
                    operation: Some(operation.to_string()),
                });
            }
        }
    }
    Ok(())
}

/// Identity matrix of size n.
pub fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

/// Matrix product `a * b`.
///
/// # Errors
/// `DimensionMismatch` when the inner dimensions disagree.
pub fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> VarResult<Vec<Vec<f64>>> {
    let (n, ka) = ensure_rectangular_matrix(a)?;
    let (kb, m) = ensure_rectangular_matrix(b)?;
    if ka != kb {
        return Err(VarAnalysisError::DimensionMismatch {
            expected: ka,
            actual: kb,
        });
    }
    let mut out = vec![vec![0.0; m]; n];
    for i in 0..n {
        for l in 0..ka {
            let aik = a[i][l];
            if aik == 0.0 {
                continue;
            }
            for j in 0..m {
                out[i][j] += aik * b[l][j];
            }
        }
    }
    Ok(out)
}

/// Matrix-vector product `a * v`.
pub fn mat_vec(a: &[Vec<f64>], v: &[f64]) -> VarResult<Vec<f64>> {
    let (n, k) = ensure_rectangular_matrix(a)?;
    if k != v.len() {
        return Err(VarAnalysisError::DimensionMismatch {
            expected: k,
            actual: v.len(),
        });
    }
    Ok((0..n)
        .map(|i| a[i].iter().zip(v).map(|(aij, vj)| aij * vj).sum())
        .collect())
}

/// Transpose of a rectangular matrix.
pub fn transpose(a: &[Vec<f64>]) -> Vec<Vec<f64>> {
    if a.is_empty() {
        return Vec::new();
    }
    let n = a.len();
    let m = a[0].len();
    (0..m)
        .map(|j| (0..n).map(|i| a[i][j]).collect())
        .collect()
}

/// Least-squares solution of `x * beta = y` via Householder QR with the
/// right-hand side reduced in place (no explicit Q).
///
/// `x` is the n×k design matrix (rows = observations), `n >= k` required.
/// Returns the coefficient vector of length k.
pub fn qr_least_squares(x: &[Vec<f64>], y: &[f64]) -> VarResult<Vec<f64>> {
    let (coeffs, _) = qr_reduce(x, y)?;
    Ok(coeffs)
}

/// Least-squares fit returning coefficients, residuals, and per-coefficient
/// standard errors from the triangular factor.
///
/// Standard errors use `sigma^2 = RSS / (n - k)`; `n > k` required.
pub fn qr_least_squares_with_stats(
    x: &[Vec<f64>],
    y: &[f64],
) -> VarResult<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    let (n, k) = ensure_rectangular_matrix(x)?;
    if n <= k {
        return Err(VarAnalysisError::InsufficientData {
            required: k + 1,
            actual: n,
        });
    }
    let (coeffs, r) = qr_reduce(x, y)?;

    let residuals = compute_residuals(x, y, &coeffs);
    let rss: f64 = residuals.iter().map(|e| e * e).sum();
    let sigma2 = rss / (n - k) as f64;

    // SE(beta_j) = sigma * ||u|| with R' u = e_j, since (X'X)^{-1} = R^{-1} R^{-T}.
    let mut se = Vec::with_capacity(k);
    for j in 0..k {
        let mut u = vec![0.0; k];
        for i in 0..k {
            let mut sum = if i == j { 1.0 } else { 0.0 };
            for l in 0..i {
                sum -= r[l][i] * u[l];
            }
            if r[i][i].abs() < SINGULAR_TOL {
                return Err(VarAnalysisError::NumericalError {
                    reason: "Singular design matrix in standard error computation".to_string(),
                    operation: Some("qr_least_squares_with_stats".to_string()),
                });
            }
            u[i] = sum / r[i][i];
        }
        let norm_sq: f64 = u.iter().map(|v| v * v).sum();
        se.push((sigma2 * norm_sq).sqrt());
    }

    Ok((coeffs, residuals, se))
}

/// Residuals `y - x * beta`.
pub fn compute_residuals(x: &[Vec<f64>], y: &[f64], coeffs: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(y)
        .map(|(row, &yi)| {
            let fitted: f64 = row.iter().zip(coeffs).map(|(xij, bj)| xij * bj).sum();
            yi - fitted
        })
        .collect()
}

/// Householder reduction of `[x | y]`, returning the back-substituted
/// coefficients and the k×k upper-triangular factor R.
fn qr_reduce(x: &[Vec<f64>], y: &[f64]) -> VarResult<(Vec<f64>, Vec<Vec<f64>>)> {
    let (n, k) = ensure_rectangular_matrix(x)?;
    ensure_finite_matrix(x, "qr_reduce")?;
    if y.len() != n {
        return Err(VarAnalysisError::DimensionMismatch {
            expected: n,
            actual: y.len(),
        });
    }
    if n < k {
        return Err(VarAnalysisError::InsufficientData {
            required: k,
            actual: n,
        });
    }

    let mut a: Vec<Vec<f64>> = x.to_vec();
    let mut b: Vec<f64> = y.to_vec();

    for j in 0..k {
        // Householder vector for column j below the diagonal.
        let norm_sq: f64 = (j..n).map(|i| a[i][j] * a[i][j]).sum();
        let norm = norm_sq.sqrt();
        if norm < SINGULAR_TOL {
            return Err(VarAnalysisError::NumericalError {
                reason: format!("Rank-deficient design matrix at column {}", j),
                operation: Some("householder_qr".to_string()),
            });
        }
        let alpha = if a[j][j] >= 0.0 { -norm } else { norm };
        let mut v: Vec<f64> = (j..n).map(|i| a[i][j]).collect();
        v[0] -= alpha;
        let v_norm_sq: f64 = v.iter().map(|vi| vi * vi).sum();
        if v_norm_sq < SINGULAR_TOL * SINGULAR_TOL {
            // Column already reduced.
            continue;
        }

        // Apply H = I - 2 v v' / (v'v) to the remaining columns and to b.
        for col in j..k {
            let dot: f64 = (j..n).map(|i| v[i - j] * a[i][col]).sum();
            let scale = 2.0 * dot / v_norm_sq;
            for i in j..n {
                a[i][col] -= scale * v[i - j];
            }
        }
        let dot_b: f64 = (j..n).map(|i| v[i - j] * b[i]).sum();
        let scale_b = 2.0 * dot_b / v_norm_sq;
        for i in j..n {
            b[i] -= scale_b * v[i - j];
        }
    }

    // Back substitution on the k×k triangle.
    let mut coeffs = vec![0.0; k];
    for i in (0..k).rev() {
        let mut sum = b[i];
        for j in (i + 1)..k {
            sum -= a[i][j] * coeffs[j];
        }
        if a[i][i].abs() < SINGULAR_TOL {
            return Err(VarAnalysisError::NumericalError {
                reason: format!("Singular triangular factor at row {}", i),
                operation: Some("householder_qr".to_string()),
            });
        }
        coeffs[i] = sum / a[i][i];
    }

    let r: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if j >= i { a[i][j] } else { 0.0 }).collect())
        .collect();
    Ok((coeffs, r))
}

/// Lower-triangular Cholesky factor of a symmetric positive definite
/// matrix.
///
/// # Errors
/// `NonPositiveDefiniteCovariance` when a pivot is non-positive,
/// `DimensionMismatch` when the input is not square.
pub fn cholesky_lower(a: &[Vec<f64>]) -> VarResult<Vec<Vec<f64>>> {
    let (n, m) = ensure_rectangular_matrix(a)?;
    if n != m {
        return Err(VarAnalysisError::DimensionMismatch {
            expected: n,
            actual: m,
        });
    }
    ensure_finite_matrix(a, "cholesky_lower")?;

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 {
                    return Err(VarAnalysisError::NonPositiveDefiniteCovariance { size: n });
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Ok(l)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_mat_mul_identity() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let prod = mat_mul(&a, &identity(2)).unwrap();
        assert_eq!(prod, a);
    }

    #[test]
    fn test_mat_mul_shape_mismatch() {
        let a = vec![vec![1.0, 2.0]];
        let b = vec![vec![1.0]];
        assert!(mat_mul(&a, &b).is_err());
    }

    #[test]
    fn test_qr_recovers_exact_coefficients() {
        // y = 2 + 3*x, noiseless.
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let x: Vec<Vec<f64>> = xs.iter().map(|&v| vec![1.0, v]).collect();
        let y: Vec<f64> = xs.iter().map(|&v| 2.0 + 3.0 * v).collect();
        let coeffs = qr_least_squares(&x, &y).unwrap();
        assert_approx_eq!(coeffs[0], 2.0, 1e-9);
        assert_approx_eq!(coeffs[1], 3.0, 1e-9);
    }

    #[test]
    fn test_qr_rejects_rank_deficient() {
        let x = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let y = vec![1.0, 2.0, 3.0];
        assert!(qr_least_squares(&x, &y).is_err());
    }

    #[test]
    fn test_qr_stats_standard_errors_positive() {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![1.0, i as f64, ((i * i) % 7) as f64])
            .collect();
        let y: Vec<f64> = (0..20)
            .map(|i| 1.0 + 0.5 * i as f64 + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let (coeffs, residuals, se) = qr_least_squares_with_stats(&x, &y).unwrap();
        assert_eq!(coeffs.len(), 3);
        assert_eq!(residuals.len(), 20);
        assert!(se.iter().all(|&s| s > 0.0 && s.is_finite()));
    }

    #[test]
    fn test_cholesky_known_factor() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let l = cholesky_lower(&a).unwrap();
        assert_approx_eq!(l[0][0], 2.0, 1e-12);
        assert_approx_eq!(l[1][0], 1.0, 1e-12);
        assert_approx_eq!(l[1][1], 2.0_f64.sqrt(), 1e-12);
        assert_eq!(l[0][1], 0.0);
    }

    #[test]
    fn test_cholesky_identity() {
        let l = cholesky_lower(&identity(3)).unwrap();
        assert_eq!(l, identity(3));
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert!(matches!(
            cholesky_lower(&a),
            Err(VarAnalysisError::NonPositiveDefiniteCovariance { size: 2 })
        ));
    }

    #[test]
    fn test_compute_residuals_zero_for_exact_fit() {
        let x = vec![vec![1.0, 1.0], vec![1.0, 2.0]];
        let y = vec![3.0, 5.0];
        let res = compute_residuals(&x, &y, &[1.0, 2.0]);
        assert!(res.iter().all(|&r| r.abs() < 1e-12));
    }
}
