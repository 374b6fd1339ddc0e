//! Reversible preprocessing for VAR estimation.
//!
//! Each variable passes through an ordered sequence of transforms —
//! optional log, stationarity differencing, train-fitted standardization —
//! and every applied operation is recorded in an explicit, immutable
//! `TransformRecord`. Inversion replays the record in exact reverse order;
//! that ordering is a correctness requirement for the real-scale forecast
//! metrics, not a convention.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{VarAnalysisError, VarResult};
use crate::math_utils::{calculate_mean, first_differences, pearson_correlation};
use crate::series::MultivariateSeries;
use crate::statistical_tests::augmented_dickey_fuller;

/// One applied transform, in application order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransformOp {
    /// Natural log of the raw values.
    Log,
    /// First differencing for stationarity.
    Difference,
    /// Affine rescale with parameters fit on the training partition.
    Standardize {
        /// Training mean subtracted from the values.
        mean: f64,
        /// Training standard deviation dividing the values (1.0 for a
        /// constant column, scikit-learn convention).
        stddev: f64,
    },
}

/// Ordered list of transforms applied to one variable.
///
/// The record carries everything needed to reconstruct original-scale
/// values; it holds no hidden state and is safe to copy between threads.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransformRecord {
    ops: Vec<TransformOp>,
}

impl TransformRecord {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation in application order.
    pub fn push(&mut self, op: TransformOp) {
        self.ops.push(op);
    }

    /// Applied operations, oldest first.
    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    /// Whether differencing is part of the record.
    pub fn is_differenced(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, TransformOp::Difference))
    }

    /// Undo every recorded operation in reverse order.
    ///
    /// `anchor` is the value immediately preceding the reconstructed
    /// segment on the scale at which differencing was applied (log scale
    /// when a `Log` op precedes the `Difference`); required whenever the
    /// record contains a `Difference`.
    pub fn invert(&self, values: &[f64], anchor: Option<f64>) -> VarResult<Vec<f64>> {
        let mut out = values.to_vec();
        for op in self.ops.iter().rev() {
            match op {
                TransformOp::Standardize { mean, stddev } => {
                    for v in out.iter_mut() {
                        *v = *v * stddev + mean;
                    }
                }
                TransformOp::Difference => {
                    let mut level = anchor.ok_or_else(|| VarAnalysisError::InvalidParameter {
                        parameter: "anchor".to_string(),
                        value: f64::NAN,
                        constraint: "required to invert a differenced series".to_string(),
                    })?;
                    for v in out.iter_mut() {
                        level += *v;
                        *v = level;
                    }
                }
                TransformOp::Log => {
                    for v in out.iter_mut() {
                        *v = v.exp();
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Levels reconstructed from differences by cumulative summation anchored
/// at the last real value preceding the segment.
pub fn cumulative_reconstruct(differences: &[f64], anchor: f64) -> Vec<f64> {
    let mut level = anchor;
    differences
        .iter()
        .map(|d| {
            level += d;
            level
        })
        .collect()
}

/// Result of the stationarity pass over a multivariate series.
#[derive(Debug, Clone)]
pub struct StationarityOutcome {
    /// Series with non-stationary variables first-differenced and NaN rows
    /// dropped jointly across variables.
    pub series: MultivariateSeries,
    /// Per-variable verdict of the ADF test on the original values.
    pub stationary: BTreeMap<String, bool>,
    /// Per-variable ADF p-values.
    pub p_values: BTreeMap<String, f64>,
    /// Names of the variables that were differenced.
    pub differenced: Vec<String>,
    /// Per-variable transform records reflecting the applied differencing.
    pub records: BTreeMap<String, TransformRecord>,
}

/// Test every variable for a unit root and difference the ones that fail.
///
/// A variable whose ADF p-value is ≥ `alpha` is replaced by its first
/// differences; rows containing the NaN introduced by differencing are then
/// dropped jointly so the shared index stays aligned.
pub fn enforce_stationarity(
    series: &MultivariateSeries,
    alpha: f64,
) -> VarResult<StationarityOutcome> {
    if !(0.0..1.0).contains(&alpha) || alpha <= 0.0 {
        return Err(VarAnalysisError::InvalidParameter {
            parameter: "alpha".to_string(),
            value: alpha,
            constraint: "0 < alpha < 1".to_string(),
        });
    }

    let mut transformed = series.clone();
    let mut stationary = BTreeMap::new();
    let mut p_values = BTreeMap::new();
    let mut differenced = Vec::new();
    let mut records = BTreeMap::new();

    for (pos, name) in series.names().to_vec().iter().enumerate() {
        let column = series.column_at(pos);
        let result = augmented_dickey_fuller(column)?;
        let is_stationary = result.p_value < alpha;
        log::info!(
            "{}: {} (ADF p-value = {:.4})",
            name,
            if is_stationary { "stationary" } else { "NOT stationary" },
            result.p_value
        );

        let mut record = TransformRecord::new();
        if !is_stationary {
            let mut values = vec![f64::NAN];
            values.extend(first_differences(column));
            transformed.set_column(pos, values);
            record.push(TransformOp::Difference);
            differenced.push(name.clone());
        }
        stationary.insert(name.clone(), is_stationary);
        p_values.insert(name.clone(), result.p_value);
        records.insert(name.clone(), record);
    }

    Ok(StationarityOutcome {
        series: transformed.drop_nan_rows(),
        stationary,
        p_values,
        differenced,
        records,
    })
}

/// Pairs of variables whose absolute Pearson correlation exceeds
/// `threshold`, sorted descending by correlation strength.
///
/// Diagnostic only: the series is never mutated. Pairs whose correlation is
/// undefined (a constant variable) are skipped.
pub fn high_correlation_pairs(
    series: &MultivariateSeries,
    threshold: f64,
) -> Vec<(String, String, f64)> {
    let names = series.names();
    let mut pairs = Vec::new();
    for i in 0..names.len() {
        for j in 0..i {
            let coef = match pearson_correlation(series.column_at(i), series.column_at(j)) {
                Ok(c) => c.abs(),
                Err(_) => continue,
            };
            if coef > threshold {
                pairs.push((names[i].clone(), names[j].clone(), coef));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    for (a, b, coef) in &pairs {
        log::warn!("high correlation: {} and {} -> {:.3}", a, b, coef);
    }
    pairs
}

/// Per-variable affine standardizer fit on the training partition only.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StandardScaler {
    names: Vec<String>,
    means: Vec<f64>,
    stddevs: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and population standard deviations per variable. A
    /// constant column gets stddev 1.0 so it passes through centered.
    pub fn fit(train: &MultivariateSeries) -> VarResult<Self> {
        if train.is_empty() {
            return Err(VarAnalysisError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        let mut means = Vec::with_capacity(train.num_vars());
        let mut stddevs = Vec::with_capacity(train.num_vars());
        for pos in 0..train.num_vars() {
            let column = train.column_at(pos);
            let mean = calculate_mean(column);
            let pop_var =
                column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
            let stddev = pop_var.sqrt();
            means.push(mean);
            stddevs.push(if stddev > 0.0 { stddev } else { 1.0 });
        }
        Ok(StandardScaler {
            names: train.names().to_vec(),
            means,
            stddevs,
        })
    }

    /// Variable names in fitting order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Fitted mean for a variable.
    pub fn mean(&self, name: &str) -> VarResult<f64> {
        self.position(name).map(|pos| self.means[pos])
    }

    /// Fitted standard deviation for a variable.
    pub fn stddev(&self, name: &str) -> VarResult<f64> {
        self.position(name).map(|pos| self.stddevs[pos])
    }

    fn position(&self, name: &str) -> VarResult<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| VarAnalysisError::VariableNotFound {
                name: name.to_string(),
            })
    }

    /// Apply the fitted affine map to a series with the same variables.
    pub fn transform(&self, series: &MultivariateSeries) -> VarResult<MultivariateSeries> {
        self.check_names(series)?;
        let mut out = series.clone();
        for pos in 0..series.num_vars() {
            let mean = self.means[pos];
            let stddev = self.stddevs[pos];
            let values = series
                .column_at(pos)
                .iter()
                .map(|v| (v - mean) / stddev)
                .collect();
            out.set_column(pos, values);
        }
        Ok(out)
    }

    /// Undo the affine map on row-major forecast output (one row per step,
    /// columns in fitting order).
    pub fn inverse_transform_rows(&self, rows: &[Vec<f64>]) -> VarResult<Vec<Vec<f64>>> {
        let k = self.names.len();
        rows.iter()
            .map(|row| {
                if row.len() != k {
                    return Err(VarAnalysisError::DimensionMismatch {
                        expected: k,
                        actual: row.len(),
                    });
                }
                Ok(row
                    .iter()
                    .enumerate()
                    .map(|(j, v)| v * self.stddevs[j] + self.means[j])
                    .collect())
            })
            .collect()
    }

    /// Undo the affine map for a single variable's values.
    pub fn inverse_transform_column(&self, name: &str, values: &[f64]) -> VarResult<Vec<f64>> {
        let pos = self.position(name)?;
        let mean = self.means[pos];
        let stddev = self.stddevs[pos];
        Ok(values.iter().map(|v| v * stddev + mean).collect())
    }

    fn check_names(&self, series: &MultivariateSeries) -> VarResult<()> {
        if series.names() != self.names.as_slice() {
            return Err(VarAnalysisError::DimensionMismatch {
                expected: self.names.len(),
                actual: series.num_vars(),
            });
        }
        Ok(())
    }
}

/// Standardize train and test partitions with parameters fit on the
/// training partition only, appending `Standardize` to each variable's
/// record.
pub fn standardize_train_test(
    train: &MultivariateSeries,
    test: &MultivariateSeries,
    records: &mut BTreeMap<String, TransformRecord>,
) -> VarResult<(MultivariateSeries, MultivariateSeries, StandardScaler)> {
    let scaler = StandardScaler::fit(train)?;
    let train_scaled = scaler.transform(train)?;
    let test_scaled = scaler.transform(test)?;
    for (pos, name) in scaler.names().iter().enumerate() {
        records.entry(name.clone()).or_default().push(TransformOp::Standardize {
            mean: scaler.means[pos],
            stddev: scaler.stddevs[pos],
        });
    }
    Ok((train_scaled, test_scaled, scaler))
}

/// Variables suited to a log transform: strictly positive, max/min ratio
/// above `ratio_threshold`, mean above `mean_threshold`, at least 3 points.
pub fn log_transform_candidates(
    series: &MultivariateSeries,
    ratio_threshold: f64,
    mean_threshold: f64,
) -> Vec<String> {
    let mut candidates = Vec::new();
    for (pos, name) in series.names().iter().enumerate() {
        let values: Vec<f64> = series
            .column_at(pos)
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        if values.len() < 3 || values.iter().any(|&v| v <= 0.0) {
            continue;
        }
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        if max / min > ratio_threshold && calculate_mean(&values) > mean_threshold {
            candidates.push(name.clone());
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Frequency, TimeSeries};
    use assert_approx_eq::assert_approx_eq;
    use chrono::NaiveDate;

    fn d(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn mv(columns: Vec<(&str, Vec<f64>)>) -> MultivariateSeries {
        let n = columns[0].1.len();
        let index = Frequency::Annual.date_range(d(2000), d(2000 + n as i32 - 1));
        let series = columns
            .into_iter()
            .map(|(name, values)| TimeSeries::from_parts(name, index.clone(), values).unwrap())
            .collect();
        MultivariateSeries::from_columns(series).unwrap()
    }

    fn lcg_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    #[test]
    fn test_record_round_trip_all_ops() {
        let original: Vec<f64> = vec![105.0, 111.0, 123.0, 130.0, 142.0, 155.0];
        // Forward: log, difference, standardize.
        let logged: Vec<f64> = original.iter().map(|v| v.ln()).collect();
        let diffed = first_differences(&logged);
        let mean = calculate_mean(&diffed);
        let stddev =
            (diffed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / diffed.len() as f64).sqrt();
        let scaled: Vec<f64> = diffed.iter().map(|v| (v - mean) / stddev).collect();

        let mut record = TransformRecord::new();
        record.push(TransformOp::Log);
        record.push(TransformOp::Difference);
        record.push(TransformOp::Standardize { mean, stddev });

        // Anchor on the differencing scale: the log of the first level.
        let restored = record.invert(&scaled, Some(logged[0])).unwrap();
        for (r, o) in restored.iter().zip(&original[1..]) {
            assert_approx_eq!(r, o, 1e-9);
        }
    }

    #[test]
    fn test_record_invert_requires_anchor_for_difference() {
        let mut record = TransformRecord::new();
        record.push(TransformOp::Difference);
        assert!(record.invert(&[1.0, 2.0], None).is_err());
        assert!(record.invert(&[1.0, 2.0], Some(0.0)).is_ok());
    }

    #[test]
    fn test_cumulative_reconstruct() {
        assert_eq!(
            cumulative_reconstruct(&[1.0, 2.0, -0.5], 10.0),
            vec![11.0, 13.0, 12.5]
        );
    }

    #[test]
    fn test_stationarity_pass_differences_trending_variable() {
        let n = 120;
        let noise = lcg_noise(n, 11);
        // Random walk with drift: clearly non-stationary.
        let mut walk = Vec::with_capacity(n);
        let mut level = 50.0;
        for e in &noise {
            level += 0.5 + e;
            walk.push(level);
        }
        // White noise: clearly stationary.
        let flat = lcg_noise(n, 23);

        let series = mv(vec![("walk", walk), ("flat", flat)]);
        let outcome = enforce_stationarity(&series, 0.05).unwrap();

        assert!(!outcome.stationary["walk"]);
        assert!(outcome.stationary["flat"]);
        assert_eq!(outcome.differenced, vec!["walk".to_string()]);
        assert!(outcome.records["walk"].is_differenced());
        assert!(!outcome.records["flat"].is_differenced());
        // One leading row lost to differencing, jointly for both variables.
        assert_eq!(outcome.series.len(), n - 1);
        // Differenced values recover drift + noise around 0.5.
        let mean_diff = calculate_mean(outcome.series.column("walk").unwrap());
        assert!((mean_diff - 0.5).abs() < 0.2);
    }

    #[test]
    fn test_stationarity_rejects_bad_alpha() {
        let series = mv(vec![("a", lcg_noise(40, 1))]);
        assert!(enforce_stationarity(&series, 0.0).is_err());
        assert!(enforce_stationarity(&series, 1.5).is_err());
    }

    #[test]
    fn test_high_correlation_pairs_sorted_descending() {
        let base = lcg_noise(60, 5);
        let near_copy: Vec<f64> = base.iter().map(|v| 2.0 * v + 1e-4).collect();
        let scaled: Vec<f64> = base
            .iter()
            .enumerate()
            .map(|(i, v)| v + 0.05 * lcg_noise(60, 17)[i])
            .collect();
        let unrelated = lcg_noise(60, 99);
        let series = mv(vec![
            ("a", base),
            ("b", near_copy),
            ("c", scaled),
            ("d", unrelated),
        ]);
        let pairs = high_correlation_pairs(&series, 0.9);
        assert!(pairs.len() >= 2);
        // Descending by |r|, perfect pair first.
        assert!(pairs[0].2 >= pairs[1].2);
        assert!(pairs[0].2 > 0.999);
        let names = (pairs[0].0.as_str(), pairs[0].1.as_str());
        assert!(names == ("b", "a") || names == ("a", "b"));
    }

    #[test]
    fn test_scaler_fits_on_train_only() {
        let train = mv(vec![("a", vec![1.0, 2.0, 3.0, 4.0])]);
        let test = mv(vec![("a", vec![10.0, 20.0])]);
        let mut records = BTreeMap::new();
        let (train_scaled, test_scaled, scaler) =
            standardize_train_test(&train, &test, &mut records).unwrap();

        assert_approx_eq!(scaler.mean("a").unwrap(), 2.5);
        let expected_std = (1.25f64).sqrt();
        assert_approx_eq!(scaler.stddev("a").unwrap(), expected_std, 1e-12);

        let scaled = train_scaled.column("a").unwrap();
        assert_approx_eq!(calculate_mean(scaled), 0.0, 1e-12);

        // Test values use the train parameters, not their own.
        let t = test_scaled.column("a").unwrap();
        assert_approx_eq!(t[0], (10.0 - 2.5) / expected_std, 1e-12);
        assert_approx_eq!(t[1], (20.0 - 2.5) / expected_std, 1e-12);

        match records["a"].ops() {
            [TransformOp::Standardize { mean, stddev }] => {
                assert_approx_eq!(*mean, 2.5);
                assert_approx_eq!(*stddev, expected_std, 1e-12);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_scaler_constant_column_passes_through() {
        let train = mv(vec![("a", vec![7.0, 7.0, 7.0])]);
        let scaler = StandardScaler::fit(&train).unwrap();
        assert_eq!(scaler.stddev("a").unwrap(), 1.0);
        let scaled = scaler.transform(&train).unwrap();
        assert_eq!(scaled.column("a").unwrap(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scaler_inverse_round_trip() {
        let train = mv(vec![
            ("a", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            ("b", vec![10.0, 30.0, 20.0, 50.0, 40.0]),
        ]);
        let scaler = StandardScaler::fit(&train).unwrap();
        let scaled = scaler.transform(&train).unwrap();
        let rows: Vec<Vec<f64>> = (0..scaled.len()).map(|i| scaled.row(i)).collect();
        let restored = scaler.inverse_transform_rows(&rows).unwrap();
        for i in 0..train.len() {
            for (j, _) in train.names().iter().enumerate() {
                assert_approx_eq!(restored[i][j], train.row(i)[j], 1e-10);
            }
        }
    }

    #[test]
    fn test_scaler_rejects_unknown_variable() {
        let train = mv(vec![("a", vec![1.0, 2.0])]);
        let scaler = StandardScaler::fit(&train).unwrap();
        assert!(scaler.mean("zz").is_err());
        let other = mv(vec![("b", vec![1.0, 2.0])]);
        assert!(scaler.transform(&other).is_err());
    }

    #[test]
    fn test_log_transform_candidates() {
        let series = mv(vec![
            ("gdp", vec![1000.0, 4000.0, 9000.0, 20000.0]),
            ("rate", vec![0.5, 0.7, 0.6, 0.8]),
            ("mixed", vec![-1.0, 2000.0, 9000.0, 20000.0]),
        ]);
        let candidates = log_transform_candidates(&series, 5.0, 100.0);
        assert_eq!(candidates, vec!["gdp".to_string()]);
    }
}
