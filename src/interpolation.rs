//! Stepwise frequency-escalation interpolation for annual series.
//!
//! An annual series is raised to a higher frequency by walking the ladder
//! Annual → Quarterly → Monthly → Daily one rung at a time (or jumping
//! straight to the target), reindexing onto each rung's full date grid and
//! filling the inserted slots with the chosen method. Interpolation may
//! optionally run in natural-log space with the exponential applied at the
//! end.

use chrono::NaiveDate;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{VarAnalysisError, VarResult};
use crate::series::{Frequency, TimeSeries};

/// Gap-filling method applied after each reindexing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InterpolationMethod {
    /// Piecewise linear between bracketing observations.
    Linear,
    /// Local quadratic through the three nearest observations.
    Polynomial,
    /// Natural cubic spline through all observations.
    Spline,
    /// Carry the last observation forward.
    ForwardFill,
}

impl InterpolationMethod {
    /// Method name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            InterpolationMethod::Linear => "linear",
            InterpolationMethod::Polynomial => "polynomial",
            InterpolationMethod::Spline => "spline",
            InterpolationMethod::ForwardFill => "ffill",
        }
    }
}

/// Flags controlling the escalation walk.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterpolationOptions {
    /// Walk the ladder rung by rung instead of jumping to the target.
    pub stepwise: bool,
    /// Interpolate in natural-log space.
    pub log_transform: bool,
    /// Exponentiate back to the original scale after interpolation. When
    /// false the caller receives the log-scale series for further chaining.
    pub revert_log: bool,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self {
            stepwise: true,
            log_transform: false,
            revert_log: true,
        }
    }
}

/// Minimum known points required by the higher-order methods.
const MIN_HIGHER_ORDER_POINTS: usize = 4;

/// Escalate a series believed to be annual onto `target`'s full date grid.
///
/// The output covers every grid point of the target frequency between the
/// input's first and last dates, with the index uniformly named "date". A
/// non-annual input frequency is an advisory condition: it is logged and
/// the escalation proceeds.
///
/// # Errors
/// - `NonPositiveForLog` when `log_transform` is set and any value is ≤ 0.
/// - `InsufficientPoints` when `Polynomial`/`Spline` run with fewer than 4
///   known points.
/// - `InsufficientData` for an empty input.
pub fn escalate(
    series: &TimeSeries,
    target: Frequency,
    method: InterpolationMethod,
    options: &InterpolationOptions,
) -> VarResult<TimeSeries> {
    if series.is_empty() {
        return Err(VarAnalysisError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    match Frequency::infer(series.index()) {
        Some(Frequency::Annual) => {}
        detected => log::warn!(
            "input frequency of '{}' does not look annual (detected {:?}); proceeding anyway",
            series.name(),
            detected
        ),
    }

    let start = series.first_date().expect("non-empty series");
    let end = series.last_date().expect("non-empty series");

    // Forward fill is a plain reindex-and-pad; log/stepwise flags do not apply.
    if method == InterpolationMethod::ForwardFill {
        let grid = target.date_range(start, end);
        let mut values = series.reindex(&grid).values().to_vec();
        let mut last = f64::NAN;
        for v in values.iter_mut() {
            if v.is_nan() {
                *v = last;
            } else {
                last = *v;
            }
        }
        return TimeSeries::from_parts(series.name(), grid, values);
    }

    let mut current = series.clone();
    if options.log_transform {
        if current.values().iter().any(|&v| !v.is_nan() && v <= 0.0) {
            return Err(VarAnalysisError::NonPositiveForLog);
        }
        current = current.map_values(f64::ln);
    }

    let target_pos = target.ladder_position();
    let rungs: Vec<Frequency> = if options.stepwise {
        Frequency::LADDER[1..=target_pos].to_vec()
    } else {
        vec![target]
    };

    for rung in rungs {
        let grid = rung.date_range(start, end);
        let reindexed = current.reindex(&grid);
        let known = reindexed.count_known();
        if matches!(
            method,
            InterpolationMethod::Polynomial | InterpolationMethod::Spline
        ) && known < MIN_HIGHER_ORDER_POINTS
        {
            return Err(VarAnalysisError::InsufficientPoints {
                method: method.label().to_string(),
                required: MIN_HIGHER_ORDER_POINTS,
                actual: known,
            });
        }
        let filled = fill_missing(reindexed.index(), reindexed.values(), method)?;
        current = reindexed.with_values(filled);
    }

    if options.log_transform && options.revert_log {
        current = current.map_values(f64::exp);
    }
    Ok(current)
}

/// Fill NaN slots of `values` using the given method, with dates mapped to
/// day offsets as the abscissa. Leading gaps stay NaN; trailing gaps carry
/// the last observation forward.
fn fill_missing(
    index: &[NaiveDate],
    values: &[f64],
    method: InterpolationMethod,
) -> VarResult<Vec<f64>> {
    let origin = index[0];
    let xs: Vec<f64> = index.iter().map(|d| (*d - origin).num_days() as f64).collect();

    let known: Vec<(f64, f64)> = xs
        .iter()
        .zip(values)
        .filter(|(_, v)| !v.is_nan())
        .map(|(&x, &v)| (x, v))
        .collect();
    if known.is_empty() {
        return Ok(values.to_vec());
    }

    let spline = if method == InterpolationMethod::Spline {
        Some(natural_cubic_spline(&known)?)
    } else {
        None
    };

    let last_known_x = known.last().expect("non-empty").0;
    let last_known_y = known.last().expect("non-empty").1;
    let first_known_x = known[0].0;

    let mut out = values.to_vec();
    for (i, v) in out.iter_mut().enumerate() {
        if !v.is_nan() {
            continue;
        }
        let x = xs[i];
        if x < first_known_x {
            continue;
        }
        if x > last_known_x {
            *v = last_known_y;
            continue;
        }
        *v = match method {
            InterpolationMethod::Linear => linear_at(&known, x),
            InterpolationMethod::Polynomial => quadratic_at(&known, x),
            InterpolationMethod::Spline => spline.as_ref().expect("built above").eval(x),
            InterpolationMethod::ForwardFill => unreachable!("handled by the early return"),
        };
    }
    Ok(out)
}

/// Piecewise-linear value at `x` between the bracketing known points.
fn linear_at(known: &[(f64, f64)], x: f64) -> f64 {
    let hi = known.partition_point(|(kx, _)| *kx < x);
    let (x0, y0) = known[hi - 1];
    let (x1, y1) = known[hi];
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Lagrange quadratic through the three known points nearest to `x`.
fn quadratic_at(known: &[(f64, f64)], x: f64) -> f64 {
    debug_assert!(known.len() >= 3);
    let hi = known.partition_point(|(kx, _)| *kx < x);
    // Window of three consecutive points around the gap; prefer centering.
    let start = if hi == 0 {
        0
    } else if hi >= known.len() - 1 {
        known.len() - 3
    } else {
        hi - 1
    };
    let pts = &known[start..start + 3];
    let mut acc = 0.0;
    for (j, &(xj, yj)) in pts.iter().enumerate() {
        let mut weight = yj;
        for (m, &(xm, _)) in pts.iter().enumerate() {
            if m != j {
                weight *= (x - xm) / (xj - xm);
            }
        }
        acc += weight;
    }
    acc
}

/// Natural cubic spline through a set of strictly increasing knots.
struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots (zero at both ends).
    m: Vec<f64>,
}

impl CubicSpline {
    fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let j = self
            .xs
            .partition_point(|&kx| kx < x)
            .clamp(1, n - 1)
            - 1;
        let h = self.xs[j + 1] - self.xs[j];
        let a = (self.xs[j + 1] - x) / h;
        let b = (x - self.xs[j]) / h;
        a * self.ys[j]
            + b * self.ys[j + 1]
            + ((a.powi(3) - a) * self.m[j] + (b.powi(3) - b) * self.m[j + 1]) * h * h / 6.0
    }
}

/// Solve the tridiagonal system for natural boundary conditions.
fn natural_cubic_spline(known: &[(f64, f64)]) -> VarResult<CubicSpline> {
    let n = known.len();
    if n < 3 {
        return Err(VarAnalysisError::InsufficientPoints {
            method: "spline".to_string(),
            required: MIN_HIGHER_ORDER_POINTS,
            actual: n,
        });
    }
    let xs: Vec<f64> = known.iter().map(|(x, _)| *x).collect();
    let ys: Vec<f64> = known.iter().map(|(_, y)| *y).collect();

    let mut m = vec![0.0; n];
    // Thomas algorithm over the n-2 interior knots.
    let mut diag = vec![0.0; n];
    let mut rhs = vec![0.0; n];
    let mut upper = vec![0.0; n];
    for i in 1..n - 1 {
        let h_prev = xs[i] - xs[i - 1];
        let h_next = xs[i + 1] - xs[i];
        diag[i] = 2.0 * (h_prev + h_next);
        upper[i] = h_next;
        rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h_next - (ys[i] - ys[i - 1]) / h_prev);
    }
    for i in 2..n - 1 {
        let h_prev = xs[i] - xs[i - 1];
        let w = h_prev / diag[i - 1];
        diag[i] -= w * upper[i - 1];
        rhs[i] -= w * rhs[i - 1];
    }
    for i in (1..n - 1).rev() {
        m[i] = (rhs[i] - upper[i] * m[i + 1]) / diag[i];
    }

    Ok(CubicSpline { xs, ys, m })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn annual(values: &[(i32, f64)]) -> TimeSeries {
        TimeSeries::new(
            "x",
            values.iter().map(|&(y, v)| (d(y, 1, 1), v)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_stepwise_quarterly_linear_scenario() {
        let ts = annual(&[(2018, 100.0), (2019, 110.0), (2020, 121.0)]);
        let out = escalate(
            &ts,
            Frequency::Quarterly,
            InterpolationMethod::Linear,
            &InterpolationOptions::default(),
        )
        .unwrap();

        assert_eq!(out.len(), 9);
        assert_eq!(out.index()[0], d(2018, 1, 1));
        assert_eq!(out.index()[8], d(2020, 1, 1));
        assert_eq!(out.values()[0], 100.0);
        assert_eq!(out.values()[8], 121.0);
        for w in out.values().windows(2) {
            assert!(w[1] > w[0], "expected monotone increase, got {:?}", w);
        }
    }

    #[test]
    fn test_grid_completeness_monthly() {
        let ts = annual(&[(2018, 1.0), (2019, 2.0), (2020, 3.0), (2021, 4.0)]);
        let out = escalate(
            &ts,
            Frequency::Monthly,
            InterpolationMethod::Linear,
            &InterpolationOptions::default(),
        )
        .unwrap();
        let expected = Frequency::Monthly.date_range(d(2018, 1, 1), d(2021, 1, 1));
        assert_eq!(out.index(), expected.as_slice());
        assert_eq!(out.len(), 37);
        assert_eq!(out.count_known(), 37);
    }

    #[test]
    fn test_non_stepwise_matches_grid() {
        let ts = annual(&[(2018, 100.0), (2019, 110.0), (2020, 121.0)]);
        let out = escalate(
            &ts,
            Frequency::Quarterly,
            InterpolationMethod::Linear,
            &InterpolationOptions {
                stepwise: false,
                ..InterpolationOptions::default()
            },
        )
        .unwrap();
        assert_eq!(out.len(), 9);
        assert_eq!(out.values()[0], 100.0);
        assert_eq!(out.values()[8], 121.0);
    }

    #[test]
    fn test_forward_fill_ignores_log_flags() {
        let ts = annual(&[(2018, -5.0), (2019, 3.0), (2020, 7.0)]);
        // Negative values would fail under log_transform, but ffill never
        // reaches the log path.
        let out = escalate(
            &ts,
            Frequency::Quarterly,
            InterpolationMethod::ForwardFill,
            &InterpolationOptions {
                log_transform: true,
                ..InterpolationOptions::default()
            },
        )
        .unwrap();
        assert_eq!(out.len(), 9);
        assert_eq!(out.values()[0], -5.0);
        assert_eq!(out.values()[1], -5.0);
        assert_eq!(out.values()[3], -5.0);
        assert_eq!(out.values()[4], 3.0);
        assert_eq!(out.values()[5], 3.0);
    }

    #[test]
    fn test_log_transform_rejects_non_positive() {
        let ts = annual(&[(2018, 0.0), (2019, 3.0), (2020, 7.0)]);
        let err = escalate(
            &ts,
            Frequency::Quarterly,
            InterpolationMethod::Linear,
            &InterpolationOptions {
                log_transform: true,
                ..InterpolationOptions::default()
            },
        )
        .unwrap_err();
        assert_eq!(err, VarAnalysisError::NonPositiveForLog);
    }

    #[test]
    fn test_log_roundtrip_preserves_known_points() {
        let ts = annual(&[(2018, 100.0), (2019, 110.0), (2020, 121.0)]);
        let out = escalate(
            &ts,
            Frequency::Quarterly,
            InterpolationMethod::Linear,
            &InterpolationOptions {
                log_transform: true,
                ..InterpolationOptions::default()
            },
        )
        .unwrap();
        assert_approx_eq!(out.values()[0], 100.0, 1e-9);
        assert_approx_eq!(out.values()[4], 110.0, 1e-9);
        assert_approx_eq!(out.values()[8], 121.0, 1e-9);
        // Log-space linear interpolation is geometric on the level scale.
        assert_approx_eq!(out.values()[2], (100.0f64 * 110.0).sqrt(), 1e-6);
    }

    #[test]
    fn test_revert_log_false_returns_log_scale() {
        let ts = annual(&[(2018, 100.0), (2019, 110.0), (2020, 121.0)]);
        let out = escalate(
            &ts,
            Frequency::Quarterly,
            InterpolationMethod::Linear,
            &InterpolationOptions {
                log_transform: true,
                revert_log: false,
                ..InterpolationOptions::default()
            },
        )
        .unwrap();
        assert_approx_eq!(out.values()[0], 100.0f64.ln(), 1e-12);
        assert_approx_eq!(out.values()[8], 121.0f64.ln(), 1e-12);
    }

    #[test]
    fn test_higher_order_guard_under_four_points() {
        let ts = annual(&[(2018, 1.0), (2019, 2.0), (2020, 3.0)]);
        for method in [InterpolationMethod::Polynomial, InterpolationMethod::Spline] {
            let err = escalate(
                &ts,
                Frequency::Quarterly,
                method,
                &InterpolationOptions::default(),
            )
            .unwrap_err();
            match err {
                VarAnalysisError::InsufficientPoints {
                    method: m,
                    required,
                    actual,
                } => {
                    assert_eq!(m, method.label());
                    assert_eq!(required, 4);
                    assert_eq!(actual, 3);
                }
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn test_higher_order_succeeds_with_exactly_four_points() {
        let ts = annual(&[(2018, 1.0), (2019, 2.0), (2020, 4.0), (2021, 8.0)]);
        for method in [InterpolationMethod::Polynomial, InterpolationMethod::Spline] {
            let out = escalate(
                &ts,
                Frequency::Quarterly,
                method,
                &InterpolationOptions::default(),
            )
            .unwrap();
            assert_eq!(out.count_known(), out.len());
            assert_eq!(out.values()[0], 1.0);
            assert_eq!(*out.values().last().unwrap(), 8.0);
        }
    }

    #[test]
    fn test_spline_reproduces_knots_exactly() {
        let ts = annual(&[(2015, 2.0), (2016, 5.0), (2017, 3.0), (2018, 8.0), (2019, 6.0)]);
        let out = escalate(
            &ts,
            Frequency::Monthly,
            InterpolationMethod::Spline,
            &InterpolationOptions::default(),
        )
        .unwrap();
        for (date, expected) in ts.index().iter().zip(ts.values()) {
            let pos = out.index().iter().position(|di| di == date).unwrap();
            assert_approx_eq!(out.values()[pos], *expected, 1e-9);
        }
    }

    #[test]
    fn test_quadratic_is_exact_on_parabolas() {
        // y = t^2 on annual knots: a quadratic method should reproduce it.
        let ts = annual(&[(2015, 0.0), (2016, 1.0), (2017, 4.0), (2018, 9.0)]);
        let out = escalate(
            &ts,
            Frequency::Quarterly,
            InterpolationMethod::Polynomial,
            &InterpolationOptions {
                stepwise: false,
                ..InterpolationOptions::default()
            },
        )
        .unwrap();
        // Quarter points sit at fractional years; y should stay close to
        // (years since 2015)^2 up to day-count irregularities.
        for (date, value) in out.index().iter().zip(out.values()) {
            let t = (*date - d(2015, 1, 1)).num_days() as f64 / 365.25;
            assert!((value - t * t).abs() < 0.05, "t={} value={}", t, value);
        }
    }

    #[test]
    fn test_empty_series_rejected() {
        let ts = TimeSeries::new("x", vec![]).unwrap();
        assert!(escalate(
            &ts,
            Frequency::Quarterly,
            InterpolationMethod::Linear,
            &InterpolationOptions::default(),
        )
        .is_err());
    }
}
