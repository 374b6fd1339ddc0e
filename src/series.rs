//! Date-indexed series containers and the frequency escalation ladder.
//!
//! `TimeSeries` is a univariate series with a strictly increasing
//! `NaiveDate` index; `MultivariateSeries` holds several variables on one
//! shared index. All period grids use the period-start convention (Jan 1,
//! quarter starts, month firsts), so a coarser grid always nests inside a
//! finer one and reindexing never discards observations.

use chrono::{Datelike, Duration, NaiveDate};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{VarAnalysisError, VarResult};

/// Label under which the date index is exported, uniform across outputs.
pub const DATE_INDEX_LABEL: &str = "date";

/// Sampling frequency of a series, ordered from coarsest to finest.
///
/// The four variants form the escalation ladder used by the interpolator:
/// Annual → Quarterly → Monthly → Daily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Frequency {
    /// One observation per year (January 1st grid).
    Annual,
    /// One observation per quarter (Jan/Apr/Jul/Oct 1st grid).
    Quarterly,
    /// One observation per month (first-of-month grid).
    Monthly,
    /// One observation per calendar day.
    Daily,
}

impl Frequency {
    /// The escalation ladder in increasing granularity.
    pub const LADDER: [Frequency; 4] = [
        Frequency::Annual,
        Frequency::Quarterly,
        Frequency::Monthly,
        Frequency::Daily,
    ];

    /// Position of this frequency on the ladder (Annual = 0).
    pub fn ladder_position(self) -> usize {
        match self {
            Frequency::Annual => 0,
            Frequency::Quarterly => 1,
            Frequency::Monthly => 2,
            Frequency::Daily => 3,
        }
    }

    /// Parse a pandas-style frequency label.
    ///
    /// Accepts `"A"`, `"Q"`, `"M"`, `"D"` (case-insensitive) and the spelled
    /// out names.
    pub fn parse(label: &str) -> VarResult<Self> {
        match label.to_ascii_uppercase().as_str() {
            "A" | "ANNUAL" | "Y" | "YEARLY" => Ok(Frequency::Annual),
            "Q" | "QUARTERLY" => Ok(Frequency::Quarterly),
            "M" | "MONTHLY" => Ok(Frequency::Monthly),
            "D" | "DAILY" => Ok(Frequency::Daily),
            other => Err(VarAnalysisError::InvalidFrequency {
                frequency: other.to_string(),
            }),
        }
    }

    /// Complete date grid between `start` and `end` inclusive.
    ///
    /// The grid runs from the first period start at or after `start` to the
    /// last period start at or before `end`. For `Daily` every calendar day
    /// in the range is a grid point.
    pub fn date_range(self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut grid = Vec::new();
        if end < start {
            return grid;
        }
        match self {
            Frequency::Daily => {
                let mut d = start;
                while d <= end {
                    grid.push(d);
                    d = d + Duration::days(1);
                }
            }
            Frequency::Monthly => {
                let mut d = next_month_start(start);
                while d <= end {
                    grid.push(d);
                    d = add_months(d, 1);
                }
            }
            Frequency::Quarterly => {
                let mut d = next_month_start(start);
                while (d.month() - 1) % 3 != 0 {
                    d = add_months(d, 1);
                }
                while d <= end {
                    grid.push(d);
                    d = add_months(d, 3);
                }
            }
            Frequency::Annual => {
                let mut year = if start == year_start(start.year()) {
                    start.year()
                } else {
                    start.year() + 1
                };
                while year_start(year) <= end {
                    grid.push(year_start(year));
                    year += 1;
                }
            }
        }
        grid
    }

    /// Infer the frequency of a date index from the spacing of consecutive
    /// points. Returns `None` when the index is too short or the spacing
    /// does not match any ladder step.
    pub fn infer(index: &[NaiveDate]) -> Option<Frequency> {
        if index.len() < 2 {
            return None;
        }
        let gaps: Vec<i64> = index
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days())
            .collect();
        let classify = |days: i64| -> Option<Frequency> {
            match days {
                1 => Some(Frequency::Daily),
                28..=31 => Some(Frequency::Monthly),
                89..=92 => Some(Frequency::Quarterly),
                365..=366 => Some(Frequency::Annual),
                _ => None,
            }
        };
        let first = classify(gaps[0])?;
        if gaps.iter().all(|&g| classify(g) == Some(first)) {
            Some(first)
        } else {
            None
        }
    }
}

fn year_start(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).expect("January 1st always exists")
}

fn next_month_start(date: NaiveDate) -> NaiveDate {
    if date.day() == 1 {
        date
    } else {
        add_months(
            NaiveDate::from_ymd_opt(date.year(), date.month(), 1).expect("month start exists"),
            1,
        )
    }
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.month0() + months;
    let year = date.year() + (total / 12) as i32;
    let month = total % 12 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).expect("month start exists")
}

/// A univariate time series with a strictly increasing date index.
///
/// Values may be NaN; NaN slots mark missing observations created by
/// reindexing onto a finer grid. The index field is uniformly named "date"
/// in exported form.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeSeries {
    name: String,
    index: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series from (date, value) pairs. Pairs are sorted by date;
    /// duplicate dates are rejected.
    pub fn new(name: impl Into<String>, mut points: Vec<(NaiveDate, f64)>) -> VarResult<Self> {
        points.sort_by_key(|(d, _)| *d);
        for w in points.windows(2) {
            if w[0].0 == w[1].0 {
                return Err(VarAnalysisError::InvalidParameter {
                    parameter: "index".to_string(),
                    value: w[0].0.year() as f64,
                    constraint: "strictly increasing timestamps without duplicates".to_string(),
                });
            }
        }
        let (index, values) = points.into_iter().unzip();
        Ok(TimeSeries {
            name: name.into(),
            index,
            values,
        })
    }

    /// Build a series from an already sorted index and matching values.
    pub fn from_parts(
        name: impl Into<String>,
        index: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> VarResult<Self> {
        if index.len() != values.len() {
            return Err(VarAnalysisError::DimensionMismatch {
                expected: index.len(),
                actual: values.len(),
            });
        }
        let points: Vec<(NaiveDate, f64)> = index.into_iter().zip(values).collect();
        Self::new(name, points)
    }

    /// Variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Date index, sorted ascending.
    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    /// Observation values, parallel to the index.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of observations, including NaN slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Earliest date in the index.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.index.first().copied()
    }

    /// Latest date in the index.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }

    /// Number of non-NaN observations.
    pub fn count_known(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Reindex onto a new date grid. Dates present in the current index
    /// keep their values; new dates are filled with NaN.
    pub fn reindex(&self, grid: &[NaiveDate]) -> TimeSeries {
        let values = grid
            .iter()
            .map(|d| match self.index.binary_search(d) {
                Ok(pos) => self.values[pos],
                Err(_) => f64::NAN,
            })
            .collect();
        TimeSeries {
            name: self.name.clone(),
            index: grid.to_vec(),
            values,
        }
    }

    /// Apply a function to every value, keeping the index.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> TimeSeries {
        TimeSeries {
            name: self.name.clone(),
            index: self.index.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Replace the values, keeping name and index.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> TimeSeries {
        debug_assert_eq!(values.len(), self.index.len());
        TimeSeries {
            name: self.name.clone(),
            index: self.index.clone(),
            values,
        }
    }
}

/// Several variables sharing one aligned date index.
///
/// Column order is the variable ordering used by every downstream matrix:
/// VAR coefficient rows/columns, IRF and FEVD axes all follow it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultivariateSeries {
    names: Vec<String>,
    index: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl MultivariateSeries {
    /// Assemble from univariate series that already share an identical
    /// index. A differing index is a caller bug surfaced as
    /// `DimensionMismatch`.
    pub fn from_columns(series: Vec<TimeSeries>) -> VarResult<Self> {
        let first = series.first().ok_or(VarAnalysisError::InsufficientData {
            required: 1,
            actual: 0,
        })?;
        let index = first.index.clone();
        let mut names = Vec::with_capacity(series.len());
        let mut columns = Vec::with_capacity(series.len());
        for s in &series {
            if s.index != index {
                return Err(VarAnalysisError::DimensionMismatch {
                    expected: index.len(),
                    actual: s.index.len(),
                });
            }
            if names.contains(&s.name) {
                return Err(VarAnalysisError::InvalidParameter {
                    parameter: "names".to_string(),
                    value: 0.0,
                    constraint: format!("unique variable names, '{}' repeats", s.name),
                });
            }
            names.push(s.name.clone());
            columns.push(s.values.clone());
        }
        Ok(MultivariateSeries {
            names,
            index,
            columns,
        })
    }

    /// Variable names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Shared date index.
    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.names.len()
    }

    /// Number of rows (observations).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Column values for a named variable.
    pub fn column(&self, name: &str) -> VarResult<&[f64]> {
        let pos = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| VarAnalysisError::VariableNotFound {
                name: name.to_string(),
            })?;
        Ok(&self.columns[pos])
    }

    /// Column values by position.
    pub fn column_at(&self, pos: usize) -> &[f64] {
        &self.columns[pos]
    }

    /// Replace one column's values, keeping everything else.
    pub(crate) fn set_column(&mut self, pos: usize, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.index.len());
        self.columns[pos] = values;
    }

    /// One observation row in column order.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[i]).collect()
    }

    /// Row-major matrix of all observations.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.len()).map(|i| self.row(i)).collect()
    }

    /// Drop every row in which any variable is NaN. Rows are dropped
    /// jointly so the index stays aligned across variables.
    pub fn drop_nan_rows(&self) -> MultivariateSeries {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.columns.iter().all(|c| !c[i].is_nan()))
            .collect();
        MultivariateSeries {
            names: self.names.clone(),
            index: keep.iter().map(|&i| self.index[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| keep.iter().map(|&i| c[i]).collect())
                .collect(),
        }
    }

    /// Split into `(first, second)` where `first` holds rows `0..row`.
    pub fn split_at(&self, row: usize) -> (MultivariateSeries, MultivariateSeries) {
        let row = row.min(self.len());
        let head = MultivariateSeries {
            names: self.names.clone(),
            index: self.index[..row].to_vec(),
            columns: self.columns.iter().map(|c| c[..row].to_vec()).collect(),
        };
        let tail = MultivariateSeries {
            names: self.names.clone(),
            index: self.index[row..].to_vec(),
            columns: self.columns.iter().map(|c| c[row..].to_vec()).collect(),
        };
        (head, tail)
    }
}
