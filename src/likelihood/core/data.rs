//! Empirical count data: raw column tables and the sparse data tensor.
//!
//! Purpose
//! -------
//! Turn single-cell measurements into the sparse count tensor the likelihood
//! engine scores against. Each row of a [`DataTable`] is one measured cell;
//! the [`DataTensor`] bins rows by measurement time and counts how many
//! cells were observed in each observed-species state.
//!
//! Key behaviors
//! -------------
//! - Locate the single time column by name at load time; a missing or
//!   ambiguous time column is a fatal configuration error.
//! - Resolve observed columns through the [`SpeciesLink`], in model order.
//! - Require every measured value to be a finite non-negative integer.
//! - Record the tensor extent per observed axis (`max count + 1` over all
//!   rows), which is the shape model tensors are aligned to.
//!
//! Invariants & assumptions
//! ------------------------
//! - Time bins are sorted ascending and unique.
//! - Every state stored in a [`TimeSlice`] lies inside the tensor extent.
//! - The tensor is immutable once built and is shared read-only by every
//!   evaluation of a fitting session.
use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn};

use crate::likelihood::{
    core::species_link::SpeciesLink,
    errors::{LikResult, LikelihoodError},
};

/// Raw column-oriented measurements, one row per measured cell.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl DataTable {
    /// # Errors
    /// - [`LikelihoodError::EmptyData`] if there are no rows.
    /// - [`LikelihoodError::RaggedRow`] if a row length differs from the
    ///   header length.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> LikResult<Self> {
        if rows.is_empty() {
            return Err(LikelihoodError::EmptyData);
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != columns.len() {
                return Err(LikelihoodError::RaggedRow {
                    row,
                    expected: columns.len(),
                    found: values.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Cell counts observed at one measurement time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlice {
    time: f64,
    counts: BTreeMap<Vec<usize>, u64>,
    n_cells: u64,
}

impl TimeSlice {
    pub fn new(time: f64, counts: BTreeMap<Vec<usize>, u64>) -> Self {
        let n_cells = counts.values().sum();
        Self { time, counts, n_cells }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Non-zero cells: observed state → number of cells.
    pub fn counts(&self) -> &BTreeMap<Vec<usize>, u64> {
        &self.counts
    }

    pub fn n_cells(&self) -> u64 {
        self.n_cells
    }
}

/// Sparse tensor over (time bin, observed species counts…).
#[derive(Debug, Clone, PartialEq)]
pub struct DataTensor {
    extent: Vec<usize>,
    slices: Vec<TimeSlice>,
}

impl DataTensor {
    /// Build the tensor from a measurement table.
    ///
    /// # Errors
    /// - [`LikelihoodError::MissingTimeColumn`] /
    ///   [`LikelihoodError::AmbiguousTimeColumn`] from [`find_time_column`].
    /// - [`LikelihoodError::MissingDataColumn`] if a linked column is absent.
    /// - [`LikelihoodError::NonFiniteTime`] or
    ///   [`LikelihoodError::InvalidMeasurement`] for malformed rows, including
    ///   counts above [`MAX_COUNT`].
    pub fn from_table(table: &DataTable, link: &SpeciesLink) -> LikResult<Self> {
        let time_col = find_time_column(table.columns())?;
        let observed: Vec<(usize, &str)> = link
            .data_columns()
            .into_iter()
            .map(|name| {
                table
                    .column_index(name)
                    .map(|i| (i, name))
                    .ok_or_else(|| LikelihoodError::MissingDataColumn { column: name.to_string() })
            })
            .collect::<LikResult<_>>()?;

        let mut extent = vec![0usize; observed.len()];
        let mut binned: Vec<(f64, Vec<usize>)> = Vec::with_capacity(table.rows().len());
        for (row, values) in table.rows().iter().enumerate() {
            let time = values[time_col];
            if !time.is_finite() {
                return Err(LikelihoodError::NonFiniteTime { row, value: time });
            }
            let mut state = Vec::with_capacity(observed.len());
            for (axis, &(col, name)) in observed.iter().enumerate() {
                let count = parse_count(values[col], row, name)?;
                let upper = count.checked_add(1).ok_or_else(|| {
                    LikelihoodError::InvalidMeasurement {
                        row,
                        column: name.to_string(),
                        value: values[col],
                        reason: "Count overflows the tensor extent.",
                    }
                })?;
                extent[axis] = extent[axis].max(upper);
                state.push(count);
            }
            binned.push((time, state));
        }

        binned.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut slices: Vec<TimeSlice> = Vec::new();
        let mut current: Option<(f64, BTreeMap<Vec<usize>, u64>)> = None;
        for (time, state) in binned {
            if let Some((_, counts)) = current.as_mut().filter(|(t, _)| *t == time) {
                *counts.entry(state).or_insert(0) += 1;
                continue;
            }
            if let Some((t, counts)) = current.take() {
                slices.push(TimeSlice::new(t, counts));
            }
            let mut counts = BTreeMap::new();
            counts.insert(state, 1);
            current = Some((time, counts));
        }
        if let Some((t, counts)) = current {
            slices.push(TimeSlice::new(t, counts));
        }
        Ok(Self { extent, slices })
    }

    /// Build the tensor from pre-binned slices.
    ///
    /// Slices are sorted by time; equal times are not merged and are
    /// rejected.
    ///
    /// # Errors
    /// - [`LikelihoodError::EmptyData`] if `slices` is empty.
    /// - [`LikelihoodError::NonFiniteTime`] for a non-finite time.
    /// - [`LikelihoodError::DuplicateTime`] for a repeated time.
    /// - [`LikelihoodError::AxisCountMismatch`] if a state has the wrong
    ///   number of axes.
    /// - [`LikelihoodError::InvalidMeasurement`] if a state lies outside
    ///   `extent`.
    pub fn from_slices(extent: Vec<usize>, mut slices: Vec<TimeSlice>) -> LikResult<Self> {
        if slices.is_empty() {
            return Err(LikelihoodError::EmptyData);
        }
        slices.sort_by(|a, b| a.time.total_cmp(&b.time));
        for (row, slice) in slices.iter().enumerate() {
            if !slice.time.is_finite() {
                return Err(LikelihoodError::NonFiniteTime { row, value: slice.time });
            }
            if row > 0 && slices[row - 1].time == slice.time {
                return Err(LikelihoodError::DuplicateTime { value: slice.time });
            }
            for state in slice.counts.keys() {
                if state.len() != extent.len() {
                    return Err(LikelihoodError::AxisCountMismatch {
                        model: state.len(),
                        data: extent.len(),
                    });
                }
                if let Some((axis, &x)) =
                    state.iter().enumerate().find(|&(a, &x)| x >= extent[a])
                {
                    return Err(LikelihoodError::InvalidMeasurement {
                        row,
                        column: format!("axis {axis}"),
                        value: x as f64,
                        reason: "State lies outside the declared tensor extent.",
                    });
                }
            }
        }
        Ok(Self { extent, slices })
    }

    /// Extent per observed axis.
    pub fn extent(&self) -> &[usize] {
        &self.extent
    }

    pub fn ndim(&self) -> usize {
        self.extent.len()
    }

    pub fn n_times(&self) -> usize {
        self.slices.len()
    }

    pub fn times(&self) -> Vec<f64> {
        self.slices.iter().map(|s| s.time).collect()
    }

    pub fn slice(&self, index: usize) -> Option<&TimeSlice> {
        self.slices.get(index)
    }

    pub fn slices(&self) -> &[TimeSlice] {
        &self.slices
    }

    /// Dense count array of one time bin, shaped by the tensor extent.
    pub fn dense_counts(&self, index: usize) -> LikResult<ArrayD<f64>> {
        let slice = self.slices.get(index).ok_or(LikelihoodError::FitTimeOutOfRange {
            index,
            len: self.slices.len(),
        })?;
        let mut dense = ArrayD::<f64>::zeros(IxDyn(&self.extent));
        for (state, &n) in &slice.counts {
            dense[IxDyn(state)] = n as f64;
        }
        Ok(dense)
    }
}

/// Locate the unique time column (case-insensitive name containing "time").
///
/// # Errors
/// - [`LikelihoodError::MissingTimeColumn`] if no column qualifies.
/// - [`LikelihoodError::AmbiguousTimeColumn`] if several columns qualify.
pub fn find_time_column(columns: &[String]) -> LikResult<usize> {
    let candidates: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.to_lowercase().contains("time"))
        .map(|(i, _)| i)
        .collect();
    match candidates.as_slice() {
        [] => Err(LikelihoodError::MissingTimeColumn { columns: columns.to_vec() }),
        [single] => Ok(*single),
        many => Err(LikelihoodError::AmbiguousTimeColumn {
            candidates: many.iter().map(|&i| columns[i].clone()).collect(),
        }),
    }
}

/// Largest count accepted for a single observed species.
///
/// Model tensors are aligned densely to the data extent, so the bound keeps
/// one axis at a few megabytes.
pub const MAX_COUNT: usize = 1 << 20;

// ---- Helper methods ----

fn parse_count(value: f64, row: usize, column: &str) -> LikResult<usize> {
    let reason = if !value.is_finite() {
        "Counts must be finite."
    } else if value < 0.0 {
        "Counts must be non-negative."
    } else if value.fract() != 0.0 {
        "Counts must be integers."
    } else if value > MAX_COUNT as f64 {
        "Count exceeds the largest supported copy number."
    } else {
        return Ok(value as usize);
    };
    Err(LikelihoodError::InvalidMeasurement { row, column: column.to_string(), value, reason })
}
