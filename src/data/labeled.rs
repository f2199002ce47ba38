//! Row/column labelled numeric matrix used for every pipeline output

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::expression::first_duplicate;
use crate::error::{MetageneError, Result};

/// A dense matrix with string labels on both axes.
///
/// Metagene matrices (pathways x samples), drug-response matrices
/// (drugs x cell lines) and correlation matrices (pathways x drugs) all use
/// this shape so they can be written by the same tabular writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledMatrix {
    values: Array2<f64>,
    row_ids: Vec<String>,
    col_ids: Vec<String>,
}

impl LabeledMatrix {
    /// Create a labelled matrix; labels must match the shape and be unique per axis
    pub fn new(values: Array2<f64>, row_ids: Vec<String>, col_ids: Vec<String>) -> Result<Self> {
        let (n_rows, n_cols) = values.dim();
        if row_ids.len() != n_rows {
            return Err(MetageneError::DimensionMismatch {
                expected: format!("{} row labels", n_rows),
                got: format!("{} row labels", row_ids.len()),
            });
        }
        if col_ids.len() != n_cols {
            return Err(MetageneError::DimensionMismatch {
                expected: format!("{} column labels", n_cols),
                got: format!("{} column labels", col_ids.len()),
            });
        }
        if let Some(dup) = first_duplicate(&row_ids).or_else(|| first_duplicate(&col_ids)) {
            return Err(MetageneError::InvalidInput {
                reason: format!("Duplicate matrix label '{}'", dup),
            });
        }
        Ok(Self {
            values,
            row_ids,
            col_ids,
        })
    }

    /// Zero-filled matrix with the given labels
    pub fn zeros(row_ids: Vec<String>, col_ids: Vec<String>) -> Result<Self> {
        let values = Array2::zeros((row_ids.len(), col_ids.len()));
        Self::new(values, row_ids, col_ids)
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    pub fn col_ids(&self) -> &[String] {
        &self.col_ids
    }

    pub fn row(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(idx)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[[row, col]]
    }

    pub fn row_index(&self, id: &str) -> Option<usize> {
        self.row_ids.iter().position(|r| r == id)
    }

    pub fn col_index(&self, id: &str) -> Option<usize> {
        self.col_ids.iter().position(|c| c == id)
    }

    /// Look up a value by labels
    pub fn value(&self, row_id: &str, col_id: &str) -> Option<f64> {
        let i = self.row_index(row_id)?;
        let j = self.col_index(col_id)?;
        Some(self.values[[i, j]])
    }

    /// Reorder/subset columns to exactly `col_ids`; every label must exist
    pub fn select_columns(&self, col_ids: &[String]) -> Result<Self> {
        let indices = col_ids
            .iter()
            .map(|id| {
                self.col_index(id).ok_or_else(|| MetageneError::InvalidInput {
                    reason: format!("Column '{}' not present in matrix", id),
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        Self::new(
            self.values.select(Axis(1), &indices),
            self.row_ids.clone(),
            col_ids.to_vec(),
        )
    }

    /// Keep the rows at `indices`, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        let row_ids = indices.iter().map(|&i| self.row_ids[i].clone()).collect();
        Self::new(
            self.values.select(Axis(0), indices),
            row_ids,
            self.col_ids.clone(),
        )
    }

    pub(crate) fn into_parts(self) -> (Array2<f64>, Vec<String>, Vec<String>) {
        (self.values, self.row_ids, self.col_ids)
    }
}
