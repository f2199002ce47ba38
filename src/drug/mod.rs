//! Drug-response matrix construction
//!
//! Reshapes long-format (drug, cell line, response) observations into a dense
//! drugs x cell lines matrix.
//!
//! Two conventions are kept deliberately:
//! - an unobserved (drug, cell line) pair is stored as 0.0, the same value a
//!   genuine zero response would have. [`DrugResponseMatrix::observed`]
//!   carries the mask that tells the two apart.
//! - when a pair is observed more than once the first value in input order
//!   wins, and a [`DuplicateObservation`] names the pair.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::data::LabeledMatrix;
use crate::error::{MetageneError, Result};

/// One long-format observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugObservation {
    pub drug: String,
    pub cell_line: String,
    pub response: f64,
}

impl DrugObservation {
    pub fn new(drug: &str, cell_line: &str, response: f64) -> Self {
        Self {
            drug: drug.to_string(),
            cell_line: cell_line.to_string(),
            response,
        }
    }
}

/// Diagnostic for a (drug, cell line) pair observed more than once
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateObservation {
    pub drug: String,
    pub cell_line: String,
    /// Value retained in the matrix (first in input order)
    pub kept: f64,
    /// Later values that were discarded, in input order
    pub discarded: Vec<f64>,
}

/// Dense drugs x cell lines response matrix
#[derive(Debug, Clone)]
pub struct DrugResponseMatrix {
    matrix: LabeledMatrix,
    observed: Array2<bool>,
    duplicates: Vec<DuplicateObservation>,
}

impl DrugResponseMatrix {
    /// Responses; unobserved pairs are 0.0
    pub fn matrix(&self) -> &LabeledMatrix {
        &self.matrix
    }

    /// True where the pair was present in the input
    pub fn observed(&self) -> ArrayView2<'_, bool> {
        self.observed.view()
    }

    pub fn duplicates(&self) -> &[DuplicateObservation] {
        &self.duplicates
    }

    pub fn drugs(&self) -> &[String] {
        self.matrix.row_ids()
    }

    pub fn cell_lines(&self) -> &[String] {
        self.matrix.col_ids()
    }

    /// Number of (drug, cell line) pairs that were observed
    pub fn n_observed(&self) -> usize {
        self.observed.iter().filter(|&&o| o).count()
    }

    /// Keep only the named drugs, in the order given
    pub fn restrict_drugs(&self, drugs: &[String]) -> Result<Self> {
        let indices = drugs
            .iter()
            .map(|d| {
                self.matrix.row_index(d).ok_or_else(|| MetageneError::InvalidInput {
                    reason: format!("Drug '{}' not present in drug-response table", d),
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let matrix = self.matrix.select_rows(&indices)?;
        let observed = self.observed.select(ndarray::Axis(0), &indices);
        let duplicates = self
            .duplicates
            .iter()
            .filter(|d| drugs.contains(&d.drug))
            .cloned()
            .collect();
        Ok(Self {
            matrix,
            observed,
            duplicates,
        })
    }
}

/// Index of `name` in `order`, appending it on first sight
fn intern(name: &str, order: &mut Vec<String>, index: &mut HashMap<String, usize>) -> usize {
    if let Some(&i) = index.get(name) {
        return i;
    }
    let i = order.len();
    order.push(name.to_string());
    index.insert(name.to_string(), i);
    i
}

/// Build the dense matrix from long-format observations.
///
/// Drugs and cell lines are ordered by first appearance. Duplicate
/// diagnostics are ordered by drug, then cell line, and each one is also
/// logged as a warning.
pub fn build_drug_matrix(records: &[DrugObservation]) -> Result<DrugResponseMatrix> {
    if records.is_empty() {
        return Err(MetageneError::EmptyData {
            reason: "No drug-response observations".to_string(),
        });
    }

    let mut drugs: Vec<String> = Vec::new();
    let mut cell_lines: Vec<String> = Vec::new();
    let mut drug_index: HashMap<String, usize> = HashMap::new();
    let mut line_index: HashMap<String, usize> = HashMap::new();

    // (drug, line) -> every value in input order
    let mut cells: HashMap<(usize, usize), Vec<f64>> = HashMap::new();

    for (row, rec) in records.iter().enumerate() {
        if !rec.response.is_finite() {
            return Err(MetageneError::InvalidDrugResponse {
                reason: format!(
                    "Non-finite response for ({}, {}) at record {}",
                    rec.drug,
                    rec.cell_line,
                    row + 1
                ),
            });
        }
        let d = intern(&rec.drug, &mut drugs, &mut drug_index);
        let c = intern(&rec.cell_line, &mut cell_lines, &mut line_index);
        cells.entry((d, c)).or_default().push(rec.response);
    }

    let mut values = Array2::zeros((drugs.len(), cell_lines.len()));
    let mut observed = Array2::from_elem((drugs.len(), cell_lines.len()), false);
    let mut keys: Vec<(usize, usize)> = cells.keys().copied().collect();
    keys.sort_unstable();

    let mut duplicates = Vec::new();
    for (d, c) in keys {
        let seen = &cells[&(d, c)];
        values[[d, c]] = seen[0];
        observed[[d, c]] = true;
        if seen.len() > 1 {
            log::warn!(
                "Multiple responses for drug '{}' in cell line '{}': keeping {}, discarding {:?}",
                drugs[d],
                cell_lines[c],
                seen[0],
                &seen[1..]
            );
            duplicates.push(DuplicateObservation {
                drug: drugs[d].clone(),
                cell_line: cell_lines[c].clone(),
                kept: seen[0],
                discarded: seen[1..].to_vec(),
            });
        }
    }

    let matrix = LabeledMatrix::new(values, drugs, cell_lines)?;
    log::info!(
        "Drug-response matrix: {} drugs x {} cell lines, {} observed pairs, {} duplicated pairs",
        matrix.n_rows(),
        matrix.n_cols(),
        observed.iter().filter(|&&o| o).count(),
        duplicates.len()
    );

    Ok(DrugResponseMatrix {
        matrix,
        observed,
        duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_wins_with_diagnostic() {
        let records = vec![
            DrugObservation::new("DrugA", "Line1", 0.9),
            DrugObservation::new("DrugA", "Line1", 0.5),
            DrugObservation::new("DrugB", "Line2", 0.3),
        ];
        let built = build_drug_matrix(&records).unwrap();
        let m = built.matrix();

        assert_eq!(m.value("DrugA", "Line1"), Some(0.9));
        assert_eq!(m.value("DrugA", "Line2"), Some(0.0));
        assert_eq!(m.value("DrugB", "Line1"), Some(0.0));
        assert_eq!(m.value("DrugB", "Line2"), Some(0.3));

        assert_eq!(
            built.duplicates(),
            &[DuplicateObservation {
                drug: "DrugA".to_string(),
                cell_line: "Line1".to_string(),
                kept: 0.9,
                discarded: vec![0.5],
            }]
        );
    }

    #[test]
    fn test_observed_mask_separates_sentinel_from_zero() {
        let records = vec![
            DrugObservation::new("Dasatinib", "K562", 0.0),
            DrugObservation::new("Imatinib", "HL60", 0.4),
        ];
        let built = build_drug_matrix(&records).unwrap();
        let obs = built.observed();
        assert!(obs[[0, 0]]);
        assert!(!obs[[0, 1]]);
        assert_eq!(built.matrix().get(0, 0), built.matrix().get(0, 1));
        assert_eq!(built.n_observed(), 2);
    }

    #[test]
    fn test_builder_is_idempotent() {
        let records = vec![
            DrugObservation::new("D2", "L3", 1.0),
            DrugObservation::new("D1", "L1", 2.0),
            DrugObservation::new("D1", "L1", 3.0),
            DrugObservation::new("D2", "L3", 4.0),
            DrugObservation::new("D1", "L2", 5.0),
        ];
        let a = build_drug_matrix(&records).unwrap();
        let b = build_drug_matrix(&records).unwrap();
        assert_eq!(a.matrix(), b.matrix());
        assert_eq!(a.duplicates(), b.duplicates());
        assert_eq!(a.drugs(), &["D2".to_string(), "D1".to_string()]);
        // diagnostics ordered by drug row then cell-line column
        assert_eq!(a.duplicates()[0].drug, "D2");
        assert_eq!(a.duplicates()[1].drug, "D1");
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(build_drug_matrix(&[]).is_err());
        let records = vec![DrugObservation::new("D", "L", f64::NAN)];
        assert!(build_drug_matrix(&records).is_err());
    }

    #[test]
    fn test_restrict_drugs() {
        let records = vec![
            DrugObservation::new("D1", "L1", 1.0),
            DrugObservation::new("D2", "L1", 2.0),
            DrugObservation::new("D2", "L1", 2.5),
        ];
        let built = build_drug_matrix(&records).unwrap();
        let only = built.restrict_drugs(&["D2".to_string()]).unwrap();
        assert_eq!(only.drugs(), &["D2".to_string()]);
        assert_eq!(only.duplicates().len(), 1);
        assert!(built.restrict_drugs(&["D9".to_string()]).is_err());
    }
}
