//! Pathway x drug rank correlation over shared cell lines

use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;

use crate::data::LabeledMatrix;
use crate::error::{MetageneError, Result};
use crate::stats::{average_ranks, pearson};

/// Spearman correlations between metagene rows and drug-response rows.
///
/// Pathways without sufficient gene-set coverage (sentinel rows) and pathways
/// whose metagene is constant over the shared cell lines are excluded from
/// `matrix` and listed in `dropped`.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    /// Pathways x drugs, coefficients in [-1, 1]; NaN for constant drug rows
    pub matrix: LabeledMatrix,
    /// Pathways excluded from the correlation results
    pub dropped: Vec<String>,
    /// Cell lines the correlations were computed over, in metagene column order
    pub shared_cell_lines: Vec<String>,
}

/// Cell lines present in both matrices, in the metagene matrix's column order
pub fn shared_cell_lines(metagenes: &LabeledMatrix, drugs: &LabeledMatrix) -> Vec<String> {
    metagenes
        .col_ids()
        .iter()
        .filter(|id| drugs.col_index(id).is_some())
        .cloned()
        .collect()
}

fn is_constant(xs: &[f64]) -> bool {
    xs.iter().all(|&x| x == xs[0])
}

/// Correlate every computed metagene row with every drug row.
///
/// `computed` marks which metagene rows hold real scores; the remaining rows
/// are zero sentinels and never reach the correlation step.
pub fn correlate(
    metagenes: &LabeledMatrix,
    computed: &[bool],
    drugs: &LabeledMatrix,
) -> Result<CorrelationMatrix> {
    if computed.len() != metagenes.n_rows() {
        return Err(MetageneError::DimensionMismatch {
            expected: format!("{} eligibility flags", metagenes.n_rows()),
            got: format!("{} eligibility flags", computed.len()),
        });
    }

    let shared = shared_cell_lines(metagenes, drugs);
    if shared.is_empty() {
        return Err(MetageneError::NoSharedCellLines {
            metagene_columns: metagenes.n_cols(),
            drug_columns: drugs.n_cols(),
        });
    }
    if shared.len() < 3 {
        return Err(MetageneError::InvalidInput {
            reason: format!(
                "Only {} cell lines shared between metagene and drug-response matrices; need at least 3",
                shared.len()
            ),
        });
    }
    log::info!(
        "Correlating over {} shared cell lines ({} metagene columns, {} drug columns)",
        shared.len(),
        metagenes.n_cols(),
        drugs.n_cols()
    );

    let metagenes = metagenes.select_columns(&shared)?;
    let drugs = drugs.select_columns(&shared)?;

    let drug_ranks: Vec<Vec<f64>> = (0..drugs.n_rows())
        .map(|d| average_ranks(&drugs.row(d).to_vec()))
        .collect();
    for (d, ranks) in drug_ranks.iter().enumerate() {
        if is_constant(ranks) {
            log::warn!(
                "Drug {} is constant over the shared cell lines; its correlations are undefined",
                drugs.row_ids()[d]
            );
        }
    }

    let rows: Vec<Option<Vec<f64>>> = (0..metagenes.n_rows())
        .into_par_iter()
        .map(|p| {
            if !computed[p] {
                return None;
            }
            let scores = metagenes.row(p).to_vec();
            if is_constant(&scores) {
                return None;
            }
            let ranks = average_ranks(&scores);
            Some(drug_ranks.iter().map(|dr| pearson(&ranks, dr)).collect())
        })
        .collect();

    let mut kept_ids = Vec::new();
    let mut dropped = Vec::new();
    let mut kept_rows = Vec::new();
    for (p, row) in rows.into_iter().enumerate() {
        let id = metagenes.row_ids()[p].clone();
        match row {
            Some(r) => {
                kept_ids.push(id);
                kept_rows.push(r);
            }
            None => dropped.push(id),
        }
    }

    let mut values = Array2::from_elem((kept_rows.len(), drugs.n_rows()), f64::NAN);
    for (i, row) in kept_rows.iter().enumerate() {
        for (j, &r) in row.iter().enumerate() {
            values[[i, j]] = r;
        }
    }

    if !dropped.is_empty() {
        log::info!(
            "{} pathways without sufficient gene-set coverage excluded from correlation results",
            dropped.len()
        );
    }

    Ok(CorrelationMatrix {
        matrix: LabeledMatrix::new(values, kept_ids, drugs.row_ids().to_vec())?,
        dropped,
        shared_cell_lines: shared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_alignment_uses_shared_columns_in_metagene_order() {
        let metagenes = LabeledMatrix::new(
            array![[1.0, 2.0, 3.0, 4.0, 100.0]],
            labels(&["P1"]),
            labels(&["A", "B", "C", "D", "ONLY_EXPR"]),
        )
        .unwrap();
        // same cell lines in a different column order, plus one unique column
        let drugs = LabeledMatrix::new(
            array![[40.0, 30.0, 20.0, 10.0, -5.0]],
            labels(&["Dasatinib"]),
            labels(&["D", "C", "B", "A", "ONLY_DRUG"]),
        )
        .unwrap();
        let corr = correlate(&metagenes, &[true], &drugs).unwrap();
        assert_eq!(corr.shared_cell_lines, labels(&["A", "B", "C", "D"]));
        assert!((corr.matrix.get(0, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sentinel_and_constant_rows_dropped() {
        let metagenes = LabeledMatrix::new(
            array![
                [0.0, 0.0, 0.0, 0.0],
                [0.1, 0.4, 0.2, 0.3],
                [2.0, 2.0, 2.0, 2.0]
            ],
            labels(&["sentinel", "real", "flat"]),
            labels(&["A", "B", "C", "D"]),
        )
        .unwrap();
        let drugs = LabeledMatrix::new(
            array![[1.0, 2.0, 3.0, 4.0], [5.0, 5.0, 5.0, 5.0]],
            labels(&["D1", "Dconst"]),
            labels(&["A", "B", "C", "D"]),
        )
        .unwrap();

        let corr = correlate(&metagenes, &[false, true, true], &drugs).unwrap();
        assert_eq!(corr.matrix.row_ids(), &labels(&["real"])[..]);
        assert_eq!(corr.dropped, labels(&["sentinel", "flat"]));
        assert!((corr.matrix.get(0, 0) - 0.4).abs() < 1e-12);
        assert!(corr.matrix.get(0, 1).is_nan());
    }

    #[test]
    fn test_empty_intersection_is_fatal() {
        let metagenes = LabeledMatrix::zeros(labels(&["P"]), labels(&["A", "B", "C"])).unwrap();
        let drugs = LabeledMatrix::zeros(labels(&["D"]), labels(&["X", "Y", "Z"])).unwrap();
        let err = correlate(&metagenes, &[true], &drugs).unwrap_err();
        assert!(matches!(err, MetageneError::NoSharedCellLines { .. }));
    }
}
