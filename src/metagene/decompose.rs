//! Rank-1 metagene basis from a singular value decomposition
//!
//! For a standardised gene-set submatrix R (genes x reference samples) with
//! thin SVD R = U S V^T, the reference metagene is the first right singular
//! vector v1. The transformation operator S^-1 U^T maps any standardised
//! sample vector into the reference latent space; only its first row,
//! u1^T / s1, is needed to produce the first latent coordinate. Applying it to
//! R itself gives back v1^T exactly, because U^T U = I.

use nalgebra::DMatrix;
use ndarray::{Array1, ArrayView2};
use serde::Serialize;

use crate::error::{MetageneError, Result};

const SVD_MAX_ITERATIONS: usize = 10_000;

/// First singular triplet of a pathway's reference submatrix
#[derive(Debug, Clone, Serialize)]
pub struct MetageneBasis {
    genes: Vec<String>,
    /// First left singular vector (one loading per gene)
    first_left: Array1<f64>,
    /// Largest singular value
    singular_value: f64,
    /// First right singular vector (one score per reference sample)
    reference_scores: Array1<f64>,
}

impl MetageneBasis {
    /// Fit the basis from a row-standardised genes x samples matrix.
    ///
    /// Fails with [`MetageneError::DegenerateDecomposition`] when the leading
    /// singular value is not finite or does not exceed `min_singular_value`.
    pub fn fit(
        pathway: &str,
        genes: Vec<String>,
        standardized: ArrayView2<'_, f64>,
        min_singular_value: f64,
    ) -> Result<Self> {
        let (n_genes, n_samples) = standardized.dim();
        if genes.len() != n_genes {
            return Err(MetageneError::DimensionMismatch {
                expected: format!("{} genes", n_genes),
                got: format!("{} genes", genes.len()),
            });
        }
        if n_genes == 0 || n_samples < 2 {
            return Err(MetageneError::DegenerateDecomposition {
                pathway: pathway.to_string(),
                reason: format!("{} genes x {} samples is too small", n_genes, n_samples),
            });
        }

        let frobenius = standardized.iter().map(|x| x * x).sum::<f64>().sqrt();
        if !frobenius.is_finite() || frobenius <= min_singular_value {
            return Err(MetageneError::DegenerateDecomposition {
                pathway: pathway.to_string(),
                reason: "gene-set submatrix has no variation".to_string(),
            });
        }

        let r = DMatrix::from_fn(n_genes, n_samples, |i, j| standardized[[i, j]]);
        let svd = r
            .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
            .ok_or_else(|| MetageneError::DegenerateDecomposition {
                pathway: pathway.to_string(),
                reason: format!("SVD did not converge in {} iterations", SVD_MAX_ITERATIONS),
            })?;

        let lead = svd
            .singular_values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, &s)| (k, s));
        let (k, s1) = match lead {
            Some(pair) => pair,
            None => {
                return Err(MetageneError::DegenerateDecomposition {
                    pathway: pathway.to_string(),
                    reason: "decomposition returned no singular values".to_string(),
                })
            }
        };
        if !s1.is_finite() || s1 <= min_singular_value {
            return Err(MetageneError::DegenerateDecomposition {
                pathway: pathway.to_string(),
                reason: format!("leading singular value {:.3e} is degenerate", s1),
            });
        }

        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => {
                return Err(MetageneError::DegenerateDecomposition {
                    pathway: pathway.to_string(),
                    reason: "singular vectors were not computed".to_string(),
                })
            }
        };

        let mut first_left: Array1<f64> = u.column(k).iter().copied().collect();
        let mut reference_scores: Array1<f64> = v_t.row(k).iter().copied().collect();

        // Singular vectors are defined up to sign; orient loadings so the
        // metagene rises with the pathway's average expression.
        if first_left.sum() < 0.0 {
            first_left.mapv_inplace(|x| -x);
            reference_scores.mapv_inplace(|x| -x);
        }

        if reference_scores.iter().any(|x| !x.is_finite()) {
            return Err(MetageneError::DegenerateDecomposition {
                pathway: pathway.to_string(),
                reason: "non-finite reference scores".to_string(),
            });
        }

        Ok(Self {
            genes,
            first_left,
            singular_value: s1,
            reference_scores,
        })
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    /// Gene loadings (first left singular vector)
    pub fn loadings(&self) -> &Array1<f64> {
        &self.first_left
    }

    pub fn singular_value(&self) -> f64 {
        self.singular_value
    }

    /// Reference-cohort metagene row (first right singular vector)
    pub fn reference_scores(&self) -> &Array1<f64> {
        &self.reference_scores
    }

    /// First row of the transformation operator S^-1 U^T
    pub fn operator(&self) -> Array1<f64> {
        &self.first_left / self.singular_value
    }

    /// Project a row-standardised genes x samples matrix (same gene order)
    /// onto the reference metagene axis; one score per sample.
    pub fn project(&self, standardized: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if standardized.nrows() != self.genes.len() {
            return Err(MetageneError::DimensionMismatch {
                expected: format!("{} genes", self.genes.len()),
                got: format!("{} genes", standardized.nrows()),
            });
        }
        Ok(self.operator().dot(&standardized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::standardize_rows;
    use ndarray::{array, Array2};

    fn genes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("G{}", i)).collect()
    }

    fn correlated_block(n_genes: usize, n_samples: usize) -> Array2<f64> {
        Array2::from_shape_fn((n_genes, n_samples), |(i, j)| {
            let signal = (j as f64 * 0.7).sin() * 3.0;
            let noise = ((i * 31 + j * 17) % 11) as f64 * 0.05;
            signal * (1.0 + i as f64 * 0.1) + noise + i as f64
        })
    }

    #[test]
    fn test_reference_scores_are_unit_length() {
        let z = standardize_rows(correlated_block(6, 20).view());
        let basis = MetageneBasis::fit("P", genes(6), z.view(), 1e-10).unwrap();
        assert_eq!(basis.reference_scores().len(), 20);
        let norm: f64 = basis.reference_scores().iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-8);
        assert!(basis.loadings().sum() >= 0.0);
    }

    #[test]
    fn test_projection_round_trip() {
        let z = standardize_rows(correlated_block(7, 15).view());
        let basis = MetageneBasis::fit("P", genes(7), z.view(), 1e-10).unwrap();
        let projected = basis.project(z.view()).unwrap();
        for (a, b) in projected.iter().zip(basis.reference_scores().iter()) {
            assert!((a - b).abs() <= 1e-6 * b.abs().max(1e-3), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_zero_matrix_is_degenerate() {
        let z = Array2::<f64>::zeros((5, 10));
        let err = MetageneBasis::fit("R-HSA-1", genes(5), z.view(), 1e-10).unwrap_err();
        match err {
            MetageneError::DegenerateDecomposition { pathway, .. } => assert_eq!(pathway, "R-HSA-1"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_project_checks_gene_count() {
        let z = standardize_rows(array![[1.0, 2.0, 3.0], [2.0, 1.0, 0.5]].view());
        let basis = MetageneBasis::fit("P", genes(2), z.view(), 1e-10).unwrap();
        let wrong = Array2::<f64>::zeros((3, 4));
        assert!(basis.project(wrong.view()).is_err());
    }
}
