//! Expression matrix representation (genes x samples)

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{MetageneError, Result};

/// Return the first identifier that occurs more than once, if any
pub(crate) fn first_duplicate(ids: &[String]) -> Option<&str> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(ids.len());
    ids.iter().map(|s| s.as_str()).find(|id| !seen.insert(id))
}

/// A normalized, log-scale expression matrix
/// Rows are genes (stable transcript IDs), columns are samples (cell lines)
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    /// Expression values (genes x samples)
    values: Array2<f64>,
    /// Gene identifiers
    gene_ids: Vec<String>,
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Gene identifier -> row index
    gene_index: HashMap<String, usize>,
}

impl ExpressionMatrix {
    /// Create a new expression matrix, validating shape, uniqueness and finiteness
    pub fn new(values: Array2<f64>, gene_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (n_genes, n_samples) = values.dim();

        if gene_ids.len() != n_genes {
            return Err(MetageneError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(MetageneError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if let Some(dup) = first_duplicate(&gene_ids) {
            return Err(MetageneError::InvalidExpressionMatrix {
                reason: format!("Duplicate gene ID '{}'", dup),
            });
        }

        if let Some(dup) = first_duplicate(&sample_ids) {
            return Err(MetageneError::InvalidExpressionMatrix {
                reason: format!("Duplicate sample ID '{}'", dup),
            });
        }

        if values.iter().any(|x| !x.is_finite()) {
            return Err(MetageneError::InvalidExpressionMatrix {
                reason: "Expression values must be finite".to_string(),
            });
        }

        let gene_index = gene_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        Ok(Self {
            values,
            gene_ids,
            sample_ids,
            gene_index,
        })
    }

    /// Get the number of genes
    pub fn n_genes(&self) -> usize {
        self.values.nrows()
    }

    /// Get the number of samples
    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// Get the expression values as a view
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Get gene IDs
    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get gene index by ID
    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.gene_index.get(gene_id).copied()
    }

    /// Check whether a gene is present
    pub fn contains_gene(&self, gene_id: &str) -> bool {
        self.gene_index.contains_key(gene_id)
    }

    /// Extract the rows for `genes`, in the given order.
    ///
    /// Returns the genes that are absent from this matrix as the error side so
    /// callers can report them per pathway.
    pub fn gene_submatrix(&self, genes: &[String]) -> std::result::Result<Array2<f64>, Vec<String>> {
        let mut indices = Vec::with_capacity(genes.len());
        let mut missing = Vec::new();
        for gene in genes {
            match self.gene_index(gene) {
                Some(i) => indices.push(i),
                None => missing.push(gene.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        Ok(self.values.select(Axis(0), &indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn test_expression_matrix_creation() {
        let values = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let matrix = ExpressionMatrix::new(values, ids("ENSG", 2), ids("LINE", 3)).unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.n_samples(), 3);
        assert_eq!(matrix.gene_index("ENSG2"), Some(1));
        assert_eq!(matrix.sample_ids()[2], "LINE3");
    }

    #[test]
    fn test_duplicate_samples_rejected() {
        let values = array![[1.0, 2.0]];
        let samples = vec!["A".to_string(), "A".to_string()];
        assert!(ExpressionMatrix::new(values, ids("ENSG", 1), samples).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let values = array![[1.0, f64::NAN]];
        assert!(ExpressionMatrix::new(values, ids("ENSG", 1), ids("LINE", 2)).is_err());
    }

    #[test]
    fn test_gene_submatrix_order_and_missing() {
        let values = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let matrix = ExpressionMatrix::new(values, ids("G", 3), ids("S", 2)).unwrap();

        let sub = matrix
            .gene_submatrix(&["G3".to_string(), "G1".to_string()])
            .unwrap();
        assert_eq!(sub, array![[5.0, 6.0], [1.0, 2.0]]);

        let missing = matrix
            .gene_submatrix(&["G1".to_string(), "G9".to_string()])
            .unwrap_err();
        assert_eq!(missing, vec!["G9".to_string()]);
    }
}
