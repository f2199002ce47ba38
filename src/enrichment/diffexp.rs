//! Welch two-sample t-test on log-scale expression

use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};

use super::{DeGene, DifferentialExpression, SamplePartition};
use crate::data::ExpressionMatrix;
use crate::error::Result;
use crate::stats::benjamini_hochberg;

/// Welch t-test per gene between the case and control groups.
///
/// The fold change is the difference of group means, which is a log fold
/// change for log-scale input. Genes with zero variance in both groups get
/// NaN statistics and sort last.
#[derive(Debug, Clone, Default)]
pub struct WelchTTest;

fn group_moments(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

/// Two-sided Welch test; returns (difference, t, p)
pub(crate) fn welch(case: &[f64], control: &[f64]) -> (f64, f64, f64) {
    let (m1, v1) = group_moments(case);
    let (m2, v2) = group_moments(control);
    let n1 = case.len() as f64;
    let n2 = control.len() as f64;
    let diff = m1 - m2;

    let se2 = v1 / n1 + v2 / n2;
    if se2.is_nan() || se2 <= 0.0 {
        return (diff, f64::NAN, f64::NAN);
    }
    let t = diff / se2.sqrt();
    let df = se2.powi(2) / ((v1 / n1).powi(2) / (n1 - 1.0) + (v2 / n2).powi(2) / (n2 - 1.0));

    let p = match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * dist.cdf(-t.abs()),
        Err(_) => f64::NAN,
    };
    (diff, t, p)
}

impl DifferentialExpression for WelchTTest {
    fn test(&self, expression: &ExpressionMatrix, partition: &SamplePartition) -> Result<Vec<DeGene>> {
        let (case_idx, control_idx) = partition.indices(expression)?;
        log::info!(
            "Welch t-test: {} '{}' vs {} '{}' samples over {} genes",
            case_idx.len(),
            partition.case(),
            control_idx.len(),
            partition.control(),
            expression.n_genes()
        );

        let values = expression.values();
        let tests: Vec<(f64, f64, f64)> = (0..expression.n_genes())
            .into_par_iter()
            .map(|i| {
                let row = values.row(i);
                let case: Vec<f64> = case_idx.iter().map(|&j| row[j]).collect();
                let control: Vec<f64> = control_idx.iter().map(|&j| row[j]).collect();
                welch(&case, &control)
            })
            .collect();

        let pvalues: Vec<f64> = tests.iter().map(|t| t.2).collect();
        let padj = benjamini_hochberg(&pvalues);

        let mut genes: Vec<DeGene> = expression
            .gene_ids()
            .iter()
            .zip(tests)
            .zip(padj)
            .map(|((gene, (lfc, stat, p)), q)| DeGene {
                gene: gene.clone(),
                log_fold_change: lfc,
                statistic: stat,
                p_value: p,
                adjusted_p: q,
            })
            .collect();

        genes.sort_by(|a, b| match (a.p_value.is_nan(), b.p_value.is_nan()) {
            (false, false) => a.p_value.total_cmp(&b.p_value),
            (a_nan, b_nan) => a_nan.cmp(&b_nan),
        });
        Ok(genes)
    }
}
