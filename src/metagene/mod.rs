//! Pathway metagene construction and projection
//!
//! For every eligible pathway the reference cohort is subset to the pathway's
//! genes, standardised per gene and decomposed; the leading right singular
//! vector is the reference metagene. The full cohort is standardised on its
//! own samples and projected through the reference operator, so the larger
//! cohort is scored without refitting the decomposition.
//!
//! Both output matrices have one row per resolved pathway. Rows for pathways
//! that were ineligible or failed stay at the zero sentinel; [`PathwayStatus`]
//! records which rows were actually computed.

mod decompose;

pub use decompose::MetageneBasis;

use ndarray::Array1;
use rayon::prelude::*;
use serde::Serialize;

use crate::data::{ExpressionMatrix, LabeledMatrix, ResolvedPathway};
use crate::error::{MetageneError, Result};
use crate::resolve::DEFAULT_MIN_GENES;
use crate::stats::standardize_rows;

/// Parameters for metagene construction
#[derive(Debug, Clone)]
pub struct MetageneParams {
    /// Minimum resolved gene-set size
    pub min_genes: usize,
    /// Leading singular values at or below this are degenerate
    pub min_singular_value: f64,
}

impl Default for MetageneParams {
    fn default() -> Self {
        Self {
            min_genes: DEFAULT_MIN_GENES,
            min_singular_value: 1e-10,
        }
    }
}

/// Outcome of metagene construction for one pathway
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PathwayStatus {
    /// Metagene rows were computed for both cohorts
    Computed,
    /// Gene set too small; row left at the zero sentinel
    InsufficientGenes { n_genes: usize },
    /// Decomposition did not yield a usable leading component
    Degenerate { reason: String },
    /// Genes of the set are not measured in the full cohort
    MissingInFullCohort { genes: Vec<String> },
}

impl PathwayStatus {
    pub fn is_computed(&self) -> bool {
        matches!(self, PathwayStatus::Computed)
    }
}

/// Metagene matrices for both cohorts plus per-pathway status
#[derive(Debug, Clone)]
pub struct MetageneSet {
    /// Pathways x reference samples
    pub reference: LabeledMatrix,
    /// Pathways x full-cohort samples
    pub full: LabeledMatrix,
    /// One status per pathway row, same order as the matrices
    pub status: Vec<PathwayStatus>,
    /// Fitted bases for computed pathways
    pub bases: Vec<Option<MetageneBasis>>,
}

impl MetageneSet {
    /// Eligibility bitmap: true where the row holds a computed metagene
    pub fn computed_mask(&self) -> Vec<bool> {
        self.status.iter().map(PathwayStatus::is_computed).collect()
    }

    pub fn n_computed(&self) -> usize {
        self.status.iter().filter(|s| s.is_computed()).count()
    }

    /// Ids of pathways whose rows are sentinels, with their status
    pub fn excluded(&self) -> Vec<(&str, &PathwayStatus)> {
        self.full
            .row_ids()
            .iter()
            .zip(self.status.iter())
            .filter(|(_, s)| !s.is_computed())
            .map(|(id, s)| (id.as_str(), s))
            .collect()
    }
}

struct PathwayMetagene {
    basis: MetageneBasis,
    full_scores: Array1<f64>,
}

/// Fit the metagene of one pathway and project the full cohort onto it
fn metagene_for_pathway(
    pathway: &ResolvedPathway,
    reference: &ExpressionMatrix,
    full: &ExpressionMatrix,
    params: &MetageneParams,
) -> std::result::Result<PathwayMetagene, PathwayStatus> {
    let ref_block = reference
        .gene_submatrix(&pathway.genes)
        .map_err(|genes| PathwayStatus::Degenerate {
            reason: format!("{} genes absent from reference cohort", genes.len()),
        })?;
    let full_block = full
        .gene_submatrix(&pathway.genes)
        .map_err(|genes| PathwayStatus::MissingInFullCohort { genes })?;

    let ref_z = standardize_rows(ref_block.view());
    let basis = MetageneBasis::fit(
        &pathway.id,
        pathway.genes.clone(),
        ref_z.view(),
        params.min_singular_value,
    )
    .map_err(|e| PathwayStatus::Degenerate {
        reason: e.to_string(),
    })?;

    // each cohort is centred and scaled on its own samples
    let full_z = standardize_rows(full_block.view());
    let full_scores = basis
        .project(full_z.view())
        .map_err(|e| PathwayStatus::Degenerate {
            reason: e.to_string(),
        })?;

    Ok(PathwayMetagene { basis, full_scores })
}

/// Compute reference and projected full-cohort metagenes for all pathways.
///
/// Work is a parallel map over eligible pathways; results are then written
/// into disjoint rows of zero-initialised matrices. Per-pathway failures are
/// logged and recorded in the status vector, never returned as errors.
pub fn compute_metagenes(
    pathways: &[ResolvedPathway],
    reference: &ExpressionMatrix,
    full: &ExpressionMatrix,
    params: &MetageneParams,
) -> Result<MetageneSet> {
    if reference.n_samples() < 2 {
        return Err(MetageneError::InvalidExpressionMatrix {
            reason: format!(
                "Reference cohort needs at least 2 samples, got {}",
                reference.n_samples()
            ),
        });
    }
    if full.n_samples() == 0 {
        return Err(MetageneError::EmptyData {
            reason: "Full cohort has no samples".to_string(),
        });
    }

    let pathway_ids: Vec<String> = pathways.iter().map(|p| p.id.clone()).collect();
    let mut reference_matrix = LabeledMatrix::zeros(pathway_ids.clone(), reference.sample_ids().to_vec())?;
    let mut full_matrix = LabeledMatrix::zeros(pathway_ids, full.sample_ids().to_vec())?;

    let results: Vec<(usize, std::result::Result<PathwayMetagene, PathwayStatus>)> = pathways
        .par_iter()
        .enumerate()
        .filter(|(_, p)| p.eligible && p.n_genes() >= params.min_genes)
        .map(|(i, p)| (i, metagene_for_pathway(p, reference, full, params)))
        .collect();

    let mut status: Vec<PathwayStatus> = pathways
        .iter()
        .map(|p| PathwayStatus::InsufficientGenes { n_genes: p.n_genes() })
        .collect();
    let mut bases: Vec<Option<MetageneBasis>> = vec![None; pathways.len()];

    {
        let (mut ref_values, ref_rows, ref_cols) = reference_matrix.into_parts();
        let (mut full_values, full_rows, full_cols) = full_matrix.into_parts();

        for (i, result) in results {
            match result {
                Ok(metagene) => {
                    ref_values.row_mut(i).assign(metagene.basis.reference_scores());
                    full_values.row_mut(i).assign(&metagene.full_scores);
                    bases[i] = Some(metagene.basis);
                    status[i] = PathwayStatus::Computed;
                }
                Err(failure) => {
                    log::warn!("Pathway {} excluded from metagenes: {:?}", pathways[i].id, failure);
                    status[i] = failure;
                }
            }
        }

        reference_matrix = LabeledMatrix::new(ref_values, ref_rows, ref_cols)?;
        full_matrix = LabeledMatrix::new(full_values, full_rows, full_cols)?;
    }

    let set = MetageneSet {
        reference: reference_matrix,
        full: full_matrix,
        status,
        bases,
    };
    log::info!(
        "Computed metagenes for {} of {} pathways ({} reference samples, {} full-cohort samples)",
        set.n_computed(),
        pathways.len(),
        reference.n_samples(),
        full.n_samples()
    );
    Ok(set)
}
