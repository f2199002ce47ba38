//! Run summary of a pipeline invocation

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::association::{AssociationIndex, CorrelationMatrix};
use crate::data::ResolvedPathway;
use crate::drug::DrugResponseMatrix;
use crate::error::Result;
use crate::metagene::{MetageneSet, PathwayStatus};

/// A pathway that produced no metagene, and why
#[derive(Debug, Clone, Serialize)]
pub struct ExcludedPathway {
    pub id: String,
    #[serde(flatten)]
    pub status: PathwayStatus,
}

/// Top-level counts of a run, written as `summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub pathways_input: usize,
    pub pathways_eligible: usize,
    /// Pathway member ids with no expression-space counterpart
    pub unmapped_genes: Vec<String>,
    pub pathways_computed: usize,
    pub excluded: Vec<ExcludedPathway>,
    pub reference_samples: usize,
    pub full_samples: usize,
    pub drugs: usize,
    pub drug_cell_lines: usize,
    pub observed_responses: usize,
    pub duplicate_observations: usize,
    pub shared_cell_lines: usize,
    /// Pathway rows left out of the correlation matrix
    pub dropped_rows: Vec<String>,
    pub threshold: f64,
    pub associated_pathways: usize,
    pub associated_drugs: usize,
    pub association_pairs: usize,
}

impl RunSummary {
    pub fn new(
        pathways: &[ResolvedPathway],
        metagenes: &MetageneSet,
        drugs: &DrugResponseMatrix,
        correlations: &CorrelationMatrix,
        index: &AssociationIndex,
    ) -> Self {
        let mut unmapped_genes: Vec<String> = pathways
            .iter()
            .flat_map(|p| p.unmapped.iter().cloned())
            .collect();
        unmapped_genes.sort();
        unmapped_genes.dedup();

        Self {
            pathways_input: pathways.len(),
            pathways_eligible: pathways.iter().filter(|p| p.eligible).count(),
            unmapped_genes,
            pathways_computed: metagenes.n_computed(),
            excluded: metagenes
                .excluded()
                .into_iter()
                .map(|(id, status)| ExcludedPathway {
                    id: id.to_string(),
                    status: status.clone(),
                })
                .collect(),
            reference_samples: metagenes.reference.n_cols(),
            full_samples: metagenes.full.n_cols(),
            drugs: drugs.drugs().len(),
            drug_cell_lines: drugs.cell_lines().len(),
            observed_responses: drugs.n_observed(),
            duplicate_observations: drugs.duplicates().len(),
            shared_cell_lines: correlations.shared_cell_lines.len(),
            dropped_rows: correlations.dropped.clone(),
            threshold: index.threshold,
            associated_pathways: index.by_pathway.len(),
            associated_drugs: index.by_drug.len(),
            association_pairs: index.n_pairs(),
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Metagene Association Summary")?;
        writeln!(f, "============================")?;
        writeln!(
            f,
            "Pathways: {} input, {} eligible, {} computed",
            self.pathways_input, self.pathways_eligible, self.pathways_computed
        )?;
        writeln!(f, "Unmapped gene identifiers: {}", self.unmapped_genes.len())?;
        writeln!(
            f,
            "Samples: {} reference, {} full cohort",
            self.reference_samples, self.full_samples
        )?;
        writeln!(
            f,
            "Drugs: {} over {} cell lines ({} observed, {} duplicates)",
            self.drugs, self.drug_cell_lines, self.observed_responses, self.duplicate_observations
        )?;
        writeln!(f, "Shared cell lines: {}", self.shared_cell_lines)?;
        writeln!(f, "Associations (|r| > {}): {}", self.threshold, self.association_pairs)?;
        writeln!(f, "  Pathways with partners: {}", self.associated_pathways)?;
        writeln!(f, "  Drugs with partners: {}", self.associated_drugs)?;
        Ok(())
    }
}

/// Write any serialisable value as pretty JSON
pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}
