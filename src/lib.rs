//! rust_metagene: pathway metagene projection and drug-response association
//!
//! Pathway gene sets (from differential expression and enrichment results)
//! are summarised as rank-1 "metagenes" on a small reference cohort, projected
//! onto a larger cohort without refitting, and correlated against a drug x cell
//! line response matrix to find pathway/drug associations.
//!
//! # Example
//!
//! ```ignore
//! use rust_metagene::prelude::*;
//!
//! let reference = read_expression_matrix("reference.tsv", true)?;
//! let full = read_expression_matrix("full.tsv", true)?;
//! let pathways = read_pathway_table("pathways.tsv")?;
//! let identifiers = read_identifier_map("identifiers.tsv")?;
//! let observations = read_drug_responses("gdsc.csv", true)?;
//!
//! let inputs = PipelineInputs {
//!     reference,
//!     full,
//!     pathways,
//!     identifiers,
//!     pathway_namespace: GeneNamespace::Entrez,
//!     observations,
//! };
//! let output = run_pipeline(inputs, &PipelineParams::default())?;
//! println!("{}", output.summary);
//! ```

pub mod association;
pub mod cli;
pub mod data;
pub mod drug;
pub mod enrichment;
pub mod error;
pub mod io;
pub mod metagene;
pub mod resolve;
pub mod stats;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::association::{
        associations, correlate, AssociationIndex, AssociationParams, CorrelationMatrix,
    };
    pub use crate::data::{
        canonical_cell_line, ExpressionMatrix, GeneNamespace, IdentifierMap, LabeledMatrix,
        PathwayRecord, ResolvedPathway,
    };
    pub use crate::drug::{build_drug_matrix, DrugObservation, DrugResponseMatrix};
    pub use crate::enrichment::{
        collapse_to_parents, DifferentialExpression, EnrichmentParams, OverRepresentation,
        PathwayEnrichment, SamplePartition, WelchTTest,
    };
    pub use crate::error::{MetageneError, Result};
    pub use crate::io::{
        read_correlation_matrix, read_drug_responses, read_expression_matrix, read_gmt,
        read_hierarchy, read_identifier_map, read_pathway_table, read_sample_groups,
        write_associations, write_json, write_labeled_matrix, RunSummary,
    };
    pub use crate::metagene::{compute_metagenes, MetageneParams, MetageneSet, PathwayStatus};
    pub use crate::resolve::resolve_pathways;
    pub use crate::{run_pipeline, PipelineInputs, PipelineOutput, PipelineParams};
}

use prelude::*;

/// Everything the pipeline consumes, loaded up front
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// Reference cohort used to fit the metagenes
    pub reference: ExpressionMatrix,
    /// Larger cohort the metagenes are projected onto
    pub full: ExpressionMatrix,
    /// Enrichment results, most significant first
    pub pathways: Vec<PathwayRecord>,
    pub identifiers: IdentifierMap,
    /// Namespace of the gene ids in `pathways`
    pub pathway_namespace: GeneNamespace,
    /// Long-format drug responses
    pub observations: Vec<DrugObservation>,
}

/// Pipeline knobs
#[derive(Debug, Clone, Default)]
pub struct PipelineParams {
    pub metagene: MetageneParams,
    pub association: AssociationParams,
    /// Restrict the drug matrix to these drugs; empty keeps all
    pub drugs: Vec<String>,
}

/// Results of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub resolved: Vec<ResolvedPathway>,
    pub metagenes: MetageneSet,
    pub drugs: DrugResponseMatrix,
    pub correlations: CorrelationMatrix,
    pub associations: AssociationIndex,
    pub summary: RunSummary,
}

/// Run resolver, metagene projection, drug matrix builder and association
/// engine in sequence.
///
/// Per-item problems (unmapped ids, undersized or degenerate pathways,
/// duplicate observations) are collected in the summary. Only conditions
/// that make the run meaningless are returned as errors.
pub fn run_pipeline(inputs: PipelineInputs, params: &PipelineParams) -> Result<PipelineOutput> {
    association::validate_threshold(params.association.threshold)?;

    log::info!("Resolving {} pathways...", inputs.pathways.len());
    let resolved = resolve_pathways(
        &inputs.pathways,
        &inputs.identifiers,
        inputs.pathway_namespace,
        &inputs.reference,
        params.metagene.min_genes,
    );

    log::info!(
        "Computing metagenes ({} reference samples, {} full-cohort samples)...",
        inputs.reference.n_samples(),
        inputs.full.n_samples()
    );
    let metagenes = compute_metagenes(&resolved, &inputs.reference, &inputs.full, &params.metagene)?;

    log::info!("Building drug-response matrix from {} observations...", inputs.observations.len());
    let mut drugs = build_drug_matrix(&inputs.observations)?;
    if !params.drugs.is_empty() {
        drugs = drugs.restrict_drugs(&params.drugs)?;
    }

    log::info!("Correlating metagenes with drug responses...");
    let correlations = correlate(&metagenes.full, &metagenes.computed_mask(), drugs.matrix())?;

    let index = associations(&correlations.matrix, params.association.threshold)?;
    log::info!(
        "{} pathway/drug associations with |r| > {}",
        index.n_pairs(),
        index.threshold
    );

    let summary = RunSummary::new(&resolved, &metagenes, &drugs, &correlations, &index);
    Ok(PipelineOutput {
        resolved,
        metagenes,
        drugs,
        correlations,
        associations: index,
        summary,
    })
}
