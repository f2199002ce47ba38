//! Pathway gene-set resolution
//!
//! Translates each enriched pathway's member genes into the expression
//! matrix's namespace and decides which pathways carry enough genes for a
//! metagene. Pathway order from the enrichment table (sorted by significance)
//! is preserved, and so is gene order within a pathway: everything iterates
//! over `Vec`s, never over hash maps.

use crate::data::{ExpressionMatrix, GeneNamespace, IdentifierMap, PathwayRecord, ResolvedPathway};

/// Minimum number of resolved genes for a pathway to get a metagene (more than 4)
pub const DEFAULT_MIN_GENES: usize = 5;

/// Resolve `records` against the reference expression matrix.
///
/// * unmapped identifiers are dropped and listed in `unmapped`
/// * translated identifiers missing from `expression` are dropped and listed
///   in `not_in_expression`
/// * a pathway is `eligible` when at least `min_genes` genes survive; ineligible
///   pathways stay in the output so downstream stages can report them
pub fn resolve_pathways(
    records: &[PathwayRecord],
    mapper: &IdentifierMap,
    from: GeneNamespace,
    expression: &ExpressionMatrix,
    min_genes: usize,
) -> Vec<ResolvedPathway> {
    let resolved: Vec<ResolvedPathway> = records
        .iter()
        .map(|record| resolve_one(record, mapper, from, expression, min_genes))
        .collect();

    let n_eligible = resolved.iter().filter(|p| p.eligible).count();
    log::info!(
        "Resolved {} pathways: {} eligible (>= {} genes), {} undersized",
        resolved.len(),
        n_eligible,
        min_genes,
        resolved.len() - n_eligible
    );

    resolved
}

fn resolve_one(
    record: &PathwayRecord,
    mapper: &IdentifierMap,
    from: GeneNamespace,
    expression: &ExpressionMatrix,
    min_genes: usize,
) -> ResolvedPathway {
    let mapping = mapper.map(&record.genes, from, GeneNamespace::Ensembl);

    let mut genes = Vec::new();
    let mut not_in_expression = Vec::new();
    for target in mapping.targets() {
        if expression.contains_gene(&target) {
            genes.push(target);
        } else {
            not_in_expression.push(target);
        }
    }

    let eligible = genes.len() >= min_genes;
    if !eligible {
        log::debug!(
            "Pathway {} resolves to {} genes; excluded from metagene construction",
            record.id,
            genes.len()
        );
    }

    ResolvedPathway {
        id: record.id.clone(),
        name: record.name.clone(),
        genes,
        unmapped: mapping.unmapped,
        not_in_expression,
        eligible,
    }
}
