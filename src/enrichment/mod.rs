//! Statistical services consumed by the pipeline
//!
//! Differential expression and pathway enrichment are treated as black boxes
//! with fixed input/output contracts. The traits below are those contracts;
//! [`WelchTTest`] and [`OverRepresentation`] are simple reference
//! implementations so the pipeline can run end to end without an external
//! statistics package. Results from other tools can be fed in directly as
//! [`PathwayRecord`] tables instead.

mod collapse;
mod diffexp;
mod ora;

pub use collapse::collapse_to_parents;
pub use diffexp::WelchTTest;
pub use ora::{EnrichmentParams, OverRepresentation};

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::data::{
    ExpressionMatrix, GeneNamespace, IdentifierMap, PathwayDatabase, PathwayHierarchy,
    PathwayRecord,
};
use crate::error::{MetageneError, Result};

/// Per-gene differential expression result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeGene {
    pub gene: String,
    /// Difference of group means on the (log) expression scale
    pub log_fold_change: f64,
    /// Test statistic; sign follows the fold change
    pub statistic: f64,
    pub p_value: f64,
    pub adjusted_p: f64,
}

/// Two-group assignment of expression samples
#[derive(Debug, Clone)]
pub struct SamplePartition {
    groups: HashMap<String, String>,
    case: String,
    control: String,
}

impl SamplePartition {
    /// `assignments` are (sample, group) pairs; `case` and `control` name the
    /// two groups to compare, other groups are ignored.
    pub fn new(assignments: Vec<(String, String)>, case: &str, control: &str) -> Result<Self> {
        if case == control {
            return Err(MetageneError::InvalidInput {
                reason: format!("Case and control groups are both '{}'", case),
            });
        }
        let mut groups = HashMap::with_capacity(assignments.len());
        for (sample, group) in assignments {
            if let Some(previous) = groups.insert(sample.clone(), group.clone()) {
                if previous != group {
                    return Err(MetageneError::InvalidInput {
                        reason: format!(
                            "Sample '{}' assigned to both '{}' and '{}'",
                            sample, previous, group
                        ),
                    });
                }
            }
        }
        Ok(Self {
            groups,
            case: case.to_string(),
            control: control.to_string(),
        })
    }

    pub fn case(&self) -> &str {
        &self.case
    }

    pub fn control(&self) -> &str {
        &self.control
    }

    /// Column indices of case and control samples in `expression`.
    ///
    /// Each group needs at least two samples present in the matrix.
    pub fn indices(&self, expression: &ExpressionMatrix) -> Result<(Vec<usize>, Vec<usize>)> {
        let mut case_idx = Vec::new();
        let mut control_idx = Vec::new();
        for (j, sample) in expression.sample_ids().iter().enumerate() {
            match self.groups.get(sample) {
                Some(g) if *g == self.case => case_idx.push(j),
                Some(g) if *g == self.control => control_idx.push(j),
                _ => {}
            }
        }
        for (label, idx) in [(&self.case, &case_idx), (&self.control, &control_idx)] {
            if idx.len() < 2 {
                return Err(MetageneError::InvalidInput {
                    reason: format!(
                        "Group '{}' has {} samples in the expression matrix; need at least 2",
                        label,
                        idx.len()
                    ),
                });
            }
        }
        Ok((case_idx, control_idx))
    }
}

/// Differential expression testing service
pub trait DifferentialExpression {
    /// Per-gene results ranked by ascending p-value (untestable genes last)
    fn test(&self, expression: &ExpressionMatrix, partition: &SamplePartition) -> Result<Vec<DeGene>>;
}

/// Pathway enrichment testing service
pub trait PathwayEnrichment {
    /// Enriched pathways, most significant first, with leading-edge genes
    fn enrich(&self, ranked: &[DeGene], database: &PathwayDatabase) -> Result<Vec<PathwayRecord>>;

    /// Remove pathways whose signal is redundant with a more general parent
    fn collapse(&self, records: &[PathwayRecord], hierarchy: &PathwayHierarchy) -> Vec<PathwayRecord> {
        collapse_to_parents(records, hierarchy)
    }
}

/// Translate ranked genes into another namespace, keeping ranked order.
///
/// One-to-many translations contribute every target; a target reached from
/// several source genes keeps its best-ranked occurrence. Unmapped genes are
/// dropped.
pub fn translate_ranked(
    ranked: &[DeGene],
    mapper: &IdentifierMap,
    from: GeneNamespace,
    to: GeneNamespace,
) -> Vec<DeGene> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(ranked.len());
    let mut n_unmapped = 0usize;
    for gene in ranked {
        let targets = mapper.lookup(&gene.gene, from, to);
        if targets.is_empty() {
            n_unmapped += 1;
        }
        for target in targets {
            if seen.insert(target.clone()) {
                out.push(DeGene {
                    gene: target,
                    ..gene.clone()
                });
            }
        }
    }
    if n_unmapped > 0 {
        log::info!("{} of {} ranked genes have no {} identifier", n_unmapped, ranked.len(), to);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn expr() -> ExpressionMatrix {
        let samples: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        ExpressionMatrix::new(Array2::zeros((1, 5)), vec!["G".to_string()], samples).unwrap()
    }

    fn assign(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(s, g)| (s.to_string(), g.to_string())).collect()
    }

    #[test]
    fn test_partition_indices() {
        let p = SamplePartition::new(
            assign(&[("a", "sens"), ("b", "res"), ("c", "sens"), ("d", "res"), ("e", "other")]),
            "sens",
            "res",
        )
        .unwrap();
        let (case, control) = p.indices(&expr()).unwrap();
        assert_eq!(case, vec![0, 2]);
        assert_eq!(control, vec![1, 3]);
    }

    #[test]
    fn test_partition_requires_two_per_group() {
        let p = SamplePartition::new(assign(&[("a", "sens"), ("b", "res"), ("c", "res")]), "sens", "res").unwrap();
        assert!(p.indices(&expr()).is_err());
    }

    #[test]
    fn test_conflicting_assignment_rejected() {
        let result = SamplePartition::new(assign(&[("a", "sens"), ("a", "res")]), "sens", "res");
        assert!(result.is_err());
    }

    #[test]
    fn test_translate_ranked_keeps_best_rank() {
        let mut mapper = IdentifierMap::new();
        mapper.insert("ENSG1", "100", "A");
        mapper.insert("ENSG2", "100", "A");
        mapper.insert("ENSG3", "300", "C");
        let gene = |id: &str, p: f64| DeGene {
            gene: id.to_string(),
            log_fold_change: 1.0,
            statistic: 2.0,
            p_value: p,
            adjusted_p: p,
        };
        let ranked = vec![gene("ENSG2", 0.001), gene("ENSG9", 0.002), gene("ENSG1", 0.01), gene("ENSG3", 0.2)];
        let out = translate_ranked(&ranked, &mapper, GeneNamespace::Ensembl, GeneNamespace::Entrez);
        let ids: Vec<&str> = out.iter().map(|g| g.gene.as_str()).collect();
        assert_eq!(ids, vec!["100", "300"]);
        assert_eq!(out[0].p_value, 0.001);
    }
}
