//! Hypergeometric over-representation analysis

use std::collections::HashSet;

use statrs::distribution::{DiscreteCDF, Hypergeometric};

use super::{DeGene, PathwayEnrichment};
use crate::data::{Direction, PathwayDatabase, PathwayRecord};
use crate::error::{MetageneError, Result};
use crate::stats::benjamini_hochberg;

/// Parameters for over-representation analysis
#[derive(Debug, Clone)]
pub struct EnrichmentParams {
    /// Adjusted p-value cutoff for calling a gene differentially expressed
    pub gene_alpha: f64,
    /// Adjusted p-value cutoff for reporting a pathway
    pub pathway_alpha: f64,
    /// Gene sets smaller than this (within the universe) are skipped
    pub min_set_size: usize,
    /// Gene sets larger than this (within the universe) are skipped
    pub max_set_size: usize,
}

impl Default for EnrichmentParams {
    fn default() -> Self {
        Self {
            gene_alpha: 0.05,
            pathway_alpha: 0.05,
            min_set_size: 10,
            max_set_size: 500,
        }
    }
}

/// Over-representation of significant genes in database gene sets.
///
/// The universe is every gene with a finite p-value in the ranked list. The
/// leading edge reported for a pathway is its significant genes in ranked
/// order; the statistic is the mean test statistic over those genes, so its
/// sign gives the pathway direction.
#[derive(Debug, Clone, Default)]
pub struct OverRepresentation {
    pub params: EnrichmentParams,
}

impl OverRepresentation {
    pub fn new(params: EnrichmentParams) -> Self {
        Self { params }
    }
}

/// P(X >= k) for X ~ Hypergeometric(population, successes, draws)
pub(crate) fn hypergeometric_upper_tail(k: u64, population: u64, successes: u64, draws: u64) -> Result<f64> {
    if k == 0 {
        return Ok(1.0);
    }
    let dist = Hypergeometric::new(population, successes, draws).map_err(|e| MetageneError::InvalidInput {
        reason: format!("hypergeometric({}, {}, {}): {}", population, successes, draws, e),
    })?;
    Ok(dist.sf(k - 1).clamp(0.0, 1.0))
}

impl PathwayEnrichment for OverRepresentation {
    fn enrich(&self, ranked: &[DeGene], database: &PathwayDatabase) -> Result<Vec<PathwayRecord>> {
        let universe: Vec<&DeGene> = ranked.iter().filter(|g| g.p_value.is_finite()).collect();
        if universe.is_empty() {
            return Err(MetageneError::EmptyData {
                reason: "No testable genes for enrichment".to_string(),
            });
        }
        let universe_ids: HashSet<&str> = universe.iter().map(|g| g.gene.as_str()).collect();
        let significant: Vec<&DeGene> = universe
            .iter()
            .copied()
            .filter(|g| g.adjusted_p <= self.params.gene_alpha)
            .collect();
        log::info!(
            "Over-representation: {} significant of {} tested genes, {} gene sets",
            significant.len(),
            universe.len(),
            database.len()
        );

        let n_universe = universe_ids.len() as u64;
        let n_significant = significant.len() as u64;

        let mut candidates: Vec<(PathwayRecord, f64)> = Vec::new();
        for set in database.sets() {
            let members: HashSet<&str> = set
                .genes
                .iter()
                .map(|g| g.as_str())
                .filter(|g| universe_ids.contains(g))
                .collect();
            let size = members.len();
            if size < self.params.min_set_size || size > self.params.max_set_size {
                continue;
            }

            let leading: Vec<&DeGene> = significant
                .iter()
                .copied()
                .filter(|g| members.contains(g.gene.as_str()))
                .collect();
            if leading.is_empty() {
                continue;
            }

            let p = hypergeometric_upper_tail(leading.len() as u64, n_universe, size as u64, n_significant)?;
            let statistic = leading.iter().map(|g| g.statistic).sum::<f64>() / leading.len() as f64;

            candidates.push((
                PathwayRecord {
                    id: set.id.clone(),
                    name: set.name.clone(),
                    genes: leading.iter().map(|g| g.gene.clone()).collect(),
                    statistic,
                    p_value: p,
                    adjusted_p: f64::NAN,
                    direction: Direction::from_statistic(statistic),
                },
                p,
            ));
        }

        let pvalues: Vec<f64> = candidates.iter().map(|c| c.1).collect();
        let padj = benjamini_hochberg(&pvalues);
        let mut records: Vec<PathwayRecord> = candidates
            .into_iter()
            .zip(padj)
            .map(|((mut record, _), q)| {
                record.adjusted_p = q;
                record
            })
            .filter(|r| r.adjusted_p <= self.params.pathway_alpha)
            .collect();
        records.sort_by(|a, b| a.p_value.total_cmp(&b.p_value));

        log::info!("{} enriched pathways at adjusted p <= {}", records.len(), self.params.pathway_alpha);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GeneSet;

    fn de(gene: &str, stat: f64, q: f64) -> DeGene {
        DeGene {
            gene: gene.to_string(),
            log_fold_change: stat / 2.0,
            statistic: stat,
            p_value: q / 10.0,
            adjusted_p: q,
        }
    }

    #[test]
    fn test_upper_tail_reference() {
        // phyper(2, 10, 90, 10, lower.tail = FALSE) = P(X >= 3) = 0.0600
        let p = hypergeometric_upper_tail(3, 100, 10, 10).unwrap();
        assert!((p - 0.0600).abs() < 1e-3, "p = {}", p);
        assert_eq!(hypergeometric_upper_tail(0, 100, 10, 10).unwrap(), 1.0);
    }

    #[test]
    fn test_enriched_set_reported_with_leading_edge() {
        let mut ranked: Vec<DeGene> = (0..10).map(|i| de(&format!("S{}", i), -4.0, 0.001)).collect();
        ranked.extend((0..90).map(|i| de(&format!("N{}", i), 0.1, 0.9)));

        let database = PathwayDatabase::new(vec![
            GeneSet {
                id: "HIT".to_string(),
                name: "all significant".to_string(),
                genes: (0..10).map(|i| format!("S{}", i)).chain((0..5).map(|i| format!("N{}", i))).collect(),
            },
            GeneSet {
                id: "MISS".to_string(),
                name: "background".to_string(),
                genes: (10..30).map(|i| format!("N{}", i)).collect(),
            },
        ]);

        let ora = OverRepresentation::default();
        let records = ora.enrich(&ranked, &database).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "HIT");
        assert_eq!(records[0].genes.len(), 10);
        assert_eq!(records[0].genes[0], "S0");
        assert_eq!(records[0].direction, Direction::Down);
        assert!(records[0].adjusted_p < 1e-6);
    }

    #[test]
    fn test_size_limits_skip_sets() {
        let ranked: Vec<DeGene> = (0..20).map(|i| de(&format!("G{}", i), 3.0, 0.01)).collect();
        let database = PathwayDatabase::new(vec![GeneSet {
            id: "TINY".to_string(),
            name: "tiny".to_string(),
            genes: vec!["G1".to_string(), "G2".to_string()],
        }]);
        let records = OverRepresentation::default().enrich(&ranked, &database).unwrap();
        assert!(records.is_empty());
    }
}
