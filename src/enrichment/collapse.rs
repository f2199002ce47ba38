//! Collapse enriched pathways onto their more general parents

use std::collections::{HashMap, HashSet};

use crate::data::{PathwayHierarchy, PathwayRecord};

/// Drop pathways whose signal is already carried by an enriched ancestor.
///
/// A pathway is removed when some ancestor (direct or transitive) is also in
/// `records` and the pathway's genes are a subset of that ancestor's genes.
/// Order of the surviving records is unchanged.
pub fn collapse_to_parents(records: &[PathwayRecord], hierarchy: &PathwayHierarchy) -> Vec<PathwayRecord> {
    let gene_sets: HashMap<&str, HashSet<&str>> = records
        .iter()
        .map(|r| (r.id.as_str(), r.genes.iter().map(|g| g.as_str()).collect()))
        .collect();

    let kept: Vec<PathwayRecord> = records
        .iter()
        .filter(|record| {
            let genes = &gene_sets[record.id.as_str()];
            let redundant_with = hierarchy.ancestors(&record.id).into_iter().find(|ancestor| {
                gene_sets
                    .get(ancestor.as_str())
                    .map(|parent_genes| genes.is_subset(parent_genes))
                    .unwrap_or(false)
            });
            if let Some(parent) = &redundant_with {
                log::debug!("Pathway {} collapsed into parent {}", record.id, parent);
            }
            redundant_with.is_none()
        })
        .cloned()
        .collect();

    if kept.len() < records.len() {
        log::info!(
            "Collapsed {} pathways into enriched parents ({} remain)",
            records.len() - kept.len(),
            kept.len()
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Direction;

    fn record(id: &str, genes: &[&str]) -> PathwayRecord {
        PathwayRecord {
            id: id.to_string(),
            name: id.to_string(),
            genes: genes.iter().map(|g| g.to_string()).collect(),
            statistic: 2.0,
            p_value: 0.01,
            adjusted_p: 0.02,
            direction: Direction::Up,
        }
    }

    #[test]
    fn test_child_subset_of_parent_is_removed() {
        let mut h = PathwayHierarchy::new();
        h.add_edge("child", "parent");
        h.add_edge("grandchild", "child");
        h.add_edge("sibling", "parent");

        let records = vec![
            record("grandchild", &["a", "b"]),
            record("parent", &["a", "b", "c", "d"]),
            record("sibling", &["c", "x"]),
        ];
        let kept = collapse_to_parents(&records, &h);
        let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
        // grandchild reaches parent transitively; sibling has a gene parent lacks
        assert_eq!(ids, vec!["parent", "sibling"]);
    }

    #[test]
    fn test_absent_parent_keeps_child() {
        let mut h = PathwayHierarchy::new();
        h.add_edge("child", "parent");
        let records = vec![record("child", &["a"])];
        assert_eq!(collapse_to_parents(&records, &h).len(), 1);
    }
}
