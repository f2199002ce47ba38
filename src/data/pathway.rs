//! Pathway records, gene-set databases and pathway hierarchies

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Direction of an enrichment signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Unsigned,
}

impl Direction {
    /// Direction implied by the sign of an enrichment statistic
    pub fn from_statistic(statistic: f64) -> Self {
        if statistic > 0.0 {
            Direction::Up
        } else if statistic < 0.0 {
            Direction::Down
        } else {
            Direction::Unsigned
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Unsigned => "none",
        }
    }
}

/// One row of an enrichment result table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayRecord {
    /// Database identifier (e.g. R-HSA-69278)
    pub id: String,
    /// Display name
    pub name: String,
    /// Member or leading-edge genes, in the enrichment table's namespace
    pub genes: Vec<String>,
    /// Enrichment statistic (NES or signed score)
    pub statistic: f64,
    /// Raw p-value
    pub p_value: f64,
    /// Multiple-testing adjusted p-value
    pub adjusted_p: f64,
    pub direction: Direction,
}

/// A pathway whose genes have been translated to the expression namespace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPathway {
    pub id: String,
    pub name: String,
    /// Genes present in the reference expression matrix, first-seen order
    pub genes: Vec<String>,
    /// Source identifiers that had no counterpart in the expression namespace
    pub unmapped: Vec<String>,
    /// Translated identifiers absent from the reference expression matrix
    pub not_in_expression: Vec<String>,
    /// Whether the gene set is large enough for metagene construction
    pub eligible: bool,
}

impl ResolvedPathway {
    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }
}

/// A named gene set from a pathway database
#[derive(Debug, Clone, PartialEq)]
pub struct GeneSet {
    pub id: String,
    pub name: String,
    pub genes: Vec<String>,
}

/// Collection of gene sets (e.g. parsed from a GMT file)
#[derive(Debug, Clone, Default)]
pub struct PathwayDatabase {
    sets: Vec<GeneSet>,
}

impl PathwayDatabase {
    pub fn new(sets: Vec<GeneSet>) -> Self {
        Self { sets }
    }

    pub fn sets(&self) -> &[GeneSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Child -> parent relation between pathways
#[derive(Debug, Clone, Default)]
pub struct PathwayHierarchy {
    parents: HashMap<String, Vec<String>>,
}

impl PathwayHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, child: &str, parent: &str) {
        let parents = self.parents.entry(child.to_string()).or_default();
        if !parents.iter().any(|p| p == parent) {
            parents.push(parent.to_string());
        }
    }

    /// Direct parents of `id`
    pub fn parents(&self, id: &str) -> &[String] {
        self.parents.get(id).map(|p| p.as_slice()).unwrap_or(&[])
    }

    /// All ancestors of `id`, nearest first; cycles are cut
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut frontier: Vec<&str> = vec![id];
        while let Some(current) = frontier.pop() {
            for parent in self.parents(current) {
                if parent != id && !out.contains(parent) {
                    out.push(parent.clone());
                    frontier.push(parent);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_statistic() {
        assert_eq!(Direction::from_statistic(1.8), Direction::Up);
        assert_eq!(Direction::from_statistic(-0.2), Direction::Down);
        assert_eq!(Direction::from_statistic(0.0), Direction::Unsigned);
    }

    #[test]
    fn test_ancestors_transitive_and_acyclic() {
        let mut h = PathwayHierarchy::new();
        h.add_edge("leaf", "mid");
        h.add_edge("mid", "root");
        h.add_edge("root", "leaf");
        let ancestors = h.ancestors("leaf");
        assert_eq!(ancestors, vec!["mid".to_string(), "root".to_string()]);
    }
}
