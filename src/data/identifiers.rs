//! Identifier handling: canonical cell-line names and gene identifier mapping
//!
//! Gene identifiers live in three namespaces (stable Ensembl IDs, numeric
//! Entrez IDs used by pathway databases, and HGNC symbols). The mapper is a
//! plain lookup table: coverage between databases is partial, so identifiers
//! without a counterpart are dropped and reported, never treated as errors.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MetageneError, Result};

/// Canonical form of a cell-line name.
///
/// Upper-cases and strips everything that is not an ASCII letter or digit, so
/// `"HCC-1954"`, `"hcc 1954"` and `"HCC1954"` all compare equal. Applied once
/// when expression and drug-response tables are read.
pub fn canonical_cell_line(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Gene identifier namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneNamespace {
    /// Stable Ensembl identifier (expression matrix row names)
    Ensembl,
    /// Numeric Entrez identifier (pathway databases)
    Entrez,
    /// Human-readable gene symbol
    Symbol,
}

impl GeneNamespace {
    fn column(self) -> usize {
        match self {
            GeneNamespace::Ensembl => 0,
            GeneNamespace::Entrez => 1,
            GeneNamespace::Symbol => 2,
        }
    }
}

impl fmt::Display for GeneNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeneNamespace::Ensembl => "ensembl",
            GeneNamespace::Entrez => "entrez",
            GeneNamespace::Symbol => "symbol",
        };
        f.write_str(name)
    }
}

impl FromStr for GeneNamespace {
    type Err = MetageneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ensembl" | "ensembl_gene_id" => Ok(GeneNamespace::Ensembl),
            "entrez" | "entrezgene" | "entrezgene_id" => Ok(GeneNamespace::Entrez),
            "symbol" | "hgnc_symbol" => Ok(GeneNamespace::Symbol),
            other => Err(MetageneError::InvalidInput {
                reason: format!(
                    "Unknown gene namespace '{}'. Use: ensembl, entrez or symbol",
                    other
                ),
            }),
        }
    }
}

/// Result of translating identifiers between namespaces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdMapping {
    /// (source id, target ids) in input order; target ids deduplicated
    pub mapped: Vec<(String, Vec<String>)>,
    /// Source ids with no target, in input order
    pub unmapped: Vec<String>,
}

impl IdMapping {
    /// All target ids flattened, first-seen order, without duplicates
    pub fn targets(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.mapped
            .iter()
            .flat_map(|(_, targets)| targets.iter())
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }
}

/// Lookup table between the three gene namespaces.
///
/// Each row is one (ensembl, entrez, symbol) association; empty fields mean the
/// association is unknown in that namespace.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMap {
    rows: Vec<[String; 3]>,
    /// Per namespace: identifier -> row indices in insertion order
    index: [HashMap<String, Vec<usize>>; 3],
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one association row
    pub fn insert(&mut self, ensembl: &str, entrez: &str, symbol: &str) {
        let row = [
            ensembl.trim().to_string(),
            entrez.trim().to_string(),
            symbol.trim().to_string(),
        ];
        let row_idx = self.rows.len();
        for (ns, id) in row.iter().enumerate() {
            if !id.is_empty() {
                self.index[ns].entry(id.clone()).or_default().push(row_idx);
            }
        }
        self.rows.push(row);
    }

    /// Number of association rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Targets of a single identifier, deduplicated in table order
    pub fn lookup(&self, id: &str, from: GeneNamespace, to: GeneNamespace) -> Vec<String> {
        if from == to {
            return vec![id.to_string()];
        }
        let Some(rows) = self.index[from.column()].get(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        rows.iter()
            .map(|&r| &self.rows[r][to.column()])
            .filter(|t| !t.is_empty() && seen.insert(t.as_str()))
            .cloned()
            .collect()
    }

    /// Translate `ids` from one namespace to another.
    ///
    /// Duplicated source ids are considered once. Ids without a counterpart
    /// land in [`IdMapping::unmapped`].
    pub fn map(&self, ids: &[String], from: GeneNamespace, to: GeneNamespace) -> IdMapping {
        let mut seen = HashSet::new();
        let mut mapping = IdMapping::default();
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let targets = self.lookup(id, from, to);
            if targets.is_empty() {
                mapping.unmapped.push(id.clone());
            } else {
                mapping.mapped.push((id.clone(), targets));
            }
        }
        if !mapping.unmapped.is_empty() {
            log::debug!(
                "{} of {} {} identifiers have no {} counterpart",
                mapping.unmapped.len(),
                seen.len(),
                from,
                to
            );
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn example_map() -> IdentifierMap {
        let mut map = IdentifierMap::new();
        map.insert("ENSG00000141510", "7157", "TP53");
        map.insert("ENSG00000012048", "672", "BRCA1");
        map.insert("ENSG00000284792", "672", "BRCA1");
        map.insert("ENSG00000097007", "25", "ABL1");
        map.insert("ENSG00000000001", "", "ORPHAN");
        map
    }

    #[test]
    fn test_canonical_cell_line() {
        assert_eq!(canonical_cell_line("HCC-1954"), "HCC1954");
        assert_eq!(canonical_cell_line("hcc 1954"), "HCC1954");
        assert_eq!(canonical_cell_line("MDA-MB-231"), "MDAMB231");
        assert_eq!(canonical_cell_line("  t47d "), "T47D");
    }

    #[test]
    fn test_one_to_many_mapping() {
        let map = example_map();
        let mapping = map.map(&strings(&["672"]), GeneNamespace::Entrez, GeneNamespace::Ensembl);
        assert_eq!(
            mapping.mapped,
            vec![(
                "672".to_string(),
                strings(&["ENSG00000012048", "ENSG00000284792"])
            )]
        );
        assert!(mapping.unmapped.is_empty());
    }

    #[test]
    fn test_unmapped_ids_are_dropped() {
        let map = example_map();
        let mapping = map.map(
            &strings(&["7157", "999999", "25", "7157"]),
            GeneNamespace::Entrez,
            GeneNamespace::Ensembl,
        );
        assert_eq!(mapping.targets(), strings(&["ENSG00000141510", "ENSG00000097007"]));
        assert_eq!(mapping.unmapped, strings(&["999999"]));
    }

    #[test]
    fn test_empty_target_field_counts_as_unmapped() {
        let map = example_map();
        let mapping = map.map(
            &strings(&["ENSG00000000001"]),
            GeneNamespace::Ensembl,
            GeneNamespace::Entrez,
        );
        assert!(mapping.mapped.is_empty());
        assert_eq!(mapping.unmapped.len(), 1);
    }

    #[test]
    fn test_namespace_parsing() {
        assert_eq!("Entrez".parse::<GeneNamespace>().unwrap(), GeneNamespace::Entrez);
        assert_eq!("hgnc_symbol".parse::<GeneNamespace>().unwrap(), GeneNamespace::Symbol);
        assert!("uniprot".parse::<GeneNamespace>().is_err());
    }
}
