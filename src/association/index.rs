//! Threshold-based association discovery over a correlation matrix
//!
//! Both views are pure functions of the correlation matrix and the threshold,
//! recomputed on demand rather than stored.

use serde::Serialize;

use crate::data::LabeledMatrix;
use crate::error::{MetageneError, Result};

/// Parameters for association discovery
#[derive(Debug, Clone)]
pub struct AssociationParams {
    /// Absolute correlation must be strictly above this value
    pub threshold: f64,
}

impl Default for AssociationParams {
    fn default() -> Self {
        Self { threshold: 0.4 }
    }
}

/// A partner (drug or pathway) with its correlation coefficient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partner {
    pub id: String,
    pub correlation: f64,
}

/// All partners of one key (a pathway or a drug) above the threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Association {
    pub key: String,
    pub partners: Vec<Partner>,
}

impl Association {
    pub fn count(&self) -> usize {
        self.partners.len()
    }
}

/// Pathway -> drugs and drug -> pathways views at one threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationIndex {
    pub threshold: f64,
    pub by_pathway: Vec<Association>,
    pub by_drug: Vec<Association>,
}

impl AssociationIndex {
    /// Number of (pathway, drug) pairs above the threshold
    pub fn n_pairs(&self) -> usize {
        self.by_pathway.iter().map(Association::count).sum()
    }

    /// Whether the (pathway, drug) pair is associated
    pub fn contains(&self, pathway: &str, drug: &str) -> bool {
        self.by_pathway
            .iter()
            .find(|a| a.key == pathway)
            .map(|a| a.partners.iter().any(|p| p.id == drug))
            .unwrap_or(false)
    }
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(MetageneError::InvalidThreshold(threshold))
    }
}

/// Keys with at least one partner, ordered by descending partner count;
/// equal counts keep the matrix order (stable sort).
fn collect_view(
    keys: &[String],
    partners: &[String],
    value: impl Fn(usize, usize) -> f64,
    threshold: f64,
) -> Vec<Association> {
    let mut view: Vec<Association> = keys
        .iter()
        .enumerate()
        .filter_map(|(k, key)| {
            let found: Vec<Partner> = partners
                .iter()
                .enumerate()
                .filter_map(|(p, id)| {
                    let r = value(k, p);
                    (r.is_finite() && r.abs() > threshold).then(|| Partner {
                        id: id.clone(),
                        correlation: r,
                    })
                })
                .collect();
            (!found.is_empty()).then(|| Association {
                key: key.clone(),
                partners: found,
            })
        })
        .collect();
    view.sort_by(|a, b| b.count().cmp(&a.count()));
    view
}

/// Derive both association views from a pathways x drugs correlation matrix.
///
/// A pair is associated when |r| > `threshold`; NaN correlations never are.
pub fn associations(correlations: &LabeledMatrix, threshold: f64) -> Result<AssociationIndex> {
    validate_threshold(threshold)?;

    let pathways = correlations.row_ids();
    let drugs = correlations.col_ids();

    let by_pathway = collect_view(pathways, drugs, |p, d| correlations.get(p, d), threshold);
    let by_drug = collect_view(drugs, pathways, |d, p| correlations.get(p, d), threshold);

    Ok(AssociationIndex {
        threshold,
        by_pathway,
        by_drug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn example() -> LabeledMatrix {
        LabeledMatrix::new(
            array![
                [0.62, 0.10, -0.45],
                [0.20, 0.05, 0.15],
                [-0.80, 0.55, 0.41],
                [f64::NAN, 0.90, 0.00]
            ],
            labels(&["P", "Q", "R", "S"]),
            labels(&["D", "E", "F"]),
        )
        .unwrap()
    }

    #[test]
    fn test_pair_appears_in_both_views() {
        let idx = associations(&example(), 0.4).unwrap();
        assert!(idx.contains("P", "D"));
        let d = idx.by_drug.iter().find(|a| a.key == "D").unwrap();
        assert!(d.partners.iter().any(|p| p.id == "P" && (p.correlation - 0.62).abs() < 1e-12));

        let strict = associations(&example(), 0.7).unwrap();
        assert!(!strict.contains("P", "D"));
        let d = strict.by_drug.iter().find(|a| a.key == "D").unwrap();
        assert!(!d.partners.iter().any(|p| p.id == "P"));
    }

    #[test]
    fn test_ordering_by_count_then_matrix_order() {
        let idx = associations(&example(), 0.4).unwrap();
        let keys: Vec<&str> = idx.by_pathway.iter().map(|a| a.key.as_str()).collect();
        // R has 3 partners, P has 2, S has 1, Q has none
        assert_eq!(keys, vec!["R", "P", "S"]);
        let drugs: Vec<&str> = idx.by_drug.iter().map(|a| a.key.as_str()).collect();
        // D: P,R  E: R,S  F: P,R -> all tie, matrix order kept
        assert_eq!(drugs, vec!["D", "E", "F"]);
        assert_eq!(idx.n_pairs(), 6);
    }

    #[test]
    fn test_threshold_monotonicity() {
        let m = example();
        let loose = associations(&m, 0.3).unwrap();
        for tight in [0.41, 0.5, 0.7, 1.0] {
            let idx = associations(&m, tight).unwrap();
            for a in &idx.by_pathway {
                for p in &a.partners {
                    assert!(loose.contains(&a.key, &p.id));
                }
            }
        }
    }

    #[test]
    fn test_strict_inequality_and_invalid_threshold() {
        let m = LabeledMatrix::new(array![[0.5]], labels(&["P"]), labels(&["D"])).unwrap();
        assert!(associations(&m, 0.5).unwrap().by_pathway.is_empty());
        assert!(associations(&m, 0.0).is_err());
        assert!(associations(&m, 1.5).is_err());
    }
}
