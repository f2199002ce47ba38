//! Auxiliary tables: identifier maps, pathway results, gene-set databases,
//! pathway hierarchies, sample groups and long-format drug responses

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Deserialize;

use super::matrix::{detect_delimiter, strip_quotes};
use crate::association::AssociationIndex;
use crate::data::{
    canonical_cell_line, Direction, GeneSet, IdentifierMap, PathwayDatabase, PathwayHierarchy,
    PathwayRecord,
};
use crate::drug::{DrugObservation, DuplicateObservation};
use crate::enrichment::DeGene;
use crate::error::{MetageneError, Result};
use crate::metagene::MetageneSet;

/// Read the header line and data lines of a small delimited file
fn read_rows(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();
    let header_line = lines.next().ok_or_else(|| MetageneError::EmptyData {
        reason: format!("Empty file: {}", path.display()),
    })??;
    let delimiter = detect_delimiter(&header_line);
    let header = header_line.split(delimiter).map(strip_quotes).collect();

    let mut rows = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(line.split(delimiter).map(strip_quotes).collect());
    }
    Ok((header, rows))
}

/// Position of the first header matching one of `names` (case-insensitive)
fn column(header: &[String], names: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

fn required_column(header: &[String], names: &[&str], path: &Path) -> Result<usize> {
    column(header, names).ok_or_else(|| MetageneError::InvalidInput {
        reason: format!("{}: missing column '{}'", path.display(), names[0]),
    })
}

fn parse_float(value: Option<&String>) -> f64 {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Read an identifier map with columns `ensembl`, `entrez`, `symbol`
pub fn read_identifier_map<P: AsRef<Path>>(path: P) -> Result<IdentifierMap> {
    let path = path.as_ref();
    let (header, rows) = read_rows(path)?;
    let e = column(&header, &["ensembl", "ensembl_gene_id"]);
    let z = column(&header, &["entrez", "entrezgene", "entrezgene_id"]);
    let s = column(&header, &["symbol", "hgnc_symbol"]);
    if [e, z, s].iter().filter(|c| c.is_some()).count() < 2 {
        return Err(MetageneError::InvalidIdentifierMap {
            reason: format!(
                "{}: need at least two of the columns ensembl, entrez, symbol",
                path.display()
            ),
        });
    }

    let field = |row: &[String], col: Option<usize>| -> String {
        col.and_then(|c| row.get(c)).cloned().unwrap_or_default()
    };
    let mut map = IdentifierMap::new();
    for row in &rows {
        map.insert(&field(row, e), &field(row, z), &field(row, s));
    }
    log::info!("Loaded {} identifier associations from {}", map.len(), path.display());
    Ok(map)
}

/// Split a gene list field on `/`, `;` or `,`
fn split_genes(field: &str) -> Vec<String> {
    field
        .split(['/', ';', ','])
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .map(|g| g.to_string())
        .collect()
}

/// Read an enrichment result table.
///
/// Required columns: `id`, `genes` (also accepted: `core_enrichment`,
/// `geneID`, `leading_edge`). Optional: `name`/`Description`,
/// `statistic`/`NES`, `p_value`/`pvalue`, `adjusted_p`/`p.adjust`.
/// Row order is kept; it is taken to be the significance order.
pub fn read_pathway_table<P: AsRef<Path>>(path: P) -> Result<Vec<PathwayRecord>> {
    let path = path.as_ref();
    let (header, rows) = read_rows(path)?;
    let id_col = required_column(&header, &["id", "ID", "pathway"], path)?;
    let genes_col = required_column(
        &header,
        &["genes", "core_enrichment", "geneID", "leading_edge", "leadingEdge"],
        path,
    )?;
    let name_col = column(&header, &["name", "Description"]);
    let stat_col = column(&header, &["statistic", "NES", "score"]);
    let p_col = column(&header, &["p_value", "pvalue", "pval"]);
    let q_col = column(&header, &["adjusted_p", "p.adjust", "padj", "qvalue"]);

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let id = row.get(id_col).cloned().unwrap_or_default();
        if id.is_empty() {
            return Err(MetageneError::InvalidPathwayTable {
                reason: format!("{} row {}: empty pathway id", path.display(), i + 2),
            });
        }
        let statistic = stat_col.map(|c| parse_float(row.get(c))).unwrap_or(f64::NAN);
        records.push(PathwayRecord {
            name: name_col.and_then(|c| row.get(c)).cloned().unwrap_or_else(|| id.clone()),
            genes: row.get(genes_col).map(|g| split_genes(g)).unwrap_or_default(),
            statistic,
            p_value: p_col.map(|c| parse_float(row.get(c))).unwrap_or(f64::NAN),
            adjusted_p: q_col.map(|c| parse_float(row.get(c))).unwrap_or(f64::NAN),
            direction: if statistic.is_finite() {
                Direction::from_statistic(statistic)
            } else {
                Direction::Unsigned
            },
            id,
        });
    }
    log::info!("Loaded {} pathway records from {}", records.len(), path.display());
    Ok(records)
}

/// Write pathway records in the format read by [`read_pathway_table`]
pub fn write_pathway_table<P: AsRef<Path>>(path: P, records: &[PathwayRecord]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "id\tname\tstatistic\tp_value\tadjusted_p\tdirection\tgenes")?;
    for r in records {
        writeln!(
            out,
            "{}\t{}\t{:.6}\t{:.6e}\t{:.6e}\t{}\t{}",
            r.id,
            r.name,
            r.statistic,
            r.p_value,
            r.adjusted_p,
            r.direction.as_str(),
            r.genes.join("/")
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Read a GMT gene-set database: `id<TAB>name<TAB>gene<TAB>gene...`
pub fn read_gmt<P: AsRef<Path>>(path: P) -> Result<PathwayDatabase> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut sets = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(MetageneError::InvalidPathwayTable {
                reason: format!("{} line {}: a gene set needs id, name and genes", path.display(), i + 1),
            });
        }
        sets.push(GeneSet {
            id: fields[0].trim().to_string(),
            name: fields[1].trim().to_string(),
            genes: fields[2..]
                .iter()
                .map(|g| g.trim())
                .filter(|g| !g.is_empty())
                .map(|g| g.to_string())
                .collect(),
        });
    }
    if sets.is_empty() {
        return Err(MetageneError::EmptyData {
            reason: format!("No gene sets in {}", path.display()),
        });
    }
    Ok(PathwayDatabase::new(sets))
}

/// Read `child<TAB>parent` pathway relations (no header)
pub fn read_hierarchy<P: AsRef<Path>>(path: P) -> Result<PathwayHierarchy> {
    let reader = BufReader::new(File::open(path)?);
    let mut hierarchy = PathwayHierarchy::new();
    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split('\t');
        if let (Some(child), Some(parent)) = (parts.next(), parts.next()) {
            let (child, parent) = (child.trim(), parent.trim());
            if !child.is_empty() && !parent.is_empty() {
                hierarchy.add_edge(child, parent);
            }
        }
    }
    Ok(hierarchy)
}

/// Read (sample, group) assignments from a two-column table with header
pub fn read_sample_groups<P: AsRef<Path>>(path: P, canonical_samples: bool) -> Result<Vec<(String, String)>> {
    let (_, rows) = read_rows(path.as_ref())?;
    rows.into_iter()
        .map(|row| match row.as_slice() {
            [sample, group, ..] => {
                let sample = if canonical_samples {
                    canonical_cell_line(sample)
                } else {
                    sample.clone()
                };
                Ok((sample, group.clone()))
            }
            _ => Err(MetageneError::InvalidInput {
                reason: "Sample group rows need a sample and a group column".to_string(),
            }),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct DrugResponseRow {
    #[serde(alias = "DRUG_NAME", alias = "drug_name", alias = "Drug")]
    drug: String,
    #[serde(alias = "CELL_LINE_NAME", alias = "cell_line_name", alias = "cell line")]
    cell_line: String,
    #[serde(alias = "AUC", alias = "auc", alias = "value")]
    response: f64,
}

/// Read long-format drug responses with columns `drug`, `cell_line`,
/// `response` (GDSC-style `DRUG_NAME`, `CELL_LINE_NAME`, `AUC` also accepted).
pub fn read_drug_responses<P: AsRef<Path>>(path: P, canonical_lines: bool) -> Result<Vec<DrugObservation>> {
    let path = path.as_ref();
    let header_line = BufReader::new(File::open(path)?)
        .lines()
        .next()
        .transpose()?
        .ok_or_else(|| MetageneError::EmptyData {
            reason: format!("Empty file: {}", path.display()),
        })?;
    let delimiter = detect_delimiter(&header_line) as u8;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let row: DrugResponseRow = row.map_err(|e| MetageneError::InvalidDrugResponse {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let cell_line = if canonical_lines {
            canonical_cell_line(&row.cell_line)
        } else {
            row.cell_line
        };
        records.push(DrugObservation {
            drug: row.drug,
            cell_line,
            response: row.response,
        });
    }
    log::info!("Loaded {} drug-response observations from {}", records.len(), path.display());
    Ok(records)
}

/// Write duplicate-observation diagnostics
pub fn write_duplicates<P: AsRef<Path>>(path: P, duplicates: &[DuplicateObservation]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "drug\tcell_line\tkept\tdiscarded")?;
    for d in duplicates {
        let discarded: Vec<String> = d.discarded.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}\t{}\t{}\t{}", d.drug, d.cell_line, d.kept, discarded.join(";"))?;
    }
    out.flush()?;
    Ok(())
}

/// Write the gene loadings of every computed metagene, one row per
/// (pathway, gene), with the pathway's leading singular value
pub fn write_loadings<P: AsRef<Path>>(path: P, metagenes: &MetageneSet) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "pathway\tgene\tloading\tsingular_value")?;
    for (pathway, basis) in metagenes.reference.row_ids().iter().zip(metagenes.bases.iter()) {
        let Some(basis) = basis else { continue };
        for (gene, loading) in basis.genes().iter().zip(basis.loadings().iter()) {
            writeln!(out, "{}\t{}\t{}\t{}", pathway, gene, loading, basis.singular_value())?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Write differential expression results ranked as given
pub fn write_de_results<P: AsRef<Path>>(path: P, genes: &[DeGene]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "gene\tlog_fold_change\tstatistic\tp_value\tadjusted_p")?;
    for g in genes {
        writeln!(
            out,
            "{}\t{:.6}\t{:.6}\t{:.6e}\t{:.6e}",
            g.gene, g.log_fold_change, g.statistic, g.p_value, g.adjusted_p
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Write both association views, `<prefix>pathway_associations.tsv` and
/// `<prefix>drug_associations.tsv`, into `dir`. Members are `id:r` pairs.
pub fn write_associations<P: AsRef<Path>>(dir: P, prefix: &str, index: &AssociationIndex) -> Result<()> {
    let dir = dir.as_ref();
    let views = [
        ("pathway_associations.tsv", "pathway", &index.by_pathway),
        ("drug_associations.tsv", "drug", &index.by_drug),
    ];
    for (file_name, key_label, view) in views {
        let mut out = BufWriter::new(File::create(dir.join(format!("{}{}", prefix, file_name)))?);
        writeln!(out, "{}\tcount\tmembers", key_label)?;
        for assoc in view.iter() {
            let members: Vec<String> = assoc
                .partners
                .iter()
                .map(|p| format!("{}:{:.4}", p.id, p.correlation))
                .collect();
            writeln!(out, "{}\t{}\t{}", assoc.key, assoc.count(), members.join(";"))?;
        }
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GeneNamespace;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_read_identifier_map() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ensembl_gene_id\tentrezgene_id\thgnc_symbol").unwrap();
        writeln!(file, "ENSG00000097007\t25\tABL1").unwrap();
        writeln!(file, "ENSG00000000003\t\tTSPAN6").unwrap();
        let map = read_identifier_map(file.path()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.lookup("25", GeneNamespace::Entrez, GeneNamespace::Ensembl),
            vec!["ENSG00000097007".to_string()]
        );
        assert!(map
            .lookup("ENSG00000000003", GeneNamespace::Ensembl, GeneNamespace::Entrez)
            .is_empty());
    }

    #[test]
    fn test_read_clusterprofiler_style_table() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ID\tDescription\tNES\tpvalue\tp.adjust\tcore_enrichment").unwrap();
        writeln!(file, "R-HSA-1\tCell Cycle\t-2.1\t0.0001\t0.002\t25/7157/672").unwrap();
        writeln!(file, "R-HSA-2\tImmune\t1.4\t0.01\t0.04\t3458").unwrap();
        let records = read_pathway_table(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "R-HSA-1");
        assert_eq!(records[0].genes, vec!["25", "7157", "672"]);
        assert_eq!(records[0].direction, Direction::Down);
        assert_eq!(records[1].name, "Immune");
    }

    #[test]
    fn test_pathway_table_round_trip() {
        let records = vec![PathwayRecord {
            id: "P1".to_string(),
            name: "Name".to_string(),
            genes: vec!["1".to_string(), "2".to_string()],
            statistic: 1.5,
            p_value: 0.001,
            adjusted_p: 0.01,
            direction: Direction::Up,
        }];
        let file = NamedTempFile::new().unwrap();
        write_pathway_table(file.path(), &records).unwrap();
        let back = read_pathway_table(file.path()).unwrap();
        assert_eq!(back[0].id, "P1");
        assert_eq!(back[0].genes, records[0].genes);
        assert!((back[0].adjusted_p - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_read_gdsc_drug_table() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "DRUG_NAME,CELL_LINE_NAME,AUC").unwrap();
        writeln!(file, "Dasatinib,HCC-1954,0.91").unwrap();
        writeln!(file, "Dasatinib,MDA-MB-231,0.42").unwrap();
        let records = read_drug_responses(file.path(), true).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cell_line, "HCC1954");
        assert_eq!(records[1].response, 0.42);
    }

    #[test]
    fn test_read_gmt_and_hierarchy() {
        let mut gmt = NamedTempFile::new().unwrap();
        writeln!(gmt, "R-HSA-1\tCell Cycle\t25\t7157\t672").unwrap();
        let db = read_gmt(gmt.path()).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.sets()[0].genes.len(), 3);

        let mut rel = NamedTempFile::new().unwrap();
        writeln!(rel, "R-HSA-2\tR-HSA-1").unwrap();
        let h = read_hierarchy(rel.path()).unwrap();
        assert_eq!(h.parents("R-HSA-2"), &["R-HSA-1".to_string()]);
    }

    #[test]
    fn test_read_sample_groups() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tgroup").unwrap();
        writeln!(file, "hcc-1954\tsensitive").unwrap();
        writeln!(file, "T47D\tresistant").unwrap();
        let groups = read_sample_groups(file.path(), true).unwrap();
        assert_eq!(groups[0], ("HCC1954".to_string(), "sensitive".to_string()));
    }

    #[test]
    fn test_write_duplicates_lists_every_collision() {
        let observations = vec![
            DrugObservation::new("DrugA", "Line1", 0.9),
            DrugObservation::new("DrugA", "Line1", 0.5),
            DrugObservation::new("DrugB", "Line2", 0.3),
            DrugObservation::new("DrugA", "Line1", 0.7),
        ];
        let matrix = crate::drug::build_drug_matrix(&observations).unwrap();
        let file = NamedTempFile::new().unwrap();
        write_duplicates(file.path(), matrix.duplicates()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["drug\tcell_line\tkept\tdiscarded", "DrugA\tLine1\t0.9\t0.5;0.7"]);
    }

    #[test]
    fn test_write_de_results() {
        let genes = vec![DeGene {
            gene: "ENSG1".to_string(),
            log_fold_change: 1.25,
            statistic: 4.5,
            p_value: 0.001,
            adjusted_p: 0.01,
        }];
        let file = NamedTempFile::new().unwrap();
        write_de_results(file.path(), &genes).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let row: Vec<&str> = text.lines().nth(1).unwrap().split('\t').collect();
        assert_eq!(row[0], "ENSG1");
        assert_eq!(row[1].parse::<f64>().unwrap(), 1.25);
        assert!((row[4].parse::<f64>().unwrap() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_write_loadings_skips_sentinel_rows() {
        use crate::data::{ExpressionMatrix, ResolvedPathway};
        use crate::metagene::{compute_metagenes, MetageneParams};
        use ndarray::Array2;

        let values = Array2::from_shape_fn((6, 8), |(i, j)| {
            (j as f64 * 0.7).sin() * (i + 1) as f64 + ((i * 5 + j * 3) % 4) as f64 * 0.2
        });
        let genes: Vec<String> = (0..6).map(|i| format!("ENSG{}", i)).collect();
        let samples: Vec<String> = (0..8).map(|j| format!("S{}", j)).collect();
        let expr = ExpressionMatrix::new(values, genes.clone(), samples).unwrap();
        let pathway = |id: &str, genes: Vec<String>| ResolvedPathway {
            id: id.to_string(),
            name: id.to_string(),
            eligible: genes.len() >= 5,
            genes,
            unmapped: vec![],
            not_in_expression: vec![],
        };
        let pathways = vec![pathway("small", genes[..2].to_vec()), pathway("big", genes[..5].to_vec())];
        let set = compute_metagenes(&pathways, &expr, &expr, &MetageneParams::default()).unwrap();

        let file = NamedTempFile::new().unwrap();
        write_loadings(file.path(), &set).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.starts_with("big\t")));
        let norm: f64 = rows
            .iter()
            .map(|r| r.split('\t').nth(2).unwrap().parse::<f64>().unwrap().powi(2))
            .sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_write_associations() {
        use crate::association::{Association, Partner};
        let index = AssociationIndex {
            threshold: 0.4,
            by_pathway: vec![Association {
                key: "P".to_string(),
                partners: vec![Partner {
                    id: "D".to_string(),
                    correlation: 0.62,
                }],
            }],
            by_drug: vec![],
        };
        let dir = tempdir().unwrap();
        write_associations(dir.path(), "", &index).unwrap();
        let text = std::fs::read_to_string(dir.path().join("pathway_associations.tsv")).unwrap();
        assert!(text.contains("P\t1\tD:0.6200"));
        assert!(dir.path().join("drug_associations.tsv").exists());
    }
}
