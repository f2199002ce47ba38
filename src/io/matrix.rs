//! Reading and writing labelled matrices as delimited text

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::data::{canonical_cell_line, ExpressionMatrix, LabeledMatrix};
use crate::error::{MetageneError, Result};

/// Strip surrounding quotes and whitespace from a field
pub(crate) fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Tab if the header line contains one, comma otherwise
pub(crate) fn detect_delimiter(header_line: &str) -> char {
    if header_line.contains('\t') {
        '\t'
    } else {
        ','
    }
}

/// Parsed rectangular table: header labels, row labels, values
struct NumericTable {
    col_ids: Vec<String>,
    row_ids: Vec<String>,
    values: Array2<f64>,
}

/// Parse a table whose first column holds row labels and first row holds
/// column labels. `NA`/empty cells become NaN; callers decide whether that is
/// acceptable.
fn read_numeric_table(path: &Path) -> Result<NumericTable> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header_line = lines.next().ok_or_else(|| MetageneError::EmptyData {
        reason: format!("Empty file: {}", path.display()),
    })??;
    let delimiter = detect_delimiter(&header_line);
    let header: Vec<&str> = header_line.split(delimiter).collect();
    if header.len() < 2 {
        return Err(MetageneError::InvalidInput {
            reason: format!("Not enough columns in header of {}", path.display()),
        });
    }
    let col_ids: Vec<String> = header[1..].iter().map(|s| strip_quotes(s)).collect();
    let n_cols = col_ids.len();

    let mut row_ids = Vec::new();
    let mut data: Vec<f64> = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(delimiter).collect();
        if fields.len() != n_cols + 1 {
            return Err(MetageneError::InvalidInput {
                reason: format!(
                    "{} line {}: {} columns, expected {}",
                    path.display(),
                    line_no + 2,
                    fields.len(),
                    n_cols + 1
                ),
            });
        }
        row_ids.push(strip_quotes(fields[0]));
        for field in &fields[1..] {
            let value = strip_quotes(field);
            let parsed = match value.as_str() {
                "" | "NA" | "NaN" | "nan" => f64::NAN,
                v => v.parse::<f64>().map_err(|_| MetageneError::InvalidInput {
                    reason: format!("{} line {}: invalid number '{}'", path.display(), line_no + 2, v),
                })?,
            };
            data.push(parsed);
        }
    }

    if row_ids.is_empty() {
        return Err(MetageneError::EmptyData {
            reason: format!("No data rows in {}", path.display()),
        });
    }

    let values = Array2::from_shape_vec((row_ids.len(), n_cols), data).map_err(|e| {
        MetageneError::InvalidInput {
            reason: format!("{}: {}", path.display(), e),
        }
    })?;
    Ok(NumericTable {
        col_ids,
        row_ids,
        values,
    })
}

/// Read a normalised expression matrix (genes x samples).
///
/// With `canonical_samples`, sample names are passed through
/// [`canonical_cell_line`]; names that collide after canonicalisation are an
/// error.
pub fn read_expression_matrix<P: AsRef<Path>>(path: P, canonical_samples: bool) -> Result<ExpressionMatrix> {
    let path = path.as_ref();
    let table = read_numeric_table(path)?;
    let sample_ids = if canonical_samples {
        table.col_ids.iter().map(|s| canonical_cell_line(s)).collect()
    } else {
        table.col_ids
    };
    ExpressionMatrix::new(table.values, table.row_ids, sample_ids).map_err(|e| match e {
        MetageneError::InvalidExpressionMatrix { reason } => MetageneError::InvalidExpressionMatrix {
            reason: format!("{}: {}", path.display(), reason),
        },
        other => other,
    })
}

/// Read a labelled matrix previously written by [`write_labeled_matrix`]
pub fn read_labeled_matrix<P: AsRef<Path>>(path: P) -> Result<LabeledMatrix> {
    let table = read_numeric_table(path.as_ref())?;
    LabeledMatrix::new(table.values, table.row_ids, table.col_ids)
}

/// Read a pathway x drug correlation matrix; every cell must be `NA` or in [-1, 1]
pub fn read_correlation_matrix<P: AsRef<Path>>(path: P) -> Result<LabeledMatrix> {
    let path = path.as_ref();
    let matrix = read_labeled_matrix(path)?;
    if let Some(bad) = matrix.values().iter().find(|r| !r.is_nan() && r.abs() > 1.0) {
        return Err(MetageneError::InvalidInput {
            reason: format!("{}: correlation {} outside [-1, 1]", path.display(), bad),
        });
    }
    Ok(matrix)
}

/// Write a labelled matrix as TSV; NaN is written as `NA`, other values in
/// shortest round-trip form
pub fn write_labeled_matrix<P: AsRef<Path>>(path: P, corner: &str, matrix: &LabeledMatrix) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}\t{}", corner, matrix.col_ids().join("\t"))?;
    for (i, row_id) in matrix.row_ids().iter().enumerate() {
        let row: Vec<String> = matrix
            .row(i)
            .iter()
            .map(|v| if v.is_nan() { "NA".to_string() } else { v.to_string() })
            .collect();
        writeln!(out, "{}\t{}", row_id, row.join("\t"))?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_expression_matrix_canonical() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene_id\tHCC-1954\t\"mda-mb-231\"\tK562").unwrap();
        writeln!(file, "ENSG1\t1.5\t2.0\t3.25").unwrap();
        writeln!(file, "ENSG2\t0.5\t1.0\t0.0").unwrap();

        let m = read_expression_matrix(file.path(), true).unwrap();
        assert_eq!(m.n_genes(), 2);
        assert_eq!(m.sample_ids(), &["HCC1954", "MDAMB231", "K562"]);
        assert_eq!(m.values()[[0, 2]], 3.25);
    }

    #[test]
    fn test_canonical_collision_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene,T-47D,T47D").unwrap();
        writeln!(file, "ENSG1,1,2").unwrap();
        assert!(read_expression_matrix(file.path(), true).is_err());
        assert!(read_expression_matrix(file.path(), false).is_ok());
    }

    #[test]
    fn test_ragged_row_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene\tA\tB").unwrap();
        writeln!(file, "ENSG1\t1").unwrap();
        assert!(read_expression_matrix(file.path(), false).is_err());
    }

    #[test]
    fn test_labeled_matrix_file_round_trip_keeps_nan() {
        let m = LabeledMatrix::new(
            array![[0.25, f64::NAN], [-1.0, 0.5]],
            vec!["P1".to_string(), "P2".to_string()],
            vec!["D1".to_string(), "D2".to_string()],
        )
        .unwrap();
        let file = NamedTempFile::new().unwrap();
        write_labeled_matrix(file.path(), "pathway", &m).unwrap();
        let back = read_labeled_matrix(file.path()).unwrap();
        assert_eq!(back.row_ids(), m.row_ids());
        assert_eq!(back.get(0, 0), 0.25);
        assert!(back.get(0, 1).is_nan());
        assert_eq!(back.get(1, 0), -1.0);
    }

    #[test]
    fn test_correlation_out_of_range_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "pathway\tD1").unwrap();
        writeln!(file, "P1\t1.7").unwrap();
        assert!(read_correlation_matrix(file.path()).is_err());
    }

    #[test]
    fn test_correlation_file_keeps_association_boundary() {
        use crate::association::associations;

        let m = LabeledMatrix::new(
            array![[0.4000004, -0.25]],
            vec!["P1".to_string()],
            vec!["D1".to_string(), "D2".to_string()],
        )
        .unwrap();
        assert_eq!(associations(&m, 0.4).unwrap().n_pairs(), 1);

        let file = NamedTempFile::new().unwrap();
        write_labeled_matrix(file.path(), "pathway", &m).unwrap();
        let back = read_correlation_matrix(file.path()).unwrap();
        assert_eq!(back, m);
        assert_eq!(associations(&back, 0.4).unwrap().n_pairs(), 1);
    }
}
