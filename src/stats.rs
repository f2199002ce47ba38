//! Statistical utility functions shared across modules
//!
//! Row standardisation used before decomposition, tie-aware ranking and the
//! rank correlation used by the association engine, and Benjamini-Hochberg
//! adjustment used by the reference enrichment services.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Mean and sample standard deviation (n - 1 denominator)
pub fn mean_sd(x: ArrayView1<'_, f64>) -> (f64, f64) {
    let n = x.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = x.sum() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let ss: f64 = x.iter().map(|&v| (v - mean).powi(2)).sum();
    (mean, (ss / (n as f64 - 1.0)).sqrt())
}

/// Standardise every row to zero mean and unit sample variance.
///
/// Rows with zero variance become all-zero rows: a constant gene carries no
/// information about coordinated variation and must not produce NaN.
pub fn standardize_rows(m: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = m.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let (mean, sd) = mean_sd(row.view());
        if sd > 0.0 && sd.is_finite() {
            row.mapv_inplace(|v| (v - mean) / sd);
        } else {
            row.fill(0.0);
        }
    }
    out
}

/// Average ranks (1-based); ties share the mean of their positions
pub fn average_ranks(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && x[order[j]] == x[order[i]] {
            j += 1;
        }
        // positions i..j (0-based) share rank mean((i+1)..=j)
        let rank = (i + 1 + j) as f64 / 2.0;
        for &k in &order[i..j] {
            ranks[k] = rank;
        }
        i = j;
    }
    ranks
}

/// Pearson correlation; NaN when either series is constant, too short or
/// the lengths differ
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 || y.len() != n {
        return f64::NAN;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return f64::NAN;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Spearman rank correlation: Pearson correlation of average ranks
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    pearson(&average_ranks(x), &average_ranks(y))
}

/// Apply Benjamini-Hochberg FDR correction to p-values.
///
/// Non-finite p-values are not counted as tests and stay NaN.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let n = pvalues.len();
    let mut padj = vec![f64::NAN; n];

    let mut tested: Vec<usize> = (0..n).filter(|&i| pvalues[i].is_finite()).collect();
    let m = tested.len();
    if m == 0 {
        return padj;
    }
    tested.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));

    let mut cummin = f64::INFINITY;
    for (pos, &i) in tested.iter().enumerate().rev() {
        let adj = (pvalues[i] * m as f64 / (pos + 1) as f64).min(1.0);
        cummin = cummin.min(adj);
        padj[i] = cummin;
    }
    padj
}
