//! Table-wide gene variance ranking and the correlation matrix of the
//! highest-variance genes

use ndarray::Array2;
use rayon::prelude::*;
use std::cmp::Ordering;

use crate::data::ExpressionTable;
use crate::error::{ExplorerError, Result};
use crate::stats::{pearson_pairwise, variance};

/// Genes selected for the correlation heatmap
pub const CORRELATION_GENES: usize = 10;

/// Genes selected for the pair plot
pub const PAIRPLOT_GENES: usize = 4;

/// Sample variance (ddof = 1) of every gene over its non-missing values
///
/// NaN for genes with fewer than two values. Returned in column order.
pub fn gene_variances(table: &ExpressionTable) -> Vec<f64> {
    (0..table.n_genes())
        .into_par_iter()
        .map(|j| {
            let present: Vec<f64> = table
                .gene_column(j)
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .collect();
            variance(&present, 1)
        })
        .collect()
}

/// Gene ids ranked by variance, highest first, truncated to `n`
///
/// The sort is stable, so equal variances keep column order. Genes with an
/// undefined variance rank last.
pub fn top_variance_genes(table: &ExpressionTable, n: usize) -> Vec<String> {
    let variances = gene_variances(table);
    let mut order: Vec<usize> = (0..variances.len()).collect();
    order.sort_by(|&a, &b| descending_nan_last(variances[a], variances[b]));

    order
        .into_iter()
        .take(n)
        .map(|j| table.gene_ids()[j].clone())
        .collect()
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// Square Pearson correlation matrix over a set of genes
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub genes: Vec<String>,
    /// Coefficients (genes x genes); NaN where undefined
    pub values: Array2<f64>,
}

/// Pairwise-complete Pearson correlation between the given genes
pub fn correlation_matrix(table: &ExpressionTable, genes: &[String]) -> Result<CorrelationMatrix> {
    if genes.is_empty() {
        return Err(ExplorerError::EmptyData {
            reason: "no genes selected for correlation".to_string(),
        });
    }

    let columns: Vec<Vec<f64>> = genes
        .iter()
        .map(|g| {
            table
                .gene_index(g)
                .map(|j| table.gene_column(j).to_vec())
                .ok_or_else(|| ExplorerError::UnknownGene { gene: g.clone() })
        })
        .collect::<Result<_>>()?;

    let k = genes.len();
    let upper: Vec<(usize, usize, f64)> = (0..k)
        .into_par_iter()
        .flat_map_iter(|i| {
            let columns = &columns;
            (i..k).map(move |j| (i, j, pearson_pairwise(&columns[i], &columns[j])))
        })
        .collect();

    let mut values = Array2::from_elem((k, k), f64::NAN);
    for (i, j, r) in upper {
        values[[i, j]] = r;
        values[[j, i]] = r;
    }

    Ok(CorrelationMatrix {
        genes: genes.to_vec(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn table_from(values: Array2<f64>, genes: &[&str]) -> ExpressionTable {
        let n = values.nrows();
        ExpressionTable::new(
            values,
            (0..n).map(|i| format!("s{}", i)).collect(),
            vec!["A".to_string(); n],
            genes.iter().map(|g| g.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_gene_variances() {
        let t = table_from(
            array![[1.0, 5.0, f64::NAN], [2.0, 5.0, 1.0], [3.0, 5.0, f64::NAN]],
            &["a", "b", "c"],
        );
        let v = gene_variances(&t);
        assert!((v[0] - 1.0).abs() < 1e-12);
        assert_eq!(v[1], 0.0);
        assert!(v[2].is_nan());
    }

    #[test]
    fn test_top_variance_order_and_ties() {
        // variances: a=1, b=4, c=1, d=0, e=NaN
        let t = table_from(
            array![
                [1.0, 2.0, 4.0, 7.0, f64::NAN],
                [2.0, 4.0, 5.0, 7.0, 1.0],
                [3.0, 6.0, 6.0, 7.0, f64::NAN]
            ],
            &["a", "b", "c", "d", "e"],
        );
        assert_eq!(top_variance_genes(&t, 10), vec!["b", "a", "c", "d", "e"]);
        assert_eq!(top_variance_genes(&t, 2), vec!["b", "a"]);
    }

    #[test]
    fn test_top_variance_stable_under_column_reorder() {
        let genes = ["g0", "g1", "g2", "g3", "g4", "g5", "g6", "g7", "g8", "g9", "g10", "g11"];
        let n_samples = 6;
        // gene j has spread proportional to j + 1
        let values = Array2::from_shape_fn((n_samples, genes.len()), |(i, j)| {
            (i as f64) * (j as f64 + 1.0)
        });
        let original = table_from(values.clone(), &genes);

        let perm: Vec<usize> = vec![7, 2, 11, 0, 5, 9, 1, 10, 3, 8, 6, 4];
        let shuffled_values =
            Array2::from_shape_fn((n_samples, genes.len()), |(i, j)| values[[i, perm[j]]]);
        let shuffled_genes: Vec<&str> = perm.iter().map(|&j| genes[j]).collect();
        let shuffled = table_from(shuffled_values, &shuffled_genes);

        let mut a = top_variance_genes(&original, CORRELATION_GENES);
        let mut b = top_variance_genes(&shuffled, CORRELATION_GENES);
        assert_eq!(a, b);
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert!(!a.contains(&"g0".to_string()));
        assert!(!a.contains(&"g1".to_string()));
    }

    #[test]
    fn test_correlation_matrix() {
        let t = table_from(
            array![[1.0, 2.0, 3.0], [2.0, 4.0, 2.0], [3.0, 6.0, 1.0]],
            &["x", "y", "z"],
        );
        let genes: Vec<String> = vec!["x".into(), "y".into(), "z".into()];
        let m = correlation_matrix(&t, &genes).unwrap();
        assert_eq!(m.values.dim(), (3, 3));
        assert!((m.values[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((m.values[[0, 1]] - 1.0).abs() < 1e-12);
        assert!((m.values[[2, 0]] + 1.0).abs() < 1e-12);
        assert_eq!(m.values[[1, 2]], m.values[[2, 1]]);

        let missing: Vec<String> = vec!["x".into(), "nope".into()];
        assert!(matches!(
            correlation_matrix(&t, &missing),
            Err(ExplorerError::UnknownGene { .. })
        ));
    }
}
