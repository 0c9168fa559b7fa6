//! Labeled expression table: rows are samples, columns are genes

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{ExplorerError, Result};

/// Wide expression table with one group label per sample
///
/// Values are stored samples x genes; NaN marks a missing value.
/// The table is immutable once built.
#[derive(Debug, Clone)]
pub struct ExpressionTable {
    /// Expression values (samples x genes)
    values: Array2<f64>,
    sample_ids: Vec<String>,
    labels: Vec<String>,
    gene_ids: Vec<String>,
}

impl ExpressionTable {
    /// Create a table from its parts
    pub fn new(
        values: Array2<f64>,
        sample_ids: Vec<String>,
        labels: Vec<String>,
        gene_ids: Vec<String>,
    ) -> Result<Self> {
        let (n_samples, n_genes) = values.dim();

        if sample_ids.len() != n_samples {
            return Err(ExplorerError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if labels.len() != n_samples {
            return Err(ExplorerError::DimensionMismatch {
                expected: format!("{} labels", n_samples),
                got: format!("{} labels", labels.len()),
            });
        }

        if gene_ids.len() != n_genes {
            return Err(ExplorerError::DimensionMismatch {
                expected: format!("{} gene IDs", n_genes),
                got: format!("{} gene IDs", gene_ids.len()),
            });
        }

        Ok(Self {
            values,
            sample_ids,
            labels,
            gene_ids,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_genes(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn gene_ids(&self) -> &[String] {
        &self.gene_ids
    }

    /// Column index of a gene
    pub fn gene_index(&self, gene_id: &str) -> Option<usize> {
        self.gene_ids.iter().position(|id| id == gene_id)
    }

    /// Values of one gene across all samples
    pub fn gene_column(&self, gene_idx: usize) -> ArrayView1<'_, f64> {
        self.values.column(gene_idx)
    }

    /// Values of one sample across all genes
    pub fn sample_row(&self, sample_idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(sample_idx)
    }

    /// Distinct labels in order of first appearance
    pub fn distinct_labels(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for label in &self.labels {
            if !seen.contains(label) {
                seen.push(label.clone());
            }
        }
        seen
    }

    /// Distinct labels, sorted
    pub fn sorted_labels(&self) -> Vec<String> {
        let mut unique = self.labels.clone();
        unique.sort();
        unique.dedup();
        unique
    }

    /// Extract the series for one gene, paired with each sample's label
    pub fn gene_series(&self, gene_id: &str) -> Result<GeneSeries> {
        let idx = self
            .gene_index(gene_id)
            .ok_or_else(|| ExplorerError::UnknownGene {
                gene: gene_id.to_string(),
            })?;

        Ok(GeneSeries {
            gene: gene_id.to_string(),
            values: self.gene_column(idx).to_vec(),
            labels: self.labels.clone(),
        })
    }
}

/// One gene's values across all samples, paired with sample labels
#[derive(Debug, Clone, PartialEq)]
pub struct GeneSeries {
    pub gene: String,
    /// One value per sample, NaN when missing
    pub values: Vec<f64>,
    pub labels: Vec<String>,
}

impl GeneSeries {
    /// Build a series directly from values and labels
    pub fn new(gene: &str, values: Vec<f64>, labels: Vec<String>) -> Result<Self> {
        if values.len() != labels.len() {
            return Err(ExplorerError::DimensionMismatch {
                expected: format!("{} labels", values.len()),
                got: format!("{} labels", labels.len()),
            });
        }
        Ok(Self {
            gene: gene.to_string(),
            values,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Distinct labels in order of first appearance
    pub fn distinct_labels(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for label in &self.labels {
            if !seen.contains(label) {
                seen.push(label.clone());
            }
        }
        seen
    }

    /// All values of a group in sample order, including missing ones
    pub fn group_values(&self, label: &str) -> Vec<f64> {
        self.values
            .iter()
            .zip(self.labels.iter())
            .filter(|(_, l)| l.as_str() == label)
            .map(|(&v, _)| v)
            .collect()
    }

    /// Non-missing values of a group in sample order
    pub fn group_present(&self, label: &str) -> Vec<f64> {
        self.group_values(label)
            .into_iter()
            .filter(|v| !v.is_nan())
            .collect()
    }

    /// Non-missing values of every group, groups in order of first appearance
    pub fn groups(&self) -> Vec<(String, Vec<f64>)> {
        self.distinct_labels()
            .into_iter()
            .map(|label| {
                let values = self.group_present(&label);
                (label, values)
            })
            .collect()
    }

    /// Non-missing values across the whole series
    pub fn present(&self) -> Vec<f64> {
        self.values.iter().copied().filter(|v| !v.is_nan()).collect()
    }
}
