//! Table builder: joins raw sample records into one labeled expression table
//!
//! Expression rows and sample annotations come from separate sources. They are
//! joined on sample identifier; unmatched samples are dropped and reported,
//! never silently discarded.

use std::collections::{HashMap, HashSet};

use ndarray::Array2;
use serde::Serialize;

use super::label::DEFAULT_LABEL_FIELD;
use super::{ExpressionTable, RawDataset, SampleRecord};
use crate::error::{ExplorerError, Result};

/// What to do when the two sources disagree on sample identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Inner join, report the mismatch
    #[default]
    Lenient,
    /// Fail the build with a merge error
    Strict,
}

/// Parameters for building a table
#[derive(Debug, Clone)]
pub struct BuildParams {
    /// Annotation field the label is read from
    pub label_field: String,
    pub merge_policy: MergePolicy,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            label_field: DEFAULT_LABEL_FIELD.to_string(),
            merge_policy: MergePolicy::Lenient,
        }
    }
}

/// Sample identifiers present in only one of the two sources
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    /// Samples with expression values but no annotation
    pub missing_metadata: Vec<String>,
    /// Samples with an annotation but no expression values
    pub missing_expression: Vec<String>,
}

impl MergeReport {
    pub fn mismatch_count(&self) -> usize {
        self.missing_metadata.len() + self.missing_expression.len()
    }

    pub fn is_clean(&self) -> bool {
        self.mismatch_count() == 0
    }

    /// The mismatch as a merge error, if there is one
    pub fn to_error(&self) -> Option<ExplorerError> {
        if self.is_clean() {
            return None;
        }
        let mut parts = Vec::new();
        if !self.missing_metadata.is_empty() {
            parts.push(format!(
                "{} sample(s) without metadata ({})",
                self.missing_metadata.len(),
                preview(&self.missing_metadata)
            ));
        }
        if !self.missing_expression.is_empty() {
            parts.push(format!(
                "{} sample(s) without expression values ({})",
                self.missing_expression.len(),
                preview(&self.missing_expression)
            ));
        }
        Some(ExplorerError::Merge {
            reason: parts.join("; "),
        })
    }
}

fn preview(ids: &[String]) -> String {
    const SHOWN: usize = 5;
    if ids.len() <= SHOWN {
        ids.join(", ")
    } else {
        format!("{}, ...", ids[..SHOWN].join(", "))
    }
}

/// A sample whose gene set is smaller than the table's
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncompleteSample {
    pub sample_id: String,
    /// Number of table genes padded with missing values
    pub missing_genes: usize,
}

/// Output of [`build_table`]
#[derive(Debug, Clone)]
pub struct TableBuild {
    pub table: ExpressionTable,
    pub merge: MergeReport,
    pub incomplete: Vec<IncompleteSample>,
}

/// Rename repeated gene ids within one sample to `<id>_1`, `<id>_2`, ...
fn deduplicate_genes(sample_id: &str, values: Vec<(String, f64)>) -> Vec<(String, f64)> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let has_dups = {
        let mut ids = HashSet::new();
        values.iter().any(|(id, _)| !ids.insert(id.as_str()))
    };
    if !has_dups {
        return values;
    }

    let mut result = Vec::with_capacity(values.len());
    for (gene, value) in values {
        let count = seen.entry(gene.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            result.push((gene, value));
        } else {
            let renamed = format!("{}_{}", gene, *count - 1);
            log::warn!(
                "Sample {}: duplicate gene '{}' renamed to '{}'",
                sample_id,
                gene,
                renamed
            );
            result.push((renamed, value));
        }
    }
    result
}

fn check_unique<'a>(ids: impl Iterator<Item = &'a str>, source: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ExplorerError::InvalidInput {
                reason: format!("duplicate sample ID '{}' in {}", id, source),
            });
        }
    }
    Ok(())
}

/// Build the labeled table from a loader's raw dataset
///
/// Rows follow annotation order; columns are gene ids in first-seen order.
/// Samples present in only one source are excluded and listed in
/// [`TableBuild::merge`] (or fail the build under [`MergePolicy::Strict`]).
/// Samples missing some of the table's genes are padded with NaN and listed
/// in [`TableBuild::incomplete`].
pub fn build_table(raw: &RawDataset, params: &BuildParams) -> Result<TableBuild> {
    check_unique(
        raw.expression.iter().map(|s| s.sample_id.as_str()),
        "expression values",
    )?;
    check_unique(
        raw.annotations.iter().map(|s| s.sample_id.as_str()),
        "sample metadata",
    )?;

    let expression_by_id: HashMap<&str, _> = raw
        .expression
        .iter()
        .map(|s| (s.sample_id.as_str(), s))
        .collect();
    let annotated: HashSet<&str> = raw
        .annotations
        .iter()
        .map(|s| s.sample_id.as_str())
        .collect();

    let mut merge = MergeReport::default();
    let mut records: Vec<SampleRecord> = Vec::with_capacity(raw.annotations.len());

    for annotation in &raw.annotations {
        match expression_by_id.get(annotation.sample_id.as_str()) {
            Some(expression) => {
                let mut record = SampleRecord::join(expression, annotation, &params.label_field);
                record.values = deduplicate_genes(&record.sample_id, record.values);
                records.push(record);
            }
            None => merge.missing_expression.push(annotation.sample_id.clone()),
        }
    }
    merge.missing_metadata = raw
        .expression
        .iter()
        .filter(|s| !annotated.contains(s.sample_id.as_str()))
        .map(|s| s.sample_id.clone())
        .collect();

    if let Some(err) = merge.to_error() {
        match params.merge_policy {
            MergePolicy::Strict => return Err(err),
            MergePolicy::Lenient => log::warn!("{}; unmatched samples excluded", err),
        }
    }

    if records.is_empty() {
        return Err(ExplorerError::EmptyData {
            reason: format!("no samples in {} after joining expression and metadata", raw.accession),
        });
    }

    // Gene columns in first-seen order
    let mut gene_ids: Vec<String> = Vec::new();
    let mut gene_pos: HashMap<String, usize> = HashMap::new();
    for record in &records {
        for (gene, _) in &record.values {
            if !gene_pos.contains_key(gene) {
                gene_pos.insert(gene.clone(), gene_ids.len());
                gene_ids.push(gene.clone());
            }
        }
    }

    let n_genes = gene_ids.len();
    let mut values = Array2::from_elem((records.len(), n_genes), f64::NAN);
    let mut incomplete = Vec::new();

    for (row, record) in records.iter().enumerate() {
        for (gene, value) in &record.values {
            values[[row, gene_pos[gene]]] = *value;
        }
        let missing_genes = n_genes - record.values.len();
        if missing_genes > 0 {
            incomplete.push(IncompleteSample {
                sample_id: record.sample_id.clone(),
                missing_genes,
            });
        }
    }

    if !incomplete.is_empty() {
        log::warn!(
            "{} sample(s) do not cover all {} genes; missing values padded with NaN",
            incomplete.len(),
            n_genes
        );
    }

    let sample_ids: Vec<String> = records.iter().map(|r| r.sample_id.clone()).collect();
    let labels: Vec<String> = records.iter().map(|r| r.label.clone()).collect();

    let table = ExpressionTable::new(values, sample_ids, labels, gene_ids)?;

    log::info!(
        "Built table for {}: {} samples, {} genes, {} labels",
        raw.accession,
        table.n_samples(),
        table.n_genes(),
        table.sorted_labels().len()
    );

    Ok(TableBuild {
        table,
        merge,
        incomplete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MetadataFields, SampleAnnotation, SampleExpression, UNKNOWN_LABEL};

    fn annotation(id: &str, characteristic: Option<&str>) -> SampleAnnotation {
        let mut fields = MetadataFields::new();
        fields.push("title", id);
        if let Some(c) = characteristic {
            fields.push(DEFAULT_LABEL_FIELD, c);
        }
        SampleAnnotation::new(id, fields)
    }

    fn expression(id: &str, values: &[(&str, f64)]) -> SampleExpression {
        SampleExpression::new(
            id,
            values.iter().map(|(g, v)| (g.to_string(), *v)).collect(),
        )
    }

    fn dataset() -> RawDataset {
        RawDataset {
            accession: "GSE1".to_string(),
            series: MetadataFields::new(),
            expression: vec![
                expression("GSM1", &[("g1", 1.0), ("g2", 2.0)]),
                expression("GSM2", &[("g1", 3.0), ("g2", 4.0)]),
                expression("GSM3", &[("g1", 5.0), ("g2", 6.0)]),
            ],
            annotations: vec![
                annotation("GSM1", Some("group: A")),
                annotation("GSM2", Some("group: A")),
                annotation("GSM3", None),
            ],
        }
    }

    #[test]
    fn test_build_labels_and_columns() {
        let build = build_table(&dataset(), &BuildParams::default()).unwrap();
        let table = &build.table;

        assert_eq!(table.sample_ids(), &["GSM1", "GSM2", "GSM3"]);
        assert_eq!(table.labels(), &["A", "A", UNKNOWN_LABEL]);
        assert_eq!(table.gene_ids(), &["g1", "g2"]);
        assert_eq!(table.values()[[2, 1]], 6.0);
        assert!(build.merge.is_clean());
        assert!(build.incomplete.is_empty());
    }

    #[test]
    fn test_inner_join_reports_mismatch() {
        let mut raw = dataset();
        raw.expression.push(expression("GSM4", &[("g1", 7.0), ("g2", 8.0)]));
        raw.annotations.push(annotation("GSM5", Some("group: B")));

        let build = build_table(&raw, &BuildParams::default()).unwrap();
        assert_eq!(build.table.n_samples(), 3);
        assert_eq!(build.merge.missing_metadata, vec!["GSM4"]);
        assert_eq!(build.merge.missing_expression, vec!["GSM5"]);
        assert_eq!(build.merge.mismatch_count(), 2);
        assert!(matches!(
            build.merge.to_error(),
            Some(ExplorerError::Merge { .. })
        ));
    }

    #[test]
    fn test_strict_merge_fails() {
        let mut raw = dataset();
        raw.expression.push(expression("GSM4", &[("g1", 7.0)]));

        let params = BuildParams {
            merge_policy: MergePolicy::Strict,
            ..BuildParams::default()
        };
        let result = build_table(&raw, &params);
        assert!(matches!(result, Err(ExplorerError::Merge { .. })));
    }

    #[test]
    fn test_ragged_gene_sets_padded_and_reported() {
        let mut raw = dataset();
        raw.expression[1] = expression("GSM2", &[("g2", 4.0), ("g3", 9.0)]);

        let build = build_table(&raw, &BuildParams::default()).unwrap();
        let table = &build.table;
        assert_eq!(table.gene_ids(), &["g1", "g2", "g3"]);
        assert!(table.values()[[1, 0]].is_nan());
        assert!(table.values()[[0, 2]].is_nan());
        assert_eq!(
            build.incomplete,
            vec![
                IncompleteSample { sample_id: "GSM1".to_string(), missing_genes: 1 },
                IncompleteSample { sample_id: "GSM2".to_string(), missing_genes: 1 },
                IncompleteSample { sample_id: "GSM3".to_string(), missing_genes: 1 },
            ]
        );
    }

    #[test]
    fn test_duplicate_genes_renamed() {
        let mut raw = dataset();
        for (i, e) in raw.expression.iter_mut().enumerate() {
            e.values.push(("g1".to_string(), 100.0 + i as f64));
        }

        let build = build_table(&raw, &BuildParams::default()).unwrap();
        assert_eq!(build.table.gene_ids(), &["g1", "g2", "g1_1"]);
        assert_eq!(build.table.values()[[0, 2]], 100.0);
    }

    #[test]
    fn test_duplicate_samples_rejected() {
        let mut raw = dataset();
        raw.annotations.push(annotation("GSM1", None));
        assert!(matches!(
            build_table(&raw, &BuildParams::default()),
            Err(ExplorerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_custom_label_field() {
        let mut raw = dataset();
        for a in raw.annotations.iter_mut() {
            a.fields.push("source_name_ch1", "site: gut");
        }
        let params = BuildParams {
            label_field: "source_name_ch1".to_string(),
            ..BuildParams::default()
        };
        let build = build_table(&raw, &params).unwrap();
        assert!(build.table.labels().iter().all(|l| l == "gut"));
    }

    #[test]
    fn test_no_overlap_is_empty() {
        let mut raw = dataset();
        raw.annotations = vec![annotation("GSM9", None)];
        assert!(matches!(
            build_table(&raw, &BuildParams::default()),
            Err(ExplorerError::EmptyData { .. })
        ));
    }
}
