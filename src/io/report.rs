//! Report outputs: `summary.json`, `metadata.tsv`, the text summary, and the
//! output directory layout

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::bundle::write_bundle;
use super::csv::write_table;
use crate::data::{IncompleteSample, MergeReport, MetadataFields};
use crate::error::{ExplorerError, Result};
use crate::loader::LoadedDataset;
use crate::session::GeneReport;
use crate::stats::Describe;
use crate::testing::{Comparison, TestStatistic};

pub const TABLE_FILE: &str = "table.csv";
pub const CHARTS_FILE: &str = "charts.zip";
pub const SUMMARY_FILE: &str = "summary.json";
pub const METADATA_FILE: &str = "metadata.tsv";

/// A visible trace of a computation that was skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportNote {
    /// What was affected, e.g. `test:welch_t` or `chart:chart_7.png`
    pub scope: String,
    pub message: String,
}

impl ReportNote {
    pub fn new(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            message: message.into(),
        }
    }

    fn from_error(scope: impl Into<String>, err: &ExplorerError) -> Self {
        Self::new(scope, err.to_string())
    }
}

/// Descriptive statistics of one label
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub label: String,
    /// Absent when the group has no values for the gene
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Describe>,
}

/// One hypothesis test outcome
#[derive(Debug, Clone, Serialize)]
pub struct TestSummary {
    pub test: String,
    /// Group a per-group test ran on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TestStatistic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestSummary {
    fn new(test: &str, group: Option<&str>, result: &Result<TestStatistic>) -> Self {
        Self {
            test: test.to_string(),
            group: group.map(str::to_string),
            result: result.as_ref().ok().copied(),
            error: result.as_ref().err().map(|e| e.to_string()),
        }
    }
}

/// Serialized form of a gene report
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub accession: String,
    pub gene: String,
    pub n_samples: usize,
    pub n_genes: usize,
    /// Distinct labels in order of first appearance
    pub labels: Vec<String>,
    /// `two_group`, `multi_group` or `single_group`
    pub comparison: String,
    pub groups: Vec<GroupSummary>,
    pub tests: Vec<TestSummary>,
    pub top_variance_genes: Vec<String>,
    pub pairplot_genes: Vec<String>,
    pub charts: Vec<String>,
    pub merge: MergeReport,
    pub incomplete_samples: Vec<IncompleteSample>,
    pub notes: Vec<ReportNote>,
}

fn comparison_tests(comparison: &Comparison) -> Vec<TestSummary> {
    match comparison {
        Comparison::TwoGroup {
            welch,
            mann_whitney,
            levene,
            normality,
            ..
        } => {
            let mut tests = vec![
                TestSummary::new("welch_t", None, welch),
                TestSummary::new("mann_whitney_u", None, mann_whitney),
                TestSummary::new("levene", None, levene),
            ];
            tests.extend(
                normality
                    .iter()
                    .map(|g| TestSummary::new("shapiro_wilk", Some(&g.label), &g.result)),
            );
            tests
        }
        Comparison::MultiGroup { kruskal, .. } => {
            vec![TestSummary::new("kruskal_wallis", None, kruskal)]
        }
        Comparison::SingleGroup { .. } => Vec::new(),
    }
}

fn comparison_name(comparison: &Comparison) -> &'static str {
    match comparison {
        Comparison::TwoGroup { .. } => "two_group",
        Comparison::MultiGroup { .. } => "multi_group",
        Comparison::SingleGroup { .. } => "single_group",
    }
}

/// Every skipped computation of a request, in pipeline order
pub fn collect_notes(dataset: &LoadedDataset, report: &GeneReport) -> Vec<ReportNote> {
    let mut notes = Vec::new();

    if let Some(err) = dataset.build.merge.to_error() {
        notes.push(ReportNote::from_error("merge", &err));
    }
    if !dataset.build.incomplete.is_empty() {
        let listed: Vec<String> = dataset
            .build
            .incomplete
            .iter()
            .map(|s| format!("{} ({} missing)", s.sample_id, s.missing_genes))
            .collect();
        notes.push(ReportNote::new(
            "table",
            format!(
                "{} sample(s) padded with missing values: {}",
                listed.len(),
                listed.join(", ")
            ),
        ));
    }

    for group in &report.stats {
        if let Err(e) = &group.summary {
            notes.push(ReportNote::from_error(format!("stats:{}", group.label), e));
        }
    }
    for test in comparison_tests(&report.comparison) {
        if let Some(error) = test.error {
            let scope = match &test.group {
                Some(g) => format!("test:{}:{}", test.test, g),
                None => format!("test:{}", test.test),
            };
            notes.push(ReportNote::new(scope, error));
        }
    }
    if let Err(e) = &report.zscores {
        notes.push(ReportNote::from_error("zscore", e));
    }
    if let Err(e) = &report.correlation {
        notes.push(ReportNote::from_error("correlation", e));
    }
    for (kind, chart) in &report.charts {
        if let Err(e) = chart {
            notes.push(ReportNote::from_error(format!("chart:{}", kind.file_name()), e));
        }
    }
    notes
}

/// Build the serializable summary of a report
pub fn summarize_report(dataset: &LoadedDataset, report: &GeneReport) -> ReportSummary {
    let table = dataset.table();
    ReportSummary {
        accession: report.accession.clone(),
        gene: report.gene.clone(),
        n_samples: table.n_samples(),
        n_genes: table.n_genes(),
        labels: table.distinct_labels(),
        comparison: comparison_name(&report.comparison).to_string(),
        groups: report
            .stats
            .iter()
            .map(|g| GroupSummary {
                label: g.label.clone(),
                stats: g.summary.as_ref().ok().cloned(),
            })
            .collect(),
        tests: comparison_tests(&report.comparison),
        top_variance_genes: report.top_genes.clone(),
        pairplot_genes: report.pair_genes.clone(),
        charts: report
            .rendered_charts()
            .iter()
            .map(|c| c.file_name.clone())
            .collect(),
        merge: dataset.build.merge.clone(),
        incomplete_samples: dataset.build.incomplete.clone(),
        notes: collect_notes(dataset, report),
    }
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.4}", v)
    }
}

fn fmt_p(p: f64) -> String {
    format!("{:.4e}", p)
}

/// Human-readable summary for the terminal
pub fn render_text(summary: &ReportSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} samples x {} genes, labels: {}",
        summary.accession,
        summary.n_samples,
        summary.n_genes,
        summary.labels.join(", ")
    );
    let _ = writeln!(out, "Gene: {}", summary.gene);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "label", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for group in &summary.groups {
        match &group.stats {
            Some(d) => {
                let _ = writeln!(
                    out,
                    "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
                    group.label,
                    d.count,
                    fmt_value(d.mean),
                    d.std.map(fmt_value).unwrap_or_else(|| "NaN".to_string()),
                    fmt_value(d.min),
                    fmt_value(d.q25),
                    fmt_value(d.median),
                    fmt_value(d.q75),
                    fmt_value(d.max)
                );
            }
            None => {
                let _ = writeln!(out, "{:<20} {:>6}", group.label, 0);
            }
        }
    }

    if !summary.tests.is_empty() {
        let _ = writeln!(out);
        for test in &summary.tests {
            let name = match &test.group {
                Some(g) => format!("{} [{}]", test.test, g),
                None => test.test.clone(),
            };
            match (&test.result, &test.error) {
                (Some(r), _) => {
                    let df = r.df.map(|d| format!(", df = {:.3}", d)).unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "{:<28} statistic = {:.4}, p-value = {}{}",
                        name,
                        r.statistic,
                        fmt_p(r.p_value),
                        df
                    );
                }
                (None, Some(e)) => {
                    let _ = writeln!(out, "{:<28} skipped: {}", name, e);
                }
                (None, None) => {}
            }
        }
    }

    if !summary.notes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Notes:");
        for note in &summary.notes {
            let _ = writeln!(out, "  [{}] {}", note.scope, note.message);
        }
    }
    out
}

/// Two-column `field<TAB>value` rows of the dataset metadata
pub fn write_metadata<W: Write>(mut writer: W, metadata: &MetadataFields) -> Result<()> {
    writeln!(writer, "field\tvalue")?;
    for (field, value) in metadata.display_rows() {
        // keep one row per field
        let value = value.replace(['\t', '\n', '\r'], " ");
        writeln!(writer, "{}\t{}", field, value)?;
    }
    Ok(())
}

/// Write every report output into `dir` and return the paths written
///
/// `charts.zip` is only written when at least one chart rendered.
pub fn write_outputs<P: AsRef<Path>>(
    dir: P,
    dataset: &LoadedDataset,
    report: &GeneReport,
    summary: &ReportSummary,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let table_path = dir.join(TABLE_FILE);
    write_table(&table_path, dataset.table())?;
    written.push(table_path);

    let charts = report.rendered_charts();
    if !charts.is_empty() {
        let bundle_path = dir.join(CHARTS_FILE);
        write_bundle(&bundle_path, &charts)?;
        written.push(bundle_path);
    }

    let summary_path = dir.join(SUMMARY_FILE);
    serde_json::to_writer_pretty(File::create(&summary_path)?, summary)?;
    written.push(summary_path);

    let metadata_path = dir.join(METADATA_FILE);
    write_metadata(File::create(&metadata_path)?, &dataset.series)?;
    written.push(metadata_path);

    log::info!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}
