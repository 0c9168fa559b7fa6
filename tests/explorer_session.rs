//! Integration tests for the explorer session: local files, caching, and
//! request-level failures.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use geo_explorer::explore;
use geo_explorer::prelude::*;
use tempfile::tempdir;

/// Three annotated samples (A, A, B) plus GSM4 without metadata
fn write_inputs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let expression = dir.join("expression.tsv");
    fs::write(
        &expression,
        "ID_REF\tGSM1\tGSM2\tGSM3\tGSM4\n\
         g1\t1\t3\t5\t7\n\
         g2\t2\tnull\t6\t8\n",
    )
    .unwrap();

    let annotations = dir.join("samples.csv");
    fs::write(
        &annotations,
        "sample_id,characteristics_ch1,title\n\
         GSM1,group: A,first\n\
         GSM2,group: A,second\n\
         GSM3,group: B,third\n",
    )
    .unwrap();

    (expression, annotations)
}

fn no_charts() -> ExplorerParams {
    ExplorerParams {
        render_charts: false,
        ..ExplorerParams::default()
    }
}

struct Counting {
    calls: Arc<AtomicUsize>,
}

impl DatasetLoader for Counting {
    fn load(&self, accession: &str) -> Result<RawDataset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut fields = MetadataFields::new();
        fields.push("characteristics_ch1", "tissue: liver");
        Ok(RawDataset {
            accession: accession.to_string(),
            series: MetadataFields::new(),
            expression: vec![SampleExpression::new("GSM1", vec![("g1".to_string(), 1.0)])],
            annotations: vec![SampleAnnotation::new("GSM1", fields)],
        })
    }
}

#[test]
fn test_three_sample_report_from_local_files() {
    let input = tempdir().unwrap();
    let out = tempdir().unwrap();
    let (expression, annotations) = write_inputs(input.path());

    let loader = LocalLoader::new(&expression, &annotations);
    let mut explorer = Explorer::with_loader(Box::new(loader), no_charts());
    let (summary, written) = explore(&mut explorer, "local", Some("g1"), out.path()).unwrap();

    assert_eq!(summary.n_samples, 3);
    assert_eq!(summary.labels, vec!["A", "B"]);
    assert_eq!(summary.merge.missing_metadata, vec!["GSM4"]);
    assert_eq!(summary.notes[0].scope, "merge");

    // Welch, Mann-Whitney, Levene, and Shapiro-Wilk for each group
    assert_eq!(summary.tests.len(), 5);
    let mw = summary.tests.iter().find(|t| t.test == "mann_whitney_u").unwrap();
    assert!(mw.result.unwrap().statistic.is_finite());
    let failed = summary.tests.iter().filter(|t| t.error.is_some()).count();
    assert_eq!(failed, 4);

    assert_eq!(written.len(), 3);
    let table = fs::read_to_string(out.path().join("table.csv")).unwrap();
    assert_eq!(
        table,
        "sample_id,label,g1,g2\nGSM1,A,1,2\nGSM2,A,3,\nGSM3,B,5,6\n"
    );

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("summary.json")).unwrap())
            .unwrap();
    assert_eq!(json["gene"], "g1");
    assert_eq!(json["comparison"], "two_group");

    let metadata = fs::read_to_string(out.path().join("metadata.tsv")).unwrap();
    assert!(metadata.starts_with("field\tvalue\nexpression_file\t"));
}

#[test]
fn test_strict_merge_fails_request() {
    let input = tempdir().unwrap();
    let (expression, annotations) = write_inputs(input.path());

    let params = ExplorerParams {
        merge_policy: MergePolicy::Strict,
        ..no_charts()
    };
    let mut explorer =
        Explorer::with_loader(Box::new(LocalLoader::new(&expression, &annotations)), params);
    assert!(matches!(
        explorer.load("local"),
        Err(ExplorerError::Merge { .. })
    ));
    assert_eq!(explorer.cached(), 0);
}

#[test]
fn test_invalid_accession_produces_nothing() {
    let dest = tempdir().unwrap();
    let out = dest.path().join("report");
    let params = ExplorerParams {
        dest_dir: dest.path().to_path_buf(),
        ..no_charts()
    };
    let mut explorer = Explorer::geo(params);

    let err = explore(&mut explorer, "not-a-series", None, &out).unwrap_err();
    assert!(matches!(err, ExplorerError::Fetch { .. }));
    assert!(err.is_fatal());
    assert!(!out.exists());
}

#[test]
fn test_cache_reuses_dataset() {
    let calls = Arc::new(AtomicUsize::new(0));
    let loader = Counting {
        calls: Arc::clone(&calls),
    };
    let mut explorer = Explorer::with_loader(Box::new(loader), no_charts());

    let first = explorer.load("GSE10").unwrap();
    let second = explorer.load(" GSE10 ").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(explorer.invalidate("GSE10"));
    explorer.load("GSE10").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cache_key_ignores_case() {
    let calls = Arc::new(AtomicUsize::new(0));
    let loader = Counting {
        calls: Arc::clone(&calls),
    };
    let mut explorer = Explorer::with_loader(Box::new(loader), no_charts());

    let lower = explorer.load("gse10").unwrap();
    let upper = explorer.load("GSE10").unwrap();
    assert!(Arc::ptr_eq(&lower, &upper));
    assert_eq!(lower.accession, "GSE10");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(explorer.cached(), 1);

    assert!(explorer.invalidate("gse10"));
    assert_eq!(explorer.cached(), 0);
}

#[test]
fn test_disabled_cache_always_loads() {
    let calls = Arc::new(AtomicUsize::new(0));
    let loader = Counting {
        calls: Arc::clone(&calls),
    };
    let params = ExplorerParams {
        cache_capacity: Some(0),
        ..no_charts()
    };
    let mut explorer = Explorer::with_loader(Box::new(loader), params);

    explorer.load("GSE10").unwrap();
    explorer.load("GSE10").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(explorer.cached(), 0);
}

#[test]
fn test_single_group_report_has_no_tests() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut explorer = Explorer::with_loader(Box::new(Counting { calls }), no_charts());

    let (dataset, report) = explorer.run("GSE10", None).unwrap();
    assert_eq!(report.gene, "g1");
    assert_eq!(report.comparison.test_count(), 0);

    let summary = summarize_report(&dataset, &report);
    assert_eq!(summary.comparison, "single_group");
    assert!(summary.tests.is_empty());
}
