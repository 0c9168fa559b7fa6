//! geo_explorer: group statistics and charts for GEO expression datasets
//!
//! Fetches a GEO series, joins its expression values with the sample
//! metadata into one labeled table, and reports on a single gene:
//! descriptive statistics per group, the hypothesis tests that fit the
//! number of groups, derived views (z-scores, a correlation matrix of the
//! most variable genes) and a fixed set of charts.
//!
//! # Example
//!
//! ```ignore
//! use geo_explorer::prelude::*;
//!
//! let mut explorer = Explorer::geo(ExplorerParams::default());
//! let (dataset, report) = explorer.run("GSE62945", Some("1007_s_at"))?;
//!
//! let summary = summarize_report(&dataset, &report);
//! println!("{}", render_text(&summary));
//! write_outputs("geo_report", &dataset, &report, &summary)?;
//! ```

pub mod cli;
pub mod data;
pub mod error;
pub mod io;
pub mod loader;
pub mod plot;
pub mod rng;
pub mod session;
pub mod shell;
pub mod stats;
pub mod testing;
pub mod transform;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::data::{
        build_table, BuildParams, ExpressionTable, GeneSeries, MergePolicy, MetadataFields,
        RawDataset, SampleAnnotation, SampleExpression,
    };
    pub use crate::error::{ExplorerError, Result};
    pub use crate::io::{
        read_annotations, read_expression_matrix, render_text, summarize_report, write_metadata,
        write_outputs, write_table, ReportSummary,
    };
    pub use crate::loader::{
        DatasetCache, DatasetLoader, GeoLoader, LoadedDataset, LocalLoader, MemoryCache, NoCache,
    };
    pub use crate::plot::{render_charts, ChartKind, ChartParams, RenderedChart};
    pub use crate::session::{Explorer, ExplorerParams, GeneReport};
    pub use crate::shell::run_shell;
    pub use crate::testing::{summarize, Comparison, GroupStats, TestStatistic};
    pub use crate::transform::{correlation_matrix, top_variance_genes, zscore, CorrelationMatrix};
}

use std::path::{Path, PathBuf};

use prelude::*;

/// Report on one gene of a dataset and write every output into `out_dir`
///
/// Returns the summary and the paths written. A fetch failure stops here
/// with no output; failures of single tests or charts end up as notes.
pub fn explore<P: AsRef<Path>>(
    explorer: &mut Explorer,
    accession: &str,
    gene: Option<&str>,
    out_dir: P,
) -> Result<(ReportSummary, Vec<PathBuf>)> {
    let (dataset, report) = explorer.run(accession, gene)?;
    let summary = summarize_report(&dataset, &report);
    let written = write_outputs(out_dir, &dataset, &report, &summary)?;
    Ok((summary, written))
}
