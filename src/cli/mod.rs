//! Command-line interface for geo_explorer

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::{MergePolicy, DEFAULT_LABEL_FIELD};
use crate::plot::{ChartParams, DEFAULT_HEIGHT, DEFAULT_SQUARE, DEFAULT_WIDTH};
use crate::session::ExplorerParams;

/// Accession used when none is given
pub const DEFAULT_ACCESSION: &str = "GSE62945";

#[derive(Parser)]
#[command(name = "geo_explorer")]
#[command(version)]
#[command(about = "Explore GEO gene-expression datasets: group statistics, tests and charts")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Where datasets come from and how they are built
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Local expression matrix instead of a GEO download
    #[arg(long, value_name = "FILE", requires = "annotations",
        long_help = "Local expression matrix instead of a GEO download.\n\
            Format: first column = gene IDs, header row = sample IDs.\n\
            Tab or comma delimited (auto-detected).")]
    pub expression: Option<PathBuf>,

    /// Local sample annotation table (with --expression)
    #[arg(long, value_name = "FILE", requires = "expression",
        long_help = "Local sample annotation table, used with --expression.\n\
            Format: first column = sample_id, other columns = metadata fields\n\
            (the label is read from --label-field).")]
    pub annotations: Option<PathBuf>,

    /// Directory for downloaded SOFT files [default: .]
    #[arg(long, default_value = ".")]
    pub dest_dir: PathBuf,

    /// Download timeout in seconds [default: 120]
    #[arg(long, default_value = "120")]
    pub timeout: u64,

    /// Metadata field the group label is read from
    #[arg(long, default_value = DEFAULT_LABEL_FIELD)]
    pub label_field: String,

    /// Fail when expression and metadata disagree on sample IDs
    #[arg(long,
        long_help = "Fail when the expression values and the sample metadata do not list\n\
            the same sample IDs. By default unmatched samples are excluded and\n\
            reported as a note.")]
    pub strict: bool,

    /// Keep at most N datasets in memory (shell)
    #[arg(long, value_name = "N")]
    pub cache_capacity: Option<usize>,

    /// Disable the dataset cache
    #[arg(long)]
    pub no_cache: bool,
}

impl SourceArgs {
    /// Session settings from the source options; chart settings stay default
    pub fn params(&self) -> ExplorerParams {
        ExplorerParams {
            dest_dir: self.dest_dir.clone(),
            fetch_timeout: std::time::Duration::from_secs(self.timeout),
            label_field: self.label_field.clone(),
            merge_policy: if self.strict {
                MergePolicy::Strict
            } else {
                MergePolicy::Lenient
            },
            cache_capacity: if self.no_cache {
                Some(0)
            } else {
                self.cache_capacity
            },
            ..ExplorerParams::default()
        }
    }
}

/// Chart rendering options
#[derive(Args, Debug, Clone)]
pub struct ChartArgs {
    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Chart width in pixels
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Chart height in pixels
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Side of the heatmap and pair plot in pixels
    #[arg(long, default_value_t = DEFAULT_SQUARE)]
    pub square: u32,

    /// Seed of the strip plot jitter
    #[arg(long, default_value = "42")]
    pub seed: u32,
}

impl ChartArgs {
    pub fn apply(&self, params: &mut ExplorerParams) {
        params.render_charts = !self.no_charts;
        params.charts = ChartParams {
            width: self.width,
            height: self.height,
            square: self.square,
            jitter_seed: self.seed,
        };
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summary statistics, tests, charts and table export for one gene
    #[command(
        long_about = "Fetch a dataset, build the labeled expression table, and report on one gene.\n\n\
            Writes table.csv, charts.zip, summary.json and metadata.tsv to the output\n\
            directory and prints a summary.",
        after_long_help = "\
Examples:
  geo_explorer report GSE62945
  geo_explorer report GSE62945 --gene 1007_s_at -o out/
  geo_explorer report local --expression expr.tsv --annotations samples.csv --no-charts"
    )]
    Report {
        /// GEO series accession (or a name for local files)
        #[arg(default_value = DEFAULT_ACCESSION)]
        accession: String,

        /// Gene to report on [default: first gene column]
        #[arg(short, long)]
        gene: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = "geo_report")]
        output: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        charts: ChartArgs,
    },

    /// List the gene columns of a dataset
    Genes {
        #[arg(default_value = DEFAULT_ACCESSION)]
        accession: String,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the dataset metadata table
    Metadata {
        #[arg(default_value = DEFAULT_ACCESSION)]
        accession: String,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Interactive session: load datasets and select genes
    #[command(after_long_help = "\
Commands inside the shell:
  load <ACCESSION>   fetch (or reuse) a dataset
  gene <ID>          report on a gene of the loaded dataset
  genes              list gene columns
  metadata           print the dataset metadata
  export <DIR>       write the outputs of the last report
  quit               leave the shell")]
    Shell {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        charts: ChartArgs,
    },
}
