//! Request pipeline: fetch -> build -> summarize -> render
//!
//! An [`Explorer`] owns a loader and a dataset cache. Loading is the only step
//! whose failure aborts a request; everything after it keeps its failures next
//! to the view they affect.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::data::{BuildParams, GeneSeries, MergePolicy, DEFAULT_LABEL_FIELD};
use crate::error::{ExplorerError, Result};
use crate::loader::{
    DatasetCache, DatasetLoader, GeoLoader, LoadedDataset, MemoryCache, NoCache,
    DEFAULT_FETCH_TIMEOUT,
};
use crate::plot::{render_charts, ChartData, ChartKind, ChartParams, RenderedChart};
use crate::testing::{summarize, Comparison, GroupStats};
use crate::transform::{
    correlation_matrix, top_variance_genes, zscore, CorrelationMatrix, CORRELATION_GENES,
    PAIRPLOT_GENES,
};

/// Settings of an explorer session
#[derive(Debug, Clone)]
pub struct ExplorerParams {
    /// Directory downloaded SOFT files are kept in
    pub dest_dir: PathBuf,
    pub fetch_timeout: Duration,
    /// Annotation field the group label is read from
    pub label_field: String,
    pub merge_policy: MergePolicy,
    /// `None` keeps every loaded dataset; `Some(0)` disables caching
    pub cache_capacity: Option<usize>,
    pub charts: ChartParams,
    pub render_charts: bool,
}

impl Default for ExplorerParams {
    fn default() -> Self {
        Self {
            dest_dir: PathBuf::from("."),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            label_field: DEFAULT_LABEL_FIELD.to_string(),
            merge_policy: MergePolicy::Lenient,
            cache_capacity: None,
            charts: ChartParams::default(),
            render_charts: true,
        }
    }
}

impl ExplorerParams {
    pub fn build_params(&self) -> BuildParams {
        BuildParams {
            label_field: self.label_field.clone(),
            merge_policy: self.merge_policy,
        }
    }

    fn make_cache(&self) -> Box<dyn DatasetCache> {
        match self.cache_capacity {
            Some(0) => Box::new(NoCache),
            Some(n) => Box::new(MemoryCache::with_capacity(n)),
            None => Box::new(MemoryCache::new()),
        }
    }
}

/// Everything computed for one gene selection
#[derive(Debug)]
pub struct GeneReport {
    pub accession: String,
    pub gene: String,
    /// Descriptive statistics per label, sorted by label
    pub stats: Vec<GroupStats>,
    pub comparison: Comparison,
    pub zscores: Result<GeneSeries>,
    /// Genes of the correlation heatmap, highest variance first
    pub top_genes: Vec<String>,
    pub correlation: Result<CorrelationMatrix>,
    pub pair_genes: Vec<String>,
    /// Empty when chart rendering is off
    pub charts: Vec<(ChartKind, Result<RenderedChart>)>,
}

impl GeneReport {
    /// Charts that rendered, in order
    pub fn rendered_charts(&self) -> Vec<&RenderedChart> {
        self.charts.iter().filter_map(|(_, r)| r.as_ref().ok()).collect()
    }
}

/// Accessions are case-insensitive, so `gse10` and `GSE10` share one entry
fn cache_key(accession: &str) -> String {
    accession.trim().to_ascii_uppercase()
}

/// A loader, a cache, and the session settings
pub struct Explorer {
    loader: Box<dyn DatasetLoader>,
    cache: Box<dyn DatasetCache>,
    params: ExplorerParams,
}

impl Explorer {
    pub fn new(
        loader: Box<dyn DatasetLoader>,
        cache: Box<dyn DatasetCache>,
        params: ExplorerParams,
    ) -> Self {
        Self {
            loader,
            cache,
            params,
        }
    }

    /// Session reading from any loader, cached per `params.cache_capacity`
    pub fn with_loader(loader: Box<dyn DatasetLoader>, params: ExplorerParams) -> Self {
        let cache = params.make_cache();
        Self::new(loader, cache, params)
    }

    /// Session fetching from NCBI GEO
    pub fn geo(params: ExplorerParams) -> Self {
        let loader = GeoLoader::new(&params.dest_dir, params.fetch_timeout);
        Self::with_loader(Box::new(loader), params)
    }

    pub fn params(&self) -> &ExplorerParams {
        &self.params
    }

    /// Number of datasets currently cached
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Forget a cached dataset so the next request fetches it again
    pub fn invalidate(&mut self, accession: &str) -> bool {
        self.cache.invalidate(&cache_key(accession))
    }

    /// Fetch and build a dataset, or return it from the cache
    pub fn load(&mut self, accession: &str) -> Result<Arc<LoadedDataset>> {
        let key = cache_key(accession);
        let key = key.as_str();
        if key.is_empty() {
            return Err(ExplorerError::Fetch {
                accession: String::new(),
                reason: "no accession identifier given".to_string(),
            });
        }
        let loader = &self.loader;
        let build_params = self.params.build_params();
        self.cache.get_or_load(key, &mut || {
            log::info!("Loading {}", key);
            let raw = loader.load(key)?;
            LoadedDataset::from_raw(raw, &build_params)
        })
    }

    /// Statistics, derived views, and charts for one gene
    ///
    /// Without a gene, the first gene column is used. An unknown gene is an
    /// error; failures of single tests or charts are kept inside the report.
    pub fn report(&self, dataset: &LoadedDataset, gene: Option<&str>) -> Result<GeneReport> {
        let table = dataset.table();
        let gene = match gene {
            Some(g) => g.to_string(),
            None => table
                .gene_ids()
                .first()
                .cloned()
                .ok_or_else(|| ExplorerError::EmptyData {
                    reason: format!("{} has no gene columns", dataset.accession),
                })?,
        };

        let (stats, comparison) = summarize(table, &gene)?;
        let series = table.gene_series(&gene)?;
        let zscores = zscore(&series);

        let top_genes = top_variance_genes(table, CORRELATION_GENES);
        let correlation = correlation_matrix(table, &top_genes);
        let pair_genes: Vec<String> = top_genes.iter().take(PAIRPLOT_GENES).cloned().collect();
        log::debug!("Top variance genes: {:?}", top_genes);

        let charts = if self.params.render_charts {
            let data = ChartData {
                table,
                series: &series,
                zscores: &zscores,
                correlation: &correlation,
                pair_genes: &pair_genes,
            };
            render_charts(&data, &self.params.charts)
        } else {
            Vec::new()
        };

        Ok(GeneReport {
            accession: dataset.accession.clone(),
            gene,
            stats,
            comparison,
            zscores,
            top_genes,
            correlation,
            pair_genes,
            charts,
        })
    }

    /// Load a dataset and report on one gene
    pub fn run(&mut self, accession: &str, gene: Option<&str>) -> Result<(Arc<LoadedDataset>, GeneReport)> {
        let dataset = self.load(accession)?;
        let report = self.report(&dataset, gene)?;
        Ok((dataset, report))
    }
}
