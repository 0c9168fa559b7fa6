//! Derived views of the expression table
//!
//! Per-selection z-scores and the table-wide variance ranking that picks the
//! genes shown in the correlation heatmap and the pair plot.

mod variance;
mod zscore;

pub use variance::{
    correlation_matrix, gene_variances, top_variance_genes, CorrelationMatrix,
    CORRELATION_GENES, PAIRPLOT_GENES,
};
pub use zscore::zscore;
