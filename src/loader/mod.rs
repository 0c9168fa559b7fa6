//! Dataset loading and the per-accession cache
//!
//! A [`DatasetLoader`] turns an accession identifier into raw per-sample
//! records or fails with a fetch error. Loaded datasets are built into a
//! labeled table once and kept in a [`DatasetCache`].

mod cache;
mod geo;
mod soft;

pub use cache::{DatasetCache, MemoryCache, NoCache};
pub use geo::{
    soft_filename, soft_url, validate_accession, GeoLoader, LocalLoader, DEFAULT_FETCH_TIMEOUT,
};
pub use soft::{parse_soft, parse_value};

use crate::data::{build_table, BuildParams, ExpressionTable, MetadataFields, RawDataset, TableBuild};
use crate::error::Result;

/// Source of raw datasets
pub trait DatasetLoader {
    /// Retrieve the raw records of one dataset
    ///
    /// An invalid or unreachable identifier is a fetch error; partial data is
    /// never returned.
    fn load(&self, accession: &str) -> Result<RawDataset>;
}

/// A dataset built into its labeled table, as kept in the cache
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub accession: String,
    /// Series-level metadata for the metadata display
    pub series: MetadataFields,
    pub build: TableBuild,
}

impl LoadedDataset {
    /// Build the labeled table from raw records
    pub fn from_raw(raw: RawDataset, params: &BuildParams) -> Result<Self> {
        let build = build_table(&raw, params)?;
        Ok(Self {
            accession: raw.accession,
            series: raw.series,
            build,
        })
    }

    pub fn table(&self) -> &ExpressionTable {
        &self.build.table
    }
}
