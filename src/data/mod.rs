//! Data structures for labeled expression tables

pub mod builder;
mod label;
mod metadata;
mod sample;
mod table;

pub use builder::{build_table, BuildParams, IncompleteSample, MergePolicy, MergeReport, TableBuild};
pub use label::{extract_label, strip_label_prefix, DEFAULT_LABEL_FIELD, UNKNOWN_LABEL};
pub use metadata::MetadataFields;
pub use sample::{RawDataset, SampleAnnotation, SampleExpression, SampleRecord};
pub use table::{ExpressionTable, GeneSeries};
