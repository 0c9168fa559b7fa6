//! Raw per-sample records as delivered by a dataset loader

use serde::{Deserialize, Serialize};

use super::label::extract_label;
use super::MetadataFields;

/// Expression values of one sample, in the order the source listed them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleExpression {
    pub sample_id: String,
    /// (gene identifier, value); NaN marks a missing value
    pub values: Vec<(String, f64)>,
}

impl SampleExpression {
    pub fn new(sample_id: &str, values: Vec<(String, f64)>) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            values,
        }
    }
}

/// Free-text metadata of one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleAnnotation {
    pub sample_id: String,
    pub fields: MetadataFields,
}

impl SampleAnnotation {
    pub fn new(sample_id: &str, fields: MetadataFields) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            fields,
        }
    }
}

/// A sample joined from both sources: its values plus its derived group label
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub sample_id: String,
    pub values: Vec<(String, f64)>,
    pub label: String,
}

impl SampleRecord {
    /// Join an expression row with its annotation, reading the label from `label_field`
    pub fn join(
        expression: &SampleExpression,
        annotation: &SampleAnnotation,
        label_field: &str,
    ) -> Self {
        Self {
            sample_id: expression.sample_id.clone(),
            values: expression.values.clone(),
            label: extract_label(&annotation.fields, label_field),
        }
    }
}

/// Everything a loader returns for one accession identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    pub accession: String,
    /// Series-level metadata shown in the metadata table
    pub series: MetadataFields,
    pub expression: Vec<SampleExpression>,
    pub annotations: Vec<SampleAnnotation>,
}

impl RawDataset {
    pub fn n_samples(&self) -> usize {
        self.expression.len()
    }
}
