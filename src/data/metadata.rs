//! Ordered metadata fields for series and samples

use serde::{Deserialize, Serialize};

/// Metadata fields in the order they were first seen
///
/// A field can carry several values (GEO repeats keys such as
/// `characteristics_ch1`); values keep their file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFields {
    fields: Vec<(String, Vec<String>)>,
}

impl MetadataFields {
    /// Create an empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to a field, creating the field if needed
    pub fn push(&mut self, key: &str, value: &str) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value.to_string()),
            None => self
                .fields
                .push((key.to_string(), vec![value.to_string()])),
        }
    }

    /// All values of a field
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// First value of a field
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(|s| s.as_str())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Two-column display rows: every field with a non-empty first value, first value only
    pub fn display_rows(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.first().map(|first| (k, first)))
            .filter(|(_, first)| !first.trim().is_empty())
            .map(|(k, first)| (k.clone(), first.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_accumulate() {
        let mut fields = MetadataFields::new();
        fields.push("title", "Liver study");
        fields.push("characteristics_ch1", "tissue: liver");
        fields.push("characteristics_ch1", "sex: male");

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.first("characteristics_ch1"), Some("tissue: liver"));
        assert_eq!(fields.get("characteristics_ch1").unwrap().len(), 2);
        assert_eq!(fields.first("missing"), None);
    }

    #[test]
    fn test_display_rows_keep_order() {
        let mut fields = MetadataFields::new();
        fields.push("title", "A");
        fields.push("summary", "B");
        fields.push("title", "C");
        fields.push("contributor", "");

        let rows = fields.display_rows();
        assert_eq!(
            rows,
            vec![
                ("title".to_string(), "A".to_string()),
                ("summary".to_string(), "B".to_string()),
            ]
        );
    }
}
