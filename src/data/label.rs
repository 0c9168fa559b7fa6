//! Group label extraction from sample metadata

use std::sync::LazyLock;

use regex::Regex;

use super::MetadataFields;

/// Label assigned to samples whose metadata lacks the label field
pub const UNKNOWN_LABEL: &str = "unknown";

/// Sample field the label is read from unless configured otherwise
pub const DEFAULT_LABEL_FIELD: &str = "characteristics_ch1";

// Greedy and line-bound, so "a: b: c" loses everything through the last ": ".
static LABEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(".*: ").expect("label prefix pattern is valid"));

/// Strip a leading `<category>: ` prefix from a raw metadata value
///
/// This is a narrow heuristic, not a metadata parser: every match of `.*: `
/// is removed. Text without a colon-space passes through unchanged, and a
/// colon not followed by a space is left alone.
pub fn strip_label_prefix(raw: &str) -> String {
    LABEL_PREFIX.replace_all(raw, "").into_owned()
}

/// Derive a group label from sample metadata
///
/// Uses the first value of `field`; a missing field yields [`UNKNOWN_LABEL`].
pub fn extract_label(fields: &MetadataFields, field: &str) -> String {
    let raw = fields.first(field).unwrap_or(UNKNOWN_LABEL);
    strip_label_prefix(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_simple_prefix() {
        assert_eq!(strip_label_prefix("tissue: liver"), "liver");
        assert_eq!(strip_label_prefix("disease state: control"), "control");
    }

    #[test]
    fn test_strip_passes_through_unformatted() {
        assert_eq!(strip_label_prefix("control"), "control");
        assert_eq!(strip_label_prefix("ratio 1:2"), "ratio 1:2");
        assert_eq!(strip_label_prefix("time:24h"), "time:24h");
        assert_eq!(strip_label_prefix(""), "");
    }

    #[test]
    fn test_strip_multiple_separators() {
        // Greedy match removes through the last colon-space
        assert_eq!(strip_label_prefix("agent: drug: dose: 10mg"), "10mg");
        // Trailing colon-space strips to nothing
        assert_eq!(strip_label_prefix("tissue: "), "");
    }

    #[test]
    fn test_strip_is_idempotent() {
        for raw in [
            "tissue: liver",
            "a: b: c",
            "plain",
            "x:y",
            "trailing: ",
            "cell type: T cell: CD4+",
        ] {
            let once = strip_label_prefix(raw);
            let twice = strip_label_prefix(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_extract_label_defaults_to_unknown() {
        let mut fields = MetadataFields::new();
        assert_eq!(extract_label(&fields, DEFAULT_LABEL_FIELD), UNKNOWN_LABEL);

        fields.push(DEFAULT_LABEL_FIELD, "genotype: wild type");
        fields.push(DEFAULT_LABEL_FIELD, "age: 8 weeks");
        assert_eq!(extract_label(&fields, DEFAULT_LABEL_FIELD), "wild type");
    }
}
