//! Reader for GEO family SOFT files
//!
//! A SOFT file is a sequence of entities. `^ENTITY = id` opens one,
//! `!Entity_key = value` lines attach metadata to it, and
//! `!entity_table_begin` / `!entity_table_end` enclose a tab-separated table.
//! Only the series metadata and the samples (metadata plus the `ID_REF` /
//! `VALUE` columns of their tables) are kept.

use std::io::BufRead;

use crate::data::{MetadataFields, RawDataset, SampleAnnotation, SampleExpression};
use crate::error::{ExplorerError, Result};

const ID_COLUMN: &str = "ID_REF";
const VALUE_COLUMN: &str = "VALUE";

#[derive(Debug, Clone, Copy, PartialEq)]
enum EntityKind {
    Series,
    Sample,
    Other,
}

impl EntityKind {
    fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "SERIES" => EntityKind::Series,
            "SAMPLE" => EntityKind::Sample,
            _ => EntityKind::Other,
        }
    }
}

/// Sample being assembled while its lines are read
struct SampleBuilder {
    id: String,
    fields: MetadataFields,
    values: Vec<(String, f64)>,
    has_table: bool,
}

/// Column positions of the table being read
enum TableState {
    Outside,
    /// Inside a table, header not read yet
    Header,
    /// Inside a sample table with known column positions
    Sample { id_col: usize, value_col: usize },
    /// Inside a table that is not kept
    Skipped,
}

/// Parse a value cell; `null`, empty and unparseable cells are missing
pub fn parse_value(cell: &str) -> f64 {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("null") {
        return f64::NAN;
    }
    cell.parse::<f64>().unwrap_or(f64::NAN)
}

/// Split `!Entity_key = value` into the key without its entity prefix and the value
fn split_attribute(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_prefix('!')?;
    let (name, value) = match body.split_once('=') {
        Some((n, v)) => (n.trim(), v.trim()),
        None => (body.trim(), ""),
    };
    let key = name.split_once('_').map(|(_, k)| k).unwrap_or(name);
    Some((key, value))
}

/// Read a SOFT document into the raw per-sample records of one dataset
pub fn parse_soft<R: BufRead>(reader: R, accession: &str) -> Result<RawDataset> {
    let mut series = MetadataFields::new();
    let mut series_id: Option<String> = None;
    let mut samples: Vec<SampleBuilder> = Vec::new();
    let mut entity = EntityKind::Other;
    let mut table = TableState::Outside;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let line = line.trim_end_matches(['\r', '\n']);

        if line.is_empty() {
            continue;
        }

        let lower = line.to_ascii_lowercase();
        if lower.starts_with('!') && lower.ends_with("_table_begin") {
            if !matches!(table, TableState::Outside) {
                return Err(ExplorerError::SoftParse {
                    line: line_no,
                    reason: "table opened inside another table".to_string(),
                });
            }
            table = if entity == EntityKind::Sample {
                TableState::Header
            } else {
                TableState::Skipped
            };
            continue;
        }
        if lower.starts_with('!') && lower.ends_with("_table_end") {
            if matches!(table, TableState::Outside) {
                return Err(ExplorerError::SoftParse {
                    line: line_no,
                    reason: "table end without a table".to_string(),
                });
            }
            table = TableState::Outside;
            continue;
        }

        match table {
            TableState::Skipped => continue,
            TableState::Header => {
                let header: Vec<&str> = line.split('\t').map(str::trim).collect();
                let id_col = header.iter().position(|c| *c == ID_COLUMN);
                let value_col = header.iter().position(|c| *c == VALUE_COLUMN);
                let sample_id = samples.last().map(|s| s.id.clone()).unwrap_or_default();
                match (id_col, value_col) {
                    (Some(id_col), Some(value_col)) => {
                        if let Some(sample) = samples.last_mut() {
                            sample.has_table = true;
                        }
                        table = TableState::Sample { id_col, value_col };
                    }
                    _ => {
                        return Err(ExplorerError::Fetch {
                            accession: accession.to_string(),
                            reason: format!(
                                "sample {} table lacks {} or {} column (line {})",
                                sample_id, ID_COLUMN, VALUE_COLUMN, line_no
                            ),
                        });
                    }
                }
                continue;
            }
            TableState::Sample { id_col, value_col } => {
                let cells: Vec<&str> = line.split('\t').collect();
                let gene = cells.get(id_col).map(|c| c.trim()).unwrap_or("");
                if gene.is_empty() {
                    continue;
                }
                let value = cells.get(value_col).map(|c| parse_value(c)).unwrap_or(f64::NAN);
                if let Some(sample) = samples.last_mut() {
                    sample.values.push((gene.to_string(), value));
                }
                continue;
            }
            TableState::Outside => {}
        }

        if let Some(rest) = line.strip_prefix('^') {
            let (tag, id) = rest.split_once('=').ok_or_else(|| ExplorerError::SoftParse {
                line: line_no,
                reason: format!("entity line without '=': {}", line),
            })?;
            let id = id.trim();
            entity = EntityKind::from_tag(tag.trim());
            match entity {
                EntityKind::Series => series_id = Some(id.to_string()),
                EntityKind::Sample => samples.push(SampleBuilder {
                    id: id.to_string(),
                    fields: MetadataFields::new(),
                    values: Vec::new(),
                    has_table: false,
                }),
                EntityKind::Other => {}
            }
        } else if line.starts_with('!') {
            let Some((key, value)) = split_attribute(line) else {
                continue;
            };
            match entity {
                EntityKind::Series => series.push(key, value),
                EntityKind::Sample => {
                    if let Some(sample) = samples.last_mut() {
                        sample.fields.push(key, value);
                    }
                }
                EntityKind::Other => {}
            }
        }
        // '#' column descriptions and anything else outside a table are not kept
    }

    if !matches!(table, TableState::Outside) {
        return Err(ExplorerError::SoftParse {
            line: 0,
            reason: "file ended inside a table".to_string(),
        });
    }

    if samples.is_empty() {
        return Err(ExplorerError::Fetch {
            accession: accession.to_string(),
            reason: "no samples in SOFT file".to_string(),
        });
    }

    match &series_id {
        Some(id) if !id.eq_ignore_ascii_case(accession) => {
            log::warn!("SOFT file describes series {}, requested {}", id, accession);
        }
        None => log::warn!("SOFT file for {} has no series entity", accession),
        _ => {}
    }

    let without_table = samples.iter().filter(|s| !s.has_table).count();
    if without_table > 0 {
        log::warn!("{} samples of {} have no data table", without_table, accession);
    }

    log::info!(
        "Parsed {}: {} samples, {} series fields",
        accession,
        samples.len(),
        series.len()
    );

    let mut expression = Vec::with_capacity(samples.len());
    let mut annotations = Vec::with_capacity(samples.len());
    for sample in samples {
        expression.push(SampleExpression::new(&sample.id, sample.values));
        annotations.push(SampleAnnotation::new(&sample.id, sample.fields));
    }

    Ok(RawDataset {
        accession: accession.to_string(),
        series,
        expression,
        annotations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FAMILY: &str = "\
^DATABASE = GeoMiame
!Database_name = Gene Expression Omnibus (GEO)
^SERIES = GSE1
!Series_title = Liver versus kidney
!Series_summary = Two tissues
!Series_type = Expression profiling by array
!Series_contributor =
^PLATFORM = GPL1
!Platform_title = Test array
!platform_table_begin
ID\tGENE_SYMBOL
p1\tABC1
!platform_table_end
^SAMPLE = GSM1
!Sample_title = liver rep 1
!Sample_characteristics_ch1 = tissue: liver
!Sample_characteristics_ch1 = age: 4 weeks
#ID_REF = probe identifier
#VALUE = normalized signal
!sample_table_begin
ID_REF\tVALUE\tDETECTION
p1\t8.5\tP
p2\tnull\tA
!sample_table_end
^SAMPLE = GSM2
!Sample_title = kidney rep 1
!Sample_characteristics_ch1 = tissue: kidney
!sample_table_begin
ID_REF\tVALUE
p1\t3.25
p2\t
!sample_table_end
";

    #[test]
    fn test_parse_family() {
        let raw = parse_soft(Cursor::new(FAMILY), "GSE1").unwrap();
        assert_eq!(raw.accession, "GSE1");
        assert_eq!(raw.n_samples(), 2);

        assert_eq!(raw.series.first("title"), Some("Liver versus kidney"));
        assert_eq!(raw.series.first("contributor"), Some(""));
        assert!(raw.series.get("name").is_none());

        let gsm1 = &raw.expression[0];
        assert_eq!(gsm1.sample_id, "GSM1");
        assert_eq!(gsm1.values.len(), 2);
        assert_eq!(gsm1.values[0], ("p1".to_string(), 8.5));
        assert!(gsm1.values[1].1.is_nan());
        assert!(raw.expression[1].values[1].1.is_nan());

        let ann = &raw.annotations[0].fields;
        assert_eq!(
            ann.get("characteristics_ch1").unwrap(),
            &["tissue: liver".to_string(), "age: 4 weeks".to_string()]
        );
        assert_eq!(raw.annotations[1].fields.first("characteristics_ch1"), Some("tissue: kidney"));
    }

    #[test]
    fn test_platform_table_skipped() {
        let raw = parse_soft(Cursor::new(FAMILY), "GSE1").unwrap();
        assert!(raw
            .expression
            .iter()
            .all(|s| s.values.iter().all(|(g, _)| g != "ID")));
    }

    #[test]
    fn test_missing_value_column_is_fetch_error() {
        let text = "^SERIES = GSE2\n^SAMPLE = GSM9\n!sample_table_begin\nID_REF\tSIGNAL\np1\t1.0\n!sample_table_end\n";
        let err = parse_soft(Cursor::new(text), "GSE2").unwrap_err();
        assert!(matches!(err, ExplorerError::Fetch { .. }));
        assert!(err.to_string().contains("GSM9"));
    }

    #[test]
    fn test_no_samples_is_fetch_error() {
        let text = "^SERIES = GSE3\n!Series_title = empty\n";
        assert!(matches!(
            parse_soft(Cursor::new(text), "GSE3"),
            Err(ExplorerError::Fetch { .. })
        ));
    }

    #[test]
    fn test_unterminated_table() {
        let text = "^SAMPLE = GSM1\n!sample_table_begin\nID_REF\tVALUE\np1\t1\n";
        assert!(matches!(
            parse_soft(Cursor::new(text), "GSE4"),
            Err(ExplorerError::SoftParse { .. })
        ));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(" 2.5 "), 2.5);
        assert_eq!(parse_value("-1e-3"), -0.001);
        assert!(parse_value("null").is_nan());
        assert!(parse_value("NULL").is_nan());
        assert!(parse_value("").is_nan());
        assert!(parse_value("n/a").is_nan());
    }

    #[test]
    fn test_split_attribute() {
        assert_eq!(
            split_attribute("!Sample_characteristics_ch1 = cell type: T"),
            Some(("characteristics_ch1", "cell type: T"))
        );
        assert_eq!(split_attribute("!Series_note"), Some(("note", "")));
        assert_eq!(split_attribute("no bang"), None);
    }
}
