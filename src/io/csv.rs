//! Delimited text I/O: the labeled table export and local dataset input

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::data::{ExpressionTable, MetadataFields, SampleAnnotation, SampleExpression};
use crate::error::{ExplorerError, Result};
use crate::loader::parse_value;

/// Tab if the header line contains one, comma otherwise
fn detect_delimiter(path: &Path) -> Result<u8> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    if header.trim().is_empty() {
        return Err(ExplorerError::EmptyData {
            reason: format!("{} is empty", path.display()),
        });
    }
    Ok(if header.contains('\t') { b'\t' } else { b',' })
}

fn reader_for(path: &Path) -> Result<csv::Reader<File>> {
    let delimiter = detect_delimiter(path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?)
}

/// Read an expression matrix: gene ids in the first column, one column per sample
///
/// Empty, `null`, `NA` and other non-numeric cells are missing values.
pub fn read_expression_matrix<P: AsRef<Path>>(path: P) -> Result<Vec<SampleExpression>> {
    let mut reader = reader_for(path.as_ref())?;
    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(ExplorerError::InvalidInput {
            reason: "expression matrix needs a gene column and at least one sample column"
                .to_string(),
        });
    }

    let mut samples: Vec<SampleExpression> = headers
        .iter()
        .skip(1)
        .map(|id| SampleExpression::new(id, Vec::new()))
        .collect();

    for record in reader.records() {
        let record = record?;
        let Some(gene) = record.get(0).filter(|g| !g.is_empty()) else {
            continue;
        };
        for (sample, cell) in samples.iter_mut().zip(record.iter().skip(1)) {
            sample.values.push((gene.to_string(), parse_value(cell)));
        }
    }

    if samples.iter().all(|s| s.values.is_empty()) {
        return Err(ExplorerError::EmptyData {
            reason: "no genes found in expression matrix".to_string(),
        });
    }

    Ok(samples)
}

/// Read sample annotations: `sample_id` first, then one column per metadata field
///
/// Empty cells are left out, so a sample without a value lacks that field.
pub fn read_annotations<P: AsRef<Path>>(path: P) -> Result<Vec<SampleAnnotation>> {
    let mut reader = reader_for(path.as_ref())?;
    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(ExplorerError::InvalidInput {
            reason: "annotation table needs sample_id and at least one field column".to_string(),
        });
    }
    let fields: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut annotations = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(sample_id) = record.get(0).filter(|s| !s.is_empty()) else {
            continue;
        };
        let mut metadata = MetadataFields::new();
        for (field, value) in fields.iter().zip(record.iter().skip(1)) {
            if !value.is_empty() {
                metadata.push(field, value);
            }
        }
        annotations.push(SampleAnnotation::new(sample_id, metadata));
    }

    if annotations.is_empty() {
        return Err(ExplorerError::EmptyData {
            reason: "no samples found in annotation table".to_string(),
        });
    }

    Ok(annotations)
}

/// Write the labeled table as CSV: `sample_id`, `label`, then every gene
///
/// Missing values are written as empty cells.
pub fn write_table_to<W: Write>(writer: W, table: &ExpressionTable) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["sample_id", "label"];
    header.extend(table.gene_ids().iter().map(|g| g.as_str()));
    out.write_record(&header)?;

    for (i, (sample_id, label)) in table
        .sample_ids()
        .iter()
        .zip(table.labels().iter())
        .enumerate()
    {
        let mut row = vec![sample_id.clone(), label.clone()];
        row.extend(table.sample_row(i).iter().map(|&v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        out.write_record(&row)?;
    }

    out.flush()?;
    Ok(())
}

/// Write the labeled table to a CSV file
pub fn write_table<P: AsRef<Path>>(path: P, table: &ExpressionTable) -> Result<()> {
    write_table_to(File::create(path)?, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_expression_matrix_tab() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ID_REF\tGSM1\tGSM2").unwrap();
        writeln!(file, "g1\t1.5\t2").unwrap();
        writeln!(file, "g2\tnull\t\"3.0\"").unwrap();

        let samples = read_expression_matrix(file.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].sample_id, "GSM1");
        assert_eq!(samples[0].values[0], ("g1".to_string(), 1.5));
        assert!(samples[0].values[1].1.is_nan());
        assert_eq!(samples[1].values[1], ("g2".to_string(), 3.0));
    }

    #[test]
    fn test_read_expression_ragged_row_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene,S1,S2").unwrap();
        writeln!(file, "g1,1,2,3").unwrap();
        assert!(matches!(
            read_expression_matrix(file.path()),
            Err(ExplorerError::CsvError(_))
        ));
    }

    #[test]
    fn test_read_annotations() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id,characteristics_ch1,title").unwrap();
        writeln!(file, "S1,\"treatment: drug, 10 mg\",first").unwrap();
        writeln!(file, "S2,,second").unwrap();

        let annotations = read_annotations(file.path()).unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(
            annotations[0].fields.first("characteristics_ch1"),
            Some("treatment: drug, 10 mg")
        );
        assert_eq!(annotations[1].fields.first("characteristics_ch1"), None);
        assert_eq!(annotations[1].fields.first("title"), Some("second"));
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            read_annotations(file.path()),
            Err(ExplorerError::EmptyData { .. })
        ));
    }

    #[test]
    fn test_write_table() {
        let table = ExpressionTable::new(
            array![[1.0, f64::NAN], [2.5, 4.0]],
            vec!["s1".to_string(), "s2".to_string()],
            vec!["A".to_string(), "B, late".to_string()],
            vec!["g1".to_string(), "g2".to_string()],
        )
        .unwrap();

        let mut buf = Vec::new();
        write_table_to(&mut buf, &table).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "sample_id,label,g1,g2\ns1,A,1,\ns2,\"B, late\",2.5,4\n"
        );
    }
}
