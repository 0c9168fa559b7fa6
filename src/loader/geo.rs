//! Loaders: NCBI GEO over HTTP, and local expression + annotation files

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use flate2::read::GzDecoder;

use super::soft::parse_soft;
use super::DatasetLoader;
use crate::data::{MetadataFields, RawDataset};
use crate::error::{ExplorerError, Result};
use crate::io::{read_annotations, read_expression_matrix};

const GEO_SERIES_URL: &str = "https://ftp.ncbi.nlm.nih.gov/geo/series";

/// Default time allowed for one download
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Normalise a series accession (`gse62945` -> `GSE62945`)
///
/// Only GEO series accessions are accepted.
pub fn validate_accession(accession: &str) -> Result<String> {
    let acc = accession.trim().to_ascii_uppercase();
    let digits = acc.strip_prefix("GSE").unwrap_or("");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExplorerError::Fetch {
            accession: accession.trim().to_string(),
            reason: "not a GEO series accession (expected GSE followed by digits)".to_string(),
        });
    }
    Ok(acc)
}

/// Family SOFT file name of a series
pub fn soft_filename(accession: &str) -> String {
    format!("{}_family.soft.gz", accession)
}

/// Download URL of a series' family SOFT file
///
/// GEO groups series in directories named after the accession with its last
/// three digits replaced by `nnn` (`GSE62945` lives in `GSE62nnn`).
pub fn soft_url(accession: &str) -> String {
    let digits = accession.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let prefix = &accession[..accession.len() - digits.len()];
    let keep = digits.len().saturating_sub(3);
    format!(
        "{}/{}{}nnn/{}/soft/{}",
        GEO_SERIES_URL,
        prefix,
        &digits[..keep],
        accession,
        soft_filename(accession)
    )
}

/// Fetches family SOFT files from NCBI GEO into a destination directory
///
/// A file already present in the directory is reused instead of downloaded.
#[derive(Debug, Clone)]
pub struct GeoLoader {
    dest_dir: PathBuf,
    timeout: Duration,
}

impl GeoLoader {
    pub fn new<P: AsRef<Path>>(dest_dir: P, timeout: Duration) -> Self {
        Self {
            dest_dir: dest_dir.as_ref().to_path_buf(),
            timeout,
        }
    }

    /// Local path of a series' SOFT file
    pub fn soft_path(&self, accession: &str) -> PathBuf {
        self.dest_dir.join(soft_filename(accession))
    }

    fn download(&self, accession: &str, dest: &Path) -> Result<()> {
        let url = soft_url(accession);
        let partial = dest.with_extension("gz.part");
        log::info!("Downloading {} (timeout {}s)", url, self.timeout.as_secs());

        let fetch_err = |reason: String| ExplorerError::Fetch {
            accession: accession.to_string(),
            reason,
        };

        let output = Command::new("curl")
            .arg("-f")
            .arg("-s")
            .arg("-S")
            .arg("-L")
            .arg("--max-time")
            .arg(self.timeout.as_secs().max(1).to_string())
            .arg("-o")
            .arg(&partial)
            .arg(&url)
            .output()
            .map_err(|e| fetch_err(format!("failed to run curl: {}", e)))?;

        if !output.status.success() {
            let _ = fs::remove_file(&partial);
            return Err(fetch_err(format!(
                "download failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let len = fs::metadata(&partial)?.len();
        if len == 0 {
            let _ = fs::remove_file(&partial);
            return Err(fetch_err("downloaded file is empty".to_string()));
        }

        fs::rename(&partial, dest)?;
        log::debug!("Saved {} bytes to {}", len, dest.display());
        Ok(())
    }
}

impl DatasetLoader for GeoLoader {
    fn load(&self, accession: &str) -> Result<RawDataset> {
        let accession = validate_accession(accession)?;
        let path = self.soft_path(&accession);

        if path.exists() {
            log::info!("Using cached file {}", path.display());
        } else {
            fs::create_dir_all(&self.dest_dir)?;
            self.download(&accession, &path)?;
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(GzDecoder::new(BufReader::new(file)));
        parse_soft(reader, &accession).map_err(|e| match e {
            ExplorerError::IoError(io) => ExplorerError::Fetch {
                accession: accession.clone(),
                reason: format!("cannot read {}: {}", path.display(), io),
            },
            other => other,
        })
    }
}

/// Loads a dataset from a local expression matrix and a sample annotation table
///
/// The matrix has gene ids in the first column and one column per sample;
/// the annotation table has `sample_id` first, then metadata columns.
#[derive(Debug, Clone)]
pub struct LocalLoader {
    expression: PathBuf,
    annotations: PathBuf,
}

impl LocalLoader {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(expression: P, annotations: Q) -> Self {
        Self {
            expression: expression.as_ref().to_path_buf(),
            annotations: annotations.as_ref().to_path_buf(),
        }
    }
}

impl DatasetLoader for LocalLoader {
    fn load(&self, accession: &str) -> Result<RawDataset> {
        let fetch_err = |path: &Path, e: ExplorerError| ExplorerError::Fetch {
            accession: accession.to_string(),
            reason: format!("{}: {}", path.display(), e),
        };

        let expression =
            read_expression_matrix(&self.expression).map_err(|e| fetch_err(&self.expression, e))?;
        let annotations =
            read_annotations(&self.annotations).map_err(|e| fetch_err(&self.annotations, e))?;

        let mut series = MetadataFields::new();
        series.push("expression_file", &self.expression.display().to_string());
        series.push("annotation_file", &self.annotations.display().to_string());

        log::info!(
            "Read {} expression columns and {} annotated samples for {}",
            expression.len(),
            annotations.len(),
            accession
        );

        Ok(RawDataset {
            accession: accession.to_string(),
            series,
            expression,
            annotations,
        })
    }
}
