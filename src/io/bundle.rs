//! Zip bundle of rendered charts

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;
use crate::plot::RenderedChart;

/// Zip archive holding one PNG entry per chart, in chart order
pub fn bundle_charts(charts: &[&RenderedChart]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for chart in charts {
        zip.start_file(chart.file_name.as_str(), options)?;
        zip.write_all(&chart.png)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Write the chart bundle to a file
pub fn write_bundle<P: AsRef<Path>>(path: P, charts: &[&RenderedChart]) -> Result<()> {
    let bytes = bundle_charts(charts)?;
    fs::write(&path, bytes)?;
    log::info!(
        "Wrote {} charts to {}",
        charts.len(),
        path.as_ref().display()
    );
    Ok(())
}
