//! Chart rendering for one gene selection
//!
//! Nine fixed charts, each rendered with `plotters` into an RGB buffer and
//! encoded as PNG. A chart that cannot be drawn yields a render error for that
//! chart only; the others are still produced.

mod distribution;
mod matrix;

pub use distribution::{ecdf_points, histogram_edges, histogram_density, BoxSummary};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::data::{ExpressionTable, GeneSeries};
use crate::error::{ExplorerError, Result};
use crate::transform::CorrelationMatrix;

pub(crate) type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
pub(crate) type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Default chart width in pixels
pub const DEFAULT_WIDTH: u32 = 1000;
/// Default chart height in pixels
pub const DEFAULT_HEIGHT: u32 = 600;
/// Side of the square heatmap and pair plot
pub const DEFAULT_SQUARE: u32 = 1000;

/// Category colors, in label order
pub(crate) const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

pub(crate) fn color(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

/// The charts of a report, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Box,
    Violin,
    Strip,
    Line,
    Histogram,
    Cdf,
    ZScoreBox,
    Heatmap,
    PairPlot,
}

impl ChartKind {
    pub const ALL: [ChartKind; 9] = [
        ChartKind::Box,
        ChartKind::Violin,
        ChartKind::Strip,
        ChartKind::Line,
        ChartKind::Histogram,
        ChartKind::Cdf,
        ChartKind::ZScoreBox,
        ChartKind::Heatmap,
        ChartKind::PairPlot,
    ];

    /// File name inside the chart bundle
    pub fn file_name(&self) -> String {
        match self {
            ChartKind::PairPlot => "pairplot.png".to_string(),
            other => {
                let n = ChartKind::ALL
                    .iter()
                    .position(|k| k == other)
                    .map(|i| i + 1)
                    .unwrap_or(0);
                format!("chart_{}.png", n)
            }
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::Box => "Boxplot",
            ChartKind::Violin => "Violin plot",
            ChartKind::Strip => "Strip plot",
            ChartKind::Line => "Expression across samples",
            ChartKind::Histogram => "Histogram",
            ChartKind::Cdf => "CDF plot",
            ChartKind::ZScoreBox => "Z-score distribution",
            ChartKind::Heatmap => "Correlation heatmap (top genes by variance)",
            ChartKind::PairPlot => "Pair plot (top genes by variance)",
        }
    }

    fn is_square(&self) -> bool {
        matches!(self, ChartKind::Heatmap | ChartKind::PairPlot)
    }
}

/// Image size and jitter seed
#[derive(Debug, Clone)]
pub struct ChartParams {
    pub width: u32,
    pub height: u32,
    /// Side of the square charts
    pub square: u32,
    pub jitter_seed: u32,
}

impl Default for ChartParams {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            square: DEFAULT_SQUARE,
            jitter_seed: 42,
        }
    }
}

impl ChartParams {
    fn size(&self, kind: ChartKind) -> (u32, u32) {
        if kind.is_square() {
            (self.square, self.square)
        } else {
            (self.width, self.height)
        }
    }
}

/// One encoded chart
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Everything the charts of one gene selection are drawn from
pub struct ChartData<'a> {
    pub table: &'a ExpressionTable,
    pub series: &'a GeneSeries,
    pub zscores: &'a Result<GeneSeries>,
    pub correlation: &'a Result<CorrelationMatrix>,
    /// Genes of the pair plot
    pub pair_genes: &'a [String],
}

fn render_error(kind: ChartKind, reason: impl std::fmt::Display) -> ExplorerError {
    ExplorerError::Render {
        chart: kind.file_name(),
        reason: reason.to_string(),
    }
}

/// Encode an RGB buffer as PNG
pub fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| ExplorerError::Render {
            chart: "png".to_string(),
            reason: e.to_string(),
        })?;
    Ok(png)
}

fn render_png<F>(kind: ChartKind, params: &ChartParams, draw: F) -> Result<RenderedChart>
where
    F: FnOnce(&Area) -> DrawResult,
{
    let (width, height) = params.size(kind);
    let mut buffer = vec![255u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| render_error(kind, e))?;
        draw(&root).map_err(|e| render_error(kind, e))?;
        root.present().map_err(|e| render_error(kind, e))?;
    }
    let png = encode_png(&buffer, width, height).map_err(|e| render_error(kind, e))?;
    log::debug!("Rendered {} ({} bytes)", kind.file_name(), png.len());
    Ok(RenderedChart {
        kind,
        file_name: kind.file_name(),
        png,
    })
}

/// Render one chart
pub fn render_chart(kind: ChartKind, data: &ChartData, params: &ChartParams) -> Result<RenderedChart> {
    let gene = data.series.gene.as_str();
    match kind {
        ChartKind::Box => {
            let groups = data.series.groups();
            render_png(kind, params, |root| {
                distribution::draw_box(root, &groups, kind.title(), gene)
            })
        }
        ChartKind::Violin => {
            let groups = data.series.groups();
            render_png(kind, params, |root| {
                distribution::draw_violin(root, &groups, kind.title(), gene)
            })
        }
        ChartKind::Strip => {
            let groups = data.series.groups();
            render_png(kind, params, |root| {
                distribution::draw_strip(root, &groups, kind.title(), gene, params.jitter_seed)
            })
        }
        ChartKind::Line => {
            // sample order within each label, missing values kept as gaps
            let groups: Vec<(String, Vec<f64>)> = data
                .series
                .distinct_labels()
                .into_iter()
                .map(|l| {
                    let v = data.series.group_values(&l);
                    (l, v)
                })
                .collect();
            render_png(kind, params, |root| {
                distribution::draw_lines(root, &groups, kind.title())
            })
        }
        ChartKind::Histogram => {
            let groups = data.series.groups();
            render_png(kind, params, |root| {
                distribution::draw_histogram(root, &groups, kind.title(), gene)
            })
        }
        ChartKind::Cdf => {
            let groups = data.series.groups();
            render_png(kind, params, |root| {
                distribution::draw_cdf(root, &groups, kind.title())
            })
        }
        ChartKind::ZScoreBox => {
            let zscores = data
                .zscores
                .as_ref()
                .map_err(|e| render_error(kind, e))?;
            let groups = zscores.groups();
            render_png(kind, params, |root| {
                distribution::draw_box(root, &groups, kind.title(), "z_score")
            })
        }
        ChartKind::Heatmap => {
            let correlation = data
                .correlation
                .as_ref()
                .map_err(|e| render_error(kind, e))?;
            render_png(kind, params, |root| {
                matrix::draw_heatmap(root, correlation, kind.title())
            })
        }
        ChartKind::PairPlot => {
            if data.pair_genes.len() < 2 {
                return Err(render_error(
                    kind,
                    format!(
                        "needs at least 2 genes, table has {}",
                        data.pair_genes.len()
                    ),
                ));
            }
            render_png(kind, params, |root| {
                matrix::draw_pairplot(root, data.table, data.pair_genes, kind.title())
            })
        }
    }
}

/// Render every chart in order; a failure is kept with its chart
pub fn render_charts(data: &ChartData, params: &ChartParams) -> Vec<(ChartKind, Result<RenderedChart>)> {
    ChartKind::ALL
        .iter()
        .map(|&kind| {
            let result = render_chart(kind, data, params);
            if let Err(e) = &result {
                log::warn!("{}", e);
            }
            (kind, result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{correlation_matrix, top_variance_genes, zscore, PAIRPLOT_GENES};
    use ndarray::array;

    #[test]
    fn test_file_names_in_order() {
        let names: Vec<String> = ChartKind::ALL.iter().map(|k| k.file_name()).collect();
        assert_eq!(
            names,
            vec![
                "chart_1.png",
                "chart_2.png",
                "chart_3.png",
                "chart_4.png",
                "chart_5.png",
                "chart_6.png",
                "chart_7.png",
                "chart_8.png",
                "pairplot.png"
            ]
        );
    }

    #[test]
    fn test_encode_png_signature() {
        let rgb = vec![128u8; 4 * 3 * 3];
        let png = encode_png(&rgb, 4, 3).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_failures_scoped_to_chart() {
        let table = ExpressionTable::new(
            array![[1.0], [1.0], [1.0]],
            vec!["s1".into(), "s2".into(), "s3".into()],
            vec!["A".into(), "A".into(), "B".into()],
            vec!["g1".into()],
        )
        .unwrap();
        let series = table.gene_series("g1").unwrap();
        let zscores = zscore(&series);
        let correlation = correlation_matrix(&table, &top_variance_genes(&table, 10));
        let pair_genes = top_variance_genes(&table, PAIRPLOT_GENES);
        let data = ChartData {
            table: &table,
            series: &series,
            zscores: &zscores,
            correlation: &correlation,
            pair_genes: &pair_genes,
        };
        let params = ChartParams {
            width: 200,
            height: 120,
            square: 200,
            jitter_seed: 1,
        };

        let results = render_charts(&data, &params);
        assert_eq!(results.len(), 9);
        for (kind, result) in &results {
            match result {
                Ok(chart) => {
                    assert_eq!(chart.kind, *kind);
                    assert_eq!(&chart.png[1..4], b"PNG");
                }
                Err(e) => assert!(matches!(e, ExplorerError::Render { .. }), "{:?}", e),
            }
        }
        // constant gene: no z-scores, and one gene cannot make a pair plot
        assert!(results[6].1.is_err());
        assert!(results[8].1.is_err());
    }
}
