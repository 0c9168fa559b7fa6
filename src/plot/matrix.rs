//! Multi-gene charts: correlation heatmap and pair plot

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::distribution::{
    caption_font, category_label, histogram_density, histogram_edges, value_bounds,
};
use super::{color, Area, DrawResult};
use crate::data::ExpressionTable;
use crate::transform::CorrelationMatrix;

const NEGATIVE: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
const POSITIVE: (f64, f64, f64) = (180.0, 4.0, 38.0);

/// Diverging blue-white-red color for a coefficient in [-1, 1]
fn diverging(r: f64) -> RGBColor {
    if r.is_nan() {
        return RGBColor(160, 160, 160);
    }
    let r = r.clamp(-1.0, 1.0);
    let (from, to, t) = if r < 0.0 {
        (NEUTRAL, NEGATIVE, -r)
    } else {
        (NEUTRAL, POSITIVE, r)
    };
    let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

pub(crate) fn draw_heatmap(root: &Area, matrix: &CorrelationMatrix, title: &str) -> DrawResult {
    let k = matrix.genes.len();
    if k == 0 {
        return Err("no genes to correlate".into());
    }
    let labels: Vec<&str> = matrix.genes.iter().map(|g| g.as_str()).collect();
    // rows are drawn top to bottom
    let row_labels: Vec<&str> = labels.iter().rev().copied().collect();
    let x_fmt = |x: &f64| category_label(&labels, *x);
    let y_fmt = |y: &f64| category_label(&row_labels, *y);
    let extent = k as f64 - 0.5;

    let mut chart = ChartBuilder::on(root)
        .caption(title, caption_font())
        .margin(10)
        .x_label_area_size(120)
        .y_label_area_size(120)
        .build_cartesian_2d(-0.5..extent, -0.5..extent)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(k)
        .y_labels(k)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .draw()?;

    let text_style = TextStyle::from(("sans-serif", 14).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));

    for i in 0..k {
        let y = (k - 1 - i) as f64;
        for j in 0..k {
            let x = j as f64;
            let r = matrix.values[[i, j]];
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                diverging(r).filled(),
            )))?;
            let text = if r.is_nan() {
                "nan".to_string()
            } else {
                format!("{:.2}", r)
            };
            chart.draw_series(std::iter::once(Text::new(text, (x, y), text_style.clone())))?;
        }
    }
    Ok(())
}

pub(crate) fn draw_pairplot(
    root: &Area,
    table: &ExpressionTable,
    genes: &[String],
    title: &str,
) -> DrawResult {
    let columns: Vec<Vec<f64>> = genes
        .iter()
        .map(|g| {
            table
                .gene_index(g)
                .map(|j| table.gene_column(j).to_vec())
                .ok_or_else(|| format!("unknown gene {}", g))
        })
        .collect::<std::result::Result<_, _>>()?;
    let bounds: Vec<(f64, f64)> = columns
        .iter()
        .zip(genes)
        .map(|(c, g)| value_bounds(c.iter(), 0.05).ok_or_else(|| format!("no values for {}", g)))
        .collect::<std::result::Result<_, _>>()?;

    let distinct = table.distinct_labels();
    let label_idx: Vec<usize> = table
        .labels()
        .iter()
        .map(|l| distinct.iter().position(|d| d == l).unwrap_or(0))
        .collect();

    let m = genes.len();
    let area = root.titled(title, caption_font())?;
    let panels = area.split_evenly((m, m));

    for (idx, panel) in panels.iter().enumerate() {
        let (row, col) = (idx / m, idx % m);
        let (x_lo, x_hi) = bounds[col];
        let bottom = row == m - 1;
        let left = col == 0;

        if row == col {
            let present: Vec<f64> = columns[col].iter().copied().filter(|v| !v.is_nan()).collect();
            let edges = histogram_edges(&present);
            let total = present.len() as f64;
            let layers: Vec<Vec<f64>> = (0..distinct.len())
                .map(|g| {
                    let values: Vec<f64> = columns[col]
                        .iter()
                        .zip(&label_idx)
                        .filter(|(v, &li)| li == g && !v.is_nan())
                        .map(|(&v, _)| v)
                        .collect();
                    let weight = values.len() as f64 / total;
                    histogram_density(&values, &edges)
                        .into_iter()
                        .map(|d| if d.is_finite() { d * weight } else { 0.0 })
                        .collect()
                })
                .collect();
            let peak = layers.iter().flatten().copied().fold(0.0, f64::max);
            let y_hi = if peak > 0.0 { peak * 1.1 } else { 1.0 };

            let mut chart = ChartBuilder::on(panel)
                .margin(4)
                .x_label_area_size(if bottom { 40 } else { 0 })
                .y_label_area_size(if left { 50 } else { 0 })
                .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;
            let mut mesh = chart.configure_mesh();
            mesh.x_labels(3).y_labels(3);
            if bottom {
                mesh.x_desc(genes[col].as_str());
            }
            if left {
                mesh.y_desc(genes[row].as_str());
            }
            mesh.draw()?;

            for (g, bars) in layers.iter().enumerate() {
                let c = color(g);
                chart.draw_series(bars.iter().enumerate().map(|(b, &d)| {
                    Rectangle::new([(edges[b], 0.0), (edges[b + 1], d)], c.mix(0.4).filled())
                }))?;
            }
        } else {
            let (y_lo, y_hi) = bounds[row];
            let mut chart = ChartBuilder::on(panel)
                .margin(4)
                .x_label_area_size(if bottom { 40 } else { 0 })
                .y_label_area_size(if left { 50 } else { 0 })
                .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
            let mut mesh = chart.configure_mesh();
            mesh.x_labels(3).y_labels(3);
            if bottom {
                mesh.x_desc(genes[col].as_str());
            }
            if left {
                mesh.y_desc(genes[row].as_str());
            }
            mesh.draw()?;

            chart.draw_series(
                columns[col]
                    .iter()
                    .zip(&columns[row])
                    .zip(&label_idx)
                    .filter(|((x, y), _)| !x.is_nan() && !y.is_nan())
                    .map(|((&x, &y), &g)| Circle::new((x, y), 3, color(g).filled())),
            )?;
        }
    }
    Ok(())
}
