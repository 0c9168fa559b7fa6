//! Per-label distribution charts of one gene: box, violin, strip, line,
//! histogram and empirical CDF

use plotters::prelude::*;

use super::{color, Area, DrawResult};
use crate::rng::MersenneTwister;
use crate::stats::{gaussian_kde, quantile_sorted, sort_values};

const BOX_HALF_WIDTH: f64 = 0.3;
const VIOLIN_HALF_WIDTH: f64 = 0.4;
const STRIP_JITTER: f64 = 0.2;
const KDE_POINTS: usize = 100;

/// Quartiles, whiskers at 1.5 IQR, and the points beyond them
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sort_values(&mut sorted);
        let q1 = quantile_sorted(&sorted, 0.25);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let low_fence = q1 - 1.5 * iqr;
        let high_fence = q3 + 1.5 * iqr;

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|&v| v >= low_fence && v <= high_fence)
            .collect();
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&v| v < low_fence || v > high_fence)
            .collect();

        Some(Self {
            q1,
            median: quantile_sorted(&sorted, 0.5),
            q3,
            lower_whisker: inside.first().copied().unwrap_or(q1),
            upper_whisker: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }
}

/// Shared bin edges for a set of values, Sturges' rule
pub fn histogram_edges(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return vec![min - 0.5, min + 0.5];
    }
    let bins = (n as f64).log2().ceil() as usize + 1;
    let width = (max - min) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();
    // the closing edge must hold the maximum exactly
    edges[bins] = max;
    edges
}

/// Density per bin: count / (n * bin width); the last bin is closed
pub fn histogram_density(values: &[f64], edges: &[f64]) -> Vec<f64> {
    if edges.len() < 2 {
        return Vec::new();
    }
    let bins = edges.len() - 1;
    let mut counts = vec![0usize; bins];
    for &v in values {
        if v < edges[0] || v > edges[bins] {
            continue;
        }
        let idx = edges[1..]
            .iter()
            .position(|&e| v < e)
            .unwrap_or(bins - 1);
        counts[idx] += 1;
    }
    let n = values.len() as f64;
    counts
        .iter()
        .enumerate()
        .map(|(i, &c)| c as f64 / (n * (edges[i + 1] - edges[i])))
        .collect()
}

/// Sorted values paired with i / n
pub fn ecdf_points(values: &[f64]) -> Vec<(f64, f64)> {
    let mut sorted = values.to_vec();
    sort_values(&mut sorted);
    let n = sorted.len() as f64;
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, v)| (v, i as f64 / n))
        .collect()
}

/// Range covering every value with `pad` of the span added on both sides
pub(super) fn value_bounds<'a>(values: impl Iterator<Item = &'a f64>, pad: f64) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let span = if max > min { max - min } else { 1.0 };
    Some((min - pad * span, max + pad * span))
}

fn group_bounds(groups: &[(String, Vec<f64>)], pad: f64) -> std::result::Result<(f64, f64), String> {
    value_bounds(groups.iter().flat_map(|(_, v)| v.iter()), pad)
        .ok_or_else(|| "no values to plot".to_string())
}

pub(super) fn category_label(labels: &[&str], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).map(|s| s.to_string()).unwrap_or_default()
}

pub(super) fn caption_font() -> FontDesc<'static> {
    ("sans-serif", 24).into_font()
}

pub(crate) fn draw_box(
    root: &Area,
    groups: &[(String, Vec<f64>)],
    title: &str,
    y_desc: &str,
) -> DrawResult {
    let (lo, hi) = group_bounds(groups, 0.05)?;
    let k = groups.len();
    let labels: Vec<&str> = groups.iter().map(|(l, _)| l.as_str()).collect();
    let fmt = |x: &f64| category_label(&labels, *x);

    let mut chart = ChartBuilder::on(root)
        .caption(title, caption_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(k as f64 - 0.5), lo..hi)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(k)
        .x_label_formatter(&fmt)
        .x_desc("label")
        .y_desc(y_desc)
        .draw()?;

    for (i, (_, values)) in groups.iter().enumerate() {
        let Some(b) = BoxSummary::from_values(values) else {
            continue;
        };
        let x = i as f64;
        let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);
        let c = color(i);

        chart.draw_series(std::iter::once(Rectangle::new(
            [(left, b.q1), (right, b.q3)],
            c.mix(0.7).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(left, b.q1), (right, b.q3)],
            BLACK.stroke_width(1),
        )))?;
        chart.draw_series(
            [
                vec![(left, b.median), (right, b.median)],
                vec![(x, b.q3), (x, b.upper_whisker)],
                vec![(x, b.q1), (x, b.lower_whisker)],
                vec![(x - 0.1, b.upper_whisker), (x + 0.1, b.upper_whisker)],
                vec![(x - 0.1, b.lower_whisker), (x + 0.1, b.lower_whisker)],
            ]
            .into_iter()
            .map(|p| PathElement::new(p, BLACK.stroke_width(1))),
        )?;
        chart.draw_series(
            b.outliers
                .iter()
                .map(|&v| Circle::new((x, v), 3, BLACK.stroke_width(1))),
        )?;
    }
    Ok(())
}

pub(crate) fn draw_violin(
    root: &Area,
    groups: &[(String, Vec<f64>)],
    title: &str,
    y_desc: &str,
) -> DrawResult {
    let (lo, hi) = group_bounds(groups, 0.2)?;
    let k = groups.len();
    let labels: Vec<&str> = groups.iter().map(|(l, _)| l.as_str()).collect();
    let fmt = |x: &f64| category_label(&labels, *x);

    let mut chart = ChartBuilder::on(root)
        .caption(title, caption_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(k as f64 - 0.5), lo..hi)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(k)
        .x_label_formatter(&fmt)
        .x_desc("label")
        .y_desc(y_desc)
        .draw()?;

    for (i, (_, values)) in groups.iter().enumerate() {
        let Some((vlo, vhi)) = value_bounds(values.iter(), 0.15) else {
            continue;
        };
        let x = i as f64;
        let c = color(i);
        let grid: Vec<f64> = (0..KDE_POINTS)
            .map(|j| vlo + (vhi - vlo) * j as f64 / (KDE_POINTS - 1) as f64)
            .collect();

        match gaussian_kde(values, &grid) {
            Some(density) => {
                let peak = density.iter().copied().fold(0.0, f64::max);
                if peak <= 0.0 {
                    continue;
                }
                let half: Vec<f64> = density
                    .iter()
                    .map(|d| VIOLIN_HALF_WIDTH * d / peak)
                    .collect();
                let outline: Vec<(f64, f64)> = grid
                    .iter()
                    .zip(half.iter())
                    .map(|(&y, &w)| (x - w, y))
                    .chain(grid.iter().zip(half.iter()).rev().map(|(&y, &w)| (x + w, y)))
                    .collect();
                chart.draw_series(std::iter::once(Polygon::new(
                    outline.clone(),
                    c.mix(0.7).filled(),
                )))?;
                chart.draw_series(std::iter::once(PathElement::new(
                    outline,
                    BLACK.stroke_width(1),
                )))?;
            }
            // too few distinct values for a density; mark the values instead
            None => {
                chart.draw_series(values.iter().map(|&v| {
                    PathElement::new(
                        vec![(x - VIOLIN_HALF_WIDTH, v), (x + VIOLIN_HALF_WIDTH, v)],
                        c.stroke_width(2),
                    )
                }))?;
            }
        }

        if let Some(b) = BoxSummary::from_values(values) {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x, b.q1), (x, b.q3)],
                BLACK.stroke_width(4),
            )))?;
            chart.draw_series(std::iter::once(Circle::new((x, b.median), 3, WHITE.filled())))?;
        }
    }
    Ok(())
}

pub(crate) fn draw_strip(
    root: &Area,
    groups: &[(String, Vec<f64>)],
    title: &str,
    y_desc: &str,
    seed: u32,
) -> DrawResult {
    let (lo, hi) = group_bounds(groups, 0.05)?;
    let k = groups.len();
    let labels: Vec<&str> = groups.iter().map(|(l, _)| l.as_str()).collect();
    let fmt = |x: &f64| category_label(&labels, *x);

    let mut chart = ChartBuilder::on(root)
        .caption(title, caption_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(k as f64 - 0.5), lo..hi)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(k)
        .x_label_formatter(&fmt)
        .x_desc("label")
        .y_desc(y_desc)
        .draw()?;

    let mut rng = MersenneTwister::new(seed);
    for (i, (_, values)) in groups.iter().enumerate() {
        let offsets = rng.jitter(values.len(), STRIP_JITTER);
        let c = color(i);
        chart.draw_series(
            values
                .iter()
                .zip(offsets)
                .map(|(&v, dx)| Circle::new((i as f64 + dx, v), 4, c.filled())),
        )?;
    }
    Ok(())
}

pub(crate) fn draw_lines(root: &Area, groups: &[(String, Vec<f64>)], title: &str) -> DrawResult {
    let (lo, hi) = group_bounds(groups, 0.05)?;
    let longest = groups.iter().map(|(_, v)| v.len()).max().unwrap_or(1);
    let x_max = (longest as f64 - 1.0).max(1.0);

    let mut chart = ChartBuilder::on(root)
        .caption(title, caption_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.2..x_max + 0.2, lo..hi)?;
    chart
        .configure_mesh()
        .x_desc("Sample Index")
        .y_desc("Expression Level")
        .draw()?;

    for (i, (label, values)) in groups.iter().enumerate() {
        let c = color(i);
        let points: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .map(|(j, &v)| (j as f64, v))
            .collect();
        chart
            .draw_series(LineSeries::new(points.clone(), c.stroke_width(2)))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], c.stroke_width(2)));
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, c.filled())))?;
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

pub(crate) fn draw_histogram(
    root: &Area,
    groups: &[(String, Vec<f64>)],
    title: &str,
    x_desc: &str,
) -> DrawResult {
    let all: Vec<f64> = groups.iter().flat_map(|(_, v)| v.iter().copied()).collect();
    let edges = histogram_edges(&all);
    if edges.len() < 2 {
        return Err("no values to plot".into());
    }
    let total = all.len() as f64;
    let (x_lo, x_hi) = value_bounds(all.iter(), 0.15).ok_or("no values to plot")?;
    let grid: Vec<f64> = (0..KDE_POINTS)
        .map(|j| x_lo + (x_hi - x_lo) * j as f64 / (KDE_POINTS - 1) as f64)
        .collect();

    // densities share one normalisation across labels, so the areas add up to 1
    let layers: Vec<(Vec<f64>, Option<Vec<f64>>)> = groups
        .iter()
        .map(|(_, values)| {
            let weight = values.len() as f64 / total;
            let bars = histogram_density(values, &edges)
                .into_iter()
                .map(|d| d * weight)
                .collect();
            let kde = gaussian_kde(values, &grid)
                .map(|d| d.into_iter().map(|v| v * weight).collect());
            (bars, kde)
        })
        .collect();

    let peak = layers
        .iter()
        .flat_map(|(bars, kde)| bars.iter().chain(kde.iter().flatten()))
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);
    let y_hi = if peak > 0.0 { peak * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(root)
        .caption(title, caption_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Density")
        .draw()?;

    for (i, ((label, _), (bars, kde))) in groups.iter().zip(layers.iter()).enumerate() {
        let c = color(i);
        chart
            .draw_series(bars.iter().enumerate().map(|(b, &d)| {
                Rectangle::new([(edges[b], 0.0), (edges[b + 1], d)], c.mix(0.25).filled())
            }))?
            .label(label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], c.filled()));
        chart.draw_series(bars.iter().enumerate().map(|(b, &d)| {
            Rectangle::new([(edges[b], 0.0), (edges[b + 1], d)], c.stroke_width(1))
        }))?;
        if let Some(kde) = kde {
            chart.draw_series(LineSeries::new(
                grid.iter().copied().zip(kde.iter().copied()),
                c.stroke_width(2),
            ))?;
        }
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

pub(crate) fn draw_cdf(root: &Area, groups: &[(String, Vec<f64>)], title: &str) -> DrawResult {
    let (lo, hi) = group_bounds(groups, 0.05)?;

    let mut chart = ChartBuilder::on(root)
        .caption(title, caption_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0.0..1.0)?;
    chart
        .configure_mesh()
        .x_desc("Expression Level")
        .y_desc("Cumulative Probability")
        .draw()?;

    for (i, (label, values)) in groups.iter().enumerate() {
        let c = color(i);
        chart
            .draw_series(LineSeries::new(ecdf_points(values), c.stroke_width(2)))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], c.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_summary() {
        let b = BoxSummary::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(b.q1, 2.0);
        assert_eq!(b.median, 3.0);
        assert_eq!(b.q3, 4.0);
        assert_eq!(b.lower_whisker, 1.0);
        assert_eq!(b.upper_whisker, 4.0);
        assert_eq!(b.outliers, vec![100.0]);
        assert!(BoxSummary::from_values(&[]).is_none());
    }

    #[test]
    fn test_histogram_density_integrates_to_one() {
        let values = vec![1.0, 2.0, 2.5, 3.0, 3.5, 4.0, 6.0, 7.0];
        let edges = histogram_edges(&values);
        // Sturges: ceil(log2 8) + 1 = 4 bins
        assert_eq!(edges.len(), 5);
        assert_eq!(edges[0], 1.0);
        assert!((edges[4] - 7.0).abs() < 1e-12);

        let density = histogram_density(&values, &edges);
        let area: f64 = density
            .iter()
            .enumerate()
            .map(|(i, d)| d * (edges[i + 1] - edges[i]))
            .sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_keeps_maximum() {
        for k in 1..2000 {
            let values = [0.1, 0.2 + k as f64 * 1e-3, 0.3 * k as f64 / 7.0 + 0.7];
            let edges = histogram_edges(&values);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(edges[edges.len() - 1], max);

            let density = histogram_density(&values, &edges);
            let area: f64 = density
                .iter()
                .enumerate()
                .map(|(i, d)| d * (edges[i + 1] - edges[i]))
                .sum();
            assert!((area - 1.0).abs() < 1e-9, "k = {}, area = {}", k, area);
        }
    }

    #[test]
    fn test_histogram_constant_values() {
        let edges = histogram_edges(&[2.0, 2.0]);
        assert_eq!(edges, vec![1.5, 2.5]);
        assert_eq!(histogram_density(&[2.0, 2.0], &edges), vec![1.0]);
        assert!(histogram_edges(&[]).is_empty());
    }

    #[test]
    fn test_ecdf_points() {
        let points = ecdf_points(&[3.0, 1.0, 2.0, 4.0]);
        assert_eq!(points, vec![(1.0, 0.0), (2.0, 0.25), (3.0, 0.5), (4.0, 0.75)]);
    }

    #[test]
    fn test_category_label() {
        let labels = ["ctl", "trt"];
        assert_eq!(category_label(&labels, 0.0), "ctl");
        assert_eq!(category_label(&labels, 1.0), "trt");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }

    #[test]
    fn test_value_bounds_ignore_missing() {
        let values = [f64::NAN, 2.0, 4.0];
        assert_eq!(value_bounds(values.iter(), 0.5), Some((1.0, 5.0)));
        assert_eq!(value_bounds([3.0].iter(), 0.5), Some((2.5, 3.5)));
        assert_eq!(value_bounds([f64::NAN].iter(), 0.5), None);
    }
}
