//! Statistical utility functions shared across modules
//!
//! Descriptive statistics, ranking with ties, Gaussian kernel density, and
//! Pearson correlation. Every function here expects missing values to have
//! been removed already unless stated otherwise.

use serde::Serialize;

/// Arithmetic mean; NaN for an empty slice
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Variance with `ddof` delta degrees of freedom; NaN when `n <= ddof`
pub fn variance(x: &[f64], ddof: usize) -> f64 {
    let n = x.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(x);
    x.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / (n - ddof) as f64
}

/// Median of unsorted values; NaN for an empty slice
pub fn median(x: &[f64]) -> f64 {
    let mut sorted = x.to_vec();
    sort_values(&mut sorted);
    quantile_sorted(&sorted, 0.5)
}

/// Sort ascending, total order on floats
pub fn sort_values(x: &mut [f64]) {
    x.sort_by(|a, b| a.total_cmp(b));
}

/// Quantile of sorted values by linear interpolation between order statistics
///
/// position = (n - 1) * prob (the "linear" method, R type 7).
pub fn quantile_sorted(sorted: &[f64], prob: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let pos = (n - 1) as f64 * prob.clamp(0.0, 1.0);
    let low = pos.floor() as usize;
    let high = pos.ceil() as usize;
    let frac = pos - low as f64;
    sorted[low] + (sorted[high] - sorted[low]) * frac
}

/// Descriptive statistics of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, absent with fewer than two values
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Count, mean, std, min, quartiles, max; `None` for an empty slice
pub fn describe(x: &[f64]) -> Option<Describe> {
    if x.is_empty() {
        return None;
    }
    let mut sorted = x.to_vec();
    sort_values(&mut sorted);
    let n = sorted.len();
    Some(Describe {
        count: n,
        mean: mean(&sorted),
        std: if n > 1 { Some(variance(&sorted, 1).sqrt()) } else { None },
        min: sorted[0],
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// 1-based ranks with tied values sharing their average rank
pub fn average_ranks(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && x[order[j + 1]] == x[order[i]] {
            j += 1;
        }
        // positions i..=j share ranks i+1..=j+1
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Sizes of each group of tied values (groups of one included)
pub fn tie_sizes(x: &[f64]) -> Vec<usize> {
    let mut sorted = x.to_vec();
    sort_values(&mut sorted);
    let mut sizes = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        sizes.push(j - i + 1);
        i = j + 1;
    }
    sizes
}

/// Gaussian kernel density estimate with Scott's bandwidth
///
/// bandwidth = n^(-1/5) * sample std. Returns `None` when the bandwidth is
/// zero or undefined (fewer than two values, or all values equal).
pub fn gaussian_kde(x: &[f64], grid: &[f64]) -> Option<Vec<f64>> {
    let n = x.len();
    if n < 2 {
        return None;
    }
    let bandwidth = (n as f64).powf(-0.2) * variance(x, 1).sqrt();
    if !bandwidth.is_finite() || bandwidth <= 0.0 {
        return None;
    }
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    Some(
        grid.iter()
            .map(|&g| {
                norm * x
                    .iter()
                    .map(|&xi| (-0.5 * ((g - xi) / bandwidth).powi(2)).exp())
                    .sum::<f64>()
            })
            .collect(),
    )
}

/// Pearson correlation over pairs where both values are present
///
/// NaN when fewer than two complete pairs remain or either side is constant.
pub fn pearson_pairwise(x: &[f64], y: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for &(a, b) in &pairs {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}
