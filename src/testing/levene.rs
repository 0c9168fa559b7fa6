//! Levene's test for equality of variances (median-centred)

use super::pvalue::pvalue_f;
use super::{require_size, SampleGroup, TestStatistic};
use crate::error::{ExplorerError, Result};
use crate::stats::{mean, median};

pub const LEVENE_MIN_SIZE: usize = 2;

/// Levene's test using absolute deviations from each group's median
/// (the Brown-Forsythe variant)
pub fn levene_test(groups: &[SampleGroup]) -> Result<TestStatistic> {
    if groups.len() < 2 {
        return Err(ExplorerError::InvalidInput {
            reason: format!("Levene's test needs at least 2 groups, got {}", groups.len()),
        });
    }
    for group in groups {
        require_size("Levene's test", group, LEVENE_MIN_SIZE)?;
    }

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let center = median(g.values);
            g.values.iter().map(|&v| (v - center).abs()).collect()
        })
        .collect();

    let k = groups.len() as f64;
    let n_total: usize = deviations.iter().map(|d| d.len()).sum();
    let n_total = n_total as f64;
    let group_means: Vec<f64> = deviations.iter().map(|d| mean(d)).collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / n_total;

    let between: f64 = deviations
        .iter()
        .zip(group_means.iter())
        .map(|(d, &m)| d.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(group_means.iter())
        .map(|(d, &m)| d.iter().map(|&z| (z - m).powi(2)).sum::<f64>())
        .sum();

    if !(within > 0.0) {
        return Err(ExplorerError::ZeroVariance {
            context: "Levene's test (all deviations equal within groups)".to_string(),
        });
    }

    let df1 = k - 1.0;
    let df2 = n_total - k;
    let w = (df2 * between) / (df1 * within);

    Ok(TestStatistic {
        statistic: w,
        p_value: pvalue_f(w, df1, df2)?,
        df: None,
    })
}
