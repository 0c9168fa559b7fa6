//! Kruskal-Wallis H test across k groups

use super::pvalue::pvalue_chi_squared;
use super::{require_size, SampleGroup, TestStatistic};
use crate::error::{ExplorerError, Result};
use crate::stats::{average_ranks, tie_sizes};

pub const KRUSKAL_MIN_SIZE: usize = 1;

/// Kruskal-Wallis test for a difference in location, tie-corrected
pub fn kruskal_wallis(groups: &[SampleGroup]) -> Result<TestStatistic> {
    if groups.len() < 2 {
        return Err(ExplorerError::InvalidInput {
            reason: format!("Kruskal-Wallis needs at least 2 groups, got {}", groups.len()),
        });
    }
    for group in groups {
        require_size("Kruskal-Wallis", group, KRUSKAL_MIN_SIZE)?;
    }

    let combined: Vec<f64> = groups.iter().flat_map(|g| g.values.iter().copied()).collect();
    let n = combined.len() as f64;
    let ranks = average_ranks(&combined);

    let mut offset = 0;
    let mut sum_term = 0.0;
    for group in groups {
        let len = group.values.len();
        let rank_sum: f64 = ranks[offset..offset + len].iter().sum();
        sum_term += rank_sum.powi(2) / len as f64;
        offset += len;
    }
    let h = 12.0 / (n * (n + 1.0)) * sum_term - 3.0 * (n + 1.0);

    let tie_term: f64 = tie_sizes(&combined)
        .iter()
        .map(|&t| (t * t * t - t) as f64)
        .sum();
    let correction = 1.0 - tie_term / (n.powi(3) - n);
    if !(correction > 0.0) {
        return Err(ExplorerError::ZeroVariance {
            context: "Kruskal-Wallis (all values tied)".to_string(),
        });
    }
    let h = h / correction;
    let df = groups.len() as f64 - 1.0;

    Ok(TestStatistic {
        statistic: h,
        p_value: pvalue_chi_squared(h, df)?,
        df: Some(df),
    })
}
