//! Welch's two-sample t-test (unequal variances)

use super::pvalue::pvalue_t_two_sided;
use super::{require_size, SampleGroup, TestStatistic};
use crate::error::{ExplorerError, Result};
use crate::stats::{mean, variance};

pub const WELCH_MIN_SIZE: usize = 2;

/// Welch's t-test for a difference in means
///
/// t = (mean_a - mean_b) / sqrt(var_a/n_a + var_b/n_b), with
/// Welch-Satterthwaite degrees of freedom and a two-sided p-value.
pub fn welch_t_test(a: &SampleGroup, b: &SampleGroup) -> Result<TestStatistic> {
    require_size("Welch t-test", a, WELCH_MIN_SIZE)?;
    require_size("Welch t-test", b, WELCH_MIN_SIZE)?;

    let na = a.values.len() as f64;
    let nb = b.values.len() as f64;
    let va = variance(a.values, 1) / na;
    let vb = variance(b.values, 1) / nb;
    let se2 = va + vb;

    if !(se2 > 0.0) {
        return Err(ExplorerError::ZeroVariance {
            context: format!("Welch t-test between '{}' and '{}'", a.label, b.label),
        });
    }

    let t = (mean(a.values) - mean(b.values)) / se2.sqrt();
    let df = se2.powi(2) / (va.powi(2) / (na - 1.0) + vb.powi(2) / (nb - 1.0));
    log::debug!("welch t={:.6} df={:.4}", t, df);

    Ok(TestStatistic {
        statistic: t,
        p_value: pvalue_t_two_sided(t, df)?,
        df: Some(df),
    })
}
