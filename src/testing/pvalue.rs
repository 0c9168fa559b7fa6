//! P-values from test statistics

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

use crate::error::{ExplorerError, Result};

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| ExplorerError::numerical("standard normal", e))
}

/// Upper-tail p-value from a z-statistic
pub fn pvalue_normal_upper(z: f64) -> Result<f64> {
    if z.is_nan() {
        return Err(ExplorerError::numerical("normal p-value", "statistic NaN"));
    }
    Ok(standard_normal()?.sf(z))
}

/// Quantile of the standard normal
pub fn normal_quantile(p: f64) -> Result<f64> {
    Ok(standard_normal()?.inverse_cdf(p))
}

/// Two-sided p-value from a t-statistic with `df` degrees of freedom
pub fn pvalue_t_two_sided(t: f64, df: f64) -> Result<f64> {
    if !t.is_finite() || !(df > 0.0) {
        return Err(ExplorerError::numerical(
            "t p-value",
            format!("statistic {} with df {}", t, df),
        ));
    }
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| ExplorerError::numerical("t p-value", e))?;
    Ok((2.0 * dist.cdf(-t.abs())).min(1.0))
}

/// Upper-tail p-value of a chi-squared statistic
pub fn pvalue_chi_squared(x: f64, df: f64) -> Result<f64> {
    if !x.is_finite() || !(df > 0.0) {
        return Err(ExplorerError::numerical(
            "chi-squared p-value",
            format!("statistic {} with df {}", x, df),
        ));
    }
    let dist = ChiSquared::new(df).map_err(|e| ExplorerError::numerical("chi-squared p-value", e))?;
    Ok(dist.sf(x.max(0.0)))
}

/// Upper-tail p-value of an F statistic
pub fn pvalue_f(x: f64, df1: f64, df2: f64) -> Result<f64> {
    if !x.is_finite() || !(df1 > 0.0) || !(df2 > 0.0) {
        return Err(ExplorerError::numerical(
            "F p-value",
            format!("statistic {} with df ({}, {})", x, df1, df2),
        ));
    }
    let dist = FisherSnedecor::new(df1, df2).map_err(|e| ExplorerError::numerical("F p-value", e))?;
    Ok(dist.sf(x.max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_upper_tail() {
        // 1 - pnorm(1.959964) = 0.025
        assert!((pvalue_normal_upper(1.959964).unwrap() - 0.025).abs() < 1e-6);
        assert!((pvalue_normal_upper(0.0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pvalue_t_approaches_normal() {
        let p_normal = 2.0 * pvalue_normal_upper(2.0).unwrap();
        let p_t_large = pvalue_t_two_sided(2.0, 1000.0).unwrap();
        assert!((p_normal - p_t_large).abs() < 0.001);

        let p_t_small = pvalue_t_two_sided(2.0, 3.0).unwrap();
        assert!(p_t_small > p_normal);
    }

    #[test]
    fn test_chi_squared_and_f_tails() {
        // qchisq(0.95, 1) = 3.841459
        let p = pvalue_chi_squared(3.841459, 1.0).unwrap();
        assert!((p - 0.05).abs() < 1e-5);

        // qf(0.95, 2, 10) = 4.102821
        let p = pvalue_f(4.102821, 2.0, 10.0).unwrap();
        assert!((p - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_non_finite_statistics_rejected() {
        assert!(pvalue_normal_upper(f64::NAN).is_err());
        assert!(pvalue_t_two_sided(1.0, 0.0).is_err());
        assert!(pvalue_f(f64::INFINITY, 1.0, 1.0).is_err());
    }
}
