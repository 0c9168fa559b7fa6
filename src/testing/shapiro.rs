//! Shapiro-Wilk test for normality
//!
//! Royston's (1995) approximation, algorithm AS R94: coefficients from
//! normal order-statistic scores with polynomial corrections for the two
//! extreme pairs, and a normalising transform of W for the p-value.

use std::f64::consts::PI;

use super::pvalue::{normal_quantile, pvalue_normal_upper};
use super::{require_size, SampleGroup, TestStatistic};
use crate::error::{ExplorerError, Result};
use crate::stats::{mean, sort_values};

pub const SHAPIRO_MIN_SIZE: usize = 3;

const SHAPIRO_WARN_SIZE: usize = 5000;

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Shapiro-Wilk W and p-value for one group
pub fn shapiro_wilk(group: &SampleGroup) -> Result<TestStatistic> {
    require_size("Shapiro-Wilk", group, SHAPIRO_MIN_SIZE)?;

    let n = group.values.len();
    if n > SHAPIRO_WARN_SIZE {
        log::warn!(
            "Shapiro-Wilk on {} values of group '{}': p-value may be inaccurate above {}",
            n,
            group.label,
            SHAPIRO_WARN_SIZE
        );
    }

    let mut x = group.values.to_vec();
    sort_values(&mut x);
    if !(x[n - 1] - x[0] > 0.0) {
        return Err(ExplorerError::ZeroVariance {
            context: format!("Shapiro-Wilk for group '{}'", group.label),
        });
    }

    let a = coefficients(n)?;
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, &ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let m = mean(&x);
    let ssq: f64 = x.iter().map(|&v| (v - m).powi(2)).sum();
    let w = (numerator.powi(2) / ssq).min(1.0);

    Ok(TestStatistic {
        statistic: w,
        p_value: p_value(w, n)?,
        df: None,
    })
}

/// Coefficients a_1..a_{n/2} for the pairs (x_(n+1-i) - x_(i))
fn coefficients(n: usize) -> Result<Vec<f64>> {
    let half = n / 2;
    if n == 3 {
        return Ok(vec![std::f64::consts::FRAC_1_SQRT_2]);
    }

    let an = n as f64;
    let scores: Vec<f64> = (1..=half)
        .map(|i| normal_quantile((i as f64 - 0.375) / (an + 0.25)))
        .collect::<Result<_>>()?;
    let summ2 = 2.0 * scores.iter().map(|m| m * m).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let a1 = poly(&C1, rsn) - scores[0] / ssumm2;
    let mut a = vec![0.0; half];
    a[0] = a1;

    let (first_scaled, fac) = if n > 5 {
        let a2 = -scores[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let fac = ((summ2 - 2.0 * scores[0].powi(2) - 2.0 * scores[1].powi(2))
            / (1.0 - 2.0 * a1.powi(2) - 2.0 * a2.powi(2)))
        .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * scores[0].powi(2)) / (1.0 - 2.0 * a1.powi(2))).sqrt();
        (1, fac)
    };

    for i in first_scaled..half {
        a[i] = -scores[i] / fac;
    }
    Ok(a)
}

fn p_value(w: f64, n: usize) -> Result<f64> {
    if w >= 1.0 {
        return Ok(1.0);
    }
    if n == 3 {
        let p = 6.0 / PI * (w.sqrt().asin() - PI / 3.0);
        return Ok(p.clamp(0.0, 1.0));
    }

    let an = n as f64;
    let mut y = (1.0 - w).ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return Ok(1e-19);
        }
        y = -(gamma - y).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (poly(&C5, xx), poly(&C6, xx).exp())
    };

    pvalue_normal_upper((y - m) / s)
}
