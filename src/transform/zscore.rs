//! Whole-table z-score of one gene

use crate::data::GeneSeries;
use crate::error::{ExplorerError, Result};
use crate::stats::{mean, variance};

/// Population z-score of every sample in a series
///
/// Mean and standard deviation are taken over the non-missing values of the
/// whole series, not per group. Missing values stay missing. Fails with a
/// zero-variance error instead of producing NaN or infinite scores.
///
/// The result is a new series named `<gene>_zscore` with the same labels.
pub fn zscore(series: &GeneSeries) -> Result<GeneSeries> {
    let present = series.present();
    if present.is_empty() {
        return Err(ExplorerError::EmptyData {
            reason: format!("no values for gene '{}' to standardise", series.gene),
        });
    }

    let mu = mean(&present);
    let sd = variance(&present, 0).sqrt();
    if !sd.is_finite() || sd <= 0.0 {
        return Err(ExplorerError::ZeroVariance {
            context: format!("z-score of gene '{}'", series.gene),
        });
    }
    log::debug!("z-score of {}: mean={:.4}, sd={:.4}", series.gene, mu, sd);

    let values = series
        .values
        .iter()
        .map(|&v| if v.is_nan() { f64::NAN } else { (v - mu) / sd })
        .collect();

    GeneSeries::new(
        &format!("{}_zscore", series.gene),
        values,
        series.labels.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: Vec<f64>) -> GeneSeries {
        let labels = (0..values.len())
            .map(|i| if i % 2 == 0 { "A" } else { "B" }.to_string())
            .collect();
        GeneSeries::new("g1", values, labels).unwrap()
    }

    #[test]
    fn test_zscore_standardises() {
        let z = zscore(&series(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])).unwrap();
        assert_eq!(z.gene, "g1_zscore");
        let m = mean(&z.values);
        let sd = variance(&z.values, 0).sqrt();
        assert!(m.abs() < 1e-12);
        assert!((sd - 1.0).abs() < 1e-12);
        // population sd of the input is exactly 2
        assert!((z.values[0] + 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_zscore_keeps_missing() {
        let z = zscore(&series(vec![1.0, f64::NAN, 3.0])).unwrap();
        assert!(z.values[1].is_nan());
        assert!((z.values[0] + 1.0).abs() < 1e-12);
        assert!((z.values[2] - 1.0).abs() < 1e-12);
        assert_eq!(z.labels, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_zscore_zero_variance_fails() {
        assert!(matches!(
            zscore(&series(vec![3.0, 3.0, 3.0])),
            Err(ExplorerError::ZeroVariance { .. })
        ));
        assert!(matches!(
            zscore(&series(vec![f64::NAN, 7.0])),
            Err(ExplorerError::ZeroVariance { .. })
        ));
        assert!(matches!(
            zscore(&series(vec![f64::NAN])),
            Err(ExplorerError::EmptyData { .. })
        ));
    }
}
