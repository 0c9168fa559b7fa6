//! Mann-Whitney U test (Wilcoxon rank-sum)

use super::pvalue::pvalue_normal_upper;
use super::{require_size, SampleGroup, TestStatistic};
use crate::error::{ExplorerError, Result};
use crate::stats::{average_ranks, tie_sizes};

pub const MANN_WHITNEY_MIN_SIZE: usize = 1;

/// Largest group size for which the exact null distribution is used
const EXACT_MAX_SIZE: usize = 8;

/// Two-sided Mann-Whitney U test
///
/// The reported statistic is U of the first group. The exact null
/// distribution is used when there are no ties and either group has at most
/// eight values; otherwise the normal approximation with tie and continuity
/// corrections.
pub fn mann_whitney_u(a: &SampleGroup, b: &SampleGroup) -> Result<TestStatistic> {
    require_size("Mann-Whitney U", a, MANN_WHITNEY_MIN_SIZE)?;
    require_size("Mann-Whitney U", b, MANN_WHITNEY_MIN_SIZE)?;

    let n1 = a.values.len();
    let n2 = b.values.len();
    let combined: Vec<f64> = a.values.iter().chain(b.values.iter()).copied().collect();
    let ranks = average_ranks(&combined);

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u = u1.max(u2);

    let ties = tie_sizes(&combined);
    let has_ties = ties.iter().any(|&t| t > 1);

    let p_value = if !has_ties && (n1 <= EXACT_MAX_SIZE || n2 <= EXACT_MAX_SIZE) {
        exact_upper_tail(n1, n2, u.round() as usize) * 2.0
    } else {
        let n = (n1 + n2) as f64;
        let tie_term: f64 = ties.iter().map(|&t| (t * t * t - t) as f64).sum();
        let var = (n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
        if !(var > 0.0) {
            return Err(ExplorerError::ZeroVariance {
                context: format!("Mann-Whitney U between '{}' and '{}'", a.label, b.label),
            });
        }
        let mu = (n1 * n2) as f64 / 2.0;
        let z = (u - mu - 0.5) / var.sqrt();
        pvalue_normal_upper(z)? * 2.0
    };

    Ok(TestStatistic {
        statistic: u1,
        p_value: p_value.clamp(0.0, 1.0),
        df: None,
    })
}

/// P(U >= u) under the null for group sizes (n1, n2), no ties
fn exact_upper_tail(n1: usize, n2: usize, u: usize) -> f64 {
    let dist = u_distribution(n1.min(n2), n1.max(n2));
    let total: f64 = dist.iter().sum();
    let upper: f64 = dist.iter().skip(u).sum();
    upper / total
}

/// Number of orderings producing each U in 0..=m*n
///
/// Built column by column from c(i, j, u) = c(i-1, j, u-j) + c(i, j-1, u):
/// the largest value overall either belongs to the first group (beating all
/// j values of the second) or to the second group.
fn u_distribution(m: usize, n: usize) -> Vec<f64> {
    let mut col: Vec<Vec<f64>> = (0..=m).map(|_| vec![1.0]).collect();
    for j in 1..=n {
        let mut next: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        next.push(vec![1.0]);
        for i in 1..=m {
            let mut dist = vec![0.0; i * j + 1];
            for (u, &c) in col[i].iter().enumerate() {
                dist[u] += c;
            }
            for (u, &c) in next[i - 1].iter().enumerate() {
                dist[u + j] += c;
            }
            next.push(dist);
        }
        col = next;
    }
    col.swap_remove(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u_distribution_small() {
        // m=2, n=2: U in 0..=4 with counts 1,1,2,1,1 (C(4,2) = 6)
        assert_eq!(u_distribution(2, 2), vec![1.0, 1.0, 2.0, 1.0, 1.0]);
        let total: f64 = u_distribution(3, 5).iter().sum();
        assert_eq!(total, 56.0);
    }

    #[test]
    fn test_exact_complete_separation() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        let result = mann_whitney_u(&SampleGroup::new("a", &a), &SampleGroup::new("b", &b)).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert!((result.p_value - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_exact_tiny_groups() {
        let a = [1.0, 3.0];
        let b = [5.0];
        let result = mann_whitney_u(&SampleGroup::new("A", &a), &SampleGroup::new("B", &b)).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert!((result.p_value - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_asymptotic_with_ties() {
        let a = [1.0, 2.0, 2.0, 3.0];
        let b = [2.0, 3.0, 4.0, 5.0];
        let result = mann_whitney_u(&SampleGroup::new("a", &a), &SampleGroup::new("b", &b)).unwrap();
        assert!((result.statistic - 2.5).abs() < 1e-12);
        assert!((result.p_value - 0.1367).abs() < 1e-3, "p = {}", result.p_value);
    }

    #[test]
    fn test_all_tied() {
        let a = [2.0, 2.0];
        let b = [2.0, 2.0];
        assert!(matches!(
            mann_whitney_u(&SampleGroup::new("a", &a), &SampleGroup::new("b", &b)),
            Err(ExplorerError::ZeroVariance { .. })
        ));
    }
}
