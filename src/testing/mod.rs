//! Statistical comparison of expression between sample groups
//!
//! The number of distinct labels decides what is computed: two groups get
//! four independent diagnostics (Welch, Mann-Whitney, Levene, Shapiro-Wilk per
//! group), more than two get a Kruskal-Wallis test, and one or zero groups get
//! descriptive statistics only.

mod kruskal;
mod levene;
mod mann_whitney;
mod pvalue;
mod shapiro;
mod welch;

pub use kruskal::{kruskal_wallis, KRUSKAL_MIN_SIZE};
pub use levene::{levene_test, LEVENE_MIN_SIZE};
pub use mann_whitney::{mann_whitney_u, MANN_WHITNEY_MIN_SIZE};
pub use pvalue::{
    normal_quantile, pvalue_chi_squared, pvalue_f, pvalue_normal_upper, pvalue_t_two_sided,
};
pub use shapiro::{shapiro_wilk, SHAPIRO_MIN_SIZE};
pub use welch::{welch_t_test, WELCH_MIN_SIZE};

use serde::Serialize;

use crate::data::{ExpressionTable, GeneSeries};
use crate::error::{ExplorerError, Result};
use crate::stats::{describe, Describe};

/// Non-missing values of one labeled group
#[derive(Debug, Clone, Copy)]
pub struct SampleGroup<'a> {
    pub label: &'a str,
    pub values: &'a [f64],
}

impl<'a> SampleGroup<'a> {
    pub fn new(label: &'a str, values: &'a [f64]) -> Self {
        Self { label, values }
    }
}

pub(crate) fn require_size(test: &str, group: &SampleGroup, required: usize) -> Result<()> {
    if group.values.len() < required {
        return Err(ExplorerError::InsufficientSample {
            test: test.to_string(),
            label: group.label.to_string(),
            required,
            got: group.values.len(),
        });
    }
    Ok(())
}

/// Statistic and p-value of one test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestStatistic {
    pub statistic: f64,
    pub p_value: f64,
    /// Degrees of freedom, for tests that have them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub df: Option<f64>,
}

/// Descriptive statistics for one label
#[derive(Debug)]
pub struct GroupStats {
    pub label: String,
    /// Fails with an empty-group error when the group has no non-missing values
    pub summary: Result<Describe>,
}

/// Per-group normality result
#[derive(Debug)]
pub struct GroupNormality {
    pub label: String,
    pub result: Result<TestStatistic>,
}

/// Which comparison applies, decided once per gene selection
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonPlan {
    /// Exactly two labels, in order of first appearance
    TwoGroup { first: String, second: String },
    /// More than two labels
    MultiGroup { labels: Vec<String> },
    /// One label or none
    SingleGroup { label: Option<String> },
}

impl ComparisonPlan {
    /// Plan from the distinct labels present
    pub fn from_labels(labels: &[String]) -> Self {
        match labels.len() {
            0 => ComparisonPlan::SingleGroup { label: None },
            1 => ComparisonPlan::SingleGroup {
                label: Some(labels[0].clone()),
            },
            2 => ComparisonPlan::TwoGroup {
                first: labels[0].clone(),
                second: labels[1].clone(),
            },
            _ => ComparisonPlan::MultiGroup {
                labels: labels.to_vec(),
            },
        }
    }

    /// Run the planned tests on a gene series
    pub fn run(&self, series: &GeneSeries) -> Comparison {
        match self {
            ComparisonPlan::TwoGroup { first, second } => {
                let a_values = series.group_present(first);
                let b_values = series.group_present(second);
                let a = SampleGroup::new(first, &a_values);
                let b = SampleGroup::new(second, &b_values);

                Comparison::TwoGroup {
                    first: first.clone(),
                    second: second.clone(),
                    welch: welch_t_test(&a, &b),
                    mann_whitney: mann_whitney_u(&a, &b),
                    levene: levene_test(&[a, b]),
                    normality: [a, b]
                        .iter()
                        .map(|g| GroupNormality {
                            label: g.label.to_string(),
                            result: shapiro_wilk(g),
                        })
                        .collect(),
                }
            }
            ComparisonPlan::MultiGroup { labels } => {
                let values: Vec<Vec<f64>> =
                    labels.iter().map(|l| series.group_present(l)).collect();
                let groups: Vec<SampleGroup> = labels
                    .iter()
                    .zip(values.iter())
                    .map(|(l, v)| SampleGroup::new(l, v))
                    .collect();

                Comparison::MultiGroup {
                    labels: labels.clone(),
                    kruskal: kruskal_wallis(&groups),
                }
            }
            ComparisonPlan::SingleGroup { label } => Comparison::SingleGroup {
                label: label.clone(),
            },
        }
    }
}

/// Outcome of the comparative tests for one gene
#[derive(Debug)]
pub enum Comparison {
    TwoGroup {
        first: String,
        second: String,
        welch: Result<TestStatistic>,
        mann_whitney: Result<TestStatistic>,
        levene: Result<TestStatistic>,
        normality: Vec<GroupNormality>,
    },
    MultiGroup {
        labels: Vec<String>,
        kruskal: Result<TestStatistic>,
    },
    SingleGroup {
        label: Option<String>,
    },
}

impl Comparison {
    /// Number of test results reported: 4, 1, or 0
    pub fn test_count(&self) -> usize {
        match self {
            Comparison::TwoGroup { .. } => 4,
            Comparison::MultiGroup { .. } => 1,
            Comparison::SingleGroup { .. } => 0,
        }
    }
}

/// Descriptive statistics per label (sorted) and the comparison for one gene
pub fn summarize(table: &ExpressionTable, gene: &str) -> Result<(Vec<GroupStats>, Comparison)> {
    let series = table.gene_series(gene)?;

    let stats = table
        .sorted_labels()
        .into_iter()
        .map(|label| {
            let summary = describe(&series.group_present(&label)).ok_or_else(|| {
                ExplorerError::EmptyGroup {
                    label: label.clone(),
                    gene: gene.to_string(),
                }
            });
            GroupStats { label, summary }
        })
        .collect();

    let plan = ComparisonPlan::from_labels(&table.distinct_labels());
    log::info!("Comparing {} with {:?}", gene, plan);
    let comparison = plan.run(&series);

    Ok((stats, comparison))
}
