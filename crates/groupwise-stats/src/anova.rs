//! One-way ANOVA via the classical sum-of-squares decomposition.

use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::{mean, GroupSet, StatsError};

/// Result of a one-way ANOVA, including the full decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct AnovaResult {
    pub f: f64,
    pub p: f64,
    pub ss_between: f64,
    pub ss_within: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub ms_between: f64,
    pub ms_within: f64,
}

/// Computes the one-way ANOVA F statistic and p-value across all groups.
///
/// The p-value comes from the F distribution with (k-1, N-k) degrees of
/// freedom. Zero pooled within-group variance is surfaced as
/// [`StatsError::DegenerateVariance`] rather than an infinite statistic.
pub fn one_way_anova(groups: &GroupSet) -> Result<AnovaResult, StatsError> {
    let k = groups.len();
    let n_total = groups.total_samples();

    let grand_mean = groups
        .iter()
        .flat_map(|(_, samples)| samples.iter().copied())
        .sum::<f64>()
        / n_total as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for (_, samples) in groups.iter() {
        let group_mean = mean(samples);
        ss_between += samples.len() as f64 * (group_mean - grand_mean).powi(2);
        ss_within += samples
            .iter()
            .map(|x| (x - group_mean).powi(2))
            .sum::<f64>();
    }

    let df_between = k - 1;
    let df_within = n_total - k;
    let ms_between = ss_between / df_between as f64;
    let ms_within = ss_within / df_within as f64;

    if ms_within <= 0.0 {
        return Err(StatsError::DegenerateVariance);
    }

    let f = ms_between / ms_within;
    if !f.is_finite() {
        return Err(StatsError::DegenerateVariance);
    }

    let dist = FisherSnedecor::new(df_between as f64, df_within as f64)
        .map_err(|e| StatsError::Numeric(e.to_string()))?;
    let p = (1.0 - dist.cdf(f)).clamp(0.0, 1.0);

    Ok(AnovaResult {
        f,
        p,
        ss_between,
        ss_within,
        df_between,
        df_within,
        ms_between,
        ms_within,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_groups() -> GroupSet {
        GroupSet::new(vec![
            ("A".into(), vec![1.0, 2.0, 3.0]),
            ("B".into(), vec![4.0, 5.0, 6.0]),
            ("C".into(), vec![7.0, 8.0, 9.0]),
        ])
        .expect("valid group set")
    }

    #[test]
    fn textbook_example_f_is_27() {
        let result = one_way_anova(&three_groups()).expect("anova");
        assert!((result.f - 27.0).abs() < 1e-9, "f = {}", result.f);
        assert!(result.p < 0.01, "p = {}", result.p);
        assert!(result.p > 0.0);
        assert_eq!(result.df_between, 2);
        assert_eq!(result.df_within, 6);
        assert!((result.ss_between - 54.0).abs() < 1e-9);
        assert!((result.ss_within - 6.0).abs() < 1e-9);
    }

    #[test]
    fn identical_means_give_f_zero() {
        let set = GroupSet::new(vec![
            ("a".into(), vec![1.0, 2.0, 3.0]),
            ("b".into(), vec![1.0, 2.0, 3.0]),
        ])
        .expect("valid group set");
        let result = one_way_anova(&set).expect("anova");
        assert!(result.f.abs() < 1e-12);
        assert!((result.p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_variance_is_an_explicit_error() {
        let set = GroupSet::new(vec![
            ("a".into(), vec![5.0, 5.0, 5.0]),
            ("b".into(), vec![5.0, 5.0, 5.0]),
        ])
        .expect("valid group set");
        assert_eq!(
            one_way_anova(&set).unwrap_err(),
            StatsError::DegenerateVariance
        );
    }

    #[test]
    fn zero_within_variance_with_distinct_means_is_still_an_error() {
        let set = GroupSet::new(vec![
            ("a".into(), vec![1.0, 1.0]),
            ("b".into(), vec![2.0, 2.0]),
        ])
        .expect("valid group set");
        assert_eq!(
            one_way_anova(&set).unwrap_err(),
            StatsError::DegenerateVariance
        );
    }

    #[test]
    fn anova_is_deterministic() {
        let a = one_way_anova(&three_groups()).expect("anova");
        let b = one_way_anova(&three_groups()).expect("anova");
        assert!((a.f - b.f).abs() < 1e-9);
        assert!((a.p - b.p).abs() < 1e-9);
    }

    #[test]
    fn unbalanced_groups_are_supported() {
        let set = GroupSet::new(vec![
            ("a".into(), vec![1.0, 2.0]),
            ("b".into(), vec![2.0, 3.0, 4.0, 5.0]),
            ("c".into(), vec![9.0, 10.0, 11.0]),
        ])
        .expect("valid group set");
        let result = one_way_anova(&set).expect("anova");
        assert!(result.f > 0.0);
        assert!(result.p > 0.0 && result.p < 1.0);
        assert_eq!(result.df_between, 2);
        assert_eq!(result.df_within, 6);
    }
}
