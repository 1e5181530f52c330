//! Tukey HSD pairwise post-hoc comparisons.

use crate::anova::{one_way_anova, AnovaResult};
use crate::range::{ptukey, qtukey};
use crate::{mean, GroupSet, StatsError};

/// One pairwise comparison. `meandiff` is mean(group1) − mean(group2);
/// pairs are enumerated in the order labels first appear in the group set.
#[derive(Debug, Clone, PartialEq)]
pub struct TukeyRow {
    pub group1: String,
    pub group2: String,
    pub meandiff: f64,
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

/// ANOVA result plus one Tukey row per unordered pair of groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub anova: AnovaResult,
    pub tukey: Vec<TukeyRow>,
    pub significance: f64,
}

/// Pairwise Tukey HSD comparisons given an already-computed ANOVA.
///
/// Uses the Tukey–Kramer standard error, which reduces to the classic HSD
/// for equal group sizes. `alpha` is the family-wise significance level.
pub fn tukey_hsd(
    groups: &GroupSet,
    anova: &AnovaResult,
    alpha: f64,
) -> Result<Vec<TukeyRow>, StatsError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StatsError::InvalidSignificance { alpha });
    }
    let k = groups.len();
    let df = anova.df_within as f64;
    let q_crit = qtukey(1.0 - alpha, k, df);

    let summaries: Vec<(&str, f64, f64)> = groups
        .iter()
        .map(|(label, samples)| (label, mean(samples), samples.len() as f64))
        .collect();

    let mut rows = Vec::with_capacity(k * (k - 1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            let (label1, mean1, n1) = summaries[i];
            let (label2, mean2, n2) = summaries[j];
            let meandiff = mean1 - mean2;
            let se = (anova.ms_within / 2.0 * (1.0 / n1 + 1.0 / n2)).sqrt();
            let q = meandiff.abs() / se;
            let p_adj = (1.0 - ptukey(q, k, df)).clamp(0.0, 1.0);
            let half_width = q_crit * se;
            if !meandiff.is_finite() || !p_adj.is_finite() || !half_width.is_finite() {
                return Err(StatsError::DegenerateVariance);
            }
            rows.push(TukeyRow {
                group1: label1.to_string(),
                group2: label2.to_string(),
                meandiff,
                p_adj,
                lower: meandiff - half_width,
                upper: meandiff + half_width,
                reject: p_adj < alpha,
            });
        }
    }
    Ok(rows)
}

/// Full comparison: one-way ANOVA followed by Tukey HSD post-hoc tests.
pub fn compare(groups: &GroupSet, alpha: f64) -> Result<ComparisonReport, StatsError> {
    let anova = one_way_anova(groups)?;
    let tukey = tukey_hsd(groups, &anova, alpha)?;
    Ok(ComparisonReport {
        anova,
        tukey,
        significance: alpha,
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
    fn textbook_example_rows_and_sign_convention() {
        let report = compare(&three_groups(), 0.05).expect("compare");
        assert_eq!(report.tukey.len(), 3);

        let pairs: Vec<(&str, &str, f64)> = report
            .tukey
            .iter()
            .map(|r| (r.group1.as_str(), r.group2.as_str(), r.meandiff))
            .collect();
        assert_eq!(pairs[0].0, "A");
        assert_eq!(pairs[0].1, "B");
        assert!((pairs[0].2 - (-3.0)).abs() < 1e-9);
        assert_eq!(pairs[1].0, "A");
        assert_eq!(pairs[1].1, "C");
        assert!((pairs[1].2 - (-6.0)).abs() < 1e-9);
        assert_eq!(pairs[2].0, "B");
        assert_eq!(pairs[2].1, "C");
        assert!((pairs[2].2 - (-3.0)).abs() < 1e-9);

        for row in &report.tukey {
            assert!(row.p_adj > 0.0 && row.p_adj < 0.05);
            assert!(row.reject);
            // Rejection means zero lies outside the interval.
            assert!(row.lower > 0.0 || row.upper < 0.0);
            assert!(row.lower < row.meandiff && row.meandiff < row.upper);
        }
    }

    // statsmodels pairwise_tukeyhsd on the same input gives the A-B
    // interval (-5.51, -0.49) with ms_within = 1 and q_0.05(3, 6).
    #[test]
    fn textbook_example_interval_matches_reference() {
        let report = compare(&three_groups(), 0.05).expect("compare");
        let ab = &report.tukey[0];
        assert!((ab.lower - (-5.51)).abs() < 0.02, "lower = {}", ab.lower);
        assert!((ab.upper - (-0.49)).abs() < 0.02, "upper = {}", ab.upper);
    }

    #[test]
    fn pair_count_is_k_choose_2() {
        let set = GroupSet::new(
            (0..5)
                .map(|i| {
                    (
                        format!("g{i}"),
                        vec![i as f64, i as f64 + 1.0, i as f64 + 2.5],
                    )
                })
                .collect(),
        )
        .expect("valid group set");
        let report = compare(&set, 0.05).expect("compare");
        assert_eq!(report.tukey.len(), 10);
        for row in &report.tukey {
            assert!(row.p_adj >= 0.0 && row.p_adj <= 1.0);
            assert_eq!(row.reject, row.p_adj < 0.05);
        }
    }

    #[test]
    fn indistinguishable_groups_are_not_rejected() {
        let set = GroupSet::new(vec![
            ("a".into(), vec![1.0, 2.0, 3.0, 4.0]),
            ("b".into(), vec![1.5, 2.5, 3.5, 2.0]),
        ])
        .expect("valid group set");
        let report = compare(&set, 0.05).expect("compare");
        let row = &report.tukey[0];
        assert!(!row.reject);
        assert!(row.lower < 0.0 && row.upper > 0.0);
    }

    #[test]
    fn rejects_invalid_significance() {
        let err = compare(&three_groups(), 1.5).unwrap_err();
        assert_eq!(err, StatsError::InvalidSignificance { alpha: 1.5 });
    }

    #[test]
    fn compare_is_idempotent() {
        let a = compare(&three_groups(), 0.05).expect("compare");
        let b = compare(&three_groups(), 0.05).expect("compare");
        for (x, y) in a.tukey.iter().zip(b.tukey.iter()) {
            assert!((x.meandiff - y.meandiff).abs() < 1e-9);
            assert!((x.p_adj - y.p_adj).abs() < 1e-9);
            assert!((x.lower - y.lower).abs() < 1e-9);
            assert!((x.upper - y.upper).abs() < 1e-9);
        }
    }
}
