//! Pure numeric core for group comparison: one-way ANOVA across labeled
//! sample groups followed by Tukey HSD pairwise post-hoc tests.
//!
//! This crate does no I/O and holds no state. Callers construct a
//! [`GroupSet`] (which enforces the input invariants), then run
//! [`compare`] to obtain a [`ComparisonReport`].

use std::fmt;

mod anova;
mod range;
mod tukey;

pub use anova::{one_way_anova, AnovaResult};
pub use range::{ptukey, qtukey};
pub use tukey::{compare, tukey_hsd, ComparisonReport, TukeyRow};

pub const CRATE_NAME: &str = "groupwise-stats";

/// Errors surfaced by group construction or the statistical routines.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum StatsError {
    /// Fewer than two groups were supplied.
    TooFewGroups { count: usize },
    /// A group label appeared more than once.
    DuplicateLabel { label: String },
    /// A group had fewer than two samples, so its variance is undefined.
    GroupTooSmall { label: String, count: usize },
    /// A sample was NaN or infinite.
    NonFiniteSample { label: String, index: usize },
    /// The significance level was outside (0, 1).
    InvalidSignificance { alpha: f64 },
    /// Zero pooled within-group variance: the F statistic is undefined.
    DegenerateVariance,
    /// The underlying distribution routine could not produce a result.
    Numeric(String),
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewGroups { count } => {
                write!(f, "at least two groups required, got {count}")
            }
            Self::DuplicateLabel { label } => write!(f, "duplicate group label: {label}"),
            Self::GroupTooSmall { label, count } => {
                write!(f, "group {label} has {count} samples, at least 2 required")
            }
            Self::NonFiniteSample { label, index } => {
                write!(f, "group {label} sample {index} is not a finite number")
            }
            Self::InvalidSignificance { alpha } => {
                write!(f, "significance level {alpha} outside (0, 1)")
            }
            Self::DegenerateVariance => {
                write!(f, "zero within-group variance, F statistic undefined")
            }
            Self::Numeric(msg) => write!(f, "numeric routine failed: {msg}"),
        }
    }
}

impl std::error::Error for StatsError {}

/// An ordered collection of labeled sample groups.
///
/// Construction validates the input invariants: at least two groups, unique
/// labels, every group with at least two finite samples. Iteration order is
/// the order groups were supplied, which fixes the order Tukey pairs are
/// enumerated in.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSet {
    groups: Vec<(String, Vec<f64>)>,
}

impl GroupSet {
    pub fn new(groups: Vec<(String, Vec<f64>)>) -> Result<Self, StatsError> {
        if groups.len() < 2 {
            return Err(StatsError::TooFewGroups {
                count: groups.len(),
            });
        }
        let mut seen = std::collections::BTreeSet::new();
        for (label, samples) in &groups {
            if !seen.insert(label.clone()) {
                return Err(StatsError::DuplicateLabel {
                    label: label.clone(),
                });
            }
            if samples.len() < 2 {
                return Err(StatsError::GroupTooSmall {
                    label: label.clone(),
                    count: samples.len(),
                });
            }
            for (index, sample) in samples.iter().enumerate() {
                if !sample.is_finite() {
                    return Err(StatsError::NonFiniteSample {
                        label: label.clone(),
                        index,
                    });
                }
            }
        }
        Ok(Self { groups })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total sample count across all groups.
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.groups.iter().map(|(_, s)| s.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.groups
            .iter()
            .map(|(label, samples)| (label.as_str(), samples.as_slice()))
    }
}

pub(crate) fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}
