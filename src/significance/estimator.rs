// Per-group significance estimation by paired permutation resampling
//
// For each group: optionally filter outliers, aggregate the surviving pairs,
// compute the true stat, then (for paired runs with enough pairs) build the
// null distribution of the score difference from permuted aggregates and
// read its empirical interval.

use crate::aggregate::{aggregate_permuted, aggregate_true};
use crate::contingency::{ContingencyTablePair, Group, SystemMode};
use crate::error::{Error, Result};
use crate::score::{compute_stat, ScoreKind, Stat};
use crate::significance::config::SignificanceConfig;
use crate::significance::outlier_filter::filter_outliers;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

/// z-score of the two-sided 95% normal interval
pub const Z_95: f64 = 1.96;

/// Empirical interval of the null-hypothesis score difference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    /// Standard-error equivalent under a normality assumption
    pub fn uncertainty(&self) -> f64 {
        (self.upper - self.lower) / (Z_95 * 2.0)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Why a defined group was reported without an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoIntervalReason {
    /// Fewer surviving pairs than `min_pairs`
    SmallSample,
    /// Single-system run; there is nothing to exchange
    SingleSystem,
    /// An interval bound fell on an undefined resample
    UndefinedInterval,
}

impl NoIntervalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmallSample => "small_sample",
            Self::SingleSystem => "single_system",
            Self::UndefinedInterval => "undefined_interval",
        }
    }
}

/// Reporting decision for one group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupVerdict {
    /// True stat defined and an interval was computed
    Estimate,
    /// True stat defined, no interval available
    PointEstimate(NoIntervalReason),
    /// True stat undefined; only a diagnostic is emitted
    Undefined,
}

/// Everything known about one processed group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEstimate {
    pub score: ScoreKind,
    pub avtime: i64,
    pub pairs_used: usize,
    pub rejected_pairs: usize,
    pub min_valid_time: i64,
    pub max_valid_time: i64,
    pub stat: Stat,
    /// Number of permuted resamples drawn (0 when resampling was skipped)
    pub iterations: usize,
    pub interval: Option<Interval>,
    pub verdict: GroupVerdict,
}

impl GroupEstimate {
    pub fn uncertainty(&self) -> Option<f64> {
        match self.verdict {
            GroupVerdict::Estimate => self.interval.map(|i| i.uncertainty()),
            _ => None,
        }
    }

    /// Whether the true difference falls outside the null interval
    pub fn is_significant(&self) -> Option<bool> {
        match (self.verdict, self.interval, self.stat.val_diff) {
            (GroupVerdict::Estimate, Some(interval), Some(diff)) => Some(!interval.contains(diff)),
            _ => None,
        }
    }
}

/// Seed the run's generator once; `None` draws the seed from OS entropy
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Score differences of `count` independently permuted aggregates
pub fn resample_differences<R: Rng + ?Sized>(
    pairs: &[ContingencyTablePair],
    kind: ScoreKind,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Option<f64>>> {
    (0..count)
        .map(|_| {
            let overall = aggregate_permuted(pairs, SystemMode::Paired, rng)?;
            Ok(compute_stat(&overall, kind, SystemMode::Paired).val_diff)
        })
        .collect()
}

/// Sort ascending (undefined last) and read the bounds at the given ranks
pub fn empirical_interval(diffs: &mut [Option<f64>], lower: usize, upper: usize) -> Option<Interval> {
    diffs.sort_by(|a, b| match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let lower = (*diffs.get(lower)?)?;
    let upper = (*diffs.get(upper)?)?;
    Some(Interval { lower, upper })
}

/// Runs the per-group pipeline with one generator for the whole run
#[derive(Debug)]
pub struct SignificanceEstimator<R: Rng> {
    config: SignificanceConfig,
    score: ScoreKind,
    rng: R,
}

impl<R: Rng> SignificanceEstimator<R> {
    pub fn new(config: SignificanceConfig, score: ScoreKind, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, score, rng })
    }

    pub fn config(&self) -> &SignificanceConfig {
        &self.config
    }

    pub fn score(&self) -> ScoreKind {
        self.score
    }

    /// Process one group to its reporting decision
    pub fn estimate(&mut self, group: &Group, mode: SystemMode) -> Result<GroupEstimate> {
        if group.len() > self.config.max_pairs {
            return Err(Error::CapacityExceeded {
                avtime: group.avtime,
                max: self.config.max_pairs,
            });
        }

        let (pairs, rejected_pairs) = if self.config.filter_enabled() {
            let outcome = filter_outliers(
                &group.pairs,
                self.config.outlier_filter,
                self.score,
                mode,
                self.config.sd_limit,
            );
            let rejected = outcome.rejected.len();
            (outcome.kept, rejected)
        } else {
            (group.pairs.clone(), 0)
        };

        let overall = aggregate_true(&pairs, mode)?;
        let stat = compute_stat(&overall, self.score, mode);
        tracing::debug!(
            avtime = group.avtime,
            pairs = pairs.len(),
            overall = %overall,
            "true aggregate"
        );

        let mut estimate = GroupEstimate {
            score: self.score,
            avtime: group.avtime,
            pairs_used: pairs.len(),
            rejected_pairs,
            min_valid_time: group.min_valid_time,
            max_valid_time: group.max_valid_time,
            stat,
            iterations: 0,
            interval: None,
            verdict: GroupVerdict::Undefined,
        };

        let skip_reason = if pairs.len() < self.config.min_pairs {
            Some(NoIntervalReason::SmallSample)
        } else if mode == SystemMode::Single {
            Some(NoIntervalReason::SingleSystem)
        } else {
            None
        };

        if let Some(reason) = skip_reason {
            estimate.verdict = if stat.is_undefined() {
                GroupVerdict::Undefined
            } else {
                GroupVerdict::PointEstimate(reason)
            };
            tracing::debug!(avtime = group.avtime, reason = reason.as_str(), "resampling skipped");
            return Ok(estimate);
        }

        let mut diffs = resample_differences(
            &pairs,
            self.score,
            self.config.resample_count,
            &mut self.rng,
        )?;
        estimate.iterations = diffs.len();
        let (lower, upper) = self.config.interval_indices();
        estimate.interval = empirical_interval(&mut diffs, lower, upper);

        estimate.verdict = if stat.is_undefined() {
            GroupVerdict::Undefined
        } else if estimate.interval.is_some() {
            GroupVerdict::Estimate
        } else {
            tracing::warn!(
                avtime = group.avtime,
                "interval bound fell on an undefined resample; reporting without uncertainty"
            );
            GroupVerdict::PointEstimate(NoIntervalReason::UndefinedInterval)
        };
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contingency::ContingencyTable;

    #[test]
    fn test_interval_uncertainty() {
        let interval = Interval {
            lower: -0.196,
            upper: 0.196,
        };
        assert!((interval.uncertainty() - 0.1).abs() < 1e-12);
        assert!(interval.contains(0.0));
        assert!(!interval.contains(0.2));
    }

    #[test]
    fn test_empirical_interval_sorts_and_indexes() {
        let mut diffs: Vec<Option<f64>> = (0..100).rev().map(|i| Some(i as f64)).collect();
        let interval = empirical_interval(&mut diffs, 2, 97).unwrap();
        assert_eq!(interval.lower, 2.0);
        assert_eq!(interval.upper, 97.0);
    }

    #[test]
    fn test_empirical_interval_undefined_sorts_last() {
        let mut diffs = vec![None, Some(3.0), Some(1.0), None, Some(2.0)];
        let interval = empirical_interval(&mut diffs, 0, 2).unwrap();
        assert_eq!(interval.lower, 1.0);
        assert_eq!(interval.upper, 3.0);
        assert_eq!(diffs[3], None);

        let mut diffs = vec![None, Some(3.0), Some(1.0), None, Some(2.0)];
        assert_eq!(empirical_interval(&mut diffs, 0, 4), None);
    }

    #[test]
    fn test_empirical_interval_out_of_range() {
        let mut diffs = vec![Some(1.0)];
        assert_eq!(empirical_interval(&mut diffs, 0, 5), None);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = seeded_rng(Some(11));
        let mut b = seeded_rng(Some(11));
        let xs: Vec<u64> = (0..4).map(|_| a.gen()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_resample_count_matches_request() {
        let pairs = vec![
            ContingencyTablePair::paired(
                0,
                ContingencyTable::new(3, 1, 1, 5),
                ContingencyTable::new(2, 2, 0, 6),
            );
            12
        ];
        let mut rng = seeded_rng(Some(3));
        let diffs = resample_differences(&pairs, ScoreKind::Csi, 37, &mut rng).unwrap();
        assert_eq!(diffs.len(), 37);
        assert!(diffs.iter().all(Option::is_some));
    }

    #[test]
    fn test_capacity_exceeded_is_fatal() {
        let config = SignificanceConfig {
            max_pairs: 2,
            ..SignificanceConfig::default()
        };
        let ct = ContingencyTable::new(1, 1, 1, 1);
        let group = Group::from_pairs(
            7,
            (0..3)
                .map(|i| ContingencyTablePair::paired(i, ct, ct))
                .collect(),
        );
        let mut estimator =
            SignificanceEstimator::new(config, ScoreKind::Csi, seeded_rng(Some(1))).unwrap();
        assert!(matches!(
            estimator.estimate(&group, SystemMode::Paired),
            Err(Error::CapacityExceeded { avtime: 7, max: 2 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = SignificanceConfig {
            resample_count: 0,
            ..SignificanceConfig::default()
        };
        assert!(SignificanceEstimator::new(config, ScoreKind::Csi, seeded_rng(Some(1))).is_err());
    }
}
