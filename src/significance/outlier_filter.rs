// Outlier filtering of contingency table pairs
//
// Two strategies compare a per-pair quantity against the group mean plus
// or minus `sd_limit` sample standard deviations:
// - EventCount: difference in total event count between the two systems
// - Score: the per-pair score of each applicable system
//
// Filtering is pure: the input order is kept in both the surviving and the
// rejected sequences.

use crate::contingency::{ContingencyTablePair, SystemMode};
use crate::score::{compute_stat, ScoreKind};
use crate::significance::config::{OutlierStrategy, SD_LIMIT_EPSILON};
use trueno::Vector;

/// Result of splitting a group into surviving and rejected pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub kept: Vec<ContingencyTablePair>,
    pub rejected: Vec<ContingencyTablePair>,
}

impl FilterOutcome {
    fn keep_all(pairs: &[ContingencyTablePair]) -> Self {
        Self {
            kept: pairs.to_vec(),
            rejected: Vec::new(),
        }
    }
}

/// Mean and sample standard deviation (n - 1 denominator)
///
/// Returns `None` for fewer than two values.
pub fn mean_and_sd(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let vec = Vector::from_slice(&data);

    // trueno returns the population variance; rescale to the sample variance
    let mean = vec.mean().ok()?;
    let variance = vec.variance().ok()?;
    let n = values.len() as f64;
    let sample_variance = f64::from(variance) * n / (n - 1.0);

    Some((f64::from(mean), sample_variance.max(0.0).sqrt()))
}

/// Whether `value` lies more than `sd_limit` deviations from `mean`
///
/// The statistics are single precision, so deviations within one `f32` ulp
/// of the larger magnitude never count as outlying.
fn is_outlier(value: f64, mean: f64, sd: f64, sd_limit: f64) -> bool {
    let slack = f64::from(f32::EPSILON) * value.abs().max(mean.abs()).max(1.0);
    (value - mean).abs() > sd_limit * sd + slack
}

/// Split `pairs` into those within `sd_limit` standard deviations and the rest
pub fn filter_outliers(
    pairs: &[ContingencyTablePair],
    strategy: OutlierStrategy,
    kind: ScoreKind,
    mode: SystemMode,
    sd_limit: f64,
) -> FilterOutcome {
    if pairs.len() <= 1 || sd_limit <= SD_LIMIT_EPSILON {
        return FilterOutcome::keep_all(pairs);
    }

    let keep = match strategy {
        OutlierStrategy::Off => return FilterOutcome::keep_all(pairs),
        OutlierStrategy::EventCount => {
            if mode == SystemMode::Single {
                return FilterOutcome::keep_all(pairs);
            }
            event_count_mask(pairs, sd_limit)
        }
        OutlierStrategy::Score => score_mask(pairs, kind, mode, sd_limit),
    };

    let mut outcome = FilterOutcome::default();
    for (pair, keep) in pairs.iter().zip(keep) {
        if keep {
            outcome.kept.push(*pair);
        } else {
            tracing::trace!(pair = %pair, "rejected outlier pair");
            outcome.rejected.push(*pair);
        }
    }

    tracing::debug!(
        strategy = strategy.as_str(),
        rejected = outcome.rejected.len(),
        total = pairs.len(),
        "outlier filter applied"
    );
    outcome
}

fn event_count_mask(pairs: &[ContingencyTablePair], sd_limit: f64) -> Vec<bool> {
    let diffs: Vec<f64> = pairs.iter().map(|p| p.total_difference() as f64).collect();
    let Some((mean, sd)) = mean_and_sd(&diffs) else {
        return vec![true; pairs.len()];
    };
    tracing::debug!(mean, sd, n = pairs.len(), "event-count difference spread");

    diffs
        .iter()
        .map(|&d| !is_outlier(d, mean, sd, sd_limit))
        .collect()
}

fn score_mask(
    pairs: &[ContingencyTablePair],
    kind: ScoreKind,
    mode: SystemMode,
    sd_limit: f64,
) -> Vec<bool> {
    let stats: Vec<_> = pairs.iter().map(|p| compute_stat(p, kind, mode)).collect();
    let mut keep = vec![true; pairs.len()];

    for system in 0..mode.systems() {
        let defined: Vec<f64> = stats.iter().filter_map(|s| s.val[system]).collect();
        let Some((mean, sd)) = mean_and_sd(&defined) else {
            continue;
        };
        tracing::debug!(system, mean, sd, defined = defined.len(), "per-pair score spread");

        for (flag, stat) in keep.iter_mut().zip(&stats) {
            if let Some(value) = stat.val[system] {
                if is_outlier(value, mean, sd, sd_limit) {
                    *flag = false;
                }
            }
        }
    }
    keep
}
