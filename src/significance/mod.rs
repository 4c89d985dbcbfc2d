// Permutation significance testing of paired verification scores
//
// Per group of contingency table pairs sharing an avtime, this module
// produces the true score difference between two forecast systems and an
// empirical 95% interval of that difference under the null hypothesis that
// the systems are exchangeable per observation.
//
// Pipeline:
// - Outlier filtering (off by default) rejects pairs far from the group mean
// - True aggregation and scoring give the point estimate
// - 1000 permuted aggregates give the null distribution of the difference
// - Sorted ranks 25 and 975 bound the interval; (upper - lower) / 3.92 is the
//   reported uncertainty

mod config;
mod estimator;
mod outlier_filter;

pub use config::{OutlierStrategy, RunFile, SignificanceConfig, SD_LIMIT_EPSILON};
pub use estimator::{
    empirical_interval, resample_differences, seeded_rng, GroupEstimate, GroupVerdict, Interval,
    NoIntervalReason, SignificanceEstimator, Z_95,
};
pub use outlier_filter::{filter_outliers, mean_and_sd, FilterOutcome};
