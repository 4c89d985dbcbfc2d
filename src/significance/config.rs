// Configuration for permutation significance estimation
//
// Defaults reproduce the reference batch behaviour: 1000 resamples, a 95%
// interval, groups of fewer than 10 pairs reported without an interval,
// and the outlier filter switched off.

use crate::error::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Outlier filtering strategy applied to a group before aggregation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutlierStrategy {
    /// No filtering (reference behaviour)
    #[default]
    Off,
    /// Reject pairs whose event-total difference between systems is an outlier
    EventCount,
    /// Reject pairs whose per-pair score is an outlier for either system
    Score,
}

impl OutlierStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::EventCount => "event-count",
            Self::Score => "score",
        }
    }
}

/// Configuration for permutation significance estimation
///
/// # Example
/// ```
/// use ctcperm::significance::SignificanceConfig;
///
/// let config = SignificanceConfig::default();
/// assert_eq!(config.resample_count, 1000);
/// assert_eq!(config.min_pairs, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    /// Groups with fewer surviving pairs are reported without an interval
    pub min_pairs: usize,

    /// Number of permuted resamples per group
    pub resample_count: usize,

    /// Two-sided confidence level of the empirical interval
    ///
    /// With 1000 resamples and 0.95 the bounds sit at sorted indices 25 and 975.
    pub confidence: f64,

    /// Largest group accepted before the run aborts
    pub max_pairs: usize,

    /// Outlier cutoff in standard deviations (values <= 0.01 disable filtering)
    pub sd_limit: f64,

    /// Which outlier filter to apply when `sd_limit` enables one
    pub outlier_filter: OutlierStrategy,

    /// Fixed RNG seed; `None` seeds from OS entropy once per run
    pub seed: Option<u64>,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            min_pairs: 10,
            resample_count: 1000,
            confidence: 0.95,
            max_pairs: 1_000_000,
            sd_limit: 0.0,
            outlier_filter: OutlierStrategy::Off,
            seed: None,
        }
    }
}

/// Smallest cutoff treated as "filtering requested"
pub const SD_LIMIT_EPSILON: f64 = 0.01;

impl SignificanceConfig {
    /// Load configuration overrides from a TOML file
    ///
    /// # Example TOML
    /// ```toml
    /// sd_limit = 3.0
    /// outlier_filter = "event-count"
    /// seed = 20252025
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<RunFile> {
        let content = fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!(
                "failed to parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Whether the outlier filter will actually run
    pub fn filter_enabled(&self) -> bool {
        self.outlier_filter != OutlierStrategy::Off && self.sd_limit > SD_LIMIT_EPSILON
    }

    /// Sorted-resample indices of the lower and upper interval bounds
    pub fn interval_indices(&self) -> (usize, usize) {
        let n = self.resample_count;
        // resamples in each tail; the bounds are symmetric ranks around it
        let tail = (n as f64 * (1.0 - self.confidence) / 2.0).round() as usize;
        let last = n.saturating_sub(1);
        (tail.min(last), n.saturating_sub(tail).min(last))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.min_pairs == 0 {
            return Err(Error::InvalidConfig("min_pairs must be >= 1".to_string()));
        }

        if self.resample_count == 0 {
            return Err(Error::InvalidConfig(
                "resample_count must be >= 1".to_string(),
            ));
        }

        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "confidence must be in (0, 1), got {}",
                self.confidence
            )));
        }

        if self.max_pairs == 0 {
            return Err(Error::InvalidConfig("max_pairs must be >= 1".to_string()));
        }

        if self.sd_limit.is_nan() || self.sd_limit < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "sd_limit must be non-negative, got {}",
                self.sd_limit
            )));
        }

        Ok(())
    }
}

/// Settings a TOML run file may override; absent keys fall through
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    pub stat: Option<String>,
    pub sd_limit: Option<f64>,
    pub outlier_filter: Option<OutlierStrategy>,
    pub seed: Option<u64>,
    pub min_pairs: Option<usize>,
    pub resample_count: Option<usize>,
    pub max_pairs: Option<usize>,
}

impl RunFile {
    /// Apply the file's overrides onto a configuration
    pub fn apply(&self, config: &mut SignificanceConfig) {
        if let Some(sd_limit) = self.sd_limit {
            config.sd_limit = sd_limit;
        }
        if let Some(strategy) = self.outlier_filter {
            config.outlier_filter = strategy;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(min_pairs) = self.min_pairs {
            config.min_pairs = min_pairs;
        }
        if let Some(resample_count) = self.resample_count {
            config.resample_count = resample_count;
        }
        if let Some(max_pairs) = self.max_pairs {
            config.max_pairs = max_pairs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SignificanceConfig::default();
        assert_eq!(config.min_pairs, 10);
        assert_eq!(config.resample_count, 1000);
        assert_eq!(config.confidence, 0.95);
        assert_eq!(config.outlier_filter, OutlierStrategy::Off);
        assert!(!config.filter_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_indices_reference_values() {
        let config = SignificanceConfig::default();
        assert_eq!(config.interval_indices(), (25, 975));
    }

    #[test]
    fn test_interval_indices_stay_in_range() {
        let config = SignificanceConfig {
            resample_count: 1,
            ..SignificanceConfig::default()
        };
        assert_eq!(config.interval_indices(), (0, 0));
    }

    #[test]
    fn test_interval_indices_other_levels() {
        let config = SignificanceConfig {
            resample_count: 200,
            ..SignificanceConfig::default()
        };
        assert_eq!(config.interval_indices(), (5, 195));

        let config = SignificanceConfig {
            resample_count: 1000,
            confidence: 0.9,
            ..SignificanceConfig::default()
        };
        assert_eq!(config.interval_indices(), (50, 950));
    }

    #[test]
    fn test_filter_requires_strategy_and_cutoff() {
        let mut config = SignificanceConfig {
            sd_limit: 3.0,
            ..SignificanceConfig::default()
        };
        assert!(!config.filter_enabled());

        config.outlier_filter = OutlierStrategy::Score;
        assert!(config.filter_enabled());

        config.sd_limit = 0.005;
        assert!(!config.filter_enabled());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_resample_count() {
        let mut config = SignificanceConfig::default();
        config.resample_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_confidence() {
        let mut config = SignificanceConfig::default();
        config.confidence = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_sd_limit() {
        let mut config = SignificanceConfig::default();
        config.sd_limit = -1.0;
        assert!(config.validate().is_err());
        config.sd_limit = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_file_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stat = \"FAR\"").unwrap();
        writeln!(file, "sd_limit = 2.5").unwrap();
        writeln!(file, "outlier_filter = \"event-count\"").unwrap();
        writeln!(file, "seed = 99").unwrap();

        let run_file = SignificanceConfig::from_toml(file.path()).unwrap();
        assert_eq!(run_file.stat.as_deref(), Some("FAR"));

        let mut config = SignificanceConfig::default();
        run_file.apply(&mut config);
        assert_eq!(config.sd_limit, 2.5);
        assert_eq!(config.outlier_filter, OutlierStrategy::EventCount);
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.resample_count, 1000);
    }

    #[test]
    fn test_run_file_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "iterations = 5").unwrap();
        assert!(matches!(
            SignificanceConfig::from_toml(file.path()),
            Err(Error::InvalidConfig(_))
        ));
    }
}
