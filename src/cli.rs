//! CLI argument parsing for ctcperm

use crate::significance::{OutlierStrategy, SignificanceConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for group results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Whitespace-separated rows (default)
    Text,
    /// One JSON document for the whole run
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ctcperm")]
#[command(version)]
#[command(
    about = "Permutation significance of contingency-table verification scores",
    long_about = None
)]
pub struct Cli {
    /// Input file of contingency table records
    #[arg(value_name = "INPUT", env = "STAT_FILE")]
    pub input: Option<PathBuf>,

    /// Score to compute (CSI, Bias, Ratio, PODy, PODn, FAR, NPT, Ntot); overrides the input header
    #[arg(long = "stat", value_name = "NAME")]
    pub stat: Option<String>,

    /// Outlier cutoff in standard deviations; overrides the input header
    #[arg(long = "sd-limit", value_name = "SIGMA")]
    pub sd_limit: Option<f64>,

    /// Outlier filter applied when the cutoff exceeds 0.01
    #[arg(long = "outlier-filter", value_enum, value_name = "STRATEGY")]
    pub outlier_filter: Option<OutlierStrategy>,

    /// Seed for the resampling generator (default: OS entropy)
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with run settings
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides onto a configuration
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_input_path() {
        let cli = Cli::parse_from(["ctcperm", "stats.txt"]);
        assert_eq!(cli.input, Some(PathBuf::from("stats.txt")));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_overrides_default_to_none() {
        let cli = Cli::parse_from(["ctcperm", "stats.txt"]);
        assert!(cli.stat.is_none());
        assert!(cli.sd_limit.is_none());
        assert!(cli.outlier_filter.is_none());
        assert!(cli.seed.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_stat_and_sd_limit() {
        let cli = Cli::parse_from(["ctcperm", "--stat", "PODy", "--sd-limit", "2.5", "in.txt"]);
        assert_eq!(cli.stat.as_deref(), Some("PODy"));
        assert_eq!(cli.sd_limit, Some(2.5));
    }

    #[test]
    fn test_cli_outlier_filter_values() {
        let cli = Cli::parse_from(["ctcperm", "--outlier-filter", "event-count", "in.txt"]);
        assert_eq!(cli.outlier_filter, Some(OutlierStrategy::EventCount));

        let cli = Cli::parse_from(["ctcperm", "--outlier-filter", "score", "in.txt"]);
        assert_eq!(cli.outlier_filter, Some(OutlierStrategy::Score));

        assert!(Cli::try_parse_from(["ctcperm", "--outlier-filter", "median", "in.txt"]).is_err());
    }

    #[test]
    fn test_cli_json_format_and_seed() {
        let cli = Cli::parse_from(["ctcperm", "--format", "json", "--seed", "42", "in.txt"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.seed, Some(42));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["ctcperm", "--format", "csv", "in.txt"]).is_err());
    }

    #[test]
    fn test_cli_apply_overrides_only_given_values() {
        let cli = Cli::parse_from(["ctcperm", "--sd-limit", "3", "in.txt"]);
        let mut config = SignificanceConfig {
            seed: Some(9),
            ..SignificanceConfig::default()
        };
        cli.apply(&mut config);
        assert_eq!(config.sd_limit, 3.0);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.outlier_filter, OutlierStrategy::Off);
    }
}
