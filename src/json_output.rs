//! JSON output format for significance reports
//!
//! `--format json` collects every group and writes one document at the end
//! of the run. Undefined and not-applicable values serialize as `null`;
//! an undefined group carries no values at all.

use crate::contingency::SystemMode;
use crate::significance::{GroupEstimate, GroupVerdict, SignificanceConfig};
use serde::{Deserialize, Serialize};

/// Empirical interval bounds of the null difference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JsonInterval {
    pub lower: f64,
    pub upper: f64,
}

/// One processed group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonGroup {
    pub avtime: i64,
    /// `estimate`, `point_estimate` or `undefined`
    pub status: String,
    /// Why no interval was computed (point estimates only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub pairs: usize,
    pub rejected_pairs: usize,
    pub val0: Option<f64>,
    pub val1: Option<f64>,
    pub val_diff: Option<f64>,
    pub uncertainty: Option<f64>,
    pub interval: Option<JsonInterval>,
    pub significant: Option<bool>,
    /// Number of permuted resamples drawn
    pub iterations: usize,
    pub min_valid_time: i64,
    pub max_valid_time: i64,
}

impl From<&GroupEstimate> for JsonGroup {
    fn from(estimate: &GroupEstimate) -> Self {
        let (status, reason) = match estimate.verdict {
            GroupVerdict::Estimate => ("estimate", None),
            GroupVerdict::PointEstimate(reason) => ("point_estimate", Some(reason.as_str())),
            GroupVerdict::Undefined => ("undefined", None),
        };
        let defined = estimate.verdict != GroupVerdict::Undefined;

        Self {
            avtime: estimate.avtime,
            status: status.to_string(),
            reason: reason.map(str::to_string),
            pairs: estimate.pairs_used,
            rejected_pairs: estimate.rejected_pairs,
            val0: estimate.stat.val[0].filter(|_| defined),
            val1: estimate.stat.val[1].filter(|_| defined),
            val_diff: estimate.stat.val_diff.filter(|_| defined),
            uncertainty: estimate.uncertainty(),
            interval: estimate
                .interval
                .filter(|_| defined)
                .map(|i| JsonInterval {
                    lower: i.lower,
                    upper: i.upper,
                }),
            significant: estimate.is_significant(),
            iterations: estimate.iterations,
            min_valid_time: estimate.min_valid_time,
            max_valid_time: estimate.max_valid_time,
        }
    }
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// Score name
    pub stat: String,
    /// Run mode; absent when the input held no records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<SystemMode>,
    pub config: SignificanceConfig,
    pub groups: Vec<JsonGroup>,
}

impl JsonOutput {
    pub fn new(stat: &str, config: &SignificanceConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "ctcperm-json-v1".to_string(),
            stat: stat.to_string(),
            mode: None,
            config: config.clone(),
            groups: Vec::new(),
        }
    }

    /// Add a processed group to the output
    pub fn add_group(&mut self, estimate: &GroupEstimate) {
        self.mode.get_or_insert(estimate.stat.mode);
        self.groups.push(JsonGroup::from(estimate));
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
