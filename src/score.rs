//! Categorical verification scores computed from contingency tables
//!
//! Scores are selected by exact, case-sensitive name. A zero denominator
//! yields an undefined score (`None`) rather than a division error, and an
//! undefined input poisons every value derived from it.

use crate::contingency::{ContingencyTable, ContingencyTablePair, SystemMode};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported verification scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreKind {
    /// Critical success index: hits / (hits + misses + false alarms)
    #[serde(rename = "CSI")]
    Csi,
    /// Frequency bias: (hits + false alarms) / (hits + misses)
    #[serde(rename = "Bias")]
    Bias,
    /// Observed event ratio: (hits + misses) / total
    #[serde(rename = "Ratio")]
    Ratio,
    /// Probability of detection (yes): hits / (hits + misses)
    #[serde(rename = "PODy")]
    PodYes,
    /// Probability of detection (no): correct rejections / (false alarms + correct rejections)
    #[serde(rename = "PODn")]
    PodNo,
    /// False alarm ratio: false alarms / (hits + false alarms)
    #[serde(rename = "FAR")]
    Far,
    /// Number of observed events: hits + misses
    #[serde(rename = "NPT")]
    Npt,
    /// Total number of observations
    #[serde(rename = "Ntot")]
    Ntot,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 8] = [
        Self::Csi,
        Self::Bias,
        Self::Ratio,
        Self::PodYes,
        Self::PodNo,
        Self::Far,
        Self::Npt,
        Self::Ntot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Csi => "CSI",
            Self::Bias => "Bias",
            Self::Ratio => "Ratio",
            Self::PodYes => "PODy",
            Self::PodNo => "PODn",
            Self::Far => "FAR",
            Self::Npt => "NPT",
            Self::Ntot => "Ntot",
        }
    }

    /// Evaluate this score on one table; `None` when the denominator is zero
    pub fn evaluate(self, ct: &ContingencyTable) -> Option<f64> {
        let hits = u128::from(ct.hits);
        let misses = u128::from(ct.misses);
        let false_alarms = u128::from(ct.false_alarms);
        let correct_rejections = u128::from(ct.correct_rejections);

        let (numerator, denominator) = match self {
            Self::Csi => (hits, hits + misses + false_alarms),
            Self::Bias => (hits + false_alarms, hits + misses),
            Self::Ratio => (hits + misses, ct.total()),
            Self::PodYes => (hits, hits + misses),
            Self::PodNo => (correct_rejections, false_alarms + correct_rejections),
            Self::Far => (false_alarms, hits + false_alarms),
            Self::Npt => return Some((hits + misses) as f64),
            Self::Ntot => return Some(ct.total() as f64),
        };

        if denominator == 0 {
            None
        } else {
            Some(numerator as f64 / denominator as f64)
        }
    }
}

impl FromStr for ScoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnsupportedScore(s.to_string()))
    }
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Score values for one evaluation of a contingency table pair
///
/// `val_diff` is `val[1] - val[0]`. In single-system mode only `val[0]` is
/// computed; `val[1]` and `val_diff` are not applicable and stay `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stat {
    pub mode: SystemMode,
    pub val: [Option<f64>; 2],
    pub val_diff: Option<f64>,
}

impl Stat {
    /// True when any applicable score is undefined
    pub fn is_undefined(&self) -> bool {
        match self.mode {
            SystemMode::Single => self.val[0].is_none(),
            SystemMode::Paired => self.val[0].is_none() || self.val[1].is_none(),
        }
    }

    /// Whether `val[1]` and `val_diff` carry meaning for this stat
    pub fn has_comparison(&self) -> bool {
        self.mode == SystemMode::Paired
    }
}

/// Compute the score for each applicable system of a pair
pub fn compute_stat(pair: &ContingencyTablePair, kind: ScoreKind, mode: SystemMode) -> Stat {
    let first = kind.evaluate(&pair.tables[0]);
    match mode {
        SystemMode::Single => Stat {
            mode,
            val: [first, None],
            val_diff: None,
        },
        SystemMode::Paired => {
            let second = kind.evaluate(&pair.tables[1]);
            let val_diff = match (first, second) {
                (Some(a), Some(b)) => Some(b - a),
                _ => None,
            };
            Stat {
                mode,
                val: [first, second],
                val_diff,
            }
        }
    }
}
