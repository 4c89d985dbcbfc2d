//! Contingency table data model
//!
//! A `ContingencyTable` holds the four categorical outcome counts for one
//! forecast system at one observation. Pairs of tables (one per system)
//! are grouped by their forecast-average time (`avtime`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// 2x2 categorical outcome counts for one forecast system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    pub hits: u64,
    pub misses: u64,
    pub false_alarms: u64,
    /// Correct rejections (or correct nulls)
    pub correct_rejections: u64,
}

impl ContingencyTable {
    pub fn new(hits: u64, misses: u64, false_alarms: u64, correct_rejections: u64) -> Self {
        Self {
            hits,
            misses,
            false_alarms,
            correct_rejections,
        }
    }

    /// Sample size for this observation, widened so the sum cannot overflow
    pub fn total(&self) -> u128 {
        u128::from(self.hits)
            + u128::from(self.misses)
            + u128::from(self.false_alarms)
            + u128::from(self.correct_rejections)
    }

    /// Field-by-field sum; `None` if any count overflows
    pub fn checked_add(&self, rhs: &ContingencyTable) -> Option<ContingencyTable> {
        Some(Self {
            hits: self.hits.checked_add(rhs.hits)?,
            misses: self.misses.checked_add(rhs.misses)?,
            false_alarms: self.false_alarms.checked_add(rhs.false_alarms)?,
            correct_rejections: self.correct_rejections.checked_add(rhs.correct_rejections)?,
        })
    }
}

impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.hits, self.misses, self.false_alarms, self.correct_rejections
        )
    }
}

/// Whether a run compares two forecast systems or scores a single one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemMode {
    /// Only the first table of each pair carries data
    Single,
    /// Both tables carry data and are compared
    Paired,
}

impl SystemMode {
    /// Number of systems that take part in arithmetic
    pub fn systems(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Paired => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single-system",
            Self::Paired => "paired",
        }
    }
}

/// Contingency tables for both systems at one valid time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTablePair {
    pub valid_time: i64,
    pub tables: [ContingencyTable; 2],
}

impl ContingencyTablePair {
    pub fn paired(valid_time: i64, first: ContingencyTable, second: ContingencyTable) -> Self {
        Self {
            valid_time,
            tables: [first, second],
        }
    }

    /// Pair for single-system runs; the second table stays all zero
    pub fn single(valid_time: i64, table: ContingencyTable) -> Self {
        Self {
            valid_time,
            tables: [table, ContingencyTable::default()],
        }
    }

    /// Combined count over both tables
    pub fn combined_total(&self) -> u128 {
        self.tables[0].total() + self.tables[1].total()
    }

    /// Difference in event totals between system 0 and system 1
    pub fn total_difference(&self) -> i128 {
        // a table total is below 2^66, so both casts are lossless
        self.tables[0].total() as i128 - self.tables[1].total() as i128
    }
}

impl fmt::Display for ContingencyTablePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} / {}",
            self.valid_time, self.tables[0], self.tables[1]
        )
    }
}

/// All pairs sharing one forecast-average time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub avtime: i64,
    pub pairs: Vec<ContingencyTablePair>,
    pub min_valid_time: i64,
    pub max_valid_time: i64,
}

impl Group {
    /// Start a group from its first pair
    pub fn new(avtime: i64, first: ContingencyTablePair) -> Self {
        Self {
            avtime,
            min_valid_time: first.valid_time,
            max_valid_time: first.valid_time,
            pairs: vec![first],
        }
    }

    /// Build a group from a list of pairs (must be non-empty to carry a valid-time range)
    pub fn from_pairs(avtime: i64, pairs: Vec<ContingencyTablePair>) -> Self {
        let min_valid_time = pairs.iter().map(|p| p.valid_time).min().unwrap_or_default();
        let max_valid_time = pairs.iter().map(|p| p.valid_time).max().unwrap_or_default();
        Self {
            avtime,
            pairs,
            min_valid_time,
            max_valid_time,
        }
    }

    pub fn push(&mut self, pair: ContingencyTablePair) {
        self.min_valid_time = self.min_valid_time.min(pair.valid_time);
        self.max_valid_time = self.max_valid_time.max(pair.valid_time);
        self.pairs.push(pair);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
