//! ctcperm - verification scores from contingency tables with paired
//! permutation significance testing
//!
//! Records of per-valid-time contingency tables are grouped by averaging
//! time. Each group is summed into one table per system, scored, and (for
//! paired runs) compared against a null distribution built by randomly
//! exchanging the two systems' tables pair by pair.

pub mod aggregate;
pub mod cli;
pub mod contingency;
pub mod error;
pub mod json_output;
pub mod report;
pub mod score;
pub mod significance;
pub mod source;

pub use error::{Error, Result};
