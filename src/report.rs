//! Report rows for processed groups
//!
//! Text rows keep the legacy whitespace-separated layout:
//!
//! ```text
//! <stat> <pairs> <avtime> <val0> <val1> <val_diff> <uncertainty> <min_vt> <max_vt>
//! ```
//!
//! Groups with an undefined statistic produce a `;BAD at valid_time` line
//! instead of a row. Not-applicable values (single-system runs) print `NA`
//! and a missing interval prints the `NO_INTERVAL` sentinel.

use crate::cli::OutputFormat;
use crate::json_output::JsonOutput;
use crate::significance::{GroupEstimate, GroupVerdict, SignificanceConfig};
use std::io::{self, Write};

/// Stand-in uncertainty for rows reported without an interval
pub const NO_INTERVAL: f64 = 32767.0;

/// Marker for values that do not apply to a single-system run
pub const NOT_APPLICABLE: &str = "NA";

fn fixed(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.6}", v),
        None => NOT_APPLICABLE.to_string(),
    }
}

/// Build the text line for one group: a numeric row or a diagnostic
pub fn format_row(estimate: &GroupEstimate) -> String {
    if estimate.verdict == GroupVerdict::Undefined {
        return format!(";BAD at valid_time {}", estimate.avtime);
    }

    let stat = &estimate.stat;
    let (val1, val_diff) = if stat.has_comparison() {
        (fixed(stat.val[1]), fixed(stat.val_diff))
    } else {
        (NOT_APPLICABLE.to_string(), NOT_APPLICABLE.to_string())
    };

    format!(
        "{} {} {} {} {} {} {:.6} {} {}",
        estimate.score,
        estimate.pairs_used,
        estimate.avtime,
        fixed(stat.val[0]),
        val1,
        val_diff,
        estimate.uncertainty().unwrap_or(NO_INTERVAL),
        estimate.min_valid_time,
        estimate.max_valid_time
    )
}

/// Writes group results in the selected output format
#[derive(Debug)]
pub struct ReportWriter<W: Write> {
    out: W,
    format: OutputFormat,
    json: Option<JsonOutput>,
    rows: usize,
    diagnostics: usize,
}

impl<W: Write> ReportWriter<W> {
    /// Start a report; text output echoes the run settings as comment lines
    pub fn begin(
        mut out: W,
        format: OutputFormat,
        stat: &str,
        config: &SignificanceConfig,
    ) -> io::Result<Self> {
        let json = match format {
            OutputFormat::Text => {
                writeln!(out, ";stat_type is {}", stat)?;
                writeln!(out, ";sd limit is {:.6}", config.sd_limit)?;
                None
            }
            OutputFormat::Json => Some(JsonOutput::new(stat, config)),
        };

        Ok(Self {
            out,
            format,
            json,
            rows: 0,
            diagnostics: 0,
        })
    }

    pub fn write_group(&mut self, estimate: &GroupEstimate) -> io::Result<()> {
        if estimate.verdict == GroupVerdict::Undefined {
            self.diagnostics += 1;
            tracing::debug!(avtime = estimate.avtime, "statistic undefined for group");
        } else {
            self.rows += 1;
        }

        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", format_row(estimate)),
            OutputFormat::Json => {
                if let Some(json) = self.json.as_mut() {
                    json.add_group(estimate);
                }
                Ok(())
            }
        }
    }

    /// Numeric rows and diagnostics written so far
    pub fn counts(&self) -> (usize, usize) {
        (self.rows, self.diagnostics)
    }

    /// Flush the report and hand back the writer
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(json) = self.json.take() {
            let doc = json.to_json().map_err(io::Error::other)?;
            writeln!(self.out, "{}", doc)?;
        }
        self.out.flush()?;
        Ok(self.out)
    }
}
