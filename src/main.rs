use anyhow::{Context, Result};
use clap::Parser;
use ctcperm::{
    cli::Cli,
    report::ReportWriter,
    score::ScoreKind,
    significance::{seeded_rng, RunFile, SignificanceConfig, SignificanceEstimator},
    source::RecordSource,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises everything to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let Some(input) = args.input.as_ref() else {
        anyhow::bail!("No input file given. Usage: ctcperm INPUT (or set STAT_FILE)");
    };

    let run_file = match &args.config {
        Some(path) => SignificanceConfig::from_toml(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunFile::default(),
    };

    // Header values sit below the TOML file and the command line
    let mut config = SignificanceConfig::default();
    run_file.apply(&mut config);
    args.apply(&mut config);

    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut source = RecordSource::from_reader(BufReader::new(file), config.max_pairs)
        .with_context(|| format!("reading header of {}", input.display()))?;
    let header = source.header().clone();

    if run_file.sd_limit.is_none() && args.sd_limit.is_none() {
        config.sd_limit = header.sd_limit;
    }
    let stat = args
        .stat
        .clone()
        .or_else(|| run_file.stat.clone())
        .unwrap_or(header.stat);

    let score: ScoreKind = stat.parse()?;
    config.validate()?;
    if config.sd_limit > 0.0 && !config.filter_enabled() {
        tracing::debug!(
            sd_limit = config.sd_limit,
            strategy = config.outlier_filter.as_str(),
            "outlier filter inactive"
        );
    }

    let rng = seeded_rng(config.seed);
    let mut estimator = SignificanceEstimator::new(config.clone(), score, rng)?;

    let stdout = io::stdout();
    let mut report = ReportWriter::begin(
        BufWriter::new(stdout.lock()),
        args.format,
        score.name(),
        &config,
    )?;

    while let Some(group) = source.next() {
        let group = group.with_context(|| format!("reading {}", input.display()))?;
        let mode = source
            .mode()
            .context("run mode unknown after reading a group")?;
        let estimate = estimator.estimate(&group, mode)?;
        report.write_group(&estimate)?;
    }

    let (rows, diagnostics) = report.counts();
    report.finish()?;
    tracing::debug!(rows, diagnostics, "run complete");

    Ok(())
}
