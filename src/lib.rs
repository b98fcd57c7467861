pub mod cli;
pub mod coerce;
pub mod columns;
pub mod data;
pub mod error;
pub mod frequency;
pub mod io_utils;
pub mod metrics;
pub mod render;
pub mod report;
pub mod schema;
pub mod stats;
pub mod table;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Commands};

pub use crate::{
    data::{Dataset, Value},
    error::DatasetError,
    metrics::Metric,
    report::{Report, assemble, build_report},
    schema::{NormalizedDataset, normalize, normalize_default},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_metrics", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Report(args) => handle_report(&args),
        Commands::Columns(args) => columns::execute(&args),
    }
}

fn handle_report(args: &cli::ReportArgs) -> Result<()> {
    let source = &args.source;
    let delimiter = io_utils::resolve_input_delimiter(&source.input, source.delimiter);
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    info!(
        "Reading '{}' with delimiter '{}'",
        source.input.display(),
        io_utils::printable_delimiter(delimiter)
    );
    let dataset = Dataset::from_path(&source.input, delimiter, encoding)?;
    info!(
        "Loaded {} row(s) across {} column(s)",
        dataset.row_count(),
        dataset.headers().len()
    );

    let report = build_report(&dataset);
    let rendered = render::render(&report, args.format)?;
    let mut output = io_utils::open_output(args.output.as_deref())?;
    output
        .write_all(rendered.as_bytes())
        .and_then(|_| output.flush())
        .context("Writing report")?;
    if let Some(path) = &args.output {
        info!("Report written to {path:?}");
    }
    Ok(())
}
