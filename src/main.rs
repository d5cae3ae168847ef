use anyhow::{Context, Result};
use tracing::{info, warn};

use webtrail::{cli, export, logging, parsers::sqlite_db::HistoryDb};

fn main() -> Result<()> {
    logging::init_logging();

    let opts = cli::parse();

    let db = HistoryDb::open(&opts.input, opts.snapshot)
        .with_context(|| format!("failed to open history database {}", opts.input.display()))?;
    let extraction = db
        .extract(opts.browser, !opts.no_downloads)
        .with_context(|| format!("failed to read history from {}", opts.input.display()))?;

    info!(
        "detected {} schema, browser={} visits={} downloads={}",
        extraction.schema,
        extraction.browser,
        extraction.visits.len(),
        extraction.downloads.len()
    );

    let mut sink: Box<dyn export::ExportSink> = if opts.dry_run {
        Box::new(export::DryRunSink)
    } else {
        export::build_sink(opts.format.into(), &opts.output)
            .with_context(|| format!("failed to create output file {}", opts.output.display()))?
    };

    let stats = export::run_export(&extraction, sink.as_mut())
        .with_context(|| format!("failed to write {}", opts.output.display()))?;

    if stats.invalid_timestamps > 0 {
        warn!(
            "{} records had out-of-range timestamps and were written with an empty field",
            stats.invalid_timestamps
        );
    }
    if opts.dry_run {
        info!(
            "dry run: {} visits and {} downloads parsed, nothing written",
            stats.visits, stats.downloads
        );
    } else {
        info!(
            "export complete: {} visits and {} downloads -> {}",
            stats.visits,
            stats.downloads,
            opts.output.display()
        );
    }
    Ok(())
}
