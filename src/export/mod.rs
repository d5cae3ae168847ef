pub mod csv;
pub mod jsonl;

use std::path::Path;

use thiserror::Error;

use crate::parsers::browser::{DownloadRecord, VisitRecord};
use crate::parsers::sqlite_db::Extraction;

#[derive(Debug, Clone, Copy)]
pub enum ExportBackendKind {
    Csv,
    Jsonl,
}

impl From<crate::cli::ExportFormat> for ExportBackendKind {
    fn from(format: crate::cli::ExportFormat) -> Self {
        match format {
            crate::cli::ExportFormat::Csv => ExportBackendKind::Csv,
            crate::cli::ExportFormat::Jsonl => ExportBackendKind::Jsonl,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Output sink for extracted history records.
pub trait ExportSink {
    fn record_visit(&mut self, record: &VisitRecord) -> Result<(), ExportError>;
    fn record_download(&mut self, record: &DownloadRecord) -> Result<(), ExportError>;
    fn flush(&mut self) -> Result<(), ExportError>;
}

/// A no-op sink for dry-run mode that doesn't write any files.
pub struct DryRunSink;

impl ExportSink for DryRunSink {
    fn record_visit(&mut self, _record: &VisitRecord) -> Result<(), ExportError> {
        Ok(())
    }
    fn record_download(&mut self, _record: &DownloadRecord) -> Result<(), ExportError> {
        Ok(())
    }
    fn flush(&mut self) -> Result<(), ExportError> {
        Ok(())
    }
}

pub fn build_sink(
    backend: ExportBackendKind,
    output: &Path,
) -> Result<Box<dyn ExportSink>, ExportError> {
    match backend {
        ExportBackendKind::Csv => Ok(Box::new(csv::CsvSink::create(output)?)),
        ExportBackendKind::Jsonl => Ok(Box::new(jsonl::JsonlSink::create(output)?)),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportStats {
    pub visits: u64,
    pub downloads: u64,
    pub invalid_timestamps: u64,
}

/// Feed every extracted record through the sink and flush it.
pub fn run_export(
    extraction: &Extraction,
    sink: &mut dyn ExportSink,
) -> Result<ExportStats, ExportError> {
    let mut stats = ExportStats {
        invalid_timestamps: extraction.invalid_timestamps,
        ..Default::default()
    };
    for record in &extraction.visits {
        sink.record_visit(record)?;
        stats.visits += 1;
    }
    for record in &extraction.downloads {
        sink.record_download(record)?;
        stats.downloads += 1;
    }
    sink.flush()?;
    Ok(stats)
}
