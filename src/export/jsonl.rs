use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::export::{ExportError, ExportSink};
use crate::parsers::browser::{DownloadRecord, VisitRecord};
use crate::timestamp;

/// JSONL sink: one object per line, same timestamp rendering as the CSV
/// backend.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

#[derive(Serialize)]
struct VisitJson<'a> {
    record_type: &'static str,
    browser: &'a str,
    url: &'a str,
    title: Option<&'a str>,
    visit_count: Option<i64>,
    visit_time: Option<String>,
    visit_source: Option<&'a str>,
}

#[derive(Serialize)]
struct DownloadJson<'a> {
    record_type: &'static str,
    browser: &'a str,
    url: Option<&'a str>,
    download_path: Option<&'a str>,
    download_size: Option<i64>,
    referrer: Option<&'a str>,
    start_time: Option<String>,
}

impl JsonlSink {
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_line<T: Serialize>(&mut self, row: &T) -> Result<(), ExportError> {
        serde_json::to_writer(&mut self.writer, row)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl ExportSink for JsonlSink {
    fn record_visit(&mut self, record: &VisitRecord) -> Result<(), ExportError> {
        let row = VisitJson {
            record_type: "visit",
            browser: record.browser.label(),
            url: &record.url,
            title: record.title.as_deref(),
            visit_count: record.visit_count,
            visit_time: record.visit_time.map(timestamp::format_utc),
            visit_source: record.visit_source.as_deref(),
        };
        self.write_line(&row)
    }

    fn record_download(&mut self, record: &DownloadRecord) -> Result<(), ExportError> {
        let row = DownloadJson {
            record_type: "download",
            browser: record.browser.label(),
            url: record.url.as_deref(),
            download_path: record.target_path.as_deref(),
            download_size: record.total_bytes,
            referrer: record.referrer.as_deref(),
            start_time: record.start_time.map(timestamp::format_utc),
        };
        self.write_line(&row)
    }

    fn flush(&mut self) -> Result<(), ExportError> {
        self.writer.flush()?;
        Ok(())
    }
}
