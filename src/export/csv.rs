use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::export::{ExportError, ExportSink};
use crate::parsers::browser::{DownloadRecord, VisitRecord};
use crate::timestamp;

/// CSV sink. Visits and downloads share one file, distinguished by the
/// `record_type` column; columns that do not apply to a record kind stay
/// empty.
pub struct CsvSink {
    writer: csv::Writer<File>,
}

#[derive(Serialize)]
struct VisitCsv<'a> {
    record_type: &'static str,
    browser: &'a str,
    url: &'a str,
    title: Option<&'a str>,
    visit_count: Option<i64>,
    visit_time: Option<String>,
    visit_source: Option<&'a str>,
    download_path: &'a str,
    download_size: &'a str,
    referrer: &'a str,
}

#[derive(Serialize)]
struct DownloadCsv<'a> {
    record_type: &'static str,
    browser: &'a str,
    url: Option<&'a str>,
    title: &'a str,
    visit_count: &'a str,
    visit_time: Option<String>,
    visit_source: &'a str,
    download_path: Option<&'a str>,
    download_size: Option<i64>,
    referrer: Option<&'a str>,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        writer.write_record(&[
            "record_type",
            "browser",
            "url",
            "title",
            "visit_count",
            "visit_time",
            "visit_source",
            "download_path",
            "download_size",
            "referrer",
        ])?;

        Ok(Self { writer })
    }
}

impl ExportSink for CsvSink {
    fn record_visit(&mut self, record: &VisitRecord) -> Result<(), ExportError> {
        let row = VisitCsv {
            record_type: "visit",
            browser: record.browser.label(),
            url: &record.url,
            title: record.title.as_deref(),
            visit_count: record.visit_count,
            visit_time: record.visit_time.map(timestamp::format_utc),
            visit_source: record.visit_source.as_deref(),
            download_path: "",
            download_size: "",
            referrer: "",
        };
        self.writer.serialize(row)?;
        Ok(())
    }

    fn record_download(&mut self, record: &DownloadRecord) -> Result<(), ExportError> {
        let row = DownloadCsv {
            record_type: "download",
            browser: record.browser.label(),
            url: record.url.as_deref(),
            title: "",
            visit_count: "",
            visit_time: record.start_time.map(timestamp::format_utc),
            visit_source: "",
            download_path: record.target_path.as_deref(),
            download_size: record.total_bytes,
            referrer: record.referrer.as_deref(),
        };
        self.writer.serialize(row)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ExportError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::BrowserKind;
    use tempfile::tempdir;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::create(&path).expect("csv sink");

        let visit = VisitRecord {
            browser: BrowserKind::Firefox,
            url: "https://example.org".to_string(),
            title: Some("Example".to_string()),
            visit_count: Some(2),
            visit_time: crate::timestamp::normalize(1_700_000_000_000_000, BrowserKind::Firefox)
                .ok(),
            visit_source: Some("typed".to_string()),
        };
        sink.record_visit(&visit).expect("record visit");

        let download = DownloadRecord {
            browser: BrowserKind::Firefox,
            url: Some("https://example.org/file.iso".to_string()),
            target_path: Some("/home/u/file.iso".to_string()),
            total_bytes: Some(2048),
            referrer: None,
            start_time: None,
        };
        sink.record_download(&download).expect("record download");
        sink.flush().expect("flush");

        let contents = std::fs::read_to_string(&path).expect("read csv");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("record_type,browser,url,title,visit_count,visit_time"));
        assert!(lines[1].contains("2023-11-14T22:13:20Z"));
        assert!(lines[1].starts_with("visit,firefox,https://example.org,Example,2,"));
        assert!(lines[2].starts_with("download,firefox,"));
        assert!(lines[2].contains("/home/u/file.iso"));
    }

    #[test]
    fn missing_timestamp_leaves_the_field_empty() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::create(&path).expect("csv sink");

        let visit = VisitRecord {
            browser: BrowserKind::Chrome,
            url: "https://example.com".to_string(),
            title: None,
            visit_count: None,
            visit_time: None,
            visit_source: None,
        };
        sink.record_visit(&visit).expect("record visit");
        sink.flush().expect("flush");

        let contents = std::fs::read_to_string(&path).expect("read csv");
        let row = contents.lines().nth(1).expect("data row");
        assert_eq!(row, "visit,chrome,https://example.com,,,,,,,");
    }
}
