use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::parsers::browser::{
    DownloadRecord, VisitRecord, chrome_transition_label, firefox_visit_label,
};
use crate::snapshot;
use crate::timestamp::{self, BrowserKind};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("not a recognized browser history database ({0})")]
    UnknownSchema(String),
}

/// Schema family found in the database. Chrome and Edge share the Chromium
/// layout, so telling those two apart needs the caller's browser override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Chromium,
    Firefox,
}

impl SchemaKind {
    pub fn label(self) -> &'static str {
        match self {
            SchemaKind::Chromium => "chromium",
            SchemaKind::Firefox => "firefox",
        }
    }

    pub fn default_browser(self) -> BrowserKind {
        match self {
            SchemaKind::Chromium => BrowserKind::Chrome,
            SchemaKind::Firefox => BrowserKind::Firefox,
        }
    }
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything read from one database.
#[derive(Debug)]
pub struct Extraction {
    pub browser: BrowserKind,
    pub schema: SchemaKind,
    pub visits: Vec<VisitRecord>,
    pub downloads: Vec<DownloadRecord>,
    pub invalid_timestamps: u64,
}

/// A history database opened read-only. When the live profile holds a lock,
/// the connection is backed by a temp snapshot that lives as long as this
/// handle.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
    _snapshot: Option<NamedTempFile>,
}

impl HistoryDb {
    pub fn open(path: &Path, force_snapshot: bool) -> Result<Self, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("history database not found: {}", path.display()),
            )));
        }
        if force_snapshot {
            return Self::open_from_snapshot(path);
        }
        match Connection::open_with_flags(path, open_flags()) {
            Ok(conn) => Ok(Self {
                conn,
                _snapshot: None,
            }),
            Err(err) if is_locked(&err) => {
                debug!("database is locked, retrying from a snapshot copy");
                Self::open_from_snapshot(path)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn open_from_snapshot(path: &Path) -> Result<Self, ExtractError> {
        let snap = snapshot::copy_to_temp(path)?;
        let conn = Connection::open_with_flags(snap.path(), open_flags())?;
        Ok(Self {
            conn,
            _snapshot: Some(snap),
        })
    }

    pub fn detect_schema(&self) -> Result<SchemaKind, ExtractError> {
        if has_table(&self.conn, "urls")? {
            return Ok(SchemaKind::Chromium);
        }
        if has_table(&self.conn, "moz_places")? {
            return Ok(SchemaKind::Firefox);
        }
        let names = table_names(&self.conn)?;
        Err(ExtractError::UnknownSchema(format!(
            "tables present: [{}]",
            names.join(", ")
        )))
    }

    /// Read every visit and download. Rows whose raw timestamp fails the
    /// bounds check are kept with an empty timestamp, so the output row
    /// count always matches the source tables.
    pub fn extract(
        &self,
        browser_override: Option<BrowserKind>,
        include_downloads: bool,
    ) -> Result<Extraction, ExtractError> {
        let schema = self.detect_schema()?;
        let browser = browser_override.unwrap_or_else(|| schema.default_browser());
        if let Some(kind) = browser_override {
            let matches_schema = match schema {
                SchemaKind::Chromium => {
                    matches!(kind, BrowserKind::Chrome | BrowserKind::Edge)
                }
                SchemaKind::Firefox => kind == BrowserKind::Firefox,
            };
            if !matches_schema {
                warn!(
                    "--browser {kind} does not match the detected {schema} schema; \
                     timestamps will be read with the {kind} epoch"
                );
            }
        }

        let mut invalid_timestamps = 0u64;
        let (visits, downloads) = match schema {
            SchemaKind::Chromium => (
                chromium_visits(&self.conn, browser, &mut invalid_timestamps)?,
                if include_downloads {
                    chromium_downloads(&self.conn, browser, &mut invalid_timestamps)?
                } else {
                    Vec::new()
                },
            ),
            SchemaKind::Firefox => (
                firefox_visits(&self.conn, browser, &mut invalid_timestamps)?,
                if include_downloads {
                    firefox_downloads(&self.conn, browser, &mut invalid_timestamps)?
                } else {
                    Vec::new()
                },
            ),
        };

        Ok(Extraction {
            browser,
            schema,
            visits,
            downloads,
            invalid_timestamps,
        })
    }
}

fn open_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn is_locked(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}

fn has_table(conn: &Connection, name: &str) -> Result<bool, ExtractError> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
    let mut rows = stmt.query([name])?;
    Ok(rows.next()?.is_some())
}

fn table_names(conn: &Connection) -> Result<Vec<String>, ExtractError> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut names = Vec::new();
    for name in rows {
        names.push(name?);
    }
    Ok(names)
}

fn convert(
    raw: Option<i64>,
    kind: BrowserKind,
    invalid_timestamps: &mut u64,
) -> Option<chrono::DateTime<chrono::Utc>> {
    let raw = raw?;
    match timestamp::normalize(raw, kind) {
        Ok(ts) => Some(ts),
        Err(err) => {
            *invalid_timestamps += 1;
            warn!("{err}; writing an empty timestamp field");
            None
        }
    }
}

fn chromium_visits(
    conn: &Connection,
    browser: BrowserKind,
    invalid_timestamps: &mut u64,
) -> Result<Vec<VisitRecord>, ExtractError> {
    let mut out = Vec::new();
    if has_table(conn, "visits")? {
        let mut stmt = conn.prepare(
            "SELECT urls.url, urls.title, urls.visit_count, visits.visit_time, visits.transition \
             FROM visits JOIN urls ON visits.url = urls.id \
             ORDER BY visits.visit_time DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let url: String = row.get(0)?;
            let title: Option<String> = row.get(1)?;
            let visit_count: Option<i64> = row.get(2)?;
            let visit_time: Option<i64> = row.get(3)?;
            let transition: Option<i64> = row.get(4)?;
            Ok((url, title, visit_count, visit_time, transition))
        })?;

        for row in rows {
            let (url, title, visit_count, visit_time, transition) = row?;
            out.push(VisitRecord {
                browser,
                url,
                title,
                visit_count,
                visit_time: convert(visit_time, browser, invalid_timestamps),
                visit_source: transition
                    .map(chrome_transition_label)
                    .map(|s| s.to_string()),
            });
        }
    } else {
        // Older/partial stores only carry the per-URL last visit.
        let mut stmt = conn.prepare(
            "SELECT url, title, visit_count, last_visit_time FROM urls \
             ORDER BY last_visit_time DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let url: String = row.get(0)?;
            let title: Option<String> = row.get(1)?;
            let visit_count: Option<i64> = row.get(2)?;
            let last_visit_time: Option<i64> = row.get(3)?;
            Ok((url, title, visit_count, last_visit_time))
        })?;

        for row in rows {
            let (url, title, visit_count, last_visit_time) = row?;
            out.push(VisitRecord {
                browser,
                url,
                title,
                visit_count,
                visit_time: convert(last_visit_time, browser, invalid_timestamps),
                visit_source: None,
            });
        }
    }

    Ok(out)
}

fn chromium_downloads(
    conn: &Connection,
    browser: BrowserKind,
    invalid_timestamps: &mut u64,
) -> Result<Vec<DownloadRecord>, ExtractError> {
    let mut out = Vec::new();
    if !has_table(conn, "downloads")? {
        return Ok(out);
    }
    let mut stmt = conn.prepare(
        "SELECT tab_url, current_path, target_path, start_time, total_bytes, tab_referrer_url \
         FROM downloads",
    )?;
    let rows = stmt.query_map([], |row| {
        let tab_url: Option<String> = row.get(0)?;
        let current_path: Option<String> = row.get(1)?;
        let target_path: Option<String> = row.get(2)?;
        let start_time: Option<i64> = row.get(3)?;
        let total_bytes: Option<i64> = row.get(4)?;
        let referrer: Option<String> = row.get(5)?;
        Ok((
            tab_url,
            current_path,
            target_path,
            start_time,
            total_bytes,
            referrer,
        ))
    })?;

    for row in rows {
        let (tab_url, current_path, target_path, start_time, total_bytes, referrer) = row?;
        out.push(DownloadRecord {
            browser,
            url: tab_url,
            target_path: target_path.filter(|p| !p.is_empty()).or(current_path),
            total_bytes,
            referrer,
            start_time: convert(start_time, browser, invalid_timestamps),
        });
    }

    Ok(out)
}

fn firefox_visits(
    conn: &Connection,
    browser: BrowserKind,
    invalid_timestamps: &mut u64,
) -> Result<Vec<VisitRecord>, ExtractError> {
    let mut out = Vec::new();
    if has_table(conn, "moz_historyvisits")? {
        let mut stmt = conn.prepare(
            "SELECT moz_places.url, moz_places.title, moz_places.visit_count, \
                    moz_historyvisits.visit_date, moz_historyvisits.visit_type \
             FROM moz_historyvisits JOIN moz_places ON moz_historyvisits.place_id = moz_places.id \
             ORDER BY moz_historyvisits.visit_date DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let url: String = row.get(0)?;
            let title: Option<String> = row.get(1)?;
            let visit_count: Option<i64> = row.get(2)?;
            let visit_date: Option<i64> = row.get(3)?;
            let visit_type: Option<i64> = row.get(4)?;
            Ok((url, title, visit_count, visit_date, visit_type))
        })?;

        for row in rows {
            let (url, title, visit_count, visit_date, visit_type) = row?;
            out.push(VisitRecord {
                browser,
                url,
                title,
                visit_count,
                visit_time: convert(visit_date, browser, invalid_timestamps),
                visit_source: visit_type.map(firefox_visit_label).map(|s| s.to_string()),
            });
        }
    } else {
        let mut stmt = conn.prepare(
            "SELECT url, title, visit_count, last_visit_date FROM moz_places \
             ORDER BY last_visit_date DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let url: String = row.get(0)?;
            let title: Option<String> = row.get(1)?;
            let visit_count: Option<i64> = row.get(2)?;
            let last_visit_date: Option<i64> = row.get(3)?;
            Ok((url, title, visit_count, last_visit_date))
        })?;

        for row in rows {
            let (url, title, visit_count, last_visit_date) = row?;
            out.push(VisitRecord {
                browser,
                url,
                title,
                visit_count,
                visit_time: convert(last_visit_date, browser, invalid_timestamps),
                visit_source: None,
            });
        }
    }

    Ok(out)
}

fn firefox_downloads(
    conn: &Connection,
    browser: BrowserKind,
    invalid_timestamps: &mut u64,
) -> Result<Vec<DownloadRecord>, ExtractError> {
    let mut out = Vec::new();
    // Pre-Quantum profiles only; modern Firefox stores downloads as
    // moz_places annotations.
    if !has_table(conn, "moz_downloads")? {
        return Ok(out);
    }
    let mut stmt =
        conn.prepare("SELECT source, target, startTime, totalBytes FROM moz_downloads")?;
    let rows = stmt.query_map([], |row| {
        let source: Option<String> = row.get(0)?;
        let target: Option<String> = row.get(1)?;
        let start_time: Option<i64> = row.get(2)?;
        let total_bytes: Option<i64> = row.get(3)?;
        Ok((source, target, start_time, total_bytes))
    })?;

    for row in rows {
        let (source, target, start_time, total_bytes) = row?;
        out.push(DownloadRecord {
            browser,
            url: source,
            target_path: target,
            total_bytes,
            referrer: None,
            start_time: convert(start_time, browser, invalid_timestamps),
        });
    }

    Ok(out)
}
