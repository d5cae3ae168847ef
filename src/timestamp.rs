use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

/// Seconds between 1601-01-01 and 1970-01-01.
const WEBKIT_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

/// Upper plausibility bound: 2100-01-01T00:00:00Z.
const MAX_UNIX_SECS: i64 = 4_102_444_800;

const MICROS_PER_SEC: i64 = 1_000_000;

/// Which store the raw timestamp came from. Chrome and Edge count
/// microseconds since 1601-01-01 UTC (WebKit epoch); Firefox counts
/// microseconds since the Unix epoch.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Edge,
    Firefox,
}

impl BrowserKind {
    pub fn label(self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Edge => "edge",
            BrowserKind::Firefox => "firefox",
        }
    }
}

impl std::fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid {kind} timestamp {raw}")]
pub struct InvalidTimestamp {
    pub kind: BrowserKind,
    pub raw: i64,
}

/// Convert a raw visit timestamp into a UTC instant.
///
/// Rejects values that are not positive, or whose converted instant falls
/// before 1970 (Chrome/Edge values below the epoch offset) or on or past
/// 2100. The microsecond remainder is kept.
pub fn normalize(raw: i64, kind: BrowserKind) -> Result<DateTime<Utc>, InvalidTimestamp> {
    if raw <= 0 {
        return Err(InvalidTimestamp { kind, raw });
    }
    let secs = match kind {
        BrowserKind::Chrome | BrowserKind::Edge => raw / MICROS_PER_SEC - WEBKIT_UNIX_OFFSET_SECS,
        BrowserKind::Firefox => raw / MICROS_PER_SEC,
    };
    if !(0..MAX_UNIX_SECS).contains(&secs) {
        return Err(InvalidTimestamp { kind, raw });
    }
    let nsecs = (raw % MICROS_PER_SEC) as u32 * 1_000;
    DateTime::<Utc>::from_timestamp(secs, nsecs).ok_or(InvalidTimestamp { kind, raw })
}

/// Render an instant for the output columns: RFC 3339 UTC with a trailing
/// `Z`, sub-second digits only when non-zero.
pub fn format_utc(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
