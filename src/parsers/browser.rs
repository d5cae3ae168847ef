use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::timestamp::BrowserKind;

/// One visited-URL entry from a history store.
#[derive(Debug, Clone, Serialize)]
pub struct VisitRecord {
    pub browser: BrowserKind,
    pub url: String,
    pub title: Option<String>,
    pub visit_count: Option<i64>,
    pub visit_time: Option<DateTime<Utc>>,
    pub visit_source: Option<String>,
}

/// One download entry. Chromium keeps these in `downloads`, legacy Firefox
/// in `moz_downloads`.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadRecord {
    pub browser: BrowserKind,
    pub url: Option<String>,
    pub target_path: Option<String>,
    pub total_bytes: Option<i64>,
    pub referrer: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

pub fn chrome_transition_label(transition: i64) -> &'static str {
    match transition & 0xFF {
        0 => "link",
        1 => "typed",
        2 => "auto_bookmark",
        3 => "auto_subframe",
        4 => "manual_subframe",
        5 => "generated",
        6 => "auto_toplevel",
        7 => "form_submit",
        8 => "reload",
        9 => "keyword",
        10 => "keyword_generated",
        _ => "other",
    }
}

pub fn firefox_visit_label(visit_type: i64) -> &'static str {
    match visit_type {
        1 => "link",
        2 => "typed",
        3 => "bookmark",
        4 => "embed",
        5 => "redirect_permanent",
        6 => "redirect_temporary",
        7 => "download",
        8 => "framed_link",
        _ => "other",
    }
}
