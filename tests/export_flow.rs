use std::fs;
use std::path::Path;

use rusqlite::Connection;

use webtrail::export::{self, ExportBackendKind};
use webtrail::parsers::sqlite_db::HistoryDb;
use webtrail::timestamp::BrowserKind;

fn make_chrome_db(path: &Path, visit_times: &[i64]) {
    let conn = Connection::open(path).expect("conn");
    conn.execute(
        "CREATE TABLE urls (id INTEGER PRIMARY KEY, url TEXT, title TEXT, visit_count INTEGER)",
        [],
    )
    .expect("create urls");
    conn.execute(
        "CREATE TABLE visits (id INTEGER PRIMARY KEY, url INTEGER, visit_time INTEGER, transition INTEGER)",
        [],
    )
    .expect("create visits");
    conn.execute(
        "INSERT INTO urls (id, url, title, visit_count) VALUES (1, ?1, ?2, ?3)",
        ("https://example.com", "Example", visit_times.len() as i64),
    )
    .expect("insert url");
    for visit_time in visit_times {
        conn.execute(
            "INSERT INTO visits (url, visit_time, transition) VALUES (1, ?1, 0)",
            (visit_time,),
        )
        .expect("insert visit");
    }
}

fn make_firefox_db(path: &Path, visit_dates: &[i64]) {
    let conn = Connection::open(path).expect("conn");
    conn.execute(
        "CREATE TABLE moz_places (id INTEGER PRIMARY KEY, url TEXT, title TEXT, visit_count INTEGER)",
        [],
    )
    .expect("create places");
    conn.execute(
        "CREATE TABLE moz_historyvisits (id INTEGER PRIMARY KEY, place_id INTEGER, \
         visit_date INTEGER, visit_type INTEGER)",
        [],
    )
    .expect("create visits");
    conn.execute(
        "INSERT INTO moz_places (id, url, title, visit_count) VALUES (1, ?1, ?2, ?3)",
        ("https://example.org", "Example", visit_dates.len() as i64),
    )
    .expect("insert place");
    for visit_date in visit_dates {
        conn.execute(
            "INSERT INTO moz_historyvisits (place_id, visit_date, visit_type) VALUES (1, ?1, 1)",
            (visit_date,),
        )
        .expect("insert visit");
    }
}

fn export_to(
    db_path: &Path,
    out_path: &Path,
    backend: ExportBackendKind,
    browser: Option<BrowserKind>,
) -> export::ExportStats {
    let db = HistoryDb::open(db_path, false).expect("open db");
    let extraction = db.extract(browser, true).expect("extract");
    let mut sink = export::build_sink(backend, out_path).expect("sink");
    export::run_export(&extraction, sink.as_mut()).expect("export")
}

#[test]
fn chrome_history_exports_expected_utc_timestamp() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("History");
    let out_path = dir.path().join("out.csv");
    make_chrome_db(&db_path, &[13_302_871_073_000_000]);

    let stats = export_to(&db_path, &out_path, ExportBackendKind::Csv, None);
    assert_eq!(stats.visits, 1);

    let contents = fs::read_to_string(&out_path).expect("read csv");
    assert!(contents.contains("2022-07-21T09:57:53Z"));
    assert!(contents.contains("chrome"));
}

#[test]
fn firefox_history_exports_expected_utc_timestamp() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("places.sqlite");
    let out_path = dir.path().join("out.csv");
    make_firefox_db(&db_path, &[1_700_000_000_000_000]);

    let stats = export_to(&db_path, &out_path, ExportBackendKind::Csv, None);
    assert_eq!(stats.visits, 1);

    let contents = fs::read_to_string(&out_path).expect("read csv");
    assert!(contents.contains("2023-11-14T22:13:20Z"));
    assert!(contents.contains("firefox"));
}

#[test]
fn output_row_count_matches_source_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("History");
    let out_path = dir.path().join("out.csv");
    let visit_times: Vec<i64> = (0..25)
        .map(|i| 13_302_871_073_000_000 + i * 60_000_000)
        .collect();
    make_chrome_db(&db_path, &visit_times);

    let stats = export_to(&db_path, &out_path, ExportBackendKind::Csv, None);
    assert_eq!(stats.visits, 25);

    let contents = fs::read_to_string(&out_path).expect("read csv");
    // Header plus one row per visit.
    assert_eq!(contents.lines().count(), 26);
}

#[test]
fn invalid_timestamps_keep_their_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("History");
    let out_path = dir.path().join("out.csv");
    make_chrome_db(&db_path, &[13_302_871_073_000_000, 0, -7]);

    let stats = export_to(&db_path, &out_path, ExportBackendKind::Csv, None);
    assert_eq!(stats.visits, 3);
    assert_eq!(stats.invalid_timestamps, 2);

    let contents = fs::read_to_string(&out_path).expect("read csv");
    assert_eq!(contents.lines().count(), 4);
    let empty_time_rows = contents
        .lines()
        .skip(1)
        .filter(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            fields[5].is_empty()
        })
        .count();
    assert_eq!(empty_time_rows, 2);
}

#[test]
fn edge_override_uses_the_chrome_epoch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("History");
    let out_path = dir.path().join("out.csv");
    make_chrome_db(&db_path, &[13_302_871_073_000_000]);

    export_to(
        &db_path,
        &out_path,
        ExportBackendKind::Csv,
        Some(BrowserKind::Edge),
    );

    let contents = fs::read_to_string(&out_path).expect("read csv");
    assert!(contents.contains("edge"));
    assert!(contents.contains("2022-07-21T09:57:53Z"));
}

#[test]
fn jsonl_backend_writes_parseable_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("places.sqlite");
    let out_path = dir.path().join("out.jsonl");
    make_firefox_db(&db_path, &[1_700_000_000_000_000, 1_700_000_060_000_000]);

    let stats = export_to(&db_path, &out_path, ExportBackendKind::Jsonl, None);
    assert_eq!(stats.visits, 2);

    let contents = fs::read_to_string(&out_path).expect("read jsonl");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).expect("json");
        assert_eq!(value["record_type"], "visit");
        assert_eq!(value["browser"], "firefox");
    }
}

#[test]
fn visits_and_downloads_share_one_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("History");
    let out_path = dir.path().join("out.csv");
    make_chrome_db(&db_path, &[13_302_871_073_000_000]);

    let conn = Connection::open(&db_path).expect("conn");
    conn.execute(
        "CREATE TABLE downloads (id INTEGER PRIMARY KEY, tab_url TEXT, current_path TEXT, \
         target_path TEXT, start_time INTEGER, total_bytes INTEGER, tab_referrer_url TEXT)",
        [],
    )
    .expect("create downloads");
    conn.execute(
        "INSERT INTO downloads (tab_url, current_path, target_path, start_time, total_bytes, tab_referrer_url) \
         VALUES (?1, '', ?2, ?3, 4096, ?4)",
        (
            "https://example.com/file.zip",
            "/tmp/file.zip",
            13_302_871_073_000_000i64,
            "https://example.com",
        ),
    )
    .expect("insert download");
    drop(conn);

    let stats = export_to(&db_path, &out_path, ExportBackendKind::Csv, None);
    assert_eq!(stats.visits, 1);
    assert_eq!(stats.downloads, 1);

    let contents = fs::read_to_string(&out_path).expect("read csv");
    assert_eq!(contents.lines().count(), 3);
    assert!(contents.lines().any(|l| l.starts_with("visit,")));
    assert!(contents.lines().any(|l| l.starts_with("download,")));
}

#[test]
fn dry_run_counts_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("places.sqlite");
    make_firefox_db(&db_path, &[1_700_000_000_000_000]);

    let db = HistoryDb::open(&db_path, false).expect("open db");
    let extraction = db.extract(None, true).expect("extract");
    let mut sink = export::DryRunSink;
    let stats = export::run_export(&extraction, &mut sink).expect("export");
    assert_eq!(stats.visits, 1);
    assert_eq!(fs::read_dir(dir.path()).expect("readdir").count(), 1);
}
