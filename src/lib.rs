//! Forensic browser history exporter.
//!
//! Reads a Chromium (Chrome/Edge) or Firefox history database and writes
//! every visit and download to CSV or JSONL with timestamps normalized to
//! UTC.

pub mod cli;
pub mod export;
pub mod logging;
pub mod parsers;
pub mod snapshot;
pub mod timestamp;
