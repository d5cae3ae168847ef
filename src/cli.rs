use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::timestamp::BrowserKind;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ExportFormat {
    Csv,
    Jsonl,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Input history database (Chromium "History" or Firefox "places.sqlite")
    pub input: PathBuf,

    /// Output file
    #[arg(default_value = "browser_history_export.csv")]
    pub output: PathBuf,

    /// Browser the database came from (default: detect from schema)
    #[arg(long, value_enum)]
    pub browser: Option<BrowserKind>,

    /// Output format
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,

    /// Skip download records
    #[arg(long)]
    pub no_downloads: bool,

    /// Parse and count records without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Copy the database to a temp file before opening (locked live profiles)
    #[arg(long)]
    pub snapshot: bool,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}
